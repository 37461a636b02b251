//! ステップハンドラー層
//!
//! # 責務
//!
//! - ワークフローの各ステップが呼び出す処理単位（ハンドラー）を統一的に扱うインターフェースを提供
//! - ハンドラー名から実装を引くレジストリ機能
//! - SPR（セルフピアシングリベット）計画用の組み込みハンドラー
//!
//! # モジュール構成
//!
//! - `traits` - 共通インターフェース（[`StepHandler`]トレイト等）
//! - `noise` - 実行ごとに注入する乱数源
//! - `parameter` - パラメータ範囲推奨
//! - `window` - プロセスウィンドウ作成
//! - `risk` - リスク評価
//!
//! # 使用例
//!
//! ```rust
//! use joinx_flow::handler::HandlerRegistry;
//!
//! let registry = HandlerRegistry::builtin();
//! assert!(registry.contains("parameter_recommendation"));
//! assert!(registry.get("unknown").is_none());
//! ```

pub mod traits;
pub mod noise;
pub mod parameter;
pub mod window;
pub mod risk;

// 公開APIの再エクスポート
pub use noise::NoiseSource;
pub use traits::{HandlerOutput, StepHandler, input, input_as};

use std::collections::HashMap;
use std::sync::Arc;

/// 小数点以下 `digits` 桁に丸める
pub(crate) fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// ハンドラー名から実装を引くレジストリ
///
/// TOML のワークフロー定義は `handler = "..."` で名前だけを持つため、
/// 読み込み時にこのレジストリで実装へ解決します。
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn StepHandler>>,
}

impl HandlerRegistry {
    /// 空のレジストリを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// 組み込みハンドラーを登録済みのレジストリを生成
    ///
    /// | 名前 | 実装 |
    /// |---|---|
    /// | `parameter_recommendation` | [`parameter::ParameterRecommendationHandler`] |
    /// | `process_window` | [`window::ProcessWindowHandler`] |
    /// | `risk_evaluation` | [`risk::RiskEvaluationHandler`] |
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(parameter::ParameterRecommendationHandler::new()));
        registry.register(Arc::new(window::ProcessWindowHandler::new()));
        registry.register(Arc::new(risk::RiskEvaluationHandler::new()));
        registry
    }

    /// ハンドラーを登録する
    ///
    /// 同名のハンドラーが既に登録されている場合は置き換えます。
    pub fn register(&mut self, handler: Arc<dyn StepHandler>) -> &mut Self {
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn StepHandler>> {
        self.handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// 登録済みのハンドラー名（昇順）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::context::ExecutionContext;
    use crate::error::HandlerError;
    use async_trait::async_trait;

    struct Echo(&'static str);

    #[async_trait]
    impl StepHandler for Echo {
        fn name(&self) -> &str {
            self.0
        }

        async fn invoke(
            &self,
            _context: &ExecutionContext,
            _noise: &mut NoiseSource,
        ) -> Result<HandlerOutput, HandlerError> {
            Ok(HandlerOutput::new())
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(5.256, 2), 5.26);
        assert_eq!(round_to(94.96, 1), 95.0);
        assert_eq!(round_to(-0.004, 2), -0.0);
    }

    #[test]
    fn test_builtin_registry() {
        let registry = HandlerRegistry::builtin();
        assert_eq!(
            registry.names(),
            vec!["parameter_recommendation", "process_window", "risk_evaluation"]
        );
        let handler = registry.get("risk_evaluation").unwrap();
        assert_eq!(handler.name(), "risk_evaluation");
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = HandlerRegistry::new();
        registry.register(Arc::new(Echo("echo")));
        registry.register(Arc::new(Echo("echo")));
        assert_eq!(registry.names(), vec!["echo"]);
        assert!(registry.contains("echo"));
        assert!(!registry.contains("process_window"));
    }
}
