//! ステップハンドラーの共通インターフェース定義
//!
//! # 責務
//!
//! - ステップハンドラーの共通トレイト [`StepHandler`] を定義
//! - ハンドラー出力の型 [`HandlerOutput`] を定義
//! - コンテキストから入力を取り出すヘルパー関数を提供
//!
//! # 契約
//!
//! ハンドラーはコンテキストを読み取り専用で受け取り、新規・上書きするキーだけを
//! JSON オブジェクトとして返します。返した全キーはエンジンがトップレベルにマージします。
//!
//! # 使用例
//!
//! ```rust
//! use async_trait::async_trait;
//! use joinx_flow::engine::ExecutionContext;
//! use joinx_flow::error::HandlerError;
//! use joinx_flow::handler::{HandlerOutput, NoiseSource, StepHandler};
//! use serde_json::json;
//!
//! struct Constant;
//!
//! #[async_trait]
//! impl StepHandler for Constant {
//!     fn name(&self) -> &str {
//!         "constant"
//!     }
//!
//!     async fn invoke(
//!         &self,
//!         _context: &ExecutionContext,
//!         _noise: &mut NoiseSource,
//!     ) -> Result<HandlerOutput, HandlerError> {
//!         let mut output = HandlerOutput::new();
//!         output.insert("x".to_string(), json!(1));
//!         Ok(output)
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::noise::NoiseSource;
use crate::engine::context::ExecutionContext;
use crate::error::HandlerError;

/// ハンドラーの出力（トップレベルにマージされるキーと値）
pub type HandlerOutput = Map<String, Value>;

/// ステップハンドラーの共通インターフェース
///
/// # 実装要件
///
/// - `Send + Sync`: ワークフロー定義は複数の実行で共有される
/// - 実行ごとの状態をハンドラー内部に持たないこと
/// - 乱数は引数の [`NoiseSource`] からのみ取得すること
#[async_trait]
pub trait StepHandler: Send + Sync {
    /// ハンドラー名（レジストリのキー、TOML の `handler` で参照される名前）
    fn name(&self) -> &str;

    /// 実行前に存在している必要があるコンテキストキー
    ///
    /// エンジンは呼び出し前にこれを確認し、欠落していれば
    /// [`ExecutionError::MissingInput`](crate::engine::ExecutionError::MissingInput) で失敗させます。
    fn required_inputs(&self) -> &[&'static str] {
        &[]
    }

    /// 出力してよいキーの一覧
    ///
    /// `Some` の場合、エンジンはマージ前に出力の全キーがこの一覧に含まれるか検証します。
    /// `None` の場合は検証しません。
    fn declared_outputs(&self) -> Option<&[&'static str]> {
        None
    }

    /// ハンドラーを実行する
    ///
    /// # 引数
    ///
    /// - `context`: 現在の実行コンテキスト（読み取り専用）
    /// - `noise`: 実行ごとに注入される乱数源
    ///
    /// # 戻り値
    ///
    /// - `Ok(HandlerOutput)`: コンテキストへマージするキーと値
    /// - `Err(HandlerError)`: 入力不正または処理失敗
    async fn invoke(
        &self,
        context: &ExecutionContext,
        noise: &mut NoiseSource,
    ) -> Result<HandlerOutput, HandlerError>;
}

/// 必須入力を取得
///
/// # エラー
///
/// - [`HandlerError::MissingInput`] - キーが存在しない
pub fn input<'a>(context: &'a ExecutionContext, key: &str) -> Result<&'a Value, HandlerError> {
    context
        .get(key)
        .ok_or_else(|| HandlerError::MissingInput(key.to_string()))
}

/// 必須入力を型付きで取得
///
/// # エラー
///
/// - [`HandlerError::MissingInput`] - キーが存在しない
/// - [`HandlerError::InvalidInput`] - 値が `T` に変換できない
pub fn input_as<T: DeserializeOwned>(
    context: &ExecutionContext,
    key: &str,
) -> Result<T, HandlerError> {
    let value = input(context, key)?;
    serde_json::from_value(value.clone()).map_err(|e| HandlerError::InvalidInput {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Material, Structure, Task};

    fn context() -> ExecutionContext {
        let task = Task::with_id(
            "t",
            Material::new("Al/Steel", 1.5),
            Structure::new("SPR", 2),
            "strength",
        );
        ExecutionContext::from_task(&task)
    }

    #[test]
    fn test_input_missing() {
        let ctx = context();
        assert_eq!(
            input(&ctx, "process_window"),
            Err(HandlerError::MissingInput("process_window".to_string()))
        );
    }

    #[test]
    fn test_input_as_typed() {
        let ctx = context();
        let material: Material = input_as(&ctx, "material").unwrap();
        assert_eq!(material, Material::new("Al/Steel", 1.5));
    }

    #[test]
    fn test_input_as_wrong_shape() {
        let ctx = context();
        let err = input_as::<Structure>(&ctx, "target").unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput { key, .. } if key == "target"));
    }
}
