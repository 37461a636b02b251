//! ステップ実行コンテキストの管理
//!
//! # 責務
//!
//! - ステップ間で受け渡されるキー・バリューの状態を保持
//! - タスク属性によるコンテキストの初期化
//! - 完了したステップ出力のマージ（後勝ち）
//!
//! # 不変条件
//!
//! キーは追加・上書きされるのみで、削除されることはありません。
//! 後続ステップは、それまでに完了した全ステップの出力の和集合を参照できます。
//! 書き込みはエンジンのみが行い、ハンドラーには共有参照だけが渡されます。
//!
//! # 使用例
//!
//! ```rust
//! use joinx_flow::engine::context::{keys, ExecutionContext};
//! use joinx_flow::task::{Material, Structure, Task};
//!
//! let task = Task::new(
//!     Material::new("Al/Steel", 1.5),
//!     Structure::new("SPR", 2),
//!     "strength",
//! );
//! let ctx = ExecutionContext::from_task(&task);
//!
//! assert!(ctx.contains_key(keys::MATERIAL));
//! assert_eq!(ctx.get_str(keys::TARGET), Some("strength"));
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::task::Task;

/// コンテキストの既知キー
///
/// エンジンが初期化時に設定するキーと、組み込みハンドラーが生成するキーの一覧です。
pub mod keys {
    // タスク属性（実行開始時に設定）
    pub const TASK_ID: &str = "task_id";
    pub const MATERIAL: &str = "material";
    pub const STRUCTURE: &str = "structure";
    pub const TARGET: &str = "target";
    pub const VARIABILITY: &str = "variability";

    // 全ハンドラー共通
    pub const SUMMARY: &str = "summary";

    // parameter_recommendation
    pub const RECOMMENDED_RANGES: &str = "recommended_ranges";
    pub const PRIORITY_PARAMS: &str = "priority_params";
    pub const ASSUMPTIONS: &str = "assumptions";

    // process_window
    pub const PROCESS_WINDOW: &str = "process_window";
    pub const RISK_HIGHLIGHTS: &str = "risk_highlights";

    // risk_evaluation
    pub const RISK_LEVEL: &str = "risk_level";
    pub const RATIONALE: &str = "rationale";
}

/// ステップ実行コンテキスト
///
/// ワークフロー実行全体で共有される状態です。値は任意の構造化データ
/// （[`serde_json::Value`]）で、キー順に保持されます。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutionContext {
    values: BTreeMap<String, Value>,
}

impl ExecutionContext {
    /// 空のコンテキストを生成
    pub fn new() -> Self {
        Self::default()
    }

    /// タスク属性で初期化したコンテキストを生成
    ///
    /// `task_id` / `material` / `structure` / `target` を設定し、
    /// タスクが `variability` を持つ場合はそれも設定します。
    pub fn from_task(task: &Task) -> Self {
        let mut ctx = Self::new();
        ctx.insert(keys::TASK_ID, Value::from(task.id()));
        ctx.insert(keys::MATERIAL, task.material().to_value());
        ctx.insert(keys::STRUCTURE, task.structure().to_value());
        ctx.insert(keys::TARGET, Value::from(task.target()));
        if let Some(variability) = task.variability() {
            ctx.insert(keys::VARIABILITY, Value::from(variability));
        }
        ctx
    }

    /// 値を取得
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// 文字列値を取得
    ///
    /// キーが存在しない、または文字列でない場合は `None` を返します。
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// 数値を `f64` として取得
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.values.get(key).and_then(Value::as_f64)
    }

    /// キーが存在するか
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// キーの一覧（昇順）
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// 保持しているキーの数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 空かどうか
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// JSON オブジェクトとして取得
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// ステップ出力をマージ
    ///
    /// 出力の全キーをトップレベルに書き込みます。既存キーは上書きされます。
    pub(crate) fn merge(&mut self, output: Map<String, Value>) {
        for (key, value) in output {
            self.values.insert(key, value);
        }
    }

    fn insert(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::{Material, Structure};
    use serde_json::json;

    fn sample_task() -> Task {
        Task::with_id(
            "task-1",
            Material::new("Al/Steel", 1.5),
            Structure::new("SPR", 2),
            "strength",
        )
    }

    #[test]
    fn test_from_task_seeds_base_attributes() {
        let ctx = ExecutionContext::from_task(&sample_task());

        assert_eq!(ctx.get_str(keys::TASK_ID), Some("task-1"));
        assert_eq!(ctx.get_str(keys::TARGET), Some("strength"));
        assert_eq!(
            ctx.get(keys::MATERIAL),
            Some(&json!({"material_pair": "Al/Steel", "sheet_thickness_mm": 1.5}))
        );
        assert_eq!(
            ctx.get(keys::STRUCTURE),
            Some(&json!({"joint_type": "SPR", "stack_layers": 2}))
        );
        // variability は未設定
        assert!(!ctx.contains_key(keys::VARIABILITY));
        assert_eq!(ctx.len(), 4);
    }

    #[test]
    fn test_from_task_with_variability() {
        let task = sample_task().with_variability(0.3);
        let ctx = ExecutionContext::from_task(&task);
        assert_eq!(ctx.get_f64(keys::VARIABILITY), Some(0.3));
    }

    #[test]
    fn test_merge_is_last_write_wins() {
        let mut ctx = ExecutionContext::new();

        let first = json!({"x": 1, "summary": "first"});
        ctx.merge(first.as_object().unwrap().clone());

        let second = json!({"y": 2, "summary": "second"});
        ctx.merge(second.as_object().unwrap().clone());

        assert_eq!(ctx.get("x"), Some(&json!(1)));
        assert_eq!(ctx.get("y"), Some(&json!(2)));
        assert_eq!(ctx.get_str("summary"), Some("second"));
        assert_eq!(ctx.keys().collect::<Vec<_>>(), vec!["summary", "x", "y"]);
    }

    #[test]
    fn test_merge_empty_output_keeps_keys() {
        let mut ctx = ExecutionContext::from_task(&sample_task());
        let before = ctx.clone();
        ctx.merge(Map::new());
        assert_eq!(ctx, before);
    }

    #[test]
    fn test_to_json() {
        let mut ctx = ExecutionContext::new();
        ctx.merge(json!({"a": [1, 2]}).as_object().unwrap().clone());
        assert_eq!(ctx.to_json(), json!({"a": [1, 2]}));
        assert_eq!(serde_json::to_value(&ctx).unwrap(), json!({"a": [1, 2]}));
    }
}
