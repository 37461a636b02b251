//! ワークフロー定義の設定レイヤー
//!
//! - [`workflow`]: ワークフロー全体（TOML の読み書きと検証）
//! - [`step`]: ステップ定義と実行条件
//! - `dto`: TOML 入出力用の内部構造体

mod dto;
pub mod step;
pub mod workflow;

pub use step::{Condition, StepDefinition};
pub use workflow::Workflow;
