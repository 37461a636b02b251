//! ワークフロー実行エンジン
//!
//! # 責務
//!
//! - Workflowオブジェクトを受け取り、各Stepを宣言順に1つずつ実行
//! - 実行コンテキストによるステップ間のデータ受け渡し
//! - 実行条件・確認ゲート・タイムアウトの制御
//! - タスクへの監査ログの記録
//!
//! # モジュール構成
//!
//! - [`executor`][]: ワークフロー実行エンジン本体
//! - [`context`][]: ステップ実行コンテキスト（ステップ間データ受け渡し）
//! - [`audit`][]: 監査ログ
//! - [`result`][]: 実行結果型
//!
//! # 使用例
//!
//! ```rust,no_run
//! use joinx_flow::config::workflow::Workflow;
//! use joinx_flow::engine::WorkflowEngine;
//! use joinx_flow::task::{Material, Structure, Task};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // 1. Workflowを読み込む
//!     let workflow = Workflow::from_file("workflows/spr.toml")?;
//!
//!     // 2. エンジンを生成
//!     let engine = WorkflowEngine::new(workflow);
//!
//!     // 3. ワークフローを実行
//!     let mut task = Task::new(Material::new("Al/Steel", 1.5), Structure::new("SPR", 2), "strength");
//!     let run = engine.run(&mut task, false).await;
//!
//!     // 4. 結果を出力
//!     println!("Workflow: {}", run.workflow_name);
//!     println!("Outcome: {}", run.outcome);
//!     println!("Status: {}", task.status());
//!
//!     for entry in task.logs() {
//!         println!("  Step {}: {}", entry.step, entry.status.as_str());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod context;
pub mod executor;
pub mod result;

// 公開APIの再エクスポート
pub use audit::{AuditEntry, AuditLog, AuditOutcome};
pub use context::ExecutionContext;
pub use executor::{RunOptions, WorkflowEngine};
pub use result::{ExecutionError, Interruption, RunOutcome, WorkflowRun};
