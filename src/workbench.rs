//! SPR 工程開発の作業台
//!
//! # 責務
//!
//! - 組み込みの SPR ワークフロー（`workflows/spr.toml`）の提供
//! - タスクの生成・保存・ワークフロー実行をまとめたエントリポイント
//! - デモ用の入力（Al/Steel 1.5 mm、SPR 2層、強度重視）での実行
//!
//! # SPR ワークフロー
//!
//! | ステップ | ハンドラー | 実行条件 |
//! |---|---|---|
//! | ParameterRecommendation | `parameter_recommendation` | 常に |
//! | ProcessWindow | `process_window` | `recommended_ranges` がある |
//! | RiskEvaluation | `risk_evaluation` | `process_window` がある |
//! | ManualConfirm | （確認ゲート） | `risk_level` が `HIGH` |
//! | FinalizeProcessPlan | （マーカー） | 常に |

use tracing::info;

use crate::config::workflow::Workflow;
use crate::engine::{RunOptions, WorkflowEngine, WorkflowRun};
use crate::error::ConfigError;
use crate::store::InMemoryStore;
use crate::task::{Material, Structure, Task};

/// 組み込み SPR ワークフローの TOML 定義
pub const SPR_WORKFLOW_TOML: &str = include_str!("../workflows/spr.toml");

/// タスクと、その実行結果
#[derive(Debug, Clone)]
pub struct TaskExecution {
    pub task: Task,
    pub run: WorkflowRun,
}

/// 組み込み SPR ワークフローを読み込む
pub fn spr_workflow() -> Result<Workflow, ConfigError> {
    Workflow::from_toml(SPR_WORKFLOW_TOML)
}

/// UUID v4 の ID でタスクを生成
pub fn create_task(material: Material, structure: Structure, target: impl Into<String>) -> Task {
    Task::new(material, structure, target)
}

/// デモ用のタスクを生成
pub fn demo_task() -> Task {
    create_task(
        Material::new("Al/Steel", 1.5),
        Structure::new("SPR", 2),
        "strength",
    )
}

/// タスクにワークフローを実行し、結果を反映したタスクをストアに保存する
///
/// # 引数
///
/// - `store`: 実行後のタスクを保存するストア
/// - `workflow`: 実行するワークフロー
/// - `task`: 実行対象のタスク
/// - `options`: 確認フラグ・シードなど
pub async fn execute_workflow(
    store: &mut InMemoryStore,
    workflow: Workflow,
    mut task: Task,
    options: RunOptions,
) -> TaskExecution {
    let engine = WorkflowEngine::new(workflow);
    let run = engine.run_with(&mut task, options).await;
    store.save_task(task.clone());
    TaskExecution { task, run }
}

/// デモ入力で SPR ワークフローを実行する
///
/// # 例
///
/// ```rust
/// use joinx_flow::engine::RunOptions;
/// use joinx_flow::workbench;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let execution = workbench::run_demo(RunOptions::new().with_seed(1)).await?;
///
/// // デモ入力ではリスクが常に HIGH になり、未承認なら確認ゲートで停止する
/// assert_eq!(execution.task.logs().pending_confirmation(), Some("ManualConfirm"));
/// # Ok(())
/// # }
/// ```
pub async fn run_demo(options: RunOptions) -> Result<TaskExecution, ConfigError> {
    let workflow = spr_workflow()?;
    let task = demo_task();
    info!(task_id = %task.id(), "running SPR demo");

    let mut store = InMemoryStore::new();
    Ok(execute_workflow(&mut store, workflow, task, options).await)
}
