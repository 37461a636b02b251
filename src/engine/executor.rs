//! ワークフロー実行エンジン
//!
//! # 責務
//!
//! このモジュールは、ワークフローの実行を制御する [`WorkflowEngine`] を提供します。
//! Workflow 定義を受け取り、各ステップを宣言順に1つずつ実行し、
//! ステップ出力をコンテキストへマージしながら監査ログをタスクに記録します。
//!
//! # 実行フロー
//!
//! 1. タスク属性からコンテキストを初期化
//! 2. 各ステップについて（ループ先頭でキャンセルと期限を確認）
//!    - 実行条件が偽 → SKIPPED
//!    - 確認が必要で未承認 → AWAITING_CONFIRMATION を記録して停止
//!    - ハンドラーあり → 実行してマージ、COMPLETED（失敗なら FAILED で停止）
//!    - ハンドラーなし → COMPLETED
//! 3. 終了状態に応じてタスクのステータスを更新
//!
//! 確認待ちからの再開は、確認済みフラグを立てて `run` をステップ0から呼び直します。
//!
//! # 使用例
//!
//! ```rust
//! use joinx_flow::engine::{RunOptions, WorkflowEngine};
//! use joinx_flow::task::{Material, Structure, Task, TaskStatus};
//! use joinx_flow::workbench;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = WorkflowEngine::new(workbench::spr_workflow()?);
//!     let mut task = Task::new(Material::new("Al/Steel", 1.5), Structure::new("SPR", 2), "strength");
//!
//!     let run = engine.run_with(&mut task, RunOptions::new().confirmed().with_seed(7)).await;
//!
//!     assert!(run.outcome.is_finished());
//!     assert_eq!(task.status(), TaskStatus::Completed);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::step::StepDefinition;
use crate::config::workflow::Workflow;
use crate::engine::audit::AuditEntry;
use crate::engine::context::ExecutionContext;
use crate::engine::result::{ExecutionError, Interruption, RunOutcome, WorkflowRun};
use crate::error::ConfigError;
use crate::handler::{HandlerOutput, NoiseSource};
use crate::task::Task;

/// 1回の実行に対するオプション
///
/// # 例
///
/// ```rust
/// use std::time::Duration;
/// use joinx_flow::engine::RunOptions;
///
/// let options = RunOptions::new()
///     .confirmed()
///     .with_seed(42)
///     .with_deadline(Duration::from_secs(30));
/// assert!(options.confirmation_granted);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// 確認ゲートを通過してよいか
    pub confirmation_granted: bool,
    /// 乱数のシード（未指定なら OS のエントロピー）
    pub seed: Option<u64>,
    /// 実行開始からの期限
    pub deadline: Option<Duration>,
    /// 外部からのキャンセル
    pub cancellation: Option<CancellationToken>,
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirmed(mut self) -> Self {
        self.confirmation_granted = true;
        self
    }

    pub fn with_confirmation(mut self, granted: bool) -> Self {
        self.confirmation_granted = granted;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    fn noise(&self) -> NoiseSource {
        match self.seed {
            Some(seed) => NoiseSource::seeded(seed),
            None => NoiseSource::from_entropy(),
        }
    }
}

/// ワークフロー実行エンジン
///
/// 不変のワークフロー定義だけを保持するため、複数の実行で再利用できます。
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    workflow: Workflow,
}

impl WorkflowEngine {
    /// 新しいエンジンを生成
    pub fn new(workflow: Workflow) -> Self {
        Self { workflow }
    }

    /// ステップ列から直接エンジンを生成
    ///
    /// # エラー
    ///
    /// ステップ名が空・重複している場合、またはワークフロー名が空の場合
    pub fn from_steps(
        name: impl Into<String>,
        steps: Vec<StepDefinition>,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(Workflow::new(name, steps)?))
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// ワークフローを実行
    ///
    /// # 引数
    ///
    /// - `task`: 監査ログ・ステータス・ステージが更新されるタスク
    /// - `confirmation_granted`: 確認ゲートを通過してよいか
    ///
    /// # 戻り値
    ///
    /// 最終コンテキストと終了状態。失敗しても `Err` にはならず、
    /// [`RunOutcome::Failed`] と監査ログの FAILED エントリで表されます。
    pub async fn run(&self, task: &mut Task, confirmation_granted: bool) -> WorkflowRun {
        self.run_with(task, RunOptions::new().with_confirmation(confirmation_granted))
            .await
    }

    /// オプションを指定してワークフローを実行
    pub async fn run_with(&self, task: &mut Task, options: RunOptions) -> WorkflowRun {
        let started = Instant::now();
        let deadline = options.deadline.and_then(|d| started.checked_add(d));
        let mut noise = options.noise();
        let mut context = ExecutionContext::from_task(task);

        info!(
            workflow = %self.workflow.name(),
            task_id = %task.id(),
            steps = self.workflow.steps().len(),
            confirmation_granted = options.confirmation_granted,
            "workflow run started"
        );

        let mut outcome = RunOutcome::Finished;
        let mut error = None;

        for step in self.workflow.steps() {
            if let Some(reason) = interruption(&options, deadline) {
                warn!(step = %step.name(), %reason, "workflow run interrupted");
                outcome = RunOutcome::Interrupted {
                    next_step: step.name().to_string(),
                    reason,
                };
                error = Some(ExecutionError::Interrupted {
                    next_step: step.name().to_string(),
                    reason,
                });
                break;
            }

            if !step.should_run(&context) {
                debug!(step = %step.name(), "step skipped");
                task.record(AuditEntry::skipped(step.name()));
                continue;
            }

            if step.is_confirmation_required() && !options.confirmation_granted {
                info!(step = %step.name(), "manual confirmation required");
                task.record(AuditEntry::awaiting_confirmation(step.name()));
                outcome = RunOutcome::AwaitingConfirmation {
                    step: step.name().to_string(),
                };
                break;
            }

            if step.handler().is_none() {
                debug!(step = %step.name(), "step completed without handler");
                task.record(AuditEntry::completed(step.name(), None));
                continue;
            }

            match self.invoke_step(step, &context, &mut noise).await {
                Ok(output) => {
                    debug!(step = %step.name(), keys = output.len(), "step completed");
                    context.merge(output.clone());
                    task.record(AuditEntry::completed(step.name(), Some(output)));
                    task.set_workflow_stage(step.name());
                }
                Err(e) => {
                    warn!(step = %step.name(), error = %e, "step failed");
                    task.record(AuditEntry::failed(step.name(), e.to_string()));
                    outcome = RunOutcome::Failed {
                        step: step.name().to_string(),
                        reason: e.to_string(),
                    };
                    error = Some(e);
                    break;
                }
            }
        }

        task.set_status(outcome.task_status());
        let duration = started.elapsed();

        info!(
            workflow = %self.workflow.name(),
            task_id = %task.id(),
            outcome = %outcome,
            status = %task.status(),
            stage = %task.workflow_stage(),
            duration_ms = duration.as_millis() as u64,
            "workflow run finished"
        );

        WorkflowRun {
            workflow_name: self.workflow.name().to_string(),
            outcome,
            context,
            duration,
            error,
        }
    }

    /// ハンドラーを1回呼び出す（プライベートメソッド）
    ///
    /// 必須入力の確認、タイムアウト付き実行、出力キーの検証を行います。
    async fn invoke_step(
        &self,
        step: &StepDefinition,
        context: &ExecutionContext,
        noise: &mut NoiseSource,
    ) -> Result<HandlerOutput, ExecutionError> {
        let Some(handler) = step.handler() else {
            return Ok(HandlerOutput::new());
        };

        if let Some(key) = handler
            .required_inputs()
            .iter()
            .find(|key| !context.contains_key(key))
        {
            return Err(ExecutionError::MissingInput {
                step: step.name().to_string(),
                key: key.to_string(),
            });
        }

        let invocation = handler.invoke(context, noise);
        let result = match step.timeout() {
            Some(timeout_secs) => {
                match tokio::time::timeout(Duration::from_secs(timeout_secs), invocation).await {
                    Ok(result) => result,
                    Err(_) => {
                        return Err(ExecutionError::TimeoutError {
                            step_name: step.name().to_string(),
                            timeout_secs,
                        });
                    }
                }
            }
            None => invocation.await,
        };

        let output = result.map_err(|source| ExecutionError::HandlerFault {
            step: step.name().to_string(),
            source,
        })?;

        if let Some(declared) = handler.declared_outputs()
            && let Some(key) = output.keys().find(|key| !declared.contains(&key.as_str()))
        {
            return Err(ExecutionError::UndeclaredOutput {
                step: step.name().to_string(),
                key: key.clone(),
            });
        }

        Ok(output)
    }
}

/// ループ先頭での中断判定（キャンセルを期限より優先）
fn interruption(options: &RunOptions, deadline: Option<Instant>) -> Option<Interruption> {
    if options
        .cancellation
        .as_ref()
        .is_some_and(CancellationToken::is_cancelled)
    {
        return Some(Interruption::Cancelled);
    }
    if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
        return Some(Interruption::DeadlineExceeded);
    }
    None
}
