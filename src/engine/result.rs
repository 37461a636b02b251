//! ワークフロー実行結果の型定義
//!
//! # 責務
//!
//! - 実行結果 [`WorkflowRun`] の型定義
//! - 実行の終了状態 [`RunOutcome`] と中断理由 [`Interruption`] の型定義
//! - 実行エラー [`ExecutionError`] の型定義
//!
//! # 使用例
//!
//! ```rust,no_run
//! use joinx_flow::engine::result::{RunOutcome, WorkflowRun};
//!
//! fn handle_run(run: WorkflowRun) {
//!     match &run.outcome {
//!         RunOutcome::Finished => println!("全ステップを処理しました"),
//!         RunOutcome::AwaitingConfirmation { step } => println!("'{}' で確認待ち", step),
//!         RunOutcome::Failed { step, reason } => println!("'{}' で失敗: {}", step, reason),
//!         RunOutcome::Interrupted { next_step, reason } => {
//!             println!("'{}' の手前で中断: {}", next_step, reason)
//!         }
//!     }
//! }
//! ```

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::engine::context::ExecutionContext;
use crate::error::HandlerError;
use crate::task::TaskStatus;

/// 実行の終了状態
///
/// タスクの `status` フィールドとは独立して、エンジンがこの呼び出しで
/// どこまで進んだかを明示的に表します。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// 最後のステップまで処理した
    Finished,

    /// 確認が必要なステップで停止した
    AwaitingConfirmation {
        /// 確認待ちのステップ名
        step: String,
    },

    /// ハンドラーの失敗で停止した
    Failed {
        /// 失敗したステップ名
        step: String,
        /// 失敗理由
        reason: String,
    },

    /// キャンセルまたは期限切れで、ステップ境界で停止した
    Interrupted {
        /// 未訪問のまま残った最初のステップ名
        next_step: String,
        /// 中断理由
        reason: Interruption,
    },
}

impl RunOutcome {
    /// この終了状態に対応するタスクのステータス
    ///
    /// 確認待ちでの停止も `Completed` とします。
    pub fn task_status(&self) -> TaskStatus {
        match self {
            RunOutcome::Finished | RunOutcome::AwaitingConfirmation { .. } => TaskStatus::Completed,
            RunOutcome::Failed { .. } => TaskStatus::Failed,
            RunOutcome::Interrupted { .. } => TaskStatus::Cancelled,
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, RunOutcome::Finished)
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        matches!(self, RunOutcome::AwaitingConfirmation { .. })
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Finished => write!(f, "finished"),
            RunOutcome::AwaitingConfirmation { step } => {
                write!(f, "awaiting confirmation at '{}'", step)
            }
            RunOutcome::Failed { step, reason } => write!(f, "failed at '{}': {}", step, reason),
            RunOutcome::Interrupted { next_step, reason } => {
                write!(f, "{} before '{}'", reason, next_step)
            }
        }
    }
}

/// ステップ境界での中断理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Interruption {
    /// キャンセルトークンが発火した
    Cancelled,
    /// 実行期限を過ぎた
    DeadlineExceeded,
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::Cancelled => f.write_str("cancelled"),
            Interruption::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// ワークフロー実行結果
///
/// 最終コンテキストと終了状態を保持します。監査ログはタスク側に記録されます。
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRun {
    /// ワークフロー名
    pub workflow_name: String,

    /// 終了状態
    pub outcome: RunOutcome,

    /// 最終コンテキスト
    pub context: ExecutionContext,

    /// 実行時間
    pub duration: Duration,

    /// 失敗・中断の原因（該当する場合のみ）
    #[serde(skip)]
    pub error: Option<ExecutionError>,
}

impl WorkflowRun {
    /// 結果を JSON 形式でシリアライズ
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// `Result` に変換
    ///
    /// 失敗・中断時はその原因を `Err` で返します。
    /// 確認待ちは失敗ではないため `Ok` になります。
    pub fn into_result(self) -> Result<ExecutionContext, ExecutionError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.context),
        }
    }
}

/// 実行エラー
///
/// ステップ実行中に発生し、FAILED エントリとして記録されるエラーです。
#[derive(Debug, Clone, Error)]
pub enum ExecutionError {
    /// 必須入力の欠落
    #[error("ステップ '{step}' の必須入力 '{key}' がコンテキストに存在しません")]
    MissingInput {
        /// ステップ名
        step: String,
        /// 欠落していたキー
        key: String,
    },

    /// ハンドラーの失敗
    #[error("ステップ '{step}' のハンドラーが失敗しました: {source}")]
    HandlerFault {
        /// ステップ名
        step: String,
        /// ハンドラーのエラー
        #[source]
        source: HandlerError,
    },

    /// 宣言されていない出力キー
    #[error("ステップ '{step}' が宣言されていないキー '{key}' を出力しました")]
    UndeclaredOutput {
        /// ステップ名
        step: String,
        /// 宣言外のキー
        key: String,
    },

    /// タイムアウト
    #[error("タイムアウト: ステップ '{step_name}' が {timeout_secs}秒以内に完了しませんでした")]
    TimeoutError {
        /// タイムアウトしたステップ名
        step_name: String,
        /// タイムアウト時間（秒）
        timeout_secs: u64,
    },

    /// ステップ境界での中断
    #[error("ステップ '{next_step}' の実行前に中断しました: {reason}")]
    Interrupted {
        /// 未訪問のステップ名
        next_step: String,
        /// 中断理由
        reason: Interruption,
    },
}

impl ExecutionError {
    /// エラーが発生した（または中断直前の）ステップ名
    pub fn step_name(&self) -> &str {
        match self {
            ExecutionError::MissingInput { step, .. }
            | ExecutionError::HandlerFault { step, .. }
            | ExecutionError::UndeclaredOutput { step, .. } => step,
            ExecutionError::TimeoutError { step_name, .. } => step_name,
            ExecutionError::Interrupted { next_step, .. } => next_step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_task_status() {
        assert_eq!(RunOutcome::Finished.task_status(), TaskStatus::Completed);
        assert_eq!(
            RunOutcome::AwaitingConfirmation { step: "Gate".to_string() }.task_status(),
            TaskStatus::Completed
        );
        assert_eq!(
            RunOutcome::Failed {
                step: "A".to_string(),
                reason: "boom".to_string()
            }
            .task_status(),
            TaskStatus::Failed
        );
        assert_eq!(
            RunOutcome::Interrupted {
                next_step: "B".to_string(),
                reason: Interruption::Cancelled
            }
            .task_status(),
            TaskStatus::Cancelled
        );
    }

    #[test]
    fn test_outcome_serialization() {
        assert_eq!(
            serde_json::to_value(RunOutcome::Finished).unwrap(),
            json!({"kind": "finished"})
        );
        assert_eq!(
            serde_json::to_value(RunOutcome::Interrupted {
                next_step: "B".to_string(),
                reason: Interruption::DeadlineExceeded,
            })
            .unwrap(),
            json!({"kind": "interrupted", "next_step": "B", "reason": "deadline_exceeded"})
        );
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            RunOutcome::AwaitingConfirmation { step: "Gate".to_string() }.to_string(),
            "awaiting confirmation at 'Gate'"
        );
        assert_eq!(
            RunOutcome::Interrupted {
                next_step: "B".to_string(),
                reason: Interruption::Cancelled,
            }
            .to_string(),
            "cancelled before 'B'"
        );
    }

    #[test]
    fn test_into_result() {
        let ok = WorkflowRun {
            workflow_name: "wf".to_string(),
            outcome: RunOutcome::AwaitingConfirmation { step: "Gate".to_string() },
            context: ExecutionContext::new(),
            duration: Duration::from_millis(1),
            error: None,
        };
        assert!(ok.into_result().is_ok());

        let err = WorkflowRun {
            workflow_name: "wf".to_string(),
            outcome: RunOutcome::Failed {
                step: "A".to_string(),
                reason: "boom".to_string(),
            },
            context: ExecutionContext::new(),
            duration: Duration::from_millis(1),
            error: Some(ExecutionError::HandlerFault {
                step: "A".to_string(),
                source: HandlerError::Fault("boom".to_string()),
            }),
        };
        let err = err.into_result().unwrap_err();
        assert_eq!(err.step_name(), "A");
    }

    #[test]
    fn test_execution_error_messages() {
        let err = ExecutionError::MissingInput {
            step: "ProcessWindow".to_string(),
            key: "recommended_ranges".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "ステップ 'ProcessWindow' の必須入力 'recommended_ranges' がコンテキストに存在しません"
        );

        let err = ExecutionError::TimeoutError {
            step_name: "long_running_step".to_string(),
            timeout_secs: 300,
        };
        assert_eq!(
            err.to_string(),
            "タイムアウト: ステップ 'long_running_step' が 300秒以内に完了しませんでした"
        );

        let err = ExecutionError::HandlerFault {
            step: "Risk".to_string(),
            source: HandlerError::Fault("計算不能".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "ステップ 'Risk' のハンドラーが失敗しました: ハンドラーの処理に失敗しました: 計算不能"
        );
    }
}
