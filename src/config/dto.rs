//! TOML デシリアライズ用の DTO (Data Transfer Object)
//!
//! # 責務
//!
//! このモジュールは、TOML ファイルとの入出力専用の構造体を提供します。
//! DTO はバリデーション前の「生データ」を表現し、ドメインモデルとは分離されています。
//! ハンドラーは名前（文字列）のままで保持し、実装への解決は変換時に行います。
//!
//! ## 変換フロー
//!
//! ```text
//! TOML ファイル
//!   ↓ (デシリアライズ)
//! WorkflowDto
//!   ↓ (HandlerRegistry で解決 + バリデーション)
//! Workflow (ドメインモデル)
//! ```

use serde::{Deserialize, Serialize};

use super::step::Condition;

/// ワークフロー DTO
///
/// TOML の `[workflow]` セクションと `[[steps]]` 配列をデシリアライズ/シリアライズします。
///
/// **注**: この構造体は config モジュール内部の実装詳細です。
/// 外部からは [`Workflow`](super::workflow::Workflow) を使用してください。
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct WorkflowDto {
    /// ワークフローのメタデータ
    pub(super) workflow: WorkflowMetadataDto,
    /// ステップの配列
    #[serde(default)]
    pub(super) steps: Vec<WorkflowStepDto>,
}

/// ワークフローメタデータ DTO
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct WorkflowMetadataDto {
    pub(super) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) version: Option<String>,
}

/// ワークフローステップ DTO
///
/// `when` はテーブルになり得るため最後に置きます。
#[derive(Debug, Serialize, Deserialize)]
pub(super) struct WorkflowStepDto {
    pub(super) name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) handler: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub(super) requires_confirmation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(super) when: Option<Condition>,
}

fn is_false(value: &bool) -> bool {
    !*value
}
