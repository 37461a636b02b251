//! SPR 工程開発タスクの定義
//!
//! # 責務
//!
//! - ワークフロー実行の所有者となる [`Task`] レコードの定義
//! - タスクの入力（材料・継手構造・目標）の型定義
//! - TOML 形式のタスク定義ファイル（[`TaskRequest`]）の読み込み
//!
//! エンジンが書き換えるのは `status` / `workflow_stage` / `logs` の3フィールドのみです。

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::engine::audit::{AuditEntry, AuditLog};
use crate::error::ConfigError;

/// 実行前の初期ステージ名
pub const INITIAL_STAGE: &str = "INIT";

/// 材料情報
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// 材料の組み合わせ（例: "Al/Steel"）
    pub material_pair: String,
    /// 板厚 [mm]
    pub sheet_thickness_mm: f64,
}

impl Material {
    pub fn new(material_pair: impl Into<String>, sheet_thickness_mm: f64) -> Self {
        Self {
            material_pair: material_pair.into(),
            sheet_thickness_mm,
        }
    }

    /// コンテキストに格納する JSON 値へ変換
    pub fn to_value(&self) -> Value {
        json!({
            "material_pair": self.material_pair,
            "sheet_thickness_mm": self.sheet_thickness_mm,
        })
    }
}

/// 継手構造
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    /// 継手の種類（例: "SPR"）
    pub joint_type: String,
    /// 積層枚数
    pub stack_layers: u32,
}

impl Structure {
    pub fn new(joint_type: impl Into<String>, stack_layers: u32) -> Self {
        Self {
            joint_type: joint_type.into(),
            stack_layers,
        }
    }

    /// コンテキストに格納する JSON 値へ変換
    pub fn to_value(&self) -> Value {
        json!({
            "joint_type": self.joint_type,
            "stack_layers": self.stack_layers,
        })
    }
}

/// タスクのステータス
///
/// `Completed` は「エンジンがこの呼び出しの処理を終えた」ことを意味し、
/// 全ステップが実行されたことは意味しません。確認待ちで停止した場合も
/// `Completed` になるため、保留中かどうかは監査ログの最後のエントリで判定します。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// 作成直後（未実行）
    Created,
    /// エンジンの処理が終了
    Completed,
    /// ハンドラーの失敗により中断
    Failed,
    /// キャンセルまたは期限切れにより中断
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Created => "CREATED",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SPR 工程開発タスク
///
/// ワークフロー実行の監査ログとステータスを所有します。
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    id: String,
    material: Material,
    structure: Structure,
    target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    variability: Option<f64>,
    status: TaskStatus,
    workflow_stage: String,
    logs: AuditLog,
}

impl Task {
    /// UUID v4 の ID を採番してタスクを生成
    pub fn new(material: Material, structure: Structure, target: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), material, structure, target)
    }

    /// ID を指定してタスクを生成
    pub fn with_id(
        id: impl Into<String>,
        material: Material,
        structure: Structure,
        target: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            material,
            structure,
            target: target.into(),
            variability: None,
            status: TaskStatus::Created,
            workflow_stage: INITIAL_STAGE.to_string(),
            logs: AuditLog::new(),
        }
    }

    /// リスク評価で使用するばらつき係数を設定
    pub fn with_variability(mut self, variability: f64) -> Self {
        self.variability = Some(variability);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn variability(&self) -> Option<f64> {
        self.variability
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    /// 最後にハンドラーが実行されたステップ名（未実行なら `INIT`）
    pub fn workflow_stage(&self) -> &str {
        &self.workflow_stage
    }

    /// 監査ログ
    pub fn logs(&self) -> &AuditLog {
        &self.logs
    }

    /// JSON 形式でシリアライズ
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub(crate) fn record(&mut self, entry: AuditEntry) {
        self.logs.append(entry);
    }

    pub(crate) fn set_status(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub(crate) fn set_workflow_stage(&mut self, stage: &str) {
        self.workflow_stage = stage.to_string();
    }
}

/// タスク定義ファイル
///
/// ```toml
/// target = "strength"
/// variability = 0.1
///
/// [material]
/// material_pair = "Al/Steel"
/// sheet_thickness_mm = 1.5
///
/// [structure]
/// joint_type = "SPR"
/// stack_layers = 2
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    /// タスク ID（省略時は UUID v4 を採番）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variability: Option<f64>,
    pub material: Material,
    pub structure: Structure,
}

impl TaskRequest {
    /// TOML ファイルから読み込む
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// TOML 文字列から読み込む
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let request: TaskRequest = toml::from_str(toml)?;
        request.validate()?;
        Ok(request)
    }

    /// タスクへ変換
    pub fn into_task(self) -> Task {
        let task = match self.id {
            Some(id) => Task::with_id(id, self.material, self.structure, self.target),
            None => Task::new(self.material, self.structure, self.target),
        };
        match self.variability {
            Some(v) => task.with_variability(v),
            None => task,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.target.trim().is_empty() {
            return Err(ConfigError::Validation("target が空です".to_string()));
        }
        let thickness = self.material.sheet_thickness_mm;
        if !thickness.is_finite() || thickness <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "sheet_thickness_mm は正の値である必要があります: {}",
                thickness
            )));
        }
        if let Some(v) = self.variability
            && (!v.is_finite() || v < 0.0)
        {
            return Err(ConfigError::Validation(format!(
                "variability は0以上である必要があります: {}",
                v
            )));
        }
        Ok(())
    }
}
