//! 監査ログの型定義
//!
//! # 責務
//!
//! - 訪問したステップごとの結果を表す [`AuditEntry`] の定義
//! - ステップ結果の種別 [`AuditOutcome`] の定義
//! - 追記専用のエントリ列 [`AuditLog`] の提供
//!
//! # JSON 形式
//!
//! ```json
//! {"step": "ProcessWindow", "status": "COMPLETED", "result": {"process_window": {}}}
//! {"step": "ManualConfirm", "status": "AWAITING_CONFIRMATION", "detail": "Manual confirmation required"}
//! ```
//!
//! `result` と `detail` は値がある場合のみ出力されます。

use serde::Serialize;
use serde_json::{Map, Value};

/// 確認待ちで停止したときに記録する固定メッセージ
pub const CONFIRMATION_REQUIRED_DETAIL: &str = "Manual confirmation required";

/// ステップの結果種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditOutcome {
    /// 実行条件を満たさずスキップ
    Skipped,
    /// 完了（ハンドラーなしのマーカーステップを含む）
    Completed,
    /// 外部からの確認待ちで停止
    AwaitingConfirmation,
    /// ハンドラーの失敗で停止
    Failed,
}

impl AuditOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditOutcome::Skipped => "SKIPPED",
            AuditOutcome::Completed => "COMPLETED",
            AuditOutcome::AwaitingConfirmation => "AWAITING_CONFIRMATION",
            AuditOutcome::Failed => "FAILED",
        }
    }
}

/// 監査エントリ
///
/// 訪問したステップ1つにつき1件、ステップ順に追記されます。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    /// ステップ名
    pub step: String,

    /// 結果種別
    pub status: AuditOutcome,

    /// ハンドラーの出力（ハンドラーが完了した場合のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Map<String, Value>>,

    /// 補足メッセージ（確認待ち・失敗時）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl AuditEntry {
    pub fn skipped(step: impl Into<String>) -> Self {
        Self::bare(step, AuditOutcome::Skipped)
    }

    /// 完了エントリ。ハンドラーのないステップは `result` を `None` にします。
    pub fn completed(step: impl Into<String>, result: Option<Map<String, Value>>) -> Self {
        Self {
            result,
            ..Self::bare(step, AuditOutcome::Completed)
        }
    }

    pub fn awaiting_confirmation(step: impl Into<String>) -> Self {
        Self {
            detail: Some(CONFIRMATION_REQUIRED_DETAIL.to_string()),
            ..Self::bare(step, AuditOutcome::AwaitingConfirmation)
        }
    }

    pub fn failed(step: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            ..Self::bare(step, AuditOutcome::Failed)
        }
    }

    fn bare(step: impl Into<String>, status: AuditOutcome) -> Self {
        Self {
            step: step.into(),
            status,
            result: None,
            detail: None,
        }
    }
}

/// 追記専用の監査ログ
///
/// エントリの削除・書き換え手段は提供しません。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, entry: AuditEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.last()
    }

    /// 全エントリの結果種別（記録順）
    pub fn outcomes(&self) -> Vec<AuditOutcome> {
        self.entries.iter().map(|e| e.status).collect()
    }

    /// 確認待ちで停止している場合、そのステップ名を返す
    ///
    /// タスクの `status` は確認待ちでも `COMPLETED` になるため、
    /// 保留中の判定にはこのメソッドを使用してください。
    pub fn pending_confirmation(&self) -> Option<&str> {
        self.entries
            .last()
            .filter(|e| e.status == AuditOutcome::AwaitingConfirmation)
            .map(|e| e.step.as_str())
    }

    /// 指定ステップの最新エントリ
    pub fn find(&self, step: &str) -> Option<&AuditEntry> {
        self.entries.iter().rev().find(|e| e.step == step)
    }

    /// JSON 形式でシリアライズ
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl<'a> IntoIterator for &'a AuditLog {
    type Item = &'a AuditEntry;
    type IntoIter = std::slice::Iter<'a, AuditEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_serialization_omits_empty_fields() {
        let entry = AuditEntry::skipped("ProcessWindow");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"step": "ProcessWindow", "status": "SKIPPED"})
        );

        let entry = AuditEntry::completed("FinalizeProcessPlan", None);
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"step": "FinalizeProcessPlan", "status": "COMPLETED"})
        );
    }

    #[test]
    fn test_entry_serialization_with_payload() {
        let result = json!({"x": 1}).as_object().unwrap().clone();
        let entry = AuditEntry::completed("A", Some(result));
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"step": "A", "status": "COMPLETED", "result": {"x": 1}})
        );
    }

    #[test]
    fn test_awaiting_confirmation_has_fixed_detail() {
        let entry = AuditEntry::awaiting_confirmation("ManualConfirm");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "step": "ManualConfirm",
                "status": "AWAITING_CONFIRMATION",
                "detail": "Manual confirmation required"
            })
        );
    }

    #[test]
    fn test_log_is_ordered() {
        let mut log = AuditLog::new();
        log.append(AuditEntry::completed("A", None));
        log.append(AuditEntry::skipped("B"));
        log.append(AuditEntry::failed("C", "boom"));

        assert_eq!(log.len(), 3);
        assert_eq!(
            log.outcomes(),
            vec![AuditOutcome::Completed, AuditOutcome::Skipped, AuditOutcome::Failed]
        );
        assert_eq!(log.last().unwrap().detail.as_deref(), Some("boom"));
        assert_eq!(log.iter().map(|e| e.step.as_str()).collect::<Vec<_>>(), ["A", "B", "C"]);
    }

    #[test]
    fn test_pending_confirmation() {
        let mut log = AuditLog::new();
        assert_eq!(log.pending_confirmation(), None);

        log.append(AuditEntry::completed("A", None));
        assert_eq!(log.pending_confirmation(), None);

        log.append(AuditEntry::awaiting_confirmation("Gate"));
        assert_eq!(log.pending_confirmation(), Some("Gate"));
    }

    #[test]
    fn test_find_returns_latest_entry() {
        let mut log = AuditLog::new();
        log.append(AuditEntry::awaiting_confirmation("Gate"));
        log.append(AuditEntry::completed("Gate", None));
        assert_eq!(log.find("Gate").unwrap().status, AuditOutcome::Completed);
        assert!(log.find("Missing").is_none());
    }

    #[test]
    fn test_log_serializes_as_array() {
        let mut log = AuditLog::new();
        log.append(AuditEntry::skipped("A"));
        assert_eq!(
            serde_json::to_value(&log).unwrap(),
            json!([{"step": "A", "status": "SKIPPED"}])
        );
    }
}
