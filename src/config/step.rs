//! ワークフローステップの定義
//!
//! # 責務
//!
//! Workflow を構成するステップの定義体 [`StepDefinition`] と、
//! ステップを実行するかどうかを決める実行条件 [`Condition`] を提供するモジュール。
//!
//! # 評価順序
//!
//! エンジンは各ステップについて次の順で判定します。
//!
//! 1. 実行条件（偽なら SKIPPED）
//! 2. 確認ゲート（未承認なら AWAITING_CONFIRMATION で停止）
//! 3. ハンドラー呼び出し

use std::fmt;
use std::ops::Not;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::context::ExecutionContext;
use crate::handler::StepHandler;

/// ステップの実行条件
///
/// 閉じた列挙型のため TOML に直接書けます。評価は副作用を持たず、
/// 同じコンテキストに対して常に同じ結果を返します。
///
/// ```toml
/// when = "always"
/// when = { key_present = "recommended_ranges" }
/// when = { field_equals = { key = "risk_level", value = "HIGH" } }
/// when = { not = { key_present = "x" } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// 常に実行
    Always,
    /// 常にスキップ
    Never,
    /// キーがコンテキストに存在すれば実行
    KeyPresent(String),
    /// キーの値が一致すれば実行
    ///
    /// 数値同士は整数・浮動小数の区別なく値で比較します（`0` と `0.0` は一致）。
    FieldEquals { key: String, value: Value },
    /// 条件の否定
    Not(Box<Condition>),
}

impl Condition {
    pub fn key_present(key: impl Into<String>) -> Self {
        Condition::KeyPresent(key.into())
    }

    pub fn field_equals(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Condition::FieldEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    /// コンテキストに対して条件を評価する
    ///
    /// # 例
    ///
    /// ```rust
    /// use joinx_flow::config::step::Condition;
    /// use joinx_flow::engine::ExecutionContext;
    ///
    /// let ctx = ExecutionContext::new();
    /// assert!(Condition::Always.evaluate(&ctx));
    /// assert!(!Condition::key_present("risk_level").evaluate(&ctx));
    /// assert!((!Condition::key_present("risk_level")).evaluate(&ctx));
    /// ```
    pub fn evaluate(&self, context: &ExecutionContext) -> bool {
        match self {
            Condition::Always => true,
            Condition::Never => false,
            Condition::KeyPresent(key) => context.contains_key(key),
            Condition::FieldEquals { key, value } => context
                .get(key)
                .is_some_and(|actual| values_match(actual, value)),
            Condition::Not(inner) => !inner.evaluate(context),
        }
    }
}

fn values_match(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => a == b || a.as_f64() == b.as_f64(),
        _ => actual == expected,
    }
}

impl Not for Condition {
    type Output = Condition;

    fn not(self) -> Self::Output {
        Condition::Not(Box::new(self))
    }
}

/// ワークフローステップ（ドメインモデル）
///
/// 構築後は変更されません。ハンドラーも確認フラグも持たないステップは
/// マーカーとして COMPLETED だけが記録されます。
///
/// # 例
///
/// ```rust
/// use std::sync::Arc;
/// use joinx_flow::config::step::{Condition, StepDefinition};
/// use joinx_flow::handler::window::ProcessWindowHandler;
///
/// let step = StepDefinition::new("ProcessWindow")
///     .with_handler(Arc::new(ProcessWindowHandler::new()))
///     .when(Condition::key_present("recommended_ranges"))
///     .with_timeout(30);
///
/// assert_eq!(step.handler_name(), Some("process_window"));
/// assert!(!step.is_confirmation_required());
/// ```
#[derive(Clone)]
pub struct StepDefinition {
    name: String,
    handler: Option<Arc<dyn StepHandler>>,
    condition: Option<Condition>,
    requires_confirmation: bool,
    timeout: Option<u64>,
}

impl StepDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: None,
            condition: None,
            requires_confirmation: false,
            timeout: None,
        }
    }

    pub fn with_handler(mut self, handler: Arc<dyn StepHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// 実行条件を設定（偽のときステップはスキップされる）
    pub fn when(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    pub fn with_confirmation_required(mut self) -> Self {
        self.requires_confirmation = true;
        self
    }

    /// ハンドラー呼び出しのタイムアウト（秒）を設定
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout = Some(timeout_secs);
        self
    }

    pub(super) fn set_requires_confirmation(mut self, value: bool) -> Self {
        self.requires_confirmation = value;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> Option<&Arc<dyn StepHandler>> {
        self.handler.as_ref()
    }

    pub fn handler_name(&self) -> Option<&str> {
        self.handler.as_deref().map(|h| h.name())
    }

    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    pub fn is_confirmation_required(&self) -> bool {
        self.requires_confirmation
    }

    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    /// このステップを実行すべきか
    ///
    /// 条件が無い場合は常に `true` です。
    pub fn should_run(&self, context: &ExecutionContext) -> bool {
        self.condition
            .as_ref()
            .is_none_or(|condition| condition.evaluate(context))
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("name", &self.name)
            .field("handler", &self.handler_name())
            .field("condition", &self.condition)
            .field("requires_confirmation", &self.requires_confirmation)
            .field("timeout", &self.timeout)
            .finish()
    }
}
