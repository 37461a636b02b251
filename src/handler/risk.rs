//! リスク評価ハンドラー
//!
//! # 責務
//!
//! - プロセスウィンドウの広がりから、計画のリスクレベルを粗く判定
//! - 判定根拠（rationale）の付与
//!
//! # 判定表
//!
//! `score = spread × (1 + U(0, variability))`、`spread` は各パラメータ幅の合計
//! （合計が0の場合は1）。`variability` はコンテキストにあればその値、なければ 0.1。
//!
//! | score | risk_level |
//! |---|---|
//! | > 50 | HIGH |
//! | > 25 | MEDIUM |
//! | それ以外 | LOW |
//!
//! ヒューリスティックのみを用いるため、量産判断には使用できません。

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::noise::NoiseSource;
use super::traits::{HandlerOutput, StepHandler, input_as};
use super::window::WindowBounds;
use crate::engine::context::{ExecutionContext, keys};
use crate::error::HandlerError;

/// レジストリ上のハンドラー名
pub const NAME: &str = "risk_evaluation";

// 判定しきい値
const HIGH_RISK_THRESHOLD: f64 = 50.0;
const MEDIUM_RISK_THRESHOLD: f64 = 25.0;

/// `variability` が未設定の場合の既定値
pub const DEFAULT_VARIABILITY: f64 = 0.1;

/// リスクレベル
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// スコアからリスクレベルを判定する
    ///
    /// ```rust
    /// use joinx_flow::handler::risk::RiskLevel;
    ///
    /// assert_eq!(RiskLevel::classify(51.0), RiskLevel::High);
    /// assert_eq!(RiskLevel::classify(50.0), RiskLevel::Medium);
    /// assert_eq!(RiskLevel::classify(25.0), RiskLevel::Low);
    /// ```
    pub fn classify(score: f64) -> Self {
        if score > HIGH_RISK_THRESHOLD {
            RiskLevel::High
        } else if score > MEDIUM_RISK_THRESHOLD {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }

    fn rationale(&self) -> &'static str {
        match self {
            RiskLevel::High => "High parameter spread",
            RiskLevel::Medium | RiskLevel::Low => "Within pilot tolerance",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// リスク評価ハンドラー
#[derive(Debug, Default, Clone, Copy)]
pub struct RiskEvaluationHandler;

impl RiskEvaluationHandler {
    pub fn new() -> Self {
        Self
    }

    fn variability(context: &ExecutionContext) -> Result<f64, HandlerError> {
        match context.get(keys::VARIABILITY) {
            None => Ok(DEFAULT_VARIABILITY),
            Some(value) => value.as_f64().ok_or_else(|| HandlerError::InvalidInput {
                key: keys::VARIABILITY.to_string(),
                reason: format!("数値ではありません: {}", value),
            }),
        }
    }
}

#[async_trait]
impl StepHandler for RiskEvaluationHandler {
    fn name(&self) -> &str {
        NAME
    }

    fn required_inputs(&self) -> &[&'static str] {
        &[keys::PROCESS_WINDOW]
    }

    fn declared_outputs(&self) -> Option<&[&'static str]> {
        Some(&[keys::RISK_LEVEL, keys::RATIONALE, keys::SUMMARY])
    }

    async fn invoke(
        &self,
        context: &ExecutionContext,
        noise: &mut NoiseSource,
    ) -> Result<HandlerOutput, HandlerError> {
        let window: BTreeMap<String, WindowBounds> = input_as(context, keys::PROCESS_WINDOW)?;
        let variability = Self::variability(context)?;

        let spread: f64 = window.values().map(WindowBounds::spread).sum();
        let spread = if spread == 0.0 { 1.0 } else { spread };
        let score = spread * (1.0 + noise.uniform(0.0, variability));
        let level = RiskLevel::classify(score);

        tracing::debug!(spread, score, level = %level, "risk evaluated");

        let mut output = HandlerOutput::new();
        output.insert(keys::SUMMARY.to_string(), Value::from("Risk evaluated for release"));
        output.insert(keys::RISK_LEVEL.to_string(), Value::from(level.as_str()));
        output.insert(keys::RATIONALE.to_string(), Value::from(level.rationale()));
        Ok(output)
    }
}
