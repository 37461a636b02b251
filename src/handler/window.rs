//! プロセスウィンドウ作成ハンドラー
//!
//! 推奨パラメータ範囲から、各パラメータの下限・上限・中心値を持つ
//! プロセスウィンドウを作成します。清浄な表面と校正済み設備を前提とします。

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::noise::NoiseSource;
use super::round_to;
use super::traits::{HandlerOutput, StepHandler, input_as};
use crate::engine::context::{ExecutionContext, keys};
use crate::error::HandlerError;

/// レジストリ上のハンドラー名
pub const NAME: &str = "process_window";

/// 1パラメータ分のウィンドウ
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowBounds {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub center: f64,
}

impl WindowBounds {
    pub fn from_range(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            center: round_to((min + max) / 2.0, 2),
        }
    }

    /// 幅（`|max - min|`）
    pub fn spread(&self) -> f64 {
        (self.max - self.min).abs()
    }
}

/// プロセスウィンドウ作成ハンドラー
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessWindowHandler;

impl ProcessWindowHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepHandler for ProcessWindowHandler {
    fn name(&self) -> &str {
        NAME
    }

    fn required_inputs(&self) -> &[&'static str] {
        &[keys::RECOMMENDED_RANGES]
    }

    fn declared_outputs(&self) -> Option<&[&'static str]> {
        Some(&[keys::PROCESS_WINDOW, keys::RISK_HIGHLIGHTS, keys::SUMMARY])
    }

    async fn invoke(
        &self,
        context: &ExecutionContext,
        _noise: &mut NoiseSource,
    ) -> Result<HandlerOutput, HandlerError> {
        let ranges: BTreeMap<String, (f64, f64)> = input_as(context, keys::RECOMMENDED_RANGES)?;

        let window: BTreeMap<String, WindowBounds> = ranges
            .into_iter()
            .map(|(param, (min, max))| (param, WindowBounds::from_range(min, max)))
            .collect();
        let window = serde_json::to_value(window).map_err(|e| HandlerError::Fault(e.to_string()))?;

        let mut output = HandlerOutput::new();
        output.insert(
            keys::SUMMARY.to_string(),
            Value::from("Process window drafted for pilot build"),
        );
        output.insert(keys::PROCESS_WINDOW.to_string(), window);
        output.insert(
            keys::RISK_HIGHLIGHTS.to_string(),
            json!([
                "Clamp force drift may reduce joint button formation",
                "Punch speed variation impacts splash and burr",
            ]),
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context_with_ranges(ranges: Value) -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        ctx.merge(
            json!({ "recommended_ranges": ranges })
                .as_object()
                .unwrap()
                .clone(),
        );
        ctx
    }

    #[test]
    fn test_window_bounds_center() {
        let bounds = WindowBounds::from_range(4.75, 5.75);
        assert_eq!(bounds.center, 5.25);
        assert_eq!(bounds.spread(), 1.0);
    }

    #[tokio::test]
    async fn test_window_from_ranges() {
        let ctx = context_with_ranges(json!({
            "clamp_force_kN": [4.75, 5.75],
            "preload_N": [1500, 2500],
        }));
        let output = ProcessWindowHandler::new()
            .invoke(&ctx, &mut NoiseSource::seeded(0))
            .await
            .unwrap();

        assert_eq!(
            output[keys::PROCESS_WINDOW],
            json!({
                "clamp_force_kN": {"min": 4.75, "max": 5.75, "center": 5.25},
                "preload_N": {"min": 1500.0, "max": 2500.0, "center": 2000.0},
            })
        );
        assert_eq!(output[keys::RISK_HIGHLIGHTS].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_ranges_give_empty_window() {
        let ctx = context_with_ranges(json!({}));
        let output = ProcessWindowHandler::new()
            .invoke(&ctx, &mut NoiseSource::seeded(0))
            .await
            .unwrap();
        assert_eq!(output[keys::PROCESS_WINDOW], json!({}));
    }

    #[tokio::test]
    async fn test_malformed_range_is_invalid_input() {
        let ctx = context_with_ranges(json!({"clamp_force_kN": [1.0]}));
        let err = ProcessWindowHandler::new()
            .invoke(&ctx, &mut NoiseSource::seeded(0))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn test_missing_ranges() {
        let err = ProcessWindowHandler::new()
            .invoke(&ExecutionContext::new(), &mut NoiseSource::seeded(0))
            .await
            .unwrap_err();
        assert_eq!(err, HandlerError::MissingInput(keys::RECOMMENDED_RANGES.to_string()));
    }
}
