//! パラメータ範囲推奨ハンドラー
//!
//! # 責務
//!
//! - 材料・継手構造・目標から SPR の試験パラメータ範囲を推奨
//! - データが少ない場合の経験則に基づく範囲設定
//!
//! # 算出式
//!
//! | パラメータ | 中心値 | 幅 |
//! |---|---|---|
//! | `clamp_force_kN` | 板厚 × 3.5 + U(-0.2, 0.2) | ±0.5（小数2桁） |
//! | `punch_speed_mm_s` | 積層数 × 50 + U(-5, 5) | ±10（小数1桁） |
//! | `preload_N` | 目標が strength なら 1500–2500、それ以外は 1200–1800 | 固定 |

use async_trait::async_trait;
use serde_json::{Value, json};

use super::noise::NoiseSource;
use super::round_to;
use super::traits::{HandlerOutput, StepHandler, input_as};
use crate::engine::context::{ExecutionContext, keys};
use crate::error::HandlerError;
use crate::task::{Material, Structure};

/// レジストリ上のハンドラー名
pub const NAME: &str = "parameter_recommendation";

const CLAMP_FORCE_PER_MM: f64 = 3.5;
const CLAMP_FORCE_NOISE: f64 = 0.2;
const CLAMP_FORCE_HALF_WIDTH: f64 = 0.5;

const PUNCH_SPEED_PER_LAYER: f64 = 50.0;
const PUNCH_SPEED_NOISE: f64 = 5.0;
const PUNCH_SPEED_HALF_WIDTH: f64 = 10.0;

const PRELOAD_STRENGTH_N: (u32, u32) = (1500, 2500);
const PRELOAD_DEFAULT_N: (u32, u32) = (1200, 1800);

const STRENGTH_TARGET: &str = "strength";

/// パラメータ範囲推奨ハンドラー
#[derive(Debug, Default, Clone, Copy)]
pub struct ParameterRecommendationHandler;

impl ParameterRecommendationHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StepHandler for ParameterRecommendationHandler {
    fn name(&self) -> &str {
        NAME
    }

    fn required_inputs(&self) -> &[&'static str] {
        &[keys::MATERIAL, keys::STRUCTURE, keys::TARGET]
    }

    fn declared_outputs(&self) -> Option<&[&'static str]> {
        Some(&[
            keys::RECOMMENDED_RANGES,
            keys::PRIORITY_PARAMS,
            keys::ASSUMPTIONS,
            keys::SUMMARY,
        ])
    }

    async fn invoke(
        &self,
        context: &ExecutionContext,
        noise: &mut NoiseSource,
    ) -> Result<HandlerOutput, HandlerError> {
        let material: Material = input_as(context, keys::MATERIAL)?;
        let structure: Structure = input_as(context, keys::STRUCTURE)?;
        let target: String = input_as(context, keys::TARGET)?;

        let clamp_force = material.sheet_thickness_mm * CLAMP_FORCE_PER_MM
            + noise.uniform(-CLAMP_FORCE_NOISE, CLAMP_FORCE_NOISE);
        let punch_speed = f64::from(structure.stack_layers) * PUNCH_SPEED_PER_LAYER
            + noise.uniform(-PUNCH_SPEED_NOISE, PUNCH_SPEED_NOISE);

        let preload = if target == STRENGTH_TARGET {
            PRELOAD_STRENGTH_N
        } else {
            PRELOAD_DEFAULT_N
        };

        let ranges = json!({
            "clamp_force_kN": [
                round_to(clamp_force - CLAMP_FORCE_HALF_WIDTH, 2),
                round_to(clamp_force + CLAMP_FORCE_HALF_WIDTH, 2),
            ],
            "punch_speed_mm_s": [
                round_to(punch_speed - PUNCH_SPEED_HALF_WIDTH, 1),
                round_to(punch_speed + PUNCH_SPEED_HALF_WIDTH, 1),
            ],
            "preload_N": [preload.0, preload.1],
        });

        let mut output = HandlerOutput::new();
        output.insert(
            keys::SUMMARY.to_string(),
            Value::from("Proposed parameter ranges for bench trials"),
        );
        output.insert(keys::RECOMMENDED_RANGES.to_string(), ranges);
        output.insert(
            keys::PRIORITY_PARAMS.to_string(),
            json!(["clamp_force_kN", "punch_speed_mm_s"]),
        );
        output.insert(
            keys::ASSUMPTIONS.to_string(),
            json!(["No coating sensitivity", "Standard SPR die"]),
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::Task;

    fn context(thickness: f64, layers: u32, target: &str) -> ExecutionContext {
        let task = Task::with_id(
            "t",
            Material::new("Al/Steel", thickness),
            Structure::new("SPR", layers),
            target,
        );
        ExecutionContext::from_task(&task)
    }

    fn range(output: &HandlerOutput, param: &str) -> (f64, f64) {
        let pair = output[keys::RECOMMENDED_RANGES][param].as_array().unwrap();
        (pair[0].as_f64().unwrap(), pair[1].as_f64().unwrap())
    }

    #[tokio::test]
    async fn test_ranges_follow_heuristic() {
        let handler = ParameterRecommendationHandler::new();
        let mut noise = NoiseSource::seeded(3);
        let output = handler
            .invoke(&context(1.5, 2, "strength"), &mut noise)
            .await
            .unwrap();

        // 中心 5.25 ± 0.2 のノイズ、幅 ±0.5
        let (lo, hi) = range(&output, "clamp_force_kN");
        assert!((1.0 - (hi - lo)).abs() < 0.011);
        assert!((4.55..=5.95).contains(&lo));

        // 中心 100 ± 5 のノイズ、幅 ±10
        let (lo, hi) = range(&output, "punch_speed_mm_s");
        assert!((20.0 - (hi - lo)).abs() < 0.11);
        assert!((84.9..=95.1).contains(&lo));

        assert_eq!(range(&output, "preload_N"), (1500.0, 2500.0));
    }

    #[tokio::test]
    async fn test_preload_for_other_targets() {
        let handler = ParameterRecommendationHandler::new();
        let mut noise = NoiseSource::seeded(3);
        let output = handler
            .invoke(&context(1.2, 3, "fatigue"), &mut noise)
            .await
            .unwrap();
        assert_eq!(range(&output, "preload_N"), (1200.0, 1800.0));
    }

    #[tokio::test]
    async fn test_output_keys_are_declared() {
        let handler = ParameterRecommendationHandler::new();
        let mut noise = NoiseSource::seeded(11);
        let output = handler
            .invoke(&context(1.5, 2, "strength"), &mut noise)
            .await
            .unwrap();

        let declared = handler.declared_outputs().unwrap();
        assert_eq!(output.len(), declared.len());
        assert!(output.keys().all(|k| declared.contains(&k.as_str())));
        assert_eq!(
            output[keys::PRIORITY_PARAMS],
            json!(["clamp_force_kN", "punch_speed_mm_s"])
        );
    }

    #[tokio::test]
    async fn test_same_seed_same_output() {
        let handler = ParameterRecommendationHandler::new();
        let ctx = context(1.5, 2, "strength");
        let a = handler.invoke(&ctx, &mut NoiseSource::seeded(99)).await.unwrap();
        let b = handler.invoke(&ctx, &mut NoiseSource::seeded(99)).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_invalid_material_shape() {
        let handler = ParameterRecommendationHandler::new();
        let mut ctx = context(1.5, 2, "strength");
        ctx.merge(json!({"material": "steel"}).as_object().unwrap().clone());

        let err = handler
            .invoke(&ctx, &mut NoiseSource::seeded(1))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidInput { key, .. } if key == "material"));
    }
}
