//! Framework-neutral WASM <-> JavaScript bridge.

use nicu_core::{NicuError, UnitConfig};
use nicu_ward::WardRequest;
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

/// The handful of unit settings a bedside dashboard may override.
#[derive(Deserialize)]
struct JsUnitConfig {
    #[serde(default)]
    unit_name: Option<String>,
    #[serde(default)]
    minimum_discharge_weight_grams: Option<f64>,
    #[serde(default)]
    oral_percentage_threshold: Option<f64>,
    #[serde(default)]
    generation_horizon_hours: Option<f64>,
}

impl From<JsUnitConfig> for UnitConfig {
    fn from(cfg: JsUnitConfig) -> Self {
        let mut base = UnitConfig::default();
        if let Some(name) = cfg.unit_name {
            base.unit_name = name;
        }
        if let Some(grams) = cfg.minimum_discharge_weight_grams {
            base.discharge.minimum_weight_grams = grams;
        }
        if let Some(threshold) = cfg.oral_percentage_threshold {
            base.ng_removal.oral_percentage_threshold = threshold;
        }
        if let Some(hours) = cfg.generation_horizon_hours {
            base.shifts.generation_horizon_hours = hours;
        }
        base
    }
}

/// Summarise a ward document for one shift.
///
/// `request` carries `shift_type`, `date`, `actor` and `now`; `now` is
/// required because the browser clock is not consulted.
#[wasm_bindgen]
pub fn summarize_ward(
    ward: JsValue,
    request: JsValue,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let ward_value = from_value::<serde_json::Value>(ward)
        .map_err(|err| JsValue::from_str(&format!("could not read ward JSON: {err}")))?;
    let request: WardRequest = from_value(request)
        .map_err(|err| JsValue::from_str(&format!("could not read request: {err}")))?;

    let cfg = match config {
        Some(js_cfg) => {
            let cfg: JsUnitConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("could not read config: {err}")))?;
            UnitConfig::from(cfg)
        }
        None => UnitConfig::default(),
    };

    let summary = nicu_ward::summarize_ward_value(&ward_value, &cfg, &request)
        .map_err(|err| JsValue::from_str(&format_nicu_error(err)))?;

    to_value(&summary).map_err(|err| JsValue::from_str(&format!("could not serialize summary: {err}")))
}

/// Weight-based volume per feed in whole ml.
#[wasm_bindgen]
pub fn calculate_feed_volume(
    weight_grams: f64,
    frequency_hours: f64,
    ml_per_kg_per_day: Option<f64>,
) -> Result<u32, JsValue> {
    let per_kg = ml_per_kg_per_day
        .unwrap_or_else(|| UnitConfig::default().feeding.standard_volume_ml_per_kg_per_day);
    nicu_core::calculate_feed_volume(weight_grams, frequency_hours, per_kg)
        .map_err(|err| JsValue::from_str(&format_nicu_error(err)))
}

fn format_nicu_error(err: NicuError) -> String {
    format!("NICU error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_js_config_keeps_defaults() {
        let cfg = UnitConfig::from(JsUnitConfig {
            unit_name: Some("Ward 3".to_string()),
            minimum_discharge_weight_grams: None,
            oral_percentage_threshold: Some(90.0),
            generation_horizon_hours: None,
        });

        assert_eq!(cfg.unit_name, "Ward 3");
        assert_eq!(cfg.ng_removal.oral_percentage_threshold, 90.0);
        assert_eq!(cfg.discharge.minimum_weight_grams, 1800.0);
        assert_eq!(cfg.shifts.generation_horizon_hours, 24.0);
    }

    #[test]
    fn feed_volume_uses_unit_default_allowance() {
        assert_eq!(calculate_feed_volume(1350.0, 3.0, None).expect("volume"), 25);
        assert_eq!(calculate_feed_volume(1000.0, 2.0, Some(180.0)).expect("volume"), 15);
    }
}
