//! Bridge WASM <-> JavaScript trung lập framework.

use bloodwork_core::{AnalysisConfig, LabError, Report, Sex};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
struct JsAnalysisConfig {
    #[serde(default)]
    rule_of_threes_tolerance_pct: Option<f64>,
    #[serde(default)]
    mchc_spurious_above: Option<f64>,
    #[serde(default)]
    mchc_hypochromia_below: Option<f64>,
    #[serde(default)]
    differential_tolerance_pct: Option<f64>,
    #[serde(default)]
    anemia_hemoglobin_threshold: Option<f64>,
    #[serde(default)]
    alt_upper_limit: Option<f64>,
    #[serde(default)]
    alp_upper_limit: Option<f64>,
}

impl From<JsAnalysisConfig> for AnalysisConfig {
    fn from(cfg: JsAnalysisConfig) -> Self {
        let base = AnalysisConfig::default();
        AnalysisConfig {
            rule_of_threes_tolerance_pct: cfg
                .rule_of_threes_tolerance_pct
                .unwrap_or(base.rule_of_threes_tolerance_pct),
            mchc_spurious_above: cfg.mchc_spurious_above.unwrap_or(base.mchc_spurious_above),
            mchc_hypochromia_below: cfg
                .mchc_hypochromia_below
                .unwrap_or(base.mchc_hypochromia_below),
            differential_tolerance_pct: cfg
                .differential_tolerance_pct
                .unwrap_or(base.differential_tolerance_pct),
            anemia_hemoglobin_threshold: cfg
                .anemia_hemoglobin_threshold
                .unwrap_or(base.anemia_hemoglobin_threshold),
            alt_upper_limit: cfg.alt_upper_limit.unwrap_or(base.alt_upper_limit),
            alp_upper_limit: cfg.alp_upper_limit.unwrap_or(base.alp_upper_limit),
        }
    }
}

/// Phân tích object `{tên chỉ số: giá trị}` hoặc envelope `{sex, parameters}`.
#[wasm_bindgen]
pub fn analyze_parameters(
    input: JsValue,
    sex: Option<String>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let input_value = from_value::<serde_json::Value>(input)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được JSON đầu vào: {err}")))?;

    let sex = parse_sex(sex)?;
    let cfg = parse_config(config)?;

    let report = bloodwork_intake::analyze_json_value(&input_value, sex, &cfg)
        .map_err(|err| JsValue::from_str(&format_lab_error(err)))?;

    report_to_js(&report)
}

/// Phân tích văn bản báo cáo (OCR hoặc nhập tay).
#[wasm_bindgen]
pub fn analyze_text(
    text: String,
    sex: Option<String>,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let sex = parse_sex(sex)?;
    let cfg = parse_config(config)?;

    let report = bloodwork_intake::analyze_text_str(&text, sex, &cfg)
        .map_err(|err| JsValue::from_str(&format_lab_error(err)))?;

    report_to_js(&report)
}

fn parse_sex(sex: Option<String>) -> Result<Option<Sex>, JsValue> {
    match sex {
        Some(text) => {
            Sex::parse_optional(&text).map_err(|err| JsValue::from_str(&format_lab_error(err)))
        }
        None => Ok(None),
    }
}

fn parse_config(config: Option<JsValue>) -> Result<AnalysisConfig, JsValue> {
    match config {
        Some(js_cfg) => {
            let cfg: JsAnalysisConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            Ok(AnalysisConfig::from(cfg))
        }
        None => Ok(AnalysisConfig::default()),
    }
}

fn report_to_js(report: &Report) -> Result<JsValue, JsValue> {
    to_value(report).map_err(|err| JsValue::from_str(&format!("Không serialize báo cáo: {err}")))
}

fn format_lab_error(err: LabError) -> String {
    format!("Bloodwork error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_config_overlays_defaults() {
        let cfg: JsAnalysisConfig = serde_json::from_str(r#"{"alp_upper_limit": 120.0}"#).unwrap();
        let cfg = AnalysisConfig::from(cfg);
        assert_eq!(cfg.alp_upper_limit, 120.0);
        assert_eq!(cfg.alt_upper_limit, AnalysisConfig::default().alt_upper_limit);
    }
}
