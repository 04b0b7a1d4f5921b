//! Upstream report artifacts (free text, JSON) to `Report` converter.

use bloodwork_core::{AnalysisConfig, LabError, RawValue, Report, ReportBuilder, Resolver, Sex};
use serde_json::{Map, Value};
use tracing::debug;

pub mod review;
mod text;

pub use text::parse_report_text;

/// Raw parameters in input order plus the sex context they came with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportInput {
    pub parameters: Vec<(String, RawValue)>,
    pub sex: Option<Sex>,
}

/// Build a report from OCR or pasted report text.
pub fn analyze_text_str(
    text: &str,
    sex: Option<Sex>,
    config: &AnalysisConfig,
) -> Result<Report, LabError> {
    let parameters = parse_report_text(text, Resolver::standard());
    if parameters.is_empty() {
        return Err(LabError::MissingData);
    }
    debug!(parameters = parameters.len(), "parameters extracted from text");
    Ok(ReportBuilder::standard(config).build(parameters, sex))
}

/// Build a report from a JSON string.
pub fn analyze_json_str(
    json: &str,
    sex: Option<Sex>,
    config: &AnalysisConfig,
) -> Result<Report, LabError> {
    let value: Value = serde_json::from_str(json).map_err(|err| LabError::Parse(err.to_string()))?;
    analyze_json_value(&value, sex, config)
}

/// Build a report from a `serde_json::Value`.
///
/// An explicit `sex` takes precedence over one embedded in the document.
pub fn analyze_json_value(
    value: &Value,
    sex: Option<Sex>,
    config: &AnalysisConfig,
) -> Result<Report, LabError> {
    let input = input_from_json(value)?;
    Ok(ReportBuilder::standard(config).build(input.parameters, sex.or(input.sex)))
}

/// Accepts a flat `{label: value}` object, an array of `{name, value}` objects, or an
/// envelope `{"sex": ..., "parameters": <object|array>}`.
pub fn input_from_json(value: &Value) -> Result<ReportInput, LabError> {
    match value {
        Value::Object(object) if object.contains_key("parameters") => {
            let sex = match object.get("sex").or_else(|| object.get("gender")) {
                Some(Value::String(text)) => Sex::parse_optional(text)?,
                Some(Value::Null) | None => None,
                Some(other) => return Err(LabError::InvalidSex(other.to_string())),
            };
            let parameters = match object.get("parameters") {
                Some(Value::Object(params)) => parameters_from_object(params),
                Some(Value::Array(items)) => parameters_from_array(items)?,
                _ => {
                    return Err(LabError::Parse(
                        "\"parameters\" must be an object or an array".to_string(),
                    ))
                }
            };
            Ok(ReportInput { parameters, sex })
        }
        Value::Object(object) => Ok(ReportInput {
            parameters: parameters_from_object(object),
            sex: None,
        }),
        Value::Array(items) => Ok(ReportInput {
            parameters: parameters_from_array(items)?,
            sex: None,
        }),
        other => Err(LabError::Parse(format!(
            "Expected a JSON object or array of parameters, received {}",
            json_type(other)
        ))),
    }
}

fn parameters_from_object(object: &Map<String, Value>) -> Vec<(String, RawValue)> {
    object
        .iter()
        .map(|(label, value)| (label.clone(), raw_value(value)))
        .collect()
}

fn parameters_from_array(items: &[Value]) -> Result<Vec<(String, RawValue)>, LabError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let name = item
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| LabError::Parse(format!("parameter #{index} has no \"name\"")))?;
            let value = item.get("value").unwrap_or(&Value::Null);
            Ok((name.to_string(), raw_value(value)))
        })
        .collect()
}

fn raw_value(value: &Value) -> RawValue {
    match value {
        Value::Number(number) => number
            .as_f64()
            .map(RawValue::Number)
            .unwrap_or_else(|| RawValue::Text(number.to_string())),
        Value::String(text) => RawValue::Text(text.clone()),
        other => RawValue::Text(other.to_string()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
