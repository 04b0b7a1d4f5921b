//! Đánh giá một chỉ số so với khoảng tham chiếu.

use tracing::debug;

use crate::catalog::ReferenceEntry;
use crate::{AnalysisResult, ParameterStatus, RawValue, Sex};

/// Phân loại một giá trị thô theo mục tham chiếu.
///
/// Thứ tự ưu tiên: critical-low, critical-high, low, high, normal. Giá trị không
/// đọc được trả về [`ParameterStatus::Unparseable`] thay vì lỗi.
pub fn analyze(entry: &ReferenceEntry, raw: &RawValue, sex: Option<Sex>) -> AnalysisResult {
    let (low, high) = entry.effective_bounds(sex);

    let mut result = AnalysisResult {
        name: entry.name.clone(),
        panel: entry.panel,
        raw_value: raw.clone(),
        value: None,
        unit: entry.unit.clone(),
        reference_low: low,
        reference_high: high,
        status: ParameterStatus::Unparseable,
        deviation_percent: None,
    };

    let Some(value) = raw.as_number() else {
        debug!(parameter = %entry.name, raw = %raw, "value is not numeric");
        return result;
    };

    let status = classify(value, low, high, entry.critical_low, entry.critical_high);
    result.value = Some(value);
    result.status = status;
    result.deviation_percent = deviation_percent(status, value, low, high);
    result
}

fn classify(
    value: f64,
    low: Option<f64>,
    high: Option<f64>,
    critical_low: Option<f64>,
    critical_high: Option<f64>,
) -> ParameterStatus {
    if critical_low.is_some_and(|bound| value < bound) {
        ParameterStatus::CriticalLow
    } else if critical_high.is_some_and(|bound| value > bound) {
        ParameterStatus::CriticalHigh
    } else if low.is_some_and(|bound| value < bound) {
        ParameterStatus::Low
    } else if high.is_some_and(|bound| value > bound) {
        ParameterStatus::High
    } else {
        ParameterStatus::Normal
    }
}

fn deviation_percent(
    status: ParameterStatus,
    value: f64,
    low: Option<f64>,
    high: Option<f64>,
) -> Option<f64> {
    match status {
        ParameterStatus::Low | ParameterStatus::CriticalLow => {
            let low = low.filter(|bound| *bound != 0.0)?;
            Some((value - low) / low * 100.0)
        }
        ParameterStatus::High | ParameterStatus::CriticalHigh => {
            let high = high.filter(|bound| *bound != 0.0)?;
            Some((value - high) / high * 100.0)
        }
        ParameterStatus::Normal => match (low, high) {
            (Some(low), Some(high)) if high > low => {
                let midpoint = (low + high) / 2.0;
                let half_span = (high - low) / 2.0;
                Some((value - midpoint) / half_span * 100.0)
            }
            _ => None,
        },
        ParameterStatus::Unparseable => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, Panel};

    fn entry(name: &str) -> &'static ReferenceEntry {
        Catalog::standard().get(name).unwrap()
    }

    fn approx(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("deviation should be present");
        assert!((actual - expected).abs() < 1e-9, "{actual} != {expected}");
    }

    #[test]
    fn critical_low_wins_over_low() {
        let result = analyze(entry("Hemoglobin"), &RawValue::Number(6.5), None);
        assert_eq!(result.status, ParameterStatus::CriticalLow);
        approx(result.deviation_percent, (6.5 - 12.0) / 12.0 * 100.0);
    }

    #[test]
    fn critical_low_wins_even_when_bound_sits_inside_band() {
        let unchecked = ReferenceEntry::new(Panel::Cbc, "Odd", Some(10.0), Some(20.0), "")
            .critical(Some(15.0), None);
        let result = analyze(&unchecked, &RawValue::Number(12.0), None);
        assert_eq!(result.status, ParameterStatus::CriticalLow);
    }

    #[test]
    fn high_and_critical_high_are_positive() {
        let high = analyze(entry("WBC"), &RawValue::Number(14.5), None);
        assert_eq!(high.status, ParameterStatus::High);
        approx(high.deviation_percent, (14.5 - 11.0) / 11.0 * 100.0);

        let critical = analyze(entry("Potassium"), &RawValue::from("7.0"), None);
        assert_eq!(critical.status, ParameterStatus::CriticalHigh);
        approx(critical.deviation_percent, 40.0);
    }

    #[test]
    fn low_deviation_is_negative_and_grows_with_distance() {
        let near = analyze(entry("Sodium"), &RawValue::Number(134.0), None);
        let far = analyze(entry("Sodium"), &RawValue::Number(125.0), None);
        assert_eq!(near.status, ParameterStatus::Low);
        assert_eq!(far.status, ParameterStatus::Low);
        let near = near.deviation_percent.unwrap();
        let far = far.deviation_percent.unwrap();
        assert!(near < 0.0 && far < near);
    }

    #[test]
    fn high_deviation_grows_with_distance() {
        let near = analyze(entry("ALT"), &RawValue::Number(50.0), None);
        let far = analyze(entry("ALT"), &RawValue::Number(400.0), None);
        assert_eq!(near.status, ParameterStatus::High);
        assert_eq!(far.status, ParameterStatus::High);
        approx(near.deviation_percent, 25.0);
        approx(far.deviation_percent, 900.0);
    }

    #[test]
    fn values_on_a_bound_do_not_cross_it() {
        for (name, value) in [("ALT", 40.0), ("ALT", 5.0), ("Potassium", 6.5), ("Potassium", 2.5)] {
            let result = analyze(entry(name), &RawValue::Number(value), None);
            assert!(!result.status.is_critical(), "{name} {value}");
        }
        assert_eq!(
            analyze(entry("ALT"), &RawValue::Number(40.0), None).status,
            ParameterStatus::Normal
        );
        assert_eq!(
            analyze(entry("Potassium"), &RawValue::Number(6.5), None).status,
            ParameterStatus::High
        );
    }

    #[test]
    fn normal_reports_position_within_range() {
        let midpoint = analyze(entry("MCV"), &RawValue::Number(90.0), None);
        assert_eq!(midpoint.status, ParameterStatus::Normal);
        approx(midpoint.deviation_percent, 0.0);

        let upper_edge = analyze(entry("MCV"), &RawValue::Number(100.0), None);
        assert_eq!(upper_edge.status, ParameterStatus::Normal);
        approx(upper_edge.deviation_percent, 100.0);

        let lower = analyze(entry("MCV"), &RawValue::Number(85.0), None);
        approx(lower.deviation_percent, -50.0);
    }

    #[test]
    fn zero_lower_bound_leaves_deviation_absent() {
        let result = analyze(entry("Basophils"), &RawValue::Number(-1.0), None);
        assert_eq!(result.status, ParameterStatus::Low);
        assert_eq!(result.deviation_percent, None);
    }

    #[test]
    fn missing_bounds_are_unchecked() {
        let open = ReferenceEntry::new(Panel::Cbc, "Open", None, Some(5.0), "");
        let result = analyze(&open, &RawValue::Number(-100.0), None);
        assert_eq!(result.status, ParameterStatus::Normal);
        assert_eq!(result.deviation_percent, None);
    }

    #[test]
    fn unparseable_value_is_a_status() {
        let result = analyze(entry("ALT"), &RawValue::from("pending"), None);
        assert_eq!(result.status, ParameterStatus::Unparseable);
        assert_eq!(result.value, None);
        assert_eq!(result.deviation_percent, None);
        assert_eq!(result.reference_high, Some(40.0));
    }

    #[test]
    fn female_hemoglobin_uses_female_upper_bound() {
        let normal = analyze(entry("Hemoglobin"), &RawValue::Number(13.0), Some(Sex::Female));
        assert_eq!(normal.reference_high, Some(15.5));
        assert_eq!(normal.status, ParameterStatus::Normal);

        let high = analyze(entry("Hemoglobin"), &RawValue::Number(16.0), Some(Sex::Female));
        assert_eq!(high.status, ParameterStatus::High);

        let unisex = analyze(entry("Hemoglobin"), &RawValue::Number(16.0), None);
        assert_eq!(unisex.status, ParameterStatus::Normal);
    }

    #[test]
    fn male_hemoglobin_uses_male_lower_bound() {
        let result = analyze(entry("Hemoglobin"), &RawValue::Number(13.0), Some(Sex::Male));
        assert_eq!(result.reference_low, Some(13.5));
        assert_eq!(result.status, ParameterStatus::Low);
    }
}
