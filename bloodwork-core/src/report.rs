//! Dựng báo cáo cho cả bộ xét nghiệm.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{names, Catalog};
use crate::heuristics::{
    assess_sample_quality, classify_anemia, liver_injury_pattern, LabValues, SampleQuality,
};
use crate::resolver::Resolver;
use crate::{analyze, AnalysisConfig, AnalysisResult, ParameterStatus, RawValue, Sex};

/// Giá trị thay thế khi chỉ số hồng cầu không được cung cấp.
const DEFAULT_MCV: f64 = 90.0;
const DEFAULT_MCHC: f64 = 34.0;
const DEFAULT_RDW: f64 = 13.0;

/// Tổng hợp theo trạng thái, giữ thứ tự đầu vào.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ReportSummary {
    pub critical: Vec<String>,
    pub high: Vec<String>,
    pub low: Vec<String>,
    pub interpretations: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryCounts {
    pub critical: usize,
    pub high: usize,
    pub low: usize,
}

impl ReportSummary {
    pub fn counts(&self) -> SummaryCounts {
        SummaryCounts {
            critical: self.critical.len(),
            high: self.high.len(),
            low: self.low.len(),
        }
    }

    fn record(&mut self, result: &AnalysisResult) {
        let bucket = match result.status {
            ParameterStatus::CriticalLow | ParameterStatus::CriticalHigh => &mut self.critical,
            ParameterStatus::High => &mut self.high,
            ParameterStatus::Low => &mut self.low,
            ParameterStatus::Normal | ParameterStatus::Unparseable => return,
        };
        bucket.push(result.name.clone());
    }
}

/// Báo cáo hoàn chỉnh cho một lần phân tích.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub results: Vec<AnalysisResult>,
    pub summary: ReportSummary,
    pub quality: SampleQuality,
}

impl Report {
    /// Các kết quả nằm ngoài khoảng tham chiếu.
    pub fn abnormal(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.results.iter().filter(|result| result.status.is_abnormal())
    }
}

/// Chạy bộ phân tích trên một bảng tham chiếu và chỉ mục bí danh cho trước.
#[derive(Debug, Clone, Copy)]
pub struct ReportBuilder<'a> {
    catalog: &'a Catalog,
    resolver: &'a Resolver,
    config: &'a AnalysisConfig,
}

impl<'a> ReportBuilder<'a> {
    pub fn new(catalog: &'a Catalog, resolver: &'a Resolver, config: &'a AnalysisConfig) -> Self {
        Self {
            catalog,
            resolver,
            config,
        }
    }

    /// Dùng bảng và chỉ mục chuẩn của tiến trình.
    pub fn standard(config: &'a AnalysisConfig) -> Self {
        Self::new(Catalog::standard(), Resolver::standard(), config)
    }

    /// Nhãn không nhận diện được bị bỏ qua lặng lẽ.
    pub fn build<I, K>(&self, parameters: I, sex: Option<Sex>) -> Report
    where
        I: IntoIterator<Item = (K, RawValue)>,
        K: AsRef<str>,
    {
        let mut results = Vec::new();
        let mut summary = ReportSummary::default();
        let mut values = LabValues::default();

        for (key, raw) in parameters {
            let key = key.as_ref();
            let Some(entry) = self
                .resolver
                .resolve(key)
                .and_then(|canonical| self.catalog.get(canonical))
            else {
                debug!(key, "skipping unrecognised parameter");
                continue;
            };

            let result = analyze(entry, &raw, sex);
            if let Some(value) = result.value {
                values.record(&entry.name, value);
            }
            summary.record(&result);
            results.push(result);
        }

        summary.interpretations = self.interpretations(&values);
        let quality = assess_sample_quality(&values, self.config);

        debug!(
            results = results.len(),
            critical = summary.critical.len(),
            high = summary.high.len(),
            low = summary.low.len(),
            "report built"
        );

        Report {
            results,
            summary,
            quality,
        }
    }

    fn interpretations(&self, values: &LabValues) -> Vec<String> {
        let mut interpretations = Vec::new();

        if let Some(hemoglobin) = values.get(names::HEMOGLOBIN).filter(|hb| *hb > 0.0) {
            if hemoglobin < self.config.anemia_hemoglobin_threshold {
                let assessment = classify_anemia(
                    hemoglobin,
                    values.get(names::MCV).unwrap_or(DEFAULT_MCV),
                    values.get(names::MCHC).unwrap_or(DEFAULT_MCHC),
                    values.get(names::RDW).unwrap_or(DEFAULT_RDW),
                    self.config,
                );
                interpretations.push(assessment.to_string());
            }
        }

        if let (Some(alt), Some(alp)) = (values.get(names::ALT), values.get(names::ALP)) {
            if alt > self.config.alt_upper_limit || alp > self.config.alp_upper_limit {
                interpretations.push(liver_injury_pattern(alt, alp, self.config).to_string());
            }
        }

        interpretations
    }
}

/// Dựng báo cáo bằng bảng tham chiếu chuẩn.
pub fn build_report<I, K>(parameters: I, sex: Option<Sex>, config: &AnalysisConfig) -> Report
where
    I: IntoIterator<Item = (K, RawValue)>,
    K: AsRef<str>,
{
    ReportBuilder::standard(config).build(parameters, sex)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Panel, ReferenceEntry};

    fn sample_panel() -> Vec<(&'static str, RawValue)> {
        vec![
            ("Hb", RawValue::Number(9.5)),
            ("RBC", RawValue::Number(3.1)),
            ("HCT", RawValue::Number(29.0)),
            ("MCV", RawValue::Number(72.0)),
            ("MCHC", RawValue::Number(29.5)),
            ("RDW", RawValue::Number(17.2)),
            ("WBC", RawValue::Number(14.5)),
            ("ALT", RawValue::Number(120.0)),
            ("ALP", RawValue::Number(95.0)),
            ("Neutrophils", RawValue::Number(75.0)),
            ("Lymphocytes", RawValue::Number(15.0)),
            ("Monocytes", RawValue::Number(10.0)),
        ]
    }

    #[test]
    fn builds_results_in_input_order_with_summary() {
        let report = build_report(sample_panel(), Some(Sex::Female), &AnalysisConfig::default());

        let names: Vec<&str> = report.results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Hemoglobin", "RBC", "Hematocrit", "MCV", "MCHC", "RDW", "WBC", "ALT", "ALP",
                "Neutrophils", "Lymphocytes", "Monocytes",
            ]
        );

        assert!(report.summary.critical.is_empty());
        assert_eq!(
            report.summary.high,
            vec!["RDW", "WBC", "ALT", "Neutrophils", "Monocytes"]
        );
        assert_eq!(
            report.summary.low,
            vec!["Hemoglobin", "RBC", "Hematocrit", "MCV", "MCHC", "Lymphocytes"]
        );
        assert_eq!(
            report.summary.interpretations,
            vec![
                "Microcytic Hypochromic Anemia with Anisocytosis. Commonly seen in Iron Deficiency or Thalassemia.".to_string(),
                "Pattern: Mixed Liver Injury".to_string(),
            ]
        );
        assert_eq!(report.quality.issues.len(), 1);
        assert!(report.quality.issues[0].starts_with("Low MCHC"));
    }

    #[test]
    fn unresolved_keys_are_dropped() {
        let report = build_report(
            [("FooBarParam", RawValue::Number(5.0))],
            None,
            &AnalysisConfig::default(),
        );
        assert!(report.results.is_empty());
        assert_eq!(report.summary, ReportSummary::default());
        assert!(report.quality.is_reliable);
    }

    #[test]
    fn critical_results_are_not_repeated_in_high_or_low() {
        let report = build_report(
            [
                ("Potassium", RawValue::Number(7.2)),
                ("Sodium", RawValue::Number(110.0)),
                ("Calcium", RawValue::Number(11.0)),
            ],
            None,
            &AnalysisConfig::default(),
        );
        assert_eq!(report.summary.critical, vec!["Potassium", "Sodium"]);
        assert!(report.summary.low.is_empty());
        assert_eq!(report.summary.high, vec!["Calcium"]);
        assert_eq!(report.summary.counts(), SummaryCounts { critical: 2, high: 1, low: 0 });
    }

    #[test]
    fn unparseable_value_does_not_stop_the_panel() {
        let report = build_report(
            [("ALT", RawValue::from("hemolysed")), ("AST", RawValue::from("55"))],
            None,
            &AnalysisConfig::default(),
        );
        assert_eq!(report.results[0].status, ParameterStatus::Unparseable);
        assert_eq!(report.results[1].status, ParameterStatus::High);
        assert_eq!(report.summary.high, vec!["AST"]);
    }

    #[test]
    fn liver_rule_only_runs_when_an_enzyme_is_elevated() {
        let normal = build_report(
            [("ALT", RawValue::Number(30.0)), ("ALP", RawValue::Number(100.0))],
            None,
            &AnalysisConfig::default(),
        );
        assert!(normal.summary.interpretations.is_empty());

        let cholestatic = build_report(
            [("SGPT", RawValue::Number(50.0)), ("Alkaline Phosphatase", RawValue::Number(400.0))],
            None,
            &AnalysisConfig::default(),
        );
        assert_eq!(
            cholestatic.summary.interpretations,
            vec!["Pattern: Cholestatic (e.g., Biliary Obstruction)".to_string()]
        );
    }

    #[test]
    fn anemia_rule_defaults_missing_indices() {
        let report = build_report(
            [("Hemoglobin", RawValue::Number(10.0))],
            None,
            &AnalysisConfig::default(),
        );
        assert_eq!(
            report.summary.interpretations,
            vec!["Normocytic Normochromic Anemia. Commonly seen in Anemia of Chronic Disease or Acute Blood Loss.".to_string()]
        );
    }

    #[test]
    fn non_positive_hemoglobin_skips_anemia_rule() {
        for hb in [0.0, -1.0] {
            let report = build_report(
                [("Hemoglobin", RawValue::Number(hb))],
                None,
                &AnalysisConfig::default(),
            );
            assert!(report.summary.interpretations.is_empty(), "{hb}");
        }
    }

    #[test]
    fn abnormal_lists_out_of_range_results_only() {
        let report = build_report(
            [
                ("Potassium", RawValue::Number(7.2)),
                ("Sodium", RawValue::Number(140.0)),
                ("ALT", RawValue::from("n/a")),
                ("Calcium", RawValue::Number(8.0)),
            ],
            None,
            &AnalysisConfig::default(),
        );
        let abnormal: Vec<(&str, ParameterStatus)> = report
            .abnormal()
            .map(|result| (result.name.as_str(), result.status))
            .collect();
        assert_eq!(
            abnormal,
            vec![
                ("Potassium", ParameterStatus::CriticalHigh),
                ("Calcium", ParameterStatus::Low),
            ]
        );
    }

    #[test]
    fn first_value_feeds_heuristics_when_aliases_repeat() {
        let report = build_report(
            [("Hb", RawValue::Number(10.0)), ("Hemoglobin", RawValue::Number(14.0))],
            None,
            &AnalysisConfig::default(),
        );
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.summary.interpretations.len(), 1);
    }

    #[test]
    fn building_twice_is_identical() {
        let config = AnalysisConfig::default();
        let first = serde_json::to_string(&build_report(sample_panel(), None, &config)).unwrap();
        let second = serde_json::to_string(&build_report(sample_panel(), None, &config)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_catalog_drives_the_builder() {
        let catalog = Catalog::from_entries(vec![ReferenceEntry::new(
            Panel::ThyroidFunction,
            "TSH",
            Some(0.5),
            Some(5.0),
            "mIU/L",
        )
        .aliases(&["Thyrotropin"])])
        .unwrap();
        let resolver = Resolver::new(&catalog);
        let config = AnalysisConfig::default();
        let report = ReportBuilder::new(&catalog, &resolver, &config)
            .build([("thyrotropin", RawValue::Number(0.45)), ("ALT", RawValue::Number(99.0))], None);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.summary.low, vec!["TSH"]);
    }
}
