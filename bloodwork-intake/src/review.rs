//! Narrative review of a finished report.
//!
//! The review layer is optional: callers inject a [`Summarizer`] or pass `None`, and
//! nothing here depends on which provider produced the text.

use bloodwork_core::{AnalysisResult, LabError, Panel, ParameterStatus, Report, Sex};
use serde::{Deserialize, Serialize};

/// Patient context shown alongside the findings.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientInfo {
    pub sex: Option<Sex>,
    pub age: Option<u32>,
}

/// Everything a summarizer gets to see.
#[derive(Debug, Clone, Copy)]
pub struct ReviewRequest<'a> {
    pub report: &'a Report,
    pub patient: &'a PatientInfo,
    pub data_summary: &'a str,
}

pub trait Summarizer {
    fn summarize(&self, request: &ReviewRequest<'_>) -> Result<String, LabError>;
}

/// Available review providers.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SummaryProvider {
    #[default]
    LocalRuleBased,
}

impl SummaryProvider {
    pub fn summarizer(self) -> Box<dyn Summarizer> {
        match self {
            SummaryProvider::LocalRuleBased => Box::new(RuleBasedSummarizer),
        }
    }
}

/// Fixed-template review built only from the report itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedSummarizer;

impl Summarizer for RuleBasedSummarizer {
    fn summarize(&self, request: &ReviewRequest<'_>) -> Result<String, LabError> {
        let report = request.report;
        let counts = report.summary.counts();

        let mut lines = vec![
            "Clinical Review Summary (Rule-Based)".to_string(),
            String::new(),
            format!("Patient Profile: {}.", describe_patient(request.patient)),
            String::new(),
            "Key Observations:".to_string(),
            format!(
                "{} critical, {} high and {} low result(s) out of {} analysed.",
                counts.critical,
                counts.high,
                counts.low,
                report.results.len()
            ),
        ];
        let out_of_range: Vec<String> = report
            .abnormal()
            .map(|result| format!("{} ({})", result.name, result.status))
            .collect();
        if !out_of_range.is_empty() {
            lines.push(format!("Out of range: {}.", out_of_range.join(", ")));
        }
        if !report.summary.critical.is_empty() {
            lines.push(format!(
                "Critical values requiring prompt attention: {}.",
                report.summary.critical.join(", ")
            ));
        }
        lines.push(String::new());
        lines.push(request.data_summary.to_string());

        if !report.summary.interpretations.is_empty() {
            lines.push(String::new());
            lines.push("Interpretations:".to_string());
            lines.extend(
                report
                    .summary
                    .interpretations
                    .iter()
                    .map(|interpretation| format!("- {interpretation}")),
            );
        }

        lines.push(String::new());
        if report.quality.is_reliable {
            lines.push("Sample Quality: no consistency issues detected.".to_string());
        } else {
            lines.push("Sample Quality: verify before acting on these results.".to_string());
            lines.extend(report.quality.issues.iter().map(|issue| format!("- {issue}")));
        }

        lines.push(String::new());
        lines.extend(RECOMMENDATIONS.iter().map(|line| line.to_string()));

        Ok(lines.join("\n"))
    }
}

const RECOMMENDATIONS: [&str; 4] = [
    "Recommendations:",
    "1. Primary Care: schedule a follow-up with your primary physician to discuss the Critical or High/Low findings.",
    "2. Clinical Correlation: these results must be interpreted alongside your physical symptoms and medical history.",
    "3. Action: do not self-medicate or stop current medications based on this automated screening.",
];

/// Plain-text findings digest, grouped by panel in catalog order.
pub fn prepare_data_summary(report: &Report, patient: &PatientInfo) -> String {
    let mut lines = vec![
        format!(
            "Patient: {}, Age {}",
            patient
                .sex
                .map(|sex| sex.to_string())
                .unwrap_or_else(|| "Unknown".to_string()),
            patient
                .age
                .map(|age| age.to_string())
                .unwrap_or_else(|| "Unknown".to_string())
        ),
        "Findings:".to_string(),
    ];

    for panel in Panel::ALL {
        let results: Vec<&AnalysisResult> = report
            .results
            .iter()
            .filter(|result| result.panel == panel)
            .collect();
        if results.is_empty() {
            continue;
        }

        lines.push(String::new());
        lines.push(format!("--- {} ---", panel.label()));
        for result in results {
            let marker = if result.status == ParameterStatus::Normal {
                "[ok]"
            } else {
                "[!]"
            };
            let value = if result.unit.is_empty() {
                result.raw_value.to_string()
            } else {
                format!("{} {}", result.raw_value, result.unit)
            };
            lines.push(format!("{marker} {}: {value} ({})", result.name, result.status));
        }
    }

    lines.join("\n")
}

/// Run the injected summarizer, if any.
pub fn review_report(
    report: &Report,
    patient: &PatientInfo,
    summarizer: Option<&dyn Summarizer>,
) -> Result<Option<String>, LabError> {
    let Some(summarizer) = summarizer else {
        return Ok(None);
    };
    let data_summary = prepare_data_summary(report, patient);
    let request = ReviewRequest {
        report,
        patient,
        data_summary: &data_summary,
    };
    summarizer.summarize(&request).map(Some)
}

fn describe_patient(patient: &PatientInfo) -> String {
    match (patient.age, patient.sex) {
        (Some(age), Some(sex)) => format!("{age} year old {}", sex.as_str()),
        (Some(age), None) => format!("{age} year old, sex not specified"),
        (None, Some(sex)) => format!("{sex}, age not specified"),
        (None, None) => "age and sex not specified".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bloodwork_core::{build_report, AnalysisConfig, RawValue};

    fn report() -> Report {
        build_report(
            [
                ("Hb", RawValue::Number(9.5)),
                ("TSH", RawValue::Number(2.0)),
                ("ALT", RawValue::from("n/a")),
            ],
            Some(Sex::Female),
            &AnalysisConfig::default(),
        )
    }

    #[test]
    fn digest_groups_results_by_panel() {
        let patient = PatientInfo {
            sex: Some(Sex::Female),
            age: Some(34),
        };
        let digest = prepare_data_summary(&report(), &patient);
        let expected = "Patient: Female, Age 34\n\
                        Findings:\n\
                        \n\
                        --- Complete Blood Count ---\n\
                        [!] Hemoglobin: 9.5 g/dL (Low)\n\
                        \n\
                        --- Liver Function ---\n\
                        [!] ALT: n/a U/L (Unable to analyze)\n\
                        \n\
                        --- Thyroid Function ---\n\
                        [ok] TSH: 2 mIU/L (Normal)";
        assert_eq!(digest, expected);
    }

    #[test]
    fn missing_summarizer_yields_no_review() {
        let review = review_report(&report(), &PatientInfo::default(), None).unwrap();
        assert_eq!(review, None);
    }

    #[test]
    fn rule_based_review_mentions_findings() {
        let summarizer = SummaryProvider::LocalRuleBased.summarizer();
        let review = review_report(&report(), &PatientInfo::default(), Some(summarizer.as_ref()))
            .unwrap()
            .unwrap();
        assert!(review.starts_with("Clinical Review Summary (Rule-Based)"));
        assert!(review.contains("Patient Profile: age and sex not specified."));
        assert!(review.contains("0 critical, 0 high and 1 low result(s) out of 3 analysed."));
        assert!(review.contains("Out of range: Hemoglobin (Low)."));
        assert!(review.contains("- Normocytic Normochromic Anemia."));
        assert!(review.contains("[!] Hemoglobin: 9.5 g/dL (Low)"));
    }

    struct Failing;

    impl Summarizer for Failing {
        fn summarize(&self, _request: &ReviewRequest<'_>) -> Result<String, LabError> {
            Err(LabError::Summary("provider unavailable".to_string()))
        }
    }

    #[test]
    fn summarizer_errors_propagate() {
        let err = review_report(&report(), &PatientInfo::default(), Some(&Failing)).unwrap_err();
        assert!(matches!(err, LabError::Summary(_)));
    }
}
