//! Luật lâm sàng dẫn xuất từ nhiều chỉ số: chất lượng mẫu, hình thái thiếu máu,
//! kiểu tổn thương gan.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::names;
use crate::AnalysisConfig;

/// Giá trị số theo tên chuẩn; lần xuất hiện đầu tiên được giữ lại.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabValues {
    values: HashMap<String, f64>,
}

impl LabValues {
    pub fn record(&mut self, canonical: &str, value: f64) {
        self.values.entry(canonical.to_string()).or_insert(value);
    }

    pub fn get(&self, canonical: &str) -> Option<f64> {
        self.values.get(canonical).copied()
    }

    fn positive(&self, canonical: &str) -> Option<f64> {
        self.get(canonical).filter(|value| *value > 0.0)
    }
}

impl<K: AsRef<str>> FromIterator<(K, f64)> for LabValues {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        let mut values = LabValues::default();
        for (name, value) in iter {
            values.record(name.as_ref(), value);
        }
        values
    }
}

/// Kết quả đánh giá độ tin cậy của mẫu.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SampleQuality {
    pub is_reliable: bool,
    pub issues: Vec<String>,
    pub notes: Vec<String>,
}

/// Rule of Threes, MCHC và tổng công thức bạch cầu.
pub fn assess_sample_quality(values: &LabValues, config: &AnalysisConfig) -> SampleQuality {
    let mut issues = Vec::new();
    let mut notes = Vec::new();
    let tolerance = config.rule_of_threes_tolerance_pct;

    let rbc = values.positive(names::RBC);
    let hemoglobin = values.positive(names::HEMOGLOBIN);
    let hematocrit = values.positive(names::HEMATOCRIT);

    if let (Some(rbc), Some(hb)) = (rbc, hemoglobin) {
        let expected = rbc * 3.0;
        let deviation = (hb - expected).abs() / expected * 100.0;
        if deviation > tolerance {
            issues.push(format!(
                "Rule of Threes (RBC × 3 ≈ Hb): expected Hb ~{expected:.1}, got {hb:.1} (deviation: {deviation:.1}%)."
            ));
        } else {
            notes.push(format!(
                "Rule of Threes (RBC × 3 ≈ Hb): PASS ({rbc:.2} × 3 = {expected:.1} vs Hb {hb:.1})"
            ));
        }
    }

    if let (Some(hb), Some(hct)) = (hemoglobin, hematocrit) {
        let expected = hb * 3.0;
        let deviation = (hct - expected).abs() / expected * 100.0;
        if deviation > tolerance {
            issues.push(format!(
                "Rule of Threes (Hb × 3 ≈ HCT): expected HCT ~{expected:.1}%, got {hct:.1}% (deviation: {deviation:.1}%)."
            ));
        } else {
            notes.push(format!(
                "Rule of Threes (Hb × 3 ≈ HCT): PASS ({hb:.1} × 3 = {expected:.1} vs HCT {hct:.1})"
            ));
        }
    }

    if let Some(mchc) = values.positive(names::MCHC) {
        if mchc > config.mchc_spurious_above {
            issues.push(format!(
                "Spurious result alert: MCHC ({mchc:.1} g/dL) is physiologically high (>{}). Consider lipemia, cold agglutinins, or instrument error.",
                config.mchc_spurious_above
            ));
        } else if mchc < config.mchc_hypochromia_below {
            issues.push(format!(
                "Low MCHC ({mchc:.1} g/dL): suggests severe hypochromia."
            ));
        }
    }

    let differential_sum: f64 = names::DIFFERENTIAL
        .iter()
        .map(|name| values.get(name).unwrap_or(0.0))
        .sum();
    if differential_sum != 0.0 {
        if (differential_sum - 100.0).abs() > config.differential_tolerance_pct {
            issues.push(format!(
                "WBC differential sums to {differential_sum:.1}% (expected ~100%)."
            ));
        } else {
            notes.push(format!("WBC differential sum: PASS ({differential_sum:.1}%)"));
        }
    }

    SampleQuality {
        is_reliable: issues.is_empty(),
        issues,
        notes,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CellSize {
    Microcytic,
    Normocytic,
    Macrocytic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Chromicity {
    Hypochromic,
    Normochromic,
}

/// Phân loại hình thái thiếu máu.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnemiaAssessment {
    NoAnemia,
    Anemia {
        size: CellSize,
        chromicity: Chromicity,
        anisocytosis: bool,
    },
}

impl AnemiaAssessment {
    pub fn label(&self) -> String {
        match self {
            AnemiaAssessment::NoAnemia => "No anemia detected".to_string(),
            AnemiaAssessment::Anemia {
                size,
                chromicity,
                anisocytosis,
            } => {
                let size = match size {
                    CellSize::Microcytic => "Microcytic",
                    CellSize::Normocytic => "Normocytic",
                    CellSize::Macrocytic => "Macrocytic",
                };
                let chromicity = match chromicity {
                    Chromicity::Hypochromic => "Hypochromic",
                    Chromicity::Normochromic => "Normochromic",
                };
                let mut label = format!("{size} {chromicity} Anemia");
                if *anisocytosis {
                    label.push_str(" with Anisocytosis");
                }
                label
            }
        }
    }

    /// Gợi ý nguyên nhân gắn với kích thước hồng cầu.
    pub fn note(&self) -> Option<&'static str> {
        match self {
            AnemiaAssessment::NoAnemia => None,
            AnemiaAssessment::Anemia { size, .. } => Some(match size {
                CellSize::Microcytic => "Commonly seen in Iron Deficiency or Thalassemia.",
                CellSize::Macrocytic => "Commonly seen in B12/Folate deficiency or Liver Disease.",
                CellSize::Normocytic => {
                    "Commonly seen in Anemia of Chronic Disease or Acute Blood Loss."
                }
            }),
        }
    }
}

impl fmt::Display for AnemiaAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.note() {
            Some(note) => write!(f, "{}. {note}", self.label()),
            None => write!(f, "{}.", self.label()),
        }
    }
}

/// Bảng quyết định cố định theo Hb, MCV, MCHC, RDW.
pub fn classify_anemia(
    hemoglobin: f64,
    mcv: f64,
    mchc: f64,
    rdw: f64,
    config: &AnalysisConfig,
) -> AnemiaAssessment {
    if hemoglobin >= config.anemia_hemoglobin_threshold {
        return AnemiaAssessment::NoAnemia;
    }

    let size = if mcv < 80.0 {
        CellSize::Microcytic
    } else if mcv > 100.0 {
        CellSize::Macrocytic
    } else {
        CellSize::Normocytic
    };

    let chromicity = if mchc < 32.0 {
        Chromicity::Hypochromic
    } else {
        Chromicity::Normochromic
    };

    AnemiaAssessment::Anemia {
        size,
        chromicity,
        anisocytosis: rdw > 14.5,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LiverPattern {
    Hepatocellular,
    Cholestatic,
    Mixed,
    InsufficientData,
}

/// Kiểu tổn thương gan theo R-ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LiverAssessment {
    pub r_ratio: Option<f64>,
    pub pattern: LiverPattern,
}

impl fmt::Display for LiverAssessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self.pattern {
            LiverPattern::Hepatocellular => "Pattern: Hepatocellular (e.g., Viral/Toxic Hepatitis)",
            LiverPattern::Cholestatic => "Pattern: Cholestatic (e.g., Biliary Obstruction)",
            LiverPattern::Mixed => "Pattern: Mixed Liver Injury",
            LiverPattern::InsufficientData => "Insufficient data.",
        })
    }
}

/// R = (ALT / ULN_ALT) / (ALP / ULN_ALP); R >= 5 tế bào gan, R <= 2 ứ mật.
pub fn liver_injury_pattern(alt: f64, alp: f64, config: &AnalysisConfig) -> LiverAssessment {
    let insufficient = LiverAssessment {
        r_ratio: None,
        pattern: LiverPattern::InsufficientData,
    };

    let alt_ratio = alt / config.alt_upper_limit;
    let alp_ratio = alp / config.alp_upper_limit;
    if alp_ratio == 0.0 || !alp_ratio.is_finite() {
        return insufficient;
    }

    let r_ratio = alt_ratio / alp_ratio;
    if !r_ratio.is_finite() {
        return insufficient;
    }

    let pattern = if r_ratio >= 5.0 {
        LiverPattern::Hepatocellular
    } else if r_ratio <= 2.0 {
        LiverPattern::Cholestatic
    } else {
        LiverPattern::Mixed
    };

    LiverAssessment {
        r_ratio: Some(r_ratio),
        pattern,
    }
}
