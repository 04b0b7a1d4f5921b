//! Logic lõi phân tích kết quả xét nghiệm máu theo khoảng tham chiếu.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod analyzer;
pub mod catalog;
pub mod heuristics;
pub mod report;
pub mod resolver;

pub use analyzer::analyze;
pub use catalog::{Catalog, Panel, ReferenceEntry, SexBounds};
pub use heuristics::{
    assess_sample_quality, classify_anemia, liver_injury_pattern, AnemiaAssessment, CellSize,
    Chromicity, LabValues, LiverAssessment, LiverPattern, SampleQuality,
};
pub use report::{build_report, Report, ReportBuilder, ReportSummary, SummaryCounts};
pub use resolver::Resolver;

/// Cấu hình các ngưỡng dùng cho luật lâm sàng dẫn xuất.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Sai lệch tối đa (%) cho phép của Rule of Threes.
    pub rule_of_threes_tolerance_pct: f64,
    /// MCHC trên ngưỡng này bị coi là kết quả giả.
    pub mchc_spurious_above: f64,
    /// MCHC dưới ngưỡng này gợi ý nhược sắc nặng.
    pub mchc_hypochromia_below: f64,
    /// Sai lệch tối đa (điểm %) của tổng công thức bạch cầu so với 100.
    pub differential_tolerance_pct: f64,
    /// Hemoglobin dưới ngưỡng này được coi là thiếu máu.
    pub anemia_hemoglobin_threshold: f64,
    /// Giới hạn trên bình thường của ALT (U/L).
    pub alt_upper_limit: f64,
    /// Giới hạn trên bình thường của ALP (U/L).
    pub alp_upper_limit: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            rule_of_threes_tolerance_pct: 10.0,
            mchc_spurious_above: 37.0,
            mchc_hypochromia_below: 30.0,
            differential_tolerance_pct: 5.0,
            anemia_hemoglobin_threshold: 12.0,
            alt_upper_limit: 40.0,
            alp_upper_limit: 147.0,
        }
    }
}

/// Giới tính dùng để chọn khoảng tham chiếu riêng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Chuỗi rỗng hoặc toàn khoảng trắng nghĩa là không có thông tin giới tính.
    pub fn parse_optional(input: &str) -> Result<Option<Self>, LabError> {
        if input.trim().is_empty() {
            return Ok(None);
        }
        input.parse().map(Some)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl FromStr for Sex {
    type Err = LabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Sex::Male),
            "female" => Ok(Sex::Female),
            _ => Err(LabError::InvalidSex(s.to_string())),
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        })
    }
}

/// Giá trị thô như nhận được từ nguồn trích xuất (số hoặc chuỗi giống số).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Giá trị số hữu hạn, nếu đọc được.
    pub fn as_number(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(value) => *value,
            RawValue::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(value) => write!(f, "{value}"),
            RawValue::Text(text) => f.write_str(text),
        }
    }
}

/// Phân loại trạng thái của một chỉ số.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ParameterStatus {
    Normal,
    Low,
    High,
    CriticalLow,
    CriticalHigh,
    Unparseable,
}

impl ParameterStatus {
    pub fn is_critical(self) -> bool {
        matches!(self, ParameterStatus::CriticalLow | ParameterStatus::CriticalHigh)
    }

    /// Nằm ngoài khoảng tham chiếu (kể cả mức nguy kịch).
    pub fn is_abnormal(self) -> bool {
        !matches!(self, ParameterStatus::Normal | ParameterStatus::Unparseable)
    }

    pub fn label(self) -> &'static str {
        match self {
            ParameterStatus::Normal => "Normal",
            ParameterStatus::Low => "Low",
            ParameterStatus::High => "High",
            ParameterStatus::CriticalLow => "Critical Low",
            ParameterStatus::CriticalHigh => "Critical High",
            ParameterStatus::Unparseable => "Unable to analyze",
        }
    }
}

impl fmt::Display for ParameterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Kết quả đánh giá một chỉ số.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisResult {
    pub name: String,
    pub panel: Panel,
    pub raw_value: RawValue,
    pub value: Option<f64>,
    pub unit: String,
    /// Cận dưới thực sự được dùng (có thể đã điều chỉnh theo giới tính).
    pub reference_low: Option<f64>,
    pub reference_high: Option<f64>,
    pub status: ParameterStatus,
    /// Quy ước dấu:
    /// - dưới khoảng: `(value - low) / low * 100`, luôn âm. Độ lớn bằng
    ///   `(low - value) / low * 100`, nên so sánh độ lớn thì dùng giá trị tuyệt đối;
    /// - trên khoảng: `(value - high) / high * 100`, luôn dương;
    /// - Normal: vị trí so với điểm giữa, từ -100 (cận dưới) đến 100 (cận trên).
    ///
    /// `None` khi cận liên quan thiếu hoặc bằng 0.
    pub deviation_percent: Option<f64>,
}

/// Lỗi chung của bộ phân tích.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("Bảng tham chiếu không hợp lệ: {0}")]
    InvalidCatalog(String),
    #[error("Giới tính không hợp lệ: {0}")]
    InvalidSex(String),
    #[error("Dữ liệu đầu vào thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
    #[error("Không tạo được nhận xét: {0}")]
    Summary(String),
}
