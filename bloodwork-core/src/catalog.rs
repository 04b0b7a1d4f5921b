//! Bảng khoảng tham chiếu chuẩn, nạp một lần và không thay đổi.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{LabError, Sex};

/// Tên chuẩn của các chỉ số mà luật lâm sàng dẫn xuất cần đọc.
pub mod names {
    pub const RBC: &str = "RBC";
    pub const HEMOGLOBIN: &str = "Hemoglobin";
    pub const HEMATOCRIT: &str = "Hematocrit";
    pub const MCV: &str = "MCV";
    pub const MCHC: &str = "MCHC";
    pub const RDW: &str = "RDW";
    pub const NEUTROPHILS: &str = "Neutrophils";
    pub const LYMPHOCYTES: &str = "Lymphocytes";
    pub const MONOCYTES: &str = "Monocytes";
    pub const EOSINOPHILS: &str = "Eosinophils";
    pub const BASOPHILS: &str = "Basophils";
    pub const ALT: &str = "ALT";
    pub const ALP: &str = "ALP";

    pub const DIFFERENTIAL: [&str; 5] = [NEUTROPHILS, LYMPHOCYTES, MONOCYTES, EOSINOPHILS, BASOPHILS];
}

/// Nhóm xét nghiệm (chỉ mang ý nghĩa tổ chức).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Cbc,
    LiverFunction,
    KidneyFunction,
    Hba1c,
    LipidProfile,
    IronStudies,
    ThyroidFunction,
}

impl Panel {
    pub const ALL: [Panel; 7] = [
        Panel::Cbc,
        Panel::LiverFunction,
        Panel::KidneyFunction,
        Panel::Hba1c,
        Panel::LipidProfile,
        Panel::IronStudies,
        Panel::ThyroidFunction,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Panel::Cbc => "Complete Blood Count",
            Panel::LiverFunction => "Liver Function",
            Panel::KidneyFunction => "Kidney Function",
            Panel::Hba1c => "HbA1c",
            Panel::LipidProfile => "Lipid Profile",
            Panel::IronStudies => "Iron Studies",
            Panel::ThyroidFunction => "Thyroid Function",
        }
    }
}

/// Cận riêng theo giới tính; thiếu cận nào thì dùng cận chung.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SexBounds {
    pub low: Option<f64>,
    pub high: Option<f64>,
}

/// Ngưỡng của một chỉ số chuẩn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceEntry {
    pub name: String,
    pub panel: Panel,
    pub low: Option<f64>,
    pub high: Option<f64>,
    pub critical_low: Option<f64>,
    pub critical_high: Option<f64>,
    pub unit: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub male: SexBounds,
    #[serde(default)]
    pub female: SexBounds,
}

impl ReferenceEntry {
    pub fn new(
        panel: Panel,
        name: &str,
        low: Option<f64>,
        high: Option<f64>,
        unit: &str,
    ) -> Self {
        Self {
            name: name.to_string(),
            panel,
            low,
            high,
            critical_low: None,
            critical_high: None,
            unit: unit.to_string(),
            aliases: Vec::new(),
            male: SexBounds::default(),
            female: SexBounds::default(),
        }
    }

    pub fn critical(mut self, low: Option<f64>, high: Option<f64>) -> Self {
        self.critical_low = low;
        self.critical_high = high;
        self
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|alias| alias.to_string()).collect();
        self
    }

    pub fn male(mut self, low: Option<f64>, high: Option<f64>) -> Self {
        self.male = SexBounds { low, high };
        self
    }

    pub fn female(mut self, low: Option<f64>, high: Option<f64>) -> Self {
        self.female = SexBounds { low, high };
        self
    }

    /// Cận dưới/trên có hiệu lực cho giới tính đã cho.
    pub fn effective_bounds(&self, sex: Option<Sex>) -> (Option<f64>, Option<f64>) {
        let overrides = match sex {
            Some(Sex::Male) => self.male,
            Some(Sex::Female) => self.female,
            None => SexBounds::default(),
        };
        (overrides.low.or(self.low), overrides.high.or(self.high))
    }

    fn validate(&self) -> Result<(), LabError> {
        let thresholds = [
            self.low,
            self.high,
            self.critical_low,
            self.critical_high,
            self.male.low,
            self.male.high,
            self.female.low,
            self.female.high,
        ];
        if thresholds.iter().flatten().any(|value| !value.is_finite()) {
            return Err(self.invalid("non-finite threshold"));
        }

        if let (Some(critical_low), Some(critical_high)) = (self.critical_low, self.critical_high)
        {
            if critical_low >= critical_high {
                return Err(self.invalid("critical_low must be below critical_high"));
            }
        }

        for sex in [None, Some(Sex::Male), Some(Sex::Female)] {
            let (low, high) = self.effective_bounds(sex);
            let context = sex.map(Sex::as_str).unwrap_or("unisex");
            if let (Some(low), Some(high)) = (low, high) {
                if low >= high {
                    return Err(self.invalid(&format!("{context} low must be below high")));
                }
            }
            if let (Some(critical_low), Some(low)) = (self.critical_low, low) {
                if critical_low >= low {
                    return Err(self.invalid(&format!("critical_low must be below {context} low")));
                }
            }
            if let (Some(critical_high), Some(high)) = (self.critical_high, high) {
                if critical_high <= high {
                    return Err(
                        self.invalid(&format!("critical_high must be above {context} high"))
                    );
                }
            }
        }

        Ok(())
    }

    fn invalid(&self, reason: &str) -> LabError {
        LabError::InvalidCatalog(format!("{}: {reason}", self.name))
    }
}

/// Bảng tham chiếu đã kiểm tra tính hợp lệ.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<ReferenceEntry>,
    by_name: HashMap<String, usize>,
}

impl Catalog {
    /// Bảng chuẩn dùng chung cho toàn tiến trình.
    pub fn standard() -> &'static Catalog {
        static STANDARD: OnceLock<Catalog> = OnceLock::new();
        STANDARD.get_or_init(|| match Catalog::from_entries(standard_entries()) {
            Ok(catalog) => catalog,
            Err(err) => panic!("{err}"),
        })
    }

    /// Dựng bảng từ danh sách mục, từ chối mọi vi phạm bất biến.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Result<Self, LabError> {
        let mut by_name = HashMap::with_capacity(entries.len());
        let mut labels: HashMap<String, &str> = HashMap::new();

        for (index, entry) in entries.iter().enumerate() {
            entry.validate()?;

            if by_name.insert(entry.name.clone(), index).is_some() {
                return Err(entry.invalid("duplicate canonical name"));
            }

            for label in std::iter::once(&entry.name).chain(entry.aliases.iter()) {
                let key = label.trim().to_lowercase();
                if key.is_empty() {
                    return Err(entry.invalid("empty alias"));
                }
                match labels.get(key.as_str()) {
                    Some(owner) if *owner != entry.name => {
                        return Err(entry.invalid(&format!("alias '{label}' already used by {owner}")));
                    }
                    _ => {
                        labels.insert(key, &entry.name);
                    }
                }
            }
        }

        debug!(entries = entries.len(), labels = labels.len(), "reference catalog loaded");

        Ok(Self { entries, by_name })
    }

    pub fn get(&self, canonical: &str) -> Option<&ReferenceEntry> {
        self.by_name.get(canonical).map(|&index| &self.entries[index])
    }

    /// Tất cả mục theo thứ tự đăng ký.
    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn entries_in(&self, panel: Panel) -> impl Iterator<Item = &ReferenceEntry> {
        self.entries.iter().filter(move |entry| entry.panel == panel)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn standard_entries() -> Vec<ReferenceEntry> {
    let mut entries = Vec::with_capacity(54);
    entries.extend(cbc_entries());
    entries.extend(liver_entries());
    entries.extend(kidney_entries());
    entries.extend(hba1c_entries());
    entries.extend(lipid_entries());
    entries.extend(iron_entries());
    entries.extend(thyroid_entries());
    entries
}

fn cbc_entries() -> Vec<ReferenceEntry> {
    use Panel::Cbc;
    vec![
        ReferenceEntry::new(Cbc, "WBC", Some(4.0), Some(11.0), "×10³/µL")
            .critical(Some(2.0), Some(30.0))
            .aliases(&["White Blood Cell", "Leucocyte", "Leukocyte", "Total WBC"]),
        ReferenceEntry::new(Cbc, "RBC", Some(4.0), Some(5.5), "×10⁶/µL")
            .critical(Some(2.0), Some(7.5))
            .aliases(&["Red Blood Cell", "Erythrocyte", "Total RBC"])
            .male(Some(4.5), Some(5.5))
            .female(Some(4.0), Some(5.0)),
        ReferenceEntry::new(Cbc, "Hemoglobin", Some(12.0), Some(17.5), "g/dL")
            .critical(Some(7.0), Some(20.0))
            .aliases(&["Hb", "Hgb", "Haemoglobin"])
            .male(Some(13.5), Some(17.5))
            .female(Some(12.0), Some(15.5)),
        ReferenceEntry::new(Cbc, "Hematocrit", Some(36.0), Some(54.0), "%")
            .critical(Some(20.0), Some(60.0))
            .aliases(&["HCT", "PCV", "Packed Cell Volume", "Haematocrit"])
            .male(Some(38.0), Some(54.0))
            .female(Some(36.0), Some(48.0)),
        ReferenceEntry::new(Cbc, "MCV", Some(80.0), Some(100.0), "fL")
            .critical(Some(50.0), Some(130.0))
            .aliases(&["Mean Corpuscular Volume"]),
        ReferenceEntry::new(Cbc, "MCH", Some(27.0), Some(33.0), "pg")
            .critical(Some(15.0), Some(40.0))
            .aliases(&["Mean Corpuscular Hemoglobin"]),
        ReferenceEntry::new(Cbc, "MCHC", Some(32.0), Some(36.0), "g/dL")
            .critical(Some(25.0), Some(38.0))
            .aliases(&["Mean Corpuscular Hemoglobin Concentration"]),
        ReferenceEntry::new(Cbc, "RDW", Some(11.5), Some(14.5), "%")
            .critical(None, Some(25.0))
            .aliases(&["Red Cell Distribution Width", "RDW-CV"]),
        ReferenceEntry::new(Cbc, "Platelet Count", Some(150.0), Some(400.0), "×10³/µL")
            .critical(Some(50.0), Some(1000.0))
            .aliases(&["PLT", "Platelets", "Thrombocyte Count"]),
        ReferenceEntry::new(Cbc, "MPV", Some(6.0), Some(12.0), "fL")
            .aliases(&["Mean Platelet Volume"]),
        ReferenceEntry::new(Cbc, "Neutrophils", Some(40.0), Some(70.0), "%")
            .aliases(&["Neut", "Segmented Neutrophils", "Segs"]),
        ReferenceEntry::new(Cbc, "Lymphocytes", Some(20.0), Some(40.0), "%").aliases(&["Lymph"]),
        ReferenceEntry::new(Cbc, "Monocytes", Some(2.0), Some(8.0), "%").aliases(&["Mono"]),
        ReferenceEntry::new(Cbc, "Eosinophils", Some(1.0), Some(4.0), "%").aliases(&["Eos"]),
        ReferenceEntry::new(Cbc, "Basophils", Some(0.0), Some(1.0), "%").aliases(&["Baso"]),
        ReferenceEntry::new(Cbc, "Reticulocyte Count", Some(0.5), Some(2.5), "%")
            .aliases(&["Retic", "Reticulocytes"]),
        ReferenceEntry::new(Cbc, "ESR", Some(0.0), Some(20.0), "mm/hr")
            .aliases(&["Erythrocyte Sedimentation Rate"])
            .male(Some(0.0), Some(15.0))
            .female(Some(0.0), Some(20.0)),
    ]
}

fn liver_entries() -> Vec<ReferenceEntry> {
    use Panel::LiverFunction as Lft;
    vec![
        ReferenceEntry::new(Lft, "Total Bilirubin", Some(0.1), Some(1.2), "mg/dL")
            .critical(None, Some(15.0))
            .aliases(&["T. Bilirubin", "Bil Total"]),
        ReferenceEntry::new(Lft, "Direct Bilirubin", Some(0.0), Some(0.3), "mg/dL")
            .critical(None, Some(10.0))
            .aliases(&["D. Bilirubin", "Conjugated Bilirubin"]),
        ReferenceEntry::new(Lft, "Indirect Bilirubin", Some(0.1), Some(0.9), "mg/dL")
            .aliases(&["Unconjugated Bilirubin"]),
        ReferenceEntry::new(Lft, "AST", Some(5.0), Some(40.0), "U/L")
            .critical(None, Some(1000.0))
            .aliases(&["SGOT", "Aspartate Aminotransferase"]),
        ReferenceEntry::new(Lft, "ALT", Some(5.0), Some(40.0), "U/L")
            .critical(None, Some(1000.0))
            .aliases(&["SGPT", "Alanine Aminotransferase"]),
        ReferenceEntry::new(Lft, "ALP", Some(44.0), Some(147.0), "U/L")
            .aliases(&["Alkaline Phosphatase"]),
        ReferenceEntry::new(Lft, "GGT", Some(0.0), Some(60.0), "U/L")
            .aliases(&["Gamma GT", "Gamma Glutamyl Transferase"]),
        ReferenceEntry::new(Lft, "Total Protein", Some(6.0), Some(8.3), "g/dL")
            .critical(Some(4.0), None)
            .aliases(&["T. Protein"]),
        ReferenceEntry::new(Lft, "Albumin", Some(3.5), Some(5.5), "g/dL")
            .critical(Some(2.0), None)
            .aliases(&["Alb"]),
        ReferenceEntry::new(Lft, "Globulin", Some(2.0), Some(3.5), "g/dL").aliases(&["Glob"]),
        ReferenceEntry::new(Lft, "A/G Ratio", Some(1.0), Some(2.5), "")
            .aliases(&["Albumin/Globulin Ratio"]),
    ]
}

fn kidney_entries() -> Vec<ReferenceEntry> {
    use Panel::KidneyFunction as Kft;
    vec![
        ReferenceEntry::new(Kft, "BUN", Some(7.0), Some(20.0), "mg/dL")
            .critical(None, Some(100.0))
            .aliases(&["Blood Urea Nitrogen", "Urea"]),
        ReferenceEntry::new(Kft, "Creatinine", Some(0.6), Some(1.2), "mg/dL")
            .critical(None, Some(10.0))
            .aliases(&["Creat", "Serum Creatinine"])
            .male(Some(0.7), Some(1.3))
            .female(Some(0.6), Some(1.1)),
        ReferenceEntry::new(Kft, "Uric Acid", Some(3.0), Some(7.0), "mg/dL")
            .critical(None, Some(13.0))
            .aliases(&["Urate"])
            .male(Some(3.5), Some(7.2))
            .female(Some(2.6), Some(6.0)),
        ReferenceEntry::new(Kft, "eGFR", Some(90.0), Some(120.0), "mL/min/1.73m²")
            .critical(Some(15.0), None)
            .aliases(&["Estimated GFR", "Glomerular Filtration Rate"]),
        ReferenceEntry::new(Kft, "Sodium", Some(136.0), Some(145.0), "mEq/L")
            .critical(Some(120.0), Some(160.0))
            .aliases(&["Na", "Na+"]),
        ReferenceEntry::new(Kft, "Potassium", Some(3.5), Some(5.0), "mEq/L")
            .critical(Some(2.5), Some(6.5))
            .aliases(&["K", "K+"]),
        ReferenceEntry::new(Kft, "Chloride", Some(98.0), Some(106.0), "mEq/L")
            .critical(Some(80.0), Some(120.0))
            .aliases(&["Cl", "Cl-"]),
        ReferenceEntry::new(Kft, "Calcium", Some(8.5), Some(10.5), "mg/dL")
            .critical(Some(6.0), Some(13.0))
            .aliases(&["Ca", "Ca++", "Total Calcium"]),
        ReferenceEntry::new(Kft, "Phosphorus", Some(2.5), Some(4.5), "mg/dL")
            .critical(Some(1.0), Some(8.0))
            .aliases(&["Phosphate", "PO4"]),
    ]
}

fn hba1c_entries() -> Vec<ReferenceEntry> {
    use Panel::Hba1c;
    vec![
        ReferenceEntry::new(Hba1c, "HbA1c", Some(4.0), Some(5.6), "%")
            .critical(None, Some(14.0))
            .aliases(&["Glycated Hemoglobin", "A1c", "Glycosylated Hemoglobin"]),
        ReferenceEntry::new(Hba1c, "Estimated Average Glucose", Some(70.0), Some(126.0), "mg/dL")
            .aliases(&["eAG", "Average Glucose"]),
    ]
}

fn lipid_entries() -> Vec<ReferenceEntry> {
    use Panel::LipidProfile as Lipid;
    vec![
        ReferenceEntry::new(Lipid, "Total Cholesterol", Some(0.0), Some(200.0), "mg/dL")
            .critical(None, Some(400.0))
            .aliases(&["TC", "Cholesterol Total"]),
        ReferenceEntry::new(Lipid, "LDL", Some(0.0), Some(100.0), "mg/dL")
            .critical(None, Some(300.0))
            .aliases(&["LDL Cholesterol", "Low Density Lipoprotein", "LDL-C"]),
        ReferenceEntry::new(Lipid, "HDL", Some(40.0), Some(60.0), "mg/dL")
            .aliases(&["HDL Cholesterol", "High Density Lipoprotein", "HDL-C"])
            .male(Some(40.0), None)
            .female(Some(50.0), None),
        ReferenceEntry::new(Lipid, "Triglycerides", Some(0.0), Some(150.0), "mg/dL")
            .critical(None, Some(500.0))
            .aliases(&["TG", "Triacylglycerol"]),
        ReferenceEntry::new(Lipid, "VLDL", Some(2.0), Some(30.0), "mg/dL")
            .aliases(&["VLDL Cholesterol", "Very Low Density Lipoprotein"]),
        ReferenceEntry::new(Lipid, "TC/HDL Ratio", Some(0.0), Some(5.0), "")
            .aliases(&["Cholesterol/HDL Ratio"]),
    ]
}

fn iron_entries() -> Vec<ReferenceEntry> {
    use Panel::IronStudies as Iron;
    vec![
        ReferenceEntry::new(Iron, "Serum Iron", Some(60.0), Some(170.0), "µg/dL")
            .aliases(&["Iron", "Fe"])
            .male(Some(65.0), Some(175.0))
            .female(Some(50.0), Some(170.0)),
        ReferenceEntry::new(Iron, "TIBC", Some(250.0), Some(370.0), "µg/dL")
            .aliases(&["Total Iron Binding Capacity"]),
        ReferenceEntry::new(Iron, "Ferritin", Some(12.0), Some(300.0), "ng/mL")
            .critical(None, Some(1000.0))
            .aliases(&["Serum Ferritin"])
            .male(Some(20.0), Some(300.0))
            .female(Some(12.0), Some(150.0)),
        ReferenceEntry::new(Iron, "Transferrin Saturation", Some(20.0), Some(50.0), "%")
            .aliases(&["TSAT", "Iron Saturation"]),
    ]
}

fn thyroid_entries() -> Vec<ReferenceEntry> {
    use Panel::ThyroidFunction as Tft;
    vec![
        ReferenceEntry::new(Tft, "TSH", Some(0.4), Some(4.0), "mIU/L")
            .critical(Some(0.01), Some(50.0))
            .aliases(&["Thyroid Stimulating Hormone", "Thyrotropin"]),
        ReferenceEntry::new(Tft, "Free T3", Some(2.3), Some(4.2), "pg/mL")
            .aliases(&["FT3", "Free Triiodothyronine"]),
        ReferenceEntry::new(Tft, "Free T4", Some(0.8), Some(1.8), "ng/dL")
            .aliases(&["FT4", "Free Thyroxine"]),
        ReferenceEntry::new(Tft, "Total T3", Some(80.0), Some(200.0), "ng/dL")
            .aliases(&["T3 Total"]),
        ReferenceEntry::new(Tft, "Total T4", Some(5.0), Some(12.0), "µg/dL")
            .aliases(&["T4 Total"]),
    ]
}
