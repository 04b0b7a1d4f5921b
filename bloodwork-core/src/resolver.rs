//! Chuẩn hóa nhãn đầu vào về tên chỉ số chuẩn.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::catalog::Catalog;

/// Chỉ mục bí danh -> tên chuẩn, không phân biệt hoa thường.
///
/// Chỉ so khớp chính xác sau khi cắt khoảng trắng; không so khớp chuỗi con
/// để "Iron" không bị nhầm với "Serum Iron" hay "TIBC".
#[derive(Debug, Clone)]
pub struct Resolver {
    index: HashMap<String, String>,
}

impl Resolver {
    pub fn new(catalog: &Catalog) -> Self {
        let mut index = HashMap::new();
        for entry in catalog.entries() {
            index.insert(normalize(&entry.name), entry.name.clone());
            for alias in &entry.aliases {
                index.insert(normalize(alias), entry.name.clone());
            }
        }
        Self { index }
    }

    /// Chỉ mục dựng từ [`Catalog::standard`].
    pub fn standard() -> &'static Resolver {
        static STANDARD: OnceLock<Resolver> = OnceLock::new();
        STANDARD.get_or_init(|| Resolver::new(Catalog::standard()))
    }

    pub fn resolve(&self, raw_key: &str) -> Option<&str> {
        self.index.get(&normalize(raw_key)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_alias_and_name_resolves_to_its_entry() {
        let resolver = Resolver::standard();
        for entry in Catalog::standard().entries() {
            for label in std::iter::once(&entry.name).chain(entry.aliases.iter()) {
                for variant in [label.clone(), label.to_uppercase(), label.to_lowercase()] {
                    assert_eq!(resolver.resolve(&variant), Some(entry.name.as_str()), "{variant}");
                }
            }
        }
    }

    #[test]
    fn trims_whitespace_before_lookup() {
        assert_eq!(Resolver::standard().resolve("  hgb \t"), Some("Hemoglobin"));
        assert_eq!(Resolver::standard().resolve("sgpt"), Some("ALT"));
    }

    #[test]
    fn no_partial_matches() {
        let resolver = Resolver::standard();
        assert_eq!(resolver.resolve("Iron Binding"), None);
        assert_eq!(resolver.resolve("Hemo"), None);
        assert_eq!(resolver.resolve("Total Hemoglobin"), None);
        assert_eq!(resolver.resolve("FooBarParam"), None);
    }
}
