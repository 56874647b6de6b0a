//! Declarative header-alias table used to map spreadsheet columns onto the
//! canonical budget schema.

use std::path::Path;

use serde::Deserialize;

use crate::error::{BudgetError, Result};
use crate::models::normalize_header;

/// Canonical (non-month) fields a budget sheet may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    /// The PC model / line-item name.
    Model,
    /// Monthly rental price per PC.
    UnitPrice,
    /// A user-maintained total column. Always ignored.
    Total,
}

impl CanonicalField {
    /// Human-readable field name for error messages.
    pub fn label(self) -> &'static str {
        match self {
            CanonicalField::Model => "PC Model",
            CanonicalField::UnitPrice => "Unit Price",
            CanonicalField::Total => "Total",
        }
    }
}

const MODEL_ALIASES: &[&str] = &[
    "PC Model",
    "Model",
    "PC Name",
    "PC",
    "Device",
    "Device Model",
];

const UNIT_PRICE_ALIASES: &[&str] = &[
    "Unit Price",
    "Price",
    "Unit Cost",
    "Monthly Price",
    "Monthly Cost",
    "Rate",
];

const TOTAL_ALIASES: &[&str] = &["Total", "Annual Total", "Sum"];

/// Accepted header spellings per canonical field.
///
/// Stored already normalized (trimmed, inner whitespace collapsed,
/// lowercased) so that lookups are a plain comparison.
#[derive(Debug, Clone)]
pub struct HeaderAliases {
    model: Vec<String>,
    unit_price: Vec<String>,
    total: Vec<String>,
}

/// Shape of the optional JSON alias file.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasFile {
    #[serde(default)]
    pub model: Vec<String>,
    #[serde(default)]
    pub unit_price: Vec<String>,
    #[serde(default)]
    pub total: Vec<String>,
}

impl Default for HeaderAliases {
    fn default() -> Self {
        Self {
            model: normalize_all(MODEL_ALIASES.iter().copied()),
            unit_price: normalize_all(UNIT_PRICE_ALIASES.iter().copied()),
            total: normalize_all(TOTAL_ALIASES.iter().copied()),
        }
    }
}

impl HeaderAliases {
    /// Built-in aliases extended with the entries from a JSON alias file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BudgetError::Config(format!("cannot read alias file {}: {}", path.display(), e))
        })?;
        let file: AliasFile = serde_json::from_str(&content)?;
        Ok(Self::default().extended(file))
    }

    /// Append the aliases from `file` to this table. Built-ins are never removed.
    pub fn extended(mut self, file: AliasFile) -> Self {
        extend_unique(&mut self.model, file.model);
        extend_unique(&mut self.unit_price, file.unit_price);
        extend_unique(&mut self.total, file.total);
        self
    }

    /// The canonical field a header names, if any.
    pub fn resolve(&self, header: &str) -> Option<CanonicalField> {
        let key = normalize_header(header);
        if key.is_empty() {
            return None;
        }
        [
            (CanonicalField::Model, &self.model),
            (CanonicalField::UnitPrice, &self.unit_price),
            (CanonicalField::Total, &self.total),
        ]
        .into_iter()
        .find(|(_, aliases)| aliases.iter().any(|a| *a == key))
        .map(|(field, _)| field)
    }

    /// Normalized aliases accepted for `field`.
    pub fn aliases(&self, field: CanonicalField) -> &[String] {
        match field {
            CanonicalField::Model => &self.model,
            CanonicalField::UnitPrice => &self.unit_price,
            CanonicalField::Total => &self.total,
        }
    }
}

fn normalize_all<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    items.map(normalize_header).collect()
}

fn extend_unique(target: &mut Vec<String>, extra: Vec<String>) {
    for alias in extra {
        let key = normalize_header(&alias);
        if !key.is_empty() && !target.contains(&key) {
            target.push(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_resolve_builtin_model_aliases() {
        let aliases = HeaderAliases::default();
        for header in ["PC Model", "model", "  PC   Name ", "DEVICE"] {
            assert_eq!(
                aliases.resolve(header),
                Some(CanonicalField::Model),
                "header {header:?}"
            );
        }
    }

    #[test]
    fn test_resolve_builtin_price_and_total() {
        let aliases = HeaderAliases::default();
        assert_eq!(aliases.resolve("Unit Price"), Some(CanonicalField::UnitPrice));
        assert_eq!(aliases.resolve("price"), Some(CanonicalField::UnitPrice));
        assert_eq!(aliases.resolve("TOTAL"), Some(CanonicalField::Total));
    }

    #[test]
    fn test_resolve_unknown_header() {
        let aliases = HeaderAliases::default();
        assert_eq!(aliases.resolve("Jan"), None);
        assert_eq!(aliases.resolve("Notes"), None);
        assert_eq!(aliases.resolve(""), None);
    }

    #[test]
    fn test_extended_keeps_builtins() {
        let aliases = HeaderAliases::default().extended(AliasFile {
            model: vec!["Asset Name".to_string()],
            unit_price: vec!["Monthly Fee".to_string(), "price".to_string()],
            total: vec![],
        });
        assert_eq!(aliases.resolve("asset name"), Some(CanonicalField::Model));
        assert_eq!(aliases.resolve("PC Model"), Some(CanonicalField::Model));
        assert_eq!(aliases.resolve("Monthly Fee"), Some(CanonicalField::UnitPrice));
        // Duplicates are not appended twice.
        let price_count = aliases
            .aliases(CanonicalField::UnitPrice)
            .iter()
            .filter(|a| a.as_str() == "price")
            .count();
        assert_eq!(price_count, 1);
    }

    #[test]
    fn test_load_alias_file() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"model": ["Asset"], "total": ["Year Total"]}}"#).unwrap();

        let aliases = HeaderAliases::load(file.path()).expect("load aliases");
        assert_eq!(aliases.resolve("asset"), Some(CanonicalField::Model));
        assert_eq!(aliases.resolve("Year Total"), Some(CanonicalField::Total));
    }

    #[test]
    fn test_load_alias_file_rejects_unknown_keys() {
        let mut file = NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{"models": ["Asset"]}}"#).unwrap();

        let err = HeaderAliases::load(file.path()).unwrap_err();
        assert!(matches!(err, BudgetError::JsonParse(_)));
    }

    #[test]
    fn test_load_alias_file_missing() {
        let err = HeaderAliases::load(Path::new("/nonexistent/aliases.json")).unwrap_err();
        assert!(matches!(err, BudgetError::Config(_)));
    }
}
