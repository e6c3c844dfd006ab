use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, bail};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::error::PayrollError;
use crate::model::payroll::ComponentType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CatalogEntry {
    #[schema(example = "HRA")]
    pub name: String,
    pub default_type: ComponentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = "20", nullable = true)]
    pub default_percentage: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogVerdict {
    Ok,
    MismatchedType { expected: ComponentType },
    UnknownName,
}

const BUILTIN: &[(&str, ComponentType, Option<i64>)] = &[
    ("Basic Allowance", ComponentType::Earnings, None),
    ("HRA", ComponentType::Earnings, Some(20)),
    ("Transport Allowance", ComponentType::Earnings, None),
    ("Medical Allowance", ComponentType::Earnings, None),
    ("Special Allowance", ComponentType::Earnings, None),
    ("Overtime", ComponentType::Earnings, None),
    ("Bonus", ComponentType::Earnings, None),
    ("PF", ComponentType::Deductions, Some(12)),
    ("Professional Tax", ComponentType::Deductions, None),
    ("TDS", ComponentType::Deductions, None),
    ("ESI", ComponentType::Deductions, None),
    ("Loan Recovery", ComponentType::Deductions, None),
];

/// Known component names. Read-only once the server is up.
#[derive(Debug, Clone)]
pub struct ComponentCatalog {
    entries: Vec<CatalogEntry>,
    by_name: HashMap<String, usize>,
}

impl ComponentCatalog {
    pub fn builtin() -> Self {
        let entries = BUILTIN
            .iter()
            .map(|(name, kind, pct)| CatalogEntry {
                name: name.to_string(),
                default_type: *kind,
                default_percentage: pct.map(Decimal::from),
            })
            .collect();

        // the table above has unique names and sane percentages
        Self::index(entries)
    }

    pub fn from_entries(entries: Vec<CatalogEntry>) -> anyhow::Result<Self> {
        let mut seen = HashSet::new();
        for entry in &entries {
            if entry.name.trim().is_empty() {
                bail!("catalog entry with empty name");
            }
            if !seen.insert(entry.name.as_str()) {
                bail!("duplicate catalog entry '{}'", entry.name);
            }
            if let Some(pct) = entry.default_percentage {
                if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                    bail!("catalog entry '{}' has percentage {pct} outside 0..=100", entry.name);
                }
            }
        }
        Ok(Self::index(entries))
    }

    /// Loads the catalog from a JSON file, or the built-in one when no path is set.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            info!("Using built-in component catalog");
            return Ok(Self::builtin());
        };

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading component catalog {}", path.display()))?;
        let entries: Vec<CatalogEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing component catalog {}", path.display()))?;

        let catalog = Self::from_entries(entries)?;
        info!(entries = catalog.entries.len(), path = %path.display(), "Component catalog loaded");
        Ok(catalog)
    }

    fn index(entries: Vec<CatalogEntry>) -> Self {
        let by_name = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        Self { entries, by_name }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Case-sensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&CatalogEntry> {
        self.by_name.get(name).map(|&i| &self.entries[i])
    }

    pub fn validate(&self, name: &str, claimed: ComponentType) -> CatalogVerdict {
        match self.lookup(name) {
            Some(entry) if entry.default_type == claimed => CatalogVerdict::Ok,
            Some(entry) => CatalogVerdict::MismatchedType {
                expected: entry.default_type,
            },
            None => CatalogVerdict::UnknownName,
        }
    }

    /// Settles the type of a new component. Unknown names need an explicit type.
    pub fn resolve_type(
        &self,
        name: &str,
        claimed: Option<ComponentType>,
    ) -> Result<ComponentType, PayrollError> {
        match claimed {
            Some(kind) => match self.validate(name, kind) {
                CatalogVerdict::Ok | CatalogVerdict::UnknownName => Ok(kind),
                CatalogVerdict::MismatchedType { expected } => Err(PayrollError::CatalogMismatch {
                    name: name.to_string(),
                    expected: expected.to_string(),
                    claimed: kind.to_string(),
                }),
            },
            None => self.lookup(name).map(|e| e.default_type).ok_or_else(|| {
                PayrollError::Validation(format!(
                    "component_type is required for '{name}', which is not in the catalog"
                ))
            }),
        }
    }
}
