//! Catalog response types.

use serde::Deserialize;
use serde_json::Value;

/// One record of a catalog lookup.
///
/// The catalog returns more fields per record; only the component UUID is
/// consumed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub component_uuid: String,
}

impl CatalogEntry {
    pub fn new(component_uuid: impl Into<String>) -> Self {
        Self {
            component_uuid: component_uuid.into(),
        }
    }
}

/// A successful catalog lookup.
///
/// Order is significant: the last entry is the footprint-bearing record and
/// every preceding entry is a symbol-bearing record. The entry list is never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogResponse {
    entries: Vec<CatalogEntry>,
}

impl CatalogResponse {
    /// Wrap an ordered entry list. Returns `None` for an empty list.
    pub fn new(entries: Vec<CatalogEntry>) -> Option<Self> {
        if entries.is_empty() {
            None
        } else {
            Some(Self { entries })
        }
    }

    /// All entries in catalog order.
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// UUID of the footprint-bearing record (the last entry).
    pub fn footprint_uuid(&self) -> &str {
        // Non-empty by construction.
        &self.entries[self.entries.len() - 1].component_uuid
    }

    /// UUIDs of the symbol-bearing records (every entry but the last), in
    /// catalog order.
    pub fn symbol_uuids(&self) -> Vec<String> {
        self.entries[..self.entries.len() - 1]
            .iter()
            .map(|e| e.component_uuid.clone())
            .collect()
    }
}

/// Result of a lookup that reached the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    /// The catalog knows the part.
    Found(CatalogResponse),
    /// The catalog answered but reported failure (typo or delisted part).
    NotFound,
}

/// Wire shape of the catalog body.
///
/// Both fields stay untyped: a failed lookup may carry anything in
/// `result`, so the records are only decoded once `success` is `true`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawCatalogBody {
    #[serde(default)]
    pub success: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
}

impl RawCatalogBody {
    /// `success` is exactly `true`.
    pub fn succeeded(&self) -> bool {
        matches!(self.success, Some(Value::Bool(true)))
    }

    /// `success` is exactly `false`.
    pub fn explicitly_failed(&self) -> bool {
        matches!(self.success, Some(Value::Bool(false)))
    }

    /// Decode the records of a successful body.
    pub fn entries(self) -> Result<Vec<CatalogEntry>, serde_json::Error> {
        match self.result {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value),
        }
    }
}
