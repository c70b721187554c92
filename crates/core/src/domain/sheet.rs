// Partition Sheet Domain Model

use serde::{Deserialize, Serialize};

/// A partition sheet as seen through the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetDescriptor {
    pub name: String,
    pub exists: bool,
}

impl SheetDescriptor {
    pub fn existing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exists: true,
        }
    }
}

/// Header row of the Master Template (schema source for new partitions)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateSheet {
    pub headers: Vec<String>,
}

impl TemplateSheet {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
        }
    }
}

/// Record Mapper row: raw column name -> canonical field name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperEntry {
    pub raw_name: String,
    pub canonical_name: String,
}

impl MapperEntry {
    pub fn new(raw_name: impl Into<String>, canonical_name: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            canonical_name: canonical_name.into(),
        }
    }

    /// Build an entry from a table row; rows without two non-empty cells are skipped
    pub fn from_row(row: &[String]) -> Option<Self> {
        match row {
            [raw, canonical, ..] if !raw.trim().is_empty() && !canonical.trim().is_empty() => {
                Some(Self::new(raw.trim(), canonical.trim()))
            }
            _ => None,
        }
    }
}
