//! Attribute vocabulary and the feature schema shared by encoder and model
//!
//! The schema is produced once by the encoder and passed explicitly to model
//! construction, so kernel routing never depends on column positions being
//! rediscovered later.

use serde::{Deserialize, Serialize};

/// Current layout version of [`FeatureSchema`]
pub const SCHEMA_VERSION: u32 = 1;

/// An attribute with a fixed, domain-known level order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalAttribute {
    pub name: &'static str,
    /// Levels from lowest to highest code
    pub levels: &'static [&'static str],
}

impl OrdinalAttribute {
    /// Integer code for a level, if it belongs to the domain
    pub fn code(&self, level: &str) -> Option<usize> {
        self.levels.iter().position(|l| *l == level)
    }
}

/// Ordinal attributes in column order
pub const ORDINAL_ATTRIBUTES: [OrdinalAttribute; 5] = [
    OrdinalAttribute {
        name: "price",
        levels: &["Expensive", "Average", "Cheap"],
    },
    OrdinalAttribute {
        name: "roast level",
        levels: &["Light", "Medium", "Medium-dark", "Dark"],
    },
    OrdinalAttribute {
        name: "espresso",
        levels: &["Horrible", "Mediocre", "Good", "Exceptional"],
    },
    OrdinalAttribute {
        name: "sweetness",
        levels: &["Subtle", "Sweet", "Balanced"],
    },
    OrdinalAttribute {
        name: "strength",
        levels: &["Weak", "Strong", "Balanced"],
    },
];

/// One-hot expanded attributes in block order
pub const CATEGORICAL_ATTRIBUTES: [&str; 5] = [
    "house syrups",
    "specialty drinks",
    "espresso variety",
    "mixed",
    "edible decor",
];

/// Every attribute key a query may carry
pub fn attribute_names() -> impl Iterator<Item = &'static str> {
    ORDINAL_ATTRIBUTES
        .iter()
        .map(|a| a.name)
        .chain(CATEGORICAL_ATTRIBUTES.iter().copied())
}

/// Look up an ordinal attribute by name
pub fn ordinal_attribute(name: &str) -> Option<&'static OrdinalAttribute> {
    ORDINAL_ATTRIBUTES.iter().find(|a| a.name == name)
}

/// How a column is routed inside the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Ordinal,
    OneHot,
    Continuous,
}

impl ColumnKind {
    /// Ordinal and one-hot columns both go to the categorical kernel
    pub fn is_categorical(self) -> bool {
        matches!(self, ColumnKind::Ordinal | ColumnKind::OneHot)
    }
}

/// A single column of the encoded design matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureColumn {
    pub name: String,
    pub attribute: String,
    pub kind: ColumnKind,
    /// Number of levels for ordinal columns, block width for one-hot columns,
    /// zero for continuous columns
    pub cardinality: usize,
}

/// Ordered column layout of the design matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    pub version: u32,
    pub columns: Vec<FeatureColumn>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<FeatureColumn>) -> Self {
        Self {
            version: SCHEMA_VERSION,
            columns,
        }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Indices of columns handled by the categorical kernel
    pub fn categorical_dims(&self) -> Vec<usize> {
        self.dims_where(|kind| kind.is_categorical())
    }

    /// Indices of columns handled by the smooth kernel
    pub fn continuous_dims(&self) -> Vec<usize> {
        self.dims_where(|kind| !kind.is_categorical())
    }

    fn dims_where(&self, pred: impl Fn(ColumnKind) -> bool) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| pred(c.kind))
            .map(|(i, _)| i)
            .collect()
    }
}
