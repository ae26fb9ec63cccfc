//! Shop profiles as consumed by the encoder

use crate::errors::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Identifier given to records built from a user query
pub const QUERY_RECORD_NAME: &str = "query";

/// One historical or queried shop profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopRecord {
    /// Shop name (document file stem)
    pub name: String,
    /// Free-form location, never used as a feature
    pub location: Option<String>,
    /// Known customer rating, absent for queries
    pub rating: Option<f64>,
    /// Raw attribute values keyed by attribute name
    pub attributes: BTreeMap<String, String>,
}

impl ShopRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
            rating: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Build an unrated record from a query mapping
    pub fn query<K, V>(attributes: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut record = Self::new(QUERY_RECORD_NAME);
        for (key, value) in attributes {
            record.attributes.insert(key.into(), value.into());
        }
        record
    }

    /// Build a record from a parsed metadata block.
    ///
    /// `rating` and `location` are lifted out of the map; every other key is
    /// kept as an attribute. A rating that does not parse as a finite number
    /// is a corpus error.
    pub fn from_metadata(name: impl Into<String>, mut metadata: HashMap<String, String>) -> Result<Self> {
        let name = name.into();
        let rating = match metadata.remove("rating") {
            Some(raw) if raw.trim().is_empty() => None,
            Some(raw) => match raw.trim().parse::<f64>() {
                Ok(rating) if rating.is_finite() => Some(rating),
                _ => {
                    return Err(CoreError::Corpus(format!(
                        "record '{}' has non-numeric rating {:?}",
                        name, raw
                    )))
                }
            },
            None => None,
        };
        let location = metadata.remove("location");

        Ok(Self {
            name,
            location,
            rating,
            attributes: metadata.into_iter().collect(),
        })
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = Some(rating);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Attribute value with surrounding whitespace and quotes removed.
    /// A blank value counts as absent.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .get(key)
            .map(|v| v.trim().trim_matches('"').trim())
            .filter(|v| !v.is_empty())
    }

    /// Like [`ShopRecord::attribute`] but a missing or blank value is an error
    pub fn require(&self, key: &str) -> Result<&str> {
        self.attribute(key).ok_or_else(|| CoreError::MissingAttribute {
            attribute: key.to_string(),
            record: self.name.clone(),
        })
    }
}
