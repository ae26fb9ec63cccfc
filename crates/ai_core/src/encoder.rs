//! Deterministic feature encoding for shop records
//!
//! Produces a fixed column layout:
//! - one integer column per ordinal attribute, using the hand-specified level
//!   order from [`ORDINAL_ATTRIBUTES`]
//! - one indicator column per observed category for each attribute in
//!   [`CATEGORICAL_ATTRIBUTES`], categories sorted lexicographically
//!
//! The layout is frozen at fit time and reused for every later transform.

use crate::errors::{CoreError, Result};
use crate::record::ShopRecord;
use crate::schema::{
    ColumnKind, FeatureColumn, FeatureSchema, OrdinalAttribute, CATEGORICAL_ATTRIBUTES,
    ORDINAL_ATTRIBUTES,
};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, instrument};

/// Encoded feature vector
pub type FeatureVector = Vec<f64>;

/// Learns the one-hot vocabulary from a corpus
#[derive(Debug, Clone, Default)]
pub struct FeatureEncoder;

/// Observed categories of one one-hot attribute, in column order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotBlock {
    pub attribute: String,
    pub categories: Vec<String>,
}

/// Immutable encoder state produced by [`FeatureEncoder::fit`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedEncoder {
    schema: FeatureSchema,
    blocks: Vec<OneHotBlock>,
}

impl FeatureEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Fit the encoder on the historical corpus.
    ///
    /// Every record must carry all ten attributes and every ordinal value must
    /// belong to its fixed domain.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn fit(&self, records: &[ShopRecord]) -> Result<FittedEncoder> {
        if records.is_empty() {
            return Err(CoreError::Corpus("cannot fit encoder on an empty corpus".into()));
        }

        for record in records {
            for attribute in &ORDINAL_ATTRIBUTES {
                ordinal_code(attribute, record)?;
            }
        }

        let blocks = CATEGORICAL_ATTRIBUTES
            .iter()
            .map(|&attribute| {
                let categories = records
                    .iter()
                    .map(|r| r.require(attribute).map(str::to_string))
                    .collect::<Result<BTreeSet<_>>>()?;
                Ok(OneHotBlock {
                    attribute: attribute.to_string(),
                    categories: categories.into_iter().collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut columns: Vec<FeatureColumn> = ORDINAL_ATTRIBUTES
            .iter()
            .map(|a| FeatureColumn {
                name: a.name.to_string(),
                attribute: a.name.to_string(),
                kind: ColumnKind::Ordinal,
                cardinality: a.levels.len(),
            })
            .collect();

        for block in &blocks {
            for category in &block.categories {
                columns.push(FeatureColumn {
                    name: format!("{}_{}", block.attribute, category),
                    attribute: block.attribute.clone(),
                    kind: ColumnKind::OneHot,
                    cardinality: block.categories.len(),
                });
            }
        }

        let schema = FeatureSchema::new(columns);
        debug!(columns = schema.len(), "encoder fitted");

        Ok(FittedEncoder { schema, blocks })
    }

    /// Fit on the corpus and encode it in one pass
    pub fn fit_transform(&self, records: &[ShopRecord]) -> Result<(FittedEncoder, Array2<f64>)> {
        let fitted = self.fit(records)?;
        let matrix = fitted.transform_many(records)?;
        Ok((fitted, matrix))
    }
}

impl FittedEncoder {
    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn one_hot_blocks(&self) -> &[OneHotBlock] {
        &self.blocks
    }

    pub fn feature_count(&self) -> usize {
        self.schema.len()
    }

    /// Encode a single record with the frozen layout
    pub fn transform(&self, record: &ShopRecord) -> Result<FeatureVector> {
        let mut row = Vec::with_capacity(self.schema.len());

        for attribute in &ORDINAL_ATTRIBUTES {
            row.push(ordinal_code(attribute, record)? as f64);
        }

        for block in &self.blocks {
            let value = record.require(&block.attribute)?;
            let hot = block
                .categories
                .iter()
                .position(|c| c == value)
                .ok_or_else(|| CoreError::UnknownCategory {
                    attribute: block.attribute.clone(),
                    value: value.to_string(),
                })?;
            row.extend((0..block.categories.len()).map(|i| if i == hot { 1.0 } else { 0.0 }));
        }

        Ok(row)
    }

    /// Encode many records into a row-major design matrix
    pub fn transform_many(&self, records: &[ShopRecord]) -> Result<Array2<f64>> {
        let width = self.schema.len();
        let mut data = Vec::with_capacity(records.len() * width);
        for record in records {
            data.extend(self.transform(record)?);
        }
        Array2::from_shape_vec((records.len(), width), data)
            .map_err(|e| CoreError::InvalidParameters(format!("design matrix shape: {}", e)))
    }
}

fn ordinal_code(attribute: &OrdinalAttribute, record: &ShopRecord) -> Result<usize> {
    let value = record.require(attribute.name)?;
    attribute.code(value).ok_or_else(|| CoreError::UnknownCategory {
        attribute: attribute.name.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop(name: &str, values: [&str; 10]) -> ShopRecord {
        let mut record = ShopRecord::new(name).with_rating(3.0);
        for (key, value) in crate::schema::attribute_names().zip(values) {
            record = record.with_attribute(key, value);
        }
        record
    }

    fn corpus() -> Vec<ShopRecord> {
        vec![
            shop(
                "a",
                ["Cheap", "Dark", "Good", "Sweet", "Strong", "Yes", "No", "Yes", "No", "Yes"],
            ),
            shop(
                "b",
                ["Expensive", "Light", "Horrible", "Subtle", "Weak", "No", "Yes", "No", "Yes", "No"],
            ),
            shop(
                "c",
                ["Average", "Medium", "Exceptional", "Balanced", "Balanced", "Yes", "Some", "Yes", "No", "No"],
            ),
        ]
    }

    #[test]
    fn test_layout_is_ordinals_then_sorted_one_hot() {
        let fitted = FeatureEncoder::new().fit(&corpus()).unwrap();
        let names = fitted.schema().column_names();
        assert_eq!(&names[..5], &["price", "roast level", "espresso", "sweetness", "strength"]);
        assert_eq!(names[5], "house syrups_No");
        assert_eq!(names[6], "house syrups_Yes");
        assert_eq!(names[7], "specialty drinks_No");
        assert_eq!(names[8], "specialty drinks_Some");
        assert_eq!(names[9], "specialty drinks_Yes");
        assert_eq!(fitted.feature_count(), 5 + 2 + 3 + 2 + 2 + 2);
        assert!(fitted.schema().continuous_dims().is_empty());
    }

    #[test]
    fn test_transform_encodes_ordinals_and_indicators() {
        let records = corpus();
        let fitted = FeatureEncoder::new().fit(&records).unwrap();
        let row = fitted.transform(&records[0]).unwrap();
        assert_eq!(&row[..5], &[2.0, 3.0, 2.0, 1.0, 1.0]);
        // house syrups = Yes
        assert_eq!(&row[5..7], &[0.0, 1.0]);
    }

    #[test]
    fn test_query_with_unseen_category_is_rejected() {
        let fitted = FeatureEncoder::new().fit(&corpus()).unwrap();
        let query = shop(
            "q",
            ["Cheap", "Dark", "Good", "Sweet", "Strong", "Maybe", "No", "Yes", "No", "Yes"],
        );
        let err = fitted.transform(&query).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnknownCategory {
                attribute: "house syrups".into(),
                value: "Maybe".into()
            }
        );
    }

    #[test]
    fn test_out_of_domain_ordinal_fails_fit() {
        let mut records = corpus();
        records[1] = records[1].clone().with_attribute("roast level", "Burnt");
        let err = FeatureEncoder::new().fit(&records).unwrap_err();
        assert!(matches!(err, CoreError::UnknownCategory { ref attribute, .. } if attribute == "roast level"));
    }

    #[test]
    fn test_missing_attribute_fails() {
        let mut records = corpus();
        records[2].attributes.remove("mixed");
        let err = FeatureEncoder::new().fit(&records).unwrap_err();
        assert!(matches!(err, CoreError::MissingAttribute { ref attribute, .. } if attribute == "mixed"));
    }

    #[test]
    fn test_blank_value_is_missing_not_a_category() {
        let mut records = corpus();
        records[0] = records[0].clone().with_attribute("mixed", "");
        let err = FeatureEncoder::new().fit(&records).unwrap_err();
        assert!(matches!(err, CoreError::MissingAttribute { ref attribute, .. } if attribute == "mixed"));

        let mut records = corpus();
        records[0] = records[0].clone().with_attribute("espresso", "  ");
        let err = FeatureEncoder::new().fit(&records).unwrap_err();
        assert!(matches!(err, CoreError::MissingAttribute { ref attribute, .. } if attribute == "espresso"));
    }

    #[test]
    fn test_empty_corpus_is_rejected() {
        let err = FeatureEncoder::new().fit(&[]).unwrap_err();
        assert!(matches!(err, CoreError::Corpus(_)));
    }

    #[test]
    fn test_fit_transform_matches_row_by_row() {
        let records = corpus();
        let (fitted, matrix) = FeatureEncoder::new().fit_transform(&records).unwrap();
        assert_eq!(matrix.nrows(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(matrix.row(i).to_vec(), fitted.transform(record).unwrap());
        }
    }
}
