//! Property tests for the feature encoder

use crema_ai_core::{
    attribute_names, FeatureEncoder, ShopRecord, CATEGORICAL_ATTRIBUTES, ORDINAL_ATTRIBUTES,
};
use proptest::prelude::*;

const FLAGS: [&str; 3] = ["Yes", "No", "Some"];

fn arbitrary_shop() -> impl Strategy<Value = ShopRecord> {
    let ordinals: Vec<_> = ORDINAL_ATTRIBUTES
        .iter()
        .map(|a| prop::sample::select(a.levels.to_vec()))
        .collect();
    let flags = prop::collection::vec(prop::sample::select(FLAGS.to_vec()), CATEGORICAL_ATTRIBUTES.len());
    (ordinals, flags, 1.0f64..=5.0).prop_map(|(ords, flags, rating)| {
        let mut record = ShopRecord::new("shop").with_rating(rating);
        for (key, value) in attribute_names().zip(ords.into_iter().chain(flags)) {
            record = record.with_attribute(key, value);
        }
        record
    })
}

proptest! {
    #[test]
    fn test_transform_is_idempotent(corpus in prop::collection::vec(arbitrary_shop(), 1..12)) {
        let fitted = FeatureEncoder::new().fit(&corpus).unwrap();
        for record in &corpus {
            prop_assert_eq!(fitted.transform(record).unwrap(), fitted.transform(record).unwrap());
        }
    }
}

proptest! {
    #[test]
    fn test_one_hot_blocks_sum_to_one(corpus in prop::collection::vec(arbitrary_shop(), 1..12)) {
        let fitted = FeatureEncoder::new().fit(&corpus).unwrap();
        for record in &corpus {
            let row = fitted.transform(record).unwrap();
            let mut offset = ORDINAL_ATTRIBUTES.len();
            for block in fitted.one_hot_blocks() {
                let width = block.categories.len();
                let sum: f64 = row[offset..offset + width].iter().sum();
                prop_assert_eq!(sum, 1.0);
                offset += width;
            }
            prop_assert_eq!(offset, row.len());
        }
    }
}

proptest! {
    #[test]
    fn test_query_layout_matches_training_layout(
        corpus in prop::collection::vec(arbitrary_shop(), 1..12),
        pick in 0usize..12,
    ) {
        let fitted = FeatureEncoder::new().fit(&corpus).unwrap();
        let source = &corpus[pick % corpus.len()];
        let query = ShopRecord::query(source.attributes.clone());
        prop_assert_eq!(fitted.transform(&query).unwrap().len(), fitted.feature_count());
    }
}

#[test]
fn test_ordinal_codes_are_monotonic_for_every_attribute() {
    let base: Vec<(&str, &str)> = attribute_names()
        .map(|name| {
            let value = ORDINAL_ATTRIBUTES
                .iter()
                .find(|a| a.name == name)
                .map_or("Yes", |a| a.levels[0]);
            (name, value)
        })
        .collect();

    let corpus = vec![ShopRecord::query(base.clone())];
    let fitted = FeatureEncoder::new().fit(&corpus).unwrap();

    for (column, attribute) in ORDINAL_ATTRIBUTES.iter().enumerate() {
        let codes: Vec<f64> = attribute
            .levels
            .iter()
            .map(|level| {
                let record = ShopRecord::query(base.clone()).with_attribute(attribute.name, *level);
                fitted.transform(&record).unwrap()[column]
            })
            .collect();
        assert!(
            codes.windows(2).all(|w| w[0] < w[1]),
            "{} codes not increasing: {:?}",
            attribute.name,
            codes
        );
    }
}

#[test]
fn test_price_chain_expensive_average_cheap() {
    let record = |price: &str| {
        ShopRecord::query([
            ("price", price),
            ("roast level", "Dark"),
            ("espresso", "Good"),
            ("sweetness", "Sweet"),
            ("strength", "Strong"),
            ("house syrups", "Yes"),
            ("specialty drinks", "Yes"),
            ("espresso variety", "No"),
            ("mixed", "No"),
            ("edible decor", "No"),
        ])
    };
    let fitted = FeatureEncoder::new().fit(&[record("Average")]).unwrap();
    let code = |p: &str| fitted.transform(&record(p)).unwrap()[0];
    assert!(code("Expensive") < code("Average"));
    assert!(code("Average") < code("Cheap"));
}
