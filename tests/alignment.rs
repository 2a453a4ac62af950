//! Alignment contract tests.
//!
//! Exercises the aligner's guarantees over records that are subsets,
//! supersets, and exact matches of the schema: column exactness, gap
//! filling, extraneous drop, and idempotence.

use autoprice::{align, FeatureSchema, RawRecord};
use rstest::rstest;

const SCHEMA: [&str; 3] = ["vehicle_year", "current_mileage", "vehicle_manufacturer"];

#[rstest]
#[case::exact_match(vec!["vehicle_year", "current_mileage", "vehicle_manufacturer"], vec![])]
#[case::subset(vec!["vehicle_year"], vec![])]
#[case::empty_record(vec![], vec![])]
#[case::superset(vec!["vehicle_year", "current_mileage"], vec!["vehicle_color", "vin"])]
#[case::only_extraneous(vec![], vec!["vehicle_color"])]
fn alignment_properties(#[case] present: Vec<&str>, #[case] extraneous: Vec<&str>) {
    let schema = FeatureSchema::from_names(&SCHEMA).unwrap();

    let mut raw = RawRecord::new();
    for (i, name) in present.iter().enumerate() {
        raw.insert(*name, i as i64);
    }
    for name in &extraneous {
        raw.insert(*name, "extra");
    }

    let row = align(&raw, &schema);

    // Column exactness: names and order are identical to the schema.
    assert_eq!(
        row.columns().collect::<Vec<_>>(),
        schema.iter().collect::<Vec<_>>()
    );
    row.verify(&schema).unwrap();

    // Completeness under gaps: absent names carry the missing sentinel.
    for name in schema.iter() {
        if present.contains(&name) {
            assert!(row.get(name).is_some(), "{name} should be present");
        } else {
            assert!(row.get(name).is_none(), "{name} should be missing");
        }
    }
    assert_eq!(row.n_missing(), schema.len() - present.len());

    // Extraneous drop: nothing outside the schema survives.
    for name in &extraneous {
        assert!(row.columns().all(|c| c != *name));
    }

    // Idempotence: re-aligning the flattened row changes nothing.
    let again = align(&row.to_record(), &schema);
    assert_eq!(again, row);
}

#[test]
fn alignment_does_not_mutate_the_record() {
    let schema = FeatureSchema::from_names(&SCHEMA).unwrap();
    let raw = RawRecord::new()
        .with("vehicle_year", 2018i64)
        .with("vehicle_color", "red");
    let before = raw.clone();

    let _ = align(&raw, &schema);
    assert_eq!(raw, before);
}

#[test]
fn reordered_schema_reorders_the_row() {
    // The same record against a permuted schema yields permuted columns:
    // order comes from the schema alone, never from the record.
    let raw = RawRecord::new()
        .with("vehicle_year", 2018i64)
        .with("current_mileage", 50_000i64);

    let forward = FeatureSchema::from_names(&["vehicle_year", "current_mileage"]).unwrap();
    let backward = FeatureSchema::from_names(&["current_mileage", "vehicle_year"]).unwrap();

    let f = align(&raw, &forward);
    let b = align(&raw, &backward);

    assert_eq!(f.columns().collect::<Vec<_>>(), vec!["vehicle_year", "current_mileage"]);
    assert_eq!(b.columns().collect::<Vec<_>>(), vec!["current_mileage", "vehicle_year"]);
    assert_eq!(f.cell(0), b.cell(1));
    assert_eq!(f.cell(1), b.cell(0));
}
