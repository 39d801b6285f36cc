//! Property-based tests for tool input validation
//!
//! - Inputs holding every required field with the right type always pass
//! - Every extra key is reported, and reported once
//! - Reported fields come back sorted

use super::schema::{FieldKind, IssueReason, ToolSchema};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn city_schema() -> ToolSchema {
    ToolSchema::new()
        .required("city", FieldKind::String, "City name")
        .optional("days", FieldKind::Integer, "Forecast length")
}

proptest! {
    #[test]
    fn prop_well_typed_input_passes(
        city in "[a-zA-Z ]{0,40}",
        days in proptest::option::of(0i64..30),
    ) {
        let mut input = json!({ "city": city });
        if let Some(days) = days {
            input["days"] = json!(days);
        }
        let validated = city_schema().validate(&input).unwrap();
        prop_assert_eq!(validated.get_str("city"), Some(city.as_str()));
    }

    #[test]
    fn prop_extra_keys_reported_sorted(
        extras in proptest::collection::btree_set("x_[a-z]{1,8}", 1..6),
    ) {
        let mut object = Map::new();
        object.insert("city".to_string(), json!("Paris"));
        for key in &extras {
            object.insert(key.clone(), Value::Bool(true));
        }

        let err = city_schema().validate(&Value::Object(object)).unwrap_err();
        let fields = err.fields();
        prop_assert_eq!(fields.len(), extras.len());
        prop_assert!(fields.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(err.issues().iter().all(|i| i.reason == IssueReason::Unexpected));
    }

    #[test]
    fn prop_non_string_city_rejected(value in prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::from),
        Just(json!(["Paris"])),
    ]) {
        let err = city_schema().validate(&json!({ "city": value })).unwrap_err();
        prop_assert_eq!(err.fields(), vec!["city"]);
    }
}
