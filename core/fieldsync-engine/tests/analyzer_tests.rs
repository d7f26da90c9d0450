//! Analyzer behaviour, including property-based checks of the scoring rules.

use fieldsync_engine::analyzer::{analyze, is_structural_property, value_matches};
use fieldsync_types::{
    FieldConfiguration, FieldDescriptor, FieldType, MatchAnalysis, Properties, RecommendedAction,
    Severity,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};

fn live(type_code: i32, ui_type: &str, properties: Value) -> FieldDescriptor {
    FieldDescriptor {
        id: "fld1".into(),
        name: "Score".into(),
        type_code,
        ui_type: ui_type.into(),
        is_primary: false,
        properties: match properties {
            Value::Object(map) => map,
            _ => Properties::new(),
        },
        description: None,
    }
}

// ── Examples ────────────────────────────────────────────────────

#[test]
fn rating_range_change_is_critical() {
    let field = live(2, "Rating", json!({"min": 1, "max": 5, "rating": {"symbol": "star"}}));
    let desired = FieldConfiguration::rating("Score", 1, 10);

    let analysis = analyze(&field, &desired);
    assert_eq!(analysis.differences.len(), 1);
    assert_eq!(analysis.differences[0].property, "property.max");
    assert_eq!(analysis.differences[0].from, Some(json!(5)));
    assert_eq!(analysis.differences[0].to, Some(json!(10)));
    assert_eq!(analysis.recommended_action, RecommendedAction::RecreateField);
    assert!((analysis.match_score - 0.84).abs() < 1e-9);
}

#[test]
fn cosmetic_property_change_is_minor() {
    let field = live(2, "Number", json!({"formatter": "0"}));
    let desired = FieldConfiguration::number("Score").with_property("formatter", json!("0.00"));

    let analysis = analyze(&field, &desired);
    assert_eq!(analysis.differences.len(), 1);
    assert_eq!(analysis.differences[0].severity, Severity::Minor);
    assert_eq!(analysis.recommended_action, RecommendedAction::UpdateField);
    assert!((analysis.match_score - 0.96).abs() < 1e-9);
}

#[test]
fn type_and_ui_type_both_reported() {
    let field = live(1, "Text", json!({}));
    let desired = FieldConfiguration::single_select("Score", ["Low", "High"]);

    let analysis = analyze(&field, &desired);
    let paths: Vec<_> = analysis.differences.iter().map(|d| d.property.as_str()).collect();
    assert_eq!(paths, vec!["type", "ui_type", "property.options"]);
    assert_eq!(analysis.critical_count(), 3);
    assert!(
        analysis.differences[0]
            .description
            .as_deref()
            .is_some_and(|d| d.contains("Text") && d.contains("SingleSelect"))
    );
}

#[test]
fn empty_desired_ui_type_is_not_compared() {
    let field = live(1, "Text", json!({}));
    let desired = FieldConfiguration::new("Score", 1, "");
    assert!(analyze(&field, &desired).is_full_match);

    let unknown = live(42, "Barcode", json!({}));
    assert!(analyze(&unknown, &FieldConfiguration::new("Score", 42, "")).is_full_match);
}

#[test]
fn service_added_keys_are_ignored() {
    let field = live(
        3,
        "SingleSelect",
        json!({"options": [{"id": "optA", "name": "Low", "color": 0}, {"id": "optB", "name": "High", "color": 3}]}),
    );
    let desired = FieldConfiguration::single_select("Score", ["Low", "High"]);
    assert!(analyze(&field, &desired).is_full_match);
}

#[test]
fn option_order_matters() {
    let field = live(3, "SingleSelect", json!({"options": [{"name": "High"}, {"name": "Low"}]}));
    let desired = FieldConfiguration::single_select("Score", ["Low", "High"]);
    assert!(!analyze(&field, &desired).is_full_match);
}

#[test]
fn description_whitespace_is_ignored() {
    let mut field = live(1, "Text", json!({}));
    field.description = Some("  reading notes\n".into());
    let desired = FieldConfiguration::text("Score").with_description("reading notes");
    assert!(analyze(&field, &desired).is_full_match);
}

#[test]
fn unset_description_is_not_compared() {
    let mut field = live(1, "Text", json!({}));
    field.description = Some("anything".into());
    assert!(analyze(&field, &FieldConfiguration::text("Score")).is_full_match);
}

#[test]
fn empty_desired_description_clears_live_one() {
    let mut field = live(1, "Text", json!({}));
    field.description = Some("old".into());
    let desired = FieldConfiguration::text("Score").with_description("");

    let analysis = analyze(&field, &desired);
    assert_eq!(analysis.differences.len(), 1);
    assert_eq!(analysis.differences[0].property, "description");
}

#[test]
fn missing_live_property_is_a_difference() {
    let field = live(2, "Number", json!({}));
    let desired = FieldConfiguration::number("Score").with_property("formatter", json!("0.0"));

    let analysis = analyze(&field, &desired);
    assert_eq!(analysis.differences[0].from, None);
    assert_eq!(analysis.differences[0].to, Some(json!("0.0")));
}

#[test]
fn structural_key_catalogue() {
    for key in ["options", "min", "max", "table_id", "formula_expression"] {
        assert!(is_structural_property(key), "{key} should be structural");
    }
    for key in ["formatter", "date_formatter", "auto_fill"] {
        assert!(!is_structural_property(key), "{key} should be cosmetic");
    }
}

// ── Properties ──────────────────────────────────────────────────

fn type_strategy() -> impl Strategy<Value = FieldType> {
    prop::sample::select(vec![
        FieldType::Text,
        FieldType::Number,
        FieldType::SingleSelect,
        FieldType::MultiSelect,
        FieldType::DateTime,
        FieldType::Checkbox,
        FieldType::Url,
    ])
}

fn scalar_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<bool>().prop_map(Value::from),
        (-1000i64..1000).prop_map(Value::from),
        "[a-z]{0,8}".prop_map(Value::from),
    ]
}

fn properties_strategy() -> impl Strategy<Value = Properties> {
    prop::collection::btree_map("[a-z_]{1,10}", scalar_strategy(), 0..5)
        .prop_map(|map| map.into_iter().collect())
}

fn descriptor_strategy() -> impl Strategy<Value = FieldDescriptor> {
    (
        type_strategy(),
        properties_strategy(),
        prop::option::of("[a-zA-Z ]{0,20}"),
    )
        .prop_map(|(field_type, properties, description)| FieldDescriptor {
            id: "fldP".into(),
            name: "Prop".into(),
            type_code: field_type.code(),
            ui_type: field_type.default_ui_type().into(),
            is_primary: false,
            properties,
            description,
        })
}

proptest! {
    /// A live field always matches its own configuration.
    #[test]
    fn self_configuration_is_full_match(field in descriptor_strategy()) {
        let analysis = analyze(&field, &field.to_configuration());
        prop_assert!(analysis.is_full_match);
        prop_assert_eq!(analysis.match_score, 1.0);
        prop_assert_eq!(analysis.recommended_action, RecommendedAction::NoAction);
    }

    /// Recreate is recommended exactly when a critical difference exists.
    #[test]
    fn recreate_iff_critical(
        field in descriptor_strategy(),
        desired_type in type_strategy(),
        extra in properties_strategy(),
    ) {
        let mut desired = FieldConfiguration::of_type("Prop", desired_type);
        desired.properties = extra;

        let analysis = analyze(&field, &desired);
        prop_assert_eq!(analysis.is_full_match, analysis.differences.is_empty());
        prop_assert_eq!(
            analysis.recommended_action == RecommendedAction::RecreateField,
            analysis.has_critical()
        );
        prop_assert!((0.0..=1.0).contains(&analysis.match_score));
    }

    /// Adding a difference of either severity never raises the score.
    #[test]
    fn score_is_monotonic(critical in 0usize..10, minor in 0usize..30) {
        let base = MatchAnalysis::score(critical, minor);
        prop_assert!(MatchAnalysis::score(critical + 1, minor) <= base);
        prop_assert!(MatchAnalysis::score(critical, minor + 1) <= base);
        prop_assert!((0.0..=1.0).contains(&base));
    }

    /// Subset matching: any object matches the empty object and itself.
    #[test]
    fn value_matches_is_reflexive(props in properties_strategy()) {
        let value = Value::Object(props);
        prop_assert!(value_matches(&value, &value));
        let empty = json!({});
        prop_assert!(value_matches(&value, &empty));
    }
}
