//! Tests for expression construction and typing

use serde_json::json;

use super::*;

fn input(name: &str, ty: ValueType) -> Expr {
    Expr::parameter(
        ParamSource::Input {
            name: name.to_string(),
        },
        ty,
    )
}

// ============================================================================
// Comparison
// ============================================================================

#[test]
fn test_comparison_same_numeric_type() {
    let cmp = Expr::literal(5).greater_than(Expr::literal(10)).unwrap();
    assert_eq!(cmp.ty(), ValueType::Boolean);
    assert_eq!(cmp.kind(), "comparison");
}

#[test]
fn test_comparison_number_vs_object_rejected() {
    let err = Expr::literal(5)
        .greater_than(Expr::literal(json!({"a": 1})))
        .unwrap_err();
    assert!(matches!(err, ExprError::OperandMismatch { op: ">", .. }));
}

#[test]
fn test_comparison_mixed_scalars_rejected() {
    let err = Expr::literal(5).equals(Expr::string("5")).unwrap_err();
    assert!(matches!(err, ExprError::OperandMismatch { .. }));

    // identical types are required, integer does not widen here
    assert!(Expr::literal(5).less_than(Expr::literal(2.5)).is_err());
}

#[test]
fn test_ordering_rejected_for_booleans() {
    assert!(Expr::literal(true).equals(Expr::literal(false)).is_ok());
    let err = Expr::literal(true).less_than(Expr::literal(false)).unwrap_err();
    assert!(matches!(err, ExprError::UnsupportedOperand { op: "<", .. }));
}

// ============================================================================
// Ternary / logic / arithmetic
// ============================================================================

#[test]
fn test_ternary_shares_branch_type() {
    let cond = input("enabled", ValueType::Boolean);
    let expr = Expr::ternary(cond, Expr::string("on"), Expr::string("off")).unwrap();
    assert_eq!(expr.ty(), ValueType::String);

    let cond = input("enabled", ValueType::Boolean);
    let widened = Expr::ternary(cond, Expr::literal(1), Expr::literal(1.5)).unwrap();
    assert_eq!(widened.ty(), ValueType::Number);
}

#[test]
fn test_ternary_rejects_mismatched_branches_and_conditions() {
    let cond = input("enabled", ValueType::Boolean);
    let err = Expr::ternary(cond, Expr::string("a"), Expr::literal(1)).unwrap_err();
    assert!(matches!(err, ExprError::BranchMismatch(..)));

    let err = Expr::ternary(Expr::string("yes"), Expr::literal(1), Expr::literal(2)).unwrap_err();
    assert!(matches!(err, ExprError::NonBooleanCondition(ValueType::String)));
}

#[test]
fn test_arithmetic_result_types() {
    let sum = Expr::literal(1).plus(Expr::literal(2)).unwrap();
    assert_eq!(sum.ty(), ValueType::Integer);

    let quotient = Expr::literal(4).divided_by(Expr::literal(2)).unwrap();
    assert_eq!(quotient.ty(), ValueType::Number);

    assert!(Expr::string("a").plus(Expr::literal(1)).is_err());
}

#[test]
fn test_logical_requires_booleans() {
    let a = Expr::literal(1).less_than(Expr::literal(2)).unwrap();
    let b = input("flag", ValueType::Boolean);
    assert!(a.clone().and(b).is_ok());
    assert!(a.or(Expr::literal(1)).is_err());
    assert!(Expr::literal(1).negate().is_err());
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_path_tracks_known_shape() {
    let config = input(
        "config",
        ValueType::record([(
            "source",
            ValueType::record([("endpoint", ValueType::String)]),
        )]),
    );
    let endpoint = config.path(["source", "endpoint"]).unwrap();
    assert_eq!(endpoint.ty(), ValueType::String);
}

#[test]
fn test_path_rejects_unknown_field() {
    let config = input("config", ValueType::record([("source", ValueType::String)]));
    assert!(matches!(
        config.path(["target"]),
        Err(ExprError::InvalidPath { .. })
    ));
}

#[test]
fn test_json_path_on_document_degrades_to_any() {
    let doc = input("status", ValueType::String);
    let phase = doc.json_path("$.status.phase").unwrap();
    assert_eq!(phase.ty(), ValueType::Any);

    // still usable by the type-preserving combinators after a cast
    let done = phase
        .cast(ValueType::String)
        .equals(Expr::string("Completed"))
        .unwrap();
    assert_eq!(done.ty(), ValueType::Boolean);
}

#[test]
fn test_dig_fallback_must_match() {
    let config = input(
        "config",
        ValueType::record([("replicas", ValueType::Integer)]),
    );
    let replicas = config.clone().dig(["replicas"], Expr::literal(1)).unwrap();
    assert_eq!(replicas.ty(), ValueType::Integer);

    let err = config.dig(["replicas"], Expr::string("one")).unwrap_err();
    assert!(matches!(err, ExprError::FallbackMismatch { .. }));

    let raw = input("raw", ValueType::Any);
    let dug = raw.dig(["a", "b"], Expr::string("x")).unwrap();
    assert_eq!(dug.ty(), ValueType::String);
}

// ============================================================================
// Arrays / strings / config maps
// ============================================================================

#[test]
fn test_array_length_and_index() {
    let hosts = input("hosts", ValueType::array(ValueType::String));
    assert_eq!(hosts.clone().length().unwrap().ty(), ValueType::Integer);
    assert_eq!(
        hosts.clone().index(Expr::literal(0)).unwrap().ty(),
        ValueType::String
    );
    assert!(matches!(
        hosts.index(Expr::string("0")),
        Err(ExprError::NonIntegerIndex(_))
    ));
    assert!(matches!(
        Expr::string("x").length(),
        Err(ExprError::NotAnArray(ValueType::String))
    ));
}

#[test]
fn test_concat_requires_strings() {
    let ok = Expr::concat_with(vec![Expr::string("a"), input("b", ValueType::String)], "-");
    assert!(ok.is_ok());

    let err = Expr::concat(vec![Expr::string("a"), Expr::literal(1)]).unwrap_err();
    assert!(matches!(err, ExprError::NonStringConcatPart { index: 1, .. }));

    let coerced = Expr::concat(vec![
        Expr::string("n="),
        Expr::literal(1).as_string().unwrap(),
    ]);
    assert!(coerced.is_ok());
}

#[test]
fn test_config_map_is_not_composable() {
    let cm = Expr::config_map("migration-config", "endpoint", ValueType::String);
    let err = Expr::concat(vec![Expr::string("x"), cm.clone()]).unwrap_err();
    assert!(matches!(err, ExprError::ConfigMapNotComposable { .. }));

    // casting keeps it a bindable config map value
    assert_eq!(cm.cast(ValueType::Any).kind(), "configmap");
}

#[test]
fn test_references_walk_whole_tree() {
    let a = input("a", ValueType::Integer);
    let b = Expr::parameter(
        ParamSource::StepOutput {
            step: "s1".to_string(),
            name: "out".to_string(),
        },
        ValueType::Integer,
    );
    let expr = a.plus(b).unwrap().greater_than(Expr::literal(3)).unwrap();
    let refs: Vec<String> = expr.references().iter().map(|r| r.describe()).collect();
    assert_eq!(
        refs,
        vec!["inputs.parameters.a", "steps.s1.outputs.parameters.out"]
    );
    assert!(!expr.uses_item());
}

#[test]
fn test_serialized_nodes_are_tagged() {
    let value = Expr::string("x").to_value();
    assert_eq!(value["$expr"], "literal");
    let back: Expr = serde_json::from_value(value).unwrap();
    assert_eq!(back, Expr::string("x"));
}
