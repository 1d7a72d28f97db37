use circ_core::errors::{CircuitError, ErrorInfo};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("node", "0")
        .with_context("reason", "example")
}

#[test]
fn structural_error_surface() {
    let err = CircuitError::Structural(sample_info("H001", "missing truncation"));
    assert_eq!(err.info().code, "H001");
    assert!(err.info().context.contains_key("node"));
}

#[test]
fn convergence_error_surface() {
    let err = CircuitError::Convergence(sample_info("E001", "iteration cap"));
    assert_eq!(err.info().code, "E001");
    assert!(err.info().context.contains_key("reason"));
}

#[test]
fn substitution_error_surface() {
    let err = CircuitError::Substitution(sample_info("S001", "no value for EJ"));
    assert_eq!(err.code(), "S001");
}

#[test]
fn unsupported_operator_surface() {
    let err = CircuitError::unsupported("O001", "unknown operator").with_context("name", "foo3");
    assert_eq!(err.info().context.get("name").map(String::as_str), Some("foo3"));
}

#[test]
fn hints_survive_family_mapping() {
    let err = CircuitError::structural("H002", "bad hierarchy").with_hint("use [[1],[2]]");
    assert!(matches!(err, CircuitError::Structural(_)));
    assert_eq!(err.info().hint.as_deref(), Some("use [[1],[2]]"));
    let rendered = err.to_string();
    assert!(rendered.starts_with("structural error: bad hierarchy (code: H002)"));
    assert!(rendered.contains("hint: use [[1],[2]]"));
}

#[test]
fn errors_serialize_with_family_tag() {
    let err = CircuitError::parse("P001", "unexpected token");
    let json = serde_json::to_value(&err).expect("serialize");
    assert_eq!(json["family"], "Parse");
    assert_eq!(json["detail"]["code"], "P001");
    let back: CircuitError = serde_json::from_value(json).expect("deserialize");
    assert_eq!(back, err);
}
