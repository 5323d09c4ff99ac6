use ctp_core::errors::*;

#[test]
fn structural_error_not_a_tree_carries_counts() {
    let err: CtpError = StructuralError::NotATree {
        cliques: 4,
        edges: 2,
        connected: false,
    }
    .into();
    let msg = err.to_string();
    assert!(msg.contains("4 cliques"));
    assert!(msg.contains("2 edges"));
}

#[test]
fn evidence_error_invalid_state_carries_values() {
    let err = EvidenceError::InvalidState {
        variable: "rain".into(),
        state: 5,
        cardinality: 2,
    };
    let msg = err.to_string();
    assert!(msg.contains("rain"));
    assert!(msg.contains('5'));
    assert!(msg.contains('2'));
}

#[test]
fn numeric_underflow_carries_context() {
    let err: CtpError = NumericError::Underflow {
        context: "message 3 -> 1".into(),
        value: 0.0,
    }
    .into();
    assert!(matches!(err, CtpError::Numeric(NumericError::Underflow { .. })));
    assert!(err.to_string().contains("message 3 -> 1"));
}

#[test]
fn query_and_pool_errors_convert() {
    let err: CtpError = QueryError::EmptyQuery.into();
    assert!(matches!(err, CtpError::Query(QueryError::EmptyQuery)));

    let err: CtpError = PoolError::Overflow { capacity: 3 }.into();
    assert!(err.to_string().contains("capacity 3"));
}

#[test]
fn interrupted_names_the_operation() {
    let err = CtpError::Interrupted {
        operation: "propagate".into(),
    };
    assert!(err.to_string().contains("propagate"));
}
