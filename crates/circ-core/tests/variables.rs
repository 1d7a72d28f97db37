use circ_core::{ExtBasis, MatrixFormat, Variable};

#[test]
fn dimensions_follow_cutoffs() {
    assert_eq!(Variable::periodic(1).dimension(5), 11);
    assert_eq!(Variable::extended(2).dimension(30), 30);
    assert_eq!(Variable::periodic(1).default_cutoff(), 5);
    assert_eq!(Variable::extended(1).default_cutoff(), 30);
}

#[test]
fn dense_only_for_single_harmonic_variable() {
    assert_eq!(MatrixFormat::for_node(1, ExtBasis::Harmonic), MatrixFormat::Dense);
    assert_eq!(MatrixFormat::for_node(2, ExtBasis::Harmonic), MatrixFormat::Sparse);
    assert_eq!(MatrixFormat::for_node(1, ExtBasis::Discretized), MatrixFormat::Sparse);
}
