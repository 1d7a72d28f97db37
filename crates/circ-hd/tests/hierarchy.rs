use approx::assert_relative_eq;
use circ_core::{CircuitError, Variable};
use circ_hd::{
    is_hierarchical, truncation_template, Circuit, CircuitConfig, CircuitDescription, Group,
    TruncDim, DEFAULT_COMBINED_TRUNCATION, DEFAULT_INDIVIDUAL_TRUNCATION,
};
use circ_ops::C64;
use indexmap::IndexMap;
use nalgebra::DMatrix;

fn two_transmons(coupling: f64) -> CircuitDescription {
    CircuitDescription {
        variables: vec![Variable::periodic(1), Variable::periodic(2)],
        parameters: [
            ("EC1", 1.0),
            ("EJ1", 10.0),
            ("EC2", 1.3),
            ("EJ2", 8.0),
            ("G", coupling),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect(),
        external_fluxes: IndexMap::new(),
        offset_charges: IndexMap::new(),
        hamiltonian: "4*EC1*n1^2 - EJ1*cos(θ1) + 4*EC2*n2^2 - EJ2*cos(θ2) + G*n1*n2"
            .to_string(),
    }
}

fn pairwise(truncation: [usize; 2]) -> CircuitConfig {
    CircuitConfig {
        hierarchy: Some(vec![
            Group::Nested(vec![Group::Var(1)]),
            Group::Nested(vec![Group::Var(2)]),
        ]),
        truncation: Some(truncation.iter().map(|d| TruncDim::Individual(*d)).collect()),
        ..CircuitConfig::default()
    }
}

fn code_of<T: std::fmt::Debug>(result: Result<T, CircuitError>) -> String {
    result.expect_err("expected an error").code().to_string()
}

#[test]
fn hierarchy_and_truncation_parse_from_nested_lists() {
    let hierarchy: Vec<Group> = serde_json::from_str("[[[1], [2]], [3], 4]").expect("hierarchy");
    assert_eq!(
        hierarchy,
        vec![
            Group::Nested(vec![
                Group::Nested(vec![Group::Var(1)]),
                Group::Nested(vec![Group::Var(2)]),
            ]),
            Group::Nested(vec![Group::Var(3)]),
            Group::Var(4),
        ]
    );
    assert!(is_hierarchical(&hierarchy));
    assert!(hierarchy[0].is_hierarchical());
    assert!(!hierarchy[1].is_hierarchical());
    assert_eq!(hierarchy[0].indices(), vec![1, 2]);

    let truncation: Vec<TruncDim> = serde_json::from_str("[[6, [3, 3]], 4]").expect("truncation");
    assert_eq!(
        truncation,
        vec![
            TruncDim::Combined(6, vec![TruncDim::Individual(3), TruncDim::Individual(3)]),
            TruncDim::Individual(4),
        ]
    );
    assert_eq!(truncation[0].nested().map(<[TruncDim]>::len), Some(2));
}

#[test]
fn flat_lists_are_not_hierarchical() {
    let flat: Vec<Group> = serde_json::from_str("[1, 2, 3]").expect("flat");
    assert!(!is_hierarchical(&flat));
}

#[test]
fn template_follows_hierarchy_shape() {
    let hierarchy: Vec<Group> = serde_json::from_str("[[[1], [2, 3]], [4]]").expect("hierarchy");
    let template = truncation_template(
        &hierarchy,
        DEFAULT_INDIVIDUAL_TRUNCATION,
        DEFAULT_COMBINED_TRUNCATION,
    );
    assert_eq!(
        template,
        vec![
            TruncDim::Combined(50, vec![TruncDim::Individual(6), TruncDim::Individual(6)]),
            TruncDim::Individual(6),
        ]
    );
}

#[test]
fn malformed_hierarchies_are_structural_errors() {
    let desc = two_transmons(0.1);
    let with = |hierarchy: &str, truncation: Option<&str>| {
        let config = CircuitConfig {
            hierarchy: Some(serde_json::from_str(hierarchy).expect("hierarchy")),
            truncation: truncation.map(|t| serde_json::from_str(t).expect("truncation")),
            ..CircuitConfig::default()
        };
        Circuit::from_description(&desc, config)
    };

    assert_eq!(code_of(with("[[1]]", Some("[4]"))), "hierarchy-partition");
    assert_eq!(code_of(with("[[1, 2], [2]]", Some("[4, 4]"))), "hierarchy-partition");
    assert_eq!(code_of(with("[[1], [3]]", Some("[4, 4]"))), "hierarchy-partition");
    assert_eq!(code_of(with("[[1], []]", Some("[4, 4]"))), "hierarchy-empty");
    assert_eq!(code_of(with("[[1], [2]]", Some("[4]"))), "truncation-shape");
    assert_eq!(code_of(with("[[1], [2]]", Some("[[4, [2]], 4]"))), "truncation-shape");
    assert_eq!(code_of(with("[[1], [2]]", Some("[0, 4]"))), "truncation-size");

    let missing = with("[[1], [2]]", None).expect_err("missing truncation");
    assert_eq!(missing.code(), "truncation-missing");
    assert!(missing.info().hint.is_some());
    assert!(matches!(missing, CircuitError::Structural(_)));
}

#[test]
fn flat_hierarchy_needs_no_truncation() -> Result<(), CircuitError> {
    let config = CircuitConfig {
        hierarchy: Some(vec![Group::Var(2), Group::Var(1)]),
        ..CircuitConfig::default()
    };
    let circuit = Circuit::from_description(&two_transmons(0.1), config)?;
    assert!(!circuit.tree().is_hierarchical());
    assert_eq!(circuit.hilbertdim(), 121);
    Ok(())
}

#[test]
fn dressed_hamiltonian_is_bare_sum_plus_projected_coupling() -> Result<(), CircuitError> {
    let coupling = 0.4;
    let circuit = Circuit::from_description(&two_transmons(coupling), pairwise([4, 3]))?;
    let tree = circuit.tree();
    let first = &tree.node(1).and_then(|n| n.bare()).expect("bare 1").energies;
    let second = &tree.node(2).and_then(|n| n.bare()).expect("bare 2").energies;
    assert_eq!(tree.top_level_dims(), vec![4, 3]);

    let n1 = circuit.get_operator("n1")?.to_dense();
    let n2 = circuit.get_operator("n2")?.to_dense();
    let mut expected = (&n1 * &n2) * C64::new(coupling, 0.0);
    for i in 0..4 {
        for j in 0..3 {
            expected[(i * 3 + j, i * 3 + j)] += C64::new(first[i] + second[j], 0.0);
        }
    }
    let actual = circuit.hamiltonian()?.to_dense();
    assert!((actual - expected).norm() < 1e-10);
    Ok(())
}

#[test]
fn operators_in_hierarchy_live_in_truncated_space() -> Result<(), CircuitError> {
    let circuit = Circuit::from_description(&two_transmons(0.2), pairwise([4, 4]))?;
    let n1 = circuit.get_operator("n1")?;
    assert_eq!(n1.dim(), 16);
    assert!(n1.hermiticity_defect() < 1e-12);
    let cos2 = circuit.get_operator("cos2")?;
    assert!(cos2.hermiticity_defect() < 1e-12);

    let identity = circuit.get_operator("I")?.to_dense();
    assert_eq!(identity, DMatrix::<C64>::identity(16, 16));

    assert!(matches!(
        circuit.get_operator("Qs1"),
        Err(CircuitError::UnsupportedOperator(_))
    ));
    assert!(matches!(
        circuit.get_operator("n7"),
        Err(CircuitError::UnsupportedOperator(_))
    ));
    assert!(circuit.get_operator("bogus").is_err());
    Ok(())
}

#[test]
fn matrix_element_tables_are_hermitian() -> Result<(), CircuitError> {
    let circuit = Circuit::from_description(&two_transmons(0.2), pairwise([4, 4]))?;
    let table = circuit.matrixelement_table("n1", 4)?;
    assert_eq!(table.shape(), (4, 4));
    assert!((&table - table.adjoint()).norm() < 1e-10);

    let overlaps = circuit.matrixelement_table("I", 3)?;
    for i in 0..3 {
        for j in 0..3 {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert_relative_eq!(overlaps[(i, j)].norm(), expected, epsilon = 1e-8);
        }
    }
    Ok(())
}

#[test]
fn lookup_labels_dressed_states_by_bare_indices() -> Result<(), CircuitError> {
    let circuit = Circuit::from_description(&two_transmons(0.0), pairwise([4, 4]))?;
    let tree = circuit.tree();
    let first = &tree.node(1).and_then(|n| n.bare()).expect("bare 1").energies;
    let second = &tree.node(2).and_then(|n| n.bare()).expect("bare 2").energies;

    let lookup = circuit.spectrum_lookup(4)?;
    assert_eq!(lookup.dims(), &[4, 4]);
    assert_eq!(lookup.dressed_index(&[0, 0]), Some(0));
    assert_eq!(lookup.bare_index(0), Some(&[0, 0][..]));
    let energy = lookup.energy_by_bare_index(&[1, 0]).expect("labelled state");
    assert_relative_eq!(energy, first[1] + second[0], epsilon = 1e-9);
    assert_eq!(lookup.energy_by_bare_index(&[3, 3]), None);
    Ok(())
}

#[test]
fn flat_circuits_have_no_lookup() -> Result<(), CircuitError> {
    let circuit = Circuit::from_description(&two_transmons(0.1), CircuitConfig::default())?;
    assert_eq!(code_of(circuit.spectrum_lookup(3)), "lookup-flat");
    Ok(())
}

#[test]
fn hierarchy_can_be_replaced() -> Result<(), CircuitError> {
    let mut circuit = Circuit::from_description(&two_transmons(0.2), CircuitConfig::default())?;
    let flat = circuit.eigenvals(2)?;

    let err = circuit
        .set_system_hierarchy(
            Some(vec![
                Group::Nested(vec![Group::Var(1)]),
                Group::Nested(vec![Group::Var(2)]),
            ]),
            None,
        )
        .expect_err("truncation missing");
    assert_eq!(err.code(), "truncation-missing");
    assert_eq!(circuit.hilbertdim(), 121);

    circuit.set_system_hierarchy(
        Some(vec![
            Group::Nested(vec![Group::Var(1)]),
            Group::Nested(vec![Group::Var(2)]),
        ]),
        Some(vec![TruncDim::Individual(8), TruncDim::Individual(8)]),
    )?;
    assert_eq!(circuit.hilbertdim(), 64);
    let dressed = circuit.eigenvals(2)?;
    assert_relative_eq!(dressed[0], flat[0], epsilon = 1e-5);

    circuit.set_system_hierarchy(None, None)?;
    assert_eq!(circuit.hilbertdim(), 121);
    Ok(())
}
