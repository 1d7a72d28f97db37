use std::collections::BTreeSet;
use std::f64::consts::TAU;

use approx::assert_relative_eq;
use circ_core::{CircuitError, ExtBasis, Variable};
use circ_sym::{
    canonicalize, parse_hamiltonian, CanonicalHamiltonian, OpKind, OpSymbol, Symbol, SymbolTable,
    SymbolValues,
};

fn table(params: &[&str], fluxes: &[&str], offsets: &[&str]) -> SymbolTable {
    let to_set = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
    SymbolTable {
        parameters: to_set(params),
        external_fluxes: to_set(fluxes),
        offset_charges: to_set(offsets),
    }
}

fn op(var: usize, kind: OpKind) -> OpSymbol {
    OpSymbol::new(var, kind)
}

fn operator_keys(h: &CanonicalHamiltonian) -> BTreeSet<Vec<(OpSymbol, u32)>> {
    h.monomials().iter().map(|m| m.operators.clone()).collect()
}

#[test]
fn charge_qubit_keeps_offset_identity_term() -> Result<(), CircuitError> {
    let t = table(&["EC", "EJ"], &[], &["ng1"]);
    let raw = parse_hamiltonian("4*EC*(n1 - ng1)^2 - EJ*cos(θ1)", &t)?;
    let canon = canonicalize(&raw, &[Variable::periodic(1)], ExtBasis::Discretized)?;
    let h = &canon.hamiltonian;
    assert_eq!(h.len(), 4);
    let keys = operator_keys(h);
    assert!(keys.contains(&vec![(op(1, OpKind::Charge), 2)]));
    assert!(keys.contains(&vec![(op(1, OpKind::Charge), 1)]));
    assert!(keys.contains(&vec![(op(1, OpKind::Cos), 1)]));
    assert!(keys.contains(&Vec::new()));
    let identity = h
        .monomials()
        .iter()
        .find(|m| m.operators.is_empty())
        .expect("identity term");
    assert!(identity.is_identity_bearing());
    assert!(canon.shifts.is_empty());

    let values: SymbolValues = [
        (Symbol::Parameter("EC".into()), 0.5),
        (Symbol::Parameter("EJ".into()), 2.0),
        (Symbol::OffsetCharge("ng1".into()), 0.25),
    ]
    .into_iter()
    .collect();
    let numeric = h.numeric_terms(&values)?;
    assert_relative_eq!(numeric[&vec![(op(1, OpKind::Charge), 2)]], 2.0);
    assert_relative_eq!(numeric[&vec![(op(1, OpKind::Charge), 1)]], -1.0);
    assert_relative_eq!(numeric[&Vec::new()], 0.125);
    assert_relative_eq!(numeric[&vec![(op(1, OpKind::Cos), 1)]], -2.0);
    Ok(())
}

#[test]
fn harmonic_basis_drops_identity_constants() -> Result<(), CircuitError> {
    let t = table(&["EC", "EJ"], &[], &["ng1"]);
    let raw = parse_hamiltonian("4*EC*(n1 - ng1)^2 - EJ*cos(θ1)", &t)?;
    let canon = canonicalize(&raw, &[Variable::periodic(1)], ExtBasis::Harmonic)?;
    assert_eq!(canon.hamiltonian.len(), 3);
    assert!(canon
        .hamiltonian
        .monomials()
        .iter()
        .all(|m| !m.operators.is_empty()));
    assert!(operator_keys(&canon.hamiltonian).contains(&vec![(op(1, OpKind::Charge), 1)]));
    Ok(())
}

#[test]
fn plain_constants_are_dropped() -> Result<(), CircuitError> {
    let t = table(&["EC", "E0"], &[], &[]);
    let raw = parse_hamiltonian("4*EC*n1^2 + E0 + 3", &t)?;
    let canon = canonicalize(&raw, &[Variable::periodic(1)], ExtBasis::Discretized)?;
    assert_eq!(canon.hamiltonian.len(), 1);
    Ok(())
}

#[test]
fn difference_cosine_becomes_tagged_products() -> Result<(), CircuitError> {
    let t = table(&["EJ"], &[], &[]);
    let raw = parse_hamiltonian("-EJ*cos(θ1 - θ2)", &t)?;
    let vars = [Variable::periodic(1), Variable::periodic(2)];
    let canon = canonicalize(&raw, &vars, ExtBasis::Discretized)?;
    let keys = operator_keys(&canon.hamiltonian);
    assert_eq!(keys.len(), 2);
    assert!(keys.contains(&vec![(op(1, OpKind::Cos), 1), (op(2, OpKind::Cos), 1)]));
    assert!(keys.contains(&vec![(op(1, OpKind::Sin), 1), (op(2, OpKind::Sin), 1)]));
    Ok(())
}

#[test]
fn flux_in_trig_argument_stays_scalar() -> Result<(), CircuitError> {
    let t = table(&["EJ"], &["Φ1"], &[]);
    let raw = parse_hamiltonian("-EJ*cos(θ1 + Φ1)", &t)?;
    let canon = canonicalize(&raw, &[Variable::periodic(1)], ExtBasis::Discretized)?;
    let values: SymbolValues = [
        (Symbol::Parameter("EJ".into()), 1.0),
        (Symbol::ExternalFlux("Φ1".into()), 0.125),
    ]
    .into_iter()
    .collect();
    let numeric = canon.hamiltonian.numeric_terms(&values)?;
    // cos(θ + 2πΦ) = cos θ cos 2πΦ - sin θ sin 2πΦ
    assert_relative_eq!(
        numeric[&vec![(op(1, OpKind::Cos), 1)]],
        -(TAU * 0.125).cos(),
        epsilon = 1e-12
    );
    assert_relative_eq!(
        numeric[&vec![(op(1, OpKind::Sin), 1)]],
        (TAU * 0.125).sin(),
        epsilon = 1e-12
    );
    assert!(canon
        .hamiltonian
        .monomials()
        .iter()
        .all(|m| m.is_identity_bearing()));
    Ok(())
}

#[test]
fn squared_momentum_tag_depends_on_basis() -> Result<(), CircuitError> {
    let t = table(&["EC", "EL"], &[], &[]);
    let raw = parse_hamiltonian("4*EC*Q1^2 + EL/2*θ1^2", &t)?;
    let vars = [Variable::extended(1)];

    let grid = canonicalize(&raw, &vars, ExtBasis::Discretized)?;
    let keys = operator_keys(&grid.hamiltonian);
    assert!(keys.contains(&vec![(op(1, OpKind::MomentumSquared), 1)]));
    assert!(keys.contains(&vec![(op(1, OpKind::Position), 2)]));

    let harmonic = canonicalize(&raw, &vars, ExtBasis::Harmonic)?;
    let keys = operator_keys(&harmonic.hamiltonian);
    assert!(keys.contains(&vec![(op(1, OpKind::Momentum), 2)]));
    Ok(())
}

#[test]
fn fluxonium_shift_moves_flux_into_cosine() -> Result<(), CircuitError> {
    let t = table(&["EC", "EL", "EJ"], &["Φ1"], &[]);
    let raw = parse_hamiltonian("4*EC*Q1^2 + EL/2*(θ1 + Φ1)^2 - EJ*cos(θ1)", &t)?;
    let canon = canonicalize(&raw, &[Variable::extended(1)], ExtBasis::Discretized)?;
    assert_eq!(canon.shifts.variables(), &[1]);

    let mut values: SymbolValues = [
        (Symbol::Parameter("EC".into()), 0.5),
        (Symbol::Parameter("EL".into()), 0.8),
        (Symbol::Parameter("EJ".into()), 4.0),
        (Symbol::ExternalFlux("Φ1".into()), 0.3),
    ]
    .into_iter()
    .collect();
    let solution = canon.shifts.bind(&mut values)?;
    assert!(solution.consistent);
    assert_relative_eq!(solution.shifts[&1], -TAU * 0.3, epsilon = 1e-12);

    let numeric = canon.hamiltonian.numeric_terms(&values)?;
    assert!(!numeric.contains_key(&vec![(op(1, OpKind::Position), 1)]));
    assert_relative_eq!(numeric[&vec![(op(1, OpKind::Position), 2)]], 0.4);
    assert_relative_eq!(
        numeric[&vec![(op(1, OpKind::Cos), 1)]],
        -4.0 * (TAU * 0.3).cos(),
        epsilon = 1e-12
    );
    Ok(())
}

#[test]
fn inconsistent_shift_falls_back_to_zero() -> Result<(), CircuitError> {
    let t = table(&["EC", "EL"], &[], &[]);
    let raw = parse_hamiltonian("4*EC*Q1^2 + EL*θ1", &t)?;
    let canon = canonicalize(&raw, &[Variable::extended(1)], ExtBasis::Discretized)?;
    let mut values: SymbolValues = [
        (Symbol::Parameter("EC".into()), 1.0),
        (Symbol::Parameter("EL".into()), 0.5),
    ]
    .into_iter()
    .collect();
    let solution = canon.shifts.bind(&mut values)?;
    assert!(!solution.consistent);
    assert_eq!(solution.shifts[&1], 0.0);
    let numeric = canon.hamiltonian.numeric_terms(&values)?;
    assert_relative_eq!(numeric[&vec![(op(1, OpKind::Position), 1)]], 0.5);
    Ok(())
}

fn coupled_shift_values(eb: f64) -> SymbolValues {
    [
        (Symbol::Parameter("EC".into()), 1.0),
        (Symbol::Parameter("EA".into()), 2.0),
        (Symbol::Parameter("EB".into()), eb),
        (Symbol::ExternalFlux("Φ1".into()), 0.2),
    ]
    .into_iter()
    .collect()
}

#[test]
fn near_singular_shift_system_is_solved_stably() -> Result<(), CircuitError> {
    let t = table(&["EC", "EA", "EB"], &["Φ1"], &[]);
    let raw = parse_hamiltonian(
        "4*EC*Q1^2 + 4*EC*Q2^2 + EA/2*(θ1 - θ2 + Φ1)^2 + EB/2*θ2^2",
        &t,
    )?;
    let vars = [Variable::extended(1), Variable::extended(2)];
    let canon = canonicalize(&raw, &vars, ExtBasis::Discretized)?;
    assert_eq!(canon.shifts.variables(), &[1, 2]);

    let mut values = coupled_shift_values(1e-8);
    let solution = canon.shifts.bind(&mut values)?;
    assert!(solution.consistent);
    assert_relative_eq!(solution.shifts[&1], -TAU * 0.2, epsilon = 1e-5);
    assert!(solution.shifts[&2].abs() < 1e-5);
    let numeric = canon.hamiltonian.numeric_terms(&values)?;
    assert!(!numeric.contains_key(&vec![(op(1, OpKind::Position), 1)]));

    // Exactly singular but consistent: minimum-norm shifts.
    let mut values = coupled_shift_values(0.0);
    let solution = canon.shifts.bind(&mut values)?;
    assert!(solution.consistent);
    let (d1, d2) = (solution.shifts[&1], solution.shifts[&2]);
    assert_relative_eq!(d1 - d2, -TAU * 0.2, epsilon = 1e-9);
    assert_relative_eq!(d1 + d2, 0.0, epsilon = 1e-9);
    let numeric = canon.hamiltonian.numeric_terms(&values)?;
    assert!(!numeric.contains_key(&vec![(op(1, OpKind::Position), 1)]));
    assert!(!numeric.contains_key(&vec![(op(2, OpKind::Position), 1)]));
    Ok(())
}

#[test]
fn category_mismatches_are_rejected() -> Result<(), CircuitError> {
    let t = table(&["EC"], &[], &[]);
    let charge_on_extended = parse_hamiltonian("EC*n1^2", &t)?;
    let err = canonicalize(&charge_on_extended, &[Variable::extended(1)], ExtBasis::Discretized)
        .unwrap_err();
    assert_eq!(err.code(), "variable-kind");

    let bare_periodic = parse_hamiltonian("EC*θ1^2", &t)?;
    let err =
        canonicalize(&bare_periodic, &[Variable::periodic(1)], ExtBasis::Discretized).unwrap_err();
    assert_eq!(err.code(), "periodic-coordinate");

    let undeclared = parse_hamiltonian("EC*n2^2", &t)?;
    let err =
        canonicalize(&undeclared, &[Variable::periodic(1)], ExtBasis::Discretized).unwrap_err();
    assert_eq!(err.code(), "undeclared-variable");
    Ok(())
}

#[test]
fn missing_values_surface_as_substitution_errors() -> Result<(), CircuitError> {
    let t = table(&["EC", "EJ"], &[], &[]);
    let raw = parse_hamiltonian("4*EC*n1^2 - EJ*cos(θ1)", &t)?;
    let canon = canonicalize(&raw, &[Variable::periodic(1)], ExtBasis::Discretized)?;
    let values: SymbolValues = [(Symbol::Parameter("EC".into()), 1.0)].into_iter().collect();
    let err = canon.hamiltonian.numeric_terms(&values).unwrap_err();
    assert!(matches!(err, CircuitError::Substitution(_)));
    assert_eq!(err.info().context.get("symbol").map(String::as_str), Some("EJ"));
    Ok(())
}

#[test]
fn hash_is_stable_and_content_sensitive() -> Result<(), CircuitError> {
    let t = table(&["EC", "EJ"], &[], &[]);
    let vars = [Variable::periodic(1)];
    let a = canonicalize(&parse_hamiltonian("4*EC*n1^2 - EJ*cos(θ1)", &t)?, &vars, ExtBasis::Discretized)?;
    let b = canonicalize(&parse_hamiltonian("-EJ*cos(theta1) + 4*EC*n1**2", &t)?, &vars, ExtBasis::Discretized)?;
    let c = canonicalize(&parse_hamiltonian("4*EC*n1^2 - EJ*cos(2*θ1)", &t)?, &vars, ExtBasis::Discretized)?;
    let ha = circ_sym::hamiltonian_hash(&a.hamiltonian)?;
    assert_eq!(ha, circ_sym::hamiltonian_hash(&b.hamiltonian)?);
    assert_ne!(ha, circ_sym::hamiltonian_hash(&c.hamiltonian)?);
    Ok(())
}

#[test]
fn monomials_render_as_products() -> Result<(), CircuitError> {
    let t = table(&["EC", "EJ"], &[], &[]);
    let raw = parse_hamiltonian("4*EC*n1^2 - EJ*cos(θ1)", &t)?;
    let canon = canonicalize(&raw, &[Variable::periodic(1)], ExtBasis::Discretized)?;
    let rendered: BTreeSet<String> = canon
        .hamiltonian
        .monomials()
        .iter()
        .map(|m| m.to_string())
        .collect();
    assert!(rendered.contains("4*EC*n1^2"));
    assert!(rendered.contains("-1*EJ*cos1"));
    Ok(())
}
