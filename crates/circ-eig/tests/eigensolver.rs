use approx::assert_relative_eq;
use circ_core::{CircuitError, MatrixFormat};
use circ_eig::{dense, eigensystem, eigenvalues, matrix_element_table, SolverConfig};
use circ_ops::{charge, Operator, C64};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn charge_qubit(ncut: usize, ec: f64, ej: f64) -> Result<Operator, CircuitError> {
    let n = charge::number(ncut);
    let kinetic = n.matmul(&n)?.scale(C64::new(4.0 * ec, 0.0));
    kinetic.add(&charge::cos(ncut).scale(C64::new(-ej, 0.0)))
}

/// `H ⊗ I ⊗ … + … + I ⊗ … ⊗ H` for `copies` identical charge qubits.
fn identical_qubits(copies: usize, ncut: usize) -> Result<Operator, CircuitError> {
    let single = charge_qubit(ncut, 1.0, 10.0)?;
    let id = Operator::identity(2 * ncut + 1, MatrixFormat::Sparse);
    let mut total = Operator::zeros((2 * ncut + 1).pow(copies as u32), MatrixFormat::Sparse);
    for slot in 0..copies {
        let mut term = if slot == 0 { single.clone() } else { id.clone() };
        for other in 1..copies {
            term = term.kron(if other == slot { &single } else { &id });
        }
        total = total.add(&term)?;
    }
    Ok(total.into_format(MatrixFormat::Sparse))
}

fn assert_orthonormal(system: &circ_eig::EigenSystem) {
    let vectors = system.vectors.as_ref().expect("vectors requested");
    let gram = vectors.adjoint() * vectors;
    for i in 0..system.len() {
        for j in 0..system.len() {
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((gram[(i, j)] - C64::new(expected, 0.0)).norm() < 1e-8);
        }
    }
}

fn chain(dim: usize) -> Operator {
    let triplets = (0..dim).flat_map(|i| {
        let mut entries = vec![(i, i, C64::new(2.0 + (i as f64).sin(), 0.0))];
        if i + 1 < dim {
            entries.push((i, i + 1, C64::new(-1.0, 0.0)));
            entries.push((i + 1, i, C64::new(-1.0, 0.0)));
        }
        entries
    });
    Operator::from_triplets(dim, triplets, MatrixFormat::Sparse)
}

#[test]
fn sparse_and_dense_paths_agree() -> Result<(), CircuitError> {
    let sparse = charge_qubit(5, 1.0, 1.0)?;
    let dense = sparse.clone().into_format(MatrixFormat::Dense);
    let config = SolverConfig::default();
    let a = eigenvalues(&sparse, 4, &config)?;
    let b = eigenvalues(&dense, 4, &config)?;
    for (x, y) in a.iter().zip(&b) {
        assert_relative_eq!(*x, *y, epsilon = 1e-9);
    }
    assert_relative_eq!(a[0], -0.12176554494108272, epsilon = 1e-9);
    assert!(a.windows(2).all(|w| w[0] <= w[1]));
    Ok(())
}

#[test]
fn eigenvectors_satisfy_the_eigenvalue_equation() -> Result<(), CircuitError> {
    let op = chain(60);
    let system = eigensystem(&op, 5, &SolverConfig::default())?;
    assert_eq!(system.len(), 5);
    for residual in system.residuals(&op) {
        assert!(residual < 1e-6, "residual {residual}");
    }
    Ok(())
}

#[test]
fn degenerate_levels_are_recovered() -> Result<(), CircuitError> {
    let values = [1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let diag: Vec<C64> = values.iter().map(|v| C64::new(*v, 0.0)).collect();
    let op = Operator::diagonal(&diag, MatrixFormat::Sparse);
    let energies = eigenvalues(&op, 4, &SolverConfig::default())?;
    for (found, expected) in energies.iter().zip([1.0, 1.0, 1.0, 2.0]) {
        assert_relative_eq!(*found, expected, epsilon = 1e-10);
    }
    Ok(())
}

#[test]
fn identical_transmons_keep_degenerate_pairs() -> Result<(), CircuitError> {
    let op = identical_qubits(2, 5)?;
    assert_eq!(op.dim(), 121);
    assert_eq!(op.format(), MatrixFormat::Sparse);

    let system = eigensystem(&op, 4, &SolverConfig::default())?;
    let exact = dense::lowest_eigenpairs(op.to_dense(), 4);
    for (found, expected) in system.energies.iter().zip(&exact.energies) {
        assert_relative_eq!(*found, *expected, epsilon = 1e-8);
    }
    assert_relative_eq!(system.energies[1], system.energies[2], epsilon = 1e-8);
    for residual in system.residuals(&op) {
        assert!(residual < 1e-6, "residual {residual}");
    }
    assert_orthonormal(&system);
    Ok(())
}

#[test]
fn threefold_levels_survive_a_partial_request() -> Result<(), CircuitError> {
    let op = identical_qubits(3, 3)?;
    assert_eq!(op.dim(), 343);

    let energies = eigenvalues(&op, 5, &SolverConfig::default())?;
    let exact = dense::lowest_eigenpairs(op.to_dense(), 5).energies;
    for (found, expected) in energies.iter().zip(&exact) {
        assert_relative_eq!(*found, *expected, epsilon = 1e-8);
    }
    assert_relative_eq!(energies[1], energies[3], epsilon = 1e-8);
    assert!(energies[4] > energies[3] + 1.0);
    Ok(())
}

#[test]
fn degenerate_results_depend_only_on_the_seed() -> Result<(), CircuitError> {
    let op = identical_qubits(2, 4)?;
    let config = SolverConfig::default();
    assert_eq!(eigensystem(&op, 3, &config)?, eigensystem(&op, 3, &config)?);

    let reseeded = SolverConfig {
        seed: config.seed.wrapping_add(1),
        ..config.clone()
    };
    let a = eigenvalues(&op, 3, &config)?;
    let b = eigenvalues(&op, 3, &reseeded)?;
    for (x, y) in a.iter().zip(&b) {
        assert_relative_eq!(*x, *y, epsilon = 1e-8);
    }
    Ok(())
}

#[test]
fn random_hermitian_matches_direct_solver() -> Result<(), CircuitError> {
    let mut rng = StdRng::seed_from_u64(7);
    let dim = 40;
    let mut triplets = Vec::new();
    for i in 0..dim {
        triplets.push((i, i, C64::new(rng.gen_range(-3.0..3.0), 0.0)));
        for j in i + 1..dim.min(i + 4) {
            let z = C64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            triplets.push((i, j, z));
            triplets.push((j, i, z.conj()));
        }
    }
    let sparse = Operator::from_triplets(dim, triplets, MatrixFormat::Sparse);
    assert!(sparse.hermiticity_defect() < 1e-15);
    let dense = sparse.clone().into_format(MatrixFormat::Dense);
    let config = SolverConfig::default();
    let a = eigenvalues(&sparse, 6, &config)?;
    let b = eigenvalues(&dense, 6, &config)?;
    for (x, y) in a.iter().zip(&b) {
        assert_relative_eq!(*x, *y, epsilon = 1e-8);
    }
    Ok(())
}

#[test]
fn iteration_budget_surfaces_a_convergence_error() {
    let config = SolverConfig {
        max_iterations: 3,
        ..SolverConfig::default()
    };
    let err = eigenvalues(&chain(200), 1, &config).unwrap_err();
    assert!(matches!(err, CircuitError::Convergence(_)));
    assert_eq!(err.code(), "lanczos-budget");
    assert!(err.info().hint.is_some());
}

#[test]
fn equal_seeds_give_identical_results() -> Result<(), CircuitError> {
    let op = chain(80);
    let config = SolverConfig::default();
    let a = eigensystem(&op, 3, &config)?;
    let b = eigensystem(&op, 3, &config)?;
    assert_eq!(a, b);
    Ok(())
}

#[test]
fn eigenvalue_count_is_validated() -> Result<(), CircuitError> {
    let op = charge_qubit(2, 1.0, 1.0)?;
    let config = SolverConfig::default();
    for k in [0, 6] {
        let err = eigenvalues(&op, k, &config).unwrap_err();
        assert_eq!(err.code(), "eigenvalue-count");
    }
    assert_eq!(eigenvalues(&op, 5, &config)?.len(), 5);
    Ok(())
}

#[test]
fn element_table_of_the_hamiltonian_is_diagonal() -> Result<(), CircuitError> {
    let op = charge_qubit(4, 0.5, 2.0)?;
    let system = eigensystem(&op, 3, &SolverConfig::default())?;
    let vectors = system.vectors.as_ref().expect("vectors requested");
    let table = matrix_element_table(&op, vectors)?;
    for i in 0..3 {
        for j in 0..3 {
            let expected = if i == j { system.energies[i] } else { 0.0 };
            assert_relative_eq!(table[(i, j)].re, expected, epsilon = 1e-8);
            assert!(table[(i, j)].im.abs() < 1e-8);
        }
    }
    Ok(())
}
