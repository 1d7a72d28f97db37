use circ_core::Variable;
use circ_hd::{Circuit, CircuitConfig, CircuitDescription, FieldUpdate, Group, TruncDim};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use indexmap::IndexMap;

fn three_transmons() -> CircuitDescription {
    CircuitDescription {
        variables: (1..=3).map(Variable::periodic).collect(),
        parameters: [("EC", 1.0), ("EJ", 12.0), ("G", 0.15)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        external_fluxes: IndexMap::new(),
        offset_charges: [("ng".to_string(), 0.0)].into_iter().collect(),
        hamiltonian: "4*EC*(n1 - ng)^2 - EJ*cos(θ1) + 4*EC*n2^2 - EJ*cos(θ2) \
                      + 4*EC*n3^2 - EJ*cos(θ3) + G*n1*n2 + G*n2*n3"
            .to_string(),
    }
}

fn nested() -> CircuitConfig {
    CircuitConfig {
        cutoffs: [(1, 8), (2, 8), (3, 8)].into_iter().collect(),
        hierarchy: Some(vec![
            Group::Nested(vec![
                Group::Nested(vec![Group::Var(1)]),
                Group::Nested(vec![Group::Var(2)]),
            ]),
            Group::Nested(vec![Group::Var(3)]),
        ]),
        truncation: Some(vec![
            TruncDim::Combined(20, vec![TruncDim::Individual(6), TruncDim::Individual(6)]),
            TruncDim::Individual(6),
        ]),
        ..CircuitConfig::default()
    }
}

fn bench_build(c: &mut Criterion) {
    let desc = three_transmons();
    c.bench_function("hierarchical_build", |b| {
        b.iter(|| {
            let circuit = Circuit::from_description(&desc, nested()).expect("circuit");
            black_box(circuit.eigenvals(6).expect("spectrum"));
        });
    });
}

fn bench_offset_sweep(c: &mut Criterion) {
    let circuit = Circuit::from_description(&three_transmons(), nested()).expect("circuit");
    c.bench_function("offset_sweep_update", |b| {
        b.iter(|| {
            let mut circuit = circuit.clone();
            for step in 0..5 {
                circuit
                    .update(FieldUpdate::OffsetCharge {
                        name: "ng".into(),
                        value: 0.1 * step as f64,
                    })
                    .expect("update");
                black_box(circuit.eigenvals(4).expect("spectrum"));
            }
        });
    });
}

criterion_group!(benches, bench_build, bench_offset_sweep);
criterion_main!(benches);
