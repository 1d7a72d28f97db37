use std::collections::BTreeSet;

use circ_core::{ExtBasis, Variable};
use circ_hd::partition;
use circ_sym::{canonicalize, parse_hamiltonian, CanonicalHamiltonian, SymbolTable};
use proptest::prelude::*;

fn coupled_chain(count: usize, pairs: &[(usize, usize)]) -> CanonicalHamiltonian {
    let mut text = String::from("4*EC*(n1 - ng)^2 - EJ*cos(θ1)");
    for i in 2..=count {
        text.push_str(&format!(" + 4*EC*n{i}^2 - EJ*cos(θ{i})"));
    }
    for (a, b) in pairs {
        let (a, b) = (a % count + 1, b % count + 1);
        if a != b {
            text.push_str(&format!(" + G*n{a}*n{b} + G*cos(θ{a} - θ{b})"));
        }
    }
    let table = SymbolTable {
        parameters: ["EC", "EJ", "G"].iter().map(|s| s.to_string()).collect(),
        offset_charges: ["ng".to_string()].into_iter().collect(),
        ..SymbolTable::default()
    };
    let variables: Vec<Variable> = (1..=count).map(Variable::periodic).collect();
    let raw = parse_hamiltonian(&text, &table).expect("generated text parses");
    canonicalize(&raw, &variables, ExtBasis::Discretized)
        .expect("generated text canonicalizes")
        .hamiltonian
}

fn grouping(count: usize, labels: &[usize]) -> Vec<BTreeSet<usize>> {
    let mut groups: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); count];
    for var in 1..=count {
        groups[labels[var - 1] % count].insert(var);
    }
    groups.retain(|g| !g.is_empty());
    groups
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn buckets_resum_to_the_hamiltonian(
        count in 2usize..6,
        pairs in prop::collection::vec((0usize..6, 0usize..6), 0..6),
        labels in prop::collection::vec(0usize..6, 6),
    ) {
        let hamiltonian = coupled_chain(count, &pairs);
        let groups = grouping(count, &labels);
        let split = partition(&hamiltonian, &groups);

        let mut collected: Vec<_> = split
            .groups
            .iter()
            .flat_map(|g| g.own.monomials().to_vec())
            .collect();
        collected.extend(split.couplings.monomials().to_vec());
        prop_assert_eq!(collected.len(), hamiltonian.len());
        prop_assert_eq!(CanonicalHamiltonian::new(collected), hamiltonian);
    }

    #[test]
    fn couplings_land_in_every_touched_group(
        count in 2usize..6,
        pairs in prop::collection::vec((0usize..6, 0usize..6), 1..6),
        labels in prop::collection::vec(0usize..6, 6),
    ) {
        let hamiltonian = coupled_chain(count, &pairs);
        let groups = grouping(count, &labels);
        let split = partition(&hamiltonian, &groups);

        for bucket in &split.groups {
            for monomial in bucket.own.monomials() {
                prop_assert!(monomial.variables().is_subset(&bucket.variables));
            }
            for monomial in bucket.interaction.monomials() {
                let vars = monomial.variables();
                prop_assert!(!vars.is_disjoint(&bucket.variables));
                prop_assert!(!vars.is_subset(&bucket.variables));
            }
        }
        for coupling in split.couplings.monomials() {
            let touched = split
                .groups
                .iter()
                .filter(|g| g.interaction.monomials().contains(coupling))
                .count();
            let expected = groups
                .iter()
                .filter(|g| !coupling.variables().is_disjoint(g))
                .count();
            prop_assert!(touched >= 2);
            prop_assert_eq!(touched, expected);
        }
    }
}

#[test]
fn operator_free_terms_go_to_the_first_group() {
    let hamiltonian = coupled_chain(2, &[(0, 1)]);
    let groups = vec![BTreeSet::from([2]), BTreeSet::from([1])];
    let split = partition(&hamiltonian, &groups);
    let constants = |h: &CanonicalHamiltonian| {
        h.monomials().iter().filter(|m| m.operators.is_empty()).count()
    };
    assert_eq!(constants(&split.groups[0].own), 1);
    assert_eq!(constants(&split.groups[1].own), 0);
    assert_eq!(constants(&split.couplings), 0);
}
