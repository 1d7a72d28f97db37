//! Stable content hashes of canonical Hamiltonians.

use sha2::{Digest, Sha256};

use circ_core::{CircuitError, ErrorInfo};

use crate::canonical::CanonicalHamiltonian;

/// Content hash of a canonical Hamiltonian.
pub fn hamiltonian_hash(hamiltonian: &CanonicalHamiltonian) -> Result<String, CircuitError> {
    let bytes = serde_json::to_vec(hamiltonian)
        .map_err(|err| CircuitError::Serde(ErrorInfo::new("hamiltonian-hash", err.to_string())))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
