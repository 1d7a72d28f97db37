pub mod canonical;
pub mod elements;
pub mod spectrum;
pub mod template;

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use circ_hd::io::load_document;
use circ_hd::{Circuit, CircuitConfig, CircuitDescription};
use sha2::{Digest, Sha256};

/// Circuit built from the command-line inputs and the hash of those inputs.
pub struct LoadedCircuit {
    pub circuit: Circuit,
    pub input_hash: String,
}

pub fn load_circuit(
    circuit: &Path,
    config: Option<&PathBuf>,
) -> Result<LoadedCircuit, Box<dyn Error>> {
    let description: CircuitDescription = load_document(circuit)?;
    let mut hasher = Sha256::new();
    hasher.update(fs::read(circuit)?);

    let config: CircuitConfig = match config {
        Some(path) => {
            hasher.update(fs::read(path)?);
            load_document(path)?
        }
        None => CircuitConfig::default(),
    };

    Ok(LoadedCircuit {
        circuit: Circuit::from_description(&description, config)?,
        input_hash: hex::encode(hasher.finalize()),
    })
}

pub fn ensure_parent(path: &Path) -> Result<(), Box<dyn Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
