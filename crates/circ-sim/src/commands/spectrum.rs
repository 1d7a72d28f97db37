use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use chrono::Utc;
use circ_core::{RunProvenance, SchemaVersion};
use circ_hd::io::to_canonical_json_bytes;
use circ_hd::{Group, TruncDim};
use circ_sym::hamiltonian_hash;
use clap::Args;
use serde::Serialize;
use tracing::info;

use super::load_circuit;

#[derive(Args, Debug)]
pub struct SpectrumArgs {
    /// YAML or JSON circuit description.
    #[arg(long)]
    pub circuit: PathBuf,
    /// Optional YAML or JSON configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Number of eigenvalues to compute.
    #[arg(long, default_value_t = 6)]
    pub evals: usize,
    /// Output directory for the report and CSV table.
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Serialize)]
struct SpectrumReport {
    energies: Vec<f64>,
    hilbertdim: usize,
    hierarchical: bool,
    hierarchy: Option<Vec<Group>>,
    truncation: Option<Vec<TruncDim>>,
    provenance: RunProvenance,
}

pub fn run(args: &SpectrumArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let loaded = load_circuit(&args.circuit, args.config.as_ref())?;
    let circuit = &loaded.circuit;
    let energies = circuit.eigenvals(args.evals)?;

    let report = SpectrumReport {
        energies: energies.clone(),
        hilbertdim: circuit.hilbertdim(),
        hierarchical: circuit.tree().is_hierarchical(),
        hierarchy: circuit.config().hierarchy.clone(),
        truncation: circuit.config().truncation.clone(),
        provenance: RunProvenance {
            schema: SchemaVersion::default(),
            input_hash: loaded.input_hash.clone(),
            hamiltonian_hash: hamiltonian_hash(circuit.canonical())?,
            seed: circuit.config().solver.seed,
            created_at: Utc::now().to_rfc3339(),
            tool_versions: BTreeMap::from([(
                "circ-sim".to_string(),
                env!("CARGO_PKG_VERSION").to_string(),
            )]),
        },
    };
    fs::write(
        args.out.join("spectrum_report.json"),
        to_canonical_json_bytes(&report)?,
    )?;

    let mut table = csv::Writer::from_path(args.out.join("spectrum.csv"))?;
    table.write_record(["index", "energy"])?;
    for (index, energy) in energies.iter().enumerate() {
        table.write_record([index.to_string(), energy.to_string()])?;
    }
    table.flush()?;

    info!(
        evals = energies.len(),
        out = %args.out.display(),
        "wrote spectrum report"
    );
    Ok(())
}
