use std::error::Error;
use std::fs;
use std::path::PathBuf;

use circ_hd::io::to_canonical_json_bytes;
use clap::Args;
use serde::Serialize;

use super::{ensure_parent, load_circuit};

#[derive(Args, Debug)]
pub struct ElementsArgs {
    /// YAML or JSON circuit description.
    #[arg(long)]
    pub circuit: PathBuf,
    /// Optional YAML or JSON configuration.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Operator name such as `n1`, `cos2` or `I`.
    #[arg(long)]
    pub operator: String,
    /// Number of eigenvectors spanning the table.
    #[arg(long, default_value_t = 4)]
    pub evals: usize,
    /// Output JSON file.
    #[arg(long)]
    pub out: PathBuf,
}

#[derive(Debug, Serialize)]
struct ElementTable {
    operator: String,
    energies: Vec<f64>,
    real: Vec<Vec<f64>>,
    imag: Vec<Vec<f64>>,
    input_hash: String,
}

pub fn run(args: &ElementsArgs) -> Result<(), Box<dyn Error>> {
    let loaded = load_circuit(&args.circuit, args.config.as_ref())?;
    let circuit = &loaded.circuit;
    let table = circuit.matrixelement_table(&args.operator, args.evals)?;
    let real = table
        .row_iter()
        .map(|row| row.iter().map(|z| z.re).collect())
        .collect();
    let imag = table
        .row_iter()
        .map(|row| row.iter().map(|z| z.im).collect())
        .collect();

    let output = ElementTable {
        operator: args.operator.clone(),
        energies: circuit.eigenvals(args.evals)?,
        real,
        imag,
        input_hash: loaded.input_hash,
    };
    ensure_parent(&args.out)?;
    fs::write(&args.out, to_canonical_json_bytes(&output)?)?;
    Ok(())
}
