use std::error::Error;
use std::path::PathBuf;

use clap::Args;

use super::load_circuit;

#[derive(Args, Debug)]
pub struct CanonicalArgs {
    /// YAML or JSON circuit description.
    #[arg(long)]
    pub circuit: PathBuf,
    /// Optional YAML or JSON configuration; selects the extended basis.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub fn run(args: &CanonicalArgs) -> Result<(), Box<dyn Error>> {
    let loaded = load_circuit(&args.circuit, args.config.as_ref())?;
    let circuit = &loaded.circuit;
    for monomial in circuit.canonical().monomials() {
        println!("{monomial}");
    }
    let shifts = circuit.flux_shifts()?;
    for (variable, shift) in &shifts.shifts {
        println!("# Δ{variable} = {shift}");
    }
    Ok(())
}
