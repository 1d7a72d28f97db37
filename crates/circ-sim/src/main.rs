use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    canonical::{self, CanonicalArgs},
    elements::{self, ElementsArgs},
    spectrum::{self, SpectrumArgs},
    template::{self, TemplateArgs},
};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "circ-sim", about = "Hierarchical circuit diagonalization CLI")]
struct Cli {
    /// Log per-node build steps.
    #[arg(long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Solve the lowest eigenvalues and write JSON and CSV reports.
    Spectrum(SpectrumArgs),
    /// Write the matrix-element table of an operator.
    Elements(ElementsArgs),
    /// Print a truncation template for a hierarchy.
    Template(TemplateArgs),
    /// Print the canonical monomials of a circuit.
    Canonical(CanonicalArgs),
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Spectrum(args) => spectrum::run(&args),
        Command::Elements(args) => elements::run(&args),
        Command::Template(args) => template::run(&args),
        Command::Canonical(args) => canonical::run(&args),
    }
}
