use std::error::Error;

use circ_hd::io::to_canonical_json_bytes;
use circ_hd::{truncation_template, Group, DEFAULT_COMBINED_TRUNCATION, DEFAULT_INDIVIDUAL_TRUNCATION};
use clap::Args;

#[derive(Args, Debug)]
pub struct TemplateArgs {
    /// Hierarchy as nested JSON lists, e.g. `[[1, 2], [3]]`.
    #[arg(long)]
    pub hierarchy: String,
    /// Retained states of each leaf subsystem.
    #[arg(long, default_value_t = DEFAULT_INDIVIDUAL_TRUNCATION)]
    pub individual: usize,
    /// Retained states of each nested subsystem.
    #[arg(long, default_value_t = DEFAULT_COMBINED_TRUNCATION)]
    pub combined: usize,
}

pub fn run(args: &TemplateArgs) -> Result<(), Box<dyn Error>> {
    let hierarchy: Vec<Group> = serde_json::from_str(&args.hierarchy)
        .map_err(|err| format!("invalid hierarchy '{}': {err}", args.hierarchy))?;
    let template = truncation_template(&hierarchy, args.individual, args.combined);
    println!("{}", String::from_utf8(to_canonical_json_bytes(&template)?)?);
    Ok(())
}
