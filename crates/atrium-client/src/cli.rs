use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "atrium", version, about = "Atrium — a walkable virtual gallery")]
pub struct CliArgs {
    /// Path to the gallery project root directory
    #[arg(long, default_value = ".")]
    pub project: String,

    /// Path to the gallery YAML file (overrides discovery)
    #[arg(long)]
    pub gallery: Option<String>,
}
