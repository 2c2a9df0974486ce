use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Final answer only.
    Text,
    /// Full run outcome as JSON.
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "taskpilot", version, about = "Plan, execute and answer with external tools")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to ~/.taskpilot/config.toml, then ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[arg(long, short = 'm')]
    pub message: String,

    #[arg(long, default_value = "cli")]
    pub user_id: String,

    #[arg(long)]
    pub channel_id: Option<String>,

    /// JSON file with prior conversation messages.
    #[arg(long)]
    pub history: Option<String>,

    #[arg(long)]
    pub run_id: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct ToolsArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one request through plan -> execute -> respond.
    Run(RunArgs),
    /// List the configured tool catalog.
    Tools(ToolsArgs),
    /// Print the effective configuration with secrets masked.
    Config,
}
