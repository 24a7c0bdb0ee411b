use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::output::OutputFormat;

use super::ValuesArgs;

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// Resolve values and print the broker configuration, volumes and certificates
    Render(RenderArgs),

    /// Validate values files independently of each other
    Check(CheckArgs),
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub values: ValuesArgs,

    /// Release name used to derive secret and certificate names
    #[arg(long, default_value = "redpanda")]
    pub release_name: String,

    /// Namespace the release is installed into
    #[arg(short, long, default_value = "default")]
    pub namespace: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub output: OutputFormat,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Values files to check
    #[arg(required = true, value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Overrides applied on top of every file
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = super::args::parse_set_value)]
    pub sets: Vec<crate::values::SetValue>,
}
