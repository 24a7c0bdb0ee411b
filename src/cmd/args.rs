use std::path::PathBuf;

use clap::Args;

use crate::values::SetValue;

/// Where the values come from, in `helm template` order.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ValuesArgs {
    /// Values file, may be given multiple times. Later files win
    #[arg(short = 'f', long = "values", value_name = "FILE")]
    pub files: Vec<PathBuf>,

    /// Override a single value (e.g. --set tls.enabled=false)
    #[arg(long = "set", value_name = "PATH=VALUE", value_parser = parse_set_value)]
    pub sets: Vec<SetValue>,
}

pub(super) fn parse_set_value(s: &str) -> Result<SetValue, String> {
    s.parse().map_err(|e: crate::values::SetValueParseError| e.to_string())
}
