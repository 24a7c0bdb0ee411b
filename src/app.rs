use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rayon::prelude::*;

use crate::{
    cmd::{CheckArgs, Command, RenderArgs, SubCommand},
    config::Config,
    engine::{resolve, GateTable, RenderContext, ResolvedConfiguration},
    logger,
    output::render,
    values::{SetValue, ValuesLoader},
};

pub struct App;

impl App {
    pub fn run(cmd: Command, config: Config) -> Result<()> {
        logger!(info, "app start");

        let result = match cmd.subcommand {
            SubCommand::Render(args) => Self::render(args, &config).map(|text| print!("{text}")),
            SubCommand::Check(args) => Self::check(args, &config),
        };

        if let Err(err) = &result {
            logger!(error, "{}", err);
        }

        logger!(info, "app end");

        result
    }

    pub fn render(args: RenderArgs, config: &Config) -> Result<String> {
        let context = config.render_context(&args.release_name, &args.namespace);

        let values = ValuesLoader::new()
            .files(args.values.files)
            .sets(args.values.sets)
            .load()?;

        let resolved = resolve(&values, &context, GateTable::builtin())?;

        render(&resolved, args.output)
    }

    /// Resolves every file on its own. All files are reported before the
    /// command fails.
    pub fn check(args: CheckArgs, config: &Config) -> Result<()> {
        let context = config.render_context("redpanda", "default");

        let results: Vec<(PathBuf, Result<ResolvedConfiguration>)> = args
            .files
            .par_iter()
            .map(|path| (path.clone(), check_file(path, &args.sets, &context)))
            .collect();

        let mut failed = 0;

        for (path, result) in &results {
            match result {
                Ok(_) => println!("ok: {}", path.display()),
                Err(err) => {
                    failed += 1;

                    println!("error: {}", path.display());
                    for line in format!("{err:#}").lines() {
                        println!("  {line}");
                    }
                }
            }
        }

        if failed > 0 {
            bail!("{} of {} values files failed", failed, results.len());
        }

        Ok(())
    }
}

fn check_file(
    path: &Path,
    sets: &[SetValue],
    context: &RenderContext,
) -> Result<ResolvedConfiguration> {
    let values = ValuesLoader::new()
        .file(path)
        .sets(sets.iter().cloned())
        .load()?;

    let resolved = resolve(&values, context, GateTable::builtin())?;

    Ok(resolved)
}
