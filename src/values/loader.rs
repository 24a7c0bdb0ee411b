use std::path::PathBuf;

use anyhow::{bail, Result};
use figment::{
    providers::{Format, Serialized, Yaml},
    Figment,
};

use crate::logger;

use super::{nest_set_values, PartialValues, SetValue};

#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Inline(String),
}

/// Layers values documents the way `helm template -f a.yaml -f b.yaml --set k=v`
/// does: documents are deep merged in the order given and `--set`
/// overrides are applied last.
#[derive(Debug, Default, Clone)]
pub struct ValuesLoader {
    sources: Vec<Source>,
    overrides: Vec<SetValue>,
}

impl ValuesLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.sources.push(Source::File(path.into()));
        self
    }

    pub fn files(self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        paths.into_iter().fold(self, Self::file)
    }

    pub fn document(mut self, yaml: impl Into<String>) -> Self {
        self.sources.push(Source::Inline(yaml.into()));
        self
    }

    pub fn set(mut self, value: SetValue) -> Self {
        self.overrides.push(value);
        self
    }

    pub fn sets(mut self, values: impl IntoIterator<Item = SetValue>) -> Self {
        self.overrides.extend(values);
        self
    }

    pub fn load(&self) -> Result<PartialValues> {
        let mut figment = Figment::new();

        for source in &self.sources {
            figment = match source {
                Source::File(path) => {
                    if !path.try_exists()? {
                        bail!("values file not found: {}", path.display());
                    }

                    logger!(debug, "merge values file {}", path.display());

                    figment.merge(Yaml::file(path))
                }
                Source::Inline(yaml) => figment.merge(Yaml::string(yaml)),
            };
        }

        if !self.overrides.is_empty() {
            logger!(debug, "apply {} --set overrides", self.overrides.len());

            figment = figment.merge(Serialized::globals(nest_set_values(&self.overrides)));
        }

        let values = figment.extract()?;

        Ok(values)
    }
}
