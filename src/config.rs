use std::path::PathBuf;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::engine::{RenderContext, DEFAULT_APP_VERSION, DEFAULT_IMAGE_REPOSITORY};

#[derive(Debug, Default, PartialEq, Eq)]
pub enum ConfigLoadOption {
    #[default]
    Default,

    Path(PathBuf),
}

/// Chart level defaults applied when the values leave them unset.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChartConfig {
    pub app_version: String,
    pub image_repository: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            app_version: DEFAULT_APP_VERSION.to_string(),
            image_repository: DEFAULT_IMAGE_REPOSITORY.to_string(),
        }
    }
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub chart: ChartConfig,
}

impl Config {
    pub fn load(option: ConfigLoadOption) -> Result<Self> {
        Self::figment(option)
            .merge(Env::prefixed("PANDACHART_").split("__"))
            .extract_lossy()
            .map_err(Into::into)
    }

    fn figment(option: ConfigLoadOption) -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Self::default()));

        match option {
            ConfigLoadOption::Default => figment,
            ConfigLoadOption::Path(path) => figment.merge(Yaml::file(path)),
        }
    }

    pub fn render_context(&self, release_name: &str, namespace: &str) -> RenderContext {
        RenderContext {
            release_name: release_name.to_string(),
            namespace: namespace.to_string(),
            app_version: self.chart.app_version.clone(),
            image_repository: self.chart.image_repository.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_without_a_file() {
        Jail::expect_with(|_| {
            let config = Config::load(ConfigLoadOption::Default).map_err(|e| e.to_string())?;

            assert_eq!(config, Config::default());

            Ok(())
        });
    }

    #[test]
    fn file_then_environment() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                "chart:\n  app_version: v23.2.1\n  image_repository: somecustomrepo\n",
            )?;
            jail.set_env("PANDACHART_CHART__APP_VERSION", "v24.1.0");

            let config = Config::load(ConfigLoadOption::Path("config.yaml".into()))
                .map_err(|e| e.to_string())?;

            assert_eq!(
                config.chart,
                ChartConfig {
                    app_version: "v24.1.0".to_string(),
                    image_repository: "somecustomrepo".to_string(),
                }
            );

            Ok(())
        });
    }

    #[test]
    fn render_context_carries_the_chart_defaults() {
        let context = Config::default().render_context("rp", "ns");

        assert_eq!(context.release_name, "rp");
        assert_eq!(context.namespace, "ns");
        assert_eq!(context.app_version, DEFAULT_APP_VERSION);
    }
}
