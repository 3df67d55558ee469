use anyhow::{bail, Context};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{fs, path::Path, str::FromStr};
use toml::value::Table;

use crate::{
    error::{Error, Result},
    model::lesson::SectionKind,
};

/// Name of the optional configuration file at the root of a content tree.
pub const CONFIG_FILE: &str = "course.toml";

/// The contents of `course.toml`. The `[course]` table drives validation, every other
/// table is kept for renderers to read through [`Config::get`].
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Config {
    /// Configuration for ingestion and validation.
    #[serde(default)]
    pub course: ValidationConfig,

    /// Any remaining configuration for renderers.
    #[serde(flatten)]
    rest: Table,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        let buffer = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        Config::from_str(&buffer)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Loads `course.toml` from `root` if one exists, otherwise falls back to defaults.
    pub fn load_or_default(root: impl AsRef<Path>) -> Result<Config> {
        let location = root.as_ref().join(CONFIG_FILE);

        if location.exists() {
            Config::load(location)
        } else {
            Ok(Config::default())
        }
    }

    /// Deserialize an arbitrary top-level table, such as renderer specific settings.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .rest
            .get(key)
            .cloned()
            .with_context(|| format!("No `{key}` table in {CONFIG_FILE}"))?;

        value
            .try_into()
            .with_context(|| format!("Invalid `{key}` table in {CONFIG_FILE}"))
    }
}

impl FromStr for Config {
    type Err = Error;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(source)?;
        let readme = &config.course.readme;

        // Manifests are looked up by file name inside every directory.
        if readme.is_empty() || readme.contains(['/', '\\']) {
            bail!("`course.readme` must be a plain file name, got `{readme}`");
        }

        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "kebab-case")]
pub struct ValidationConfig {
    /// File name of the ordering manifest in every course and section directory.
    pub readme: String,
    /// Sections every lesson must contain.
    pub required_sections: Vec<SectionKind>,
    /// Sections whose absence is reported as a warning.
    pub recommended_sections: Vec<SectionKind>,
    /// Treat every warning as an error.
    pub strict: bool,
    /// How files holding several concatenated lesson drafts are reported.
    pub variant_policy: VariantPolicy,
    /// File and directory names skipped during discovery.
    pub ignore: Vec<String>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            readme: String::from("README.md"),
            required_sections: vec![SectionKind::Summary],
            recommended_sections: vec![SectionKind::Resources],
            strict: false,
            variant_policy: VariantPolicy::default(),
            ignore: vec![
                String::from(".git"),
                String::from("node_modules"),
                String::from("target"),
            ],
        }
    }
}

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum VariantPolicy {
    /// Multi-variant files are reported, but do not fail validation.
    #[default]
    Warn,
    /// Multi-variant files are errors.
    Error,
}
