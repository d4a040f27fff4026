//! Layered configuration for precompress.
//!
//! Sources are merged in increasing order of precedence:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. `config.toml` in the platform's configuration directory, if present
//! 3. An explicitly requested file (TOML, YAML or JSON, by extension)
//! 4. Environment variables prefixed with [`ENV_PREFIX`]
//! 5. Command-line [`Overrides`]
//!
//! The merged [`Config`] is then validated into pipeline
//! [`Options`](precompress_pipeline::Options) with [`Config::into_options`].

pub mod error;
mod size;

pub use crate::size::ByteSize;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use precompress_pipeline::{DEFAULT_BLOCK_SIZE, Options, default_concurrency, parse_algorithms};
use serde::{Deserialize, Deserializer, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Environment variables starting with this prefix override configuration
/// files, e.g. `PRECOMPRESS_BLOCK_SIZE=64KiB`.
pub const ENV_PREFIX: &str = "PRECOMPRESS_";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Algorithm names; each entry may itself be a comma-separated list.
    #[serde(deserialize_with = "one_or_many")]
    pub algorithms: Vec<String>,
    pub delete_larger: bool,
    pub skip_existing: bool,
    pub block_size: ByteSize,
    /// Files processed at once; `0` means one per available CPU.
    pub concurrency: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            algorithms: vec!["brotli".to_string(), "gzip".to_string()],
            delete_larger: false,
            skip_existing: false,
            block_size: ByteSize::new(DEFAULT_BLOCK_SIZE.get() as u64),
            concurrency: 0,
        }
    }
}

/// Values given on the command-line. Anything left as `None` falls through
/// to the lower-precedence sources.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithms: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_larger: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_existing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,
}

impl Config {
    /// Location of the per-user configuration file, if the platform has one.
    pub fn user_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "precompress").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from every source, reading the user configuration file from its
    /// platform-specific location.
    pub fn load(explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        Self::load_from(Self::user_config_path().as_deref(), explicit, overrides)
    }

    /// Load from every source, with the user configuration file at `user`.
    ///
    /// A missing user file is ignored; a missing `explicit` file is
    /// [`ErrorKind::NotFound`].
    pub fn load_from(user: Option<&Path>, explicit: Option<&Path>, overrides: Overrides) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(user) = user {
            tracing::debug!(path = %user.display(), exists = user.is_file(), "User configuration");
            figment = figment.merge(Toml::file(user));
        }
        if let Some(explicit) = explicit {
            if !explicit.is_file() {
                exn::bail!(ErrorKind::NotFound(explicit.to_path_buf()));
            }
            tracing::debug!(path = %explicit.display(), "Explicit configuration");
            figment = match explicit.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
                Some("toml") => figment.merge(Toml::file(explicit)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(explicit)),
                Some("json") => figment.merge(Json::file(explicit)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(explicit.to_path_buf())),
            };
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX)).merge(Serialized::defaults(overrides));
        figment.extract().or_raise(|| ErrorKind::Load)
    }

    /// Validate into the options the pipeline runs with.
    ///
    /// # Errors
    /// - [`ErrorKind::UnsupportedAlgorithm`] for an unknown algorithm name
    /// - [`ErrorKind::InvalidValue`] for an empty algorithm list or a zero
    ///   (or unaddressable) block size
    pub fn into_options(self) -> Result<Options> {
        let algorithms = parse_algorithms(&self.algorithms).or_raise(|| ErrorKind::UnsupportedAlgorithm)?;
        if algorithms.is_empty() {
            exn::bail!(ErrorKind::InvalidValue("algorithms".to_string()));
        }
        let Some(block_size) = usize::try_from(self.block_size.bytes()).ok().and_then(NonZeroUsize::new) else {
            exn::bail!(ErrorKind::InvalidValue("block_size".to_string()));
        };
        let concurrency = NonZeroUsize::new(self.concurrency).unwrap_or_else(default_concurrency);
        Ok(Options::new(algorithms)
            .delete_larger(self.delete_larger)
            .skip_existing(self.skip_existing)
            .block_size(block_size)
            .concurrency(concurrency))
    }
}

/// Accept either a list of names or a single (possibly comma-separated)
/// string, which is what an environment variable provides.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(name) => vec![name],
        OneOrMany::Many(names) => names,
    })
}
