//! Load the hierarchical configuration of an application.
//!
//! [`ConfigLoader`] is the key type in this module.
//!
//! # Sources
//!
//! Configuration values are merged from three sources, in increasing order
//! of precedence:
//!
//! 1. `base.yml`, in the configuration directory;
//! 2. `<profile>.yml`, in the configuration directory;
//! 3. environment variables prefixed with `TRELLIS_`. Nested fields are
//!    separated by a double underscore, e.g. `TRELLIS_SERVER__HOST`.
//!
//! Missing files are skipped.
use std::path::PathBuf;

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::de::DeserializeOwned;

/// The environment variable used to pick the configuration profile.
pub const PROFILE_ENV_VAR: &str = "TRELLIS_PROFILE";

const ENV_PREFIX: &str = "TRELLIS_";

/// A builder to load the configuration of your application.
///
/// ```rust,no_run
/// use serde::Deserialize;
/// use trellis_server::config::ConfigLoader;
/// use trellis_server::server::ServerConfig;
///
/// #[derive(Deserialize)]
/// pub struct AppConfig {
///     pub server: ServerConfig,
/// }
///
/// let config: AppConfig = ConfigLoader::new()
///     .profile("dev")
///     .configuration_dir("configuration")
///     .load()?;
/// # Ok::<_, trellis_server::config::errors::ConfigLoadError>(())
/// ```
#[derive(Clone, Debug, Default)]
pub struct ConfigLoader {
    configuration_dir: Option<PathBuf>,
    profile: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the configuration profile explicitly.
    ///
    /// If not set, it is read from the `TRELLIS_PROFILE` environment variable.
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the directory that contains the configuration files.
    ///
    /// It defaults to `configuration`, relative to the current working directory.
    pub fn configuration_dir<Dir>(mut self, dir: Dir) -> Self
    where
        Dir: Into<PathBuf>,
    {
        self.configuration_dir = Some(dir.into());
        self
    }

    /// Load and deserialize the configuration.
    pub fn load<Config>(self) -> Result<Config, errors::ConfigLoadError>
    where
        Config: DeserializeOwned,
    {
        let profile = match self.profile {
            Some(profile) => profile,
            None => load_profile().map_err(|e| errors::ConfigLoadError(e.into()))?,
        };
        let configuration_dir = self
            .configuration_dir
            .unwrap_or_else(|| PathBuf::from("configuration"));
        let span = tracing::info_span!(
            "Loading configuration",
            configuration.directory = %configuration_dir.display(),
            configuration.profile = %profile,
        );
        let _guard = span.enter();

        let base_filepath = configuration_dir.join("base.yml");
        let profile_filepath = configuration_dir.join(format!("{profile}.yml"));
        // The profile variable is filtered out, otherwise configuration types
        // with `#[serde(deny_unknown_fields)]` would reject it.
        let env_source = Env::prefixed(ENV_PREFIX)
            .split("__")
            .ignore(&["PROFILE"]);
        let figment = Figment::new()
            .merge(Yaml::file(base_filepath))
            .merge(Yaml::file(profile_filepath))
            .merge(env_source);

        let configuration: Config = figment
            .extract()
            .context("Failed to load hierarchical configuration")
            .map_err(errors::ConfigLoadError)?;
        Ok(configuration)
    }
}

fn load_profile() -> Result<String, errors::ConfigProfileLoadError> {
    std::env::var(PROFILE_ENV_VAR)
        .with_context(|| {
            format!(
                "Failed to load the configuration profile: the environment variable `{PROFILE_ENV_VAR}` is either not set or set to a value that contains invalid UTF-8"
            )
        })
        .map_err(errors::ConfigProfileLoadError)
}

pub mod errors {
    //! Errors that can occur when loading configuration.

    /// The error returned by [`ConfigLoader::load`](super::ConfigLoader::load).
    #[derive(Debug, thiserror::Error)]
    #[error("Failed to load configuration")]
    pub struct ConfigLoadError(#[source] pub(super) anyhow::Error);

    /// The configuration profile couldn't be determined.
    #[derive(Debug, thiserror::Error)]
    #[error(transparent)]
    pub struct ConfigProfileLoadError(pub(super) anyhow::Error);
}
