use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use tracker_core::StoreConfig;

/// CLI configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Default tracing filter, overridden by RUST_LOG
    pub log_level: String,

    pub store: StoreConfig,
}

impl CliConfig {
    /// Loads defaults, then the optional config file, then `TRACKER_*`
    /// environment variables (e.g. `TRACKER_STORE__STATE_PATH`)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder()
            .set_default("log_level", "info")?
            .set_default("store.persist_on_dispatch", true)?;

        if let Some(path) = path {
            builder = builder.add_source(::config::File::from(path).required(true));
        } else {
            builder = builder.add_source(::config::File::with_name("tracker").required(false));
        }

        builder
            .add_source(
                ::config::Environment::with_prefix("TRACKER")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("failed to assemble configuration")?
            .try_deserialize()
            .context("invalid configuration")
    }
}
