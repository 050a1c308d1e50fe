//! etcdfs: mount an etcd keyspace as a read-only filesystem.
//!
//! The binary is a thin wrapper around [`run`]. The projection itself lives
//! in the `common` crate; this crate adds configuration, the command line
//! and the FUSE bridge.

pub mod cli;
pub mod config;
#[cfg(feature = "fuse")]
pub mod fuse;
pub mod logging;

use std::sync::Arc;

use anyhow::Context;

use common::namespace::Namespace;
use common::store::EtcdClient;

pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use logging::{init_logging, LogFormat};

/// Load the config file named on the command line (or the default one),
/// apply flag overrides and validate the result
pub fn resolve_config(cli: &Cli) -> Result<Config, ConfigError> {
    let config = cli.apply(Config::load_or_default(cli.config.as_deref())?);
    config.validate()?;
    Ok(config)
}

/// Build the etcd-backed namespace described by `config`
pub fn build_namespace(config: &Config) -> anyhow::Result<Namespace<EtcdClient>> {
    let client = EtcdClient::new(config.etcd_config()?).context("failed to build etcd client")?;
    tracing::info!(
        endpoints = ?config.endpoints,
        consistency = %config.consistency,
        attr_errors = %config.attr_errors,
        "etcd client ready"
    );
    Ok(Namespace::new(Arc::new(client)).with_attr_policy(config.attr_errors))
}

/// Mount and serve until a termination signal arrives
#[cfg(feature = "fuse")]
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    let ns = build_namespace(&config)?;

    let mount = fuse::MountConfig {
        mountpoint: cli.mountpoint.clone(),
        fs_name: config.fs_name.clone(),
        allow_other: config.allow_other,
    };
    fuse::serve(ns, &mount).await?;
    Ok(())
}

#[cfg(not(feature = "fuse"))]
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    build_namespace(&config)?;
    anyhow::bail!(
        "cannot mount {}: etcdfs was built without the `fuse` feature",
        cli.mountpoint.display()
    )
}
