//! Command line interface for the `etcdfs` binary

use std::path::PathBuf;

use clap::Parser;

use common::namespace::AttrFailurePolicy;
use common::store::Consistency;

use crate::config::Config;
use crate::logging::LogFormat;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "etcdfs",
    version,
    about = "Mount an etcd keyspace as a read-only filesystem"
)]
pub struct Cli {
    /// Directory to mount the keyspace on
    #[arg(value_name = "MOUNTPOINT")]
    pub mountpoint: PathBuf,

    /// etcd endpoint URL (repeatable, tried in order)
    #[arg(
        long = "endpoint",
        value_name = "URL",
        env = "ETCDFS_ENDPOINTS",
        value_delimiter = ','
    )]
    pub endpoints: Vec<String>,

    /// Read consistency: weak (any member) or strong (quorum read)
    #[arg(long, value_name = "LEVEL")]
    pub consistency: Option<Consistency>,

    /// Config file (default: $XDG_CONFIG_HOME/etcdfs/config.toml if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Attribute failures: empty (report a zeroed attr) or propagate (EIO)
    #[arg(long, value_name = "POLICY")]
    pub attr_errors: Option<AttrFailurePolicy>,

    /// Allow other users to access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Human)]
    pub log_format: LogFormat,
}

impl Cli {
    /// Layer command line flags over a loaded config
    pub fn apply(&self, mut config: Config) -> Config {
        if !self.endpoints.is_empty() {
            config.endpoints = self.endpoints.clone();
        }
        if let Some(consistency) = self.consistency {
            config.consistency = consistency;
        }
        if let Some(policy) = self.attr_errors {
            config.attr_errors = policy;
        }
        if self.allow_other {
            config.allow_other = true;
        }
        config
    }
}
