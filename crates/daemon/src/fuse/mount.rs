//! Mount lifecycle: mount, wait for a termination signal, unmount

use std::path::{Path, PathBuf};

use fuser::MountOption;
use tokio::runtime::Handle;
use tokio::signal::unix::{signal, SignalKind};

use common::namespace::Namespace;
use common::store::KeyStore;

use super::EtcdFs;
use crate::config::FS_NAME;

#[derive(Debug, Clone)]
pub struct MountConfig {
    pub mountpoint: PathBuf,
    pub fs_name: String,
    pub allow_other: bool,
}

impl MountConfig {
    pub fn new(mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            mountpoint: mountpoint.into(),
            fs_name: FS_NAME.to_string(),
            allow_other: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MountError {
    #[error("mount point {0} is not an existing directory")]
    InvalidMountPoint(PathBuf),
    #[error("failed to mount {path}: {source}")]
    Mount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to install signal handler: {0}")]
    Signal(#[source] std::io::Error),
}

/// Options for a read-only mount with a fixed filesystem identity
pub fn mount_options(config: &MountConfig) -> Vec<MountOption> {
    let mut options = vec![
        MountOption::FSName(config.fs_name.clone()),
        MountOption::Subtype(FS_NAME.to_string()),
        MountOption::RO,
        MountOption::DefaultPermissions,
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
    }
    options
}

fn check_mountpoint(path: &Path) -> Result<(), MountError> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(MountError::InvalidMountPoint(path.to_path_buf()))
    }
}

/// Wait for SIGINT, SIGTERM or SIGQUIT and return its name
async fn wait_for_shutdown() -> Result<&'static str, MountError> {
    let mut interrupt = signal(SignalKind::interrupt()).map_err(MountError::Signal)?;
    let mut terminate = signal(SignalKind::terminate()).map_err(MountError::Signal)?;
    let mut quit = signal(SignalKind::quit()).map_err(MountError::Signal)?;

    let name = tokio::select! {
        _ = interrupt.recv() => "SIGINT",
        _ = terminate.recv() => "SIGTERM",
        _ = quit.recv() => "SIGQUIT",
    };
    Ok(name)
}

/// Mount `ns` and serve it until a termination signal arrives.
///
/// Must be called from within a multi-threaded tokio runtime: requests are
/// dispatched onto it while this task waits.
pub async fn serve<S: KeyStore>(ns: Namespace<S>, config: &MountConfig) -> Result<(), MountError> {
    check_mountpoint(&config.mountpoint)?;

    let fs = EtcdFs::new(Handle::current(), ns);
    let session = fuser::spawn_mount2(fs, &config.mountpoint, &mount_options(config)).map_err(
        |source| MountError::Mount {
            path: config.mountpoint.clone(),
            source,
        },
    )?;
    tracing::info!(mountpoint = %config.mountpoint.display(), "mounted");

    let caught = wait_for_shutdown().await;
    match &caught {
        Ok(name) => tracing::info!("caught {}, unmounting", name),
        Err(e) => tracing::error!("{}, unmounting", e),
    }

    // Joining the session unmounts and waits for the FUSE loop to exit
    tokio::task::block_in_place(move || session.join());
    tracing::info!(mountpoint = %config.mountpoint.display(), "unmounted");

    caught.map(|_| ())
}
