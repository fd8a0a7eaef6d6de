//! Platform abstraction: host facts, the `TrustStore` contract and backend
//! resolution.

pub mod linux;
pub mod macos;
pub mod nss;
pub mod windows;

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Settings;
use crate::error::{Result, StoreAction, TrustError};
use crate::exec::{CommandOutput, CommandRunner, ElevatedRunner, ShellRunner};
use crate::fs::{Filesystem, HostFs};

pub use linux::LinuxTrust;
pub use macos::MacOsTrust;
pub use nss::{NssDatabase, NssTrust};
pub use windows::WindowsTrust;

/// Trait for trust store operations on one root store.
#[async_trait]
pub trait TrustStore: Send + Sync {
    /// Display name used in log and error messages.
    fn name(&self) -> &str;
    /// Add `cert_path` to the store as a trusted root. `name` overrides the
    /// certificate's common name for stores that key entries by name.
    async fn install(&self, cert_path: &Path, name: Option<&str>) -> Result<()>;
    /// Remove the certificate from the store.
    async fn uninstall(&self, cert_path: &Path, name: Option<&str>) -> Result<()>;
    /// Whether the certificate is present. Never fails: any error reads as `false`.
    async fn exists(&self, cert_path: &Path, name: Option<&str>) -> bool;
}

/// Host operating systems with a native root store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    /// Map an OS identifier (`std::env::consts::OS` or a Node-style name).
    pub fn from_os(os: &str) -> Option<Self> {
        match os {
            "macos" | "darwin" => Some(Platform::MacOs),
            "windows" | "win32" => Some(Platform::Windows),
            "linux" => Some(Platform::Linux),
            _ => None,
        }
    }
}

/// Which store to operate on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Darwin,
    Win32,
    Linux,
    Nss,
}

impl Target {
    /// The native store of the host described by `env`.
    pub fn host(env: &HostEnv) -> Result<Self> {
        match env.platform {
            Some(Platform::MacOs) => Ok(Target::Darwin),
            Some(Platform::Windows) => Ok(Target::Win32),
            Some(Platform::Linux) => Ok(Target::Linux),
            None => Err(TrustError::UnsupportedPlatform(format!(
                "{}: only macOS, Linux and Windows supported",
                env.os
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Target::Darwin => "darwin",
            Target::Win32 => "win32",
            Target::Linux => "linux",
            Target::Nss => "nss",
        }
    }
}

impl FromStr for Target {
    type Err = TrustError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "darwin" => Ok(Target::Darwin),
            "win32" => Ok(Target::Win32),
            "linux" => Ok(Target::Linux),
            "nss" => Ok(Target::Nss),
            other => Err(TrustError::UnsupportedPlatform(format!(
                "{other}: expected one of darwin, win32, linux, nss"
            ))),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Host facts read once, so backends never consult ambient globals.
#[derive(Debug, Clone)]
pub struct HostEnv {
    /// `None` when the host OS has no supported root store.
    pub platform: Option<Platform>,
    pub os: String,
    pub arch: String,
    pub home: Option<PathBuf>,
    pub user_profile: Option<PathBuf>,
    pub path_var: Option<OsString>,
}

impl HostEnv {
    /// Describe the running host.
    pub fn detect() -> Self {
        let home = std::env::var_os("HOME")
            .map(PathBuf::from)
            .or_else(|| directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf()));
        Self {
            platform: Platform::from_os(std::env::consts::OS),
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            home,
            user_profile: std::env::var_os("USERPROFILE").map(PathBuf::from),
            path_var: std::env::var_os("PATH"),
        }
    }

    /// A fabricated host, for tests and cross-platform tooling.
    pub fn fabricated(platform: Platform, arch: &str) -> Self {
        let os = match platform {
            Platform::MacOs => "macos",
            Platform::Windows => "windows",
            Platform::Linux => "linux",
        };
        Self {
            platform: Some(platform),
            os: os.to_string(),
            arch: arch.to_string(),
            home: None,
            user_profile: None,
            path_var: None,
        }
    }

    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        self.user_profile = Some(home.clone());
        self.home = Some(home);
        self
    }

    pub fn with_path_var(mut self, path_var: impl Into<OsString>) -> Self {
        self.path_var = Some(path_var.into());
        self
    }

    /// Resolve `program` against `PATH` using `fs` for the probe.
    pub fn which(&self, fs: &dyn Filesystem, program: &str) -> Option<PathBuf> {
        let path_var = self.path_var.as_ref()?;
        let exe_suffixes: &[&str] = if self.platform == Some(Platform::Windows) {
            &["", ".exe", ".cmd", ".bat"]
        } else {
            &[""]
        };
        std::env::split_paths(path_var)
            .flat_map(|dir| {
                exe_suffixes
                    .iter()
                    .map(move |suffix| dir.join(format!("{program}{suffix}")))
            })
            .find(|candidate| fs.is_readable_file(candidate))
    }
}

/// Collaborators every backend composes: filesystem plus the two executors.
#[derive(Clone)]
pub struct Toolbox {
    pub fs: Arc<dyn Filesystem>,
    pub shell: Arc<dyn CommandRunner>,
    pub elevated: Arc<dyn CommandRunner>,
}

impl Toolbox {
    /// Real filesystem and processes. `label` brands elevation prompts.
    pub fn host(label: Option<String>) -> Self {
        Self {
            fs: Arc::new(HostFs),
            shell: Arc::new(ShellRunner),
            elevated: Arc::new(ElevatedRunner::new(label)),
        }
    }

    pub(crate) fn require_cert(&self, cert_path: &Path) -> Result<()> {
        if self.fs.is_readable_file(cert_path) {
            Ok(())
        } else {
            Err(TrustError::CertNotFound(cert_path.to_path_buf()))
        }
    }
}

/// Map a mutating command's output onto success or `StoreWrite`. Any stderr
/// text counts as failure.
pub(crate) fn check_store_result(
    store: &str,
    action: StoreAction,
    output: &CommandOutput,
) -> Result<()> {
    let stderr = output.stderr.trim();
    if !stderr.is_empty() {
        return Err(TrustError::store_write(store, action, stderr));
    }
    tracing::info!("Certificate successfully {} {store}!", action.success_phrase());
    Ok(())
}

/// Build the backend for `target` from explicit host facts and collaborators.
pub fn resolve_with(
    target: Target,
    env: &HostEnv,
    toolbox: Toolbox,
    settings: &Settings,
) -> Result<Box<dyn TrustStore>> {
    let store: Box<dyn TrustStore> = match target {
        Target::Darwin => Box::new(MacOsTrust::new(toolbox)),
        Target::Win32 => Box::new(WindowsTrust::new(toolbox)),
        Target::Linux => Box::new(LinuxTrust::new(toolbox, env)),
        Target::Nss => Box::new(NssTrust::new(toolbox, env, settings)?),
    };
    tracing::debug!(target = %target, store = store.name(), "resolved trust store");
    Ok(store)
}
