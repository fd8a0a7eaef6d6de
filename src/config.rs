//! Configuration loading and path resolution.
//!
//! Supports TRUST_CERT_HOME env var override for testing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrustError};

/// Where trust-cert keeps its configuration.
#[derive(Debug, Clone)]
pub struct TrustPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
}

impl TrustPaths {
    /// Build paths from base directory (e.g. ProjectDirs config dir or TRUST_CERT_HOME).
    pub fn from_base(base: PathBuf) -> Self {
        let config_file = base.join("config.toml");
        Self {
            config_dir: base,
            config_file,
        }
    }

    /// Get default paths (respects TRUST_CERT_HOME).
    pub fn default_paths() -> Self {
        let base = if let Ok(home) = std::env::var("TRUST_CERT_HOME") {
            PathBuf::from(home)
        } else if let Some(dirs) = directories::ProjectDirs::from("com", "trust-cert", "trust-cert")
        {
            dirs.config_dir().to_path_buf()
        } else {
            PathBuf::from(".trust-cert")
        };
        Self::from_base(base)
    }
}

/// config.toml contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Label shown on elevation prompts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    /// Directory holding per-platform certutil builds (`linux64/`, `mac/`, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nss_tools_dir: Option<PathBuf>,
    /// Explicit certutil binary; bypasses the bundled layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certutil: Option<PathBuf>,
    /// Explicit Firefox profile root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nss_profile_dir: Option<PathBuf>,
}

impl Settings {
    /// Load config.toml (defaults when absent) and apply env overrides.
    pub fn load(paths: &TrustPaths) -> Result<Settings> {
        let mut settings = Self::load_file(&paths.config_file)?;
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// Parse a config file without env overrides. Missing file means defaults.
    pub fn load_file(path: &Path) -> Result<Settings> {
        if !path.is_file() {
            return Ok(Settings::default());
        }
        let s = fs::read_to_string(path)?;
        toml::from_str(&s).map_err(|e| TrustError::Config(format!("{}: {e}", path.display())))
    }

    fn apply_env_overrides(&mut self) {
        if let Some(p) = std::env::var_os("TRUST_CERT_CERTUTIL") {
            self.certutil = Some(PathBuf::from(p));
        }
        if let Some(p) = std::env::var_os("TRUST_CERT_NSS_TOOLS_DIR") {
            self.nss_tools_dir = Some(PathBuf::from(p));
        }
        if let Some(p) = std::env::var_os("TRUST_CERT_NSS_PROFILE_DIR") {
            self.nss_profile_dir = Some(PathBuf::from(p));
        }
    }

    /// Configured tools dir, else `nss/` next to the running executable.
    pub fn resolved_tools_dir(&self) -> PathBuf {
        if let Some(dir) = &self.nss_tools_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.join("nss")))
            .unwrap_or_else(|| PathBuf::from("nss"))
    }
}
