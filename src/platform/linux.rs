//! Linux system trust anchors: a directory of flat certificate files folded
//! into the system bundle by a distro-specific update command.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{check_store_result, HostEnv, Platform, Toolbox, TrustStore};
use crate::error::{Result, StoreAction, TrustError};
use crate::exec::quote_arg;

/// One well-known anchor directory and the command that refreshes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorLayout {
    pub dir: &'static str,
    pub extension: &'static str,
    pub update_command: &'static [&'static str],
}

/// Probed in order; the first existing directory wins.
pub const ANCHOR_LAYOUTS: [AnchorLayout; 3] = [
    // Fedora, RHEL
    AnchorLayout {
        dir: "/etc/pki/ca-trust/source/anchors/",
        extension: "pem",
        update_command: &["update-ca-trust", "extract"],
    },
    // Debian, Ubuntu
    AnchorLayout {
        dir: "/usr/local/share/ca-certificates/",
        extension: "crt",
        update_command: &["update-ca-certificates"],
    },
    // Arch
    AnchorLayout {
        dir: "/etc/ca-certificates/trust-source/anchors/",
        extension: "crt",
        update_command: &["trust", "extract-compat"],
    },
];

/// Store layout resolved once when the backend is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinuxStoreConfig {
    layout: Option<AnchorLayout>,
    update_commands: Vec<String>,
}

impl LinuxStoreConfig {
    /// Probe the host for a known anchor directory. The update command is kept
    /// only if its program resolves on `PATH`.
    pub fn probe(toolbox: &Toolbox, env: &HostEnv) -> Self {
        let fs = toolbox.fs.as_ref();
        let Some(layout) = ANCHOR_LAYOUTS
            .iter()
            .find(|l| fs.resolves_to_dir(Path::new(l.dir)))
            .copied()
        else {
            tracing::debug!("no known trust anchor directory found");
            return Self::default();
        };

        let update_commands = match layout.update_command.first() {
            Some(program) if env.which(fs, program).is_some() => layout
                .update_command
                .iter()
                .map(|s| s.to_string())
                .collect(),
            _ => {
                tracing::debug!(
                    command = %layout.update_command.join(" "),
                    "trust update command not on PATH"
                );
                Vec::new()
            }
        };
        Self {
            layout: Some(layout),
            update_commands,
        }
    }

    pub fn layout(&self) -> Option<&AnchorLayout> {
        self.layout.as_ref()
    }

    pub fn update_commands(&self) -> &[String] {
        &self.update_commands
    }

    /// `<anchor-dir>/<cert stem>.<ext>`, or `None` without an anchor directory.
    pub fn anchor_path(&self, cert_path: &Path) -> Option<PathBuf> {
        let layout = self.layout?;
        let stem = cert_path.file_stem()?.to_string_lossy();
        Some(Path::new(layout.dir).join(format!("{stem}.{}", layout.extension)))
    }
}

pub struct LinuxTrust {
    toolbox: Toolbox,
    config: LinuxStoreConfig,
}

impl LinuxTrust {
    pub fn new(toolbox: Toolbox, env: &HostEnv) -> Self {
        let config = LinuxStoreConfig::probe(&toolbox, env);
        Self { toolbox, config }
    }

    pub fn config(&self) -> &LinuxStoreConfig {
        &self.config
    }

    fn anchor_path(&self, cert_path: &Path, action: StoreAction) -> Result<PathBuf> {
        self.config.anchor_path(cert_path).ok_or_else(|| {
            TrustError::store_write(self.name(), action, "no known trust anchor directory")
        })
    }

    /// Run the refresh command, if one was resolved.
    async fn refresh(&self, action: StoreAction) -> Result<()> {
        if self.config.update_commands.is_empty() {
            tracing::warn!("no trust update command available; anchor file changed without refresh");
            return Ok(());
        }
        let output = self
            .toolbox
            .elevated
            .run(&self.config.update_commands.join(" "))
            .await?;
        check_store_result(self.name(), action, &output)
    }
}

#[async_trait]
impl TrustStore for LinuxTrust {
    fn name(&self) -> &str {
        "Linux"
    }

    async fn install(&self, cert_path: &Path, _name: Option<&str>) -> Result<()> {
        self.toolbox.require_cert(cert_path)?;
        let dest = self.anchor_path(cert_path, StoreAction::Add)?;
        self.toolbox.fs.copy(cert_path, &dest).map_err(|e| {
            TrustError::store_write(
                self.name(),
                StoreAction::Add,
                format!("copy to {}: {e}", dest.display()),
            )
        })?;
        self.refresh(StoreAction::Add).await
    }

    async fn uninstall(&self, cert_path: &Path, _name: Option<&str>) -> Result<()> {
        let dest = self.anchor_path(cert_path, StoreAction::Remove)?;
        let cmd = format!("rm -f {}", quote_arg(Platform::Linux, &dest.to_string_lossy()));
        let output = self.toolbox.elevated.run(&cmd).await?;
        check_store_result(self.name(), StoreAction::Remove, &output)?;
        self.refresh(StoreAction::Remove).await
    }

    async fn exists(&self, cert_path: &Path, _name: Option<&str>) -> bool {
        self.config
            .anchor_path(cert_path)
            .map(|p| self.toolbox.fs.is_file(&p))
            .unwrap_or(false)
    }
}
