//! macOS system keychain via the `security` tool.

use std::path::Path;

use async_trait::async_trait;

use super::{check_store_result, Platform, Toolbox, TrustStore};
use crate::error::{Result, StoreAction};
use crate::exec::quote_arg;
use crate::identity::read_common_name;

pub const SYSTEM_KEYCHAIN: &str = "/Library/Keychains/System.keychain";

pub struct MacOsTrust {
    toolbox: Toolbox,
}

impl MacOsTrust {
    pub fn new(toolbox: Toolbox) -> Self {
        Self { toolbox }
    }

    fn q(arg: &str) -> String {
        quote_arg(Platform::MacOs, arg)
    }

    fn common_name(&self, cert_path: &Path, name: Option<&str>) -> Result<String> {
        match name {
            Some(n) => Ok(n.to_string()),
            None => read_common_name(self.toolbox.fs.as_ref(), cert_path),
        }
    }
}

#[async_trait]
impl TrustStore for MacOsTrust {
    fn name(&self) -> &str {
        "MacOs"
    }

    async fn install(&self, cert_path: &Path, _name: Option<&str>) -> Result<()> {
        self.toolbox.require_cert(cert_path)?;
        let cmd = format!(
            "security add-trusted-cert -d -r trustRoot -k {SYSTEM_KEYCHAIN} {}",
            Self::q(&cert_path.to_string_lossy())
        );
        let output = self.toolbox.elevated.run(&cmd).await?;
        check_store_result(self.name(), StoreAction::Add, &output)
    }

    async fn uninstall(&self, cert_path: &Path, name: Option<&str>) -> Result<()> {
        let cn = self.common_name(cert_path, name)?;
        let cmd = format!(
            "security delete-certificate -c {} {SYSTEM_KEYCHAIN}",
            Self::q(&cn)
        );
        let output = self.toolbox.elevated.run(&cmd).await?;
        check_store_result(self.name(), StoreAction::Remove, &output)
    }

    async fn exists(&self, cert_path: &Path, name: Option<&str>) -> bool {
        let cn = match self.common_name(cert_path, name) {
            Ok(cn) => cn,
            Err(e) => {
                tracing::warn!(error = %e, "keychain lookup skipped");
                return false;
            }
        };
        let cmd = format!(
            "security find-certificate -c {} {SYSTEM_KEYCHAIN}",
            Self::q(&cn)
        );
        self.toolbox.shell.run(&cmd).await.is_ok()
    }
}
