//! Windows "Root" certificate store via `certutil`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{check_store_result, Platform, Toolbox, TrustStore};
use crate::error::{Result, StoreAction, TrustError};
use crate::exec::quote_arg;

/// Marker `certutil -verify` prints for a chain ending in an untrusted root.
const UNTRUSTED_ROOT: &str = "UNTRUSTED root";

/// Sibling of `cert_path` with its extension replaced by `.cer`
/// (`C:\certs\root.pem` -> `C:\certs\root.cer`).
pub fn convert_path_to_cer(cert_path: &Path) -> Result<PathBuf> {
    let s = cert_path.to_string_lossy();
    let file_start = s
        .rfind(|c: char| c == '/' || c == '\\')
        .map(|i| i + 1)
        .unwrap_or(0);
    match s[file_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            Ok(PathBuf::from(format!("{}.cer", &s[..file_start + dot])))
        }
        _ => Err(TrustError::PathError {
            path: cert_path.to_path_buf(),
            reason: "no file extension to replace with .cer".to_string(),
        }),
    }
}

/// Serial number from a `certutil -dump | find "Serial"` line
/// (`Serial Number: 1a2b...`).
fn parse_serial(dump_line: &str) -> Option<&str> {
    dump_line.split_whitespace().nth(2).map(str::trim)
}

pub struct WindowsTrust {
    toolbox: Toolbox,
}

impl WindowsTrust {
    pub fn new(toolbox: Toolbox) -> Self {
        Self { toolbox }
    }

    fn q(arg: &str) -> String {
        quote_arg(Platform::Windows, arg)
    }
}

#[async_trait]
impl TrustStore for WindowsTrust {
    fn name(&self) -> &str {
        "Windows"
    }

    async fn install(&self, cert_path: &Path, _name: Option<&str>) -> Result<()> {
        self.toolbox.require_cert(cert_path)?;
        let cer_path = convert_path_to_cer(cert_path)?;
        if cer_path != cert_path {
            self.toolbox
                .fs
                .copy(cert_path, &cer_path)
                .map_err(|e| {
                    TrustError::store_write(
                        self.name(),
                        StoreAction::Add,
                        format!("copy to {}: {e}", cer_path.display()),
                    )
                })?;
        }
        let cmd = format!(
            "certutil -addstore {} {}",
            Self::q("Root"),
            Self::q(&cer_path.to_string_lossy())
        );
        let output = self.toolbox.elevated.run(&cmd).await?;
        check_store_result(self.name(), StoreAction::Add, &output)
    }

    async fn uninstall(&self, cert_path: &Path, _name: Option<&str>) -> Result<()> {
        let dump = format!(
            "certutil.exe -dump {} | find {}",
            Self::q(&cert_path.to_string_lossy()),
            Self::q("Serial")
        );
        let output = self.toolbox.shell.run(&dump).await.map_err(|e| match e {
            TrustError::CommandFailed { message, .. } => {
                TrustError::store_write(self.name(), StoreAction::Remove, message)
            }
            other => other,
        })?;

        if output.stdout.trim().is_empty() {
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                "no serial number in certificate dump"
            } else {
                stderr
            };
            return Err(TrustError::store_write(
                self.name(),
                StoreAction::Remove,
                message,
            ));
        }

        let serial = parse_serial(&output.stdout).ok_or_else(|| {
            TrustError::store_write(
                self.name(),
                StoreAction::Remove,
                format!("unexpected dump line: {}", output.stdout.trim()),
            )
        })?;
        let cmd = format!("certutil -delstore {} {}", Self::q("Root"), Self::q(serial));
        let output = self.toolbox.elevated.run(&cmd).await?;
        check_store_result(self.name(), StoreAction::Remove, &output)
    }

    async fn exists(&self, cert_path: &Path, _name: Option<&str>) -> bool {
        let cmd = format!(
            "certutil.exe -verify {}",
            Self::q(&cert_path.to_string_lossy())
        );
        match self.toolbox.shell.run(&cmd).await {
            Ok(out) if !out.stdout.is_empty() => !out.stdout.contains(UNTRUSTED_ROOT),
            Ok(out) if !out.stderr.is_empty() => false,
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "certutil verify failed");
                false
            }
        }
    }
}
