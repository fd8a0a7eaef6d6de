//! Backend resolution for the running host.

use crate::config::{Settings, TrustPaths};
use crate::error::Result;
use crate::platform::{resolve_with, HostEnv, Target, Toolbox, TrustStore};

/// Resolve the trust store for `target` (`darwin`, `win32`, `linux`, `nss`),
/// defaulting to the host platform. `app_name` brands elevation prompts.
pub fn resolve_backend(target: Option<&str>, app_name: Option<&str>) -> Result<Box<dyn TrustStore>> {
    let settings = Settings::load(&TrustPaths::default_paths())?;
    resolve_backend_with_settings(target, app_name, &settings)
}

/// Like [`resolve_backend`] with already-loaded settings.
pub fn resolve_backend_with_settings(
    target: Option<&str>,
    app_name: Option<&str>,
    settings: &Settings,
) -> Result<Box<dyn TrustStore>> {
    let env = HostEnv::detect();
    let target = match target {
        Some(t) => t.parse()?,
        None => Target::host(&env)?,
    };
    let label = app_name
        .map(String::from)
        .or_else(|| settings.app_name.clone());
    resolve_with(target, &env, Toolbox::host(label), settings)
}
