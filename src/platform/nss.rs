//! NSS certificate databases of Firefox profiles, driven through a bundled
//! `certutil` build.

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::{check_store_result, HostEnv, Platform, Toolbox, TrustStore};
use crate::config::Settings;
use crate::error::{Result, StoreAction, TrustError};
use crate::exec::quote_arg;
use crate::identity::read_common_name;

/// Trust flags for SSL, email and object signing: trusted CA for each.
const TRUST_FLAGS: &str = "C,C,C";

/// One profile database, addressed the way `certutil -d` expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NssDatabase {
    /// `cert9.db` (SQLite) store.
    Sql(PathBuf),
    /// Legacy `cert8.db` (Berkeley DB) store.
    Dbm(PathBuf),
}

impl fmt::Display for NssDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NssDatabase::Sql(p) => write!(f, "sql:{}", p.display()),
            NssDatabase::Dbm(p) => write!(f, "dbm:{}", p.display()),
        }
    }
}

/// Firefox profile root for the host.
pub fn default_profile_dir(env: &HostEnv) -> Option<PathBuf> {
    match env.platform? {
        Platform::Windows => Some(
            env.user_profile
                .as_ref()?
                .join("AppData")
                .join("Roaming")
                .join("Mozilla")
                .join("Firefox")
                .join("Profiles"),
        ),
        Platform::MacOs => Some(
            env.home
                .as_ref()?
                .join("Library")
                .join("Application Support")
                .join("Firefox")
                .join("Profiles"),
        ),
        Platform::Linux => Some(env.home.as_ref()?.join(".mozilla").join("firefox")),
    }
}

/// `certutil` inside `tools_dir` for the host's platform and architecture.
pub fn bundled_certutil(env: &HostEnv, tools_dir: &Path) -> Result<PathBuf> {
    let (layout, exe) = match (env.platform, env.arch.as_str()) {
        (Some(Platform::Windows), "x86_64") => ("win64", "certutil.exe"),
        (Some(Platform::Windows), "x86") => ("win32", "certutil.exe"),
        (Some(Platform::MacOs), _) => ("mac", "certutil"),
        (Some(Platform::Linux), "x86_64") => ("linux64", "certutil"),
        (Some(Platform::Linux), "x86") => ("linux32", "certutil"),
        _ => {
            return Err(TrustError::UnsupportedPlatform(format!(
                "NSS certutil not available for {}/{}",
                env.os, env.arch
            )))
        }
    };
    Ok(tools_dir.join(layout).join(exe))
}

pub struct NssTrust {
    toolbox: Toolbox,
    platform: Platform,
    profile_dir: PathBuf,
    certutil: PathBuf,
}

impl NssTrust {
    pub fn new(toolbox: Toolbox, env: &HostEnv, settings: &Settings) -> Result<Self> {
        let platform = env.platform.ok_or_else(|| {
            TrustError::UnsupportedPlatform(format!(
                "{}: NSS only supported on macOS, Linux and Windows",
                env.os
            ))
        })?;
        let certutil = match &settings.certutil {
            Some(p) => p.clone(),
            None => bundled_certutil(env, &settings.resolved_tools_dir())?,
        };
        let profile_dir = settings
            .nss_profile_dir
            .clone()
            .or_else(|| default_profile_dir(env))
            .ok_or_else(|| TrustError::ProfileDiscovery {
                dir: PathBuf::new(),
                reason: "home directory unknown".to_string(),
            })?;
        Ok(Self {
            toolbox,
            platform,
            profile_dir,
            certutil,
        })
    }

    pub fn profile_dir(&self) -> &Path {
        &self.profile_dir
    }

    pub fn certutil(&self) -> &Path {
        &self.certutil
    }

    /// Scan the profile root for certificate databases. Always re-reads the
    /// directory; profiles come and go between calls.
    pub fn get_firefox_databases(&self) -> Result<Vec<NssDatabase>> {
        let fs = self.toolbox.fs.as_ref();
        let entries = fs
            .list_dir(&self.profile_dir)
            .map_err(|e| TrustError::ProfileDiscovery {
                dir: self.profile_dir.clone(),
                reason: e.to_string(),
            })?;

        let mut databases = Vec::new();
        for profile in entries.into_iter().filter(|p| fs.is_dir(p)) {
            if fs.is_file(&profile.join("cert9.db")) {
                databases.push(NssDatabase::Sql(profile));
            } else if fs.is_file(&profile.join("cert8.db")) {
                databases.push(NssDatabase::Dbm(profile));
            }
        }
        tracing::debug!(count = databases.len(), dir = %self.profile_dir.display(), "firefox databases");
        Ok(databases)
    }

    /// Databases for a mutation; none at all is an error there.
    fn databases_for_write(&self) -> Result<Vec<NssDatabase>> {
        let databases = self.get_firefox_databases()?;
        if databases.is_empty() {
            return Err(TrustError::ProfileDiscovery {
                dir: self.profile_dir.clone(),
                reason: "no profiles with cert8 or cert9 databases".to_string(),
            });
        }
        Ok(databases)
    }

    fn nickname(&self, cert_path: &Path, name: Option<&str>) -> Result<String> {
        match name {
            Some(n) => Ok(n.to_string()),
            None => read_common_name(self.toolbox.fs.as_ref(), cert_path),
        }
    }

    fn q(&self, arg: &str) -> String {
        quote_arg(self.platform, arg)
    }

    fn certutil_cmd(&self, db: &NssDatabase, args: &str) -> String {
        format!(
            "{} {args} -d {}",
            self.q(&self.certutil.to_string_lossy()),
            self.q(&db.to_string())
        )
    }
}

#[async_trait]
impl TrustStore for NssTrust {
    fn name(&self) -> &str {
        "Nss"
    }

    async fn install(&self, cert_path: &Path, name: Option<&str>) -> Result<()> {
        self.toolbox.require_cert(cert_path)?;
        let nickname = self.nickname(cert_path, name)?;
        let args = format!(
            "-A -t {} -n {} -i {}",
            self.q(TRUST_FLAGS),
            self.q(&nickname),
            self.q(&cert_path.to_string_lossy())
        );
        for db in self.databases_for_write()? {
            let output = self.toolbox.elevated.run(&self.certutil_cmd(&db, &args)).await?;
            check_store_result(self.name(), StoreAction::Add, &output)?;
        }
        Ok(())
    }

    async fn uninstall(&self, cert_path: &Path, name: Option<&str>) -> Result<()> {
        let nickname = self.nickname(cert_path, name)?;
        let args = format!("-D -n {}", self.q(&nickname));
        for db in self.databases_for_write()? {
            let output = self.toolbox.elevated.run(&self.certutil_cmd(&db, &args)).await?;
            check_store_result(self.name(), StoreAction::Remove, &output)?;
        }
        Ok(())
    }

    async fn exists(&self, cert_path: &Path, name: Option<&str>) -> bool {
        let nickname = match self.nickname(cert_path, name) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = %e, "NSS lookup skipped");
                return false;
            }
        };
        let databases = match self.get_firefox_databases() {
            Ok(dbs) if !dbs.is_empty() => dbs,
            Ok(_) => return false,
            Err(e) => {
                tracing::warn!(error = %e, "NSS lookup skipped");
                return false;
            }
        };

        let args = format!("-V -n {} -u L", self.q(&nickname));
        let mut all_exist = true;
        for db in &databases {
            match self.toolbox.shell.run(&self.certutil_cmd(db, &args)).await {
                Ok(out) => tracing::debug!(db = %db, stdout = out.stdout.trim(), "certificate found"),
                Err(e) => {
                    tracing::debug!(db = %db, error = %e, "certificate missing");
                    all_exist = false;
                }
            }
        }
        all_exist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn database_display_carries_prefix() {
        assert_eq!(
            NssDatabase::Sql(PathBuf::from("/p/a")).to_string(),
            "sql:/p/a"
        );
        assert_eq!(
            NssDatabase::Dbm(PathBuf::from("/p/b")).to_string(),
            "dbm:/p/b"
        );
    }

    #[test]
    fn certutil_layout_per_platform_and_arch() {
        let tools = Path::new("/opt/nss");
        let cases = [
            (Platform::Windows, "x86_64", "win64/certutil.exe"),
            (Platform::Windows, "x86", "win32/certutil.exe"),
            (Platform::MacOs, "aarch64", "mac/certutil"),
            (Platform::Linux, "x86_64", "linux64/certutil"),
            (Platform::Linux, "x86", "linux32/certutil"),
        ];
        for (platform, arch, expected) in cases {
            let env = HostEnv::fabricated(platform, arch);
            assert_eq!(bundled_certutil(&env, tools).unwrap(), tools.join(expected));
        }
    }

    #[test]
    fn certutil_layout_rejects_other_arches() {
        let env = HostEnv::fabricated(Platform::Linux, "aarch64");
        let err = bundled_certutil(&env, Path::new("/opt/nss")).unwrap_err();
        assert!(matches!(err, TrustError::UnsupportedPlatform(_)));
    }

    #[test]
    fn profile_dir_per_platform() {
        let env = HostEnv::fabricated(Platform::Linux, "x86_64").with_home("/home/u");
        assert_eq!(
            default_profile_dir(&env),
            Some(PathBuf::from("/home/u/.mozilla/firefox"))
        );
        let env = HostEnv::fabricated(Platform::MacOs, "aarch64").with_home("/Users/u");
        assert_eq!(
            default_profile_dir(&env),
            Some(PathBuf::from(
                "/Users/u/Library/Application Support/Firefox/Profiles"
            ))
        );
        assert_eq!(
            default_profile_dir(&HostEnv::fabricated(Platform::Linux, "x86_64")),
            None
        );
    }
}
