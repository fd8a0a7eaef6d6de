//! Backend resolution by target name.

mod common;

use std::path::PathBuf;

use common::{MemoryFs, ScriptedRunner};
use trust_cert::config::Settings;
use trust_cert::platform::{resolve_with, HostEnv, Platform, Target};
use trust_cert::trust::resolve_backend_with_settings;
use trust_cert::TrustError;

fn settings() -> Settings {
    Settings {
        nss_tools_dir: Some(PathBuf::from("/opt/nss")),
        ..Default::default()
    }
}

#[test]
fn each_target_yields_its_store() {
    let fs = MemoryFs::new();
    let runner = ScriptedRunner::succeeding();
    let env = HostEnv::fabricated(Platform::Linux, "x86_64").with_home("/home/dev");

    for (target, name) in [
        (Target::Darwin, "MacOs"),
        (Target::Win32, "Windows"),
        (Target::Linux, "Linux"),
        (Target::Nss, "Nss"),
    ] {
        let toolbox = common::toolbox(&fs, &runner, &runner);
        let store = match resolve_with(target, &env, toolbox, &settings()) {
            Ok(s) => s,
            Err(e) => panic!("{target}: {e}"),
        };
        assert_eq!(store.name(), name);
    }
    assert!(runner.calls().is_empty());
}

#[test]
fn unknown_target_is_unsupported() {
    match resolve_backend_with_settings(Some("solaris"), None, &settings()) {
        Err(TrustError::UnsupportedPlatform(msg)) => assert!(msg.contains("solaris")),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(store) => panic!("resolved {}", store.name()),
    }
}

#[test]
fn nss_on_unsupported_arch_fails_construction() {
    let fs = MemoryFs::new();
    let runner = ScriptedRunner::succeeding();
    let env = HostEnv::fabricated(Platform::Windows, "aarch64").with_home(r"C:\Users\dev");
    let result = resolve_with(
        Target::Nss,
        &env,
        common::toolbox(&fs, &runner, &runner),
        &settings(),
    );
    assert!(matches!(result, Err(TrustError::UnsupportedPlatform(_))));
}

#[test]
fn explicit_certutil_bypasses_arch_layout() {
    let fs = MemoryFs::new();
    let runner = ScriptedRunner::succeeding();
    let env = HostEnv::fabricated(Platform::Linux, "aarch64").with_home("/home/dev");
    let settings = Settings {
        certutil: Some(PathBuf::from("/usr/bin/certutil")),
        ..Default::default()
    };
    let result = resolve_with(
        Target::Nss,
        &env,
        common::toolbox(&fs, &runner, &runner),
        &settings,
    );
    assert!(result.is_ok());
}
