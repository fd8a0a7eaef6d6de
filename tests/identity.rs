//! Issuer common name extraction from PEM files.

mod common;

use trust_cert::fs::HostFs;
use trust_cert::identity::{issuer_common_name, read_common_name};
use trust_cert::TrustError;

#[test]
fn reads_issuer_cn_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("root.crt");
    std::fs::write(&path, common::root_ca_pem("Test Root CA")).unwrap();
    assert_eq!(read_common_name(&HostFs, &path).unwrap(), "Test Root CA");
}

#[test]
fn first_certificate_in_bundle_wins() {
    let bundle = format!(
        "{}{}",
        common::root_ca_pem("First CA"),
        common::root_ca_pem("Second CA")
    );
    assert_eq!(
        issuer_common_name(bundle.as_bytes()).unwrap().as_deref(),
        Some("First CA")
    );
}

#[test]
fn missing_file_is_cert_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = read_common_name(&HostFs, &dir.path().join("nope.crt")).unwrap_err();
    assert!(matches!(err, TrustError::CertNotFound(_)));
}

#[test]
fn non_pem_file_is_identity_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("root.crt");
    std::fs::write(&path, "hello").unwrap();
    let err = read_common_name(&HostFs, &path).unwrap_err();
    assert!(matches!(err, TrustError::IdentityExtraction { .. }));
}

#[cfg(unix)]
#[test]
fn symlinked_certificate_is_read_through_the_link() {
    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("store-copy.pem");
    std::fs::write(&real, common::root_ca_pem("Test Root CA")).unwrap();
    let link = dir.path().join("root.crt");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    assert_eq!(read_common_name(&HostFs, &link).unwrap(), "Test Root CA");
}

#[cfg(unix)]
#[tokio::test]
async fn install_accepts_symlinked_certificate() {
    use std::sync::Arc;
    use trust_cert::platform::{MacOsTrust, Toolbox};
    use trust_cert::TrustStore;

    let dir = tempfile::tempdir().unwrap();
    let real = dir.path().join("store-copy.pem");
    std::fs::write(&real, common::root_ca_pem("Test Root CA")).unwrap();
    let link = dir.path().join("root.crt");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let elevated = common::ScriptedRunner::succeeding();
    let store = MacOsTrust::new(Toolbox {
        fs: Arc::new(HostFs),
        shell: common::ScriptedRunner::succeeding(),
        elevated: elevated.clone(),
    });
    store.install(&link, None).await.unwrap();
    assert_eq!(elevated.calls().len(), 1);
    assert!(elevated.calls()[0].ends_with(&*link.to_string_lossy()));
}
