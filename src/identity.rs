//! Certificate identity: the issuer common name used by stores that address
//! entries by name.

use std::path::Path;

use x509_parser::prelude::{FromDer, X509Certificate};

use crate::error::{Result, TrustError};
use crate::fs::Filesystem;

/// Extract the issuer Common Name from the first certificate in a PEM buffer.
///
/// Returns `Ok(None)` when the certificate parses but carries no issuer CN.
pub fn issuer_common_name(pem_bytes: &[u8]) -> std::result::Result<Option<String>, String> {
    let der = rustls_pemfile::certs(&mut &pem_bytes[..])
        .next()
        .ok_or_else(|| "no PEM certificate block".to_string())?
        .map_err(|e| format!("read PEM: {e}"))?;
    let (_, x509) =
        X509Certificate::from_der(der.as_ref()).map_err(|e| format!("parse X.509: {e:?}"))?;
    let cn = x509
        .issuer()
        .iter_common_name()
        .next()
        .and_then(|c| c.as_str().ok())
        .map(String::from);
    Ok(cn)
}

/// Read `cert_path` through `fs` and return its issuer Common Name.
pub fn read_common_name(fs: &dyn Filesystem, cert_path: &Path) -> Result<String> {
    if !fs.is_readable_file(cert_path) {
        return Err(TrustError::CertNotFound(cert_path.to_path_buf()));
    }
    let pem = fs
        .read(cert_path)
        .map_err(|_| TrustError::CertNotFound(cert_path.to_path_buf()))?;
    match issuer_common_name(&pem) {
        Ok(Some(cn)) => Ok(cn),
        Ok(None) => Err(TrustError::IdentityExtraction {
            path: cert_path.to_path_buf(),
            reason: "certificate has no issuer Common Name".to_string(),
        }),
        Err(reason) => Err(TrustError::IdentityExtraction {
            path: cert_path.to_path_buf(),
            reason,
        }),
    }
}
