use std::fs;
use std::io::BufReader;
use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use thiserror::Error;
use tokio_rustls::TlsAcceptor;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {what} from '{path}': {source}")]
    Read {
        what: &'static str,
        path: String,
        source: std::io::Error,
    },
    #[error("no PEM certificates in '{0}'")]
    NoCertificates(String),
    #[error("no PEM private key in '{0}'")]
    NoPrivateKey(String),
    #[error("invalid serving certificate: {0}")]
    Config(#[from] rustls::Error),
}

fn read_pem(what: &'static str, path: &str) -> Result<Vec<u8>, TlsError> {
    fs::read(path).map_err(|source| TlsError::Read {
        what,
        path: path.to_string(),
        source,
    })
}

fn certificates(path: &str) -> Result<Vec<CertificateDer<'static>>, TlsError> {
    let pem = read_pem("certificate", path)?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(pem.as_slice()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TlsError::Read {
            what: "certificate",
            path: path.to_string(),
            source,
        })?;

    if certs.is_empty() {
        return Err(TlsError::NoCertificates(path.to_string()));
    }
    Ok(certs)
}

fn private_key(path: &str) -> Result<PrivateKeyDer<'static>, TlsError> {
    let pem = read_pem("private key", path)?;
    rustls_pemfile::private_key(&mut BufReader::new(pem.as_slice()))
        .map_err(|source| TlsError::Read {
            what: "private key",
            path: path.to_string(),
            source,
        })?
        .ok_or_else(|| TlsError::NoPrivateKey(path.to_string()))
}

pub fn acceptor(cert_path: &str, key_path: &str) -> Result<TlsAcceptor, TlsError> {
    let config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certificates(cert_path)?, private_key(key_path)?)?;

    Ok(TlsAcceptor::from(Arc::new(config)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_certificate_file_is_reported() {
        let err = acceptor("/nonexistent/tls.crt", "/nonexistent/tls.key")
            .err()
            .unwrap();
        assert!(matches!(err, TlsError::Read { what: "certificate", .. }));
        assert!(err.to_string().contains("/nonexistent/tls.crt"));
    }

    #[test]
    fn file_without_pem_blocks_has_no_certificates() {
        let path = std::env::temp_dir().join(format!("chaos-admission-{}.crt", std::process::id()));
        fs::write(&path, "not a certificate\n").unwrap();

        let err = certificates(path.to_str().unwrap()).err().unwrap();
        assert!(matches!(err, TlsError::NoCertificates(_)));

        fs::remove_file(path).unwrap();
    }
}
