//! Credential resolution from PEM key material
//!
//! Encrypted forms carry their decryption key in a PEM file supplied by the
//! operator. [`resolve`] parses that file into a [`Credential`] or a typed
//! [`CredentialError`]. Credentials are never persisted; every export run
//! that needs one resolves it fresh from disk.
//!
//! A PEM file may hold several objects: a bare PKCS#8 or PKCS#1 private key,
//! or a key pair written as a private-key block alongside a certificate or
//! public-key block. The private half is extracted in either case; a file
//! containing only certificates or public keys yields
//! [`CredentialError::NoPrivateKey`].

use crate::domain::CredentialError;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use std::fmt;
use std::path::Path;

const TAG_PKCS8_PRIVATE: &str = "PRIVATE KEY";
const TAG_PKCS1_PRIVATE: &str = "RSA PRIVATE KEY";

/// A resolved private key, usable for decrypting a form's submissions
///
/// Opaque beyond that: callers hand it to the converter and drop it when the
/// run ends. The Debug impl never prints key material.
#[derive(Clone)]
pub struct Credential {
    key: RsaPrivateKey,
}

impl Credential {
    /// Borrow the underlying private key
    pub fn key(&self) -> &RsaPrivateKey {
        &self.key
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential").finish_non_exhaustive()
    }
}

/// Resolve a private key from a PEM file
///
/// # Errors
///
/// - [`CredentialError::FileMissing`] if `pem_path` does not exist
/// - [`CredentialError::ParseFailed`] if the file holds no parseable PEM
///   object
/// - [`CredentialError::NoPrivateKey`] if objects parse but none is (or
///   contains) a private key
pub fn resolve(pem_path: &Path) -> Result<Credential, CredentialError> {
    if !pem_path.exists() {
        return Err(CredentialError::FileMissing(pem_path.to_path_buf()));
    }

    let content = std::fs::read_to_string(pem_path)
        .map_err(|e| CredentialError::ParseFailed(e.to_string()))?;

    let blocks =
        pem::parse_many(&content).map_err(|e| CredentialError::ParseFailed(e.to_string()))?;
    if blocks.is_empty() {
        return Err(CredentialError::ParseFailed(
            "no PEM object found".to_string(),
        ));
    }

    for block in &blocks {
        let parsed = match block.tag() {
            TAG_PKCS8_PRIVATE => RsaPrivateKey::from_pkcs8_der(block.contents()).ok(),
            TAG_PKCS1_PRIVATE => RsaPrivateKey::from_pkcs1_der(block.contents()).ok(),
            // Certificates, public keys and anything else cannot yield a
            // private key; keep scanning the remaining blocks.
            _ => None,
        };
        if let Some(key) = parsed {
            tracing::debug!(path = %pem_path.display(), "Resolved private key from PEM file");
            return Ok(Credential { key });
        }
    }

    Err(CredentialError::NoPrivateKey)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve(&dir.path().join("absent.pem")).unwrap_err();
        assert!(matches!(err, CredentialError::FileMissing(_)));
    }

    #[test]
    fn test_unparseable_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.pem");
        std::fs::write(&path, "this is not pem content").unwrap();
        let err = resolve(&path).unwrap_err();
        assert!(matches!(err, CredentialError::ParseFailed(_)));
    }

    #[test]
    fn test_debug_hides_key_material() {
        // A deliberately tiny key keeps this test fast; real keys are 2048+.
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 512).unwrap();
        let credential = Credential { key };
        let rendered = format!("{credential:?}");
        assert_eq!(rendered, "Credential { .. }");
    }
}
