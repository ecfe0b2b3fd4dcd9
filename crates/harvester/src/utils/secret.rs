use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use sha2::{Digest, Sha256};

/// How a source's credential is stored (§9 Design Note: modeled as a
/// tagged variant rather than two optional fields so the resolver cannot
/// be asked to reconcile both at once).
#[derive(Debug, Clone)]
pub enum SecretLocation {
    /// Path to a file on disk holding the plaintext credential.
    FileRef(std::path::PathBuf),
    /// Raw stored bytes: either an authenticated ciphertext produced with
    /// the process secret, or plaintext if no process secret is configured.
    Ciphertext(Vec<u8>),
    None,
}

/// Resolves a source's credential (§4.1). A file reference is read and
/// trimmed. Ciphertext is decrypted with a key derived from `SECRET_KEY`
/// (SHA-256 digest used directly as the AES-256 key); on authentication
/// failure, or when no process secret is configured, the stored bytes are
/// interpreted as UTF-8 plaintext. If both interpretations fail, returns
/// `None` — the caller proceeds with anonymous auth (§4.4.5).
#[must_use]
pub fn resolve_secret(location: &SecretLocation, secret_key: Option<&str>) -> Option<String> {
    match location {
        SecretLocation::FileRef(path) => match std::fs::read_to_string(path) {
            Ok(contents) => Some(contents.trim().to_string()),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unable to read secret_ref");
                None
            }
        },
        SecretLocation::Ciphertext(blob) => decrypt_ciphertext(blob, secret_key),
        SecretLocation::None => None,
    }
}

/// Ciphertext layout: a 12-byte GCM nonce followed by the AEAD output
/// (ciphertext + 16-byte tag).
fn decrypt_ciphertext(blob: &[u8], secret_key: Option<&str>) -> Option<String> {
    if blob.is_empty() {
        return None;
    }
    let Some(secret_key) = secret_key else {
        return plaintext_fallback(blob);
    };
    if blob.len() < 12 {
        return plaintext_fallback(blob);
    }
    let digest = Sha256::digest(secret_key.as_bytes());
    let key = Key::<Aes256Gcm>::from_slice(&digest);
    let cipher = Aes256Gcm::new(key);
    let (nonce_bytes, ciphertext) = blob.split_at(12);
    match cipher.decrypt(Nonce::from_slice(nonce_bytes), ciphertext) {
        Ok(plain) => String::from_utf8(plain).ok(),
        Err(_) => plaintext_fallback(blob),
    }
}

fn plaintext_fallback(blob: &[u8]) -> Option<String> {
    std::str::from_utf8(blob).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encrypt(secret_key: &str, plaintext: &[u8], nonce_bytes: [u8; 12]) -> Vec<u8> {
        let digest = Sha256::digest(secret_key.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        let cipher = Aes256Gcm::new(key);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher.encrypt(nonce, plaintext).unwrap();
        [nonce_bytes.to_vec(), ciphertext].concat()
    }

    #[test]
    fn decrypts_roundtrip_ciphertext() {
        let blob = encrypt("shared-process-secret", b"hunter2", [7u8; 12]);
        let resolved = resolve_secret(&SecretLocation::Ciphertext(blob), Some("shared-process-secret"));
        assert_eq!(resolved.as_deref(), Some("hunter2"));
    }

    #[test]
    fn falls_back_to_plaintext_on_wrong_key() {
        let blob = encrypt("correct-secret", b"hunter2", [3u8; 12]);
        let resolved = resolve_secret(&SecretLocation::Ciphertext(blob.clone()), Some("wrong-secret"));
        assert_eq!(resolved, plaintext_fallback(&blob));
    }

    #[test]
    fn falls_back_to_plaintext_when_no_process_secret() {
        let resolved = resolve_secret(&SecretLocation::Ciphertext(b"plain-value".to_vec()), None);
        assert_eq!(resolved.as_deref(), Some("plain-value"));
    }

    #[test]
    fn none_location_resolves_to_none() {
        assert!(resolve_secret(&SecretLocation::None, Some("k")).is_none());
    }

    #[test]
    fn missing_file_ref_resolves_to_none() {
        let location = SecretLocation::FileRef("/nonexistent/path/secret".into());
        assert!(resolve_secret(&location, None).is_none());
    }
}
