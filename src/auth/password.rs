use rand::RngCore;
use sha2::{Digest, Sha256};

/// Hash a password with a fresh random salt. Stored form: `salt$digest`,
/// both hex encoded.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt_hex = hex(&salt);
    format!("{}${}", salt_hex, digest(&salt_hex, password))
}

/// Verify a password against the stored `salt$digest` form.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match stored.split_once('$') {
        Some((salt_hex, expected)) => digest(salt_hex, password) == expected,
        None => false,
    }
}

fn digest(salt_hex: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    hex(&hasher.finalize())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_own_hash() {
        let stored = hash_password("hunter2");
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_stored_value_never_verifies() {
        assert!(!verify_password("anything", "not-a-valid-hash"));
    }
}
