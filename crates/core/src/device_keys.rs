//! Device ingest key generation and hashing.
//!
//! Every device authenticates its telemetry with a per-device API key.
//! Only the SHA-256 hash is stored; the plaintext exists exactly once, in
//! the registration response.

use rand::Rng;

/// Length of the generated key string (alphanumeric characters).
pub const KEY_LENGTH: usize = 48;

/// The result of generating a new device key.
pub struct GeneratedDeviceKey {
    /// The plaintext key (returned to the installer once, never stored).
    pub plaintext: String,
    /// The SHA-256 hex digest of the plaintext (stored in the database).
    pub hash: String,
}

/// Generate a new random device key.
pub fn generate_device_key() -> GeneratedDeviceKey {
    let key: String = rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(KEY_LENGTH)
        .map(char::from)
        .collect();

    let hash = hash_device_key(&key);

    GeneratedDeviceKey {
        plaintext: key,
        hash,
    }
}

/// Compute the stored form of a device key.
///
/// Used both during registration (to store the hash) and during ingest
/// authentication (to look the device up by hash).
pub fn hash_device_key(key: &str) -> String {
    crate::hashing::sha256_hex(key.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_matches_its_hash() {
        let generated = generate_device_key();
        assert_eq!(generated.plaintext.len(), KEY_LENGTH);
        assert_eq!(hash_device_key(&generated.plaintext), generated.hash);
    }

    #[test]
    fn keys_are_unique() {
        let a = generate_device_key();
        let b = generate_device_key();
        assert_ne!(a.plaintext, b.plaintext);
    }
}
