//! Provisioning of the store encryption key: 32 random bytes, hex-encoded,
//! persisted in the local config (it cannot live inside the store it
//! unlocks). Created once, never rotated automatically.

use std::path::Path;

use rand::{rngs::OsRng, RngCore};

use crate::user_config;

pub(crate) const KEY_HEX_LEN: usize = 64;

fn is_valid_key(raw: &str) -> bool {
    raw.len() == KEY_HEX_LEN && raw.bytes().all(|byte| byte.is_ascii_hexdigit())
}

fn generate_key() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Returns the persisted key, generating and persisting a fresh one on
/// first run. Config I/O failure is fatal to the caller: the store cannot
/// be opened without a key.
pub(crate) fn get_or_create_key(config_path: &Path) -> Result<String, String> {
    if let Some(existing) = user_config::get_string(config_path, user_config::KEY_FIELD)? {
        if is_valid_key(&existing) {
            return Ok(existing);
        }
        log::warn!("persisted encryption key is malformed; generating a new one");
    }

    let key = generate_key();
    user_config::set_string(config_path, user_config::KEY_FIELD, &key)?;
    Ok(key)
}

pub(crate) fn delete_key(config_path: &Path) -> Result<(), String> {
    user_config::remove_field(config_path, user_config::KEY_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        (dir, path)
    }

    #[test]
    fn provisioning_is_idempotent() {
        let (_dir, path) = temp_config();
        let first = get_or_create_key(&path).unwrap();
        let second = get_or_create_key(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn generated_key_is_64_lowercase_hex_chars() {
        let (_dir, path) = temp_config();
        let key = get_or_create_key(&path).unwrap();
        assert_eq!(key.len(), KEY_HEX_LEN);
        assert!(key.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(key, key.to_ascii_lowercase());
    }

    #[test]
    fn deleting_the_key_yields_a_fresh_one() {
        let (_dir, path) = temp_config();
        let first = get_or_create_key(&path).unwrap();
        delete_key(&path).unwrap();
        let second = get_or_create_key(&path).unwrap();
        assert_ne!(first, second);
        assert_eq!(second.len(), KEY_HEX_LEN);
    }

    #[test]
    fn malformed_persisted_key_is_replaced() {
        let (_dir, path) = temp_config();
        user_config::set_string(&path, user_config::KEY_FIELD, "not-a-key").unwrap();
        let key = get_or_create_key(&path).unwrap();
        assert!(is_valid_key(&key));
    }
}
