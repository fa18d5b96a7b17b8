//! Local JSON config stored outside the encrypted store: the encryption
//! key (it unlocks the store, so it cannot live inside it), main-window
//! geometry, and fast-path cached settings needed before the store is
//! ready. Unknown fields are preserved across writes.

use std::{fs, io, path::Path};

use serde_json::{Map, Value};

use crate::window_config::WindowConfig;

pub(crate) const KEY_FIELD: &str = "key";
pub(crate) const WINDOW_FIELD: &str = "window";
pub(crate) const THEME_FIELD: &str = "theme";
pub(crate) const SPELLCHECK_FIELD: &str = "spellcheck";

fn empty_config_object() -> Value {
    Value::Object(Map::new())
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = empty_config_object();
    }
    value
        .as_object_mut()
        .expect("value was just normalized into a JSON object")
}

fn read_config_value(config_path: &Path) -> Result<Value, String> {
    match fs::read_to_string(config_path) {
        Ok(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(value) if value.is_object() => Ok(value),
            Ok(_) => {
                log::warn!(
                    "config {} has non-object root; resetting",
                    config_path.display()
                );
                Ok(empty_config_object())
            }
            Err(error) => {
                log::warn!(
                    "failed to parse config {}: {error}; resetting",
                    config_path.display()
                );
                Ok(empty_config_object())
            }
        },
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(empty_config_object()),
        Err(error) => Err(format!(
            "Failed to read config {}: {error}",
            config_path.display()
        )),
    }
}

fn write_config_value(config_path: &Path, value: &Value) -> Result<(), String> {
    if let Some(parent_dir) = config_path.parent() {
        fs::create_dir_all(parent_dir).map_err(|error| {
            format!(
                "Failed to create config directory {}: {error}",
                parent_dir.display()
            )
        })?;
    }
    let serialized = serde_json::to_string_pretty(value)
        .map_err(|error| format!("Failed to serialize config: {error}"))?;
    fs::write(config_path, serialized).map_err(|error| {
        format!(
            "Failed to write config {}: {error}",
            config_path.display()
        )
    })
}

/// Read-modify-write preserving fields this build does not know about.
pub(crate) fn update_config<F>(config_path: &Path, apply: F) -> Result<(), String>
where
    F: FnOnce(&mut Map<String, Value>),
{
    let mut parsed = read_config_value(config_path)?;
    apply(ensure_object(&mut parsed));
    write_config_value(config_path, &parsed)
}

pub(crate) fn get_string(config_path: &Path, field: &str) -> Result<Option<String>, String> {
    let parsed = read_config_value(config_path)?;
    Ok(parsed
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string))
}

pub(crate) fn get_bool(config_path: &Path, field: &str) -> Result<Option<bool>, String> {
    let parsed = read_config_value(config_path)?;
    Ok(parsed.get(field).and_then(Value::as_bool))
}

pub(crate) fn set_string(config_path: &Path, field: &str, value: &str) -> Result<(), String> {
    update_config(config_path, |object| {
        object.insert(field.to_string(), Value::String(value.to_string()));
    })
}

pub(crate) fn remove_field(config_path: &Path, field: &str) -> Result<(), String> {
    update_config(config_path, |object| {
        object.remove(field);
    })
}

pub(crate) fn get_window_config(config_path: &Path) -> Option<WindowConfig> {
    let parsed = read_config_value(config_path).ok()?;
    let raw = parsed.get(WINDOW_FIELD)?.clone();
    serde_json::from_value(raw).ok()
}

pub(crate) fn set_window_config(
    config_path: &Path,
    window: &WindowConfig,
) -> Result<(), String> {
    let raw = serde_json::to_value(window)
        .map_err(|error| format!("Failed to serialize window config: {error}"))?;
    update_config(config_path, |object| {
        object.insert(WINDOW_FIELD.to_string(), raw);
    })
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
    fn missing_file_reads_as_empty_and_round_trips() {
        let (_dir, path) = temp_config();
        assert_eq!(get_string(&path, THEME_FIELD).unwrap(), None);

        set_string(&path, THEME_FIELD, "dark").unwrap();
        assert_eq!(
            get_string(&path, THEME_FIELD).unwrap(),
            Some("dark".to_string())
        );
    }

    #[test]
    fn updates_preserve_unknown_fields() {
        let (_dir, path) = temp_config();
        std::fs::write(&path, r#"{"futureFlag": true, "theme": "light"}"#).unwrap();

        set_string(&path, SPELLCHECK_FIELD, "on").unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["futureFlag"], Value::Bool(true));
        assert_eq!(parsed["theme"], "light");
        assert_eq!(parsed["spellcheck"], "on");
    }

    #[test]
    fn corrupt_config_resets_instead_of_failing() {
        let (_dir, path) = temp_config();
        std::fs::write(&path, "not json at all {{{").unwrap();

        set_string(&path, THEME_FIELD, "system").unwrap();
        assert_eq!(
            get_string(&path, THEME_FIELD).unwrap(),
            Some("system".to_string())
        );
    }

    #[test]
    fn window_config_round_trips() {
        let (_dir, path) = temp_config();
        let window = WindowConfig {
            x: Some(40),
            y: Some(60),
            width: 900,
            height: 700,
            maximized: false,
            fullscreen: false,
        };
        set_window_config(&path, &window).unwrap();
        assert_eq!(get_window_config(&path), Some(window));
    }
}
