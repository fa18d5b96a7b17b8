use std::{env, path::{Path, PathBuf}};

use crate::PROFILE_DIR_ENV;

/// Root of everything Courier persists locally: the config file, the
/// encrypted database, attachments. Overridable for tests and portable
/// profiles.
pub(crate) fn default_profile_dir() -> PathBuf {
    if let Ok(root) = env::var(PROFILE_DIR_ENV) {
        let path = PathBuf::from(root.trim());
        if !path.as_os_str().is_empty() {
            return path;
        }
    }
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Courier")
}

pub(crate) fn config_path(profile_dir: &Path) -> PathBuf {
    profile_dir.join("config.json")
}

pub(crate) fn db_path(profile_dir: &Path) -> PathBuf {
    profile_dir.join("sql").join("db.sqlite")
}

pub(crate) fn attachments_dir(profile_dir: &Path) -> PathBuf {
    profile_dir.join("attachments")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_layout_is_stable() {
        let profile = PathBuf::from("/tmp/profile");
        assert_eq!(config_path(&profile), PathBuf::from("/tmp/profile/config.json"));
        assert_eq!(db_path(&profile), PathBuf::from("/tmp/profile/sql/db.sqlite"));
        assert_eq!(
            attachments_dir(&profile),
            PathBuf::from("/tmp/profile/attachments")
        );
    }
}
