//! One-time maintenance after the store comes up. Everything here is
//! recoverable-local: failures are logged and startup continues.

use std::path::Path;

use crate::{runtime_paths, store_gateway::StoreHandle};

pub(crate) async fn run_post_init_maintenance(store: &StoreHandle, profile_dir: &Path) {
    match store.call("removeOrphanedAttachments", vec![]).await {
        Ok(removed) => log::info!("orphan cleanup removed {removed} attachment rows"),
        Err(error) => log::warn!("orphan cleanup failed: {error}"),
    }

    let attachments = runtime_paths::attachments_dir(profile_dir);
    if let Err(error) = std::fs::create_dir_all(&attachments) {
        log::warn!(
            "cannot create attachments directory {}: {error}",
            attachments.display()
        );
    }

    tighten_profile_permissions(profile_dir);
}

/// Best-effort sweep restricting the profile to the current user. The
/// database and key must never be group/world readable.
#[cfg(unix)]
fn tighten_profile_permissions(profile_dir: &Path) {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fn apply(path: &Path) {
        let metadata = match path.symlink_metadata() {
            Ok(metadata) => metadata,
            Err(error) => {
                log::warn!("permission sweep cannot stat {}: {error}", path.display());
                return;
            }
        };
        if metadata.file_type().is_symlink() {
            return;
        }
        let mode = if metadata.is_dir() { 0o700 } else { 0o600 };
        let mut permissions = metadata.permissions();
        permissions.set_mode(mode);
        if let Err(error) = fs::set_permissions(path, permissions) {
            log::warn!(
                "permission sweep failed for {}: {error}",
                path.display()
            );
        }
        if metadata.is_dir() {
            let entries = match fs::read_dir(path) {
                Ok(entries) => entries,
                Err(error) => {
                    log::warn!("permission sweep cannot list {}: {error}", path.display());
                    return;
                }
            };
            for entry in entries.flatten() {
                apply(&entry.path());
            }
        }
    }

    apply(profile_dir);
}

#[cfg(not(unix))]
fn tighten_profile_permissions(_profile_dir: &Path) {
    // File ACLs are inherited correctly from the per-user profile root on
    // Windows; nothing to sweep.
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    use super::tighten_profile_permissions;

    #[test]
    fn sweep_restricts_files_and_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("sql");
        fs::create_dir_all(&sub).unwrap();
        let file = sub.join("db.sqlite");
        fs::write(&file, b"x").unwrap();
        fs::set_permissions(&file, fs::Permissions::from_mode(0o644)).unwrap();

        tighten_profile_permissions(dir.path());

        let dir_mode = fs::metadata(&sub).unwrap().permissions().mode() & 0o777;
        let file_mode = fs::metadata(&file).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700);
        assert_eq!(file_mode, 0o600);
    }

    #[test]
    fn sweep_tolerates_a_missing_profile() {
        tighten_profile_permissions(std::path::Path::new("/nonexistent/courier-profile"));
    }
}
