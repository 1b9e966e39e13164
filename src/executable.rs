use std::path::{Path, PathBuf};

pub const PACKAGE_NAME: &str = "azure-functions-core-tools";

pub fn platform_executable_name() -> &'static str {
    if cfg!(windows) {
        "func.exe"
    } else {
        "func"
    }
}

/// Chocolatey and npm leave a trampoline executable at the configured path
/// while the real binary lives in their own tree. Rewrite the install
/// directory to the real location when one of those layouts is present.
pub fn rewrite_package_manager_shim(install_dir: &Path) -> PathBuf {
    let Some(parent) = install_dir.parent() else {
        return install_dir.to_path_buf();
    };

    let chocolatey = parent.join("lib").join(PACKAGE_NAME).join("tools");
    if chocolatey.is_dir() {
        tracing::debug!("Using Chocolatey layout at {}", chocolatey.display());
        return chocolatey;
    }

    let npm = parent.join("node_modules").join(PACKAGE_NAME).join("bin");
    if npm.is_dir() {
        tracing::debug!("Using npm layout at {}", npm.display());
        return npm;
    }

    install_dir.to_path_buf()
}

/// Map an install directory to the executable that would be launched from it.
/// Existence is not checked here; callers that spawn the binary do that.
pub fn resolve(install_dir: &Path) -> PathBuf {
    let effective = if cfg!(windows) {
        rewrite_package_manager_shim(install_dir)
    } else {
        install_dir.to_path_buf()
    };
    effective.join(platform_executable_name())
}

/// Make sure the file carries the executable bit, setting it if missing.
/// A denial is logged and swallowed; launching will fail on its own if the
/// file truly cannot run.
pub fn ensure_executable(path: &Path) {
    #[cfg(unix)]
    {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;

        let meta = match fs::metadata(path) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!("Could not stat {}: {}", path.display(), e);
                return;
            }
        };

        let mut perms = meta.permissions();
        if perms.mode() & 0o111 != 0 {
            return;
        }

        perms.set_mode(perms.mode() | 0o755);
        if let Err(e) = fs::set_permissions(path, perms) {
            tracing::warn!("Could not mark {} executable: {}", path.display(), e);
        }
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }
}
