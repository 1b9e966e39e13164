use crate::executable;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

/// How long the binary gets to self-report its version before the probe
/// gives up. A hung binary is indistinguishable from a broken one.
pub const PROBE_TIMEOUT: Duration = Duration::from_millis(15_000);

/// A version paired with the install directory it was discovered in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInstall {
    pub version: String,
    pub install_path: PathBuf,
}

/// Ask the binary under `install_dir` which version it is.
///
/// Every failure mode is absence: no directory, no executable, spawn failure,
/// timeout, non-zero exit, or empty output all come back as `None`.
pub async fn probe(install_dir: Option<&Path>) -> Option<LocalInstall> {
    let dir = install_dir?;
    let exe = executable::resolve(dir);

    if !exe.is_file() {
        tracing::debug!("No executable at {}", exe.display());
        return None;
    }

    executable::ensure_executable(&exe);

    let output = Command::new(&exe)
        .arg("--version")
        .stdin(std::process::Stdio::null())
        .kill_on_drop(true)
        .output();

    let output = match timeout(PROBE_TIMEOUT, output).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            tracing::warn!("Failed to run {}: {}", exe.display(), e);
            return None;
        }
        Err(_) => {
            tracing::warn!(
                "{} did not report a version within {}s",
                exe.display(),
                PROBE_TIMEOUT.as_secs()
            );
            return None;
        }
    };

    if !output.status.success() {
        tracing::warn!("{} --version exited with {}", exe.display(), output.status);
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let version = stdout.lines().next().unwrap_or("").trim().to_string();
    if version.is_empty() {
        tracing::warn!("{} --version produced no output", exe.display());
        return None;
    }

    Some(LocalInstall {
        version,
        install_path: dir.to_path_buf(),
    })
}
