use crate::download::{self, DownloadStatus};
use crate::executable;
use crate::feed::{ReleaseFeed, RemoteAsset};
use crate::locate;
use crate::probe::{self, LocalInstall};
use crate::progress::UpdateProgress;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Mutex;

/// Terminal result of one update run. Exactly one per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The local install already matches the newest remote release.
    UpToDate { install_path: PathBuf },
    /// A new version was downloaded and swapped in.
    Installed {
        install_path: PathBuf,
        version: String,
    },
    /// The feed could not be resolved; the existing install, if any, stays
    /// usable and untouched.
    RemoteUnavailable { install_path: Option<PathBuf> },
    /// Cancelled during download. The install root was not touched.
    Cancelled,
    /// The run aborted before the swap could begin.
    Failed { reason: String },
}

impl UpdateOutcome {
    /// The install a consumer can launch after this run, when one exists.
    pub fn install_path(&self) -> Option<&Path> {
        match self {
            UpdateOutcome::UpToDate { install_path }
            | UpdateOutcome::Installed { install_path, .. } => Some(install_path),
            UpdateOutcome::RemoteUnavailable { install_path } => install_path.as_deref(),
            UpdateOutcome::Cancelled | UpdateOutcome::Failed { .. } => None,
        }
    }
}

pub struct Updater {
    feed: ReleaseFeed,
    root_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl Updater {
    pub fn new(feed: ReleaseFeed) -> Self {
        Self {
            feed,
            root_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Bring `root` up to the newest release the feed offers.
    ///
    /// Runs on one root at a time: overlapping calls against the same root
    /// queue behind each other instead of racing over the directory tree.
    pub async fn update(
        &self,
        root: &Path,
        allow_prerelease: bool,
        progress: &UpdateProgress,
    ) -> UpdateOutcome {
        let lock = self.root_lock(root).await;
        let _guard = lock.lock().await;

        let local = probe::probe(locate::latest_path(root).as_deref()).await;
        if let Some(local) = &local {
            tracing::info!(
                "Found Core Tools {} at {}",
                local.version,
                local.install_path.display()
            );
        }

        let Some(remote) = self.feed.resolve_latest(allow_prerelease).await else {
            tracing::error!("Could not determine the latest release; keeping the current install");
            return UpdateOutcome::RemoteUnavailable {
                install_path: local.map(|l| l.install_path),
            };
        };

        if let Some(local) = &local {
            if local.version == remote.version {
                tracing::info!("Core Tools {} is already current", local.version);
                return UpdateOutcome::UpToDate {
                    install_path: local.install_path.clone(),
                };
            }
        }

        // The download lands outside the root, so cancelling here leaves the
        // install tree exactly as it was.
        let download_dir = match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => {
                return UpdateOutcome::Failed {
                    reason: format!("could not create a download directory: {}", e),
                }
            }
        };
        let archive_path = download_dir.path().join(&remote.file_name);

        match download::download_file(
            self.feed.client(),
            &remote.download_url,
            &archive_path,
            progress,
        )
        .await
        {
            Ok(DownloadStatus::Completed) => {}
            Ok(DownloadStatus::Cancelled) => {
                tracing::info!("Update cancelled; install root untouched");
                return UpdateOutcome::Cancelled;
            }
            Err(e) => {
                tracing::error!("Download of {} failed: {:#}", remote.download_url, e);
                return UpdateOutcome::Failed {
                    reason: format!("download failed: {}", e),
                };
            }
        }

        // Cancellation is not honored past this point: a half-written install
        // root is worse than finishing the swap.
        let swapped = swap_in(root, &archive_path, &remote, local.as_ref());

        if let Err(e) = download_dir.close() {
            tracing::warn!("Could not remove temporary download: {}", e);
        }

        match swapped {
            Ok(install_path) => {
                tracing::info!(
                    "Core Tools {} installed at {}",
                    remote.version,
                    install_path.display()
                );
                UpdateOutcome::Installed {
                    install_path,
                    version: remote.version,
                }
            }
            Err(reason) => UpdateOutcome::Failed { reason },
        }
    }

    async fn root_lock(&self, root: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.root_locks.lock().await;
        locks.entry(root.to_path_buf()).or_default().clone()
    }
}

/// Extract into a staging directory inside the root, then swap it into
/// `root/<version>` with a single rename and drop the previous version.
///
/// Individual steps log their failures and the swap carries on; the staged
/// rename means the worst case is a stale-but-complete old install, never a
/// half-written new one.
fn swap_in(
    root: &Path,
    archive_path: &Path,
    remote: &RemoteAsset,
    previous: Option<&LocalInstall>,
) -> Result<PathBuf, String> {
    if let Err(e) = fs::create_dir_all(root) {
        return Err(format!(
            "could not create install root {}: {}",
            root.display(),
            e
        ));
    }
    // Staging inside the root keeps the rename on one filesystem. Its name
    // never parses as a version, so it stays invisible to lookups.
    let staging = match TempDir::new_in(root) {
        Ok(dir) => dir,
        Err(e) => {
            return Err(format!(
                "could not create a staging directory in {}: {}",
                root.display(),
                e
            ))
        }
    };

    if let Err(e) = download::extract_zip(archive_path, staging.path()) {
        tracing::error!("Extraction of {} failed: {:#}", archive_path.display(), e);
    }
    executable::ensure_executable(&staging.path().join(executable::platform_executable_name()));

    let target = root.join(&remote.version);
    if target.exists() {
        tracing::debug!("Rebuilding existing {}", target.display());
        if let Err(e) = fs::remove_dir_all(&target) {
            tracing::error!("Could not remove stale {}: {}", target.display(), e);
        }
    }
    if let Err(e) = fs::rename(staging.path(), &target) {
        tracing::error!(
            "Could not move the new version into {}: {}",
            target.display(),
            e
        );
    }

    if let Some(previous) = previous {
        if previous.install_path != target {
            if let Err(e) = fs::remove_dir_all(&previous.install_path) {
                tracing::error!(
                    "Could not remove previous version {}: {}",
                    previous.install_path.display(),
                    e
                );
            }
        }
    }

    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::write_zip;
    use crate::platform::Platform;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn zip_bytes(version: &str) -> Vec<u8> {
        let dir = tempdir().expect("temp dir");
        let archive = dir.path().join("fixture.zip");
        let script = format!("#!/bin/sh\necho {}\n", version);
        write_zip(
            &archive,
            &[
                (executable::platform_executable_name(), script.as_str()),
                ("templates/itemTemplates.json", "{}"),
            ],
        );
        fs::read(&archive).expect("fixture bytes")
    }

    async fn mount_release(server: &MockServer, version: &str, expected_downloads: u64) {
        let asset_name = format!("Azure.Functions.Cli.linux-x64.{}.zip", version);
        Mock::given(method("GET"))
            .and(path("/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "tag_name": format!("v{}", version),
                "prerelease": false,
                "assets": [{
                    "name": asset_name.clone(),
                    "browser_download_url": format!("{}/download/{}", server.uri(), asset_name),
                }]
            }])))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/download/{}", asset_name)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes(version)))
            .expect(expected_downloads)
            .mount(server)
            .await;
    }

    fn updater_for(server: &MockServer) -> Updater {
        Updater::new(ReleaseFeed::new(
            format!("{}/releases", server.uri()),
            Platform::LinuxX64,
        ))
    }

    #[cfg(unix)]
    fn seed_local_version(root: &Path, version: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = root.join(version);
        fs::create_dir_all(&dir).unwrap();
        let exe = dir.join("func");
        fs::write(&exe, format!("#!/bin/sh\necho {}\n", version)).unwrap();
        let mut perms = fs::metadata(&exe).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&exe, perms).unwrap();
        dir
    }

    fn root_entries(root: &Path) -> Vec<String> {
        let mut entries: Vec<String> = fs::read_dir(root)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        entries.sort();
        entries
    }

    #[tokio::test]
    async fn test_fresh_install_populates_root() {
        let server = MockServer::start().await;
        mount_release(&server, "4.0.100", 1).await;
        let holder = tempdir().expect("temp dir");
        let root = holder.path().join("cli");

        let updater = updater_for(&server);
        let outcome = updater
            .update(&root, false, &UpdateProgress::hidden())
            .await;

        assert_eq!(
            outcome,
            UpdateOutcome::Installed {
                install_path: root.join("4.0.100"),
                version: "4.0.100".to_string(),
            }
        );
        assert_eq!(root_entries(&root), ["4.0.100"]);
        assert!(root
            .join("4.0.100")
            .join(executable::platform_executable_name())
            .is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_matching_version_downloads_nothing() {
        let server = MockServer::start().await;
        mount_release(&server, "3.0.2222", 0).await;
        let holder = tempdir().expect("temp dir");
        let root = holder.path().join("cli");
        let existing = seed_local_version(&root, "3.0.2222");

        let updater = updater_for(&server);
        for _ in 0..2 {
            let outcome = updater
                .update(&root, false, &UpdateProgress::hidden())
                .await;
            assert_eq!(
                outcome,
                UpdateOutcome::UpToDate {
                    install_path: existing.clone(),
                }
            );
        }
        assert_eq!(root_entries(&root), ["3.0.2222"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_swap_removes_previous_version() {
        let server = MockServer::start().await;
        mount_release(&server, "4.0.100", 1).await;
        let holder = tempdir().expect("temp dir");
        let root = holder.path().join("cli");
        seed_local_version(&root, "3.0.2222");

        let updater = updater_for(&server);
        let outcome = updater
            .update(&root, false, &UpdateProgress::hidden())
            .await;

        assert_eq!(
            outcome.install_path(),
            Some(root.join("4.0.100").as_path())
        );
        assert_eq!(root_entries(&root), ["4.0.100"]);
    }

    #[tokio::test]
    async fn test_existing_target_is_rebuilt() {
        let server = MockServer::start().await;
        mount_release(&server, "4.0.100", 1).await;
        let holder = tempdir().expect("temp dir");
        let root = holder.path().join("cli");

        // A half-written directory from an interrupted run: right name, no
        // executable, so the probe reports nothing usable.
        let stale = root.join("4.0.100");
        fs::create_dir_all(&stale).unwrap();
        fs::write(stale.join("leftover.partial"), "junk").unwrap();

        let updater = updater_for(&server);
        let outcome = updater
            .update(&root, false, &UpdateProgress::hidden())
            .await;

        assert_eq!(
            outcome.install_path(),
            Some(root.join("4.0.100").as_path())
        );
        assert!(!stale.join("leftover.partial").exists());
        assert!(stale
            .join(executable::platform_executable_name())
            .is_file());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_feed_failure_keeps_existing_install() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let holder = tempdir().expect("temp dir");
        let root = holder.path().join("cli");
        let existing = seed_local_version(&root, "3.0.2222");

        let updater = updater_for(&server);
        let outcome = updater
            .update(&root, false, &UpdateProgress::hidden())
            .await;

        assert_eq!(
            outcome,
            UpdateOutcome::RemoteUnavailable {
                install_path: Some(existing),
            }
        );
        assert_eq!(root_entries(&root), ["3.0.2222"]);
    }

    #[tokio::test]
    async fn test_feed_failure_with_nothing_installed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/releases"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let holder = tempdir().expect("temp dir");
        let root = holder.path().join("cli");

        let updater = updater_for(&server);
        let outcome = updater
            .update(&root, false, &UpdateProgress::hidden())
            .await;

        assert_eq!(
            outcome,
            UpdateOutcome::RemoteUnavailable { install_path: None }
        );
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_cancellation_before_download_leaves_root_alone() {
        let server = MockServer::start().await;
        mount_release(&server, "4.0.100", 0).await;
        let holder = tempdir().expect("temp dir");
        let root = holder.path().join("cli");

        let progress = UpdateProgress::hidden();
        progress.cancel();

        let updater = updater_for(&server);
        let outcome = updater.update(&root, false, &progress).await;

        assert_eq!(outcome, UpdateOutcome::Cancelled);
        assert!(!root.exists());
    }

    #[tokio::test]
    async fn test_prerelease_only_feed_needs_opt_in() {
        let server = MockServer::start().await;
        let asset_name = "Azure.Functions.Cli.linux-x64.5.0.0.zip";
        Mock::given(method("GET"))
            .and(path("/releases"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "tag_name": "v5.0.0",
                "prerelease": true,
                "assets": [{
                    "name": asset_name,
                    "browser_download_url": format!("{}/download/{}", server.uri(), asset_name),
                }]
            }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/download/{}", asset_name)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(zip_bytes("5.0.0")))
            .mount(&server)
            .await;
        let holder = tempdir().expect("temp dir");
        let root = holder.path().join("cli");

        let updater = updater_for(&server);
        let outcome = updater
            .update(&root, false, &UpdateProgress::hidden())
            .await;
        assert_eq!(
            outcome,
            UpdateOutcome::RemoteUnavailable { install_path: None }
        );

        let outcome = updater
            .update(&root, true, &UpdateProgress::hidden())
            .await;
        assert_eq!(
            outcome.install_path(),
            Some(root.join("5.0.0").as_path())
        );
    }
}
