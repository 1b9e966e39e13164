use crate::progress::UpdateProgress;
use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Completed,
    Cancelled,
}

/// Stream `url` into `local_path`, reporting progress per chunk.
///
/// The cancellation flag is honored before the request and at every chunk
/// boundary; a cancelled download removes the partial file itself.
pub async fn download_file(
    client: &reqwest::Client,
    url: &str,
    local_path: &Path,
    progress: &UpdateProgress,
) -> Result<DownloadStatus> {
    if progress.is_cancelled() {
        return Ok(DownloadStatus::Cancelled);
    }

    tracing::info!("Downloading {}", url);

    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request to {} failed", url))?;
    if !response.status().is_success() {
        return Err(anyhow!("download of {} returned {}", url, response.status()));
    }

    let total_size = response.content_length().unwrap_or(0);
    let file_name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| url.to_string());
    progress.start_download(total_size, &file_name);

    let mut file = fs::File::create(local_path)
        .with_context(|| format!("could not create {}", local_path.display()))?;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        if progress.is_cancelled() {
            drop(file);
            if let Err(e) = fs::remove_file(local_path) {
                tracing::warn!(
                    "Could not remove partial download {}: {}",
                    local_path.display(),
                    e
                );
            }
            progress.abandon();
            return Ok(DownloadStatus::Cancelled);
        }

        let chunk = chunk.with_context(|| format!("stream from {} broke off", url))?;
        file.write_all(&chunk)?;
        progress.advance(chunk.len() as u64);
    }

    progress.finish_download();
    Ok(DownloadStatus::Completed)
}

/// Unpack a zip archive into `extract_dir`. Entries that would escape the
/// directory are skipped.
pub fn extract_zip(archive_path: &Path, extract_dir: &Path) -> Result<()> {
    tracing::info!(
        "Extracting {}",
        archive_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
    );

    let file = fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let Some(relative) = entry.enclosed_name().map(|p| p.to_path_buf()) else {
            tracing::warn!("Skipping malicious path in zip: {}", entry.name());
            continue;
        };
        let outpath = extract_dir.join(relative);

        if entry.name().ends_with('/') {
            fs::create_dir_all(&outpath)?;
        } else {
            if let Some(parent) = outpath.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut outfile = fs::File::create(&outpath)?;
            io::copy(&mut entry, &mut outfile)?;
        }
    }

    Ok(())
}

/// Test fixture: a zip archive holding the given name/content pairs.
#[cfg(test)]
pub(crate) fn write_zip(archive_path: &Path, entries: &[(&str, &str)]) {
    let file = fs::File::create(archive_path).expect("create archive");
    let mut writer = zip::ZipWriter::new(file);
    let options = zip::write::FileOptions::default();
    for (name, content) in entries {
        writer.start_file(*name, options).expect("start entry");
        writer.write_all(content.as_bytes()).expect("write entry");
    }
    writer.finish().expect("finish archive");
}
