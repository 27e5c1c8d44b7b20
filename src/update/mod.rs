//! Self-update from published releases.
//!
//! [`Updater`] asks a [`ReleaseSource`] for the release list, picks the
//! first release (newest first) that carries the configured asset and
//! offers it when its version is newer than the running one.
//! [`install_update`] swaps the executable with a backup that is restored
//! if the copy fails.

mod github;
mod memory;

pub use github::GithubReleases;
pub use memory::MemoryReleases;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{AufsichtError, Result};
use crate::version::is_newer;

/// A published release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// A downloadable file of a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// An available update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    /// Version without the `v` tag prefix.
    pub version: String,
    pub download_url: String,
    pub release_notes: String,
    pub published_at: String,
    pub size: u64,
}

/// Where releases come from.
pub trait ReleaseSource {
    /// All releases, newest first.
    fn releases(&self) -> Result<Vec<Release>>;

    /// Streams `url` into `sink`, reporting progress in percent.
    /// Returns the number of bytes written.
    fn download(&self, url: &str, sink: &mut dyn Write, progress: &mut dyn FnMut(u8)) -> Result<u64>;
}

/// A downloaded update waiting to be installed.
///
/// The file lives in a temporary directory that is removed when this
/// value is dropped.
#[derive(Debug)]
pub struct DownloadedUpdate {
    dir: tempfile::TempDir,
    path: PathBuf,
    pub bytes: u64,
}

impl DownloadedUpdate {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Checks for, downloads and installs updates.
pub struct Updater<S: ReleaseSource> {
    source: S,
    current_version: String,
    asset_name: String,
}

impl<S: ReleaseSource> Updater<S> {
    pub fn new(source: S, current_version: impl Into<String>, asset_name: impl Into<String>) -> Self {
        Updater {
            source,
            current_version: current_version.into(),
            asset_name: asset_name.into(),
        }
    }

    pub fn asset_name(&self) -> &str {
        &self.asset_name
    }

    /// The update offered by the newest release carrying the asset, if
    /// that release is newer than the running version.
    pub fn check_for_updates(&self) -> Result<Option<UpdateInfo>> {
        let releases = self.source.releases()?;
        let Some((release, asset)) = releases.iter().find_map(|r| {
            r.assets
                .iter()
                .find(|a| a.name == self.asset_name)
                .map(|a| (r, a))
        }) else {
            debug!(asset = %self.asset_name, "no release carries the asset");
            return Ok(None);
        };

        let version = release.tag_name.trim_start_matches('v').to_string();
        if !is_newer(&version, &self.current_version) {
            debug!(latest = %version, current = %self.current_version, "up to date");
            return Ok(None);
        }

        info!(latest = %version, current = %self.current_version, "update available");
        Ok(Some(UpdateInfo {
            version,
            download_url: asset.browser_download_url.clone(),
            release_notes: release.body.clone().unwrap_or_default(),
            published_at: release.published_at.clone().unwrap_or_default(),
            size: asset.size,
        }))
    }

    /// Downloads the update into a fresh temporary directory.
    pub fn download_update(
        &self,
        update: &UpdateInfo,
        progress: &mut dyn FnMut(u8),
    ) -> Result<DownloadedUpdate> {
        let dir = tempfile::Builder::new()
            .prefix("aufsichtsplan_update_")
            .tempdir()?;
        let path = dir.path().join(&self.asset_name);

        let mut sink = BufWriter::new(File::create(&path)?);
        let bytes = self.source.download(&update.download_url, &mut sink, progress)?;
        sink.flush()?;
        drop(sink);

        if bytes == 0 || fs::metadata(&path)?.len() == 0 {
            return Err(AufsichtError::update(format!(
                "download of {} is empty",
                update.download_url
            )));
        }
        info!(path = %path.display(), bytes, "update downloaded");
        Ok(DownloadedUpdate { dir, path, bytes })
    }
}

/// Path of the backup kept while installing over `current`.
pub fn backup_path(current: &Path) -> PathBuf {
    let mut name = current.as_os_str().to_os_string();
    name.push(".backup");
    PathBuf::from(name)
}

/// Replaces `current` with `new`.
///
/// `current` is first copied to `current.backup`. If the replacement
/// fails the backup is copied back; on success it is removed.
pub fn install_update(new: &Path, current: &Path) -> Result<()> {
    if !new.exists() {
        return Err(AufsichtError::not_found(format!("update file {}", new.display())));
    }

    let backup = backup_path(current);
    if backup.exists() {
        fs::remove_file(&backup)?;
    }
    fs::copy(current, &backup)?;

    if let Err(err) = fs::copy(new, current) {
        warn!(error = %err, "installing update failed, restoring backup");
        fs::copy(&backup, current)?;
        return Err(AufsichtError::update(format!(
            "could not replace {}: {err}",
            current.display()
        )));
    }

    fs::remove_file(&backup)?;
    info!(path = %current.display(), "update installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release(tag: &str, assets: &[&str]) -> Release {
        Release {
            tag_name: tag.to_string(),
            body: Some(format!("notes {tag}")),
            published_at: Some("2025-10-21T08:00:00Z".to_string()),
            assets: assets
                .iter()
                .map(|name| ReleaseAsset {
                    name: name.to_string(),
                    browser_download_url: format!("https://example.org/{tag}/{name}"),
                    size: 4,
                })
                .collect(),
        }
    }

    #[test]
    fn test_check_picks_first_release_with_asset() {
        let source = MemoryReleases::new(vec![
            release("v0.3.0", &["other.zip"]),
            release("v0.2.14", &["aufsicht", "other.zip"]),
            release("v0.2.13", &["aufsicht"]),
        ]);
        let updater = Updater::new(source, "0.2.13-beta", "aufsicht");

        let info = updater.check_for_updates().unwrap().unwrap();
        assert_eq!(info.version, "0.2.14");
        assert_eq!(info.download_url, "https://example.org/v0.2.14/aufsicht");
        assert_eq!(info.release_notes, "notes v0.2.14");
        assert_eq!(info.size, 4);
    }

    #[test]
    fn test_check_up_to_date_or_missing_asset() {
        let updater = Updater::new(
            MemoryReleases::new(vec![release("v0.2.13", &["aufsicht"])]),
            "0.2.13",
            "aufsicht",
        );
        assert_eq!(updater.check_for_updates().unwrap(), None);

        let updater = Updater::new(
            MemoryReleases::new(vec![release("v9.0.0", &["x"])]),
            "0.2.13",
            "aufsicht",
        );
        assert_eq!(updater.check_for_updates().unwrap(), None);
    }

    #[test]
    fn test_download_reports_progress() {
        let url = "https://example.org/v0.2.14/aufsicht";
        let source = MemoryReleases::new(vec![release("v0.2.14", &["aufsicht"])])
            .with_file(url, b"new binary".to_vec());
        let updater = Updater::new(source, "0.2.13", "aufsicht");
        let info = updater.check_for_updates().unwrap().unwrap();

        let mut seen = Vec::new();
        let downloaded = updater.download_update(&info, &mut |p: u8| seen.push(p)).unwrap();
        assert_eq!(downloaded.bytes, 10);
        assert_eq!(fs::read(downloaded.path()).unwrap(), b"new binary");
        assert!(downloaded.path().ends_with("aufsicht"));
        assert_eq!(seen.last(), Some(&100));
    }

    #[test]
    fn test_empty_download_is_error() {
        let url = "https://example.org/v0.2.14/aufsicht";
        let source = MemoryReleases::new(vec![release("v0.2.14", &["aufsicht"])])
            .with_file(url, Vec::new());
        let updater = Updater::new(source, "0.2.13", "aufsicht");
        let info = updater.check_for_updates().unwrap().unwrap();

        let err = updater.download_update(&info, &mut |_: u8| {}).unwrap_err();
        assert!(matches!(err, AufsichtError::Update(_)));
    }

    #[test]
    fn test_install_replaces_and_removes_backup() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("aufsicht");
        let new = dir.path().join("aufsicht.new");
        fs::write(&current, b"old").unwrap();
        fs::write(&new, b"new").unwrap();
        fs::write(backup_path(&current), b"stale").unwrap();

        install_update(&new, &current).unwrap();
        assert_eq!(fs::read(&current).unwrap(), b"new");
        assert!(!backup_path(&current).exists());
    }

    #[test]
    fn test_install_missing_update() {
        let dir = tempfile::tempdir().unwrap();
        let current = dir.path().join("aufsicht");
        fs::write(&current, b"old").unwrap();

        let err = install_update(&dir.path().join("missing"), &current).unwrap_err();
        assert!(matches!(err, AufsichtError::NotFound(_)));
        assert_eq!(fs::read(&current).unwrap(), b"old");
    }

    #[test]
    fn test_backup_path() {
        assert_eq!(
            backup_path(Path::new("/opt/aufsicht.exe")),
            PathBuf::from("/opt/aufsicht.exe.backup")
        );
    }
}
