use std::io::{Read, Write};
use std::time::Duration;

use tracing::debug;

use super::{Release, ReleaseSource};
use crate::error::{AufsichtError, Result};

const GITHUB_API: &str = "https://api.github.com";
const USER_AGENT: &str = concat!("aufsichtsplan/", env!("CARGO_PKG_VERSION"));

/// Releases of a GitHub repository, read from the REST API.
pub struct GithubReleases {
    client: reqwest::blocking::Client,
    api_base: String,
}

impl GithubReleases {
    /// Source for `owner/name`, talking to `api.github.com`.
    pub fn new(repository: &str, timeout: Duration) -> Result<Self> {
        Self::with_api(GITHUB_API, repository, timeout)
    }

    /// Source for `owner/name` on another API host.
    pub fn with_api(api: &str, repository: &str, timeout: Duration) -> Result<Self> {
        if repository.split('/').filter(|p| !p.is_empty()).count() != 2 {
            return Err(AufsichtError::config(format!(
                "repository must be owner/name, got {repository:?}"
            )));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_base: format!("{}/repos/{repository}", api.trim_end_matches('/')),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

impl ReleaseSource for GithubReleases {
    fn releases(&self) -> Result<Vec<Release>> {
        let url = format!("{}/releases", self.api_base);
        debug!(%url, "fetching releases");
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()?;
        if !response.status().is_success() {
            return Err(AufsichtError::update(format!(
                "GitHub API error: {}",
                response.status()
            )));
        }
        Ok(response.json()?)
    }

    fn download(&self, url: &str, sink: &mut dyn Write, progress: &mut dyn FnMut(u8)) -> Result<u64> {
        let mut response = self.client.get(url).send()?;
        if !response.status().is_success() {
            return Err(AufsichtError::update(format!(
                "download failed: {}",
                response.status()
            )));
        }

        let total = response.content_length().unwrap_or(0);
        let mut written = 0u64;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n])?;
            written += n as u64;
            if total > 0 {
                progress((written * 100 / total).min(100) as u8);
            }
        }
        Ok(written)
    }
}
