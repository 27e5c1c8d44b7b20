use std::collections::HashMap;
use std::io::Write;

use super::{Release, ReleaseSource};
use crate::error::{AufsichtError, Result};

/// In-memory release source for offline use and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryReleases {
    releases: Vec<Release>,
    files: HashMap<String, Vec<u8>>,
}

impl MemoryReleases {
    pub fn new(releases: Vec<Release>) -> Self {
        Self {
            releases,
            files: HashMap::new(),
        }
    }

    /// Serves `bytes` for downloads of `url`.
    pub fn with_file(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.files.insert(url.into(), bytes);
        self
    }
}

impl ReleaseSource for MemoryReleases {
    fn releases(&self) -> Result<Vec<Release>> {
        Ok(self.releases.clone())
    }

    fn download(&self, url: &str, sink: &mut dyn Write, progress: &mut dyn FnMut(u8)) -> Result<u64> {
        let bytes = self
            .files
            .get(url)
            .ok_or_else(|| AufsichtError::not_found(format!("download {url}")))?;
        if bytes.is_empty() {
            return Ok(0);
        }
        let (head, tail) = bytes.split_at(bytes.len() / 2);
        sink.write_all(head)?;
        progress(50);
        sink.write_all(tail)?;
        progress(100);
        Ok(bytes.len() as u64)
    }
}
