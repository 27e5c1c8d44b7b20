use serde::{Deserialize, Serialize};

/// Version of this build.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Date of the release this build belongs to.
pub const BUILD_DATE: &str = "2025-10-21";

/// Version descriptor, serialized as `{"version": ..., "build_date": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub build_date: String,
}

impl VersionInfo {
    /// Descriptor of the running build.
    pub fn current() -> Self {
        VersionInfo {
            version: VERSION.to_string(),
            build_date: BUILD_DATE.to_string(),
        }
    }
}

impl std::fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.version, self.build_date)
    }
}

/// Splits a version into its numeric components.
///
/// `-beta`, `-alpha` and `-rc` markers are dropped first, so
/// `"0.2.13-beta"` yields `[0, 2, 13]`.
///
/// # Returns
/// * `None` - If any remaining component is not a number
fn version_components(version: &str) -> Option<Vec<u64>> {
    let clean = version
        .trim()
        .replace("-beta", "")
        .replace("-alpha", "")
        .replace("-rc", "");
    clean.split('.').map(|part| part.parse::<u64>().ok()).collect()
}

/// Whether `latest` is a newer version than `current`.
///
/// Components are compared numerically from left to right; a version that
/// cannot be parsed is never newer.
///
/// # Example
/// ```ignore
/// assert!(is_newer("0.2.14", "0.2.13-beta"));
/// assert!(!is_newer("0.2.13", "0.2.13-beta"));
/// ```
pub fn is_newer(latest: &str, current: &str) -> bool {
    match (version_components(latest), version_components(current)) {
        (Some(latest), Some(current)) => latest > current,
        _ => false,
    }
}
