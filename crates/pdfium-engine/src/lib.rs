//! # pdfium-engine
//!
//! Provisioning for the [PDFium](https://pdfium.googlesource.com/pdfium/)
//! shared library that backs the PaperMind preview renderer.
//!
//! The library is resolved in this order:
//!
//! 1. An explicit path (`PDFIUM_LIB_PATH`, or [`EngineLocator::with_lib_path`]).
//! 2. The per-release cache directory, e.g. `~/.cache/papermind/pdfium-7690/`.
//! 3. A download of the platform archive from the configured release location
//!    ([`EngineSource`]), from which only the library file is extracted.
//!
//! ```rust,no_run
//! use pdfium_engine::EngineLocator;
//!
//! let locator = EngineLocator::from_env();
//! let pdfium = locator
//!     .bind(Some(&|done: u64, total: Option<u64>| eprint!("\r{done}/{total:?} bytes")))
//!     .expect("pdfium unavailable");
//! ```
//!
//! ## Environment variables
//!
//! - `PDFIUM_LIB_PATH` — use this library file; never download.
//! - `PAPERMIND_PDFIUM_CACHE` — cache root instead of the platform cache dir.

use std::io::Read;
use std::path::{Path, PathBuf};

use pdfium_render::prelude::Pdfium;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Release location used when nothing else is configured.
pub const DEFAULT_RELEASE_BASE: &str =
    "https://github.com/bblanchon/pdfium-binaries/releases/download";

/// Release tag of the pdfium-binaries build the renderer is tested against.
pub const DEFAULT_RELEASE_TAG: &str = "chromium/7690";

/// Environment variable naming an existing library file.
pub const LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "PAPERMIND_PDFIUM_CACHE";

/// Callback receiving `(bytes_downloaded, total_bytes)` during a download.
pub type DownloadProgress<'a> = &'a dyn Fn(u64, Option<u64>);

/// Errors raised while provisioning the engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no pdfium build is published for {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    #[error("cannot prepare engine cache '{path}': {source}")]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("engine download from '{url}' failed: {reason}")]
    Download { url: String, reason: String },

    #[error("engine archive is unusable: {0}")]
    Extract(String),

    #[error("failed to bind pdfium from '{path}': {reason}")]
    Bind { path: PathBuf, reason: String },
}

/// Where engine archives are downloaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSource {
    /// Base URL of the release downloads, without a trailing tag.
    pub release_base: String,
    /// Release tag, e.g. `chromium/7690`.
    pub release_tag: String,
}

impl Default for EngineSource {
    fn default() -> Self {
        Self {
            release_base: DEFAULT_RELEASE_BASE.to_string(),
            release_tag: DEFAULT_RELEASE_TAG.to_string(),
        }
    }
}

impl EngineSource {
    /// Full download URL of `asset` for this release.
    ///
    /// Slashes inside the tag are percent-encoded because GitHub release tags
    /// such as `chromium/7690` occupy a single path segment.
    pub fn archive_url(&self, asset: &PlatformAsset) -> String {
        format!(
            "{}/{}/{}",
            self.release_base.trim_end_matches('/'),
            self.release_tag.replace('/', "%2F"),
            asset.archive
        )
    }

    /// Short, filesystem-safe name of the release (`7690` for `chromium/7690`).
    pub fn release_slug(&self) -> &str {
        self.release_tag
            .rsplit('/')
            .find(|s| !s.is_empty())
            .unwrap_or("latest")
    }
}

/// The release asset and library file for one OS/architecture pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformAsset {
    /// Archive file name in the release, e.g. `pdfium-linux-x64.tgz`.
    pub archive: String,
    /// Path of the library inside the archive, e.g. `lib/libpdfium.so`.
    pub member: String,
    /// File name the library is cached under.
    pub file_name: &'static str,
}

impl PlatformAsset {
    /// Asset for the platform this binary was compiled for.
    pub fn current() -> Result<Self, EngineError> {
        Self::for_target(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Asset for an explicit `std::env::consts` OS/ARCH pair.
    pub fn for_target(os: &str, arch: &str) -> Result<Self, EngineError> {
        let unsupported = || EngineError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
        };

        let (os_tag, dir, file_name) = match os {
            "macos" => ("mac", "lib", "libpdfium.dylib"),
            "linux" => ("linux", "lib", "libpdfium.so"),
            "windows" => ("win", "bin", "pdfium.dll"),
            _ => return Err(unsupported()),
        };
        let arch_tag = match (os, arch) {
            (_, "x86_64") => "x64",
            (_, "aarch64") => "arm64",
            ("windows", "x86") => "x86",
            _ => return Err(unsupported()),
        };

        Ok(Self {
            archive: format!("pdfium-{os_tag}-{arch_tag}.tgz"),
            member: format!("{dir}/{file_name}"),
            file_name,
        })
    }
}

/// Resolves the pdfium library path and binds it.
#[derive(Debug, Clone, Default)]
pub struct EngineLocator {
    source: EngineSource,
    lib_path: Option<PathBuf>,
    cache_root: Option<PathBuf>,
}

impl EngineLocator {
    pub fn new(source: EngineSource) -> Self {
        Self {
            source,
            lib_path: None,
            cache_root: None,
        }
    }

    /// Default source with `PDFIUM_LIB_PATH` / `PAPERMIND_PDFIUM_CACHE` applied.
    pub fn from_env() -> Self {
        let mut locator = Self::default();
        if let Some(p) = non_empty_env(LIB_PATH_ENV) {
            locator.lib_path = Some(PathBuf::from(p));
        }
        if let Some(p) = non_empty_env(CACHE_DIR_ENV) {
            locator.cache_root = Some(PathBuf::from(p));
        }
        locator
    }

    pub fn with_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lib_path = Some(path.into());
        self
    }

    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    pub fn source(&self) -> &EngineSource {
        &self.source
    }

    /// Directory holding the cached library for the configured release.
    pub fn cache_dir(&self) -> PathBuf {
        let root = self.cache_root.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join(".cache")))
                .unwrap_or_else(std::env::temp_dir)
                .join("papermind")
        });
        root.join(format!("pdfium-{}", self.source.release_slug()))
    }

    /// Path of an already-available library, without touching the network.
    pub fn cached_library(&self) -> Option<PathBuf> {
        if let Some(ref p) = self.lib_path {
            return p.exists().then(|| p.clone());
        }
        let asset = PlatformAsset::current().ok()?;
        let p = self.cache_dir().join(asset.file_name);
        p.exists().then_some(p)
    }

    /// Return the library path, downloading the engine when it is not cached.
    ///
    /// An explicit library path that does not exist is an error rather than a
    /// trigger for a download.
    pub fn ensure(&self, on_progress: Option<DownloadProgress<'_>>) -> Result<PathBuf, EngineError> {
        if let Some(ref p) = self.lib_path {
            if p.exists() {
                return Ok(p.clone());
            }
            return Err(EngineError::Bind {
                path: p.clone(),
                reason: format!("file does not exist (set via {LIB_PATH_ENV})"),
            });
        }

        let asset = PlatformAsset::current()?;
        let dir = self.cache_dir();
        let lib = dir.join(asset.file_name);
        if lib.exists() {
            debug!("Using cached pdfium at {}", lib.display());
            return Ok(lib);
        }

        std::fs::create_dir_all(&dir).map_err(|source| EngineError::CacheDir {
            path: dir.clone(),
            source,
        })?;

        let url = self.source.archive_url(&asset);
        info!("Downloading pdfium engine from {url}");
        let archive = download(&url, on_progress)?;
        extract_member(&archive, &asset.member, &lib)?;
        info!("pdfium engine cached at {}", lib.display());

        Ok(lib)
    }

    /// Resolve (downloading if needed) and bind the library.
    pub fn bind(&self, on_progress: Option<DownloadProgress<'_>>) -> Result<Pdfium, EngineError> {
        let path = self.ensure(on_progress)?;
        bind_library(&path)
    }
}

/// Bind an explicit library file.
pub fn bind_library(path: &Path) -> Result<Pdfium, EngineError> {
    Pdfium::bind_to_library(path)
        .map(Pdfium::new)
        .map_err(|e| EngineError::Bind {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn download(url: &str, on_progress: Option<DownloadProgress<'_>>) -> Result<Vec<u8>, EngineError> {
    let fail = |reason: String| EngineError::Download {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::blocking::Client::builder()
        .user_agent(concat!("pdfium-engine/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .map_err(|e| fail(e.to_string()))?;

    let mut response = client.get(url).send().map_err(|e| fail(e.to_string()))?;
    if !response.status().is_success() {
        return Err(fail(format!("HTTP {}", response.status())));
    }

    let total = response.content_length();
    let mut buf = Vec::with_capacity(total.unwrap_or(0) as usize);
    let mut chunk = vec![0u8; 64 * 1024];
    let mut done: u64 = 0;

    loop {
        match response.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                done += n as u64;
                if let Some(cb) = on_progress {
                    cb(done, total);
                }
            }
            Err(ref e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(fail(format!("read error: {e}"))),
        }
    }

    Ok(buf)
}

/// Unpack `member` from a gzipped tar into `dest`.
///
/// The file is written next to `dest` first and renamed into place, so an
/// interrupted extraction never leaves a truncated library in the cache.
fn extract_member(archive: &[u8], member: &str, dest: &Path) -> Result<(), EngineError> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let mut tar = Archive::new(GzDecoder::new(archive));
    let entries = tar
        .entries()
        .map_err(|e| EngineError::Extract(e.to_string()))?;

    for entry in entries {
        let mut entry = entry.map_err(|e| EngineError::Extract(e.to_string()))?;
        let matches = entry
            .path()
            .map(|p| p.to_string_lossy() == member)
            .map_err(|e| EngineError::Extract(e.to_string()))?;
        if !matches {
            continue;
        }

        let partial = dest.with_extension("partial");
        entry
            .unpack(&partial)
            .map_err(|e| EngineError::Extract(format!("unpack {member}: {e}")))?;
        std::fs::rename(&partial, dest).map_err(|e| {
            warn!("Could not move {} into place", partial.display());
            EngineError::Extract(format!("rename into cache: {e}"))
        })?;
        return Ok(());
    }

    Err(EngineError::Extract(format!("'{member}' not found in archive")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linux_x64_asset() {
        let a = PlatformAsset::for_target("linux", "x86_64").unwrap();
        assert_eq!(a.archive, "pdfium-linux-x64.tgz");
        assert_eq!(a.member, "lib/libpdfium.so");
        assert_eq!(a.file_name, "libpdfium.so");
    }

    #[test]
    fn mac_arm_and_windows_x86_assets() {
        let mac = PlatformAsset::for_target("macos", "aarch64").unwrap();
        assert_eq!(mac.archive, "pdfium-mac-arm64.tgz");
        assert_eq!(mac.member, "lib/libpdfium.dylib");

        let win = PlatformAsset::for_target("windows", "x86").unwrap();
        assert_eq!(win.archive, "pdfium-win-x86.tgz");
        assert_eq!(win.member, "bin/pdfium.dll");
    }

    #[test]
    fn unsupported_platforms_are_rejected() {
        assert!(matches!(
            PlatformAsset::for_target("linux", "x86"),
            Err(EngineError::UnsupportedPlatform { .. })
        ));
        assert!(PlatformAsset::for_target("freebsd", "x86_64").is_err());
    }

    #[test]
    fn archive_url_encodes_tag() {
        let source = EngineSource {
            release_base: "https://mirror.example/pdfium/".into(),
            release_tag: "chromium/7690".into(),
        };
        let asset = PlatformAsset::for_target("linux", "aarch64").unwrap();
        assert_eq!(
            source.archive_url(&asset),
            "https://mirror.example/pdfium/chromium%2F7690/pdfium-linux-arm64.tgz"
        );
        assert_eq!(source.release_slug(), "7690");
    }

    #[test]
    fn cache_dir_uses_root_override() {
        let locator = EngineLocator::default().with_cache_root("/tmp/papermind-engine-test");
        let dir = locator.cache_dir();
        assert!(dir.starts_with("/tmp/papermind-engine-test"));
        assert!(dir.ends_with("pdfium-7690"));
    }

    #[test]
    fn explicit_missing_library_is_a_bind_error() {
        let locator = EngineLocator::default().with_lib_path("/nonexistent/libpdfium.so");
        assert!(locator.cached_library().is_none());
        assert!(matches!(locator.ensure(None), Err(EngineError::Bind { .. })));
    }

    #[test]
    fn explicit_existing_library_is_returned_as_is() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let locator = EngineLocator::default().with_lib_path(file.path());
        assert_eq!(locator.cached_library().as_deref(), Some(file.path()));
        assert_eq!(locator.ensure(None).unwrap(), file.path());
    }
}
