//! Platform ports the hosting shell implements
//!
//! The browser-facing bindings live outside this crate; these traits are
//! the seam between the lifecycle/install logic and whatever actually
//! registers workers, opens cache buckets, or shows the native install
//! sheet.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::pwa::PwaError;

/// What the lifecycle manager needs from the worker mechanism
#[async_trait]
pub trait WorkerRuntime: Send + Sync {
    /// Whether the platform supports background workers at all
    fn is_supported(&self) -> bool;

    /// Register the worker script; resolves when registration completes
    async fn register(&self, script_url: &str) -> Result<(), PwaError>;

    /// Whether a worker currently controls this page (offline-ready)
    fn has_controller(&self) -> bool;

    /// Tell the waiting worker to take over immediately
    async fn skip_waiting(&self) -> Result<(), PwaError>;

    /// Full page reload so the new worker controls the page
    async fn reload_page(&self) -> Result<(), PwaError>;
}

/// Named cache buckets of fetched assets
#[async_trait]
pub trait AssetCache: Send + Sync {
    /// Fetch and store every listed asset into the bucket, failing if any
    /// single asset cannot be cached
    async fn add_all(&self, bucket: &str, assets: &[&str]) -> Result<(), PwaError>;

    async fn bucket_names(&self) -> Result<Vec<String>, PwaError>;

    /// Delete a bucket; returns whether it existed
    async fn delete_bucket(&self, bucket: &str) -> Result<bool, PwaError>;
}

/// A captured native install prompt
///
/// Single-use: showing it consumes it, whatever the user chose.
#[async_trait]
pub trait DeferredInstallPrompt: Send + Sync {
    async fn prompt(self: Box<Self>) -> Result<InstallOutcome, PwaError>;
}

/// The user's answer to the native install sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    Accepted,
    Dismissed,
}

/// Everything platform detection looks at, captured as plain data
///
/// Keeps [`crate::pwa::detect_platform`] a pure function of its input.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSnapshot {
    /// The raw user-agent string
    pub user_agent: String,
    /// The display-mode media query matched "standalone"
    pub display_mode_standalone: bool,
    /// Vendor-specific standalone flag (set when launched from an iOS home
    /// screen icon)
    pub navigator_standalone: bool,
    /// Referrer of the current navigation
    pub referrer: String,
    /// Whether the deferred-install event type exists on this platform
    pub has_deferred_prompt_event: bool,
}

/// Directory-backed asset cache
///
/// Buckets are subdirectories; assets are copied in from the packaged app
/// asset directory. Used by the desktop shell and by tests.
#[derive(Debug)]
pub struct DirAssetCache {
    root: PathBuf,
    asset_source: PathBuf,
}

impl DirAssetCache {
    pub fn new(root: impl Into<PathBuf>, asset_source: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            asset_source: asset_source.into(),
        }
    }

    /// The root document is addressed as "/" but stored as a file
    fn source_name(asset: &str) -> &str {
        match asset {
            "/" | "" => "index.html",
            other => other.trim_start_matches('/'),
        }
    }
}

#[async_trait]
impl AssetCache for DirAssetCache {
    async fn add_all(&self, bucket: &str, assets: &[&str]) -> Result<(), PwaError> {
        let bucket_dir = self.root.join(bucket);
        std::fs::create_dir_all(&bucket_dir)
            .map_err(|e| PwaError::Cache(format!("cannot create bucket {:?}: {}", bucket, e)))?;

        for asset in assets {
            let name = Self::source_name(asset);
            let from = self.asset_source.join(name);
            let to = bucket_dir.join(name);
            if let Some(parent) = to.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| PwaError::Cache(format!("asset {:?}: {}", asset, e)))?;
            }
            std::fs::copy(&from, &to)
                .map_err(|e| PwaError::Cache(format!("asset {:?}: {}", asset, e)))?;
        }

        Ok(())
    }

    async fn bucket_names(&self) -> Result<Vec<String>, PwaError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PwaError::Cache(e.to_string())),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| PwaError::Cache(e.to_string()))?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<bool, PwaError> {
        let bucket_dir = self.root.join(bucket);
        match std::fs::remove_dir_all(&bucket_dir) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(PwaError::Cache(format!("bucket {:?}: {}", bucket, e))),
        }
    }
}
