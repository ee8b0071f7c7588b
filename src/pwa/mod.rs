//! PWA lifecycle and install-prompt management
//!
//! Owns worker registration and update application, network status,
//! essential-asset caching, and the platform-specific add-to-home-screen
//! flows. Everything the hosting shell must provide (worker runtime, cache
//! buckets, deferred install prompt) is a trait in [`platform`], so this
//! logic is testable without a browser.

pub mod install;
pub mod lifecycle;
pub mod platform;

pub use install::{detect_platform, supports_deferred_prompt, InstallPromptManager, PlatformInfo};
pub use lifecycle::{NetworkStatus, PwaLifecycle, WorkerState};
pub use platform::{
    AssetCache, DeferredInstallPrompt, DirAssetCache, EnvironmentSnapshot, InstallOutcome,
    WorkerRuntime,
};

use thiserror::Error;

/// Errors that can occur during PWA operations
#[derive(Error, Debug)]
pub enum PwaError {
    #[error("Worker registration failed: {0}")]
    Registration(String),

    #[error("Worker runtime is not supported on this platform")]
    Unsupported,

    #[error("No update is waiting to be applied")]
    NoUpdatePending,

    #[error("No captured install prompt is available")]
    NoInstallPrompt,

    #[error("Cache operation failed: {0}")]
    Cache(String),
}
