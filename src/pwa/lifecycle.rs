//! PWA lifecycle manager
//!
//! One per tab. Drives worker registration through its state machine,
//! tracks network status from the platform's online/offline signals, and
//! handles best-effort caching of the essential assets at boot.

use std::sync::Arc;

use crate::pwa::platform::{AssetCache, WorkerRuntime};
use crate::pwa::PwaError;

/// Worker script the shell serves
pub const WORKER_SCRIPT_URL: &str = "/sw.js";

/// Bucket holding the assets needed to render anything at all offline
pub const ESSENTIAL_CACHE_BUCKET: &str = "shower-tracker-data-v1";

/// The fixed list of critical assets cached at boot
pub const ESSENTIAL_ASSETS: [&str; 4] = [
    "/",
    "manifest.webmanifest",
    "pwa-192x192.png",
    "pwa-512x512.png",
];

/// Where this tab's worker registration currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Nothing registered (also the resting state on unsupported platforms)
    Unregistered,
    /// Registration request in flight
    Registering,
    /// A worker is registered and current
    Active,
    /// A new version is installed but not yet controlling the page
    UpdateAvailable,
    /// Skip-waiting issued; waiting for the reload that completes it
    ActivatingUpdate,
}

/// Network status as the UI consumes it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkStatus {
    pub is_online: bool,
    /// True when a worker currently controls this page
    pub is_offline_ready: bool,
}

type UpdateCallback = Box<dyn Fn() + Send + Sync>;
type NetworkCallback = Box<dyn Fn(NetworkStatus) + Send + Sync>;

/// Per-tab lifecycle manager
pub struct PwaLifecycle {
    runtime: Arc<dyn WorkerRuntime>,
    cache: Arc<dyn AssetCache>,
    state: WorkerState,
    is_online: bool,
    update_callback: Option<UpdateCallback>,
    network_callback: Option<NetworkCallback>,
}

impl PwaLifecycle {
    pub fn new(
        runtime: Arc<dyn WorkerRuntime>,
        cache: Arc<dyn AssetCache>,
        initially_online: bool,
    ) -> Self {
        Self {
            runtime,
            cache,
            state: WorkerState::Unregistered,
            is_online: initially_online,
            update_callback: None,
            network_callback: None,
        }
    }

    pub fn worker_state(&self) -> WorkerState {
        self.state
    }

    /// Register the worker if the platform supports one
    ///
    /// On unsupported platforms this quietly stays unregistered; the app is
    /// fully usable without offline support.
    pub async fn register_worker(&mut self) -> Result<(), PwaError> {
        if !self.runtime.is_supported() {
            tracing::info!("Worker runtime not supported, staying unregistered");
            return Ok(());
        }

        self.state = WorkerState::Registering;
        match self.runtime.register(WORKER_SCRIPT_URL).await {
            Ok(()) => {
                self.state = WorkerState::Active;
                tracing::info!("Worker registered successfully");
                Ok(())
            }
            Err(e) => {
                self.state = WorkerState::Unregistered;
                tracing::error!("Worker registration failed: {}", e);
                Err(e)
            }
        }
    }

    /// Platform signal: a new worker version finished installing but is not
    /// yet controlling the page
    pub fn update_installed(&mut self) {
        if self.state != WorkerState::Active {
            tracing::debug!(
                "Ignoring update-installed signal in state {:?}",
                self.state
            );
            return;
        }

        self.state = WorkerState::UpdateAvailable;
        if let Some(callback) = &self.update_callback {
            callback();
        }
    }

    /// Apply a pending update: skip-waiting, then a full reload once the
    /// new worker takes control
    ///
    /// A failure leaves the update pending so the user can try again.
    pub async fn apply_update(&mut self) -> Result<(), PwaError> {
        if self.state != WorkerState::UpdateAvailable {
            return Err(PwaError::NoUpdatePending);
        }

        self.state = WorkerState::ActivatingUpdate;
        let applied = async {
            self.runtime.skip_waiting().await?;
            self.runtime.reload_page().await
        }
        .await;

        if let Err(e) = applied {
            self.state = WorkerState::UpdateAvailable;
            tracing::error!("Applying worker update failed: {}", e);
            return Err(e);
        }
        Ok(())
    }

    /// Register the update-available observer
    pub fn on_update_available(&mut self, callback: impl Fn() + Send + Sync + 'static) {
        self.update_callback = Some(Box::new(callback));
    }

    /// Register the network-change observer
    pub fn on_network_change(
        &mut self,
        callback: impl Fn(NetworkStatus) + Send + Sync + 'static,
    ) {
        self.network_callback = Some(Box::new(callback));
    }

    /// Platform signal: the online/offline state flipped
    pub fn set_online(&mut self, online: bool) {
        self.is_online = online;
        let status = self.network_status();
        if let Some(callback) = &self.network_callback {
            callback(status);
        }
    }

    pub fn network_status(&self) -> NetworkStatus {
        NetworkStatus {
            is_online: self.is_online,
            is_offline_ready: self.runtime.has_controller(),
        }
    }

    /// Best-effort boot-time caching of the essential assets
    ///
    /// Failure is logged and swallowed; there is no automatic retry.
    pub async fn cache_essential_assets(&self) {
        match self
            .cache
            .add_all(ESSENTIAL_CACHE_BUCKET, &ESSENTIAL_ASSETS)
            .await
        {
            Ok(()) => tracing::info!("Essential assets cached for offline use"),
            Err(e) => tracing::error!("Failed to cache essential assets: {}", e),
        }
    }

    /// Delete every cache bucket, forcing a clean reload state
    pub async fn clear_all_caches(&self) -> Result<(), PwaError> {
        for bucket in self.cache.bucket_names().await? {
            self.cache.delete_bucket(&bucket).await?;
        }
        tracing::info!("All caches cleared");
        Ok(())
    }
}
