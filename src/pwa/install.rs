//! Platform detection and add-to-home-screen flows
//!
//! Android gets the native deferred prompt: the shell captures the event,
//! hands it to [`InstallPromptManager`], and replays it when the user opts
//! in. iOS has no such event, so an instructional prompt is armed after a
//! short delay instead. Desktop is never offered an install prompt.

use std::time::Duration;

use crate::pwa::platform::{DeferredInstallPrompt, EnvironmentSnapshot, InstallOutcome};
use crate::pwa::PwaError;

/// How long to wait before surfacing the manual iOS instructions
pub const IOS_PROMPT_DELAY: Duration = Duration::from_secs(2);

/// What kind of device we are on and whether installing makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    pub is_android: bool,
    pub is_ios: bool,
    pub is_mobile: bool,
    /// Already running as an installed app, without browser chrome
    pub is_standalone: bool,
    /// True only on mobile platforms that are not yet standalone
    pub can_install: bool,
}

/// Classify the platform from a snapshot of the environment
pub fn detect_platform(env: &EnvironmentSnapshot) -> PlatformInfo {
    let user_agent = env.user_agent.to_lowercase();
    let is_android = user_agent.contains("android");
    let is_ios = ["iphone", "ipad", "ipod"]
        .iter()
        .any(|token| user_agent.contains(token));
    let is_mobile = is_android || is_ios || user_agent.contains("mobile");

    let is_standalone = env.display_mode_standalone
        || env.navigator_standalone
        || env.referrer.contains("android-app://");

    // Desktop browsers may offer their own install affordance, but this app
    // only prompts on mobile.
    let can_install = !is_standalone && (is_android || is_ios);

    PlatformInfo {
        is_android,
        is_ios,
        is_mobile,
        is_standalone,
        can_install,
    }
}

/// Whether the platform fires a capturable deferred-install event
pub fn supports_deferred_prompt(env: &EnvironmentSnapshot) -> bool {
    env.has_deferred_prompt_event
}

/// Drives both install flows for one session
pub struct InstallPromptManager {
    platform: PlatformInfo,
    deferred: Option<Box<dyn DeferredInstallPrompt>>,
    show_android_prompt: bool,
    show_ios_prompt: bool,
    ios_prompt_dismissed: bool,
    is_installing: bool,
}

impl InstallPromptManager {
    pub fn new(platform: PlatformInfo) -> Self {
        Self {
            platform,
            deferred: None,
            show_android_prompt: false,
            show_ios_prompt: false,
            ios_prompt_dismissed: false,
            is_installing: false,
        }
    }

    pub fn platform(&self) -> PlatformInfo {
        self.platform
    }

    /// Whether the UI should render the Android install banner
    pub fn show_android_prompt(&self) -> bool {
        self.show_android_prompt
    }

    /// Whether the UI should render the iOS instructional prompt
    pub fn show_ios_prompt(&self) -> bool {
        self.show_ios_prompt
    }

    pub fn is_installing(&self) -> bool {
        self.is_installing
    }

    /// Take ownership of the native deferred-install event
    ///
    /// The shell calls this from its event handler after suppressing the
    /// browser's default mini-infobar.
    pub fn capture(&mut self, prompt: Box<dyn DeferredInstallPrompt>) {
        self.deferred = Some(prompt);
        self.show_android_prompt = self.platform.is_android && self.platform.can_install;
        tracing::debug!("Captured deferred install prompt");
    }

    /// Replay the captured prompt and wait for the user's choice
    ///
    /// The captured event is single-use: it is discarded whatever the user
    /// chose, and a second call fails until another capture happens.
    pub async fn install(&mut self) -> Result<InstallOutcome, PwaError> {
        let prompt = self.deferred.take().ok_or(PwaError::NoInstallPrompt)?;
        self.is_installing = true;

        let result = prompt.prompt().await;

        self.is_installing = false;
        self.show_android_prompt = false;

        match &result {
            Ok(outcome) => tracing::info!("Install prompt resolved: {:?}", outcome),
            Err(e) => tracing::error!("Install prompt failed: {}", e),
        }
        result
    }

    /// Arm the manual iOS instructions after [`IOS_PROMPT_DELAY`]
    ///
    /// Only fires on an installable iOS device, and only once per session;
    /// after a dismissal it stays hidden until the next launch.
    pub async fn wait_for_ios_prompt(&mut self) {
        if !(self.platform.is_ios && self.platform.can_install) || self.ios_prompt_dismissed {
            return;
        }
        tokio::time::sleep(IOS_PROMPT_DELAY).await;
        if !self.ios_prompt_dismissed {
            self.show_ios_prompt = true;
        }
    }

    /// Hide the Android banner and throw away the captured event
    pub fn dismiss_android(&mut self) {
        self.show_android_prompt = false;
        self.deferred = None;
    }

    /// Hide the iOS instructions for the rest of this session
    pub fn dismiss_ios(&mut self) {
        self.show_ios_prompt = false;
        self.ios_prompt_dismissed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    fn android_env() -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            user_agent: "Mozilla/5.0 (Linux; Android 14; Pixel 8) Mobile".to_string(),
            has_deferred_prompt_event: true,
            ..Default::default()
        }
    }

    fn ios_env() -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X)".to_string(),
            ..Default::default()
        }
    }

    struct ScriptedPrompt(InstallOutcome);

    #[async_trait]
    impl DeferredInstallPrompt for ScriptedPrompt {
        async fn prompt(self: Box<Self>) -> Result<InstallOutcome, PwaError> {
            Ok(self.0)
        }
    }

    #[test]
    fn detects_android() {
        let info = detect_platform(&android_env());
        assert!(info.is_android && info.is_mobile && info.can_install);
        assert!(!info.is_ios && !info.is_standalone);
    }

    #[test]
    fn detects_ios() {
        let info = detect_platform(&ios_env());
        assert!(info.is_ios && info.is_mobile && info.can_install);
        assert!(!info.is_android);
    }

    #[test]
    fn desktop_cannot_install() {
        let env = EnvironmentSnapshot {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) Firefox/130.0".to_string(),
            ..Default::default()
        };
        let info = detect_platform(&env);
        assert!(!info.is_mobile && !info.can_install);
    }

    #[test]
    fn standalone_suppresses_install() {
        let env = EnvironmentSnapshot {
            display_mode_standalone: true,
            ..android_env()
        };
        let info = detect_platform(&env);
        assert!(info.is_standalone);
        assert!(!info.can_install);

        let from_twa = EnvironmentSnapshot {
            referrer: "android-app://com.example.shower".to_string(),
            ..android_env()
        };
        assert!(detect_platform(&from_twa).is_standalone);
    }

    #[tokio::test]
    async fn captured_prompt_is_single_use() {
        let mut manager = InstallPromptManager::new(detect_platform(&android_env()));

        assert!(matches!(
            manager.install().await,
            Err(PwaError::NoInstallPrompt)
        ));

        manager.capture(Box::new(ScriptedPrompt(InstallOutcome::Accepted)));
        assert!(manager.show_android_prompt());

        let outcome = manager.install().await.unwrap();
        assert_eq!(outcome, InstallOutcome::Accepted);
        assert!(!manager.show_android_prompt());

        // The event is gone even though the user accepted
        assert!(matches!(
            manager.install().await,
            Err(PwaError::NoInstallPrompt)
        ));
    }

    #[tokio::test]
    async fn dismissed_prompt_is_discarded_too() {
        let mut manager = InstallPromptManager::new(detect_platform(&android_env()));

        manager.capture(Box::new(ScriptedPrompt(InstallOutcome::Dismissed)));
        let outcome = manager.install().await.unwrap();
        assert_eq!(outcome, InstallOutcome::Dismissed);
        assert!(matches!(
            manager.install().await,
            Err(PwaError::NoInstallPrompt)
        ));
    }

    #[tokio::test]
    async fn android_dismissal_drops_the_event() {
        let mut manager = InstallPromptManager::new(detect_platform(&android_env()));
        manager.capture(Box::new(ScriptedPrompt(InstallOutcome::Accepted)));

        manager.dismiss_android();
        assert!(!manager.show_android_prompt());
        assert!(matches!(
            manager.install().await,
            Err(PwaError::NoInstallPrompt)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn ios_prompt_appears_after_the_delay() {
        let mut manager = InstallPromptManager::new(detect_platform(&ios_env()));
        assert!(!manager.show_ios_prompt());

        manager.wait_for_ios_prompt().await;
        assert!(manager.show_ios_prompt());
    }

    #[tokio::test(start_paused = true)]
    async fn ios_dismissal_lasts_the_session() {
        let mut manager = InstallPromptManager::new(detect_platform(&ios_env()));

        manager.wait_for_ios_prompt().await;
        manager.dismiss_ios();
        assert!(!manager.show_ios_prompt());

        // Re-arming does nothing once dismissed
        manager.wait_for_ios_prompt().await;
        assert!(!manager.show_ios_prompt());
    }

    #[tokio::test(start_paused = true)]
    async fn ios_prompt_never_arms_on_android() {
        let mut manager = InstallPromptManager::new(detect_platform(&android_env()));
        manager.wait_for_ios_prompt().await;
        assert!(!manager.show_ios_prompt());
    }
}
