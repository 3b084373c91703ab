// Lingobar core: global hotkey dispatch and trial licensing for the menubar app

pub mod config;
pub mod hotkey;
pub mod licensing;
pub mod logging;

use config::CoreConfig;
use hotkey::{HotkeyBinding, HotkeyDispatcher, HotkeyError, HotkeyRegistrar, TapHandler};
use licensing::{Clock, SecureStore, TrialManager, TrialStatus};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of `AppCore::start`
#[derive(Debug)]
pub struct StartupReport {
    pub status: TrialStatus,
    /// A failed registration is not fatal; the app runs without a hotkey
    pub hotkey: Result<HotkeyBinding, HotkeyError>,
}

/// Composition root owned by the host application.
///
/// Holds the trial manager and the hotkey dispatcher side by side; they
/// share no state. The host checks `trial().status()` before acting on a tap.
pub struct AppCore<R: HotkeyRegistrar> {
    config: CoreConfig,
    trial: TrialManager,
    hotkeys: HotkeyDispatcher<R>,
}

impl<R: HotkeyRegistrar> AppCore<R> {
    /// Must be called within a tokio runtime (the dispatcher task is spawned here)
    pub fn new<H: TapHandler>(
        config: CoreConfig,
        store: Arc<dyn SecureStore>,
        clock: Arc<dyn Clock>,
        registrar: R,
        handler: H,
    ) -> Self {
        let trial = TrialManager::new(store, clock).with_config(config.licensing());
        let hotkeys = HotkeyDispatcher::spawn(registrar, handler, config.double_tap_window());

        Self {
            config,
            trial,
            hotkeys,
        }
    }

    /// Launch sequence: trial check and usage record, then hotkey registration
    pub fn start(&mut self) -> StartupReport {
        let status = self.trial.launch();
        let hotkey = self.hotkeys.update_hotkey(self.config.hotkey_character);

        match &hotkey {
            Ok(binding) => info!(%status, %binding, "Lingobar core started"),
            Err(e) => warn!(%status, error = %e, "Lingobar core started without a hotkey"),
        }

        StartupReport { status, hotkey }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn trial(&self) -> &TrialManager {
        &self.trial
    }

    pub fn hotkeys(&self) -> &HotkeyDispatcher<R> {
        &self.hotkeys
    }

    /// Rebind the hotkey. The config only changes when the new key registers.
    pub fn set_hotkey(&mut self, c: char) -> Result<HotkeyBinding, HotkeyError> {
        let binding = self.hotkeys.update_hotkey(c)?;
        self.config.hotkey_character = binding.key_code.to_char();
        Ok(binding)
    }

    pub async fn shutdown(self) {
        self.hotkeys.shutdown().await;
    }
}
