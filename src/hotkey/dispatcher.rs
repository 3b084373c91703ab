use crate::hotkey::disambiguator::{PulseOutcome, TapAction, TapDisambiguator};
use crate::hotkey::registrar::{HotkeyHandle, HotkeyRegistrar, PulseSender};
use crate::hotkey::timer::SingleTapTimer;
use crate::hotkey::{HotkeyBinding, HotkeyError, Modifiers};
use std::time::Duration;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Receives resolved tap actions on the dispatcher task.
///
/// Implementations that touch UI state must hand the action to the main
/// thread (the `UnboundedSender` impl does exactly that).
pub trait TapHandler: Send + 'static {
    fn on_single_tap(&mut self);
    fn on_double_tap(&mut self);

    fn handle(&mut self, action: TapAction) {
        match action {
            TapAction::SingleTap => self.on_single_tap(),
            TapAction::DoubleTap => self.on_double_tap(),
        }
    }
}

/// A pair of closures, e.g. "translate clipboard" and "improve clipboard text"
pub struct TapCallbacks<S, D> {
    pub on_single_tap: S,
    pub on_double_tap: D,
}

impl<S, D> TapHandler for TapCallbacks<S, D>
where
    S: FnMut() + Send + 'static,
    D: FnMut() + Send + 'static,
{
    fn on_single_tap(&mut self) {
        (self.on_single_tap)()
    }

    fn on_double_tap(&mut self) {
        (self.on_double_tap)()
    }
}

impl TapHandler for mpsc::UnboundedSender<TapAction> {
    fn on_single_tap(&mut self) {
        self.handle(TapAction::SingleTap)
    }

    fn on_double_tap(&mut self) {
        self.handle(TapAction::DoubleTap)
    }

    fn handle(&mut self, action: TapAction) {
        if self.send(action).is_err() {
            debug!(?action, "Tap action receiver dropped");
        }
    }
}

#[derive(Debug)]
pub(crate) enum Command {
    Pulse(Instant),
    /// Forget the last tap and cancel any pending single tap
    Reset,
    Shutdown,
}

/// Dispatcher task: the only owner of the disambiguator and its timer
async fn run_dispatcher<H: TapHandler>(
    mut commands: mpsc::UnboundedReceiver<Command>,
    mut handler: H,
    window: Duration,
) {
    let mut disambiguator = TapDisambiguator::new(window);
    let mut timer = SingleTapTimer::new();

    loop {
        select! {
            // Commands are drained first; a pulse stamped after an armed
            // deadline resolves that single tap before it is processed
            biased;

            command = commands.recv() => match command {
                Some(Command::Pulse(at)) => {
                    if let Some(action) = disambiguator.take_overdue(at) {
                        debug!("Single tap (resolved by a later pulse)");
                        handler.handle(action);
                    }
                    timer.cancel();
                    match disambiguator.pulse(at) {
                        PulseOutcome::DoubleTap => {
                            debug!("Double tap");
                            handler.handle(TapAction::DoubleTap);
                        }
                        PulseOutcome::ArmSingleTap { deadline, generation } => {
                            timer.arm(deadline, generation);
                        }
                    }
                }
                Some(Command::Reset) => {
                    timer.cancel();
                    disambiguator.reset();
                }
                Some(Command::Shutdown) | None => break,
            },
            generation = timer.fired() => {
                timer.cancel();
                if let Some(action) = disambiguator.timer_fired(generation) {
                    debug!("Single tap");
                    handler.handle(action);
                }
            }
        }
    }

    debug!("Hotkey dispatcher stopped");
}

/// Owns the global hotkey and turns its pulses into single/double tap actions.
///
/// A single tap is reported one double-tap window after the press, because
/// that is the earliest point it is known that no second press follows.
pub struct HotkeyDispatcher<R: HotkeyRegistrar> {
    registrar: R,
    modifiers: Modifiers,
    binding: Option<(HotkeyBinding, HotkeyHandle)>,
    commands: mpsc::UnboundedSender<Command>,
    task: Option<JoinHandle<()>>,
}

impl<R: HotkeyRegistrar> HotkeyDispatcher<R> {
    /// Spawn the dispatcher task on the current tokio runtime. No hotkey is
    /// bound until `update_hotkey` succeeds.
    pub fn spawn<H: TapHandler>(registrar: R, handler: H, window: Duration) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_dispatcher(rx, handler, window));

        Self {
            registrar,
            modifiers: Modifiers::DEFAULT,
            binding: None,
            commands,
            task: Some(task),
        }
    }

    pub fn current_binding(&self) -> Option<HotkeyBinding> {
        self.binding.map(|(binding, _)| binding)
    }

    pub fn registrar(&self) -> &R {
        &self.registrar
    }

    /// Sender for hosts that deliver pulses without going through the registrar
    pub fn pulse_sender(&self) -> PulseSender {
        PulseSender::new(self.commands.clone())
    }

    /// Bind the hotkey to `c` with the fixed modifiers.
    ///
    /// A character outside the key table leaves the current binding in place.
    /// Otherwise the old binding is released (cancelling any pending single
    /// tap) before the new one is registered; if registration fails no
    /// hotkey is bound.
    pub fn update_hotkey(&mut self, c: char) -> Result<HotkeyBinding, HotkeyError> {
        let binding = HotkeyBinding::for_char(c).map_err(|e| {
            warn!(error = %e, "Ignoring hotkey change");
            e
        })?;
        let binding = HotkeyBinding {
            modifiers: self.modifiers,
            ..binding
        };

        self.unregister_current();

        let handle = self
            .registrar
            .register(binding, self.pulse_sender())
            .map_err(|e| {
                warn!(%binding, error = %e, "Hotkey registration failed, continuing without a hotkey");
                e
            })?;

        info!(%binding, "Hotkey registered");
        self.binding = Some((binding, handle));
        Ok(binding)
    }

    /// Release the current hotkey, if any
    pub fn unregister_current(&mut self) {
        if let Some((binding, handle)) = self.binding.take() {
            self.registrar.unregister(handle);
            debug!(%binding, "Hotkey unregistered");
        }
        // A pending single tap belongs to the released binding
        let _ = self.commands.send(Command::Reset);
    }

    /// Unregister the hotkey and wait for the dispatcher task to finish
    pub async fn shutdown(mut self) {
        self.stop();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Hotkey dispatcher task failed");
            }
        }
    }

    fn stop(&mut self) {
        if let Some((_, handle)) = self.binding.take() {
            self.registrar.unregister(handle);
        }
        let _ = self.commands.send(Command::Shutdown);
    }
}

impl<R: HotkeyRegistrar> Drop for HotkeyDispatcher<R> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hotkey::registrar::SimulatedRegistrar;
    use crate::hotkey::DOUBLE_TAP_WINDOW;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<TapAction>) -> Vec<TapAction> {
        let mut actions = Vec::new();
        while let Ok(action) = rx.try_recv() {
            actions.push(action);
        }
        actions
    }

    fn setup() -> (
        SimulatedRegistrar,
        HotkeyDispatcher<SimulatedRegistrar>,
        mpsc::UnboundedReceiver<TapAction>,
        HotkeyBinding,
    ) {
        let registrar = SimulatedRegistrar::new();
        let (tx, rx) = mpsc::unbounded_channel();
        let mut dispatcher = HotkeyDispatcher::spawn(registrar.clone(), tx, DOUBLE_TAP_WINDOW);
        let binding = dispatcher.update_hotkey('T').unwrap();
        (registrar, dispatcher, rx, binding)
    }

    #[tokio::test(start_paused = true)]
    async fn test_quick_pair_fires_only_double_tap() {
        let (registrar, _dispatcher, mut rx, binding) = setup();

        assert!(registrar.press(binding));
        sleep(ms(150)).await;
        assert!(registrar.press(binding));
        sleep(ms(1)).await;
        assert_eq!(drain(&mut rx), vec![TapAction::DoubleTap]);

        sleep(ms(1000)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_lone_press_fires_single_tap_after_window() {
        let (registrar, _dispatcher, mut rx, binding) = setup();

        registrar.press(binding);
        sleep(ms(299)).await;
        assert!(drain(&mut rx).is_empty());

        sleep(ms(2)).await;
        assert_eq!(drain(&mut rx), vec![TapAction::SingleTap]);

        sleep(ms(1000)).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_three_presses() {
        let (registrar, _dispatcher, mut rx, binding) = setup();

        registrar.press(binding);
        sleep(ms(100)).await;
        registrar.press(binding);
        sleep(ms(1)).await;
        assert_eq!(drain(&mut rx), vec![TapAction::DoubleTap]);

        sleep(ms(349)).await;
        registrar.press(binding);
        sleep(ms(299)).await;
        assert!(drain(&mut rx).is_empty());

        sleep(ms(2)).await;
        assert_eq!(drain(&mut rx), vec![TapAction::SingleTap]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_presses_are_separate_single_taps() {
        let (registrar, _dispatcher, mut rx, binding) = setup();

        registrar.press(binding);
        sleep(ms(400)).await;
        registrar.press(binding);
        sleep(ms(400)).await;

        assert_eq!(drain(&mut rx), vec![TapAction::SingleTap, TapAction::SingleTap]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlogged_late_pulse_keeps_both_single_taps() {
        let (_registrar, dispatcher, mut rx, _binding) = setup();
        let pulses = dispatcher.pulse_sender();
        let t0 = Instant::now();

        // Both queued before the task gets to run
        pulses.pulse_at(t0).unwrap();
        pulses.pulse_at(t0 + ms(350)).unwrap();
        sleep(ms(2000)).await;

        assert_eq!(drain(&mut rx), vec![TapAction::SingleTap, TapAction::SingleTap]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backlogged_double_tap_then_separate_taps() {
        let (_registrar, dispatcher, mut rx, _binding) = setup();
        let pulses = dispatcher.pulse_sender();
        let t0 = Instant::now();

        for offset in [0, 100, 500, 850] {
            pulses.pulse_at(t0 + ms(offset)).unwrap();
        }
        sleep(ms(2000)).await;

        assert_eq!(
            drain(&mut rx),
            vec![TapAction::DoubleTap, TapAction::SingleTap, TapAction::SingleTap]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebinding_cancels_pending_single_tap() {
        let (registrar, mut dispatcher, mut rx, old) = setup();

        registrar.press(old);
        sleep(ms(100)).await;
        let new = dispatcher.update_hotkey('k').unwrap();
        sleep(ms(1000)).await;
        assert!(drain(&mut rx).is_empty());

        assert!(!registrar.press(old));
        assert!(registrar.press(new));
        sleep(ms(400)).await;
        assert_eq!(drain(&mut rx), vec![TapAction::SingleTap]);
        assert_eq!(registrar.registered_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsupported_character_keeps_binding() {
        let (registrar, mut dispatcher, mut rx, binding) = setup();

        let err = dispatcher.update_hotkey('é').unwrap_err();
        assert!(matches!(err, HotkeyError::UnsupportedCharacter('é')));
        assert_eq!(dispatcher.current_binding(), Some(binding));

        assert!(registrar.press(binding));
        sleep(ms(400)).await;
        assert_eq!(drain(&mut rx), vec![TapAction::SingleTap]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registration_failure_leaves_no_hotkey() {
        let (registrar, mut dispatcher, _rx, old) = setup();
        registrar.occupy(HotkeyBinding::for_char('K').unwrap());

        let err = dispatcher.update_hotkey('K').unwrap_err();
        assert!(matches!(err, HotkeyError::Registration { .. }));
        assert_eq!(dispatcher.current_binding(), None);
        assert!(!registrar.is_registered(old));
        assert_eq!(registrar.registered_count(), 0);

        // Retrying with a free key recovers
        assert!(dispatcher.update_hotkey('J').is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_callbacks_handler() {
        let singles = Arc::new(AtomicUsize::new(0));
        let doubles = Arc::new(AtomicUsize::new(0));
        let handler = TapCallbacks {
            on_single_tap: {
                let singles = singles.clone();
                move || {
                    singles.fetch_add(1, Ordering::SeqCst);
                }
            },
            on_double_tap: {
                let doubles = doubles.clone();
                move || {
                    doubles.fetch_add(1, Ordering::SeqCst);
                }
            },
        };

        let dispatcher = HotkeyDispatcher::spawn(SimulatedRegistrar::new(), handler, DOUBLE_TAP_WINDOW);
        let pulses = dispatcher.pulse_sender();

        pulses.pulse().unwrap();
        sleep(ms(50)).await;
        pulses.pulse().unwrap();
        sleep(ms(500)).await;
        pulses.pulse().unwrap();
        sleep(ms(500)).await;

        assert_eq!(singles.load(Ordering::SeqCst), 1);
        assert_eq!(doubles.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_unregisters_and_stops() {
        let (registrar, dispatcher, mut rx, binding) = setup();
        let pulses = dispatcher.pulse_sender();

        registrar.press(binding);
        dispatcher.shutdown().await;

        assert!(!registrar.is_registered(binding));
        assert!(matches!(pulses.pulse(), Err(HotkeyError::DispatcherStopped)));
        sleep(ms(1000)).await;
        assert!(drain(&mut rx).is_empty());
    }
}
