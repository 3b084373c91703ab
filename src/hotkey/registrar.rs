use crate::hotkey::dispatcher::Command;
use crate::hotkey::{HotkeyBinding, HotkeyError};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Opaque handle for a registered OS hotkey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HotkeyHandle(pub u64);

/// Delivers "the key combo fired" pulses to the dispatcher. Cheap to clone and
/// safe to call from whatever thread the OS event handler runs on.
#[derive(Debug, Clone)]
pub struct PulseSender {
    tx: mpsc::UnboundedSender<Command>,
}

impl PulseSender {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Command>) -> Self {
        Self { tx }
    }

    /// Report one activation, timestamped now
    pub fn pulse(&self) -> Result<(), HotkeyError> {
        self.pulse_at(Instant::now())
    }

    pub fn pulse_at(&self, at: Instant) -> Result<(), HotkeyError> {
        self.tx
            .send(Command::Pulse(at))
            .map_err(|_| HotkeyError::DispatcherStopped)
    }
}

/// OS-level global hotkey registration
pub trait HotkeyRegistrar: Send {
    /// Register `binding`; the OS handler calls `pulses.pulse()` on each activation
    fn register(
        &mut self,
        binding: HotkeyBinding,
        pulses: PulseSender,
    ) -> Result<HotkeyHandle, HotkeyError>;

    /// Release the OS handle. Unknown handles are ignored.
    fn unregister(&mut self, handle: HotkeyHandle);
}

#[derive(Default)]
struct SimulatedState {
    next_handle: u64,
    registered: HashMap<HotkeyHandle, (HotkeyBinding, PulseSender)>,
    /// Bindings claimed by some other application
    occupied: HashSet<HotkeyBinding>,
}

/// In-process registrar. Hosts that receive key events themselves feed them
/// through `press`; tests use it to stand in for the OS.
#[derive(Clone, Default)]
pub struct SimulatedRegistrar {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `binding` as taken elsewhere so registering it fails
    pub fn occupy(&self, binding: HotkeyBinding) {
        self.with_state(|state| {
            state.occupied.insert(binding);
        });
    }

    /// Fire `binding`. Returns false when nothing is registered for it.
    pub fn press(&self, binding: HotkeyBinding) -> bool {
        let senders: Vec<PulseSender> = self.with_state(|state| {
            state
                .registered
                .values()
                .filter(|(b, _)| *b == binding)
                .map(|(_, sender)| sender.clone())
                .collect()
        });

        let now = Instant::now();
        senders.iter().any(|sender| sender.pulse_at(now).is_ok())
    }

    pub fn is_registered(&self, binding: HotkeyBinding) -> bool {
        self.with_state(|state| state.registered.values().any(|(b, _)| *b == binding))
    }

    pub fn registered_count(&self) -> usize {
        self.with_state(|state| state.registered.len())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut SimulatedState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }
}

impl HotkeyRegistrar for SimulatedRegistrar {
    fn register(
        &mut self,
        binding: HotkeyBinding,
        pulses: PulseSender,
    ) -> Result<HotkeyHandle, HotkeyError> {
        self.with_state(|state| {
            let taken = state.occupied.contains(&binding)
                || state.registered.values().any(|(b, _)| *b == binding);
            if taken {
                return Err(HotkeyError::Registration {
                    binding,
                    reason: "hotkey already registered".to_string(),
                });
            }

            let handle = HotkeyHandle(state.next_handle);
            state.next_handle += 1;
            state.registered.insert(handle, (binding, pulses));
            Ok(handle)
        })
    }

    fn unregister(&mut self, handle: HotkeyHandle) {
        self.with_state(|state| {
            state.registered.remove(&handle);
        });
    }
}
