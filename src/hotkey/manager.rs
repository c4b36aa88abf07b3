//! Hotkey manager: binding table and chord engine over one key listener
//!
//! All dispatch state (bindings, chord engine, running flag) sits behind a
//! single mutex shared by registration calls, the listener thread and the
//! chord timeout thread. Callbacks are collected while the lock is held and
//! invoked after it is released, so a callback may call back into the
//! manager.
//!
//! The listener handle has its own lifecycle mutex. It is always taken
//! before the state mutex and never from the dispatch path.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, error, info, trace, warn};

use super::bindings::{BindingAction, BindingTable};
use super::callback::{Callback, Pending, Trigger};
use super::combination::Combination;
use super::error::HotkeyError;
use super::keys::{Key, KeyToken};
use super::listener::{
    platform_listener_factory, EventSink, KeyAction, KeyEvent, KeyListener, ListenerFactory,
};
use crate::chord::{ActivatorSpec, ChordEngine, ChordSequence, ChordStep, DisarmReason};
use crate::events::ManagerEvent;

const EVENT_CAPACITY: usize = 64;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Registers hotkeys and chord sequences and dispatches listener events
pub struct HotkeyManager {
    shared: Arc<Shared>,
    lifecycle: Mutex<Lifecycle>,
}

struct Lifecycle {
    factory: ListenerFactory,
    listener: Option<Box<dyn KeyListener>>,
}

struct Shared {
    state: Mutex<DispatchState>,
    events: broadcast::Sender<ManagerEvent>,
}

struct DispatchState {
    /// False while stopped; dispatch drops every event
    running: bool,
    bindings: BindingTable,
    chord: ChordEngine,
}

impl HotkeyManager {
    /// Create a manager that builds a listener with `factory` on each start
    pub fn new(factory: ListenerFactory) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(DispatchState {
                    running: false,
                    bindings: BindingTable::new(),
                    chord: ChordEngine::new(),
                }),
                events,
            }),
            lifecycle: Mutex::new(Lifecycle {
                factory,
                listener: None,
            }),
        }
    }

    /// Create a manager using this platform's keyboard hook
    pub fn with_platform_listener() -> Self {
        Self::new(platform_listener_factory())
    }

    /// Subscribe to manager events
    pub fn subscribe(&self) -> broadcast::Receiver<ManagerEvent> {
        self.shared.events.subscribe()
    }

    /// Whether a listener is currently delivering events
    pub fn is_running(&self) -> bool {
        lock(&self.lifecycle)
            .listener
            .as_ref()
            .map_or(false, |listener| listener.is_running())
    }

    /// Whether the chord engine is waiting for suffix keys
    pub fn is_armed(&self) -> bool {
        lock(&self.shared.state).chord.is_armed()
    }

    /// Start listening. Returns false if already started or if the
    /// listener could not be started.
    pub fn start(&self) -> bool {
        let mut lifecycle = lock(&self.lifecycle);
        if lifecycle.listener.is_some() {
            debug!("hotkey manager already started");
            return false;
        }

        let mut listener = (lifecycle.factory)();
        lock(&self.shared.state).running = true;

        if let Err(e) = listener.start(self.sink()) {
            lock(&self.shared.state).running = false;
            error!(error = %e, "failed to start key listener");
            warn!("continuing without global hotkeys; manual triggers still work");
            return false;
        }
        lifecycle.listener = Some(listener);

        let bindings = lock(&self.shared.state).bindings.len();
        info!(bindings, "hotkey manager started");
        self.shared.emit(ManagerEvent::ListenerStarted { bindings });
        true
    }

    /// Stop listening. Returns false if not running.
    ///
    /// Any armed chord session is dropped and no callback fires after this
    /// returns.
    pub fn stop(&self) -> bool {
        let Some(mut listener) = lock(&self.lifecycle).listener.take() else {
            return false;
        };

        {
            let mut state = lock(&self.shared.state);
            state.running = false;
            state.bindings.reset_matchers();
            if state.chord.disarm(DisarmReason::Stopped) {
                self.shared.emit(ManagerEvent::ChordDisarmed {
                    reason: DisarmReason::Stopped,
                });
            }
        }

        listener.stop();
        info!("hotkey manager stopped");
        self.shared.emit(ManagerEvent::ListenerStopped);
        true
    }

    /// Bind `callback` to a direct key combination
    pub fn register_hotkey(&self, combination: &str, callback: Callback) -> Result<(), HotkeyError> {
        let parsed =
            Combination::parse(combination).map_err(|e| self.shared.reject(combination, e))?;

        let inserted = lock(&self.shared.state).bindings.insert(
            parsed.clone(),
            combination,
            BindingAction::Callback(callback),
        );
        if let Err(e) = inserted {
            return Err(self.shared.reject(combination, e));
        }

        info!(combination = %parsed, "registered hotkey");
        self.shared.emit(ManagerEvent::HotkeyRegistered {
            combination: parsed.to_string(),
        });
        Ok(())
    }

    /// Remove a binding. Returns false if it was not registered.
    pub fn unregister_hotkey(&self, combination: &str) -> bool {
        let Ok(parsed) = Combination::parse(combination) else {
            debug!(combination, "attempted to remove unparseable hotkey");
            return false;
        };

        let removed = lock(&self.shared.state).bindings.remove(&parsed);
        match removed {
            Some(binding) => {
                info!(combination = %parsed, activator = binding.is_activator(), "unregistered hotkey");
                self.shared.emit(ManagerEvent::HotkeyUnregistered {
                    combination: parsed.to_string(),
                });
                true
            }
            None => {
                debug!(combination = %parsed, "attempted to remove unknown hotkey");
                false
            }
        }
    }

    /// Install the chord activator and its sequence map.
    ///
    /// The activator is registered in the binding table, so it cannot
    /// collide with a direct hotkey. Calling this again replaces both the
    /// previous activator binding and the whole sequence map; a session
    /// that is already armed keeps running against the new map.
    pub fn configure_chord_sequences(
        &self,
        activator: &ActivatorSpec,
        sequences: HashMap<ChordSequence, Callback>,
    ) -> Result<(), HotkeyError> {
        if activator.hotkey.trim().is_empty() {
            return Err(HotkeyError::invalid("activator hotkey must be a non-empty string"));
        }
        if sequences.is_empty() {
            return Err(HotkeyError::invalid("chord sequence map must not be empty"));
        }
        let combination = Combination::parse(&activator.hotkey)
            .map_err(|e| self.shared.reject(&activator.hotkey, e))?;

        let count = sequences.len();
        let previous = {
            let mut state = lock(&self.shared.state);
            if state
                .bindings
                .get(&combination)
                .map_or(false, |binding| !binding.is_activator())
            {
                drop(state);
                return Err(self.shared.reject(
                    &activator.hotkey,
                    HotkeyError::DuplicateRegistration {
                        combination: combination.to_string(),
                    },
                ));
            }

            let previous = state.bindings.activator().cloned();
            if let Some(previous) = &previous {
                state.bindings.remove(previous);
            }
            state
                .bindings
                .insert(combination.clone(), &activator.hotkey, BindingAction::Activator)?;
            state
                .chord
                .configure(activator.timeout(), activator.mode, sequences);
            previous
        };

        info!(
            activator = %combination,
            sequences = count,
            mode = %activator.mode,
            timeout_ms = activator.timeout().as_millis() as u64,
            "chord activator configured"
        );
        if previous.as_ref() != Some(&combination) {
            if let Some(previous) = previous {
                self.shared.emit(ManagerEvent::HotkeyUnregistered {
                    combination: previous.to_string(),
                });
            }
            self.shared.emit(ManagerEvent::HotkeyRegistered {
                combination: combination.to_string(),
            });
        }
        Ok(())
    }

    /// Single-key form of [`HotkeyManager::configure_chord_sequences`]:
    /// each suffix key becomes a one-token sequence
    pub fn configure_chord(
        &self,
        activator: &ActivatorSpec,
        suffixes: HashMap<KeyToken, Callback>,
    ) -> Result<(), HotkeyError> {
        let sequences = suffixes
            .into_iter()
            .map(|(token, callback)| (ChordSequence::from(token), callback))
            .collect();
        self.configure_chord_sequences(activator, sequences)
    }

    /// Act as if `combination` had just been pressed. Returns true iff it
    /// is registered; for the activator this arms the chord engine.
    pub fn trigger(&self, combination: &str) -> bool {
        let Ok(parsed) = Combination::parse(combination) else {
            debug!(combination, "cannot trigger unparseable hotkey");
            return false;
        };

        let pending = {
            let mut state = lock(&self.shared.state);
            let action = match state.bindings.get(&parsed) {
                Some(binding) => binding.action().clone(),
                None => {
                    debug!(combination = %parsed, "hotkey not found");
                    return false;
                }
            };
            match action {
                BindingAction::Activator => {
                    self.shared.arm(&mut state);
                    None
                }
                BindingAction::Callback(callback) => {
                    Some(Pending::new(Trigger::Combination(parsed.clone()), callback))
                }
            }
        };

        if let Some(pending) = pending {
            self.shared.emit(ManagerEvent::HotkeyTriggered {
                combination: parsed.to_string(),
            });
            self.shared.invoke(pending);
        }
        true
    }

    /// Combinations as they were registered, activator included
    pub fn registered_combinations(&self) -> Vec<String> {
        lock(&self.shared.state).bindings.labels()
    }

    fn sink(&self) -> EventSink {
        let shared = Arc::downgrade(&self.shared);
        EventSink::new(move |event| {
            if let Some(shared) = shared.upgrade() {
                shared.dispatch(event);
            }
        })
    }
}

impl Drop for HotkeyManager {
    fn drop(&mut self) {
        self.stop();
    }
}

impl Shared {
    fn emit(&self, event: ManagerEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Log and report a refused registration, handing the error back
    fn reject(&self, combination: &str, error: HotkeyError) -> HotkeyError {
        warn!(combination, error = %error, "hotkey registration rejected");
        self.emit(ManagerEvent::RegistrationRejected {
            combination: combination.to_string(),
            reason: error.to_string(),
        });
        error
    }

    /// Arm the chord engine with a timeout that re-enters through a weak
    /// handle, so a pending timer never keeps the manager alive
    fn arm(self: &Arc<Self>, state: &mut DispatchState) {
        let shared = Arc::downgrade(self);
        state.chord.arm(move |session| {
            if let Some(shared) = shared.upgrade() {
                shared.expire(session);
            }
        });
        self.emit(ManagerEvent::ChordArmed {
            timeout_ms: state.chord.timeout().as_millis() as u64,
        });
    }

    fn expire(&self, session: u64) {
        let disarmed = lock(&self.state).chord.expire(session);
        if disarmed {
            self.emit(ManagerEvent::ChordDisarmed {
                reason: DisarmReason::Timeout,
            });
        }
    }

    /// Handle one raw event from the listener
    fn dispatch(self: &Arc<Self>, event: KeyEvent) {
        let pending = {
            let mut state = lock(&self.state);
            if !state.running {
                trace!(?event, "event after stop dropped");
                return;
            }

            let key = Key::from_raw(&event.key);
            let mut pending = Vec::new();

            // Combinations first: the activator arms here, before the same
            // press reaches the chord engine and is absorbed.
            if let Some(key) = key {
                for hit in state.bindings.feed(event.action, key) {
                    match hit.action {
                        BindingAction::Callback(callback) => {
                            debug!(combination = %hit.combination, "hotkey matched");
                            self.emit(ManagerEvent::HotkeyTriggered {
                                combination: hit.combination.to_string(),
                            });
                            pending.push(Pending::new(Trigger::Combination(hit.combination), callback));
                        }
                        BindingAction::Activator => self.arm(&mut state),
                    }
                }
            }

            if event.action == KeyAction::Press && state.chord.is_armed() {
                match state.chord.feed(key.and_then(Key::token)) {
                    ChordStep::Matched { sequence, callback } => {
                        debug!(%sequence, "chord sequence matched");
                        self.emit(ManagerEvent::SequenceMatched {
                            sequence: sequence.to_string(),
                        });
                        self.emit(ManagerEvent::ChordDisarmed {
                            reason: DisarmReason::Matched,
                        });
                        pending.push(Pending::new(Trigger::Sequence(sequence), callback));
                    }
                    ChordStep::Disarmed(reason) => {
                        self.emit(ManagerEvent::ChordDisarmed { reason });
                    }
                    ChordStep::Idle
                    | ChordStep::Absorbed
                    | ChordStep::Ignored
                    | ChordStep::Pending => {}
                }
            }

            pending
        };

        for callback in pending {
            if !self.is_running() {
                debug!(trigger = %callback.trigger, "manager stopped; callback skipped");
                break;
            }
            self.invoke(callback);
        }
    }

    /// The one place user callbacks run; failures never escape
    fn invoke(&self, pending: Pending) {
        match pending.callback.invoke() {
            Ok(()) => trace!(trigger = %pending.trigger, "callback completed"),
            Err(failure) => {
                error!(trigger = %pending.trigger, error = %failure, "hotkey callback failed");
                self.emit(ManagerEvent::CallbackFailed {
                    trigger: pending.trigger.to_string(),
                    message: failure.to_string(),
                });
            }
        }
    }
}
