//! Chord engine state machine
//!
//! Two states, Disarmed and Armed. The activator binding arms the engine;
//! while armed each key press extends the buffer until it exactly matches a
//! registered sequence, stops being a prefix of any, is cancelled with ESC,
//! or the arming window runs out.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, trace};

use super::activator::{ActivatorMode, DEFAULT_TIMEOUT_MS};
use super::sequence::ChordSequence;
use super::timer::ArmTimer;
use crate::hotkey::{Callback, KeyToken};

/// Why an armed session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisarmReason {
    /// A sequence matched and its callback was scheduled
    Matched,
    /// ESC was pressed
    Cancelled,
    /// The buffer stopped being a prefix of any sequence
    NoMatch,
    /// The arming window elapsed
    Timeout,
    /// The manager stopped listening
    Stopped,
}

impl fmt::Display for DisarmReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisarmReason::Matched => "matched",
            DisarmReason::Cancelled => "cancelled",
            DisarmReason::NoMatch => "no_match",
            DisarmReason::Timeout => "timeout",
            DisarmReason::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Outcome of feeding one key press to an armed engine
#[derive(Debug)]
pub enum ChordStep {
    /// Engine was not armed
    Idle,
    /// The activator's own keystroke was swallowed
    Absorbed,
    /// Key has no token; nothing changed
    Ignored,
    /// Buffer is a strict prefix of a longer sequence
    Pending,
    /// Buffer matched a sequence; the engine is now disarmed
    Matched {
        sequence: ChordSequence,
        callback: Callback,
    },
    /// Session ended without a match
    Disarmed(DisarmReason),
}

/// Leader-key state machine
pub struct ChordEngine {
    timeout: Duration,
    mode: ActivatorMode,
    sequences: HashMap<ChordSequence, Callback>,
    armed: bool,
    buffer: Vec<KeyToken>,
    /// Swallow the press that completed the activator combination
    ignore_next: bool,
    /// Incremented on every arm so stale timers can be recognized
    session: u64,
    timer: Option<ArmTimer>,
}

impl Default for ChordEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChordEngine {
    pub fn new() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            mode: ActivatorMode::Press,
            sequences: HashMap::new(),
            armed: false,
            buffer: Vec::new(),
            ignore_next: false,
            session: 0,
            timer: None,
        }
    }

    /// Replace the sequence map and arming window.
    ///
    /// An in-flight session is left armed and resolves against the new map.
    pub fn configure(
        &mut self,
        timeout: Duration,
        mode: ActivatorMode,
        sequences: HashMap<ChordSequence, Callback>,
    ) {
        if mode == ActivatorMode::Hold {
            debug!("activator mode 'hold' arms like 'press'");
        }
        if self.armed {
            debug!("chord sequences replaced while armed");
        }
        self.timeout = timeout;
        self.mode = mode;
        self.sequences = sequences;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn buffer(&self) -> &[KeyToken] {
        &self.buffer
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn mode(&self) -> ActivatorMode {
        self.mode
    }

    pub fn sequence_count(&self) -> usize {
        self.sequences.len()
    }

    /// Enter Armed, restarting the session if already armed.
    ///
    /// `on_expire` runs on the timer thread with the session id it was
    /// armed for; pass that id back to [`ChordEngine::expire`].
    pub fn arm<F>(&mut self, on_expire: F) -> u64
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.timer = None;
        self.session = self.session.wrapping_add(1);
        self.armed = true;
        self.buffer.clear();
        self.ignore_next = true;

        let session = self.session;
        match ArmTimer::start(self.timeout, move || on_expire(session)) {
            Ok(timer) => self.timer = Some(timer),
            Err(e) => error!(?e, "failed to start chord timeout; session ends on next key"),
        }

        debug!(
            session,
            timeout_ms = self.timeout.as_millis() as u64,
            "activator armed"
        );
        session
    }

    /// Run the Armed transition for one key press
    pub fn feed(&mut self, token: Option<KeyToken>) -> ChordStep {
        if !self.armed {
            return ChordStep::Idle;
        }

        if self.ignore_next {
            self.ignore_next = false;
            return ChordStep::Absorbed;
        }

        let Some(token) = token else {
            return ChordStep::Ignored;
        };

        if token.is_esc() {
            self.disarm(DisarmReason::Cancelled);
            return ChordStep::Disarmed(DisarmReason::Cancelled);
        }

        self.buffer.push(token);
        trace!(buffer = ?self.buffer, "chord buffer extended");

        let exact = self
            .sequences
            .iter()
            .find(|(seq, _)| seq.tokens() == self.buffer.as_slice())
            .map(|(seq, cb)| (seq.clone(), cb.clone()));
        if let Some((sequence, callback)) = exact {
            self.disarm(DisarmReason::Matched);
            return ChordStep::Matched { sequence, callback };
        }

        if self.sequences.keys().any(|seq| seq.extends(&self.buffer)) {
            return ChordStep::Pending;
        }

        self.disarm(DisarmReason::NoMatch);
        ChordStep::Disarmed(DisarmReason::NoMatch)
    }

    /// Handle timer expiry for `session`; a no-op if that session already
    /// ended. Returns true if this call disarmed the engine.
    pub fn expire(&mut self, session: u64) -> bool {
        if !self.armed || self.session != session {
            trace!(session, current = self.session, "stale chord timeout ignored");
            return false;
        }
        self.disarm(DisarmReason::Timeout)
    }

    /// Leave Armed, clearing the buffer and cancelling the timer. Returns
    /// true if the engine was armed.
    pub fn disarm(&mut self, reason: DisarmReason) -> bool {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        let was_armed = self.armed;
        self.armed = false;
        self.buffer.clear();
        self.ignore_next = false;

        if was_armed {
            debug!(%reason, session = self.session, "activator disarmed");
        }
        was_armed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::thread;

    fn tok(c: char) -> Option<KeyToken> {
        Some(KeyToken::Char(c))
    }

    fn counting() -> (Callback, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let cb = Callback::from_fn(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        (cb, hits)
    }

    fn engine_with(seqs: &[&[&str]], timeout_ms: u64) -> ChordEngine {
        let mut engine = ChordEngine::new();
        let map = seqs
            .iter()
            .map(|s| (ChordSequence::parse(s.iter()).unwrap(), Callback::from_fn(|| {})))
            .collect();
        engine.configure(Duration::from_millis(timeout_ms), ActivatorMode::Press, map);
        engine
    }

    fn arm(engine: &mut ChordEngine) -> u64 {
        engine.arm(|_| {})
    }

    #[test]
    fn test_initial_state() {
        let mut engine = ChordEngine::new();
        assert!(!engine.is_armed());
        assert!(matches!(engine.feed(tok('g')), ChordStep::Idle));
    }

    #[test]
    fn test_exact_match_disarms() {
        let (cb_a, hits) = counting();
        let mut engine = ChordEngine::new();
        let mut map = HashMap::new();
        map.insert(ChordSequence::parse(["g", "h"]).unwrap(), cb_a);
        map.insert(ChordSequence::parse(["g", "k"]).unwrap(), Callback::from_fn(|| {}));
        engine.configure(Duration::from_secs(5), ActivatorMode::Press, map);

        arm(&mut engine);
        assert!(matches!(engine.feed(tok('a')), ChordStep::Absorbed));
        assert!(matches!(engine.feed(tok('g')), ChordStep::Pending));
        assert_eq!(engine.buffer(), &[KeyToken::Char('g')]);

        match engine.feed(tok('h')) {
            ChordStep::Matched { sequence, callback } => {
                assert_eq!(sequence.to_string(), "g+h");
                callback.invoke().unwrap();
            }
            other => panic!("expected match, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!engine.is_armed());
        assert!(engine.buffer().is_empty());
    }

    #[test]
    fn test_exact_match_wins_over_longer_prefix() {
        let mut engine = engine_with(&[&["g"], &["g", "h"]], 5000);
        arm(&mut engine);
        engine.feed(None);
        assert!(matches!(engine.feed(tok('g')), ChordStep::Matched { .. }));
        assert!(!engine.is_armed());
    }

    #[test]
    fn test_non_prefix_disarms() {
        let mut engine = engine_with(&[&["g", "h"]], 5000);
        arm(&mut engine);
        engine.feed(None);
        assert!(matches!(
            engine.feed(tok('z')),
            ChordStep::Disarmed(DisarmReason::NoMatch)
        ));
        assert!(!engine.is_armed());
        assert!(matches!(engine.feed(tok('g')), ChordStep::Idle));
    }

    #[test]
    fn test_esc_cancels() {
        let mut engine = engine_with(&[&["g", "h"]], 5000);
        arm(&mut engine);
        engine.feed(None);
        engine.feed(tok('g'));
        let esc = KeyToken::parse("esc");
        assert!(matches!(
            engine.feed(esc),
            ChordStep::Disarmed(DisarmReason::Cancelled)
        ));
        assert!(engine.buffer().is_empty());
    }

    #[test]
    fn test_unmapped_token_ignored() {
        let mut engine = engine_with(&[&["g", "h"]], 5000);
        arm(&mut engine);
        assert!(matches!(engine.feed(None), ChordStep::Absorbed));
        assert!(matches!(engine.feed(None), ChordStep::Ignored));
        assert!(engine.is_armed());
        assert!(engine.buffer().is_empty());
    }

    #[test]
    fn test_rearm_resets_buffer() {
        let mut engine = engine_with(&[&["g", "h"]], 5000);
        let first = arm(&mut engine);
        engine.feed(None);
        engine.feed(tok('g'));
        let second = arm(&mut engine);
        assert_ne!(first, second);
        assert!(engine.buffer().is_empty());
        assert!(!engine.expire(first));
        assert!(engine.is_armed());
    }

    #[test]
    fn test_expire_only_current_session() {
        let mut engine = engine_with(&[&["g", "h"]], 5000);
        let session = arm(&mut engine);
        assert!(engine.expire(session));
        assert!(!engine.is_armed());
        assert!(!engine.expire(session));
    }

    #[test]
    fn test_timer_reports_session() {
        let mut engine = engine_with(&[&["g", "h"]], 100);
        let fired = Arc::new(Mutex::new(None));
        let out = Arc::clone(&fired);
        let session = engine.arm(move |s| *out.lock().unwrap() = Some(s));

        thread::sleep(Duration::from_millis(400));
        assert_eq!(*fired.lock().unwrap(), Some(session));
    }

    #[test]
    fn test_disarm_cancels_timer() {
        let mut engine = engine_with(&[&["g", "h"]], 100);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        engine.arm(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(engine.disarm(DisarmReason::Stopped));
        assert!(!engine.disarm(DisarmReason::Stopped));

        thread::sleep(Duration::from_millis(300));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reconfigure_while_armed_keeps_session() {
        let mut engine = engine_with(&[&["g", "h"]], 5000);
        arm(&mut engine);
        engine.feed(None);
        assert!(matches!(engine.feed(tok('x')), ChordStep::Disarmed(_)));

        arm(&mut engine);
        engine.feed(None);
        let mut map = HashMap::new();
        map.insert(ChordSequence::parse(["x"]).unwrap(), Callback::from_fn(|| {}));
        engine.configure(Duration::from_secs(5), ActivatorMode::Hold, map);
        assert!(engine.is_armed());
        assert!(matches!(engine.feed(tok('x')), ChordStep::Matched { .. }));
        assert_eq!(engine.mode(), ActivatorMode::Hold);
    }
}
