//! Key event processing
//!
//! [`KeyProcessor`] is the synchronous state machine: it tracks held
//! modifiers, builds combo text, applies exclusion rules and keeps the
//! bounded history. It never touches a clock; instead each [`Reaction`]
//! tells the caller what to do with the held-key timer.
//!
//! [`Processor`] drives it on a single task. The held-key timer is a
//! [`Sleep`] owned by that task and polled in the same `select!` as the
//! input queue, so a timer firing is handled like any other message and all
//! state stays single-writer.
//!
//! # Held keys
//!
//! ```text
//! Pressed(A) ──► show "A", start timer(A)
//!     │
//!     ├── Released(any key) ──► cancel timer, clear current key
//!     ├── Pressed(B) ─────────► show "B", restart timer(B)
//!     └── timer fires, current key still A ──► show "A (held)"
//! ```

use std::collections::{HashSet, VecDeque};
use std::pin::Pin;
use std::time::Duration;

use evdev::Key;
use tapshow_config::Config;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::time::Sleep;

use crate::event::{DisplayEvent, KeyState, RawKeyEvent};
use crate::keys::{Modifier, ModifierSet};
use crate::normalize::normalize;
use crate::shutdown::ShutdownListener;

/// Capacity of the outgoing display event channel
pub const DISPLAY_EVENT_BUFFER: usize = 50;

/// Appended to the text of a key held past the timeout
pub const HELD_SUFFIX: &str = " (held)";

/// Processor settings, fixed at construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Prefix held modifiers to the key name ("Ctrl+A")
    pub combine_modifiers: bool,
    /// Show modifier presses on their own
    pub show_modifier_only: bool,
    /// Emit held indications for long presses and hardware repeat
    pub show_held_keys: bool,
    /// How long a key must stay down before its held indication
    pub held_key_timeout: Duration,
    /// Maximum history length; zero keeps no history
    pub history_count: usize,
    /// Key names or `+`-joined combos that are never shown
    pub excluded_keys: Vec<String>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            combine_modifiers: true,
            show_modifier_only: false,
            show_held_keys: true,
            held_key_timeout: Duration::from_millis(500),
            history_count: 4,
            excluded_keys: Vec::new(),
        }
    }
}

impl From<&Config> for ProcessorConfig {
    fn from(config: &Config) -> Self {
        Self {
            combine_modifiers: config.behavior.combine_modifiers,
            show_modifier_only: config.behavior.show_modifier_only,
            show_held_keys: config.display.show_held_keys,
            held_key_timeout: config.display.held_key_timeout(),
            history_count: config.display.history_count,
            excluded_keys: config.behavior.excluded_keys.clone(),
        }
    }
}

/// What the caller should do with the held-key timer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimerCommand {
    /// Leave any running timer alone
    #[default]
    Keep,
    /// Replace any running timer with one for this key
    Start { code: Key, text: String },
    /// Stop the running timer, if any
    Cancel,
}

/// Outcome of processing one raw event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    pub display: Option<DisplayEvent>,
    pub timer: TimerCommand,
}

/// Processor state machine
#[derive(Debug)]
pub struct KeyProcessor {
    combine_modifiers: bool,
    show_modifier_only: bool,
    show_held_keys: bool,
    history_count: usize,
    /// Normalized exclusion rules
    exclusions: HashSet<String>,
    modifiers: ModifierSet,
    /// Non-modifier key most recently pressed and not yet released
    current_key: Option<Key>,
    history: VecDeque<DisplayEvent>,
}

impl KeyProcessor {
    pub fn new(config: &ProcessorConfig) -> Self {
        Self {
            combine_modifiers: config.combine_modifiers,
            show_modifier_only: config.show_modifier_only,
            show_held_keys: config.show_held_keys,
            history_count: config.history_count,
            exclusions: config.excluded_keys.iter().map(|rule| normalize(rule)).collect(),
            modifiers: ModifierSet::empty(),
            current_key: None,
            // Grows on demand; eviction in `record` bounds it
            history: VecDeque::new(),
        }
    }

    /// Process one raw event.
    ///
    /// An excluded event leaves every piece of state untouched.
    pub fn handle(&mut self, event: &RawKeyEvent) -> Reaction {
        if self.is_excluded(event.name) {
            tracing::trace!("Excluded key {}", event.name);
            return Reaction::default();
        }

        if let Some(modifier) = Modifier::from_key(event.code) {
            return self.handle_modifier(modifier, event);
        }

        match event.state {
            KeyState::Pressed => {
                let text = self.key_text(event.name);
                if self.is_excluded(&text) {
                    tracing::trace!("Excluded combo {}", text);
                    return Reaction::default();
                }

                self.current_key = Some(event.code);
                let display = Some(self.record(DisplayEvent::new(text.clone(), false)));
                let timer = if self.show_held_keys {
                    TimerCommand::Start {
                        code: event.code,
                        text,
                    }
                } else {
                    TimerCommand::Keep
                };

                Reaction { display, timer }
            }
            // Excluded keys never reach here, so releasing one keeps the current key
            KeyState::Released => {
                self.current_key = None;
                Reaction {
                    display: None,
                    timer: TimerCommand::Cancel,
                }
            }
            KeyState::Repeating => {
                if !self.show_held_keys {
                    return Reaction::default();
                }
                let text = self.key_text(event.name);
                if self.is_excluded(&text) {
                    return Reaction::default();
                }
                Reaction {
                    display: Some(DisplayEvent::new(text, true)),
                    timer: TimerCommand::Keep,
                }
            }
        }
    }

    fn handle_modifier(&mut self, modifier: Modifier, event: &RawKeyEvent) -> Reaction {
        match event.state {
            KeyState::Pressed => {
                self.modifiers.insert(modifier.flag());
                if self.show_modifier_only {
                    let display = self.record(DisplayEvent::new(event.name, false));
                    return Reaction {
                        display: Some(display),
                        timer: TimerCommand::Keep,
                    };
                }
            }
            KeyState::Released => self.modifiers.remove(modifier.flag()),
            KeyState::Repeating => {}
        }
        Reaction::default()
    }

    /// Held indication for an expired timer.
    ///
    /// `None` if `code` is no longer the current key.
    pub fn held_expired(&self, code: Key, text: &str) -> Option<DisplayEvent> {
        if self.current_key != Some(code) {
            return None;
        }
        Some(DisplayEvent::new(format!("{}{}", text, HELD_SUFFIX), true))
    }

    pub fn modifiers(&self) -> ModifierSet {
        self.modifiers
    }

    pub fn current_key(&self) -> Option<Key> {
        self.current_key
    }

    /// Copy of the history, oldest first
    pub fn history(&self) -> Vec<DisplayEvent> {
        self.history.iter().cloned().collect()
    }

    fn is_excluded(&self, text: &str) -> bool {
        !self.exclusions.is_empty() && self.exclusions.contains(&normalize(text))
    }

    fn key_text(&self, name: &str) -> String {
        if !self.combine_modifiers || self.modifiers.is_empty() {
            return name.to_string();
        }

        let mut parts: Vec<&str> = self.modifiers.names().collect();
        parts.push(name);
        parts.join("+")
    }

    /// Append a non-held event to the history, evicting the oldest entry
    fn record(&mut self, event: DisplayEvent) -> DisplayEvent {
        if self.history_count > 0 {
            if self.history.len() >= self.history_count {
                self.history.pop_front();
            }
            self.history.push_back(event.clone());
        }
        event
    }
}

/// Read side of the published history
#[derive(Debug, Clone)]
pub struct HistoryReader {
    receiver: watch::Receiver<Vec<DisplayEvent>>,
}

impl HistoryReader {
    /// Owned copy of the latest history, oldest first
    pub fn snapshot(&self) -> Vec<DisplayEvent> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next history change.
    ///
    /// Returns `false` once the processor is gone.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }
}

/// Everything a display needs from the pipeline
#[derive(Debug)]
pub struct DisplayStream {
    pub events: mpsc::Receiver<DisplayEvent>,
    pub history: HistoryReader,
}

struct HeldTimer {
    code: Key,
    text: String,
    sleep: Pin<Box<Sleep>>,
}

/// Async driver around [`KeyProcessor`]
pub struct Processor {
    core: KeyProcessor,
    held_key_timeout: Duration,
    held: Option<HeldTimer>,
    events: mpsc::Sender<DisplayEvent>,
    history: watch::Sender<Vec<DisplayEvent>>,
}

impl Processor {
    pub fn new(config: &ProcessorConfig) -> (Self, DisplayStream) {
        let (events_tx, events_rx) = mpsc::channel(DISPLAY_EVENT_BUFFER);
        let (history_tx, history_rx) = watch::channel(Vec::new());

        let processor = Self {
            core: KeyProcessor::new(config),
            held_key_timeout: config.held_key_timeout,
            held: None,
            events: events_tx,
            history: history_tx,
        };
        let stream = DisplayStream {
            events: events_rx,
            history: HistoryReader {
                receiver: history_rx,
            },
        };

        (processor, stream)
    }

    /// Consume raw events until shutdown or until every reader is gone.
    ///
    /// A pending held timer is dropped on exit.
    pub async fn run(
        mut self,
        mut input: mpsc::Receiver<RawKeyEvent>,
        mut shutdown: ShutdownListener,
    ) {
        tracing::debug!("Processor started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.wait() => break,
                () = held_expiry(&mut self.held) => self.fire_held(),
                event = input.recv() => match event {
                    Some(event) => self.handle(&event),
                    None => {
                        tracing::debug!("All keyboard readers stopped");
                        break;
                    }
                },
            }
        }

        self.held = None;
        tracing::debug!("Processor stopped");
    }

    fn handle(&mut self, event: &RawKeyEvent) {
        let reaction = self.core.handle(event);

        match reaction.timer {
            TimerCommand::Keep => {}
            TimerCommand::Cancel => self.held = None,
            TimerCommand::Start { code, text } => {
                self.held = Some(HeldTimer {
                    code,
                    text,
                    sleep: Box::pin(tokio::time::sleep(self.held_key_timeout)),
                });
            }
        }

        if let Some(display) = reaction.display {
            self.emit(display);
        }
    }

    fn fire_held(&mut self) {
        let Some(timer) = self.held.take() else {
            return;
        };
        if let Some(display) = self.core.held_expired(timer.code, &timer.text) {
            self.emit(display);
        }
    }

    /// Publish the history (for non-held events), then hand the event to
    /// the display without waiting.
    fn emit(&self, event: DisplayEvent) {
        if !event.is_held {
            self.history.send_replace(self.core.history());
        }

        match self.events.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!("Display queue full, dropping {:?}", event.text);
            }
            Err(TrySendError::Closed(_)) => {
                tracing::trace!("Display receiver gone");
            }
        }
    }
}

/// Resolve when the held timer expires; never resolves without one
async fn held_expiry(held: &mut Option<HeldTimer>) {
    match held {
        Some(timer) => timer.sleep.as_mut().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::Shutdown;
    use crate::testing::{named, raw};
    use tokio::task::JoinHandle;

    fn texts(events: &[DisplayEvent]) -> Vec<&str> {
        events.iter().map(|e| e.text.as_str()).collect()
    }

    fn press(p: &mut KeyProcessor, key: Key) -> Reaction {
        p.handle(&raw(key, KeyState::Pressed))
    }

    fn release(p: &mut KeyProcessor, key: Key) -> Reaction {
        p.handle(&raw(key, KeyState::Released))
    }

    fn shown(reaction: &Reaction) -> Option<&str> {
        reaction.display.as_ref().map(|e| e.text.as_str())
    }

    fn excluding(rules: &[&str]) -> ProcessorConfig {
        ProcessorConfig {
            excluded_keys: rules.iter().map(|r| r.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_ctrl_a_combines() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());

        assert_eq!(press(&mut p, Key::KEY_LEFTCTRL), Reaction::default());
        let reaction = press(&mut p, Key::KEY_A);

        assert_eq!(shown(&reaction), Some("Ctrl+A"));
        assert!(!reaction.display.as_ref().unwrap().is_held);
        assert_eq!(
            reaction.timer,
            TimerCommand::Start {
                code: Key::KEY_A,
                text: "Ctrl+A".to_string()
            }
        );
    }

    #[test]
    fn test_modifier_display_order() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        press(&mut p, Key::KEY_RIGHTMETA);
        press(&mut p, Key::KEY_LEFTSHIFT);
        press(&mut p, Key::KEY_RIGHTALT);
        press(&mut p, Key::KEY_RIGHTCTRL);

        assert_eq!(shown(&press(&mut p, Key::KEY_T)), Some("Ctrl+Alt+Shift+Super+T"));
    }

    #[test]
    fn test_modifier_release_clears_bit() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        press(&mut p, Key::KEY_LEFTCTRL);
        press(&mut p, Key::KEY_LEFTSHIFT);
        release(&mut p, Key::KEY_LEFTCTRL);

        assert_eq!(p.modifiers(), ModifierSet::SHIFT);
        assert_eq!(shown(&press(&mut p, Key::KEY_X)), Some("Shift+X"));

        release(&mut p, Key::KEY_LEFTSHIFT);
        assert!(p.modifiers().is_empty());
        assert_eq!(shown(&press(&mut p, Key::KEY_X)), Some("X"));
    }

    #[test]
    fn test_left_and_right_share_a_modifier() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        press(&mut p, Key::KEY_LEFTCTRL);
        press(&mut p, Key::KEY_RIGHTCTRL);
        release(&mut p, Key::KEY_RIGHTCTRL);

        // One release clears the shared bit
        assert!(p.modifiers().is_empty());
    }

    #[test]
    fn test_combine_disabled_shows_key_alone() {
        let mut p = KeyProcessor::new(&ProcessorConfig {
            combine_modifiers: false,
            ..Default::default()
        });
        press(&mut p, Key::KEY_LEFTCTRL);

        assert_eq!(shown(&press(&mut p, Key::KEY_C)), Some("C"));
        assert_eq!(p.modifiers(), ModifierSet::CTRL);
    }

    #[test]
    fn test_history_evicts_oldest() {
        let mut p = KeyProcessor::new(&ProcessorConfig {
            history_count: 3,
            ..Default::default()
        });

        for key in [Key::KEY_A, Key::KEY_B, Key::KEY_C, Key::KEY_D] {
            press(&mut p, key);
            release(&mut p, key);
            assert!(p.history().len() <= 3);
        }

        assert_eq!(texts(&p.history()), vec!["B", "C", "D"]);
    }

    #[test]
    fn test_zero_history_stores_nothing() {
        let mut p = KeyProcessor::new(&ProcessorConfig {
            history_count: 0,
            ..Default::default()
        });

        assert_eq!(shown(&press(&mut p, Key::KEY_A)), Some("A"));
        assert!(p.history().is_empty());
    }

    #[test]
    fn test_single_key_exclusion() {
        let mut p = KeyProcessor::new(&excluding(&["CapsLock"]));

        assert_eq!(press(&mut p, Key::KEY_CAPSLOCK), Reaction::default());
        assert_eq!(release(&mut p, Key::KEY_CAPSLOCK), Reaction::default());
        assert_eq!(shown(&press(&mut p, Key::KEY_A)), Some("A"));
        assert_eq!(texts(&p.history()), vec!["A"]);
    }

    #[test]
    fn test_exclusion_is_case_insensitive() {
        let mut p = KeyProcessor::new(&excluding(&["  capslock "]));
        assert_eq!(press(&mut p, Key::KEY_CAPSLOCK), Reaction::default());
    }

    #[test]
    fn test_combo_exclusion_only_suppresses_that_combo() {
        let mut p = KeyProcessor::new(&excluding(&["Ctrl+Shift+S"]));

        press(&mut p, Key::KEY_LEFTCTRL);
        press(&mut p, Key::KEY_LEFTSHIFT);
        assert_eq!(press(&mut p, Key::KEY_S), Reaction::default());
        release(&mut p, Key::KEY_S);
        release(&mut p, Key::KEY_LEFTSHIFT);

        assert_eq!(shown(&press(&mut p, Key::KEY_A)), Some("Ctrl+A"));
        assert_eq!(texts(&p.history()), vec!["Ctrl+A"]);
    }

    #[test]
    fn test_combo_rule_in_any_order() {
        let mut p = KeyProcessor::new(&excluding(&["s + SHIFT + ctrl"]));
        press(&mut p, Key::KEY_LEFTSHIFT);
        press(&mut p, Key::KEY_LEFTCTRL);
        assert_eq!(press(&mut p, Key::KEY_S), Reaction::default());
    }

    #[test]
    fn test_excluded_combo_leaves_timer_and_current_key() {
        let mut p = KeyProcessor::new(&excluding(&["Ctrl+S"]));
        press(&mut p, Key::KEY_A);
        press(&mut p, Key::KEY_LEFTCTRL);

        assert_eq!(press(&mut p, Key::KEY_S), Reaction::default());
        assert_eq!(p.current_key(), Some(Key::KEY_A));
    }

    #[test]
    fn test_excluded_modifier_is_not_tracked() {
        let mut p = KeyProcessor::new(&excluding(&["Ctrl"]));
        press(&mut p, Key::KEY_LEFTCTRL);

        assert!(p.modifiers().is_empty());
        assert_eq!(shown(&press(&mut p, Key::KEY_A)), Some("A"));
    }

    #[test]
    fn test_combo_rule_needs_combined_text() {
        let mut p = KeyProcessor::new(&ProcessorConfig {
            combine_modifiers: false,
            ..excluding(&["Ctrl+S"])
        });
        press(&mut p, Key::KEY_LEFTCTRL);

        assert_eq!(shown(&press(&mut p, Key::KEY_S)), Some("S"));
    }

    #[test]
    fn test_modifier_only() {
        let mut p = KeyProcessor::new(&ProcessorConfig {
            show_modifier_only: true,
            ..Default::default()
        });

        let reaction = press(&mut p, Key::KEY_LEFTSHIFT);
        assert_eq!(shown(&reaction), Some("Shift"));
        assert_eq!(reaction.timer, TimerCommand::Keep);
        assert_eq!(release(&mut p, Key::KEY_LEFTSHIFT), Reaction::default());
        assert_eq!(texts(&p.history()), vec!["Shift"]);
    }

    #[test]
    fn test_modifier_only_disabled_by_default() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        assert_eq!(press(&mut p, Key::KEY_LEFTALT), Reaction::default());
        assert!(p.history().is_empty());
    }

    #[test]
    fn test_release_cancels_and_clears_current() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        press(&mut p, Key::KEY_A);
        assert_eq!(p.current_key(), Some(Key::KEY_A));

        let reaction = release(&mut p, Key::KEY_A);
        assert_eq!(reaction.display, None);
        assert_eq!(reaction.timer, TimerCommand::Cancel);
        assert_eq!(p.current_key(), None);
    }

    #[test]
    fn test_held_expired_requires_current_key() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        press(&mut p, Key::KEY_A);

        let held = p.held_expired(Key::KEY_A, "A").unwrap();
        assert_eq!(held.text, "A (held)");
        assert!(held.is_held);

        press(&mut p, Key::KEY_B);
        assert!(p.held_expired(Key::KEY_A, "A").is_none());

        release(&mut p, Key::KEY_B);
        assert!(p.held_expired(Key::KEY_B, "B").is_none());
    }

    #[test]
    fn test_held_events_skip_history() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        press(&mut p, Key::KEY_A);
        p.held_expired(Key::KEY_A, "A");
        p.handle(&raw(Key::KEY_A, KeyState::Repeating));

        assert_eq!(texts(&p.history()), vec!["A"]);
    }

    #[test]
    fn test_repeat_emits_held_text_immediately() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        press(&mut p, Key::KEY_LEFTCTRL);
        press(&mut p, Key::KEY_Z);

        let reaction = p.handle(&raw(Key::KEY_Z, KeyState::Repeating));
        let display = reaction.display.unwrap();
        assert_eq!(display.text, "Ctrl+Z");
        assert!(display.is_held);
        assert_eq!(reaction.timer, TimerCommand::Keep);
    }

    #[test]
    fn test_held_keys_disabled() {
        let mut p = KeyProcessor::new(&ProcessorConfig {
            show_held_keys: false,
            ..Default::default()
        });

        assert_eq!(press(&mut p, Key::KEY_A).timer, TimerCommand::Keep);
        assert_eq!(
            p.handle(&raw(Key::KEY_A, KeyState::Repeating)),
            Reaction::default()
        );
    }

    #[test]
    fn test_unusual_names_pass_through() {
        let mut p = KeyProcessor::new(&ProcessorConfig::default());
        let reaction = p.handle(&named(Key::KEY_A, "Mystery", KeyState::Pressed));
        assert_eq!(shown(&reaction), Some("Mystery"));
    }

    #[test]
    fn test_huge_history_count_is_not_preallocated() {
        let config = tapshow_config::parse_config_str("display {\n history-count 9223372036854775807\n}")
            .unwrap();
        let mut p = KeyProcessor::new(&ProcessorConfig::from(&config));

        assert_eq!(shown(&press(&mut p, Key::KEY_A)), Some("A"));
        assert_eq!(texts(&p.history()), vec!["A"]);
    }

    #[test]
    fn test_excluded_release_keeps_current_key() {
        let mut p = KeyProcessor::new(&excluding(&["CapsLock"]));
        press(&mut p, Key::KEY_A);
        press(&mut p, Key::KEY_CAPSLOCK);
        release(&mut p, Key::KEY_CAPSLOCK);

        assert_eq!(p.current_key(), Some(Key::KEY_A));
        assert!(p.held_expired(Key::KEY_A, "A").is_some());
    }

    #[test]
    fn test_config_mapping() {
        let mut config = Config::default();
        config.display.held_key_timeout_ms = 750;
        config.display.history_count = 9;
        config.behavior.show_modifier_only = true;
        config.behavior.excluded_keys = vec!["CapsLock".to_string()];

        let mapped = ProcessorConfig::from(&config);
        assert_eq!(mapped.held_key_timeout, Duration::from_millis(750));
        assert_eq!(mapped.history_count, 9);
        assert!(mapped.show_modifier_only);
        assert!(mapped.combine_modifiers);
        assert_eq!(mapped.excluded_keys, vec!["CapsLock"]);

        assert_eq!(ProcessorConfig::from(&Config::default()), ProcessorConfig::default());
    }

    struct Harness {
        input: mpsc::Sender<RawKeyEvent>,
        stream: DisplayStream,
        shutdown: Shutdown,
        task: JoinHandle<()>,
    }

    impl Harness {
        fn spawn(config: ProcessorConfig) -> Self {
            let (input, rx) = mpsc::channel(crate::reader::RAW_EVENT_BUFFER);
            let (processor, stream) = Processor::new(&config);
            let shutdown = Shutdown::new();
            let task = tokio::spawn(processor.run(rx, shutdown.subscribe()));
            Self {
                input,
                stream,
                shutdown,
                task,
            }
        }

        async fn send(&self, key: Key, state: KeyState) {
            self.input.send(raw(key, state)).await.unwrap();
        }

        /// Let the processor drain its queue, then collect what it emitted
        async fn drain(&mut self) -> Vec<DisplayEvent> {
            tokio::time::sleep(Duration::from_millis(1)).await;
            let mut out = Vec::new();
            while let Ok(event) = self.stream.events.try_recv() {
                out.push(event);
            }
            out
        }

        async fn stop(self) {
            self.shutdown.trigger();
            self.task.await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_emits_ctrl_a_and_publishes_history() {
        let mut h = Harness::spawn(ProcessorConfig::default());
        h.send(Key::KEY_LEFTCTRL, KeyState::Pressed).await;
        h.send(Key::KEY_A, KeyState::Pressed).await;

        let events = h.drain().await;
        assert_eq!(texts(&events), vec!["Ctrl+A"]);
        assert_eq!(texts(&h.stream.history.snapshot()), vec!["Ctrl+A"]);

        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_driver_history_window() {
        let mut h = Harness::spawn(ProcessorConfig {
            history_count: 3,
            show_held_keys: false,
            ..Default::default()
        });
        for key in [Key::KEY_A, Key::KEY_B, Key::KEY_C, Key::KEY_D] {
            h.send(key, KeyState::Pressed).await;
            h.send(key, KeyState::Released).await;
        }

        assert_eq!(texts(&h.drain().await), vec!["A", "B", "C", "D"]);
        assert_eq!(texts(&h.stream.history.snapshot()), vec!["B", "C", "D"]);

        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_holding_past_timeout_yields_one_held_event() {
        let mut h = Harness::spawn(ProcessorConfig::default());
        h.send(Key::KEY_A, KeyState::Pressed).await;

        tokio::time::sleep(Duration::from_millis(2000)).await;
        let events = h.drain().await;

        assert_eq!(texts(&events), vec!["A", "A (held)"]);
        assert!(events[1].is_held);
        assert_eq!(texts(&h.stream.history.snapshot()), vec!["A"]);

        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_release_before_timeout_yields_no_held_event() {
        let mut h = Harness::spawn(ProcessorConfig::default());
        h.send(Key::KEY_A, KeyState::Pressed).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        h.send(Key::KEY_A, KeyState::Released).await;

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(texts(&h.drain().await), vec!["A"]);

        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_press_replaces_held_timer() {
        let mut h = Harness::spawn(ProcessorConfig::default());
        h.send(Key::KEY_A, KeyState::Pressed).await;
        tokio::time::sleep(Duration::from_millis(300)).await;
        h.send(Key::KEY_B, KeyState::Pressed).await;

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(texts(&h.drain().await), vec!["A", "B", "B (held)"]);

        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_excluded_press_does_not_touch_timer() {
        let mut h = Harness::spawn(excluding(&["CapsLock"]));
        h.send(Key::KEY_A, KeyState::Pressed).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        h.send(Key::KEY_CAPSLOCK, KeyState::Pressed).await;
        h.send(Key::KEY_CAPSLOCK, KeyState::Released).await;

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(texts(&h.drain().await), vec!["A", "A (held)"]);

        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_display_queue_drops() {
        let mut h = Harness::spawn(ProcessorConfig {
            show_held_keys: false,
            ..Default::default()
        });
        for _ in 0..DISPLAY_EVENT_BUFFER + 10 {
            h.send(Key::KEY_A, KeyState::Pressed).await;
        }

        assert_eq!(h.drain().await.len(), DISPLAY_EVENT_BUFFER);
        h.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_input_closes() {
        let h = Harness::spawn(ProcessorConfig::default());
        drop(h.input);
        h.task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_drops_pending_timer() {
        let mut h = Harness::spawn(ProcessorConfig::default());
        h.send(Key::KEY_A, KeyState::Pressed).await;
        assert_eq!(texts(&h.drain().await), vec!["A"]);

        h.shutdown.trigger();
        h.shutdown.trigger();
        (&mut h.task).await.unwrap();

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert!(h.stream.events.try_recv().is_err());
    }
}
