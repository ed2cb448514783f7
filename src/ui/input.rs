/// Keyboard front-end.
///
/// Drains crossterm events once per frame and feeds key-down/key-up edges
/// into the simulation's `InputTracker`, so the core only ever sees
/// held/pressed/released sets.
///
/// Uses crossterm's keyboard enhancement for Release events when available.
/// Falls back to timeout-based release detection on terminals that don't
/// support it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::input::{InputTracker, KeyId, NamedKey};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

/// Keys the match layer reacts to outside the simulation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MetaKey {
    Quit,
    Pause,
    Restart,
}

/// Map a terminal key to a logical key id. Keys the game never binds
/// (function keys, Esc, ...) map to nothing.
pub fn key_id(code: KeyCode) -> Option<KeyId> {
    match code {
        KeyCode::Char(' ') => Some(KeyId::named(NamedKey::Space)),
        KeyCode::Char(c) => Some(KeyId::char(c)),
        KeyCode::Left => Some(KeyId::named(NamedKey::Left)),
        KeyCode::Right => Some(KeyId::named(NamedKey::Right)),
        KeyCode::Up => Some(KeyId::named(NamedKey::Up)),
        KeyCode::Down => Some(KeyId::named(NamedKey::Down)),
        KeyCode::Enter => Some(KeyId::named(NamedKey::Enter)),
        KeyCode::Tab => Some(KeyId::named(NamedKey::Tab)),
        KeyCode::Backspace => Some(KeyId::named(NamedKey::Backspace)),
        _ => None,
    }
}

pub struct KeyboardState {
    /// Timestamp of last Press/Repeat event for each held key.
    last_active: HashMap<KeyId, Instant>,

    /// Raw key events collected during drain, for meta-key handling.
    raw_events: Vec<KeyEvent>,

    /// Whether to honor Release events. Only true when keyboard
    /// enhancement is confirmed working.
    pub honor_release: bool,
}

impl KeyboardState {
    pub fn new() -> Self {
        KeyboardState {
            last_active: HashMap::with_capacity(16),
            raw_events: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events into `tracker`.
    /// Call this once per frame, before the simulation tick.
    pub fn drain_events(&mut self, tracker: &mut InputTracker) {
        self.raw_events.clear();

        // Read all available events without blocking
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.raw_events.push(key);
                self.apply(key, Instant::now(), tracker);
            }
        }

        self.expire(Instant::now(), tracker);
    }

    fn apply(&mut self, key: KeyEvent, now: Instant, tracker: &mut InputTracker) {
        let Some(id) = key_id(key.code) else { return };
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&id);
                tracker.key_up(id);
            }
            // Without confirmed enhancement, rely on timeout-based expiry.
            KeyEventKind::Release => {}
            _ => {
                self.last_active.insert(id, now);
                tracker.key_down(id);
            }
        }
    }

    /// Release keys that have not repeated within the hold timeout.
    fn expire(&mut self, now: Instant, tracker: &mut InputTracker) {
        self.last_active.retain(|id, t| {
            let live = now.duration_since(*t) < HOLD_TIMEOUT;
            if !live {
                tracker.key_up(*id);
            }
            live
        });
    }

    /// Forget every held key (match restart, focus loss).
    pub fn reset(&mut self, tracker: &mut InputTracker) {
        self.last_active.clear();
        tracker.reset();
    }

    /// Meta keys pressed this frame, in arrival order. With `menu_open`
    /// (paused or game over) the plain `r` and `q` keys act too, since no
    /// player input is being read.
    pub fn meta_keys(&self, menu_open: bool) -> Vec<MetaKey> {
        self.raw_events
            .iter()
            .filter(|k| k.kind != KeyEventKind::Release)
            .filter_map(|k| meta_for(k, menu_open))
            .collect()
    }
}

fn meta_for(k: &KeyEvent, menu_open: bool) -> Option<MetaKey> {
    let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
    match k.code {
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl => Some(MetaKey::Quit),
        KeyCode::Char('q') | KeyCode::Char('Q') if menu_open => Some(MetaKey::Quit),
        KeyCode::Char('r') | KeyCode::Char('R') if menu_open => Some(MetaKey::Restart),
        KeyCode::Esc => Some(MetaKey::Pause),
        KeyCode::F(1) => Some(MetaKey::Pause),
        KeyCode::F(2) => Some(MetaKey::Restart),
        KeyCode::F(10) => Some(MetaKey::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(c: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(c, KeyModifiers::NONE, KeyEventKind::Press)
    }

    fn release(c: KeyCode) -> KeyEvent {
        KeyEvent::new_with_kind(c, KeyModifiers::NONE, KeyEventKind::Release)
    }

    #[test]
    fn maps_terminal_keys() {
        assert_eq!(key_id(KeyCode::Char('W')), Some(KeyId::char('w')));
        assert_eq!(key_id(KeyCode::Left), Some(KeyId::named(NamedKey::Left)));
        assert_eq!(key_id(KeyCode::Char(' ')), Some(KeyId::named(NamedKey::Space)));
        assert_eq!(key_id(KeyCode::Esc), None);
    }

    #[test]
    fn release_event_ends_hold_when_honored() {
        let mut kb = KeyboardState::new();
        kb.honor_release = true;
        let mut tr = InputTracker::new();
        let now = Instant::now();
        kb.apply(press(KeyCode::Char('a')), now, &mut tr);
        assert!(tr.frame().is_held(KeyId::char('a')));
        kb.apply(release(KeyCode::Char('a')), now, &mut tr);
        let f = tr.frame();
        assert!(!f.is_held(KeyId::char('a')));
        assert!(f.was_released(KeyId::char('a')));
    }

    #[test]
    fn timeout_releases_without_enhancement() {
        let mut kb = KeyboardState::new();
        let mut tr = InputTracker::new();
        let t0 = Instant::now();
        kb.apply(press(KeyCode::Right), t0, &mut tr);
        kb.apply(release(KeyCode::Right), t0, &mut tr);
        kb.expire(t0 + Duration::from_millis(50), &mut tr);
        assert!(tr.is_held(KeyId::named(NamedKey::Right)));
        kb.expire(t0 + HOLD_TIMEOUT, &mut tr);
        assert!(!tr.is_held(KeyId::named(NamedKey::Right)));
    }

    #[test]
    fn ctrl_c_quits() {
        let k = KeyEvent::new_with_kind(KeyCode::Char('c'), KeyModifiers::CONTROL, KeyEventKind::Press);
        assert_eq!(meta_for(&k, false), Some(MetaKey::Quit));
        assert_eq!(meta_for(&press(KeyCode::Char('c')), false), None);
        assert_eq!(meta_for(&press(KeyCode::Esc), false), Some(MetaKey::Pause));
    }

    #[test]
    fn menu_letters_only_act_while_menu_is_open() {
        assert_eq!(meta_for(&press(KeyCode::Char('r')), false), None);
        assert_eq!(meta_for(&press(KeyCode::Char('r')), true), Some(MetaKey::Restart));
        assert_eq!(meta_for(&press(KeyCode::Char('Q')), true), Some(MetaKey::Quit));
    }
}
