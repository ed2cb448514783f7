//! Per-tick input contract.
//!
//! The core never polls devices. Front-ends translate raw key/button events
//! into `KeyId`s and feed an `InputTracker`; once per tick the tracker yields
//! an `InputFrame` with three sets:
//!   - `held`     : down at the end of this tick (continuous actions)
//!   - `pressed`  : went down during this tick (edge-triggered actions)
//!   - `released` : went up during this tick
//!
//! Each player reads the frame through its own `Controls` mapping, so both
//! players share one frame per tick.

use std::collections::HashSet;

// ── Key identifiers ──

/// Opaque logical key id. Encodes a character key, a named key, or a
/// gamepad button so that one set can hold keys from every device.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct KeyId(pub u32);

const NAMED_BASE: u32 = 0x0011_0000; // above the Unicode range
const PAD_BASE: u32 = 0x0012_0000;
const PAD_STRIDE: u32 = 64;
/// Highest pad number a config may name (`Pad1` through `Pad16`).
pub const MAX_PADS: u32 = 16;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum NamedKey {
    Left,
    Right,
    Up,
    Down,
    Space,
    Enter,
    Tab,
    Backspace,
}

const NAMED_KEYS: [(NamedKey, &str); 8] = [
    (NamedKey::Left, "LEFT"),
    (NamedKey::Right, "RIGHT"),
    (NamedKey::Up, "UP"),
    (NamedKey::Down, "DOWN"),
    (NamedKey::Space, "SPACE"),
    (NamedKey::Enter, "ENTER"),
    (NamedKey::Tab, "TAB"),
    (NamedKey::Backspace, "BACKSPACE"),
];

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadButton {
    South,
    East,
    West,
    North,
    L1,
    R1,
    L2,
    R2,
    Start,
    Select,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
}

const PAD_BUTTONS: [(PadButton, &str); 14] = [
    (PadButton::South, "SOUTH"),
    (PadButton::East, "EAST"),
    (PadButton::West, "WEST"),
    (PadButton::North, "NORTH"),
    (PadButton::L1, "L1"),
    (PadButton::R1, "R1"),
    (PadButton::L2, "L2"),
    (PadButton::R2, "R2"),
    (PadButton::Start, "START"),
    (PadButton::Select, "SELECT"),
    (PadButton::DPadUp, "DPADUP"),
    (PadButton::DPadDown, "DPADDOWN"),
    (PadButton::DPadLeft, "DPADLEFT"),
    (PadButton::DPadRight, "DPADRIGHT"),
];

impl KeyId {
    /// Character keys are case-insensitive: 'A' and 'a' map to the same id.
    pub fn char(c: char) -> KeyId {
        let lower = c.to_lowercase().next().unwrap_or(c);
        KeyId(lower as u32)
    }

    pub fn named(k: NamedKey) -> KeyId {
        KeyId(NAMED_BASE + k as u32)
    }

    /// `pad` is 0-based (config spells the first pad `Pad1`).
    pub fn pad(pad: u32, b: PadButton) -> KeyId {
        KeyId(PAD_BASE.saturating_add(pad.saturating_mul(PAD_STRIDE)).saturating_add(b as u32))
    }

    /// Parse a config key name.
    ///
    /// Accepted forms: a single character (`"a"`, `"/"`), a named key
    /// (`"Left"`, `"Space"`, case-insensitive), or a gamepad button
    /// `"Pad<N>.<Button>"` (`"Pad1.South"`, `"Pad2.DPadLeft"`).
    pub fn from_name(name: &str) -> Option<KeyId> {
        let trimmed = name.trim();
        let mut chars = trimmed.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            return Some(KeyId::char(c));
        }

        let upper = trimmed.to_uppercase();
        if let Some((k, _)) = NAMED_KEYS.iter().find(|(_, n)| *n == upper) {
            return Some(KeyId::named(*k));
        }
        match upper.as_str() {
            "SLASH" => return Some(KeyId::char('/')),
            "PERIOD" => return Some(KeyId::char('.')),
            "COMMA" => return Some(KeyId::char(',')),
            _ => {}
        }

        let rest = upper.strip_prefix("PAD")?;
        let (num, button) = rest.split_once('.')?;
        let pad: u32 = num.parse().ok()?;
        if pad == 0 || pad > MAX_PADS { return None; }
        let b = PAD_BUTTONS.iter().find(|(_, n)| *n == button).map(|(b, _)| *b)?;
        Some(KeyId::pad(pad - 1, b))
    }
}

// ── Frame + tracker ──

/// Input for one tick.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputFrame {
    pub held: HashSet<KeyId>,
    pub pressed: HashSet<KeyId>,
    pub released: HashSet<KeyId>,
}

impl InputFrame {
    pub fn empty() -> Self {
        InputFrame::default()
    }

    pub fn is_held(&self, k: KeyId) -> bool { self.held.contains(&k) }
    pub fn was_pressed(&self, k: KeyId) -> bool { self.pressed.contains(&k) }
    pub fn was_released(&self, k: KeyId) -> bool { self.released.contains(&k) }
}

/// Accumulates device events between ticks.
///
/// Lifecycle: `new()` at startup, `key_down`/`key_up` as events arrive,
/// `frame()` once per tick (clears edges), `reset()` when the match restarts
/// or the window loses its devices.
#[derive(Debug, Default)]
pub struct InputTracker {
    held: HashSet<KeyId>,
    pressed: HashSet<KeyId>,
    released: HashSet<KeyId>,
}

impl InputTracker {
    pub fn new() -> Self {
        InputTracker::default()
    }

    pub fn key_down(&mut self, k: KeyId) {
        if self.held.insert(k) {
            self.pressed.insert(k);
        }
    }

    pub fn key_up(&mut self, k: KeyId) {
        if self.held.remove(&k) {
            self.released.insert(k);
        }
    }

    pub fn is_held(&self, k: KeyId) -> bool {
        self.held.contains(&k)
    }

    /// Snapshot this tick's input and start collecting the next tick.
    pub fn frame(&mut self) -> InputFrame {
        InputFrame {
            held: self.held.clone(),
            pressed: std::mem::take(&mut self.pressed),
            released: std::mem::take(&mut self.released),
        }
    }

    pub fn reset(&mut self) {
        self.held.clear();
        self.pressed.clear();
        self.released.clear();
    }
}

// ── Per-player mapping ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Action {
    Left,
    Right,
    Up,
    Down,
    Attack,
    Shield,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Left,
        Action::Right,
        Action::Up,
        Action::Down,
        Action::Attack,
        Action::Shield,
    ];
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Controls {
    pub left: KeyId,
    pub right: KeyId,
    pub up: KeyId,
    pub down: KeyId,
    pub attack: KeyId,
    pub shield: KeyId,
}

impl Controls {
    pub fn key(&self, a: Action) -> KeyId {
        match a {
            Action::Left => self.left,
            Action::Right => self.right,
            Action::Up => self.up,
            Action::Down => self.down,
            Action::Attack => self.attack,
            Action::Shield => self.shield,
        }
    }

    /// W/A/S/D movement, V attack, X shield.
    pub fn default_p1() -> Self {
        Controls {
            left: KeyId::char('a'),
            right: KeyId::char('d'),
            up: KeyId::char('w'),
            down: KeyId::char('s'),
            attack: KeyId::char('v'),
            shield: KeyId::char('x'),
        }
    }

    /// Arrow movement, / attack, , shield.
    pub fn default_p2() -> Self {
        Controls {
            left: KeyId::named(NamedKey::Left),
            right: KeyId::named(NamedKey::Right),
            up: KeyId::named(NamedKey::Up),
            down: KeyId::named(NamedKey::Down),
            attack: KeyId::char('/'),
            shield: KeyId::char(','),
        }
    }
}

/// A frame viewed through one player's controls.
#[derive(Clone, Copy)]
pub struct ActionInput<'a> {
    pub frame: &'a InputFrame,
    pub controls: &'a Controls,
}

impl<'a> ActionInput<'a> {
    pub fn new(frame: &'a InputFrame, controls: &'a Controls) -> Self {
        ActionInput { frame, controls }
    }

    pub fn held(&self, a: Action) -> bool {
        self.frame.is_held(self.controls.key(a))
    }

    pub fn pressed(&self, a: Action) -> bool {
        self.frame.was_pressed(self.controls.key(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_edges_last_one_frame() {
        let mut t = InputTracker::new();
        let a = KeyId::char('a');
        t.key_down(a);
        let f1 = t.frame();
        assert!(f1.is_held(a) && f1.was_pressed(a));

        let f2 = t.frame();
        assert!(f2.is_held(a));
        assert!(!f2.was_pressed(a));

        t.key_up(a);
        let f3 = t.frame();
        assert!(!f3.is_held(a));
        assert!(f3.was_released(a));
    }

    #[test]
    fn repeat_key_down_is_not_a_new_press() {
        let mut t = InputTracker::new();
        let k = KeyId::char('x');
        t.key_down(k);
        t.frame();
        t.key_down(k); // terminal auto-repeat
        assert!(!t.frame().was_pressed(k));
    }

    #[test]
    fn tap_within_one_tick_registers_press_and_release() {
        let mut t = InputTracker::new();
        let k = KeyId::char('w');
        t.key_down(k);
        t.key_up(k);
        let f = t.frame();
        assert!(f.was_pressed(k));
        assert!(f.was_released(k));
        assert!(!f.is_held(k));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut t = InputTracker::new();
        t.key_down(KeyId::char('d'));
        t.reset();
        assert_eq!(t.frame(), InputFrame::empty());
    }

    #[test]
    fn key_names_parse() {
        assert_eq!(KeyId::from_name("A"), Some(KeyId::char('a')));
        assert_eq!(KeyId::from_name("/"), Some(KeyId::char('/')));
        assert_eq!(KeyId::from_name("slash"), Some(KeyId::char('/')));
        assert_eq!(KeyId::from_name("Left"), Some(KeyId::named(NamedKey::Left)));
        assert_eq!(KeyId::from_name("Pad2.DPadLeft"), Some(KeyId::pad(1, PadButton::DPadLeft)));
        assert_eq!(KeyId::from_name("Pad0.South"), None);
        assert_eq!(KeyId::from_name("Pad16.South"), Some(KeyId::pad(15, PadButton::South)));
        assert_eq!(KeyId::from_name("Pad17.South"), None);
        assert_eq!(KeyId::from_name("Pad99999999.South"), None);
        assert_eq!(KeyId::from_name("Pad4294967295.South"), None);
        assert_eq!(KeyId::from_name("Pad1.Turbo"), None);
        assert_eq!(KeyId::from_name("Hyper"), None);
    }

    #[test]
    fn default_controls_do_not_collide() {
        let p1 = Controls::default_p1();
        let p2 = Controls::default_p2();
        let mut seen = HashSet::new();
        for c in [p1, p2] {
            for a in Action::ALL {
                assert!(seen.insert(c.key(a)), "duplicate binding for {:?}", a);
            }
        }
    }
}
