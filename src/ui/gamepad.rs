/// Gamepad front-end using gilrs.
///
/// Every pad gets a slot in connection order (slot 0 is spelled `Pad1` in
/// config.toml). Button edges go straight into the shared `InputTracker` as
/// `KeyId::pad(slot, button)`, so pads bind through the same `[controls]`
/// tables as the keyboard. The left stick is folded into the D-pad ids past
/// a deadzone.

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
#[cfg(feature = "gamepad")]
use tracing::{info, warn};

use crate::domain::input::{InputTracker, KeyId, PadButton};

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

const DIRS: [PadButton; 4] = [
    PadButton::DPadUp,
    PadButton::DPadDown,
    PadButton::DPadLeft,
    PadButton::DPadRight,
];

/// Digital directions of one pad, tracked per source so releasing the stick
/// never cancels a D-pad press that is still down.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Directions {
    dpad: [bool; 4],
    stick: [bool; 4],
    stick_x: f32,
    stick_y: f32,
}

impl Directions {
    fn combined(&self) -> [bool; 4] {
        let mut out = [false; 4];
        for i in 0..4 {
            out[i] = self.dpad[i] || self.stick[i];
        }
        out
    }

    /// Stick y grows upward.
    fn stick_from_axes(x: f32, y: f32) -> [bool; 4] {
        [y > STICK_DEADZONE, y < -STICK_DEADZONE, x < -STICK_DEADZONE, x > STICK_DEADZONE]
    }
}

fn dir_index(b: PadButton) -> Option<usize> {
    DIRS.iter().position(|d| *d == b)
}

/// Emit key edges for every direction whose combined state changed.
fn sync_dirs(slot: u32, before: [bool; 4], after: [bool; 4], tracker: &mut InputTracker) {
    for i in 0..4 {
        let id = KeyId::pad(slot, DIRS[i]);
        match (before[i], after[i]) {
            (false, true) => tracker.key_down(id),
            (true, false) => tracker.key_up(id),
            _ => {}
        }
    }
}

#[cfg(feature = "gamepad")]
fn pad_button(btn: Button) -> Option<PadButton> {
    match btn {
        Button::South => Some(PadButton::South),
        Button::East => Some(PadButton::East),
        Button::West => Some(PadButton::West),
        Button::North => Some(PadButton::North),
        Button::LeftTrigger => Some(PadButton::L1),
        Button::RightTrigger => Some(PadButton::R1),
        Button::LeftTrigger2 => Some(PadButton::L2),
        Button::RightTrigger2 => Some(PadButton::R2),
        Button::Start => Some(PadButton::Start),
        Button::Select => Some(PadButton::Select),
        Button::DPadUp => Some(PadButton::DPadUp),
        Button::DPadDown => Some(PadButton::DPadDown),
        Button::DPadLeft => Some(PadButton::DPadLeft),
        Button::DPadRight => Some(PadButton::DPadRight),
        _ => None,
    }
}

struct Slot {
    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    raw_id: usize,
    dirs: Directions,
    held: Vec<PadButton>,
}

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    slots: Vec<Slot>,

    pub connected: bool,
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = {
            match Gilrs::new() {
                Ok(g) => {
                    let has_pad = g.gamepads().next().is_some();
                    (Some(g), has_pad)
                }
                Err(e) => {
                    warn!(error = %e, "gamepad support unavailable");
                    (None, false)
                }
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        #[cfg_attr(not(feature = "gamepad"), allow(unused_mut))]
        let mut state = GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            slots: Vec::new(),
            connected,
        };

        // Pads already plugged in take slots in enumeration order.
        #[cfg(feature = "gamepad")]
        {
            let ids: Vec<usize> = state
                .gilrs
                .as_ref()
                .map(|g| g.gamepads().map(|(id, _)| usize::from(id)).collect())
                .unwrap_or_default();
            for id in ids {
                state.slot_for(id);
            }
        }

        state
    }

    /// Pump pending gamepad events into `tracker`.
    pub fn update(&mut self, tracker: &mut InputTracker) {
        #[cfg(feature = "gamepad")]
        self.poll_gilrs(tracker);
        #[cfg(not(feature = "gamepad"))]
        let _ = tracker;
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self, tracker: &mut InputTracker) {
        let gilrs = match &mut self.gilrs {
            Some(g) => g,
            None => return,
        };

        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            let raw = usize::from(event.id);
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    if let Some(b) = pad_button(btn) {
                        self.press(raw, b, tracker);
                    }
                }
                EventType::ButtonReleased(btn, _) => {
                    if let Some(b) = pad_button(btn) {
                        self.release(raw, b, tracker);
                    }
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick(raw, Some(value), None, tracker),
                        Axis::LeftStickY => self.stick(raw, None, Some(value), tracker),
                        _ => {}
                    }
                }
                EventType::Connected => {
                    self.connected = true;
                    let slot = self.slot_for(raw);
                    info!(pad = slot + 1, "gamepad connected");
                }
                EventType::Disconnected => {
                    self.release_pad(raw, tracker);
                    self.connected = false;
                }
                _ => {}
            }
        }
    }

    // ── Slot bookkeeping ──

    fn slot_for(&mut self, raw_id: usize) -> u32 {
        if let Some(i) = self.slots.iter().position(|s| s.raw_id == raw_id) {
            return i as u32;
        }
        self.slots.push(Slot { raw_id, dirs: Directions::default(), held: Vec::new() });
        (self.slots.len() - 1) as u32
    }

    fn press(&mut self, raw_id: usize, b: PadButton, tracker: &mut InputTracker) {
        let slot = self.slot_for(raw_id);
        let s = &mut self.slots[slot as usize];
        if let Some(i) = dir_index(b) {
            let before = s.dirs.combined();
            s.dirs.dpad[i] = true;
            sync_dirs(slot, before, s.dirs.combined(), tracker);
            return;
        }
        if !s.held.contains(&b) {
            s.held.push(b);
        }
        tracker.key_down(KeyId::pad(slot, b));
    }

    fn release(&mut self, raw_id: usize, b: PadButton, tracker: &mut InputTracker) {
        let slot = self.slot_for(raw_id);
        let s = &mut self.slots[slot as usize];
        if let Some(i) = dir_index(b) {
            let before = s.dirs.combined();
            s.dirs.dpad[i] = false;
            sync_dirs(slot, before, s.dirs.combined(), tracker);
            return;
        }
        s.held.retain(|h| *h != b);
        tracker.key_up(KeyId::pad(slot, b));
    }

    fn stick(&mut self, raw_id: usize, x: Option<f32>, y: Option<f32>, tracker: &mut InputTracker) {
        let slot = self.slot_for(raw_id);
        let s = &mut self.slots[slot as usize];
        if let Some(x) = x { s.dirs.stick_x = x; }
        if let Some(y) = y { s.dirs.stick_y = y; }
        let before = s.dirs.combined();
        s.dirs.stick = Directions::stick_from_axes(s.dirs.stick_x, s.dirs.stick_y);
        sync_dirs(slot, before, s.dirs.combined(), tracker);
    }

    /// Release everything a pad holds. The slot itself is kept so a
    /// reconnecting pad gets its old bindings back.
    fn release_pad(&mut self, raw_id: usize, tracker: &mut InputTracker) {
        let slot = self.slot_for(raw_id);
        let s = &mut self.slots[slot as usize];
        sync_dirs(slot, s.dirs.combined(), [false; 4], tracker);
        for b in s.held.drain(..) {
            tracker.key_up(KeyId::pad(slot, b));
        }
        s.dirs = Directions::default();
    }

    /// Forget held state without emitting releases (the tracker is being
    /// reset alongside).
    pub fn reset(&mut self) {
        for s in &mut self.slots {
            s.dirs = Directions::default();
            s.held.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> GamepadState {
        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: None,
            slots: Vec::new(),
            connected: false,
        }
    }

    #[test]
    fn slots_follow_first_sight_order() {
        let mut g = bare();
        assert_eq!(g.slot_for(7), 0);
        assert_eq!(g.slot_for(3), 1);
        assert_eq!(g.slot_for(7), 0);
    }

    #[test]
    fn buttons_feed_tracker_with_slot_ids() {
        let mut g = bare();
        let mut tr = InputTracker::new();
        g.slot_for(10);
        g.press(42, PadButton::South, &mut tr);
        let f = tr.frame();
        assert!(f.was_pressed(KeyId::pad(1, PadButton::South)));
        g.release(42, PadButton::South, &mut tr);
        assert!(tr.frame().was_released(KeyId::pad(1, PadButton::South)));
    }

    #[test]
    fn stick_and_dpad_share_direction_ids() {
        let mut g = bare();
        let mut tr = InputTracker::new();
        let left = KeyId::pad(0, PadButton::DPadLeft);

        g.stick(0, Some(-0.8), None, &mut tr);
        assert!(tr.is_held(left));
        g.press(0, PadButton::DPadLeft, &mut tr);
        // Stick returns to center while the D-pad is still down.
        g.stick(0, Some(0.1), None, &mut tr);
        assert!(tr.is_held(left));
        g.release(0, PadButton::DPadLeft, &mut tr);
        assert!(!tr.is_held(left));
    }

    #[test]
    fn deadzone_filters_small_tilts() {
        assert_eq!(Directions::stick_from_axes(0.2, -0.2), [false; 4]);
        assert_eq!(Directions::stick_from_axes(0.0, 0.9), [true, false, false, false]);
    }

    #[test]
    fn disconnect_releases_everything() {
        let mut g = bare();
        let mut tr = InputTracker::new();
        g.press(0, PadButton::East, &mut tr);
        g.stick(0, None, Some(-1.0), &mut tr);
        g.release_pad(0, &mut tr);
        assert!(!tr.is_held(KeyId::pad(0, PadButton::East)));
        assert!(!tr.is_held(KeyId::pad(0, PadButton::DPadDown)));
    }
}
