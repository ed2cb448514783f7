//! Dodge classification and the platform-edge guard.
//!
//! One tagged variant carried alongside the dodge timer replaces the loose
//! spot/edge/air flags: a dodge is exactly one of grounded spot, air, or
//! rolling, and only the fields that kind needs exist.

use tracing::trace;

use crate::config::Tuning;
use super::geom::{Rect, Vec2};
use super::input::{Action, ActionInput};
use super::physics::{clamp_to_platform, find_current_platform, would_leave_platform};
use super::stage::Platform;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DodgeKind {
    None,
    /// In place on the ground: no motion, no gravity, no drop-through.
    GroundedSpot,
    /// Neutral air dodge. `steered` once the one-time sideways impulse has
    /// been added.
    Air { steered: bool },
    /// Directional dodge, grounded or airborne. `edge_blocked` once the edge
    /// guard has stopped it.
    Rolling { dir: i8, edge_blocked: bool },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Dodge {
    pub kind: DodgeKind,
    pub timer: u32,
}

impl Default for Dodge {
    fn default() -> Self {
        Dodge { kind: DodgeKind::None, timer: 0 }
    }
}

impl Dodge {
    pub fn active(&self) -> bool {
        self.timer > 0
    }

    pub fn is_grounded_spot(&self) -> bool {
        self.active() && self.kind == DodgeKind::GroundedSpot
    }

    /// A neutral air dodge that has not yet been steered.
    pub fn can_steer(&self) -> bool {
        self.active() && self.kind == DodgeKind::Air { steered: false }
    }

    /// Counts down one tick. Returns true on the tick the dodge ends.
    pub fn tick(&mut self) -> bool {
        if self.timer == 0 {
            return false;
        }
        self.timer -= 1;
        if self.timer == 0 {
            self.kind = DodgeKind::None;
            return true;
        }
        false
    }
}

// ── Request resolution ──

/// The input edges dodge resolution looks at.
#[derive(Clone, Copy, Default, Debug)]
pub struct DodgeInput {
    pub shield_pressed: bool,
    pub shield_held: bool,
    pub down_pressed: bool,
    pub left_pressed: bool,
    pub right_pressed: bool,
}

impl DodgeInput {
    pub fn read(input: &ActionInput) -> Self {
        DodgeInput {
            shield_pressed: input.pressed(Action::Shield),
            shield_held: input.held(Action::Shield),
            down_pressed: input.pressed(Action::Down),
            left_pressed: input.pressed(Action::Left),
            right_pressed: input.pressed(Action::Right),
        }
    }

    fn fresh_direction(&self) -> Option<i8> {
        if self.down_pressed {
            Some(0)
        } else if self.left_pressed {
            Some(-1)
        } else if self.right_pressed {
            Some(1)
        } else {
            None
        }
    }
}

/// Resolve the dodge direction for this tick, if any: 0 = neutral
/// (spot on the ground, air dodge airborne), -1/+1 = roll.
///
/// Priority:
///   1. shield and a direction both freshly pressed
///   2. shield freshly pressed alone: airborne → neutral; grounded and
///      moving → roll along the movement
///   3. shield already held (or steering an air dodge) and a direction
///      freshly pressed
pub fn resolve_direction(inp: &DodgeInput, on_ground: bool, vx: f32, steering: bool) -> Option<i8> {
    if inp.shield_pressed {
        if let Some(dir) = inp.fresh_direction() {
            return Some(dir);
        }
        if !steering {
            if !on_ground {
                return Some(0);
            }
            if vx.abs() > 0.1 {
                return Some(if vx > 0.0 { 1 } else { -1 });
            }
            return None;
        }
    }
    if inp.shield_held || steering {
        return inp.fresh_direction();
    }
    None
}

/// Classify a new dodge and apply its starting velocity.
pub fn start(dir: i8, on_ground: bool, vel: &mut Vec2, t: &Tuning) -> Dodge {
    let kind = match (dir, on_ground) {
        (0, true) => {
            *vel = Vec2::ZERO;
            DodgeKind::GroundedSpot
        }
        (0, false) => {
            vel.x = 0.0;
            DodgeKind::Air { steered: false }
        }
        (d, true) => {
            *vel = Vec2::new(d as f32 * t.dodge_speed, 0.0);
            DodgeKind::Rolling { dir: d, edge_blocked: false }
        }
        (d, false) => {
            vel.x += d as f32 * t.dodge_speed;
            DodgeKind::Rolling { dir: d, edge_blocked: false }
        }
    };
    Dodge { kind, timer: t.dodge_frames }
}

/// Add the one-time sideways impulse to a neutral air dodge. The impulse adds
/// to the existing vx. Returns false if the dodge cannot be steered.
pub fn steer(dodge: &mut Dodge, dir: i8, vel: &mut Vec2, t: &Tuning) -> bool {
    if dir == 0 || !dodge.can_steer() {
        return false;
    }
    vel.x += dir as f32 * t.dodge_speed;
    dodge.kind = DodgeKind::Air { steered: true };
    true
}

// ── Edge guard ──

/// Pre-move guard for a grounded dodge: clamp onto the supporting platform
/// and stop any motion that would carry the leading edge off it this tick.
/// Returns true when motion was stopped.
pub fn guard_edge(dodge: &mut Dodge, body: &mut Rect, vel: &mut Vec2, platforms: &[Platform]) -> bool {
    let Some((_, platform)) = find_current_platform(body, platforms) else {
        return false;
    };
    clamp_to_platform(body, vel, &platform);
    if vel.x != 0.0 && would_leave_platform(body, vel.x, &platform) {
        trace!(vx = vel.x, "dodge stopped at platform edge");
        vel.x = 0.0;
        if let DodgeKind::Rolling { dir, .. } = dodge.kind {
            dodge.kind = DodgeKind::Rolling { dir, edge_blocked: true };
        }
        return true;
    }
    false
}

/// Post-move safety net: re-clamp onto whatever platform the body now
/// stands on.
pub fn reclamp(body: &mut Rect, vel: &mut Vec2, platforms: &[Platform]) -> bool {
    match find_current_platform(body, platforms) {
        Some((_, platform)) => clamp_to_platform(body, vel, &platform),
        None => false,
    }
}
