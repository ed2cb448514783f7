//! Physics solver: gravity, vertical platform collision, drop-through
//! tracking, horizontal friction and platform-edge queries.
//!
//! ## Vertical collision rules
//!
//! A platform is a landing CANDIDATE for a body when any of:
//!   - the rects overlap,
//!   - the body rests flush on it (bottom == top, vy >= 0, x-overlap);
//!     discrete motion can leave a body exactly on a surface without overlap,
//!   - the body swept through its top this tick (no tunnelling).
//!
//! A candidate is LANDED on when the body approached from above (its bottom
//! was at/above the platform top before this tick's move):
//!   - Thin: only when down-intent is off. With down-intent on, the platform
//!     becomes the tracked drop-through platform instead.
//!   - Thick: always.
//!
//! A thick platform moving upward into its underside clamps the body's top to
//! the platform bottom and zeroes vy (head-bonk). Thin platforms never block
//! upward motion.
//!
//! The tracked drop-through platform is ignored entirely until the body's
//! top passes its bottom edge.

use tracing::debug;

use crate::config::Tuning;
use super::geom::{Rect, Vec2, CONTACT_EPS};
use super::stage::{Platform, PlatformId, PlatformKind};

// ══════════════════════════════════════════════════════════════
// Integration
// ══════════════════════════════════════════════════════════════

/// Add gravity, capped at the max fall speed.
pub fn apply_gravity(vel: &mut Vec2, t: &Tuning) {
    vel.y = (vel.y + t.gravity).min(t.max_fall_speed);
}

pub fn move_rect(rect: &mut Rect, vel: Vec2) {
    rect.translate(vel);
}

// ══════════════════════════════════════════════════════════════
// Vertical collision
// ══════════════════════════════════════════════════════════════

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct VerticalOutcome {
    pub on_ground: bool,
    pub drop_platform: Option<PlatformId>,
}

/// Resolve `body` (already moved by `vel`) against `platforms`.
///
/// Mutates the body position and `vel.y`; returns grounded state and the new
/// drop-through platform.
pub fn solve_vertical(
    body: &mut Rect,
    vel: &mut Vec2,
    platforms: &[Platform],
    down_intent: bool,
    drop_platform: Option<PlatformId>,
) -> VerticalOutcome {
    let mut drop = drop_platform;

    if let Some(id) = drop {
        match platforms.get(id.0) {
            Some(p) if body.top() > p.rect.bottom() => drop = None,
            None => drop = None,
            _ => {}
        }
    }

    let prev_top = body.top() - vel.y;
    let prev_bottom = body.bottom() - vel.y;
    let mut landing: Option<(PlatformId, f32)> = None;

    for (i, p) in platforms.iter().enumerate() {
        let id = PlatformId(i);
        if Some(id) == drop { continue; }

        let pr = &p.rect;
        let x_overlap = body.x_overlaps(pr);
        if !x_overlap { continue; }

        let overlap = body.overlaps(pr);
        let flush = vel.y >= 0.0 && (body.bottom() - pr.top()).abs() <= CONTACT_EPS;
        let swept_down = vel.y > 0.0
            && prev_bottom <= pr.top() + CONTACT_EPS
            && body.bottom() >= pr.top();
        let swept_up = vel.y < 0.0
            && prev_top >= pr.bottom() - CONTACT_EPS
            && body.top() <= pr.bottom();
        if !(overlap || flush || swept_down || swept_up) { continue; }

        let from_above = vel.y >= 0.0 && prev_bottom <= pr.top() + CONTACT_EPS;

        match p.kind {
            PlatformKind::Thin => {
                if from_above {
                    if down_intent {
                        if drop != Some(id) {
                            debug!(platform = i, "drop-through begins");
                        }
                        drop = Some(id);
                    } else {
                        landing = pick_highest(landing, id, pr.top());
                    }
                }
            }
            PlatformKind::Thick => {
                if from_above {
                    landing = pick_highest(landing, id, pr.top());
                } else if vel.y < 0.0 && prev_top >= pr.bottom() - CONTACT_EPS {
                    body.set_top(pr.bottom());
                    vel.y = 0.0;
                }
            }
        }
    }

    let mut on_ground = false;
    if let Some((_, top)) = landing {
        body.set_bottom(top);
        vel.y = 0.0;
        on_ground = true;
    }

    VerticalOutcome { on_ground, drop_platform: drop }
}

/// When a body crosses several surfaces in one tick, it lands on the first
/// one it met: the highest top.
fn pick_highest(cur: Option<(PlatformId, f32)>, id: PlatformId, top: f32) -> Option<(PlatformId, f32)> {
    match cur {
        Some((_, t)) if t <= top => cur,
        _ => Some((id, top)),
    }
}

// ══════════════════════════════════════════════════════════════
// Horizontal
// ══════════════════════════════════════════════════════════════

/// Multiply vx by the ground or air factor; snap tiny speeds to exactly 0.
pub fn apply_horizontal_friction(vel: &mut Vec2, on_ground: bool, t: &Tuning) {
    let factor = if on_ground { t.ground_friction } else { t.air_friction };
    vel.x *= factor;
    if vel.x.abs() < t.friction_dead_zone {
        vel.x = 0.0;
    }
}

/// Friction, then directional input. Opposite directions cancel. `locked`
/// (shielding) keeps friction but ignores input. Returns the new facing.
pub fn step_horizontal(
    vel: &mut Vec2,
    facing_right: bool,
    on_ground: bool,
    press_left: bool,
    press_right: bool,
    locked: bool,
    t: &Tuning,
) -> bool {
    apply_horizontal_friction(vel, on_ground, t);

    if press_left && press_right || locked {
        return facing_right;
    }
    if press_left {
        vel.x = -t.move_speed;
        false
    } else if press_right {
        vel.x = t.move_speed;
        true
    } else {
        facing_right
    }
}

// ══════════════════════════════════════════════════════════════
// Platform-edge queries
// ══════════════════════════════════════════════════════════════

/// The platform the body is standing on (bottom flush with its top and
/// horizontally overlapping). Picks the one under the body's center when
/// two qualify.
pub fn find_current_platform(body: &Rect, platforms: &[Platform]) -> Option<(PlatformId, Platform)> {
    let mut best: Option<(PlatformId, Platform)> = None;
    for (i, p) in platforms.iter().enumerate() {
        if (body.bottom() - p.rect.top()).abs() > CONTACT_EPS || !body.x_overlaps(&p.rect) {
            continue;
        }
        let cx = body.center_x();
        let under_center = cx >= p.rect.left() && cx <= p.rect.right();
        match best {
            Some(_) if !under_center => {}
            _ => best = Some((PlatformId(i), *p)),
        }
    }
    best
}

/// Would moving by `vx` this tick carry the body's leading edge past the
/// platform's edge?
pub fn would_leave_platform(body: &Rect, vx: f32, platform: &Platform) -> bool {
    let left = body.left() + vx;
    let right = body.right() + vx;
    left < platform.rect.left() || right > platform.rect.right()
}

/// Keep the body within the platform's [left, right]. Zeroes vx on a clamp.
/// Returns true if a correction was applied.
pub fn clamp_to_platform(body: &mut Rect, vel: &mut Vec2, platform: &Platform) -> bool {
    let pr = &platform.rect;
    let mut clamped = false;
    if body.left() < pr.left() {
        body.set_left(pr.left());
        vel.x = 0.0;
        clamped = true;
    }
    if body.right() > pr.right() {
        body.set_right(pr.right());
        vel.x = 0.0;
        clamped = true;
    }
    clamped
}

/// A grounded body must rest ON its support, never inside it. Re-snaps the
/// body onto the highest solid surface it still penetrates. Returns true if
/// a correction was needed.
pub fn correct_penetration(body: &mut Rect, platforms: &[Platform], drop: Option<PlatformId>) -> bool {
    let mut fix: Option<f32> = None;
    for (i, p) in platforms.iter().enumerate() {
        if Some(PlatformId(i)) == drop { continue; }
        let pr = &p.rect;
        if !body.overlaps(pr) { continue; }
        let depth = body.bottom() - pr.top();
        // Only a shallow sink from above counts; deep overlap means the body
        // is passing a thin platform from below.
        if depth > CONTACT_EPS && depth <= pr.h {
            if p.kind == PlatformKind::Thin && body.top() >= pr.top() { continue; }
            fix = Some(fix.map_or(pr.top(), |t: f32| t.min(pr.top())));
        }
    }
    match fix {
        Some(top) => {
            body.set_bottom(top);
            true
        }
        None => false,
    }
}
