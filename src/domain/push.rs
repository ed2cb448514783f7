//! Player-vs-player separation. Runs once per tick after every player's
//! physics and before hits are resolved.

use super::player::{PState, Player};

fn dodging(p: &Player) -> bool {
    p.state() == PState::Dodge || p.body.dodge.active()
}

/// Separate every overlapping pair along the axis of least overlap.
pub fn resolve_push(players: &mut [Player]) {
    for i in 0..players.len() {
        for j in (i + 1)..players.len() {
            let (head, tail) = players.split_at_mut(j);
            resolve_pair(&mut head[i], &mut tail[0]);
        }
    }
}

fn resolve_pair(a: &mut Player, b: &mut Player) {
    if !a.is_alive() || !b.is_alive() || dodging(a) || dodging(b) {
        return;
    }
    if !a.body.rect.overlaps(&b.body.rect) {
        return;
    }

    let (ar, br) = (a.body.rect, b.body.rect);
    let dx = (ar.right() - br.left()).min(br.right() - ar.left());
    let dy = (ar.bottom() - br.top()).min(br.bottom() - ar.top());

    if dx < dy {
        separate_horizontal(a, b, dx);
    } else {
        separate_vertical(a, b, dy);
    }
}

fn separate_horizontal(a: &mut Player, b: &mut Player, overlap: f32) {
    // sign: +1 when a is left of b
    let side = if a.body.rect.center_x() < b.body.rect.center_x() { 1.0 } else { -1.0 };
    let (avx, bvx) = (a.body.vel.x, b.body.vel.x);

    let (a_share, b_share) = match (avx != 0.0, bvx != 0.0) {
        (true, false) => (overlap, 0.0),
        (false, true) => (0.0, overlap),
        _ => (overlap / 2.0, overlap / 2.0),
    };
    a.body.rect.x -= side * a_share;
    b.body.rect.x += side * b_share;

    let v = if avx * bvx < 0.0 {
        0.0
    } else if avx != 0.0 && bvx == 0.0 {
        avx * 0.5
    } else if bvx != 0.0 && avx == 0.0 {
        bvx * 0.5
    } else {
        (avx + bvx) / 2.0
    };
    a.body.vel.x = v;
    b.body.vel.x = v;
}

fn separate_vertical(a: &mut Player, b: &mut Player, overlap: f32) {
    let a_above = a.body.rect.center_y() < b.body.rect.center_y();
    let (upper, lower) = if a_above { (a, b) } else { (b, a) };

    // A grounded lower body is never pushed down into its platform.
    if lower.body.on_ground {
        let top = lower.body.rect.top();
        upper.body.rect.set_bottom(top);
    } else {
        upper.body.rect.y -= overlap / 2.0;
        lower.body.rect.y += overlap / 2.0;
    }

    let (uvy, lvy) = (upper.body.vel.y, lower.body.vel.y);
    if uvy * lvy < 0.0 {
        upper.body.vel.y = 0.0;
        lower.body.vel.y = 0.0;
    } else if (lower.body.on_ground && uvy > 0.0) || (upper.body.on_ground && lvy > 0.0) {
        upper.body.vel.y = 0.0;
        lower.body.vel.y = 0.0;
    } else if uvy != 0.0 && lvy == 0.0 {
        let v = uvy * 0.5;
        upper.body.vel.y = v;
        lower.body.vel.y = v;
    } else if lvy != 0.0 && uvy == 0.0 {
        let v = lvy * 0.5;
        upper.body.vel.y = v;
        lower.body.vel.y = v;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Spawn, Tuning};
    use crate::domain::dodge::{Dodge, DodgeKind};
    use crate::domain::geom::{Rect, Vec2};
    use crate::domain::input::Controls;
    use crate::domain::player::PlayerId;

    fn pair(ax: f32, bx: f32) -> Vec<Player> {
        let t = Tuning::default();
        [ax, bx]
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let spawn = Spawn { point: Vec2::new(x, 400.0), facing_right: true };
                Player::new(PlayerId(i), spawn, Controls::default_p1(), &t).unwrap()
            })
            .collect()
    }

    #[test]
    fn still_pair_splits_evenly() {
        let mut ps = pair(100.0, 130.0); // 10 px overlap
        resolve_push(&mut ps);
        assert_eq!(ps[0].body.rect.right(), ps[1].body.rect.left());
        assert_eq!(ps[0].body.rect.center_x(), 95.0);
        assert_eq!(ps[1].body.rect.center_x(), 135.0);
    }

    #[test]
    fn mover_takes_full_correction_and_shares_speed() {
        let mut ps = pair(100.0, 130.0);
        ps[0].body.vel.x = 5.0;
        resolve_push(&mut ps);
        assert_eq!(ps[1].body.rect.center_x(), 130.0);
        assert_eq!(ps[0].body.rect.right(), ps[1].body.rect.left());
        assert_eq!(ps[0].body.vel.x, 2.5);
        assert_eq!(ps[1].body.vel.x, 2.5);
    }

    #[test]
    fn opposing_pushes_cancel_and_aligned_average() {
        let mut ps = pair(100.0, 130.0);
        ps[0].body.vel.x = 5.0;
        ps[1].body.vel.x = -5.0;
        resolve_push(&mut ps);
        assert_eq!((ps[0].body.vel.x, ps[1].body.vel.x), (0.0, 0.0));

        let mut ps = pair(100.0, 130.0);
        ps[0].body.vel.x = 5.0;
        ps[1].body.vel.x = 3.0;
        resolve_push(&mut ps);
        assert_eq!((ps[0].body.vel.x, ps[1].body.vel.x), (4.0, 4.0));
    }

    #[test]
    fn dodging_player_passes_through() {
        let mut ps = pair(100.0, 130.0);
        ps[1].body.dodge = Dodge { kind: DodgeKind::GroundedSpot, timer: 3 };
        let before = (ps[0].body.rect, ps[1].body.rect);
        resolve_push(&mut ps);
        assert_eq!((ps[0].body.rect, ps[1].body.rect), before);
    }

    #[test]
    fn grounded_lower_player_is_never_pushed_down() {
        let mut ps = pair(100.0, 105.0);
        ps[0].body.on_ground = true;
        // b lands on a's head with 6 px of overlap.
        ps[1].body.rect = Rect::new(85.0, 286.0, 40.0, 60.0);
        ps[1].body.vel.y = 4.0;
        resolve_push(&mut ps);
        assert_eq!(ps[0].body.rect.bottom(), 400.0);
        assert_eq!(ps[1].body.rect.bottom(), ps[0].body.rect.top());
        assert_eq!(ps[1].body.vel.y, 0.0);
    }

    #[test]
    fn airborne_stack_splits() {
        let mut ps = pair(100.0, 100.0);
        ps[1].body.rect = Rect::new(80.0, 290.0, 40.0, 60.0);
        resolve_push(&mut ps);
        assert_eq!(ps[0].body.rect.top(), 345.0);
        assert_eq!(ps[1].body.rect.bottom(), 345.0);
    }
}
