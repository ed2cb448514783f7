//! Hitboxes and attack-vs-player resolution.

use tracing::debug;

use crate::config::{AttackTuning, Tuning};
use super::geom::{Rect, Vec2};
use super::player::{HitOutcome, Player, PlayerId};

/// A live hitbox. It holds its owner's id, not the owner, so it stays valid
/// across the owner's KO and respawn.
#[derive(Clone, Debug, PartialEq)]
pub struct Attack {
    pub owner: PlayerId,
    pub rect: Rect,
    pub damage: f32,
    pub knockback_base: f32,
    pub knockback_scale: f32,
    pub knockback_angle_deg: f32,
    /// Owner's facing at spawn; mirrors the knockback x component.
    pub facing_right: bool,
    pub frames_left: u32,
    /// Cleared after the first hit. An inactive hitbox stays visible until
    /// its lifetime runs out but cannot hit again.
    pub active: bool,
    pub disappear_on_hit: bool,
}

impl Attack {
    /// Spawn beside the owner: centered half the owner's width plus a margin
    /// toward the facing side, raised half the hitbox height.
    pub fn spawn(owner: PlayerId, owner_rect: &Rect, facing_right: bool, t: &AttackTuning) -> Attack {
        let offset = owner_rect.w / 2.0 + t.margin;
        let cx = owner_rect.center_x() + if facing_right { offset } else { -offset };
        let cy = owner_rect.center_y() - t.height / 2.0;
        Attack {
            owner,
            rect: Rect::from_center(Vec2::new(cx, cy), t.width, t.height),
            damage: t.damage,
            knockback_base: t.knockback_base,
            knockback_scale: t.knockback_scale,
            knockback_angle_deg: t.knockback_angle_deg,
            facing_right,
            frames_left: t.lifetime,
            active: true,
            disappear_on_hit: t.disappear_on_hit,
        }
    }

    /// Returns false once the lifetime has run out.
    pub fn tick(&mut self) -> bool {
        self.frames_left = self.frames_left.saturating_sub(1);
        self.frames_left > 0
    }
}

/// One resolved hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HitReport {
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub outcome: HitOutcome,
}

/// Test every active hitbox against every living, non-owner, vulnerable
/// defender. The first colliding defender takes the hit; the hitbox then
/// disappears or goes inactive, so it never hits twice.
pub fn process_hits(attacks: &mut Vec<Attack>, players: &mut [Player], t: &Tuning) -> Vec<HitReport> {
    let mut reports = Vec::new();
    let mut spent = Vec::new();

    for (ai, atk) in attacks.iter_mut().enumerate() {
        if !atk.active {
            continue;
        }
        let target = players.iter().position(|p| {
            p.id != atk.owner
                && p.is_alive()
                && !p.is_invulnerable()
                && atk.rect.overlaps(&p.body.rect)
        });
        let Some(di) = target else { continue };

        let outcome = players[di].receive_hit(atk, t);
        let defender = players[di].id;
        if let Some(owner) = players.iter_mut().find(|p| p.id == atk.owner) {
            owner.stats.hits_landed += 1;
        }
        debug!(attacker = atk.owner.0, defender = defender.0, ?outcome, "hit");
        reports.push(HitReport { attacker: atk.owner, defender, outcome });

        atk.active = false;
        if atk.disappear_on_hit {
            spent.push(ai);
        }
    }

    for ai in spent.into_iter().rev() {
        attacks.remove(ai);
    }
    reports
}

/// Age every hitbox one tick, dropping expired ones.
pub fn tick_attacks(attacks: &mut Vec<Attack>) {
    attacks.retain_mut(|a| a.tick());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_spawns, Spawn};
    use crate::domain::input::Controls;

    fn t() -> Tuning { Tuning::default() }

    fn players() -> Vec<Player> {
        let t = t();
        let spawns = default_spawns();
        vec![
            Player::new(PlayerId(0), spawns[0], Controls::default_p1(), &t).unwrap(),
            Player::new(PlayerId(1), spawns[1], Controls::default_p2(), &t).unwrap(),
        ]
    }

    /// A hitbox from player 0 placed right on top of `target`.
    fn attack_on(target: &Rect, t: &AttackTuning) -> Attack {
        let mut a = Attack::spawn(PlayerId(0), target, true, t);
        a.rect = Rect::from_center(target.center(), t.width, t.height);
        a
    }

    #[test]
    fn spawns_on_facing_side() {
        let t = t();
        let owner = Rect::new(100.0, 100.0, 40.0, 60.0);
        let right = Attack::spawn(PlayerId(0), &owner, true, &t.attack);
        assert_eq!(right.rect.center_x(), 120.0 + 24.0);
        assert_eq!(right.rect.center_y(), 130.0 - 9.0);
        let left = Attack::spawn(PlayerId(0), &owner, false, &t.attack);
        assert_eq!(left.rect.center_x(), 120.0 - 24.0);
        assert_eq!(right.frames_left, t.attack.lifetime);
    }

    #[test]
    fn hit_applies_damage_and_knockback_once() {
        let t = t();
        let mut ps = players();
        let mut attacks = vec![attack_on(&ps[1].body.rect, &t.attack)];

        let reports = process_hits(&mut attacks, &mut ps, &t);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].defender, PlayerId(1));
        assert_eq!(ps[1].body.percent, 10.0);
        assert!((ps[1].body.vel.x - 10.0).abs() < 1e-5);
        assert_eq!(ps[0].stats.hits_landed, 1);

        // Inactive but still present; a second pass does nothing.
        assert_eq!(attacks.len(), 1);
        assert!(!attacks[0].active);
        assert!(process_hits(&mut attacks, &mut ps, &t).is_empty());
        assert_eq!(ps[1].body.percent, 10.0);
    }

    #[test]
    fn disappearing_hitbox_is_removed() {
        let mut t = t();
        t.attack.disappear_on_hit = true;
        let mut ps = players();
        let mut attacks = vec![attack_on(&ps[1].body.rect, &t.attack)];
        process_hits(&mut attacks, &mut ps, &t);
        assert!(attacks.is_empty());
    }

    #[test]
    fn owner_is_never_hit() {
        let t = t();
        let mut ps = players();
        let mut attacks = vec![attack_on(&ps[0].body.rect, &t.attack)];
        assert!(process_hits(&mut attacks, &mut ps, &t).is_empty());
        assert!(attacks[0].active);
    }

    #[test]
    fn only_first_defender_is_hit() {
        let t = t();
        let spawns = default_spawns();
        let mut ps = players();
        let third = Spawn { point: spawns[1].point, facing_right: true };
        ps.push(Player::new(PlayerId(2), third, Controls::default_p1(), &t).unwrap());
        let mut attacks = vec![attack_on(&ps[1].body.rect, &t.attack)];
        let reports = process_hits(&mut attacks, &mut ps, &t);
        assert_eq!(reports.len(), 1);
        assert_eq!(ps[2].body.percent, 0.0);
    }

    #[test]
    fn expired_hitboxes_are_dropped() {
        let t = t();
        let owner = Rect::new(0.0, 0.0, 40.0, 60.0);
        let mut attacks = vec![Attack::spawn(PlayerId(0), &owner, true, &t.attack)];
        for _ in 0..t.attack.lifetime - 1 {
            tick_attacks(&mut attacks);
        }
        assert_eq!(attacks.len(), 1);
        tick_attacks(&mut attacks);
        assert!(attacks.is_empty());
    }
}
