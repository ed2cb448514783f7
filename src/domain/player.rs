//! Player entity: kinematics, timers, and the per-tick update that drives
//! actions, physics, collision, timers and the state machine in that order.

use tracing::{debug, info, trace, warn};

use crate::config::{Spawn, Tuning};
use super::combat::Attack;
use super::dodge::{self, Dodge, DodgeInput, DodgeKind};
use super::fsm::{Fsm, FsmBuilder, FsmError, Guard, Hook};
use super::geom::{Rect, Vec2};
use super::input::{Action, ActionInput, Controls, InputFrame};
use super::physics;
use super::stage::{PlatformId, Stage};

/// Index into the match roster. Attacks refer to their owner by id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct PlayerId(pub usize);

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum PState {
    Idle,
    Run,
    Jump,
    Fall,
    Shield,
    Dodge,
    Hurt,
    Stun,
    Attack,
    Ko,
}

impl PState {
    pub fn name(self) -> &'static str {
        match self {
            PState::Idle => "idle",
            PState::Run => "run",
            PState::Jump => "jump",
            PState::Fall => "fall",
            PState::Shield => "shield",
            PState::Dodge => "dodge",
            PState::Hurt => "hurt",
            PState::Stun => "stun",
            PState::Attack => "attack",
            PState::Ko => "ko",
        }
    }
}

/// Visual feedback for the renderer.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Tint {
    Normal,
    Hurt,
    Stunned,
    Dodging,
}

#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct PlayerStats {
    pub attacks_made: u32,
    pub hits_landed: u32,
    pub hits_received: u32,
    /// KOs without having been hit since the last respawn.
    pub suicides: u32,
}

impl PlayerStats {
    /// Percentage of attacks that connected.
    pub fn accuracy(&self) -> f32 {
        self.hits_landed as f32 / self.attacks_made.max(1) as f32 * 100.0
    }
}

/// Everything the state machine's guards may read. Mutated only by the
/// action/physics phase and the hit handler, never by a guard.
#[derive(Clone, Debug)]
pub struct Body {
    pub rect: Rect,
    pub vel: Vec2,
    pub facing_right: bool,
    /// Recomputed by the solver every tick.
    pub on_ground: bool,
    pub jumps_remaining: u32,
    pub dodge: Dodge,
    pub hurt_timer: u32,
    pub stun_timer: u32,
    pub attack_timer: u32,
    pub done_attacking: bool,
    pub shield_attempting: bool,
    pub shield_hp: f32,
    /// Ticks spent in the current shield; drives the bubble animation.
    pub shield_ticks: u32,
    pub percent: f32,
    pub lives: u32,
    pub alive: bool,
    pub respawn_timer: u32,
    pub drop_platform: Option<PlatformId>,
    pub air_dodge_ok: bool,
    pub tint: Tint,
    pub hit_since_respawn: bool,
}

impl Body {
    fn fresh(spawn: &Spawn, t: &Tuning) -> Self {
        Body {
            rect: Rect::from_midbottom(spawn.point, t.player_width, t.player_height),
            vel: Vec2::ZERO,
            facing_right: spawn.facing_right,
            on_ground: false,
            jumps_remaining: t.max_jumps,
            dodge: Dodge::default(),
            hurt_timer: 0,
            stun_timer: 0,
            attack_timer: 0,
            done_attacking: true,
            shield_attempting: false,
            shield_hp: t.shield_max,
            shield_ticks: 0,
            percent: 0.0,
            lives: t.initial_lives,
            alive: true,
            respawn_timer: 0,
            drop_platform: None,
            air_dodge_ok: true,
            tint: Tint::Normal,
            hit_since_respawn: false,
        }
    }

    /// Dodging grants invulnerability; nothing else does.
    pub fn invulnerable(&self) -> bool {
        self.dodge.active()
    }

    fn clear_tint(&mut self, from: Tint) {
        if self.tint == from {
            self.tint = Tint::Normal;
        }
    }
}

// ══════════════════════════════════════════════════════════════
// Transition table
// ══════════════════════════════════════════════════════════════

fn attacking(b: &Body) -> bool { b.attack_timer > 0 }
fn dodging(b: &Body) -> bool { b.dodge.active() }
fn hurt(b: &Body) -> bool { b.hurt_timer > 0 }
fn stunned(b: &Body) -> bool { b.stun_timer > 0 }
fn rising(b: &Body) -> bool { b.vel.y < 0.0 }
fn knocked_out(b: &Body) -> bool { !b.alive }
fn alive(b: &Body) -> bool { b.alive }
fn shielding(b: &Body) -> bool { b.shield_attempting }
fn not_shielding(b: &Body) -> bool { !b.shield_attempting }
fn grounded_moving(b: &Body) -> bool { b.on_ground && b.vel.x != 0.0 }
fn grounded_still(b: &Body) -> bool { b.on_ground && b.vel.x == 0.0 }
fn still(b: &Body) -> bool { b.vel.x == 0.0 }
fn airborne_falling(b: &Body) -> bool { !b.on_ground && b.vel.y > 0.0 }
fn apex_passed(b: &Body) -> bool { b.vel.y >= 0.0 }
fn grounded_shielding(b: &Body) -> bool { b.shield_attempting && b.on_ground }

fn dodge_to_shield(b: &Body) -> bool {
    b.shield_attempting && b.dodge.timer == 0 && b.on_ground
}
fn dodge_to_idle(b: &Body) -> bool {
    !b.shield_attempting && b.dodge.timer == 0 && b.on_ground && !b.dodge.is_grounded_spot()
}
fn dodge_to_fall(b: &Body) -> bool { b.dodge.timer == 0 && !b.on_ground }
fn hurt_over_grounded(b: &Body) -> bool { b.hurt_timer == 0 && b.on_ground }
fn hurt_over_airborne(b: &Body) -> bool { b.hurt_timer == 0 && !b.on_ground }
fn stun_over_grounded(b: &Body) -> bool { b.stun_timer == 0 && b.on_ground }
fn stun_over_airborne(b: &Body) -> bool { b.stun_timer == 0 && !b.on_ground }
fn attack_done_grounded(b: &Body) -> bool { b.done_attacking && b.on_ground }
fn attack_done_airborne(b: &Body) -> bool { b.done_attacking && !b.on_ground }

fn enter_shield(b: &mut Body) { b.shield_ticks = 0; }
fn tick_shield(b: &mut Body) { b.shield_ticks += 1; }

/// Rows are in priority order: the first true guard wins.
pub fn build_fsm() -> Result<Fsm<PState, Body>, FsmError> {
    let g = |f: fn(&Body) -> bool| -> Guard<Body> { f };

    FsmBuilder::new(PState::Idle)
        .state(PState::Idle, vec![
            (PState::Attack, g(attacking)),
            (PState::Dodge, g(dodging)),
            (PState::Run, g(grounded_moving)),
            (PState::Jump, g(rising)),
            (PState::Fall, g(airborne_falling)),
            (PState::Shield, g(shielding)),
            (PState::Hurt, g(hurt)),
            (PState::Stun, g(stunned)),
        ])
        .state(PState::Run, vec![
            (PState::Attack, g(attacking)),
            (PState::Dodge, g(dodging)),
            (PState::Idle, g(still)),
            (PState::Jump, g(rising)),
            (PState::Fall, g(airborne_falling)),
            (PState::Hurt, g(hurt)),
            (PState::Shield, g(grounded_shielding)),
            (PState::Stun, g(stunned)),
        ])
        .state(PState::Jump, vec![
            (PState::Attack, g(attacking)),
            (PState::Fall, g(apex_passed)),
            (PState::Ko, g(knocked_out)),
            (PState::Dodge, g(dodging)),
            (PState::Hurt, g(hurt)),
        ])
        .state(PState::Fall, vec![
            (PState::Attack, g(attacking)),
            (PState::Idle, g(grounded_still)),
            (PState::Run, g(grounded_moving)),
            (PState::Jump, g(rising)),
            (PState::Ko, g(knocked_out)),
            (PState::Dodge, g(dodging)),
            (PState::Hurt, g(hurt)),
        ])
        .state(PState::Shield, vec![
            (PState::Stun, g(stunned)),
            (PState::Hurt, g(hurt)),
            (PState::Idle, g(not_shielding)),
            (PState::Dodge, g(dodging)),
            (PState::Jump, g(rising)),
        ])
        .state(PState::Dodge, vec![
            (PState::Shield, g(dodge_to_shield)),
            (PState::Idle, g(dodge_to_idle)),
            (PState::Fall, g(dodge_to_fall)),
        ])
        .state(PState::Hurt, vec![
            (PState::Idle, g(hurt_over_grounded)),
            (PState::Fall, g(hurt_over_airborne)),
        ])
        .state(PState::Stun, vec![
            (PState::Idle, g(stun_over_grounded)),
            (PState::Fall, g(stun_over_airborne)),
        ])
        .state(PState::Attack, vec![
            (PState::Idle, g(attack_done_grounded)),
            (PState::Fall, g(attack_done_airborne)),
        ])
        .state(PState::Ko, vec![(PState::Idle, g(alive))])
        .on_enter(PState::Shield, enter_shield as Hook<Body>)
        .on_update(PState::Shield, tick_shield as Hook<Body>)
        .build()
}

// ══════════════════════════════════════════════════════════════
// Player
// ══════════════════════════════════════════════════════════════

/// What happened to one player during `update`; the match layer turns this
/// into events and collects spawned hitboxes.
#[derive(Clone, Debug, Default)]
pub struct PlayerTick {
    pub jumped: bool,
    pub dodge_started: Option<DodgeKind>,
    pub dodge_steered: bool,
    pub attack: Option<Attack>,
    pub shield_broken: bool,
    pub landed: bool,
    pub knocked_out: bool,
    pub respawned: bool,
    pub entered: Option<PState>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum HitOutcome {
    /// Dead or invulnerable defender; nothing changed.
    Ignored,
    Shielded { broke: bool },
    Hurt { knockback: f32 },
}

pub struct Player {
    pub id: PlayerId,
    pub controls: Controls,
    spawn: Spawn,
    pub body: Body,
    fsm: Fsm<PState, Body>,
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(id: PlayerId, spawn: Spawn, controls: Controls, t: &Tuning) -> Result<Self, FsmError> {
        Ok(Player {
            id,
            controls,
            spawn,
            body: Body::fresh(&spawn, t),
            fsm: build_fsm()?,
            stats: PlayerStats::default(),
        })
    }

    // ── Output surface ──

    pub fn state(&self) -> PState { self.fsm.state() }
    pub fn state_name(&self) -> &'static str { self.fsm.state().name() }
    pub fn is_alive(&self) -> bool { self.body.alive }
    pub fn lives(&self) -> u32 { self.body.lives }
    pub fn is_invulnerable(&self) -> bool { self.body.invulnerable() }

    /// Out of lives and waiting on nothing.
    pub fn is_eliminated(&self) -> bool {
        !self.body.alive && self.body.lives == 0
    }

    // ── Per-tick update ──

    pub fn update(&mut self, frame: &InputFrame, stage: &Stage, t: &Tuning) -> PlayerTick {
        let mut out = PlayerTick::default();
        let controls = self.controls;
        let input = ActionInput::new(frame, &controls);

        if !self.body.alive {
            self.body.respawn_timer = self.body.respawn_timer.saturating_sub(1);
            if self.body.respawn_timer == 0 && self.body.lives > 0 {
                self.respawn(t);
                out.respawned = true;
            }
            return out;
        }

        if stage.in_blast_zone(&self.body.rect) {
            self.knock_out(t);
            out.knocked_out = true;
            return out;
        }

        let state = self.fsm.state();

        // Shield stamina
        if state == PState::Shield {
            let before = self.body.shield_hp;
            self.body.shield_hp = (before - t.shield_regen).max(0.0);
            if before > 0.0 && self.body.shield_hp == 0.0 {
                self.start_stun(t);
                out.shield_broken = true;
                debug!(player = self.id.0, "shield drained; stunned");
            }
        } else {
            self.body.shield_hp = (self.body.shield_hp + t.shield_regen).min(t.shield_max);
        }

        if !input.held(Action::Shield) && !input.pressed(Action::Shield) {
            self.body.shield_attempting = false;
        }

        let was_airborne = !self.body.on_ground;

        // Actions and horizontal movement
        let locked = matches!(state, PState::Dodge | PState::Hurt | PState::Stun)
            || self.body.hurt_timer > 0
            || self.body.stun_timer > 0;
        if !locked {
            let dodge_started = self.handle_actions(&input, state, t, &mut out);
            if !dodge_started {
                self.handle_move(&input, state, t);
            }
        } else if state == PState::Dodge && self.body.dodge.can_steer() {
            let inp = DodgeInput::read(&input);
            if let Some(dir) = dodge::resolve_direction(&inp, self.body.on_ground, self.body.vel.x, true) {
                out.dodge_steered = dodge::steer(&mut self.body.dodge, dir, &mut self.body.vel, t);
            }
        }

        // Gravity
        if self.body.dodge.is_grounded_spot() {
            self.body.vel.y = 0.0;
        } else {
            physics::apply_gravity(&mut self.body.vel, t);
        }

        // Edge guard
        let edge_guarded = self.body.dodge.active() && self.body.on_ground;
        if edge_guarded {
            dodge::guard_edge(&mut self.body.dodge, &mut self.body.rect, &mut self.body.vel, &stage.platforms);
        }

        physics::move_rect(&mut self.body.rect, self.body.vel);

        // Vertical collision
        let down_held = input.held(Action::Down);
        let prevent_drop = self.body.dodge.is_grounded_spot() || (state == PState::Shield && down_held);
        let v = physics::solve_vertical(
            &mut self.body.rect,
            &mut self.body.vel,
            &stage.platforms,
            down_held && !prevent_drop,
            self.body.drop_platform,
        );
        self.body.on_ground = v.on_ground;
        self.body.drop_platform = v.drop_platform;

        if self.body.on_ground
            && physics::correct_penetration(&mut self.body.rect, &stage.platforms, self.body.drop_platform)
        {
            warn!(player = self.id.0, "grounded body still penetrating; re-clamped");
        }

        if edge_guarded && self.body.on_ground {
            dodge::reclamp(&mut self.body.rect, &mut self.body.vel, &stage.platforms);
        }

        if self.body.on_ground && was_airborne {
            self.body.jumps_remaining = t.max_jumps;
            self.body.air_dodge_ok = true;
            out.landed = true;
        }

        self.tick_timers(&input);

        if let Some(s) = self.fsm.update(&mut self.body) {
            trace!(player = self.id.0, from = state.name(), to = s.name(), "state change");
            out.entered = Some(s);
        }
        out
    }

    /// Jump, then dodge, then shield, then attack. Returns true when a dodge
    /// started (or was steered) this tick, which suppresses movement.
    fn handle_actions(&mut self, input: &ActionInput, state: PState, t: &Tuning, out: &mut PlayerTick) -> bool {
        let b = &mut self.body;

        if input.pressed(Action::Up) && b.jumps_remaining > 0 {
            b.vel.y = t.jump_velocity;
            b.jumps_remaining -= 1;
            b.shield_attempting = false;
            out.jumped = true;
            return false;
        }

        let can_dodge = matches!(state, PState::Idle | PState::Jump | PState::Fall | PState::Shield)
            && !b.dodge.active();
        if can_dodge {
            let inp = DodgeInput::read(input);
            if let Some(dir) = dodge::resolve_direction(&inp, b.on_ground, b.vel.x, false) {
                // A resolved request ends action handling even when the air
                // dodge has already been spent.
                if !(b.on_ground || b.air_dodge_ok) {
                    return false;
                }
                let from_ground = b.on_ground;
                b.dodge = dodge::start(dir, from_ground, &mut b.vel, t);
                b.tint = Tint::Dodging;
                if !from_ground {
                    b.air_dodge_ok = false;
                }
                out.dodge_started = Some(b.dodge.kind);
                debug!(player = self.id.0, kind = ?b.dodge.kind, "dodge");
                return true;
            }
        }

        let can_shield = b.on_ground
            && matches!(state, PState::Idle | PState::Shield | PState::Dodge | PState::Run)
            && !b.dodge.active();
        if input.held(Action::Shield) && can_shield {
            b.shield_attempting = true;
        } else if state != PState::Dodge {
            b.shield_attempting = false;
        }

        if input.pressed(Action::Attack) && !matches!(state, PState::Shield | PState::Dodge) {
            out.attack = Some(Attack::spawn(self.id, &b.rect, b.facing_right, &t.attack));
            self.stats.attacks_made += 1;
            b.done_attacking = false;
            b.attack_timer = t.attack_frames;
        }
        false
    }

    fn handle_move(&mut self, input: &ActionInput, state: PState, t: &Tuning) {
        let b = &mut self.body;
        b.facing_right = physics::step_horizontal(
            &mut b.vel,
            b.facing_right,
            b.on_ground,
            input.held(Action::Left),
            input.held(Action::Right),
            state == PState::Shield,
            t,
        );
    }

    fn tick_timers(&mut self, input: &ActionInput) {
        let b = &mut self.body;
        if b.hurt_timer > 0 {
            b.hurt_timer -= 1;
            if b.hurt_timer == 0 {
                b.clear_tint(Tint::Hurt);
            }
        }
        if b.stun_timer > 0 {
            b.stun_timer -= 1;
            if b.stun_timer == 0 {
                b.clear_tint(Tint::Stunned);
            }
        }
        if b.dodge.tick() {
            b.clear_tint(Tint::Dodging);
            b.vel.x = 0.0;
            // Still holding shield on the ground: go straight back into it.
            b.shield_attempting = input.held(Action::Shield) && b.on_ground;
        }
        if b.attack_timer > 0 {
            b.attack_timer -= 1;
            if b.attack_timer == 0 {
                b.done_attacking = true;
            }
        }
    }

    // ── Hits ──

    /// Apply an attack to this player. Dead or invulnerable players are
    /// left untouched.
    pub fn receive_hit(&mut self, atk: &Attack, t: &Tuning) -> HitOutcome {
        if !self.body.alive || self.body.invulnerable() {
            return HitOutcome::Ignored;
        }
        self.body.hit_since_respawn = true;
        self.stats.hits_received += 1;

        if self.body.shield_attempting && self.body.shield_hp > 0.0 {
            self.body.shield_hp = (self.body.shield_hp - atk.damage).max(0.0);
            let broke = self.body.shield_hp == 0.0;
            if broke {
                self.start_stun(t);
                debug!(player = self.id.0, "shield broken by hit");
            }
            return HitOutcome::Shielded { broke };
        }

        self.start_hurt(t);
        self.body.percent += atk.damage;
        let kb = atk.knockback_base + atk.knockback_scale * self.body.percent;
        let dir = if atk.facing_right { 1.0 } else { -1.0 };
        let angle = atk.knockback_angle_deg.to_radians();
        self.body.vel = Vec2::new(kb * angle.cos() * dir, -kb * angle.sin());
        HitOutcome::Hurt { knockback: kb }
    }

    fn start_hurt(&mut self, t: &Tuning) {
        self.body.hurt_timer = t.hurt_frames;
        self.body.tint = Tint::Hurt;
    }

    fn start_stun(&mut self, t: &Tuning) {
        self.body.stun_timer = t.stun_frames;
        self.body.tint = Tint::Stunned;
        self.body.vel = Vec2::ZERO;
        self.body.shield_attempting = false;
    }

    // ── KO / respawn ──

    fn knock_out(&mut self, t: &Tuning) {
        if !self.body.hit_since_respawn {
            self.stats.suicides += 1;
        }
        self.body.lives = self.body.lives.saturating_sub(1);
        self.body.alive = false;
        self.body.respawn_timer = t.respawn_frames;
        self.body.rect.set_center(Vec2::new(-1000.0, -1000.0));
        self.body.vel = Vec2::ZERO;
        self.fsm.force(PState::Ko, &mut self.body);
        info!(player = self.id.0, lives = self.body.lives, "knocked out");
    }

    fn respawn(&mut self, t: &Tuning) {
        let lives = self.body.lives;
        self.body = Body::fresh(&self.spawn, t);
        self.body.lives = lives;
        info!(player = self.id.0, lives, "respawned");
    }

    /// Back to the spawn point with full lives and an idle state machine.
    pub fn reset(&mut self, t: &Tuning) {
        self.body = Body::fresh(&self.spawn, t);
        self.fsm.reset(PState::Idle);
        self.stats = PlayerStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_stage, AttackTuning};
    use crate::domain::input::{InputTracker, KeyId};
    use crate::domain::stage::Platform;

    fn t() -> Tuning { Tuning::default() }

    /// Flat stage: one wide thick floor with its top at y=400 and one thin
    /// platform above it with its top at y=300 spanning x 200..350.
    fn stage() -> Stage {
        Stage {
            width: 960.0,
            height: 540.0,
            blast_padding: 50.0,
            platforms: vec![
                Platform::thick(Rect::new(0.0, 400.0, 960.0, 80.0)),
                Platform::thin(Rect::new(200.0, 300.0, 150.0, 20.0)),
            ],
        }
    }

    fn player_at(x_mid: f32, bottom: f32) -> Player {
        let spawn = Spawn { point: Vec2::new(x_mid, bottom), facing_right: true };
        Player::new(PlayerId(0), spawn, Controls::default_p1(), &t()).unwrap()
    }

    /// Drives a player with scripted key presses.
    struct Rig {
        p: Player,
        stage: Stage,
        keys: InputTracker,
    }

    impl Rig {
        fn new(x_mid: f32, bottom: f32) -> Self {
            Rig { p: player_at(x_mid, bottom), stage: stage(), keys: InputTracker::new() }
        }

        fn key(&self, a: Action) -> KeyId { self.p.controls.key(a) }
        fn down(&mut self, a: Action) { let k = self.key(a); self.keys.key_down(k); }
        fn up(&mut self, a: Action) { let k = self.key(a); self.keys.key_up(k); }

        fn tick(&mut self) -> PlayerTick {
            let frame = self.keys.frame();
            self.p.update(&frame, &self.stage, &t())
        }

        fn ticks(&mut self, n: usize) {
            for _ in 0..n { self.tick(); }
        }

        /// Settle onto whatever is below and let the state machine catch up.
        fn settle(&mut self) {
            self.ticks(40);
            assert!(self.p.body.on_ground);
            assert_eq!(self.p.state(), PState::Idle);
        }
    }

    fn attack(damage: f32) -> Attack {
        let tuning = AttackTuning { damage, ..AttackTuning::default() };
        Attack::spawn(PlayerId(1), &Rect::new(0.0, 0.0, 40.0, 60.0), true, &tuning)
    }

    #[test]
    fn table_builds() {
        assert!(build_fsm().is_ok());
    }

    #[test]
    fn lands_and_goes_idle() {
        let mut r = Rig::new(500.0, 380.0);
        let first = r.tick();
        assert!(first.landed || !r.p.body.on_ground);
        r.settle();
        assert_eq!(r.p.body.rect.bottom(), 400.0);
    }

    #[test]
    fn jumps_reset_once_per_landing() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Up);
        let jt = r.tick();
        assert!(jt.jumped);
        assert_eq!(r.p.body.jumps_remaining, 1);
        r.up(Action::Up);

        let mut landings = 0;
        for _ in 0..80 {
            if r.tick().landed {
                landings += 1;
            }
            if r.p.body.on_ground {
                assert_eq!(r.p.body.jumps_remaining, t().max_jumps);
            }
        }
        assert_eq!(landings, 1);
    }

    #[test]
    fn double_jump_then_no_more() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        for expected in [1, 0, 0] {
            r.down(Action::Up);
            r.tick();
            r.up(Action::Up);
            r.tick();
            assert_eq!(r.p.body.jumps_remaining, expected);
        }
    }

    #[test]
    fn walking_sets_facing_and_run_state() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Left);
        r.ticks(2);
        assert_eq!(r.p.body.vel.x, -5.0);
        assert!(!r.p.body.facing_right);
        assert_eq!(r.p.state(), PState::Run);
        r.up(Action::Left);
        r.ticks(30);
        assert_eq!(r.p.body.vel.x, 0.0);
        assert_eq!(r.p.state(), PState::Idle);
    }

    #[test]
    fn grounded_roll_has_dodge_velocity() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Shield);
        r.down(Action::Right);
        let out = r.tick();
        assert_eq!(out.dodge_started, Some(DodgeKind::Rolling { dir: 1, edge_blocked: false }));
        assert_eq!(r.p.body.vel.x, t().dodge_speed);
        assert_eq!(r.p.body.vel.y, 0.0);
        assert!(r.p.is_invulnerable());
        assert_eq!(r.p.state(), PState::Dodge);
    }

    #[test]
    fn spot_dodge_holds_position_on_thin_platform() {
        let mut r = Rig::new(275.0, 300.0);
        r.settle();
        assert_eq!(r.p.body.rect.bottom(), 300.0);
        r.down(Action::Shield);
        r.down(Action::Down);
        let out = r.tick();
        assert_eq!(out.dodge_started, Some(DodgeKind::GroundedSpot));
        for _ in 0..t().dodge_frames {
            assert_eq!(r.p.body.vel, Vec2::ZERO);
            assert_eq!(r.p.body.rect.bottom(), 300.0);
            assert_eq!(r.p.body.drop_platform, None);
            r.tick();
        }
        // Dodge over with shield and down still held: shield, still on top.
        r.tick();
        assert_eq!(r.p.state(), PState::Shield);
        r.ticks(5);
        assert_eq!(r.p.body.rect.bottom(), 300.0);
        assert!(r.p.body.on_ground);
    }

    #[test]
    fn down_on_thin_platform_drops_through() {
        let mut r = Rig::new(275.0, 300.0);
        r.settle();
        r.down(Action::Down);
        r.tick();
        r.up(Action::Down);
        r.ticks(60);
        assert_eq!(r.p.body.rect.bottom(), 400.0);
        assert!(r.p.body.on_ground);
    }

    #[test]
    fn air_dodge_once_per_airtime() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Up);
        r.tick();
        r.up(Action::Up);
        r.tick();

        r.down(Action::Shield);
        let out = r.tick();
        assert_eq!(out.dodge_started, Some(DodgeKind::Air { steered: false }));
        assert_eq!(r.p.body.vel.x, 0.0);
        assert!(!r.p.body.air_dodge_ok);
        r.up(Action::Shield);
        r.ticks(t().dodge_frames as usize + 1);

        r.down(Action::Shield);
        let again = r.tick();
        assert_eq!(again.dodge_started, None);
        r.up(Action::Shield);

        r.ticks(80);
        assert!(r.p.body.on_ground);
        assert!(r.p.body.air_dodge_ok);
    }

    #[test]
    fn neutral_air_dodge_can_be_steered_once() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Up);
        r.tick();
        r.up(Action::Up);
        r.down(Action::Shield);
        r.tick();
        assert_eq!(r.p.state(), PState::Dodge);

        r.down(Action::Left);
        let out = r.tick();
        assert!(out.dodge_steered);
        assert_eq!(r.p.body.vel.x, -t().dodge_speed);
        r.up(Action::Left);
        r.down(Action::Right);
        assert!(!r.tick().dodge_steered);
    }

    #[test]
    fn air_dodge_ending_midair_does_not_shield() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Up);
        r.tick();
        r.up(Action::Up);
        r.tick();

        // Shield stays held through the whole air dodge.
        r.down(Action::Shield);
        let out = r.tick();
        assert_eq!(out.dodge_started, Some(DodgeKind::Air { steered: false }));
        while r.p.body.dodge.active() {
            r.tick();
        }
        assert!(!r.p.body.on_ground);
        assert_eq!(r.p.state(), PState::Fall);
        assert!(!r.p.body.shield_attempting);

        let hp = r.p.body.shield_hp;
        assert!(matches!(r.p.receive_hit(&attack(10.0), &t()), HitOutcome::Hurt { .. }));
        assert_eq!(r.p.body.percent, 10.0);
        assert_eq!(r.p.body.shield_hp, hp);
    }

    #[test]
    fn jump_turns_to_fall_at_apex() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Up);
        r.tick();
        r.up(Action::Up);
        while r.p.body.vel.y < 0.0 {
            assert_eq!(r.p.state(), PState::Jump);
            r.tick();
        }
        assert_eq!(r.p.state(), PState::Fall);
        assert!(!r.p.body.on_ground);
    }

    #[test]
    fn landing_while_moving_goes_to_run() {
        let mut r = Rig::new(500.0, 300.0);
        r.down(Action::Right);
        r.tick();
        assert_eq!(r.p.state(), PState::Fall);
        while !r.p.body.on_ground {
            assert_eq!(r.p.state(), PState::Fall);
            r.tick();
        }
        assert_eq!(r.p.body.vel.x, t().move_speed);
        assert_eq!(r.p.state(), PState::Run);
    }

    /// Tick until the player leaves Hurt and return where it went.
    fn state_after_hurt(r: &mut Rig) -> PState {
        let mut seen_hurt = false;
        for _ in 0..60 {
            r.tick();
            match r.p.state() {
                PState::Hurt => seen_hurt = true,
                s if seen_hurt => return s,
                _ => {}
            }
        }
        panic!("never left hurt (seen: {seen_hurt})");
    }

    #[test]
    fn hurt_on_ground_recovers_to_idle() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        assert!(matches!(r.p.receive_hit(&attack(10.0), &t()), HitOutcome::Hurt { .. }));
        assert_eq!(state_after_hurt(&mut r), PState::Idle);
        assert!(r.p.body.on_ground);
        assert_eq!(r.p.body.hurt_timer, 0);
        assert_eq!(r.p.body.tint, Tint::Normal);
    }

    #[test]
    fn hurt_in_air_recovers_to_fall() {
        let mut r = Rig::new(500.0, 100.0);
        assert!(matches!(r.p.receive_hit(&attack(10.0), &t()), HitOutcome::Hurt { .. }));
        assert_eq!(state_after_hurt(&mut r), PState::Fall);
        assert!(!r.p.body.on_ground);
        assert_eq!(r.p.body.hurt_timer, 0);
    }

    #[test]
    fn roll_next_to_edge_stays_on_platform() {
        // One unit from the thin platform's left edge.
        let mut r = Rig::new(221.0, 300.0);
        r.settle();
        r.down(Action::Shield);
        r.down(Action::Left);
        r.tick();
        while r.p.body.dodge.active() {
            assert!(r.p.body.rect.left() >= 200.0);
            assert_eq!(r.p.body.rect.bottom(), 300.0);
            r.tick();
        }
        assert!(matches!(r.p.body.dodge.kind, DodgeKind::None));
        assert!(r.p.body.rect.left() >= 200.0);
    }

    #[test]
    fn invulnerable_ignores_hits() {
        let mut p = player_at(500.0, 400.0);
        p.body.dodge = Dodge { kind: DodgeKind::GroundedSpot, timer: 5 };
        for dmg in [0.0, 10.0, 999.0] {
            assert_eq!(p.receive_hit(&attack(dmg), &t()), HitOutcome::Ignored);
        }
        assert_eq!(p.body.percent, 0.0);
        assert_eq!(p.body.shield_hp, t().shield_max);
    }

    #[test]
    fn knockback_from_zero_percent() {
        let mut p = player_at(500.0, 400.0);
        let out = p.receive_hit(&attack(10.0), &t());
        assert_eq!(out, HitOutcome::Hurt { knockback: 10.0 });
        assert_eq!(p.body.percent, 10.0);
        let speed = (p.body.vel.x.powi(2) + p.body.vel.y.powi(2)).sqrt();
        assert!((speed - 10.0).abs() < 1e-4);
        assert!(p.body.vel.x > 0.0);
        assert_eq!(p.body.hurt_timer, t().hurt_frames);
        assert_eq!(p.body.tint, Tint::Hurt);
    }

    #[test]
    fn shield_absorbs_then_breaks_into_stun() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Shield);
        r.ticks(2);
        assert_eq!(r.p.state(), PState::Shield);

        let hp = r.p.body.shield_hp;
        assert_eq!(r.p.receive_hit(&attack(10.0), &t()), HitOutcome::Shielded { broke: false });
        assert!((r.p.body.shield_hp - (hp - 10.0)).abs() < 1e-4);
        assert_eq!(r.p.body.percent, 0.0);

        let out = r.p.receive_hit(&attack(500.0), &t());
        assert_eq!(out, HitOutcome::Shielded { broke: true });
        assert_eq!(r.p.body.shield_hp, 0.0);
        r.up(Action::Shield);
        r.tick();
        assert_eq!(r.p.state(), PState::Stun);
        r.ticks(t().stun_frames as usize);
        assert_eq!(r.p.state(), PState::Idle);
    }

    #[test]
    fn shield_drains_while_held_and_regens_after() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Shield);
        r.ticks(11);
        assert!(r.p.body.shield_hp < t().shield_max);
        assert!(r.p.body.shield_ticks >= 9);
        r.up(Action::Shield);
        r.ticks(100);
        assert_eq!(r.p.body.shield_hp, t().shield_max);
        assert_eq!(r.p.state(), PState::Idle);
    }

    #[test]
    fn blast_zone_costs_exactly_one_life() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.p.body.rect.set_left(960.0 + 51.0);
        let out = r.tick();
        assert!(out.knocked_out);
        assert_eq!(r.p.lives(), 2);
        assert!(!r.p.is_alive());
        assert_eq!(r.p.state(), PState::Ko);
        assert_eq!(r.p.stats.suicides, 1);

        for _ in 0..t().respawn_frames - 1 {
            assert!(!r.tick().knocked_out);
            assert!(!r.p.is_alive());
        }
        assert!(r.tick().respawned);
        assert_eq!(r.p.lives(), 2);
        assert_eq!(r.p.body.percent, 0.0);
        r.tick();
        assert_eq!(r.p.state(), PState::Idle);
    }

    #[test]
    fn last_life_eliminates() {
        let mut r = Rig::new(500.0, 400.0);
        r.p.body.lives = 1;
        r.p.body.rect.set_top(540.0 + 51.0);
        r.tick();
        assert!(r.p.is_eliminated());
        r.ticks(200);
        assert!(!r.p.is_alive());
    }

    #[test]
    fn attack_spawns_hitbox_and_counts() {
        let mut r = Rig::new(500.0, 400.0);
        r.settle();
        r.down(Action::Attack);
        let out = r.tick();
        assert!(out.attack.is_some());
        assert_eq!(r.p.stats.attacks_made, 1);
        assert_eq!(r.p.state(), PState::Attack);
        r.up(Action::Attack);
        r.ticks(t().attack_frames as usize);
        assert_eq!(r.p.state(), PState::Idle);
    }

    #[test]
    fn default_stage_spawns_settle() {
        let stage = default_stage();
        let mut p = player_at(280.0, 255.0);
        for _ in 0..60 {
            p.update(&InputFrame::empty(), &stage, &t());
        }
        assert!(p.body.on_ground);
        assert_eq!(p.body.rect.bottom(), 315.0);
    }
}
