/// The step function: advances the match by one tick.
///
/// Processing order:
///   1. Player updates, in roster order (actions → physics → timers → FSM)
///   2. Push resolution over all players
///   3. Hit resolution over all attacks × players
///   4. Attack lifetimes
///   5. Win check
///
/// Push and hits both read final per-tick positions, so they run only after
/// every player has moved.

use tracing::info;

use crate::domain::combat::{self, HitReport};
use crate::domain::input::InputFrame;
use crate::domain::player::HitOutcome;
use crate::domain::push;
use super::event::GameEvent;
use super::world::{MatchState, Phase};

// ══════════════════════════════════════════════════════════════
// Main entry point
// ══════════════════════════════════════════════════════════════

pub fn step(world: &mut MatchState, frame: &InputFrame) -> Vec<GameEvent> {
    if world.phase != Phase::Playing { return vec![]; }

    let mut events: Vec<GameEvent> = Vec::new();
    world.tick += 1;

    update_players(world, frame, &mut events);
    push::resolve_push(&mut world.players);
    resolve_hits(world, &mut events);
    combat::tick_attacks(&mut world.attacks);
    resolve_win(world, &mut events);

    events
}

// ── Players ──

fn update_players(world: &mut MatchState, frame: &InputFrame, events: &mut Vec<GameEvent>) {
    for p in world.players.iter_mut() {
        let suicides_before = p.stats.suicides;
        let out = p.update(frame, &world.stage, &world.tuning);
        let id = p.id;

        if out.jumped {
            events.push(GameEvent::Jumped { player: id });
        }
        if let Some(kind) = out.dodge_started {
            events.push(GameEvent::DodgeStarted { player: id, kind });
        }
        if out.dodge_steered {
            events.push(GameEvent::DodgeSteered { player: id });
        }
        if out.landed {
            events.push(GameEvent::Landed { player: id });
        }
        if let Some(atk) = out.attack {
            events.push(GameEvent::AttackSpawned { player: id });
            world.attacks.push(atk);
        }
        if out.shield_broken {
            events.push(GameEvent::ShieldBroken { player: id });
        }
        if out.knocked_out {
            events.push(GameEvent::KnockedOut {
                player: id,
                lives_left: p.lives(),
                self_destruct: p.stats.suicides > suicides_before,
            });
        }
        if out.respawned {
            events.push(GameEvent::Respawned { player: id });
        }
        if let Some(state) = out.entered {
            events.push(GameEvent::StateChanged { player: id, state });
        }
    }
}

// ── Hits ──

fn resolve_hits(world: &mut MatchState, events: &mut Vec<GameEvent>) {
    let reports = combat::process_hits(&mut world.attacks, &mut world.players, &world.tuning);
    for HitReport { attacker, defender, outcome } in reports {
        let Some(d) = world.player(defender) else { continue };
        match outcome {
            HitOutcome::Ignored => {}
            HitOutcome::Hurt { knockback } => events.push(GameEvent::Hit {
                attacker,
                defender,
                percent: d.body.percent,
                knockback,
            }),
            HitOutcome::Shielded { broke } => {
                events.push(GameEvent::ShieldHit { attacker, defender, shield_hp: d.body.shield_hp });
                if broke {
                    events.push(GameEvent::ShieldBroken { player: defender });
                }
            }
        }
    }
}

// ── Win check ──

/// The match ends once at most one player still has a life to play.
fn resolve_win(world: &mut MatchState, events: &mut Vec<GameEvent>) {
    if world.players.len() < 2 { return; }
    let remaining = world.remaining();
    if remaining.len() > 1 { return; }

    let winner = remaining.first().copied();
    world.phase = Phase::GameOver { winner };
    info!(winner = ?winner.map(|w| w.0), tick = world.tick, "match over");
    events.push(GameEvent::MatchOver { winner });
}
