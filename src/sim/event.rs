/// Events emitted during a simulation step.
/// The presentation layer consumes these for flashes and status lines.

use crate::domain::dodge::DodgeKind;
use crate::domain::player::{PState, PlayerId};

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    Jumped { player: PlayerId },
    DodgeStarted { player: PlayerId, kind: DodgeKind },
    DodgeSteered { player: PlayerId },
    Landed { player: PlayerId },
    StateChanged { player: PlayerId, state: PState },
    AttackSpawned { player: PlayerId },
    Hit { attacker: PlayerId, defender: PlayerId, percent: f32, knockback: f32 },
    ShieldHit { attacker: PlayerId, defender: PlayerId, shield_hp: f32 },
    ShieldBroken { player: PlayerId },
    KnockedOut { player: PlayerId, lives_left: u32, self_destruct: bool },
    Respawned { player: PlayerId },
    MatchOver { winner: Option<PlayerId> },
}
