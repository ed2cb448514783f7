/// MatchState: the complete snapshot of a running match.
///
/// Players are stored in roster order; `PlayerId(i)` is `players[i]`.
/// Attacks refer to their owner by id, so the roster never moves while a
/// match runs. `restart()` rebuilds players and clears attacks in place.

use thiserror::Error;

use crate::config::{GameConfig, Tuning};
use crate::domain::combat::Attack;
use crate::domain::fsm::FsmError;
use crate::domain::player::{Player, PlayerId};
use crate::domain::stage::Stage;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Playing,
    Paused,
    /// `winner` is `None` when the last players went out together.
    GameOver { winner: Option<PlayerId> },
}

#[derive(Debug, Error)]
pub enum SimError {
    #[error("player state machine: {0}")]
    Fsm(#[from] FsmError),
}

pub struct MatchState {
    pub tick: u64,
    pub phase: Phase,
    pub players: Vec<Player>,
    pub attacks: Vec<Attack>,
    pub stage: Stage,
    pub tuning: Tuning,
}

impl MatchState {
    pub fn new(cfg: &GameConfig) -> Result<Self, SimError> {
        let players = cfg
            .spawns
            .iter()
            .zip(cfg.controls.iter())
            .enumerate()
            .map(|(i, (spawn, controls))| Player::new(PlayerId(i), *spawn, *controls, &cfg.tuning))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(MatchState {
            tick: 0,
            phase: Phase::Playing,
            players,
            attacks: Vec::new(),
            stage: cfg.stage.clone(),
            tuning: cfg.tuning.clone(),
        })
    }

    /// Fresh lives, positions and stats for everyone.
    pub fn restart(&mut self) {
        for p in &mut self.players {
            p.reset(&self.tuning);
        }
        self.attacks.clear();
        self.tick = 0;
        self.phase = Phase::Playing;
    }

    pub fn toggle_pause(&mut self) {
        self.phase = match self.phase {
            Phase::Playing => Phase::Paused,
            Phase::Paused => Phase::Playing,
            over => over,
        };
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(id.0)
    }

    /// Players that still have a life to play.
    pub fn remaining(&self) -> Vec<PlayerId> {
        self.players.iter().filter(|p| !p.is_eliminated()).map(|p| p.id).collect()
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, Phase::GameOver { .. })
    }
}
