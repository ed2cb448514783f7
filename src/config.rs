//! External configuration loader.
//!
//! Reads `config.toml` from the executable's directory (or CWD). A missing
//! file means built-in defaults; every key is optional. Unlike a missing
//! file, a file that is present but unparseable, has unknown keys, or holds
//! out-of-range tuning is an ERROR: the match must not start on values that
//! would be silently clamped.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::geom::{Rect, Vec2};
use crate::domain::input::{Action, Controls, KeyId};
use crate::domain::stage::{Platform, Stage};

// ── Errors ──

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("controls.{player}.{action}: unknown key name {name:?}")]
    UnknownKey { player: &'static str, action: &'static str, name: String },

    #[error("key {name:?} is bound to more than one action")]
    DuplicateKey { name: String },
}

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub general: GeneralConfig,
    pub tuning: Tuning,
    pub stage: Stage,
    pub spawns: [Spawn; 2],
    pub controls: [Controls; 2],
}

#[derive(Clone, Debug)]
pub struct GeneralConfig {
    pub tick_rate_ms: u64,
    pub log_file: PathBuf,
    pub log_level: String,
}

/// Static tuning read by the simulation every tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Tuning {
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub move_speed: f32,
    pub jump_velocity: f32,      // negative = up
    pub max_jumps: u32,
    pub ground_friction: f32,
    pub air_friction: f32,
    pub friction_dead_zone: f32, // |vx| below this snaps to 0

    pub dodge_speed: f32,
    pub dodge_frames: u32,

    pub shield_max: f32,
    pub shield_regen: f32,       // per tick, both directions

    pub hurt_frames: u32,
    pub stun_frames: u32,
    pub attack_frames: u32,      // attacker's commitment, not hitbox lifetime
    pub attack: AttackTuning,

    pub player_width: f32,
    pub player_height: f32,
    pub initial_lives: u32,
    pub respawn_frames: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AttackTuning {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
    pub lifetime: u32,
    pub damage: f32,
    pub knockback_base: f32,
    pub knockback_scale: f32,
    pub knockback_angle_deg: f32,
    pub disappear_on_hit: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spawn {
    /// Bottom-center of the player's box.
    pub point: Vec2,
    pub facing_right: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Tuning {
            gravity: 0.5,
            max_fall_speed: 12.0,
            move_speed: 5.0,
            jump_velocity: -10.0,
            max_jumps: 2,
            ground_friction: 0.8,
            air_friction: 0.95,
            friction_dead_zone: 0.05,
            dodge_speed: 8.0,
            dodge_frames: 15,
            shield_max: 50.0,
            shield_regen: 0.2,
            hurt_frames: 20,
            stun_frames: 60,
            attack_frames: 15,
            attack: AttackTuning::default(),
            player_width: 40.0,
            player_height: 60.0,
            initial_lives: 3,
            respawn_frames: 120, // 2 s at 60 fps
        }
    }
}

impl Default for AttackTuning {
    fn default() -> Self {
        AttackTuning {
            width: 30.0,
            height: 18.0,
            margin: 4.0,
            lifetime: 12,
            damage: 10.0,
            knockback_base: 5.0,
            knockback_scale: 0.5,
            knockback_angle_deg: 0.0,
            disappear_on_hit: false,
        }
    }
}

/// Two thin side platforms above one wide thick main stage.
pub fn default_stage() -> Stage {
    Stage {
        width: 960.0,
        height: 540.0,
        blast_padding: 50.0,
        platforms: vec![
            Platform::thick(Rect::new(80.0, 410.0, 800.0, 80.0)),
            Platform::thin(Rect::new(205.0, 315.0, 150.0, 20.0)),
            Platform::thin(Rect::new(605.0, 315.0, 150.0, 20.0)),
        ],
    }
}

pub fn default_spawns() -> [Spawn; 2] {
    [
        Spawn { point: Vec2::new(280.0, 255.0), facing_right: true },
        Spawn { point: Vec2::new(680.0, 255.0), facing_right: false },
    ]
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            general: GeneralConfig {
                tick_rate_ms: 16,
                log_file: PathBuf::from("pawbrawl.log"),
                log_level: "info".into(),
            },
            tuning: Tuning::default(),
            stage: default_stage(),
            spawns: default_spawns(),
            controls: [Controls::default_p1(), Controls::default_p2()],
        }
    }
}

// ── TOML Schema (struct-level serde defaults) ──

#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlConfig {
    general: TomlGeneral,
    physics: TomlPhysics,
    dodge: TomlDodge,
    shield: TomlShield,
    combat: TomlCombat,
    player: TomlPlayer,
    stage: Option<TomlStage>,
    controls: TomlControls,
}

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
struct TomlGeneral {
    tick_rate_ms: u64,
    log_file: String,
    log_level: String,
}

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
struct TomlPhysics {
    gravity: f32,
    max_fall_speed: f32,
    move_speed: f32,
    jump_velocity: f32,
    max_jumps: u32,
    ground_friction: f32,
    air_friction: f32,
    friction_dead_zone: f32,
}

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
struct TomlDodge {
    speed: f32,
    frames: u32,
}

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
struct TomlShield {
    max_hp: f32,
    regen_rate: f32,
}

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
struct TomlCombat {
    hurt_frames: u32,
    stun_frames: u32,
    attack_frames: u32,
    hitbox_width: f32,
    hitbox_height: f32,
    hitbox_margin: f32,
    hitbox_lifetime: u32,
    damage: f32,
    knockback_base: f32,
    knockback_scale: f32,
    knockback_angle: f32,
    disappear_on_hit: bool,
}

#[derive(Deserialize, Debug)]
#[serde(default, deny_unknown_fields)]
struct TomlPlayer {
    width: f32,
    height: f32,
    initial_lives: u32,
    respawn_frames: u32,
}

/// `[stage]` replaces the whole default layout when present.
#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TomlStage {
    width: f32,
    height: f32,
    #[serde(default = "default_blast_padding")]
    blast_padding: f32,
    spawn_p1: [f32; 2],
    spawn_p2: [f32; 2],
    #[serde(default)]
    platforms: Vec<TomlPlatform>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TomlPlatform {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    #[serde(default)]
    thin: bool,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default, deny_unknown_fields)]
struct TomlControls {
    p1: Option<TomlKeys>,
    p2: Option<TomlKeys>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TomlKeys {
    left: String,
    right: String,
    up: String,
    down: String,
    attack: String,
    shield: String,
}

fn default_blast_padding() -> f32 { 50.0 }

impl Default for TomlGeneral {
    fn default() -> Self {
        let g = GameConfig::default().general;
        TomlGeneral {
            tick_rate_ms: g.tick_rate_ms,
            log_file: g.log_file.to_string_lossy().into_owned(),
            log_level: g.log_level,
        }
    }
}

impl Default for TomlPhysics {
    fn default() -> Self {
        let t = Tuning::default();
        TomlPhysics {
            gravity: t.gravity,
            max_fall_speed: t.max_fall_speed,
            move_speed: t.move_speed,
            jump_velocity: t.jump_velocity,
            max_jumps: t.max_jumps,
            ground_friction: t.ground_friction,
            air_friction: t.air_friction,
            friction_dead_zone: t.friction_dead_zone,
        }
    }
}

impl Default for TomlDodge {
    fn default() -> Self {
        let t = Tuning::default();
        TomlDodge { speed: t.dodge_speed, frames: t.dodge_frames }
    }
}

impl Default for TomlShield {
    fn default() -> Self {
        let t = Tuning::default();
        TomlShield { max_hp: t.shield_max, regen_rate: t.shield_regen }
    }
}

impl Default for TomlCombat {
    fn default() -> Self {
        let t = Tuning::default();
        TomlCombat {
            hurt_frames: t.hurt_frames,
            stun_frames: t.stun_frames,
            attack_frames: t.attack_frames,
            hitbox_width: t.attack.width,
            hitbox_height: t.attack.height,
            hitbox_margin: t.attack.margin,
            hitbox_lifetime: t.attack.lifetime,
            damage: t.attack.damage,
            knockback_base: t.attack.knockback_base,
            knockback_scale: t.attack.knockback_scale,
            knockback_angle: t.attack.knockback_angle_deg,
            disappear_on_hit: t.attack.disappear_on_hit,
        }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        let t = Tuning::default();
        TomlPlayer {
            width: t.player_width,
            height: t.player_height,
            initial_lives: t.initial_lives,
            respawn_frames: t.respawn_frames,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    pub fn load() -> Result<Self, ConfigError> {
        for dir in candidate_dirs() {
            let path = dir.join("config.toml");
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(GameConfig::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    /// Parse and validate TOML text. `origin` is only used in error messages.
    pub fn parse(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let raw: TomlConfig = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        let cfg = raw.resolve()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the simulation cannot run on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.tuning;

        fn positive(field: &'static str, v: f32) -> Result<(), ConfigError> {
            if v.is_finite() && v > 0.0 { Ok(()) } else {
                Err(ConfigError::Invalid { field, reason: format!("must be > 0, got {v}") })
            }
        }
        fn non_negative(field: &'static str, v: f32) -> Result<(), ConfigError> {
            if v.is_finite() && v >= 0.0 { Ok(()) } else {
                Err(ConfigError::Invalid { field, reason: format!("must be >= 0, got {v}") })
            }
        }
        fn unit(field: &'static str, v: f32) -> Result<(), ConfigError> {
            if (0.0..=1.0).contains(&v) { Ok(()) } else {
                Err(ConfigError::Invalid { field, reason: format!("must be within [0, 1], got {v}") })
            }
        }
        fn nonzero(field: &'static str, v: u32) -> Result<(), ConfigError> {
            if v > 0 { Ok(()) } else {
                Err(ConfigError::Invalid { field, reason: "must be > 0".into() })
            }
        }

        if self.general.tick_rate_ms == 0 {
            return Err(ConfigError::Invalid { field: "general.tick_rate_ms", reason: "must be > 0".into() });
        }
        non_negative("physics.gravity", t.gravity)?;
        positive("physics.max_fall_speed", t.max_fall_speed)?;
        non_negative("physics.move_speed", t.move_speed)?;
        if !(t.jump_velocity.is_finite() && t.jump_velocity < 0.0) {
            return Err(ConfigError::Invalid {
                field: "physics.jump_velocity",
                reason: format!("must be negative (up), got {}", t.jump_velocity),
            });
        }
        unit("physics.ground_friction", t.ground_friction)?;
        unit("physics.air_friction", t.air_friction)?;
        non_negative("physics.friction_dead_zone", t.friction_dead_zone)?;
        non_negative("dodge.speed", t.dodge_speed)?;
        nonzero("dodge.frames", t.dodge_frames)?;
        positive("shield.max_hp", t.shield_max)?;
        non_negative("shield.regen_rate", t.shield_regen)?;
        nonzero("combat.hurt_frames", t.hurt_frames)?;
        nonzero("combat.stun_frames", t.stun_frames)?;
        nonzero("combat.attack_frames", t.attack_frames)?;
        positive("combat.hitbox_width", t.attack.width)?;
        positive("combat.hitbox_height", t.attack.height)?;
        nonzero("combat.hitbox_lifetime", t.attack.lifetime)?;
        non_negative("combat.damage", t.attack.damage)?;
        non_negative("combat.knockback_base", t.attack.knockback_base)?;
        non_negative("combat.knockback_scale", t.attack.knockback_scale)?;
        positive("player.width", t.player_width)?;
        positive("player.height", t.player_height)?;
        nonzero("player.initial_lives", t.initial_lives)?;

        let s = &self.stage;
        positive("stage.width", s.width)?;
        positive("stage.height", s.height)?;
        non_negative("stage.blast_padding", s.blast_padding)?;
        if s.platforms.is_empty() {
            return Err(ConfigError::Invalid { field: "stage.platforms", reason: "at least one platform required".into() });
        }
        for p in &s.platforms {
            positive("stage.platforms.w", p.rect.w)?;
            positive("stage.platforms.h", p.rect.h)?;
        }

        let mut seen = std::collections::HashSet::new();
        for c in &self.controls {
            for action in Action::ALL {
                let k = c.key(action);
                if !seen.insert(k) {
                    return Err(ConfigError::DuplicateKey { name: format!("{k:?}") });
                }
            }
        }
        Ok(())
    }
}

impl TomlConfig {
    fn resolve(self) -> Result<GameConfig, ConfigError> {
        let defaults = GameConfig::default();

        let general = GeneralConfig {
            tick_rate_ms: self.general.tick_rate_ms,
            log_file: PathBuf::from(self.general.log_file),
            log_level: self.general.log_level,
        };

        let tuning = Tuning {
            gravity: self.physics.gravity,
            max_fall_speed: self.physics.max_fall_speed,
            move_speed: self.physics.move_speed,
            jump_velocity: self.physics.jump_velocity,
            max_jumps: self.physics.max_jumps,
            ground_friction: self.physics.ground_friction,
            air_friction: self.physics.air_friction,
            friction_dead_zone: self.physics.friction_dead_zone,
            dodge_speed: self.dodge.speed,
            dodge_frames: self.dodge.frames,
            shield_max: self.shield.max_hp,
            shield_regen: self.shield.regen_rate,
            hurt_frames: self.combat.hurt_frames,
            stun_frames: self.combat.stun_frames,
            attack_frames: self.combat.attack_frames,
            attack: AttackTuning {
                width: self.combat.hitbox_width,
                height: self.combat.hitbox_height,
                margin: self.combat.hitbox_margin,
                lifetime: self.combat.hitbox_lifetime,
                damage: self.combat.damage,
                knockback_base: self.combat.knockback_base,
                knockback_scale: self.combat.knockback_scale,
                knockback_angle_deg: self.combat.knockback_angle,
                disappear_on_hit: self.combat.disappear_on_hit,
            },
            player_width: self.player.width,
            player_height: self.player.height,
            initial_lives: self.player.initial_lives,
            respawn_frames: self.player.respawn_frames,
        };

        let (stage, spawns) = match self.stage {
            None => (defaults.stage, defaults.spawns),
            Some(s) => {
                let platforms = s.platforms.iter()
                    .map(|p| {
                        let r = Rect::new(p.x, p.y, p.w, p.h);
                        if p.thin { Platform::thin(r) } else { Platform::thick(r) }
                    })
                    .collect();
                let stage = Stage {
                    width: s.width,
                    height: s.height,
                    blast_padding: s.blast_padding,
                    platforms,
                };
                let spawns = [
                    Spawn { point: Vec2::new(s.spawn_p1[0], s.spawn_p1[1]), facing_right: true },
                    Spawn { point: Vec2::new(s.spawn_p2[0], s.spawn_p2[1]), facing_right: false },
                ];
                (stage, spawns)
            }
        };

        let p1 = match self.controls.p1 {
            Some(k) => k.resolve("p1")?,
            None => defaults.controls[0],
        };
        let p2 = match self.controls.p2 {
            Some(k) => k.resolve("p2")?,
            None => defaults.controls[1],
        };

        Ok(GameConfig { general, tuning, stage, spawns, controls: [p1, p2] })
    }
}

impl TomlKeys {
    fn resolve(&self, player: &'static str) -> Result<Controls, ConfigError> {
        let key = |action: &'static str, name: &str| {
            KeyId::from_name(name).ok_or_else(|| ConfigError::UnknownKey {
                player,
                action,
                name: name.to_string(),
            })
        };
        Ok(Controls {
            left: key("left", &self.left)?,
            right: key("right", &self.right)?,
            up: key("up", &self.up)?,
            down: key("down", &self.down)?,
            attack: key("attack", &self.attack)?,
            shield: key("shield", &self.shield)?,
        })
    }
}

/// Candidate directories to search: exe dir + CWD (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    dirs
}
