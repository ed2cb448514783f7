/// Entry point and game loop.

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};
use tracing_subscriber::EnvFilter;

use pawbrawl::config::{GameConfig, GeneralConfig};
use pawbrawl::domain::input::InputTracker;
use pawbrawl::sim::event::GameEvent;
use pawbrawl::sim::stats;
use pawbrawl::sim::step;
use pawbrawl::sim::world::{MatchState, Phase};
use pawbrawl::ui::gamepad::GamepadState;
use pawbrawl::ui::input::{KeyboardState, MetaKey};
use pawbrawl::ui::renderer::Renderer;

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    // Config errors are reported before the terminal is touched.
    let config = match GameConfig::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(2);
        }
    };

    init_logging(&config.general);

    let mut world = match MatchState::new(&config) {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Match setup failed: {e}");
            std::process::exit(1);
        }
    };

    let mut renderer = Renderer::new();
    let honor_release = match renderer.init() {
        Ok(enhanced) => enhanced,
        Err(e) => {
            eprintln!("Terminal init failed: {e}");
            let _ = renderer.cleanup();
            return;
        }
    };
    info!(honor_release, tick_rate_ms = config.general.tick_rate_ms, "match started");

    let result = game_loop(&mut world, &mut renderer, &config, honor_release);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    if let Phase::GameOver { winner } = world.phase {
        println!("{}", stats::winner_announcement(winner));
    }
    for line in stats::stats_table(&world.players).lines() {
        println!("{line}");
    }
    println!("{}", stats::final_stocks(&world.players));
}

/// Log to the configured file; the terminal belongs to the renderer.
/// `RUST_LOG` overrides the configured level.
fn init_logging(general: &GeneralConfig) {
    let file = match File::create(&general.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {}: {e}", general.log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&general.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();
    if let Err(e) = installed {
        eprintln!("Logging disabled: {e}");
    }
}

fn game_loop(
    world: &mut MatchState,
    renderer: &mut Renderer,
    config: &GameConfig,
    honor_release: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut tracker = InputTracker::new();
    let mut kb = KeyboardState::new();
    kb.honor_release = honor_release;
    let mut gp = GamepadState::new();
    if gp.connected {
        info!("gamepad detected");
    }

    let mut last_tick = Instant::now();
    let tick_rate = Duration::from_millis(config.general.tick_rate_ms);

    loop {
        kb.drain_events(&mut tracker);
        gp.update(&mut tracker);

        let menu_open = world.phase != Phase::Playing;
        for meta in kb.meta_keys(menu_open) {
            match meta {
                MetaKey::Quit => {
                    info!(tick = world.tick, "quit");
                    return Ok(());
                }
                MetaKey::Pause => {
                    world.toggle_pause();
                    debug!(phase = ?world.phase, "pause toggled");
                }
                MetaKey::Restart => {
                    world.restart();
                    kb.reset(&mut tracker);
                    gp.reset();
                    info!("match restarted");
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            // One frame per tick; edges gathered while paused are dropped.
            let frame = tracker.frame();
            let events = step::step(world, &frame);
            log_events(&events);
            last_tick = Instant::now();
        }

        renderer.render(world)?;
        std::thread::sleep(FRAME_SLEEP);
    }
}

fn log_events(events: &[GameEvent]) {
    for ev in events {
        match ev {
            GameEvent::KnockedOut { .. } | GameEvent::MatchOver { .. } | GameEvent::ShieldBroken { .. } => {
                info!(event = ?ev)
            }
            GameEvent::Hit { .. } | GameEvent::ShieldHit { .. } => debug!(event = ?ev),
            _ => trace!(event = ?ev),
        }
    }
}
