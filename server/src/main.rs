use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;

use deephold_core::catalog::Catalog;
use deephold_core::constants::TICK_US;
use deephold_core::types::WorldPos;
use deephold_server::config::Config;
use deephold_server::world::{seed_overworld, World};
use deephold_server::{levels, persist, tick};

fn setup_signal_handling(
    quit_flag: Arc<AtomicBool>,
) -> anyhow::Result<(std::thread::JoinHandle<()>, signal_hook::iterator::Handle)> {
    let mut signals =
        Signals::new([SIGINT, SIGTERM, SIGQUIT, SIGHUP]).context("installing signal handler")?;
    let handle = signals.handle();

    let signal_thread = std::thread::spawn(move || {
        for sig in signals.forever() {
            match sig {
                SIGINT | SIGTERM | SIGQUIT => {
                    if !quit_flag.load(Ordering::SeqCst) {
                        log::info!("Got signal to terminate. Shutdown initiated...");
                    } else {
                        log::info!("Alright, alright, I'm already terminating!");
                    }
                    quit_flag.store(true, Ordering::SeqCst);
                }
                _ => {
                    log::warn!("Received unsupported signal: {}", sig);
                }
            }
        }
    });

    Ok((signal_thread, handle))
}

fn save_world(world: &World) -> anyhow::Result<()> {
    let dir = std::path::Path::new("save");
    std::fs::create_dir_all(dir).context("creating save directory")?;
    std::fs::write(dir.join("monsters.bin"), persist::save_monsters(world)?)?;
    std::fs::write(dir.join("items.bin"), persist::save_items(world)?)?;
    for wpos in world.levels.positions() {
        if let Some(grid) = world.levels.grid(wpos) {
            let name = format!("level_{}_{}_{}.bin", wpos.wx, wpos.wy, wpos.wz);
            std::fs::write(dir.join(name), persist::save_grid(grid)?)?;
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    deephold_core::initialize_logger(log::LevelFilter::Info, Some("deephold-server.log"))
        .unwrap_or_else(|e| {
            eprintln!("Failed to initialize logger: {}. Exiting.", e);
            process::exit(1);
        });

    log::info!(
        "Starting Deephold server at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    log::info!("Process PID: {}", process::id());

    let quit_flag = Arc::new(AtomicBool::new(false));
    let (signal_thread, handle) = setup_signal_handling(quit_flag.clone())?;

    let cfg = Config::load();
    let world_seed = std::env::var("DEEPHOLD_WORLD_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(1)
        });
    log::info!("World seed: {}", world_seed);

    let mut world = World::new(cfg, Catalog::builtin(), world_seed);
    seed_overworld(&mut world);

    // The capital is always live.
    let capital = WorldPos::new(32, 32, 0);
    levels::acquire(&mut world, capital).context("generating the capital")?;
    world.admin.runlevel = 1;

    log::info!("Entering main game loop...");
    let tick_period = Duration::from_micros(TICK_US as u64);
    let mut next_tick = Instant::now();

    while !quit_flag.load(Ordering::SeqCst) {
        tick::world_tick(&mut world);

        next_tick += tick_period;
        let now = Instant::now();
        if next_tick > now {
            std::thread::sleep(next_tick - now);
        } else if now - next_tick > tick_period * 200 {
            // Serious slowness; drop the backlog rather than spiral.
            log::warn!("Server too slow");
            next_tick = now;
        }
    }

    log::info!("Shutdown signal received, exiting main loop...");
    world.admin.runlevel = 2;
    for pid in world.players.ids() {
        tick::logout(&mut world, pid);
    }

    if let Err(e) = save_world(&world) {
        log::error!("Failed to save world state: {}", e);
    }

    log::info!("Server shutdown complete.");

    handle.close();
    signal_thread.join().unwrap_or_else(|e| {
        log::error!("Failed to join signal handling thread: {:?}", e);
    });

    Ok(())
}
