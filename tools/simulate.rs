//! Simulate: headless microgame run for checking catalog timings.
//!
//! Usage: simulate --catalog <file.ron> [--runtime <file.ron>] [--seed <n>]
//!                 [--microgame <id>] [--step <secs>] [--display <px>]
//!                 [--duration <secs>] [--scale <f>] [--extend <secs>]
//!                 [--lose-at <secs>]
//!
//! Picks a microgame (seeded, or by id), starts it for player one and steps
//! frames until it ends, printing the countdown and every collaborator call.
//! Set RUST_LOG=debug for the runtime's own logs.

use microgame_runtime::core::collaborators::SharedDisplay;
use microgame_runtime::core::director::Director;
use microgame_runtime::core::recorder::Recorder;
use microgame_runtime::core::viewport::MemoryAllocator;
use microgame_runtime::schema::microgame::{MicrogameCatalog, RuntimeConfig};
use microgame_runtime::schema::player::{NpcId, PlayerId};
use microgame_runtime::schema::scene::{ObjectId, Scene, SceneId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::process;
use tracing_subscriber::EnvFilter;

/// Stop stepping after this much game time even if nothing ended.
const MAX_GAME_TIME: f64 = 600.0;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut catalog_path = None;
    let mut runtime_path = None;
    let mut microgame_id = None;
    let mut seed: u64 = 42;
    let mut step: f64 = 0.25;
    let mut display_width: i32 = 1280;
    let mut duration = None;
    let mut scale = None;
    let mut extend = None;
    let mut lose_at = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--catalog" if i + 1 < args.len() => {
                i += 1;
                catalog_path = Some(args[i].clone());
            }
            "--runtime" if i + 1 < args.len() => {
                i += 1;
                runtime_path = Some(args[i].clone());
            }
            "--microgame" if i + 1 < args.len() => {
                i += 1;
                microgame_id = Some(args[i].clone());
            }
            "--seed" if i + 1 < args.len() => {
                i += 1;
                seed = parse_or_exit(&args[i], "--seed");
            }
            "--step" if i + 1 < args.len() => {
                i += 1;
                step = parse_or_exit(&args[i], "--step");
            }
            "--display" if i + 1 < args.len() => {
                i += 1;
                display_width = parse_or_exit(&args[i], "--display");
            }
            "--duration" if i + 1 < args.len() => {
                i += 1;
                duration = Some(parse_or_exit::<f64>(&args[i], "--duration"));
            }
            "--scale" if i + 1 < args.len() => {
                i += 1;
                scale = Some(parse_or_exit::<f64>(&args[i], "--scale"));
            }
            "--extend" if i + 1 < args.len() => {
                i += 1;
                extend = Some(parse_or_exit::<f64>(&args[i], "--extend"));
            }
            "--lose-at" if i + 1 < args.len() => {
                i += 1;
                lose_at = Some(parse_or_exit::<f64>(&args[i], "--lose-at"));
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if step <= 0.0 {
        eprintln!("Error: --step must be positive");
        process::exit(1);
    }

    let catalog_path = catalog_path.unwrap_or_else(|| {
        eprintln!("Error: --catalog is required");
        print_usage();
        process::exit(1);
    });
    let catalog = MicrogameCatalog::load_from_ron(Path::new(&catalog_path)).unwrap_or_else(|e| {
        eprintln!("Error loading catalog {}: {}", catalog_path, e);
        process::exit(1);
    });
    let config = match runtime_path {
        Some(path) => RuntimeConfig::load_from_ron(Path::new(&path)).unwrap_or_else(|e| {
            eprintln!("Error loading runtime config {}: {}", path, e);
            process::exit(1);
        }),
        None => RuntimeConfig::default(),
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let definition = match microgame_id {
        Some(ref id) => catalog.get(id).cloned(),
        None => catalog.pick(&mut rng).cloned(),
    }
    .unwrap_or_else(|| {
        eprintln!("Error: no matching microgame in {}", catalog_path);
        process::exit(1);
    });
    let definition = match duration {
        Some(seconds) => definition.with_duration(seconds).unwrap_or_else(|e| {
            eprintln!("Error: --duration: {}", e);
            process::exit(1);
        }),
        None => definition,
    };

    println!(
        "Microgame: {} \"{}\" ({}s, {} on timeout)",
        definition.id,
        definition.display_name,
        definition.initial_duration,
        if definition.win_on_timeout { "win" } else { "lose" }
    );

    let recorder = Recorder::new().with_partner(PlayerId::One, NpcId(1));
    let display = SharedDisplay::new(display_width);
    let mut director = Director::new(
        config,
        recorder.collaborators(),
        Box::new(MemoryAllocator::new()),
        Box::new(display),
    );

    for id in PlayerId::ALL {
        if let Err(e) = director.register_player(id, 64) {
            eprintln!("Error registering {}: {}", id, e);
            process::exit(1);
        }
    }

    let scene = Scene::new(SceneId(1), (1..=4).map(ObjectId));
    let session = director.load_session(definition, scene);
    if let Err(e) = director.start_session(session, PlayerId::One, 0.0) {
        eprintln!("Error starting session: {}", e);
        process::exit(1);
    }
    if let Some(seconds) = extend {
        if let Err(e) = director.extend_session(session, seconds) {
            eprintln!("Error extending session: {}", e);
        }
    }
    if let Some(scale) = scale {
        if let Err(e) = director.set_time_scale(session, 0.0, scale) {
            eprintln!("Error setting time scale: {}", e);
            process::exit(1);
        }
    }

    let hud = match director.player(PlayerId::One) {
        Some(player) => player.hud.clone(),
        None => process::exit(1),
    };
    let mut last_label = String::new();
    let mut now = 0.0;
    while now <= MAX_GAME_TIME {
        if let Some(at) = lose_at {
            if now >= at && director.is_playing(PlayerId::One) {
                println!("[{:>7.2}] ending early with a loss", now);
                if let Err(e) = director.end_session(session, false) {
                    eprintln!("Error ending session: {}", e);
                }
            }
        }

        match director.tick(now) {
            Ok(outcomes) => {
                for outcome in outcomes {
                    println!(
                        "[{:>7.2}] {} {}",
                        now,
                        outcome.owner,
                        if outcome.won { "won" } else { "lost" }
                    );
                }
            }
            Err(e) => {
                eprintln!("Error during tick: {}", e);
                process::exit(1);
            }
        }

        let label = hud.time_remaining();
        if label != last_label && director.is_playing(PlayerId::One) {
            println!("[{:>7.2}] {} | {}", now, hud.title(), label);
            last_label = label;
        }

        if !director.is_playing(PlayerId::One) {
            break;
        }
        now += step;
    }

    if director.is_playing(PlayerId::One) {
        println!("Stopped after {}s of game time without an outcome.", MAX_GAME_TIME);
    }

    let unloaded = recorder.complete_unloads(Ok(()));
    println!("\nCompleted {} scene unload(s); panel loaded: {}", unloaded, hud.is_loaded());

    println!("\nCollaborator calls:");
    for call in recorder.calls() {
        println!("  {:?}", call);
    }

    let record = director.record(PlayerId::One);
    println!("\n{}: {} win(s), {} loss(es)", PlayerId::One, record.wins, record.losses);
}

fn parse_or_exit<T: std::str::FromStr>(value: &str, flag: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Error: invalid value for {}: {}", flag, value);
        process::exit(1);
    })
}

fn print_usage() {
    println!("Usage: simulate --catalog <file.ron> [options]");
    println!();
    println!("Options:");
    println!("  --runtime <file.ron>  Runtime config (pixel depth, layers)");
    println!("  --microgame <id>      Run this microgame instead of a random pick");
    println!("  --seed <n>            RNG seed for the pick (default 42)");
    println!("  --step <secs>         Frame length in game seconds (default 0.25)");
    println!("  --display <px>        Display width in pixels (default 1280)");
    println!("  --duration <secs>     Override the microgame's initial duration");
    println!("  --scale <f>           Time scale applied at start");
    println!("  --extend <secs>       Extra seconds added at start");
    println!("  --lose-at <secs>      End the microgame as a loss at this time");
}
