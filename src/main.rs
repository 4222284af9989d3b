//! Persisting Objects - headless driver
//!
//! Runs a script of player commands against one session, e.g.
//! `persisting-objects create create tick:30 save level:2 load --dump`

use std::path::PathBuf;

use clap::Parser;
use persisting_objects::Settings;
use persisting_objects::consts::SIM_DT;
use persisting_objects::session::{Command, GameSession};

/// Frames to wait for a level switch or load before giving up on a step
const MAX_WAIT_FRAMES: u32 = 600;

#[derive(Parser, Debug)]
#[command(version, about = "Spawn shapes, save and load them")]
struct Args {
    /// Settings file (JSON); defaults are used if missing
    #[arg(long, default_value = "settings.json")]
    settings: PathBuf,

    /// Override the save directory
    #[arg(long)]
    save_dir: Option<PathBuf>,

    /// Override the save slot
    #[arg(long)]
    slot: Option<u32>,

    /// Override the seed
    #[arg(long)]
    seed: Option<u64>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    write_settings: bool,

    /// Print the live shapes as JSON at the end
    #[arg(long)]
    dump: bool,

    /// Steps: create, destroy, new, save, load, level:N, tick:N
    #[arg(value_parser = parse_step)]
    script: Vec<Step>,
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Command(Command),
    /// Run N simulation frames
    Tick(u32),
}

fn parse_step(s: &str) -> Result<Step, String> {
    let step = match s.to_lowercase().as_str() {
        "create" | "c" => Step::Command(Command::Create),
        "destroy" | "x" => Step::Command(Command::Destroy),
        "new" | "n" => Step::Command(Command::NewGame),
        "save" | "s" => Step::Command(Command::Save),
        "load" | "l" => Step::Command(Command::Load),
        other => {
            let (name, value) = other
                .split_once(':')
                .ok_or_else(|| format!("unknown step '{s}'"))?;
            match name {
                "level" => Step::Command(Command::SelectLevel(
                    value.parse().map_err(|_| format!("bad level in '{s}'"))?,
                )),
                "tick" => Step::Tick(value.parse().map_err(|_| format!("bad frame count in '{s}'"))?),
                _ => return Err(format!("unknown step '{s}'")),
            }
        }
    };
    Ok(step)
}

fn wait_until_idle(session: &mut GameSession) {
    let mut frames = 0;
    while session.is_busy() && frames < MAX_WAIT_FRAMES {
        if let Err(err) = session.update(SIM_DT) {
            log::error!("{}", err);
        }
        frames += 1;
    }
    if session.is_busy() {
        log::warn!("Still busy after {} frames", MAX_WAIT_FRAMES);
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut settings = Settings::load(&args.settings);
    if let Some(dir) = args.save_dir {
        settings.save_dir = dir;
    }
    if let Some(slot) = args.slot {
        settings.save_slot = slot;
    }
    if let Some(seed) = args.seed {
        settings.seed = seed;
    }
    if args.write_settings {
        if let Err(err) = settings.save(&args.settings) {
            log::error!("Could not write settings: {}", err);
        }
    }

    log::info!("Persisting Objects starting (seed {})", settings.seed);
    let mut session = GameSession::from_settings(&settings);
    wait_until_idle(&mut session);

    for step in args.script {
        match step {
            Step::Command(command) => {
                wait_until_idle(&mut session);
                if let Err(err) = session.handle(command) {
                    log::error!("{:?} failed: {}", command, err);
                }
            }
            Step::Tick(frames) => {
                for _ in 0..frames {
                    if let Err(err) = session.update(SIM_DT) {
                        log::error!("{}", err);
                    }
                }
            }
        }
    }
    wait_until_idle(&mut session);

    let state = session.state();
    log::info!(
        "{} shapes in level {} after {} ticks",
        state.shape_count(),
        state.loaded_level_index,
        state.time_ticks
    );

    if args.dump {
        let shapes: Vec<_> = state.shapes().collect();
        match serde_json::to_string_pretty(&shapes) {
            Ok(json) => println!("{json}"),
            Err(err) => log::error!("Could not encode shapes: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_steps() {
        assert!(matches!(parse_step("create"), Ok(Step::Command(Command::Create))));
        assert!(matches!(parse_step("L"), Ok(Step::Command(Command::Load))));
        assert!(matches!(
            parse_step("level:2"),
            Ok(Step::Command(Command::SelectLevel(2)))
        ));
        assert!(matches!(parse_step("tick:30"), Ok(Step::Tick(30))));
        assert!(parse_step("tick:x").is_err());
        assert!(parse_step("jump").is_err());
    }
}
