//! Fixed timestep simulation tick
//!
//! Core game loop that advances simulation deterministically.

use super::state::GameState;
use crate::consts::MAX_SPAWNS_PER_TICK;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Create one shape now
    pub create: bool,
    /// Destroy one random shape now
    pub destroy: bool,
}

/// Advance the game state by one fixed timestep
pub fn tick(state: &mut GameState, input: &TickInput, dt: f32) {
    if input.create {
        state.create_shape();
    } else if input.destroy {
        state.destroy_shape();
    }

    state.time_ticks += 1;

    state.game_update(dt);

    // Continuous creation/destruction, one shape per whole unit of progress
    state.creation_progress += dt * state.creation_speed;
    for _ in 0..take_whole_units(&mut state.creation_progress, "creation") {
        state.create_shape();
    }

    state.destruction_progress += dt * state.destruction_speed;
    for _ in 0..take_whole_units(&mut state.destruction_progress, "destruction") {
        if !state.destroy_shape() {
            break;
        }
    }
}

/// Remove the whole units from `progress`, at most [`MAX_SPAWNS_PER_TICK`].
/// Units over the cap are dropped.
fn take_whole_units(progress: &mut f32, what: &str) -> u32 {
    if !progress.is_finite() {
        log::warn!("Resetting non-finite {} progress", what);
        *progress = 0.0;
        return 0;
    }
    if *progress < 1.0 {
        return 0;
    }
    let whole = progress.floor();
    *progress -= whole;
    if whole > MAX_SPAWNS_PER_TICK as f32 {
        log::warn!(
            "Capping {} at {} shapes this tick ({} due)",
            what,
            MAX_SPAWNS_PER_TICK,
            whole
        );
        MAX_SPAWNS_PER_TICK
    } else {
        whole as u32
    }
}
