//! Persisting Objects - shapes spawned into levels, saved to a versioned binary file
//!
//! Core modules:
//! - `persistence`: Binary writer/reader, record contract, save file storage
//! - `sim`: Deterministic simulation (shapes, factory, levels, game state)
//! - `platform`: Level host abstraction
//! - `session`: Command handling across frames (save, load, new game, levels)
//! - `settings`: JSON configuration

pub mod persistence;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;

pub use persistence::{PersistError, PersistentStorage, Persistable};
pub use settings::Settings;

use glam::{Quat, Vec3};
use rand::Rng;

/// Game configuration constants
pub mod consts {
    /// Save format written by this build; anything newer is rejected on load
    pub const SAVE_VERSION: i32 = 4;

    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;

    /// Maximum substeps per frame (prevents spiral of death)
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Frame time clamp (seconds)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Shapes created (or destroyed) by rate in one tick at most
    pub const MAX_SPAWNS_PER_TICK: u32 = 64;

    /// Level loaded when a save predates level tracking
    pub const DEFAULT_LEVEL: i32 = 1;

    /// Spawned shape scale range
    pub const MIN_SHAPE_SCALE: f32 = 0.1;
    pub const MAX_SHAPE_SCALE: f32 = 1.0;
}

/// Uniform point on the unit sphere
pub fn random_on_unit_sphere<R: Rng>(rng: &mut R) -> Vec3 {
    let z: f32 = rng.random_range(-1.0..=1.0);
    let theta: f32 = rng.random_range(0.0..std::f32::consts::TAU);
    let r = (1.0 - z * z).max(0.0).sqrt();
    Vec3::new(r * theta.cos(), r * theta.sin(), z)
}

/// Uniform point inside the unit ball
pub fn random_inside_unit_sphere<R: Rng>(rng: &mut R) -> Vec3 {
    let u: f32 = rng.random();
    random_on_unit_sphere(rng) * u.cbrt()
}

/// Uniformly distributed rotation (Shoemake's method)
pub fn random_rotation<R: Rng>(rng: &mut R) -> Quat {
    use std::f32::consts::TAU;
    let u1: f32 = rng.random();
    let u2: f32 = rng.random_range(0.0..TAU);
    let u3: f32 = rng.random_range(0.0..TAU);
    let a = (1.0 - u1).sqrt();
    let b = u1.sqrt();
    Quat::from_xyzw(a * u2.sin(), a * u2.cos(), b * u3.sin(), b * u3.cos()).normalize()
}
