//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only, owned by the game state
//! - Stable iteration order (shape list order)
//! - No rendering or platform dependencies

pub mod color;
pub mod factory;
pub mod level;
pub mod shape;
pub mod state;
pub mod tick;
pub mod transform;

pub use color::Color;
pub use factory::{MaterialKind, ShapeFactory, ShapeHandle, ShapeKind};
pub use level::{GameLevel, LevelObject, LevelRecord, SpawnZone};
pub use shape::{MaterialId, Shape, ShapeId};
pub use state::{GameState, LoadBody, LoadPrelude, SavedSpawning};
pub use tick::{TickInput, tick};
pub use transform::TransformRecord;
