//! Game state: the root record of a save file
//!
//! All state that must be persisted for save/load lives here. Loading is
//! staged: the stream is decoded completely into a [`LoadPrelude`] and a
//! [`LoadBody`] before anything live is replaced.

use std::io::{Read, Write};

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::color::Color;
use super::factory::{ShapeFactory, ShapeHandle};
use super::level::{GameLevel, LevelRecord, SpawnZone};
use super::shape::Shape;
use super::transform::TransformRecord;
use crate::consts::*;
use crate::persistence::{
    GameDataReader, GameDataWriter, PersistError, Persistable, RandomState, Result,
};
use crate::{random_on_unit_sphere, random_rotation};

/// Save version that added per-shape shape and material ids
pub const IDS_SINCE: i32 = 1;
/// Save version that added the loaded level index
pub const LEVEL_INDEX_SINCE: i32 = 2;
/// Save version that added random state, spawn rates and the level record
pub const SPAWNING_SINCE: i32 = 3;

/// Complete game state (deterministic, persistable)
#[derive(Debug)]
pub struct GameState {
    /// Seeds every new game; never persisted
    main_rng: Pcg32,
    /// Gameplay randomness, persisted with the save
    pub rng: Pcg32,
    pub factory: ShapeFactory,
    /// Live shapes in creation order (destroy swaps from the back)
    shapes: Vec<ShapeHandle>,
    pub loaded_level_index: i32,
    /// Level handed over by the level host, if one is loaded
    pub level: Option<GameLevel>,
    /// Shapes created per second
    pub creation_speed: f32,
    pub creation_progress: f32,
    /// Shapes destroyed per second
    pub destruction_speed: f32,
    pub destruction_progress: f32,
    /// Read the saved random state but keep playing with a fresh one
    pub reseed_on_load: bool,
    /// Upper bound for a new shape's spin (radians/sec)
    pub max_angular_speed: f32,
    /// Upper bound for a new shape's drift (units/sec)
    pub max_linear_speed: f32,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl GameState {
    /// Create a new game state with the given seed
    pub fn new(seed: u64) -> Self {
        Self::with_factory(seed, ShapeFactory::default())
    }

    pub fn with_factory(seed: u64, factory: ShapeFactory) -> Self {
        let mut main_rng = Pcg32::seed_from_u64(seed);
        let rng = Pcg32::seed_from_u64(main_rng.random());
        Self {
            main_rng,
            rng,
            factory,
            shapes: Vec::new(),
            loaded_level_index: 0,
            level: None,
            creation_speed: 0.0,
            creation_progress: 0.0,
            destruction_speed: 0.0,
            destruction_progress: 0.0,
            reseed_on_load: false,
            max_angular_speed: std::f32::consts::FRAC_PI_2,
            max_linear_speed: 0.0,
            time_ticks: 0,
        }
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Live shapes in list order
    pub fn shapes(&self) -> impl Iterator<Item = &Shape> + '_ {
        self.shapes.iter().map(|&h| &self.factory[h])
    }

    pub fn handles(&self) -> &[ShapeHandle] {
        &self.shapes
    }

    /// Spawn a random shape into the current level's spawn zone
    pub fn create_shape(&mut self) -> ShapeHandle {
        let handle = self.factory.spawn_random(&mut self.rng);

        let position = match &self.level {
            Some(level) => level.spawn_zone.spawn_point(&mut self.rng),
            None => SpawnZone::default().spawn_point(&mut self.rng),
        };
        let rotation = random_rotation(&mut self.rng);
        let scale = Vec3::splat(self.rng.random_range(MIN_SHAPE_SCALE..MAX_SHAPE_SCALE));
        let color = Color::random(&mut self.rng);
        let angular_velocity = random_on_unit_sphere(&mut self.rng)
            * self.rng.random_range(0.0..=speed_limit(self.max_angular_speed));
        let velocity = random_on_unit_sphere(&mut self.rng)
            * self.rng.random_range(0.0..=speed_limit(self.max_linear_speed));

        let shape = &mut self.factory[handle];
        shape.transform = TransformRecord::new(position, rotation, scale);
        shape.color = color;
        shape.angular_velocity = angular_velocity;
        shape.velocity = velocity;

        self.shapes.push(handle);
        handle
    }

    /// Destroy a random shape, if any
    pub fn destroy_shape(&mut self) -> bool {
        if self.shapes.is_empty() {
            return false;
        }
        let index = self.rng.random_range(0..self.shapes.len());
        let handle = self.shapes.swap_remove(index);
        self.factory.reclaim(handle);
        true
    }

    /// Move every shape and spin the level's objects
    pub fn game_update(&mut self, dt: f32) {
        for &handle in &self.shapes {
            if let Some(shape) = self.factory.get_mut(handle) {
                shape.game_update(dt);
            }
        }
        if let Some(level) = self.level.as_mut() {
            level.game_update(dt);
        }
    }

    /// Clear all shapes and reseed gameplay randomness
    pub fn begin_new_game(&mut self) {
        for handle in self.shapes.drain(..) {
            self.factory.reclaim(handle);
        }
        self.creation_progress = 0.0;
        self.destruction_progress = 0.0;
        let seed: u64 = self.main_rng.random();
        self.rng = Pcg32::seed_from_u64(seed);
    }

    /// Take over a level that the level host finished loading
    pub fn install_level(&mut self, level: GameLevel) {
        self.loaded_level_index = level.index;
        self.level = Some(level);
    }

    /// Replace live state with a fully decoded save
    pub fn commit_load(&mut self, prelude: LoadPrelude, body: LoadBody) {
        for handle in std::mem::replace(&mut self.shapes, body.shapes) {
            self.factory.reclaim(handle);
        }
        match prelude.spawning {
            Some(spawning) => {
                if !self.reseed_on_load {
                    self.rng = spawning.rng;
                }
                self.creation_speed = spawning.creation_speed;
                self.creation_progress = spawning.creation_progress;
                self.destruction_speed = spawning.destruction_speed;
                self.destruction_progress = spawning.destruction_progress;
            }
            None => {
                self.creation_progress = 0.0;
                self.destruction_progress = 0.0;
            }
        }

        // The level index always names the installed level, if there is one
        match &mut self.level {
            Some(level) if level.index == prelude.level_index => {
                if let Some(record) = body.level {
                    level.apply(&record);
                }
            }
            Some(level) => log::warn!(
                "Save is for level {} but level {} is loaded; keeping it and dropping the saved level state",
                prelude.level_index,
                level.index
            ),
            None => {
                self.loaded_level_index = prelude.level_index;
                if body.level.is_some() {
                    log::warn!(
                        "Level {} is not loaded, its saved object state was dropped",
                        prelude.level_index
                    );
                }
            }
        }

        log::info!(
            "Loaded save version {} ({} shapes, level {})",
            prelude.version,
            self.shapes.len(),
            self.loaded_level_index
        );
    }
}

/// Upper bound usable as a sampling range; anything but a finite non-negative cap means none
fn speed_limit(limit: f32) -> f32 {
    if limit.is_finite() && limit > 0.0 {
        limit
    } else {
        0.0
    }
}

/// Spawn state saved since [`SPAWNING_SINCE`]
#[derive(Debug, Clone)]
pub struct SavedSpawning {
    pub rng: Pcg32,
    pub creation_speed: f32,
    pub creation_progress: f32,
    pub destruction_speed: f32,
    pub destruction_progress: f32,
}

/// Fields that precede the level record, decoded before the level switch
#[derive(Debug, Clone)]
pub struct LoadPrelude {
    pub version: i32,
    pub shape_count: usize,
    pub level_index: i32,
    pub spawning: Option<SavedSpawning>,
}

impl LoadPrelude {
    /// Decode the prelude, rejecting versions newer than [`SAVE_VERSION`]
    pub fn read<R: Read>(reader: &mut GameDataReader<R>) -> Result<Self> {
        let version = reader.version();
        if version > SAVE_VERSION {
            log::error!("Unsupported future save version {}", version);
            return Err(PersistError::UnsupportedVersion {
                found: version,
                max: SAVE_VERSION,
            });
        }

        // Saves from before the factory stored the count as the negated version
        let shape_count = if version <= 0 {
            version.unsigned_abs() as usize
        } else {
            reader.read_count()?
        };
        let level_index = if version >= LEVEL_INDEX_SINCE {
            reader.read_i32()?
        } else {
            DEFAULT_LEVEL
        };
        let spawning = if version >= SPAWNING_SINCE {
            let rng = reader.read_random_state()?.restore()?;
            let creation_speed = read_rate(reader, "creation speed")?;
            let creation_progress = read_progress(reader, "creation progress")?;
            let destruction_speed = read_rate(reader, "destruction speed")?;
            let destruction_progress = read_progress(reader, "destruction progress")?;
            Some(SavedSpawning {
                rng,
                creation_speed,
                creation_progress,
                destruction_speed,
                destruction_progress,
            })
        } else {
            None
        };

        Ok(Self {
            version,
            shape_count,
            level_index,
            spawning,
        })
    }
}

/// A per-second rate: finite and not negative
fn read_rate<R: Read>(reader: &mut GameDataReader<R>, field: &'static str) -> Result<f32> {
    let value = reader.read_f32()?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(PersistError::InvalidValue { field, value })
    }
}

/// Accumulated progress, kept below one whole unit
fn read_progress<R: Read>(reader: &mut GameDataReader<R>, field: &'static str) -> Result<f32> {
    let value = read_rate(reader, field)?;
    if value >= 1.0 {
        log::warn!("Saved {} {} clamped below 1", field, value);
        Ok(value.fract())
    } else {
        Ok(value)
    }
}

/// Level record and shapes, staged in the factory but not yet live
#[derive(Debug, Default)]
pub struct LoadBody {
    pub level: Option<LevelRecord>,
    pub shapes: Vec<ShapeHandle>,
}

impl LoadBody {
    /// Decode the rest of the stream. On failure every staged shape is
    /// returned to the factory.
    pub fn read<R: Read>(
        reader: &mut GameDataReader<R>,
        prelude: &LoadPrelude,
        factory: &mut ShapeFactory,
    ) -> Result<Self> {
        let mut body = LoadBody::default();
        match body.read_into(reader, prelude, factory) {
            Ok(()) => Ok(body),
            Err(err) => {
                body.discard(factory);
                Err(err)
            }
        }
    }

    fn read_into<R: Read>(
        &mut self,
        reader: &mut GameDataReader<R>,
        prelude: &LoadPrelude,
        factory: &mut ShapeFactory,
    ) -> Result<()> {
        let version = reader.version();
        if version >= SPAWNING_SINCE {
            let mut record = LevelRecord::default();
            record.load(reader)?;
            self.level = Some(record);
        }

        for _ in 0..prelude.shape_count {
            let (shape_id, material_id) = if version >= IDS_SINCE {
                (reader.read_i32()?, reader.read_i32()?)
            } else {
                (0, 0)
            };
            let handle = factory.try_spawn(shape_id, material_id)?;
            self.shapes.push(handle);
            factory[handle].load(reader)?;
        }
        Ok(())
    }

    /// Return staged shapes to the factory
    pub fn discard(self, factory: &mut ShapeFactory) {
        for handle in self.shapes {
            factory.reclaim(handle);
        }
    }
}

impl Persistable for GameState {
    fn save<W: Write>(&self, writer: &mut GameDataWriter<W>) -> Result<()> {
        writer.write_count(self.shapes.len())?;
        writer.write_i32(self.loaded_level_index)?;
        writer.write_random_state(&RandomState::capture(&self.rng)?)?;
        writer.write_f32(self.creation_speed)?;
        writer.write_f32(self.creation_progress)?;
        writer.write_f32(self.destruction_speed)?;
        writer.write_f32(self.destruction_progress)?;

        let level = self.level.as_ref().map(GameLevel::record).unwrap_or_default();
        level.save(writer)?;

        for shape in self.shapes() {
            writer.write_i32(shape.shape_id().unwrap_or(0) as i32)?;
            writer.write_i32(shape.material_id() as i32)?;
            shape.save(writer)?;
        }
        Ok(())
    }

    fn load<R: Read>(&mut self, reader: &mut GameDataReader<R>) -> Result<()> {
        let prelude = LoadPrelude::read(reader)?;
        let body = LoadBody::read(reader, &prelude, &mut self.factory)?;
        self.commit_load(prelude, body);
        Ok(())
    }
}
