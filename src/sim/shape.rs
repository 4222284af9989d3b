//! Spawned shapes
//!
//! A shape is a transform plus identity (which prefab and material it was
//! built from), a color and its motion.

use std::io::{Read, Write};

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::color::Color;
use super::transform::TransformRecord;
use crate::persistence::{GameDataReader, GameDataWriter, PersistError, Persistable, Result};

/// Index of a registered shape prefab
pub type ShapeId = u32;

/// Index of a registered material
pub type MaterialId = u32;

/// Save version that introduced shape color
pub const COLOR_SINCE: i32 = 1;
/// Save version that introduced angular and linear velocity
pub const MOTION_SINCE: i32 = 4;

/// A shape entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub transform: TransformRecord,
    /// Assigned once by the factory
    shape_id: Option<ShapeId>,
    material_id: MaterialId,
    pub color: Color,
    /// Radians per second, local space
    pub angular_velocity: Vec3,
    /// Units per second
    pub velocity: Vec3,
}

impl Shape {
    /// A fresh, unidentified shape
    pub fn new() -> Self {
        Self {
            transform: TransformRecord::default(),
            shape_id: None,
            material_id: 0,
            color: Color::WHITE,
            angular_velocity: Vec3::ZERO,
            velocity: Vec3::ZERO,
        }
    }

    /// Prefab identifier, `None` until assigned
    pub fn shape_id(&self) -> Option<ShapeId> {
        self.shape_id
    }

    /// Assign the prefab identifier. Only the first assignment sticks.
    pub fn set_shape_id(&mut self, id: ShapeId) -> Result<()> {
        match self.shape_id {
            None => {
                self.shape_id = Some(id);
                Ok(())
            }
            Some(current) => {
                log::error!("Not allowed to change shape id {} to {}", current, id);
                Err(PersistError::ShapeIdAlreadySet {
                    current,
                    attempted: id,
                })
            }
        }
    }

    pub fn material_id(&self) -> MaterialId {
        self.material_id
    }

    pub fn set_material(&mut self, material_id: MaterialId) {
        self.material_id = material_id;
    }

    /// Put the shape back into its just-built state, keeping its identity
    pub(crate) fn reset(&mut self) {
        let shape_id = self.shape_id;
        *self = Self::new();
        self.shape_id = shape_id;
    }

    /// Advance rotation and position by one step
    pub fn game_update(&mut self, dt: f32) {
        self.transform.rotate(self.angular_velocity, dt);
        self.transform.position += self.velocity * dt;
    }
}

impl Default for Shape {
    fn default() -> Self {
        Self::new()
    }
}

impl Persistable for Shape {
    fn save<W: Write>(&self, writer: &mut GameDataWriter<W>) -> Result<()> {
        self.transform.save(writer)?;
        writer.write_color(self.color)?;
        writer.write_vec3(self.angular_velocity)?;
        writer.write_vec3(self.velocity)
    }

    fn load<R: Read>(&mut self, reader: &mut GameDataReader<R>) -> Result<()> {
        self.transform.load(reader)?;
        self.color = if reader.version() >= COLOR_SINCE {
            reader.read_color()?
        } else {
            Color::WHITE
        };
        if reader.version() >= MOTION_SINCE {
            self.angular_velocity = reader.read_vec3()?;
            self.velocity = reader.read_vec3()?;
        } else {
            self.angular_velocity = Vec3::ZERO;
            self.velocity = Vec3::ZERO;
        }
        Ok(())
    }
}
