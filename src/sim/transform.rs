//! Position, rotation and scale of a persisted object

use std::io::{Read, Write};

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::persistence::{GameDataReader, GameDataWriter, Persistable, Result};

/// Base record for every object with a place in the level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for TransformRecord {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl TransformRecord {
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Rotate in local space by an angular velocity (radians/sec) over `dt`
    pub fn rotate(&mut self, angular_velocity: Vec3, dt: f32) {
        if angular_velocity != Vec3::ZERO {
            self.rotation = (self.rotation * Quat::from_scaled_axis(angular_velocity * dt)).normalize();
        }
    }
}

impl Persistable for TransformRecord {
    fn save<W: Write>(&self, writer: &mut GameDataWriter<W>) -> Result<()> {
        writer.write_vec3(self.position)?;
        writer.write_quat(self.rotation)?;
        writer.write_vec3(self.scale)
    }

    fn load<R: Read>(&mut self, reader: &mut GameDataReader<R>) -> Result<()> {
        self.position = reader.read_vec3()?;
        self.rotation = reader.read_quat()?;
        self.scale = reader.read_vec3()?;
        Ok(())
    }
}
