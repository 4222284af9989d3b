//! Binary save writer
//!
//! Appends fixed-width little-endian values to a byte sink. Nothing in the
//! stream describes itself: the reader has to ask for the same values in the
//! same order.

use std::io::Write;

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Quat, Vec3};

use super::error::{PersistError, Result};
use super::random::RandomState;
use crate::sim::Color;

/// Writer for the binary save format
pub struct GameDataWriter<W: Write> {
    writer: W,
}

impl<W: Write> GameDataWriter<W> {
    /// Create a new writer over a byte sink
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.writer.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.writer.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a collection length prefix
    pub fn write_count(&mut self, count: usize) -> Result<()> {
        let count = i32::try_from(count).map_err(|_| PersistError::CountTooLarge(count))?;
        self.write_i32(count)
    }

    pub fn write_vec3(&mut self, value: Vec3) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)
    }

    /// Write a rotation as x, y, z, w
    pub fn write_quat(&mut self, value: Quat) -> Result<()> {
        self.write_f32(value.x)?;
        self.write_f32(value.y)?;
        self.write_f32(value.z)?;
        self.write_f32(value.w)
    }

    /// Write a color as r, g, b, a
    pub fn write_color(&mut self, value: Color) -> Result<()> {
        self.write_f32(value.r)?;
        self.write_f32(value.g)?;
        self.write_f32(value.b)?;
        self.write_f32(value.a)
    }

    pub fn write_random_state(&mut self, value: &RandomState) -> Result<()> {
        self.writer.write_all(value.as_bytes())?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the writer and return the inner sink
    pub fn into_inner(self) -> W {
        self.writer
    }
}
