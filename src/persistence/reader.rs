//! Binary save reader
//!
//! Mirrors [`GameDataWriter`](super::GameDataWriter). The schema version is read
//! once when the reader is created; which fields follow for that version is
//! up to the records being loaded.

use std::io::Read;

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Quat, Vec3};

use super::error::{PersistError, Result};
use super::random::{RANDOM_STATE_SIZE, RandomState};
use crate::sim::Color;

/// Reader for the binary save format
pub struct GameDataReader<R: Read> {
    reader: R,
    version: i32,
}

impl<R: Read> GameDataReader<R> {
    /// Create a reader, consuming the version header from the source
    pub fn new(mut reader: R) -> Result<Self> {
        let version = reader
            .read_i32::<LittleEndian>()
            .map_err(PersistError::from_read)?;
        Ok(Self { reader, version })
    }

    /// Create a reader over a body whose header was already consumed
    pub fn from_parts(reader: R, version: i32) -> Self {
        Self { reader, version }
    }

    /// Schema version the stream was written with
    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.reader
            .read_i32::<LittleEndian>()
            .map_err(PersistError::from_read)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.reader
            .read_f32::<LittleEndian>()
            .map_err(PersistError::from_read)
    }

    /// Read a collection length prefix
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_i32()?;
        usize::try_from(count).map_err(|_| PersistError::NegativeCount(count))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_quat(&mut self) -> Result<Quat> {
        let x = self.read_f32()?;
        let y = self.read_f32()?;
        let z = self.read_f32()?;
        let w = self.read_f32()?;
        Ok(Quat::from_xyzw(x, y, z, w))
    }

    pub fn read_color(&mut self) -> Result<Color> {
        let r = self.read_f32()?;
        let g = self.read_f32()?;
        let b = self.read_f32()?;
        let a = self.read_f32()?;
        Ok(Color { r, g, b, a })
    }

    pub fn read_random_state(&mut self) -> Result<RandomState> {
        let mut bytes = [0u8; RANDOM_STATE_SIZE];
        self.reader
            .read_exact(&mut bytes)
            .map_err(PersistError::from_read)?;
        Ok(RandomState::from_bytes(bytes))
    }

    /// Consume the reader and return the inner source
    pub fn into_inner(self) -> R {
        self.reader
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::GameDataWriter;

    #[test]
    fn test_version_read_once() {
        let mut bytes = 3i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&42i32.to_le_bytes());

        let mut reader = GameDataReader::new(bytes.as_slice()).unwrap();
        assert_eq!(reader.version(), 3);
        assert_eq!(reader.read_i32().unwrap(), 42);
        assert_eq!(reader.version(), 3);
    }

    #[test]
    fn test_reads_mirror_writes() {
        let mut writer = GameDataWriter::new(Vec::new());
        writer.write_i32(4).unwrap();
        writer.write_vec3(Vec3::new(1.0, -2.0, 3.5)).unwrap();
        writer.write_quat(Quat::from_rotation_y(0.5)).unwrap();
        writer
            .write_color(Color::new(0.1, 0.2, 0.3, 0.4))
            .unwrap();
        let bytes = writer.into_inner();

        let mut reader = GameDataReader::new(bytes.as_slice()).unwrap();
        assert_eq!(reader.read_vec3().unwrap(), Vec3::new(1.0, -2.0, 3.5));
        assert_eq!(reader.read_quat().unwrap(), Quat::from_rotation_y(0.5));
        assert_eq!(reader.read_color().unwrap(), Color::new(0.1, 0.2, 0.3, 0.4));
    }

    #[test]
    fn test_truncated_value() {
        let mut bytes = 1i32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0, 0]);

        let mut reader = GameDataReader::new(bytes.as_slice()).unwrap();
        assert!(matches!(reader.read_f32(), Err(PersistError::Truncated)));
    }

    #[test]
    fn test_empty_stream_has_no_header() {
        let bytes: &[u8] = &[];
        assert!(matches!(
            GameDataReader::new(bytes),
            Err(PersistError::Truncated)
        ));
    }

    #[test]
    fn test_negative_count_rejected() {
        let bytes = (-1i32).to_le_bytes();
        let mut reader = GameDataReader::from_parts(&bytes[..], 4);
        assert!(matches!(
            reader.read_count(),
            Err(PersistError::NegativeCount(-1))
        ));
    }
}
