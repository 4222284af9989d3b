//! Persistable record contract
//!
//! A record writes the current layout unconditionally and reads whatever the
//! stream's version says is there. Records that extend another record embed
//! it and save/load it first, then append their own fields.

use std::io::{Read, Write};

use super::error::Result;
use super::reader::GameDataReader;
use super::writer::GameDataWriter;

/// A typed unit of persisted state
pub trait Persistable {
    /// Write this record's fields in the current layout
    fn save<W: Write>(&self, writer: &mut GameDataWriter<W>) -> Result<()>;

    /// Read this record's fields as laid out for `reader.version()`
    fn load<R: Read>(&mut self, reader: &mut GameDataReader<R>) -> Result<()>;
}
