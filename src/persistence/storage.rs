//! Save file storage
//!
//! Saves go to a temp file that is renamed over the save slot once fully
//! written and synced. Loading a game may have to wait for the level host, so
//! it runs as a resumable [`LoadOperation`].

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read};
use std::path::{Path, PathBuf};

use super::error::{PersistError, Result};
use super::reader::GameDataReader;
use super::record::Persistable;
use super::writer::GameDataWriter;
use crate::platform::{LevelHost, LevelPoll, switch_level};
use crate::sim::{GameState, LoadBody, LoadPrelude};

/// File name of save slot 0; slot N appends N
pub const SAVE_FILE_NAME: &str = "saveFile";

/// One save slot on disk
#[derive(Debug, Clone)]
pub struct PersistentStorage {
    save_path: PathBuf,
}

impl PersistentStorage {
    /// Slot 0 in `dir`
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self::slot(dir, 0)
    }

    pub fn slot(dir: impl AsRef<Path>, slot: u32) -> Self {
        let name = if slot == 0 {
            SAVE_FILE_NAME.to_string()
        } else {
            format!("{SAVE_FILE_NAME}{slot}")
        };
        Self {
            save_path: dir.as_ref().join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.save_path
    }

    pub fn exists(&self) -> bool {
        self.save_path.is_file()
    }

    pub fn delete(&self) -> Result<()> {
        if self.exists() {
            fs::remove_file(&self.save_path)?;
        }
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        self.save_path.with_extension("tmp")
    }

    /// Write `version` followed by the root record, replacing the slot atomically
    pub fn save<P: Persistable>(&self, root: &P, version: i32) -> Result<()> {
        if let Some(parent) = self.save_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.temp_path();
        let written = Self::write_file(&tmp_path, root, version)
            .and_then(|()| fs::rename(&tmp_path, &self.save_path).map_err(PersistError::from));

        match written {
            Ok(()) => {
                log::info!(
                    "Saved version {} to {}",
                    version,
                    self.save_path.display()
                );
                Ok(())
            }
            Err(err) => {
                let _ = fs::remove_file(&tmp_path);
                log::error!("Save to {} failed: {}", self.save_path.display(), err);
                Err(err)
            }
        }
    }

    fn write_file<P: Persistable>(path: &Path, root: &P, version: i32) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = GameDataWriter::new(BufWriter::new(file));
        writer.write_i32(version)?;
        root.save(&mut writer)?;
        writer.flush()?;
        let file = writer
            .into_inner()
            .into_inner()
            .map_err(|err| err.into_error())?;
        file.sync_all()?;
        Ok(())
    }

    fn open(&self) -> Result<BufReader<File>> {
        Ok(BufReader::new(File::open(&self.save_path)?))
    }

    /// Read the version header and hand the rest of the stream to `root`
    pub fn load<P: Persistable>(&self, root: &mut P) -> Result<()> {
        let loaded = self
            .open()
            .and_then(GameDataReader::new)
            .and_then(|mut reader| root.load(&mut reader));
        if let Err(err) = &loaded {
            log::error!("Load from {} failed: {}", self.save_path.display(), err);
        }
        loaded
    }

    /// Start a game load that switches level before reading the body
    pub fn begin_load(&self) -> Result<LoadOperation<BufReader<File>>> {
        let source = self.open().inspect_err(|err| {
            log::error!("Load from {} failed: {}", self.save_path.display(), err);
        })?;
        Ok(LoadOperation::new(source))
    }
}

/// Where a [`LoadOperation`] is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    ReadingHeader,
    /// Waiting for the level host to finish loading the saved level
    AwaitingLevelReady,
    ReadingBody,
    Done,
    Failed,
}

/// Outcome of one [`LoadOperation::resume`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProgress {
    /// Suspended until the level is ready; resume next frame
    Pending,
    Done,
}

/// A game load split at the level switch.
///
/// The source is owned until the operation finishes or fails. Shapes, spawn
/// rates and randomness only change when the whole body decoded. The level
/// switch itself is the host's and is not undone on failure: after
/// [`PersistError::MissingLevel`] the host no longer holds the previous level,
/// and the caller has to request it again.
pub struct LoadOperation<R: Read> {
    phase: LoadPhase,
    source: Option<R>,
    reader: Option<GameDataReader<R>>,
    prelude: Option<LoadPrelude>,
}

impl<R: Read> LoadOperation<R> {
    pub fn new(source: R) -> Self {
        Self {
            phase: LoadPhase::ReadingHeader,
            source: Some(source),
            reader: None,
            prelude: None,
        }
    }

    pub fn phase(&self) -> LoadPhase {
        self.phase
    }

    /// Advance as far as possible without waiting
    pub fn resume<H: LevelHost + ?Sized>(
        &mut self,
        game: &mut GameState,
        levels: &mut H,
    ) -> Result<LoadProgress> {
        if self.phase == LoadPhase::Failed {
            return Err(PersistError::Cancelled);
        }
        match self.step(game, levels) {
            Ok(progress) => Ok(progress),
            Err(err) => {
                log::error!("Load failed: {}", err);
                self.phase = LoadPhase::Failed;
                self.source = None;
                self.reader = None;
                self.prelude = None;
                Err(err)
            }
        }
    }

    fn step<H: LevelHost + ?Sized>(
        &mut self,
        game: &mut GameState,
        levels: &mut H,
    ) -> Result<LoadProgress> {
        loop {
            match self.phase {
                LoadPhase::ReadingHeader => {
                    let source = self.source.take().ok_or(PersistError::Cancelled)?;
                    let mut reader = GameDataReader::new(source)?;
                    let prelude = LoadPrelude::read(&mut reader)?;
                    switch_level(levels, game.loaded_level_index, prelude.level_index);
                    self.reader = Some(reader);
                    self.prelude = Some(prelude);
                    self.phase = LoadPhase::AwaitingLevelReady;
                }
                LoadPhase::AwaitingLevelReady => {
                    let index = match &self.prelude {
                        Some(prelude) => prelude.level_index,
                        None => return Err(PersistError::Cancelled),
                    };
                    match levels.poll_loaded(index) {
                        LevelPoll::Pending => return Ok(LoadProgress::Pending),
                        LevelPoll::Ready(level) => {
                            game.install_level(level);
                            self.phase = LoadPhase::ReadingBody;
                        }
                        LevelPoll::Missing => return Err(PersistError::MissingLevel(index)),
                    }
                }
                LoadPhase::ReadingBody => {
                    let (Some(mut reader), Some(prelude)) = (self.reader.take(), self.prelude.take())
                    else {
                        return Err(PersistError::Cancelled);
                    };
                    let body = LoadBody::read(&mut reader, &prelude, &mut game.factory)?;
                    game.commit_load(prelude, body);
                    self.phase = LoadPhase::Done;
                    return Ok(LoadProgress::Done);
                }
                LoadPhase::Done => return Ok(LoadProgress::Done),
                LoadPhase::Failed => return Err(PersistError::Cancelled),
            }
        }
    }

    /// Abandon the load. Nothing staged survives.
    pub fn cancel(self) {
        if !matches!(self.phase, LoadPhase::Done | LoadPhase::Failed) {
            log::warn!("Load cancelled while {:?}", self.phase);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SAVE_VERSION;
    use crate::platform::ScriptedLevels;
    use crate::sim::{GameLevel, Shape, TransformRecord};
    use glam::Vec3;

    fn populated_game() -> GameState {
        let mut game = GameState::new(21);
        game.install_level(GameLevel::builtin(2).unwrap());
        game.creation_speed = 1.5;
        for _ in 0..4 {
            game.create_shape();
        }
        game
    }

    fn drive<R: Read>(
        op: &mut LoadOperation<R>,
        game: &mut GameState,
        levels: &mut ScriptedLevels,
    ) -> Result<u32> {
        let mut pending_frames = 0;
        while op.resume(game, levels)? == LoadProgress::Pending {
            pending_frames += 1;
            assert!(pending_frames < 100, "level never became ready");
        }
        Ok(pending_frames)
    }

    #[test]
    fn test_save_then_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PersistentStorage::new(dir.path());
        let original = populated_game();
        storage.save(&original, SAVE_VERSION).unwrap();

        assert!(storage.exists());
        assert!(!storage.temp_path().exists());

        let mut loaded = GameState::new(5);
        loaded.install_level(GameLevel::builtin(2).unwrap());
        storage.load(&mut loaded).unwrap();
        assert_eq!(
            loaded.shapes().collect::<Vec<_>>(),
            original.shapes().collect::<Vec<_>>()
        );
        assert_eq!(loaded.creation_speed, 1.5);
    }

    #[test]
    fn test_file_starts_with_version() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PersistentStorage::new(dir.path());
        storage.save(&TransformRecord::default(), 2).unwrap();

        let bytes = fs::read(storage.path()).unwrap();
        assert_eq!(bytes.len(), 4 + 40);
        assert_eq!(&bytes[..4], &2i32.to_le_bytes());
    }

    /// Writes part of a record, then fails
    struct BrokenRecord;

    impl Persistable for BrokenRecord {
        fn save<W: std::io::Write>(&self, writer: &mut GameDataWriter<W>) -> Result<()> {
            writer.write_i32(99)?;
            Err(PersistError::Io(std::io::Error::other("disk full")))
        }

        fn load<R: Read>(&mut self, _reader: &mut GameDataReader<R>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_save_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PersistentStorage::new(dir.path());
        storage.save(&populated_game(), SAVE_VERSION).unwrap();
        let before = fs::read(storage.path()).unwrap();

        assert!(matches!(
            storage.save(&BrokenRecord, SAVE_VERSION),
            Err(PersistError::Io(_))
        ));
        assert!(!storage.temp_path().exists());
        assert_eq!(fs::read(storage.path()).unwrap(), before);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PersistentStorage::new(dir.path());
        // A non-empty directory in the way of the final path
        fs::create_dir_all(storage.path().join("occupied")).unwrap();

        assert!(storage.save(&TransformRecord::default(), SAVE_VERSION).is_err());
        assert!(!storage.temp_path().exists());
        assert!(storage.path().is_dir());
    }

    #[test]
    fn test_slots_use_separate_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = PersistentStorage::slot(dir.path(), 0);
        let second = PersistentStorage::slot(dir.path(), 2);
        assert_ne!(first.path(), second.path());
        assert!(second.path().ends_with("saveFile2"));

        first.save(&TransformRecord::default(), SAVE_VERSION).unwrap();
        assert!(first.exists());
        assert!(!second.exists());

        first.delete().unwrap();
        assert!(!first.exists());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PersistentStorage::new(dir.path());
        let mut game = populated_game();
        assert!(matches!(
            storage.load(&mut game),
            Err(PersistError::Io(_))
        ));
        assert!(storage.begin_load().is_err());
        assert_eq!(game.shape_count(), 4);
    }

    #[test]
    fn test_save_into_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PersistentStorage::new(dir.path().join("nested").join("saves"));
        storage.save(&TransformRecord::default(), SAVE_VERSION).unwrap();
        assert!(storage.exists());
    }

    #[test]
    fn test_operation_waits_for_level() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PersistentStorage::new(dir.path());
        let mut original = populated_game();
        original.level.as_mut().unwrap().game_update(1.0);
        storage.save(&original, SAVE_VERSION).unwrap();

        let mut levels = ScriptedLevels::builtin(3);
        let mut game = GameState::new(9);
        game.install_level(GameLevel::builtin(1).unwrap());
        let mut op = storage.begin_load().unwrap();
        assert_eq!(op.phase(), LoadPhase::ReadingHeader);

        assert_eq!(op.resume(&mut game, &mut levels).unwrap(), LoadProgress::Pending);
        assert_eq!(op.phase(), LoadPhase::AwaitingLevelReady);
        // Nothing live changes while suspended
        assert_eq!(game.shape_count(), 0);
        assert_eq!(game.loaded_level_index, 1);

        let pending = drive(&mut op, &mut game, &mut levels).unwrap();
        assert_eq!(pending, 2);
        assert_eq!(op.phase(), LoadPhase::Done);

        assert_eq!(game.loaded_level_index, 2);
        assert_eq!(game.level, original.level);
        assert_eq!(
            game.shapes().collect::<Vec<_>>(),
            original.shapes().collect::<Vec<_>>()
        );
        assert_eq!(levels.loaded(), Some(2));
    }

    #[test]
    fn test_operation_future_version_before_level_switch() {
        let mut bytes = (SAVE_VERSION + 3).to_le_bytes().to_vec();
        bytes.extend_from_slice(&[0; 64]);

        let mut levels = ScriptedLevels::builtin(0);
        let mut game = populated_game();
        let before: Vec<Shape> = game.shapes().cloned().collect();

        let mut op = LoadOperation::new(bytes.as_slice());
        assert!(matches!(
            op.resume(&mut game, &mut levels),
            Err(PersistError::UnsupportedVersion { .. })
        ));
        assert_eq!(op.phase(), LoadPhase::Failed);
        assert_eq!(levels.loaded(), None);
        assert_eq!(game.shapes().cloned().collect::<Vec<_>>(), before);
        assert_eq!(game.loaded_level_index, 2);
    }

    #[test]
    fn test_operation_truncated_body_keeps_shapes() {
        let mut writer = GameDataWriter::new(Vec::new());
        writer.write_i32(SAVE_VERSION).unwrap();
        populated_game().save(&mut writer).unwrap();
        let mut bytes = writer.into_inner();
        bytes.truncate(bytes.len() - 1);

        let mut levels = ScriptedLevels::builtin(0);
        let mut game = GameState::new(3);
        game.create_shape();
        let before: Vec<Shape> = game.shapes().cloned().collect();

        let mut op = LoadOperation::new(bytes.as_slice());
        assert!(matches!(
            drive(&mut op, &mut game, &mut levels),
            Err(PersistError::Truncated)
        ));
        assert_eq!(game.shapes().cloned().collect::<Vec<_>>(), before);
        assert_eq!(game.factory.live_count(), 1);
        // Resuming a failed load keeps failing
        assert!(op.resume(&mut game, &mut levels).is_err());
    }

    #[test]
    fn test_operation_missing_level() {
        let mut game = populated_game();
        game.loaded_level_index = 7;
        let mut writer = GameDataWriter::new(Vec::new());
        writer.write_i32(SAVE_VERSION).unwrap();
        game.save(&mut writer).unwrap();
        let bytes = writer.into_inner();

        let mut levels = ScriptedLevels::builtin(0);
        let mut fresh = GameState::new(1);
        let mut op = LoadOperation::new(bytes.as_slice());
        assert!(matches!(
            op.resume(&mut fresh, &mut levels),
            Err(PersistError::MissingLevel(7))
        ));
        assert_eq!(fresh.shape_count(), 0);
    }

    #[test]
    fn test_cancel_while_waiting() {
        let mut writer = GameDataWriter::new(Vec::new());
        writer.write_i32(SAVE_VERSION).unwrap();
        populated_game().save(&mut writer).unwrap();
        let bytes = writer.into_inner();

        let mut levels = ScriptedLevels::builtin(5);
        let mut game = GameState::new(3);
        let handle = game.create_shape();
        game.factory[handle].velocity = Vec3::Y;

        let mut op = LoadOperation::new(bytes.as_slice());
        assert_eq!(op.resume(&mut game, &mut levels).unwrap(), LoadProgress::Pending);
        op.cancel();

        assert_eq!(game.shape_count(), 1);
        assert_eq!(game.factory.live_count(), 1);
        assert_eq!(game.shapes().next().unwrap().velocity, Vec3::Y);
    }
}
