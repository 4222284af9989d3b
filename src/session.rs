//! Game session: commands, frame updates and in-flight level/load operations
//!
//! While a level switch or a game load is in flight the simulation does not
//! advance and further commands are refused with [`PersistError::Busy`].

use std::fs::File;
use std::io::BufReader;

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SAVE_VERSION, SIM_DT};
use crate::persistence::{LoadOperation, LoadProgress, PersistError, PersistentStorage, Result};
use crate::platform::{LevelHost, LevelPoll, ScriptedLevels, switch_level};
use crate::settings::Settings;
use crate::sim::{GameState, TickInput, tick};

/// Player commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Spawn one shape on the next tick
    Create,
    /// Destroy one random shape on the next tick
    Destroy,
    NewGame,
    Save,
    Load,
    /// New game in level N
    SelectLevel(i32),
}

enum PendingOp {
    Level(i32),
    Load(LoadOperation<BufReader<File>>),
}

/// One running game bound to a save slot and a level host
pub struct GameSession<H: LevelHost = ScriptedLevels> {
    state: GameState,
    storage: PersistentStorage,
    levels: H,
    input: TickInput,
    accumulator: f32,
    pending: Option<PendingOp>,
}

impl GameSession<ScriptedLevels> {
    /// Session over the built-in levels, starting in the configured level
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.new_game_state(),
            settings.storage(),
            settings.levels(),
            settings.start_level,
        )
    }
}

impl<H: LevelHost> GameSession<H> {
    /// Start a session; `start_level` begins loading right away
    pub fn new(state: GameState, storage: PersistentStorage, mut levels: H, start_level: i32) -> Self {
        switch_level(&mut levels, state.loaded_level_index, start_level);
        Self {
            state,
            storage,
            levels,
            input: TickInput::default(),
            accumulator: 0.0,
            pending: Some(PendingOp::Level(start_level)),
        }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn storage(&self) -> &PersistentStorage {
        &self.storage
    }

    pub fn levels(&self) -> &H {
        &self.levels
    }

    /// A level switch or load is in flight
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn handle(&mut self, command: Command) -> Result<()> {
        if self.is_busy() {
            log::warn!("Ignoring {:?} while a level switch or load is in flight", command);
            return Err(PersistError::Busy);
        }

        match command {
            Command::Create => self.input.create = true,
            Command::Destroy => self.input.destroy = true,
            Command::NewGame => {
                self.state.begin_new_game();
                self.reset_frame();
                log::info!("New game");
            }
            Command::Save => self.storage.save(&self.state, SAVE_VERSION)?,
            Command::Load => {
                let op = self.storage.begin_load()?;
                self.reset_frame();
                self.pending = Some(PendingOp::Load(op));
                self.drive_pending()?;
            }
            Command::SelectLevel(index) => {
                if index < 1 || index > self.levels.level_count() {
                    log::warn!("No level {} to select", index);
                    return Err(PersistError::MissingLevel(index));
                }
                self.state.begin_new_game();
                self.reset_frame();
                switch_level(&mut self.levels, self.state.loaded_level_index, index);
                self.pending = Some(PendingOp::Level(index));
                self.drive_pending()?;
            }
        }
        Ok(())
    }

    /// Advance one frame of `dt` seconds
    pub fn update(&mut self, dt: f32) -> Result<()> {
        if self.is_busy() {
            return self.drive_pending();
        }

        self.accumulator += dt.min(MAX_FRAME_DT);
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            tick(&mut self.state, &self.input, SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // One-shot inputs
            self.input = TickInput::default();
        }
        Ok(())
    }

    fn reset_frame(&mut self) {
        self.accumulator = 0.0;
        self.input = TickInput::default();
    }

    fn drive_pending(&mut self) -> Result<()> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(());
        };

        let finished = match pending {
            PendingOp::Level(index) => match self.levels.poll_loaded(*index) {
                LevelPoll::Pending => Ok(false),
                LevelPoll::Ready(level) => {
                    self.state.install_level(level);
                    log::info!("Level {} ready", index);
                    Ok(true)
                }
                LevelPoll::Missing => Err(PersistError::MissingLevel(*index)),
            },
            PendingOp::Load(op) => op
                .resume(&mut self.state, &mut self.levels)
                .map(|progress| progress == LoadProgress::Done),
        };

        match finished {
            Ok(false) => Ok(()),
            Ok(true) => {
                self.pending = None;
                Ok(())
            }
            Err(err) => {
                self.pending = None;
                if let PersistError::MissingLevel(missing) = &err {
                    self.reload_current_level(*missing);
                }
                Err(err)
            }
        }
    }

    /// The host already dropped the current level for one it does not have
    fn reload_current_level(&mut self, missing: i32) {
        let current = self.state.loaded_level_index;
        if current > 0 && current != missing {
            log::warn!("Level {} is missing, reloading level {}", missing, current);
            switch_level(&mut self.levels, 0, current);
            self.pending = Some(PendingOp::Level(current));
        }
    }
}
