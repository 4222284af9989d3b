//! Platform abstraction layer
//!
//! The hosting environment owns level (scene) loading. The simulation asks
//! for a level, keeps polling, and takes the level over once it is ready.

use crate::sim::GameLevel;

/// Result of polling a level load
#[derive(Debug, Clone, PartialEq)]
pub enum LevelPoll {
    /// Still loading; poll again next frame
    Pending,
    /// Loaded and handed over
    Ready(GameLevel),
    /// The host has no such level
    Missing,
}

/// Scene/level host: asynchronous level loading and unloading
pub trait LevelHost {
    /// Number of selectable levels (1-based indices)
    fn level_count(&self) -> i32;

    /// Start unloading a loaded level
    fn begin_unload(&mut self, index: i32);

    /// Start loading a level
    fn begin_load(&mut self, index: i32);

    /// Check on the level requested by [`LevelHost::begin_load`]
    fn poll_loaded(&mut self, index: i32) -> LevelPoll;
}

/// Unload the current level (if any) and start loading `next`
pub fn switch_level<H: LevelHost + ?Sized>(levels: &mut H, current: i32, next: i32) {
    if current > 0 {
        levels.begin_unload(current);
    }
    log::info!("Loading level {}", next);
    levels.begin_load(next);
}

/// In-process level host serving fixed layouts after a set number of polls
#[derive(Debug, Clone)]
pub struct ScriptedLevels {
    /// Layout for level `i + 1`
    layouts: Vec<GameLevel>,
    /// Polls answered with `Pending` before a load completes
    load_delay: u32,
    pending: Option<(i32, u32)>,
    loaded: Option<i32>,
}

impl ScriptedLevels {
    pub fn new(layouts: Vec<GameLevel>, load_delay: u32) -> Self {
        Self {
            layouts,
            load_delay,
            pending: None,
            loaded: None,
        }
    }

    /// The built-in levels
    pub fn builtin(load_delay: u32) -> Self {
        let layouts = (1..).map_while(GameLevel::builtin).collect();
        Self::new(layouts, load_delay)
    }

    /// Level currently resident in the host
    pub fn loaded(&self) -> Option<i32> {
        self.loaded
    }

    fn layout(&self, index: i32) -> Option<&GameLevel> {
        usize::try_from(index - 1)
            .ok()
            .and_then(|i| self.layouts.get(i))
    }
}

impl LevelHost for ScriptedLevels {
    fn level_count(&self) -> i32 {
        self.layouts.len() as i32
    }

    fn begin_unload(&mut self, index: i32) {
        if self.loaded == Some(index) {
            self.loaded = None;
        }
    }

    fn begin_load(&mut self, index: i32) {
        self.pending = Some((index, self.load_delay));
    }

    fn poll_loaded(&mut self, index: i32) -> LevelPoll {
        match self.pending {
            Some((pending, 0)) if pending == index => {
                self.pending = None;
                match self.layout(index).cloned() {
                    Some(level) => {
                        self.loaded = Some(index);
                        LevelPoll::Ready(level)
                    }
                    None => LevelPoll::Missing,
                }
            }
            Some((pending, remaining)) if pending == index => {
                self.pending = Some((pending, remaining - 1));
                LevelPoll::Pending
            }
            _ if self.loaded == Some(index) => match self.layout(index).cloned() {
                Some(level) => LevelPoll::Ready(level),
                None => LevelPoll::Missing,
            },
            _ => LevelPoll::Missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_after_delay() {
        let mut levels = ScriptedLevels::builtin(2);
        assert_eq!(levels.level_count(), 2);

        switch_level(&mut levels, 0, 1);
        assert_eq!(levels.poll_loaded(1), LevelPoll::Pending);
        assert_eq!(levels.poll_loaded(1), LevelPoll::Pending);
        match levels.poll_loaded(1) {
            LevelPoll::Ready(level) => assert_eq!(level.index, 1),
            other => panic!("expected level 1, got {other:?}"),
        }
        assert_eq!(levels.loaded(), Some(1));
    }

    #[test]
    fn test_switch_unloads_previous() {
        let mut levels = ScriptedLevels::builtin(0);
        switch_level(&mut levels, 0, 1);
        assert!(matches!(levels.poll_loaded(1), LevelPoll::Ready(_)));

        switch_level(&mut levels, 1, 2);
        assert_eq!(levels.loaded(), None);
        assert!(matches!(levels.poll_loaded(2), LevelPoll::Ready(_)));
        assert_eq!(levels.loaded(), Some(2));
    }

    #[test]
    fn test_unknown_level_is_missing() {
        let mut levels = ScriptedLevels::builtin(0);
        switch_level(&mut levels, 0, 9);
        assert_eq!(levels.poll_loaded(9), LevelPoll::Missing);
        assert_eq!(levels.poll_loaded(0), LevelPoll::Missing);
    }
}
