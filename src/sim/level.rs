//! Levels: spawn zones and the persistent objects placed in a level

use std::io::{Read, Write};

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::transform::TransformRecord;
use crate::persistence::{GameDataReader, GameDataWriter, Persistable, Result};
use crate::{random_inside_unit_sphere, random_on_unit_sphere};

/// Where new shapes appear
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpawnZone {
    /// Inside (or on the surface of) a sphere
    Sphere {
        center: Vec3,
        radius: f32,
        surface_only: bool,
    },
    /// One of several zones, picked uniformly per spawn
    Composite(Vec<SpawnZone>),
}

impl Default for SpawnZone {
    fn default() -> Self {
        SpawnZone::Sphere {
            center: Vec3::ZERO,
            radius: 5.0,
            surface_only: false,
        }
    }
}

impl SpawnZone {
    pub fn spawn_point<R: Rng>(&self, rng: &mut R) -> Vec3 {
        match self {
            SpawnZone::Sphere {
                center,
                radius,
                surface_only,
            } => {
                let local = if *surface_only {
                    random_on_unit_sphere(rng)
                } else {
                    random_inside_unit_sphere(rng)
                };
                *center + local * *radius
            }
            SpawnZone::Composite(zones) if zones.is_empty() => Vec3::ZERO,
            SpawnZone::Composite(zones) => {
                let index = rng.random_range(0..zones.len());
                zones[index].spawn_point(rng)
            }
        }
    }
}

/// An object authored into the level that spins in place
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelObject {
    pub transform: TransformRecord,
    /// Radians per second; not persisted, it is part of the level layout
    pub angular_velocity: Vec3,
}

impl LevelObject {
    pub fn new(transform: TransformRecord, angular_velocity: Vec3) -> Self {
        Self {
            transform,
            angular_velocity,
        }
    }
}

/// A loaded level as handed over by the level host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameLevel {
    pub index: i32,
    pub spawn_zone: SpawnZone,
    pub objects: Vec<LevelObject>,
}

impl GameLevel {
    pub fn new(index: i32, spawn_zone: SpawnZone, objects: Vec<LevelObject>) -> Self {
        Self {
            index,
            spawn_zone,
            objects,
        }
    }

    pub fn game_update(&mut self, dt: f32) {
        for object in &mut self.objects {
            object.transform.rotate(object.angular_velocity, dt);
        }
    }

    /// Persisted part of the level
    pub fn record(&self) -> LevelRecord {
        LevelRecord {
            objects: self.objects.iter().map(|o| o.transform).collect(),
        }
    }

    /// Apply a loaded record to the level's objects, in order
    pub fn apply(&mut self, record: &LevelRecord) {
        if record.objects.len() != self.objects.len() {
            log::warn!(
                "Level {} has {} persistent objects, save has {}",
                self.index,
                self.objects.len(),
                record.objects.len()
            );
        }
        for (object, transform) in self.objects.iter_mut().zip(&record.objects) {
            object.transform = *transform;
        }
    }

    /// Built-in layouts used by the native driver and tests.
    ///
    /// Level 1 spawns inside a sphere around a single spinning pillar. Level 2
    /// spawns on the surfaces of two spheres with two counter-rotating rings.
    pub fn builtin(index: i32) -> Option<GameLevel> {
        match index {
            1 => Some(GameLevel::new(
                1,
                SpawnZone::default(),
                vec![LevelObject::new(
                    TransformRecord::new(
                        Vec3::new(0.0, 0.0, 8.0),
                        Quat::IDENTITY,
                        Vec3::new(1.0, 4.0, 1.0),
                    ),
                    Vec3::new(0.0, 0.5, 0.0),
                )],
            )),
            2 => Some(GameLevel::new(
                2,
                SpawnZone::Composite(vec![
                    SpawnZone::Sphere {
                        center: Vec3::new(-6.0, 0.0, 0.0),
                        radius: 3.0,
                        surface_only: true,
                    },
                    SpawnZone::Sphere {
                        center: Vec3::new(6.0, 0.0, 0.0),
                        radius: 3.0,
                        surface_only: true,
                    },
                ]),
                vec![
                    LevelObject::new(
                        TransformRecord::new(
                            Vec3::new(0.0, 4.0, 0.0),
                            Quat::IDENTITY,
                            Vec3::splat(2.0),
                        ),
                        Vec3::new(0.0, 0.0, 1.0),
                    ),
                    LevelObject::new(
                        TransformRecord::new(
                            Vec3::new(0.0, -4.0, 0.0),
                            Quat::IDENTITY,
                            Vec3::splat(2.0),
                        ),
                        Vec3::new(0.0, 0.0, -1.0),
                    ),
                ],
            )),
            _ => None,
        }
    }
}

/// Persisted level state: the transforms of its objects, count-prefixed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LevelRecord {
    pub objects: Vec<TransformRecord>,
}

impl Persistable for LevelRecord {
    fn save<W: Write>(&self, writer: &mut GameDataWriter<W>) -> Result<()> {
        writer.write_count(self.objects.len())?;
        for object in &self.objects {
            object.save(writer)?;
        }
        Ok(())
    }

    fn load<R: Read>(&mut self, reader: &mut GameDataReader<R>) -> Result<()> {
        let count = reader.read_count()?;
        let mut objects = Vec::new();
        for _ in 0..count {
            let mut object = TransformRecord::default();
            object.load(reader)?;
            objects.push(object);
        }
        self.objects = objects;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    #[test]
    fn test_sphere_zone_bounds() {
        let mut rng = Pcg32::seed_from_u64(5);
        let zone = SpawnZone::Sphere {
            center: Vec3::new(10.0, 0.0, 0.0),
            radius: 2.0,
            surface_only: false,
        };
        for _ in 0..100 {
            let p = zone.spawn_point(&mut rng);
            assert!((p - Vec3::new(10.0, 0.0, 0.0)).length() <= 2.0 + 1e-4);
        }
    }

    #[test]
    fn test_surface_zone_on_surface() {
        let mut rng = Pcg32::seed_from_u64(6);
        let zone = SpawnZone::Sphere {
            center: Vec3::ZERO,
            radius: 3.0,
            surface_only: true,
        };
        for _ in 0..100 {
            let p = zone.spawn_point(&mut rng);
            assert!((p.length() - 3.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_composite_zone_uses_children() {
        let mut rng = Pcg32::seed_from_u64(7);
        let level = GameLevel::builtin(2).unwrap();
        for _ in 0..50 {
            let p = level.spawn_zone.spawn_point(&mut rng);
            let near_left = (p - Vec3::new(-6.0, 0.0, 0.0)).length() < 3.01;
            let near_right = (p - Vec3::new(6.0, 0.0, 0.0)).length() < 3.01;
            assert!(near_left || near_right);
        }
    }

    #[test]
    fn test_level_record_round_trip() {
        let mut level = GameLevel::builtin(2).unwrap();
        level.game_update(0.75);
        let record = level.record();

        let mut writer = GameDataWriter::new(Vec::new());
        record.save(&mut writer).unwrap();
        let bytes = writer.into_inner();
        assert_eq!(bytes.len(), 4 + 2 * 40);

        let mut loaded = LevelRecord::default();
        loaded
            .load(&mut GameDataReader::from_parts(bytes.as_slice(), 4))
            .unwrap();
        assert_eq!(loaded, record);

        let mut fresh = GameLevel::builtin(2).unwrap();
        fresh.apply(&loaded);
        assert_eq!(fresh, level);
    }

    #[test]
    fn test_apply_shorter_record_keeps_rest() {
        let mut level = GameLevel::builtin(2).unwrap();
        let moved = TransformRecord::new(Vec3::ONE, Quat::IDENTITY, Vec3::ONE);
        level.apply(&LevelRecord {
            objects: vec![moved],
        });
        assert_eq!(level.objects[0].transform, moved);
        assert_eq!(level.objects[1], GameLevel::builtin(2).unwrap().objects[1]);
    }
}
