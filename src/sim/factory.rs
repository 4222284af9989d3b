//! Shape factory: registry of prefabs and materials plus an instance pool
//!
//! Shapes live in an arena owned by the factory and are addressed by
//! [`ShapeHandle`]. Reclaiming a shape parks its slot on a free list keyed by
//! shape id; the next spawn of that id reuses it. Every reclaim bumps the
//! slot's generation, so handles from before the reclaim stop resolving.

use std::ops::{Index, IndexMut};

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::shape::{MaterialId, Shape, ShapeId};
use crate::persistence::{PersistError, Result};

/// Shape prefabs, registered in id order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    Cube,
    Sphere,
    Capsule,
}

/// Materials, registered in id order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    Standard,
    Shiny,
    Metallic,
}

/// Address of a shape in the factory arena, valid until the shape is reclaimed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeHandle {
    index: u32,
    generation: u32,
}

impl ShapeHandle {
    pub fn index(self) -> usize {
        self.index as usize
    }
}

#[derive(Debug)]
enum Slot {
    Live(Shape),
    /// Reclaimed, waiting to be respawned as the same shape id
    Pooled(Shape),
    /// Reclaimed with recycling off; storage reusable by any id
    Free,
}

#[derive(Debug)]
struct Entry {
    generation: u32,
    slot: Slot,
}

/// Registry mapping shape ids and material ids to prefabs
#[derive(Debug)]
pub struct ShapeFactory {
    prefabs: Vec<ShapeKind>,
    materials: Vec<MaterialKind>,
    recycle: bool,
    slots: Vec<Entry>,
    /// Pooled slot indices per shape id
    pools: Vec<Vec<u32>>,
    free: Vec<u32>,
}

impl Default for ShapeFactory {
    fn default() -> Self {
        Self::new(
            vec![ShapeKind::Cube, ShapeKind::Sphere, ShapeKind::Capsule],
            vec![
                MaterialKind::Standard,
                MaterialKind::Shiny,
                MaterialKind::Metallic,
            ],
            true,
        )
    }
}

impl ShapeFactory {
    pub fn new(prefabs: Vec<ShapeKind>, materials: Vec<MaterialKind>, recycle: bool) -> Self {
        let pools = vec![Vec::new(); prefabs.len()];
        Self {
            prefabs,
            materials,
            recycle,
            slots: Vec::new(),
            pools,
            free: Vec::new(),
        }
    }

    pub fn with_recycle(mut self, recycle: bool) -> Self {
        self.recycle = recycle;
        self
    }

    pub fn shape_count(&self) -> usize {
        self.prefabs.len()
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }

    pub fn is_registered(&self, shape_id: ShapeId, material_id: MaterialId) -> bool {
        (shape_id as usize) < self.prefabs.len() && (material_id as usize) < self.materials.len()
    }

    pub fn kind(&self, shape_id: ShapeId) -> Option<ShapeKind> {
        self.prefabs.get(shape_id as usize).copied()
    }

    pub fn material(&self, material_id: MaterialId) -> Option<MaterialKind> {
        self.materials.get(material_id as usize).copied()
    }

    /// Build (or recycle) a shape of the given prefab and material.
    ///
    /// # Panics
    ///
    /// Panics if either id is not registered.
    pub fn spawn(&mut self, shape_id: ShapeId, material_id: MaterialId) -> ShapeHandle {
        assert!(
            self.is_registered(shape_id, material_id),
            "spawn of unregistered shape {shape_id} / material {material_id}"
        );
        let (index, shape) = match self.pools[shape_id as usize].pop() {
            Some(index) => {
                let slot = std::mem::replace(&mut self.slots[index as usize].slot, Slot::Free);
                let mut shape = match slot {
                    Slot::Pooled(shape) => shape,
                    other => unreachable!("pooled slot {index} holds {other:?}"),
                };
                shape.reset();
                shape.set_material(material_id);
                (index, shape)
            }
            None => {
                let mut shape = Shape::new();
                // Fresh instance, the id cannot be taken yet
                let _ = shape.set_shape_id(shape_id);
                shape.set_material(material_id);
                let index = match self.free.pop() {
                    Some(index) => index,
                    None => {
                        self.slots.push(Entry {
                            generation: 0,
                            slot: Slot::Free,
                        });
                        (self.slots.len() - 1) as u32
                    }
                };
                (index, shape)
            }
        };

        let entry = &mut self.slots[index as usize];
        entry.slot = Slot::Live(shape);
        ShapeHandle {
            index,
            generation: entry.generation,
        }
    }

    /// Spawn for ids read from a save stream, which may not be registered
    pub fn try_spawn(&mut self, shape_id: i32, material_id: i32) -> Result<ShapeHandle> {
        let shape = u32::try_from(shape_id)
            .ok()
            .filter(|&id| (id as usize) < self.prefabs.len())
            .ok_or(PersistError::UnknownShape(shape_id))?;
        let material = u32::try_from(material_id)
            .ok()
            .filter(|&id| (id as usize) < self.materials.len())
            .ok_or(PersistError::UnknownMaterial(material_id))?;
        Ok(self.spawn(shape, material))
    }

    /// Spawn a uniformly random prefab with a uniformly random material
    pub fn spawn_random<R: Rng>(&mut self, rng: &mut R) -> ShapeHandle {
        let shape_id = rng.random_range(0..self.prefabs.len()) as ShapeId;
        let material_id = rng.random_range(0..self.materials.len()) as MaterialId;
        self.spawn(shape_id, material_id)
    }

    /// Return a shape to the factory. Reclaiming a stale handle is a no-op.
    pub fn reclaim(&mut self, handle: ShapeHandle) {
        let entry = match self.slots.get_mut(handle.index()) {
            Some(entry) if entry.generation == handle.generation => entry,
            _ => {
                log::warn!("Reclaim of stale shape handle {:?}", handle);
                return;
            }
        };
        match std::mem::replace(&mut entry.slot, Slot::Free) {
            Slot::Live(shape) => {
                entry.generation = entry.generation.wrapping_add(1);
                match shape.shape_id() {
                    Some(id) if self.recycle => {
                        self.pools[id as usize].push(handle.index);
                        entry.slot = Slot::Pooled(shape);
                    }
                    _ => self.free.push(handle.index),
                }
            }
            other => {
                log::warn!("Shape handle {:?} is not live", handle);
                entry.slot = other;
            }
        }
    }

    pub fn get(&self, handle: ShapeHandle) -> Option<&Shape> {
        match self.slots.get(handle.index()) {
            Some(Entry {
                generation,
                slot: Slot::Live(shape),
            }) if *generation == handle.generation => Some(shape),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: ShapeHandle) -> Option<&mut Shape> {
        match self.slots.get_mut(handle.index()) {
            Some(Entry {
                generation,
                slot: Slot::Live(shape),
            }) if *generation == handle.generation => Some(shape),
            _ => None,
        }
    }

    /// Shapes currently handed out
    pub fn live_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|entry| matches!(entry.slot, Slot::Live(_)))
            .count()
    }

    /// Shapes waiting in the pools
    pub fn pooled_count(&self) -> usize {
        self.pools.iter().map(Vec::len).sum()
    }
}

impl Index<ShapeHandle> for ShapeFactory {
    type Output = Shape;

    fn index(&self, handle: ShapeHandle) -> &Shape {
        match self.get(handle) {
            Some(shape) => shape,
            None => panic!("stale shape handle {handle:?}"),
        }
    }
}

impl IndexMut<ShapeHandle> for ShapeFactory {
    fn index_mut(&mut self, handle: ShapeHandle) -> &mut Shape {
        match self.get_mut(handle) {
            Some(shape) => shape,
            None => panic!("stale shape handle {handle:?}"),
        }
    }
}
