//! Vector collections the index is built over.
//!
//! The index never owns vectors. It reads them through [`VectorCollection`],
//! addressing each vector by a dense slot (`0..len`). Slots are what the
//! kd-tree permutes; the stable external `u64` id is only looked up when a
//! result is reported.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{validate_vector, Error, Result};

/// Read-only, fixed-dimensionality view over a set of vectors.
///
/// Implementations must return vectors of exactly [`dimension`](Self::dimension)
/// components for every slot in `0..len()`. Slot accessors may panic for
/// out-of-range slots, like slice indexing.
pub trait VectorCollection: Send + Sync {
    /// Number of components in every vector.
    fn dimension(&self) -> usize;

    /// Number of vectors.
    fn len(&self) -> usize;

    /// Returns true if the collection holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// External identifier of the vector stored at `slot`.
    fn id_at(&self, slot: usize) -> u64;

    /// Vector stored at `slot`.
    fn vector(&self, slot: usize) -> &[f32];
}

impl<C: VectorCollection + ?Sized> VectorCollection for &C {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn id_at(&self, slot: usize) -> u64 {
        (**self).id_at(slot)
    }

    fn vector(&self, slot: usize) -> &[f32] {
        (**self).vector(slot)
    }
}

impl<C: VectorCollection + ?Sized> VectorCollection for Arc<C> {
    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn len(&self) -> usize {
        (**self).len()
    }

    fn id_at(&self, slot: usize) -> u64 {
        (**self).id_at(slot)
    }

    fn vector(&self, slot: usize) -> &[f32] {
        (**self).vector(slot)
    }
}

/// A vector with its external identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Stable identifier.
    pub id: u64,
    /// Coordinates.
    pub vector: Vec<f32>,
}

impl Point {
    /// Creates a new point.
    #[must_use]
    pub fn new(id: u64, vector: Vec<f32>) -> Self {
        Self { id, vector }
    }
}

/// Dense, append-only, row-major vector collection.
#[derive(Debug, Clone)]
pub struct VectorStore {
    dimension: usize,
    /// Row-major coordinates, `len * dimension` values.
    data: Vec<f32>,
    /// slot -> external id
    ids: Vec<u64>,
    /// external id -> slot
    slots: FxHashMap<u64, u32>,
}

impl VectorStore {
    /// Creates an empty store for vectors of `dimension` components.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDimension`] if `dimension` is zero.
    pub fn new(dimension: usize) -> Result<Self> {
        Self::with_capacity(dimension, 0)
    }

    /// Creates an empty store with room for `capacity` vectors.
    pub fn with_capacity(dimension: usize, capacity: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(Error::InvalidDimension(dimension));
        }
        let values = capacity
            .checked_mul(dimension)
            .ok_or_else(|| Error::Overflow(format!("{capacity} x {dimension} coordinates")))?;
        Ok(Self {
            dimension,
            data: Vec::with_capacity(values),
            ids: Vec::with_capacity(capacity),
            slots: FxHashMap::default(),
        })
    }

    /// Builds a store from points.
    pub fn from_points<I>(dimension: usize, points: I) -> Result<Self>
    where
        I: IntoIterator<Item = Point>,
    {
        let points = points.into_iter();
        let mut store = Self::with_capacity(dimension, points.size_hint().0)?;
        for point in points {
            store.insert(point.id, &point.vector)?;
        }
        Ok(store)
    }

    /// Appends a vector under `id`.
    ///
    /// # Errors
    ///
    /// - [`Error::DimensionMismatch`] if the vector has the wrong length
    /// - [`Error::NonFiniteVector`] if a coordinate is NaN or infinite
    /// - [`Error::DuplicateId`] if `id` is already stored
    /// - [`Error::Overflow`] if the store already holds `u32::MAX` vectors
    pub fn insert(&mut self, id: u64, vector: &[f32]) -> Result<()> {
        validate_vector(vector, self.dimension)?;
        if self.slots.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        let slot = u32::try_from(self.ids.len())
            .map_err(|_| Error::Overflow(format!("store is full at {} vectors", self.ids.len())))?;
        self.slots.insert(id, slot);
        self.ids.push(id);
        self.data.extend_from_slice(vector);
        Ok(())
    }

    /// Returns the vector stored under `id`.
    #[must_use]
    pub fn get(&self, id: u64) -> Option<&[f32]> {
        self.slots
            .get(&id)
            .map(|&slot| self.vector(slot as usize))
    }

    /// Returns true if `id` is stored.
    #[must_use]
    pub fn contains(&self, id: u64) -> bool {
        self.slots.contains_key(&id)
    }

    /// Iterates over the stored ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }

    /// Iterates over `(id, vector)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &[f32])> + '_ {
        self.ids
            .iter()
            .copied()
            .zip(self.data.chunks_exact(self.dimension))
    }
}

impl VectorCollection for VectorStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.ids.len()
    }

    fn id_at(&self, slot: usize) -> u64 {
        self.ids[slot]
    }

    #[inline]
    fn vector(&self, slot: usize) -> &[f32] {
        let start = slot * self.dimension;
        &self.data[start..start + self.dimension]
    }
}
