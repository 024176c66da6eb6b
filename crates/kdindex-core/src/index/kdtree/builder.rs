//! Implicit kd-tree construction.
//!
//! The tree is the slot array itself: a node is a sub-range `[left, right)`,
//! its split element sits at `middle = left + (right - left) / 2`, and its axis
//! is `depth % dimension`. Building reorders each range so that the middle
//! element is a median on the node's axis, then recurses into both halves.

use std::cmp::Ordering;

use crate::collection::VectorCollection;
use crate::config::PartitionStrategy;
use crate::error::{Error, Result};

/// Reorders `slots` in place so every implicit node satisfies the partition
/// invariant.
///
/// Comparison is `f32::total_cmp` on the axis coordinate, then slot number,
/// so the result is deterministic for a given strategy. Which of several
/// equal coordinates ends up left or right of the split is
/// implementation-defined and may differ between strategies.
pub(super) fn build<C: VectorCollection + ?Sized>(
    collection: &C,
    slots: &mut [u32],
    strategy: PartitionStrategy,
) {
    let dimension = collection.dimension();
    if dimension == 0 {
        return;
    }
    partition(collection, slots, 0, dimension, strategy);
}

fn partition<C: VectorCollection + ?Sized>(
    collection: &C,
    range: &mut [u32],
    axis: usize,
    dimension: usize,
    strategy: PartitionStrategy,
) {
    if range.len() <= 1 {
        return;
    }
    let middle = range.len() / 2;
    let by_axis = |a: &u32, b: &u32| compare_on_axis(collection, axis, *a, *b);

    match strategy {
        PartitionStrategy::Select => {
            range.select_nth_unstable_by(middle, by_axis);
        }
        PartitionStrategy::Sort => range.sort_unstable_by(by_axis),
    }

    let next = (axis + 1) % dimension;
    let (left, rest) = range.split_at_mut(middle);
    partition(collection, left, next, dimension, strategy);
    partition(collection, &mut rest[1..], next, dimension, strategy);
}

#[inline]
fn compare_on_axis<C: VectorCollection + ?Sized>(
    collection: &C,
    axis: usize,
    a: u32,
    b: u32,
) -> Ordering {
    let va = collection.vector(a as usize)[axis];
    let vb = collection.vector(b as usize)[axis];
    va.total_cmp(&vb).then_with(|| a.cmp(&b))
}

/// Walks every implicit node and checks the partition invariant.
///
/// # Errors
///
/// Returns [`Error::PartitionViolation`] describing the first node whose
/// left range holds a coordinate above the split value, or whose right range
/// holds one below it.
pub(super) fn verify<C: VectorCollection + ?Sized>(collection: &C, slots: &[u32]) -> Result<()> {
    let dimension = collection.dimension();
    if dimension == 0 {
        return Ok(());
    }
    verify_range(collection, slots, 0, 0, dimension)
}

fn verify_range<C: VectorCollection + ?Sized>(
    collection: &C,
    range: &[u32],
    offset: usize,
    depth: usize,
    dimension: usize,
) -> Result<()> {
    if range.len() <= 1 {
        return Ok(());
    }
    let axis = depth % dimension;
    let middle = range.len() / 2;
    let split = collection.vector(range[middle] as usize)[axis];
    let (left, rest) = range.split_at(middle);
    let right = &rest[1..];

    if let Some(pos) = left
        .iter()
        .position(|&s| collection.vector(s as usize)[axis] > split)
    {
        return Err(violation(offset, range.len(), depth, axis, offset + pos, "left", split));
    }
    if let Some(pos) = right
        .iter()
        .position(|&s| collection.vector(s as usize)[axis] < split)
    {
        return Err(violation(
            offset,
            range.len(),
            depth,
            axis,
            offset + middle + 1 + pos,
            "right",
            split,
        ));
    }

    verify_range(collection, left, offset, depth + 1, dimension)?;
    verify_range(collection, right, offset + middle + 1, depth + 1, dimension)
}

fn violation(
    offset: usize,
    len: usize,
    depth: usize,
    axis: usize,
    position: usize,
    side: &str,
    split: f32,
) -> Error {
    Error::PartitionViolation(format!(
        "node [{offset}, {}) at depth {depth} (axis {axis}): position {position} on the {side} \
         side is out of order against split value {split}",
        offset + len
    ))
}
