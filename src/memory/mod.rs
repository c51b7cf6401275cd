//! Memory management for tree nodes.
//!
//! Nodes are kept in a [`Slab`] and addressed by indices implementing
//! [`EntityIndex`].
pub mod slab;

pub use slab::{AllocError, Slab};

/// An index into a generational arena.
///
/// The `index` selects the slot, the `generation` identifies which of the
/// successive occupants of the slot the index refers to.
pub trait EntityIndex: Copy + Eq {
    /// Creates an index.
    ///
    /// # Panics
    ///
    /// Panics when `index` can not be represented by the index type.
    fn new(index: usize, generation: u32) -> Self {
        Self::try_new(index, generation).expect("entity index out of range")
    }

    fn try_new(index: usize, generation: u32) -> Option<Self>;
    fn index(self) -> usize;
    fn generation(self) -> u32;
}
