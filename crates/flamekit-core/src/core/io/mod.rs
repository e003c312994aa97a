//! Lattice text input/output.
//!
//! This module turns configuration snapshots and beam states into the lattice
//! text consumed by the transport engine. Rendering goes through the
//! [`LatticeRender`](traits::LatticeRender) trait, with two implementations:
//! fresh generation and in-place patching of an existing file that keeps the
//! user's comments and layout.

pub(crate) mod format;
pub mod latfile;
pub mod source;
pub mod traits;
