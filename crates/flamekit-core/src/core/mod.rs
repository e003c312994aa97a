//! # Core Module
//!
//! Stateless building blocks of flamekit: beam-state data models, the moment
//! algebra behind every derived optics quantity, and lattice text I/O.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Moment states, `BeamState`, lattice elements and documents
//! - **Moment Algebra** ([`optics`]) - Emittance, Twiss parameters and coupling terms
//! - **Lattice I/O** ([`io`]) - Source-element encoding and lattice text rendering
//!
//! Nothing in this layer talks to a transport engine; see
//! [`engine`](crate::engine) for that seam.

pub mod io;
pub mod models;
pub mod optics;
