//! # Engine Module
//!
//! The seam between flamekit and an external moment-matrix transport engine.
//!
//! ## Overview
//!
//! The transport computation itself is not part of this crate. A simulation
//! engine plugs in by implementing [`transport::Machine`]: build from a lattice
//! configuration, report element configurations, accept reconfiguration, and
//! propagate a [`MomentState`](crate::core::models::snapshot::MomentState)
//! through a range of elements.
//!
//! ## Architecture
//!
//! - **Transport Seam** ([`transport`]) - The `Machine` trait and machine resolution
//! - **Configuration** ([`config`]) - Lattice output settings and their builder
//! - **Diagnostics** ([`diagnostics`]) - Injected sink for non-fatal conditions
//! - **Error Handling** ([`error`]) - `EngineError`, wrapping every lower-level failure

pub mod config;
pub mod diagnostics;
pub mod error;
#[cfg(test)]
pub(crate) mod testing;
pub mod transport;
