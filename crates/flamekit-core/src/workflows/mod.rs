//! # Workflows Module
//!
//! High-level operations that tie the beam-state model and the lattice
//! serializer to a transport engine.
//!
//! ## Overview
//!
//! Every workflow is generic over [`Machine`](crate::engine::transport::Machine)
//! and reports non-fatal conditions through an injected
//! [`DiagnosticReporter`](crate::engine::diagnostics::DiagnosticReporter).
//!
//! ## Architecture
//!
//! - **Model Operations** ([`model`]) - Beam-state initialization, propagation,
//!   reconfiguration, element insertion and live configuration snapshots
//! - **Lattice Generation** ([`generate`]) - Fresh and patch-mode lattice output
//!   with the current beam state encoded into the source element

pub mod generate;
pub mod model;
