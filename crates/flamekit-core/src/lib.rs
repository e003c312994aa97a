//! # flamekit
//!
//! Beam-state modelling and lattice serialization for moment-matrix transport
//! engines of linear accelerators.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture, keeping data, engine access
//! and end-user procedures apart.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`MomentState`,
//!   `BeamState`, `LatticeDocument`), the moment algebra behind emittance, Twiss
//!   and coupling quantities, and lattice text I/O.
//!
//! - **[`engine`]: The Seam.** The `Machine` trait an external transport engine
//!   implements, plus output configuration, diagnostics and error types.
//!
//! - **[`workflows`]: The Public API.** Complete procedures built on the two
//!   layers below: initializing and propagating beam states, reconfiguring and
//!   extending a lattice, and writing it back out as text.

pub mod core;
pub mod engine;
pub mod workflows;
