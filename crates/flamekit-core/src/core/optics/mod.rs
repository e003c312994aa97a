//! # Optics Module
//!
//! Pure moment algebra over the 7-component centroid vector and the 7×7
//! correlation tensor of one charge state (or of the charge-state-weighted
//! aggregate).
//!
//! ## Overview
//!
//! Every function here operates on borrowed nalgebra matrices and performs no
//! engine I/O. The module provides:
//!
//! - **Geometric and normalized emittance** per phase-space axis
//! - **Twiss parameters** (`alpha`, `beta`, `gamma`) derived from the 2×2 axis block
//! - **Normalized coupling terms** between two phase-space coordinates
//! - **Inverse construction** of an axis block from Twiss parameters that keeps
//!   the coupling ratios to the other axes unchanged
//!
//! ## Units
//!
//! Transverse coordinates are stored in `[mm, rad]`, so transverse emittances are
//! reported in mm·mrad (scaled by 10³). The longitudinal axis `[rad, MeV/u]` is
//! reported unscaled.
//!
//! ## Key Components
//!
//! - [`moments`] - Axis/coordinate labels, emittance, Twiss and coupling readers
//! - [`twiss`] - Inverse construction of an axis block from Twiss parameters

pub mod moments;
pub mod twiss;

use nalgebra::{SMatrix, SVector};

/// Centroid vector `[x, x', y, y', phi, dEk, 1]` of one charge state.
pub type Vector7 = SVector<f64, 7>;

/// Correlation tensor (second moments) of one charge state, or a linear transfer map.
pub type Matrix7 = SMatrix<f64, 7, 7>;
