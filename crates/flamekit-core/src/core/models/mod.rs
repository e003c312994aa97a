//! Data models shared by every layer: raw engine moment states, the
//! [`BeamState`](beam::BeamState) accessor facade, and the lattice configuration
//! snapshot with its element key rules.

pub mod aliases;
pub mod beam;
pub mod element;
pub mod lattice;
pub mod snapshot;
pub mod value;
