// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector index module - identity-mapped exhaustive nearest-neighbor search
//!
//! The index stores `(VerseId, vector)` pairs. Its internal positions are
//! never exposed; every hit carries the verse identity it was built from.

pub mod flat;
pub mod format;

pub use flat::{FlatIndex, IndexMeta, Neighbor};
