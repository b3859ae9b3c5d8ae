//! Hierarchical index of probe point names used for tab completion.
//!
//! Probe points are dotted paths (`kernel.function(string).return`). Each path
//! component becomes a [`MatchNode`]; components carrying a `(number)` or
//! `(string)` marker accept a typed literal argument instead of fixed text.

mod candidates;
mod index;
mod placeholder;

pub use candidates::PathCandidates;
pub use index::{MatchNode, NameIndex, NodeId, Placeholders};
pub use placeholder::Placeholder;
