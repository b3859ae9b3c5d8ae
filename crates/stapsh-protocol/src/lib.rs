//! Contracts shared between the interactive shell and the pass worker it spawns.
//!
//! The worker is a separate process, so everything that crosses the boundary
//! lives here: the serialized [`Session`], and the [`PipelineResult`] that comes
//! back over the worker's stdout pipe.

pub mod privilege;
pub mod result;
pub mod session;

pub use privilege::Privilege;
pub use result::{PipelineArtifacts, PipelineResult, ProtocolError, decode_worker_output};
pub use session::{DumpMode, PASS_COUNT, Session, SessionSnapshot};
