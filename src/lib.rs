pub mod about;
pub mod commands;
pub mod completion;
pub mod console;
pub mod editor;
pub mod error;
pub mod executor;
pub mod interrupt;
pub mod options;
pub mod pipeline;
pub mod registry;
pub mod repl;
pub mod script;
pub mod state;
pub mod tool_overrides;

pub use stapsh_index as index;
pub use stapsh_protocol as protocol;
