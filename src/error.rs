use stapsh_protocol::ProtocolError;
use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShellError {
    #[error("{0}")]
    String(String),
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
    #[error("Could not start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("Editor '{editor}' exited with status {status}")]
    Editor { editor: String, status: String },
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("Could not encode session: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Pipeline(#[from] anyhow::Error),
    #[error(transparent)]
    Readline(#[from] rustyline::error::ReadlineError),
}

impl ShellError {
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        ShellError::Io {
            context: context.into(),
            source,
        }
    }
}

impl From<String> for ShellError {
    fn from(err: String) -> Self {
        ShellError::String(err)
    }
}
