use crate::script::ScriptBuffer;
use stapsh_protocol::Session;

/// Everything a command handler may change.
#[derive(Debug, Clone, Default)]
pub struct ShellState {
    pub session: Session,
    pub script: ScriptBuffer,
    /// Where pass 5 loads compiled modules; empty means the local machine.
    pub targets: Vec<String>,
}

impl ShellState {
    pub fn new(session: Session, targets: Vec<String>) -> Self {
        Self {
            session,
            script: ScriptBuffer::new(),
            targets,
        }
    }
}
