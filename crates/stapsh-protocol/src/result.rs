use thiserror::Error;

/// What a successful compile hands to the module loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineArtifacts {
    pub module_name: String,
    pub aux_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub exit_code: i32,
    pub artifacts: Option<PipelineArtifacts>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("pass worker reported success but sent no module name")]
    MissingModule,
    #[error("pass worker sent {0} result line(s), expected 2")]
    WrongLineCount(usize),
}

impl PipelineResult {
    /// A result carrying only the worker's exit status.
    pub fn from_status(exit_code: i32) -> Self {
        Self {
            exit_code,
            artifacts: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

impl PipelineArtifacts {
    /// Wire form: module name and aux path, each newline-terminated.
    pub fn encode(&self) -> String {
        format!("{}\n{}\n", self.module_name, self.aux_path)
    }
}

/// Interprets what a pass worker left on its pipe once it has exited.
///
/// A failed worker's output is ignored. A successful worker must send exactly
/// the two artifact lines when `expect_artifacts` is set, and nothing is read
/// otherwise.
pub fn decode_worker_output(
    exit_code: i32,
    output: &str,
    expect_artifacts: bool,
) -> Result<PipelineResult, ProtocolError> {
    if exit_code != 0 || !expect_artifacts {
        return Ok(PipelineResult::from_status(exit_code));
    }
    let lines: Vec<&str> = output.split_terminator('\n').collect();
    if lines.len() != 2 {
        return Err(ProtocolError::WrongLineCount(lines.len()));
    }
    let module_name = lines[0].trim_end_matches('\r');
    if module_name.is_empty() {
        return Err(ProtocolError::MissingModule);
    }
    Ok(PipelineResult {
        exit_code,
        artifacts: Some(PipelineArtifacts {
            module_name: module_name.to_string(),
            aux_path: lines[1].trim_end_matches('\r').to_string(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_with_artifacts() {
        let artifacts = PipelineArtifacts {
            module_name: "stap_1234".to_string(),
            aux_path: String::new(),
        };
        let result = decode_worker_output(0, &artifacts.encode(), true).expect("decode");
        assert!(result.succeeded());
        assert_eq!(result.artifacts, Some(artifacts));
    }

    #[test]
    fn failure_ignores_partial_output() {
        let result = decode_worker_output(1, "stap_12", true).expect("decode");
        assert_eq!(result, PipelineResult::from_status(1));
    }

    #[test]
    fn shallow_runs_carry_no_artifacts() {
        let result = decode_worker_output(0, "", false).expect("decode");
        assert_eq!(result.artifacts, None);
        assert!(result.succeeded());
    }

    #[test]
    fn success_without_lines_is_a_protocol_error() {
        assert_eq!(
            decode_worker_output(0, "", true),
            Err(ProtocolError::WrongLineCount(0))
        );
        assert_eq!(
            decode_worker_output(0, "\n\n", true),
            Err(ProtocolError::MissingModule)
        );
    }
}
