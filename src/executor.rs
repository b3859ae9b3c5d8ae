use crate::{error::ShellError, pipeline::Toolchain, tool_overrides::Tool};
use stapsh_protocol::{PipelineArtifacts, PipelineResult, Session, decode_worker_output};
use std::{
    env,
    io::{Read, Write},
    path::PathBuf,
    process::{Command, Stdio},
};

/// Flag that turns the `stapsh` binary into a pass worker.
pub const WORKER_FLAG: &str = "--pass-worker";

/// Runs the compiler pipeline on behalf of the shell.
pub trait PassRunner {
    /// Passes 0-4 for `session.script`.
    fn compile(&self, session: &Session) -> Result<PipelineResult, ShellError>;

    /// The name dump selected by `session.dump_mode`.
    fn dump(&self, session: &Session) -> Result<String, ShellError>;

    /// Pass 5 for a compiled module.
    fn deploy(
        &self,
        session: &Session,
        artifacts: &PipelineArtifacts,
        targets: &[String],
    ) -> Result<i32, ShellError>;
}

/// Runs passes 0-4 in a child process so a crashing pipeline leaves the
/// shell intact. The child gets the session as JSON on stdin and answers on
/// its stdout.
pub struct PassExecutor {
    program: PathBuf,
    args: Vec<String>,
    envs: Vec<(String, String)>,
    toolchain: Box<dyn Toolchain>,
}

impl PassExecutor {
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        toolchain: Box<dyn Toolchain>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            envs: Vec::new(),
            toolchain,
        }
    }

    /// Workers re-execute this binary; they see the shell's compiler choice
    /// through the environment.
    pub fn current_exe(toolchain: Box<dyn Toolchain>) -> Result<Self, ShellError> {
        let program = env::current_exe()
            .map_err(|e| ShellError::io("Could not locate the stapsh executable", e))?;
        Ok(Self::new(program, vec![WORKER_FLAG.to_string()], toolchain)
            .with_env(Tool::Compiler.env_var(), Tool::Compiler.resolve()))
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    fn spawn_worker(&self, session: &Session) -> Result<(i32, String), ShellError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| ShellError::Spawn {
                program: self.program.display().to_string(),
                source,
            })?;
        tracing::debug!(pid = child.id(), dump_mode = ?session.dump_mode, "pass worker started");

        if let Some(mut stdin) = child.stdin.take() {
            // A worker that dies early closes the pipe; its exit status says why.
            if let Err(e) = session.write_json(&mut stdin).map_err(ShellError::from).and_then(
                |_| stdin.flush().map_err(|e| ShellError::io("Could not send session", e)),
            ) {
                tracing::warn!("sending session to pass worker failed: {e}");
            }
        }

        let mut output = Vec::new();
        let read = match child.stdout.take() {
            Some(mut stdout) => stdout.read_to_end(&mut output).map(|_| ()),
            None => Ok(()),
        };
        let status = child
            .wait()
            .map_err(|e| ShellError::io("Could not wait for pass worker", e))?;
        read.map_err(|e| ShellError::io("Could not read pass worker output", e))?;

        let code = match status.code() {
            Some(code) => code,
            None => {
                tracing::warn!(%status, "pass worker was killed by a signal");
                -1
            }
        };
        Ok((code, String::from_utf8_lossy(&output).into_owned()))
    }
}

impl PassRunner for PassExecutor {
    fn compile(&self, session: &Session) -> Result<PipelineResult, ShellError> {
        let (code, output) = self.spawn_worker(session)?;
        let result = decode_worker_output(code, &output, session.runs_module())?;
        tracing::debug!(code, artifacts = ?result.artifacts, "pass worker finished");
        Ok(result)
    }

    fn dump(&self, session: &Session) -> Result<String, ShellError> {
        let (code, output) = self.spawn_worker(session)?;
        if code != 0 {
            return Err(format!("{:?} dump failed with status {code}", session.dump_mode).into());
        }
        Ok(output)
    }

    fn deploy(
        &self,
        session: &Session,
        artifacts: &PipelineArtifacts,
        targets: &[String],
    ) -> Result<i32, ShellError> {
        Ok(self.toolchain.pass_5(session, artifacts, targets)?)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use stapsh_protocol::{DumpMode, ProtocolError};

    struct NoRunner;

    impl Toolchain for NoRunner {
        fn passes_0_4(&self, _: &Session, _: &mut dyn Write) -> anyhow::Result<PipelineResult> {
            anyhow::bail!("passes run in the worker")
        }

        fn pass_5(&self, _: &Session, _: &PipelineArtifacts, _: &[String]) -> anyhow::Result<i32> {
            Ok(7)
        }
    }

    fn shell_worker(script: &str) -> PassExecutor {
        PassExecutor::new(
            "/bin/sh",
            vec!["-c".to_string(), script.to_string()],
            Box::new(NoRunner),
        )
    }

    #[test]
    fn successful_compile_carries_artifacts() {
        let executor = shell_worker("cat >/dev/null; printf 'stap_42.ko\\n/tmp/uprobes.ko\\n'");
        let result = executor.compile(&Session::default()).expect("compile");
        assert!(result.succeeded());
        let artifacts = result.artifacts.expect("artifacts");
        assert_eq!(artifacts.module_name, "stap_42.ko");
        assert_eq!(artifacts.aux_path, "/tmp/uprobes.ko");
    }

    #[test]
    fn failed_worker_output_is_ignored() {
        let executor = shell_worker("cat >/dev/null; echo garbage; exit 1");
        let result = executor.compile(&Session::default()).expect("compile");
        assert_eq!(result, PipelineResult::from_status(1));
    }

    #[test]
    fn short_pass_depth_reads_no_artifacts() {
        let executor = shell_worker("cat >/dev/null");
        let session = Session {
            last_pass: 4,
            ..Session::default()
        };
        assert_eq!(
            executor.compile(&session).expect("compile"),
            PipelineResult::from_status(0)
        );
    }

    #[test]
    fn truncated_reply_is_a_protocol_error() {
        let executor = shell_worker("cat >/dev/null; printf 'stap_42.ko\\n'");
        let err = executor.compile(&Session::default()).expect_err("one line only");
        assert!(matches!(
            err,
            ShellError::Protocol(ProtocolError::WrongLineCount(1))
        ));
    }

    #[test]
    fn worker_receives_session_as_json() {
        let executor = shell_worker("cat");
        let mut session = Session::default();
        session.prepare_dump(DumpMode::ProbeTypes);
        session.target_pid = 99;
        let echoed = executor.dump(&session).expect("dump");
        let received: Session = serde_json::from_str(&echoed).expect("session json");
        assert_eq!(received, session);
    }

    #[test]
    fn failed_dump_is_an_error() {
        let executor = shell_worker("cat >/dev/null; exit 2");
        let mut session = Session::default();
        session.prepare_dump(DumpMode::ProbeAliases);
        assert!(executor.dump(&session).is_err());
    }

    #[test]
    fn killed_worker_reports_failure() {
        let executor = shell_worker("kill -9 $$");
        let result = executor.compile(&Session::default()).expect("compile");
        assert_eq!(result.exit_code, -1);
        assert!(result.artifacts.is_none());
    }

    #[test]
    fn missing_worker_is_a_spawn_error() {
        let executor = PassExecutor::new("/nonexistent/stapsh", Vec::new(), Box::new(NoRunner));
        assert!(matches!(
            executor.compile(&Session::default()),
            Err(ShellError::Spawn { .. })
        ));
    }

    #[test]
    fn deploy_uses_the_toolchain() {
        let executor = shell_worker("true");
        let artifacts = PipelineArtifacts {
            module_name: "stap_1.ko".to_string(),
            aux_path: String::new(),
        };
        assert_eq!(
            executor
                .deploy(&Session::default(), &artifacts, &[])
                .expect("deploy"),
            7
        );
    }
}
