//! The compiler pipeline boundary.
//!
//! Passes 0-4 run inside the pass worker (`stapsh --pass-worker`); pass 5
//! runs in the shell itself once a module has been built.

use crate::tool_overrides::Tool;
use anyhow::{Context, Result, anyhow, bail};
use stapsh_protocol::{DumpMode, PipelineArtifacts, PipelineResult, Privilege, Session};
use std::{
    io::{self, Read, Write},
    panic::{self, AssertUnwindSafe},
    process::{Command, ExitStatus, Stdio},
};

/// A compiler/runner pair able to carry out a session.
pub trait Toolchain {
    /// Runs passes 0-4 (or a name dump). Dump text goes to `out`.
    fn passes_0_4(&self, session: &Session, out: &mut dyn Write) -> Result<PipelineResult>;

    /// Loads a compiled module on every target, returning the runner's status.
    fn pass_5(
        &self,
        session: &Session,
        artifacts: &PipelineArtifacts,
        targets: &[String],
    ) -> Result<i32>;
}

/// Drives the external `stap` and `staprun` executables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalToolchain {
    pub compiler: String,
    pub runner: String,
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}

impl ExternalToolchain {
    pub fn new(compiler: impl Into<String>, runner: impl Into<String>) -> Self {
        Self {
            compiler: compiler.into(),
            runner: runner.into(),
        }
    }

    pub fn from_overrides() -> Self {
        Self::new(Tool::Compiler.resolve(), Tool::Runner.resolve())
    }

    pub fn compiler_args(session: &Session) -> Vec<String> {
        match session.dump_mode {
            DumpMode::ProbeTypes => return vec!["--dump-probe-types".to_string()],
            DumpMode::ProbeAliases => return vec!["--dump-probe-aliases".to_string()],
            DumpMode::None => {}
        }

        let mut args = vec![format!("-p{}", session.last_pass.min(4))];
        if session.perpass_verbose.iter().any(|level| *level > 0) {
            let digits: String = session
                .perpass_verbose
                .iter()
                .map(|level| char::from_digit((*level).min(9), 10).unwrap_or('9'))
                .collect();
            args.push(format!("--vp={digits}"));
        }
        for (enabled, flag) in [
            (session.keep_tmpdir, "-k"),
            (session.guru_mode, "-g"),
            (session.suppress_warnings, "-w"),
            (session.panic_warnings, "-W"),
            (session.timing, "-t"),
            (session.unoptimized, "-u"),
        ] {
            if enabled {
                args.push(flag.to_string());
            }
        }
        if session.target_pid > 0 {
            args.push("-x".to_string());
            args.push(session.target_pid.to_string());
        }
        if !session.cmd.is_empty() {
            args.push("-c".to_string());
            args.push(session.cmd.clone());
        }
        if session.privilege != Privilege::default() {
            args.push(format!("--privilege={}", session.privilege.name()));
        }
        if session.have_script {
            args.push("-e".to_string());
            args.push(session.script.clone());
        }
        args
    }

    /// Picks the module (last non-empty line) and the uprobes module out of
    /// what the compiler printed at `-p4`.
    pub fn parse_compiler_output(stdout: &str) -> Option<PipelineArtifacts> {
        let lines: Vec<&str> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let module_name = lines.last()?.to_string();
        let aux_path = lines
            .iter()
            .rev()
            .skip(1)
            .find(|line| line.ends_with("uprobes.ko"))
            .map(|line| line.to_string())
            .unwrap_or_default();
        Some(PipelineArtifacts {
            module_name,
            aux_path,
        })
    }

    pub fn runner_args(session: &Session, artifacts: &PipelineArtifacts) -> Vec<String> {
        let mut args = Vec::new();
        if !session.cmd.is_empty() {
            args.push("-c".to_string());
            args.push(session.cmd.clone());
        }
        if session.target_pid > 0 {
            args.push("-x".to_string());
            args.push(session.target_pid.to_string());
        }
        if !artifacts.aux_path.is_empty() {
            args.push("-u".to_string());
            args.push(artifacts.aux_path.clone());
        }
        args.push(artifacts.module_name.clone());
        args
    }

    /// The command loading the module on `target`. `ssh://HOST` runs the
    /// runner through ssh; the module must already exist at the same path there.
    fn runner_command(&self, target: &str, args: &[String]) -> Result<Command> {
        let mut command = match target {
            "" | "direct" => Command::new(&self.runner),
            remote => {
                let host = remote
                    .strip_prefix("ssh://")
                    .filter(|host| !host.is_empty())
                    .ok_or_else(|| anyhow!("Unsupported remote target '{remote}'"))?;
                let mut command = Command::new("ssh");
                command.arg(host).arg(&self.runner);
                command
            }
        };
        command.args(args);
        Ok(command)
    }
}

impl Toolchain for ExternalToolchain {
    fn passes_0_4(&self, session: &Session, out: &mut dyn Write) -> Result<PipelineResult> {
        let args = Self::compiler_args(session);
        tracing::debug!(compiler = %self.compiler, ?args, "running compiler");

        if session.dump_mode != DumpMode::None {
            let mut child = Command::new(&self.compiler)
                .args(&args)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .spawn()
                .with_context(|| format!("Could not start compiler '{}'", self.compiler))?;
            if let Some(mut stdout) = child.stdout.take() {
                io::copy(&mut stdout, out).context("Could not forward probe dump")?;
            }
            let status = child.wait().context("Could not wait for compiler")?;
            return Ok(PipelineResult::from_status(exit_code(status)));
        }

        let output = Command::new(&self.compiler)
            .args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .with_context(|| format!("Could not start compiler '{}'", self.compiler))?;
        let code = exit_code(output.status);
        let stdout = String::from_utf8_lossy(&output.stdout);

        if code != 0 || !session.runs_module() {
            io::stderr().write_all(stdout.as_bytes())?;
            return Ok(PipelineResult::from_status(code));
        }
        let artifacts = Self::parse_compiler_output(&stdout)
            .ok_or_else(|| anyhow!("Compiler succeeded but printed no module name"))?;
        Ok(PipelineResult {
            exit_code: code,
            artifacts: Some(artifacts),
        })
    }

    fn pass_5(
        &self,
        session: &Session,
        artifacts: &PipelineArtifacts,
        targets: &[String],
    ) -> Result<i32> {
        let args = Self::runner_args(session, artifacts);
        let local = [String::new()];
        let targets = if targets.is_empty() { &local[..] } else { targets };

        let mut rc = 0;
        for target in targets {
            let status = self
                .runner_command(target, &args)?
                .status()
                .with_context(|| format!("Could not start runner '{}'", self.runner))?;
            let code = exit_code(status);
            tracing::info!(remote = %target, module = %artifacts.module_name, code, "pass 5 finished");
            if code != 0 {
                rc = code;
            }
        }
        Ok(rc)
    }
}

/// The pass worker's side of the pipe: reads a session from `input`, runs
/// passes 0-4 and reports on `output`. Returns the process exit code.
pub fn run_worker(toolchain: &dyn Toolchain, input: impl Read, output: &mut dyn Write) -> i32 {
    let session = match Session::read_json(input) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Pass worker received an unreadable session: {e}");
            return 1;
        }
    };

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        toolchain.passes_0_4(&session, &mut *output)
    }));
    let result = match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            eprintln!("{e:#}");
            return 1;
        }
        Err(_) => {
            tracing::error!("compiler pipeline panicked");
            return 1;
        }
    };
    if !result.succeeded() {
        return 1;
    }

    if session.dump_mode == DumpMode::None && session.runs_module() {
        let Some(artifacts) = result.artifacts else {
            eprintln!("Compiler pipeline produced no module");
            return 1;
        };
        if let Err(e) = output.write_all(artifacts.encode().as_bytes()) {
            eprintln!("Could not report module to the shell: {e}");
            return 1;
        }
    }
    match output.flush() {
        Ok(()) => 0,
        Err(_) => 1,
    }
}
