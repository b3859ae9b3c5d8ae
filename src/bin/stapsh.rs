//! Interactive shell binary; also the pass worker when run with `--pass-worker`.

use stapsh::about;
use stapsh::console::TerminalConsole;
use stapsh::executor::{PassExecutor, WORKER_FLAG};
use stapsh::index::NameIndex;
use stapsh::interrupt;
use stapsh::pipeline::{ExternalToolchain, run_worker};
use stapsh::protocol::{Privilege, Session};
use stapsh::repl::Shell;
use stapsh::state::ShellState;
use stapsh::tool_overrides::{Tool, set_tool_override};
use std::{env, io, process::ExitCode};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default)]
struct CliArgs {
    show_help: bool,
    show_version: bool,
    no_completion: bool,
    verbose: u32,
    last_pass: Option<u8>,
    guru_mode: bool,
    keep_tmpdir: bool,
    target_pid: Option<u32>,
    cmd: Option<String>,
    privilege: Option<Privilege>,
    remotes: Vec<String>,
    compiler: Option<String>,
    runner: Option<String>,
    script_path: Option<String>,
}

impl CliArgs {
    fn session(&self) -> Session {
        let mut session = Session::default();
        if self.verbose > 0 {
            session.set_verbose(self.verbose);
        }
        if let Some(pass) = self.last_pass {
            session.last_pass = pass;
        }
        session.guru_mode = self.guru_mode;
        session.keep_tmpdir = self.keep_tmpdir;
        session.target_pid = self.target_pid.unwrap_or(0);
        session.cmd = self.cmd.clone().unwrap_or_default();
        if let Some(privilege) = self.privilege {
            session.privilege = privilege;
        }
        session
    }
}

fn print_help() {
    println!(
        "Usage:\n  \
stapsh [--help|-h] [--version|-V]\n  \
stapsh [-v]... [-p NUM] [-g] [-k] [-x PID | -c CMD] [--privilege NAME]\n         \
[--remote TARGET]... [--compiler PATH] [--runner PATH] [--no-completion] [SCRIPT]\n\n  \
If SCRIPT is provided, its lines are loaded into the script buffer.\n  \
TARGET is 'direct' or 'ssh://HOST'. The compiler and runner default to\n  \
$STAPSH_COMPILER/$STAPSH_RUNNER, then 'stap'/'staprun'.\n  \
Set STAPSH_LOG (e.g. 'debug') for diagnostics on stderr."
    );
}

fn flag_value<'a>(args: &'a [String], idx: usize, flag: &str, what: &str) -> Result<&'a str, String> {
    args.get(idx + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("Missing {what} after {flag}"))
}

fn parse_cli_args(args: &[String]) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--help" | "-h" => {
                parsed.show_help = true;
                idx += 1;
            }
            "--version" | "-V" => {
                parsed.show_version = true;
                idx += 1;
            }
            "--no-completion" => {
                parsed.no_completion = true;
                idx += 1;
            }
            "-g" => {
                parsed.guru_mode = true;
                idx += 1;
            }
            "-k" => {
                parsed.keep_tmpdir = true;
                idx += 1;
            }
            arg if arg
                .strip_prefix('-')
                .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c == 'v')) =>
            {
                parsed.verbose += (arg.len() - 1) as u32;
                idx += 1;
            }
            "-p" => {
                let value = flag_value(args, idx, "-p", "NUM")?;
                match value.parse::<u8>() {
                    Ok(pass @ 1..=5) => parsed.last_pass = Some(pass),
                    _ => return Err(format!("Invalid pass number '{value}' (should be 1-5)")),
                }
                idx += 2;
            }
            "-x" => {
                let value = flag_value(args, idx, "-x", "PID")?;
                match value.parse::<u32>() {
                    Ok(pid) if pid > 0 => parsed.target_pid = Some(pid),
                    _ => return Err(format!("Invalid target process ID number '{value}'")),
                }
                idx += 2;
            }
            "-c" => {
                parsed.cmd = Some(flag_value(args, idx, "-c", "CMD")?.to_string());
                idx += 2;
            }
            "--privilege" => {
                let value = flag_value(args, idx, "--privilege", "NAME")?;
                parsed.privilege = Some(
                    Privilege::from_name(value)
                        .ok_or_else(|| format!("Unknown privilege level '{value}'"))?,
                );
                idx += 2;
            }
            "--remote" => {
                parsed
                    .remotes
                    .push(flag_value(args, idx, "--remote", "TARGET")?.to_string());
                idx += 2;
            }
            "--compiler" => {
                parsed.compiler = Some(flag_value(args, idx, "--compiler", "PATH")?.to_string());
                idx += 2;
            }
            "--runner" => {
                parsed.runner = Some(flag_value(args, idx, "--runner", "PATH")?.to_string());
                idx += 2;
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option '{arg}'"));
            }
            path => {
                if let Some(previous) = &parsed.script_path {
                    return Err(format!(
                        "Multiple script paths provided ('{previous}' and '{path}')"
                    ));
                }
                parsed.script_path = Some(path.to_string());
                idx += 1;
            }
        }
    }
    if parsed.target_pid.is_some() && parsed.cmd.is_some() {
        return Err("You can't specify a target pid and a cmd together.".to_string());
    }
    Ok(parsed)
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_env("STAPSH_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

fn worker_main() -> ExitCode {
    let toolchain = ExternalToolchain::from_overrides();
    let mut stdout = io::stdout().lock();
    let code = run_worker(&toolchain, io::stdin().lock(), &mut stdout);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn run_shell(cli: &CliArgs) -> anyhow::Result<()> {
    if let Some(compiler) = &cli.compiler {
        set_tool_override(Tool::Compiler.env_var(), compiler);
    }
    if let Some(runner) = &cli.runner {
        set_tool_override(Tool::Runner.env_var(), runner);
    }

    let mut state = ShellState::new(cli.session(), cli.remotes.clone());
    if let Some(path) = &cli.script_path {
        state.script.load_file(path)?;
    }
    let executor = PassExecutor::current_exe(Box::new(ExternalToolchain::from_overrides()))?;
    let mut shell = Shell::new(state, Box::new(executor));

    if let Err(e) = interrupt::install_handler() {
        tracing::warn!("Ctrl-C handler not installed: {e}");
    }
    let index = if cli.no_completion {
        NameIndex::new()
    } else {
        shell.bootstrap_index()
    };

    println!("{}", about::banner_text());
    shell.run(index, &mut TerminalConsole)?;
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let args: Vec<String> = env::args().skip(1).collect();
    if args.first().map(String::as_str) == Some(WORKER_FLAG) {
        return worker_main();
    }

    let cli = match parse_cli_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{e}");
            print_help();
            return ExitCode::from(2);
        }
    };
    if cli.show_help {
        print_help();
        return ExitCode::SUCCESS;
    }
    if cli.show_version {
        println!("{}", about::version_cli_text());
        return ExitCode::SUCCESS;
    }

    match run_shell(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("stapsh: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(line: &str) -> Vec<String> {
        line.split_whitespace().map(str::to_string).collect()
    }

    #[test]
    fn flags_build_the_initial_session() {
        let cli = parse_cli_args(&args("-vv -v -p 3 -g -x 77 --privilege stapusr probe.stp"))
            .expect("valid arguments");
        let session = cli.session();
        assert_eq!(session.verbose, 3);
        assert_eq!(session.perpass_verbose, [3; 5]);
        assert_eq!(session.last_pass, 3);
        assert!(session.guru_mode);
        assert_eq!(session.target_pid, 77);
        assert_eq!(session.privilege, Privilege::STAPUSR);
        assert_eq!(cli.script_path.as_deref(), Some("probe.stp"));
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(parse_cli_args(&args("-p 6")).is_err());
        assert!(parse_cli_args(&args("-x")).is_err());
        assert!(parse_cli_args(&args("-x 0")).is_err());
        assert!(parse_cli_args(&args("-x 5 -c ls")).is_err());
        assert!(parse_cli_args(&args("--privilege root")).is_err());
        assert!(parse_cli_args(&args("a.stp b.stp")).is_err());
        assert!(parse_cli_args(&args("--frobnicate")).is_err());
    }

    #[test]
    fn non_ascii_script_path_is_positional() {
        for path in ["é.stp", "überwachung.stp", "/tmp/プローブ.stp"] {
            let cli = parse_cli_args(&args(path)).expect("valid arguments");
            assert_eq!(cli.script_path.as_deref(), Some(path));
            assert_eq!(cli.verbose, 0);
        }
        assert!(parse_cli_args(&args("-é")).is_err());
    }

    #[test]
    fn remotes_accumulate() {
        let cli = parse_cli_args(&args("--remote ssh://a --remote direct --no-completion"))
            .expect("valid arguments");
        assert_eq!(cli.remotes, ["ssh://a", "direct"]);
        assert!(cli.no_completion);
    }
}
