use crate::{
    console::Console,
    registry::{OptionAccess, OptionSpec, Verb},
};
use stapsh_protocol::Session;

const PID_CMD_CONFLICT: &str = "You can't specify a target pid and a cmd together.";

pub fn standard_options() -> Vec<OptionSpec> {
    vec![
        OptionSpec {
            name: "keep_tmpdir",
            help: "Keep temporary directory.",
            access: OptionAccess::Flag(|s| &mut s.keep_tmpdir),
        },
        OptionSpec {
            name: "last_pass",
            help: "Stop after pass NUM 1-5.",
            access: OptionAccess::Handler(last_pass),
        },
        OptionSpec {
            name: "verbose",
            help: "Add verbosity to all passes.",
            access: OptionAccess::Handler(verbose),
        },
        OptionSpec {
            name: "guru_mode",
            help: "Guru mode.",
            access: OptionAccess::Flag(|s| &mut s.guru_mode),
        },
        OptionSpec {
            name: "suppress_warnings",
            help: "Suppress warnings.",
            access: OptionAccess::Flag(|s| &mut s.suppress_warnings),
        },
        OptionSpec {
            name: "panic_warnings",
            help: "Turn warnings into errors.",
            access: OptionAccess::Flag(|s| &mut s.panic_warnings),
        },
        OptionSpec {
            name: "timing",
            help: "Collect probe timing information.",
            access: OptionAccess::Flag(|s| &mut s.timing),
        },
        OptionSpec {
            name: "unoptimized",
            help: "Unoptimized translation.",
            access: OptionAccess::Flag(|s| &mut s.unoptimized),
        },
        OptionSpec {
            name: "target_pid",
            help: "Sets target() to PID.",
            access: OptionAccess::Handler(target_pid),
        },
        OptionSpec {
            name: "cmd",
            help: "Start the probes, run CMD, and exit when it finishes.",
            access: OptionAccess::Handler(cmd),
        },
    ]
}

fn value(tokens: &[String]) -> &str {
    tokens.get(2).map(String::as_str).unwrap_or_default()
}

fn last_pass(session: &mut Session, console: &mut dyn Console, verb: Verb, tokens: &[String]) {
    match verb {
        Verb::Set => match value(tokens).parse::<u8>() {
            Ok(pass @ 1..=5) => session.last_pass = pass,
            _ => console.print("Invalid option value (should be 1-5)"),
        },
        Verb::Show => console.print(&format!("last_pass: {}", session.last_pass)),
    }
}

fn verbose(session: &mut Session, console: &mut dyn Console, verb: Verb, tokens: &[String]) {
    match verb {
        Verb::Set => match value(tokens).parse::<u32>() {
            Ok(level) => session.set_verbose(level),
            Err(_) => console.print("Invalid option value (should be 0 or greater)"),
        },
        Verb::Show => console.print(&format!("verbose: {}", session.verbose)),
    }
}

fn target_pid(session: &mut Session, console: &mut dyn Console, verb: Verb, tokens: &[String]) {
    match verb {
        Verb::Set => {
            if !session.cmd.is_empty() {
                console.note(PID_CMD_CONFLICT);
                return;
            }
            match value(tokens).parse::<u32>() {
                Ok(pid) if pid > 0 => session.target_pid = pid,
                _ => console.print("Invalid target process ID number."),
            }
        }
        Verb::Show => console.print(&format!("target_pid: {}", session.target_pid)),
    }
}

fn cmd(session: &mut Session, console: &mut dyn Console, verb: Verb, tokens: &[String]) {
    match verb {
        Verb::Set => {
            if session.target_pid != 0 {
                console.note(PID_CMD_CONFLICT);
                return;
            }
            let joined = tokens.get(2..).unwrap_or_default().join(" ");
            session.cmd = strip_outer_quotes(&joined).to_string();
        }
        Verb::Show => console.print(&format!("cmd: \"{}\"", session.cmd)),
    }
}

/// `"ls -l"` and `'ls -l'` become `ls -l`; mismatched quotes are kept.
pub fn strip_outer_quotes(text: &str) -> &str {
    let bytes = text.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last))
            if bytes.len() >= 2 && (first == b'"' || first == b'\'') && first == last =>
        {
            &text[1..text.len() - 1]
        }
        _ => text,
    }
}
