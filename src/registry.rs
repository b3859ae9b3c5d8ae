use crate::{
    commands,
    console::Console,
    executor::PassRunner,
    options,
    state::ShellState,
};
use stapsh_protocol::Session;

/// Whether the REPL keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Set,
    Show,
}

/// What a command's first argument is, for completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Argument {
    None,
    ScriptText,
    LineNumber,
    File,
    /// `set`/`show`: the first argument names an option.
    Option(Verb),
}

pub struct CommandContext<'a> {
    pub state: &'a mut ShellState,
    pub console: &'a mut dyn Console,
    pub runner: &'a dyn PassRunner,
    pub registry: &'a Registry,
}

pub type CommandHandler = fn(&mut CommandContext<'_>, &[String]) -> Flow;

pub struct CommandSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub help: &'static str,
    pub argument: Argument,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn owns_options(&self) -> bool {
        matches!(self.argument, Argument::Option(_))
    }
}

pub type OptionHandler = fn(&mut Session, &mut dyn Console, Verb, &[String]);

pub enum OptionAccess {
    /// A boolean session field: any value but `0` sets it.
    Flag(fn(&mut Session) -> &mut bool),
    Handler(OptionHandler),
}

pub struct OptionSpec {
    pub name: &'static str,
    pub help: &'static str,
    pub access: OptionAccess,
}

impl OptionSpec {
    /// Runs `set`/`show` for this option; `tokens` is the whole command line.
    pub fn apply(&self, session: &mut Session, console: &mut dyn Console, verb: Verb, tokens: &[String]) {
        match &self.access {
            OptionAccess::Flag(field) => {
                let value = field(session);
                match verb {
                    Verb::Set => *value = tokens.get(2).is_some_and(|t| t != "0"),
                    Verb::Show => console.print(&format!("{}: {}", self.name, u8::from(*value))),
                }
            }
            OptionAccess::Handler(handler) => handler(session, console, verb, tokens),
        }
    }
}

/// Commands and options in the order they are listed and completed.
pub struct Registry {
    commands: Vec<CommandSpec>,
    options: Vec<OptionSpec>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl Registry {
    pub fn new(commands: Vec<CommandSpec>, options: Vec<OptionSpec>) -> Self {
        Self { commands, options }
    }

    pub fn standard() -> Self {
        Self::new(commands::standard_commands(), options::standard_options())
    }

    pub fn commands(&self) -> &[CommandSpec] {
        &self.commands
    }

    pub fn options(&self) -> &[OptionSpec] {
        &self.options
    }

    pub fn command(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.iter().find(|c| c.name == name)
    }

    pub fn option(&self, name: &str) -> Option<&OptionSpec> {
        self.options.iter().find(|o| o.name == name)
    }

    pub fn help_text(&self) -> String {
        let width = self.commands.iter().map(|c| c.usage.len()).max().unwrap_or(0);
        let option_width = self.options.iter().map(|o| o.name.len()).max().unwrap_or(0);
        let mut text = String::from("List of commands:\n\n");
        for command in &self.commands {
            text.push_str(&format!("{:<width$} -- {}\n", command.usage, command.help));
            if command.name == "set" {
                for option in &self.options {
                    text.push_str(&format!(
                        "    {:<option_width$} -- {}\n",
                        option.name, option.help
                    ));
                }
            }
        }
        text
    }

    /// Runs one input line. Blank lines do nothing.
    pub fn dispatch(
        &self,
        line: &str,
        state: &mut ShellState,
        console: &mut dyn Console,
        runner: &dyn PassRunner,
    ) -> Flow {
        let tokens = tokenize(line);
        let Some(name) = tokens.first() else {
            return Flow::Continue;
        };
        let Some(command) = self.command(name) else {
            console.note(&format!("Undefined command: \"{name}\". Try \"help\"."));
            return Flow::Continue;
        };
        tracing::debug!(command = command.name, args = tokens.len() - 1, "dispatching");
        let mut context = CommandContext {
            state,
            console,
            runner,
            registry: self,
        };
        (command.handler)(&mut context, &tokens)
    }
}

pub fn tokenize(line: &str) -> Vec<String> {
    line.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{commands::testing::RefusingRunner, console::testing::RecordingConsole};

    #[test]
    fn registry_order_is_fixed() {
        let registry = Registry::standard();
        let names: Vec<&str> = registry.commands().iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            ["add", "delete", "list", "edit", "load", "save", "run", "set", "show", "help", "quit"]
        );
        let options: Vec<&str> = registry.options().iter().map(|o| o.name).collect();
        assert_eq!(
            options,
            [
                "keep_tmpdir",
                "last_pass",
                "verbose",
                "guru_mode",
                "suppress_warnings",
                "panic_warnings",
                "timing",
                "unoptimized",
                "target_pid",
                "cmd"
            ]
        );
        assert!(registry.command("set").expect("set").owns_options());
        assert!(!registry.command("add").expect("add").owns_options());
    }

    #[test]
    fn unknown_command_suggests_help() {
        let registry = Registry::standard();
        let mut state = ShellState::default();
        let mut console = RecordingConsole::default();
        let flow = registry.dispatch("frobnicate now", &mut state, &mut console, &RefusingRunner);
        assert_eq!(flow, Flow::Continue);
        assert_eq!(console.noted, vec!["Undefined command: \"frobnicate\". Try \"help\"."]);
    }

    #[test]
    fn only_quit_ends_the_loop() {
        let registry = Registry::standard();
        let mut state = ShellState::default();
        let mut console = RecordingConsole::default();
        for line in ["", "   ", "list", "help", "show", "bogus"] {
            assert_eq!(
                registry.dispatch(line, &mut state, &mut console, &RefusingRunner),
                Flow::Continue
            );
        }
        assert_eq!(
            registry.dispatch("  quit ", &mut state, &mut console, &RefusingRunner),
            Flow::Quit
        );
    }

    #[test]
    fn help_aligns_usages_and_lists_options_under_set() {
        let text = Registry::standard().help_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "List of commands:");
        assert_eq!(lines[1], "");
        let separator = lines[2].find(" -- ").expect("separator");
        let set = lines.iter().position(|l| l.starts_with("set ")).expect("set line");
        assert!(lines[set + 1].starts_with("    keep_tmpdir"));
        for line in lines[2..].iter().filter(|l| !l.starts_with("    ")) {
            assert_eq!(line.find(" -- "), Some(separator), "misaligned: {line}");
        }
    }

    #[test]
    fn flag_options_treat_anything_but_zero_as_true() {
        let registry = Registry::standard();
        let option = registry.option("guru_mode").expect("guru_mode");
        let mut session = Session::default();
        let mut console = RecordingConsole::default();
        for (value, expected) in [("1", true), ("0", false), ("yes", true), ("00", true)] {
            let tokens = tokenize(&format!("set guru_mode {value}"));
            option.apply(&mut session, &mut console, Verb::Set, &tokens);
            assert_eq!(session.guru_mode, expected, "value {value}");
        }
        option.apply(&mut session, &mut console, Verb::Show, &tokenize("show guru_mode"));
        assert_eq!(console.printed, vec!["guru_mode: 1"]);
    }
}
