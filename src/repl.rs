use crate::{
    completion::{CompletionEngine, CompletionKind},
    console::Console,
    error::ShellError,
    executor::PassRunner,
    registry::{Flow, Registry},
    state::ShellState,
};
use rustyline::{
    CompletionType, Config, Context, Editor, Helper,
    completion::{Completer, FilenameCompleter, Pair},
    error::ReadlineError,
    highlight::Highlighter,
    hint::Hinter,
    history::DefaultHistory,
    validate::Validator,
};
use stapsh_index::{NameIndex, Placeholders};
use stapsh_protocol::DumpMode;
use std::{io::IsTerminal, rc::Rc};

pub const PROMPT: &str = "stap> ";

/// Line editor hooks: command, option, probe point and filename completion.
pub struct ShellHelper {
    registry: Rc<Registry>,
    index: Rc<NameIndex>,
    files: FilenameCompleter,
}

impl ShellHelper {
    pub fn new(registry: Rc<Registry>, index: Rc<NameIndex>) -> Self {
        Self {
            registry,
            index,
            files: FilenameCompleter::new(),
        }
    }
}

impl Completer for ShellHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let completion = CompletionEngine::new(&self.registry, &self.index).complete(line, pos);
        if completion.kind == CompletionKind::Filename {
            return self.files.complete(line, pos, ctx);
        }
        let pairs = completion
            .candidates
            .map(|candidate| Pair {
                display: candidate.clone(),
                replacement: candidate,
            })
            .collect();
        Ok((completion.start, pairs))
    }
}

impl Hinter for ShellHelper {
    type Hint = String;
}

impl Highlighter for ShellHelper {}

impl Validator for ShellHelper {}

impl Helper for ShellHelper {}

pub struct Shell {
    registry: Rc<Registry>,
    pub state: ShellState,
    runner: Box<dyn PassRunner>,
}

impl Shell {
    pub fn new(state: ShellState, runner: Box<dyn PassRunner>) -> Self {
        Self {
            registry: Rc::new(Registry::standard()),
            state,
            runner,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn execute_line(&mut self, line: &str, console: &mut dyn Console) -> Flow {
        self.registry
            .dispatch(line, &mut self.state, console, self.runner.as_ref())
    }

    /// Asks the compiler for every probe type and alias it knows.
    ///
    /// The dumps run quietly and stop after elaboration; the user's verbosity
    /// and last pass are restored afterwards. A failed dump leaves its part
    /// of the index empty.
    pub fn bootstrap_index(&mut self) -> NameIndex {
        let mut index = NameIndex::new();
        let snapshot = self.state.session.snapshot();
        for (mode, placeholders) in [
            (DumpMode::ProbeTypes, Placeholders::Typed),
            (DumpMode::ProbeAliases, Placeholders::Literal),
        ] {
            self.state.session.prepare_dump(mode);
            match self.runner.dump(&self.state.session) {
                Ok(text) => {
                    index.load_dump(&text, placeholders);
                }
                Err(e) => tracing::warn!(?mode, "probe dump unavailable: {e}"),
            }
        }
        self.state.session.restore(&snapshot);
        self.state.session.clear_script_data();
        tracing::info!(nodes = index.len(), "probe point index ready");
        index
    }

    /// Reads and runs commands until `quit`.
    ///
    /// End of input on a terminal only prints a hint. On a pipe or file it
    /// ends the loop too, since a closed stream would return EOF forever.
    pub fn run(&mut self, index: NameIndex, console: &mut dyn Console) -> Result<(), ShellError> {
        let config = Config::builder()
            .auto_add_history(false)
            .completion_type(CompletionType::List)
            .build();
        let mut editor: Editor<ShellHelper, DefaultHistory> = Editor::with_config(config)?;
        editor.set_helper(Some(ShellHelper::new(
            Rc::clone(&self.registry),
            Rc::new(index),
        )));
        let interactive = std::io::stdin().is_terminal();

        loop {
            match editor.readline(PROMPT) {
                Ok(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    editor.add_history_entry(line.as_str())?;
                    if self.execute_line(&line, console) == Flow::Quit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    if end_of_input(interactive, console) == Flow::Quit {
                        break;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

fn end_of_input(interactive: bool, console: &mut dyn Console) -> Flow {
    if interactive {
        console.note("Use \"quit\" to leave the shell.");
        Flow::Continue
    } else {
        tracing::debug!("end of non-terminal input");
        Flow::Quit
    }
}
