use crate::registry::{Argument, Registry};
use stapsh_index::{NameIndex, PathCandidates};
use std::vec;

/// Characters that start a new completion word.
const WORD_BREAKS: [char; 5] = [' ', '\t', '\n', '.', '{'];
const TOKEN_BREAKS: [char; 3] = [' ', '\t', '\n'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionKind {
    Command,
    Option,
    ProbePoint,
    /// The line editor's own filename completion applies.
    Filename,
    None,
}

/// Completion candidates, produced lazily. Cloning restarts the sequence.
#[derive(Debug, Clone)]
pub enum Candidates<'a> {
    Names(vec::IntoIter<&'static str>),
    ProbePoints(PathCandidates<'a>),
    Empty,
}

impl Iterator for Candidates<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        match self {
            Candidates::Names(names) => names.next().map(str::to_string),
            Candidates::ProbePoints(paths) => paths.next(),
            Candidates::Empty => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Completion<'a> {
    /// Byte offset where the replaced word starts.
    pub start: usize,
    pub kind: CompletionKind,
    pub candidates: Candidates<'a>,
}

impl Completion<'_> {
    fn none(start: usize) -> Self {
        Self {
            start,
            kind: CompletionKind::None,
            candidates: Candidates::Empty,
        }
    }
}

/// Decides what the word under the cursor can complete to.
pub struct CompletionEngine<'a> {
    registry: &'a Registry,
    index: &'a NameIndex,
}

impl<'a> CompletionEngine<'a> {
    pub fn new(registry: &'a Registry, index: &'a NameIndex) -> Self {
        Self { registry, index }
    }

    pub fn complete(&self, line: &str, pos: usize) -> Completion<'a> {
        let before = line.get(..pos).unwrap_or(line);
        let start = before
            .rfind(WORD_BREAKS)
            .map(|i| i + 1)
            .unwrap_or(0);
        let text = &before[start..];
        let token_start = before
            .rfind(TOKEN_BREAKS)
            .map(|i| i + 1)
            .unwrap_or(0);
        let token = &before[token_start..];
        let token_index = before[..token_start].split_whitespace().count();

        if token_index == 0 {
            let names = self
                .registry
                .commands()
                .iter()
                .map(|c| c.name)
                .filter(|name| name.starts_with(text))
                .collect::<Vec<_>>();
            return Completion {
                start,
                kind: CompletionKind::Command,
                candidates: Candidates::Names(names.into_iter()),
            };
        }

        let mut words = line.split_whitespace();
        let Some(command) = words.next().and_then(|name| self.registry.command(name)) else {
            return Completion::none(start);
        };
        match (command.argument, token_index) {
            (Argument::Option(_), 1) => {
                let names = self
                    .registry
                    .options()
                    .iter()
                    .map(|o| o.name)
                    .filter(|name| name.starts_with(text))
                    .collect::<Vec<_>>();
                Completion {
                    start,
                    kind: CompletionKind::Option,
                    candidates: Candidates::Names(names.into_iter()),
                }
            }
            (Argument::ScriptText, 2) if words.next() == Some("probe") => Completion {
                start,
                kind: CompletionKind::ProbePoint,
                candidates: Candidates::ProbePoints(self.index.complete(token)),
            },
            (Argument::File, 1) => Completion {
                start: token_start,
                kind: CompletionKind::Filename,
                candidates: Candidates::Empty,
            },
            _ => Completion::none(start),
        }
    }
}
