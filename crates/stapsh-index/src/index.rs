use crate::{candidates::PathCandidates, placeholder::Placeholder};
use indexmap::IndexMap;
use serde::Serialize;

pub type NodeId = usize;

/// Whether `(number)`/`(string)` markers in a dump are interpreted.
///
/// Probe type dumps use them; alias names are always literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholders {
    Typed,
    Literal,
}

/// One component of a dotted probe point path.
#[derive(Debug, Clone, Serialize)]
pub struct MatchNode {
    key: String,
    segment_text: String,
    placeholder: Placeholder,
    terminal: bool,
    parent: Option<NodeId>,
    children: IndexMap<String, NodeId>,
}

impl MatchNode {
    fn new(key: &str, placeholders: Placeholders, parent: NodeId) -> Self {
        let (segment_text, placeholder) = match placeholders {
            Placeholders::Typed => Placeholder::split(key),
            Placeholders::Literal => (key, Placeholder::None),
        };
        Self {
            key: key.to_string(),
            segment_text: segment_text.to_string(),
            placeholder,
            terminal: false,
            parent: Some(parent),
            children: IndexMap::new(),
        }
    }

    fn root() -> Self {
        Self {
            key: String::new(),
            segment_text: String::new(),
            placeholder: Placeholder::None,
            terminal: false,
            parent: None,
            children: IndexMap::new(),
        }
    }

    /// The raw dump text this node is keyed by, e.g. `function(string)`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The literal part of the component, e.g. `function`.
    pub fn segment_text(&self) -> &str {
        &self.segment_text
    }

    pub fn placeholder(&self) -> Placeholder {
        self.placeholder
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    pub fn children(&self) -> impl DoubleEndedIterator<Item = (&str, NodeId)> + '_ {
        self.children.iter().map(|(key, id)| (key.as_str(), *id))
    }

    /// Matches a complete user-typed component.
    ///
    /// `kernel` matches `kernel`; `function("sys_read")` matches
    /// `function(string)`; `process(123)` matches `process(number)`.
    pub fn full_match(&self, text: &str) -> bool {
        match self.placeholder {
            Placeholder::None => text == self.segment_text,
            kind => {
                text.len() > self.segment_text.len()
                    && text.starts_with(&self.segment_text)
                    && kind.accepts(&text[self.segment_text.len()..])
            }
        }
    }

    /// Matches a component still being typed against the literal text only.
    ///
    /// `proc` matches `process`, `process(number)` and `process(string)`.
    pub fn partial_match(&self, text: &str) -> bool {
        text.is_empty() || self.segment_text.starts_with(text)
    }
}

/// Arena-backed trie of probe point names. Node 0 is the unnamed root.
#[derive(Debug, Clone, Serialize)]
pub struct NameIndex {
    nodes: Vec<MatchNode>,
}

impl Default for NameIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl NameIndex {
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            nodes: vec![MatchNode::root()],
        }
    }

    /// Number of named nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, id: NodeId) -> &MatchNode {
        &self.nodes[id]
    }

    pub fn child(&self, parent: NodeId, key: &str) -> Option<NodeId> {
        self.nodes[parent].children.get(key).copied()
    }

    /// Adds every non-blank line of a dump, returning how many were indexed.
    pub fn load_dump(&mut self, dump: &str, placeholders: Placeholders) -> usize {
        let before = self.nodes.len();
        let mut lines = 0;
        for line in dump.lines() {
            if self.insert_line(line, placeholders) {
                lines += 1;
            }
        }
        tracing::debug!(
            lines,
            new_nodes = self.nodes.len() - before,
            ?placeholders,
            "indexed probe dump"
        );
        lines
    }

    /// Adds one dump line. Anything after the first space is dropped, so
    /// `syscall.read = kernel.function("sys_read")` indexes `syscall.read`.
    pub fn insert_line(&mut self, line: &str, placeholders: Placeholders) -> bool {
        let path = match line.find(' ') {
            Some(pos) => &line[..pos],
            None => line,
        };
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        let Some(last) = segments.len().checked_sub(1) else {
            return false;
        };

        let mut current = Self::ROOT;
        for (pos, segment) in segments.iter().enumerate() {
            current = match self.child(current, segment) {
                Some(existing) => existing,
                None => {
                    let id = self.nodes.len();
                    self.nodes
                        .push(MatchNode::new(segment, placeholders, current));
                    self.nodes[current].children.insert(segment.to_string(), id);
                    id
                }
            };
            if pos == last {
                self.nodes[current].terminal = true;
            }
        }
        true
    }

    /// Walks down from the root, one full match per component.
    ///
    /// The first child (in insertion order) that fully matches wins. The walk
    /// stops at the deepest level reached; the second value reports whether
    /// every component matched.
    pub fn descend<'s, I>(&self, components: I) -> (NodeId, bool)
    where
        I: IntoIterator<Item = &'s str>,
    {
        let mut current = Self::ROOT;
        for component in components {
            let next = self.nodes[current]
                .children
                .values()
                .copied()
                .find(|id| self.nodes[*id].full_match(component));
            match next {
                Some(id) => current = id,
                None => return (current, false),
            }
        }
        (current, true)
    }

    /// Finds the node a user-typed dotted path resolves to.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        match self.descend(path.split('.').filter(|s| !s.is_empty())) {
            (id, true) if id != Self::ROOT => Some(id),
            _ => None,
        }
    }

    /// The dump path a node was created from, e.g. `kernel.function(string)`.
    pub fn path_of(&self, id: NodeId) -> String {
        let mut keys = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            if node.parent.is_some() {
                keys.push(node.key.as_str());
            }
            current = node.parent;
        }
        keys.reverse();
        keys.join(".")
    }

    /// Terminal paths below `from` whose first component partially matches
    /// `text`. Paths are relative to `from`.
    pub fn candidates(&self, from: NodeId, text: &str) -> PathCandidates<'_> {
        PathCandidates::new(self, from, text)
    }

    /// Completes a partially typed dotted path.
    ///
    /// Components before the last `.` are resolved with [`NameIndex::descend`];
    /// the text after it is the component being completed.
    pub fn complete(&self, partial_path: &str) -> PathCandidates<'_> {
        let (typed, text) = match partial_path.rfind('.') {
            Some(pos) => (&partial_path[..pos], &partial_path[pos + 1..]),
            None => ("", partial_path),
        };
        let (from, _) = self.descend(typed.split('.').filter(|s| !s.is_empty()));
        self.candidates(from, text)
    }

    /// Every terminal path in the index, depth first.
    pub fn paths(&self) -> PathCandidates<'_> {
        self.candidates(Self::ROOT, "")
    }
}
