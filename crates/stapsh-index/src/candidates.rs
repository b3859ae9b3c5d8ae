use crate::index::{NameIndex, NodeId};

/// Lazily walks a subtree, yielding the dotted paths of terminal nodes.
///
/// Traversal is depth first in insertion order. Cloning the iterator before
/// consuming it gives a fresh walk over the same candidates.
#[derive(Debug, Clone)]
pub struct PathCandidates<'a> {
    index: &'a NameIndex,
    stack: Vec<(String, NodeId)>,
}

impl<'a> PathCandidates<'a> {
    pub(crate) fn new(index: &'a NameIndex, from: NodeId, text: &str) -> Self {
        let stack = index
            .node(from)
            .children()
            .rev()
            .filter(|(_, id)| index.node(*id).partial_match(text))
            .map(|(key, id)| (key.to_string(), id))
            .collect();
        Self { index, stack }
    }
}

impl Iterator for PathCandidates<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        while let Some((prefix, id)) = self.stack.pop() {
            let node = self.index.node(id);
            for (key, child) in node.children().rev() {
                self.stack.push((format!("{prefix}.{key}"), child));
            }
            if node.is_terminal() {
                return Some(prefix);
            }
        }
        None
    }
}
