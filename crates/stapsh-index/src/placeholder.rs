use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

const NUMBER_MARKER: &str = "(number)";
const STRING_MARKER: &str = "(string)";

static NUMBER_ARGUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\([x0-9a-fA-F]+\)$"#).expect("number argument pattern"));
static STRING_ARGUMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\("[^"]+"\)$"#).expect("string argument pattern"));

/// The kind of literal argument a path component accepts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Placeholder {
    #[default]
    None,
    /// `process(123)`, `process(0x7f)`
    Number,
    /// `function("sys_read")`
    String,
}

impl Placeholder {
    /// Splits a raw dump segment into its literal prefix and placeholder kind.
    ///
    /// `function(string)` becomes `("function", String)`. A `(number)` marker
    /// wins when both appear.
    pub fn split(segment: &str) -> (&str, Placeholder) {
        if let Some(pos) = segment.find(NUMBER_MARKER) {
            (&segment[..pos], Placeholder::Number)
        } else if let Some(pos) = segment.find(STRING_MARKER) {
            (&segment[..pos], Placeholder::String)
        } else {
            (segment, Placeholder::None)
        }
    }

    pub fn pattern(self) -> Option<&'static Regex> {
        match self {
            Placeholder::None => None,
            Placeholder::Number => Some(&*NUMBER_ARGUMENT),
            Placeholder::String => Some(&*STRING_ARGUMENT),
        }
    }

    /// Whether `argument` (including its parentheses) is acceptable in full.
    pub fn accepts(self, argument: &str) -> bool {
        self.pattern().is_some_and(|re| re.is_match(argument))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_finds_markers() {
        assert_eq!(Placeholder::split("kernel"), ("kernel", Placeholder::None));
        assert_eq!(
            Placeholder::split("function(string)"),
            ("function", Placeholder::String)
        );
        assert_eq!(
            Placeholder::split("process(number)"),
            ("process", Placeholder::Number)
        );
        assert_eq!(Placeholder::split("(number)"), ("", Placeholder::Number));
    }

    #[test]
    fn number_arguments() {
        assert!(Placeholder::Number.accepts("(123)"));
        assert!(Placeholder::Number.accepts("(0x7fff)"));
        assert!(!Placeholder::Number.accepts("()"));
        assert!(!Placeholder::Number.accepts("(\"12\")"));
        assert!(!Placeholder::Number.accepts("(12).x"));
    }

    #[test]
    fn string_arguments() {
        assert!(Placeholder::String.accepts("(\"sys_read\")"));
        assert!(Placeholder::String.accepts("(\"*@fs/read.c\")"));
        assert!(!Placeholder::String.accepts("(\"\")"));
        assert!(!Placeholder::String.accepts("(sys_read)"));
        assert!(!Placeholder::None.accepts("(\"x\")"));
    }
}
