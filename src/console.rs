use std::io::{self, BufRead, IsTerminal, Write};

/// Where command handlers send their output and ask yes/no questions.
pub trait Console {
    /// Regular command output.
    fn print(&mut self, text: &str);
    /// Diagnostics and progress messages.
    fn note(&mut self, text: &str);
    /// Asks a yes/no question. `prompt` should end in `"? "`.
    fn query(&mut self, prompt: &str, default: QueryDefault) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryDefault {
    /// An explicit answer is required; "yes" when none can be asked for.
    NoDefault,
    Yes,
    No,
}

impl QueryDefault {
    fn answer(self) -> bool {
        !matches!(self, QueryDefault::No)
    }

    fn answer_char(self) -> char {
        if self.answer() { 'Y' } else { 'N' }
    }

    fn choices(self) -> (&'static str, &'static str) {
        match self {
            QueryDefault::NoDefault => ("y", "n"),
            QueryDefault::Yes => ("[y]", "n"),
            QueryDefault::No => ("y", "[n]"),
        }
    }

    /// Interprets one response line; `None` means ask again.
    pub fn interpret(self, response: &str) -> Option<bool> {
        let answer = response
            .trim_start()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase());
        let default_char = self.answer_char();
        let other_char = if default_char == 'Y' { 'N' } else { 'Y' };
        match answer {
            Some(c) if c == other_char => Some(!self.answer()),
            Some(c) if c == default_char => Some(self.answer()),
            None if self != QueryDefault::NoDefault => Some(self.answer()),
            _ => None,
        }
    }
}

/// Console on the process's own stdout/stderr.
#[derive(Debug, Default)]
pub struct TerminalConsole;

impl Console for TerminalConsole {
    fn print(&mut self, text: &str) {
        println!("{text}");
    }

    fn note(&mut self, text: &str) {
        eprintln!("{text}");
    }

    fn query(&mut self, prompt: &str, default: QueryDefault) -> bool {
        let (yes, no) = default.choices();
        let stdin = io::stdin();
        if !stdin.is_terminal() {
            eprintln!(
                "{prompt}({yes} or {no}) [answered {}; input not from terminal]",
                default.answer_char()
            );
            return default.answer();
        }

        loop {
            print!("{prompt}({yes} or {no}) ");
            let _ = io::stdout().flush();
            let mut response = String::new();
            match stdin.lock().read_line(&mut response) {
                Ok(0) | Err(_) => {
                    eprintln!("EOF [assumed {}]", default.answer_char());
                    return default.answer();
                }
                Ok(_) => {}
            }
            if let Some(answer) = default.interpret(&response) {
                return answer;
            }
            eprintln!("Please answer {yes} or {no}.");
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_answers() {
        for default in [QueryDefault::NoDefault, QueryDefault::Yes, QueryDefault::No] {
            assert_eq!(default.interpret("y\n"), Some(true));
            assert_eq!(default.interpret("Yes\n"), Some(true));
            assert_eq!(default.interpret("n\n"), Some(false));
            assert_eq!(default.interpret("maybe\n"), None);
        }
    }

    #[test]
    fn empty_answer_takes_the_default() {
        assert_eq!(QueryDefault::NoDefault.interpret("\n"), None);
        assert_eq!(QueryDefault::Yes.interpret("\n"), Some(true));
        assert_eq!(QueryDefault::No.interpret(""), Some(false));
    }
}
