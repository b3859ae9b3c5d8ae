use std::{
    collections::HashMap,
    sync::{LazyLock, RwLock},
};

static TOOL_OVERRIDES: LazyLock<RwLock<HashMap<String, String>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// External programs the shell drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    /// Runs passes 0-4 and the name dumps.
    Compiler,
    /// Loads a compiled module (pass 5).
    Runner,
    /// Used by the `edit` command.
    Editor,
}

impl Tool {
    pub fn env_var(self) -> &'static str {
        match self {
            Tool::Compiler => "STAPSH_COMPILER",
            Tool::Runner => "STAPSH_RUNNER",
            Tool::Editor => "EDITOR",
        }
    }

    pub fn default_bin(self) -> &'static str {
        match self {
            Tool::Compiler => "stap",
            Tool::Runner => "staprun",
            Tool::Editor => "/bin/ex",
        }
    }

    pub fn resolve(self) -> String {
        resolve_tool_executable(self.env_var(), self.default_bin())
    }
}

fn normalized_non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Overrides `env_var` for this process; an empty value removes the override.
pub fn set_tool_override(env_var: &str, configured: &str) {
    let mut guard = TOOL_OVERRIDES
        .write()
        .expect("Tool override lock poisoned for write");
    if let Some(value) = normalized_non_empty(configured) {
        guard.insert(env_var.to_string(), value);
    } else {
        guard.remove(env_var);
    }
}

pub fn get_tool_override(env_var: &str) -> Option<String> {
    TOOL_OVERRIDES
        .read()
        .expect("Tool override lock poisoned for read")
        .get(env_var)
        .cloned()
}

/// Override first, then the environment, then `default_bin`.
pub fn resolve_tool_executable(env_var: &str, default_bin: &str) -> String {
    get_tool_override(env_var)
        .or_else(|| {
            std::env::var(env_var)
                .ok()
                .and_then(|v| normalized_non_empty(&v))
        })
        .unwrap_or_else(|| default_bin.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_wins_and_can_be_cleared() {
        let var = "STAPSH_TEST_ONLY_COMPILER";
        assert_eq!(resolve_tool_executable(var, "stap"), "stap");
        set_tool_override(var, "  /opt/stap/bin/stap ");
        assert_eq!(get_tool_override(var).as_deref(), Some("/opt/stap/bin/stap"));
        assert_eq!(resolve_tool_executable(var, "stap"), "/opt/stap/bin/stap");
        set_tool_override(var, "   ");
        assert_eq!(get_tool_override(var), None);
        assert_eq!(resolve_tool_executable(var, "stap"), "stap");
    }

    #[test]
    fn tools_have_distinct_variables() {
        assert_eq!(Tool::Compiler.env_var(), "STAPSH_COMPILER");
        assert_eq!(Tool::Runner.default_bin(), "staprun");
        assert_eq!(Tool::Editor.env_var(), "EDITOR");
    }
}
