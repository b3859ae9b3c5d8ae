pub const STAPSH_DISPLAY_VERSION: &str = env!("STAPSH_DISPLAY_VERSION");
pub const STAPSH_BUILD_N: &str = env!("STAPSH_BUILD_N");

pub fn version_cli_text() -> String {
    format!(
        "stapsh {}\nBuild {}\nInteractive shell for tracing scripts",
        STAPSH_DISPLAY_VERSION, STAPSH_BUILD_N
    )
}

pub fn banner_text() -> String {
    format!("stapsh {STAPSH_DISPLAY_VERSION}. Type \"help\" for a list of commands.")
}
