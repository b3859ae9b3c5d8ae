use crate::{error::ShellError, script::split_lines_lossy};
use std::{fs, io::Write, process::Command};

/// Lets the user edit `lines` in `editor`, returning what they saved.
///
/// `editor` may carry arguments (`"vim -u NONE"`); the temp file path is
/// appended last. The temp file is removed on every path out of here.
pub fn edit_lines(lines: &[String], editor: &str) -> Result<Vec<String>, ShellError> {
    let mut file = tempfile::Builder::new()
        .prefix("stap")
        .suffix(".stp")
        .tempfile()
        .map_err(|e| ShellError::io("Couldn't create temporary file", e))?;

    if !lines.is_empty() {
        let text = format!("{}\n", lines.join("\n"));
        file.write_all(text.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| ShellError::io("Couldn't write to temporary file", e))?;
    }

    let mut words = editor.split_whitespace();
    let program = words
        .next()
        .ok_or_else(|| ShellError::String("No editor configured".to_string()))?;
    tracing::debug!(editor, path = %file.path().display(), "launching editor");
    let status = Command::new(program)
        .args(words)
        .arg(file.path())
        .status()
        .map_err(|source| ShellError::Spawn {
            program: program.to_string(),
            source,
        })?;
    if !status.success() {
        return Err(ShellError::Editor {
            editor: editor.to_string(),
            status: status.to_string(),
        });
    }

    // Editors often replace the file, so re-open by path.
    let bytes = fs::read(file.path())
        .map_err(|e| ShellError::io("Couldn't read back temporary file", e))?;
    Ok(split_lines_lossy(&bytes))
}
