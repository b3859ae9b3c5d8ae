use crate::privilege::Privilege;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

/// Number of pipeline passes that carry their own verbosity level.
pub const PASS_COUNT: usize = 5;

/// What the compiler should print instead of compiling a script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DumpMode {
    #[default]
    None,
    ProbeTypes,
    ProbeAliases,
}

/// Options for one pipeline run. This is the only state the pass worker sees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub verbose: u32,
    pub perpass_verbose: [u32; PASS_COUNT],
    pub last_pass: u8,
    pub keep_tmpdir: bool,
    pub guru_mode: bool,
    pub suppress_warnings: bool,
    pub panic_warnings: bool,
    pub timing: bool,
    pub unoptimized: bool,
    pub target_pid: u32,
    pub cmd: String,
    pub privilege: Privilege,
    pub dump_mode: DumpMode,
    pub script: String,
    pub have_script: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            verbose: 0,
            perpass_verbose: [0; PASS_COUNT],
            last_pass: 5,
            keep_tmpdir: false,
            guru_mode: false,
            suppress_warnings: false,
            panic_warnings: false,
            timing: false,
            unoptimized: false,
            target_pid: 0,
            cmd: String::new(),
            privilege: Privilege::default(),
            dump_mode: DumpMode::None,
            script: String::new(),
            have_script: false,
        }
    }
}

/// The user-visible settings that bootstrap dumps temporarily override.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub verbose: u32,
    pub perpass_verbose: [u32; PASS_COUNT],
    pub last_pass: u8,
}

impl Session {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            verbose: self.verbose,
            perpass_verbose: self.perpass_verbose,
            last_pass: self.last_pass,
        }
    }

    pub fn restore(&mut self, snapshot: &SessionSnapshot) {
        self.verbose = snapshot.verbose;
        self.perpass_verbose = snapshot.perpass_verbose;
        self.last_pass = snapshot.last_pass;
    }

    /// Sets one verbosity level for every pass.
    pub fn set_verbose(&mut self, level: u32) {
        self.verbose = level;
        self.perpass_verbose = [level; PASS_COUNT];
    }

    /// Quiet settings for a name dump: no verbosity, stop after elaboration.
    pub fn prepare_dump(&mut self, mode: DumpMode) {
        self.set_verbose(0);
        self.last_pass = 2;
        self.dump_mode = mode;
    }

    pub fn set_script(&mut self, script: String) {
        self.script = script;
        self.have_script = true;
    }

    pub fn clear_script_data(&mut self) {
        self.dump_mode = DumpMode::None;
        self.script.clear();
        self.have_script = false;
    }

    /// Whether a successful compile is followed by loading the module.
    pub fn runs_module(&self) -> bool {
        self.last_pass > 4
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<(), serde_json::Error> {
        serde_json::to_writer(writer, self)
    }

    pub fn read_json<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        serde_json::from_reader(reader)
    }
}
