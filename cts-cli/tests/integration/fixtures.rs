// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8Path;
use std::process::{Command, Output};

/// Runs `cts` with color disabled, in `dir`.
#[track_caller]
pub fn cts_in(dir: &Utf8Path, args: &[&str]) -> CtsOutput {
    let output = Command::new(env!("CARGO_BIN_EXE_cts"))
        .current_dir(dir)
        .env_remove("CTS_PROFILE")
        .env_remove("CTS_STATUS_LEVEL")
        .env_remove("CTS_LOG")
        .args(["--color", "never"])
        .args(args)
        .output()
        .expect("cts could run");
    CtsOutput::new(output)
}

/// Runs `cts` with color disabled, in a directory without a config file.
#[track_caller]
pub fn cts(args: &[&str]) -> CtsOutput {
    let dir = camino_tempfile::tempdir().expect("temp dir created");
    cts_in(dir.path(), args)
}

pub struct CtsOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CtsOutput {
    fn new(output: Output) -> Self {
        Self {
            exit_code: output.status.code(),
            stdout: String::from_utf8(output.stdout).expect("stdout is UTF-8"),
            stderr: String::from_utf8(output.stderr).expect("stderr is UTF-8"),
        }
    }
}

impl std::fmt::Display for CtsOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "exit code: {:?}", self.exit_code)?;
        writeln!(f, "--- stdout ---\n{}", self.stdout)?;
        write!(f, "--- stderr ---\n{}", self.stderr)
    }
}
