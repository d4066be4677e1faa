// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! External inventory tool invocation.

use std::{
    io,
    path::Path,
    process::{Command, Stdio},
};
use tracing::{debug, instrument};

/// Captured result of an external process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Process exited with status zero.
    pub success: bool,

    /// Exit code, if the process exited normally.
    pub code: Option<i32>,

    /// Everything written to stdout.
    pub stdout: Vec<u8>,

    /// Everything written to stderr.
    pub stderr: String,
}

impl ToolOutput {
    /// Describe how the process exited.
    pub fn describe_exit(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Layer of indirection for running external programs in a working copy.
pub trait InventoryToolRunner {
    /// Run program with arguments inside `work_dir`, capturing its output.
    fn run(&self, program: &str, args: &[String], work_dir: &Path) -> io::Result<ToolOutput>;
}

impl<T> InventoryToolRunner for &T
where
    T: InventoryToolRunner + ?Sized,
{
    fn run(&self, program: &str, args: &[String], work_dir: &Path) -> io::Result<ToolOutput> {
        (**self).run(program, args, work_dir)
    }
}

/// Run external programs as child processes.
#[derive(Debug, Default, Clone)]
pub struct CommandRunner;

impl InventoryToolRunner for CommandRunner {
    #[instrument(skip(self), level = "debug")]
    fn run(&self, program: &str, args: &[String], work_dir: &Path) -> io::Result<ToolOutput> {
        let output = Command::new(program)
            .args(args)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .output()?;
        debug!(
            "{program} exited with {:?}, {} bytes on stdout",
            output.status.code(),
            output.stdout.len()
        );

        Ok(ToolOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(output.stderr.as_slice()).into_owned(),
        })
    }
}
