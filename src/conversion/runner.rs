//! External tool invocation
//!
//! Every subprocess (ffmpeg, mp3gain) goes through a [`ToolRunner`]. The
//! system implementation drives `tokio::process` on a current-thread runtime
//! so each call can be bounded by a timeout; a child that overruns is killed.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::runtime::Runtime;

use crate::error::{PipelineError, Result};

/// A program plus its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Short name used in logs and errors (`ffmpeg`, not `/usr/bin/ffmpeg`)
    pub fn tool_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    /// Last non-empty stderr line, usually the one that explains a failure
    pub fn last_error_line(&self) -> &str {
        self.stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or("Unknown error")
    }
}

impl From<std::process::Output> for ToolOutput {
    fn from(output: std::process::Output) -> Self {
        Self {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

pub trait ToolRunner {
    /// Run a command to completion. An `Err` means the process could not be
    /// run at all; a non-zero exit is reported through `ToolOutput::success`.
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput>;
}

/// Run a command and turn a non-zero exit into `ToolInvocation`
pub fn run_checked(runner: &dyn ToolRunner, command: &ToolCommand) -> Result<ToolOutput> {
    let output = runner.run(command)?;
    if output.success {
        Ok(output)
    } else {
        let status = output
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "signal".to_string());
        Err(PipelineError::tool(
            command.tool_name(),
            format!("exited with status {}: {}", status, output.last_error_line()),
        ))
    }
}

/// Runs real subprocesses with a per-call timeout
pub struct SystemRunner {
    runtime: Runtime,
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .enable_time()
            .build()?;
        Ok(Self { runtime, timeout })
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        let tool = command.tool_name();
        log::debug!("Running {} {:?}", command.program.display(), command.args);

        self.runtime.block_on(async {
            let child = Command::new(&command.program)
                .args(&command.args)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output();

            match tokio::time::timeout(self.timeout, child).await {
                Ok(Ok(output)) => Ok(ToolOutput::from(output)),
                Ok(Err(e)) => Err(PipelineError::tool(&tool, format!("failed to spawn: {}", e))),
                Err(_) => Err(PipelineError::tool(
                    &tool,
                    format!("timed out after {}s", self.timeout.as_secs_f64()),
                )),
            }
        })
    }
}

/// Check that a tool can be started, e.g. `ffmpeg -version`
pub fn verify_tool(runner: &dyn ToolRunner, program: &Path, version_arg: &str) -> Result<()> {
    let command = ToolCommand::new(program).arg(version_arg);
    run_checked(runner, &command)?;
    log::debug!("{} is available", command.tool_name());
    Ok(())
}
