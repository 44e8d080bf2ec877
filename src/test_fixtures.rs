//! Test fixtures
//!
//! A scripted stand-in for ffmpeg and mp3gain so the pipeline can be tested
//! without either tool installed, plus small helpers for workspace tests.

#![cfg(test)]

use std::cell::RefCell;
use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::FileOptions;
use zip::ZipWriter;

use crate::conversion::{ToolCommand, ToolOutput, ToolRunner};
use crate::core::PipelineSettings;
use crate::error::{PipelineError, Result};

/// Records every invocation and answers like the real tools would
///
/// - ffmpeg probe (`-f null -`): reports the configured duration, or no
///   `Duration:` line when none is set
/// - ffmpeg transcode (`-map_metadata`): writes a small file at the output path
/// - mp3gain: succeeds without touching the file
pub struct FakeTools {
    calls: RefCell<Vec<ToolCommand>>,
    probe_duration: Option<f64>,
    failing_transcodes: HashSet<String>,
    failing_gains: HashSet<String>,
    ffmpeg_missing: bool,
}

impl FakeTools {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            probe_duration: None,
            failing_transcodes: HashSet::new(),
            failing_gains: HashSet::new(),
            ffmpeg_missing: false,
        }
    }

    pub fn with_probe_duration(mut self, secs: f64) -> Self {
        self.probe_duration = Some(secs);
        self
    }

    /// Make transcoding of the source with this file name fail
    pub fn failing_transcode(mut self, file_name: &str) -> Self {
        self.failing_transcodes.insert(file_name.to_string());
        self
    }

    /// Make mp3gain fail on the derivative with this file name
    pub fn failing_gain(mut self, file_name: &str) -> Self {
        self.failing_gains.insert(file_name.to_string());
        self
    }

    /// Behave as if ffmpeg were not installed
    pub fn without_ffmpeg(mut self) -> Self {
        self.ffmpeg_missing = true;
        self
    }

    pub fn calls(&self) -> Vec<ToolCommand> {
        self.calls.borrow().clone()
    }

    pub fn calls_for(&self, tool: &str) -> Vec<ToolCommand> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.tool_name() == tool)
            .cloned()
            .collect()
    }

    pub fn transcode_calls(&self) -> usize {
        self.calls_for("ffmpeg")
            .iter()
            .filter(|c| c.args_lossy().iter().any(|a| a == "-map_metadata"))
            .count()
    }

    pub fn probe_calls(&self) -> usize {
        self.calls_for("ffmpeg")
            .iter()
            .filter(|c| c.args_lossy().last().is_some_and(|a| a == "-"))
            .count()
    }

    fn transcode(&self, args: &[String]) -> ToolOutput {
        let input = arg_after(args, "-i").unwrap_or_default();
        let output = args.last().cloned().unwrap_or_default();

        if self.failing_transcodes.contains(&file_name(&input)) {
            return failure(1, &format!("{}: Invalid data found when processing input", input));
        }
        match std::fs::write(&output, b"ID3 fake mp3") {
            Ok(()) => success(""),
            Err(e) => failure(1, &format!("{}: {}", output, e)),
        }
    }

    fn probe(&self, args: &[String]) -> ToolOutput {
        let input = arg_after(args, "-i").unwrap_or_default();
        let mut stderr = format!("Input #0, flac, from '{}':\n", input);
        if let Some(secs) = self.probe_duration {
            stderr.push_str(&format!(
                "  Duration: {}, start: 0.000000, bitrate: 900 kb/s\n",
                format_ffmpeg_duration(secs)
            ));
        }
        // Null muxer run exits cleanly either way
        success(&stderr)
    }
}

impl ToolRunner for FakeTools {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        self.calls.borrow_mut().push(command.clone());
        let args = command.args_lossy();

        match command.tool_name().as_str() {
            "ffmpeg" if self.ffmpeg_missing => Err(PipelineError::tool(
                "ffmpeg",
                "failed to spawn: No such file or directory (os error 2)",
            )),
            "ffmpeg" if args.iter().any(|a| a == "-map_metadata") => Ok(self.transcode(&args)),
            "ffmpeg" => Ok(self.probe(&args)),
            "mp3gain" => {
                let target = args.last().cloned().unwrap_or_default();
                if self.failing_gains.contains(&file_name(&target)) {
                    Ok(failure(1, "Can't open file for reading"))
                } else {
                    Ok(success(""))
                }
            }
            other => Err(PipelineError::tool(other, "unknown tool in test")),
        }
    }
}

/// `secs` as ffmpeg prints it: `HH:MM:SS.ss`
pub fn format_ffmpeg_duration(secs: f64) -> String {
    let centis = (secs * 100.0).round() as u64;
    let hours = centis / 360_000;
    let minutes = (centis / 6_000) % 60;
    let seconds = (centis % 6_000) as f64 / 100.0;
    format!("{:02}:{:02}:{:05.2}", hours, minutes, seconds)
}

/// Settings rooted in a test directory
pub fn test_settings(root: &Path) -> PipelineSettings {
    PipelineSettings {
        temp_dir: root.join("work"),
        output_dir: None,
        ..PipelineSettings::default()
    }
}

/// An in-memory ZIP with the given (path, contents) entries
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        writer
            .start_file(*name, FileOptions::default())
            .expect("start zip entry");
        writer.write_all(contents.as_bytes()).expect("write zip entry");
    }
    writer.finish().expect("finish zip").into_inner()
}

fn arg_after(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn file_name(path: &str) -> String {
    PathBuf::from(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn success(stderr: &str) -> ToolOutput {
    ToolOutput {
        success: true,
        code: Some(0),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

fn failure(code: i32, stderr: &str) -> ToolOutput {
    ToolOutput {
        success: false,
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ffmpeg_duration() {
        assert_eq!(format_ffmpeg_duration(100.5), "00:01:40.50");
        assert_eq!(format_ffmpeg_duration(3723.25), "01:02:03.25");
        assert_eq!(format_ffmpeg_duration(0.0), "00:00:00.00");
    }

    #[test]
    fn test_zip_bytes_is_readable() {
        let bytes = zip_bytes(&[("a.flac", "x")]);
        let archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 1);
    }

    #[test]
    fn test_fake_records_calls() {
        let tools = FakeTools::new();
        let cmd = ToolCommand::new("mp3gain").arg("-r").arg("-k").arg("/out/a.mp3");
        assert!(tools.run(&cmd).unwrap().success);
        assert_eq!(tools.calls_for("mp3gain").len(), 1);
        assert_eq!(tools.transcode_calls(), 0);
    }
}
