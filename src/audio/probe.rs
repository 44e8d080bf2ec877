//! Duration probing for source files
//!
//! The default probe runs `ffmpeg -i <src> -f null -` and reads the
//! `Duration: HH:MM:SS.ss` line from its diagnostic output. The native probe
//! reads the container with symphonia instead and needs no external tool.

use regex::Regex;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::conversion::{ToolCommand, ToolRunner};
use crate::error::{PipelineError, Result};

static FFMPEG_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Duration: (\d+):(\d+):(\d+(?:\.\d+)?)").expect("ffmpeg duration pattern is valid")
});

/// Anything that can report the playback length of a file in seconds
pub trait DurationProbe {
    fn probe_duration(&self, path: &Path) -> Result<f64>;
}

/// Parse ffmpeg's `Duration: H:M:S.ss` field into seconds
pub fn parse_ffmpeg_duration(diagnostics: &str) -> Option<f64> {
    let caps = FFMPEG_DURATION.captures(diagnostics)?;
    let hours: f64 = caps[1].parse().ok()?;
    let minutes: f64 = caps[2].parse().ok()?;
    let seconds: f64 = caps[3].parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Probe via an ffmpeg null-output run
pub struct FfmpegProbe<'a> {
    runner: &'a dyn ToolRunner,
    ffmpeg_path: PathBuf,
}

impl<'a> FfmpegProbe<'a> {
    pub fn new(runner: &'a dyn ToolRunner, ffmpeg_path: &Path) -> Self {
        Self {
            runner,
            ffmpeg_path: ffmpeg_path.to_path_buf(),
        }
    }
}

impl DurationProbe for FfmpegProbe<'_> {
    fn probe_duration(&self, path: &Path) -> Result<f64> {
        let command = ToolCommand::new(&self.ffmpeg_path)
            .arg("-i")
            .arg(path)
            .arg("-f")
            .arg("null")
            .arg("-");

        // Exit status is irrelevant here, only the diagnostic stream is read
        let output = self.runner.run(&command)?;
        let duration = parse_ffmpeg_duration(&output.stderr)
            .ok_or_else(|| PipelineError::MissingDuration(path.display().to_string()))?;

        log::debug!("Probed {:?}: {:.2}s", path.file_name().unwrap_or_default(), duration);
        Ok(duration)
    }
}

/// Probe by reading the container in-process
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeProbe;

impl DurationProbe for NativeProbe {
    fn probe_duration(&self, path: &Path) -> Result<f64> {
        let file = File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension() {
            hint.with_extension(&ext.to_string_lossy());
        }

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| {
                PipelineError::MissingDuration(format!("{}: {}", path.display(), e))
            })?;

        let track = probed.format.default_track().ok_or_else(|| {
            PipelineError::MissingDuration(format!("{}: no default track", path.display()))
        })?;

        let params = &track.codec_params;
        match (params.n_frames, params.sample_rate) {
            (Some(frames), Some(rate)) if rate > 0 => {
                let duration = frames as f64 / rate as f64;
                log::debug!("Read {:?}: {:.2}s", path.file_name().unwrap_or_default(), duration);
                Ok(duration)
            }
            _ => Err(PipelineError::MissingDuration(format!(
                "{}: container does not report length",
                path.display()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::FakeTools;
    use tempfile::TempDir;

    const FFMPEG_STDERR: &str = "\
Input #0, flac, from 'song.flac':
  Metadata:
    ARTIST          : Someone
  Duration: 00:03:25.47, start: 0.000000, bitrate: 912 kb/s
  Stream #0:0: Audio: flac, 44100 Hz, stereo, s16
";

    #[test]
    fn test_parse_ffmpeg_duration() {
        let secs = parse_ffmpeg_duration(FFMPEG_STDERR).unwrap();
        assert!((secs - 205.47).abs() < 1e-9);
    }

    #[test]
    fn test_parse_hours() {
        let secs = parse_ffmpeg_duration("Duration: 01:02:03.50,").unwrap();
        assert!((secs - 3723.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_unavailable_duration() {
        assert_eq!(parse_ffmpeg_duration("Duration: N/A, bitrate: N/A"), None);
        assert_eq!(parse_ffmpeg_duration(""), None);
    }

    #[test]
    fn test_ffmpeg_probe_builds_null_output_command() {
        let tools = FakeTools::new().with_probe_duration(100.5);
        let probe = FfmpegProbe::new(&tools, Path::new("ffmpeg"));

        let secs = probe.probe_duration(Path::new("/in/song.flac")).unwrap();
        assert!((secs - 100.5).abs() < 0.01);

        let calls = tools.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args_lossy(),
            vec!["-i", "/in/song.flac", "-f", "null", "-"]
        );
    }

    #[test]
    fn test_ffmpeg_probe_missing_duration() {
        let tools = FakeTools::new();
        let probe = FfmpegProbe::new(&tools, Path::new("ffmpeg"));

        let err = probe.probe_duration(Path::new("/in/song.flac")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDuration(_)));
    }

    #[test]
    fn test_ffmpeg_probe_unavailable_tool() {
        let tools = FakeTools::new().without_ffmpeg();
        let probe = FfmpegProbe::new(&tools, Path::new("ffmpeg"));

        let err = probe.probe_duration(Path::new("/in/song.flac")).unwrap_err();
        assert!(matches!(err, PipelineError::ToolInvocation { .. }));
    }

    #[test]
    fn test_native_probe_rejects_garbage() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("fake.flac");
        std::fs::write(&path, b"definitely not audio").unwrap();

        let err = NativeProbe.probe_duration(&path).unwrap_err();
        assert!(matches!(err, PipelineError::MissingDuration(_)));
    }

    #[test]
    fn test_native_probe_missing_file() {
        let err = NativeProbe
            .probe_duration(Path::new("/nonexistent/song.flac"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
