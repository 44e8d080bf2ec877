//! flac-batch - command line front end
//!
//! Stands in for the upload form: the files named on the command line are
//! read and handed to the pipeline as uploads, and the status line is what
//! the user sees. Details go to the log file.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use flac_batch::audio::{DurationProbe, FfmpegProbe, NativeProbe};
use flac_batch::conversion::{verify_tool, SystemRunner};
use flac_batch::core::{BatchReport, PipelineSettings, ProbeBackend, Upload};
use flac_batch::pipeline::BatchPipeline;
use flac_batch::workspace::WorkspaceManager;
use flac_batch::{logging, Result};

#[derive(Debug, Parser)]
#[command(name = "flac-batch", version, about = "FLAC to MP3 converter with ReplayGain")]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory uploads are staged in
    #[arg(long, global = true)]
    temp_dir: Option<PathBuf>,

    /// Directory converted files and the archive are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Show debug output in the terminal
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Convert FLAC files and ZIP bundles (with an optional .cue) to MP3
    Process {
        /// .flac, .zip and .cue files
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Copy processed_files.zip here when done
        #[arg(long)]
        download: Option<PathBuf>,

        /// Write a JSON report of the batch
        #[arg(long)]
        report: Option<PathBuf>,

        /// How source durations are measured
        #[arg(long, value_enum)]
        probe: Option<ProbeBackend>,

        /// Timeout for each external tool run, in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Remove staged uploads, converted files and leftover batches
    Clear,
    /// Write the effective settings to a file
    SaveConfig {
        /// Defaults to the standard settings location
        path: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("Error: {}", e);
            print_log_location();
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut settings = PipelineSettings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.temp_dir {
        settings.temp_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        settings.output_dir = Some(dir);
    }

    match cli.command {
        Command::Process {
            files,
            download,
            report,
            probe,
            timeout,
        } => {
            if let Some(backend) = probe {
                settings.probe = backend;
            }
            if let Some(secs) = timeout {
                settings.tool_timeout_secs = secs;
            }
            settings.validate()?;
            process(&settings, &files, download.as_deref(), report.as_deref())
        }
        Command::Clear => {
            let workspace = WorkspaceManager::new(&settings)?;
            let files = workspace.reset()?;
            let batches = workspace.cleanup_stale_batches()?;
            println!("Uploads cleared! ({} file(s), {} batch folder(s))", files, batches);
            Ok(ExitCode::SUCCESS)
        }
        Command::SaveConfig { path } => {
            let Some(path) = path.or_else(PipelineSettings::default_path) else {
                eprintln!("No settings location available, pass a path");
                return Ok(ExitCode::FAILURE);
            };
            settings.save(&path)?;
            println!("Settings written to {}", path.display());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn process(
    settings: &PipelineSettings,
    files: &[PathBuf],
    download: Option<&Path>,
    report_path: Option<&Path>,
) -> Result<ExitCode> {
    let runner = SystemRunner::new(settings.tool_timeout())?;
    verify_tool(&runner, &settings.ffmpeg_path, "-version")?;
    if let Err(e) = verify_tool(&runner, &settings.mp3gain_path, "-v") {
        log::warn!("mp3gain check failed, ReplayGain will likely fail: {}", e);
    }

    let mut uploads = Vec::with_capacity(files.len());
    for path in files {
        match Upload::from_path(path) {
            Ok(upload) => uploads.push(upload),
            Err(e) => {
                log::error!("Cannot read {}: {}", path.display(), e);
                eprintln!("Cannot read {}: {}", path.display(), e);
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    let workspace = WorkspaceManager::new(settings)?;
    workspace.reset()?;

    let ffmpeg_probe;
    let probe: &dyn DurationProbe = match settings.probe {
        ProbeBackend::Ffmpeg => {
            ffmpeg_probe = FfmpegProbe::new(&runner, &settings.ffmpeg_path);
            &ffmpeg_probe
        }
        ProbeBackend::Native => &NativeProbe,
    };

    let report = BatchPipeline::new(settings, &workspace, &runner, probe).run(&uploads);
    finish(&report, download, report_path)
}

fn finish(report: &BatchReport, download: Option<&Path>, report_path: Option<&Path>) -> Result<ExitCode> {
    if let Some(path) = report_path {
        report.save(path)?;
        log::info!("Report written to {}", path.display());
    }

    if !report.is_packaged() {
        eprintln!("{}", report.status);
        print_log_location();
        return Ok(ExitCode::FAILURE);
    }

    println!("{}", report.status);
    if report.failed_count() > 0 {
        println!("Some files could not be processed.");
        print_log_location();
    }

    if let (Some(dest), Some(archive)) = (download, &report.archive) {
        std::fs::copy(archive, dest)?;
        println!("Saved {}", dest.display());
    } else if let Some(archive) = &report.archive {
        println!("Archive: {}", archive.display());
    }

    Ok(ExitCode::SUCCESS)
}

fn print_log_location() {
    if let Some(path) = logging::get_log_file_path() {
        eprintln!("Details in {}", path.display());
    }
}
