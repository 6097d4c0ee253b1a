//! `guardstream stream`: one sanitization session over stdin or a file.
//!
//! The main channel is copied to stdout (or `--output`) chunk by chunk as flushes
//! complete; audit lines go to stderr (or `--audit-file`) at the same time.

use anyhow::{Context, Result};
use is_terminal::IsTerminal;
use log::{debug, info};
use std::io::Write;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use guardstream_core::{ChannelReader, Pipeline, ReadMode, ReaderGenerator, SessionHandle, SessionReport};

use crate::cli::StreamCommand;
use crate::commands::{apply_stream_overrides, load_config};
use crate::ui::output_format;
use crate::ui::theme::ThemeMap;

/// Runs the session and returns its report. Setup failures are returned as errors;
/// a session that started but failed is reported through [`SessionReport::outcome`].
pub async fn run_stream(cmd: &StreamCommand, theme: &ThemeMap) -> Result<SessionReport> {
    let mut config = load_config(&cmd.detector)?;
    apply_stream_overrides(&mut config, cmd);
    let pipeline = Pipeline::from_config(&config).context("Failed to set up the sanitization pipeline")?;

    let mode = if cmd.line_buffered {
        ReadMode::Lines
    } else {
        ReadMode::Chunked(cmd.chunk_size)
    };

    let input = match &cmd.input {
        Some(path) => Some(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input file {}", path.display()))?,
        ),
        None => None,
    };
    // Every file is opened before the session task is spawned.
    let audit_file = open_audit_output(cmd.audit_file.as_deref()).await?;
    let main_out = open_main_output(cmd.output.as_deref()).await?;

    let handle: SessionHandle = match input {
        Some(file) => pipeline.start(ReaderGenerator::new(file, mode).strip_ansi(cmd.strip_ansi))?,
        None => pipeline.start(ReaderGenerator::new(tokio::io::stdin(), mode).strip_ansi(cmd.strip_ansi))?,
    };
    info!("Streaming session {} with detector '{}'.", handle.session_id, pipeline.detector_name());

    let (main, audit, task) = handle.into_parts();

    let (main_result, audit_result, report) = tokio::join!(
        copy_main(main, main_out),
        copy_audit(audit, audit_file, theme),
        task
    );
    main_result.context("Failed to write sanitized output")?;
    audit_result.context("Failed to write audit lines")?;
    let report = report.context("Sanitization task did not complete")?;
    debug!("Session report: {:?}", report);
    Ok(report)
}

async fn open_main_output(path: Option<&Path>) -> Result<Box<dyn AsyncWrite + Unpin + Send>> {
    Ok(match path {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create output file {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    })
}

async fn copy_main(mut reader: ChannelReader, mut out: Box<dyn AsyncWrite + Unpin + Send>) -> Result<()> {
    while let Some(chunk) = reader.recv().await {
        out.write_all(chunk.as_bytes()).await?;
        out.flush().await?;
    }
    out.shutdown().await?;
    Ok(())
}

async fn open_audit_output(path: Option<&Path>) -> Result<Option<tokio::fs::File>> {
    match path {
        Some(path) => Ok(Some(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("Failed to create audit file {}", path.display()))?,
        )),
        None => Ok(None),
    }
}

async fn copy_audit(mut reader: ChannelReader, file: Option<tokio::fs::File>, theme: &ThemeMap) -> Result<()> {
    match file {
        Some(mut file) => {
            while let Some(line) = reader.recv().await {
                file.write_all(line.as_bytes()).await?;
            }
            file.flush().await?;
        }
        None => {
            let enable_colors = std::io::stderr().is_terminal();
            while let Some(line) = reader.recv().await {
                let mut stderr = std::io::stderr().lock();
                output_format::write_audit_line(&mut stderr, &line, theme, enable_colors)?;
                stderr.flush()?;
            }
        }
    }
    Ok(())
}
