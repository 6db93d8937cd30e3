use std::fs::File;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use syncframe_frame::{FrameEvent, FrameReader, ReassemblerStats};

use crate::cmd::{is_stdio, DecodeArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_summary, EventPrinter, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.limits.frame_config(args.chunk_size)?;
    let source = open_source(&args)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut reader = FrameReader::with_config(source, config);
    let mut printer = EventPrinter::new(format);
    let outcome = pump(&mut reader, &mut printer, &args, &running);
    printer.finish();

    let stats = *reader.stats();
    log_summary(&stats);
    let integrity_errors = outcome?;

    if args.summary {
        print_summary(&stats, format);
    }

    if args.strict && integrity_errors > 0 {
        return Err(CliError::new(
            DATA_INVALID,
            format!("{integrity_errors} corrupted or malformed frame(s) in stream"),
        ));
    }

    Ok(SUCCESS)
}

/// Drive the reader until the source ends, `--count` is reached, or Ctrl-C.
/// Returns the number of integrity errors seen.
fn pump<R: Read, W: Write>(
    reader: &mut FrameReader<R>,
    printer: &mut EventPrinter<W>,
    args: &DecodeArgs,
    running: &AtomicBool,
) -> CliResult<u64> {
    let mut frames = 0usize;
    let mut integrity_errors = 0u64;

    while running.load(Ordering::SeqCst) {
        let event = match reader.next_event() {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => return Err(frame_error("decode failed", err)),
        };

        match &event {
            FrameEvent::ChecksumMismatch {
                expected, received, ..
            } => {
                integrity_errors += 1;
                tracing::warn!(
                    computed = format_args!("{expected:#06x}"),
                    received = format_args!("{received:#06x}"),
                    "checksum mismatch"
                );
            }
            FrameEvent::Malformed { reason, .. } => {
                integrity_errors += 1;
                tracing::warn!(%reason, "malformed frame");
            }
            FrameEvent::Incomplete(raw) => {
                tracing::info!(size = raw.len(), "stream ended inside a frame");
            }
            FrameEvent::Decoded(_) | FrameEvent::NoiseDiscarded(_) => {}
        }

        let is_frame = event.frame().is_some();
        printer.print(&event);

        if is_frame {
            frames += 1;
            if args.count.is_some_and(|count| frames >= count) {
                break;
            }
        }
    }

    Ok(integrity_errors)
}

fn open_source(args: &DecodeArgs) -> CliResult<Box<dyn Read>> {
    let path = match args.input.as_ref() {
        Some(path) if !is_stdio(Some(path)) => path,
        _ => {
            if args.socket {
                return Err(CliError::new(USAGE, "--socket needs a socket path"));
            }
            return Ok(Box::new(std::io::stdin().lock()));
        }
    };

    if args.socket {
        return open_socket(path);
    }

    let file = File::open(path)
        .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?;
    tracing::debug!(path = %path.display(), "reading from file");
    Ok(Box::new(file))
}

#[cfg(unix)]
fn open_socket(path: &std::path::Path) -> CliResult<Box<dyn Read>> {
    let stream = std::os::unix::net::UnixStream::connect(path)
        .map_err(|err| io_error(&format!("failed connecting to {}", path.display()), err))?;
    tracing::debug!(path = %path.display(), "connected to unix domain socket");
    Ok(Box::new(stream))
}

#[cfg(not(unix))]
fn open_socket(_path: &std::path::Path) -> CliResult<Box<dyn Read>> {
    Err(CliError::new(
        USAGE,
        "--socket is only supported on unix platforms",
    ))
}

fn log_summary(stats: &ReassemblerStats) {
    tracing::info!(
        bytes = stats.bytes_received,
        frames = stats.frames_decoded,
        checksum_mismatches = stats.checksum_mismatches,
        malformed = stats.malformed_frames,
        noise_bytes = stats.noise_bytes,
        incomplete = stats.incomplete_frames,
        "stream finished"
    );
}

/// First Ctrl-C stops after the current read; a second one exits at once.
fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        if !running.swap(false, Ordering::SeqCst) {
            std::process::exit(130);
        }
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
