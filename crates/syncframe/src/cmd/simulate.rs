use std::io::Cursor;

use syncframe::fixture::generate;
use syncframe_frame::FrameReader;

use crate::cmd::SimulateArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_summary, EventPrinter, OutputFormat};

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.limits.frame_config(args.chunk_size)?;
    let fixture = generate(&args.stream.spec());
    tracing::debug!(
        bytes = fixture.stream.len(),
        chunk_size = args.chunk_size,
        "simulating stream"
    );

    let mut reader = FrameReader::with_config(Cursor::new(fixture.stream.clone()), config);
    let mut printer = EventPrinter::new(format);
    let mut failure = None;
    for event in reader.by_ref() {
        match event {
            Ok(event) => printer.print(&event),
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }
    printer.finish();

    if let Some(err) = failure {
        return Err(frame_error("simulation failed", err));
    }

    let stats = *reader.stats();
    print_summary(&stats, format);

    let expected = fixture.payloads.len() - fixture.corrupted.len();
    let decoded = usize::try_from(stats.frames_decoded).unwrap_or(usize::MAX);
    if decoded == expected {
        tracing::info!(expected, decoded, "all intact frames recovered");
    } else {
        // Random noise may contain false markers that swallow a real frame.
        tracing::warn!(expected, decoded, "decoded frame count differs from generated");
    }

    Ok(SUCCESS)
}
