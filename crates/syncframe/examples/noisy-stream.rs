//! Feeds a random noisy stream through a reassembler in small chunks.
//!
//! Run with:
//!   cargo run --example noisy-stream

use syncframe::fixture::{generate, StreamSpec};
use syncframe::frame::{FrameEvent, Reassembler};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = generate(&StreamSpec {
        frames: 8,
        corrupt: 0.25,
        seed: Some(7),
        ..StreamSpec::default()
    });
    eprintln!(
        "generated {} bytes, {} frames ({} corrupted)",
        fixture.stream.len(),
        fixture.payloads.len(),
        fixture.corrupted.len()
    );

    let mut reassembler = Reassembler::new();
    let mut print = |event: FrameEvent| match event {
        FrameEvent::Decoded(frame) => println!("frame    {:04x?}", frame.payload()),
        FrameEvent::ChecksumMismatch {
            expected, received, ..
        } => println!("crc      computed={expected:#06x} received={received:#06x}"),
        FrameEvent::Malformed { reason, .. } => println!("bad      {reason}"),
        FrameEvent::NoiseDiscarded(raw) => println!("noise    {} byte(s)", raw.len()),
        FrameEvent::Incomplete(raw) => println!("partial  {} byte(s)", raw.len()),
    };

    // Serial reads rarely line up with frame boundaries.
    for chunk in fixture.stream.chunks(5) {
        reassembler.feed_with(chunk, &mut print)?;
    }
    for event in reassembler.finish() {
        print(event);
    }

    let stats = reassembler.stats();
    eprintln!(
        "decoded={} crc_errors={} malformed={} noise_bytes={}",
        stats.frames_decoded, stats.checksum_mismatches, stats.malformed_frames, stats.noise_bytes
    );
    Ok(())
}
