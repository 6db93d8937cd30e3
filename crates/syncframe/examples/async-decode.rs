//! Decodes a noisy stream from an async reader with `FramedRead`.
//!
//! Run with:
//!   cargo run --example async-decode --features async

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::FramedRead;

use syncframe::fixture::{generate, StreamSpec};
use syncframe::frame::{FrameEvent, SyncFrameCodec};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let fixture = generate(&StreamSpec {
        frames: 5,
        marker_free_noise: true,
        seed: Some(42),
        ..StreamSpec::default()
    });

    let (mut tx, rx) = tokio::io::duplex(16);
    let stream = fixture.stream.clone();
    let writer = tokio::spawn(async move {
        for chunk in stream.chunks(3) {
            tx.write_all(chunk).await?;
        }
        tx.shutdown().await
    });

    let mut frames = FramedRead::new(rx, SyncFrameCodec::new());
    let mut decoded = 0usize;
    while let Some(event) = frames.next().await {
        match event? {
            FrameEvent::Decoded(frame) => {
                decoded += 1;
                println!("frame {:04x?} crc={:#06x}", frame.payload(), frame.checksum());
            }
            other => println!("{}", other.kind()),
        }
    }
    writer.await??;

    eprintln!("decoded {decoded} of {} frames", fixture.payloads.len());
    Ok(())
}
