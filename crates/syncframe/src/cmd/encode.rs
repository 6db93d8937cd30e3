use serde::Serialize;
use syncframe_frame::encode;

use crate::cmd::EncodeArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{hex_u16, print_raw, OutputFormat};

const ENCODED_SCHEMA: &str = "https://schemas.3leaps.dev/syncframe/cli/v1/encoded-frame.schema.json";

#[derive(Serialize)]
struct EncodedOutput<'a> {
    schema_id: &'a str,
    items: &'a [u16],
    checksum: String,
    size: usize,
    hex: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let wire = encode(&args.items).map_err(|err| frame_error("encode failed", err))?;
    let checksum = u16::from_be_bytes([wire[wire.len() - 2], wire[wire.len() - 1]]);

    match format {
        OutputFormat::Raw => print_raw(&wire),
        OutputFormat::Json => {
            let out = EncodedOutput {
                schema_id: ENCODED_SCHEMA,
                items: &args.items,
                checksum: hex_u16(checksum),
                size: wire.len(),
                hex: hex::encode(&wire),
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", spaced_hex(&wire)),
    }

    tracing::debug!(items = args.items.len(), checksum = %hex_u16(checksum), "encoded frame");
    Ok(SUCCESS)
}

fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}
