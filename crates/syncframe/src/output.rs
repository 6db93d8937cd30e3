use std::io::{IsTerminal, Stdout, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use syncframe_frame::{FrameEvent, ReassemblerStats};

const EVENT_SCHEMA: &str = "https://schemas.3leaps.dev/syncframe/cli/v1/frame-event.schema.json";
const SUMMARY_SCHEMA: &str = "https://schemas.3leaps.dev/syncframe/cli/v1/stream-summary.schema.json";

/// Hex dumps in table/pretty output are cut after this many bytes.
const PREVIEW_BYTES: usize = 24;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    schema_id: &'a str,
    seq: u64,
    event: &'a str,
    size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a [u16]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    received: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

impl<'a> EventOutput<'a> {
    fn from_event(seq: u64, event: &'a FrameEvent) -> Self {
        let mut out = Self {
            schema_id: EVENT_SCHEMA,
            seq,
            event: event.kind(),
            size: event_size(event),
            items: None,
            payload: None,
            checksum: None,
            expected: None,
            received: None,
            reason: None,
            raw: event.raw().map(hex::encode),
        };
        match event {
            FrameEvent::Decoded(frame) => {
                out.items = Some(frame.length());
                out.payload = Some(frame.payload());
                out.checksum = Some(hex_u16(frame.checksum()));
            }
            FrameEvent::ChecksumMismatch {
                expected, received, ..
            } => {
                out.expected = Some(hex_u16(*expected));
                out.received = Some(hex_u16(*received));
            }
            FrameEvent::Malformed { reason, .. } => out.reason = Some(reason.to_string()),
            FrameEvent::NoiseDiscarded(_) | FrameEvent::Incomplete(_) => {}
        }
        out
    }
}

#[derive(Serialize)]
struct SummaryOutput<'a> {
    schema_id: &'a str,
    bytes_received: u64,
    frames_decoded: u64,
    checksum_mismatches: u64,
    malformed_frames: u64,
    noise_bytes: u64,
    incomplete_frames: u64,
    overflows: u64,
}

impl From<&ReassemblerStats> for SummaryOutput<'static> {
    fn from(stats: &ReassemblerStats) -> Self {
        Self {
            schema_id: SUMMARY_SCHEMA,
            bytes_received: stats.bytes_received,
            frames_decoded: stats.frames_decoded,
            checksum_mismatches: stats.checksum_mismatches,
            malformed_frames: stats.malformed_frames,
            noise_bytes: stats.noise_bytes,
            incomplete_frames: stats.incomplete_frames,
            overflows: stats.overflows,
        }
    }
}

/// Prints frame events in the selected format, one record per event.
///
/// Every record is written as soon as its event arrives; nothing is held back
/// for later. Table output renders one row per event and puts the header on
/// the first one only.
pub struct EventPrinter<W: Write = Stdout> {
    format: OutputFormat,
    seq: u64,
    out: W,
}

impl EventPrinter {
    pub fn new(format: OutputFormat) -> Self {
        Self::with_writer(format, std::io::stdout())
    }
}

impl<W: Write> EventPrinter<W> {
    pub fn with_writer(format: OutputFormat, out: W) -> Self {
        Self {
            format,
            seq: 0,
            out,
        }
    }

    pub fn print(&mut self, event: &FrameEvent) {
        self.seq += 1;
        // Output errors (e.g. a closed pipe) are not worth aborting a decode for.
        let _ = match self.format {
            OutputFormat::Json => {
                let out = EventOutput::from_event(self.seq, event);
                writeln!(
                    self.out,
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                )
            }
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic);
                if self.seq == 1 {
                    table.set_header(vec!["#", "EVENT", "SIZE", "DETAIL"]);
                }
                table.add_row(vec![
                    self.seq.to_string(),
                    event.kind().to_string(),
                    event_size(event).to_string(),
                    event_detail(event),
                ]);
                writeln!(self.out, "{table}")
            }
            OutputFormat::Pretty => writeln!(
                self.out,
                "#{} {} size={} {}",
                self.seq,
                event.kind(),
                event_size(event),
                event_detail(event)
            ),
            OutputFormat::Raw => match event {
                // Raw output re-emits clean frames only: a filtered stream.
                FrameEvent::Decoded(frame) => self.out.write_all(&frame.to_bytes()),
                _ => Ok(()),
            },
        };
        let _ = self.out.flush();
    }

    /// Number of events printed so far.
    pub fn printed(&self) -> u64 {
        self.seq
    }

    pub fn finish(mut self) -> W {
        let _ = self.out.flush();
        self.out
    }
}

pub fn print_summary(stats: &ReassemblerStats, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = SummaryOutput::from(stats);
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"])
                .add_row(vec!["bytes received".to_string(), stats.bytes_received.to_string()])
                .add_row(vec!["frames decoded".to_string(), stats.frames_decoded.to_string()])
                .add_row(vec![
                    "checksum mismatches".to_string(),
                    stats.checksum_mismatches.to_string(),
                ])
                .add_row(vec!["malformed frames".to_string(), stats.malformed_frames.to_string()])
                .add_row(vec!["noise bytes".to_string(), stats.noise_bytes.to_string()])
                .add_row(vec![
                    "incomplete frames".to_string(),
                    stats.incomplete_frames.to_string(),
                ])
                .add_row(vec!["buffer overflows".to_string(), stats.overflows.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{}",
                summary_line(stats)
            );
        }
        OutputFormat::Raw => {}
    }
}

fn summary_line(stats: &ReassemblerStats) -> String {
    format!(
        "bytes={} frames={} crc_errors={} malformed={} noise_bytes={} incomplete={} overflows={}",
        stats.bytes_received,
        stats.frames_decoded,
        stats.checksum_mismatches,
        stats.malformed_frames,
        stats.noise_bytes,
        stats.incomplete_frames,
        stats.overflows
    )
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn hex_u16(value: u16) -> String {
    format!("{value:#06x}")
}

fn event_size(event: &FrameEvent) -> usize {
    match event {
        FrameEvent::Decoded(frame) => frame.wire_size(),
        other => other.raw().map_or(0, |raw| raw.len()),
    }
}

fn event_detail(event: &FrameEvent) -> String {
    match event {
        FrameEvent::Decoded(frame) => format!("payload={:?}", frame.payload()),
        FrameEvent::ChecksumMismatch {
            expected,
            received,
            raw,
        } => format!(
            "computed={} received={} raw={}",
            hex_u16(*expected),
            hex_u16(*received),
            hex_preview(raw)
        ),
        FrameEvent::Malformed { reason, raw } => {
            format!("{reason} raw={}", hex_preview(raw))
        }
        FrameEvent::NoiseDiscarded(raw) | FrameEvent::Incomplete(raw) => hex_preview(raw),
    }
}

fn hex_preview(raw: &[u8]) -> String {
    if raw.len() <= PREVIEW_BYTES {
        return hex::encode(raw);
    }
    format!("{}…(+{})", hex::encode(&raw[..PREVIEW_BYTES]), raw.len() - PREVIEW_BYTES)
}

#[cfg(test)]
mod tests {
    use syncframe_frame::{decode, encode, MalformedReason};

    use super::*;

    #[test]
    fn json_record_for_decoded_frame() {
        let event: FrameEvent = decode(&encode(&[1, 2, 3]).unwrap()).into();
        let json = serde_json::to_value(EventOutput::from_event(1, &event)).unwrap();
        assert_eq!(json["event"], "frame");
        assert_eq!(json["items"], 3);
        assert_eq!(json["payload"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["size"], 12);
        assert!(json.get("raw").is_none());
    }

    #[test]
    fn json_record_for_mismatch_has_hex() {
        let mut wire = encode(&[9]).unwrap().to_vec();
        wire[4] ^= 0x01;
        let event: FrameEvent = decode(&wire).into();
        let json = serde_json::to_value(EventOutput::from_event(2, &event)).unwrap();
        assert_eq!(json["event"], "checksum_mismatch");
        assert_eq!(json["raw"], hex::encode(&wire));
        assert!(json["expected"].as_str().unwrap().starts_with("0x"));
    }

    #[test]
    fn detail_for_malformed_includes_reason() {
        let event: FrameEvent = decode(&[0x00, 0x01, 0x00, 0x00, 0x00, 0x00]).into();
        assert!(matches!(
            event,
            FrameEvent::Malformed {
                reason: MalformedReason::BadMarker { .. },
                ..
            }
        ));
        assert!(event_detail(&event).starts_with("bad marker 0x0001"));
    }

    #[test]
    fn table_rows_are_written_before_finish() {
        let mut printer = EventPrinter::with_writer(OutputFormat::Table, Vec::new());
        printer.print(&decode(&encode(&[1, 2]).unwrap()).into());
        let first = String::from_utf8(printer.out.clone()).unwrap();
        assert!(first.contains("EVENT"));
        assert!(first.contains("payload=[1, 2]"));

        printer.print(&FrameEvent::NoiseDiscarded(bytes::Bytes::from_static(&[0x0A])));
        let out = String::from_utf8(printer.finish()).unwrap();
        let second = &out[first.len()..];
        assert!(second.contains("noise"));
        assert!(!second.contains("EVENT"));
    }

    #[test]
    fn pretty_summary_includes_overflows() {
        let stats = ReassemblerStats {
            frames_decoded: 3,
            overflows: 2,
            ..ReassemblerStats::default()
        };
        let line = summary_line(&stats);
        assert!(line.contains("frames=3"));
        assert!(line.ends_with("overflows=2"));
    }

    #[test]
    fn long_raw_is_truncated_in_preview() {
        let raw = vec![0xAA; 40];
        let preview = hex_preview(&raw);
        assert!(preview.ends_with("(+16)"));
    }
}
