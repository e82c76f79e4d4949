use std::io::{IsTerminal, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use kstream_frame::{channel_name, Frame, SubProtocol};
use kstream_transport::Message;
use kstream_watch::EventType;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
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
struct FrameOutput<'a> {
    protocol: &'a str,
    channel: u8,
    channel_name: &'a str,
    payload_size: usize,
    payload: String,
}

pub fn print_frame(frame: &Frame, protocol: SubProtocol, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                protocol: protocol.name(),
                channel: frame.channel,
                channel_name: channel_name(frame.channel),
                payload_size: frame.payload.len(),
                payload: payload_preview(frame.payload.as_ref()),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["CHANNEL", "SIZE", "PAYLOAD"]);
            table.add_row(vec![
                format!("{} ({})", frame.channel, channel_name(frame.channel)),
                frame.payload.len().to_string(),
                payload_preview(frame.payload.as_ref()),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "channel={} ({}) size={} payload={}",
                frame.channel,
                channel_name(frame.channel),
                frame.payload.len(),
                payload_preview(frame.payload.as_ref())
            );
        }
        OutputFormat::Raw => print_raw(frame.payload.as_ref()),
    }
}

#[derive(Serialize)]
struct MessageOutput<'a> {
    protocol: &'a str,
    channel: u8,
    kind: &'a str,
    message: String,
}

/// Print an encoded transport message. Binary messages are shown base64-encoded
/// everywhere except raw output.
pub fn print_message(message: &Message, channel: u8, protocol: SubProtocol, format: OutputFormat) {
    let shown = match message {
        Message::Text(text) => text.clone(),
        Message::Binary(bytes) => STANDARD.encode(bytes),
    };
    match format {
        OutputFormat::Json => print_json(&MessageOutput {
            protocol: protocol.name(),
            channel,
            kind: message.kind(),
            message: shown,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["PROTOCOL", "CHANNEL", "KIND", "MESSAGE"]);
            table.add_row(vec![
                protocol.name().to_string(),
                channel.to_string(),
                message.kind().to_string(),
                shown,
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{} {}", message.kind(), shown),
        OutputFormat::Raw => match message {
            Message::Text(text) => println!("{text}"),
            Message::Binary(bytes) => print_raw(bytes),
        },
    }
}

#[derive(Serialize)]
struct EventOutput<'a> {
    #[serde(rename = "type")]
    event_type: EventType,
    object: &'a serde_json::Value,
}

pub fn print_event(event_type: EventType, object: &serde_json::Value, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EventOutput { event_type, object }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["TYPE", "KIND", "NAME"]);
            table.add_row(vec![
                event_type.to_string(),
                object_kind(object).to_string(),
                object_name(object).to_string(),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{:<9} {} {}",
                event_type,
                object_kind(object),
                object_name(object)
            );
        }
        OutputFormat::Raw => println!("{object}"),
    }
}

/// Collected result of a replayed exec session.
#[derive(Serialize)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub fn print_exec(out: &ExecOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = new_table(vec!["STREAM", "CONTENT"]);
            table
                .add_row(vec!["stdout".to_string(), out.stdout.clone()])
                .add_row(vec!["stderr".to_string(), out.stderr.clone()])
                .add_row(vec!["exit code".to_string(), out.exit_code.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            print!("{}", out.stdout);
            eprint!("{}", out.stderr);
            println!("exit code: {}", out.exit_code);
        }
        OutputFormat::Raw => {
            print_raw(out.stdout.as_bytes());
            let mut err = std::io::stderr();
            let _ = err.write_all(out.stderr.as_bytes());
            let _ = err.flush();
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn object_kind(object: &serde_json::Value) -> &str {
    object.get("kind").and_then(|v| v.as_str()).unwrap_or("-")
}

fn object_name(object: &serde_json::Value) -> &str {
    object
        .pointer("/metadata/name")
        .or_else(|| object.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or("-")
}
