use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use cmlink_control::{ContainerConfig, ContainerItem, ContainerState};
use cmlink_frame::Frame;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
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
struct FrameOutput {
    payload_size: usize,
    wire_size: usize,
    payload: String,
    timestamp: String,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                payload_size: frame.len(),
                wire_size: frame.wire_size(),
                payload: payload_preview(frame.as_ref()),
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = new_table(vec!["SIZE", "PAYLOAD"]);
            table.add_row(vec![
                frame.len().to_string(),
                payload_preview(frame.as_ref()),
            ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "size={} payload={}",
                frame.len(),
                payload_preview(frame.as_ref())
            );
        }
        OutputFormat::Raw => print_raw(frame.as_ref()),
    }
}

pub fn print_containers(items: &[ContainerItem], format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(&items),
        OutputFormat::Table => {
            let mut table = new_table(vec!["NAME", "UUID", "RUNNING"]);
            for item in items {
                table.add_row(vec![
                    item.name.clone(),
                    item.uuid.clone(),
                    yes_no(item.running).to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for item in items {
                let marker = if item.running { "*" } else { " " };
                println!("{marker} {} ({})", item.name, item.uuid);
            }
        }
    }
}

#[derive(Serialize)]
struct StateOutput<'a> {
    uuid: &'a str,
    state: ContainerState,
    running: bool,
}

pub fn print_state(uuid: &str, state: ContainerState, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&StateOutput {
            uuid,
            state,
            running: state.is_running(),
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["UUID", "STATE"]);
            table.add_row(vec![uuid.to_string(), state.to_string()]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{uuid}: {state}"),
        OutputFormat::Raw => println!("{state}"),
    }
}

pub fn print_config(config: &ContainerConfig, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(config),
        OutputFormat::Table => {
            let mut table = new_table(vec!["FIELD", "VALUE"]);
            table.add_row(vec!["name".to_string(), config.name.clone()]);
            if let Some(guest_os) = &config.guest_os {
                table.add_row(vec!["guest_os".to_string(), guest_os.clone()]);
            }
            if let Some(color) = config.color {
                table.add_row(vec!["color".to_string(), format!("#{color:06x}")]);
            }
            for (key, value) in &config.extra {
                table.add_row(vec![key.clone(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("name: {}", config.name);
            if let Some(guest_os) = &config.guest_os {
                println!("guest_os: {guest_os}");
            }
            if let Some(color) = config.color {
                println!("color: #{color:06x}");
            }
            for (key, value) in &config.extra {
                println!("{key}: {value}");
            }
        }
    }
}

#[derive(Serialize)]
struct AckOutput<'a> {
    action: &'a str,
    uuid: &'a str,
    ok: bool,
}

/// Confirmation for commands that return no data.
pub fn print_ack(action: &str, uuid: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&AckOutput {
            action,
            uuid,
            ok: true,
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!("{action}: {uuid}"),
        OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
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

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

pub fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("<binary {} bytes>", payload.len()),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_keeps_text_and_summarizes_binary() {
        assert_eq!(payload_preview(b"hello"), "hello");
        assert_eq!(payload_preview(&[0xff, 0xfe, 0x00]), "<binary 3 bytes>");
    }
}
