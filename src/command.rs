// WebMap-Bridge: Command Channel
// Host-to-map command encoding and fire-and-forget dispatch

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::codec::fmt_float;

/// One host-to-map command. Each variant encodes to a call into the map API
/// registered with the embedded evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    SetCenter { lat: f64, lng: f64 },
    ShowCenter(bool),
    SetZoom(i64),
    CreateMarker {
        lat: f64,
        lng: f64,
        title: String,
        content: String,
    },
    DeleteMarker { key: String },
    DeleteAllMarkers,
    ShowMarkers(bool),
    ShowMarker { key: String, visible: bool },
    GetAllMarkers,
    GetCenter,
    AddMarkersFromList { batch: String },
    Geolocate { address: String },
}

impl MapCommand {
    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            MapCommand::SetCenter { .. } => "set_center",
            MapCommand::ShowCenter(_) => "show_center",
            MapCommand::SetZoom(_) => "set_zoom",
            MapCommand::CreateMarker { .. } => "create_marker",
            MapCommand::DeleteMarker { .. } => "delete_marker",
            MapCommand::DeleteAllMarkers => "delete_all_markers",
            MapCommand::ShowMarkers(_) => "show_markers",
            MapCommand::ShowMarker { .. } => "show_marker",
            MapCommand::GetAllMarkers => "get_all_markers",
            MapCommand::GetCenter => "get_center",
            MapCommand::AddMarkersFromList { .. } => "add_markers_from_list",
            MapCommand::Geolocate { .. } => "geolocate",
        }
    }

    /// Encode the command as the textual call the embedded evaluator runs.
    /// Floats always carry a decimal point, strings are quoted and escaped;
    /// the evaluator reconstructs every argument exactly.
    pub fn encode(&self) -> String {
        match self {
            MapCommand::SetCenter { lat, lng } => {
                format!("set_center({}, {})", fmt_float(*lat), fmt_float(*lng))
            }
            MapCommand::ShowCenter(show) => format!("show_center({})", show),
            MapCommand::SetZoom(zoom) => format!("set_zoom({})", zoom),
            MapCommand::CreateMarker {
                lat,
                lng,
                title,
                content,
            } => format!(
                "create_marker({}, {}, \"{}\", \"{}\")",
                fmt_float(*lat),
                fmt_float(*lng),
                escape_str(title),
                escape_str(content)
            ),
            MapCommand::DeleteMarker { key } => {
                format!("delete_marker(\"{}\")", escape_str(key))
            }
            MapCommand::DeleteAllMarkers => "delete_all_markers()".to_string(),
            MapCommand::ShowMarkers(show) => format!("show_markers({})", show),
            MapCommand::ShowMarker { key, visible } => {
                format!("show_marker(\"{}\", {})", escape_str(key), visible)
            }
            MapCommand::GetAllMarkers => "get_all_markers()".to_string(),
            MapCommand::GetCenter => "get_center()".to_string(),
            MapCommand::AddMarkersFromList { batch } => {
                format!("add_markers_from_list(\"{}\")", escape_str(batch))
            }
            MapCommand::Geolocate { address } => {
                format!("geolocate(\"{}\")", escape_str(address))
            }
        }
    }
}

/// Escape a string for embedding in a double-quoted evaluator literal.
/// Quotes, backslashes and control characters are escaped so the parsed
/// literal equals the original string.
pub(crate) fn escape_str(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 2);
    for ch in text.chars() {
        match ch {
            '"' => escaped.push_str("\\\""),
            '\\' => escaped.push_str("\\\\"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            ch if (ch as u32) < 0x20 || ch == '\u{7f}' => {
                escaped.push_str(&format!("\\u{:04x}", ch as u32));
            }
            ch => escaped.push(ch),
        }
    }
    escaped
}

/// One-way transport into the embedded context. Delivery is at-most-once:
/// no acknowledgement, no retry, and commands sent before the map signals
/// readiness are dropped, not queued.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    command_tx: mpsc::UnboundedSender<String>,
    ready: Arc<AtomicBool>,
}

impl CommandChannel {
    pub fn new(command_tx: mpsc::UnboundedSender<String>, ready: Arc<AtomicBool>) -> Self {
        CommandChannel { command_tx, ready }
    }

    /// Encode and dispatch. Never blocks and never reports back to the
    /// caller; callers needing a guaranteed effect must wait for the ready
    /// notification before sending.
    pub fn send(&self, command: &MapCommand) {
        if !self.ready.load(Ordering::SeqCst) {
            log::debug!("dropping {} command: map not ready", command.name());
            return;
        }
        let encoded = command.encode();
        log::debug!("dispatching command: {}", encoded);
        if self.command_tx.send(encoded).is_err() {
            log::warn!("command channel closed, {} not delivered", command.name());
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
