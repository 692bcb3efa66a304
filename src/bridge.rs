// WebMap-Bridge: Bridge Façade
// Host-side map session: command surface, readiness state machine, event pump

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::codec::{self, canonical_key, parse_coordinate_pair, Coordinate, Marker};
use crate::command::{CommandChannel, MapCommand};
use crate::error::BridgeError;
use crate::notification::{HostCallbacks, MapNotification, NotificationChannel};
use crate::script;

/// Center used when no initial location is configured: Perlío, Spain.
pub const DEFAULT_CENTER: Coordinate = Coordinate::from_parts(43.473847, -8.169154);

/// Session configuration. Built with struct-literal update syntax:
///
/// ```
/// use webmap_bridge::WebMapConfig;
///
/// let config = WebMapConfig {
///     initial_center: "48.856614, 2.3522219".to_string(),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone)]
pub struct WebMapConfig {
    /// Initial center as `"lat,lng"` text. Empty means the default center.
    pub initial_center: String,
    /// Maps API key handed to the embedded context at load time.
    pub api_key: Option<String>,
    /// Center used when `initial_center` is empty or fails to parse.
    pub default_center: Coordinate,
}

impl Default for WebMapConfig {
    fn default() -> Self {
        WebMapConfig {
            initial_center: String::new(),
            api_key: None,
            default_center: DEFAULT_CENTER,
        }
    }
}

/// Host-visible events, produced only by the session's own event pump.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum MapEvent {
    /// The map finished loading; commands now take effect.
    MapIsReady,
    /// Reply to `get_all_markers`: every marker currently on the map.
    MarkersFromMapReceived(Vec<Marker>),
    /// Reply to `get_center`.
    CenterMarkerReported(Marker),
    /// A validation or map-reported failure, identified by numeric code.
    ErrorOccurred { context: String, code: i64 },
}

/// One interactive map session.
///
/// Construction starts the embedded context loading; the session sits in an
/// awaiting-ready state until the map announces itself, and commands issued
/// before that are dropped rather than queued. Receiving the ready
/// notification re-asserts the configured center (the first command the map
/// can actually honor) and fires [`MapEvent::MapIsReady`] exactly once.
///
/// All events surface through [`poll_events`](WebMap::poll_events) or
/// [`next_event`](WebMap::next_event), so event handling always happens on
/// whatever context the host drives the session from, never on the map's
/// thread.
pub struct WebMap {
    commands: CommandChannel,
    notifications: NotificationChannel,
    ready: Arc<AtomicBool>,
    ready_fired: bool,
    center: Coordinate,
    pending: VecDeque<MapEvent>,
}

impl WebMap {
    /// Start a session with the default configuration.
    pub fn new() -> Self {
        Self::with_config(WebMapConfig::default())
    }

    pub fn with_config(config: WebMapConfig) -> Self {
        let mut pending = VecDeque::new();
        let center = if config.initial_center.is_empty() {
            config.default_center
        } else {
            match parse_coordinate_pair(&config.initial_center) {
                Ok(center) => center,
                Err(e) => {
                    log::warn!(
                        "invalid initial center {:?}, using the default",
                        config.initial_center
                    );
                    pending.push_back(MapEvent::ErrorOccurred {
                        context: "initial_center".to_string(),
                        code: e.code(),
                    });
                    config.default_center
                }
            }
        };

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (notification_tx, notification_rx) = mpsc::unbounded_channel();
        let ready = Arc::new(AtomicBool::new(false));

        script::spawn(command_rx, HostCallbacks::new(notification_tx), config.api_key);

        WebMap {
            commands: CommandChannel::new(command_tx, ready.clone()),
            notifications: NotificationChannel::new(notification_rx),
            ready,
            ready_fired: false,
            center,
            pending,
        }
    }

    /// Re-center the map. `coords` is `"lat,lng"` text; invalid text is
    /// rejected and no command is sent.
    pub fn set_center(&mut self, coords: &str) -> Result<(), BridgeError> {
        let center = parse_coordinate_pair(coords)?;
        self.center = center;
        self.commands.send(&MapCommand::SetCenter {
            lat: center.lat(),
            lng: center.lng(),
        });
        Ok(())
    }

    /// Show or hide the center marker.
    pub fn show_center(&self, show: bool) {
        self.commands.send(&MapCommand::ShowCenter(show));
    }

    /// Zoom must be at least 0 and below 20; out-of-range values are
    /// rejected here and nothing is sent.
    pub fn set_zoom(&self, zoom: i64) -> Result<(), BridgeError> {
        if !(0..20).contains(&zoom) {
            return Err(BridgeError::InvalidZoomLevel);
        }
        self.commands.send(&MapCommand::SetZoom(zoom));
        Ok(())
    }

    /// Create a marker, or overwrite the one already at that position.
    pub fn add_marker(
        &self,
        lat: f64,
        lng: f64,
        title: &str,
        content: &str,
    ) -> Result<(), BridgeError> {
        let position = Coordinate::new(lat, lng)?;
        self.commands.send(&MapCommand::CreateMarker {
            lat: position.lat(),
            lng: position.lng(),
            title: title.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    /// Remove the marker at a position, if any.
    pub fn remove_marker(&self, lat: f64, lng: f64) -> Result<(), BridgeError> {
        let position = Coordinate::new(lat, lng)?;
        self.commands.send(&MapCommand::DeleteMarker {
            key: canonical_key(position),
        });
        Ok(())
    }

    pub fn remove_all_markers(&self) {
        self.commands.send(&MapCommand::DeleteAllMarkers);
    }

    /// Show or hide every marker on the map.
    pub fn show_markers(&self, show: bool) {
        self.commands.send(&MapCommand::ShowMarkers(show));
    }

    /// Show or hide the single marker at a position.
    pub fn show_marker(&self, lat: f64, lng: f64, visible: bool) -> Result<(), BridgeError> {
        let position = Coordinate::new(lat, lng)?;
        self.commands.send(&MapCommand::ShowMarker {
            key: canonical_key(position),
            visible,
        });
        Ok(())
    }

    /// Ask the map for its full marker list. The reply arrives later as a
    /// [`MapEvent::MarkersFromMapReceived`] event; there is no synchronous
    /// result, and only one export should be in flight at a time.
    pub fn get_all_markers(&self) {
        self.commands.send(&MapCommand::GetAllMarkers);
    }

    /// Ask the map for its center marker; answered by a
    /// [`MapEvent::CenterMarkerReported`] event.
    pub fn get_center(&self) {
        self.commands.send(&MapCommand::GetCenter);
    }

    /// Push a whole marker list onto the map in one command.
    pub fn add_markers_from_list(&self, markers: &[Marker]) {
        self.commands.send(&MapCommand::AddMarkersFromList {
            batch: codec::encode_batch(markers),
        });
    }

    /// Hand an address to the map's geolocation hook. With no geocoding
    /// service attached the map answers with a no-results error event.
    pub fn geolocate(&self, address: &str) {
        self.commands.send(&MapCommand::Geolocate {
            address: address.to_string(),
        });
    }

    /// The session's center: the validated initial location, then the
    /// position of the last successful `set_center`.
    pub fn center(&self) -> Coordinate {
        self.center
    }

    pub fn is_ready(&self) -> bool {
        self.commands.is_ready()
    }

    /// Drain everything the map has sent so far and return the resulting
    /// events, in order. Non-blocking.
    pub fn poll_events(&mut self) -> Vec<MapEvent> {
        while let Some(notification) = self.notifications.try_next() {
            self.apply_notification(notification);
        }
        self.pending.drain(..).collect()
    }

    /// Wait for the next event. `None` once the embedded context has shut
    /// down and every pending event has been delivered.
    pub async fn next_event(&mut self) -> Option<MapEvent> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Some(event);
            }
            let notification = self.notifications.next().await?;
            self.apply_notification(notification);
        }
    }

    fn apply_notification(&mut self, notification: MapNotification) {
        match notification {
            MapNotification::Ready => {
                if self.ready_fired {
                    log::debug!("duplicate ready notification ignored");
                    return;
                }
                self.ready_fired = true;
                self.ready.store(true, Ordering::SeqCst);
                // the map can honor the configured center now
                self.commands.send(&MapCommand::SetCenter {
                    lat: self.center.lat(),
                    lng: self.center.lng(),
                });
                self.pending.push_back(MapEvent::MapIsReady);
            }
            MapNotification::Error { code } => {
                if BridgeError::from_code(code) == BridgeError::Unrecognized {
                    log::warn!("map reported unrecognized error code {}", code);
                }
                self.pending.push_back(MapEvent::ErrorOccurred {
                    context: "map".to_string(),
                    code,
                });
            }
            MapNotification::CenterMarker { wire } => match codec::decode_marker(&wire) {
                Ok(marker) => self.pending.push_back(MapEvent::CenterMarkerReported(marker)),
                Err(e) => {
                    log::warn!("center marker failed to decode: {}", e);
                    self.pending.push_back(MapEvent::ErrorOccurred {
                        context: "get_center".to_string(),
                        code: e.code(),
                    });
                }
            },
            MapNotification::MarkersExported { batch } => match codec::decode_batch(&batch) {
                Ok(decoded) => {
                    if decoded.rejected > 0 {
                        log::warn!("marker export dropped {} invalid entries", decoded.rejected);
                    }
                    for _ in 0..decoded.rejected {
                        self.pending.push_back(MapEvent::ErrorOccurred {
                            context: "store_markers".to_string(),
                            code: BridgeError::InvalidMarker.code(),
                        });
                    }
                    self.pending
                        .push_back(MapEvent::MarkersFromMapReceived(decoded.markers));
                }
                Err(e) => {
                    log::warn!("marker export failed to decode: {}", e);
                    self.pending.push_back(MapEvent::ErrorOccurred {
                        context: "store_markers".to_string(),
                        code: e.code(),
                    });
                }
            },
        }
    }
}

impl Default for WebMap {
    fn default() -> Self {
        Self::new()
    }
}
