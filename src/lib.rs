// WebMap-Bridge: Interactive Map Command Bridge
// Host façade, embedded script context, and the channels between them

// Bridge façade - session lifecycle, command surface, event pump
pub mod bridge;

// Coordinate and marker codec - parsing, validation, wire format
pub mod codec;

// Command channel - host-to-map command encoding and dispatch
pub mod command;

// Error taxonomy - numeric codes shared with the map script
pub mod error;

// Notification channel - map-to-host callback surface
pub mod notification;

// Marker registry - keyed store the embedded context maintains
pub mod registry;

// Embedded map context - script engine on its own thread
pub mod script;

// Re-export the session types
pub use bridge::{MapEvent, WebMap, WebMapConfig, DEFAULT_CENTER};

// Re-export the data model
pub use codec::{canonical_key, parse_coordinate_pair, Coordinate, Marker};

// Re-export channel types for hosts that wire the bridge up themselves
pub use command::{CommandChannel, MapCommand};
pub use error::BridgeError;
pub use notification::{HostCallbacks, MapNotification, NotificationChannel};
