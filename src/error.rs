// WebMap-Bridge: Error taxonomy
// Numeric error codes shared with the embedded map script (3100 block)

use serde::{Deserialize, Serialize};

/// Base code of the map error block. Reported when the embedded context
/// sends a code outside the table below.
pub const ERROR_UNRECOGNIZED: i64 = 3100;
/// Text did not parse to an in-range coordinate pair.
pub const ERROR_ILLEGAL_COORDS_FORMAT: i64 = 3102;
/// A batch payload was not a valid JSON array.
pub const ERROR_PARSING_MARKERS_LIST: i64 = 3103;
/// A marker object was missing a usable position.
pub const ERROR_INVALID_MARKER: i64 = 3104;
/// Zoom argument outside the accepted range.
pub const ERROR_INVALID_ZOOM_LEVEL: i64 = 3105;
/// A geolocation request produced no results.
pub const ERROR_NO_GEOLOCATION_RESULTS: i64 = 3106;

/// Everything that can go wrong across the bridge. All kinds are non-fatal:
/// they are either returned from façade calls or reported through an
/// `ErrorOccurred` event, never panicked across the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
pub enum BridgeError {
    #[error("coordinates must be two comma-separated numbers within [-90, 90] latitude and [-180, 180] longitude")]
    IllegalCoordinateFormat,

    #[error("the marker list payload is not a valid JSON array")]
    MarkerListParse,

    #[error("marker is missing a valid position")]
    InvalidMarker,

    #[error("zoom level must be at least 0 and below 20")]
    InvalidZoomLevel,

    #[error("no geolocation results were found")]
    NoGeolocationResults,

    #[error("the map reported an unrecognized error code")]
    Unrecognized,
}

impl BridgeError {
    /// Numeric code reported across the bridge for this kind.
    pub const fn code(self) -> i64 {
        match self {
            BridgeError::IllegalCoordinateFormat => ERROR_ILLEGAL_COORDS_FORMAT,
            BridgeError::MarkerListParse => ERROR_PARSING_MARKERS_LIST,
            BridgeError::InvalidMarker => ERROR_INVALID_MARKER,
            BridgeError::InvalidZoomLevel => ERROR_INVALID_ZOOM_LEVEL,
            BridgeError::NoGeolocationResults => ERROR_NO_GEOLOCATION_RESULTS,
            BridgeError::Unrecognized => ERROR_UNRECOGNIZED,
        }
    }

    /// Map a code received from the embedded context back to a kind.
    /// Unknown codes become `Unrecognized`; they are still reported, never
    /// swallowed.
    pub const fn from_code(code: i64) -> Self {
        match code {
            ERROR_ILLEGAL_COORDS_FORMAT => BridgeError::IllegalCoordinateFormat,
            ERROR_PARSING_MARKERS_LIST => BridgeError::MarkerListParse,
            ERROR_INVALID_MARKER => BridgeError::InvalidMarker,
            ERROR_INVALID_ZOOM_LEVEL => BridgeError::InvalidZoomLevel,
            ERROR_NO_GEOLOCATION_RESULTS => BridgeError::NoGeolocationResults,
            _ => BridgeError::Unrecognized,
        }
    }
}
