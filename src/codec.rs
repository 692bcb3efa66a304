// WebMap-Bridge: Coordinate Codec
// Parsing, validation and wire serialization for coordinates and markers

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;

/// A validated geographic position. Values outside the latitude/longitude
/// ranges (or non-finite values) cannot be constructed; text that fails to
/// parse is an error, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    lat: f64,
    lng: f64,
}

impl Coordinate {
    /// Build from components already known to be in range. Crate-internal,
    /// for literal constants; parsed input goes through `new`.
    pub(crate) const fn from_parts(lat: f64, lng: f64) -> Self {
        Coordinate { lat, lng }
    }

    pub fn new(lat: f64, lng: f64) -> Result<Self, BridgeError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(BridgeError::IllegalCoordinateFormat);
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(BridgeError::IllegalCoordinateFormat);
        }
        Ok(Coordinate { lat, lng })
    }

    pub fn lat(self) -> f64 {
        self.lat
    }

    pub fn lng(self) -> f64 {
        self.lng
    }
}

/// A marker on the map. Identity is the canonical key of `position`: two
/// markers at the same position are the same logical entity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub position: Coordinate,
    pub title: String,
    pub content: String,
    pub visible: bool,
}

impl Marker {
    /// Create a visible marker with empty title and popup content.
    pub fn new(position: Coordinate) -> Self {
        Marker {
            position,
            title: String::new(),
            content: String::new(),
            visible: true,
        }
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    /// Text shown in the marker's info popup.
    pub fn with_content(mut self, content: &str) -> Self {
        self.content = content.to_string();
        self
    }
}

/// Interchange form of a marker. `title` and `content` default to empty
/// strings when absent; `lat`/`lng` are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerWire {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

/// Outcome of decoding a batch payload: the markers that decoded plus the
/// number of entries dropped as invalid. One bad record does not abort the
/// batch; a payload that is not a JSON array at all does.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedBatch {
    pub markers: Vec<Marker>,
    pub rejected: usize,
}

/// Parse a `"lat,lng"` pair: exactly two comma-separated numeric fields,
/// surrounding whitespace tolerated, ranges enforced.
pub fn parse_coordinate_pair(text: &str) -> Result<Coordinate, BridgeError> {
    let fields: Vec<&str> = text.split(',').collect();
    if fields.len() != 2 {
        return Err(BridgeError::IllegalCoordinateFormat);
    }
    let lat: f64 = fields[0]
        .trim()
        .parse()
        .map_err(|_| BridgeError::IllegalCoordinateFormat)?;
    let lng: f64 = fields[1]
        .trim()
        .parse()
        .map_err(|_| BridgeError::IllegalCoordinateFormat)?;
    Coordinate::new(lat, lng)
}

/// Stable registry key for a position: `"(lat, lng)"` with deterministic
/// float formatting. Coordinates equal under floating-point comparison
/// produce the same key, so negative zero is normalized.
pub fn canonical_key(position: Coordinate) -> String {
    let lat = if position.lat == 0.0 { 0.0 } else { position.lat };
    let lng = if position.lng == 0.0 { 0.0 } else { position.lng };
    format!("({}, {})", fmt_float(lat), fmt_float(lng))
}

/// Shortest round-trip form of a finite float, always carrying a decimal
/// point so downstream lexers read it back as a float.
pub(crate) fn fmt_float(value: f64) -> String {
    let mut text = value.to_string();
    if !text.contains('.') && !text.contains('e') && !text.contains('E') {
        text.push_str(".0");
    }
    text
}

pub fn marker_to_wire(marker: &Marker) -> MarkerWire {
    MarkerWire {
        lat: marker.position.lat(),
        lng: marker.position.lng(),
        title: marker.title.clone(),
        content: marker.content.clone(),
    }
}

/// Rebuild a marker from its wire form. Fails with `InvalidMarker` when the
/// position is unusable (out of range or non-finite); the wire form carries
/// no visibility, so decoded markers start visible.
pub fn marker_from_wire(wire: &MarkerWire) -> Result<Marker, BridgeError> {
    let position = Coordinate::new(wire.lat, wire.lng).map_err(|_| BridgeError::InvalidMarker)?;
    Ok(Marker {
        position,
        title: wire.title.clone(),
        content: wire.content.clone(),
        visible: true,
    })
}

/// Single marker as JSON text.
pub fn encode_marker(marker: &Marker) -> String {
    serde_json::to_string(&marker_to_wire(marker)).unwrap_or_else(|_| "{}".to_string())
}

pub fn decode_marker(json: &str) -> Result<Marker, BridgeError> {
    let wire: MarkerWire = serde_json::from_str(json).map_err(|_| BridgeError::InvalidMarker)?;
    marker_from_wire(&wire)
}

/// Full marker list as a JSON array, one object per marker.
pub fn encode_batch(markers: &[Marker]) -> String {
    let wires: Vec<MarkerWire> = markers.iter().map(marker_to_wire).collect();
    serde_json::to_string(&wires).unwrap_or_else(|_| "[]".to_string())
}

/// Decode a batch payload with partial-failure semantics: entries that are
/// not valid marker objects are counted and dropped, the rest decode.
pub fn decode_batch(json: &str) -> Result<DecodedBatch, BridgeError> {
    let entries: Vec<serde_json::Value> =
        serde_json::from_str(json).map_err(|_| BridgeError::MarkerListParse)?;
    let mut markers = Vec::with_capacity(entries.len());
    let mut rejected = 0usize;
    for entry in entries {
        match serde_json::from_value::<MarkerWire>(entry) {
            Ok(wire) => match marker_from_wire(&wire) {
                Ok(marker) => markers.push(marker),
                Err(_) => rejected += 1,
            },
            Err(_) => rejected += 1,
        }
    }
    Ok(DecodedBatch { markers, rejected })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    #[test]
    fn test_parse_accepts_range_corners() {
        assert!(parse_coordinate_pair("90,180").is_ok());
        assert!(parse_coordinate_pair("-90,-180").is_ok());
        assert!(parse_coordinate_pair("0,0").is_ok());
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        assert_eq!(
            parse_coordinate_pair("91,0"),
            Err(BridgeError::IllegalCoordinateFormat)
        );
        assert_eq!(
            parse_coordinate_pair("0,181"),
            Err(BridgeError::IllegalCoordinateFormat)
        );
        assert_eq!(
            parse_coordinate_pair("-90.0001,0"),
            Err(BridgeError::IllegalCoordinateFormat)
        );
    }

    #[test]
    fn test_parse_rejects_malformed_text() {
        for text in ["", "abc", "1", "1,2,3", "1,", ",2", "1;2", "nan,0", "inf,0"] {
            assert_eq!(
                parse_coordinate_pair(text),
                Err(BridgeError::IllegalCoordinateFormat),
                "expected {:?} to be rejected",
                text
            );
        }
    }

    #[test]
    fn test_parse_tolerates_whitespace() {
        let c = parse_coordinate_pair(" 43.473847 , -8.169154 ").unwrap();
        assert_eq!(c.lat(), 43.473847);
        assert_eq!(c.lng(), -8.169154);
    }

    #[test]
    fn test_constructor_rejects_non_finite() {
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
        assert!(Coordinate::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_canonical_key_is_stable() {
        let c = coord(48.856614, 2.3522219);
        assert_eq!(canonical_key(c), canonical_key(c));
        assert_eq!(canonical_key(c), "(48.856614, 2.3522219)");
    }

    #[test]
    fn test_canonical_key_keeps_floats_float() {
        assert_eq!(canonical_key(coord(48.0, 3.0)), "(48.0, 3.0)");
    }

    #[test]
    fn test_canonical_key_normalizes_negative_zero() {
        assert_eq!(canonical_key(coord(-0.0, -0.0)), canonical_key(coord(0.0, 0.0)));
    }

    #[test]
    fn test_canonical_key_distinguishes_positions() {
        assert_ne!(canonical_key(coord(1.5, 2.5)), canonical_key(coord(2.5, 1.5)));
    }

    #[test]
    fn test_marker_wire_round_trip() {
        let marker = Marker::new(coord(48.856614, 2.3522219))
            .with_title("Paris")
            .with_content("Tour Eiffel");
        let decoded = marker_from_wire(&marker_to_wire(&marker)).unwrap();
        assert_eq!(decoded, marker);
    }

    #[test]
    fn test_marker_json_round_trip() {
        let marker = Marker::new(coord(-33.8688, 151.2093)).with_title("Sydney");
        let decoded = decode_marker(&encode_marker(&marker)).unwrap();
        assert_eq!(decoded, marker);
    }

    #[test]
    fn test_wire_defaults_title_and_content() {
        let marker = decode_marker(r#"{"lat": 1.0, "lng": 2.0}"#).unwrap();
        assert_eq!(marker.title, "");
        assert_eq!(marker.content, "");
        assert!(marker.visible);
    }

    #[test]
    fn test_wire_zero_coordinates_are_valid() {
        let marker = decode_marker(r#"{"lat": 0, "lng": 0}"#).unwrap();
        assert_eq!(canonical_key(marker.position), "(0.0, 0.0)");
    }

    #[test]
    fn test_wire_rejects_missing_or_bad_position() {
        assert_eq!(
            decode_marker(r#"{"lng": 2.0, "title": "no lat"}"#),
            Err(BridgeError::InvalidMarker)
        );
        assert_eq!(
            decode_marker(r#"{"lat": "north", "lng": 2.0}"#),
            Err(BridgeError::InvalidMarker)
        );
        assert_eq!(
            decode_marker(r#"{"lat": 91.0, "lng": 0.0}"#),
            Err(BridgeError::InvalidMarker)
        );
    }

    #[test]
    fn test_batch_partial_failure() {
        let json = r#"[
            {"lat": 1.0, "lng": 2.0, "title": "a"},
            {"lng": 4.0, "title": "missing lat"},
            {"lat": 5.0, "lng": 6.0, "title": "c"}
        ]"#;
        let batch = decode_batch(json).unwrap();
        assert_eq!(batch.markers.len(), 2);
        assert_eq!(batch.rejected, 1);
        assert_eq!(batch.markers[0].title, "a");
        assert_eq!(batch.markers[1].title, "c");
    }

    #[test]
    fn test_batch_rejects_non_array_payloads() {
        assert_eq!(decode_batch("not json"), Err(BridgeError::MarkerListParse));
        assert_eq!(
            decode_batch(r#"{"lat": 1.0, "lng": 2.0}"#),
            Err(BridgeError::MarkerListParse)
        );
        assert_eq!(decode_batch("null"), Err(BridgeError::MarkerListParse));
    }

    #[test]
    fn test_batch_round_trip() {
        let markers = vec![
            Marker::new(coord(1.0, 2.0)).with_title("one"),
            Marker::new(coord(3.0, 4.0)).with_content("two"),
        ];
        let batch = decode_batch(&encode_batch(&markers)).unwrap();
        assert_eq!(batch.markers, markers);
        assert_eq!(batch.rejected, 0);
    }

    #[test]
    fn test_empty_batch() {
        let batch = decode_batch("[]").unwrap();
        assert!(batch.markers.is_empty());
        assert_eq!(batch.rejected, 0);
    }
}
