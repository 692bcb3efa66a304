// WebMap-Bridge: Marker Registry
// Position-keyed marker store living inside the embedded map context

use std::collections::HashMap;

use crate::codec::{canonical_key, Coordinate, Marker};

/// Keyed store of markers. Keys are canonical position strings, so two
/// markers at the same position are one entry. Validation happens at the
/// boundary before markers get here; the registry trusts its input.
#[derive(Debug, Default)]
pub struct MarkerRegistry {
    markers: HashMap<String, Marker>,
}

impl MarkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a marker, or replace the title, content and visibility of the
    /// marker already stored at that position. Returns the stored marker.
    pub fn upsert(&mut self, marker: Marker) -> Marker {
        let key = canonical_key(marker.position);
        match self.markers.get_mut(&key) {
            Some(existing) => {
                existing.title = marker.title;
                existing.content = marker.content;
                existing.visible = marker.visible;
                existing.clone()
            }
            None => {
                self.markers.insert(key, marker.clone());
                marker
            }
        }
    }

    pub fn get(&self, position: Coordinate) -> Option<Marker> {
        self.markers.get(&canonical_key(position)).cloned()
    }

    /// Remove the marker at a position. False if nothing was stored there.
    pub fn remove(&mut self, position: Coordinate) -> bool {
        self.remove_key(&canonical_key(position))
    }

    /// Remove by canonical key. Commands arriving over the wire address
    /// markers by key rather than position.
    pub fn remove_key(&mut self, key: &str) -> bool {
        self.markers.remove(key).is_some()
    }

    /// Clear the registry. Every marker is hidden before the entries are
    /// dropped so none is left painted on the map.
    pub fn remove_all(&mut self) -> usize {
        for marker in self.markers.values_mut() {
            marker.visible = false;
        }
        let removed = self.markers.len();
        self.markers.clear();
        removed
    }

    /// Show or hide one marker. False if nothing is stored at the position.
    pub fn set_visibility(&mut self, position: Coordinate, visible: bool) -> bool {
        self.set_visibility_key(&canonical_key(position), visible)
    }

    pub fn set_visibility_key(&mut self, key: &str, visible: bool) -> bool {
        match self.markers.get_mut(key) {
            Some(marker) => {
                marker.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Show or hide every registered marker.
    pub fn set_all_visibility(&mut self, visible: bool) {
        for marker in self.markers.values_mut() {
            marker.visible = visible;
        }
    }

    /// Snapshot of all markers in key order. The snapshot is a copy: later
    /// registry mutation is never observed through it.
    pub fn all(&self) -> Vec<Marker> {
        let mut snapshot: Vec<Marker> = self.markers.values().cloned().collect();
        snapshot.sort_by_key(|marker| canonical_key(marker.position));
        snapshot
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lat: f64, lng: f64) -> Coordinate {
        Coordinate::new(lat, lng).unwrap()
    }

    fn marker(lat: f64, lng: f64, title: &str) -> Marker {
        Marker::new(coord(lat, lng)).with_title(title)
    }

    #[test]
    fn test_upsert_then_get() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(48.856614, 2.3522219, "Paris"));
        let stored = registry.get(coord(48.856614, 2.3522219)).unwrap();
        assert_eq!(stored.title, "Paris");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_upsert_overwrites_at_same_position() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(1.0, 2.0, "first"));
        let stored = registry.upsert(marker(1.0, 2.0, "second").with_content("popup"));
        assert_eq!(registry.len(), 1);
        assert_eq!(stored.title, "second");
        assert_eq!(registry.get(coord(1.0, 2.0)).unwrap().title, "second");
        assert_eq!(registry.get(coord(1.0, 2.0)).unwrap().content, "popup");
    }

    #[test]
    fn test_get_absent_position() {
        let registry = MarkerRegistry::new();
        assert!(registry.get(coord(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_remove() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(1.0, 2.0, "a"));
        assert!(registry.remove(coord(1.0, 2.0)));
        assert!(!registry.remove(coord(1.0, 2.0)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_all_reports_count() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(1.0, 1.0, "a"));
        registry.upsert(marker(2.0, 2.0, "b"));
        assert_eq!(registry.remove_all(), 2);
        assert!(registry.is_empty());
        assert_eq!(registry.remove_all(), 0);
    }

    #[test]
    fn test_key_addressed_operations() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(48.0, 3.0, "a"));
        assert!(registry.set_visibility_key("(48.0, 3.0)", false));
        assert!(!registry.get(coord(48.0, 3.0)).unwrap().visible);
        assert!(registry.remove_key("(48.0, 3.0)"));
        assert!(!registry.remove_key("(48.0, 3.0)"));
    }

    #[test]
    fn test_set_visibility() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(1.0, 2.0, "a"));
        assert!(registry.set_visibility(coord(1.0, 2.0), false));
        assert!(!registry.get(coord(1.0, 2.0)).unwrap().visible);
        assert!(!registry.set_visibility(coord(9.0, 9.0), false));
    }

    #[test]
    fn test_set_all_visibility() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(1.0, 1.0, "a"));
        registry.upsert(marker(2.0, 2.0, "b"));
        registry.set_all_visibility(false);
        assert!(registry.all().iter().all(|m| !m.visible));
        registry.set_all_visibility(true);
        assert!(registry.all().iter().all(|m| m.visible));
    }

    #[test]
    fn test_all_is_sorted_and_complete() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(3.0, 3.0, "c"));
        registry.upsert(marker(1.0, 1.0, "a"));
        registry.upsert(marker(2.0, 2.0, "b"));
        let snapshot = registry.all();
        let titles: Vec<&str> = snapshot.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        // repeated snapshots come back in the same order
        assert_eq!(registry.all(), registry.all());
    }

    #[test]
    fn test_all_is_a_copy() {
        let mut registry = MarkerRegistry::new();
        registry.upsert(marker(1.0, 1.0, "a"));
        let snapshot = registry.all();
        registry.upsert(marker(2.0, 2.0, "b"));
        registry.remove(coord(1.0, 1.0));
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title, "a");
    }
}
