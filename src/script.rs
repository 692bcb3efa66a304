// WebMap-Bridge: Embedded map context
// Dedicated thread hosting the script engine that runs the map

use std::sync::{Arc, Mutex};

use rhai::{Dynamic, Engine, Scope};
use tokio::sync::mpsc;

use crate::codec::{self, Coordinate, Marker};
use crate::error::{
    ERROR_ILLEGAL_COORDS_FORMAT, ERROR_INVALID_MARKER, ERROR_NO_GEOLOCATION_RESULTS,
    ERROR_PARSING_MARKERS_LIST,
};
use crate::notification::HostCallbacks;
use crate::registry::MarkerRegistry;

/// Title carried by the center marker the map maintains on its own.
pub const CENTER_MARKER_TITLE: &str = "Map Center";

/// Zoom level the map starts at before any `set_zoom` command.
pub const DEFAULT_ZOOM: i64 = 6;

/// State owned by the embedded context: the user-marker registry plus the
/// viewport fields commands act on. The center marker is kept separate from
/// the registry, so exports carry user markers only.
#[derive(Debug)]
pub struct MapState {
    pub registry: MarkerRegistry,
    pub center: Option<Marker>,
    pub zoom: i64,
    pub showing_center: bool,
}

impl MapState {
    pub fn new() -> Self {
        MapState {
            registry: MarkerRegistry::new(),
            center: None,
            zoom: DEFAULT_ZOOM,
            showing_center: true,
        }
    }

    /// Replace the center marker, panning the viewport to it. The new
    /// marker inherits the current center visibility.
    pub fn set_center(&mut self, position: Coordinate) {
        let mut center = Marker::new(position).with_title(CENTER_MARKER_TITLE);
        center.visible = self.showing_center;
        self.center = Some(center);
    }

    pub fn show_center(&mut self, show: bool) {
        self.showing_center = show;
        if let Some(center) = self.center.as_mut() {
            center.visible = show;
        }
    }

    /// Apply a zoom level. False (and no change) when out of range; the
    /// host validates before sending, this guard is the map's own.
    pub fn set_zoom(&mut self, zoom: i64) -> bool {
        if !(0..20).contains(&zoom) {
            return false;
        }
        self.zoom = zoom;
        true
    }
}

impl Default for MapState {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the embedded context on its own thread. The thread builds the
/// engine, runs the bootstrap script (which announces readiness through the
/// callback surface), then evaluates incoming command strings until the
/// command channel closes. The thread is not joined; dropping the sending
/// half shuts it down.
pub fn spawn(
    command_rx: mpsc::UnboundedReceiver<String>,
    callbacks: HostCallbacks,
    api_key: Option<String>,
) {
    std::thread::Builder::new()
        .name("map-script".to_string())
        .spawn(move || run(command_rx, callbacks, api_key))
        .expect("failed to spawn map script thread");
}

fn run(
    mut command_rx: mpsc::UnboundedReceiver<String>,
    callbacks: HostCallbacks,
    api_key: Option<String>,
) {
    let state = Arc::new(Mutex::new(MapState::new()));
    let engine = build_engine(state, callbacks);

    let mut scope = Scope::new();
    scope.push("API_KEY", api_key.unwrap_or_default());

    let bootstrap = include_str!("scripts/map.rhai");
    let ast = match engine.compile(bootstrap) {
        Ok(ast) => ast,
        Err(e) => {
            log::error!("map bootstrap script does not compile: {}", e);
            return;
        }
    };
    if let Err(e) = engine.run_ast_with_scope(&mut scope, &ast) {
        log::error!("map bootstrap failed: {}", e);
        return;
    }
    log::info!("map script loaded, processing commands");

    while let Some(command) = command_rx.blocking_recv() {
        if let Err(e) = engine.eval_with_scope::<Dynamic>(&mut scope, &command) {
            log::warn!("command evaluation failed: {}", e);
        }
    }
    log::info!("command channel closed, map script thread exiting");
}

/// Build the engine and register the map API. Each registered function is a
/// closure over its own clones of the shared state and the callback surface.
fn build_engine(state: Arc<Mutex<MapState>>, callbacks: HostCallbacks) -> Engine {
    let mut engine = Engine::new();

    engine.register_fn("console_log", |line: &str| {
        log::debug!("map console: {}", line);
    });

    let state_init = state.clone();
    engine.register_fn("init_map", move |zoom: i64, show_center: bool| {
        if let Ok(mut map) = state_init.lock() {
            map.zoom = zoom;
            map.showing_center = show_center;
        }
    });

    let cb_ready = callbacks.clone();
    engine.register_fn("map_is_ready", move || cb_ready.map_is_ready());

    let cb_error = callbacks.clone();
    engine.register_fn("dispatch_error", move |code: i64| cb_error.dispatch_error(code));

    let state_center = state.clone();
    let cb_center = callbacks.clone();
    engine.register_fn("set_center", move |lat: f64, lng: f64| {
        match Coordinate::new(lat, lng) {
            Ok(position) => {
                if let Ok(mut map) = state_center.lock() {
                    map.set_center(position);
                }
            }
            Err(_) => cb_center.dispatch_error(ERROR_ILLEGAL_COORDS_FORMAT),
        }
    });

    let state_show_center = state.clone();
    engine.register_fn("show_center", move |show: bool| {
        if let Ok(mut map) = state_show_center.lock() {
            map.show_center(show);
        }
    });

    let state_zoom = state.clone();
    engine.register_fn("set_zoom", move |zoom: i64| {
        if let Ok(mut map) = state_zoom.lock() {
            if !map.set_zoom(zoom) {
                log::warn!("set_zoom: level {} out of range, ignored", zoom);
            }
        }
    });

    let state_create = state.clone();
    let cb_create = callbacks.clone();
    engine.register_fn(
        "create_marker",
        move |lat: f64, lng: f64, title: &str, content: &str| match Coordinate::new(lat, lng) {
            Ok(position) => {
                if let Ok(mut map) = state_create.lock() {
                    map.registry
                        .upsert(Marker::new(position).with_title(title).with_content(content));
                }
            }
            Err(_) => cb_create.dispatch_error(ERROR_INVALID_MARKER),
        },
    );

    let state_delete = state.clone();
    engine.register_fn("delete_marker", move |key: &str| {
        if let Ok(mut map) = state_delete.lock() {
            if !map.registry.remove_key(key) {
                log::debug!("delete_marker: no marker stored at {}", key);
            }
        }
    });

    let state_delete_all = state.clone();
    engine.register_fn("delete_all_markers", move || {
        if let Ok(mut map) = state_delete_all.lock() {
            let removed = map.registry.remove_all();
            log::debug!("delete_all_markers: removed {}", removed);
        }
    });

    let state_show_all = state.clone();
    engine.register_fn("show_markers", move |show: bool| {
        if let Ok(mut map) = state_show_all.lock() {
            map.registry.set_all_visibility(show);
        }
    });

    let state_show_one = state.clone();
    engine.register_fn("show_marker", move |key: &str, visible: bool| {
        if let Ok(mut map) = state_show_one.lock() {
            if !map.registry.set_visibility_key(key, visible) {
                log::debug!("show_marker: no marker stored at {}", key);
            }
        }
    });

    let state_export = state.clone();
    let cb_export = callbacks.clone();
    engine.register_fn("get_all_markers", move || {
        if let Ok(map) = state_export.lock() {
            cb_export.store_markers(codec::encode_batch(&map.registry.all()));
        }
    });

    let state_get_center = state.clone();
    let cb_get_center = callbacks.clone();
    engine.register_fn("get_center", move || {
        if let Ok(map) = state_get_center.lock() {
            match map.center.as_ref() {
                Some(center) => cb_get_center.send_center_marker(codec::encode_marker(center)),
                None => log::warn!("get_center: no center marker set yet"),
            }
        }
    });

    let state_import = state.clone();
    let cb_import = callbacks.clone();
    engine.register_fn("add_markers_from_list", move |json: &str| {
        match codec::decode_batch(json) {
            Ok(batch) => {
                let codec::DecodedBatch { markers, rejected } = batch;
                if let Ok(mut map) = state_import.lock() {
                    for marker in markers {
                        map.registry.upsert(marker);
                    }
                }
                if rejected > 0 {
                    log::warn!("add_markers_from_list: dropped {} invalid entries", rejected);
                }
                for _ in 0..rejected {
                    cb_import.dispatch_error(ERROR_INVALID_MARKER);
                }
            }
            Err(_) => cb_import.dispatch_error(ERROR_PARSING_MARKERS_LIST),
        }
    });

    let cb_geolocate = callbacks.clone();
    engine.register_fn("geolocate", move |address: &str| {
        // no geocoding service is attached: every request reports no results
        log::info!("geolocate requested for {:?}", address);
        cb_geolocate.dispatch_error(ERROR_NO_GEOLOCATION_RESULTS);
    });

    engine
}
