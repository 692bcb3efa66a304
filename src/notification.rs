//! Notification Channel: how the embedded map context talks back to the host.
//!
//! The embedded side never calls host code directly. It holds a
//! [`HostCallbacks`] handle whose fixed method surface turns each invocation
//! into one [`MapNotification`] on an unbounded channel. The host drains the
//! channel exclusively from its own event pump, which is what keeps every
//! host-visible event on the host's designated execution context:
//!
//! ```text
//!   map script thread                          host context
//!   ─────────────────                          ────────────
//!   HostCallbacks::map_is_ready()      ──┐
//!   HostCallbacks::dispatch_error(c)   ──┤
//!   HostCallbacks::send_center_marker(m)─┼─> mpsc ──> NotificationChannel
//!   HostCallbacks::store_markers(b)    ──┘             (poll / await)
//! ```
//!
//! The set of notification kinds is closed: a tagged enum with typed
//! payloads, not open-ended dynamic dispatch.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One notification from the embedded context. Marker payloads cross the
/// boundary as wire-format JSON text and are decoded host-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MapNotification {
    /// The map finished loading and is listening for commands.
    Ready,
    /// The embedded context reports a numeric error code.
    Error { code: i64 },
    /// Reply to a `get_center` command: the center marker in wire form.
    CenterMarker { wire: String },
    /// Reply to a `get_all_markers` command: the full registry in wire form.
    MarkersExported { batch: String },
}

/// The callback surface handed to the embedded context. Each method is one
/// of the named callbacks the map script may invoke; nothing else crosses
/// the boundary in this direction.
#[derive(Debug, Clone)]
pub struct HostCallbacks {
    notification_tx: mpsc::UnboundedSender<MapNotification>,
}

impl HostCallbacks {
    pub fn new(notification_tx: mpsc::UnboundedSender<MapNotification>) -> Self {
        HostCallbacks { notification_tx }
    }

    pub fn map_is_ready(&self) {
        self.send(MapNotification::Ready);
    }

    pub fn dispatch_error(&self, code: i64) {
        self.send(MapNotification::Error { code });
    }

    pub fn send_center_marker(&self, wire: String) {
        self.send(MapNotification::CenterMarker { wire });
    }

    pub fn store_markers(&self, batch: String) {
        self.send(MapNotification::MarkersExported { batch });
    }

    fn send(&self, notification: MapNotification) {
        if self.notification_tx.send(notification).is_err() {
            log::debug!("notification channel closed, host side gone");
        }
    }
}

/// Host-side receiving end. Owned by the session; drained only from the
/// session's event pump.
#[derive(Debug)]
pub struct NotificationChannel {
    notification_rx: mpsc::UnboundedReceiver<MapNotification>,
}

impl NotificationChannel {
    pub fn new(notification_rx: mpsc::UnboundedReceiver<MapNotification>) -> Self {
        NotificationChannel { notification_rx }
    }

    /// Non-blocking: the next pending notification, if any.
    pub fn try_next(&mut self) -> Option<MapNotification> {
        self.notification_rx.try_recv().ok()
    }

    /// Wait for the next notification. `None` once the embedded side is gone
    /// and the channel is drained.
    pub async fn next(&mut self) -> Option<MapNotification> {
        self.notification_rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callbacks_arrive_in_invocation_order() {
        let (tx, rx) = mpsc::unbounded_channel();
        let callbacks = HostCallbacks::new(tx);
        let mut channel = NotificationChannel::new(rx);

        callbacks.map_is_ready();
        callbacks.dispatch_error(3104);
        callbacks.store_markers("[]".to_string());

        assert_eq!(channel.try_next(), Some(MapNotification::Ready));
        assert_eq!(channel.try_next(), Some(MapNotification::Error { code: 3104 }));
        assert_eq!(
            channel.try_next(),
            Some(MapNotification::MarkersExported {
                batch: "[]".to_string()
            })
        );
        assert_eq!(channel.try_next(), None);
    }

    #[test]
    fn test_callbacks_survive_a_closed_channel() {
        let (tx, rx) = mpsc::unbounded_channel();
        let callbacks = HostCallbacks::new(tx);
        drop(rx);
        callbacks.map_is_ready();
        callbacks.dispatch_error(3100);
    }
}
