//! Application-facing event types delivered by the read loop.

use crate::scene::Scene;

/// Number of control units covered by a status snapshot.
pub const STATUS_UNITS: usize = 8;

/// Events sent from the GRX client to the application.
///
/// One tagged enum through one callback; consumers never have to sniff
/// payload shapes to tell a snapshot from a button press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    /// A full status snapshot for units 1-8.
    Status(StatusSnapshot),

    /// A physical keypad press echoed by the controller.
    ButtonPress(ButtonPress),

    /// A `~ERROR` line reported by the controller.
    ///
    /// Only delivered when [`forward_protocol_errors`] is enabled;
    /// otherwise errors are logged and dropped.
    ///
    /// [`forward_protocol_errors`]: crate::config::EventConfig::forward_protocol_errors
    ProtocolError {
        /// Trailing text of the `~ERROR` line.
        message: String,
    },
}

/// The scene assignment of all 8 status-reporting units at one point in
/// time.
///
/// Built fresh from every `:ss` line; a garbled line is dropped rather
/// than merged with a prior snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    scenes: [Scene; STATUS_UNITS],
}

impl StatusSnapshot {
    /// Build a snapshot from scenes for units 1..=8, in unit order.
    #[must_use]
    pub fn new(scenes: [Scene; STATUS_UNITS]) -> Self {
        Self { scenes }
    }

    /// The scene for `unit` (1..=8), or `None` for units outside range.
    #[must_use]
    pub fn scene(&self, unit: u8) -> Option<Scene> {
        match unit {
            1..=8 => Some(self.scenes[usize::from(unit) - 1]),
            _ => None,
        }
    }

    /// Iterate `(unit, scene)` pairs in unit order 1..=8.
    pub fn iter(&self) -> impl Iterator<Item = (u8, Scene)> + '_ {
        self.scenes
            .iter()
            .enumerate()
            .map(|(i, &scene)| (i as u8 + 1, scene))
    }
}

/// A keypad press echoed by the controller.
///
/// Button echoes can reference units beyond the 8 status-reporting ones,
/// and always carry a numeric scene (`M` never appears in an echo).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonPress {
    /// Pressing unit, 1..=24 (wire letters `A`-`X`).
    pub unit: u8,
    /// Numeric scene selected by the press.
    pub scene: u8,
}

/// Create an event callback backed by a bounded channel.
///
/// Convenience for consumers who prefer pulling events from a receiver
/// over registering a closure. The channel is bounded: a full receiver
/// blocks the read loop, so back-pressure is total, matching direct
/// callback dispatch.
#[must_use]
pub fn channel(
    capacity: usize,
) -> (
    impl Fn(ControllerEvent) + Send + Sync + 'static,
    flume::Receiver<ControllerEvent>,
) {
    let (tx, rx) = flume::bounded(capacity);
    (
        move |event| {
            // Receiver dropped means the consumer is gone; nothing to do.
            let _ = tx.send(event);
        },
        rx,
    )
}
