//! Telemetry sink trait

use crate::TelemetryEvent;

/// Fire-and-forget event sink
///
/// `record` is synchronous and infallible so that a slow or broken sink can
/// never stall or fail a conversation turn.
pub trait Telemetry: Send + Sync + 'static {
    fn record(&self, event: TelemetryEvent);
}
