pub mod event;
pub mod snapshot;

pub use event::{EventId, Location, RawEvent};
pub use snapshot::{Diagnostics, MatchedEvent, SensorAttributes, SensorState, Snapshot};
