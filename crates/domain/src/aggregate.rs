//! Aggregate and domain event traits.

use common::AggregateId;
use event_store::Version;
use serde::{Serialize, de::DeserializeOwned};

/// A fact recorded on an aggregate's stream, named in the past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Name stored alongside the payload, used for filtering.
    fn event_type(&self) -> &'static str;
}

/// An event-sourced consistency boundary.
///
/// State is rebuilt by replaying events through [`Aggregate::apply`]. Command
/// methods on the concrete types inspect the current state and return the
/// events to record, or an error; they never mutate.
pub trait Aggregate: Default + Send + Sync + Sized {
    type Event: DomainEvent;
    type Error: std::error::Error + Send + Sync;

    /// Stream kind, e.g. "Order".
    fn aggregate_type() -> &'static str;

    /// `None` until the creating event has been applied.
    fn id(&self) -> Option<AggregateId>;

    fn version(&self) -> Version;

    fn set_version(&mut self, version: Version);

    /// Folds one event into the state. Must be deterministic and infallible.
    fn apply(&mut self, event: Self::Event);

    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}

/// Aggregates whose state is periodically snapshotted to shorten replay.
pub trait SnapshotCapable: Aggregate + Serialize + DeserializeOwned {
    /// Events between snapshots.
    fn snapshot_interval() -> usize {
        100
    }

    fn should_snapshot(&self) -> bool {
        let version = self.version().as_i64();
        version > 0 && (version as usize).is_multiple_of(Self::snapshot_interval())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    enum ShelfEvent {
        Opened { id: AggregateId },
        Stocked { units: u32 },
    }

    impl DomainEvent for ShelfEvent {
        fn event_type(&self) -> &'static str {
            match self {
                ShelfEvent::Opened { .. } => "ShelfOpened",
                ShelfEvent::Stocked { .. } => "ShelfStocked",
            }
        }
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Shelf {
        id: Option<AggregateId>,
        units: u32,
        version: Version,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("shelf error")]
    struct ShelfError;

    impl Aggregate for Shelf {
        type Event = ShelfEvent;
        type Error = ShelfError;

        fn aggregate_type() -> &'static str {
            "Shelf"
        }

        fn id(&self) -> Option<AggregateId> {
            self.id
        }

        fn version(&self) -> Version {
            self.version
        }

        fn set_version(&mut self, version: Version) {
            self.version = version;
        }

        fn apply(&mut self, event: ShelfEvent) {
            match event {
                ShelfEvent::Opened { id } => self.id = Some(id),
                ShelfEvent::Stocked { units } => self.units += units,
            }
        }
    }

    impl SnapshotCapable for Shelf {
        fn snapshot_interval() -> usize {
            10
        }
    }

    #[test]
    fn replay_folds_events_in_order() {
        let id = AggregateId::new();
        let mut shelf = Shelf::default();
        shelf.apply_events([
            ShelfEvent::Opened { id },
            ShelfEvent::Stocked { units: 3 },
            ShelfEvent::Stocked { units: 4 },
        ]);

        assert_eq!(shelf.id(), Some(id));
        assert_eq!(shelf.units, 7);
        assert_eq!(ShelfEvent::Stocked { units: 1 }.event_type(), "ShelfStocked");
    }

    #[test]
    fn snapshots_on_interval_boundaries() {
        let mut shelf = Shelf::default();
        assert!(!shelf.should_snapshot());

        shelf.set_version(Version::new(10));
        assert!(shelf.should_snapshot());

        shelf.set_version(Version::new(11));
        assert!(!shelf.should_snapshot());
    }
}
