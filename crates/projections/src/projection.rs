//! Event-driven read models.

use async_trait::async_trait;
use event_store::EventEnvelope;

use crate::Result;

/// Number of events, across all streams, a projection has consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProjectionPosition(u64);

impl ProjectionPosition {
    pub fn zero() -> Self {
        Self(0)
    }

    pub fn advance(self) -> Self {
        Self(self.0 + 1)
    }

    pub fn events_processed(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProjectionPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "position({})", self.0)
    }
}

/// Folds committed events into a query-side model.
///
/// `handle` sees every event in commit order, including kinds the
/// projection ignores; those still advance its position.
#[async_trait]
pub trait Projection: Send + Sync {
    fn name(&self) -> &'static str;

    async fn handle(&self, event: &EventEnvelope) -> Result<()>;

    async fn position(&self) -> ProjectionPosition;

    async fn reset(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_counts_up_from_zero() {
        let pos = ProjectionPosition::zero().advance().advance();
        assert_eq!(pos.events_processed(), 2);
        assert!(pos > ProjectionPosition::zero());
        assert_eq!(pos.to_string(), "position(2)");
    }
}
