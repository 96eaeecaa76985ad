use chrono::{DateTime, Utc};

/// Filter for reading events across streams.
///
/// Results are always returned in commit order.
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    /// Only events from streams of this kind.
    pub aggregate_type: Option<String>,

    /// Only events with one of these names.
    pub event_types: Option<Vec<String>>,

    /// Only events recorded at or after this instant.
    pub from_timestamp: Option<DateTime<Utc>>,

    /// Only events recorded at or before this instant.
    pub to_timestamp: Option<DateTime<Utc>>,

    pub limit: Option<usize>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event of one stream kind, e.g. all "Order" events.
    pub fn for_aggregate_type(aggregate_type: impl Into<String>) -> Self {
        Self {
            aggregate_type: Some(aggregate_type.into()),
            ..Default::default()
        }
    }

    pub fn aggregate_type(mut self, aggregate_type: impl Into<String>) -> Self {
        self.aggregate_type = Some(aggregate_type.into());
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_types = Some(vec![event_type.into()]);
        self
    }

    pub fn event_types<I, T>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.event_types = Some(event_types.into_iter().map(Into::into).collect());
        self
    }

    pub fn from_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.from_timestamp = Some(timestamp);
        self
    }

    pub fn to_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.to_timestamp = Some(timestamp);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if an event with these attributes passes the filter.
    pub fn matches(&self, aggregate_type: &str, event_type: &str, timestamp: DateTime<Utc>) -> bool {
        if let Some(ref wanted) = self.aggregate_type
            && wanted != aggregate_type
        {
            return false;
        }
        if let Some(ref types) = self.event_types
            && !types.iter().any(|t| t == event_type)
        {
            return false;
        }
        if let Some(from) = self.from_timestamp
            && timestamp < from
        {
            return false;
        }
        if let Some(to) = self.to_timestamp
            && timestamp > to
        {
            return false;
        }
        true
    }
}
