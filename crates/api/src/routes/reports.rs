//! Profit reports.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use chrono::{DateTime, Utc};
use domain::ValidationErrors;
use event_store::EventStore;
use projections::{ProfitReport, ReportPeriod};
use serde::Deserialize;

use crate::error::ApiError;
use crate::extract::Authenticated;
use crate::state::AppState;

/// `?period=last_week|last_month|last_year|all_time`, or
/// `?period=custom&start=..&end=..` with RFC 3339 timestamps.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl ReportQuery {
    pub fn period(&self) -> Result<ReportPeriod, ApiError> {
        let period = match self.period.as_deref().unwrap_or("last_month") {
            "last_week" => ReportPeriod::LastWeek,
            "last_month" => ReportPeriod::LastMonth,
            "last_year" => ReportPeriod::LastYear,
            "all_time" => ReportPeriod::AllTime,
            "custom" => match (self.start, self.end) {
                (Some(start), Some(end)) => ReportPeriod::custom(start, end)?,
                (start, end) => {
                    let mut errors = ValidationErrors::new();
                    errors.check(start.is_none(), "start", "is required");
                    errors.check(end.is_none(), "end", "is required");
                    return Err(errors.into());
                }
            },
            other => {
                return Err(ValidationErrors::single(
                    "period",
                    format!("unknown period '{other}'"),
                )
                .into());
            }
        };
        Ok(period)
    }
}

/// GET /reports/profit
#[tracing::instrument(skip(state))]
pub async fn profit<S: EventStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Authenticated(caller): Authenticated,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ProfitReport>, ApiError> {
    caller.require_admin()?;
    let report = state.reports.report(query.period()?).await?;
    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn named_periods_parse() {
        let query = ReportQuery {
            period: Some("last_week".into()),
            ..Default::default()
        };
        assert_eq!(query.period().unwrap(), ReportPeriod::LastWeek);
        assert_eq!(ReportQuery::default().period().unwrap(), ReportPeriod::LastMonth);
    }

    #[test]
    fn custom_needs_ordered_bounds() {
        let now = Utc::now();
        let ok = ReportQuery {
            period: Some("custom".into()),
            start: Some(now - Duration::days(3)),
            end: Some(now),
        };
        assert!(matches!(ok.period().unwrap(), ReportPeriod::Custom { .. }));

        let missing = ReportQuery {
            period: Some("custom".into()),
            ..Default::default()
        };
        assert!(missing.period().is_err());

        let backwards = ReportQuery {
            period: Some("custom".into()),
            start: Some(now),
            end: Some(now - Duration::days(1)),
        };
        assert!(backwards.period().is_err());
    }

    #[test]
    fn unknown_period_is_rejected() {
        let query = ReportQuery {
            period: Some("fortnight".into()),
            ..Default::default()
        };
        assert!(query.period().is_err());
    }
}
