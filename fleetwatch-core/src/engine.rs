//! Weekly per-operator indicators built from several independently fetched sources.

use std::collections::HashMap;

use tracing::{debug, error, info};

use crate::gateways::Gateways;
use crate::model::{Checklist, Incident, Indicator, UsageLog, User, UserId};
use crate::ports::{ChecklistQuery, IncidentQuery, SourceError, UsageLogQuery};
use crate::window::TimeWindow;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Failure of a whole report computation.
pub enum AggregationError {
    /// One of the required sources could not be fetched.
    #[error("Operator indicators unavailable: {0}{hint}", hint = missing_index_hint(.0))]
    Source(#[from] SourceError),
}

impl AggregationError {
    /// Whether the underlying store reported a missing composite index.
    #[must_use]
    pub fn is_missing_index(&self) -> bool {
        match self {
            AggregationError::Source(cause) => cause.is_precondition_failed(),
        }
    }
}

fn missing_index_hint(cause: &SourceError) -> &'static str {
    if cause.is_precondition_failed() {
        ". A composite index is probably missing; run the system check to have the store suggest it"
    } else {
        ""
    }
}

#[derive(Debug, Clone, Copy)]
/// Activity records fetched for one window.
pub struct ActivitySources<'a> {
    /// Vehicle usage logs.
    pub usage_logs: &'a [UsageLog],
    /// Incidents.
    pub incidents: &'a [Incident],
    /// Checklists.
    pub checklists: &'a [Checklist],
}

#[derive(Default)]
struct Tally {
    km: f64,
    incidents: usize,
    checklists: usize,
}

/// Build one indicator per operator in `users`, keeping their order.
///
/// Records outside `window` are ignored even if the caller passed them in.
/// Missing distances count as zero, as do negative or non-finite ones.
/// Operators without activity still get an all-zero indicator.
#[must_use]
pub fn aggregate(
    users: &[User],
    window: &TimeWindow,
    sources: &ActivitySources<'_>,
) -> Vec<Indicator> {
    let mut tallies: HashMap<&UserId, Tally> = HashMap::new();

    for log in sources
        .usage_logs
        .iter()
        .filter(|log| window.contains_instant(log.started_at))
    {
        let distance = log
            .km_driven
            .filter(|km| km.is_finite() && *km >= 0.0)
            .unwrap_or(0.0);
        tallies.entry(&log.operator_id).or_default().km += distance;
    }
    for incident in sources
        .incidents
        .iter()
        .filter(|incident| window.contains_date(incident.date))
    {
        tallies.entry(&incident.operator_id).or_default().incidents += 1;
    }
    for checklist in sources
        .checklists
        .iter()
        .filter(|checklist| window.contains_date(checklist.date))
    {
        tallies.entry(&checklist.operator_id).or_default().checklists += 1;
    }

    users
        .iter()
        .filter(|user| user.is_operator())
        .map(|operator| match tallies.get(&operator.id) {
            Some(tally) => Indicator {
                operator_id: operator.id.clone(),
                operator_name: operator.name.clone(),
                km_driven_this_week: tally.km,
                incidents_this_week: saturating_count(tally.incidents),
                checklists_this_week: saturating_count(tally.checklists),
            },
            None => Indicator::idle(operator),
        })
        .collect()
}

fn saturating_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Fetches every source for a window and aggregates it.
///
/// A single failed fetch fails the whole computation; no partial indicator
/// list is ever returned.
pub struct AggregationEngine {
    gateways: Gateways,
}

impl AggregationEngine {
    /// Create an engine reading from `gateways`.
    #[must_use]
    pub fn new(gateways: Gateways) -> Self {
        Self { gateways }
    }

    /// Compute indicators for every operator over `window`.
    ///
    /// Users are fetched first; usage logs, incidents, and checklists are then
    /// fetched concurrently and all of them are awaited before aggregating.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Source`] with the first failure observed.
    #[tracing::instrument(name = "operator_indicators", skip_all, fields(window = %window))]
    pub async fn compute(&self, window: &TimeWindow) -> Result<Vec<Indicator>, AggregationError> {
        let fetched = self.fetch(window).await;
        let (users, usage_logs, incidents, checklists) = match fetched {
            Ok(fetched) => fetched,
            Err(cause) => {
                error!(
                    source = %cause.collection,
                    kind = %cause.kind,
                    error = %cause,
                    "operator indicator computation failed"
                );
                return Err(cause.into());
            }
        };

        debug!(
            users = users.len(),
            usage_logs = usage_logs.len(),
            incidents = incidents.len(),
            checklists = checklists.len(),
            "sources fetched"
        );

        let indicators = aggregate(
            &users,
            window,
            &ActivitySources {
                usage_logs: &usage_logs,
                incidents: &incidents,
                checklists: &checklists,
            },
        );
        info!(operators = indicators.len(), "operator indicators computed");
        Ok(indicators)
    }

    async fn fetch(
        &self,
        window: &TimeWindow,
    ) -> Result<(Vec<User>, Vec<UsageLog>, Vec<Incident>, Vec<Checklist>), SourceError> {
        let users = self.gateways.users.fetch_users().await?;

        let usage_query = UsageLogQuery::for_window(window);
        let incident_query = IncidentQuery::for_window(window);
        let checklist_query = ChecklistQuery::for_window(window);
        let (usage_logs, incidents, checklists) = tokio::try_join!(
            self.gateways.usage_logs.fetch_usage_logs(&usage_query),
            self.gateways.incidents.fetch_incidents(&incident_query),
            self.gateways.checklists.fetch_checklists(&checklist_query),
        )?;

        Ok((users, usage_logs, incidents, checklists))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Days, Duration, NaiveDate, Utc};

    use super::*;
    use crate::memory::{MemoryData, MemoryStore};
    use crate::model::{Role, UsageLogStatus, VehicleId};
    use crate::ports::{Source, SourceErrorKind};

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-10-21T12:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc)
    }

    fn window() -> TimeWindow {
        TimeWindow::weekly(now(), &Utc).expect("window")
    }

    fn user(id: &str, role: Role) -> User {
        User {
            id: UserId::from(id),
            name: format!("User {id}"),
            role,
        }
    }

    fn log(operator: &str, km: Option<f64>, started_at: DateTime<Utc>) -> UsageLog {
        UsageLog {
            id: format!("log-{operator}-{}", started_at.timestamp()),
            operator_id: UserId::from(operator),
            vehicle_id: VehicleId::from("TRK-01"),
            status: UsageLogStatus::Completed,
            started_at,
            km_driven: km,
        }
    }

    fn incident(operator: &str, date: NaiveDate) -> Incident {
        Incident {
            id: format!("inc-{operator}-{date}"),
            operator_id: UserId::from(operator),
            vehicle_id: None,
            date,
            description: "scratch".to_owned(),
        }
    }

    fn checklist(operator: &str, date: NaiveDate) -> Checklist {
        Checklist {
            id: format!("chk-{operator}-{date}"),
            operator_id: UserId::from(operator),
            vehicle_id: VehicleId::from("TRK-01"),
            date,
        }
    }

    fn no_activity<'a>() -> ActivitySources<'a> {
        ActivitySources {
            usage_logs: &[],
            incidents: &[],
            checklists: &[],
        }
    }

    #[test]
    fn sums_present_distances_and_ignores_missing_ones() {
        let users = vec![user("1", Role::Operator)];
        let logs = vec![
            log("1", Some(120.0), now()),
            log("1", None, now()),
            log("1", Some(30.0), now()),
        ];
        let indicators = aggregate(
            &users,
            &window(),
            &ActivitySources {
                usage_logs: &logs,
                ..no_activity()
            },
        );

        let indicator = indicators.first().expect("one indicator");
        assert!(
            (indicator.km_driven_this_week - 150.0).abs() < f64::EPSILON,
            "120 + 30, the missing value counts as zero"
        );
    }

    #[test]
    fn excludes_users_that_are_not_operators() {
        let users = vec![user("1", Role::Operator), user("2", Role::Admin)];
        let indicators = aggregate(&users, &window(), &no_activity());

        let ids: Vec<&str> = indicators
            .iter()
            .map(|indicator| indicator.operator_id.0.as_str())
            .collect();
        assert_eq!(ids, vec!["1"], "only the operator is reported");
    }

    #[test]
    fn idle_operators_get_all_zero_indicators() {
        let users = vec![user("1", Role::Operator), user("2", Role::Operator)];
        let logs = vec![log("1", Some(10.0), now())];
        let indicators = aggregate(
            &users,
            &window(),
            &ActivitySources {
                usage_logs: &logs,
                ..no_activity()
            },
        );

        let idle = indicators.get(1).expect("second operator");
        let second = users.get(1).expect("second user");
        assert_eq!(*idle, Indicator::idle(second), "zeroed indicator");
    }

    #[test]
    fn ignores_records_outside_the_window() {
        let window = window();
        let users = vec![user("1", Role::Operator)];
        let before = window.first_day() - Days::new(1);
        let after = window.last_day() + Days::new(1);
        let logs = vec![
            log("1", Some(50.0), window.start().with_timezone(&Utc) - Duration::seconds(1)),
            log("1", Some(5.0), window.end().with_timezone(&Utc)),
        ];
        let incidents = vec![incident("1", before), incident("1", window.first_day())];
        let checklists = vec![checklist("1", after), checklist("1", window.last_day())];

        let indicators = aggregate(
            &users,
            &window,
            &ActivitySources {
                usage_logs: &logs,
                incidents: &incidents,
                checklists: &checklists,
            },
        );

        let indicator = indicators.first().expect("one indicator");
        assert!((indicator.km_driven_this_week - 5.0).abs() < f64::EPSILON, "boundary log only");
        assert_eq!(indicator.incidents_this_week, 1, "first-day incident only");
        assert_eq!(indicator.checklists_this_week, 1, "last-day checklist only");
    }

    #[test]
    fn counts_duplicate_records_as_they_come() {
        let users = vec![user("1", Role::Operator)];
        let day = window().first_day();
        let incidents = vec![incident("1", day), incident("1", day)];
        let indicators = aggregate(
            &users,
            &window(),
            &ActivitySources {
                incidents: &incidents,
                ..no_activity()
            },
        );

        assert_eq!(
            indicators.first().map(|indicator| indicator.incidents_this_week),
            Some(2),
            "same id twice counts twice"
        );
    }

    #[test]
    fn negative_distances_count_as_missing() {
        let users = vec![user("1", Role::Operator)];
        let logs = vec![log("1", Some(-40.0), now()), log("1", Some(f64::NAN), now())];
        let indicators = aggregate(
            &users,
            &window(),
            &ActivitySources {
                usage_logs: &logs,
                ..no_activity()
            },
        );

        let km = indicators.first().map_or(-1.0, |indicator| indicator.km_driven_this_week);
        assert!(km.abs() < f64::EPSILON, "non-negative invariant holds");
    }

    #[test]
    fn output_follows_operator_input_order() {
        let users = vec![
            user("c", Role::Operator),
            user("a", Role::Operator),
            user("b", Role::Operator),
        ];
        let first = aggregate(&users, &window(), &no_activity());
        let second = aggregate(&users, &window(), &no_activity());

        let ids: Vec<&str> = first.iter().map(|indicator| indicator.operator_id.0.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"], "input order");
        assert_eq!(first, second, "stable across runs");
    }

    fn store() -> MemoryStore {
        let window = window();
        MemoryStore::new(MemoryData {
            users: vec![user("1", Role::Operator), user("2", Role::Manager)],
            usage_logs: vec![log("1", Some(42.0), now())],
            incidents: vec![incident("1", window.first_day())],
            checklists: vec![
                checklist("1", window.first_day()),
                checklist("1", window.last_day()),
            ],
            ..MemoryData::default()
        })
    }

    #[tokio::test]
    async fn computes_indicators_from_the_gateways() {
        let engine = AggregationEngine::new(Gateways::from_store(Arc::new(store())));

        let indicators = engine.compute(&window()).await.expect("report");

        assert_eq!(indicators.len(), 1, "managers are excluded");
        let indicator = indicators.first().expect("operator");
        assert!((indicator.km_driven_this_week - 42.0).abs() < f64::EPSILON, "km");
        assert_eq!(indicator.incidents_this_week, 1, "incidents");
        assert_eq!(indicator.checklists_this_week, 2, "checklists over the full week");
    }

    #[tokio::test]
    async fn any_failed_source_fails_the_whole_report() {
        for source in [
            Source::Users,
            Source::UsageLogs,
            Source::Incidents,
            Source::Checklists,
        ] {
            let store = store().with_failure(source, SourceErrorKind::Transient);
            let engine = AggregationEngine::new(Gateways::from_store(Arc::new(store)));

            let err = engine.compute(&window()).await.expect_err("no partial report");
            let AggregationError::Source(cause) = &err;
            assert_eq!(cause.collection, source, "first cause is wrapped");
            assert!(!err.is_missing_index(), "transient is not a missing index");
        }
    }

    #[tokio::test]
    async fn missing_index_is_called_out() {
        let store = store().with_failure(Source::Checklists, SourceErrorKind::PreconditionFailed);
        let engine = AggregationEngine::new(Gateways::from_store(Arc::new(store)));

        let err = engine.compute(&window()).await.expect_err("fails");

        assert!(err.is_missing_index(), "precondition failure flagged");
        assert!(
            err.to_string().contains("composite index"),
            "message guides towards the index: {err}"
        );
    }
}
