//! Representative composite queries that make the store report missing indexes.
//!
//! The probe does not read the store's index suggestions. It only guarantees
//! that every registered query is attempted exactly once, so one missing index
//! never hides another.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::gateways::Gateways;
use crate::model::{FineStatus, MaintenanceStatus, UsageLogStatus, UserId, VehicleId};
use crate::ports::{
    ChecklistGateway, ChecklistQuery, DateRange, FineGateway, FineQuery, MaintenanceGateway,
    MaintenanceQuery, SourceError, SourceErrorKind, UsageLogGateway, UsageLogQuery,
};

/// Identifier used for every equality filter of the standard queries.
pub const SENTINEL_ID: &str = "test";

#[async_trait]
/// A filtered query whose only purpose is to be planned by the store.
pub trait RepresentativeQuery: Send + Sync {
    /// Name shown in outcomes and logs.
    fn name(&self) -> &str;

    /// Issue the query, discarding its results.
    ///
    /// # Errors
    ///
    /// Returns the store's [`SourceError`] unchanged.
    async fn execute(&self) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
/// State of one representative query.
pub enum ProbeStatus {
    /// Registered but not attempted yet.
    Pending,
    /// The store planned and answered the query.
    Success,
    /// The store reported a missing composite index.
    ExpectedFailure {
        /// Store-provided detail.
        message: String,
    },
    /// Any other failure.
    UnexpectedFailure {
        /// Failure class.
        kind: SourceErrorKind,
        /// Store-provided detail.
        message: String,
    },
}

impl ProbeStatus {
    fn from_result(result: Result<(), SourceError>) -> Self {
        match result {
            Ok(()) => ProbeStatus::Success,
            Err(err) => match err.kind {
                SourceErrorKind::PreconditionFailed => ProbeStatus::ExpectedFailure {
                    message: err.message,
                },
                SourceErrorKind::Transient | SourceErrorKind::Unknown => {
                    ProbeStatus::UnexpectedFailure {
                        kind: err.kind,
                        message: err.message,
                    }
                }
            },
        }
    }
}

impl fmt::Display for ProbeStatus {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeStatus::Pending => write!(formatter, "pending"),
            ProbeStatus::Success => write!(formatter, "ok"),
            ProbeStatus::ExpectedFailure { .. } => write!(formatter, "index missing"),
            ProbeStatus::UnexpectedFailure { kind, .. } => write!(formatter, "failed ({kind})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Result of one representative query.
pub struct ProbeOutcome {
    /// Query name.
    pub query: String,
    /// Final state.
    pub status: ProbeStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Per-state counts over a probe run.
pub struct ProbeSummary {
    /// Queries still pending.
    pub pending: usize,
    /// Queries the store answered.
    pub succeeded: usize,
    /// Queries that need a composite index.
    pub missing_indexes: usize,
    /// Queries that failed for another reason.
    pub failed: usize,
}

impl From<&[ProbeOutcome]> for ProbeSummary {
    fn from(outcomes: &[ProbeOutcome]) -> Self {
        outcomes
            .iter()
            .fold(Self::default(), |mut summary, outcome| {
                match outcome.status {
                    ProbeStatus::Pending => summary.pending += 1,
                    ProbeStatus::Success => summary.succeeded += 1,
                    ProbeStatus::ExpectedFailure { .. } => summary.missing_indexes += 1,
                    ProbeStatus::UnexpectedFailure { .. } => summary.failed += 1,
                }
                summary
            })
    }
}

/// The composite queries issued by the system check.
pub enum StandardQuery {
    /// Checklists by vehicle, operator, and day.
    Checklists(Arc<dyn ChecklistGateway>, ChecklistQuery),
    /// Fines by vehicle, status, and date range.
    Fines(Arc<dyn FineGateway>, FineQuery),
    /// Maintenance orders by vehicle and status.
    Maintenances(Arc<dyn MaintenanceGateway>, MaintenanceQuery),
    /// Usage logs by vehicle, operator, status, and date range.
    UsageLogs(Arc<dyn UsageLogGateway>, UsageLogQuery),
}

impl StandardQuery {
    /// The four queries, in execution order, using sentinel filters and `today`.
    #[must_use]
    pub fn all(gateways: &Gateways, today: NaiveDate) -> Vec<Self> {
        let vehicle = || Some(VehicleId::from(SENTINEL_ID));
        let operator = || Some(UserId::from(SENTINEL_ID));
        let days = Some(DateRange::day(today));

        vec![
            StandardQuery::Checklists(
                Arc::clone(&gateways.checklists),
                ChecklistQuery {
                    vehicle_id: vehicle(),
                    operator_id: operator(),
                    days,
                },
            ),
            StandardQuery::Fines(
                Arc::clone(&gateways.fines),
                FineQuery {
                    vehicle_id: vehicle(),
                    status: Some(FineStatus::Pending),
                    days,
                },
            ),
            StandardQuery::Maintenances(
                Arc::clone(&gateways.maintenances),
                MaintenanceQuery {
                    vehicle_id: vehicle(),
                    status: Some(MaintenanceStatus::Planned),
                },
            ),
            StandardQuery::UsageLogs(
                Arc::clone(&gateways.usage_logs),
                UsageLogQuery {
                    vehicle_id: vehicle(),
                    operator_id: operator(),
                    status: Some(UsageLogStatus::Completed),
                    window: None,
                    days,
                },
            ),
        ]
    }
}

#[async_trait]
impl RepresentativeQuery for StandardQuery {
    fn name(&self) -> &str {
        match self {
            StandardQuery::Checklists(..) => "checklists by vehicle, operator and day",
            StandardQuery::Fines(..) => "fines by vehicle, status and date range",
            StandardQuery::Maintenances(..) => "maintenances by vehicle and status",
            StandardQuery::UsageLogs(..) => "usage logs by vehicle, operator, status and date range",
        }
    }

    async fn execute(&self) -> Result<(), SourceError> {
        match self {
            StandardQuery::Checklists(gateway, query) => {
                gateway.fetch_checklists(query).await.map(drop)
            }
            StandardQuery::Fines(gateway, query) => gateway.fetch_fines(query).await.map(drop),
            StandardQuery::Maintenances(gateway, query) => {
                gateway.fetch_maintenances(query).await.map(drop)
            }
            StandardQuery::UsageLogs(gateway, query) => {
                gateway.fetch_usage_logs(query).await.map(drop)
            }
        }
    }
}

/// Runs every registered query once and reports each outcome separately.
///
/// Unlike [`crate::AggregationEngine`], a failure never stops the batch.
#[derive(Default)]
pub struct IndexProvisioningProbe {
    queries: Vec<Box<dyn RepresentativeQuery>>,
}

impl IndexProvisioningProbe {
    /// Probe without queries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe with the standard system-check queries.
    #[must_use]
    pub fn standard(gateways: &Gateways, today: NaiveDate) -> Self {
        StandardQuery::all(gateways, today)
            .into_iter()
            .fold(Self::new(), |probe, query| probe.register(query))
    }

    /// Append a query; queries run and report in registration order.
    #[must_use]
    pub fn register<Q: RepresentativeQuery + 'static>(mut self, query: Q) -> Self {
        self.queries.push(Box::new(query));
        self
    }

    /// Every registered query in its initial state.
    #[must_use]
    pub fn pending(&self) -> Vec<ProbeOutcome> {
        self.queries
            .iter()
            .map(|query| ProbeOutcome {
                query: query.name().to_owned(),
                status: ProbeStatus::Pending,
            })
            .collect()
    }

    /// Attempt every query once, sequentially, and collect the outcomes.
    #[tracing::instrument(name = "index_probe", skip_all, fields(queries = self.queries.len()))]
    pub async fn run(&self) -> Vec<ProbeOutcome> {
        let mut outcomes = Vec::with_capacity(self.queries.len());

        for query in &self.queries {
            let status = ProbeStatus::from_result(query.execute().await);
            match &status {
                ProbeStatus::Pending | ProbeStatus::Success => {
                    info!(query = query.name(), outcome = "success", "representative query answered");
                }
                ProbeStatus::ExpectedFailure { message } => {
                    warn!(
                        query = query.name(),
                        outcome = "expected_failure",
                        detail = %message,
                        "representative query needs a composite index; check the store's index suggestion"
                    );
                }
                ProbeStatus::UnexpectedFailure { kind, message } => {
                    error!(
                        query = query.name(),
                        outcome = "unexpected_failure",
                        kind = %kind,
                        detail = %message,
                        "representative query failed unexpectedly"
                    );
                }
            }
            outcomes.push(ProbeOutcome {
                query: query.name().to_owned(),
                status,
            });
        }

        let summary = ProbeSummary::from(outcomes.as_slice());
        info!(
            succeeded = summary.succeeded,
            missing_indexes = summary.missing_indexes,
            failed = summary.failed,
            "index provisioning probe finished"
        );
        outcomes
    }
}
