//! Traits describing source gateway capabilities and shared query types.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::{
    Checklist, ChecklistItemDefinition, Fine, FineStatus, Incident, Maintenance,
    MaintenanceStatus, UsageLog, UsageLogStatus, User, UserId, VehicleId,
};
use crate::window::TimeWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Record collections reachable through a gateway.
pub enum Source {
    /// User accounts.
    Users,
    /// Vehicle usage logs.
    UsageLogs,
    /// Reported incidents.
    Incidents,
    /// Pre-trip checklists.
    Checklists,
    /// Traffic fines.
    Fines,
    /// Maintenance orders.
    Maintenances,
    /// Checklist item configuration.
    ChecklistDefinitions,
}

impl fmt::Display for Source {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            Source::Users => "users",
            Source::UsageLogs => "usage logs",
            Source::Incidents => "incidents",
            Source::Checklists => "checklists",
            Source::Fines => "fines",
            Source::Maintenances => "maintenances",
            Source::ChecklistDefinitions => "checklist definitions",
        };
        write!(formatter, "{slug}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Failure classes a store can report.
pub enum SourceErrorKind {
    /// The store cannot plan the query, usually because a composite index is missing.
    PreconditionFailed,
    /// Temporary condition such as a timeout or an unavailable backend.
    Transient,
    /// Anything else.
    Unknown,
}

impl fmt::Display for SourceErrorKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            SourceErrorKind::PreconditionFailed => "precondition failed",
            SourceErrorKind::Transient => "transient",
            SourceErrorKind::Unknown => "unknown",
        };
        write!(formatter, "{slug}")
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Fetching {collection} failed ({kind}): {message}")]
/// Error returned by every gateway call.
pub struct SourceError {
    /// Collection that was queried.
    pub collection: Source,
    /// Failure class.
    pub kind: SourceErrorKind,
    /// Store-provided detail.
    pub message: String,
}

impl SourceError {
    /// Construct a new error.
    #[must_use]
    pub fn new<M: Into<String>>(collection: Source, kind: SourceErrorKind, message: M) -> Self {
        Self {
            collection,
            kind,
            message: message.into(),
        }
    }

    /// Whether the store reported a missing index.
    #[must_use]
    pub fn is_precondition_failed(&self) -> bool {
        self.kind == SourceErrorKind::PreconditionFailed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Inclusive range of calendar days.
pub struct DateRange {
    /// First day (inclusive).
    pub start: NaiveDate,
    /// Last day (inclusive).
    pub end: NaiveDate,
}

impl DateRange {
    /// Range covering a single day.
    #[must_use]
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Whether `date` lies inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl From<&TimeWindow> for DateRange {
    fn from(window: &TimeWindow) -> Self {
        Self {
            start: window.first_day(),
            end: window.last_day(),
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Filter for usage log queries.
pub struct UsageLogQuery {
    /// Only logs of this vehicle.
    pub vehicle_id: Option<VehicleId>,
    /// Only logs of this operator.
    pub operator_id: Option<UserId>,
    /// Only logs in this status.
    pub status: Option<UsageLogStatus>,
    /// Only logs started inside this window.
    pub window: Option<TimeWindow>,
    /// Only logs started on these UTC calendar days.
    pub days: Option<DateRange>,
}

impl UsageLogQuery {
    /// All logs started inside `window`.
    #[must_use]
    pub fn for_window(window: &TimeWindow) -> Self {
        Self {
            window: Some(*window),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Filter for incident queries.
pub struct IncidentQuery {
    /// Only incidents of this operator.
    pub operator_id: Option<UserId>,
    /// Only incidents on these days.
    pub days: Option<DateRange>,
}

impl IncidentQuery {
    /// All incidents on the days of `window`.
    #[must_use]
    pub fn for_window(window: &TimeWindow) -> Self {
        Self {
            days: Some(window.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Filter for checklist queries.
pub struct ChecklistQuery {
    /// Only checklists of this vehicle.
    pub vehicle_id: Option<VehicleId>,
    /// Only checklists of this operator.
    pub operator_id: Option<UserId>,
    /// Only checklists on these days.
    pub days: Option<DateRange>,
}

impl ChecklistQuery {
    /// All checklists on the days of `window`.
    #[must_use]
    pub fn for_window(window: &TimeWindow) -> Self {
        Self {
            days: Some(window.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
/// Filter for fine queries.
pub struct FineQuery {
    /// Only fines of this vehicle.
    pub vehicle_id: Option<VehicleId>,
    /// Only fines in this status.
    pub status: Option<FineStatus>,
    /// Only fines issued on these days.
    pub days: Option<DateRange>,
}

#[derive(Debug, Clone, Default)]
/// Filter for maintenance queries.
pub struct MaintenanceQuery {
    /// Only orders of this vehicle.
    pub vehicle_id: Option<VehicleId>,
    /// Only orders in this status.
    pub status: Option<MaintenanceStatus>,
}

#[async_trait]
/// Read access to user accounts.
pub trait UserGateway: Send + Sync {
    /// Fetch every user regardless of role.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the store request fails.
    async fn fetch_users(&self) -> Result<Vec<User>, SourceError>;
}

#[async_trait]
/// Read access to vehicle usage logs.
pub trait UsageLogGateway: Send + Sync {
    /// Fetch usage logs matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the store request fails.
    async fn fetch_usage_logs(&self, query: &UsageLogQuery) -> Result<Vec<UsageLog>, SourceError>;
}

#[async_trait]
/// Read access to incidents.
pub trait IncidentGateway: Send + Sync {
    /// Fetch incidents matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the store request fails.
    async fn fetch_incidents(&self, query: &IncidentQuery) -> Result<Vec<Incident>, SourceError>;
}

#[async_trait]
/// Read access to checklists.
pub trait ChecklistGateway: Send + Sync {
    /// Fetch checklists matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the store request fails.
    async fn fetch_checklists(&self, query: &ChecklistQuery)
    -> Result<Vec<Checklist>, SourceError>;
}

#[async_trait]
/// Read access to fines.
pub trait FineGateway: Send + Sync {
    /// Fetch fines matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the store request fails.
    async fn fetch_fines(&self, query: &FineQuery) -> Result<Vec<Fine>, SourceError>;
}

#[async_trait]
/// Read access to maintenance orders.
pub trait MaintenanceGateway: Send + Sync {
    /// Fetch maintenance orders matching `query`.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the store request fails.
    async fn fetch_maintenances(
        &self,
        query: &MaintenanceQuery,
    ) -> Result<Vec<Maintenance>, SourceError>;
}

#[async_trait]
/// Access to checklist item configuration.
pub trait ChecklistDefinitionGateway: Send + Sync {
    /// Fetch every stored definition.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the store request fails.
    async fn list_definitions(&self) -> Result<Vec<ChecklistItemDefinition>, SourceError>;

    /// Store `definition` unless one with the same key exists.
    ///
    /// Implementations must perform the existence check and the write as one
    /// atomic operation. Returns `true` when the definition was created.
    ///
    /// # Errors
    ///
    /// Returns a [`SourceError`] when the store request fails.
    async fn create_definition_if_absent(
        &self,
        definition: &ChecklistItemDefinition,
    ) -> Result<bool, SourceError>;
}
