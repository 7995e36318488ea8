//! Domain data structures for users, vehicle activity, and checklist configuration.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
/// Identifier for a user account.
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(raw: &str) -> Self {
        UserId(raw.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Identifier for a vehicle.
pub struct VehicleId(pub String);

impl From<&str> for VehicleId {
    fn from(raw: &str) -> Self {
        VehicleId(raw.to_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
/// Role classifier stored on every user record.
pub enum Role {
    /// Vehicle or equipment operator, the subject of the weekly report.
    Operator,
    /// Back-office administrator.
    Admin,
    /// Fleet manager.
    Manager,
    /// Role string not known to this version.
    Other(String),
}

impl Role {
    fn as_str(&self) -> &str {
        match self {
            Role::Operator => "operator",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Other(raw) => raw.as_str(),
        }
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "operator" => Role::Operator,
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            _ => Role::Other(raw),
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.as_str().to_owned()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// User account as stored in the `users` collection.
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Role classifier.
    pub role: Role,
}

impl User {
    /// Whether this user takes part in operator reporting.
    #[must_use]
    pub fn is_operator(&self) -> bool {
        self.role == Role::Operator
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle of a vehicle usage log.
pub enum UsageLogStatus {
    /// Vehicle checked out and not yet returned.
    InProgress,
    /// Vehicle returned and odometer recorded.
    Completed,
}

impl UsageLogStatus {
    /// Value stored in the `status` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UsageLogStatus::InProgress => "in_progress",
            UsageLogStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One vehicle checkout by an operator.
pub struct UsageLog {
    /// Unique identifier.
    pub id: String,
    /// Operator who drove the vehicle.
    pub operator_id: UserId,
    /// Vehicle that was used.
    pub vehicle_id: VehicleId,
    /// Lifecycle status.
    pub status: UsageLogStatus,
    /// Checkout time.
    pub started_at: DateTime<Utc>,
    /// Distance driven, absent while the log is still open.
    pub km_driven: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Reported incident involving an operator.
pub struct Incident {
    /// Unique identifier.
    pub id: String,
    /// Operator involved.
    pub operator_id: UserId,
    /// Vehicle involved, if any.
    pub vehicle_id: Option<VehicleId>,
    /// Day the incident happened.
    pub date: NaiveDate,
    /// Free-form description.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Pre-trip checklist filled in by an operator.
pub struct Checklist {
    /// Unique identifier.
    pub id: String,
    /// Operator who signed the checklist.
    pub operator_id: UserId,
    /// Vehicle inspected.
    pub vehicle_id: VehicleId,
    /// Day of the inspection.
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Payment state of a traffic fine.
pub enum FineStatus {
    /// Not yet paid.
    Pending,
    /// Settled.
    Paid,
    /// Under appeal.
    Appealed,
}

impl FineStatus {
    /// Value stored in the `status` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FineStatus::Pending => "pending",
            FineStatus::Paid => "paid",
            FineStatus::Appealed => "appealed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Traffic fine issued against a vehicle.
pub struct Fine {
    /// Unique identifier.
    pub id: String,
    /// Fined vehicle.
    pub vehicle_id: VehicleId,
    /// Operator held responsible, when known.
    pub operator_id: Option<UserId>,
    /// Payment state.
    pub status: FineStatus,
    /// Day of the infraction.
    pub date: NaiveDate,
    /// Amount due.
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
/// Lifecycle of a maintenance order.
pub enum MaintenanceStatus {
    /// Scheduled but not started.
    Planned,
    /// Vehicle currently in the shop.
    InProgress,
    /// Work finished.
    Completed,
    /// Order dropped.
    Cancelled,
}

impl MaintenanceStatus {
    /// Value stored in the `status` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MaintenanceStatus::Planned => "planned",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Completed => "completed",
            MaintenanceStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Maintenance order for a vehicle.
pub struct Maintenance {
    /// Unique identifier.
    pub id: String,
    /// Vehicle being serviced.
    pub vehicle_id: VehicleId,
    /// Lifecycle status.
    pub status: MaintenanceStatus,
    /// Planned service day.
    pub scheduled_for: Option<NaiveDate>,
    /// Work description.
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Weekly performance figures for one operator.
///
/// Indicators are derived on every report run and never written back to a store.
pub struct Indicator {
    /// Operator the figures belong to.
    pub operator_id: UserId,
    /// Operator display name, carried for rendering.
    pub operator_name: String,
    /// Kilometres driven inside the window.
    pub km_driven_this_week: f64,
    /// Incidents inside the window.
    pub incidents_this_week: u32,
    /// Checklists inside the window.
    pub checklists_this_week: u32,
}

impl Indicator {
    /// Indicator for an operator without any recorded activity.
    #[must_use]
    pub fn idle(operator: &User) -> Self {
        Self {
            operator_id: operator.id.clone(),
            operator_name: operator.name.clone(),
            km_driven_this_week: 0.0,
            incidents_this_week: 0,
            checklists_this_week: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One line of the pre-trip checklist form.
pub struct ChecklistItemDefinition {
    /// Stable key, also used as the document id.
    pub key: String,
    /// Text shown to the operator.
    pub label: String,
    /// Position in the form.
    pub position: u32,
}

impl ChecklistItemDefinition {
    /// Build a definition from static parts.
    #[must_use]
    pub fn new(key: &str, label: &str, position: u32) -> Self {
        Self {
            key: key.to_owned(),
            label: label.to_owned(),
            position,
        }
    }
}
