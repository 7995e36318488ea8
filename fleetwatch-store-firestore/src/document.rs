//! Decoding of Firestore documents into model records.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use fleetwatch_core::model::{
    Checklist, ChecklistItemDefinition, Fine, FineStatus, Incident, Maintenance,
    MaintenanceStatus, Role, UsageLog, UsageLogStatus, User, UserId, VehicleId,
};

use crate::value::Value;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("document {document}: field `{field}` is missing or not a {expected}")]
pub(crate) struct DecodeError {
    document: String,
    field: &'static str,
    expected: &'static str,
}

/// One entry of a `runQuery` response; entries without a document only carry progress.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResult {
    pub(crate) document: Option<Document>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Document {
    /// Full resource name ending in the document id.
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

impl Document {
    pub(crate) fn id(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    fn present(&self, field: &str) -> Option<&Value> {
        self.fields.get(field).filter(|value| !value.is_null())
    }

    fn missing(&self, field: &'static str, expected: &'static str) -> DecodeError {
        DecodeError {
            document: self.id().to_owned(),
            field,
            expected,
        }
    }

    fn string(&self, field: &'static str) -> Result<String, DecodeError> {
        self.optional_string(field)
            .ok_or_else(|| self.missing(field, "string"))
    }

    fn optional_string(&self, field: &str) -> Option<String> {
        self.present(field).and_then(Value::as_str).map(str::to_owned)
    }

    fn number(&self, field: &str) -> Option<f64> {
        self.present(field).and_then(Value::as_f64)
    }

    fn timestamp(&self, field: &'static str) -> Result<DateTime<Utc>, DecodeError> {
        self.present(field)
            .and_then(Value::as_timestamp)
            .ok_or_else(|| self.missing(field, "timestamp"))
    }

    fn date(&self, field: &'static str) -> Result<NaiveDate, DecodeError> {
        self.present(field)
            .and_then(Value::as_date)
            .ok_or_else(|| self.missing(field, "date"))
    }

    fn status<T>(&self, field: &'static str, parse: fn(&str) -> Option<T>) -> Result<T, DecodeError> {
        self.present(field)
            .and_then(Value::as_str)
            .and_then(parse)
            .ok_or_else(|| self.missing(field, "known status"))
    }
}

/// Records that can be read from a Firestore document.
pub(crate) trait FromDocument: Sized {
    fn from_document(document: &Document) -> Result<Self, DecodeError>;
}

impl FromDocument for User {
    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            id: UserId(document.id().to_owned()),
            name: document.optional_string("name").unwrap_or_default(),
            role: Role::from(document.optional_string("role").unwrap_or_default()),
        })
    }
}

impl FromDocument for UsageLog {
    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            id: document.id().to_owned(),
            operator_id: UserId(document.string("operatorId")?),
            vehicle_id: VehicleId(document.string("vehicleId")?),
            status: document.status("status", usage_log_status)?,
            started_at: document.timestamp("startTime")?,
            km_driven: document.number("kmDriven"),
        })
    }
}

impl FromDocument for Incident {
    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            id: document.id().to_owned(),
            operator_id: UserId(document.string("operatorId")?),
            vehicle_id: document.optional_string("vehicleId").map(VehicleId),
            date: document.date("date")?,
            description: document.optional_string("description").unwrap_or_default(),
        })
    }
}

impl FromDocument for Checklist {
    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            id: document.id().to_owned(),
            operator_id: UserId(document.string("operatorId")?),
            vehicle_id: VehicleId(document.string("vehicleId")?),
            date: document.date("date")?,
        })
    }
}

impl FromDocument for Fine {
    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            id: document.id().to_owned(),
            vehicle_id: VehicleId(document.string("vehicleId")?),
            operator_id: document.optional_string("operatorId").map(UserId),
            status: document.status("status", fine_status)?,
            date: document.date("date")?,
            amount: document
                .number("amount")
                .ok_or_else(|| document.missing("amount", "number"))?,
        })
    }
}

impl FromDocument for Maintenance {
    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            id: document.id().to_owned(),
            vehicle_id: VehicleId(document.string("vehicleId")?),
            status: document.status("status", maintenance_status)?,
            scheduled_for: document.present("scheduledFor").and_then(Value::as_date),
            description: document.optional_string("description").unwrap_or_default(),
        })
    }
}

impl FromDocument for ChecklistItemDefinition {
    fn from_document(document: &Document) -> Result<Self, DecodeError> {
        Ok(Self {
            key: document.id().to_owned(),
            label: document.string("label")?,
            position: document
                .present("position")
                .and_then(Value::as_u32)
                .ok_or_else(|| document.missing("position", "non-negative integer"))?,
        })
    }
}

fn usage_log_status(raw: &str) -> Option<UsageLogStatus> {
    [UsageLogStatus::InProgress, UsageLogStatus::Completed]
        .into_iter()
        .find(|status| status.as_str() == raw)
}

fn fine_status(raw: &str) -> Option<FineStatus> {
    [FineStatus::Pending, FineStatus::Paid, FineStatus::Appealed]
        .into_iter()
        .find(|status| status.as_str() == raw)
}

fn maintenance_status(raw: &str) -> Option<MaintenanceStatus> {
    [
        MaintenanceStatus::Planned,
        MaintenanceStatus::InProgress,
        MaintenanceStatus::Completed,
        MaintenanceStatus::Cancelled,
    ]
    .into_iter()
    .find(|status| status.as_str() == raw)
}

/// Body of a `createDocument` request.
#[derive(Debug, Serialize)]
pub(crate) struct NewDocument {
    fields: BTreeMap<&'static str, Value>,
}

impl From<&ChecklistItemDefinition> for NewDocument {
    fn from(definition: &ChecklistItemDefinition) -> Self {
        Self {
            fields: BTreeMap::from([
                ("key", Value::string(&definition.key)),
                ("label", Value::string(&definition.label)),
                ("position", Value::integer(definition.position)),
            ]),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn document(value: serde_json::Value) -> Document {
        serde_json::from_value(value).expect("document json")
    }

    #[test]
    fn usage_log_without_distance_stays_open() {
        let log = UsageLog::from_document(&document(json!({
            "name": "projects/demo/databases/(default)/documents/vehicleUsageLogs/log-7",
            "fields": {
                "operatorId": {"stringValue": "op-ana"},
                "vehicleId": {"stringValue": "truck-3"},
                "status": {"stringValue": "in_progress"},
                "startTime": {"timestampValue": "2026-10-20T11:00:00.000Z"},
                "kmDriven": {"nullValue": null}
            }
        })))
        .expect("valid log");

        assert_eq!(log.id, "log-7", "id from the resource name");
        assert_eq!(log.status, UsageLogStatus::InProgress, "status decoded");
        assert_eq!(log.km_driven, None, "null distance is absent");
    }

    #[test]
    fn integer_distances_are_accepted() {
        let log = UsageLog::from_document(&document(json!({
            "name": "documents/vehicleUsageLogs/log-8",
            "fields": {
                "operatorId": {"stringValue": "op-ana"},
                "vehicleId": {"stringValue": "truck-3"},
                "status": {"stringValue": "completed"},
                "startTime": {"timestampValue": "2026-10-20T11:00:00Z"},
                "kmDriven": {"integerValue": "87"}
            }
        })))
        .expect("valid log");

        assert_eq!(log.km_driven, Some(87.0), "integer widened");
    }

    #[test]
    fn missing_required_field_is_reported() {
        let err = Checklist::from_document(&document(json!({
            "name": "documents/checklists/chk-1",
            "fields": {"vehicleId": {"stringValue": "truck-3"}, "date": {"stringValue": "2026-10-20"}}
        })))
        .expect_err("no operator");

        assert_eq!(
            err.to_string(),
            "document chk-1: field `operatorId` is missing or not a string",
            "field named"
        );
    }

    #[test]
    fn timestamped_checklist_dates_are_rejected() {
        let err = Checklist::from_document(&document(json!({
            "name": "documents/checklists/chk-4",
            "fields": {
                "operatorId": {"stringValue": "op-ana"},
                "vehicleId": {"stringValue": "truck-3"},
                "date": {"timestampValue": "2026-10-26T01:30:00Z"}
            }
        })))
        .expect_err("zone-dependent day");

        assert_eq!(
            err.to_string(),
            "document chk-4: field `date` is missing or not a date",
            "date field named"
        );
    }

    #[test]
    fn users_keep_unknown_roles() {
        let user = User::from_document(&document(json!({
            "name": "documents/users/u-9",
            "fields": {"name": {"stringValue": "Eva"}, "role": {"stringValue": "mechanic"}}
        })))
        .expect("valid user");

        assert!(!user.is_operator(), "not an operator");
        assert_eq!(user.role, Role::Other("mechanic".to_owned()), "raw role kept");
    }

    #[test]
    fn definitions_serialize_as_typed_fields() {
        let body = NewDocument::from(&ChecklistItemDefinition::new("tires", "Tires", 1));

        assert_eq!(
            serde_json::to_value(&body).expect("serializable"),
            json!({"fields": {
                "key": {"stringValue": "tires"},
                "label": {"stringValue": "Tires"},
                "position": {"integerValue": "1"}
            }}),
            "createDocument body"
        );
    }
}
