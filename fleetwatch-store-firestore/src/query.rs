//! `structuredQuery` request bodies built from gateway queries.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::Serialize;

use fleetwatch_core::ports::{
    ChecklistQuery, DateRange, FineQuery, IncidentQuery, MaintenanceQuery, UsageLogQuery,
};

use crate::value::Value;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RunQueryRequest {
    structured_query: StructuredQuery,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredQuery {
    from: [CollectionSelector; 1],
    #[serde(rename = "where", skip_serializing_if = "Option::is_none")]
    filter: Option<Filter>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    order_by: Vec<Order>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectionSelector {
    collection_id: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
enum Filter {
    CompositeFilter(CompositeFilter),
    FieldFilter(FieldFilter),
}

#[derive(Debug, Serialize)]
struct CompositeFilter {
    op: &'static str,
    filters: Vec<Filter>,
}

#[derive(Debug, Serialize)]
struct FieldFilter {
    field: FieldReference,
    op: FieldOp,
    value: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FieldReference {
    field_path: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum FieldOp {
    Equal,
    GreaterThanOrEqual,
    LessThanOrEqual,
}

#[derive(Debug, Serialize)]
struct Order {
    field: FieldReference,
    direction: Direction,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum Direction {
    Ascending,
    Descending,
}

/// Accumulates equality and range filters for one collection.
pub(crate) struct QueryBuilder {
    collection: &'static str,
    filters: Vec<Filter>,
    order_by: Vec<Order>,
}

impl QueryBuilder {
    pub(crate) fn new(collection: &'static str) -> Self {
        Self {
            collection,
            filters: Vec::new(),
            order_by: Vec::new(),
        }
    }

    fn push(&mut self, field_path: &'static str, op: FieldOp, value: Value) {
        self.filters.push(Filter::FieldFilter(FieldFilter {
            field: FieldReference { field_path },
            op,
            value,
        }));
    }

    pub(crate) fn equal<S: AsRef<str>>(mut self, field_path: &'static str, value: Option<S>) -> Self {
        if let Some(value) = value {
            self.push(field_path, FieldOp::Equal, Value::string(value.as_ref()));
        }
        self
    }

    /// Inclusive range on a `YYYY-MM-DD` string field, newest first.
    pub(crate) fn days(mut self, field_path: &'static str, days: Option<DateRange>) -> Self {
        if let Some(range) = days {
            self.push(field_path, FieldOp::GreaterThanOrEqual, Value::string(&iso_day(range.start)));
            self.push(field_path, FieldOp::LessThanOrEqual, Value::string(&iso_day(range.end)));
            self.order(field_path, Direction::Descending);
        }
        self
    }

    /// Inclusive range on a timestamp field, newest first.
    pub(crate) fn instants(
        mut self,
        field_path: &'static str,
        range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    ) -> Self {
        if let Some((start, end)) = range {
            self.push(field_path, FieldOp::GreaterThanOrEqual, timestamp(start));
            self.push(field_path, FieldOp::LessThanOrEqual, timestamp(end));
            self.order(field_path, Direction::Descending);
        }
        self
    }

    pub(crate) fn ascending(mut self, field_path: &'static str) -> Self {
        self.order(field_path, Direction::Ascending);
        self
    }

    fn order(&mut self, field_path: &'static str, direction: Direction) {
        // One ordering per field; a second range on the same field keeps the first.
        if self
            .order_by
            .iter()
            .all(|order| order.field.field_path != field_path)
        {
            self.order_by.push(Order {
                field: FieldReference { field_path },
                direction,
            });
        }
    }

    pub(crate) fn build(mut self) -> RunQueryRequest {
        let filter = match self.filters.len() {
            0 => None,
            1 => self.filters.pop(),
            _ => Some(Filter::CompositeFilter(CompositeFilter {
                op: "AND",
                filters: self.filters,
            })),
        };

        RunQueryRequest {
            structured_query: StructuredQuery {
                from: [CollectionSelector {
                    collection_id: self.collection,
                }],
                filter,
                order_by: self.order_by,
            },
        }
    }
}

fn iso_day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn timestamp(instant: DateTime<Utc>) -> Value {
    Value::TimestampValue(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub(crate) fn usage_logs(collection: &'static str, query: &UsageLogQuery) -> RunQueryRequest {
    let window = query.window.map(|window| {
        (
            window.start().with_timezone(&Utc),
            window.end().with_timezone(&Utc),
        )
    });
    let days = query.days.and_then(|range| {
        let start = range.start.and_hms_opt(0, 0, 0)?.and_utc();
        let end = range.end.and_hms_opt(23, 59, 59)?.and_utc();
        Some((start, end))
    });

    QueryBuilder::new(collection)
        .equal("vehicleId", query.vehicle_id.as_ref().map(|id| &id.0))
        .equal("operatorId", query.operator_id.as_ref().map(|id| &id.0))
        .equal("status", query.status.map(|status| status.as_str()))
        .instants("startTime", window)
        .instants("startTime", days)
        .build()
}

pub(crate) fn incidents(collection: &'static str, query: &IncidentQuery) -> RunQueryRequest {
    QueryBuilder::new(collection)
        .equal("operatorId", query.operator_id.as_ref().map(|id| &id.0))
        .days("date", query.days)
        .build()
}

pub(crate) fn checklists(collection: &'static str, query: &ChecklistQuery) -> RunQueryRequest {
    QueryBuilder::new(collection)
        .equal("vehicleId", query.vehicle_id.as_ref().map(|id| &id.0))
        .equal("operatorId", query.operator_id.as_ref().map(|id| &id.0))
        .days("date", query.days)
        .build()
}

pub(crate) fn fines(collection: &'static str, query: &FineQuery) -> RunQueryRequest {
    QueryBuilder::new(collection)
        .equal("vehicleId", query.vehicle_id.as_ref().map(|id| &id.0))
        .equal("status", query.status.map(|status| status.as_str()))
        .days("date", query.days)
        .build()
}

pub(crate) fn maintenances(collection: &'static str, query: &MaintenanceQuery) -> RunQueryRequest {
    QueryBuilder::new(collection)
        .equal("vehicleId", query.vehicle_id.as_ref().map(|id| &id.0))
        .equal("status", query.status.map(|status| status.as_str()))
        .build()
}

#[cfg(test)]
mod tests {
    use fleetwatch_core::model::{FineStatus, MaintenanceStatus, UserId, VehicleId};
    use serde_json::json;

    use super::*;

    #[test]
    fn composite_query_filters_and_orders_the_range_field() {
        let day = NaiveDate::from_ymd_opt(2026, 10, 19).expect("valid date");
        let body = checklists(
            "checklists",
            &ChecklistQuery {
                vehicle_id: Some(VehicleId::from("test")),
                operator_id: Some(UserId::from("test")),
                days: Some(DateRange::day(day)),
            },
        );

        let eq = |field: &str, value: &str| {
            json!({"fieldFilter": {"field": {"fieldPath": field}, "op": "EQUAL", "value": {"stringValue": value}}})
        };
        let range = |op: &str| {
            json!({"fieldFilter": {"field": {"fieldPath": "date"}, "op": op, "value": {"stringValue": "2026-10-19"}}})
        };
        assert_eq!(
            serde_json::to_value(&body).expect("serializable"),
            json!({
                "structuredQuery": {
                    "from": [{"collectionId": "checklists"}],
                    "where": {"compositeFilter": {"op": "AND", "filters": [
                        eq("vehicleId", "test"),
                        eq("operatorId", "test"),
                        range("GREATER_THAN_OR_EQUAL"),
                        range("LESS_THAN_OR_EQUAL"),
                    ]}},
                    "orderBy": [{"field": {"fieldPath": "date"}, "direction": "DESCENDING"}],
                }
            }),
            "request matches the REST shape"
        );
    }

    #[test]
    fn single_filter_is_not_wrapped() {
        let body = maintenances(
            "maintenances",
            &MaintenanceQuery {
                vehicle_id: None,
                status: Some(MaintenanceStatus::Planned),
            },
        );
        let json = serde_json::to_value(&body).expect("serializable");

        assert_eq!(
            json.pointer("/structuredQuery/where/fieldFilter/value/stringValue"),
            Some(&json!("planned")),
            "bare field filter"
        );
        assert!(json.pointer("/structuredQuery/orderBy").is_none(), "no ordering without a range");
    }

    #[test]
    fn empty_query_reads_the_whole_collection() {
        let json = serde_json::to_value(fines("fines", &FineQuery::default())).expect("serializable");

        assert_eq!(
            json,
            json!({"structuredQuery": {"from": [{"collectionId": "fines"}]}}),
            "no filter, no ordering"
        );
    }

    #[test]
    fn fine_status_uses_the_stored_spelling() {
        let json = serde_json::to_value(fines(
            "fines",
            &FineQuery {
                status: Some(FineStatus::Pending),
                ..FineQuery::default()
            },
        ))
        .expect("serializable");

        assert_eq!(
            json.pointer("/structuredQuery/where/fieldFilter/value/stringValue"),
            Some(&json!("pending")),
            "lower-case status"
        );
    }
}
