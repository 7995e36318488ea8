//! In-process store implementing every gateway.
//!
//! Filters behave like the Firestore adapter's queries. Failures can be injected
//! per collection to exercise error paths without a backend.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, NaiveDate, TimeZone, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::model::{
    Checklist, ChecklistItemDefinition, Fine, FineStatus, Incident, Maintenance,
    MaintenanceStatus, Role, UsageLog, UsageLogStatus, User, UserId, VehicleId,
};
use crate::ports::{
    ChecklistDefinitionGateway, ChecklistGateway, ChecklistQuery, FineGateway, FineQuery,
    IncidentGateway, IncidentQuery, MaintenanceGateway, MaintenanceQuery, Source, SourceError,
    SourceErrorKind, UsageLogGateway, UsageLogQuery, UserGateway,
};
use crate::window::{InvalidWindowError, TimeWindow};

#[derive(Debug, Clone, Default)]
/// Records held by a [`MemoryStore`].
pub struct MemoryData {
    /// User accounts.
    pub users: Vec<User>,
    /// Vehicle usage logs.
    pub usage_logs: Vec<UsageLog>,
    /// Incidents.
    pub incidents: Vec<Incident>,
    /// Checklists.
    pub checklists: Vec<Checklist>,
    /// Fines.
    pub fines: Vec<Fine>,
    /// Maintenance orders.
    pub maintenances: Vec<Maintenance>,
    /// Checklist item definitions.
    pub definitions: Vec<ChecklistItemDefinition>,
}

/// Store keeping all records in memory.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<MemoryData>,
    failures: RwLock<HashMap<Source, SourceErrorKind>>,
    calls: Mutex<HashMap<Source, usize>>,
}

impl MemoryStore {
    /// Store pre-filled with `data`.
    #[must_use]
    pub fn new(data: MemoryData) -> Self {
        Self {
            data: RwLock::new(data),
            ..Self::default()
        }
    }

    /// Make every call against `source` fail with `kind`.
    #[must_use]
    pub fn with_failure(mut self, source: Source, kind: SourceErrorKind) -> Self {
        self.failures.get_mut().insert(source, kind);
        self
    }

    /// Make every further call against `source` fail with `kind`.
    pub async fn fail_source(&self, source: Source, kind: SourceErrorKind) {
        self.failures.write().await.insert(source, kind);
    }

    /// Stop injecting failures for `source`.
    pub async fn heal_source(&self, source: Source) {
        self.failures.write().await.remove(&source);
    }

    /// Number of gateway calls made against `source`.
    pub async fn calls(&self, source: Source) -> usize {
        self.calls.lock().await.get(&source).copied().unwrap_or(0)
    }

    /// Snapshot of the stored checklist item definitions.
    pub async fn definitions(&self) -> Vec<ChecklistItemDefinition> {
        self.data.read().await.definitions.clone()
    }

    /// Store seeded with a small fleet and activity in the week containing `now`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWindowError`] if the week cannot be derived.
    pub fn demo<Tz: TimeZone>(now: DateTime<Utc>, tz: &Tz) -> Result<Self, InvalidWindowError> {
        let window = TimeWindow::weekly(now, tz)?;
        Ok(Self::new(demo_data(&window)))
    }

    async fn enter(&self, source: Source) -> Result<(), SourceError> {
        *self.calls.lock().await.entry(source).or_insert(0) += 1;

        match self.failures.read().await.get(&source) {
            Some(SourceErrorKind::PreconditionFailed) => Err(SourceError::new(
                source,
                SourceErrorKind::PreconditionFailed,
                "The query requires an index.",
            )),
            Some(kind) => Err(SourceError::new(source, *kind, "injected failure")),
            None => Ok(()),
        }
    }
}

fn matches_filter<T: PartialEq>(filter: Option<&T>, value: &T) -> bool {
    filter.is_none_or(|expected| expected == value)
}

#[async_trait]
impl UserGateway for MemoryStore {
    async fn fetch_users(&self) -> Result<Vec<User>, SourceError> {
        self.enter(Source::Users).await?;
        Ok(self.data.read().await.users.clone())
    }
}

#[async_trait]
impl UsageLogGateway for MemoryStore {
    async fn fetch_usage_logs(&self, query: &UsageLogQuery) -> Result<Vec<UsageLog>, SourceError> {
        self.enter(Source::UsageLogs).await?;
        let data = self.data.read().await;

        Ok(data
            .usage_logs
            .iter()
            .filter(|log| matches_filter(query.vehicle_id.as_ref(), &log.vehicle_id))
            .filter(|log| matches_filter(query.operator_id.as_ref(), &log.operator_id))
            .filter(|log| matches_filter(query.status.as_ref(), &log.status))
            .filter(|log| {
                query
                    .window
                    .is_none_or(|window| window.contains_instant(log.started_at))
            })
            .filter(|log| {
                query
                    .days
                    .is_none_or(|days| days.contains(log.started_at.date_naive()))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IncidentGateway for MemoryStore {
    async fn fetch_incidents(&self, query: &IncidentQuery) -> Result<Vec<Incident>, SourceError> {
        self.enter(Source::Incidents).await?;
        let data = self.data.read().await;

        Ok(data
            .incidents
            .iter()
            .filter(|incident| matches_filter(query.operator_id.as_ref(), &incident.operator_id))
            .filter(|incident| query.days.is_none_or(|days| days.contains(incident.date)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChecklistGateway for MemoryStore {
    async fn fetch_checklists(
        &self,
        query: &ChecklistQuery,
    ) -> Result<Vec<Checklist>, SourceError> {
        self.enter(Source::Checklists).await?;
        let data = self.data.read().await;

        Ok(data
            .checklists
            .iter()
            .filter(|checklist| matches_filter(query.vehicle_id.as_ref(), &checklist.vehicle_id))
            .filter(|checklist| matches_filter(query.operator_id.as_ref(), &checklist.operator_id))
            .filter(|checklist| query.days.is_none_or(|days| days.contains(checklist.date)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl FineGateway for MemoryStore {
    async fn fetch_fines(&self, query: &FineQuery) -> Result<Vec<Fine>, SourceError> {
        self.enter(Source::Fines).await?;
        let data = self.data.read().await;

        Ok(data
            .fines
            .iter()
            .filter(|fine| matches_filter(query.vehicle_id.as_ref(), &fine.vehicle_id))
            .filter(|fine| matches_filter(query.status.as_ref(), &fine.status))
            .filter(|fine| query.days.is_none_or(|days| days.contains(fine.date)))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl MaintenanceGateway for MemoryStore {
    async fn fetch_maintenances(
        &self,
        query: &MaintenanceQuery,
    ) -> Result<Vec<Maintenance>, SourceError> {
        self.enter(Source::Maintenances).await?;
        let data = self.data.read().await;

        Ok(data
            .maintenances
            .iter()
            .filter(|order| matches_filter(query.vehicle_id.as_ref(), &order.vehicle_id))
            .filter(|order| matches_filter(query.status.as_ref(), &order.status))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChecklistDefinitionGateway for MemoryStore {
    async fn list_definitions(&self) -> Result<Vec<ChecklistItemDefinition>, SourceError> {
        self.enter(Source::ChecklistDefinitions).await?;
        Ok(self.data.read().await.definitions.clone())
    }

    async fn create_definition_if_absent(
        &self,
        definition: &ChecklistItemDefinition,
    ) -> Result<bool, SourceError> {
        self.enter(Source::ChecklistDefinitions).await?;

        // Check and insert under one write guard.
        let mut data = self.data.write().await;
        if data
            .definitions
            .iter()
            .any(|existing| existing.key == definition.key)
        {
            return Ok(false);
        }
        data.definitions.push(definition.clone());
        Ok(true)
    }
}

fn demo_data(window: &TimeWindow) -> MemoryData {
    let week_start = window.start().with_timezone(&Utc);
    let first_day = window.first_day();
    let day = |offset: u64| -> NaiveDate { first_day + Days::new(offset) };
    let user = |id: &str, name: &str, role: Role| User {
        id: UserId::from(id),
        name: name.to_owned(),
        role,
    };
    let log = |id: &str, operator: &str, vehicle: &str, hours: i64, km: Option<f64>| UsageLog {
        id: id.to_owned(),
        operator_id: UserId::from(operator),
        vehicle_id: VehicleId::from(vehicle),
        status: if km.is_some() {
            UsageLogStatus::Completed
        } else {
            UsageLogStatus::InProgress
        },
        started_at: week_start + Duration::hours(hours),
        km_driven: km,
    };
    let checklist = |id: &str, operator: &str, vehicle: &str, offset: u64| Checklist {
        id: id.to_owned(),
        operator_id: UserId::from(operator),
        vehicle_id: VehicleId::from(vehicle),
        date: day(offset),
    };

    MemoryData {
        users: vec![
            user("op-ana", "Ana Souza", Role::Operator),
            user("op-bruno", "Bruno Lima", Role::Operator),
            user("op-carla", "Carla Mendes", Role::Operator),
            user("adm-diego", "Diego Rocha", Role::Admin),
        ],
        usage_logs: vec![
            log("log-1", "op-ana", "TRK-01", 8, Some(120.0)),
            log("log-2", "op-ana", "TRK-01", 32, None),
            log("log-3", "op-ana", "TRK-02", 56, Some(30.0)),
            log("log-4", "op-bruno", "VAN-07", 9, Some(212.5)),
            log("log-5", "op-bruno", "VAN-07", -30, Some(80.0)),
        ],
        incidents: vec![Incident {
            id: "inc-1".to_owned(),
            operator_id: UserId::from("op-bruno"),
            vehicle_id: Some(VehicleId::from("VAN-07")),
            date: day(1),
            description: "Side mirror damaged while reversing".to_owned(),
        }],
        checklists: vec![
            checklist("chk-1", "op-ana", "TRK-01", 0),
            checklist("chk-2", "op-ana", "TRK-02", 2),
            checklist("chk-3", "op-bruno", "VAN-07", 0),
        ],
        fines: vec![Fine {
            id: "fine-1".to_owned(),
            vehicle_id: VehicleId::from("VAN-07"),
            operator_id: Some(UserId::from("op-bruno")),
            status: FineStatus::Pending,
            date: day(1),
            amount: 195.23,
        }],
        maintenances: vec![Maintenance {
            id: "mnt-1".to_owned(),
            vehicle_id: VehicleId::from("TRK-02"),
            status: MaintenanceStatus::Planned,
            scheduled_for: Some(day(4)),
            description: "Brake pad replacement".to_owned(),
        }],
        definitions: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::DateRange;

    fn day(raw: &str) -> NaiveDate {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").expect("valid date")
    }

    #[tokio::test]
    async fn filters_fines_by_every_given_field() {
        let fine = |id: &str, vehicle: &str, status: FineStatus, date: &str| Fine {
            id: id.to_owned(),
            vehicle_id: VehicleId::from(vehicle),
            operator_id: None,
            status,
            date: day(date),
            amount: 100.0,
        };
        let store = MemoryStore::new(MemoryData {
            fines: vec![
                fine("f1", "TRK-01", FineStatus::Pending, "2026-10-20"),
                fine("f2", "TRK-01", FineStatus::Paid, "2026-10-20"),
                fine("f3", "TRK-02", FineStatus::Pending, "2026-10-20"),
                fine("f4", "TRK-01", FineStatus::Pending, "2026-10-27"),
            ],
            ..MemoryData::default()
        });

        let found = store
            .fetch_fines(&FineQuery {
                vehicle_id: Some(VehicleId::from("TRK-01")),
                status: Some(FineStatus::Pending),
                days: Some(DateRange::day(day("2026-10-20"))),
            })
            .await
            .expect("fines");

        let ids: Vec<&str> = found.iter().map(|fine| fine.id.as_str()).collect();
        assert_eq!(ids, vec!["f1"], "only the fully matching fine");
        assert_eq!(
            store.fetch_fines(&FineQuery::default()).await.expect("fines").len(),
            4,
            "empty query returns everything"
        );
    }

    #[tokio::test]
    async fn injected_failures_carry_kind_and_count_calls() {
        let store = MemoryStore::default().with_failure(Source::Incidents, SourceErrorKind::Transient);

        let err = store
            .fetch_incidents(&IncidentQuery::default())
            .await
            .expect_err("injected");
        assert_eq!(err.kind, SourceErrorKind::Transient, "kind preserved");
        assert_eq!(err.collection, Source::Incidents, "collection preserved");
        assert_eq!(store.calls(Source::Incidents).await, 1, "failed call still counted");

        store.heal_source(Source::Incidents).await;
        assert!(
            store.fetch_incidents(&IncidentQuery::default()).await.is_ok(),
            "healed source answers again"
        );
    }

    #[tokio::test]
    async fn conditional_create_only_inserts_once() {
        let store = MemoryStore::default();
        let definition = ChecklistItemDefinition::new("tires", "Tires", 1);

        assert!(
            store.create_definition_if_absent(&definition).await.expect("create"),
            "first insert creates"
        );
        assert!(
            !store.create_definition_if_absent(&definition).await.expect("create"),
            "second insert is a no-op"
        );
        assert_eq!(store.definitions().await.len(), 1, "single stored row");
    }

    #[tokio::test]
    async fn demo_store_has_activity_in_the_current_week() {
        let now = DateTime::parse_from_rfc3339("2026-10-21T12:00:00Z")
            .expect("timestamp")
            .with_timezone(&Utc);
        let store = MemoryStore::demo(now, &Utc).expect("demo");
        let window = TimeWindow::weekly(now, &Utc).expect("window");

        let logs = store
            .fetch_usage_logs(&UsageLogQuery::for_window(&window))
            .await
            .expect("logs");
        assert_eq!(logs.len(), 4, "one demo log lies in the previous week");
    }
}
