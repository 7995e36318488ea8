//! High-level service facade behind the admin surface.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use tracing::warn;

use crate::defaults::{DefaultDataInitializer, InitializationError};
use crate::engine::{AggregationEngine, AggregationError};
use crate::gateways::Gateways;
use crate::model::{ChecklistItemDefinition, Indicator};
use crate::ports::SourceError;
use crate::probe::{IndexProvisioningProbe, ProbeOutcome};
use crate::window::{InvalidWindowError, TimeWindow};

#[derive(thiserror::Error, Debug)]
/// Errors surfaced to the admin surface.
pub enum ServiceError {
    /// The reporting period could not be derived.
    #[error(transparent)]
    Window(#[from] InvalidWindowError),
    /// The weekly report failed as a whole.
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    /// Default data could not be guaranteed.
    #[error(transparent)]
    Initialization(#[from] InitializationError),
    /// Stored checklist definitions could not be read back.
    #[error(transparent)]
    Source(#[from] SourceError),
    /// The caller-imposed time limit elapsed.
    #[error("{operation} did not finish within {} seconds", .limit.as_secs_f32())]
    Timeout {
        /// Operation that was cut off.
        operation: &'static str,
        /// Configured limit.
        limit: Duration,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Indicators of every operator for one week.
pub struct WeeklyReport {
    /// Reporting period.
    pub window: TimeWindow,
    /// One entry per operator, in user order.
    pub indicators: Vec<Indicator>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Result of the administrative system check.
pub struct SystemCheckReport {
    /// Default checklist items created by this run.
    pub created_defaults: Vec<ChecklistItemDefinition>,
    /// Every stored checklist item definition after initialization, by position.
    pub definitions: Vec<ChecklistItemDefinition>,
    /// One outcome per representative query.
    pub probe: Vec<ProbeOutcome>,
}

/// Public entry point for reports and provisioning.
pub struct FleetwatchService<Tz: TimeZone> {
    gateways: Gateways,
    engine: AggregationEngine,
    initializer: DefaultDataInitializer,
    time_zone: Tz,
    timeout: Option<Duration>,
}

impl<Tz: TimeZone> FleetwatchService<Tz> {
    /// Create a service reading from `gateways`, reporting in `time_zone`.
    #[must_use]
    pub fn new(gateways: Gateways, time_zone: Tz) -> Self {
        Self {
            engine: AggregationEngine::new(gateways.clone()),
            initializer: DefaultDataInitializer::new(Arc::clone(&gateways.checklist_definitions)),
            gateways,
            time_zone,
            timeout: None,
        }
    }

    /// Bound every report and system check by `limit`.
    #[must_use]
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Local calendar day of `now`.
    #[must_use]
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.time_zone).date_naive()
    }

    /// Monday-to-Sunday week containing `now`.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidWindowError`] if the week cannot be derived.
    pub fn current_window(&self, now: DateTime<Utc>) -> Result<TimeWindow, InvalidWindowError> {
        TimeWindow::weekly(now, &self.time_zone)
    }

    /// The standard probe for `today`.
    #[must_use]
    pub fn probe(&self, today: NaiveDate) -> IndexProvisioningProbe {
        IndexProvisioningProbe::standard(&self.gateways, today)
    }

    /// Indicators for the week containing `now`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] when the window is invalid, any source fails,
    /// or the time limit elapses.
    pub async fn weekly_report(&self, now: DateTime<Utc>) -> Result<WeeklyReport, ServiceError> {
        let window = self.current_window(now)?;
        let indicators = self
            .bounded("weekly report", self.engine.compute(&window))
            .await?;
        Ok(WeeklyReport { window, indicators })
    }

    /// Guarantee default data, read the stored definitions back, then probe
    /// the store for missing indexes.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Initialization`] when a default item cannot be
    /// created, [`ServiceError::Source`] when the definitions cannot be listed
    /// (the probe is skipped in both cases) or [`ServiceError::Timeout`].
    /// Probe failures are reported in the outcome list, never as errors.
    pub async fn system_check(&self, today: NaiveDate) -> Result<SystemCheckReport, ServiceError> {
        let probe = self.probe(today);
        self.bounded("system check", async {
            let created_defaults = self.initializer.ensure_defaults().await?;
            let mut definitions = self.gateways.checklist_definitions.list_definitions().await?;
            definitions.sort_by_key(|definition| definition.position);
            let outcomes = probe.run().await;
            Ok::<_, ServiceError>(SystemCheckReport {
                created_defaults,
                definitions,
                probe: outcomes,
            })
        })
        .await
    }

    async fn bounded<T, E, F>(&self, operation: &'static str, work: F) -> Result<T, ServiceError>
    where
        F: Future<Output = Result<T, E>>,
        ServiceError: From<E>,
    {
        let Some(limit) = self.timeout else {
            return work.await.map_err(ServiceError::from);
        };

        if let Ok(finished) = tokio::time::timeout(limit, work).await {
            finished.map_err(ServiceError::from)
        } else {
            warn!(operation, limit_secs = limit.as_secs_f32(), "operation timed out");
            Err(ServiceError::Timeout { operation, limit })
        }
    }
}
