use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use fleetwatch_core::{
    model::Indicator,
    probe::ProbeOutcome,
    service::{FleetwatchService, ServiceError, SystemCheckReport, WeeklyReport},
    window::TimeWindow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Screen {
    Indicators,
    System,
}

impl Screen {
    pub(crate) const ALL: [Screen; 2] = [Screen::Indicators, Screen::System];

    pub(crate) fn title(self) -> &'static str {
        match self {
            Screen::Indicators => "Indicators",
            Screen::System => "System",
        }
    }

    pub(crate) fn next(self) -> Self {
        match self {
            Screen::Indicators => Screen::System,
            Screen::System => Screen::Indicators,
        }
    }
}

pub(crate) struct App {
    pub(crate) service: Arc<FleetwatchService<Tz>>,

    pub(crate) screen: Screen,

    pub(crate) window: Option<TimeWindow>,
    pub(crate) indicators: Vec<Indicator>,
    pub(crate) indicator_index: usize,
    pub(crate) report_error: Option<String>,

    pub(crate) system_check: Option<SystemCheckReport>,
    pub(crate) probe: Vec<ProbeOutcome>,
    pub(crate) system_error: Option<String>,

    pub(crate) is_loading: bool,
}

impl App {
    pub(crate) fn new(service: Arc<FleetwatchService<Tz>>) -> Self {
        let now = Utc::now();
        let probe = service.probe(service.today(now)).pending();
        let window = service.current_window(now).ok();
        Self {
            service,
            screen: Screen::Indicators,
            window,
            indicators: Vec::new(),
            indicator_index: 0,
            report_error: None,
            system_check: None,
            probe,
            system_error: None,
            is_loading: false,
        }
    }

    pub(crate) fn apply_report(&mut self, result: Result<WeeklyReport, ServiceError>) {
        self.is_loading = false;
        match result {
            Ok(report) => {
                self.window = Some(report.window);
                self.indicators = report.indicators;
                self.indicator_index = self
                    .indicator_index
                    .min(self.indicators.len().saturating_sub(1));
                self.report_error = None;
            }
            Err(err) => {
                // A partial table would be misleading; show the failure alone.
                self.indicators.clear();
                self.indicator_index = 0;
                self.report_error = Some(err.to_string());
            }
        }
    }

    pub(crate) fn apply_system_check(&mut self, result: Result<SystemCheckReport, ServiceError>) {
        self.is_loading = false;
        match result {
            Ok(report) => {
                self.probe.clone_from(&report.probe);
                self.system_check = Some(report);
                self.system_error = None;
            }
            Err(err) => {
                self.system_check = None;
                self.system_error = Some(err.to_string());
            }
        }
    }

    pub(crate) fn select_previous(&mut self) {
        self.indicator_index = self.indicator_index.saturating_sub(1);
    }

    pub(crate) fn select_next(&mut self) {
        if self.indicator_index + 1 < self.indicators.len() {
            self.indicator_index += 1;
        }
    }

    pub(crate) fn error_message(&self) -> Option<&str> {
        match self.screen {
            Screen::Indicators => self.report_error.as_deref(),
            Screen::System => self.system_error.as_deref(),
        }
    }
}
