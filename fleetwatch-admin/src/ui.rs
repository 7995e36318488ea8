use fleetwatch_core::probe::{ProbeStatus, ProbeSummary};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, Paragraph, Row, Table, TableState, Tabs, Wrap},
};

use crate::app::{App, Screen};

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: tabs, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let selected = Screen::ALL
        .iter()
        .position(|screen| *screen == app.screen)
        .unwrap_or_default();
    let tabs = Tabs::new(Screen::ALL.map(Screen::title))
        .select(selected)
        .block(Block::default().borders(Borders::ALL).title("Fleetwatch"))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, *header_area);

    match app.screen {
        Screen::Indicators => draw_indicators(frame, app, *content_area),
        Screen::System => draw_system(frame, app, *content_area),
    }

    // Status bar
    let nav_hint = match app.screen {
        Screen::Indicators => "↑/↓ move · r refresh · s system check · Tab switch · q/Ctrl-C quit",
        Screen::System => "s run system check · Tab switch · q/Ctrl-C quit",
    };

    let (status_text, status_style) = if app.is_loading {
        (format!("Loading… · {nav_hint}"), Style::default().fg(Color::Yellow))
    } else if app.error_message().is_some() {
        (format!("Failed · {nav_hint}"), Style::default().fg(Color::Red))
    } else {
        (nav_hint.to_owned(), Style::default())
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_indicators(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let title = app.window.map_or_else(
        || "Operator indicators".to_owned(),
        |window| format!("Operator indicators · {window}"),
    );

    if let Some(err) = &app.report_error {
        let paragraph = Paragraph::new(err.as_str())
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    if app.indicators.is_empty() {
        let text = if app.is_loading {
            "Loading indicators…"
        } else {
            "No operators to report. Press r to refresh."
        };
        let paragraph = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let rows = app.indicators.iter().map(|indicator| {
        let idle = indicator.km_driven_this_week <= 0.0
            && indicator.incidents_this_week == 0
            && indicator.checklists_this_week == 0;
        let mut style = Style::default();
        if idle {
            style = style.fg(Color::DarkGray);
        } else if indicator.incidents_this_week > 0 {
            style = style.fg(Color::LightRed);
        }

        Row::new(vec![
            Cell::from(indicator.operator_name.clone()),
            Cell::from(format!("{:.1}", indicator.km_driven_this_week)),
            Cell::from(indicator.incidents_this_week.to_string()),
            Cell::from(indicator.checklists_this_week.to_string()),
        ])
        .style(style)
    });

    let column_widths = [
        Constraint::Min(20),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(11),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Operator", "Km", "Incidents", "Checklists"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .column_spacing(1);

    let mut state = TableState::default();
    state.select(Some(app.indicator_index));
    frame.render_stateful_widget(table, area, &mut state);
}

fn draw_system(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Min(0)])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [defaults_area, probe_area] = chunks else {
        return;
    };

    let defaults: Vec<ListItem<'_>> = match (&app.system_error, &app.system_check) {
        (Some(err), _) => vec![ListItem::new(err.as_str()).style(Style::default().fg(Color::Red))],
        (None, None) => vec![ListItem::new("Not run yet. Press s to run the system check.")],
        (None, Some(report)) => report
            .definitions
            .iter()
            .map(|item| {
                let line = ListItem::new(format!("{:>2}. {} ({})", item.position, item.label, item.key));
                if report.created_defaults.contains(item) {
                    line.style(Style::default().fg(Color::Green))
                } else {
                    line
                }
            })
            .collect(),
    };

    let list = List::new(defaults).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Checklist items · new defaults in green"),
    );
    frame.render_widget(list, *defaults_area);

    let summary = ProbeSummary::from(app.probe.as_slice());
    let title = format!(
        "Index probe · {} pending · {} ok · {} index missing · {} failed",
        summary.pending, summary.succeeded, summary.missing_indexes, summary.failed
    );

    let rows = app.probe.iter().map(|outcome| {
        let detail = match &outcome.status {
            ProbeStatus::ExpectedFailure { message } | ProbeStatus::UnexpectedFailure { message, .. } => {
                message.as_str()
            }
            ProbeStatus::Pending | ProbeStatus::Success => "",
        };
        Row::new(vec![
            Cell::from(outcome.query.clone()),
            Cell::from(outcome.status.to_string()),
            Cell::from(detail.to_owned()),
        ])
        .style(Style::default().fg(status_color(&outcome.status)))
    });

    let column_widths = [
        Constraint::Length(54),
        Constraint::Length(20),
        Constraint::Min(20),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Query", "State", "Detail"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .column_spacing(1);

    frame.render_widget(table, *probe_area);
}

fn status_color(status: &ProbeStatus) -> Color {
    match status {
        ProbeStatus::Pending => Color::Gray,
        ProbeStatus::Success => Color::Green,
        ProbeStatus::ExpectedFailure { .. } => Color::Yellow,
        ProbeStatus::UnexpectedFailure { .. } => Color::Red,
    }
}
