use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, Screen};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    None,
    Quit,
    /// Run `service.weekly_report`(...) for the current week
    RefreshReport,
    /// Run `service.system_check`(...) for today
    RunSystemCheck,
}

pub(crate) fn handle_key_event(key: KeyEvent, app: &mut App) -> Action {
    use KeyCode::{BackTab, Char, Down, Tab, Up};

    // Global shortcuts
    if key.code == Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if !key.modifiers.is_empty() && key.modifiers != KeyModifiers::SHIFT {
        return Action::None;
    }

    match key.code {
        Char('q') => return Action::Quit,
        Tab | BackTab => {
            app.screen = app.screen.next();
            return Action::None;
        }
        _ => {}
    }

    // Ignore further work while a request is in flight.
    if app.is_loading {
        return Action::None;
    }

    match app.screen {
        Screen::Indicators => match key.code {
            Up | Char('k') => {
                app.select_previous();
                Action::None
            }
            Down | Char('j') => {
                app.select_next();
                Action::None
            }
            Char('r') => Action::RefreshReport,
            Char('s') => {
                app.screen = Screen::System;
                Action::RunSystemCheck
            }
            _ => Action::None,
        },

        Screen::System => match key.code {
            Char('s' | 'r') => Action::RunSystemCheck,
            _ => Action::None,
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono_tz::Tz;
    use fleetwatch_core::{gateways::Gateways, memory::MemoryStore, service::FleetwatchService};

    use super::*;

    fn app() -> App {
        let store = Arc::new(MemoryStore::default());
        App::new(Arc::new(FleetwatchService::new(
            Gateways::from_store(store),
            Tz::America__Sao_Paulo,
        )))
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quit_shortcuts() {
        let mut app = app();

        assert_eq!(handle_key_event(press(KeyCode::Char('q')), &mut app), Action::Quit, "q quits");
        assert_eq!(
            handle_key_event(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), &mut app),
            Action::Quit,
            "Ctrl-C quits"
        );
    }

    #[test]
    fn tab_switches_screens() {
        let mut app = app();

        handle_key_event(press(KeyCode::Tab), &mut app);
        assert_eq!(app.screen, Screen::System, "second screen");
        handle_key_event(press(KeyCode::Tab), &mut app);
        assert_eq!(app.screen, Screen::Indicators, "wraps around");
    }

    #[test]
    fn system_check_jumps_to_its_screen() {
        let mut app = app();

        let action = handle_key_event(press(KeyCode::Char('s')), &mut app);

        assert_eq!(action, Action::RunSystemCheck, "check requested");
        assert_eq!(app.screen, Screen::System, "results visible");
    }

    #[test]
    fn requests_are_not_stacked_while_loading() {
        let mut app = app();
        app.is_loading = true;

        assert_eq!(handle_key_event(press(KeyCode::Char('r')), &mut app), Action::None, "refresh ignored");
        assert_eq!(handle_key_event(press(KeyCode::Char('q')), &mut app), Action::Quit, "quit still works");
    }
}
