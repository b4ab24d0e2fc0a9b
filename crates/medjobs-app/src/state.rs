// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{AppMode, FormKind, ScreenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub mode: AppMode,
    pub screen: ScreenKind,
    pub signed_in: bool,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: AppMode::Nav,
            screen: ScreenKind::Login,
            signed_in: false,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextScreen,
    PrevScreen,
    Navigate(ScreenKind),
    EnterSearch,
    EnterEdit,
    ExitToNav,
    OpenForm(FormKind),
    SessionStarted,
    SessionEnded,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ModeChanged(AppMode),
    ScreenChanged(ScreenKind),
    Redirected {
        requested: ScreenKind,
        landed: ScreenKind,
    },
    StatusUpdated(String),
    StatusCleared,
}

/// Where a navigation request lands given the session state: protected
/// screens bounce to login when signed out, auth screens bounce home when
/// signed in.
pub fn guard_screen(requested: ScreenKind, signed_in: bool) -> ScreenKind {
    match (requested.requires_session(), signed_in) {
        (true, false) => ScreenKind::Login,
        (false, true) => ScreenKind::HOME,
        _ => requested,
    }
}

impl AppState {
    pub fn signed_in() -> Self {
        Self {
            screen: ScreenKind::HOME,
            signed_in: true,
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextScreen => self.rotate_screen(1),
            AppCommand::PrevScreen => self.rotate_screen(-1),
            AppCommand::Navigate(screen) => self.navigate(screen),
            AppCommand::EnterSearch => self.set_mode(AppMode::Search),
            AppCommand::EnterEdit => self.set_mode(AppMode::Edit),
            AppCommand::ExitToNav => self.set_mode(AppMode::Nav),
            AppCommand::OpenForm(kind) => self.set_mode(AppMode::Form(kind)),
            AppCommand::SessionStarted => {
                self.signed_in = true;
                let mut events = self.navigate(ScreenKind::HOME);
                events.push(self.set_status("signed in"));
                events
            }
            AppCommand::SessionEnded => {
                self.signed_in = false;
                self.mode = AppMode::Nav;
                let mut events = self.navigate(ScreenKind::Login);
                events.push(self.set_status("signed out"));
                events
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn navigate(&mut self, requested: ScreenKind) -> Vec<AppEvent> {
        let landed = guard_screen(requested, self.signed_in);
        let mut events = Vec::new();
        if landed != requested {
            events.push(AppEvent::Redirected { requested, landed });
        }
        if self.screen != landed {
            self.screen = landed;
            self.mode = AppMode::Nav;
            events.push(AppEvent::ScreenChanged(landed));
        }
        events
    }

    fn rotate_screen(&mut self, delta: isize) -> Vec<AppEvent> {
        if !self.signed_in {
            return Vec::new();
        }
        let screens = ScreenKind::ROTATION;
        let current = screens
            .iter()
            .position(|screen| *screen == self.screen)
            .unwrap_or(0) as isize;
        let len = screens.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.navigate(screens[next])
    }

    fn set_mode(&mut self, mode: AppMode) -> Vec<AppEvent> {
        self.mode = mode;
        vec![AppEvent::ModeChanged(mode)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::{AppCommand, AppEvent, AppState, guard_screen};
    use crate::{AppMode, FormKind, ScreenKind};

    #[test]
    fn screen_rotation_wraps() {
        let mut state = AppState {
            screen: ScreenKind::CompanyProfile,
            ..AppState::signed_in()
        };

        let events = state.dispatch(AppCommand::NextScreen);
        assert_eq!(state.screen, ScreenKind::Jobs);
        assert_eq!(events, vec![AppEvent::ScreenChanged(ScreenKind::Jobs)]);

        state.dispatch(AppCommand::PrevScreen);
        assert_eq!(state.screen, ScreenKind::CompanyProfile);
    }

    #[test]
    fn protected_screen_redirects_to_login_when_signed_out() {
        let mut state = AppState::default();
        let events = state.dispatch(AppCommand::Navigate(ScreenKind::Drugs));
        assert_eq!(state.screen, ScreenKind::Login);
        assert_eq!(
            events,
            vec![AppEvent::Redirected {
                requested: ScreenKind::Drugs,
                landed: ScreenKind::Login,
            }]
        );
    }

    #[test]
    fn auth_screens_redirect_home_when_signed_in() {
        assert_eq!(guard_screen(ScreenKind::Login, true), ScreenKind::Jobs);
        assert_eq!(guard_screen(ScreenKind::Register, true), ScreenKind::Jobs);
        assert_eq!(guard_screen(ScreenKind::Register, false), ScreenKind::Register);
        assert_eq!(guard_screen(ScreenKind::Plans, true), ScreenKind::Plans);
    }

    #[test]
    fn rotation_is_inert_while_signed_out() {
        let mut state = AppState::default();
        assert!(state.dispatch(AppCommand::NextScreen).is_empty());
        assert_eq!(state.screen, ScreenKind::Login);
    }

    #[test]
    fn session_lifecycle_moves_between_login_and_home() {
        let mut state = AppState::default();

        let started = state.dispatch(AppCommand::SessionStarted);
        assert!(state.signed_in);
        assert_eq!(state.screen, ScreenKind::Jobs);
        assert_eq!(
            started,
            vec![
                AppEvent::ScreenChanged(ScreenKind::Jobs),
                AppEvent::StatusUpdated("signed in".to_owned()),
            ]
        );

        state.dispatch(AppCommand::EnterSearch);
        let ended = state.dispatch(AppCommand::SessionEnded);
        assert!(!state.signed_in);
        assert_eq!(state.mode, AppMode::Nav);
        assert_eq!(state.screen, ScreenKind::Login);
        assert!(ended.contains(&AppEvent::StatusUpdated("signed out".to_owned())));
    }

    #[test]
    fn mode_transitions() {
        let mut state = AppState::signed_in();

        state.dispatch(AppCommand::EnterSearch);
        assert_eq!(state.mode, AppMode::Search);

        state.dispatch(AppCommand::OpenForm(FormKind::Job));
        assert_eq!(state.mode, AppMode::Form(FormKind::Job));

        state.dispatch(AppCommand::ExitToNav);
        assert_eq!(state.mode, AppMode::Nav);
    }
}
