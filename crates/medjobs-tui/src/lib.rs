// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use medjobs_app::{
    AppCommand, AppEvent, AppMode, AppState, ApplicationId, ApplicationReviewInput,
    ApplicationStatus, CollectionItem, CompanyProfileFormInput, DrugFormInput, DrugId, FormKind,
    FormPayload, ImageUpload, JobFormInput, JobId, ListController, LoginFormInput, Notification,
    NotifyLevel, PlanId, PlanPurchaseInput, RegisterFormInput, ResourceKind, RowAction,
    RowActions, ScreenKind, SortDirection, value_text,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::collections::HashMap;
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

const HALF_PAGE_ROWS: isize = 10;
const SELECTED_MARK: &str = "●";
const FILTER_MARK_ACTIVE: &str = "▼";
const SORT_MARK_ASC: &str = "↑";
const SORT_MARK_DESC: &str = "↓";
const MASK: char = '•';

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectionSnapshot {
    pub items: Vec<CollectionItem>,
    /// Bumped by the runtime every time fresh data lands.
    pub revision: u64,
    pub loading: bool,
}

pub trait AppRuntime {
    fn load_collection(&mut self, kind: ResourceKind) -> Result<CollectionSnapshot>;
    fn refresh(&mut self, kind: ResourceKind) -> Result<()>;
    fn load_company_profile(&mut self) -> Result<Option<CollectionItem>>;
    /// Returns whether the backend accepted the form. Rejections surface as
    /// notifications.
    fn submit_form(&mut self, payload: &FormPayload) -> Result<bool>;
    fn delete_item(&mut self, kind: ResourceKind, id: i64) -> Result<bool>;
    fn sign_in(&mut self, form: &LoginFormInput) -> Result<()>;
    fn register(&mut self, form: &RegisterFormInput) -> Result<()>;
    fn sign_out(&mut self) -> Result<()>;
    fn session_name(&self) -> Option<String>;
    fn drain_notifications(&mut self) -> Vec<Notification>;
    /// True when background data landed since the last call.
    fn take_updates(&mut self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus { token: u64 },
}

#[derive(Debug, Clone, PartialEq)]
struct ListView {
    controller: ListController,
    revision: Option<u64>,
    loading: bool,
    cursor_row: usize,
    cursor_col: usize,
}

impl ListView {
    fn new(kind: ResourceKind) -> Self {
        Self {
            controller: ListController::for_resource(kind),
            revision: None,
            loading: false,
            cursor_row: 0,
            cursor_col: 0,
        }
    }

    fn clamp_cursor(&mut self) {
        let rows = self.controller.visible_len();
        self.cursor_row = self.cursor_row.min(rows.saturating_sub(1));
        let cols = self.controller.columns().len();
        self.cursor_col = self.cursor_col.min(cols.saturating_sub(1));
    }

    fn move_row(&mut self, delta: isize) {
        let rows = self.controller.visible_len();
        if rows == 0 {
            self.cursor_row = 0;
            return;
        }
        let last = rows as isize - 1;
        self.cursor_row = (self.cursor_row as isize + delta).clamp(0, last) as usize;
    }

    fn move_col(&mut self, delta: isize) {
        let cols = self.controller.columns().len();
        if cols == 0 {
            return;
        }
        let last = cols as isize - 1;
        self.cursor_col = (self.cursor_col as isize + delta).clamp(0, last) as usize;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormFieldSpec {
    key: &'static str,
    label: &'static str,
    secret: bool,
}

const fn field(key: &'static str, label: &'static str) -> FormFieldSpec {
    FormFieldSpec {
        key,
        label,
        secret: false,
    }
}

const fn secret(key: &'static str, label: &'static str) -> FormFieldSpec {
    FormFieldSpec {
        key,
        label,
        secret: true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct FormUiState {
    kind: FormKind,
    values: Vec<String>,
    field_index: usize,
    target: Option<i64>,
}

impl FormUiState {
    fn value(&self, key: &str) -> String {
        form_field_specs(self.kind)
            .iter()
            .position(|spec| spec.key == key)
            .and_then(|index| self.values.get(index))
            .cloned()
            .unwrap_or_default()
    }

    fn current_mut(&mut self) -> Option<&mut String> {
        self.values.get_mut(self.field_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct DetailUiState {
    title: String,
    lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingDelete {
    kind: ResourceKind,
    ids: Vec<i64>,
    label: String,
}

#[derive(Debug, Clone, PartialEq, Default)]
struct ViewData {
    lists: HashMap<ResourceKind, ListView>,
    profile: Option<CollectionItem>,
    form: Option<FormUiState>,
    detail: Option<DetailUiState>,
    pending_delete: Option<PendingDelete>,
    help_visible: bool,
    session_name: Option<String>,
    status_token: u64,
}

impl ViewData {
    fn list(&self, state: &AppState) -> Option<&ListView> {
        state.screen.resource().and_then(|kind| self.lists.get(&kind))
    }

    fn list_mut(&mut self, state: &AppState) -> Option<&mut ListView> {
        state
            .screen
            .resource()
            .and_then(|kind| self.lists.get_mut(&kind))
    }
}

/// Records which row callback fired so the event loop can act on it after
/// the controller borrow ends.
#[derive(Debug, Default)]
struct RowCapture(Option<(RowAction, CollectionItem)>);

impl RowActions for RowCapture {
    fn view(&mut self, item: &CollectionItem) {
        self.0 = Some((RowAction::View, item.clone()));
    }

    fn edit(&mut self, item: &CollectionItem) {
        self.0 = Some((RowAction::Edit, item.clone()));
    }

    fn delete(&mut self, item: &CollectionItem) {
        self.0 = Some((RowAction::Delete, item.clone()));
    }
}

pub fn run_app<R: AppRuntime>(state: &mut AppState, runtime: &mut R) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData::default();
    let (internal_tx, internal_rx) = mpsc::channel();

    if runtime.session_name().is_some() && !state.signed_in {
        state.dispatch(AppCommand::SessionStarted);
    }
    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_rx);
        process_runtime_updates(state, runtime, &mut view_data, &internal_tx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
        }
    }
}

/// Folds in fetcher updates and pending notifications once per tick.
fn process_runtime_updates<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if runtime.take_updates()
        && let Err(error) = refresh_view_data(state, runtime, view_data)
    {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error}"),
        );
    }
    flush_notifications(state, runtime, view_data, internal_tx);
}

fn flush_notifications<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let notifications = runtime.drain_notifications();
    if notifications.is_empty() {
        return;
    }
    let message = notifications
        .iter()
        .map(|notification| match notification.level {
            NotifyLevel::Error => format!("error: {}", notification.message),
            NotifyLevel::Success | NotifyLevel::Info => notification.message.clone(),
        })
        .collect::<Vec<_>>()
        .join(" | ");
    emit_status(state, view_data, internal_tx, message);
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(Duration::from_secs(4));
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token);
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    if view_data.help_visible {
        if key.code == KeyCode::Esc || key.code == KeyCode::Char('?') {
            view_data.help_visible = false;
        }
        return false;
    }

    if view_data.detail.is_some() {
        view_data.detail = None;
        return false;
    }

    if let Some(pending) = view_data.pending_delete.take() {
        if key.code == KeyCode::Char('y') {
            confirm_delete(state, runtime, view_data, internal_tx, pending);
        } else {
            emit_status(state, view_data, internal_tx, "delete cancelled");
        }
        return false;
    }

    if let AppMode::Form(kind) = state.mode {
        handle_form_key(state, runtime, view_data, internal_tx, kind, key);
        return false;
    }

    if state.mode == AppMode::Search {
        handle_search_key(state, view_data, key);
        return false;
    }

    match key.code {
        KeyCode::Char('?') => {
            view_data.help_visible = true;
            return false;
        }
        KeyCode::Char('f') => {
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::NextScreen,
                internal_tx,
            );
            return false;
        }
        KeyCode::Char('b') => {
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::PrevScreen,
                internal_tx,
            );
            return false;
        }
        KeyCode::Char('r') => {
            refresh_current(state, runtime, view_data, internal_tx);
            return false;
        }
        KeyCode::Char('L') => {
            sign_out(state, runtime, view_data, internal_tx);
            return false;
        }
        KeyCode::Char('i') if state.mode == AppMode::Nav => {
            state.dispatch(AppCommand::EnterEdit);
            return false;
        }
        KeyCode::Esc if state.mode == AppMode::Edit => {
            state.dispatch(AppCommand::ExitToNav);
            return false;
        }
        _ => {}
    }

    if let Some(kind) = state.screen.resource() {
        handle_list_key(state, view_data, internal_tx, kind, key);
    } else if state.screen == ScreenKind::CompanyProfile
        && state.mode == AppMode::Edit
        && key.code == KeyCode::Char('e')
    {
        let profile = view_data.profile.clone();
        open_form(state, view_data, FormKind::CompanyProfile, profile.as_ref());
    }
    false
}

fn handle_list_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ResourceKind,
    key: KeyEvent,
) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let view = view_data
        .lists
        .entry(kind)
        .or_insert_with(|| ListView::new(kind));

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => view.move_row(1),
        KeyCode::Char('k') | KeyCode::Up => view.move_row(-1),
        KeyCode::Char('h') | KeyCode::Left => view.move_col(-1),
        KeyCode::Char('l') | KeyCode::Right => view.move_col(1),
        KeyCode::Char('g') => view.cursor_row = 0,
        KeyCode::Char('G') => view.cursor_row = view.controller.visible_len().saturating_sub(1),
        KeyCode::Char('d') if ctrl => view.move_row(HALF_PAGE_ROWS),
        KeyCode::Char('u') if ctrl => view.move_row(-HALF_PAGE_ROWS),
        KeyCode::Enter => {
            handle_row_action(state, view_data, internal_tx, kind, RowAction::View);
        }
        _ => {
            if state.mode == AppMode::Edit {
                handle_edit_key(state, view_data, internal_tx, kind, key);
            } else {
                handle_nav_list_key(state, view_data, internal_tx, kind, key);
            }
        }
    }
}

fn handle_edit_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ResourceKind,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('a') => match add_form_for(kind) {
            Some(form) => open_form(state, view_data, form, None),
            None => emit_status(
                state,
                view_data,
                internal_tx,
                format!("{} cannot be added here", kind.label().to_lowercase()),
            ),
        },
        KeyCode::Char('e') => {
            handle_row_action(state, view_data, internal_tx, kind, RowAction::Edit);
        }
        KeyCode::Char('d') => {
            handle_row_action(state, view_data, internal_tx, kind, RowAction::Delete);
        }
        KeyCode::Char('D') => request_bulk_delete(state, view_data, internal_tx, kind),
        _ => {}
    }
}

fn handle_nav_list_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ResourceKind,
    key: KeyEvent,
) {
    let Some(view) = view_data.lists.get_mut(&kind) else {
        return;
    };
    let status = match key.code {
        KeyCode::Char('/') => {
            state.dispatch(AppCommand::EnterSearch);
            None
        }
        KeyCode::Char(digit @ '1'..='9') => {
            let index = digit as usize - '1' as usize;
            cycle_filter(view, index)
        }
        KeyCode::Char('0') => {
            view.controller.clear_filters();
            view.clamp_cursor();
            Some("filters cleared".to_owned())
        }
        KeyCode::Char(' ') => {
            let row = view.cursor_row;
            let status = view.controller.toggle_selected(row).map(|selected| {
                format!(
                    "{} ({} selected)",
                    if selected { "selected" } else { "deselected" },
                    view.controller.selection_len()
                )
            });
            view.move_row(1);
            status
        }
        KeyCode::Char('*') => {
            view.controller.select_all_visible();
            Some(format!("{} selected", view.controller.selection_len()))
        }
        KeyCode::Char('-') => {
            view.controller.clear_selection();
            Some("selection cleared".to_owned())
        }
        KeyCode::Char('s') => Some(cycle_sort(view)),
        _ => None,
    };
    if let Some(status) = status {
        emit_status(state, view_data, internal_tx, status);
    }
}

fn cycle_filter(view: &mut ListView, index: usize) -> Option<String> {
    let descriptor = view.controller.filter_descriptors().get(index)?;
    let field = descriptor.field.clone();
    view.controller.cycle_filter(&field, 1)?;
    view.clamp_cursor();
    let descriptor = view.controller.filter(&field)?;
    Some(format!("filter: {}", descriptor.selected_label()))
}

fn cycle_sort(view: &mut ListView) -> String {
    let column = view.cursor_col;
    let title = view
        .controller
        .columns()
        .get(column)
        .map(|column| column.title.clone())
        .unwrap_or_default();
    match view.controller.cycle_sort(column) {
        Some(SortDirection::Asc) => format!("sort {title} asc"),
        Some(SortDirection::Desc) => format!("sort {title} desc"),
        None => "sort off".to_owned(),
    }
}

fn handle_search_key(state: &mut AppState, view_data: &mut ViewData, key: KeyEvent) {
    let Some(view) = view_data.list_mut(state) else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };
    let mut term = view.controller.search().to_owned();
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        KeyCode::Backspace => {
            term.pop();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => term.clear(),
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => term.push(ch),
        _ => return,
    }
    if view.controller.set_search(&term) {
        view.clamp_cursor();
    }
}

fn handle_row_action(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ResourceKind,
    action: RowAction,
) {
    let mut capture = RowCapture::default();
    let invoked = view_data
        .lists
        .get(&kind)
        .is_some_and(|view| view.controller.invoke(action, view.cursor_row, &mut capture));
    let Some((action, item)) = capture.0.filter(|_| invoked) else {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("nothing to {}", action.label()),
        );
        return;
    };

    match action {
        RowAction::View => view_data.detail = Some(detail_for(kind, &item)),
        RowAction::Edit => open_form(state, view_data, edit_form_for(kind), Some(&item)),
        RowAction::Delete => {
            if !deletable(kind) {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("{} cannot be deleted", kind.label().to_lowercase()),
                );
                return;
            }
            match item.id() {
                Some(id) => {
                    view_data.pending_delete = Some(PendingDelete {
                        kind,
                        ids: vec![id],
                        label: format!("{} #{id}", kind.noun().to_lowercase()),
                    });
                }
                None => emit_status(state, view_data, internal_tx, "row has no id"),
            }
        }
    }
}

fn request_bulk_delete(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: ResourceKind,
) {
    if !deletable(kind) {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("{} cannot be deleted", kind.label().to_lowercase()),
        );
        return;
    }
    let ids = view_data
        .lists
        .get(&kind)
        .map(|view| {
            view.controller
                .selected_items()
                .iter()
                .filter_map(|item| item.id())
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();
    if ids.is_empty() {
        emit_status(state, view_data, internal_tx, "no rows selected");
        return;
    }
    let label = format!("{} {}", ids.len(), kind.label().to_lowercase());
    view_data.pending_delete = Some(PendingDelete { kind, ids, label });
}

fn confirm_delete<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    pending: PendingDelete,
) {
    let mut failure = None;
    for id in &pending.ids {
        if let Err(error) = runtime.delete_item(pending.kind, *id) {
            failure = Some(error);
            break;
        }
    }
    if let Some(view) = view_data.lists.get_mut(&pending.kind) {
        view.controller.clear_selection();
    }
    if let Err(error) = runtime.refresh(pending.kind) {
        failure.get_or_insert(error);
    }
    if let Err(error) = refresh_view_data(state, runtime, view_data) {
        failure.get_or_insert(error);
    }
    match failure {
        Some(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("delete failed: {error:#}"),
        ),
        None => flush_notifications(state, runtime, view_data, internal_tx),
    }
}

fn refresh_current<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let result = match state.screen.resource() {
        Some(kind) => runtime.refresh(kind),
        None => Ok(()),
    }
    .and_then(|()| refresh_view_data(state, runtime, view_data));
    match result {
        Ok(()) => emit_status(state, view_data, internal_tx, "refreshing"),
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("refresh failed: {error:#}"),
        ),
    }
}

fn sign_out<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    if let Err(error) = runtime.sign_out() {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("sign out failed: {error:#}"),
        );
        return;
    }
    view_data.lists.clear();
    view_data.profile = None;
    view_data.form = None;
    dispatch_and_refresh(
        state,
        runtime,
        view_data,
        AppCommand::SessionEnded,
        internal_tx,
    );
}

fn deletable(kind: ResourceKind) -> bool {
    matches!(kind, ResourceKind::Jobs | ResourceKind::Drugs)
}

fn add_form_for(kind: ResourceKind) -> Option<FormKind> {
    match kind {
        ResourceKind::Jobs => Some(FormKind::Job),
        ResourceKind::Drugs => Some(FormKind::Drug),
        ResourceKind::Applications | ResourceKind::Plans => None,
    }
}

fn edit_form_for(kind: ResourceKind) -> FormKind {
    match kind {
        ResourceKind::Jobs => FormKind::Job,
        ResourceKind::Drugs => FormKind::Drug,
        ResourceKind::Applications => FormKind::ApplicationReview,
        ResourceKind::Plans => FormKind::PlanPurchase,
    }
}

const LOGIN_FIELDS: &[FormFieldSpec] = &[
    field("email", "Email"),
    secret("password", "Password"),
];
const REGISTER_FIELDS: &[FormFieldSpec] = &[
    field("company_name", "Company"),
    field("name", "Your name"),
    field("email", "Email"),
    field("phone", "Phone"),
    secret("password", "Password"),
    secret("password_confirmation", "Confirm password"),
];
const PROFILE_FIELDS: &[FormFieldSpec] = &[
    field("name", "Name"),
    field("email", "Email"),
    field("phone", "Phone"),
    field("address", "Address"),
    field("website", "Website"),
    field("description", "Description"),
    field("logo", "Logo file"),
];
const JOB_FIELDS: &[FormFieldSpec] = &[
    field("title", "Title"),
    field("category", "Category"),
    field("job_type", "Type"),
    field("location", "Location"),
    field("salary", "Salary"),
    field("description", "Description"),
    field("status", "Status"),
];
const DRUG_FIELDS: &[FormFieldSpec] = &[
    field("name", "Name"),
    field("category", "Category"),
    field("company", "Company"),
    field("price", "Price"),
    field("description", "Description"),
    field("image", "Image file"),
];
const REVIEW_FIELDS: &[FormFieldSpec] = &[field("status", "Status (pending/accepted/rejected)")];
const PURCHASE_FIELDS: &[FormFieldSpec] = &[field("payment_method", "Payment method")];

fn form_field_specs(kind: FormKind) -> &'static [FormFieldSpec] {
    match kind {
        FormKind::Login => LOGIN_FIELDS,
        FormKind::Register => REGISTER_FIELDS,
        FormKind::CompanyProfile => PROFILE_FIELDS,
        FormKind::Job => JOB_FIELDS,
        FormKind::Drug => DRUG_FIELDS,
        FormKind::ApplicationReview => REVIEW_FIELDS,
        FormKind::PlanPurchase => PURCHASE_FIELDS,
    }
}

fn form_title(kind: FormKind, target: Option<i64>) -> String {
    match (kind, target) {
        (FormKind::Login, _) => "sign in".to_owned(),
        (FormKind::Register, _) => "register".to_owned(),
        (FormKind::CompanyProfile, _) => "company profile".to_owned(),
        (FormKind::Job, None) => "new job".to_owned(),
        (FormKind::Job, Some(id)) => format!("edit job #{id}"),
        (FormKind::Drug, None) => "new drug".to_owned(),
        (FormKind::Drug, Some(id)) => format!("edit drug #{id}"),
        (FormKind::ApplicationReview, Some(id)) => format!("review application #{id}"),
        (FormKind::ApplicationReview, None) => "review application".to_owned(),
        (FormKind::PlanPurchase, Some(id)) => format!("purchase plan #{id}"),
        (FormKind::PlanPurchase, None) => "purchase plan".to_owned(),
    }
}

fn open_form(
    state: &mut AppState,
    view_data: &mut ViewData,
    kind: FormKind,
    source: Option<&CollectionItem>,
) {
    let values = form_field_specs(kind)
        .iter()
        .map(|spec| {
            let prefilled = match source {
                Some(item) if !spec.secret && !is_file_field(spec.key) => item.text(spec.key),
                _ => String::new(),
            };
            if prefilled.is_empty() {
                default_field_value(kind, spec.key).to_owned()
            } else {
                prefilled
            }
        })
        .collect();
    view_data.form = Some(FormUiState {
        kind,
        values,
        field_index: 0,
        target: source.and_then(CollectionItem::id),
    });
    state.dispatch(AppCommand::OpenForm(kind));
}

fn default_field_value(kind: FormKind, key: &str) -> &'static str {
    match (kind, key) {
        (FormKind::Job, "status") => "open",
        (FormKind::PlanPurchase, "payment_method") => "card",
        _ => "",
    }
}

fn is_file_field(key: &str) -> bool {
    matches!(key, "logo" | "image")
}

/// Keeps the auth form open on the login and register screens.
fn sync_auth_form(state: &mut AppState, view_data: &mut ViewData) {
    let wanted = match state.screen {
        ScreenKind::Login => FormKind::Login,
        ScreenKind::Register => FormKind::Register,
        _ => {
            if view_data
                .form
                .as_ref()
                .is_some_and(|form| matches!(form.kind, FormKind::Login | FormKind::Register))
            {
                view_data.form = None;
            }
            return;
        }
    };
    if view_data.form.as_ref().map(|form| form.kind) != Some(wanted) {
        open_form(state, view_data, wanted, None);
    } else if state.mode != AppMode::Form(wanted) {
        state.dispatch(AppCommand::OpenForm(wanted));
    }
}

fn handle_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: FormKind,
    key: KeyEvent,
) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let auth_form = matches!(kind, FormKind::Login | FormKind::Register);

    match key.code {
        KeyCode::Char('r') if ctrl && auth_form => {
            let target = if kind == FormKind::Login {
                ScreenKind::Register
            } else {
                ScreenKind::Login
            };
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::Navigate(target),
                internal_tx,
            );
        }
        KeyCode::Esc if kind == FormKind::Register => {
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::Navigate(ScreenKind::Login),
                internal_tx,
            );
        }
        KeyCode::Esc if !auth_form => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            emit_status(state, view_data, internal_tx, "form cancelled");
        }
        KeyCode::Tab | KeyCode::Down => move_form_field(view_data, 1),
        KeyCode::BackTab | KeyCode::Up => move_form_field(view_data, -1),
        KeyCode::Enter => submit_current_form(state, runtime, view_data, internal_tx),
        KeyCode::Backspace => {
            if let Some(value) = view_data.form.as_mut().and_then(FormUiState::current_mut) {
                value.pop();
            }
        }
        KeyCode::Char(ch) if !ctrl => {
            if let Some(value) = view_data.form.as_mut().and_then(FormUiState::current_mut) {
                value.push(ch);
            }
        }
        _ => {}
    }
}

fn move_form_field(view_data: &mut ViewData, delta: isize) {
    let Some(form) = view_data.form.as_mut() else {
        return;
    };
    let len = form.values.len() as isize;
    if len == 0 {
        return;
    }
    form.field_index = (form.field_index as isize + delta).rem_euclid(len) as usize;
}

fn build_payload(form: &FormUiState) -> Result<FormPayload> {
    let value = |key: &str| form.value(key);
    let payload = match form.kind {
        FormKind::Login => FormPayload::Login(LoginFormInput {
            email: value("email"),
            password: value("password"),
        }),
        FormKind::Register => FormPayload::Register(RegisterFormInput {
            company_name: value("company_name"),
            name: value("name"),
            email: value("email"),
            phone: value("phone"),
            password: value("password"),
            password_confirmation: value("password_confirmation"),
        }),
        FormKind::CompanyProfile => {
            FormPayload::CompanyProfile(Box::new(CompanyProfileFormInput {
                name: value("name"),
                email: value("email"),
                phone: value("phone"),
                address: value("address"),
                website: value("website"),
                description: value("description"),
                logo: image_from_field(&value("logo"))?,
            }))
        }
        FormKind::Job => FormPayload::Job(JobFormInput {
            id: form.target.map(JobId::new),
            title: value("title"),
            category: value("category"),
            job_type: value("job_type"),
            location: value("location"),
            salary: value("salary"),
            description: value("description"),
            status: value("status"),
        }),
        FormKind::Drug => FormPayload::Drug(DrugFormInput {
            id: form.target.map(DrugId::new),
            name: value("name"),
            category: value("category"),
            company: value("company"),
            price: value("price"),
            description: value("description"),
            image: image_from_field(&value("image"))?,
        }),
        FormKind::ApplicationReview => {
            let id = form
                .target
                .ok_or_else(|| anyhow!("application has no id -- refresh and retry"))?;
            let raw = value("status");
            let status = ApplicationStatus::parse(&raw).ok_or_else(|| {
                anyhow!("status {raw:?} is not one of pending, accepted or rejected")
            })?;
            FormPayload::ApplicationReview(ApplicationReviewInput {
                application_id: ApplicationId::new(id),
                status,
            })
        }
        FormKind::PlanPurchase => {
            let id = form
                .target
                .ok_or_else(|| anyhow!("plan has no id -- refresh and retry"))?;
            FormPayload::PlanPurchase(PlanPurchaseInput {
                plan_id: PlanId::new(id),
                payment_method: value("payment_method"),
            })
        }
    };
    Ok(payload)
}

fn image_from_field(raw: &str) -> Result<Option<ImageUpload>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    ImageUpload::from_path(Path::new(raw)).map(Some)
}

fn submit_current_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(form) = view_data.form.clone() else {
        return;
    };
    let payload = match build_payload(&form) {
        Ok(payload) => payload,
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("{error:#}"));
            return;
        }
    };

    let result = match &payload {
        FormPayload::Login(input) => runtime.sign_in(input).map(|()| true),
        FormPayload::Register(input) => runtime.register(input).map(|()| true),
        other => runtime.submit_form(other),
    };

    match result {
        Ok(true) if matches!(form.kind, FormKind::Login | FormKind::Register) => {
            view_data.form = None;
            dispatch_and_refresh(
                state,
                runtime,
                view_data,
                AppCommand::SessionStarted,
                internal_tx,
            );
        }
        Ok(true) => {
            view_data.form = None;
            state.dispatch(AppCommand::ExitToNav);
            let refreshed = match state.screen.resource() {
                Some(kind) => runtime.refresh(kind),
                None => Ok(()),
            }
            .and_then(|()| refresh_view_data(state, runtime, view_data));
            if let Err(error) = refreshed {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("load failed: {error:#}"),
                );
            }
            flush_notifications(state, runtime, view_data, internal_tx);
        }
        Ok(false) => flush_notifications(state, runtime, view_data, internal_tx),
        Err(error) => emit_status(state, view_data, internal_tx, format!("{error:#}")),
    }
}

fn detail_for(kind: ResourceKind, item: &CollectionItem) -> DetailUiState {
    let title = match item.id() {
        Some(id) => format!("{} #{id}", kind.noun()),
        None => kind.noun().to_owned(),
    };
    let lines = item
        .fields()
        .iter()
        .map(|(key, value)| format!("{key}: {}", value_text(value)))
        .collect();
    DetailUiState { title, lines }
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = state.dispatch(command);
    if should_refresh_view(&events)
        && let Err(error) = refresh_view_data(state, runtime, view_data)
    {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error}"),
        );
    }
    if events
        .iter()
        .any(|event| matches!(event, AppEvent::StatusUpdated(_)))
    {
        view_data.status_token = view_data.status_token.saturating_add(1);
        schedule_status_clear(internal_tx, view_data.status_token);
    }
}

fn should_refresh_view(events: &[AppEvent]) -> bool {
    events.iter().any(|event| {
        matches!(
            event,
            AppEvent::ScreenChanged(_) | AppEvent::Redirected { .. }
        )
    })
}

fn refresh_view_data<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    view_data.session_name = runtime.session_name();
    sync_auth_form(state, view_data);

    if let Some(kind) = state.screen.resource() {
        let snapshot = runtime.load_collection(kind)?;
        let view = view_data
            .lists
            .entry(kind)
            .or_insert_with(|| ListView::new(kind));
        if view.revision != Some(snapshot.revision) {
            view.controller.set_collection(snapshot.items);
            view.revision = Some(snapshot.revision);
        }
        view.loading = snapshot.loading;
        view.clamp_cursor();
    } else if state.screen == ScreenKind::CompanyProfile {
        view_data.profile = runtime.load_company_profile()?;
    }
    Ok(())
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let screens = visible_screens(state);
    let selected = screens
        .iter()
        .position(|screen| *screen == state.screen)
        .unwrap_or(0);
    let tab_titles = screens
        .iter()
        .map(|screen| screen.label().to_owned())
        .collect::<Vec<String>>();
    let title = match &view_data.session_name {
        Some(name) => format!("medjobs | {name}"),
        None => "medjobs".to_owned(),
    };
    let tabs = Tabs::new(tab_titles)
        .block(Block::default().title(title).borders(Borders::ALL))
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .select(selected);
    frame.render_widget(tabs, layout[0]);

    match state.screen.resource() {
        Some(kind) => render_table(frame, layout[1], kind, view_data),
        None if state.screen == ScreenKind::CompanyProfile => {
            let body = Paragraph::new(render_profile_text(view_data.profile.as_ref()))
                .block(Block::default().borders(Borders::ALL).title("company"));
            frame.render_widget(body, layout[1]);
        }
        None => {
            let body = Paragraph::new("sign in to manage your listings")
                .block(Block::default().borders(Borders::ALL));
            frame.render_widget(body, layout[1]);
        }
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(form) = &view_data.form {
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(render_form_text(form)).block(
            Block::default()
                .title(form_title(form.kind, form.target))
                .borders(Borders::ALL)
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(widget, area);
    }

    if let Some(detail) = &view_data.detail {
        let area = centered_rect(70, 60, frame.area());
        frame.render_widget(Clear, area);
        let widget = Paragraph::new(detail.lines.join("\n"))
            .block(Block::default().title(detail.title.clone()).borders(Borders::ALL));
        frame.render_widget(widget, area);
    }

    if view_data.help_visible {
        let area = centered_rect(80, 60, frame.area());
        frame.render_widget(Clear, area);
        let help = Paragraph::new(help_overlay_text())
            .block(Block::default().title("help").borders(Borders::ALL));
        frame.render_widget(help, area);
    }
}

fn visible_screens(state: &AppState) -> Vec<ScreenKind> {
    if state.signed_in {
        ScreenKind::ROTATION.to_vec()
    } else {
        vec![ScreenKind::Login, ScreenKind::Register]
    }
}

fn help_overlay_text() -> &'static str {
    "global: ctrl+q quit | b/f screens | r refresh | L sign out | ? help\n\
nav: j/k/h/l g/G ctrl+d/u | / search | 1-9 cycle filter | 0 clear filters\n\
nav: space select | * select visible | - clear selection | s sort column | enter view | i edit\n\
edit: a add | e edit/review/purchase | d delete | D delete selected | esc nav\n\
search: type to filter the first column | backspace | ctrl+u clear | enter/esc done\n\
form: tab/shift+tab field | enter submit | esc cancel | ctrl+r login/register\n\
detail: any key close"
}

fn render_table(frame: &mut ratatui::Frame<'_>, area: Rect, kind: ResourceKind, view_data: &ViewData) {
    let Some(view) = view_data.lists.get(&kind) else {
        let empty = Paragraph::new("loading...")
            .block(Block::default().borders(Borders::ALL).title(kind.label()));
        frame.render_widget(empty, area);
        return;
    };

    let columns = view.controller.columns();
    let mut widths = vec![Constraint::Length(2)];
    widths.extend(std::iter::repeat_n(Constraint::Min(8), columns.len()));

    let mut header_cells = vec![Cell::from(String::new())];
    header_cells.extend(
        (0..columns.len()).map(|index| {
            Cell::from(header_label(&view.controller, index)).style(
                Style::default()
                    .fg(Color::White)
                    .add_modifier(Modifier::BOLD),
            )
        }),
    );
    let header = Row::new(header_cells);

    // Header and borders take three lines.
    let page = usize::from(area.height.saturating_sub(4)).max(1);
    let offset = view.cursor_row.saturating_sub(page - 1);

    let rows = view
        .controller
        .visible()
        .into_iter()
        .enumerate()
        .skip(offset)
        .take(page)
        .map(|(row_index, item)| {
            let cursor = row_index == view.cursor_row;
            let mark = if view.controller.is_selected(row_index) {
                SELECTED_MARK
            } else {
                ""
            };
            let mut cells = vec![Cell::from(mark).style(Style::default().fg(Color::Green))];
            cells.extend(columns.iter().enumerate().map(|(col_index, column)| {
                let mut style = Style::default();
                if cursor {
                    style = style.bg(Color::DarkGray);
                }
                if cursor && col_index == view.cursor_col {
                    style = Style::default()
                        .fg(Color::Black)
                        .bg(Color::Cyan)
                        .add_modifier(Modifier::BOLD);
                }
                Cell::from(item.text(&column.field)).style(style)
            }));
            Row::new(cells)
        })
        .collect::<Vec<_>>();

    let table = Table::new(rows, widths)
        .header(header)
        .column_spacing(1)
        .block(
            Block::default()
                .title(table_title(kind, view))
                .borders(Borders::ALL),
        );
    frame.render_widget(table, area);
}

fn header_label(controller: &ListController, index: usize) -> String {
    let Some(column) = controller.columns().get(index) else {
        return String::new();
    };
    match controller.sort() {
        Some(sort) if sort.column == index => {
            let mark = match sort.direction {
                SortDirection::Asc => SORT_MARK_ASC,
                SortDirection::Desc => SORT_MARK_DESC,
            };
            format!("{} {mark}", column.title)
        }
        _ => column.title.clone(),
    }
}

fn table_title(kind: ResourceKind, view: &ListView) -> String {
    let controller = &view.controller;
    let mut parts = vec![format!(
        "{} {}/{}",
        kind.label(),
        controller.visible_len(),
        controller.items().len()
    )];
    if !controller.search().is_empty() {
        parts.push(format!("search: {}", controller.search()));
    }
    let filters = controller
        .filter_descriptors()
        .iter()
        .filter(|descriptor| descriptor.is_active())
        .map(|descriptor| format!("{FILTER_MARK_ACTIVE} {}", descriptor.selected_label()))
        .collect::<Vec<_>>();
    if !filters.is_empty() {
        parts.push(filters.join(" "));
    }
    let selected = controller.selection_len();
    if selected > 0 {
        let visible = controller.selected_visible().len();
        if visible == selected {
            parts.push(format!("{selected} selected"));
        } else {
            parts.push(format!("{selected} selected ({visible} shown)"));
        }
    }
    if view.loading {
        parts.push("loading".to_owned());
    }
    parts.join(" | ")
}

fn render_form_text(form: &FormUiState) -> String {
    form_field_specs(form.kind)
        .iter()
        .zip(&form.values)
        .enumerate()
        .map(|(index, (spec, value))| {
            let cursor = if index == form.field_index { ">" } else { " " };
            let shown = if spec.secret {
                MASK.to_string().repeat(value.chars().count())
            } else {
                value.clone()
            };
            format!("{cursor} {}: {shown}", spec.label)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_profile_text(profile: Option<&CollectionItem>) -> String {
    let Some(profile) = profile else {
        return "no company profile yet -- press i then e to fill it in".to_owned();
    };
    ["name", "email", "phone", "address", "website", "description", "logo"]
        .iter()
        .map(|key| format!("{key}: {}", profile.text(key)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    if view_data.help_visible {
        return String::new();
    }
    if let Some(pending) = &view_data.pending_delete {
        return format!("CONFIRM | delete {}? y/n", pending.label);
    }

    let mode = mode_label(state.mode);
    let hints = match state.mode {
        AppMode::Nav if state.screen.resource().is_some() => {
            "j/k/h/l g/G | / search | 1-9 filter 0 clear | space * - select | s sort | enter view | i edit | b/f | ? | ctrl+q"
        }
        AppMode::Nav => "b/f screens | i edit | r refresh | L sign out | ? | ctrl+q",
        AppMode::Search => "type to search | enter/esc done",
        AppMode::Edit => "a add | e edit | d delete | D delete selected | esc nav",
        AppMode::Form(FormKind::Login | FormKind::Register) => {
            "tab field | enter submit | ctrl+r login/register | ctrl+q"
        }
        AppMode::Form(_) => "tab/shift+tab field | enter submit | esc cancel",
    };
    let mut default = hints.to_owned();
    if let AppMode::Form(kind) = state.mode
        && let Some(form) = &view_data.form
        && let Some(spec) = form_field_specs(kind).get(form.field_index)
    {
        default = format!("{} | {default}", spec.label);
    }
    if state.mode == AppMode::Search
        && let Some(view) = view_data.list(state)
    {
        default = format!("/{} | {default}", view.controller.search());
    }
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {default}"),
        None => format!("{mode} | {default}"),
    }
}

fn mode_label(mode: AppMode) -> &'static str {
    match mode {
        AppMode::Nav => "NAV",
        AppMode::Search => "SEARCH",
        AppMode::Edit => "EDIT",
        AppMode::Form(_) => "FORM",
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, CollectionSnapshot, FormUiState, ViewData, build_payload, handle_key_event,
        form_field_specs, help_overlay_text, refresh_view_data, render_form_text, status_text,
        table_title,
    };
    use anyhow::{Result, bail};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use medjobs_app::{
        AppMode, AppState, ApplicationStatus, CollectionItem, FormKind, FormPayload,
        LoginFormInput, Notification, RegisterFormInput, ResourceKind, ScreenKind,
    };
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::mpsc;

    #[derive(Debug, Default)]
    struct TestRuntime {
        collections: HashMap<ResourceKind, Vec<CollectionItem>>,
        revision: u64,
        submitted: Vec<FormPayload>,
        deleted: Vec<(ResourceKind, i64)>,
        refreshed: Vec<ResourceKind>,
        reject_submissions: bool,
        session: Option<String>,
        notifications: Vec<Notification>,
    }

    impl TestRuntime {
        fn with_jobs() -> Self {
            let jobs = [
                (1, "Nurse", "nursing", "open"),
                (2, "Pharmacist", "pharmacy", "open"),
                (3, "Night nurse", "nursing", "closed"),
            ]
            .into_iter()
            .filter_map(|(id, title, category, status)| {
                CollectionItem::from_value(json!({
                    "id": id,
                    "title": title,
                    "category": category,
                    "job_type": "full-time",
                    "location": "Cairo",
                    "status": status,
                }))
            })
            .collect();
            let mut runtime = Self {
                session: Some("HR".to_owned()),
                ..Self::default()
            };
            runtime.collections.insert(ResourceKind::Jobs, jobs);
            runtime
        }
    }

    impl AppRuntime for TestRuntime {
        fn load_collection(&mut self, kind: ResourceKind) -> Result<CollectionSnapshot> {
            Ok(CollectionSnapshot {
                items: self.collections.get(&kind).cloned().unwrap_or_default(),
                revision: self.revision,
                loading: false,
            })
        }

        fn refresh(&mut self, kind: ResourceKind) -> Result<()> {
            self.refreshed.push(kind);
            self.revision += 1;
            Ok(())
        }

        fn load_company_profile(&mut self) -> Result<Option<CollectionItem>> {
            Ok(None)
        }

        fn submit_form(&mut self, payload: &FormPayload) -> Result<bool> {
            self.submitted.push(payload.clone());
            if self.reject_submissions {
                self.notifications
                    .push(Notification::error("title has already been taken"));
                return Ok(false);
            }
            self.notifications
                .push(Notification::success(payload.action_label()));
            Ok(true)
        }

        fn delete_item(&mut self, kind: ResourceKind, id: i64) -> Result<bool> {
            self.deleted.push((kind, id));
            if let Some(items) = self.collections.get_mut(&kind) {
                items.retain(|item| item.id() != Some(id));
            }
            self.notifications
                .push(Notification::success(format!("{} deleted", kind.noun())));
            Ok(true)
        }

        fn sign_in(&mut self, form: &LoginFormInput) -> Result<()> {
            if form.password != "secret123" {
                bail!("invalid credentials");
            }
            self.session = Some(form.email.clone());
            Ok(())
        }

        fn register(&mut self, form: &RegisterFormInput) -> Result<()> {
            self.session = Some(form.name.clone());
            Ok(())
        }

        fn sign_out(&mut self) -> Result<()> {
            self.session = None;
            Ok(())
        }

        fn session_name(&self) -> Option<String> {
            self.session.clone()
        }

        fn drain_notifications(&mut self) -> Vec<Notification> {
            std::mem::take(&mut self.notifications)
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ch(value: char) -> KeyEvent {
        key(KeyCode::Char(value))
    }

    fn ctrl(value: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(value), KeyModifiers::CONTROL)
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<super::InternalEvent>,
    }

    impl Harness {
        fn signed_in() -> Result<Self> {
            let mut state = AppState::signed_in();
            let mut runtime = TestRuntime::with_jobs();
            let mut view_data = ViewData::default();
            refresh_view_data(&mut state, &mut runtime, &mut view_data)?;
            let (tx, _rx) = mpsc::channel();
            Ok(Self {
                state,
                runtime,
                view_data,
                tx,
            })
        }

        fn signed_out() -> Result<Self> {
            let mut state = AppState::default();
            let mut runtime = TestRuntime::with_jobs();
            runtime.session = None;
            let mut view_data = ViewData::default();
            refresh_view_data(&mut state, &mut runtime, &mut view_data)?;
            let (tx, _rx) = mpsc::channel();
            Ok(Self {
                state,
                runtime,
                view_data,
                tx,
            })
        }

        fn press(&mut self, key: KeyEvent) -> bool {
            handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            )
        }

        fn type_text(&mut self, text: &str) {
            for value in text.chars() {
                self.press(ch(value));
            }
        }

        fn visible_titles(&self) -> Vec<String> {
            self.view_data
                .list(&self.state)
                .map(|view| {
                    view.controller
                        .visible()
                        .iter()
                        .map(|item| item.text("title"))
                        .collect()
                })
                .unwrap_or_default()
        }

        fn status(&self) -> String {
            self.state.status_line.clone().unwrap_or_default()
        }
    }

    #[test]
    fn ctrl_q_quits() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        assert!(harness.press(ctrl('q')));
        assert!(!harness.press(ch('j')));
        Ok(())
    }

    #[test]
    fn search_mode_filters_live_on_the_first_column() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('/'));
        assert_eq!(harness.state.mode, AppMode::Search);
        harness.type_text("NURSE");
        assert_eq!(harness.visible_titles(), vec!["Nurse", "Night nurse"]);

        harness.press(key(KeyCode::Backspace));
        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.state.mode, AppMode::Nav);
        let view = harness.view_data.list(&harness.state).expect("jobs view");
        assert_eq!(view.controller.search(), "NURS");
        Ok(())
    }

    #[test]
    fn digit_cycles_filter_and_zero_clears() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('1'));
        assert_eq!(harness.status(), "filter: nursing");
        assert_eq!(harness.visible_titles(), vec!["Nurse", "Night nurse"]);

        harness.press(ch('3'));
        assert_eq!(harness.visible_titles(), vec!["Nurse"]);

        harness.press(ch('0'));
        assert_eq!(harness.visible_titles().len(), 3);
        Ok(())
    }

    #[test]
    fn selection_survives_filtering_and_title_reports_hidden_rows() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('j'));
        harness.press(ch(' '));
        assert_eq!(harness.status(), "selected (1 selected)");

        harness.press(ch('1'));
        let view = harness.view_data.list(&harness.state).expect("jobs view");
        assert_eq!(view.controller.selection_len(), 1);
        assert!(view.controller.selected_visible().is_empty());
        assert!(table_title(ResourceKind::Jobs, view).contains("1 selected (0 shown)"));
        Ok(())
    }

    #[test]
    fn sort_cycles_on_cursor_column() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('s'));
        assert_eq!(harness.status(), "sort Title asc");
        assert_eq!(
            harness.visible_titles(),
            vec!["Night nurse", "Nurse", "Pharmacist"]
        );
        harness.press(ch('s'));
        assert_eq!(harness.status(), "sort Title desc");
        harness.press(ch('s'));
        assert_eq!(harness.status(), "sort off");
        assert_eq!(harness.visible_titles()[0], "Nurse");
        Ok(())
    }

    #[test]
    fn enter_opens_detail_and_any_key_closes_it() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(key(KeyCode::Enter));
        let detail = harness.view_data.detail.clone().expect("detail open");
        assert_eq!(detail.title, "Job #1");
        assert!(detail.lines.contains(&"title: Nurse".to_owned()));

        harness.press(ch('j'));
        assert!(harness.view_data.detail.is_none());
        Ok(())
    }

    #[test]
    fn delete_requires_confirmation() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('d'));
        assert!(harness.view_data.pending_delete.is_none(), "nav mode ignores d");

        harness.press(ch('i'));
        assert_eq!(harness.state.mode, AppMode::Edit);
        harness.press(ch('d'));
        assert!(status_text(&harness.state, &harness.view_data).contains("delete job #1? y/n"));
        harness.press(ch('n'));
        assert!(harness.runtime.deleted.is_empty());
        assert_eq!(harness.status(), "delete cancelled");

        harness.press(ch('d'));
        harness.press(ch('y'));
        assert_eq!(harness.runtime.deleted, vec![(ResourceKind::Jobs, 1)]);
        assert_eq!(harness.runtime.refreshed, vec![ResourceKind::Jobs]);
        assert_eq!(harness.visible_titles(), vec!["Pharmacist", "Night nurse"]);
        assert_eq!(harness.status(), "Job deleted");
        Ok(())
    }

    #[test]
    fn bulk_delete_uses_the_selection() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('*'));
        harness.press(ch('i'));
        harness.press(ch('D'));
        let pending = harness.view_data.pending_delete.clone().expect("pending");
        assert_eq!(pending.ids, vec![1, 2, 3]);
        harness.press(ch('y'));
        assert_eq!(harness.runtime.deleted.len(), 3);
        assert!(harness.visible_titles().is_empty());
        Ok(())
    }

    #[test]
    fn add_form_submits_and_refreshes() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('i'));
        harness.press(ch('a'));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Job));
        harness.type_text("Radiologist");
        harness.press(key(KeyCode::Enter));

        let [FormPayload::Job(job)] = harness.runtime.submitted.as_slice() else {
            panic!("expected one job submission");
        };
        assert_eq!(job.title, "Radiologist");
        assert_eq!(job.status, "open");
        assert!(job.id.is_none());
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert!(harness.view_data.form.is_none());
        assert_eq!(harness.status(), "Job created");
        Ok(())
    }

    #[test]
    fn rejected_form_stays_open_with_the_error() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.runtime.reject_submissions = true;
        harness.press(ch('i'));
        harness.press(ch('e'));
        let form = harness.view_data.form.clone().expect("edit form");
        assert_eq!(form.target, Some(1));
        assert_eq!(form.value("title"), "Nurse");

        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Job));
        assert_eq!(harness.status(), "error: title has already been taken");

        harness.press(key(KeyCode::Esc));
        assert!(harness.view_data.form.is_none());
        assert_eq!(harness.state.mode, AppMode::Nav);
        Ok(())
    }

    #[test]
    fn signed_out_user_lands_on_login_form() -> Result<()> {
        let mut harness = Harness::signed_out()?;
        assert_eq!(harness.state.screen, ScreenKind::Login);
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Login));

        harness.type_text("hr@clinic.example");
        harness.press(key(KeyCode::Tab));
        harness.type_text("wrong");
        harness.press(key(KeyCode::Enter));
        assert_eq!(harness.status(), "invalid credentials");
        assert!(!harness.state.signed_in);

        let form = harness.view_data.form.clone().expect("login form");
        assert!(render_form_text(&form).contains("Password: •••••"));

        for _ in 0..5 {
            harness.press(key(KeyCode::Backspace));
        }
        harness.type_text("secret123");
        harness.press(key(KeyCode::Enter));
        assert!(harness.state.signed_in);
        assert_eq!(harness.state.screen, ScreenKind::HOME);
        assert!(harness.view_data.form.is_none());
        assert_eq!(harness.visible_titles().len(), 3);
        Ok(())
    }

    #[test]
    fn ctrl_r_switches_between_login_and_register() -> Result<()> {
        let mut harness = Harness::signed_out()?;
        harness.press(ctrl('r'));
        assert_eq!(harness.state.screen, ScreenKind::Register);
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Register));
        harness.press(key(KeyCode::Esc));
        assert_eq!(harness.state.screen, ScreenKind::Login);
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Login));
        Ok(())
    }

    #[test]
    fn sign_out_returns_to_login() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('L'));
        assert!(!harness.state.signed_in);
        assert_eq!(harness.state.screen, ScreenKind::Login);
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Login));
        assert!(harness.view_data.lists.is_empty());
        Ok(())
    }

    #[test]
    fn screens_rotate_and_load_their_collections() -> Result<()> {
        let mut harness = Harness::signed_in()?;
        harness.press(ch('f'));
        assert_eq!(harness.state.screen, ScreenKind::Drugs);
        assert!(harness.view_data.lists.contains_key(&ResourceKind::Drugs));
        harness.press(ch('b'));
        harness.press(ch('b'));
        assert_eq!(harness.state.screen, ScreenKind::CompanyProfile);
        Ok(())
    }

    #[test]
    fn review_form_builds_status_payload() -> Result<()> {
        let form = FormUiState {
            kind: FormKind::ApplicationReview,
            values: vec!["Accepted".to_owned()],
            field_index: 0,
            target: Some(9),
        };
        let FormPayload::ApplicationReview(review) = build_payload(&form)? else {
            panic!("expected review payload");
        };
        assert_eq!(review.application_id.get(), 9);
        assert_eq!(review.status, ApplicationStatus::Accepted);

        let bad = FormUiState {
            values: vec!["maybe".to_owned()],
            ..form
        };
        assert!(build_payload(&bad).is_err());
        Ok(())
    }

    #[test]
    fn missing_image_file_is_reported() {
        let form = FormUiState {
            kind: FormKind::Drug,
            values: vec![
                "Aspirin".to_owned(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                "/nonexistent/aspirin.png".to_owned(),
            ],
            field_index: 0,
            target: None,
        };
        assert!(build_payload(&form).is_err());
    }

    #[test]
    fn help_mentions_every_mode() {
        let help = help_overlay_text();
        for section in ["global:", "nav:", "edit:", "search:", "form:"] {
            assert!(help.contains(section), "help missing {section}");
        }
    }

    #[test]
    fn every_form_has_unique_fields_and_masks_only_passwords() {
        let kinds = [
            FormKind::Login,
            FormKind::Register,
            FormKind::CompanyProfile,
            FormKind::Job,
            FormKind::Drug,
            FormKind::ApplicationReview,
            FormKind::PlanPurchase,
        ];
        for kind in kinds {
            let fields = form_field_specs(kind);
            assert!(!fields.is_empty(), "{kind:?} has no fields");
            for (index, field) in fields.iter().enumerate() {
                assert!(
                    fields[index + 1..].iter().all(|other| other.key != field.key),
                    "{kind:?} repeats {}",
                    field.key
                );
                assert_eq!(field.secret, field.key.starts_with("password"), "{}", field.key);
            }
        }
        assert_eq!(form_field_specs(FormKind::Register).len(), 6);
    }
}
