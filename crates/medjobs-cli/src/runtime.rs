// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use medjobs_api::{
    Client, CollectionFetcher, FetchOptions, FetchUpdate, MutationDispatcher, submit_form,
};
use medjobs_app::{
    CollectionItem, FormPayload, LoginFormInput, MutationMethod, Notification, NotificationLog,
    RegisterFormInput, ResourceKind, Session, SessionService, SessionStore,
};
use medjobs_tui::{AppRuntime, CollectionSnapshot};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

const PROFILE_PATH: &str = "company/profile";

/// Backs the terminal UI with the remote API: one fetcher per resource,
/// started lazily the first time its screen is shown.
pub struct ApiRuntime<S: SessionStore> {
    client: Client,
    sessions: SessionService<S>,
    notifications: NotificationLog,
    poll_interval: Option<Duration>,
    fetchers: HashMap<ResourceKind, CollectionFetcher>,
    revisions: HashMap<ResourceKind, u64>,
    updates_tx: Sender<FetchUpdate>,
    updates_rx: Receiver<FetchUpdate>,
}

impl<S: SessionStore> ApiRuntime<S> {
    pub fn new(
        client: Client,
        sessions: SessionService<S>,
        poll_interval: Option<Duration>,
    ) -> Self {
        let (updates_tx, updates_rx) = mpsc::channel();
        Self {
            client,
            sessions,
            notifications: NotificationLog::new(),
            poll_interval,
            fetchers: HashMap::new(),
            revisions: HashMap::new(),
            updates_tx,
            updates_rx,
        }
    }

    fn fetcher(&mut self, kind: ResourceKind) -> &CollectionFetcher {
        let client = &self.client;
        let updates_tx = &self.updates_tx;
        let poll_interval = self.poll_interval;
        self.fetchers.entry(kind).or_insert_with(|| {
            let mut fetcher = CollectionFetcher::new(
                client.clone(),
                kind.collection_path(),
                FetchOptions {
                    enabled: true,
                    poll_interval,
                },
            );
            fetcher.add_listener(updates_tx.clone());
            fetcher.start();
            fetcher
        })
    }

    /// Drops every fetcher so the next screen load starts over with the
    /// current credentials.
    fn reset_fetchers(&mut self) {
        self.fetchers.clear();
        self.revisions.clear();
        while self.updates_rx.try_recv().is_ok() {}
    }

    fn start_session(&mut self, session: Session) -> Result<()> {
        self.sessions.set(session)?;
        self.reset_fetchers();
        Ok(())
    }

    fn notifier(&self) -> Arc<NotificationLog> {
        Arc::new(self.notifications.clone())
    }
}

impl<S: SessionStore> AppRuntime for ApiRuntime<S> {
    fn load_collection(&mut self, kind: ResourceKind) -> Result<CollectionSnapshot> {
        let fetcher = self.fetcher(kind);
        let items = fetcher.collection();
        let loading = fetcher.loading();
        Ok(CollectionSnapshot {
            items,
            revision: self.revisions.get(&kind).copied().unwrap_or_default(),
            loading,
        })
    }

    fn refresh(&mut self, kind: ResourceKind) -> Result<()> {
        self.fetcher(kind).refetch();
        Ok(())
    }

    fn load_company_profile(&mut self) -> Result<Option<CollectionItem>> {
        match self.client.get_json(PROFILE_PATH) {
            Ok(payload) => {
                let profile = match payload.get("data") {
                    Some(data @ Value::Object(_)) => data.clone(),
                    _ => payload,
                };
                Ok(CollectionItem::from_value(profile))
            }
            Err(error) if error.status_code() == Some(404) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn submit_form(&mut self, payload: &FormPayload) -> Result<bool> {
        let outcome = submit_form(&self.client, self.notifier(), payload);
        Ok(outcome.is_success())
    }

    fn delete_item(&mut self, kind: ResourceKind, id: i64) -> Result<bool> {
        let dispatcher = MutationDispatcher::new(
            self.client.clone(),
            kind.item_path(id),
            MutationMethod::Delete,
            self.notifier(),
        );
        let label = format!("{} deleted", kind.noun());
        Ok(dispatcher.dispatch(&Value::Null, &label).is_success())
    }

    fn sign_in(&mut self, form: &LoginFormInput) -> Result<()> {
        let session = medjobs_api::login(&self.client, form)?;
        self.start_session(session)
    }

    fn register(&mut self, form: &RegisterFormInput) -> Result<()> {
        let session = medjobs_api::register(&self.client, form)?;
        self.start_session(session)
    }

    fn sign_out(&mut self) -> Result<()> {
        self.sessions.clear()?;
        self.reset_fetchers();
        self.notifications.drain();
        Ok(())
    }

    fn session_name(&self) -> Option<String> {
        self.sessions
            .get()
            .map(|session| session.display_name().to_owned())
    }

    fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    fn take_updates(&mut self) -> bool {
        let mut landed = false;
        while let Ok(update) = self.updates_rx.try_recv() {
            let Some(kind) = ResourceKind::ALL
                .into_iter()
                .find(|kind| kind.collection_path() == update.path)
            else {
                continue;
            };
            self.revisions.insert(kind, update.request_id);
            landed = true;
        }
        landed
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use anyhow::Result;
    use medjobs_api::Client;
    use medjobs_app::{
        FormPayload, JobFormInput, LoginFormInput, MemorySessionStore, NotifyLevel,
        ResourceKind, SessionService, SessionStore,
    };
    use medjobs_testkit::{MockApi, MockResponse, PortalFaker, collection_payload, sample_session};
    use medjobs_tui::AppRuntime;
    use serde_json::json;
    use std::thread;
    use std::time::{Duration, Instant};

    fn runtime_for(api: &MockApi, signed_in: bool) -> Result<ApiRuntime<MemorySessionStore>> {
        let sessions = SessionService::new(MemorySessionStore::new());
        if signed_in {
            sessions.set(sample_session())?;
        }
        let client = Client::new(api.base_url(), Duration::from_secs(2), sessions.handle())?;
        Ok(ApiRuntime::new(client, sessions, None))
    }

    fn wait_for_update(runtime: &mut ApiRuntime<MemorySessionStore>) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if runtime.take_updates() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn first_load_starts_fetch_and_update_bumps_revision() -> Result<()> {
        let api = MockApi::start()?;
        let jobs = PortalFaker::new(7).jobs(3);
        api.route("GET", "jobs", MockResponse::json(200, &collection_payload(&jobs)));
        let mut runtime = runtime_for(&api, true)?;

        let first = runtime.load_collection(ResourceKind::Jobs)?;
        assert_eq!(first.revision, 0);

        assert!(wait_for_update(&mut runtime), "fetch should land");
        let loaded = runtime.load_collection(ResourceKind::Jobs)?;
        assert_eq!(loaded.items, jobs);
        assert!(loaded.revision > 0);
        assert!(!loaded.loading);

        runtime.refresh(ResourceKind::Jobs)?;
        assert!(wait_for_update(&mut runtime), "refetch should land");
        assert!(runtime.load_collection(ResourceKind::Jobs)?.revision > loaded.revision);
        assert_eq!(api.request_count(), 2);
        Ok(())
    }

    #[test]
    fn delete_hits_item_path_and_notifies() -> Result<()> {
        let api = MockApi::start()?;
        api.route("DELETE", "jobs/4", MockResponse::json(200, &json!({"ok": true})));
        let mut runtime = runtime_for(&api, true)?;

        assert!(runtime.delete_item(ResourceKind::Jobs, 4)?);
        let request = &api.requests()[0];
        assert_eq!(request.method, "DELETE");
        assert_eq!(request.path, "/api/jobs/4");

        let notes = runtime.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "Job deleted");
        Ok(())
    }

    #[test]
    fn rejected_form_reports_each_validation_message() -> Result<()> {
        let api = MockApi::start()?;
        api.route(
            "POST",
            "jobs",
            MockResponse::json(
                422,
                &json!({"errors": {"title": ["taken"], "salary": ["must be a number"]}}),
            ),
        );
        let mut runtime = runtime_for(&api, true)?;
        let form = FormPayload::Job(JobFormInput {
            id: None,
            title: "Nurse".to_owned(),
            category: "nursing".to_owned(),
            job_type: "full-time".to_owned(),
            location: "Cairo".to_owned(),
            salary: "12000".to_owned(),
            description: String::new(),
            status: "open".to_owned(),
        });

        assert!(!runtime.submit_form(&form)?);
        assert_eq!(api.request_count(), 1);
        let notes = runtime.drain_notifications();
        assert!(notes.iter().all(|note| note.level == NotifyLevel::Error));
        let messages: Vec<&str> = notes.iter().map(|note| note.message.as_str()).collect();
        assert_eq!(messages, ["taken", "must be a number"]);
        Ok(())
    }

    #[test]
    fn sign_in_persists_session_and_sign_out_clears_it() -> Result<()> {
        let api = MockApi::start()?;
        api.route(
            "POST",
            "auth/login",
            MockResponse::json(
                200,
                &json!({"token": "fresh", "user": {"id": 12, "name": "Dr. Amal"}}),
            ),
        );
        let mut runtime = runtime_for(&api, false)?;
        assert_eq!(runtime.session_name(), None);

        runtime.sign_in(&LoginFormInput {
            email: "amal@clinic.example".to_owned(),
            password: "secret123".to_owned(),
        })?;
        assert_eq!(runtime.session_name().as_deref(), Some("Dr. Amal"));
        assert!(runtime.sessions.store().load_session()?.is_some());

        runtime.sign_out()?;
        assert_eq!(runtime.session_name(), None);
        assert!(runtime.sessions.store().load_session()?.is_none());
        Ok(())
    }

    #[test]
    fn missing_profile_is_none() -> Result<()> {
        let api = MockApi::start()?;
        let mut runtime = runtime_for(&api, true)?;
        assert_eq!(runtime.load_company_profile()?, None);

        api.route(
            "GET",
            "company/profile",
            MockResponse::json(200, &json!({"data": {"id": 3, "name": "Nile Clinic"}})),
        );
        let profile = runtime.load_company_profile()?.expect("profile");
        assert_eq!(profile.text("name"), "Nile Clinic");
        Ok(())
    }
}
