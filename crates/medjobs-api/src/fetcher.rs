// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Authenticated collection GET with optional fixed-interval polling.
//!
//! Every request takes a fresh id. A response lands only when its id is
//! newer than the last applied one and newer than the last cancellation,
//! so a slow request can never overwrite fresher data and a stopped fetcher
//! ignores whatever was still in flight.

use medjobs_app::{CollectionItem, items_from_payload};
use serde_json::Value;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::Client;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub enabled: bool,
    pub poll_interval: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval: None,
        }
    }
}

/// Sent to listeners each time a response replaces the data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchUpdate {
    pub path: String,
    pub request_id: u64,
}

#[derive(Debug)]
struct FetchState {
    path: String,
    enabled: bool,
    data: Option<Value>,
    loading: bool,
    in_flight: usize,
    next_request: u64,
    last_applied: u64,
    cancel_floor: u64,
    /// Bumped on every cancellation. Work scheduled under an older
    /// generation never starts.
    generation: u64,
    listeners: Vec<Sender<FetchUpdate>>,
}

struct Ticket {
    id: u64,
    path: String,
}

impl FetchState {
    fn begin(&mut self, generation: u64) -> Option<Ticket> {
        if !self.enabled || generation != self.generation {
            return None;
        }
        self.next_request += 1;
        self.in_flight += 1;
        self.loading = true;
        Some(Ticket {
            id: self.next_request,
            path: self.path.clone(),
        })
    }

    fn finish(&mut self, ticket: &Ticket, payload: Option<Value>) -> bool {
        self.in_flight = self.in_flight.saturating_sub(1);
        self.loading = self.in_flight > 0 && self.enabled;

        let Some(payload) = payload else {
            return false;
        };
        if !accepts(ticket.id, self.last_applied, self.cancel_floor) {
            tracing::debug!(
                path = %ticket.path,
                request = ticket.id,
                "discarding superseded response"
            );
            return false;
        }

        self.data = Some(payload);
        self.last_applied = ticket.id;
        let update = FetchUpdate {
            path: ticket.path.clone(),
            request_id: ticket.id,
        };
        self.listeners
            .retain(|listener| listener.send(update.clone()).is_ok());
        true
    }

    fn cancel(&mut self) {
        self.cancel_floor = self.next_request;
        self.generation += 1;
        self.loading = false;
    }
}

/// Whether a settled request may replace the current data.
pub fn accepts(request_id: u64, last_applied: u64, cancel_floor: u64) -> bool {
    request_id > last_applied && request_id > cancel_floor
}

struct Poller {
    stop: Sender<()>,
    worker: JoinHandle<()>,
}

pub struct CollectionFetcher {
    client: Client,
    poll_interval: Option<Duration>,
    state: Arc<Mutex<FetchState>>,
    poller: Option<Poller>,
}

impl CollectionFetcher {
    pub fn new(client: Client, path: impl Into<String>, options: FetchOptions) -> Self {
        Self {
            client,
            poll_interval: options.poll_interval.filter(|interval| !interval.is_zero()),
            state: Arc::new(Mutex::new(FetchState {
                path: path.into(),
                enabled: options.enabled,
                data: None,
                loading: options.enabled,
                in_flight: 0,
                next_request: 0,
                last_applied: 0,
                cancel_floor: 0,
                generation: 0,
                listeners: Vec::new(),
            })),
            poller: None,
        }
    }

    /// Issues the first request and, with a poll interval, keeps polling
    /// until stopped. A no-op when disabled.
    pub fn start(&mut self) {
        if !self.enabled() {
            return;
        }
        self.refetch();
        self.start_polling();
    }

    /// Fires one background request.
    pub fn refetch(&self) {
        let client = self.client.clone();
        let state = Arc::clone(&self.state);
        let generation = self.generation();
        thread::spawn(move || {
            run_request(&client, &state, generation);
        });
    }

    /// Runs one request on the calling thread. Returns whether it replaced
    /// the data.
    pub fn refetch_blocking(&self) -> bool {
        run_request(&self.client, &self.state, self.generation())
    }

    pub fn data(&self) -> Option<Value> {
        lock(&self.state).data.clone()
    }

    pub fn collection(&self) -> Vec<CollectionItem> {
        lock(&self.state)
            .data
            .as_ref()
            .map(items_from_payload)
            .unwrap_or_default()
    }

    pub fn loading(&self) -> bool {
        lock(&self.state).loading
    }

    pub fn enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    pub fn path(&self) -> String {
        lock(&self.state).path.clone()
    }

    fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|poller| !poller.worker.is_finished())
    }

    pub fn add_listener(&self, listener: Sender<FetchUpdate>) {
        lock(&self.state).listeners.push(listener);
    }

    /// Points the fetcher at a new path, cancelling pending work and
    /// restarting when enabled.
    pub fn set_path(&mut self, path: impl Into<String>) {
        let path = path.into();
        if lock(&self.state).path == path {
            return;
        }
        self.stop();
        lock(&self.state).path = path;
        self.start();
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled() == enabled {
            return;
        }
        if enabled {
            lock(&self.state).enabled = true;
            self.start();
        } else {
            lock(&self.state).enabled = false;
            self.stop();
        }
    }

    /// Cancels the poll timer and discards responses still in flight.
    pub fn stop(&mut self) {
        lock(&self.state).cancel();
        if let Some(poller) = self.poller.take() {
            let _ = poller.stop.send(());
            tracing::debug!(path = %self.path(), "polling stopped");
        }
    }

    fn start_polling(&mut self) {
        let Some(interval) = self.poll_interval else {
            return;
        };
        if self.is_polling() {
            return;
        }

        let (stop, stopped) = mpsc::channel::<()>();
        let client = self.client.clone();
        let state = Arc::clone(&self.state);
        let generation = self.generation();
        tracing::debug!(
            path = %self.path(),
            interval_ms = interval.as_millis() as u64,
            "polling started"
        );
        let worker = thread::spawn(move || {
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        run_request(&client, &state, generation);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        self.poller = Some(Poller { stop, worker });
    }
}

impl Drop for CollectionFetcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_request(client: &Client, state: &Arc<Mutex<FetchState>>, generation: u64) -> bool {
    let Some(ticket) = lock(state).begin(generation) else {
        return false;
    };

    let payload = match client.get_json(&ticket.path) {
        Ok(payload) => Some(payload),
        Err(error) => {
            tracing::warn!(path = %ticket.path, request = ticket.id, "fetch failed: {error}");
            None
        }
    };
    lock(state).finish(&ticket, payload)
}

fn lock(state: &Arc<Mutex<FetchState>>) -> MutexGuard<'_, FetchState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
