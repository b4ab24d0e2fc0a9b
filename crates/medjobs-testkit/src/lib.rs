// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use medjobs_app::{CollectionItem, Session, SessionUser, UserId};
use serde_json::{Value, json};
use std::collections::{BTreeMap, VecDeque};
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

const JOB_TITLES: [&str; 12] = [
    "Pharmacist",
    "Staff Nurse",
    "ICU Nurse",
    "Lab Technician",
    "Radiographer",
    "General Practitioner",
    "Pediatrician",
    "Dentist",
    "Physiotherapist",
    "Medical Representative",
    "Anesthetist",
    "Dietitian",
];

const JOB_CATEGORIES: [&str; 6] = [
    "Pharmacy",
    "Nursing",
    "Laboratory",
    "Radiology",
    "Medicine",
    "Sales",
];

const JOB_TYPES: [&str; 4] = ["Full time", "Part time", "Contract", "Internship"];
const JOB_STATUSES: [&str; 2] = ["open", "closed"];

const DRUG_NAMES: [&str; 12] = [
    "Panadol",
    "Augmentin",
    "Brufen",
    "Cataflam",
    "Concor",
    "Glucophage",
    "Nexium",
    "Lipitor",
    "Zithromax",
    "Ventolin",
    "Voltaren",
    "Claritine",
];

const DRUG_CATEGORIES: [&str; 6] = [
    "Analgesic",
    "Antibiotic",
    "Cardiology",
    "Diabetes",
    "Respiratory",
    "Gastro",
];

const DRUG_COMPANIES: [&str; 6] = ["GSK", "Pfizer", "Novartis", "Sanofi", "AstraZeneca", "Bayer"];

const FIRST_NAMES: [&str; 14] = [
    "Nadia", "Omar", "Layla", "Karim", "Salma", "Youssef", "Mona", "Hassan", "Rana", "Tarek",
    "Dina", "Ahmed", "Hoda", "Sami",
];
const LAST_NAMES: [&str; 12] = [
    "Hassan", "Farouk", "Mansour", "Saleh", "Khalil", "Nasser", "Haddad", "Aziz", "Rahman",
    "Said", "Fahmy", "Zaki",
];

const CITIES: [&str; 8] = [
    "Cairo",
    "Alexandria",
    "Giza",
    "Mansoura",
    "Tanta",
    "Aswan",
    "Luxor",
    "Port Said",
];

const PLAN_NAMES: [&str; 4] = ["Starter", "Standard", "Professional", "Enterprise"];
const PLAN_DURATIONS: [&str; 3] = ["1 month", "6 months", "12 months"];
const APPLICATION_STATUSES: [&str; 3] = ["pending", "accepted", "rejected"];

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator for backend-shaped collection rows.
#[derive(Debug, Clone)]
pub struct PortalFaker {
    rng: DeterministicRng,
    next_id: i64,
}

impl PortalFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            next_id: 1,
        }
    }

    pub fn job(&mut self) -> CollectionItem {
        let title = self.pick(&JOB_TITLES);
        let category = self.pick(&JOB_CATEGORIES);
        let job_type = self.pick(&JOB_TYPES);
        let location = self.pick(&CITIES);
        let status = self.pick(&JOB_STATUSES);
        let salary = self.int_range(40, 300) * 100;
        self.item(json!({
            "title": title,
            "category": category,
            "job_type": job_type,
            "location": location,
            "salary": salary,
            "status": status,
            "description": format!("{title} wanted for our {category} team."),
        }))
    }

    pub fn drug(&mut self) -> CollectionItem {
        let name = self.pick(&DRUG_NAMES);
        let category = self.pick(&DRUG_CATEGORIES);
        let company = self.pick(&DRUG_COMPANIES);
        let price = self.int_range(500, 40_000) as f64 / 100.0;
        self.item(json!({
            "name": name,
            "category": category,
            "company": company,
            "price": price,
        }))
    }

    pub fn application(&mut self, job_title: &str) -> CollectionItem {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let status = self.pick(&APPLICATION_STATUSES);
        let cv_url = format!("https://files.example/cv/{}.pdf", self.next_id);
        self.item(json!({
            "applicant_name": format!("{first} {last}"),
            "job_title": job_title,
            "email": format!("{}.{}@mail.example", first.to_lowercase(), last.to_lowercase()),
            "status": status,
            "cv_url": cv_url,
        }))
    }

    pub fn plan(&mut self) -> CollectionItem {
        let tier = self.int_n(PLAN_NAMES.len());
        let duration = self.pick(&PLAN_DURATIONS);
        self.item(json!({
            "name": PLAN_NAMES[tier],
            "price": (tier as i64 + 1) * 499,
            "duration": duration,
            "status": if tier == 0 { "active" } else { "available" },
        }))
    }

    pub fn jobs(&mut self, count: usize) -> Vec<CollectionItem> {
        (0..count).map(|_| self.job()).collect()
    }

    pub fn drugs(&mut self, count: usize) -> Vec<CollectionItem> {
        (0..count).map(|_| self.drug()).collect()
    }

    pub fn applications(&mut self, count: usize) -> Vec<CollectionItem> {
        (0..count)
            .map(|_| {
                let job_title = self.pick(&JOB_TITLES);
                self.application(job_title)
            })
            .collect()
    }

    pub fn plans(&mut self, count: usize) -> Vec<CollectionItem> {
        (0..count).map(|_| self.plan()).collect()
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    fn item(&mut self, mut value: Value) -> CollectionItem {
        if let Value::Object(fields) = &mut value {
            fields.insert("id".to_owned(), json!(self.next_id));
        }
        self.next_id += 1;
        CollectionItem::from_value(value).unwrap_or_default()
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn int_range(&mut self, min: i64, max: i64) -> i64 {
        if max <= min {
            return min;
        }
        let span = max - min + 1;
        min + (self.rng.next_u64() % (span as u64)) as i64
    }
}

/// Wraps rows the way the backend envelopes collection responses.
pub fn collection_payload(items: &[CollectionItem]) -> Value {
    json!({ "data": items })
}

pub fn sample_session() -> Session {
    Session {
        token: "test-token".to_owned(),
        user: SessionUser {
            id: UserId::new(1),
            name: "Nile Clinic HR".to_owned(),
            email: "hr@nile.example".to_owned(),
            company_id: None,
        },
        signed_in_at: None,
    }
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("medjobs.db");
    Ok((dir, db_path))
}

#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl MockResponse {
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json_body(&self) -> Result<Value> {
        serde_json::from_str(&self.body).context("decode recorded request body")
    }
}

type RouteKey = (String, String);

#[derive(Default)]
struct MockState {
    routes: BTreeMap<RouteKey, VecDeque<MockResponse>>,
    requests: Vec<RecordedRequest>,
}

/// A tiny_http backend double. Each route replays its queued responses in
/// order; the last one repeats. Unrouted requests get a 404.
pub struct MockApi {
    base_url: String,
    state: Arc<Mutex<MockState>>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl MockApi {
    pub fn start() -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}/api", server.server_addr());
        let state = Arc::new(Mutex::new(MockState::default()));
        let stop = Arc::new(AtomicBool::new(false));

        let worker_state = Arc::clone(&state);
        let worker_stop = Arc::clone(&stop);
        let worker = thread::spawn(move || {
            while !worker_stop.load(Ordering::SeqCst) {
                let request = match server.recv_timeout(Duration::from_millis(20)) {
                    Ok(Some(request)) => request,
                    Ok(None) => continue,
                    Err(_) => break,
                };
                serve(request, &worker_state);
            }
        });

        Ok(Self {
            base_url,
            state,
            stop,
            worker: Some(worker),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Queues a response for `METHOD /api/<path>`.
    pub fn route(&self, method: &str, path: &str, response: MockResponse) -> &Self {
        let key = (
            method.to_ascii_uppercase(),
            format!("/api/{}", path.trim_start_matches('/')),
        );
        lock(&self.state)
            .routes
            .entry(key)
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state).requests.clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.state).requests.len()
    }

    /// Polls until `count` requests arrived or the timeout passes.
    pub fn wait_for_requests(&self, count: usize, timeout: Duration) -> bool {
        let step = Duration::from_millis(5);
        let mut waited = Duration::ZERO;
        while waited < timeout {
            if self.request_count() >= count {
                return true;
            }
            thread::sleep(step);
            waited += step;
        }
        self.request_count() >= count
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn serve(mut request: tiny_http::Request, state: &Arc<Mutex<MockState>>) {
    let mut raw = Vec::new();
    let _ = request.as_reader().read_to_end(&mut raw);
    let body = String::from_utf8_lossy(&raw).into_owned();
    let header = |name: &'static str| {
        request
            .headers()
            .iter()
            .find(|header| header.field.equiv(name))
            .map(|header| header.value.as_str().to_owned())
    };
    let recorded = RecordedRequest {
        method: request.method().as_str().to_owned(),
        path: request.url().to_owned(),
        authorization: header("Authorization"),
        content_type: header("Content-Type"),
        body,
    };

    let response = {
        let mut state = lock(state);
        let key = (recorded.method.clone(), recorded.path.clone());
        let response = match state.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().cloned(),
            None => None,
        };
        state.requests.push(recorded);
        response.unwrap_or_else(|| MockResponse::json(404, &json!({"message": "not found"})))
    };

    thread::spawn(move || {
        if !response.delay.is_zero() {
            thread::sleep(response.delay);
        }
        let mut reply = Response::from_string(response.body).with_status_code(response.status);
        if let Ok(content_type) = Header::from_bytes("Content-Type", "application/json") {
            reply = reply.with_header(content_type);
        }
        let _ = request.respond(reply);
    });
}

fn lock(state: &Arc<Mutex<MockState>>) -> MutexGuard<'_, MockState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
