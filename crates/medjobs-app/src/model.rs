// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Jobs,
    Drugs,
    Applications,
    Plans,
}

impl ResourceKind {
    pub const ALL: [Self; 4] = [Self::Jobs, Self::Drugs, Self::Applications, Self::Plans];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jobs => "jobs",
            Self::Drugs => "drugs",
            Self::Applications => "applications",
            Self::Plans => "plans",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Jobs => "Jobs",
            Self::Drugs => "Drugs",
            Self::Applications => "Applications",
            Self::Plans => "Plans",
        }
    }

    /// Singular noun used in notification labels ("Job deleted").
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Jobs => "Job",
            Self::Drugs => "Drug",
            Self::Applications => "Application",
            Self::Plans => "Plan",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jobs" | "job" => Some(Self::Jobs),
            "drugs" | "drug" => Some(Self::Drugs),
            "applications" | "application" | "cvs" | "cv" => Some(Self::Applications),
            "plans" | "plan" => Some(Self::Plans),
            _ => None,
        }
    }

    pub const fn collection_path(self) -> &'static str {
        self.as_str()
    }

    pub fn item_path(self, id: i64) -> String {
        format!("{}/{id}", self.as_str())
    }

    /// Declared table columns. The first column is the search column.
    pub fn columns(self) -> Vec<ColumnSpec> {
        let specs: &[(&str, &str)] = match self {
            Self::Jobs => &[
                ("title", "Title"),
                ("category", "Category"),
                ("job_type", "Type"),
                ("location", "Location"),
                ("status", "Status"),
            ],
            Self::Drugs => &[
                ("name", "Name"),
                ("category", "Category"),
                ("company", "Company"),
                ("price", "Price"),
            ],
            Self::Applications => &[
                ("applicant_name", "Applicant"),
                ("job_title", "Job"),
                ("email", "Email"),
                ("status", "Status"),
            ],
            Self::Plans => &[
                ("name", "Plan"),
                ("price", "Price"),
                ("duration", "Duration"),
                ("status", "Status"),
            ],
        };
        specs
            .iter()
            .map(|(field, title)| ColumnSpec::new(*field, *title))
            .collect()
    }

    pub fn filters(self) -> Vec<FilterSpec> {
        let specs: &[(&str, &str)] = match self {
            Self::Jobs => &[
                ("category", "All categories"),
                ("job_type", "All types"),
                ("status", "All statuses"),
            ],
            Self::Drugs => &[
                ("category", "All categories"),
                ("company", "All companies"),
            ],
            Self::Applications => &[("job_title", "All jobs"), ("status", "All statuses")],
            Self::Plans => &[("status", "All statuses")],
        };
        specs
            .iter()
            .map(|(field, title)| FilterSpec::new(*field, *title))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub field: String,
    pub title: String,
}

impl ColumnSpec {
    pub fn new(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSpec {
    pub field: String,
    pub title: String,
}

impl FilterSpec {
    pub fn new(field: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ApplicationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "accepted" => Some(Self::Accepted),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScreenKind {
    Login,
    Register,
    CompanyProfile,
    Jobs,
    Drugs,
    Applications,
    Plans,
}

impl ScreenKind {
    pub const HOME: Self = Self::Jobs;

    /// Screens reachable by tab rotation once signed in.
    pub const ROTATION: [Self; 5] = [
        Self::Jobs,
        Self::Drugs,
        Self::Applications,
        Self::Plans,
        Self::CompanyProfile,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Register => "Register",
            Self::CompanyProfile => "Company",
            Self::Jobs => "Jobs",
            Self::Drugs => "Drugs",
            Self::Applications => "Applications",
            Self::Plans => "Plans",
        }
    }

    pub const fn requires_session(self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }

    pub const fn resource(self) -> Option<ResourceKind> {
        match self {
            Self::Jobs => Some(ResourceKind::Jobs),
            Self::Drugs => Some(ResourceKind::Drugs),
            Self::Applications => Some(ResourceKind::Applications),
            Self::Plans => Some(ResourceKind::Plans),
            Self::Login | Self::Register | Self::CompanyProfile => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "login" => Some(Self::Login),
            "register" => Some(Self::Register),
            "company" | "profile" | "company_profile" => Some(Self::CompanyProfile),
            other => ResourceKind::parse(other).map(Self::from),
        }
    }
}

impl From<ResourceKind> for ScreenKind {
    fn from(kind: ResourceKind) -> Self {
        match kind {
            ResourceKind::Jobs => Self::Jobs,
            ResourceKind::Drugs => Self::Drugs,
            ResourceKind::Applications => Self::Applications,
            ResourceKind::Plans => Self::Plans,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormKind {
    Login,
    Register,
    CompanyProfile,
    Job,
    Drug,
    ApplicationReview,
    PlanPurchase,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppMode {
    Nav,
    Search,
    Edit,
    Form(FormKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One backend-owned record. The shape is whatever the API returns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionItem(Map<String, Value>);

impl CollectionItem {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    /// Looks up a field; dotted names walk into nested objects.
    pub fn get(&self, field: &str) -> Option<&Value> {
        if let Some(value) = self.0.get(field) {
            return Some(value);
        }
        let mut parts = field.split('.');
        let mut current = self.0.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// Display text for a field; missing fields resolve to "".
    pub fn text(&self, field: &str) -> String {
        self.get(field).map(value_text).unwrap_or_default()
    }

    pub fn id(&self) -> Option<i64> {
        match self.get("id")? {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        }
    }
}

pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Object(fields) => ["name", "title"]
            .iter()
            .find_map(|key| fields.get(*key).and_then(Value::as_str))
            .map(str::to_owned)
            .unwrap_or_else(|| value.to_string()),
        Value::Array(_) => value.to_string(),
    }
}

/// Extracts collection rows from a response payload: a bare array, or an
/// array under `data`, `items` or `results` (one level of nesting, which
/// covers paginated envelopes).
pub fn items_from_payload(payload: &Value) -> Vec<CollectionItem> {
    fn find_array(value: &Value, depth: usize) -> Option<&Vec<Value>> {
        match value {
            Value::Array(rows) => Some(rows),
            Value::Object(fields) if depth < 2 => ["data", "items", "results"]
                .iter()
                .filter_map(|key| fields.get(*key))
                .find_map(|nested| find_array(nested, depth + 1)),
            _ => None,
        }
    }

    find_array(payload, 0)
        .map(|rows| {
            rows.iter()
                .cloned()
                .filter_map(CollectionItem::from_value)
                .collect()
        })
        .unwrap_or_default()
}
