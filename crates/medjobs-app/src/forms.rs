// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::Path;

use crate::{ApplicationId, ApplicationStatus, DrugId, FormKind, JobId, PlanId};

pub const MAX_IMAGE_SIZE: usize = 5 << 20;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationMethod {
    Post,
    Put,
    Delete,
}

impl MutationMethod {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl ImageUpload {
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = fs::read(path).with_context(|| format!("read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        let mime_type = mime_for_extension(path).to_owned();
        let upload = Self {
            file_name,
            mime_type,
            data,
        };
        upload.validate()?;
        Ok(upload)
    }

    pub fn validate(&self) -> Result<()> {
        if self.data.is_empty() {
            bail!("image {} is empty -- pick a different file", self.file_name);
        }
        if self.data.len() > MAX_IMAGE_SIZE {
            bail!(
                "image {} is {} bytes; the limit is {} bytes",
                self.file_name,
                self.data.len(),
                MAX_IMAGE_SIZE
            );
        }
        if !self.mime_type.starts_with("image/") {
            bail!(
                "{} is not an image ({}); use png, jpg, gif or webp",
                self.file_name,
                self.mime_type
            );
        }
        Ok(())
    }

    /// `data:<mime>;base64,<payload>` for endpoints that take inline images.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.data))
    }
}

fn mime_for_extension(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginFormInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterFormInput {
    pub company_name: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompanyProfileFormInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub website: String,
    pub description: String,
    pub logo: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFormInput {
    pub id: Option<JobId>,
    pub title: String,
    pub category: String,
    pub job_type: String,
    pub location: String,
    pub salary: String,
    pub description: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrugFormInput {
    pub id: Option<DrugId>,
    pub name: String,
    pub category: String,
    pub company: String,
    pub price: String,
    pub description: String,
    pub image: Option<ImageUpload>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplicationReviewInput {
    pub application_id: ApplicationId,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanPurchaseInput {
    pub plan_id: PlanId,
    pub payment_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPayload {
    Login(LoginFormInput),
    Register(RegisterFormInput),
    CompanyProfile(Box<CompanyProfileFormInput>),
    Job(JobFormInput),
    Drug(DrugFormInput),
    ApplicationReview(ApplicationReviewInput),
    PlanPurchase(PlanPurchaseInput),
}

impl FormPayload {
    pub fn kind(&self) -> FormKind {
        match self {
            Self::Login(_) => FormKind::Login,
            Self::Register(_) => FormKind::Register,
            Self::CompanyProfile(_) => FormKind::CompanyProfile,
            Self::Job(_) => FormKind::Job,
            Self::Drug(_) => FormKind::Drug,
            Self::ApplicationReview(_) => FormKind::ApplicationReview,
            Self::PlanPurchase(_) => FormKind::PlanPurchase,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Login(form) => form.validate(),
            Self::Register(form) => form.validate(),
            Self::CompanyProfile(form) => form.validate(),
            Self::Job(form) => form.validate(),
            Self::Drug(form) => form.validate(),
            Self::ApplicationReview(_) => Ok(()),
            Self::PlanPurchase(form) => form.validate(),
        }
    }

    pub fn method(&self) -> MutationMethod {
        match self {
            Self::Job(JobFormInput { id: Some(_), .. })
            | Self::Drug(DrugFormInput { id: Some(_), .. })
            | Self::CompanyProfile(_)
            | Self::ApplicationReview(_) => MutationMethod::Put,
            _ => MutationMethod::Post,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Login(_) => "auth/login".to_owned(),
            Self::Register(_) => "auth/register".to_owned(),
            Self::CompanyProfile(_) => "company/profile".to_owned(),
            Self::Job(form) => match form.id {
                Some(id) => format!("jobs/{id}"),
                None => "jobs".to_owned(),
            },
            Self::Drug(form) => match form.id {
                Some(id) => format!("drugs/{id}"),
                None => "drugs".to_owned(),
            },
            Self::ApplicationReview(form) => format!("applications/{}/status", form.application_id),
            Self::PlanPurchase(form) => format!("plans/{}/purchase", form.plan_id),
        }
    }

    /// Label shown in the success toast.
    pub fn action_label(&self) -> String {
        match self {
            Self::Login(_) => "Signed in".to_owned(),
            Self::Register(_) => "Account created".to_owned(),
            Self::CompanyProfile(_) => "Company profile updated".to_owned(),
            Self::Job(form) => created_or_updated("Job", form.id.is_some()),
            Self::Drug(form) => created_or_updated("Drug", form.id.is_some()),
            Self::ApplicationReview(form) => match form.status {
                ApplicationStatus::Accepted => "Application accepted".to_owned(),
                ApplicationStatus::Rejected => "Application rejected".to_owned(),
                ApplicationStatus::Pending => "Application reopened".to_owned(),
            },
            Self::PlanPurchase(_) => "Plan purchased".to_owned(),
        }
    }

    /// Image to send as a multipart file part instead of JSON.
    pub fn multipart_image(&self) -> Option<&ImageUpload> {
        match self {
            Self::Drug(form) => form.image.as_ref(),
            _ => None,
        }
    }

    /// JSON body. Multipart forms send the same fields as text parts.
    pub fn body(&self) -> Value {
        match self {
            Self::Login(form) => json!({
                "email": form.email.trim(),
                "password": form.password,
            }),
            Self::Register(form) => json!({
                "company_name": form.company_name.trim(),
                "name": form.name.trim(),
                "email": form.email.trim(),
                "phone": form.phone.trim(),
                "password": form.password,
                "password_confirmation": form.password_confirmation,
            }),
            Self::CompanyProfile(form) => {
                let mut body = text_fields(&[
                    ("name", &form.name),
                    ("email", &form.email),
                    ("phone", &form.phone),
                    ("address", &form.address),
                    ("website", &form.website),
                    ("description", &form.description),
                ]);
                if let Some(logo) = &form.logo {
                    body.insert("logo".to_owned(), Value::String(logo.to_data_url()));
                }
                Value::Object(body)
            }
            Self::Job(form) => Value::Object(text_fields(&[
                ("title", &form.title),
                ("category", &form.category),
                ("job_type", &form.job_type),
                ("location", &form.location),
                ("salary", &form.salary),
                ("description", &form.description),
                ("status", &form.status),
            ])),
            Self::Drug(form) => Value::Object(text_fields(&[
                ("name", &form.name),
                ("category", &form.category),
                ("company", &form.company),
                ("price", &form.price),
                ("description", &form.description),
            ])),
            Self::ApplicationReview(form) => json!({ "status": form.status.as_str() }),
            Self::PlanPurchase(form) => json!({
                "plan_id": form.plan_id.get(),
                "payment_method": form.payment_method.trim(),
            }),
        }
    }
}

fn created_or_updated(noun: &str, existing: bool) -> String {
    if existing {
        format!("{noun} updated")
    } else {
        format!("{noun} created")
    }
}

fn text_fields(fields: &[(&str, &String)]) -> Map<String, Value> {
    fields
        .iter()
        .map(|(name, value)| ((*name).to_owned(), Value::String(value.trim().to_owned())))
        .collect()
}

fn validate_email(email: &str, what: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        bail!("{what} email is required -- enter an email and retry");
    }
    let Some((local, domain)) = email.split_once('@') else {
        bail!("{what} email {email:?} is missing '@'");
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') {
        bail!("{what} email {email:?} is not a valid address");
    }
    Ok(())
}

fn validate_price(price: &str, what: &str) -> Result<()> {
    let price = price.trim();
    if price.is_empty() {
        return Ok(());
    }
    match price.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(()),
        _ => bail!("{what} {price:?} must be a non-negative number"),
    }
}

impl LoginFormInput {
    pub fn validate(&self) -> Result<()> {
        validate_email(&self.email, "login")?;
        if self.password.is_empty() {
            bail!("password is required -- enter your password and retry");
        }
        Ok(())
    }
}

impl RegisterFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.company_name.trim().is_empty() {
            bail!("company name is required -- enter a company name and retry");
        }
        validate_email(&self.email, "account")?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            bail!("password must be at least {MIN_PASSWORD_LEN} characters");
        }
        if self.password != self.password_confirmation {
            bail!("password confirmation does not match");
        }
        Ok(())
    }
}

impl CompanyProfileFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("company name is required -- enter a company name and retry");
        }
        validate_email(&self.email, "company")?;
        if let Some(logo) = &self.logo {
            logo.validate()?;
        }
        Ok(())
    }
}

impl JobFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            bail!("job title is required -- enter a title and retry");
        }
        if self.category.trim().is_empty() {
            bail!("job category is required -- choose a category and retry");
        }
        validate_price(&self.salary, "job salary")
    }
}

impl DrugFormInput {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            bail!("drug name is required -- enter a name and retry");
        }
        validate_price(&self.price, "drug price")?;
        if let Some(image) = &self.image {
            image.validate()?;
        }
        Ok(())
    }
}

impl PlanPurchaseInput {
    pub fn validate(&self) -> Result<()> {
        if self.plan_id.get() <= 0 {
            bail!("plan is required -- choose a plan and retry");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ApplicationReviewInput, DrugFormInput, FormPayload, ImageUpload, JobFormInput,
        LoginFormInput, MutationMethod, PlanPurchaseInput, RegisterFormInput,
    };
    use crate::{ApplicationId, ApplicationStatus, DrugId, JobId, PlanId};
    use anyhow::Result;
    use serde_json::json;

    fn job(id: Option<JobId>) -> JobFormInput {
        JobFormInput {
            id,
            title: " Pharmacist ".to_owned(),
            category: "Pharmacy".to_owned(),
            job_type: "Full time".to_owned(),
            location: "Cairo".to_owned(),
            salary: "12000".to_owned(),
            description: String::new(),
            status: "open".to_owned(),
        }
    }

    #[test]
    fn job_routes_to_collection_or_item() {
        let create = FormPayload::Job(job(None));
        assert_eq!(create.method(), MutationMethod::Post);
        assert_eq!(create.path(), "jobs");
        assert_eq!(create.action_label(), "Job created");

        let update = FormPayload::Job(job(Some(JobId::new(9))));
        assert_eq!(update.method(), MutationMethod::Put);
        assert_eq!(update.path(), "jobs/9");
        assert_eq!(update.action_label(), "Job updated");
        assert_eq!(update.body()["title"], json!("Pharmacist"));
    }

    #[test]
    fn job_requires_title_and_numeric_salary() {
        let mut form = job(None);
        form.title = "  ".to_owned();
        assert!(FormPayload::Job(form).validate().is_err());

        let mut form = job(None);
        form.salary = "lots".to_owned();
        let error = FormPayload::Job(form)
            .validate()
            .expect_err("bad salary should fail");
        assert!(error.to_string().contains("non-negative number"));
    }

    #[test]
    fn login_validates_email_shape() {
        let form = LoginFormInput {
            email: "hr.example.com".to_owned(),
            password: "secret".to_owned(),
        };
        let error = form.validate().expect_err("missing @ should fail");
        assert!(error.to_string().contains("missing '@'"));
    }

    #[test]
    fn register_checks_password_confirmation() {
        let form = RegisterFormInput {
            company_name: "Nile Clinic".to_owned(),
            name: "Sara".to_owned(),
            email: "sara@nile.example".to_owned(),
            phone: String::new(),
            password: "longenough".to_owned(),
            password_confirmation: "different".to_owned(),
        };
        let error = form.validate().expect_err("mismatch should fail");
        assert!(error.to_string().contains("does not match"));
    }

    #[test]
    fn review_and_purchase_paths() {
        let review = FormPayload::ApplicationReview(ApplicationReviewInput {
            application_id: ApplicationId::new(3),
            status: ApplicationStatus::Accepted,
        });
        assert_eq!(review.method(), MutationMethod::Put);
        assert_eq!(review.path(), "applications/3/status");
        assert_eq!(review.body(), json!({"status": "accepted"}));

        let purchase = FormPayload::PlanPurchase(PlanPurchaseInput {
            plan_id: PlanId::new(2),
            payment_method: "card".to_owned(),
        });
        assert_eq!(purchase.method(), MutationMethod::Post);
        assert_eq!(purchase.path(), "plans/2/purchase");
        assert!(purchase.validate().is_ok());
    }

    #[test]
    fn image_upload_encodes_data_url() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("logo.PNG");
        std::fs::write(&path, [0x89, b'P', b'N', b'G'])?;

        let upload = ImageUpload::from_path(&path)?;
        assert_eq!(upload.mime_type, "image/png");
        assert_eq!(upload.to_data_url(), "data:image/png;base64,iVBORw==");
        Ok(())
    }

    #[test]
    fn non_image_upload_is_rejected() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("cv.pdf");
        std::fs::write(&path, b"%PDF")?;
        let error = ImageUpload::from_path(&path).expect_err("pdf should fail");
        assert!(error.to_string().contains("not an image"));
        Ok(())
    }

    #[test]
    fn drug_image_goes_multipart() {
        let drug = FormPayload::Drug(DrugFormInput {
            id: Some(DrugId::new(5)),
            name: "Panadol".to_owned(),
            category: "Pain".to_owned(),
            company: "GSK".to_owned(),
            price: "25.5".to_owned(),
            description: String::new(),
            image: Some(ImageUpload {
                file_name: "box.jpg".to_owned(),
                mime_type: "image/jpeg".to_owned(),
                data: vec![1, 2, 3],
            }),
        });
        assert!(drug.validate().is_ok());
        assert!(drug.multipart_image().is_some());
        assert_eq!(drug.path(), "drugs/5");
    }
}
