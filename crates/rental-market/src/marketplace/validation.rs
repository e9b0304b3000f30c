//! Request payloads and the per-operation checks that turn them into domain values.
//!
//! Every field is optional at the serde layer so a missing field is reported as a field error
//! alongside the others instead of failing deserialization of the whole body.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::AdminSeed;

use super::domain::{
    Credentials, ListingChanges, ListingDraft, ProfileChanges, Registration, Role,
};

pub const MIN_PASSWORD_LENGTH: usize = 6;

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub param: String,
    pub msg: String,
}

/// Every field error found for a payload, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn single(param: &str, msg: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(param, msg);
        errors
    }

    pub fn push(&mut self, param: &str, msg: impl Into<String>) {
        self.0.push(FieldError {
            param: param.to_string(),
            msg: msg.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn has(&self, param: &str) -> bool {
        self.0.iter().any(|error| error.param == param)
    }

    fn finish<T>(self, value: impl FnOnce() -> T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|error| error.param.as_str()).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

/// Numbers are accepted either as JSON numbers or numeric strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    fn positive(&self) -> Option<f64> {
        let value = match self {
            NumericInput::Number(value) => *value,
            NumericInput::Text(raw) => raw.trim().parse::<f64>().ok()?,
        };
        (value.is_finite() && value > 0.0).then_some(value)
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Number(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginInput {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(alias = "location")]
    pub address: Option<String>,
    pub price: Option<NumericInput>,
    pub size: Option<NumericInput>,
    pub images: Option<Vec<String>>,
    pub amenities: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub avatar: Option<String>,
}

pub fn validate_registration(input: RegistrationInput) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let (name, email, password) =
        account_fields(&mut errors, input.name, input.email.as_deref(), input.password);
    let role = input.role.as_deref().and_then(Role::self_assignable);
    if role.is_none() {
        errors.push("role", "Role must be tenant or owner");
    }

    errors.finish(|| Registration {
        name: name.unwrap_or_default(),
        email: email.unwrap_or_default(),
        password: password.unwrap_or_default(),
        role: role.unwrap_or(Role::Tenant),
        phone: optional_text(input.phone),
        avatar: optional_text(input.avatar),
    })
}

/// The startup administrator obeys the same name, email, and password rules as sign-up.
pub fn validate_admin_seed(seed: &AdminSeed) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let (name, email, password) = account_fields(
        &mut errors,
        Some(seed.name.clone()),
        Some(&seed.email),
        Some(seed.password.clone()),
    );

    errors.finish(|| Registration {
        name: name.unwrap_or_default(),
        email: email.unwrap_or_default(),
        password: password.unwrap_or_default(),
        role: Role::Admin,
        phone: None,
        avatar: None,
    })
}

pub fn validate_login(input: LoginInput) -> Result<Credentials, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let email = normalize_email(input.email.as_deref());
    if email.is_none() {
        errors.push("email", "Please include a valid email");
    }
    let password = input.password.filter(|password| !password.is_empty());
    if password.is_none() {
        errors.push("password", "Password is required");
    }

    errors.finish(|| Credentials {
        email: email.unwrap_or_default(),
        password: password.unwrap_or_default(),
    })
}

pub fn validate_listing(input: ListingInput) -> Result<ListingDraft, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = required_text(&mut errors, "title", input.title, "Title is required");
    let description = required_text(
        &mut errors,
        "description",
        input.description,
        "Description is required",
    );
    let address = required_text(&mut errors, "address", input.address, "Address is required");
    let price = positive_number(
        &mut errors,
        "price",
        input.price.as_ref(),
        "Price must be a positive number",
    );
    let size = positive_number(
        &mut errors,
        "size",
        input.size.as_ref(),
        "Size must be a positive number",
    );

    errors.finish(|| ListingDraft {
        title: title.unwrap_or_default(),
        description: description.unwrap_or_default(),
        price: price.unwrap_or_default(),
        address: address.unwrap_or_default(),
        size: size.unwrap_or_default(),
        images: input.images.unwrap_or_default(),
        amenities: input.amenities.unwrap_or_default(),
    })
}

/// Same rules as creation, applied only to the fields that were sent.
pub fn validate_listing_changes(input: ListingInput) -> Result<ListingChanges, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let title = input.title.and_then(|title| {
        required_text(&mut errors, "title", Some(title), "Title cannot be empty")
    });
    let description = input.description.and_then(|description| {
        required_text(
            &mut errors,
            "description",
            Some(description),
            "Description cannot be empty",
        )
    });
    let address = input.address.and_then(|address| {
        required_text(&mut errors, "address", Some(address), "Address cannot be empty")
    });
    let price = input.price.as_ref().and_then(|price| {
        positive_number(&mut errors, "price", Some(price), "Price must be a positive number")
    });
    let size = input.size.as_ref().and_then(|size| {
        positive_number(&mut errors, "size", Some(size), "Size must be a positive number")
    });

    errors.finish(|| ListingChanges {
        title,
        description,
        price,
        address,
        size,
        images: input.images,
        amenities: input.amenities,
    })
}

pub fn validate_profile(input: ProfileInput) -> Result<ProfileChanges, ValidationErrors> {
    let mut errors = ValidationErrors::default();

    let name = input
        .name
        .and_then(|name| required_text(&mut errors, "name", Some(name), "Name cannot be empty"));

    errors.finish(|| ProfileChanges {
        name,
        phone: optional_text(input.phone),
        avatar: optional_text(input.avatar),
    })
}

/// Lower-cased, trimmed address, or `None` when it does not look like an email.
pub fn normalize_email(raw: Option<&str>) -> Option<String> {
    let email = raw?.trim().to_ascii_lowercase();
    let (local, domain) = email.split_once('@')?;
    let well_formed = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace);
    well_formed.then_some(email)
}

fn account_fields(
    errors: &mut ValidationErrors,
    name: Option<String>,
    email: Option<&str>,
    password: Option<String>,
) -> (Option<String>, Option<String>, Option<String>) {
    let name = required_text(errors, "name", name, "Name is required");
    let email = normalize_email(email);
    if email.is_none() {
        errors.push("email", "Please include a valid email");
    }
    let password = password.filter(|password| password.chars().count() >= MIN_PASSWORD_LENGTH);
    if password.is_none() {
        errors.push(
            "password",
            format!("Please enter a password with {MIN_PASSWORD_LENGTH} or more characters"),
        );
    }
    (name, email, password)
}

fn required_text(
    errors: &mut ValidationErrors,
    param: &str,
    value: Option<String>,
    msg: &str,
) -> Option<String> {
    match value {
        Some(text) if !text.trim().is_empty() => Some(text),
        _ => {
            errors.push(param, msg);
            None
        }
    }
}

fn positive_number(
    errors: &mut ValidationErrors,
    param: &str,
    value: Option<&NumericInput>,
    msg: &str,
) -> Option<f64> {
    let parsed = value.and_then(NumericInput::positive);
    if parsed.is_none() {
        errors.push(param, msg);
    }
    parsed
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
