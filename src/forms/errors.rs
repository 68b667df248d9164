//! Field-attached validation messages

use serde::Serialize;
use std::collections::BTreeMap;

/// Key under which errors not tied to one field are reported
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Validation messages keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
    non_field: Vec<String>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `message` to `field`
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        if field == NON_FIELD_ERRORS {
            self.non_field.push(message);
        } else {
            self.fields.entry(field.to_string()).or_default().push(message);
        }
    }

    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.non_field.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.non_field.is_empty()
    }

    /// Messages of one field, empty if it has none
    pub fn field(&self, field: &str) -> &[String] {
        if field == NON_FIELD_ERRORS {
            return &self.non_field;
        }
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_field(&self, field: &str) -> bool {
        !self.field(field).is_empty()
    }

    /// Whether `field` carries exactly `message`
    pub fn has(&self, field: &str, message: &str) -> bool {
        self.field(field).iter().any(|m| m == message)
    }

    pub fn non_field(&self) -> &[String] {
        &self.non_field
    }

    /// Names of fields carrying at least one message
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

/// Submitted values together with their validation result, as handed to
/// templates under the `form` key
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoundForm<F> {
    pub data: F,
    pub errors: FormErrors,
}

impl<F> BoundForm<F> {
    pub fn new(data: F, errors: FormErrors) -> Self {
        Self { data, errors }
    }

    /// A form with values and no errors
    pub fn unbound(data: F) -> Self {
        Self::new(data, FormErrors::new())
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}
