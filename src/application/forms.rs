//! Create/edit form validation.

use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;

use crate::domain::tags::normalize_tags;

/// Raw editor input as posted by the create/edit form.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EntryForm {
    pub title: String,
    pub body: String,
    pub tags: String,
}

/// Form input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidEntryFields {
    pub title: String,
    pub body: String,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::default();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// First message recorded for `field`.
    pub fn for_field(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message.as_str())
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

impl EntryForm {
    pub fn validate(&self) -> Result<ValidEntryFields, FieldErrors> {
        let mut errors = FieldErrors::default();

        let title = self.title.trim();
        if title.is_empty() {
            errors.push("title", "This field is required.");
        }
        if self.body.trim().is_empty() {
            errors.push("body", "This field is required.");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(ValidEntryFields {
            title: title.to_string(),
            body: self.body.clone(),
            tags: normalize_tags(&self.tags),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_reported_per_field() {
        let form = EntryForm {
            title: "   ".to_string(),
            body: String::new(),
            tags: "rust".to_string(),
        };

        let errors = form.validate().expect_err("invalid form");
        assert_eq!(errors.for_field("title"), Some("This field is required."));
        assert_eq!(errors.for_field("body"), Some("This field is required."));
        assert_eq!(errors.for_field("tags"), None);
        assert_eq!(
            errors.to_string(),
            "title: This field is required.; body: This field is required."
        );
    }

    #[test]
    fn valid_form_trims_title_and_normalizes_tags() {
        let form = EntryForm {
            title: "  Hello World ".to_string(),
            body: "First post.".to_string(),
            tags: "A, a, B".to_string(),
        };

        let fields = form.validate().expect("valid form");
        assert_eq!(fields.title, "Hello World");
        assert_eq!(fields.body, "First post.");
        assert_eq!(
            fields.tags.into_iter().collect::<Vec<_>>(),
            vec!["a".to_string(), "b".to_string()]
        );
    }
}
