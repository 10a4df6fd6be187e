//! Domain error types.

use thiserror::Error;

/// Errors raised by store and collaborator implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or the operation timed out.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be mapped into a domain value.
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Store error: {0}")]
    Other(String),
}

/// Errors surfaced by domain services.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |err| match &err.message {
                    Some(message) if *field == "__all__" => message.to_string(),
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: invalid value", field),
                })
            })
            .collect();

        // Nested structs (alert criteria) report their own field errors.
        for (field, kind) in errors.errors() {
            if let validator::ValidationErrorsKind::Struct(inner) = kind {
                let inner: DomainError = (**inner).clone().into();
                if let DomainError::Validation(message) = inner {
                    messages.push(format!("{}.{}", field, message));
                }
            }
        }

        messages.sort();
        DomainError::Validation(messages.join(", "))
    }
}
