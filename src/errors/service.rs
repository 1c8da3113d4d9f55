use thiserror::Error;

use super::RepositoryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// No live mapping for the requested code
    #[error("Not found: {0}")]
    NotFound(String),

    /// Every allocation attempt collided with an existing code
    #[error("Could not allocate a unique short code after {attempts} attempts")]
    AllocationExhausted { attempts: usize },

    /// Mapping store failure (lookup or write)
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(errors: validator::ValidationErrors) -> Self {
        // Flatten field errors into a single string
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, errs)| {
                let reasons = errs
                    .iter()
                    .map(|e| {
                        e.message
                            .clone()
                            .unwrap_or_else(|| e.code.clone())
                            .to_string()
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}: {}", field, reasons)
            })
            .collect::<Vec<_>>()
            .join("; ");
        ServiceError::Validation(message)
    }
}
