//! Provider error types
//!
//! Re-exports openhoud-error and maps transport failures onto it.

pub use openhoud_error::{Error, ErrorKind, ErrorStatus, Result};

use crate::provider::ProviderError;

impl ProviderError {
    /// Convert into the unified error, choosing the kind from the failure.
    pub fn into_error(self) -> Error {
        let kind = match &self {
            ProviderError::Network(_) => ErrorKind::NetworkFailed,
            ProviderError::RateLimited { .. } => ErrorKind::RateLimited,
            ProviderError::AuthenticationFailed => ErrorKind::AuthenticationFailed,
            ProviderError::ModelNotFound(_) => ErrorKind::ProviderUnavailable,
            ProviderError::Parse(_) => ErrorKind::ParseFailed,
            ProviderError::InvalidRequest(_) => ErrorKind::InvalidArgument,
            ProviderError::Api { .. } | ProviderError::Other(_) => ErrorKind::InferenceFailed,
        };

        let mut err = Error::new(kind, self.to_string()).with_operation("provider::complete");
        if let ProviderError::Api { status, .. } = &self {
            err = err.with_context("http_status", status.to_string());
        }
        if let ProviderError::RateLimited { retry_after: Some(secs) } = &self {
            err = err.with_context("retry_after", secs.to_string());
        }
        err.set_source(self)
    }
}
