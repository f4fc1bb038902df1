pub mod bills;
pub mod health;
pub mod payments;

use crate::services::record_error;
use service_core::error::AppError;

/// Count failed requests by error kind before handing the error to axum.
pub(crate) fn track<T>(result: Result<T, AppError>) -> Result<T, AppError> {
    if let Err(ref e) = result {
        record_error(e.kind());
    }
    result
}
