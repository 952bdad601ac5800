use crate::error::AppError;

/// Every fallible Keyward operation returns this.
pub type AppResult<T> = Result<T, AppError>;
