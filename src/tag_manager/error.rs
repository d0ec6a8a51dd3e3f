use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GtmErrorCode {
    InvalidArgument,
    MissingProvider,
    Internal,
}

impl GtmErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GtmErrorCode::InvalidArgument => "gtm/invalid-argument",
            GtmErrorCode::MissingProvider => "gtm/missing-provider",
            GtmErrorCode::Internal => "gtm/internal",
        }
    }
}

#[derive(Clone, Debug)]
pub struct GtmError {
    pub code: GtmErrorCode,
    message: String,
}

impl GtmError {
    pub fn new(code: GtmErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for GtmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code_str())
    }
}

impl std::error::Error for GtmError {}

pub type GtmResult<T> = Result<T, GtmError>;

pub fn invalid_argument(message: impl Into<String>) -> GtmError {
    GtmError::new(GtmErrorCode::InvalidArgument, message)
}

/// Raised when a hook-style accessor is used without a mounted [`GtmProvider`](crate::tag_manager::GtmProvider).
pub fn missing_provider(hook: &str) -> GtmError {
    GtmError::new(
        GtmErrorCode::MissingProvider,
        format!("{hook} must be used within GtmProvider"),
    )
}

pub fn internal_error(message: impl Into<String>) -> GtmError {
    GtmError::new(GtmErrorCode::Internal, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_code() {
        let err = missing_provider("use_gtm_context");
        assert_eq!(err.code_str(), "gtm/missing-provider");
        assert_eq!(
            err.to_string(),
            "use_gtm_context must be used within GtmProvider (gtm/missing-provider)"
        );
    }
}
