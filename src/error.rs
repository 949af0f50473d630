use thiserror::Error;

/// Validation failures that produce an error acknowledgment to the origin.
///
/// The display strings are part of the wire contract: they travel verbatim
/// in the `reason` field of `{"status":"error"}` responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing userId")]
    MissingUserId,

    #[error("invalid coordinates")]
    InvalidCoordinates,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_strings() {
        assert_eq!(ValidationError::MissingUserId.to_string(), "missing userId");
        assert_eq!(
            ValidationError::InvalidCoordinates.to_string(),
            "invalid coordinates"
        );
    }
}
