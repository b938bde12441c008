use thiserror::Error;

/// Failure returned by the remote client and the composite operations built on it.
#[derive(Debug, Error)]
pub enum DevOpsError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Optimistic-concurrency mismatch: the supplied version is stale.
    #[error("version conflict: {0}")]
    Conflict(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("failed to update page '{path}' after {attempts} attempts: version conflict on every attempt")]
    RetriesExhausted { path: String, attempts: u32 },

    #[error("failed to create page at target '{path}': {source}")]
    MoveTarget {
        path: String,
        #[source]
        source: Box<DevOpsError>,
    },
}

impl DevOpsError {
    /// Map an HTTP status and body text onto an error kind.
    ///
    /// Status codes win; for anything else the message is inspected, since the
    /// service reports some conflicts and missing pages only in the text.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            404 => DevOpsError::NotFound(message),
            409 | 412 => DevOpsError::Conflict(message),
            _ => DevOpsError::Remote { status, message }.reclassify(),
        }
    }

    /// Compatibility shim: promote untyped failures whose text says what they are.
    fn reclassify(self) -> Self {
        match self {
            DevOpsError::Remote { status, message } => {
                if mentions_not_found(&message) {
                    DevOpsError::NotFound(message)
                } else if mentions_version(&message) {
                    DevOpsError::Conflict(message)
                } else {
                    DevOpsError::Remote { status, message }
                }
            }
            other => other,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            DevOpsError::NotFound(_) => true,
            DevOpsError::Remote { message, .. } | DevOpsError::Transport(message) => {
                mentions_not_found(message)
            }
            _ => false,
        }
    }

    pub fn is_conflict(&self) -> bool {
        match self {
            DevOpsError::Conflict(_) => true,
            DevOpsError::Remote { message, .. } => mentions_version(message),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for DevOpsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DevOpsError::Decode(err.to_string())
        } else {
            DevOpsError::Transport(err.to_string())
        }
    }
}

fn mentions_not_found(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("not found") || lower.contains("404")
}

fn mentions_version(message: &str) -> bool {
    message.to_lowercase().contains("version")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_kinds() {
        assert!(matches!(DevOpsError::from_status(404, "x"), DevOpsError::NotFound(_)));
        assert!(matches!(DevOpsError::from_status(409, "x"), DevOpsError::Conflict(_)));
        assert!(matches!(DevOpsError::from_status(412, "x"), DevOpsError::Conflict(_)));
        assert!(matches!(
            DevOpsError::from_status(500, "boom"),
            DevOpsError::Remote { status: 500, .. }
        ));
    }

    #[test]
    fn message_text_reclassifies_generic_failures() {
        let err = DevOpsError::from_status(400, "The page '/Docs' could not be found. Not Found");
        assert!(matches!(err, DevOpsError::NotFound(_)));

        let err = DevOpsError::from_status(400, "The version of the page does not match");
        assert!(matches!(err, DevOpsError::Conflict(_)));
    }

    #[test]
    fn not_found_detection_is_case_insensitive() {
        let err = DevOpsError::Transport("Wiki page NOT FOUND".into());
        assert!(err.is_not_found());
        let err = DevOpsError::Remote {
            status: 500,
            message: "upstream said 404".into(),
        };
        assert!(err.is_not_found());
        assert!(!DevOpsError::Transport("connection reset".into()).is_not_found());
    }

    #[test]
    fn retries_exhausted_reports_attempt_count() {
        let err = DevOpsError::RetriesExhausted {
            path: "/Home".into(),
            attempts: 1,
        };
        assert!(err.to_string().contains("after 1 attempts"));
        assert!(!err.is_conflict());
    }
}
