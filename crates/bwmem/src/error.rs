use thiserror::Error;

use crate::schema::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Process is gone: {0}")]
    ProcessGone(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Invalid value for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("No {kind} in slot {slot}")]
    NotFound { kind: EntityKind, slot: u32 },

    #[error("No {0} snapshot has been captured yet")]
    NoSnapshot(EntityKind),

    #[error("Unknown {kind} field: {field}")]
    UnknownField { kind: EntityKind, field: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Timed out after {elapsed_ms}ms reading {kind} table")]
    Timeout { kind: EntityKind, elapsed_ms: u128 },

    #[error("Unsupported: {0}")]
    Unsupported(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Errors tied to the attachment itself rather than a single operation.
    ///
    /// These are fatal to the current tick; the next tick attempts to attach again.
    pub fn is_attachment_error(&self) -> bool {
        matches!(
            self,
            Error::ProcessNotFound(_) | Error::AccessDenied(_) | Error::ProcessGone(_)
        )
    }

    /// Check if this error is a "file not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_errors() {
        assert!(Error::ProcessNotFound("StarCraft.exe".into()).is_attachment_error());
        assert!(Error::AccessDenied("pid 42".into()).is_attachment_error());
        assert!(Error::ProcessGone("exited".into()).is_attachment_error());

        let read = Error::MemoryReadFailed {
            address: 0x1000,
            message: "unmapped".into(),
        };
        assert!(!read.is_attachment_error());
        assert!(
            !Error::Validation {
                field: "hit_points".into(),
                message: "too large".into()
            }
            .is_attachment_error()
        );
    }

    #[test]
    fn test_error_messages_are_readable() {
        let err = Error::NotFound {
            kind: EntityKind::Unit,
            slot: 7,
        };
        assert_eq!(err.to_string(), "No unit in slot 7");

        let err = Error::MemoryWriteFailed {
            address: 0x59CCA8,
            message: "denied".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to write process memory at address 0x59cca8: denied"
        );

        assert_eq!(
            Error::NoSnapshot(EntityKind::Sprite).to_string(),
            "No sprite snapshot has been captured yet"
        );
    }

    #[test]
    fn test_error_is_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        assert!(Error::Io(io_err).is_not_found());

        let other = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!Error::Io(other).is_not_found());
    }
}
