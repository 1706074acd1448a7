use thiserror::Error;
use uuid::Uuid;

/// Engine failures. None of these are fatal: every operation is locally
/// retryable by the caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any store write was attempted.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    /// The record is in a state that admits no further transitions.
    #[error("{entity} {id} is already {status}")]
    TerminalState {
        entity: &'static str,
        id: Uuid,
        status: String,
    },

    /// The record store reported a failure; the underlying message is
    /// carried through to the caller.
    #[error("persistence failure: {0}")]
    Persistence(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_entity_and_id() {
        let id = Uuid::nil();
        let err = Error::NotFound {
            entity: "contract",
            id,
        };
        assert_eq!(
            err.to_string(),
            format!("contract {id} not found")
        );

        let err = Error::TerminalState {
            entity: "contract",
            id,
            status: "terminated".to_string(),
        };
        assert_eq!(
            err.to_string(),
            format!("contract {id} is already terminated")
        );
    }

    #[test]
    fn store_errors_convert_to_persistence() {
        let err: Error = anyhow::anyhow!("connection reset").into();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(err.to_string().contains("connection reset"));
    }
}
