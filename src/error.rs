//! Domain errors surfaced by the engine and the persistence layer.

/// Errors returned by engine operations.
///
/// Store implementations report failures as `anyhow::Error`; an
/// `EngineError` can travel inside one (e.g. `NotFound` from `append`) and
/// is recovered by [`EngineError::from_store`].
#[derive(Debug)]
pub enum EngineError {
    /// Referenced sensor or greenhouse does not exist
    NotFound { entity: &'static str, id: String },
    /// Malformed filter, out-of-range interval or limit
    InvalidArgument(String),
    /// Registry or telemetry store read failed
    UpstreamReadFailure {
        operation: &'static str,
        source: anyhow::Error,
    },
}

impl EngineError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        EngineError::InvalidArgument(msg.into())
    }

    /// Wrap a store failure, keeping domain errors the store already raised.
    pub fn from_store(operation: &'static str, err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(domain) => domain,
            Err(source) => EngineError::UpstreamReadFailure { operation, source },
        }
    }

    /// True for failures the caller may retry.
    pub fn is_upstream(&self) -> bool {
        matches!(self, EngineError::UpstreamReadFailure { .. })
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::NotFound { entity, id } => write!(f, "{} '{}' not found", entity, id),
            EngineError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            EngineError::UpstreamReadFailure { operation, source } => {
                write!(f, "Upstream read failed during {}: {:#}", operation, source)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::UpstreamReadFailure { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_from_store_keeps_domain_error() {
        let err = anyhow::Error::new(EngineError::not_found("sensor", 7));
        match EngineError::from_store("append", err) {
            EngineError::NotFound { entity, id } => {
                assert_eq!(entity, "sensor");
                assert_eq!(id, "7");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_from_store_wraps_other_failures() {
        let err = EngineError::from_store("list_sensors", anyhow!("disk I/O error"));
        assert!(err.is_upstream());
        let msg = err.to_string();
        assert!(msg.contains("list_sensors"));
        assert!(msg.contains("disk I/O error"));
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            EngineError::not_found("greenhouse", 3).to_string(),
            "greenhouse '3' not found"
        );
        assert_eq!(
            EngineError::invalid("limit must be positive").to_string(),
            "Invalid argument: limit must be positive"
        );
    }
}
