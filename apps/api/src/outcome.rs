//! Explicit fallback results.
//!
//! Every stage with a fallback path (AI classification, stale dataset reads,
//! topic-scoped search, answer composition) returns an `Outcome` so the caller
//! branches on it instead of catching errors.

/// Result of an operation that may degrade to a fallback value.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, E> {
    /// The primary path succeeded.
    Ok(T),
    /// The primary path failed but a fallback value is available.
    Degraded { value: T, reason: String },
    /// Neither the primary path nor any fallback produced a value.
    Failed(E),
}

impl<T, E> Outcome<T, E> {
    pub fn degraded(value: T, reason: impl Into<String>) -> Self {
        Outcome::Degraded {
            value,
            reason: reason.into(),
        }
    }

    /// The degradation reason, if any.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Outcome::Degraded { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Collapses `Ok` and `Degraded` into a plain value.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Outcome::Ok(value) | Outcome::Degraded { value, .. } => Ok(value),
            Outcome::Failed(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_collapses_to_value() {
        let outcome: Outcome<u32, String> = Outcome::degraded(7, "stale");
        assert_eq!(outcome.reason(), Some("stale"));
        assert_eq!(outcome.into_result(), Ok(7));
    }

    #[test]
    fn test_failed_is_err() {
        let outcome: Outcome<u32, &str> = Outcome::Failed("boom");
        assert_eq!(outcome.reason(), None);
        assert_eq!(outcome.into_result(), Err("boom"));
    }
}
