//! Internal-invariant result types for the Strata toolchain.

/// The result type for operations that can only fail through inconsistent
/// collaborator data or a bug in the toolchain, never through ordinary user
/// input.
///
/// User-facing problems are reported through the diagnostic sink or a
/// stage-specific error type; an `InternalError` means two pieces of frozen
/// state that are supposed to agree (a grid and its architecture, a netlist
/// and its placement) do not.
pub type StrataResult<T> = Result<T, InternalError>;

/// An invariant violation between frozen data structures.
///
/// Carries the subsystem whose invariant broke so the embedder can tell at a
/// glance which collaborator handed over inconsistent state.
#[derive(Debug, thiserror::Error)]
#[error("internal error in {subsystem}: {message}")]
pub struct InternalError {
    /// The subsystem whose invariant was violated (e.g. "device grid").
    pub subsystem: &'static str,
    /// Description of the violated invariant.
    pub message: String,
}

impl InternalError {
    /// Creates an internal error for the given subsystem.
    pub fn new(subsystem: &'static str, message: impl Into<String>) -> Self {
        Self {
            subsystem,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_subsystem() {
        let err = InternalError::new("device grid", "cell (3, 0) references no tile");
        assert_eq!(
            format!("{err}"),
            "internal error in device grid: cell (3, 0) references no tile"
        );
    }

    #[test]
    fn propagates_through_question_mark() {
        fn check(ok: bool) -> StrataResult<u32> {
            if !ok {
                return Err(InternalError::new("test", "forced failure"));
            }
            Ok(7)
        }
        fn outer(ok: bool) -> StrataResult<u32> {
            let v = check(ok)?;
            Ok(v + 1)
        }
        assert_eq!(outer(true).unwrap(), 8);
        let err = outer(false).unwrap_err();
        assert_eq!(err.subsystem, "test");
    }
}
