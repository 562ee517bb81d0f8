//! Error types for the analytical placement flow.

/// The result type for fallible analytical-placement operations.
pub type ApResult<T> = Result<T, ApError>;

/// Errors that can occur during analytical placement.
///
/// Every fatal condition in the flow surfaces as one of these variants; the
/// embedder is responsible for translating it to an exit code. Recoverable
/// conditions are reported as warning diagnostics instead and never reach
/// this type.
#[derive(Debug, thiserror::Error)]
pub enum ApError {
    /// An atom in the netlist references a model with no dimension in the
    /// architecture's model library.
    #[error("atom '{atom}' uses model index {model_index} which has no dimension in the architecture (only {num_models} models known)")]
    MalformedArchitecture {
        /// The name of the offending atom.
        atom: String,
        /// The out-of-range model index.
        model_index: usize,
        /// The number of models the architecture actually describes.
        num_models: usize,
    },

    /// A user-supplied target density string could not be parsed.
    #[error("malformed target density argument '{0}', expected 'tile_type:factor'")]
    MalformedTargetDensity(String),

    /// A target density factor was zero or negative.
    #[error("target density for tile type '{tile_type}' must be positive, got {factor}")]
    InvalidTargetDensity {
        /// The tile type the factor was given for.
        tile_type: String,
        /// The rejected factor.
        factor: f64,
    },

    /// A target density argument named a tile type that does not exist.
    #[error("unknown tile type '{0}' in target density argument")]
    UnknownTileType(String),

    /// The conjugate gradient solver failed to converge.
    #[error("conjugate gradient failed to converge while solving for the {axis} axis (residual {residual:.3e} after {iterations} iterations)")]
    SolverNonConvergence {
        /// Which axis was being solved ("x" or "y").
        axis: &'static str,
        /// The relative residual reached before giving up.
        residual: f64,
        /// The number of iterations performed.
        iterations: usize,
    },

    /// The final partial placement failed its post-condition verification.
    #[error("placement verification failed: {0}")]
    PlacementVerifyFailed(String),

    /// The mass report file could not be written.
    #[error("failed to write mass report: {0}")]
    ReportIo(#[from] std::io::Error),

    /// Two frozen collaborators disagree (e.g. the device grid references
    /// tile types the architecture does not describe).
    #[error(transparent)]
    Inconsistent(#[from] strata_common::InternalError),
}
