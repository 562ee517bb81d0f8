//! Structured diagnostic messages tagged with the flow stage that emitted them.

use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The stage of the flow a diagnostic originated from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Stage {
    /// Mass and capacity pre-computation.
    MassCalculation,
    /// Bin construction and density accounting.
    DensityManager,
    /// The analytical solver.
    Solver,
    /// The partial legalizer.
    PartialLegalizer,
    /// The global placement driver.
    GlobalPlacer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::MassCalculation => write!(f, "mass calculation"),
            Stage::DensityManager => write!(f, "density manager"),
            Stage::Solver => write!(f, "solver"),
            Stage::PartialLegalizer => write!(f, "partial legalizer"),
            Stage::GlobalPlacer => write!(f, "global placer"),
        }
    }
}

/// A structured diagnostic message.
///
/// Diagnostics are the mechanism for reporting warnings and notes to the
/// user. Each diagnostic carries a severity, the flow stage that emitted it,
/// and a human-readable message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The flow stage that emitted this diagnostic.
    pub stage: Stage,
    /// The main diagnostic message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a new error diagnostic from the given stage.
    pub fn error(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            stage,
            message: message.into(),
        }
    }

    /// Creates a new warning diagnostic from the given stage.
    pub fn warning(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage,
            message: message.into(),
        }
    }

    /// Creates a new note diagnostic from the given stage.
    pub fn note(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Note,
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.severity, self.stage, self.message)
    }
}
