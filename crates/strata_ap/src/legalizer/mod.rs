//! Partial legalizers for the global placement flow.
//!
//! A partial legalizer takes an illegal partial placement (blocks overlapping
//! beyond device capacity) and produces a more legal one by spreading blocks
//! toward capacity. Legalizers are interchangeable behind the
//! [`PartialLegalizer`] trait and are chosen once, at construction, through
//! [`make_partial_legalizer`].

mod flow;

pub use flow::FlowBasedLegalizer;

use crate::density::DensityManager;
use crate::error::ApResult;
use crate::netlist::ApNetlist;
use crate::placement::PartialPlacement;
use strata_diagnostics::DiagnosticSink;

/// The closed set of partial legalizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialLegalizerKind {
    /// Multi-commodity flow-based spreading.
    FlowBased,
}

/// A partial legalizer spreading blocks toward device capacity.
pub trait PartialLegalizer {
    /// Legalizes the given placement in place.
    ///
    /// Expects a placement whose blocks are on the device; produces one where
    /// the density of blocks approaches what the device can hold, moving
    /// blocks as little as possible.
    fn legalize(
        &mut self,
        netlist: &ApNetlist,
        placement: &mut PartialPlacement,
        sink: &DiagnosticSink,
    ) -> ApResult<()>;
}

/// Builds a partial legalizer of the given kind.
///
/// The legalizer takes ownership of the density manager; it is the only
/// mutator of density state during the flow. `num_models` is the number of
/// primitive models in the architecture (the dimensionality of
/// primitive-vector space).
pub fn make_partial_legalizer(
    kind: PartialLegalizerKind,
    density_manager: DensityManager,
    num_models: usize,
) -> Box<dyn PartialLegalizer> {
    match kind {
        PartialLegalizerKind::FlowBased => {
            Box::new(FlowBasedLegalizer::new(density_manager, num_models))
        }
    }
}
