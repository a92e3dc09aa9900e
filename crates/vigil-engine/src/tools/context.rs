//! Contexts handed to tools.

use vigil_core::errors::{Cancelled, ToolError};
use vigil_core::traits::Cancellable;

use crate::mutation::MutationGate;
use crate::pipeline::graph::DeclarationGraph;
use crate::presentation::TextRange;
use crate::unit::{AnalysisScope, AnalysisUnit, ToolScope, UnitSource};

/// Context for a per-unit tool invocation.
pub struct ToolContext<'a> {
    gate: &'a dyn MutationGate,
    token: &'a dyn Cancellable,
    scope: ToolScope<'a>,
    range: TextRange,
}

impl<'a> ToolContext<'a> {
    pub fn new(
        gate: &'a dyn MutationGate,
        token: &'a dyn Cancellable,
        scope: ToolScope<'a>,
        range: TextRange,
    ) -> Self {
        Self {
            gate,
            token,
            scope,
            range,
        }
    }

    /// Cancellation checkpoint. Tools should call this between expensive steps.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        self.token.check_cancelled()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Run `f` under a read snapshot. Fails with `Cancelled` if a mutation
    /// is pending, so the unit is retried once it lands.
    pub fn read_snapshot<R>(&self, f: impl FnOnce() -> R) -> Result<R, Cancelled> {
        self.checkpoint()?;
        self.gate.try_snapshot(f).ok_or(Cancelled)
    }

    pub fn scope(&self) -> &ToolScope<'a> {
        &self.scope
    }

    /// The byte range of the unit under inspection. The whole unit unless
    /// the run scope narrows it; findings outside it are discarded.
    pub fn range(&self) -> TextRange {
        self.range
    }
}

/// Context for a whole-scope tool.
pub struct GlobalContext<'a> {
    source: &'a dyn UnitSource,
    gate: &'a dyn MutationGate,
    scope: &'a AnalysisScope,
    graph: Option<&'a DeclarationGraph>,
    token: &'a dyn Cancellable,
}

impl<'a> GlobalContext<'a> {
    pub fn new(
        source: &'a dyn UnitSource,
        gate: &'a dyn MutationGate,
        scope: &'a AnalysisScope,
        graph: Option<&'a DeclarationGraph>,
        token: &'a dyn Cancellable,
    ) -> Self {
        Self {
            source,
            gate,
            scope,
            graph,
            token,
        }
    }

    pub fn source(&self) -> &'a dyn UnitSource {
        self.source
    }

    pub fn gate(&self) -> &'a dyn MutationGate {
        self.gate
    }

    /// The run's overall scope.
    pub fn scope(&self) -> &'a AnalysisScope {
        self.scope
    }

    /// The declaration graph, if any tool in the run asked for it.
    pub fn graph(&self) -> Option<&'a DeclarationGraph> {
        self.graph
    }

    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        self.token.check_cancelled()
    }

    /// Visit every valid unit in `scope`, checking for cancellation between units.
    pub fn for_each_unit(
        &self,
        scope: &ToolScope<'_>,
        mut f: impl FnMut(&dyn AnalysisUnit) -> Result<(), ToolError>,
    ) -> Result<(), ToolError> {
        let mut outcome = Ok(());
        self.source.enumerate(scope.run_scope(), &mut |unit| {
            if self.token.is_cancelled() {
                outcome = Err(ToolError::Cancelled);
                return false;
            }
            if !unit.is_valid() || !scope.contains(&*unit) {
                return true;
            }
            match f(&*unit) {
                Ok(()) => true,
                Err(err) => {
                    outcome = Err(err);
                    false
                }
            }
        })?;
        outcome
    }
}
