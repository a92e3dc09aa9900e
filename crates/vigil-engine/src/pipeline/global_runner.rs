//! Sequential pass over Global tools.

use std::sync::Arc;

use vigil_core::errors::{Cancelled, ScanError, ToolError};
use vigil_core::events::EventDispatcher;
use vigil_core::traits::{Cancellable, RunToken};

use crate::mutation::MutationGate;
use crate::presentation::PresentationStore;
use crate::tools::{
    report_failure, run_isolated, GlobalContext, GroupRegistry, ProblemSink, RunExtension,
    ToolDescriptor, ToolId, ToolKind,
};
use crate::unit::{AnalysisScope, UnitSource};

use super::graph::DeclarationGraph;

/// What the global pass produced besides presentation records.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GlobalPassOutcome {
    /// Tools whose secondary-pass request was honored, in run order.
    pub secondary_requests: Vec<ToolId>,
    /// Units indexed by the declaration graph, if it was built.
    pub graph_units: Option<usize>,
    pub tools_run: usize,
    pub tools_failed: usize,
}

/// Runs Global tools one after another, each under its own read snapshot.
pub struct GlobalToolRunner<'a> {
    pub source: &'a dyn UnitSource,
    pub gate: &'a dyn MutationGate,
    pub store: &'a PresentationStore,
    pub groups: &'a GroupRegistry,
    pub events: &'a EventDispatcher,
    pub extensions: &'a [Arc<dyn RunExtension>],
}

impl GlobalToolRunner<'_> {
    pub fn run(
        &self,
        tools: &[ToolDescriptor],
        scope: &AnalysisScope,
        token: &RunToken,
    ) -> Result<GlobalPassOutcome, Cancelled> {
        let mut outcome = GlobalPassOutcome::default();
        let active: Vec<_> = tools
            .iter()
            .filter(|t| t.enabled)
            .filter_map(|t| match &t.kind {
                ToolKind::Global(tool) => Some((t, tool)),
                _ => None,
            })
            .collect();
        if active.is_empty() {
            return Ok(outcome);
        }

        let graph = if active.iter().any(|(_, tool)| tool.needs_graph()) {
            token.check_cancelled()?;
            match self
                .gate
                .snapshot(|| DeclarationGraph::build(self.source, scope, token))
            {
                Ok(graph) => Some(graph),
                Err(ScanError::Cancelled) => return Err(Cancelled),
                Err(err) => {
                    tracing::error!(error = %err, "declaration graph build failed");
                    None
                }
            }
        } else {
            None
        };
        outcome.graph_units = graph.as_ref().map(DeclarationGraph::len);

        let ctx = GlobalContext::new(self.source, self.gate, scope, graph.as_ref(), token);

        for (descriptor, tool) in active {
            token.check_cancelled()?;
            let tool_scope = descriptor.scope(scope);
            let mut sink = ProblemSink::new(descriptor.id.clone(), descriptor.severity);
            let _span = tracing::debug_span!("global_tool", tool = %descriptor.id).entered();

            let result = self.gate.snapshot(|| {
                run_isolated(&descriptor.id, || tool.run(&tool_scope, &ctx, &mut sink))
            });
            outcome.tools_run += 1;
            match result {
                Ok(()) => {
                    self.store.commit(self.groups, sink.into_records());
                    let eligible = !scope.is_whole_corpus() || tool.has_additional_jobs();
                    if eligible && tool.requests_secondary_pass(&ctx) {
                        outcome.secondary_requests.push(descriptor.id.clone());
                    }
                }
                Err(ToolError::Cancelled) if token.is_cancelled() => return Err(Cancelled),
                Err(err) => {
                    outcome.tools_failed += 1;
                    report_failure(self.events, &descriptor.id, None, &err);
                }
            }
        }

        if !outcome.secondary_requests.is_empty() {
            for extension in self.extensions {
                token.check_cancelled()?;
                let id = ToolId::new(extension.name());
                let requests = &outcome.secondary_requests;
                let result = self
                    .gate
                    .snapshot(|| run_isolated(&id, || extension.post_run(requests, &ctx)));
                match result {
                    Ok(()) => {}
                    Err(ToolError::Cancelled) if token.is_cancelled() => return Err(Cancelled),
                    Err(err) => report_failure(self.events, &id, None, &err),
                }
            }
        }

        Ok(outcome)
    }
}
