use tracing::{Span, field};

use super::TraceId;

/// Create a root span for one selection/notification cycle.
///
/// `candidate` starts empty and is recorded once the selector has picked
/// an instrument.
pub fn root_span(name: &'static str, trace_id: &TraceId, cycle: u64) -> Span {
    tracing::info_span!(
        "cycle",
        name = %name,
        trace_id = %trace_id.as_str(),
        cycle,
        candidate = field::Empty
    )
}

/// Create a child span (inherits trace_id automatically)
pub fn child_span(name: &'static str) -> Span {
    tracing::info_span!("step", name = %name)
}
