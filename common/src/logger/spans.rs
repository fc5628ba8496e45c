use tracing::{Span, field};

use super::TraceId;

/// Root span for one unit of background work (a poll cycle, a startup step).
///
/// `symbol` starts empty and is filled in by [`annotate_symbol`] once known.
pub fn root_span(name: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "root",
        name = %name,
        trace_id = %trace_id,
        symbol = field::Empty
    )
}

pub fn annotate_symbol(symbol: &str) {
    Span::current().record("symbol", field::display(symbol));
}
