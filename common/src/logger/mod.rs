mod init;
mod slow;
mod spans;
mod trace_id;

pub use init::init_tracing;
pub use slow::warn_if_slow;
pub use spans::{annotate_symbol, root_span};
pub use trace_id::TraceId;
