//! Configure and drive grok/HGS simulation runs.
//!
//! [`ConfigDocument`] edits the keyword-positional grok file,
//! [`timespec`] turns run length and forcing cadence into seconds,
//! [`RunOrchestrator`] sequences the pre-processor and solver, and
//! [`forcing`] binds climate forcing inputs into the document.
pub mod config;
pub mod document;
pub mod error;
pub mod forcing;
pub mod run;
pub mod timespec;

pub use config::{load_run_config, validate_run_config, write_run_config, RunConfig};
pub use document::{ConfigDocument, Decoder, Encoding, Lookup, Value};
pub use error::{Error, Result};
pub use forcing::{
    bind_forcing, CalendarFlags, ForcingKind, ForcingSpec, InputListGenerator, ListRequest,
    VariableRole,
};
pub use run::{PhaseState, RunOrchestrator, PARALLEL_INDEX_FILE};
pub use timespec::{classify, resolve_interval, Cadence, ForcingMode, Interval, RunLength};
