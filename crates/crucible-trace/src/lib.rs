mod error;
mod logging;
mod writer;

pub use error::TraceError;
pub use logging::{canonical_logs_dir_from_root, init_process_logging, LoggingInitInfo, ProcessKind};
pub use writer::TraceWriter;
