// Middleware modules
pub mod capture;
pub mod correlation;
pub mod logging;
pub mod severity;
pub mod sink;

pub use correlation::RequestId;
pub use logging::{request_logger, RequestLogger, RequestLoggerOptions};
pub use severity::{classify, LogEntry, Severity, Tier};
pub use sink::{LogSink, MemorySink, TracingSink};
