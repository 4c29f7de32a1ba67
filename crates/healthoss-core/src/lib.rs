pub mod config;
pub mod session;
pub mod state;
pub mod transport;

// Re-export main types for convenience
pub use config::Config;
pub use session::{Dispatch, IgnoreReason, Session, Submission};
pub use state::{ChatMessage, ChatRole, SessionState, Transcript};
pub use transport::{HttpTransport, Transport, TransportError};
