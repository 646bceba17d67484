//! # boks-session
//!
//! The live side of the Boks controller: a [`BoksSession`] owns one
//! connection to one box, turns typed commands into frames, matches the
//! notifications that come back to the commands that caused them, and
//! chains the log-count / log-request / history exchange on its own.
//!
//! The radio is abstracted behind the [`Transport`] trait.  A host
//! application supplies a BLE binding; tests and capture replay use the
//! scripted [`MockTransport`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use boks_session::{BoksSession, MockTransport, SessionConfig};
//!
//! # async fn example() -> Result<(), boks_session::SessionError> {
//! let session = BoksSession::new(Arc::new(MockTransport::new()), SessionConfig::default());
//! session.connect().await?;
//! let entries = session.fetch_history().await?.await?;
//! println!("{} history entries", entries.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use error::{SessionError, TransportError};
pub use session::{BoksSession, HistoryRetrieval, PendingReply, SessionState};
pub use transport::mock::MockTransport;
pub use transport::{Transport, TransportEvent};
