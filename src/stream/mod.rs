//! Resumable odds event stream
//!
//! # Connection lifecycle
//!
//! ```text
//!   connect ──► Init ──► Backfilling ──► Live ──► Closed
//!                │           │             │
//!                │           │             ├─ broker update ─► guard ─► frame
//!                │           │             └─ every 15s ─────► keep-alive
//!                │           ├─ since(resume) pages / latest / synthetic
//!                │           └─ broker updates buffered
//!                └─ retry hint, subscribe
//! ```
//!
//! # Components
//!
//! - [`Frame`]: tagged union of everything written to a connection
//! - [`StreamSession`]: pure per-connection ordering and dedup state
//! - [`StreamHandler`]: async driver tying the session to the log and broker

mod frame;
mod handler;
mod session;

pub use frame::{Frame, OddsPayload, KEEP_ALIVE_COMMENT, ODDS_EVENT};
pub use handler::{parse_resume_point, StreamHandler};
pub use session::{StreamPhase, StreamSession};
