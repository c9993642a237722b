//! Channel type definitions for broadcaster-to-stream delivery

use std::sync::Arc;

use tokio::sync::mpsc;

use super::types::OddsUpdate;

/// Sending half held by the broadcaster for one listener
pub type UpdateSender = mpsc::UnboundedSender<Arc<OddsUpdate>>;

/// Receiving half owned by one stream session
pub type UpdateReceiver = mpsc::UnboundedReceiver<Arc<OddsUpdate>>;

/// Create a listener channel
///
/// Unbounded: a slow viewer must never cause the publisher (the bet
/// processing path) to wait or drop an update.
pub fn create_update_channel() -> (UpdateSender, UpdateReceiver) {
    mpsc::unbounded_channel()
}
