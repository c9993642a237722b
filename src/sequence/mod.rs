//! Durable sequence log of odds snapshots

mod log;
mod memory;
mod postgres;

pub use log::SequenceLog;
pub use memory::InMemorySequenceStore;
pub use postgres::PgSequenceStore;
