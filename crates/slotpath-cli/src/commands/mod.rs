//! Command implementations for the slotpath CLI

pub mod layout;
pub mod read;
pub mod resolve;
pub mod verify;

pub use layout::cmd_layout;
pub use read::cmd_read;
pub use resolve::{cmd_batch_resolve, cmd_resolve, cmd_resolve_all};
pub use verify::cmd_verify_layout;
