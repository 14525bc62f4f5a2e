//! Durable per-scope usage records
//!
//! Persists one [`UsageRecord`] JSON document per cache scope, plus a
//! headroom reservation file that can be released when the device runs out
//! of space so the index itself stays writable long enough to sync.

mod error;
mod index;
mod types;

pub use error::{IndexError, Result};
pub use index::{FsUsageIndex, HEADROOM_BYTES};
pub use types::UsageRecord;
