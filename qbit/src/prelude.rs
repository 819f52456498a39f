//! Common imports for quick starts.

// Common
pub use crate::{BuildError, Config, Error};

// Client
pub use crate::{Form, Qbit, QbitBuilder};

// Records
pub use crate::{Category, Transfer, TransferState};
