pub(crate) mod core;
mod dispatch;
mod form;
mod login;

pub use self::core::{Qbit, QbitBuilder};
pub use form::Form;
pub use login::LOGIN_TIMEOUT;
