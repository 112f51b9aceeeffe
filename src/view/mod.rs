//! View layer boundary
//!
//! The pieces of the view that carry behaviour rather than layout:
//! - The login form and its validation
//! - Picking which screen to show for an auth snapshot

pub mod login;
pub mod screen;

pub use login::{FormError, LoginForm};
pub use screen::{Screen, APP_TITLE};
