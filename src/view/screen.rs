//! Screen selection
//!
//! Maps an auth snapshot to the top-level screen the shell shows.

use std::fmt;

use crate::models::UserProfile;
use crate::services::AuthSnapshot;

/// Application title shown on the login card and in the header
pub const APP_TITLE: &str = "Clinician AI Assistant";

/// Message shown while the auth state is loading
const LOADING_MESSAGE: &str = "Initializing application...";

/// Top-level screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    /// Spinner while a session is restored or a login is in flight
    Loading { message: &'static str },
    /// Login form
    Login,
    /// Signed-in workspace with the user in the header
    Workspace { user: UserProfile },
}

impl Screen {
    pub fn for_snapshot(snapshot: &AuthSnapshot) -> Self {
        if snapshot.is_loading() {
            return Screen::Loading {
                message: LOADING_MESSAGE,
            };
        }

        match &snapshot.user {
            Some(user) if snapshot.is_authenticated() => Screen::Workspace { user: user.clone() },
            _ => Screen::Login,
        }
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Loading { message } => write!(f, "{}", message),
            Screen::Login => write!(f, "{} | Sign in", APP_TITLE),
            Screen::Workspace { user } => {
                write!(f, "{} | {} [{}] ({})", APP_TITLE, user.name, user.initials(), user.role)
            }
        }
    }
}
