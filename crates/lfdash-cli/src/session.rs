//! The small JSON file that carries a sign-in across invocations.
//!
//! Only the rep identity, mode, and range are kept; business and visit data
//! is always reloaded.

use std::path::Path;

use serde::{Deserialize, Serialize};

use lfdash_core::{RangeOption, RepConfig, RepRoster};
use lfdash_view::{DashboardState, Mode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    #[default]
    SignedOut,
    Rep,
    AllActivity,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub mode: SessionMode,
    pub rep_code: Option<String>,
    pub rep_name: Option<String>,
    pub user_id: Option<String>,
    pub range: RangeOption,
}

impl Session {
    #[must_use]
    pub fn from_state(state: &DashboardState) -> Self {
        let mut session = Self {
            range: state.range,
            ..Self::default()
        };
        match &state.mode {
            Mode::Unauthenticated => {}
            Mode::RepScoped { rep, user_id } => {
                session.mode = SessionMode::Rep;
                session.rep_code = Some(rep.code.clone());
                session.rep_name = Some(rep.name.clone());
                session.user_id.clone_from(user_id);
            }
            Mode::AllActivity => session.mode = SessionMode::AllActivity,
        }
        session
    }

    /// Rebuilds the dashboard mode. A rep that has left the roster signs the
    /// session out.
    #[must_use]
    pub fn to_mode(&self, roster: &RepRoster) -> Mode {
        match self.mode {
            SessionMode::SignedOut => Mode::Unauthenticated,
            SessionMode::AllActivity => Mode::AllActivity,
            SessionMode::Rep => {
                let Some(rep) = self.rep_code.as_deref().and_then(|c| roster.lookup(c)) else {
                    tracing::warn!(code = ?self.rep_code, "saved rep is not in the roster; signing out");
                    return Mode::Unauthenticated;
                };
                let rep = RepConfig {
                    user_id: rep.user_id.clone().or_else(|| self.user_id.clone()),
                    ..rep.clone()
                };
                let user_id = rep.user_id.clone();
                Mode::RepScoped { rep, user_id }
            }
        }
    }
}

/// Reads the session file. A missing or unreadable file is a signed-out
/// session.
#[must_use]
pub fn load(path: &Path) -> Session {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Session::default(),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read session file");
            return Session::default();
        }
    };
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring malformed session file");
        Session::default()
    })
}

/// Writes the session, or removes the file when signed out.
///
/// # Errors
///
/// Returns an error if the file cannot be written or removed.
pub fn store(path: &Path, session: &Session) -> anyhow::Result<()> {
    if session.mode == SessionMode::SignedOut {
        return match std::fs::remove_file(path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        };
    }
    let json = serde_json::to_string_pretty(session)?;
    std::fs::write(path, json)?;
    Ok(())
}
