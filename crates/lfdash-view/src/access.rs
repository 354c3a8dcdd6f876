//! Access-code gate for IP visibility and the rep-code listing.
//!
//! This is a convenience gate for a shared terminal, not authorization: the
//! code lives in local configuration and anyone who can read it can pass.

use subtle::ConstantTimeEq;

#[derive(Clone, Default)]
pub struct AccessGate {
    code: Option<String>,
    allow_unset: bool,
}

impl AccessGate {
    /// Passes everyone when no code is configured.
    #[must_use]
    pub fn open_when_unset(code: Option<String>) -> Self {
        Self {
            code: code.filter(|c| !c.trim().is_empty()),
            allow_unset: true,
        }
    }

    /// Passes no one when no code is configured.
    #[must_use]
    pub fn closed_when_unset(code: Option<String>) -> Self {
        Self {
            allow_unset: false,
            ..Self::open_when_unset(code)
        }
    }

    /// Whether the gate passes without any code.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.code.is_none() && self.allow_unset
    }

    #[must_use]
    pub fn check(&self, attempt: Option<&str>) -> bool {
        match (&self.code, attempt) {
            (None, _) => self.allow_unset,
            (Some(_), None) => false,
            (Some(code), Some(attempt)) => attempt.trim().as_bytes().ct_eq(code.trim().as_bytes()).into(),
        }
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("code", &self.code.as_ref().map(|_| "[redacted]"))
            .field("allow_unset", &self.allow_unset)
            .finish()
    }
}
