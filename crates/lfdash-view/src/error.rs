use lfdash_client::ProxyError;
use thiserror::Error;

/// Sign-in rejections, worded for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignInError {
    #[error("Enter a 3-letter code (case-insensitive).")]
    InvalidFormat,

    #[error("That code isn't in the allowed list. Known codes: {}", known.join(", "))]
    UnknownCode { code: String, known: Vec<String> },
}

#[derive(Debug, Error)]
pub enum DashboardError {
    #[error(transparent)]
    SignIn(#[from] SignInError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error("no vendor user id found for rep {code} ({name})")]
    UnresolvedRep { code: String, name: String },

    #[error("not signed in")]
    NotSignedIn,

    #[error("access code required")]
    AccessDenied,

    #[error("nothing loaded yet; refresh first")]
    NotLoaded,
}

/// An option string that matched no known value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} \"{value}\"")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
}

impl ParseOptionError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
