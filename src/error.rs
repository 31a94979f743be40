//! Unified error type.

use std::fmt;

/// The error type returned by reqform's fallible operations.
///
/// Decoding is best-effort: malformed client input never surfaces as an
/// `Error`. This type reports the few things a caller may want to log, such
/// as a URL the tokenizer could not fully decompose or a spill that could not
/// be written to disk. None of them leave a [`Request`](crate::Request) in a
/// half-updated state.
#[derive(Debug)]
pub enum Error {
    /// Writing an upload to disk failed.
    Io(std::io::Error),
    /// Reading the request body from the transport failed.
    Body(Box<dyn std::error::Error + Send + Sync>),
    /// The URL tokenizer reported a field kind this crate does not know.
    UrlField { kind: usize },
    /// The URL tokenizer reported a range outside the URL string.
    UrlRange { kind: usize },
    /// The URL tokenizer rejected the URL as a whole.
    UrlTokenizer,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e)            => write!(f, "io: {e}"),
            Self::Body(e)          => write!(f, "body: {e}"),
            Self::UrlField { kind } => write!(f, "url: unknown field kind {kind}"),
            Self::UrlRange { kind } => write!(f, "url: field kind {kind} out of range"),
            Self::UrlTokenizer     => f.write_str("url: rejected by tokenizer"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e)   => Some(e),
            Self::Body(e) => Some(e.as_ref()),
            _             => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn io_errors_keep_their_source() {
        let err = Error::from(std::io::Error::other("disk full"));
        assert_eq!(err.to_string(), "io: disk full");
        assert!(err.source().is_some());
    }

    #[test]
    fn url_errors_name_the_field_kind() {
        assert_eq!(Error::UrlField { kind: 9 }.to_string(), "url: unknown field kind 9");
        assert!(Error::UrlTokenizer.source().is_none());
    }
}
