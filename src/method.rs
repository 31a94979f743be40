//! HTTP method as a typed enum.
//!
//! Covers RFC 9110 standard methods, the WebDAV family (RFC 4918 / 3253 /
//! 3648 / 4791 / 5323 / 5842), the UPnP / SSDP methods that arrive over plain
//! HTTP/1.1 framing, and `PURGE` used by nginx and Varnish for cache
//! invalidation.
//!
//! A freshly constructed or reset [`Request`](crate::Request) carries
//! [`Method::Get`].

use std::fmt;
use std::str::FromStr;

/// A known HTTP method.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Method {
    // RFC 9110 ─────────────────────────────────────────────────────────────────
    Connect,
    Delete,
    #[default]
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
    // WebDAV RFC 4918 ──────────────────────────────────────────────────────────
    Copy,
    Lock,
    Mkcol,
    Move,
    Propfind,
    Proppatch,
    Unlock,
    // WebDAV extensions ────────────────────────────────────────────────────────
    Acl,        // RFC 3744
    Bind,       // RFC 5842
    Rebind,     // RFC 5842
    Unbind,     // RFC 5842
    Mkcalendar, // RFC 4791 — CalDAV
    Report,     // RFC 3253
    Search,     // RFC 5323
    // Versioning (RFC 3253) ────────────────────────────────────────────────────
    Checkout,
    Merge,
    Mkactivity,
    // UPnP / SSDP ──────────────────────────────────────────────────────────────
    MSearch,
    Notify,
    Subscribe,
    Unsubscribe,
    // Miscellaneous ────────────────────────────────────────────────────────────
    Link,
    Unlink,
    Source, // Icecast
    Purge,  // nginx / Varnish
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Acl         => "ACL",
            Self::Bind        => "BIND",
            Self::Checkout    => "CHECKOUT",
            Self::Connect     => "CONNECT",
            Self::Copy        => "COPY",
            Self::Delete      => "DELETE",
            Self::Get         => "GET",
            Self::Head        => "HEAD",
            Self::Link        => "LINK",
            Self::Lock        => "LOCK",
            Self::MSearch     => "M-SEARCH",
            Self::Merge       => "MERGE",
            Self::Mkactivity  => "MKACTIVITY",
            Self::Mkcalendar  => "MKCALENDAR",
            Self::Mkcol       => "MKCOL",
            Self::Move        => "MOVE",
            Self::Notify      => "NOTIFY",
            Self::Options     => "OPTIONS",
            Self::Patch       => "PATCH",
            Self::Post        => "POST",
            Self::Propfind    => "PROPFIND",
            Self::Proppatch   => "PROPPATCH",
            Self::Purge       => "PURGE",
            Self::Put         => "PUT",
            Self::Rebind      => "REBIND",
            Self::Report      => "REPORT",
            Self::Search      => "SEARCH",
            Self::Source      => "SOURCE",
            Self::Subscribe   => "SUBSCRIBE",
            Self::Trace       => "TRACE",
            Self::Unbind      => "UNBIND",
            Self::Unlink      => "UNLINK",
            Self::Unlock      => "UNLOCK",
            Self::Unsubscribe => "UNSUBSCRIBE",
        }
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACL"         => Ok(Self::Acl),
            "BIND"        => Ok(Self::Bind),
            "CHECKOUT"    => Ok(Self::Checkout),
            "CONNECT"     => Ok(Self::Connect),
            "COPY"        => Ok(Self::Copy),
            "DELETE"      => Ok(Self::Delete),
            "GET"         => Ok(Self::Get),
            "HEAD"        => Ok(Self::Head),
            "LINK"        => Ok(Self::Link),
            "LOCK"        => Ok(Self::Lock),
            "M-SEARCH"    => Ok(Self::MSearch),
            "MERGE"       => Ok(Self::Merge),
            "MKACTIVITY"  => Ok(Self::Mkactivity),
            "MKCALENDAR"  => Ok(Self::Mkcalendar),
            "MKCOL"       => Ok(Self::Mkcol),
            "MOVE"        => Ok(Self::Move),
            "NOTIFY"      => Ok(Self::Notify),
            "OPTIONS"     => Ok(Self::Options),
            "PATCH"       => Ok(Self::Patch),
            "POST"        => Ok(Self::Post),
            "PROPFIND"    => Ok(Self::Propfind),
            "PROPPATCH"   => Ok(Self::Proppatch),
            "PURGE"       => Ok(Self::Purge),
            "PUT"         => Ok(Self::Put),
            "REBIND"      => Ok(Self::Rebind),
            "REPORT"      => Ok(Self::Report),
            "SEARCH"      => Ok(Self::Search),
            "SOURCE"      => Ok(Self::Source),
            "SUBSCRIBE"   => Ok(Self::Subscribe),
            "TRACE"       => Ok(Self::Trace),
            "UNBIND"      => Ok(Self::Unbind),
            "UNLINK"      => Ok(Self::Unlink),
            "UNLOCK"      => Ok(Self::Unlock),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            _             => Err(()),
        }
    }
}

/// Maps an [`http::Method`] onto the known set. Extension methods outside
/// that set are rejected.
impl TryFrom<&http::Method> for Method {
    type Error = ();

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
