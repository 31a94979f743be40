//! Decomposed request URL.
//!
//! A URL tokenizer reports each component as a `(kind, offset, length)` span
//! over the original string. [`Url::decompose`] copies those spans into named
//! fields. Decomposition is best-effort: the raw URL always lands in
//! [`Url::full`], and whatever components were assigned before a bad span
//! stay assigned.
//!
//! [`UrlTokens::scan`] is a small tokenizer for request targets that uses
//! [`http::Uri`] to reject malformed input and then locates the component
//! spans itself.

use tracing::debug;

use crate::error::Error;
use crate::store::Parameters;

// ── Tokenizer output ──────────────────────────────────────────────────────────

/// Component kinds, numbered in the classic tokenizer layout.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UrlField {
    Schema   = 0,
    Host     = 1,
    Port     = 2,
    Path     = 3,
    Query    = 4,
    Fragment = 5,
    UserInfo = 6,
}

impl UrlField {
    pub fn from_index(kind: usize) -> Option<Self> {
        match kind {
            0 => Some(Self::Schema),
            1 => Some(Self::Host),
            2 => Some(Self::Port),
            3 => Some(Self::Path),
            4 => Some(Self::Query),
            5 => Some(Self::Fragment),
            6 => Some(Self::UserInfo),
            _ => None,
        }
    }

    pub fn index(self) -> usize { self as usize }
}

/// One component span over the raw URL string. `kind` is kept raw so that
/// tokenizers reporting kinds outside [`UrlField`] can be represented.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UrlSpan {
    pub kind: usize,
    pub offset: usize,
    pub len: usize,
}

impl UrlSpan {
    pub fn new(field: UrlField, offset: usize, len: usize) -> Self {
        Self { kind: field.index(), offset, len }
    }
}

/// Everything a URL tokenizer reports about one URL.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct UrlTokens {
    /// The tokenizer rejected the URL; `fields` and `port` are meaningless.
    pub failed: bool,
    /// Numeric port, 0 when the URL does not name one.
    pub port: u16,
    pub fields: Vec<UrlSpan>,
}

impl UrlTokens {
    /// Tokenizes a request target in origin-form (`/a/b?c#d`), absolute-form
    /// (`http://user@host:8080/a?b#c`) or asterisk-form (`*`).
    ///
    /// Authority-form targets (`host:443`, used by `CONNECT`) and anything
    /// [`http::Uri`] refuses are reported as failed.
    pub fn scan(raw: &str) -> Self {
        let failed = || Self { failed: true, ..Self::default() };

        let (head, fragment) = match raw.find('#') {
            Some(i) => (&raw[..i], Some(i + 1)),
            None    => (raw, None),
        };
        if head.is_empty() || http::Uri::try_from(head).is_err() {
            return failed();
        }

        let mut tokens = Self::default();
        let (head, query) = match head.find('?') {
            Some(i) => (&head[..i], Some(i + 1)),
            None    => (head, None),
        };

        let path_start = match head.find("://") {
            Some(end) if is_scheme(&head[..end]) => {
                tokens.fields.push(UrlSpan::new(UrlField::Schema, 0, end));
                let auth_start = end + 3;
                let auth_end = head[auth_start..].find('/').map_or(head.len(), |i| auth_start + i);
                if !tokens.scan_authority(head, auth_start, auth_end) {
                    return failed();
                }
                auth_end
            }
            _ if head.starts_with('/') || head == "*" => 0,
            _ => return failed(),
        };

        if path_start < head.len() {
            tokens.fields.push(UrlSpan::new(UrlField::Path, path_start, head.len() - path_start));
        }
        if let Some(start) = query {
            let end = fragment.map_or(raw.len(), |f| f - 1);
            tokens.fields.push(UrlSpan::new(UrlField::Query, start, end - start));
        }
        if let Some(start) = fragment {
            tokens.fields.push(UrlSpan::new(UrlField::Fragment, start, raw.len() - start));
        }
        tokens
    }

    /// Splits `raw[start..end]` into userinfo, host and port spans.
    fn scan_authority(&mut self, raw: &str, start: usize, end: usize) -> bool {
        let authority = &raw[start..end];
        let host_start = match authority.rfind('@') {
            Some(at) => {
                self.fields.push(UrlSpan::new(UrlField::UserInfo, start, at));
                start + at + 1
            }
            None => start,
        };

        let hostport = &raw[host_start..end];
        let (host_offset, host_len, rest) = if let Some(inner) = hostport.strip_prefix('[') {
            // IPv6 literal: the span excludes the brackets.
            let Some(close) = inner.find(']') else { return false };
            (host_start + 1, close, &inner[close + 1..])
        } else {
            let colon = hostport.find(':').unwrap_or(hostport.len());
            (host_start, colon, &hostport[colon..])
        };
        if host_len == 0 {
            return false;
        }
        self.fields.push(UrlSpan::new(UrlField::Host, host_offset, host_len));

        if let Some(port) = rest.strip_prefix(':') {
            if port.is_empty() {
                return true;
            }
            let Ok(n) = port.parse::<u16>() else { return false };
            self.port = n;
            self.fields.push(UrlSpan::new(UrlField::Port, end - port.len(), port.len()));
        } else if !rest.is_empty() {
            return false;
        }
        true
    }
}

fn is_scheme(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

// ── Url ───────────────────────────────────────────────────────────────────────

/// The request URL, split into components.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Url {
    pub full: String,
    pub schema: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub query: String,
    pub fragment: String,
    pub userinfo: String,
    /// `query` split into `name=value` pairs; no percent-decoding.
    pub parameters: Parameters,
}

impl Url {
    /// Assigns every span in `tokens` to its field and stores `full`.
    ///
    /// Returns the first problem encountered. Spans after a bad one are still
    /// applied, and nothing assigned is rolled back.
    pub fn decompose(&mut self, full: String, tokens: &UrlTokens) -> Result<(), Error> {
        if tokens.failed {
            debug!(url = %full, "url rejected by tokenizer");
            self.full = full;
            return Err(Error::UrlTokenizer);
        }

        self.port = tokens.port;
        let mut outcome = Ok(());

        for span in &tokens.fields {
            let Some(field) = UrlField::from_index(span.kind) else {
                debug!(url = %full, kind = span.kind, "unknown url field kind");
                outcome = outcome.and(Err(Error::UrlField { kind: span.kind }));
                continue;
            };
            let value = span.offset
                .checked_add(span.len)
                .and_then(|end| full.get(span.offset..end));
            let Some(slot) = self.field_mut(field) else { continue };
            match value {
                Some(v) => *slot = v.to_owned(),
                None => {
                    debug!(url = %full, kind = span.kind, "url field span out of range");
                    outcome = outcome.and(Err(Error::UrlRange { kind: span.kind }));
                }
            }
        }

        self.full = full;
        self.parse_query();
        outcome
    }

    /// Rebuilds [`parameters`](Self::parameters) from [`query`](Self::query).
    ///
    /// Pairs are separated by `&` and split once on `=`; a pair without `=`
    /// has an empty value. Pairs with an empty name are skipped, and a later
    /// duplicate name replaces an earlier one.
    pub fn parse_query(&mut self) {
        self.parameters.clear();
        for pair in self.query.split('&').filter(|p| !p.is_empty()) {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            if !name.is_empty() {
                self.parameters.set(name, value);
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// The string slot for `field`. Ports have none: the number lives in
    /// [`port`](Self::port).
    fn field_mut(&mut self, field: UrlField) -> Option<&mut String> {
        match field {
            UrlField::Schema   => Some(&mut self.schema),
            UrlField::Host     => Some(&mut self.host),
            UrlField::Port     => None,
            UrlField::Path     => Some(&mut self.path),
            UrlField::Query    => Some(&mut self.query),
            UrlField::Fragment => Some(&mut self.fragment),
            UrlField::UserInfo => Some(&mut self.userinfo),
        }
    }
}
