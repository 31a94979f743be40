//! Raw MIME parts and sub-header parsing.
//!
//! A multipart splitter hands over each body part as a [`MultiPart`]: its
//! own header block plus the payload bytes. Structured part headers such as
//!
//! ```text
//! Content-Disposition: form-data; name="avatar"; filename="me.png"
//! ```
//!
//! are broken down by [`SubHeaders::parse`] into a primary token
//! (`form-data`) and a parameter store (`name`, `filename`).

use bytes::Bytes;

use crate::store::Headers;

// ── SubHeaders ────────────────────────────────────────────────────────────────

/// A header value split into its primary token and `;`-separated parameters.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SubHeaders {
    /// First segment without an `=`, e.g. `form-data`.
    pub value: String,
    /// Parameter name → value. Names match case-insensitively.
    pub headers: Headers,
}

impl SubHeaders {
    /// Parses one header value. Never fails: segments that do not fit the
    /// grammar are dropped.
    ///
    /// - A segment without `=` becomes [`value`](Self::value) if none has
    ///   been recorded yet; later ones are ignored.
    /// - A segment with `=` is split at the first `=`; name and value are
    ///   trimmed and one pair of surrounding double quotes is removed from the
    ///   value. Escapes inside the quotes are left alone.
    /// - A parameter with an empty name is dropped.
    pub fn parse(value: &str) -> Self {
        let mut sub = Self::default();

        for segment in value.split(';') {
            match segment.split_once('=') {
                None => {
                    if sub.value.is_empty() {
                        sub.value = segment.trim().to_owned();
                    }
                }
                Some((name, raw)) => {
                    let name = name.trim();
                    if !name.is_empty() {
                        sub.headers.set(name, unquote(raw.trim()));
                    }
                }
            }
        }
        sub
    }

    /// `true` when neither a primary token nor any parameter was found.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty() && self.headers.is_empty()
    }
}

fn unquote(v: &str) -> &str {
    v.strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(v)
}

// ── MultiPart ─────────────────────────────────────────────────────────────────

/// One undecoded part of a multipart body.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct MultiPart {
    headers: Headers,
    data: Bytes,
}

impl MultiPart {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { headers: Headers::new(), data: data.into() }
    }

    /// Adds a part header and returns `self`, for building parts inline.
    pub fn with_header(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.append_header(field, value);
        self
    }

    /// Adds a part header, replacing an existing one of the same name.
    pub fn append_header(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.headers.set(field, value);
    }

    pub fn has_header(&self, field: &str) -> bool { self.headers.contains(field) }
    pub fn header(&self, field: &str) -> &str { self.headers.get(field) }
    pub fn try_header(&self, field: &str) -> Option<&str> { self.headers.try_get(field) }
    pub fn headers(&self) -> &Headers { &self.headers }

    pub fn data(&self) -> &Bytes { &self.data }
    pub fn set_data(&mut self, data: impl Into<Bytes>) { self.data = data.into() }
    pub fn into_data(self) -> Bytes { self.data }

    /// Parses one of this part's headers with [`SubHeaders::parse`].
    /// An absent or empty header yields an empty result.
    pub fn sub_headers(&self, field: &str) -> SubHeaders {
        match self.header(field) {
            ""    => SubHeaders::default(),
            value => SubHeaders::parse(value),
        }
    }

    pub(crate) fn into_parts(self) -> (Headers, Bytes) {
        (self.headers, self.data)
    }
}
