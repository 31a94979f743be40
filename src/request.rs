//! Decoded HTTP request.
//!
//! A [`Request`] is filled in piece by piece by whatever reads the wire
//! (see [`ingest`](crate::ingest) for an adapter over `http` / `hyper`
//! types), then decoded in place:
//!
//! 1. [`parse_content_type`](Request::parse_content_type) detects a
//!    multipart body and its boundary,
//! 2. [`transfer_headers_to_cookies`](Request::transfer_headers_to_cookies)
//!    splits the `Cookie` header,
//! 3. a multipart splitter pushes raw parts with
//!    [`push_multipart`](Request::push_multipart), and
//! 4. [`transfer_multiparts_to_formdata`](Request::transfer_multiparts_to_formdata)
//!    turns them into form fields and uploads.
//!
//! One instance is meant to be reused across the requests of a connection:
//! [`reset`](Request::reset) returns it to the freshly constructed state.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;

use tracing::trace;

use crate::cookie::{parse_cookie_header, Cookies};
use crate::error::Error;
use crate::formdata::{FormDataItem, FormDataTransfer};
use crate::method::Method;
use crate::multipart::MultiPart;
use crate::save::SavePolicy;
use crate::store::Headers;
use crate::url::{Url, UrlTokens};

/// Bodies shorter than this keep their buffer across [`Request::reset`].
const BODY_KEEP_LIMIT: usize = 10 * 1024;

/// Capacity a body buffer is re-created with after a large body.
const BODY_RESET_CAPACITY: usize = 2 * 1024;

const MULTIPART_MARKER: &str = "multipart/";
const BOUNDARY_MARKER: &str = "boundary=";

// ── Flags ─────────────────────────────────────────────────────────────────────

/// Protocol facts about the request, set by the reader or by decoding.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Flags {
    pub multipart: bool,
    /// Only ever set together with `multipart`.
    pub formdata: bool,
    pub content_length: bool,
    pub chunked: bool,
    pub keepalive: bool,
    pub upgrade: bool,
}

// ── Parameter lookup ──────────────────────────────────────────────────────────

/// Where [`Request::parameter`] found a name, in precedence order.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParameterSource {
    Url,
    Form,
    Header,
    Cookie,
}

// ── Request ───────────────────────────────────────────────────────────────────

/// An HTTP request decoded into queryable parts.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Request {
    method: Method,
    version_major: u16,
    version_minor: u16,
    url: Url,
    headers: Headers,
    cookies: Cookies,
    body: Vec<u8>,
    content_length: u64,
    boundary: String,
    multiparts: Vec<MultiPart>,
    formdata: Vec<FormDataItem>,
    flags: Flags,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Request line ──────────────────────────────────────────────────────────

    pub fn method(&self) -> Method { self.method }
    pub fn method_name(&self) -> &'static str { self.method.as_str() }
    pub fn set_method(&mut self, method: Method) { self.method = method }

    /// `(major, minor)`, e.g. `(1, 1)`.
    pub fn version(&self) -> (u16, u16) { (self.version_major, self.version_minor) }

    pub fn set_version(&mut self, major: u16, minor: u16) {
        self.version_major = major;
        self.version_minor = minor;
    }

    pub fn url(&self) -> &Url { &self.url }
    pub fn url_mut(&mut self) -> &mut Url { &mut self.url }

    /// Stores `raw` and decomposes it from a tokenizer's output. `raw` is
    /// kept even when decomposition fails.
    pub fn parse_url(&mut self, raw: String, tokens: &UrlTokens) -> Result<(), Error> {
        self.url.decompose(raw, tokens)
    }

    /// [`parse_url`](Self::parse_url) with the built-in [`UrlTokens::scan`].
    pub fn set_url(&mut self, raw: impl Into<String>) -> Result<(), Error> {
        let raw = raw.into();
        let tokens = UrlTokens::scan(&raw);
        self.url.decompose(raw, &tokens)
    }

    // ── Headers ───────────────────────────────────────────────────────────────

    pub fn headers(&self) -> &Headers { &self.headers }

    /// Adds a header; a repeated name (any case) replaces the earlier value.
    pub fn append_header(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.headers.set(field, value);
    }

    pub fn has_header(&self, field: &str) -> bool { self.headers.contains(field) }
    pub fn header(&self, field: &str) -> &str { self.headers.get(field) }
    pub fn try_header(&self, field: &str) -> Option<&str> { self.headers.try_get(field) }

    // ── URL parameters ────────────────────────────────────────────────────────

    pub fn has_url_parameter(&self, name: &str) -> bool { self.url.parameters.contains(name) }
    pub fn url_parameter(&self, name: &str) -> &str { self.url.parameters.get(name) }
    pub fn try_url_parameter(&self, name: &str) -> Option<&str> {
        self.url.parameters.try_get(name)
    }

    // ── Cookies ───────────────────────────────────────────────────────────────

    pub fn cookies(&self) -> &Cookies { &self.cookies }
    pub fn has_cookie(&self, name: &str) -> bool { self.cookies.contains(name) }
    pub fn cookie(&self, name: &str) -> &str { self.cookies.get(name) }
    pub fn try_cookie(&self, name: &str) -> Option<&str> { self.cookies.try_get(name) }

    /// Splits the `Cookie` header into [`cookies`](Self::cookies). A missing
    /// or empty header does nothing; a repeated cookie name keeps the last
    /// value.
    pub fn transfer_headers_to_cookies(&mut self) {
        let header = self.headers.get("Cookie");
        if !header.is_empty() {
            parse_cookie_header(header, &mut self.cookies);
        }
    }

    // ── Form data ─────────────────────────────────────────────────────────────

    pub fn formdata(&self) -> &[FormDataItem] { &self.formdata }

    /// First form item named exactly `name`.
    pub fn form_data_item(&self, name: &str) -> Option<&FormDataItem> {
        self.formdata.iter().find(|item| item.name == name)
    }

    pub fn has_form_data(&self, name: &str) -> bool {
        self.form_data_item(name).is_some()
    }

    /// The item's data as text (lossy), or `""` when absent.
    pub fn form_data(&self, name: &str) -> Cow<'_, str> {
        self.try_form_data(name).unwrap_or(Cow::Borrowed(""))
    }

    pub fn try_form_data(&self, name: &str) -> Option<Cow<'_, str>> {
        self.form_data_item(name).map(FormDataItem::text)
    }

    // ── Parameters (all sources) ──────────────────────────────────────────────

    /// The first source holding `name`: URL query, then form data, then
    /// headers, then cookies. URL and form names match exactly; header and
    /// cookie names ignore case.
    pub fn parameter_source(&self, name: &str) -> Option<ParameterSource> {
        if self.has_url_parameter(name) {
            Some(ParameterSource::Url)
        } else if self.has_form_data(name) {
            Some(ParameterSource::Form)
        } else if self.has_header(name) {
            Some(ParameterSource::Header)
        } else if self.has_cookie(name) {
            Some(ParameterSource::Cookie)
        } else {
            None
        }
    }

    /// Looks `name` up across all sources (see
    /// [`parameter_source`](Self::parameter_source)), `""` when absent.
    pub fn parameter(&self, name: &str) -> Cow<'_, str> {
        self.try_parameter(name).unwrap_or(Cow::Borrowed(""))
    }

    pub fn try_parameter(&self, name: &str) -> Option<Cow<'_, str>> {
        match self.parameter_source(name)? {
            ParameterSource::Url    => self.try_url_parameter(name).map(Cow::Borrowed),
            ParameterSource::Form   => self.try_form_data(name),
            ParameterSource::Header => self.try_header(name).map(Cow::Borrowed),
            ParameterSource::Cookie => self.try_cookie(name).map(Cow::Borrowed),
        }
    }

    // ── Body ──────────────────────────────────────────────────────────────────

    pub fn body(&self) -> &[u8] { &self.body }

    /// Appends a chunk of body bytes as the reader receives them.
    pub fn append_body(&mut self, chunk: &[u8]) {
        self.body.extend_from_slice(chunk);
    }

    pub fn content_length(&self) -> u64 { self.content_length }

    /// Records a declared `Content-Length` and marks it as provided.
    pub fn set_content_length(&mut self, len: u64) {
        self.content_length = len;
        self.flags.content_length = true;
    }

    // ── Multipart ─────────────────────────────────────────────────────────────

    /// Multipart boundary, `""` unless detected or set.
    pub fn boundary(&self) -> &str { &self.boundary }

    pub fn set_multipart_boundary(&mut self, boundary: impl Into<String>) {
        self.boundary = boundary.into();
    }

    /// Parts not (yet) decoded into form data.
    pub fn multiparts(&self) -> &[MultiPart] { &self.multiparts }

    pub fn push_multipart(&mut self, part: MultiPart) {
        self.multiparts.push(part);
    }

    /// Inspects `Content-Type` for a multipart body.
    ///
    /// Marks the request multipart when the value contains `multipart/`, and
    /// form-data when `form-data` appears after it. The text following the
    /// first `boundary=` after the marker becomes the boundary, verbatim to
    /// the end of the value. Without a `Content-Type` or marker nothing
    /// changes.
    pub fn parse_content_type(&mut self) {
        let Some(content_type) = self.headers.try_get("Content-Type") else { return };
        let Some(start) = content_type.find(MULTIPART_MARKER) else { return };
        let rest = &content_type[start + MULTIPART_MARKER.len()..];

        self.flags.multipart = true;
        if rest.contains("form-data") {
            self.flags.formdata = true;
        }
        if let Some(pos) = rest.find(BOUNDARY_MARKER) {
            self.boundary = rest[pos + BOUNDARY_MARKER.len()..].to_owned();
        }
        trace!(
            formdata = self.flags.formdata,
            boundary = %self.boundary,
            "multipart content type"
        );
    }

    /// Decodes [`multiparts`](Self::multiparts) into
    /// [`formdata`](Self::formdata), spilling approved file uploads into
    /// `dir`. Parts that are not form data stay in `multiparts`, in order.
    pub fn transfer_multiparts_to_formdata(&mut self, policy: &dyn SavePolicy, dir: Option<&Path>) {
        let mut transfer = FormDataTransfer::new(policy);
        if let Some(dir) = dir {
            transfer = transfer.directory(dir);
        }
        self.transfer_multiparts_with(&transfer);
    }

    /// Like [`transfer_multiparts_to_formdata`](Self::transfer_multiparts_to_formdata)
    /// with a fully configured [`FormDataTransfer`].
    pub fn transfer_multiparts_with(&mut self, transfer: &FormDataTransfer<'_>) {
        let parts = std::mem::take(&mut self.multiparts);
        let (items, residual) = transfer.transfer(parts);
        self.formdata.extend(items);
        self.multiparts = residual;
    }

    // ── Flags ─────────────────────────────────────────────────────────────────

    pub fn flags(&self) -> Flags { self.flags }

    pub fn is_multipart(&self) -> bool { self.flags.multipart }
    pub fn is_formdata(&self) -> bool { self.flags.formdata }
    pub fn is_content_length_provided(&self) -> bool { self.flags.content_length }
    pub fn is_chunked(&self) -> bool { self.flags.chunked }
    pub fn is_keepalive(&self) -> bool { self.flags.keepalive }
    pub fn is_upgrade(&self) -> bool { self.flags.upgrade }

    /// Clearing multipart also clears form-data.
    pub fn mark_multipart(&mut self, on: bool) {
        self.flags.multipart = on;
        self.flags.formdata &= on;
    }

    /// Setting form-data also sets multipart.
    pub fn mark_formdata(&mut self, on: bool) {
        self.flags.formdata = on;
        self.flags.multipart |= on;
    }

    pub fn mark_content_length_provided(&mut self, on: bool) { self.flags.content_length = on }
    pub fn mark_chunked(&mut self, on: bool) { self.flags.chunked = on }
    pub fn mark_keepalive(&mut self, on: bool) { self.flags.keepalive = on }
    pub fn mark_upgrade(&mut self, on: bool) { self.flags.upgrade = on }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Returns the request to the state of [`Request::new`].
    ///
    /// A body buffer under 10 KiB is cleared and kept; a larger one is
    /// released and replaced by a small pre-sized buffer.
    pub fn reset(&mut self) {
        let mut body = std::mem::take(&mut self.body);
        if body.len() < BODY_KEEP_LIMIT {
            body.clear();
        } else {
            body = Vec::with_capacity(BODY_RESET_CAPACITY);
        }
        *self = Self { body, ..Self::new() };
    }

    /// Human-readable dump of the whole request, for diagnostics only. The
    /// format may change between versions.
    pub fn dump(&self) -> String {
        Dump(self).to_string()
    }
}

// ── Debug dump ────────────────────────────────────────────────────────────────

struct Dump<'a>(&'a Request);

impl fmt::Display for Dump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let req = self.0;
        let url = &req.url;

        f.write_str("====== URL ======\r\n")?;
        write!(f, "url : {}\r\n", url.full)?;
        write!(f, "host : {}\r\n", url.host)?;
        write!(f, "port : {}\r\n", url.port)?;
        write!(f, "path : {}\r\n", url.path)?;
        write!(f, "query : {}\r\n", url.query)?;
        write!(f, "fragment : {}\r\n", url.fragment)?;
        write!(f, "userinfo : {}\r\n", url.userinfo)?;

        f.write_str("====== URL PARAMETERS ======\r\n")?;
        for (name, value) in url.parameters.iter() {
            write!(f, "{name} : {value}\r\n")?;
        }

        f.write_str("====== METHOD ======\r\n")?;
        write!(f, "method : {}\r\n", req.method)?;

        f.write_str("====== HEADERS ======\r\n")?;
        for (name, value) in req.headers.iter() {
            write!(f, "{name} : {value}\r\n")?;
        }

        f.write_str("====== FLAGS ======\r\n")?;
        write!(f, "upgrade : {}\r\n", req.flags.upgrade)?;
        write!(f, "has content-length : {}\r\n", req.flags.content_length)?;
        write!(f, "chunked : {}\r\n", req.flags.chunked)?;
        write!(f, "multipart : {}\r\n", req.flags.multipart)?;
        write!(f, "formdata : {}\r\n", req.flags.formdata)?;
        write!(f, "keepalive : {}\r\n", req.flags.keepalive)?;
        if req.flags.multipart {
            write!(f, "boundary : {}\r\n", req.boundary)?;
        }

        f.write_str("====== BODY ======\r\n")?;
        write!(f, "{}\r\n", String::from_utf8_lossy(&req.body))?;

        f.write_str("======MULTIPART======\r\n")?;
        for part in &req.multiparts {
            for (name, value) in part.headers().iter() {
                write!(f, "{name} = {value}\r\n")?;
            }
            f.write_str("part data : \r\n")?;
            write!(f, "{}\r\n", String::from_utf8_lossy(part.data()))?;
        }

        f.write_str("======FORMDATA======\r\n")?;
        for item in &req.formdata {
            write!(f, "name => {}\r\n", item.name)?;
            write!(f, "is file => {}\r\n", item.is_file())?;
            write!(f, "data => \r\n{}\r\n", item.text())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formdata::DataFlag;

    fn with_content_type(value: &str) -> Request {
        let mut req = Request::new();
        req.append_header("Content-Type", value);
        req.parse_content_type();
        req
    }

    #[test]
    fn multipart_form_data_with_boundary() {
        let req = with_content_type("multipart/form-data; boundary=XYZ");
        assert!(req.is_multipart());
        assert!(req.is_formdata());
        assert_eq!(req.boundary(), "XYZ");
    }

    #[test]
    fn plain_content_type_sets_nothing() {
        let req = with_content_type("text/plain");
        assert!(!req.is_multipart());
        assert!(!req.is_formdata());
        assert_eq!(req.boundary(), "");
    }

    #[test]
    fn missing_content_type_sets_nothing() {
        let mut req = Request::new();
        req.parse_content_type();
        assert_eq!(req, Request::new());
    }

    #[test]
    fn boundary_is_taken_verbatim() {
        let req = with_content_type("multipart/mixed; boundary=\"quoted; still\" ");
        assert!(req.is_multipart());
        assert!(!req.is_formdata());
        assert_eq!(req.boundary(), "\"quoted; still\" ");
    }

    #[test]
    fn form_data_before_marker_does_not_count() {
        let req = with_content_type("form-data; multipart/related");
        assert!(req.is_multipart());
        assert!(!req.is_formdata());
    }

    #[test]
    fn content_type_lookup_ignores_case() {
        let mut req = Request::new();
        req.append_header("content-type", "multipart/form-data; boundary=b");
        req.parse_content_type();
        assert_eq!(req.boundary(), "b");
    }

    #[test]
    fn cookies_from_header() {
        let mut req = Request::new();
        req.append_header("Cookie", "a=1; b=2; c");
        req.transfer_headers_to_cookies();
        assert_eq!(req.cookie("a"), "1");
        assert_eq!(req.cookie("B"), "2");
        assert_eq!(req.try_cookie("c"), Some(""));
        assert_eq!(req.cookies().len(), 3);
    }

    #[test]
    fn url_parameter_wins_over_header() {
        let mut req = Request::new();
        req.set_url("/p?token=from-url").unwrap();
        req.append_header("token", "from-header");
        assert_eq!(req.parameter_source("token"), Some(ParameterSource::Url));
        assert_eq!(req.parameter("token"), "from-url");
    }

    #[test]
    fn parameter_precedence_across_all_sources() {
        let mut req = Request::new();
        req.set_url("/p?u=url").unwrap();
        req.append_header("Cookie", "c=cookie; h=cookie; f=cookie");
        req.append_header("h", "header");
        req.append_header("f", "header");
        req.transfer_headers_to_cookies();
        req.push_multipart(
            MultiPart::new("form").with_header("Content-Disposition", "form-data; name=f"),
        );
        req.transfer_multiparts_to_formdata(&|_: &str, _: usize| false, None);

        assert_eq!(req.parameter("u"), "url");
        assert_eq!(req.parameter("f"), "form");
        assert_eq!(req.parameter("h"), "header");
        assert_eq!(req.parameter("c"), "cookie");
        assert_eq!(req.parameter("missing"), "");
        assert_eq!(req.try_parameter("missing"), None);
        assert_eq!(req.parameter_source("H"), Some(ParameterSource::Header));
    }

    #[test]
    fn url_and_form_names_match_exactly() {
        let mut req = Request::new();
        req.set_url("/p?Name=url").unwrap();
        req.push_multipart(
            MultiPart::new("form").with_header("Content-Disposition", "form-data; name=Field"),
        );
        req.transfer_multiparts_to_formdata(&|_: &str, _: usize| false, None);

        assert_eq!(req.parameter_source("name"), None);
        assert_eq!(req.parameter_source("field"), None);
        assert_eq!(req.parameter("Field"), "form");
    }

    #[test]
    fn transfer_keeps_non_form_parts() {
        let mut req = Request::new();
        req.push_multipart(
            MultiPart::new("a").with_header("Content-Disposition", "form-data; name=a"),
        );
        req.push_multipart(MultiPart::new("raw"));
        req.transfer_multiparts_to_formdata(&|_: &str, _: usize| true, None);

        assert_eq!(req.formdata().len(), 1);
        assert_eq!(req.formdata()[0].data_flag, DataFlag::InMemory);
        assert_eq!(req.multiparts().len(), 1);
        assert_eq!(req.multiparts()[0].data(), "raw");
    }

    #[test]
    fn formdata_flag_implies_multipart() {
        let mut req = Request::new();
        req.mark_formdata(true);
        assert!(req.is_multipart());
        req.mark_multipart(false);
        assert!(!req.is_formdata());
    }

    #[test]
    fn content_length_marks_flag() {
        let mut req = Request::new();
        req.set_content_length(42);
        assert_eq!(req.content_length(), 42);
        assert!(req.is_content_length_provided());
    }

    fn populated(body_len: usize) -> Request {
        let mut req = Request::new();
        req.set_method(Method::Post);
        req.set_version(1, 1);
        req.set_url("http://example.com:8080/upload?x=1#top").unwrap();
        req.append_header("Content-Type", "multipart/form-data; boundary=zz");
        req.append_header("Cookie", "sid=abc");
        req.parse_content_type();
        req.transfer_headers_to_cookies();
        req.append_body(&vec![b'x'; body_len]);
        req.set_content_length(body_len as u64);
        req.mark_keepalive(true);
        req.mark_chunked(true);
        req.mark_upgrade(true);
        req.push_multipart(
            MultiPart::new("1").with_header("Content-Disposition", "form-data; name=a"),
        );
        req.push_multipart(MultiPart::new("2"));
        req.transfer_multiparts_to_formdata(&|_: &str, _: usize| false, None);
        req
    }

    #[test]
    fn reset_matches_fresh_request_for_small_body() {
        let mut req = populated(100);
        let capacity = req.body.capacity();
        req.reset();
        assert_eq!(req, Request::new());
        assert_eq!(req.body.capacity(), capacity);
    }

    #[test]
    fn reset_matches_fresh_request_for_large_body() {
        let mut req = populated(64 * 1024);
        req.reset();
        assert_eq!(req, Request::new());
        assert!(req.body.capacity() < 64 * 1024);
        assert!(req.body.capacity() >= BODY_RESET_CAPACITY);
    }

    #[test]
    fn dump_has_every_section() {
        let dump = populated(4).dump();
        for section in [
            "====== URL ======\r\n",
            "====== URL PARAMETERS ======\r\nx : 1\r\n",
            "====== METHOD ======\r\nmethod : POST\r\n",
            "====== HEADERS ======\r\n",
            "====== FLAGS ======\r\n",
            "boundary : zz\r\n",
            "====== BODY ======\r\nxxxx\r\n",
            "======MULTIPART======\r\npart data : \r\n2\r\n",
            "======FORMDATA======\r\nname => a\r\nis file => false\r\ndata => \r\n1\r\n",
        ] {
            assert!(dump.contains(section), "missing {section:?} in\n{dump}");
        }
        assert!(dump.contains("port : 8080\r\n"));
    }
}
