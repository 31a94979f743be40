//! Filling a [`Request`] from `http` / `hyper` types.
//!
//! The decoder itself does no I/O. When the wire has already been parsed by
//! hyper, these functions copy the result into a [`Request`] and run the
//! header-level decoding steps:
//!
//! ```rust,no_run
//! # async fn handle(incoming: hyper::Request<hyper::body::Incoming>) -> Result<(), reqform::Error> {
//! use reqform::{ingest, Request, UploadSaveOptions};
//!
//! let mut req = Request::new();
//! ingest::read_request(&mut req, incoming).await?;
//! // a multipart splitter pushes parts here with `req.push_multipart(..)`
//! let policy = UploadSaveOptions::default();
//! req.transfer_multiparts_to_formdata(&policy, Some("/tmp/uploads".as_ref()));
//! # Ok(())
//! # }
//! ```

use http::header::{HeaderName, CONNECTION, CONTENT_LENGTH, COOKIE, TRANSFER_ENCODING, UPGRADE};
use http::{HeaderMap, Version};
use http_body_util::BodyExt;
use tracing::debug;

use crate::error::Error;
use crate::method::Method;
use crate::request::Request;

/// Copies the request line and headers from `parts` into `req`, derives the
/// protocol flags, detects multipart bodies and splits cookies.
///
/// Returns the URL decomposition result. An `Err` is informational: every
/// other field has still been filled in, and the raw URL is in
/// `req.url().full`.
pub fn read_parts(req: &mut Request, parts: &http::request::Parts) -> Result<(), Error> {
    let method = Method::try_from(&parts.method).unwrap_or_else(|()| {
        debug!(method = %parts.method, "unknown method, treating as GET");
        Method::default()
    });
    req.set_method(method);

    let (major, minor) = version_numbers(parts.version);
    req.set_version(major, minor);

    copy_headers(req, &parts.headers);

    if let Some(len) = header_str(&parts.headers, CONTENT_LENGTH) {
        match len.trim().parse::<u64>() {
            Ok(n)  => req.set_content_length(n),
            Err(_) => debug!(value = len, "unparsable content-length"),
        }
    }

    let chunked = header_lines(&parts.headers, TRANSFER_ENCODING)
        .last()
        .and_then(|te| te.rsplit(',').next())
        .is_some_and(|coding| coding.trim().eq_ignore_ascii_case("chunked"));
    req.mark_chunked(chunked);

    let connection = |token: &str| {
        header_lines(&parts.headers, CONNECTION).any(|line| has_token(line, token))
    };
    let keepalive = if (major, minor) >= (1, 1) {
        !connection("close")
    } else {
        connection("keep-alive")
    };
    req.mark_keepalive(keepalive);

    let upgrade = method == Method::Connect
        || (connection("upgrade") && parts.headers.contains_key(UPGRADE));
    req.mark_upgrade(upgrade);

    let url = req.set_url(parts.uri.to_string());

    req.parse_content_type();
    req.transfer_headers_to_cookies();
    url
}

/// [`read_parts`] plus collecting the whole body into `req`.
///
/// A body error is returned as [`Error::Body`]; the URL result is returned
/// otherwise.
pub async fn read_request<B>(req: &mut Request, incoming: hyper::Request<B>) -> Result<(), Error>
where
    B: hyper::body::Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let (parts, body) = incoming.into_parts();
    let url = read_parts(req, &parts);

    let collected = body.collect().await.map_err(|e| Error::Body(e.into()))?;
    req.append_body(&collected.to_bytes());
    url
}

fn version_numbers(version: Version) -> (u16, u16) {
    match version {
        Version::HTTP_09 => (0, 9),
        Version::HTTP_10 => (1, 0),
        Version::HTTP_11 => (1, 1),
        Version::HTTP_2  => (2, 0),
        Version::HTTP_3  => (3, 0),
        _                => (1, 1),
    }
}

/// Copies headers, joining repeated `Cookie` lines with `"; "` (HTTP/2
/// sends one per cookie). Any other repeated header keeps its last value.
fn copy_headers(req: &mut Request, headers: &HeaderMap) {
    for name in headers.keys() {
        let values = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        if *name == COOKIE {
            let joined = values.collect::<Vec<_>>().join("; ");
            req.append_header(name.as_str(), joined);
        } else if let Some(last) = values.last() {
            req.append_header(name.as_str(), last);
        }
    }
}

fn header_str(headers: &HeaderMap, name: HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Every line of a repeatable header, in arrival order. Lines that are not
/// visible ASCII are skipped.
fn header_lines(headers: &HeaderMap, name: HeaderName) -> impl Iterator<Item = &str> {
    headers.get_all(name).into_iter().filter_map(|v| v.to_str().ok())
}

fn has_token(list: &str, token: &str) -> bool {
    list.split(',').any(|t| t.trim().eq_ignore_ascii_case(token))
}
