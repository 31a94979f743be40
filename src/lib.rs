//! # reqform
//!
//! Best-effort decoding of HTTP requests and `multipart/form-data` bodies.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Something else reads the socket and splits the wire format: an HTTP
//! parser produces the request line, header lines and body bytes, and a
//! multipart splitter cuts the body at the boundary. reqform takes those raw
//! pieces and makes them queryable:
//!
//! - **Headers, cookies, query parameters** — ordered stores with
//!   `""`-on-miss lookups, see [`KeyedStore`]
//! - **Multipart detection** — `Content-Type` inspection and boundary
//!   extraction, see [`Request::parse_content_type`]
//! - **Form data** — `Content-Disposition` parsing and field/file
//!   classification, see [`FormDataItem`]
//! - **Uploads** — a [`SavePolicy`] decides which files are spilled to disk
//!   under a random name, see [`FormDataTransfer`]
//!
//! Malformed client input never produces an error or a panic. It produces
//! less data: a part that is not form data stays a raw [`MultiPart`], an
//! unparsable URL keeps only its raw text, a failed spill keeps the bytes in
//! memory.
//!
//! ## Quick start
//!
//! ```rust
//! use reqform::{MultiPart, Request, UploadSaveOptions};
//!
//! let mut req = Request::new();
//! req.set_url("/profile?tab=avatar").unwrap();
//! req.append_header("Content-Type", "multipart/form-data; boundary=XyZ");
//! req.append_header("Cookie", "sid=42; theme=dark");
//! req.parse_content_type();
//! req.transfer_headers_to_cookies();
//!
//! // normally produced by a multipart splitter
//! req.push_multipart(
//!     MultiPart::new("alice")
//!         .with_header("Content-Disposition", r#"form-data; name="user""#),
//! );
//! req.transfer_multiparts_to_formdata(&UploadSaveOptions::default(), None);
//!
//! assert_eq!(req.boundary(), "XyZ");
//! assert_eq!(req.parameter("tab"), "avatar");
//! assert_eq!(req.parameter("user"), "alice");
//! assert_eq!(req.cookie("sid"), "42");
//! ```

mod cookie;
mod error;
mod formdata;
mod method;
mod multipart;
mod request;
mod save;
mod store;
mod url;

pub mod ingest;

pub use cookie::{parse_cookie_header, Cookies};
pub use error::Error;
pub use formdata::{DataFlag, FormDataItem, FormDataTransfer};
pub use method::Method;
pub use multipart::{MultiPart, SubHeaders};
pub use request::{Flags, ParameterSource, Request};
pub use save::{
    temporary_file_name, DiskWriter, FileWriter, SavePolicy, SaveStrategy, UploadSaveOptions,
    DEFAULT_SIZE_BASE_KIB,
};
pub use store::{Exact, Headers, IgnoreCase, KeyMatch, KeyedStore, Parameters};
pub use url::{Url, UrlField, UrlSpan, UrlTokens};
