//! `Cookie` header splitting.

use crate::store::Headers;

/// Request cookies. Names match case-insensitively, like headers.
pub type Cookies = Headers;

/// Adds every `name=value` pair in a `Cookie` header value to `cookies`.
///
/// Pairs are separated by `;` and split once on `=`, so values may contain
/// `=` (base64 padding survives). A pair without `=` gets an empty value.
/// Names and values are trimmed; pairs with an empty name are dropped. A
/// repeated name overwrites the earlier value.
pub fn parse_cookie_header(header: &str, cookies: &mut Cookies) {
    for pair in header.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
        let name = name.trim();
        if !name.is_empty() {
            cookies.set(name, value.trim());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(header: &str) -> Cookies {
        let mut jar = Cookies::new();
        parse_cookie_header(header, &mut jar);
        jar
    }

    #[test]
    fn pairs_and_bare_names() {
        let jar = parse("a=1; b=2; c");
        assert_eq!(jar.len(), 3);
        assert_eq!(jar.get("a"), "1");
        assert_eq!(jar.get("b"), "2");
        assert_eq!(jar.try_get("c"), Some(""));
    }

    #[test]
    fn later_duplicate_wins() {
        let jar = parse("session=old; theme=dark; SESSION=new");
        assert_eq!(jar.len(), 2);
        assert_eq!(jar.get("session"), "new");
    }

    #[test]
    fn empty_segments_and_names_are_skipped() {
        let jar = parse(" ; ;=orphan; token=YWJj==;");
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get("token"), "YWJj==");
    }

    #[test]
    fn empty_header_adds_nothing() {
        assert!(parse("").is_empty());
    }
}
