//! Response body fingerprinting.

/// The entity tag for a response body: the quoted hex MD5 digest.
///
/// Identical bodies always produce identical tags, so clients can replay a
/// tag in `If-None-Match` to skip an unchanged payload.
pub fn body_fingerprint(body: &[u8]) -> String {
    let digest = md5::compute(body);
    format!("\"{}\"", hex::encode(digest.as_ref()))
}

/// True when a conditional header's tag list matches `tag`.
///
/// Candidates are comma-separated; `*` matches any tag.
pub fn any_tag_match(header: &str, tag: &str) -> bool {
    header
        .split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || candidate == tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(body_fingerprint(b"payload"), body_fingerprint(b"payload"));
        assert_ne!(body_fingerprint(b"payload"), body_fingerprint(b"payload2"));
    }

    #[test]
    fn test_fingerprint_is_quoted_hex() {
        let tag = body_fingerprint(b"hello world");
        assert_eq!(tag, "\"5eb63bbbe01eeed093cb22bb8f5acdc3\"");
        assert!(tag.starts_with('"') && tag.ends_with('"'));
    }

    #[test]
    fn test_empty_body_has_a_fingerprint() {
        assert_eq!(body_fingerprint(b""), "\"d41d8cd98f00b204e9800998ecf8427e\"");
    }

    #[test]
    fn test_tag_list_matching() {
        let tag = "\"abc\"";

        assert!(any_tag_match("\"abc\"", tag));
        assert!(any_tag_match("\"xyz\", \"abc\"", tag));
        assert!(any_tag_match("*", tag));
        assert!(any_tag_match("\"xyz\" , *", tag));
        assert!(!any_tag_match("\"xyz\"", tag));
        assert!(!any_tag_match("", tag));
    }
}
