//! Session token extraction from the `Cookie` header.

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "X-Session-Uuid";

/// Finds the session token in a raw `Cookie` header value.
///
/// Pairs are `;`-separated `name=value`. The first pair named
/// [`SESSION_COOKIE`] wins. Surrounding double quotes are stripped and the
/// value is query-unescaped; a value that does not unescape cleanly is used
/// as-is. Empty values count as absent.
pub fn session_token(cookie_header: &str) -> Option<String> {
    let raw = cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == SESSION_COOKIE)
        .map(|(_, value)| unquote(value.trim()))?;

    if raw.is_empty() {
        return None;
    }

    Some(percent_decode(raw).unwrap_or_else(|| raw.to_string()))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Decodes `%XX` escapes and `+` as space.
///
/// Returns `None` on a truncated or non-hex escape, or when the decoded bytes
/// are not UTF-8.
pub fn percent_decode(value: &str) -> Option<String> {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = hex_value(*bytes.get(i + 1)?)?;
                let lo = hex_value(*bytes.get(i + 2)?)?;
                out.push((hi << 4) | lo);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    String::from_utf8(out).ok()
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_cookie() {
        assert_eq!(session_token("X-Session-Uuid=sess-123").as_deref(), Some("sess-123"));
    }

    #[test]
    fn test_among_other_cookies() {
        let header = "theme=dark; X-Session-Uuid=sess-123 ;lang=en";
        assert_eq!(session_token(header).as_deref(), Some("sess-123"));
    }

    #[test]
    fn test_first_match_wins() {
        let header = "X-Session-Uuid=first; X-Session-Uuid=second";
        assert_eq!(session_token(header).as_deref(), Some("first"));
    }

    #[test]
    fn test_missing_or_empty() {
        assert_eq!(session_token(""), None);
        assert_eq!(session_token("theme=dark"), None);
        assert_eq!(session_token("X-Session-Uuid="), None);
        assert_eq!(session_token("X-Session-Uuid=\"\""), None);
        // Names are case-sensitive.
        assert_eq!(session_token("x-session-uuid=sess-123"), None);
    }

    #[test]
    fn test_quoted_value() {
        assert_eq!(session_token("X-Session-Uuid=\"sess-123\"").as_deref(), Some("sess-123"));
    }

    #[test]
    fn test_escaped_value() {
        assert_eq!(session_token("X-Session-Uuid=a%2Fb+c").as_deref(), Some("a/b c"));
    }

    #[test]
    fn test_bad_escape_falls_back_to_raw() {
        assert_eq!(session_token("X-Session-Uuid=abc%zz").as_deref(), Some("abc%zz"));
        assert_eq!(session_token("X-Session-Uuid=abc%4").as_deref(), Some("abc%4"));
        // One bad escape keeps the whole value raw, including the good one.
        assert_eq!(session_token("X-Session-Uuid=a%2%41").as_deref(), Some("a%2%41"));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("plain").as_deref(), Some("plain"));
        assert_eq!(percent_decode("%41%62").as_deref(), Some("Ab"));
        assert_eq!(percent_decode("%C3%A9").as_deref(), Some("é"));
        assert_eq!(percent_decode("%FF"), None);
        assert_eq!(percent_decode("%"), None);
    }
}
