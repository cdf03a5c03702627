//! Lexical helpers for MIME header values.
//!
//! Token definitions follow RFC 2045 section 5.1.

/// Reports whether the character is in 'tspecials'.
///
/// tspecials := "(" / ")" / "<" / ">" / "@" / "," / ";" / ":" / "\" /
///              <"> / "/" / "[" / "]" / "?" / "="
pub fn is_tspecial(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '='
    )
}

/// Reports whether the character may appear in a 'token'.
///
/// token := 1*<any (US-ASCII) CHAR except SPACE, CTLs, or tspecials>
pub fn is_token_char(c: char) -> bool {
    c > '\x20' && c < '\x7f' && !is_tspecial(c)
}

/// Reports whether the string is a non-empty 'token'.
pub fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

/// Linear white space inside a header line or after a boundary delimiter.
pub fn is_lwsp(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

/// Skips leading space and tab bytes.
pub fn skip_lwsp(b: &[u8]) -> &[u8] {
    let n = b.iter().take_while(|&&c| is_lwsp(c)).count();
    &b[n..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_tspecial() {
        for c in "()<>@,;:\\\"/[]?=".chars() {
            assert!(is_tspecial(c), "{c:?} should be a tspecial");
        }
        assert!(!is_tspecial('a'));
        assert!(!is_tspecial('-'));
    }

    #[test]
    fn test_is_token() {
        assert!(is_token("multipart"));
        assert!(is_token("quoted-printable"));
        assert!(is_token("----boundary_0_1"));
        assert!(!is_token("----=_Part"));

        assert!(!is_token(""));
        assert!(!is_token("text/plain"));
        assert!(!is_token("with space"));
        assert!(!is_token("ctl\x1f"));
    }

    #[test]
    fn test_skip_lwsp() {
        assert_eq!(skip_lwsp(b" \t\r\n"), b"\r\n");
        assert_eq!(skip_lwsp(b"abc"), b"abc");
        assert_eq!(skip_lwsp(b"  "), b"");
    }
}
