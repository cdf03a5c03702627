//! Media type parsing and formatting.
//!
//! Implements the content-type grammar of RFC 2045 with RFC 2231 parameter
//! continuations and extended values.

use crate::error::{Error, InvalidMediaParameter, Result};
use crate::grammar::{is_token, is_token_char, is_tspecial};
use std::collections::HashMap;

const UPPER_HEX: &[u8] = b"0123456789ABCDEF";

/// Parses a media type value and any optional parameters.
///
/// Returns the media type converted to lowercase and a map of parameters keyed
/// by lowercased attribute name. Parameter values keep their case.
///
/// # Examples
///
/// ```
/// use tokio_mime_flatten::parse_media_type;
///
/// let (media_type, params) = parse_media_type("Multipart/Mixed; boundary=\"a b\"").unwrap();
/// assert_eq!(media_type, "multipart/mixed");
/// assert_eq!(params.get("boundary"), Some(&"a b".to_string()));
/// ```
pub fn parse_media_type(v: &str) -> Result<(String, HashMap<String, String>)> {
    let base = v.split_once(';').map_or(v, |(base, _)| base);
    let mediatype = base.trim().to_lowercase();
    check_media_type(&mediatype)?;

    let mut params = HashMap::new();
    // Keyed by the attribute name before '*'.
    let mut continuation: HashMap<String, HashMap<String, String>> = HashMap::new();

    let mut rest = &v[base.len()..];
    while !rest.is_empty() {
        rest = rest.trim_start_matches([' ', '\t']);
        if rest.is_empty() {
            break;
        }
        let (key, value, remaining) = match consume_media_param(rest) {
            Some(param) => param,
            None => {
                if rest.trim() == ";" {
                    // Tolerate a trailing semicolon.
                    break;
                }
                return Err(InvalidMediaParameter.into());
            }
        };

        let pmap = match key.split_once('*') {
            Some((base_name, _)) => continuation.entry(base_name.to_string()).or_default(),
            None => &mut params,
        };
        if pmap.contains_key(&key) {
            return Err(Error::MediaType(format!("duplicate parameter name {key:?}")));
        }
        pmap.insert(key, value);
        rest = remaining;
    }

    for (key, pieces) in continuation {
        if let Some(v) = pieces.get(&format!("{key}*")) {
            if let Some(decoded) = decode_2231_enc(v) {
                params.insert(key, decoded);
            }
            continue;
        }

        let mut buf = String::new();
        let mut valid = false;
        for n in 0.. {
            let simple = format!("{key}*{n}");
            if let Some(v) = pieces.get(&simple) {
                valid = true;
                buf.push_str(v);
                continue;
            }
            let Some(v) = pieces.get(&format!("{simple}*")) else {
                break;
            };
            valid = true;
            if n == 0 {
                if let Some(decoded) = decode_2231_enc(v) {
                    buf.push_str(&decoded);
                }
            } else if let Some(decoded) = percent_hex_unescape(v) {
                buf.push_str(&decoded);
            }
        }
        if valid {
            params.insert(key, buf);
        }
    }

    Ok((mediatype, params))
}

/// Validates `type/subtype`. A bare type without subtype is accepted.
fn check_media_type(mediatype: &str) -> Result<()> {
    let (typ, rest) = consume_token(mediatype);
    if typ.is_empty() {
        return Err(Error::MediaType("no media type".to_string()));
    }
    if rest.is_empty() {
        return Ok(());
    }
    let Some(rest) = rest.strip_prefix('/') else {
        return Err(Error::MediaType("expected slash after first token".to_string()));
    };
    let (subtype, rest) = consume_token(rest);
    if subtype.is_empty() {
        return Err(Error::MediaType("expected token after slash".to_string()));
    }
    if !rest.is_empty() {
        return Err(Error::MediaType(
            "unexpected content after media subtype".to_string(),
        ));
    }
    Ok(())
}

/// Splits off the leading run of token characters.
fn consume_token(v: &str) -> (&str, &str) {
    let end = v
        .char_indices()
        .find(|&(_, c)| !is_token_char(c))
        .map_or(v.len(), |(i, _)| i);
    v.split_at(end)
}

/// Consumes a token or a quoted-string. Returns `None` for an unterminated or
/// otherwise invalid quoted-string.
fn consume_value(v: &str) -> Option<(String, &str)> {
    let Some(quoted) = v.strip_prefix('"') else {
        let (token, rest) = consume_token(v);
        return Some((token.to_string(), rest));
    };

    let bytes = quoted.as_bytes();
    let mut buf = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Some((String::from_utf8_lossy(&buf).into_owned(), &quoted[i + 1..])),
            b'\\' if i + 1 < bytes.len() && is_tspecial(bytes[i + 1] as char) => {
                buf.push(bytes[i + 1]);
                i += 2;
                continue;
            }
            b'\r' | b'\n' => return None,
            b => buf.push(b),
        }
        i += 1;
    }
    None
}

/// Consumes `; attribute=value`, returning the lowercased attribute, the value
/// and the remaining input.
fn consume_media_param(v: &str) -> Option<(String, String, &str)> {
    let rest = v.trim_start().strip_prefix(';')?.trim_start();
    let (param, rest) = consume_token(rest);
    if param.is_empty() {
        return None;
    }
    let rest = rest.trim_start().strip_prefix('=')?.trim_start();
    let (value, remaining) = consume_value(rest)?;
    if value.is_empty() && remaining.len() == rest.len() {
        return None;
    }
    Some((param.to_lowercase(), value, remaining))
}

/// Decodes an RFC 2231 extended value `charset'language'percent-encoded`.
fn decode_2231_enc(v: &str) -> Option<String> {
    let mut parts = v.splitn(3, '\'');
    let charset = parts.next()?.to_lowercase();
    let _language = parts.next()?;
    let encoded = parts.next()?;
    if charset != "us-ascii" && charset != "utf-8" {
        return None;
    }
    percent_hex_unescape(encoded)
}

fn percent_hex_unescape(s: &str) -> Option<String> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes.get(i + 1..i + 3)?;
            let hi = (hex[0] as char).to_digit(16)?;
            let lo = (hex[1] as char).to_digit(16)?;
            out.push((hi << 4 | lo) as u8);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

/// Serializes a media type and parameters as a content-type value.
///
/// The type and parameter names are written in lower-case and parameters are
/// sorted by name. Returns an empty string if the type or a name is not a valid
/// token.
///
/// # Examples
///
/// ```
/// use tokio_mime_flatten::format_media_type;
/// use std::collections::HashMap;
///
/// let mut params = HashMap::new();
/// params.insert("boundary".to_string(), "outer".to_string());
/// assert_eq!(format_media_type("multipart/mixed", &params), "multipart/mixed; boundary=outer");
/// ```
pub fn format_media_type(t: &str, params: &HashMap<String, String>) -> String {
    let mut result = String::new();

    if let Some((major, sub)) = t.split_once('/') {
        if !is_token(major) || !is_token(sub) {
            return String::new();
        }
        result.push_str(&major.to_lowercase());
        result.push('/');
        result.push_str(&sub.to_lowercase());
    } else {
        if !is_token(t) {
            return String::new();
        }
        result.push_str(&t.to_lowercase());
    }

    let mut keys: Vec<_> = params.keys().collect();
    keys.sort();

    for key in keys {
        let value = &params[key];

        if !is_token(key) {
            return String::new();
        }

        result.push_str("; ");
        result.push_str(&key.to_lowercase());

        if needs_encoding(value) {
            result.push_str("*=utf-8''");
            for &b in value.as_bytes() {
                if b <= b' '
                    || b >= 0x7F
                    || matches!(b, b'*' | b'\'' | b'%')
                    || is_tspecial(b as char)
                {
                    result.push('%');
                    result.push(UPPER_HEX[(b >> 4) as usize] as char);
                    result.push(UPPER_HEX[(b & 0x0F) as usize] as char);
                } else {
                    result.push(b as char);
                }
            }
        } else if is_token(value) {
            result.push('=');
            result.push_str(value);
        } else {
            result.push_str("=\"");
            for ch in value.chars() {
                if ch == '"' || ch == '\\' {
                    result.push('\\');
                }
                result.push(ch);
            }
            result.push('"');
        }
    }

    result
}

/// Reports whether a parameter value needs RFC 2231 encoding.
fn needs_encoding(s: &str) -> bool {
    s.chars().any(|ch| (ch < ' ' || ch > '~') && ch != '\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_media_type_simple() {
        let (media_type, params) = parse_media_type("text/plain").unwrap();
        assert_eq!(media_type, "text/plain");
        assert!(params.is_empty());
    }

    #[test]
    fn test_parse_media_type_lowercases_type_and_keys() {
        let (media_type, params) =
            parse_media_type("MULTIPART/Alternative; BOUNDARY=AbC").unwrap();
        assert_eq!(media_type, "multipart/alternative");
        assert_eq!(params.get("boundary"), Some(&"AbC".to_string()));
    }

    #[test]
    fn test_parse_media_type_quoted_value() {
        let (_, params) =
            parse_media_type(r#"multipart/mixed; boundary="----=_Part_0 \"x\"""#).unwrap();
        assert_eq!(params.get("boundary"), Some(&r#"----=_Part_0 "x""#.to_string()));
    }

    #[test]
    fn test_parse_media_type_trailing_semicolon() {
        let (media_type, params) = parse_media_type("text/plain; charset=utf-8;").unwrap();
        assert_eq!(media_type, "text/plain");
        assert_eq!(params.get("charset"), Some(&"utf-8".to_string()));
    }

    #[test]
    fn test_parse_media_type_bare_type() {
        let (media_type, _) = parse_media_type("text").unwrap();
        assert_eq!(media_type, "text");
    }

    #[test]
    fn test_parse_media_type_errors() {
        assert!(matches!(parse_media_type(""), Err(Error::MediaType(_))));
        assert!(matches!(parse_media_type("text/"), Err(Error::MediaType(_))));
        assert!(matches!(parse_media_type("text / plain"), Err(Error::MediaType(_))));
        assert!(matches!(parse_media_type("text/plain/x"), Err(Error::MediaType(_))));
        assert!(matches!(parse_media_type("text/plain; charset"), Err(Error::MediaType(_))));
        assert!(matches!(
            parse_media_type("text/plain; name=\"unterminated"),
            Err(Error::MediaType(_))
        ));
        assert!(matches!(
            parse_media_type("text/plain; a=1; A=2"),
            Err(Error::MediaType(_))
        ));
    }

    #[test]
    fn test_parse_media_type_rejects_repeated_equal_parameter() {
        assert!(matches!(
            parse_media_type("text/plain; charset=utf-8; charset=utf-8"),
            Err(Error::MediaType(_))
        ));
        assert!(matches!(
            parse_media_type("text/plain; title*0=a; title*0=a"),
            Err(Error::MediaType(_))
        ));
    }

    #[test]
    fn test_parse_media_type_rfc2231_continuation() {
        let (_, params) = parse_media_type(
            "application/x-stuff; title*0=\"This is \"; title*1=\"even more \"; title*2=\"***fun***\"",
        )
        .unwrap();
        assert_eq!(
            params.get("title"),
            Some(&"This is even more ***fun***".to_string())
        );
    }

    #[test]
    fn test_parse_media_type_rfc2231_extended() {
        let (_, params) = parse_media_type(
            "application/x-stuff; title*=us-ascii'en-us'This%20is%20%2A%2A%2Afun%2A%2A%2A",
        )
        .unwrap();
        assert_eq!(params.get("title"), Some(&"This is ***fun***".to_string()));

        let (_, params) = parse_media_type(
            "application/x-stuff; title*0*=utf-8''caf%C3%A9; title*1=\" menu\"",
        )
        .unwrap();
        assert_eq!(params.get("title"), Some(&"café menu".to_string()));

        // Unknown charsets are dropped.
        let (_, params) = parse_media_type("text/plain; title*=koi8-r''abc").unwrap();
        assert!(params.get("title").is_none());
    }

    #[test]
    fn test_format_media_type_with_params() {
        let mut params = HashMap::new();
        params.insert("charset".to_string(), "utf-8".to_string());
        assert_eq!(format_media_type("Text/Plain", &params), "text/plain; charset=utf-8");
    }

    #[test]
    fn test_format_media_type_quoted_and_encoded() {
        let mut params = HashMap::new();
        params.insert("boundary".to_string(), "a b".to_string());
        assert_eq!(
            format_media_type("multipart/mixed", &params),
            "multipart/mixed; boundary=\"a b\""
        );

        let mut params = HashMap::new();
        params.insert("name".to_string(), "café".to_string());
        let formatted = format_media_type("text/plain", &params);
        assert_eq!(formatted, "text/plain; name*=utf-8''caf%C3%A9");
        let (_, parsed) = parse_media_type(&formatted).unwrap();
        assert_eq!(parsed.get("name"), Some(&"café".to_string()));
    }
}
