//! Structured-argument detection and decoding.
//!
//! A single command-line token may carry several named values:
//!
//! - query: `name=John&tags=go&tags=cli`
//! - form: `user='admin user' email=a@b.com`
//! - JSON: `{"id":123}` or `["v1","v2"]`
//!
//! Anything else is an opaque positional value. Decoders are pure and return
//! key -> ordered values; keyless fragments are collected under `""`.

use std::collections::BTreeMap;

use serde_json::Value as Json;

use crate::domain::error::FormatError;

/// Decoded key/value groups, keys sorted, values in input order.
pub type ArgValues = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgFormat {
    Json,
    Query,
    Form,
    Positional,
}

/// True for tokens shaped like a JSON object or array.
pub fn is_json_shaped(token: &str) -> bool {
    let t = token.trim();
    (t.starts_with('{') && t.ends_with('}')) || (t.starts_with('[') && t.ends_with(']'))
}

/// Classify a raw token after trimming; the first matching rule wins.
pub fn detect(token: &str) -> ArgFormat {
    let token = token.trim();
    if is_json_shaped(token) {
        ArgFormat::Json
    } else if token.contains('=') && !token.starts_with('-') {
        if token.contains('&') || !token.contains(' ') {
            ArgFormat::Query
        } else {
            ArgFormat::Form
        }
    } else {
        ArgFormat::Positional
    }
}

/// Decode `token` by its detected format; `None` for positional tokens.
pub fn decode(token: &str) -> Result<Option<ArgValues>, FormatError> {
    let token = token.trim();
    match detect(token) {
        ArgFormat::Json => parse_json_args(token).map(Some),
        ArgFormat::Query => parse_query_args(token).map(Some),
        ArgFormat::Form => parse_form_args(token).map(Some),
        ArgFormat::Positional => Ok(None),
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Query-component unescape: `%XX` sequences and `+` as space.
fn unescape(s: &str) -> Result<String, FormatError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hi = bytes.get(i + 1).copied().and_then(hex_digit);
                let lo = bytes.get(i + 2).copied().and_then(hex_digit);
                match (hi, lo) {
                    (Some(hi), Some(lo)) => out.push(hi << 4 | lo),
                    _ => {
                        let end = (i + 3).min(bytes.len());
                        let bad = String::from_utf8_lossy(&bytes[i..end]).into_owned();
                        return Err(FormatError::Escape(bad));
                    }
                }
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
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// URL query-string decoding; repeated keys accumulate in order.
pub fn parse_query_args(query: &str) -> Result<ArgValues, FormatError> {
    let mut values = ArgValues::new();
    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }
        if pair.contains(';') {
            return Err(FormatError::Semicolon);
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        values
            .entry(unescape(key)?)
            .or_default()
            .push(unescape(value)?);
    }
    Ok(values)
}

/// Space-separated `key=value` pairs with optional quoting.
///
/// Quote characters are consumed; whitespace and `=` inside quotes are
/// literal. Segments without an unquoted `=` go under the `""` key.
pub fn parse_form_args(form: &str) -> Result<ArgValues, FormatError> {
    let mut values = ArgValues::new();
    let mut quote: Option<char> = None;
    let mut key: Option<String> = None;
    let mut buf = String::new();
    let mut touched = false;

    let mut flush = |key: &mut Option<String>, buf: &mut String, touched: &mut bool| {
        match key.take() {
            Some(k) => {
                let k = k.trim().to_string();
                if !k.is_empty() {
                    values.entry(k).or_default().push(std::mem::take(buf));
                }
            }
            None if *touched => {
                values.entry(String::new()).or_default().push(std::mem::take(buf));
            }
            None => {}
        }
        buf.clear();
        *touched = false;
    };

    for c in form.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => buf.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                touched = true;
            }
            (None, '=') if key.is_none() => {
                key = Some(std::mem::take(&mut buf));
                touched = true;
            }
            (None, c) if c.is_whitespace() => flush(&mut key, &mut buf, &mut touched),
            (None, c) => {
                buf.push(c);
                touched = true;
            }
        }
    }
    if let Some(q) = quote {
        return Err(FormatError::UnterminatedQuote {
            quote: q,
            input: form.to_string(),
        });
    }
    flush(&mut key, &mut buf, &mut touched);
    Ok(values)
}

/// Shortest float text, switching to exponent form for very small or large
/// magnitudes (`1e-07`, `1e+21`).
fn format_float(f: f64) -> String {
    if f == 0.0 || !f.is_finite() {
        return f.to_string();
    }
    let sci = format!("{:e}", f);
    let (mantissa, exp) = sci.split_once('e').unwrap_or((sci.as_str(), "0"));
    let exp: i32 = exp.parse().unwrap_or(0);
    if !(-4..21).contains(&exp) {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        f.to_string()
    }
}

fn stringify(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        Json::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (_, Some(u), _) => u.to_string(),
            (_, _, Some(f)) => format_float(f),
            _ => n.to_string(),
        },
        Json::Bool(b) => b.to_string(),
        Json::Null => String::new(),
        nested => nested.to_string(),
    }
}

/// Decode a JSON object (one value per member) or array (all under `""`).
pub fn parse_json_args(json: &str) -> Result<ArgValues, FormatError> {
    let parsed: Json = serde_json::from_str(json).map_err(|e| FormatError::Json(e.to_string()))?;
    let mut values = ArgValues::new();
    match parsed {
        Json::Object(members) => {
            for (key, val) in members.iter() {
                values.entry(key.clone()).or_default().push(stringify(val));
            }
        }
        Json::Array(items) => {
            let slot = values.entry(String::new()).or_default();
            slot.extend(items.iter().map(stringify));
        }
        other => {
            return Err(FormatError::Json(format!(
                "expected object or array, got {}",
                other
            )))
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn values(pairs: &[(&str, &[&str])]) -> ArgValues {
        pairs
            .iter()
            .map(|(k, vs)| (k.to_string(), vs.iter().map(|v| v.to_string()).collect()))
            .collect()
    }

    #[rstest]
    #[case(r#"{"id":1}"#, ArgFormat::Json)]
    #[case(r#" ["a"] "#, ArgFormat::Json)]
    #[case("a=1&b=2", ArgFormat::Query)]
    #[case("a=1", ArgFormat::Query)]
    #[case("a=1 b=2", ArgFormat::Form)]
    #[case("--name=x", ArgFormat::Positional)]
    #[case(" -x=1", ArgFormat::Positional)]
    #[case("  a=1  ", ArgFormat::Query)]
    #[case(" a=1 b=2 ", ArgFormat::Form)]
    #[case("plain", ArgFormat::Positional)]
    fn test_detect(#[case] token: &str, #[case] want: ArgFormat) {
        assert_eq!(detect(token), want);
    }

    #[test]
    fn test_query_accumulates_repeated_keys() {
        let got = parse_query_args("name=John&age=30&tags=go&tags=cli").unwrap();
        assert_eq!(
            got,
            values(&[("name", &["John"]), ("age", &["30"]), ("tags", &["go", "cli"])])
        );
    }

    #[test]
    fn test_query_percent_decodes() {
        let got = parse_query_args("q=a%20b+c&k%3D=v").unwrap();
        assert_eq!(got, values(&[("q", &["a b c"]), ("k=", &["v"])]));
    }

    #[rstest]
    #[case("a=%zz")]
    #[case("a=%4")]
    #[case("a=1;b=2")]
    fn test_query_rejects_malformed(#[case] input: &str) {
        assert!(parse_query_args(input).is_err(), "{input} should fail");
    }

    #[test]
    fn test_form_strips_quotes() {
        let got = parse_form_args("user='admin user' email=a@b.com active=false").unwrap();
        assert_eq!(
            got,
            values(&[("user", &["admin user"]), ("email", &["a@b.com"]), ("active", &["false"])])
        );
    }

    #[test]
    fn test_form_equals_inside_quotes_is_literal() {
        let got = parse_form_args(r#"expr="a=b c" x=1"#).unwrap();
        assert_eq!(got, values(&[("expr", &["a=b c"]), ("x", &["1"])]));
    }

    #[test]
    fn test_form_keyless_segment_goes_under_empty_key() {
        let got = parse_form_args("loose k=v").unwrap();
        assert_eq!(got, values(&[("", &["loose"]), ("k", &["v"])]));
    }

    #[test]
    fn test_form_unterminated_quote_fails() {
        assert!(matches!(
            parse_form_args("a='open b=c"),
            Err(FormatError::UnterminatedQuote { quote: '\'', .. })
        ));
    }

    #[test]
    fn test_json_object() {
        let got = parse_json_args(r#"{"id":123,"title":"Test"}"#).unwrap();
        assert_eq!(got, values(&[("id", &["123"]), ("title", &["Test"])]));
    }

    #[test]
    fn test_json_array_goes_under_empty_key() {
        let got = parse_json_args(r#"["v1","v2"]"#).unwrap();
        assert_eq!(got, values(&[("", &["v1", "v2"])]));
    }

    #[test]
    fn test_json_stringifies_members() {
        let got = parse_json_args(r#"{"f":1.5,"b":true,"n":null,"o":{"x":1},"big":1e21,"tiny":0.00001}"#)
            .unwrap();
        assert_eq!(got["f"], vec!["1.5"]);
        assert_eq!(got["b"], vec!["true"]);
        assert_eq!(got["n"], vec![""]);
        assert_eq!(got["o"], vec![r#"{"x":1}"#]);
        assert_eq!(got["big"], vec!["1e+21"]);
        assert_eq!(got["tiny"], vec!["1e-05"]);
    }

    #[rstest]
    #[case("{broken")]
    #[case("42")]
    fn test_json_rejects_non_container(#[case] input: &str) {
        assert!(parse_json_args(input).is_err());
    }
}
