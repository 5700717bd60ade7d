//! Relaxed JSON normalization.
//!
//! Rewrites the common ways model output deviates from strict JSON into
//! strict JSON so `serde_json` can take over:
//!
//! - trailing commas before `}` or `]`
//! - unquoted object keys (`{ totalCost: 1 }`)
//! - single-quoted strings
//! - `//` line comments and `/* */` block comments
//!
//! Anything else is copied through unchanged and left for the strict parser
//! to reject.

/// Normalize relaxed JSON text into strict JSON text.
pub fn normalize(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    let mut out = String::with_capacity(input.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        match ch {
            '"' => i = copy_double_quoted(&chars, i, &mut out),
            '\'' => i = convert_single_quoted(&chars, i, &mut out),
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i = (i + 2).min(chars.len());
            }
            ',' => {
                let next = skip_whitespace(&chars, i + 1);
                if !matches!(chars.get(next), Some('}') | Some(']')) {
                    out.push(',');
                }
                i += 1;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let next = skip_whitespace(&chars, i);
                if chars.get(next) == Some(&':') && !is_literal(&ident) {
                    out.push('"');
                    out.push_str(&ident);
                    out.push('"');
                } else {
                    out.push_str(&ident);
                }
            }
            c => {
                out.push(c);
                i += 1;
            }
        }
    }

    out
}

/// Copy a double-quoted string verbatim. Returns the index after it.
fn copy_double_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        match c {
            '\\' => {
                if let Some(&escaped) = chars.get(i) {
                    out.push(escaped);
                    i += 1;
                }
            }
            '"' => return i,
            _ => {}
        }
    }
    i
}

/// Rewrite a single-quoted string as a double-quoted one.
fn convert_single_quoted(chars: &[char], start: usize, out: &mut String) -> usize {
    out.push('"');
    let mut i = start + 1;
    while i < chars.len() {
        let c = chars[i];
        i += 1;
        match c {
            '\\' => match chars.get(i) {
                Some('\'') => {
                    out.push('\'');
                    i += 1;
                }
                Some(&escaped) => {
                    out.push('\\');
                    out.push(escaped);
                    i += 1;
                }
                None => out.push('\\'),
            },
            '"' => out.push_str("\\\""),
            '\'' => {
                out.push('"');
                return i;
            }
            c => out.push(c),
        }
    }
    out.push('"');
    i
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn is_literal(ident: &str) -> bool {
    matches!(ident, "true" | "false" | "null")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> serde_json::Value {
        serde_json::from_str(&normalize(input)).unwrap()
    }

    #[test]
    fn strict_json_passes_through() {
        let input = r#"{"a": [1, 2.5, "x, y"], "b": {"c": null, "d": true}}"#;
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn removes_trailing_commas() {
        let v = parse(r#"{"a": [1, 2, ], "b": {"c": 1,},}"#);
        assert_eq!(v, serde_json::json!({"a": [1, 2], "b": {"c": 1}}));
    }

    #[test]
    fn quotes_bare_keys() {
        let v = parse("{ totalCost: 100, selected_publications: [], ok: true }");
        assert_eq!(
            v,
            serde_json::json!({"totalCost": 100, "selected_publications": [], "ok": true})
        );
    }

    #[test]
    fn converts_single_quoted_strings() {
        let v = parse(r#"{'name': 'Joe\'s "Daily"', 'n': 1}"#);
        assert_eq!(v, serde_json::json!({"name": "Joe's \"Daily\"", "n": 1}));
    }

    #[test]
    fn commas_inside_strings_survive() {
        let v = parse(r#"{'note': 'a, }', "other": "b ,]"}"#);
        assert_eq!(v, serde_json::json!({"note": "a, }", "other": "b ,]"}));
    }

    #[test]
    fn drops_comments() {
        let v = parse("{\n  // running total\n  \"a\": 1, /* inline */ \"b\": 2\n}");
        assert_eq!(v, serde_json::json!({"a": 1, "b": 2}));
    }

    #[test]
    fn bare_words_in_value_position_stay_invalid() {
        assert!(serde_json::from_str::<serde_json::Value>(&normalize("{\"a\": maybe}")).is_err());
    }
}
