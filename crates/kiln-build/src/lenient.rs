//! Lenient JSON for hand-written descriptors
//!
//! `tsconfig.json` and `binding.gyp` are edited by hand and routinely carry
//! comments, single-quoted strings and trailing commas. They are normalized
//! to strict JSON before `serde_json` sees them.

use serde_json::Value;

/// Parse JSON that may contain `//`, `/* */` and `#` comments, single-quoted
/// strings and trailing commas.
pub fn parse(text: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&normalize(text))
}

/// Rewrite lenient JSON as strict JSON text
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    // A comma (and the whitespace after it) is held back until the next
    // token shows it is not trailing
    let mut pending: Option<String> = None;

    while let Some(c) = chars.next() {
        match c {
            '"' | '\'' => {
                flush_comma(&mut out, &mut pending);
                copy_string(c, &mut chars, &mut out);
            }
            '/' if chars.peek() == Some(&'/') => skip_line(&mut chars),
            '#' => skip_line(&mut chars),
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
            }
            ',' => {
                flush_comma(&mut out, &mut pending);
                pending = Some(String::new());
            }
            '}' | ']' => {
                if let Some(ws) = pending.take() {
                    out.push_str(&ws);
                }
                out.push(c);
            }
            c if c.is_whitespace() => match pending.as_mut() {
                Some(ws) => ws.push(c),
                None => out.push(c),
            },
            c => {
                flush_comma(&mut out, &mut pending);
                out.push(c);
            }
        }
    }
    flush_comma(&mut out, &mut pending);
    out
}

fn flush_comma(out: &mut String, pending: &mut Option<String>) {
    if let Some(ws) = pending.take() {
        out.push(',');
        out.push_str(&ws);
    }
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    for c in chars.by_ref() {
        if c == '\n' {
            break;
        }
    }
}

fn copy_string(quote: char, chars: &mut std::iter::Peekable<std::str::Chars<'_>>, out: &mut String) {
    out.push('"');
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('\'') => out.push('\''),
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                }
                None => out.push('\\'),
            },
            '"' if quote == '\'' => out.push_str("\\\""),
            c if c == quote => break,
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_gyp_style() {
        let text = r#"
# native addon
{
  'targets': [
    {
      'target_name': 'addon',
      'sources': [ 'src/a.cc', 'src/b.cc', ],
    },
  ],
}
"#;
        assert_eq!(
            parse(text).unwrap(),
            json!({"targets": [{"target_name": "addon", "sources": ["src/a.cc", "src/b.cc"]}]})
        );
    }

    #[test]
    fn test_tsconfig_style() {
        let text = r#"{
  // editor settings
  "compilerOptions": {
    "outDir": "out/build", /* inline */
    "tsBuildInfoFile": "./out/tsbuildinfo",
  },
}"#;
        let value = parse(text).unwrap();
        assert_eq!(value["compilerOptions"]["tsBuildInfoFile"], "./out/tsbuildinfo");
    }

    #[test]
    fn test_comment_markers_inside_strings_survive() {
        let value = parse(r#"{"url": "http://x/#a", 'q': 'say "hi"', "s": "it\'s"}"#).unwrap();
        assert_eq!(value["url"], "http://x/#a");
        assert_eq!(value["q"], "say \"hi\"");
    }

    #[test]
    fn test_strict_json_unchanged() {
        let text = r#"{"a": [1, 2, {"b": null}]}"#;
        assert_eq!(normalize(text), text);
    }
}
