//! Stored post format: a front-matter header, a blank line, then the Markdown body.
//!
//! ```text
//! ---
//! title: "My First Post"
//! date: 2026-10-16T09:30:00.000Z
//! ---
//!
//! Body text, stored verbatim.
//! ```

use chrono::{DateTime, SecondsFormat, Utc};

const FENCE: &str = "---";

/// A post as submitted for writing. `created_at` is captured once, at write time.
#[derive(Debug, Clone)]
pub struct Draft {
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Draft {
    pub fn new(title: impl Into<String>, body: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Draft {
            title: title.into(),
            body: body.into(),
            created_at,
        }
    }

    pub fn encode(&self) -> String {
        encode(&self.title, &self.body, self.created_at)
    }
}

/// Serialize a post into the text that is committed to the repository.
pub fn encode(title: &str, body: &str, now: DateTime<Utc>) -> String {
    format!(
        "{FENCE}\ntitle: {}\ndate: {}\n{FENCE}\n\n{}",
        quote(title),
        now.to_rfc3339_opts(SecondsFormat::Millis, true),
        body
    )
}

/// Header fields and body of a stored post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<'a> {
    pub title: Option<String>,
    pub date: Option<String>,
    pub body: &'a str,
}

/// Split a stored post into header fields and body.
///
/// Returns `None` when `raw` does not start with a front-matter block, e.g.
/// files committed by hand. Unknown header keys are ignored.
pub fn parse(raw: &str) -> Option<Parsed<'_>> {
    let rest = raw.strip_prefix("---\n")?;
    let (header, after) = if let Some(after) = rest.strip_prefix("---\n") {
        ("", after)
    } else {
        let end = rest.find("\n---\n")?;
        (&rest[..end], &rest[end + "\n---\n".len()..])
    };

    let mut parsed = Parsed {
        title: None,
        date: None,
        body: after.strip_prefix('\n').unwrap_or(after),
    };
    for line in header.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "title" => parsed.title = Some(unquote(value)),
            "date" => parsed.date = Some(value.to_string()),
            _ => {}
        }
    }
    Some(parsed)
}

fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn unquote(s: &str) -> String {
    let Some(inner) = s.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return s.to_string();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    #[test]
    fn encode_writes_header_blank_line_and_body() {
        let raw = encode("My First Post", "# Hi\n\nbody", at_noon());
        assert_eq!(
            raw,
            "---\ntitle: \"My First Post\"\ndate: 2026-10-16T12:00:00.000Z\n---\n\n# Hi\n\nbody"
        );
    }

    #[test]
    fn body_is_kept_verbatim() {
        let body = "---\nnot a header\n---\n\ntrailing  \n";
        let raw = encode("t", body, at_noon());
        assert!(raw.ends_with(body));
        assert_eq!(parse(&raw).unwrap().body, body);
    }

    #[test]
    fn quotes_in_titles_survive() {
        let title = "Say \"hi\" \\ bye\nnext";
        let raw = encode(title, "b", at_noon());
        assert_eq!(raw.lines().count(), 6);
        let p = parse(&raw).unwrap();
        assert_eq!(p.title.as_deref(), Some(title));
        assert_eq!(p.date.as_deref(), Some("2026-10-16T12:00:00.000Z"));
        assert_eq!(p.body, "b");
    }

    #[test]
    fn parse_rejects_headerless_text() {
        assert!(parse("# Just markdown").is_none());
        assert!(parse("---\nunterminated").is_none());
    }

    #[test]
    fn parse_accepts_hand_written_headers() {
        let p = parse("---\ntitle: Plain\nlayout: post\n---\nbody").unwrap();
        assert_eq!(p.title.as_deref(), Some("Plain"));
        assert_eq!(p.body, "body");

        let empty = parse("---\n---\n\nonly body").unwrap();
        assert_eq!(empty.title, None);
        assert_eq!(empty.body, "only body");
    }

    #[test]
    fn draft_encodes_with_its_timestamp() {
        let d = Draft::new("Draft", "body", at_noon());
        assert!(d.encode().contains("date: 2026-10-16T12:00:00.000Z"));
    }
}
