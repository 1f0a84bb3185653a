//! Human-readable dumps of a decoded form.
//!
//! The `inspect` format mirrors what a REPL inspector prints for a nested
//! object: strings in single quotes (double quotes or backticks when the
//! text itself holds a single quote), bare keys where they are identifiers,
//! `[Object]` / `[Array]` once the depth limit is reached, and line breaks
//! only when a container does not fit on one line.

use std::fmt::Write as _;

use serde::Deserialize;

use crate::form::{ParsedForm, UploadedFile};

/// Containers whose one-line form is wider than this are broken up.
const BREAK_WIDTH: usize = 72;

/// Output style for [`render`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RenderFormat {
    /// Depth-limited, wrapped like a REPL inspector.
    #[default]
    Inspect,
    /// Depth-limited, always one line.
    Compact,
    /// Pretty-printed JSON, never truncated.
    Json,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RenderOptions {
    pub format: RenderFormat,
    /// Nesting level past which containers are elided. The outer
    /// `{ fields, files }` object is level 0.
    pub depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self { format: RenderFormat::Inspect, depth: 3 }
    }
}

/// Renders `{ fields, files }` for `form`.
pub fn render(form: &ParsedForm, options: &RenderOptions) -> String {
    match options.format {
        RenderFormat::Json => serde_json::to_string_pretty(form)
            .unwrap_or_else(|e| format!("<form not representable as JSON: {e}>")),
        RenderFormat::Inspect => Node::from(form).inspect(0, options.depth, true),
        RenderFormat::Compact => Node::from(form).inspect(0, options.depth, false),
    }
}

// ── Intermediate tree ─────────────────────────────────────────────────────────

enum Node {
    Str(String),
    Num(u64),
    Null,
    List(Vec<Node>),
    Map(Vec<(String, Node)>),
}

impl From<&ParsedForm> for Node {
    fn from(form: &ParsedForm) -> Self {
        let fields = form.fields.iter()
            .map(|(name, values)| {
                (name.clone(), Node::List(values.iter().cloned().map(Node::Str).collect()))
            })
            .collect();
        let files = form.files.iter()
            .map(|(name, files)| (name.clone(), Node::List(files.iter().map(Node::from).collect())))
            .collect();

        Node::Map(vec![
            ("fields".to_owned(), Node::Map(fields)),
            ("files".to_owned(), Node::Map(files)),
        ])
    }
}

impl From<&UploadedFile> for Node {
    fn from(file: &UploadedFile) -> Self {
        let headers = file.headers.iter()
            .map(|(k, v)| (k.clone(), Node::Str(v.clone())))
            .collect();

        Node::Map(vec![
            ("field_name".to_owned(), Node::Str(file.field_name.clone())),
            ("original_filename".to_owned(), Node::Str(file.original_filename.clone())),
            ("path".to_owned(), Node::Str(file.path.display().to_string())),
            ("size".to_owned(), Node::Num(file.size)),
            ("content_type".to_owned(), file.content_type.clone().map_or(Node::Null, Node::Str)),
            ("headers".to_owned(), Node::Map(headers)),
        ])
    }
}

impl Node {
    fn inspect(&self, level: usize, depth: usize, wrap: bool) -> String {
        match self {
            Node::Str(s) => quote(s),
            Node::Num(n) => n.to_string(),
            Node::Null => "null".to_owned(),
            Node::List(items) if items.is_empty() => "[]".to_owned(),
            Node::Map(entries) if entries.is_empty() => "{}".to_owned(),
            Node::List(_) if level > depth => "[Array]".to_owned(),
            Node::Map(_) if level > depth => "[Object]".to_owned(),
            Node::List(items) => {
                let parts = items.iter()
                    .map(|n| n.inspect(level + 1, depth, wrap))
                    .collect();
                group('[', ']', parts, level, wrap)
            }
            Node::Map(entries) => {
                let parts = entries.iter()
                    .map(|(k, n)| format!("{}: {}", key(k), n.inspect(level + 1, depth, wrap)))
                    .collect();
                group('{', '}', parts, level, wrap)
            }
        }
    }
}

/// Joins rendered children on one line if they fit, otherwise one per line.
fn group(open: char, close: char, parts: Vec<String>, level: usize, wrap: bool) -> String {
    let single = format!("{open} {} {close}", parts.join(", "));
    let fits = single.chars().count() + level * 2 <= BREAK_WIDTH && !single.contains('\n');
    if !wrap || fits {
        return single;
    }

    let mut out = String::new();
    out.push(open);
    for (i, part) in parts.iter().enumerate() {
        out.push_str("\n  ");
        out.push_str(&part.replace('\n', "\n  "));
        if i + 1 < parts.len() {
            out.push(',');
        }
    }
    out.push('\n');
    out.push(close);
    out
}

fn key(k: &str) -> String {
    let mut chars = k.chars();
    let is_ident = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_ident { k.to_owned() } else { quote(k) }
}

/// Picks the first delimiter the text does not contain, falling back to an
/// escaped single quote.
fn quote(s: &str) -> String {
    let delim = if !s.contains('\'') {
        '\''
    } else if !s.contains('"') {
        '"'
    } else if !s.contains('`') && !s.contains("${") {
        '`'
    } else {
        '\''
    };

    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c.is_control() => { let _ = write!(out, "\\x{:02X}", c as u32); }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> ParsedForm {
        let mut form = ParsedForm::default();
        for (name, value) in fields {
            form.fields.entry(name.to_string()).or_default().push(value.to_string());
        }
        form
    }

    fn upload(size: u64) -> UploadedFile {
        UploadedFile {
            field_name: "doc".into(),
            original_filename: "report.pdf".into(),
            path: "/tmp/formecho-abc.pdf".into(),
            size,
            content_type: Some("application/pdf".into()),
            headers: [("content-type".to_owned(), "application/pdf".to_owned())].into(),
            temp: None,
        }
    }

    #[test]
    fn empty_form_renders_two_empty_maps() {
        let out = render(&ParsedForm::default(), &RenderOptions::default());
        assert_eq!(out, "{ fields: {}, files: {} }");
    }

    #[test]
    fn short_forms_stay_on_one_line() {
        let out = render(&form(&[("a", "1"), ("b", "2")]), &RenderOptions::default());
        assert_eq!(out, "{ fields: { a: [ '1' ], b: [ '2' ] }, files: {} }");
    }

    #[test]
    fn long_forms_break_with_indentation() {
        let long = "x".repeat(70);
        let out = render(&form(&[("comment", long.as_str())]), &RenderOptions::default());
        let expected = format!("{{\n  fields: {{\n    comment: [\n      '{long}'\n    ]\n  }},\n  files: {{}}\n}}");
        assert_eq!(out, expected);
    }

    #[test]
    fn compact_never_breaks() {
        let long = "x".repeat(200);
        let opts = RenderOptions { format: RenderFormat::Compact, ..RenderOptions::default() };
        let out = render(&form(&[("comment", long.as_str())]), &opts);
        assert!(!out.contains('\n'));
    }

    #[test]
    fn file_metadata_is_rendered_and_nested_headers_are_elided() {
        let mut f = ParsedForm::default();
        f.files.insert("doc".into(), vec![upload(1234)]);
        let out = render(&f, &RenderOptions::default());

        assert!(out.contains("original_filename: 'report.pdf'"));
        assert!(out.contains("size: 1234"));
        assert!(out.contains("content_type: 'application/pdf'"));
        assert!(out.contains("headers: [Object]"));
        assert!(out.contains("fields: {}"));
    }

    #[test]
    fn deeper_limit_shows_headers() {
        let mut f = ParsedForm::default();
        f.files.insert("doc".into(), vec![upload(1)]);
        let opts = RenderOptions { depth: 4, ..RenderOptions::default() };
        let out = render(&f, &opts);
        assert!(out.contains("'content-type': 'application/pdf'"));
    }

    #[test]
    fn zero_depth_elides_everything_below_the_root() {
        let opts = RenderOptions { depth: 0, ..RenderOptions::default() };
        let out = render(&form(&[("a", "1")]), &opts);
        assert_eq!(out, "{ fields: [Object], files: {} }");
    }

    #[test]
    fn strings_are_escaped() {
        let out = render(&form(&[("q", "a\tb \\ c\u{1b}")]), &RenderOptions::default());
        assert!(out.contains(r"'a\tb \\ c\x1B'"), "{out}");
    }

    #[test]
    fn quote_style_follows_the_content() {
        assert_eq!(quote("plain"), "'plain'");
        assert_eq!(quote("it's\nfine"), r#""it's\nfine""#);
        assert_eq!(quote(r#"it's "quoted""#), r#"`it's "quoted"`"#);
        assert_eq!(quote(r#"it's "all" `three`"#), r#"'it\'s "all" `three`'"#);
        assert_eq!(quote("it's \"${x}\""), r#"'it\'s "${x}"'"#);
    }

    #[test]
    fn width_counts_characters_not_bytes() {
        let accented = "é".repeat(60);
        let out = render(&form(&[("comment", accented.as_str())]), &RenderOptions::default());
        assert!(out.contains(&format!("[ '{accented}' ]")), "{out}");
    }

    #[test]
    fn json_format_is_parseable() {
        let opts = RenderOptions { format: RenderFormat::Json, ..RenderOptions::default() };
        let out = render(&form(&[("name", "Ada")]), &opts);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["fields"]["name"][0], "Ada");
        assert!(value["files"].as_object().unwrap().is_empty());
    }

    #[test]
    fn rendering_is_deterministic() {
        let f = form(&[("a", "1"), ("a", "2"), ("b", "3")]);
        assert_eq!(render(&f, &RenderOptions::default()), render(&f, &RenderOptions::default()));
    }
}
