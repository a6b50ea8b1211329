//! GitLab Markdown to JIRA Wiki markup conversion
//!
//! Descriptions and comments are rewritten line by line with a fixed,
//! ordered set of substitutions. This is not a Markdown parser: anything the
//! rewrites don't recognise passes through untouched.

use regex::{Captures, Regex};
use std::sync::OnceLock;

/// Options controlling how free-text fields are converted
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkupOptions {
    /// Keep the Markdown as-is instead of converting it to Wiki markup
    pub preserve_markdown: bool,
    /// Prefix relative `/uploads/...` links with this URL so attachments
    /// still resolve from JIRA while GitLab stays online
    pub asset_root: Option<String>,
}

/// Converts GitLab Markdown text fields into JIRA Wiki markup
#[derive(Debug, Clone)]
pub struct MarkupConverter {
    options: MarkupOptions,
}

struct Patterns {
    code_open: Regex,
    code_close: Regex,
    link: Regex,
    mention: Regex,
    upload: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        code_open: Regex::new(r"```([a-z]+)$").unwrap(),
        code_close: Regex::new(r"```$").unwrap(),
        link: Regex::new(r"\[([^\]]+)\]\(([^\)]+)\)").unwrap(),
        mention: Regex::new(r"@([a-zA-Z0-9]+)(\b|_$)").unwrap(),
        upload: Regex::new(r"\]\((/uploads/[a-z0-9]+/)").unwrap(),
    })
}

impl MarkupConverter {
    pub fn new(options: MarkupOptions) -> Self {
        Self { options }
    }

    /// Convert a nullable text field.
    ///
    /// Every output line ends with `\n`; a missing field becomes a single
    /// empty line, while an empty string stays empty.
    pub fn convert(&self, text: Option<&str>) -> String {
        let Some(text) = text else {
            return "\n".to_string();
        };

        let mut output = String::with_capacity(text.len() + 1);
        for line in split_lines(text) {
            let mut line = if self.options.preserve_markdown {
                line.to_string()
            } else {
                markdown_to_wiki(line)
            };
            if let Some(root) = &self.options.asset_root {
                line = absolutize_uploads(&line, root);
            }
            output.push_str(&line);
            output.push('\n');
        }

        output
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

/// Split text into lines at any line boundary (`\r\n`, lone `\r`, form
/// feeds, Unicode separators, ...). A trailing boundary does not start an
/// extra empty line, and empty text has no lines.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_line_break(c) {
            continue;
        }
        lines.push(&text[start..i]);
        start = i + c.len_utf8();
        if c == '\r' {
            if let Some(&(j, '\n')) = chars.peek() {
                chars.next();
                start = j + 1;
            }
        }
    }

    if start < text.len() {
        lines.push(&text[start..]);
    }

    lines
}

/// Apply the Markdown to Wiki rewrites to a single line, in order.
pub fn markdown_to_wiki(line: &str) -> String {
    let p = patterns();

    let line = p.code_open.replace(line, "{code:${1}}");
    let line = p.code_close.replace(&line, "{code}");
    let line = line.replace(":+1:", "(y)").replace(":-1:", "(n)");
    let line = p.link.replace_all(&line, "[${1}|${2}]");
    let line = p.mention.replace_all(&line, "[~${1}]${2}");

    line.into_owned()
}

/// Rewrite `](/uploads/<hash>/` link targets to absolute URLs under `root`.
pub fn absolutize_uploads(line: &str, root: &str) -> String {
    patterns()
        .upload
        .replace_all(line, |caps: &Captures| format!("]({root}{}", &caps[1]))
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wiki() -> MarkupConverter {
        MarkupConverter::new(MarkupOptions::default())
    }

    fn preserving() -> MarkupConverter {
        MarkupConverter::new(MarkupOptions {
            preserve_markdown: true,
            asset_root: None,
        })
    }

    #[test]
    fn test_missing_text_is_single_empty_line() {
        assert_eq!(wiki().convert(None), "\n");
        assert_eq!(preserving().convert(None), "\n");
    }

    #[test]
    fn test_emoji_and_mentions() {
        assert_eq!(wiki().convert(Some("Hello :+1: @bob")), "Hello (y) [~bob]\n");
        assert_eq!(wiki().convert(Some(":-1: from @alice, sorry")), "(n) from [~alice], sorry\n");
    }

    #[test]
    fn test_hyperlinks() {
        assert_eq!(wiki().convert(Some("See [docs](http://x)")), "See [docs|http://x]\n");
        assert_eq!(
            wiki().convert(Some("[a](http://a) and [b](http://b)")),
            "[a|http://a] and [b|http://b]\n"
        );
    }

    #[test]
    fn test_code_fences() {
        let input = "Example:\n```rust\nfn main() {}\n```";

        let output = wiki().convert(Some(input));

        assert_eq!(output, "Example:\n{code:rust}\nfn main() {}\n{code}\n");
    }

    #[test]
    fn test_code_fence_language_must_be_lowercase_letters() {
        // Only the trailing backticks are rewritten as a bare closer.
        assert_eq!(wiki().convert(Some("```Rust")), "```Rust\n");
        assert_eq!(wiki().convert(Some("  ```")), "  {code}\n");
    }

    #[test]
    fn test_mention_followed_by_underscore_at_end() {
        assert_eq!(wiki().convert(Some("ping @dev_")), "ping [~dev]_\n");
    }

    #[test]
    fn test_mention_preserves_following_punctuation() {
        assert_eq!(wiki().convert(Some("thanks @carol!")), "thanks [~carol]!\n");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let text = "Nothing to see here\nSecond line";

        assert_eq!(wiki().convert(Some(text)), "Nothing to see here\nSecond line\n");
    }

    #[test]
    fn test_empty_text_stays_empty() {
        assert_eq!(wiki().convert(Some("")), "");
        assert_eq!(preserving().convert(Some("")), "");
    }

    #[test]
    fn test_crlf_line_endings_are_normalized() {
        assert_eq!(wiki().convert(Some("one\r\ntwo")), "one\ntwo\n");
    }

    #[test]
    fn test_lone_carriage_return_splits_lines() {
        assert_eq!(wiki().convert(Some("one\r```\rtwo")), "one\n{code}\ntwo\n");
    }

    #[test]
    fn test_split_lines_boundaries() {
        assert_eq!(split_lines(""), Vec::<&str>::new());
        assert_eq!(split_lines("a\n"), vec!["a"]);
        assert_eq!(split_lines("a\n\nb"), vec!["a", "", "b"]);
        assert_eq!(split_lines("a\r\n\rb"), vec!["a", "", "b"]);
        assert_eq!(
            split_lines("a\x0bb\x0cc\u{1e}d\u{85}e\u{2028}f\u{2029}"),
            vec!["a", "b", "c", "d", "e", "f"]
        );
    }

    #[test]
    fn test_preserve_markdown_leaves_text_unchanged() {
        let text = "Hello :+1: @bob\nSee [docs](http://x)\n";

        assert_eq!(preserving().convert(Some(text)), text);
    }

    #[test]
    fn test_preserve_markdown_is_idempotent() {
        let converter = preserving();
        let once = converter.convert(Some("line one\n```rust\nline two"));

        assert_eq!(converter.convert(Some(&once)), once);
    }

    #[test]
    fn test_converted_wiki_markup_is_stable() {
        let converter = wiki();
        let once = converter.convert(Some("Hello :+1: @bob\nSee [docs](http://x)"));

        assert_eq!(converter.convert(Some(&once)), once);
    }

    #[test]
    fn test_uploads_made_absolute() {
        let converter = MarkupConverter::new(MarkupOptions {
            preserve_markdown: false,
            asset_root: Some("https://gitlab.example.com/group/app".to_string()),
        });

        let output = converter.convert(Some("![shot](/uploads/abc123/screen.png)"));

        // The link rewrite runs first, so the upload target is inside a Wiki link
        // and no longer preceded by "](".
        assert_eq!(output, "![shot|/uploads/abc123/screen.png]\n");
    }

    #[test]
    fn test_uploads_made_absolute_when_preserving_markdown() {
        let converter = MarkupConverter::new(MarkupOptions {
            preserve_markdown: true,
            asset_root: Some("https://gitlab.example.com/group/app".to_string()),
        });

        let output = converter.convert(Some("![shot](/uploads/abc123/screen.png)"));

        assert_eq!(
            output,
            "![shot](https://gitlab.example.com/group/app/uploads/abc123/screen.png)\n"
        );
    }

    #[test]
    fn test_absolutize_uploads_does_not_expand_dollar_signs() {
        let output = absolutize_uploads("[f](/uploads/ff00/a.txt)", "https://h/$1");

        assert_eq!(output, "[f](https://h/$1/uploads/ff00/a.txt)");
    }

    #[test]
    fn test_absolutize_uploads_ignores_other_paths() {
        let line = "[f](/files/ff00/a.txt)";

        assert_eq!(absolutize_uploads(line, "https://h"), line);
    }
}
