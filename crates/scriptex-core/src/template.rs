//! Comment-aware placeholder scanning for script templates.
//!
//! A template is read left to right. At each position the first of these that
//! matches wins: a `//` line comment, a `/* */` block comment, or a `%token%`
//! placeholder. Comments are copied through untouched; only placeholders are
//! handed to the substitution callback, and whatever it returns is written
//! literally without being scanned again.
use std::sync::LazyLock;

use regex_lite::Regex;

pub const SENTINEL: char = '%';

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"//[^\n]*|/\*[\s\S]*?\*/|%[^%]+%").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Comment(&'a str),
    Placeholder(&'a str),
}

impl<'a> Segment<'a> {
    pub fn as_str(&self) -> &'a str {
        match self {
            Segment::Text(s) | Segment::Comment(s) | Segment::Placeholder(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateScanner;

impl TemplateScanner {
    pub fn new() -> Self {
        Self
    }

    /// Splits `template` into text, comment and placeholder segments whose
    /// concatenation is the original template.
    pub fn segments<'a>(&self, template: &'a str) -> Vec<Segment<'a>> {
        let mut segments = Vec::new();
        let mut last = 0;

        for m in TOKEN.find_iter(template) {
            if m.start() > last {
                segments.push(Segment::Text(&template[last..m.start()]));
            }

            let token = m.as_str();
            segments.push(if token.starts_with(SENTINEL) {
                Segment::Placeholder(token)
            } else {
                Segment::Comment(token)
            });
            last = m.end();
        }

        if last < template.len() {
            segments.push(Segment::Text(&template[last..]));
        }

        segments
    }

    /// Placeholders outside comments, in order of appearance.
    pub fn placeholders<'a>(&self, template: &'a str) -> Vec<&'a str> {
        self.segments(template)
            .into_iter()
            .filter_map(|segment| match segment {
                Segment::Placeholder(token) => Some(token),
                _ => None,
            })
            .collect()
    }

    /// Rewrites every eligible placeholder through `substitute`, stopping at the
    /// first error.
    pub fn scan<E>(
        &self,
        template: &str,
        mut substitute: impl FnMut(&str) -> Result<String, E>,
    ) -> Result<String, E> {
        let mut out = String::with_capacity(template.len());

        for segment in self.segments(template) {
            match segment {
                Segment::Placeholder(token) => out.push_str(&substitute(token)?),
                other => out.push_str(other.as_str()),
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    fn upper(token: &str) -> Result<String, Infallible> {
        Ok(token.trim_matches(SENTINEL).to_uppercase())
    }

    #[rstest]
    #[case::plain("return 1 + 1;", "return 1 + 1;")]
    #[case::placeholder("return '%name%';", "return 'NAME';")]
    #[case::line_comment("//%player_name%\nreturn 'a';", "//%player_name%\nreturn 'a';")]
    #[case::block_comment("/* %a% */ %b%", "/* %a% */ B")]
    #[case::multiline_block("/*\n%a%\n*/%b%", "/*\n%a%\n*/B")]
    #[case::unterminated_block("/* %a%", "/* A")]
    #[case::unmatched_sentinel("100% sure", "100% sure")]
    #[case::empty_interior("%%", "%%")]
    #[case::adjacent("%a%%b%", "AB")]
    #[case::comment_after_placeholder("%a% // %b%", "A // %b%")]
    fn test_scan(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(TemplateScanner::new().scan(template, upper).unwrap(), expected);
    }

    #[test]
    fn test_substitution_output_is_not_rescanned() {
        let out = TemplateScanner::new()
            .scan("%a% %b%", |token| {
                Ok::<_, Infallible>(match token {
                    "%a%" => "%b% /* // ".to_string(),
                    _ => "x".to_string(),
                })
            })
            .unwrap();
        assert_eq!(out, "%b% /* //  x");
    }

    #[test]
    fn test_each_placeholder_substituted_once_in_order() {
        let mut seen = Vec::new();
        TemplateScanner::new()
            .scan("%one% %two% /* %three% */ %one%", |token| {
                seen.push(token.to_string());
                Ok::<_, Infallible>(String::new())
            })
            .unwrap();
        assert_eq!(seen, vec!["%one%", "%two%", "%one%"]);
    }

    #[test]
    fn test_scan_stops_at_first_error() {
        let result = TemplateScanner::new().scan("%a% %b%", |token| {
            if token == "%a%" { Err(token.to_string()) } else { Ok(String::new()) }
        });
        assert_eq!(result, Err("%a%".to_string()));
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(
            TemplateScanner::new().placeholders("// %x%\nlet a = \"%y%\"; /* %z% */"),
            vec!["%y%"]
        );
    }

    proptest! {
        #[test]
        fn prop_block_comment_contents_survive(name in "[a-z_]{1,12}", prefix in "[a-z ;=]{0,12}") {
            let template = format!("{prefix}/* %{name}% */");
            let out = TemplateScanner::new()
                .scan(&template, |_| Ok::<_, Infallible>("SUBSTITUTED".to_string()))
                .unwrap();
            prop_assert_eq!(out, template);
        }

        #[test]
        fn prop_segments_reassemble(template in "[a-z %/*\n]{0,40}") {
            let joined = TemplateScanner::new()
                .segments(&template)
                .iter()
                .map(Segment::as_str)
                .collect::<String>();
            prop_assert_eq!(joined, template);
        }

        #[test]
        fn prop_replacement_is_literal(replacement in "[%/* a-z]{0,16}") {
            let out = TemplateScanner::new()
                .scan("%a%", |_| Ok::<_, Infallible>(replacement.clone()))
                .unwrap();
            prop_assert_eq!(out, replacement);
        }
    }
}
