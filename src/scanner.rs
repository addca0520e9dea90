//! Scanner for `{{expr}}` and `{{{expr}}}` tags in template text

use std::ops::Range;

const OPEN: &str = "{{";
const OPEN_RAW: &str = "{{{";
const CLOSE: &str = "}}";
const CLOSE_RAW: &str = "}}}";

/// A tag found in a template, delimiters included
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagSpan<'a> {
    /// Byte offset of the first opening brace
    pub start: usize,
    /// Byte length including both delimiters
    pub len: usize,
    /// The literal tag text, e.g. `{{ user.name }}`
    pub raw: &'a str,
    /// `{{{ }}}` tag whose value is substituted without escaping
    pub triple: bool,
}

impl<'a> TagSpan<'a> {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    fn delimiter_len(&self) -> usize {
        if self.triple {
            OPEN_RAW.len()
        } else {
            OPEN.len()
        }
    }

    /// The text between the delimiters
    pub fn expression(&self) -> &'a str {
        let d = self.delimiter_len();
        &self.raw[d..self.raw.len() - d]
    }

    /// Byte offset of [`TagSpan::expression`] within the template
    pub fn expression_start(&self) -> usize {
        self.start + self.delimiter_len()
    }
}

/// Lazy left-to-right tag iterator returned by [`scan_expressions`]
///
/// Spans come out in document order and never overlap. An opening
/// delimiter without a matching close ends the scan.
#[derive(Debug)]
pub struct TagScanner<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Iterator for TagScanner<'a> {
    type Item = TagSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.source.get(self.pos..)?;
        let start = self.pos + rest.find(OPEN)?;
        let triple = self.source[start..].starts_with(OPEN_RAW);
        let (open, close) = if triple {
            (OPEN_RAW, CLOSE_RAW)
        } else {
            (OPEN, CLOSE)
        };

        let body_start = start + open.len();
        let Some(close_at) = self.source[body_start..].find(close) else {
            self.pos = self.source.len();
            return None;
        };
        let end = body_start + close_at + close.len();
        self.pos = end;

        Some(TagSpan {
            start,
            len: end - start,
            raw: &self.source[start..end],
            triple,
        })
    }
}

impl std::iter::FusedIterator for TagScanner<'_> {}

/// Scan `template` for tags
///
/// # Example
///
/// ```rust
/// use template_binder::scan_expressions;
///
/// let tags: Vec<_> = scan_expressions("Hi {{name}}, {{{bio}}}").collect();
/// assert_eq!(tags.len(), 2);
/// assert_eq!(tags[0].expression(), "name");
/// assert!(tags[1].triple);
/// ```
pub fn scan_expressions(template: &str) -> TagScanner<'_> {
    TagScanner {
        source: template,
        pos: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(input: &str) -> Vec<(usize, usize, &str, bool)> {
        scan_expressions(input)
            .map(|t| (t.start, t.len, t.raw, t.triple))
            .collect()
    }

    #[test]
    fn test_no_tags() {
        assert!(scan("").is_empty());
        assert!(scan("plain text { with } braces").is_empty());
        assert!(scan("{text}").is_empty());
    }

    #[test]
    fn test_double_and_triple() {
        assert_eq!(
            scan("a {{x}} b {{{y}}}"),
            vec![(2, 5, "{{x}}", false), (10, 7, "{{{y}}}", true)]
        );
    }

    #[test]
    fn test_triple_is_one_tag() {
        let tags: Vec<_> = scan_expressions("{{{fallback(x, 'd')}}}").collect();
        assert_eq!(tags.len(), 1);
        assert!(tags[0].triple);
        assert_eq!(tags[0].expression(), "fallback(x, 'd')");
        assert_eq!(tags[0].expression_start(), 3);
    }

    #[test]
    fn test_adjacent_tags() {
        assert_eq!(
            scan("{{a}}{{b}}"),
            vec![(0, 5, "{{a}}", false), (5, 5, "{{b}}", false)]
        );
    }

    #[test]
    fn test_empty_expression() {
        let tags: Vec<_> = scan_expressions("{{}}").collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].expression(), "");
    }

    #[test]
    fn test_unterminated_tag_is_ignored() {
        assert_eq!(scan("{{a}} and {{b"), vec![(0, 5, "{{a}}", false)]);
        assert!(scan("{{{a}}").is_empty());
    }

    #[test]
    fn test_offsets_are_bytes() {
        let input = "héllo {{name}}";
        let tags: Vec<_> = scan_expressions(input).collect();
        assert_eq!(&input[tags[0].range()], "{{name}}");
    }

    #[test]
    fn test_object_literal_inside_tag() {
        let tags: Vec<_> = scan_expressions("{{ {a: 1}.a }}").collect();
        assert_eq!(tags[0].expression(), " {a: 1}.a ");
    }
}
