//! Semantic markdown sectioning.
//!
//! [`parse`] is total: input is free-form prose, so anything that does not
//! match a stricter shape degrades to a [`SectionType::Paragraph`]. Dispatch
//! priority per line:
//!
//! 1. Header: line starts with `#`
//! 2. CodeBlock: ```` ``` ```` / `~~~` fence, through the matching closing
//!    fence or end of input
//! 3. HorizontalRule: only 3+ of one of `-`, `*`, `_` (spaces ignored)
//! 4. List: bullet or numbered item, plus further items, indented
//!    continuation lines and single blank lines
//! 5. Table: any line containing `|`, while `|` keeps appearing
//! 6. Blockquote: run of `>` lines
//! 7. Paragraph: until a blank line or a line that starts another section

use std::fmt;

use serde::{Deserialize, Serialize};

/// Structural kind of a [`Section`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Header,
    Paragraph,
    CodeBlock,
    List,
    Table,
    Blockquote,
    HorizontalRule,
}

impl SectionType {
    /// Title-cased display name ("Code Block", "Horizontal Rule", ...).
    pub fn display_name(&self) -> &'static str {
        match self {
            SectionType::Header => "Header",
            SectionType::Paragraph => "Paragraph",
            SectionType::CodeBlock => "Code Block",
            SectionType::List => "List",
            SectionType::Table => "Table",
            SectionType::Blockquote => "Blockquote",
            SectionType::HorizontalRule => "Horizontal Rule",
        }
    }
}

impl fmt::Display for SectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A parsed unit of document structure. Recomputed on every parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub section_type: SectionType,
    /// Raw source lines of the section joined with `\n`.
    pub content: String,
    /// 1-based, inclusive.
    pub line_start: usize,
    /// 1-based, inclusive.
    pub line_end: usize,
    /// Headers only: number of leading `#`, clamped to 1–6.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_level: Option<u8>,
    /// Headers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_text: Option<String>,
    /// Code blocks only: token after the opening fence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Section {
    fn new(section_type: SectionType, lines: &[&str], start: usize, end: usize) -> Self {
        Self {
            section_type,
            content: lines[start..end].join("\n"),
            line_start: start + 1,
            line_end: end,
            header_level: None,
            header_text: None,
            language: None,
        }
    }

    /// Matching equality: content only, never position.
    pub fn same_content(&self, other: &Section) -> bool {
        self.content == other.content
    }

    /// Number of source lines covered.
    pub fn line_count(&self) -> usize {
        self.line_end + 1 - self.line_start
    }
}

/// Split `content` into ordered sections. Never fails.
pub fn parse(content: &str) -> Vec<Section> {
    let lines: Vec<&str> = content.lines().collect();
    let mut sections = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        if is_blank(line) {
            i += 1;
            continue;
        }

        let (section, next) = if is_header(line) {
            parse_header(&lines, i)
        } else if let Some(fence) = Fence::open(line) {
            parse_code_block(&lines, i, &fence)
        } else if is_horizontal_rule(line) {
            (Section::new(SectionType::HorizontalRule, &lines, i, i + 1), i + 1)
        } else if is_list_item(line) {
            parse_list(&lines, i)
        } else if is_table_row(line) {
            parse_run(&lines, i, SectionType::Table, is_table_row)
        } else if is_blockquote(line) {
            parse_run(&lines, i, SectionType::Blockquote, is_blockquote)
        } else {
            parse_paragraph(&lines, i)
        };

        debug_assert!(next > i, "parser must always make progress");
        sections.push(section);
        i = next;
    }

    sections
}

// ---------------------------------------------------------------------------
// Block parsers: each returns the section and the index of the next line
// ---------------------------------------------------------------------------

fn parse_header(lines: &[&str], i: usize) -> (Section, usize) {
    let trimmed = lines[i].trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    let mut section = Section::new(SectionType::Header, lines, i, i + 1);
    section.header_level = Some(hashes.clamp(1, 6) as u8);
    section.header_text = Some(trimmed[hashes..].trim().to_string());
    (section, i + 1)
}

fn parse_code_block(lines: &[&str], i: usize, fence: &Fence) -> (Section, usize) {
    let end = lines[i + 1..]
        .iter()
        .position(|l| fence.closes(l))
        .map(|offset| i + 1 + offset + 1)
        .unwrap_or(lines.len());
    let mut section = Section::new(SectionType::CodeBlock, lines, i, end);
    section.language = fence.language.clone();
    (section, end)
}

fn parse_list(lines: &[&str], i: usize) -> (Section, usize) {
    let mut end = i + 1;
    while end < lines.len() {
        let line = lines[end];
        if is_list_item(line) || (!is_blank(line) && is_indented(line)) {
            end += 1;
        } else if is_blank(line) {
            // A single blank line is absorbed only when the list carries on after it.
            match lines.get(end + 1) {
                Some(next) if !is_blank(next) && (is_list_item(next) || is_indented(next)) => {
                    end += 2;
                }
                _ => break,
            }
        } else {
            break;
        }
    }
    (Section::new(SectionType::List, lines, i, end), end)
}

fn parse_run(
    lines: &[&str],
    i: usize,
    section_type: SectionType,
    belongs: fn(&str) -> bool,
) -> (Section, usize) {
    let end = lines[i + 1..]
        .iter()
        .position(|l| !belongs(l))
        .map(|offset| i + 1 + offset)
        .unwrap_or(lines.len());
    (Section::new(section_type, lines, i, end), end)
}

fn parse_paragraph(lines: &[&str], i: usize) -> (Section, usize) {
    let end = lines[i + 1..]
        .iter()
        .position(|l| is_blank(l) || starts_section(l))
        .map(|offset| i + 1 + offset)
        .unwrap_or(lines.len());
    (Section::new(SectionType::Paragraph, lines, i, end), end)
}

// ---------------------------------------------------------------------------
// Line classifiers
// ---------------------------------------------------------------------------

struct Fence {
    marker: char,
    len: usize,
    language: Option<String>,
}

impl Fence {
    fn open(line: &str) -> Option<Self> {
        let trimmed = line.trim_start();
        let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = trimmed.chars().take_while(|c| *c == marker).count();
        if len < 3 {
            return None;
        }
        let language = trimmed[len..]
            .split_whitespace()
            .next()
            .map(str::to_string);
        Some(Self {
            marker,
            len,
            language,
        })
    }

    fn closes(&self, line: &str) -> bool {
        let trimmed = line.trim();
        let run = trimmed.chars().take_while(|c| *c == self.marker).count();
        run >= self.len && run == trimmed.chars().count()
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_indented(line: &str) -> bool {
    line.starts_with(' ') || line.starts_with('\t')
}

fn is_header(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn is_horizontal_rule(line: &str) -> bool {
    let compact: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.first() {
        Some(first) if matches!(first, '-' | '*' | '_') => {
            compact.len() >= 3 && compact.iter().all(|c| c == first)
        }
        _ => false,
    }
}

fn is_list_item(line: &str) -> bool {
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();
    match chars.next() {
        Some('-' | '*' | '+') => matches!(chars.next(), Some(' ' | '\t')),
        Some(c) if c.is_ascii_digit() => {
            let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
            let mut rest = trimmed[digits..].chars();
            matches!(rest.next(), Some('.' | ')')) && matches!(rest.next(), Some(' ' | '\t'))
        }
        _ => false,
    }
}

fn is_table_row(line: &str) -> bool {
    line.contains('|')
}

fn is_blockquote(line: &str) -> bool {
    line.trim_start().starts_with('>')
}

fn starts_section(line: &str) -> bool {
    is_header(line)
        || Fence::open(line).is_some()
        || is_horizontal_rule(line)
        || is_list_item(line)
        || is_table_row(line)
        || is_blockquote(line)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn types(content: &str) -> Vec<SectionType> {
        parse(content).into_iter().map(|s| s.section_type).collect()
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n\t\n").is_empty());
    }

    #[test]
    fn header_then_paragraph() {
        let sections = parse("# A\n\nfoo");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_type, SectionType::Header);
        assert_eq!(sections[0].header_level, Some(1));
        assert_eq!(sections[0].header_text.as_deref(), Some("A"));
        assert_eq!((sections[0].line_start, sections[0].line_end), (1, 1));
        assert_eq!(sections[1].section_type, SectionType::Paragraph);
        assert_eq!(sections[1].content, "foo");
        assert_eq!((sections[1].line_start, sections[1].line_end), (3, 3));
    }

    #[rstest]
    #[case("# One", 1, "One")]
    #[case("### Three  ", 3, "Three")]
    #[case("####### Seven", 6, "Seven")]
    #[case("#NoSpace", 1, "NoSpace")]
    fn header_levels(#[case] line: &str, #[case] level: u8, #[case] text: &str) {
        let sections = parse(line);
        assert_eq!(sections[0].header_level, Some(level));
        assert_eq!(sections[0].header_text.as_deref(), Some(text));
    }

    #[test]
    fn code_block_captures_language_and_fences() {
        let src = "```rust\nfn main() {}\n\n# not a header\n```\nafter";
        let sections = parse(src);
        assert_eq!(sections[0].section_type, SectionType::CodeBlock);
        assert_eq!(sections[0].language.as_deref(), Some("rust"));
        assert_eq!((sections[0].line_start, sections[0].line_end), (1, 5));
        assert!(sections[0].content.contains("# not a header"));
        assert_eq!(sections[1].section_type, SectionType::Paragraph);
        assert_eq!(sections[1].content, "after");
    }

    #[test]
    fn unclosed_fence_runs_to_end_of_input() {
        let sections = parse("~~~\nline one\nline two");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].section_type, SectionType::CodeBlock);
        assert_eq!(sections[0].language, None);
        assert_eq!(sections[0].line_end, 3);
    }

    #[test]
    fn shorter_fence_does_not_close_longer_one() {
        let sections = parse("````md\n```\ninner\n```\n````");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].line_end, 5);
    }

    #[rstest]
    #[case("---")]
    #[case("***")]
    #[case("___")]
    #[case("- - -")]
    #[case("-----")]
    fn horizontal_rules(#[case] line: &str) {
        assert_eq!(types(line), vec![SectionType::HorizontalRule]);
    }

    #[test]
    fn mixed_rule_characters_are_not_a_rule() {
        assert_eq!(types("-*-"), vec![SectionType::Paragraph]);
    }

    #[test]
    fn list_absorbs_items_continuations_and_single_blanks() {
        let src = "- one\n  continued\n- two\n\n- three\n\n\n- four";
        let sections = parse(src);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].section_type, SectionType::List);
        assert_eq!((sections[0].line_start, sections[0].line_end), (1, 5));
        assert_eq!(sections[1].section_type, SectionType::List);
        assert_eq!(sections[1].line_start, 8);
    }

    #[test]
    fn numbered_list_ends_at_plain_line() {
        let sections = parse("1. first\n2) second\nplain text");
        assert_eq!(sections[0].section_type, SectionType::List);
        assert_eq!(sections[0].line_end, 2);
        assert_eq!(sections[1].section_type, SectionType::Paragraph);
    }

    #[test]
    fn table_continues_while_pipes_present() {
        let src = "| a | b |\n|---|---|\n| 1 | 2 |\nnot a row";
        let sections = parse(src);
        assert_eq!(sections[0].section_type, SectionType::Table);
        assert_eq!(sections[0].line_end, 3);
        assert_eq!(sections[1].section_type, SectionType::Paragraph);
    }

    #[test]
    fn blockquote_run() {
        let sections = parse("> quoted\n> more\nplain");
        assert_eq!(sections[0].section_type, SectionType::Blockquote);
        assert_eq!(sections[0].content, "> quoted\n> more");
        assert_eq!(sections[1].section_type, SectionType::Paragraph);
    }

    #[test]
    fn paragraph_stops_at_next_special_line() {
        let sections = parse("some words\nmore words\n# Next");
        assert_eq!(types("some words\nmore words\n# Next"), vec![
            SectionType::Paragraph,
            SectionType::Header
        ]);
        assert_eq!(sections[0].content, "some words\nmore words");
    }

    #[test]
    fn dispatch_priority_prefers_table_over_blockquote() {
        assert_eq!(types("> a | b"), vec![SectionType::Table]);
    }

    #[test]
    fn malformed_markup_degrades_to_paragraph() {
        assert_eq!(types("-not a list\n1.nope\n>"), vec![
            SectionType::Paragraph,
            SectionType::Blockquote
        ]);
    }

    #[test]
    fn crlf_input_is_split_on_lines() {
        let sections = parse("# T\r\n\r\nbody\r\n");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].header_text.as_deref(), Some("T"));
        assert_eq!(sections[1].content, "body");
    }

    #[test]
    fn line_ranges_are_ordered() {
        let src = "# H\n\npara\n\n- a\n- b\n\n```\ncode\n```\n\n| x |\n\n> q\n\n---";
        let sections = parse(src);
        assert_eq!(sections.len(), 7);
        for pair in sections.windows(2) {
            assert!(pair[0].line_end < pair[1].line_start);
        }
        for s in &sections {
            assert!(s.line_start <= s.line_end);
        }
    }
}
