//! Section parsing for Gaussian input (.gjf) files.
//!
//! A .gjf file is a line-oriented format split into calculation sections by
//! `--LinkN--` separator lines. Each section carries at most one *directive
//! line* beginning with `#p`, which lists the calculation keywords for that
//! section:
//!
//! ```text
//! %chk=job.chk
//! #p opt freq b3lyp/6-31g* empiricaldispersion=gd3
//!
//! title
//!
//! 0 1
//! C 0.0 0.0 0.0
//! --Link1--
//! #p td=(nstates=50,root=1) b3lyp/6-31g*
//! ...
//! ```
//!
//! The parser splits raw lines into [`GjfSection`] models, locating and
//! decoding the directive line of each section. All non-directive lines are
//! carried verbatim (trailing newlines included) so that reassembling the
//! sections reproduces the original bytes. The mutators regenerate exactly
//! the one directive line and leave every other line untouched.

use crate::tokenizer;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

lazy_static! {
    static ref LINK_RE: Regex = Regex::new(r"^--Link(\d+)--$").unwrap();
    static ref DIRECTIVE_RE: Regex = Regex::new(r"^#p\s+(.+)$").unwrap();
    static ref OPT_RE: Regex = Regex::new(r"\bopt\b").unwrap();
    static ref TD_RE: Regex = Regex::new(r"\btd=\([^)]+\)").unwrap();
}

/// Error type for .gjf file access.
#[derive(Error, Debug)]
pub enum ParseError {
    /// I/O error when reading files or directories
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for parse operation results
type Result<T> = std::result::Result<T, ParseError>;

/// Classification of a directive line.
///
/// A directive containing a whole-word `opt` token classifies as `Opt`
/// even when a `td=(...)` fragment is also present; `opt` wins the tie.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionType {
    /// Geometry optimization directive (whole-word `opt` present)
    Opt,
    /// Excited-state directive (`td=(...)` fragment present)
    Td,
    /// Anything else
    Unknown,
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionType::Opt => write!(f, "opt"),
            SectionType::Td => write!(f, "td"),
            SectionType::Unknown => write!(f, "unknown"),
        }
    }
}

/// The decoded directive line of a section.
#[derive(Debug, Clone)]
pub struct KeywordSection {
    /// 1-based absolute line number of the directive in the file
    pub line_number: usize,
    /// Raw directive line, trimmed, kept for diff/preview
    pub original_line: String,
    /// Directive classification
    pub section_type: SectionType,
    /// Keyword names in line order, one entry per token; duplicates are
    /// preserved when the source line has them
    pub keywords: Vec<String>,
    /// Raw fragment text per keyword, for tokens that carried `=`; the
    /// whole token is stored (`td=(nstates=50,root=1)`,
    /// `empiricaldispersion=gd3`). Keywords without `=` have no entry.
    pub parameters: HashMap<String, String>,
}

/// One Link-bounded block of a .gjf file.
///
/// A section exclusively owns its `lines` buffer; mutation never touches
/// another section's buffer. Sections are created once per parse pass and
/// replaced wholesale on the next parse.
#[derive(Debug, Clone)]
pub struct GjfSection {
    /// 0-based section index in assignment order
    pub section_number: usize,
    /// 0-based start of the half-open line range in the original file
    pub start_line: usize,
    /// 0-based end (exclusive) of the line range
    pub end_line: usize,
    /// Decoded directive line, absent when the section has no `#p` line
    pub keyword_section: Option<KeywordSection>,
    /// Verbatim raw lines covering `[start_line, end_line)`, trailing
    /// newlines included
    pub lines: Vec<String>,
    /// True for every section except the first
    pub is_link_section: bool,
    /// The verbatim `--LinkN--` line that opened this section, when one
    /// did; kept so reassembly can reproduce the file byte for byte
    pub link_line: Option<String>,
}

/// Parses a .gjf file into its sections.
///
/// Reads the file and delegates to [`parse_lines`]. A missing or unreadable
/// file surfaces as [`ParseError::Io`]; the caller can recover by picking
/// another file.
pub fn parse_file(path: &Path) -> Result<Vec<GjfSection>> {
    let content = fs::read_to_string(path)?;
    let lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
    Ok(parse_lines(lines))
}

/// Splits raw lines into sections at `--LinkN--` boundaries.
///
/// A separator line closes the current section and opens the next one on
/// the following line; the separator itself belongs to no section's line
/// buffer but is retained as the opened section's `link_line`. A separator
/// whose section ends up with no lines at all (consecutive separators, or a
/// separator on the last line) still yields an empty section carrying it,
/// so reassembly stays byte exact. A file with no separators is exactly one
/// section.
pub fn parse_lines(lines: Vec<String>) -> Vec<GjfSection> {
    let mut sections = Vec::new();
    let mut current_start = 0usize;
    let mut section_number = 0usize;
    let mut opening_link: Option<String> = None;

    for (i, line) in lines.iter().enumerate() {
        if LINK_RE.is_match(line.trim()) {
            if current_start < i || opening_link.is_some() {
                let mut section = create_section(section_number, current_start, i, &lines);
                section.link_line = opening_link.take();
                sections.push(section);
                section_number += 1;
            }
            opening_link = Some(line.clone());
            current_start = i + 1;
        }
    }

    if current_start < lines.len() || opening_link.is_some() {
        let mut section = create_section(section_number, current_start, lines.len(), &lines);
        section.link_line = opening_link.take();
        sections.push(section);
    }

    if sections.is_empty() {
        sections.push(create_section(0, 0, lines.len(), &lines));
    }

    sections
}

fn create_section(section_number: usize, start: usize, end: usize, lines: &[String]) -> GjfSection {
    let section_lines: Vec<String> = lines[start..end].to_vec();
    let keyword_section = find_keyword_section(&section_lines, start);

    GjfSection {
        section_number,
        start_line: start,
        end_line: end,
        keyword_section,
        lines: section_lines,
        // The first section is the only one not opened by a Link separator.
        is_link_section: section_number > 0,
        link_line: None,
    }
}

/// Locates and decodes the first `#p` line within a section's lines.
fn find_keyword_section(lines: &[String], start_offset: usize) -> Option<KeywordSection> {
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        if let Some(captures) = DIRECTIVE_RE.captures(trimmed) {
            let body = captures.get(1).map(|m| m.as_str()).unwrap_or("");
            let line_number = start_offset + i + 1;

            let section_type = if OPT_RE.is_match(body) {
                SectionType::Opt
            } else if TD_RE.is_match(body) {
                SectionType::Td
            } else {
                SectionType::Unknown
            };

            let (keywords, parameters) = parse_directive_body(body);

            return Some(KeywordSection {
                line_number,
                original_line: trimmed.to_string(),
                section_type,
                keywords,
                parameters,
            });
        }
    }

    None
}

/// Extracts keyword names and raw fragment text from a directive body.
///
/// Tokens split on spaces at parenthesis depth zero. Any token carrying `=`
/// is stored whole under its name (the part before the first `=`); a bare
/// token contributes its name alone.
fn parse_directive_body(body: &str) -> (Vec<String>, HashMap<String, String>) {
    let mut keywords = Vec::new();
    let mut parameters = HashMap::new();

    for token in tokenizer::split_directive_tokens(body) {
        if token.contains('=') {
            let name = token.split('=').next().unwrap_or("").to_string();
            parameters.insert(name.clone(), token);
            keywords.push(name);
        } else {
            keywords.push(token);
        }
    }

    (keywords, parameters)
}

/// Rebuilds the directive line from a keyword list and patches it in place.
///
/// Keywords with a stored fragment in `parameters` emit that fragment
/// verbatim; everything else emits the bare name. Returns a clone of the
/// updated lines. Out-of-range offsets leave the buffer untouched.
fn regenerate_directive_line(section: &mut GjfSection, keywords: &[String]) -> Vec<String> {
    let ks = match &section.keyword_section {
        Some(ks) => ks,
        None => return section.lines.clone(),
    };

    let parts: Vec<String> = keywords
        .iter()
        .map(|kw| match ks.parameters.get(kw) {
            Some(fragment) => fragment.clone(),
            None => kw.clone(),
        })
        .collect();

    let new_line = format!("#p {}\n", parts.join(" "));

    let index = ks
        .line_number
        .wrapping_sub(section.start_line)
        .wrapping_sub(1);
    if index < section.lines.len() {
        section.lines[index] = new_line;
    }

    section.lines.clone()
}

/// Replaces a section's keyword list and resynchronizes its directive line.
///
/// The stored `keyword_section.keywords` is updated to the applied list and
/// the one directive line within `lines` is regenerated; all other lines
/// are untouched. This is an atomic model-and-text update: the returned
/// lines always match the stored section state. A section without a
/// directive line is returned unchanged.
pub fn update_keyword_section(section: &mut GjfSection, new_keywords: &[String]) -> Vec<String> {
    if section.keyword_section.is_none() {
        return section.lines.clone();
    }

    let updated = regenerate_directive_line(section, new_keywords);
    if let Some(ks) = &mut section.keyword_section {
        ks.keywords = new_keywords.to_vec();
    }
    updated
}

/// Rewrites one keyword's stored fragment and resynchronizes the directive.
///
/// The new fragment is written into `keyword_section.parameters` first,
/// then the directive line is regenerated over the existing keyword order.
/// Like [`update_keyword_section`], this is a two-step contract exposed as
/// one atomic operation; callers get back lines consistent with the mutated
/// section state.
pub fn update_keyword_parameter(
    section: &mut GjfSection,
    keyword_name: &str,
    new_fragment: &str,
) -> Vec<String> {
    let keywords = match &mut section.keyword_section {
        Some(ks) => {
            ks.parameters
                .insert(keyword_name.to_string(), new_fragment.to_string());
            ks.keywords.clone()
        }
        None => return section.lines.clone(),
    };

    regenerate_directive_line(section, &keywords)
}

/// Finds all .gjf files directly inside a directory (non-recursive).
///
/// Results are sorted by path for stable listings.
pub fn find_all_gjf_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "gjf") {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| format!("{}\n", l)).collect()
    }

    #[test]
    fn test_single_section_without_separators() {
        let sections = parse_lines(raw(&["#p opt freq", "", "title"]));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].start_line, 0);
        assert_eq!(sections[0].end_line, 3);
        assert!(!sections[0].is_link_section);
    }

    #[test]
    fn test_directive_decoding() {
        let sections = parse_lines(raw(&["#p opt td=(nstates=5) scf=tight"]));
        let ks = sections[0].keyword_section.as_ref().unwrap();
        assert_eq!(ks.line_number, 1);
        assert_eq!(ks.keywords, vec!["opt", "td", "scf"]);
        assert_eq!(
            ks.parameters.get("td").map(String::as_str),
            Some("td=(nstates=5)")
        );
        assert_eq!(
            ks.parameters.get("scf").map(String::as_str),
            Some("scf=tight")
        );
        assert!(!ks.parameters.contains_key("opt"));
    }

    #[test]
    fn test_opt_wins_type_tie() {
        let sections = parse_lines(raw(&["#p opt td=(nstates=5)"]));
        let ks = sections[0].keyword_section.as_ref().unwrap();
        assert_eq!(ks.section_type, SectionType::Opt);
    }

    #[test]
    fn test_section_without_directive_is_normal() {
        let sections = parse_lines(raw(&["just a title", "0 1"]));
        assert!(sections[0].keyword_section.is_none());
    }

    #[test]
    fn test_duplicate_keywords_preserved() {
        let sections = parse_lines(raw(&["#p opt opt freq"]));
        let ks = sections[0].keyword_section.as_ref().unwrap();
        assert_eq!(ks.keywords, vec!["opt", "opt", "freq"]);
    }

    #[test]
    fn test_update_without_directive_is_a_no_op() {
        let mut sections = parse_lines(raw(&["title only"]));
        let before = sections[0].lines.clone();
        let after = update_keyword_section(&mut sections[0], &["opt".to_string()]);
        assert_eq!(before, after);
    }
}
