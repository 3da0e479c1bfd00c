//! core::changelog::document
//!
//! Typed view of a markdown changelog.
//!
//! A document is a preamble (everything before the first `## ` heading)
//! followed by sections. Each section keeps its raw heading line and its
//! body lines, so serializing an untouched parse reproduces the input.
//!
//! # Invariants
//!
//! - Lines are split on `\n` only; a `\r` stays part of its line.
//! - Every serialized line ends with `\n`. A missing final newline is the
//!   one normalization applied; empty input serializes to empty output.
//! - Every line starting with `## ` opens a section, code fences included.
//! - At most one section is [`SectionKind::Unreleased`]. Parsing tolerates
//!   duplicates, but [`Changelog::unreleased_index`] reports them as
//!   malformed so no mutation proceeds on an ambiguous document.

use chrono::NaiveDate;

use super::ChangelogError;

const HEADING_PREFIX: &str = "## ";
const UNRELEASED_TITLE: &str = "[Unreleased]";

/// Classification of a section heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// `## [Unreleased]`
    Unreleased,
    /// A heading carrying an ISO date, e.g. `## 2024-01-01` or `## [1.2.0] - 2024-01-01`.
    Dated(NaiveDate),
    /// Any other level-two heading.
    Other,
}

impl SectionKind {
    /// Classify a heading title (the text after `## `).
    pub fn classify(title: &str) -> Self {
        let title = title.trim();
        if title == UNRELEASED_TITLE {
            return Self::Unreleased;
        }
        title
            .split(|c: char| !(c.is_ascii_digit() || c == '-'))
            .flat_map(|token| token.split("--"))
            .map(|token| token.trim_matches('-'))
            .filter(|token| token.len() == 10)
            .find_map(|token| NaiveDate::parse_from_str(token, "%Y-%m-%d").ok())
            .map_or(Self::Other, Self::Dated)
    }
}

/// A `## ` heading and the lines beneath it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    heading: String,
    kind: SectionKind,
    pub body: Vec<String>,
}

impl Section {
    /// Build a section from a raw heading line.
    pub fn from_heading(heading: impl Into<String>, body: Vec<String>) -> Self {
        let heading = heading.into();
        let kind = SectionKind::classify(heading.strip_prefix(HEADING_PREFIX).unwrap_or(&heading));
        Self {
            heading,
            kind,
            body,
        }
    }

    /// A fresh `## [Unreleased]` section.
    pub fn unreleased(body: Vec<String>) -> Self {
        Self::from_heading(format!("{HEADING_PREFIX}{UNRELEASED_TITLE}"), body)
    }

    /// A `## YYYY-MM-DD` section.
    pub fn dated(date: NaiveDate, body: Vec<String>) -> Self {
        Self::from_heading(format!("{HEADING_PREFIX}{}", date.format("%Y-%m-%d")), body)
    }

    pub fn heading(&self) -> &str {
        &self.heading
    }

    /// Heading text after the `## ` marker.
    pub fn title(&self) -> &str {
        self.heading
            .strip_prefix(HEADING_PREFIX)
            .unwrap_or(&self.heading)
    }

    pub fn kind(&self) -> SectionKind {
        self.kind
    }

    /// Append a line-ending suffix (`"\r"` in CRLF documents) to the heading.
    pub fn with_ending(mut self, ending: &str) -> Self {
        self.heading.push_str(ending);
        self
    }

    /// Whether the body has at least one non-blank line.
    pub fn has_content(&self) -> bool {
        self.body.iter().any(|line| !is_blank(line))
    }
}

/// A parsed changelog document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changelog {
    preamble: Vec<String>,
    sections: Vec<Section>,
}

impl Changelog {
    /// Parse a document. Parsing itself never fails; structural problems
    /// surface from the accessors that depend on them.
    pub fn parse(text: &str) -> Self {
        let mut doc = Self::default();

        for line in text.split_terminator('\n') {
            if line.starts_with(HEADING_PREFIX) {
                doc.sections.push(Section::from_heading(line, Vec::new()));
                continue;
            }

            match doc.sections.last_mut() {
                Some(section) => section.body.push(line.to_string()),
                None => doc.preamble.push(line.to_string()),
            }
        }

        doc
    }

    /// Render the document back to text.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        let lines = self.preamble.iter().chain(
            self.sections
                .iter()
                .flat_map(|s| std::iter::once(&s.heading).chain(s.body.iter())),
        );
        for line in lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// `"\r"` when the document's first line ends in CRLF, else `""`.
    /// New lines written into the document carry the same ending.
    pub fn line_ending(&self) -> &'static str {
        let first = self
            .preamble
            .first()
            .or_else(|| self.sections.first().map(|s| &s.heading));
        if first.is_some_and(|line| line.ends_with('\r')) {
            "\r"
        } else {
            ""
        }
    }

    pub fn preamble(&self) -> &[String] {
        &self.preamble
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn sections_mut(&mut self) -> &mut [Section] {
        &mut self.sections
    }

    /// Index of the Unreleased section, if any.
    ///
    /// # Errors
    ///
    /// [`ChangelogError::MalformedDocument`] if more than one exists.
    pub fn unreleased_index(&self) -> Result<Option<usize>, ChangelogError> {
        let mut found = self
            .sections
            .iter()
            .enumerate()
            .filter(|(_, s)| s.kind == SectionKind::Unreleased)
            .map(|(i, _)| i);

        let first = found.next();
        if found.next().is_some() {
            return Err(ChangelogError::MalformedDocument(
                "more than one [Unreleased] section".into(),
            ));
        }
        Ok(first)
    }

    /// The Unreleased section, if any.
    pub fn unreleased(&self) -> Result<Option<&Section>, ChangelogError> {
        Ok(self.unreleased_index()?.map(|i| &self.sections[i]))
    }

    /// Index of the first dated section.
    pub fn first_dated_index(&self) -> Option<usize> {
        self.sections
            .iter()
            .position(|s| matches!(s.kind, SectionKind::Dated(_)))
    }

    /// Dated sections in document order.
    pub fn dated_sections(&self) -> impl Iterator<Item = (NaiveDate, &Section)> {
        self.sections.iter().filter_map(|s| match s.kind {
            SectionKind::Dated(date) => Some((date, s)),
            _ => None,
        })
    }

    /// Insert a section at `index` (clamped to the end).
    pub fn insert_section(&mut self, index: usize, section: Section) -> usize {
        let index = index.min(self.sections.len());
        self.sections.insert(index, section);
        index
    }

    /// Replace the section at `index`, returning the old one.
    pub fn replace_section(&mut self, index: usize, section: Section) -> Section {
        std::mem::replace(&mut self.sections[index], section)
    }
}

impl std::fmt::Display for Changelog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.serialize())
    }
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}
