//! core::changelog::mutator
//!
//! The two document transformations driven by webhook deliveries.
//!
//! Both functions take the full document text and return the full new text.
//! They never read or write files; see `core::ops::transaction` for the
//! locked file wrapper and `engine::pipeline` for the git-backed one.

use chrono::NaiveDate;

use super::document::{is_blank, Changelog, Section};
use super::ChangelogError;

/// The local calendar date used when a release date is not supplied.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Add an entry to the top of the Unreleased section.
///
/// When the document has no Unreleased section one is created directly
/// above the first dated section, or at the end of the document when there
/// is none. The entry lands on the first non-blank line of the section body
/// (the top of the body when it is all blank) and is followed by exactly one
/// blank separator unless a blank line already follows it. No existing line
/// is removed or altered. Added lines take the document's line ending.
///
/// # Errors
///
/// - [`ChangelogError::EmptyEntry`] if `entry` has no non-blank lines
/// - [`ChangelogError::MalformedDocument`] if the document has several Unreleased sections
pub fn insert_entry(text: &str, entry: &str) -> Result<String, ChangelogError> {
    let entry = entry_lines(entry)?;
    let mut doc = Changelog::parse(text);
    let eol = doc.line_ending();

    let index = match doc.unreleased_index()? {
        Some(index) => index,
        None => {
            let at = doc.first_dated_index().unwrap_or(doc.sections().len());
            doc.insert_section(at, Section::unreleased(Vec::new()).with_ending(eol))
        }
    };

    let body = &mut doc.sections_mut()[index].body;
    let at = body.iter().position(|line| !is_blank(line)).unwrap_or(0);
    let separated = body.get(at).is_some_and(|line| is_blank(line));

    let mut inserted: Vec<String> = entry.into_iter().map(|line| line + eol).collect();
    if !separated {
        inserted.push(eol.to_string());
    }
    body.splice(at..at, inserted);

    Ok(doc.serialize())
}

/// Stamp the Unreleased section with `date` and open a fresh one after it.
///
/// Returns `text` unchanged when there is no Unreleased section. Calling it
/// twice on the same day produces a second, empty dated section; callers
/// that need idempotency check [`has_pending_entries`] first.
///
/// # Errors
///
/// [`ChangelogError::MalformedDocument`] if the document has several Unreleased sections.
pub fn release(text: &str, date: NaiveDate) -> Result<String, ChangelogError> {
    let mut doc = Changelog::parse(text);
    let Some(index) = doc.unreleased_index()? else {
        return Ok(text.to_string());
    };
    let eol = doc.line_ending();

    let mut body = std::mem::take(&mut doc.sections_mut()[index].body);
    if body.last().map_or(true, |line| !is_blank(line)) {
        body.push(eol.to_string());
    }

    doc.replace_section(index, Section::dated(date, body).with_ending(eol));
    doc.insert_section(
        index + 1,
        Section::unreleased(vec![eol.to_string()]).with_ending(eol),
    );

    Ok(doc.serialize())
}

/// Whether the Unreleased section exists and has any non-blank content.
pub fn has_pending_entries(text: &str) -> Result<bool, ChangelogError> {
    let doc = Changelog::parse(text);
    Ok(doc.unreleased()?.is_some_and(Section::has_content))
}

fn entry_lines(entry: &str) -> Result<Vec<String>, ChangelogError> {
    let lines: Vec<&str> = entry.lines().collect();
    let start = lines
        .iter()
        .position(|l| !is_blank(l))
        .ok_or(ChangelogError::EmptyEntry)?;
    let end = lines
        .iter()
        .rposition(|l| !is_blank(l))
        .ok_or(ChangelogError::EmptyEntry)?;
    Ok(lines[start..=end].iter().map(|l| l.to_string()).collect())
}
