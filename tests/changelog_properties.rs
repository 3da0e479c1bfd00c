//! Property-based tests for the changelog transformations.
//!
//! Documents are generated as well-formed markdown: a preamble, at most one
//! Unreleased section, dated sections and a few free-form ones. Bodies may
//! carry unbalanced code fences.

use chrono::NaiveDate;
use proptest::prelude::*;

use doctrace::core::changelog::{
    has_pending_entries, insert_entry, release, Changelog, Section, SectionKind,
};

fn body_line() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z]{1,12}( [a-z]{1,8}){0,3}".prop_map(|s| format!("- {s}")),
        1 => "[a-z]{1,10}".prop_map(|s| format!("  {s}")),
        1 => "[A-Z][a-z]{1,8}".prop_map(|s| format!("### {s}")),
        1 => prop_oneof![Just("```"), Just("```rust"), Just("~~~")].prop_map(String::from),
        2 => Just(String::new()),
    ]
}

fn body() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(body_line(), 0..6)
}

fn date() -> impl Strategy<Value = NaiveDate> {
    (2015i32..2030, 1u32..=12, 1u32..=28)
        .prop_map(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

fn dated_heading() -> impl Strategy<Value = String> {
    prop_oneof![
        date().prop_map(|d| format!("## {}", d.format("%Y-%m-%d"))),
        (1u32..5, 0u32..20, date())
            .prop_map(|(major, minor, d)| format!("## [{major}.{minor}.0] - {}", d.format("%Y-%m-%d"))),
    ]
}

fn other_heading() -> impl Strategy<Value = String> {
    prop_oneof![Just("## Notes"), Just("## Contributors"), Just("## Upgrading")]
        .prop_map(String::from)
}

fn preamble() -> impl Strategy<Value = Vec<String>> {
    prop_oneof![
        Just(vec![]),
        Just(vec!["# Changelog".to_string(), String::new()]),
        Just(vec![
            "# Changelog".to_string(),
            String::new(),
            "All notable changes to this project are documented here.".to_string(),
            String::new(),
        ]),
    ]
}

/// Headings in document order, the Unreleased one (if any) first.
fn headings(with_unreleased: bool) -> impl Strategy<Value = Vec<String>> {
    let rest = prop::collection::vec(prop_oneof![3 => dated_heading(), 1 => other_heading()], 0..5);
    (rest, Just(with_unreleased)).prop_map(|(mut rest, unreleased)| {
        if unreleased {
            rest.insert(0, "## [Unreleased]".to_string());
        }
        rest
    })
}

fn render(preamble: Vec<String>, sections: Vec<(String, Vec<String>)>) -> String {
    let mut text = String::new();
    let lines = preamble.into_iter().chain(
        sections
            .into_iter()
            .flat_map(|(heading, body)| std::iter::once(heading).chain(body)),
    );
    for line in lines {
        text.push_str(&line);
        text.push('\n');
    }
    text
}

fn document(with_unreleased: bool) -> impl Strategy<Value = String> {
    (preamble(), headings(with_unreleased)).prop_flat_map(|(preamble, headings)| {
        let n = headings.len();
        (
            Just(preamble),
            Just(headings),
            prop::collection::vec(body(), n..=n),
        )
            .prop_map(|(preamble, headings, bodies)| {
                render(preamble, headings.into_iter().zip(bodies).collect())
            })
    })
}

fn any_document() -> impl Strategy<Value = String> {
    any::<bool>().prop_flat_map(document)
}

/// Bullet lines, sometimes followed by a stray fence the generator left behind.
fn entry() -> impl Strategy<Value = String> {
    (
        prop::collection::vec("[a-z]{1,10}( [a-z]{1,6}){0,3}", 1..4),
        prop::option::of(prop_oneof![Just("```"), Just("~~~")]),
    )
        .prop_map(|(lines, fence)| {
            let mut lines: Vec<String> = lines
                .into_iter()
                .map(|l| format!("- **src/{l}.rs**: changed"))
                .collect();
            lines.extend(fence.map(String::from));
            lines.join("\n")
        })
}

fn non_blank(lines: &[String]) -> Vec<String> {
    lines.iter().filter(|l| !l.trim().is_empty()).cloned().collect()
}

fn released_sections(doc: &Changelog) -> Vec<Section> {
    doc.sections()
        .iter()
        .filter(|s| s.kind() != SectionKind::Unreleased)
        .cloned()
        .collect()
}

proptest! {
    #[test]
    fn parse_serialize_is_lossless(text in any_document()) {
        prop_assert_eq!(Changelog::parse(&text).serialize(), text);
    }

    #[test]
    fn insert_touches_only_unreleased(text in any_document(), entry in entry()) {
        let before = Changelog::parse(&text);
        let after = Changelog::parse(&insert_entry(&text, &entry).unwrap());

        prop_assert_eq!(after.preamble(), before.preamble());
        prop_assert_eq!(released_sections(&after), released_sections(&before));

        let unreleased = after.unreleased().unwrap().expect("unreleased section exists");
        let previous = before
            .unreleased()
            .unwrap()
            .map(|s| non_blank(&s.body))
            .unwrap_or_default();
        let mut expected: Vec<String> = entry.lines().map(String::from).collect();
        expected.extend(previous);
        prop_assert_eq!(non_blank(&unreleased.body), expected);
    }

    #[test]
    fn insert_leaves_a_pending_entry(text in any_document(), entry in entry()) {
        prop_assert!(has_pending_entries(&insert_entry(&text, &entry).unwrap()).unwrap());
    }

    #[test]
    fn release_without_unreleased_is_identity(text in document(false), date in date()) {
        prop_assert_eq!(release(&text, date).unwrap(), text);
    }

    #[test]
    fn release_after_insert(text in any_document(), entry in entry(), date in date()) {
        let before = Changelog::parse(&text);
        let released = release(&insert_entry(&text, &entry).unwrap(), date).unwrap();
        let after = Changelog::parse(&released);

        prop_assert_eq!(after.dated_sections().count(), before.dated_sections().count() + 1);
        prop_assert!(!has_pending_entries(&released).unwrap());

        let u = after.unreleased_index().unwrap().expect("fresh unreleased section");
        prop_assert!(u > 0);
        let stamped = &after.sections()[u - 1];
        prop_assert_eq!(stamped.kind(), SectionKind::Dated(date));
        for line in entry.lines() {
            prop_assert!(stamped.body.iter().any(|l| l == line));
        }
    }
}

mod scenarios {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn insert_into_empty_unreleased() {
        let doc = "## [Unreleased]\n\n## 2024-01-01\n- old\n";
        assert_eq!(
            insert_entry(doc, "- new change").unwrap(),
            "## [Unreleased]\n- new change\n\n## 2024-01-01\n- old\n"
        );
    }

    #[test]
    fn insert_creates_unreleased_before_first_dated() {
        let doc = "# Changelog\n\n## 2024-01-01\n- old\n";
        assert_eq!(
            insert_entry(doc, "- x").unwrap(),
            "# Changelog\n\n## [Unreleased]\n- x\n\n## 2024-01-01\n- old\n"
        );
    }

    #[test]
    fn release_stamps_and_reopens() {
        assert_eq!(
            release("## [Unreleased]\n- a\n\n", day(2024, 6, 1)).unwrap(),
            "## 2024-06-01\n- a\n\n## [Unreleased]\n\n"
        );
    }

    #[test]
    fn stray_fence_in_entry_loses_no_release() {
        let doc = "## [Unreleased]\n\n## 2024-01-01\n- old\n";
        let inserted = insert_entry(doc, "- added parser\n~~~").unwrap();
        let released = Changelog::parse(&release(&inserted, day(2024, 6, 1)).unwrap());
        let dates: Vec<NaiveDate> = released.dated_sections().map(|(d, _)| d).collect();
        assert_eq!(dates, vec![day(2024, 6, 1), day(2024, 1, 1)]);
        assert_eq!(released.unreleased_index().unwrap(), Some(1));
    }

    #[test]
    fn stray_fence_in_preamble_keeps_single_unreleased() {
        let out = insert_entry("# Changelog\n```\n## [Unreleased]\n- a\n", "- b").unwrap();
        assert_eq!(out.matches("## [Unreleased]").count(), 1);
        assert!(Changelog::parse(&out).unreleased_index().is_ok());
    }
}
