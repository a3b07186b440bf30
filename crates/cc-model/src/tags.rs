//! Tag naming rules and the `;`-delimited tag-list encoding
//!
//! Azure DevOps stores a work item's tags in `System.Tags` as a single string
//! of `;`-separated names. Measure names double as tags, so they share the
//! same naming restrictions.

/// Separator used by `System.Tags` and by `additionalTags`
pub const TAG_DELIMITER: char = ';';

/// Maximum length of a tag, in UTF-16 code units
pub const MAX_TAG_LEN: usize = 400;

/// Check a measure name against the Azure DevOps tag restrictions.
///
/// A legal name is 1..=400 UTF-16 code units long and contains none of
/// U+0000–U+001F, U+007F, `,` or `;`. Lone surrogates cannot occur in a Rust
/// `str`, so the surrogate range is excluded by construction.
#[must_use]
pub fn is_valid_measure_name(name: &str) -> bool {
    let len = name.encode_utf16().count();
    if len == 0 || len > MAX_TAG_LEN {
        return false;
    }
    !name.chars().any(is_forbidden_char)
}

/// Tags follow the same rules as measure names.
#[inline]
#[must_use]
pub fn is_valid_tag(tag: &str) -> bool {
    is_valid_measure_name(tag)
}

fn is_forbidden_char(c: char) -> bool {
    matches!(c, '\u{0000}'..='\u{001f}' | '\u{007f}' | ',' | ';')
}

/// Split a tag string into trimmed, non-empty tag names.
pub fn split_tags(tags: &str) -> impl Iterator<Item = &str> {
    tags.split(TAG_DELIMITER)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
}

/// Join tag names with the tag delimiter.
#[must_use]
pub fn join_tags<'a, I>(tags: I) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for tag in tags {
        if !out.is_empty() {
            out.push(TAG_DELIMITER);
        }
        out.push_str(tag);
    }
    out
}

/// Append `tag` to an optional tag list.
#[must_use]
pub fn append_tag(tags: Option<&str>, tag: &str) -> String {
    match tags {
        Some(existing) if !existing.is_empty() => format!("{existing}{TAG_DELIMITER}{tag}"),
        _ => tag.to_string(),
    }
}

/// Remove every occurrence of `tag` (matched as a whole tag) from a tag list.
///
/// Returns `None` when nothing is left.
#[must_use]
pub fn remove_tag(tags: &str, tag: &str) -> Option<String> {
    let kept: Vec<&str> = tags
        .split(TAG_DELIMITER)
        .filter(|segment| !segment.trim().is_empty() && segment.trim() != tag)
        .collect();
    let joined = kept.join(";");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Case-insensitive containment test over a raw tag string.
///
/// This is a substring test: `"Conformance;Data Privacy"` contains
/// `"privacy"`.
#[must_use]
pub fn tags_contain(raw_tags: &str, needle: &str) -> bool {
    raw_tags.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn measure_name_rules() {
        assert!(!is_valid_measure_name(""));
        assert!(!is_valid_measure_name("a;b"));
        assert!(!is_valid_measure_name("a\u{0000}"));
        assert!(!is_valid_measure_name("a,b"));
        assert!(!is_valid_measure_name("tab\there"));
        assert!(!is_valid_measure_name("del\u{007f}"));
        assert!(is_valid_measure_name("A-Normal Name"));
        assert!(is_valid_measure_name("Export Control (ECC)"));
    }

    #[test]
    fn measure_name_length_bounds() {
        assert!(is_valid_measure_name(&"x".repeat(400)));
        assert!(!is_valid_measure_name(&"x".repeat(401)));
        // astral characters take two UTF-16 units
        assert!(is_valid_measure_name(&"\u{1F600}".repeat(200)));
        assert!(!is_valid_measure_name(&"\u{1F600}".repeat(201)));
    }

    #[test]
    fn split_trims_and_skips_empty() {
        let tags: Vec<&str> = split_tags(" Conformance ; Data Privacy;;Develop ").collect();
        assert_eq!(tags, vec!["Conformance", "Data Privacy", "Develop"]);
    }

    #[test]
    fn join_uses_delimiter() {
        assert_eq!(join_tags(["Conformance", "Data Privacy", "Develop"]), "Conformance;Data Privacy;Develop");
        assert_eq!(join_tags(std::iter::empty()), "");
    }

    #[test]
    fn append_to_empty_and_existing() {
        assert_eq!(append_tag(None, "Release"), "Release");
        assert_eq!(append_tag(Some(""), "Release"), "Release");
        assert_eq!(append_tag(Some("Develop"), "Release"), "Develop;Release");
    }

    #[test]
    fn remove_drops_all_occurrences() {
        assert_eq!(remove_tag("X;Develop;X", "X").as_deref(), Some("Develop"));
        assert_eq!(remove_tag("Develop;X", "X").as_deref(), Some("Develop"));
        assert_eq!(remove_tag("X", "X"), None);
    }

    #[test]
    fn remove_drops_empty_segments() {
        assert_eq!(remove_tag("X;;Develop", "X").as_deref(), Some("Develop"));
        assert_eq!(remove_tag(";Develop;X;", "X").as_deref(), Some("Develop"));
        assert_eq!(remove_tag("Develop; ;Release", "X").as_deref(), Some("Develop;Release"));
        assert_eq!(remove_tag(";;X", "X"), None);
    }

    #[test]
    fn remove_matches_whole_tags_only() {
        assert_eq!(remove_tag("Develop;Dev", "Dev").as_deref(), Some("Develop"));
        assert_eq!(remove_tag("Develop", "Dev").as_deref(), Some("Develop"));
    }

    #[test]
    fn contains_is_case_insensitive_substring() {
        assert!(tags_contain("Conformance; Data Privacy; Develop", "data privacy"));
        assert!(tags_contain("Conformance; Data Privacy", "Privacy"));
        assert!(!tags_contain("Conformance; Develop", "Data Privacy"));
    }

    fn tag_strategy() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9 ()-]{0,15}".prop_map(|s| s.trim_end().to_string())
    }

    proptest! {
        #[test]
        fn prop_add_then_remove_restores_prior(
            prior in proptest::option::of(proptest::collection::vec(tag_strategy(), 1..5)),
            tag in tag_strategy(),
        ) {
            let prior = prior.map(|tags| tags.join(";"));
            prop_assume!(prior.as_deref().map_or(true, |p| !split_tags(p).any(|t| t == tag)));

            let added = append_tag(prior.as_deref(), &tag);
            let restored = remove_tag(&added, &tag);
            prop_assert_eq!(restored, prior);
        }

        #[test]
        fn prop_names_with_separators_are_rejected(
            head in "[a-z]{0,10}",
            sep in prop_oneof![Just(','), Just(';'), Just('\u{0000}'), Just('\u{007f}')],
            tail in "[a-z]{0,10}",
        ) {
            let name = format!("{head}{sep}{tail}");
            prop_assert!(!is_valid_measure_name(&name));
        }
    }
}
