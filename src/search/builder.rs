use regex::{Regex, RegexBuilder};

use super::{GroupInfo, OccurrenceMap, OccurrenceRef};
use crate::config::SearchOptions;
use crate::dom::{DocumentRepresentation, Group};
use crate::error::SearchError;

/// Matches a run of whitespace in place of each literal space of a query.
/// Rendered text collapses whitespace, so `foo bar` must also find
/// `foo  bar` and `foo\nbar`.
const WHITESPACE_RUN: &str = r"\s+";

/// A query together with the pattern compiled from it.
#[derive(Debug, Clone)]
pub struct Pattern {
    /// The query as the user typed it
    pub query: String,
    pub regex: Regex,
}

impl Pattern {
    /// Occurrences of this pattern in `doc`, scanning at most up to the cap.
    pub fn occurrences(&self, doc: &DocumentRepresentation, max_results: usize) -> OccurrenceMap {
        scan_groups(&self.regex, doc.groups.iter(), max_results)
    }
}

/// Turn a raw query into the compiled pattern used for matching.
pub fn compile_pattern(query: &str, options: &SearchOptions) -> Result<Pattern, SearchError> {
    let source = if options.use_regex_syntax {
        query.to_string()
    } else {
        regex::escape(query)
    };

    if source.is_empty() {
        return Err(SearchError::EmptyQuery);
    }

    let source = source.replace(' ', WHITESPACE_RUN);

    let regex = RegexBuilder::new(&source)
        .multi_line(true)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(|e| SearchError::InvalidPattern(e.to_string()))?;

    Ok(Pattern {
        query: query.to_string(),
        regex,
    })
}

/// Build the occurrence map of `query` over `doc`.
///
/// Scanning stops at the first group that brings the cumulative count to
/// `options.max_results` (when nonzero); that last group keeps all of its
/// matches, so `total_count` can exceed the cap.
pub fn build_occurrence_map(
    doc: &DocumentRepresentation,
    query: &str,
    options: SearchOptions,
) -> Result<OccurrenceMap, SearchError> {
    let pattern = compile_pattern(query, &options)?;
    let map = pattern.occurrences(doc, options.max_results);
    log::debug!(
        "Occurrence map for {:?}: {} matches in {} of {} groups",
        query,
        map.total_count,
        map.group_count,
        doc.group_count()
    );
    Ok(map)
}

/// Scan groups in order with an already compiled pattern.
pub fn scan_groups<'a, I>(regex: &Regex, groups: I, max_results: usize) -> OccurrenceMap
where
    I: IntoIterator<Item = &'a Group>,
{
    let mut map = OccurrenceMap::default();

    for group in groups {
        let text = group.text();
        let group_index = map.groups.len();
        let before = map.entries.len();

        for (sub_index, mat) in regex.find_iter(&text).enumerate() {
            map.entries.push(OccurrenceRef {
                group_index,
                sub_index,
                matched_text: mat.as_str().to_string(),
                start: mat.start(),
                end: mat.end(),
            });
        }

        let match_count = map.entries.len() - before;
        if match_count == 0 {
            continue;
        }

        map.groups.push(GroupInfo {
            element_refs: group.element_refs(),
            match_count,
            preformatted: group.preformatted,
        });

        if max_results != 0 && map.entries.len() >= max_results {
            break;
        }
    }

    map.total_count = map.entries.len();
    map.group_count = map.groups.len();
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementRef;

    fn doc(texts: &[&str]) -> DocumentRepresentation {
        DocumentRepresentation::from_texts(texts)
    }

    #[test]
    fn no_matching_groups_yields_empty_map() {
        let map = build_occurrence_map(&doc(&["alpha", "beta"]), "zeta", SearchOptions::default())
            .unwrap();
        assert_eq!(map.total_count, 0);
        assert_eq!(map.group_count, 0);
        assert!(map.entries.is_empty());
        assert!(map.is_empty());
    }

    #[test]
    fn indexes_matches_per_group() {
        let map = build_occurrence_map(&doc(&["cat cat", "dog"]), "cat", SearchOptions::default())
            .unwrap();
        assert_eq!(map.total_count, 2);
        assert_eq!(map.group_count, 1);
        assert_eq!(map.groups[0].match_count, 2);
        assert_eq!(map.groups[0].element_refs, vec![ElementRef(0)]);
        assert_eq!((map.entries[0].group_index, map.entries[0].sub_index), (0, 0));
        assert_eq!((map.entries[1].group_index, map.entries[1].sub_index), (0, 1));
        assert_eq!((map.entries[1].start, map.entries[1].end), (4, 7));
    }

    #[test]
    fn skipped_groups_do_not_consume_group_indices() {
        let map = build_occurrence_map(&doc(&["x", "none", "x x"]), "x", SearchOptions::default())
            .unwrap();
        assert_eq!(map.group_count, 2);
        assert_eq!(map.entries[2].group_index, 1);
        assert_eq!(map.groups[1].element_refs, vec![ElementRef(2)]);
    }

    #[test]
    fn group_text_spans_segments() {
        let mut d = doc(&["foo"]);
        d.groups[0].segments.push(crate::dom::TextSegment {
            element: ElementRef(7),
            text: "bar".into(),
        });
        let map = build_occurrence_map(&d, "obar", SearchOptions::default()).unwrap();
        assert_eq!(map.total_count, 1);
        assert_eq!(map.groups[0].element_refs, vec![ElementRef(0), ElementRef(7)]);
    }

    #[test]
    fn literal_mode_escapes_metacharacters() {
        let options = SearchOptions::default().literal();
        let map = build_occurrence_map(&doc(&["a.b*", "axbbb", "ab"]), "a.b*", options).unwrap();
        assert_eq!(map.total_count, 1);
        assert_eq!(map.entries[0].matched_text, "a.b*");

        let regex_mode = build_occurrence_map(&doc(&["axbbb"]), "a.b*", SearchOptions::default())
            .unwrap();
        assert_eq!(regex_mode.total_count, 1);
    }

    #[test]
    fn spaces_match_whitespace_runs() {
        let d = doc(&["foo  bar", "foo\nbar", "foobar"]);
        for options in [SearchOptions::default(), SearchOptions::default().literal()] {
            let map = build_occurrence_map(&d, "foo bar", options).unwrap();
            assert_eq!(map.total_count, 2);
            assert_eq!(map.entries[1].matched_text, "foo\nbar");
        }
    }

    #[test]
    fn case_sensitivity() {
        let d = doc(&["Cat cat CAT"]);
        let sensitive = build_occurrence_map(&d, "cat", SearchOptions::default()).unwrap();
        assert_eq!(sensitive.total_count, 1);

        let insensitive =
            build_occurrence_map(&d, "cat", SearchOptions::default().case_insensitive()).unwrap();
        assert_eq!(insensitive.total_count, 3);
    }

    #[test]
    fn multiline_anchors() {
        let map = build_occurrence_map(&doc(&["one\ntwo\nthree"]), "^t", SearchOptions::default())
            .unwrap();
        assert_eq!(map.total_count, 2);
    }

    #[test]
    fn invalid_and_empty_patterns() {
        let d = doc(&["text"]);
        assert!(matches!(
            build_occurrence_map(&d, "(unclosed", SearchOptions::default()),
            Err(SearchError::InvalidPattern(_))
        ));
        assert_eq!(
            build_occurrence_map(&d, "", SearchOptions::default()),
            Err(SearchError::EmptyQuery)
        );
        // Escaped, the same text is a valid literal
        assert!(build_occurrence_map(&d, "(unclosed", SearchOptions::default().literal()).is_ok());
    }

    #[test]
    fn lookaround_and_backreferences_are_invalid() {
        let options = SearchOptions::default();
        assert!(matches!(compile_pattern("foo(?=bar)", &options), Err(SearchError::InvalidPattern(_))));
        assert!(matches!(compile_pattern("(?<!x)y", &options), Err(SearchError::InvalidPattern(_))));
        assert!(matches!(compile_pattern(r"(a)\1", &options), Err(SearchError::InvalidPattern(_))));
    }

    #[test]
    fn cap_stops_scanning_early() {
        let d = doc(&["a a", "a", "a a a", "a"]);
        let pattern = compile_pattern("a", &SearchOptions::default()).unwrap();

        let mut visited = 0;
        let map = scan_groups(&pattern.regex, d.groups.iter().inspect(|_| visited += 1), 3);
        assert_eq!(visited, 2);
        assert_eq!(map.total_count, 3);
        assert_eq!(map.group_count, 2);
    }

    #[test]
    fn last_scanned_group_keeps_full_count() {
        let d = doc(&["a", "a a a", "a"]);
        let map =
            build_occurrence_map(&d, "a", SearchOptions::default().with_max_results(2)).unwrap();
        assert_eq!(map.total_count, 4);
        assert_eq!(map.group_count, 2);
        assert_eq!(map.groups[1].match_count, 3);
    }

    #[test]
    fn uncapped_scans_everything() {
        let d = doc(&["a", "b", "a a"]);
        let map = build_occurrence_map(&d, "a", SearchOptions::default()).unwrap();
        assert_eq!(map.total_count, 3);
        assert_eq!(map.group_count, 2);
    }
}
