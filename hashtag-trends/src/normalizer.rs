use tracing::debug;

use crate::metrics_consts::HASHTAGS_DROPPED;
use crate::types::{Extraction, NormalizedHashtag};

/// Convert a hashtag to its canonical form, or `None` if it can't be represented in
/// the canonical encoding (ASCII). The tag is otherwise kept verbatim.
pub fn normalize(tag: &str) -> Option<NormalizedHashtag> {
    if tag.is_ascii() {
        Some(NormalizedHashtag::new_unchecked(tag.to_owned()))
    } else {
        None
    }
}

/// Normalize every hashtag of an extraction independently, dropping the ones that
/// can't be represented. The survivors keep their order.
pub fn normalize_all(extraction: &Extraction) -> Vec<NormalizedHashtag> {
    let mut normalized = Vec::with_capacity(extraction.hashtags().len());
    for tag in extraction.hashtags() {
        match normalize(tag) {
            Some(tag) => normalized.push(tag),
            None => {
                debug!("dropping unrepresentable hashtag: {:?}", tag);
                metrics::counter!(HASHTAGS_DROPPED).increment(1);
            }
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("#rust" ; "plain")]
    #[test_case("#Rust2024" ; "mixed case and digits are kept as is")]
    #[test_case("#snake_case" ; "underscore")]
    #[test_case("#" ; "bare marker")]
    fn accepts_ascii(tag: &str) {
        assert_eq!(normalize(tag).map(NormalizedHashtag::into_inner), Some(tag.to_owned()));
    }

    #[test_case("#café" ; "latin accent")]
    #[test_case("#東京" ; "cjk")]
    #[test_case("#party🎉" ; "emoji")]
    fn drops_non_ascii(tag: &str) {
        assert_eq!(normalize(tag), None);
    }

    #[test]
    fn one_bad_tag_does_not_spoil_the_others() {
        let extraction = Extraction::new(
            vec!["alice".to_owned()],
            vec!["#ok".to_owned(), "#naïve".to_owned(), "#fine".to_owned()],
        );

        let normalized: Vec<_> = normalize_all(&extraction)
            .into_iter()
            .map(NormalizedHashtag::into_inner)
            .collect();
        assert_eq!(normalized, vec!["#ok", "#fine"]);
    }

    #[test]
    fn all_bad_tags_leave_nothing() {
        let extraction = Extraction::new(vec![], vec!["#ñ".to_owned()]);
        assert!(normalize_all(&extraction).is_empty());
    }
}
