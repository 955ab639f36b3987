use std::str::FromStr;

use tracing::debug;

use crate::error::ExtractionError;
use crate::metrics_consts::EXTRACTION_ERRORS;
use crate::types::{Event, Extraction};

/// Where the author goes in an extraction's people list, relative to the mentions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AuthorPosition {
    First,
    #[default]
    Last,
}

impl FromStr for AuthorPosition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(AuthorPosition::First),
            "last" => Ok(AuthorPosition::Last),
            _ => Err(format!("unknown author position: {s}")),
        }
    }
}

/// Extract people and hashtags from an event.
///
/// Returns `None` for events that carry no hashtags, and for events whose people
/// can't be built; neither gives us any signal.
pub fn extract(event: &Event, author_position: AuthorPosition) -> Option<Extraction> {
    match try_extract(event, author_position) {
        Ok(extraction) => extraction,
        Err(e) => {
            debug!("dropping event with hashtags: {}", e);
            metrics::counter!(EXTRACTION_ERRORS).increment(1);
            None
        }
    }
}

fn try_extract(
    event: &Event,
    author_position: AuthorPosition,
) -> Result<Option<Extraction>, ExtractionError> {
    if event.hashtags.is_empty() {
        return Ok(None);
    }

    let people = event.people(author_position)?;
    Ok(Some(Extraction::new(people, event.hashtags.clone())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(hashtags: &[&str]) -> Event {
        Event {
            author: Some("alice".to_owned()),
            mentions: Some(vec!["@bob".to_owned(), "@carol".to_owned()]),
            hashtags: hashtags.iter().map(|h| h.to_string()).collect(),
        }
    }

    #[test]
    fn no_hashtags_is_the_empty_sentinel() {
        assert_eq!(extract(&event(&[]), AuthorPosition::Last), None);
    }

    #[test]
    fn no_hashtags_does_not_look_at_people() {
        let event = Event {
            author: None,
            mentions: None,
            hashtags: vec![],
        };
        assert_eq!(try_extract(&event, AuthorPosition::Last), Ok(None));
    }

    #[test]
    fn populated_extraction() {
        let extraction = extract(&event(&["#a", "#b", "#a"]), AuthorPosition::Last).unwrap();
        assert_eq!(extraction.people(), ["@bob", "@carol", "alice"]);
        assert_eq!(extraction.hashtags(), ["#a", "#b", "#a"]);
    }

    #[test]
    fn missing_people_become_no_signal() {
        let mut no_author = event(&["#a"]);
        no_author.author = None;
        assert_eq!(extract(&no_author, AuthorPosition::Last), None);
        assert_eq!(
            try_extract(&no_author, AuthorPosition::Last),
            Err(ExtractionError::MissingAuthor)
        );

        let mut no_mentions = event(&["#a"]);
        no_mentions.mentions = None;
        assert_eq!(extract(&no_mentions, AuthorPosition::First), None);
    }

    #[test]
    fn author_position_parsing() {
        assert_eq!("first".parse::<AuthorPosition>(), Ok(AuthorPosition::First));
        assert_eq!(" LAST ".parse::<AuthorPosition>(), Ok(AuthorPosition::Last));
        assert!("middle".parse::<AuthorPosition>().is_err());
    }
}
