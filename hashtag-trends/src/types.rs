use std::borrow::Borrow;
use std::fmt;

use crate::error::ExtractionError;
use crate::extractor::AuthorPosition;

/// A decoded post. Hashtags carry their leading `#` and mentions their leading `@`.
///
/// Author and mentions are only needed once an event is known to carry hashtags, so
/// their absence is recorded here and dealt with during extraction.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    pub author: Option<String>,
    pub mentions: Option<Vec<String>>,
    pub hashtags: Vec<String>,
}

impl Event {
    /// Everyone involved in this event: the mentions in order, plus the author.
    pub fn people(&self, author_position: AuthorPosition) -> Result<Vec<String>, ExtractionError> {
        let author = self.author.as_ref().ok_or(ExtractionError::MissingAuthor)?;
        let mentions = self
            .mentions
            .as_ref()
            .ok_or(ExtractionError::MissingMentions)?;

        let mut people = Vec::with_capacity(mentions.len() + 1);
        match author_position {
            AuthorPosition::First => {
                people.push(author.clone());
                people.extend(mentions.iter().cloned());
            }
            AuthorPosition::Last => {
                people.extend(mentions.iter().cloned());
                people.push(author.clone());
            }
        }
        Ok(people)
    }
}

/// The people and hashtags of an event that carried at least one hashtag.
///
/// Only the extractor builds these, so `hashtags` is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction {
    people: Vec<String>,
    hashtags: Vec<String>,
}

impl Extraction {
    pub(crate) fn new(people: Vec<String>, hashtags: Vec<String>) -> Self {
        debug_assert!(!hashtags.is_empty());
        Self { people, hashtags }
    }

    pub fn people(&self) -> &[String] {
        &self.people
    }

    pub fn hashtags(&self) -> &[String] {
        &self.hashtags
    }
}

/// A hashtag that is representable in the canonical (ASCII) encoding.
/// Build one with [`crate::normalizer::normalize`].
#[derive(Clone, Debug, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct NormalizedHashtag(String);

impl NormalizedHashtag {
    pub(crate) fn new_unchecked(tag: String) -> Self {
        NormalizedHashtag(tag)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for NormalizedHashtag {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets count maps keyed by hashtag be queried with a plain &str
impl Borrow<str> for NormalizedHashtag {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedHashtag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
