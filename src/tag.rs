//! Group labels derived from file names.
//!
//! A tag is computed once when a record is created and never changes. It
//! annotates the uploaded object (as a `#tag` caption on the chat backend)
//! and lets a whole group be removed through the reserved `#<tag>` name.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Names starting with this character address a tag group, not a file.
pub const TAG_GROUP_PREFIX: char = '#';

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// First `_`-separated segment of the name, with `.` and `-` turned into `_`.
    pub fn from_name(name: &str) -> Self {
        let head = name.split('_').next().unwrap_or(name);
        Self(head.replace(|c: char| c == '.' || c == '-', "_"))
    }

    /// Parses a reserved group name such as `#photos`.
    pub fn from_group_name(name: &str) -> Option<Self> {
        name.strip_prefix(TAG_GROUP_PREFIX)
            .filter(|rest| !rest.is_empty())
            .map(|rest| Self(rest.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn caption(&self) -> String {
        format!("{}{}", TAG_GROUP_PREFIX, self.0)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_takes_first_segment() {
        assert_eq!(Tag::from_name("a_1").as_str(), "a");
        assert_eq!(Tag::from_name("holiday_2024_01.jpg").as_str(), "holiday");
    }

    #[test]
    fn test_tag_replaces_dots_and_dashes() {
        assert_eq!(Tag::from_name("report.final-v2.pdf").as_str(), "report_final_v2_pdf");
        assert_eq!(Tag::from_name("my-notes_old.txt").as_str(), "my_notes");
    }

    #[test]
    fn test_group_name_requires_prefix_and_body() {
        assert_eq!(Tag::from_group_name("#a"), Some(Tag::new("a")));
        assert_eq!(Tag::from_group_name("#"), None);
        assert_eq!(Tag::from_group_name("a"), None);
        assert_eq!(Tag::new("a").caption(), "#a");
    }

    #[test]
    fn test_leading_underscore_gives_empty_tag() {
        assert_eq!(Tag::from_name("_x").as_str(), "");
        assert_eq!(Tag::from_group_name(&Tag::from_name("_x").caption()), None);
    }
}
