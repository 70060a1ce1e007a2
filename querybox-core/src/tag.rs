//! Cache tags.
//!
//! A [`Tag`] names either a whole resource class (`Item`) or a single
//! instance of it (`Item:42`). Query endpoints attach tags to the responses
//! they cache; mutation endpoints invalidate by the same tags.
//!
//! The rendered form of a tag is used verbatim inside cache keys, so it is
//! stable: `{type}` when the id is absent and `{type}:{id}` otherwise.
//!
//! ```
//! use querybox_core::{Tag, TagSet};
//!
//! let tags: TagSet = ["Item:42", "Items"].into_iter().map(Tag::parse).collect();
//! let rendered: Vec<String> = tags.iter().map(ToString::to_string).collect();
//! assert_eq!(rendered, ["Item:42", "Items"]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

const ID_SEPARATOR: char = ':';

/// A label identifying a resource class or a specific resource instance.
///
/// The type should not itself contain `:`, otherwise `Tag::new("a:b", None)`
/// and `Tag::new("a", Some("b"))` render to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "type")]
    kind: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<SmolStr>,
}

impl Tag {
    /// Creates a tag from a resource type and an optional instance id.
    pub fn new<T, I>(kind: T, id: Option<I>) -> Self
    where
        T: Into<SmolStr>,
        I: Into<SmolStr>,
    {
        Tag {
            kind: kind.into(),
            id: id.map(Into::into),
        }
    }

    /// Creates a tag naming a whole resource class.
    pub fn class(kind: impl Into<SmolStr>) -> Self {
        Tag {
            kind: kind.into(),
            id: None,
        }
    }

    /// Creates a tag naming a single resource instance.
    pub fn instance(kind: impl Into<SmolStr>, id: impl fmt::Display) -> Self {
        Tag {
            kind: kind.into(),
            id: Some(SmolStr::from(id.to_string())),
        }
    }

    /// Parses the rendered form back into a tag.
    ///
    /// Everything before the first `:` is the type, the rest is the id.
    /// An empty id (`"Item:"`) is treated as absent.
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(ID_SEPARATOR) {
            Some((kind, id)) if !id.is_empty() => Tag::new(kind, Some(id)),
            Some((kind, _)) => Tag::class(kind),
            None => Tag::class(raw),
        }
    }

    /// Returns the resource type.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the resource instance id, if any.
    #[inline]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns `true` if this tag names a whole resource class.
    #[inline]
    pub fn is_class(&self) -> bool {
        self.id.is_none()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}{}{}", self.kind, ID_SEPARATOR, id),
            None => f.write_str(&self.kind),
        }
    }
}

impl From<&str> for Tag {
    fn from(raw: &str) -> Self {
        Tag::parse(raw)
    }
}

impl From<String> for Tag {
    fn from(raw: String) -> Self {
        Tag::parse(&raw)
    }
}

/// An ordered collection of tags without duplicates.
///
/// Order is the order in which tags were added; it matters for
/// cache lookups by tag, which stop at the first tag that resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(Vec<Tag>);

impl TagSet {
    /// Creates an empty tag set.
    pub fn new() -> Self {
        TagSet(Vec::new())
    }

    /// Appends a tag unless an equal tag is already present.
    pub fn push(&mut self, tag: impl Into<Tag>) {
        let tag = tag.into();
        if !self.0.contains(&tag) {
            self.0.push(tag);
        }
    }

    /// Returns a new set with `other`'s tags appended after this set's tags.
    pub fn merged(mut self, other: &TagSet) -> Self {
        self.extend(other.iter().cloned());
        self
    }

    /// Iterates over tags in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, Tag> {
        self.0.iter()
    }

    /// Returns the number of tags.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set holds no tags.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if an equal tag is present.
    pub fn contains(&self, tag: &Tag) -> bool {
        self.0.contains(tag)
    }
}

impl Extend<Tag> for TagSet {
    fn extend<I: IntoIterator<Item = Tag>>(&mut self, iter: I) {
        for tag in iter {
            self.push(tag);
        }
    }
}

impl FromIterator<Tag> for TagSet {
    fn from_iter<I: IntoIterator<Item = Tag>>(iter: I) -> Self {
        let mut set = TagSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for TagSet {
    type Item = Tag;
    type IntoIter = std::vec::IntoIter<Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TagSet {
    type Item = &'a Tag;
    type IntoIter = std::slice::Iter<'a, Tag>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Tag> for TagSet {
    fn from(tag: Tag) -> Self {
        TagSet(vec![tag])
    }
}

impl From<&str> for TagSet {
    fn from(raw: &str) -> Self {
        TagSet::from(Tag::parse(raw))
    }
}

impl From<Vec<Tag>> for TagSet {
    fn from(tags: Vec<Tag>) -> Self {
        tags.into_iter().collect()
    }
}

impl<const N: usize> From<[Tag; N]> for TagSet {
    fn from(tags: [Tag; N]) -> Self {
        tags.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_class_and_instance() {
        assert_eq!(Tag::class("Item").to_string(), "Item");
        assert_eq!(Tag::instance("Item", 42).to_string(), "Item:42");
    }

    #[test]
    fn test_parse_matches_display() {
        for raw in ["Item", "Item:42", "User:abc:def"] {
            assert_eq!(Tag::parse(raw).to_string(), raw);
        }
        assert_eq!(Tag::parse("User:abc:def").id(), Some("abc:def"));
    }

    #[test]
    fn test_parse_empty_id_is_class() {
        let tag = Tag::parse("Item:");
        assert!(tag.is_class());
        assert_eq!(tag, Tag::class("Item"));
    }

    #[test]
    fn test_tag_set_keeps_order_and_drops_duplicates() {
        let mut tags = TagSet::new();
        tags.push("B");
        tags.push("A:1");
        tags.push("B");
        let rendered: Vec<String> = tags.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["B".to_string(), "A:1".to_string()]);
    }

    #[test]
    fn test_merged_appends_missing_tags() {
        let left = TagSet::from([Tag::class("A"), Tag::class("B")]);
        let right = TagSet::from([Tag::class("B"), Tag::class("C")]);
        let merged = left.merged(&right);
        assert_eq!(merged.len(), 3);
        assert!(merged.contains(&Tag::class("C")));
    }

    #[test]
    fn test_serde_shape() {
        let tag = Tag::instance("Item", 7);
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, r#"{"type":"Item","id":"7"}"#);
        let back: Tag = serde_json::from_str(r#"{"type":"Items"}"#).unwrap();
        assert_eq!(back, Tag::class("Items"));
    }
}
