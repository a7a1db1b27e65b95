use std::collections::BTreeMap;
use std::fmt::Display;
use std::ops::Range;
use std::sync::LazyLock;

use derive_more::Deref;
use derive_more::DerefMut;
use regex::Regex;

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r#"([A-Za-z0-9_:-]+)="([^"]*)""#).expect("attribute pattern is valid")
});

/// The delimiter style a tag was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
	/// `<tpl:Name ...>` and `</tpl:Name>`
	Angle,
	/// `{{tpl:Name ...}}`
	Brace,
}

/// A `tpl:` tag as it appeared in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
	/// The tag name following the `tpl:` prefix.
	pub name: String,
	/// Everything between the name and the closing delimiter, trimmed.
	pub attrs_raw: String,
	pub notation: Notation,
	/// `~` directly after the opening delimiter.
	pub strip_before: bool,
	/// `~` directly before the closing delimiter.
	pub strip_after: bool,
	/// `<tpl:Name/>`: opens and closes in one tag.
	pub self_closing: bool,
}

impl Tag {
	pub fn attributes(&self) -> Attributes {
		Attributes::parse(&self.attrs_raw)
	}
}

impl Display for Tag {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.notation {
			Notation::Angle => write!(f, "<tpl:{}>", self.name),
			Notation::Brace => write!(f, "{{{{tpl:{}}}}}", self.name),
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
	/// Literal text between tags, after whitespace control was applied.
	Text(String),
	OpenBlock(Tag),
	CloseBlock(Tag),
	Value(Tag),
}

/// A single lexed fragment together with the byte range it covers in the
/// lexed source. The ranges of consecutive tokens are contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub kind: TokenKind,
	pub span: Range<usize>,
}

impl Token {
	pub fn tag(&self) -> Option<&Tag> {
		match &self.kind {
			TokenKind::Text(_) => None,
			TokenKind::OpenBlock(tag) | TokenKind::CloseBlock(tag) | TokenKind::Value(tag) => {
				Some(tag)
			}
		}
	}
}

/// Parsed `key="value"` pairs of a tag. Duplicate keys resolve to the last
/// occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deref, DerefMut)]
pub struct Attributes(
	#[deref]
	#[deref_mut]
	BTreeMap<String, String>,
);

impl Attributes {
	pub fn parse(raw: &str) -> Self {
		ATTRIBUTE
			.captures_iter(raw)
			.map(|captures| (captures[1].to_string(), captures[2].to_string()))
			.collect()
	}

	/// Shorthand for looking up a value as `&str`.
	pub fn value(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Self(
			iter.into_iter()
				.map(|(key, value)| (key.into(), value.into()))
				.collect(),
		)
	}
}
