//! Parser and writer for the small YAML subset used by snippet sidecars and
//! document manifests.
//!
//! Only three shapes are understood:
//!
//! ```yaml
//! title: "A scalar"
//! labels: ["flow", "list"]
//! markdown_files:
//!   - block
//!   - list
//! ```
//!
//! Anything else is skipped rather than reported. The parser never fails.

use logos::Logos;
use snailquote::unescape;

/// A parsed manifest value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
	Scalar(String),
	List(Vec<String>),
}

impl Value {
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Scalar(value) => Some(value.as_str()),
			Self::List(_) => None,
		}
	}

	pub fn as_list(&self) -> Option<&[String]> {
		match self {
			Self::Scalar(_) => None,
			Self::List(items) => Some(items.as_slice()),
		}
	}

	/// Lists are returned as is, a non-empty scalar becomes a one-item list.
	pub fn to_list(&self) -> Vec<String> {
		match self {
			Self::Scalar(value) if value.is_empty() => vec![],
			Self::Scalar(value) => vec![value.clone()],
			Self::List(items) => items.clone(),
		}
	}
}

/// Ordered key/value entries read from a manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
	entries: Vec<(String, Value)>,
}

impl Manifest {
	/// Look up a key exactly, then ignoring ASCII case.
	pub fn get(&self, key: &str) -> Option<&Value> {
		self.entries
			.iter()
			.find(|(name, _)| name == key)
			.or_else(|| {
				self.entries
					.iter()
					.find(|(name, _)| name.eq_ignore_ascii_case(key))
			})
			.map(|(_, value)| value)
	}

	/// Non-empty scalar value for `key`.
	pub fn get_str(&self, key: &str) -> Option<&str> {
		self.get(key)
			.and_then(Value::as_str)
			.filter(|value| !value.is_empty())
	}

	pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
		self.get(key).map(Value::to_list)
	}

	/// Insert a value, replacing an existing entry with the same key in place.
	pub fn insert(&mut self, key: impl Into<String>, value: Value) {
		let key = key.into();
		if let Some(entry) = self.entries.iter_mut().find(|(name, _)| *name == key) {
			entry.1 = value;
		} else {
			self.entries.push((key, value));
		}
	}

	fn push_item(&mut self, key: &str, item: String) {
		match self.entries.iter_mut().find(|(name, _)| name == key) {
			Some((_, Value::List(items))) => items.push(item),
			Some(entry) => entry.1 = Value::List(vec![item]),
			None => self.entries.push((key.to_string(), Value::List(vec![item]))),
		}
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
		self.entries
			.iter()
			.map(|(name, value)| (name.as_str(), value))
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Parse manifest text. Unknown or malformed lines are ignored.
pub fn parse_manifest(text: &str) -> Manifest {
	let mut manifest = Manifest::default();
	// Key of the block list currently receiving `- item` lines.
	let mut open_list: Option<String> = None;

	for line in text.lines() {
		let trimmed = line.trim();

		if trimmed.is_empty() || trimmed.starts_with('#') {
			continue;
		}

		if trimmed == "-" || trimmed.starts_with("- ") {
			if let Some(key) = &open_list {
				let item = unquote(trimmed[1..].trim());
				if !item.is_empty() {
					manifest.push_item(key, item);
				}
			}
			continue;
		}

		let Some(colon) = trimmed.find(':').filter(|index| *index > 0) else {
			continue;
		};

		let key = trimmed[..colon].trim().to_string();
		let value = trimmed[colon + 1..].trim();

		if value.is_empty() {
			manifest.insert(key.clone(), Value::List(vec![]));
			open_list = Some(key);
			continue;
		}

		open_list = None;

		if value.len() >= 2 && value.starts_with('[') && value.ends_with(']') {
			manifest.insert(key, Value::List(parse_flow_list(&value[1..value.len() - 1])));
		} else {
			manifest.insert(key, Value::Scalar(unquote(value)));
		}
	}

	manifest
}

/// Tokens inside a flow list such as `["a", 'b', plain text]`.
#[derive(Logos, Debug, PartialEq)]
enum FlowToken {
	#[token(",")]
	Comma,
	#[regex(r"[ \t]+")]
	Whitespace,
	#[regex(r#""([^"\\]|\\.)*""#)]
	DoubleQuoted,
	#[regex(r"'([^']|'')*'")]
	SingleQuoted,
	#[regex(r#"[^,"' \t]([^,]*[^, \t])?"#)]
	Plain,
}

/// Split the inside of a flow list on commas that are not quoted.
fn parse_flow_list(inner: &str) -> Vec<String> {
	let mut items = Vec::new();
	let mut current = String::new();
	let mut pending_space = false;

	for (token, span) in FlowToken::lexer(inner).spanned() {
		let slice = &inner[span];
		let piece = match token {
			Ok(FlowToken::Comma) => {
				if !current.is_empty() {
					items.push(std::mem::take(&mut current));
				}
				pending_space = false;
				continue;
			}
			Ok(FlowToken::Whitespace) => {
				pending_space = !current.is_empty();
				continue;
			}
			Ok(FlowToken::DoubleQuoted | FlowToken::SingleQuoted) => unquote(slice),
			Ok(FlowToken::Plain) | Err(()) => slice.to_string(),
		};

		if pending_space {
			current.push(' ');
			pending_space = false;
		}
		current.push_str(&piece);
	}

	if !current.is_empty() {
		items.push(current);
	}

	items
}

/// Remove one level of matching surrounding quotes.
///
/// Double quoted values have their escape sequences resolved; when the escapes
/// are invalid the inner text is kept verbatim. Single quoted values only
/// collapse `''` to `'`.
pub fn unquote(value: &str) -> String {
	if value.len() < 2 {
		return value.to_string();
	}

	if let Some(inner) = value.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
		if inner.contains('\\') {
			return unescape(value).unwrap_or_else(|_| inner.to_string());
		}
		return inner.to_string();
	}

	if let Some(inner) = value.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')) {
		return inner.replace("''", "'");
	}

	value.to_string()
}

/// Write `value` as a double quoted scalar.
pub fn quote(value: &str) -> String {
	let mut quoted = String::with_capacity(value.len() + 2);
	quoted.push('"');
	for ch in value.chars() {
		match ch {
			'\\' => quoted.push_str("\\\\"),
			'"' => quoted.push_str("\\\""),
			'\n' => quoted.push_str("\\n"),
			'\r' => quoted.push_str("\\r"),
			'\t' => quoted.push_str("\\t"),
			other => quoted.push(other),
		}
	}
	quoted.push('"');
	quoted
}

/// Plain block-list items stay unquoted so manifests remain easy to edit by
/// hand.
pub fn quote_item(value: &str) -> String {
	let plain = !value.is_empty()
		&& value
			.chars()
			.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '.' | '_' | '-'))
		&& !value.starts_with('-');

	if plain { value.to_string() } else { quote(value) }
}

/// Write a flow list of quoted scalars, e.g. `["a", "b"]`.
pub fn flow_list(items: &[String]) -> String {
	let quoted: Vec<String> = items.iter().map(|item| quote(item)).collect();
	format!("[{}]", quoted.join(", "))
}
