use std::str::FromStr;
use std::sync::LazyLock;

use derive_more::Display;
use regex::Captures;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;

use crate::OrcheaError;
use crate::OrcheaResult;

/// Which markdown renderer to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flavor {
	/// The built-in line based renderer used for assembled documents.
	#[default]
	#[display("simple")]
	Simple,
	/// Full CommonMark through the `markdown` crate.
	#[display("commonmark")]
	CommonMark,
}

impl FromStr for Flavor {
	type Err = OrcheaError;

	fn from_str(value: &str) -> Result<Self, Self::Err> {
		match value.trim().to_ascii_lowercase().as_str() {
			"simple" => Ok(Self::Simple),
			"commonmark" => Ok(Self::CommonMark),
			other => Err(OrcheaError::UnknownFlavor(other.to_string())),
		}
	}
}

/// Render markdown with the given flavor.
pub fn render(markdown: &str, flavor: Flavor) -> OrcheaResult<String> {
	match flavor {
		Flavor::Simple => Ok(render_markdown(markdown)),
		Flavor::CommonMark => render_commonmark(markdown),
	}
}

/// Render through the `markdown` crate. Raw HTML in the input is passed
/// through, matching the simple renderer.
pub fn render_commonmark(markdown: &str) -> OrcheaResult<String> {
	let options = markdown::Options {
		compile: markdown::CompileOptions {
			allow_dangerous_html: true,
			..markdown::CompileOptions::default()
		},
		..markdown::Options::gfm()
	};

	markdown::to_html_with_options(markdown, &options)
		.map_err(|message| OrcheaError::Markdown(message.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
	Unordered,
	Ordered,
}

impl ListKind {
	fn tag(self) -> &'static str {
		match self {
			Self::Unordered => "ul",
			Self::Ordered => "ol",
		}
	}
}

#[derive(Debug, PartialEq)]
enum Block {
	Heading(usize, String),
	Paragraph(Vec<String>),
	List(ListKind, Vec<String>),
	Code(Option<String>, Vec<String>),
}

// The patterns are literals, so compiling them cannot fail at runtime.
static HEADING: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^(#{1,6}) (.*)$").expect("valid regex"));
static UNORDERED_ITEM: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^[-*] (.*)$").expect("valid regex"));
static ORDERED_ITEM: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"^\d+\. (.*)$").expect("valid regex"));
static CODE_SPAN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"`([^`]+)`").expect("valid regex"));
static IMAGE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]*)\)").expect("valid regex"));
static LINK: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\(([^)]*)\)").expect("valid regex"));
static BOLD: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("valid regex"));
static ITALIC: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"\*(.+?)\*").expect("valid regex"));
static PLACEHOLDER: LazyLock<Regex> =
	LazyLock::new(|| Regex::new("\u{0}(\\d+)\u{0}").expect("valid regex"));

/// Render markdown to HTML with the built-in renderer.
///
/// Supports ATX headings, fenced code, `-`/`*`/numbered lists, paragraphs,
/// code spans, images, links, bold and italic. There is no HTML escaping
/// outside of code.
pub fn render_markdown(markdown: &str) -> String {
	let normalized = markdown.replace("\r\n", "\n");
	let blocks = parse_blocks(&normalized);

	blocks
		.iter()
		.map(render_block)
		.collect::<Vec<_>>()
		.join("\n")
}

fn parse_blocks(source: &str) -> Vec<Block> {
	let mut blocks = Vec::new();
	let mut lines = source.lines();

	while let Some(line) = lines.next() {
		if let Some(info) = line.strip_prefix("```") {
			let language = Some(info.trim().to_string()).filter(|lang| !lang.is_empty());
			let mut code = Vec::new();
			for code_line in lines.by_ref() {
				if code_line.trim_end() == "```" {
					break;
				}
				code.push(code_line.to_string());
			}
			blocks.push(Block::Code(language, code));
			continue;
		}

		if line.trim().is_empty() {
			// A blank line ends the current paragraph. Lists continue across
			// blank lines until a non-item line appears.
			if matches!(blocks.last(), Some(Block::Paragraph(lines)) if !lines.is_empty()) {
				blocks.push(Block::Paragraph(vec![]));
			}
			continue;
		}

		if let Some(captures) = HEADING.captures(line) {
			blocks.push(Block::Heading(captures[1].len(), captures[2].trim().to_string()));
			continue;
		}

		let item = UNORDERED_ITEM
			.captures(line)
			.map(|captures| (ListKind::Unordered, captures[1].to_string()))
			.or_else(|| {
				ORDERED_ITEM
					.captures(line)
					.map(|captures| (ListKind::Ordered, captures[1].to_string()))
			});

		if let Some((kind, text)) = item {
			if let Some(Block::List(current, items)) = blocks.last_mut() {
				if *current == kind {
					items.push(text);
					continue;
				}
			}

			if matches!(blocks.last(), Some(Block::Paragraph(lines)) if lines.is_empty()) {
				blocks.pop();
			}
			blocks.push(Block::List(kind, vec![text]));
			continue;
		}

		match blocks.last_mut() {
			Some(Block::Paragraph(lines)) => lines.push(line.to_string()),
			_ => blocks.push(Block::Paragraph(vec![line.to_string()])),
		}
	}

	// Empty paragraphs are only separators.
	blocks.retain(|block| !matches!(block, Block::Paragraph(lines) if lines.is_empty()));
	blocks
}

fn render_block(block: &Block) -> String {
	match block {
		Block::Heading(level, text) => format!("<h{level}>{}</h{level}>", render_inline(text)),
		Block::Paragraph(lines) => format!("<p>{}</p>", render_inline(&lines.join("\n"))),
		Block::List(kind, items) => {
			let items: String = items
				.iter()
				.map(|item| format!("<li>{}</li>", render_inline(item)))
				.collect();
			format!("<{tag}>{items}</{tag}>", tag = kind.tag())
		}
		Block::Code(language, lines) => {
			let class = language
				.as_ref()
				.map(|lang| format!(" class=\"language-{}\"", escape_html(lang)))
				.unwrap_or_default();
			format!(
				"<pre><code{class}>{}</code></pre>",
				escape_html(&lines.join("\n"))
			)
		}
	}
}

/// Apply the inline substitutions in order. Code spans are swapped for
/// placeholders first so later rules cannot reach inside them.
fn render_inline(text: &str) -> String {
	let mut spans = Vec::new();
	let html = CODE_SPAN.replace_all(text, |captures: &Captures| {
		spans.push(format!("<code>{}</code>", escape_html(&captures[1])));
		format!("\u{0}{}\u{0}", spans.len() - 1)
	});
	let html = IMAGE.replace_all(&html, r#"<img src="$2" alt="$1">"#);
	let html = LINK.replace_all(&html, r#"<a href="$2">$1</a>"#);
	let html = BOLD.replace_all(&html, "<strong>$1</strong>");
	let html = ITALIC.replace_all(&html, "<em>$1</em>");

	PLACEHOLDER
		.replace_all(&html, |captures: &Captures| {
			captures[1]
				.parse::<usize>()
				.ok()
				.and_then(|index| spans.get(index))
				.cloned()
				.unwrap_or_default()
		})
		.into_owned()
}

/// Escape the characters that would otherwise start markup.
pub fn escape_html(text: &str) -> String {
	let mut escaped = String::with_capacity(text.len());
	for ch in text.chars() {
		match ch {
			'&' => escaped.push_str("&amp;"),
			'<' => escaped.push_str("&lt;"),
			'>' => escaped.push_str("&gt;"),
			other => escaped.push(other),
		}
	}
	escaped
}
