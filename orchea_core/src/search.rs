use serde::Serialize;

use crate::OrcheaResult;
use crate::repository::Repository;
use crate::repository::Snippet;
use crate::repository::default_title;

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 100;
/// Longer queries are cut to this many characters.
pub const MAX_QUERY_LENGTH: usize = 100;
/// Maximum length of a result snippet, in characters.
pub const SNIPPET_LENGTH: usize = 160;

const TITLE_SCORE: usize = 4;
const LABEL_SCORE: usize = 3;
const FILENAME_SCORE: usize = 2;
const CONTENT_SCORE: usize = 1;
const MAX_CONTENT_BONUS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
	pub filename: String,
	pub title: String,
	pub labels: Vec<String>,
	pub score: usize,
	/// Which fields matched: `title`, `labels`, `filename`, `content`.
	pub matched: Vec<&'static str>,
	/// The first content line containing the query.
	pub snippet: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
	pub query: String,
	pub results: Vec<SearchHit>,
	pub has_more: bool,
	/// Number of matches before truncation.
	pub total: usize,
}

/// Search the snippets of a repository.
pub fn search(
	repository: &Repository,
	query: &str,
	limit: Option<usize>,
) -> OrcheaResult<SearchResults> {
	let snippets = repository.snippets()?;
	let results = search_snippets(&snippets, query, limit);
	tracing::debug!(query = %results.query, total = results.total, "search complete");
	Ok(results)
}

/// Case-insensitive substring search over filename, title, labels and
/// content, best matches first.
pub fn search_snippets(snippets: &[Snippet], query: &str, limit: Option<usize>) -> SearchResults {
	let query: String = query.trim().chars().take(MAX_QUERY_LENGTH).collect();
	let limit = limit
		.unwrap_or(DEFAULT_SEARCH_LIMIT)
		.clamp(1, MAX_SEARCH_LIMIT);

	if query.is_empty() {
		return SearchResults {
			query,
			..SearchResults::default()
		};
	}

	let needle = query.to_lowercase();
	let mut hits: Vec<SearchHit> = snippets
		.iter()
		.filter_map(|snippet| score_snippet(snippet, &needle))
		.collect();

	hits.sort_by(|a, b| {
		b.score
			.cmp(&a.score)
			.then_with(|| a.filename.cmp(&b.filename))
	});

	let total = hits.len();
	hits.truncate(limit);

	SearchResults {
		query,
		results: hits,
		has_more: total > limit,
		total,
	}
}

fn score_snippet(snippet: &Snippet, needle: &str) -> Option<SearchHit> {
	let (title, labels) = snippet.config.as_ref().map_or_else(
		|| (default_title(&snippet.filename), vec![]),
		|config| (config.title.clone(), config.labels.clone()),
	);

	let mut score = 0;
	let mut matched = Vec::new();

	if title.to_lowercase().contains(needle) {
		score += TITLE_SCORE;
		matched.push("title");
	}

	if labels
		.iter()
		.any(|label| label.to_lowercase().contains(needle))
	{
		score += LABEL_SCORE;
		matched.push("labels");
	}

	if snippet.filename.to_lowercase().contains(needle) {
		score += FILENAME_SCORE;
		matched.push("filename");
	}

	let occurrences = snippet.content.to_lowercase().matches(needle).count();
	if occurrences > 0 {
		score += CONTENT_SCORE + occurrences.min(MAX_CONTENT_BONUS);
		matched.push("content");
	}

	if score == 0 {
		return None;
	}

	Some(SearchHit {
		filename: snippet.filename.clone(),
		title,
		labels,
		score,
		matched,
		snippet: content_snippet(&snippet.content, needle),
	})
}

/// The first line containing `needle`, cut to [`SNIPPET_LENGTH`] characters
/// around the match.
fn content_snippet(content: &str, needle: &str) -> Option<String> {
	let line = content
		.lines()
		.find(|line| line.to_lowercase().contains(needle))?
		.trim();
	let chars: Vec<char> = line.chars().collect();

	if chars.len() <= SNIPPET_LENGTH {
		return Some(line.to_string());
	}

	let lowered = line.to_lowercase();
	let at = lowered
		.find(needle)
		.map_or(0, |byte| lowered[..byte].chars().count());
	let start = at
		.saturating_sub(SNIPPET_LENGTH / 4)
		.min(chars.len() - SNIPPET_LENGTH);

	Some(chars[start..start + SNIPPET_LENGTH].iter().collect())
}
