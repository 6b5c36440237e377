use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;

use serde::Serialize;

use crate::OrcheaResult;
use crate::manifest::parse_manifest;
use crate::repository::FileConfig;
use crate::repository::Repository;
use crate::repository::markdown_name;

/// A label and the snippets that carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tag {
	/// Spelling of the label as first seen.
	pub label: String,
	pub count: usize,
	pub files: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagStats {
	/// Every label occurrence across all sidecars.
	pub total_tags: usize,
	/// Distinct label spellings.
	pub unique_labels: usize,
	/// Sidecars that were read successfully.
	pub files_processed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagReport {
	pub tags: Vec<Tag>,
	pub stats: TagStats,
}

/// Aggregate the labels of every sidecar in the repository. Labels are
/// grouped case-insensitively; the result is ordered by usage, most used
/// first.
pub fn collect_tags(repository: &Repository) -> OrcheaResult<TagReport> {
	let mut grouped: BTreeMap<String, Tag> = BTreeMap::new();
	let mut spellings = BTreeSet::new();
	let mut stats = TagStats::default();

	for sidecar in repository.list_sidecars()? {
		let text = match std::fs::read_to_string(repository.path_of(&sidecar)) {
			Ok(text) => text,
			Err(error) => {
				tracing::warn!(file = %sidecar, %error, "could not parse YAML file");
				continue;
			}
		};

		let markdown_file = markdown_name(&sidecar);
		let config = FileConfig::from_manifest(&parse_manifest(&text), &markdown_file);

		for label in config.labels.iter().filter(|label| !label.is_empty()) {
			let tag = grouped
				.entry(label.to_lowercase())
				.or_insert_with(|| Tag {
					label: label.clone(),
					count: 0,
					files: vec![],
				});
			tag.count += 1;
			tag.files.push(markdown_file.clone());

			spellings.insert(label.clone());
			stats.total_tags += 1;
		}

		stats.files_processed += 1;
	}

	stats.unique_labels = spellings.len();

	let mut tags: Vec<Tag> = grouped.into_values().collect();
	// Stable, so ties keep the alphabetical order of the grouping keys.
	tags.sort_by(|a, b| b.count.cmp(&a.count));

	Ok(TagReport { tags, stats })
}

/// Files whose labels include at least one of `selected`. An empty selection
/// keeps every file; files without a config never match a selection.
#[allow(clippy::implicit_hasher)]
pub fn filter_by_tags<'a>(
	files: &'a [String],
	configs: &HashMap<String, FileConfig>,
	selected: &[String],
) -> Vec<&'a str> {
	if selected.is_empty() {
		return files.iter().map(String::as_str).collect();
	}

	files
		.iter()
		.filter(|file| {
			configs.get(file.as_str()).is_some_and(|config| {
				config
					.labels
					.iter()
					.any(|label| selected.iter().any(|tag| tag == label))
			})
		})
		.map(String::as_str)
		.collect()
}
