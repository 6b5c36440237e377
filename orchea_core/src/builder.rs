use serde::Serialize;

use crate::OrcheaResult;
use crate::documents::Documents;
use crate::render::Flavor;
use crate::render::render;
use crate::repository::FileKind;
use crate::repository::Repository;
use crate::repository::validate_filename;

/// A document assembled from its snippets and rendered to HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuiltDocument {
	pub slug: String,
	pub title: String,
	pub version: String,
	pub date: String,
	pub html: String,
	/// Snippets listed in the manifest that could not be loaded.
	pub missing: Vec<String>,
}

impl BuiltDocument {
	pub fn is_complete(&self) -> bool {
		self.missing.is_empty()
	}
}

/// Markdown shown in place of a snippet that could not be loaded.
pub fn missing_snippet(filename: &str) -> String {
	format!("# Error\n\nCould not load file: {filename}")
}

/// Concatenate the snippets of a document in manifest order and render them.
pub fn build_document(
	repository: &Repository,
	documents: &Documents,
	slug: &str,
	flavor: Flavor,
) -> OrcheaResult<BuiltDocument> {
	let (manifest, _) = documents.load_manifest(slug)?;
	let mut combined = String::new();
	let mut missing = Vec::new();

	for filename in &manifest.markdown_files {
		let content = validate_filename(filename, &[FileKind::Markdown])
			.and_then(|_| std::fs::read_to_string(repository.path_of(filename)).map_err(Into::into));

		match content {
			Ok(content) => combined.push_str(&content),
			Err(error) => {
				tracing::warn!(%slug, file = %filename, %error, "could not load markdown file");
				combined.push_str(&missing_snippet(filename));
				missing.push(filename.clone());
			}
		}
		combined.push_str("\n\n");
	}

	let html = render(&combined, flavor)?;
	tracing::debug!(%slug, snippets = manifest.markdown_files.len(), "document built");

	Ok(BuiltDocument {
		slug: slug.to_string(),
		title: manifest.document_title,
		version: manifest.version,
		date: manifest.date,
		html,
		missing,
	})
}
