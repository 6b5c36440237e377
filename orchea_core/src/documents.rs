//! Document directories: `documents/<slug>/config.yaml` lists the snippets
//! of a document, `documents/<slug>/index.html` displays it.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::OrcheaError;
use crate::OrcheaResult;
use crate::manifest::Manifest;
use crate::manifest::parse_manifest;
use crate::manifest::quote;
use crate::manifest::quote_item;
use crate::template::PageTemplates;

/// Manifest file inside each document directory.
pub const CONFIG_FILE: &str = "config.yaml";
/// Page written next to the manifest.
pub const INDEX_FILE: &str = "index.html";
/// Longest slug `kebab_slug` produces.
pub const MAX_SLUG_LENGTH: usize = 64;

const DEFAULT_VERSION: &str = "1.0";
const DEFAULT_DATE: &str = "Unknown";

/// Normalize free text into a kebab-case slug. Returns `None` when nothing
/// usable is left.
pub fn kebab_slug(input: &str) -> Option<String> {
	let lowered = input.to_lowercase();
	let cleaned: String = lowered
		.trim()
		.chars()
		.filter(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch.is_whitespace() || *ch == '-')
		.collect();

	let mut slug = String::with_capacity(cleaned.len());
	for ch in cleaned.chars() {
		let ch = if ch.is_whitespace() { '-' } else { ch };
		if ch == '-' && slug.ends_with('-') {
			continue;
		}
		slug.push(ch);
	}

	let slug: String = slug
		.trim_matches('-')
		.chars()
		.take(MAX_SLUG_LENGTH)
		.collect();

	Some(slug).filter(|slug| !slug.is_empty())
}

/// Reject slugs that could escape the documents directory.
pub fn validate_slug(slug: &str) -> OrcheaResult<()> {
	if slug.is_empty() || slug.contains("..") || slug.contains('/') || slug.contains('\\') {
		return Err(OrcheaError::InvalidSlug(slug.to_string()));
	}

	Ok(())
}

/// The parsed `config.yaml` of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentManifest {
	pub document_title: String,
	pub version: String,
	pub date: String,
	pub markdown_files: Vec<String>,
}

impl DocumentManifest {
	/// Read a manifest, filling in defaults for missing keys.
	pub fn from_manifest(manifest: &Manifest, slug: &str) -> Self {
		let document_title = manifest
			.get_str("document_title")
			.or_else(|| manifest.get_str("title"))
			.unwrap_or(slug)
			.to_string();

		Self {
			document_title,
			version: manifest
				.get_str("version")
				.unwrap_or(DEFAULT_VERSION)
				.to_string(),
			date: manifest.get_str("date").unwrap_or(DEFAULT_DATE).to_string(),
			markdown_files: manifest.get_list("markdown_files").unwrap_or_default(),
		}
	}

	pub fn to_yaml(&self) -> String {
		let mut yaml = format!(
			"document_title: {}\nversion: {}\ndate: {}\nmarkdown_files:\n",
			quote(&self.document_title),
			quote(&self.version),
			quote(&self.date),
		);
		for file in &self.markdown_files {
			yaml.push_str(&format!("  - {}\n", quote_item(file)));
		}
		yaml
	}
}

/// Body of a create or update request. Every field is checked by
/// [`DocumentRequest::into_manifest`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentRequest {
	#[serde(default)]
	pub slug: Option<String>,
	#[serde(default)]
	pub title: Option<String>,
	#[serde(default)]
	pub version: Option<String>,
	#[serde(default)]
	pub date: Option<String>,
	#[serde(default)]
	pub markdown_files: Option<Vec<String>>,
}

impl DocumentRequest {
	/// Validate the required fields and build the manifest to write.
	pub fn into_manifest(self) -> OrcheaResult<DocumentManifest> {
		let present = |value: Option<String>| value.filter(|value| !value.is_empty());

		match (
			present(self.title),
			present(self.version),
			present(self.date),
			self.markdown_files,
		) {
			(Some(document_title), Some(version), Some(date), Some(markdown_files)) => {
				Ok(DocumentManifest {
					document_title,
					version,
					date,
					markdown_files,
				})
			}
			_ => Err(OrcheaError::MissingFields(
				"title, version, date, markdown_files".to_string(),
			)),
		}
	}
}

/// A row of the document listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentSummary {
	pub slug: String,
	pub title: String,
	pub version: String,
	pub date: String,
	pub path: String,
}

/// Full configuration of one document, including the raw manifest text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentConfig {
	pub slug: String,
	pub document_title: String,
	/// Same as `document_title`.
	pub title: String,
	pub version: String,
	pub date: String,
	pub markdown_files: Vec<String>,
	pub path: String,
	pub raw_yaml: String,
}

/// Path of a document relative to the project root, as reported to clients.
pub fn document_path(slug: &str) -> String {
	format!("documents/{slug}")
}

/// Handle on the documents directory.
#[derive(Debug, Clone)]
pub struct Documents {
	root: PathBuf,
	templates: PageTemplates,
}

impl Documents {
	pub fn new(root: impl Into<PathBuf>, templates: PageTemplates) -> Self {
		Self {
			root: root.into(),
			templates,
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn templates(&self) -> &PageTemplates {
		&self.templates
	}

	pub fn dir(&self, slug: &str) -> PathBuf {
		self.root.join(slug)
	}

	fn existing_dir(&self, slug: &str) -> OrcheaResult<PathBuf> {
		validate_slug(slug)?;
		let dir = self.dir(slug);
		if !dir.is_dir() {
			return Err(OrcheaError::DocumentNotFound(slug.to_string()));
		}
		Ok(dir)
	}

	/// Write `config.yaml`, then `index.html`. The page is rendered before
	/// anything is written so a broken template leaves no partial document.
	fn write_files(&self, dir: &Path, slug: &str, manifest: &DocumentManifest) -> OrcheaResult<()> {
		let index = self
			.templates
			.render_index(slug, &manifest.document_title)?;

		std::fs::create_dir_all(dir)?;
		std::fs::write(dir.join(CONFIG_FILE), manifest.to_yaml())?;
		std::fs::write(dir.join(INDEX_FILE), index)?;

		Ok(())
	}

	/// Create a new document. The requested slug is normalized first and the
	/// normalized slug is returned.
	pub fn create(&self, mut request: DocumentRequest) -> OrcheaResult<String> {
		let raw_slug = request
			.slug
			.take()
			.filter(|slug| !slug.is_empty())
			.ok_or_else(|| {
				OrcheaError::MissingFields("slug, title, version, date, markdown_files".to_string())
			})?;
		let manifest = request.into_manifest().map_err(|_| {
			OrcheaError::MissingFields("slug, title, version, date, markdown_files".to_string())
		})?;

		let slug = kebab_slug(&raw_slug).ok_or_else(|| OrcheaError::InvalidSlug(raw_slug.clone()))?;
		validate_slug(&slug)?;

		let dir = self.dir(&slug);
		if dir.exists() {
			return Err(OrcheaError::DocumentExists(slug));
		}

		self.write_files(&dir, &slug, &manifest)?;
		tracing::info!(%slug, "document created");

		Ok(slug)
	}

	/// All documents with a readable manifest, sorted by slug.
	pub fn list(&self) -> OrcheaResult<Vec<DocumentSummary>> {
		let entries = match std::fs::read_dir(&self.root) {
			Ok(entries) => entries,
			Err(error) if error.kind() == IoErrorKind::NotFound => return Ok(vec![]),
			Err(error) => return Err(error.into()),
		};

		let mut documents = Vec::new();
		for entry in entries {
			let entry = entry?;
			if !entry.file_type()?.is_dir() {
				continue;
			}

			let slug = entry.file_name().to_string_lossy().to_string();
			let text = match std::fs::read_to_string(entry.path().join(CONFIG_FILE)) {
				Ok(text) => text,
				Err(error) => {
					tracing::warn!(%slug, %error, "could not read config for document");
					continue;
				}
			};

			let manifest = DocumentManifest::from_manifest(&parse_manifest(&text), &slug);
			documents.push(DocumentSummary {
				path: document_path(&slug),
				title: manifest.document_title,
				version: manifest.version,
				date: manifest.date,
				slug,
			});
		}

		documents.sort_by(|a, b| a.slug.cmp(&b.slug));
		Ok(documents)
	}

	/// Parsed manifest of an existing document.
	pub fn load_manifest(&self, slug: &str) -> OrcheaResult<(DocumentManifest, String)> {
		let dir = self.existing_dir(slug)?;
		let raw = std::fs::read_to_string(dir.join(CONFIG_FILE))?;
		let manifest = DocumentManifest::from_manifest(&parse_manifest(&raw), slug);
		Ok((manifest, raw))
	}

	pub fn get_config(&self, slug: &str) -> OrcheaResult<DocumentConfig> {
		let (manifest, raw_yaml) = self.load_manifest(slug)?;
		tracing::debug!(%slug, "config fetched for document");

		Ok(DocumentConfig {
			slug: slug.to_string(),
			title: manifest.document_title.clone(),
			document_title: manifest.document_title,
			version: manifest.version,
			date: manifest.date,
			markdown_files: manifest.markdown_files,
			path: document_path(slug),
			raw_yaml,
		})
	}

	/// Rewrite the manifest and regenerate the page of an existing document.
	pub fn update(&self, slug: &str, request: DocumentRequest) -> OrcheaResult<DocumentManifest> {
		let manifest = request.into_manifest()?;
		let dir = self.existing_dir(slug)?;

		self.write_files(&dir, slug, &manifest)?;
		tracing::info!(%slug, "document config updated");

		Ok(manifest)
	}

	/// Remove a document directory and everything in it.
	pub fn delete(&self, slug: &str) -> OrcheaResult<()> {
		let dir = self.existing_dir(slug)?;
		std::fs::remove_dir_all(dir)?;
		tracing::info!(%slug, "document deleted");

		Ok(())
	}
}
