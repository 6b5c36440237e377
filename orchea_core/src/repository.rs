//! The snippet repository: a flat directory of markdown files, each with an
//! optional YAML sidecar holding its title and labels.

use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use chrono::SecondsFormat;
use chrono::Utc;
use serde::Serialize;

use crate::OrcheaError;
use crate::OrcheaResult;
use crate::manifest::Manifest;
use crate::manifest::flow_list;
use crate::manifest::parse_manifest;
use crate::manifest::quote;

/// Label given to snippets that have not been labelled yet.
pub const DEFAULT_LABEL: &str = "Document";

/// The kinds of files the repository stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
	Markdown,
	Yaml,
}

impl FileKind {
	pub fn extension(self) -> &'static str {
		match self {
			Self::Markdown => ".md",
			Self::Yaml => ".yaml",
		}
	}

	pub fn of(name: &str) -> Option<Self> {
		if name.ends_with(".md") {
			Some(Self::Markdown)
		} else if name.ends_with(".yaml") {
			Some(Self::Yaml)
		} else {
			None
		}
	}
}

/// Check that `name` is a bare file name with one of the `allowed` kinds.
pub fn validate_filename(name: &str, allowed: &[FileKind]) -> OrcheaResult<FileKind> {
	let invalid = || {
		let kinds: Vec<&str> = allowed.iter().map(|kind| kind.extension()).collect();
		OrcheaError::InvalidFilename(name.to_string(), kinds.join(" and "))
	};

	if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
		return Err(invalid());
	}

	FileKind::of(name)
		.filter(|kind| allowed.contains(kind))
		.ok_or_else(invalid)
}

/// Name of the sidecar config belonging to a markdown file.
pub fn sidecar_name(markdown_file: &str) -> String {
	let stem = markdown_file
		.strip_suffix(".md")
		.unwrap_or(markdown_file);
	format!("{stem}.yaml")
}

/// Name of the markdown file a sidecar config describes.
pub fn markdown_name(sidecar: &str) -> String {
	let stem = sidecar.strip_suffix(".yaml").unwrap_or(sidecar);
	format!("{stem}.md")
}

/// Title derived from a file name: `getting-started.md` → `Getting started`.
pub fn default_title(filename: &str) -> String {
	let stem = filename.strip_suffix(".md").unwrap_or(filename);
	let spaced = stem.replace('-', " ");
	let mut chars = spaced.chars();
	match chars.next() {
		Some(first) => first.to_uppercase().chain(chars).collect(),
		None => String::new(),
	}
}

/// Current time as an RFC 3339 timestamp with millisecond precision.
pub fn timestamp() -> String {
	Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The sidecar config of a markdown snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileConfig {
	pub title: String,
	pub labels: Vec<String>,
	#[serde(rename = "lastUpdate")]
	pub last_update: Option<String>,
}

impl FileConfig {
	/// The config written for a snippet that has none.
	pub fn for_file(filename: &str) -> Self {
		Self {
			title: default_title(filename),
			labels: vec![DEFAULT_LABEL.to_string()],
			last_update: Some(timestamp()),
		}
	}

	/// Read a config from a parsed sidecar. Both the `labels` list and the
	/// legacy single `label` value are understood.
	pub fn from_manifest(manifest: &Manifest, filename: &str) -> Self {
		let title = manifest
			.get_str("title")
			.map_or_else(|| default_title(filename), str::to_string);
		let labels = manifest
			.get_list("labels")
			.filter(|labels| !labels.is_empty())
			.or_else(|| manifest.get_list("label"))
			.unwrap_or_default();
		let last_update = manifest.get_str("lastUpdate").map(str::to_string);

		Self {
			title,
			labels,
			last_update,
		}
	}

	pub fn to_yaml(&self) -> String {
		let mut yaml = String::from("# File Configuration\n");
		yaml.push_str(&format!("title: {}\n", quote(&self.title)));
		yaml.push_str(&format!("labels: {}\n", flow_list(&self.labels)));
		if let Some(last_update) = &self.last_update {
			yaml.push_str(&format!("lastUpdate: {}\n", quote(last_update)));
		}
		yaml
	}
}

/// Labels as sent by a client: either `"a, b"` or `["a", "b"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelsInput {
	Delimited(String),
	List(Vec<String>),
}

impl LabelsInput {
	/// Trimmed, non-empty labels.
	pub fn normalize(&self) -> Vec<String> {
		let labels: Box<dyn Iterator<Item = &str>> = match self {
			Self::Delimited(text) => Box::new(text.split(',')),
			Self::List(items) => Box::new(items.iter().map(String::as_str)),
		};

		labels
			.map(str::trim)
			.filter(|label| !label.is_empty())
			.map(str::to_string)
			.collect()
	}
}

/// A markdown snippet loaded with its config, used by search.
#[derive(Debug, Clone)]
pub struct Snippet {
	pub filename: String,
	pub config: Option<FileConfig>,
	pub content: String,
}

/// Resets the auto-create guard when dropped.
struct AutoCreateGuard<'a>(&'a AtomicBool);

impl Drop for AutoCreateGuard<'_> {
	fn drop(&mut self) {
		self.0.store(false, Ordering::SeqCst);
	}
}

/// Handle on the snippet directory. Clones share the auto-create guard.
#[derive(Debug, Clone)]
pub struct Repository {
	root: PathBuf,
	auto_creating: Arc<AtomicBool>,
}

impl Repository {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			auto_creating: Arc::new(AtomicBool::new(false)),
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn path_of(&self, name: &str) -> PathBuf {
		self.root.join(name)
	}

	fn list_with_suffix(&self, suffix: &str) -> OrcheaResult<Vec<String>> {
		let entries = match std::fs::read_dir(&self.root) {
			Ok(entries) => entries,
			Err(error) if error.kind() == IoErrorKind::NotFound => {
				tracing::debug!(path = %self.root.display(), "repository directory missing");
				return Ok(vec![]);
			}
			Err(error) => return Err(error.into()),
		};

		let mut names = Vec::new();
		for entry in entries {
			let entry = entry?;
			if !entry.file_type()?.is_file() {
				continue;
			}
			let name = entry.file_name().to_string_lossy().to_string();
			if name.ends_with(suffix) {
				names.push(name);
			}
		}
		names.sort();

		Ok(names)
	}

	/// Sorted markdown file names. With `auto_create`, sidecars missing for
	/// any of them are written first.
	pub fn list_files(&self, auto_create: bool) -> OrcheaResult<Vec<String>> {
		let files = self.list_with_suffix(".md")?;

		if auto_create {
			if self
				.auto_creating
				.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
				.is_ok()
			{
				let _guard = AutoCreateGuard(&self.auto_creating);
				self.create_missing_configs(&files);
			} else {
				tracing::info!("auto-creation already in progress, skipping duplicate request");
			}
		}

		Ok(files)
	}

	/// Sorted sidecar file names.
	pub fn list_sidecars(&self) -> OrcheaResult<Vec<String>> {
		self.list_with_suffix(".yaml")
	}

	fn create_missing_configs(&self, files: &[String]) {
		tracing::info!("auto-creating missing YAML configs for all markdown files");

		let created = files
			.iter()
			.filter(|file| match self.ensure_config(file) {
				Ok(created) => created,
				Err(error) => {
					tracing::error!(file = %file, %error, "failed to create YAML config");
					false
				}
			})
			.count();

		if created > 0 {
			tracing::info!(created, "auto-creation complete");
		} else {
			tracing::info!("auto-creation complete: all YAML configs already exist");
		}
	}

	/// Write a default sidecar for `markdown_file` unless one exists. Returns
	/// whether a file was written.
	pub fn ensure_config(&self, markdown_file: &str) -> OrcheaResult<bool> {
		let config_name = sidecar_name(markdown_file);
		let config_path = self.path_of(&config_name);

		if config_path.exists() {
			tracing::debug!(file = %markdown_file, "YAML config exists");
			return Ok(false);
		}

		tracing::info!(file = %markdown_file, "creating missing YAML config");
		std::fs::write(&config_path, FileConfig::for_file(markdown_file).to_yaml())?;
		tracing::info!(config = %config_name, "YAML config created");

		Ok(true)
	}

	/// Read a markdown or YAML file. Reading markdown makes sure its sidecar
	/// exists.
	pub fn read_file(&self, name: &str) -> OrcheaResult<String> {
		let kind = validate_filename(name, &[FileKind::Markdown, FileKind::Yaml])?;
		let path = self.path_of(name);

		if kind == FileKind::Markdown && path.is_file() {
			if let Err(error) = self.ensure_config(name) {
				tracing::error!(file = %name, %error, "failed to create YAML config");
			}
		}

		std::fs::read_to_string(&path).map_err(|error| not_found_or(error, name))
	}

	/// Overwrite a file, keeping the previous markdown content in
	/// `.<name>.backup`. Returns the save timestamp.
	pub fn save_file(&self, name: &str, content: &str) -> OrcheaResult<String> {
		let kind = validate_filename(name, &[FileKind::Markdown, FileKind::Yaml])?;
		let path = self.path_of(name);

		if kind == FileKind::Markdown {
			let backup = self.path_of(&format!(".{name}.backup"));
			if let Err(error) = std::fs::copy(&path, &backup) {
				tracing::info!(file = %name, %error, "no existing file to backup or backup failed");
			}
		}

		std::fs::write(&path, content)?;
		tracing::info!(file = %name, "file saved");

		Ok(timestamp())
	}

	/// Create a new file. Markdown files get a default sidecar unless one
	/// already exists. Returns the creation timestamp.
	pub fn create_file(&self, name: &str, content: &str) -> OrcheaResult<String> {
		let kind = validate_filename(name, &[FileKind::Markdown, FileKind::Yaml])?;
		let path = self.path_of(name);

		if path.exists() {
			return Err(OrcheaError::FileExists(name.to_string()));
		}

		std::fs::create_dir_all(&self.root)?;
		std::fs::write(&path, content)?;

		if kind == FileKind::Markdown {
			if let Err(error) = self.ensure_config(name) {
				tracing::error!(file = %name, %error, "failed to create YAML config");
			}
		}

		tracing::info!(file = %name, "new file created");

		Ok(timestamp())
	}

	/// Delete a file. A markdown file's sidecar is kept.
	pub fn delete_file(&self, name: &str) -> OrcheaResult<()> {
		validate_filename(name, &[FileKind::Markdown, FileKind::Yaml])?;
		std::fs::remove_file(self.path_of(name)).map_err(|error| not_found_or(error, name))?;
		tracing::info!(file = %name, "file deleted");

		Ok(())
	}

	/// Replace the sidecar of a markdown file with a new title and labels.
	/// Returns the sidecar name and the written config.
	pub fn update_file_config(
		&self,
		name: &str,
		title: &str,
		labels: &LabelsInput,
	) -> OrcheaResult<(String, FileConfig)> {
		validate_filename(name, &[FileKind::Markdown])?;

		if title.trim().is_empty() {
			return Err(OrcheaError::MissingFields("title, labels".to_string()));
		}

		let labels = labels.normalize();
		if labels.is_empty() {
			return Err(OrcheaError::InvalidRequest(
				"at least one label is required".to_string(),
			));
		}

		let config_name = sidecar_name(name);
		let config = FileConfig {
			title: title.to_string(),
			labels,
			last_update: Some(timestamp()),
		};

		std::fs::write(self.path_of(&config_name), config.to_yaml())?;
		tracing::info!(config = %config_name, "YAML config updated");

		Ok((config_name, config))
	}

	/// Parsed sidecar of a markdown file, if it has one.
	pub fn load_config(&self, markdown_file: &str) -> OrcheaResult<Option<FileConfig>> {
		let path = self.path_of(&sidecar_name(markdown_file));
		match std::fs::read_to_string(path) {
			Ok(text) => Ok(Some(FileConfig::from_manifest(
				&parse_manifest(&text),
				markdown_file,
			))),
			Err(error) if error.kind() == IoErrorKind::NotFound => Ok(None),
			Err(error) => Err(error.into()),
		}
	}

	/// Every markdown snippet with its config and content. Unreadable files
	/// are skipped.
	pub fn snippets(&self) -> OrcheaResult<Vec<Snippet>> {
		let mut snippets = Vec::new();

		for filename in self.list_files(false)? {
			let content = match std::fs::read_to_string(self.path_of(&filename)) {
				Ok(content) => content,
				Err(error) => {
					tracing::warn!(file = %filename, %error, "could not read snippet");
					continue;
				}
			};
			let config = self.load_config(&filename).unwrap_or_else(|error| {
				tracing::warn!(file = %filename, %error, "could not read snippet config");
				None
			});

			snippets.push(Snippet {
				filename,
				config,
				content,
			});
		}

		Ok(snippets)
	}
}

fn not_found_or(error: std::io::Error, name: &str) -> OrcheaError {
	if error.kind() == IoErrorKind::NotFound {
		OrcheaError::FileNotFound(name.to_string())
	} else {
		error.into()
	}
}
