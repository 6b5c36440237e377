use miette::Diagnostic;
use thiserror::Error;

/// Broad classification of an [`OrcheaError`], used by the HTTP layer to pick
/// a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	/// The request was malformed (bad filename, missing field, ...).
	Invalid,
	/// The file or document does not exist.
	NotFound,
	/// The file or document already exists.
	Conflict,
	/// Anything else, usually an I/O failure.
	Internal,
}

#[derive(Debug, Diagnostic, Error)]
#[non_exhaustive]
pub enum OrcheaError {
	#[error(transparent)]
	#[diagnostic(code(orchea::io_error))]
	Io(#[from] std::io::Error),

	#[error("invalid filename `{0}` - only {1} files allowed")]
	#[diagnostic(
		code(orchea::invalid_filename),
		help("filenames must not contain `..`, `/` or `\\`")
	)]
	InvalidFilename(String, String),

	#[error("invalid document slug `{0}`")]
	#[diagnostic(
		code(orchea::invalid_slug),
		help("slugs are kebab-case: lowercase letters, digits and hyphens")
	)]
	InvalidSlug(String),

	#[error("missing required fields: {0}")]
	#[diagnostic(code(orchea::missing_fields))]
	MissingFields(String),

	#[error("{0}")]
	#[diagnostic(code(orchea::invalid_request))]
	InvalidRequest(String),

	#[error("file not found: `{0}`")]
	#[diagnostic(code(orchea::file_not_found))]
	FileNotFound(String),

	#[error("file already exists: `{0}`")]
	#[diagnostic(code(orchea::file_exists))]
	FileExists(String),

	#[error("document not found: `{0}`")]
	#[diagnostic(
		code(orchea::document_not_found),
		help("run `orchea list` to see the available documents")
	)]
	DocumentNotFound(String),

	#[error("document already exists: `{0}`")]
	#[diagnostic(code(orchea::document_exists))]
	DocumentExists(String),

	#[error("failed to parse config file: {0}")]
	#[diagnostic(
		code(orchea::config_parse),
		help("check that orchea.toml is valid TOML with [server], [paths] and/or [render] sections")
	)]
	ConfigParse(String),

	#[error("template rendering failed: {0}")]
	#[diagnostic(code(orchea::template_render))]
	TemplateRender(String),

	#[error("failed to render markdown: {0}")]
	#[diagnostic(code(orchea::markdown))]
	Markdown(String),

	#[error("unknown render flavor: `{0}`")]
	#[diagnostic(code(orchea::unknown_flavor), help("available flavors: simple, commonmark"))]
	UnknownFlavor(String),
}

impl OrcheaError {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::InvalidFilename(..)
			| Self::InvalidSlug(_)
			| Self::MissingFields(_)
			| Self::InvalidRequest(_)
			| Self::UnknownFlavor(_) => ErrorKind::Invalid,
			Self::FileNotFound(_) | Self::DocumentNotFound(_) => ErrorKind::NotFound,
			Self::FileExists(_) | Self::DocumentExists(_) => ErrorKind::Conflict,
			Self::Io(error) if error.kind() == std::io::ErrorKind::NotFound => ErrorKind::NotFound,
			Self::Io(_) | Self::ConfigParse(_) | Self::TemplateRender(_) | Self::Markdown(_) => {
				ErrorKind::Internal
			}
		}
	}
}

pub type OrcheaResult<T> = Result<T, OrcheaError>;
pub type AnyError = Box<dyn std::error::Error>;
pub type AnyEmptyResult = Result<(), AnyError>;
pub type AnyResult<T> = Result<T, AnyError>;
