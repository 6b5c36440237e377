use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::OrcheaError;
use crate::OrcheaResult;
use crate::render::Flavor;

/// Default port of the API server.
pub const DEFAULT_PORT: u16 = 3000;

/// Number of ports after the configured one that are tried when it is taken.
pub const DEFAULT_FALLBACK_PORTS: u16 = 10;

/// Supported config file locations in discovery order (highest precedence
/// first).
pub const CONFIG_FILE_CANDIDATES: [&str; 3] =
	["orchea.toml", ".orchea.toml", ".config/orchea.toml"];

/// File name of the page template inside the templates directory.
pub const DOCUMENT_TEMPLATE_FILE: &str = "document-index.html";

/// Configuration loaded from an `orchea.toml` file.
///
/// ```toml
/// [server]
/// host = "127.0.0.1"
/// port = 3000
/// fallback_ports = 10
/// static_dir = "."
///
/// [paths]
/// repository = "repository"
/// documents = "documents"
/// templates = "templates"
///
/// [render]
/// flavor = "simple"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrcheaConfig {
	#[serde(default)]
	pub server: ServerConfig,
	#[serde(default)]
	pub paths: PathsConfig,
	#[serde(default)]
	pub render: RenderConfig,
}

/// Settings for `orchea serve`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
	#[serde(default = "default_host")]
	pub host: String,
	/// Overridden by the `PORT` environment variable.
	#[serde(default = "default_port")]
	pub port: u16,
	/// How many of the following ports to try when `port` is in use. `0`
	/// disables the fallback.
	#[serde(default = "default_fallback_ports")]
	pub fallback_ports: u16,
	/// Directory served for every non-API path, relative to the project root.
	#[serde(default = "default_static_dir")]
	pub static_dir: PathBuf,
}

impl Default for ServerConfig {
	fn default() -> Self {
		Self {
			host: default_host(),
			port: default_port(),
			fallback_ports: default_fallback_ports(),
			static_dir: default_static_dir(),
		}
	}
}

/// Locations of the snippet repository, the documents and the templates,
/// relative to the project root.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
	#[serde(default = "default_repository")]
	pub repository: PathBuf,
	#[serde(default = "default_documents")]
	pub documents: PathBuf,
	#[serde(default = "default_templates")]
	pub templates: PathBuf,
}

impl Default for PathsConfig {
	fn default() -> Self {
		Self {
			repository: default_repository(),
			documents: default_documents(),
			templates: default_templates(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RenderConfig {
	/// Renderer used when assembling documents.
	#[serde(default)]
	pub flavor: Flavor,
}

fn default_host() -> String {
	"127.0.0.1".to_string()
}

fn default_port() -> u16 {
	DEFAULT_PORT
}

fn default_fallback_ports() -> u16 {
	DEFAULT_FALLBACK_PORTS
}

fn default_static_dir() -> PathBuf {
	PathBuf::from(".")
}

fn default_repository() -> PathBuf {
	PathBuf::from("repository")
}

fn default_documents() -> PathBuf {
	PathBuf::from("documents")
}

fn default_templates() -> PathBuf {
	PathBuf::from("templates")
}

impl OrcheaConfig {
	/// Resolve the config path from known discovery candidates.
	#[must_use]
	pub fn resolve_path(root: &Path) -> Option<PathBuf> {
		CONFIG_FILE_CANDIDATES
			.iter()
			.map(|candidate| root.join(candidate))
			.find(|path| path.is_file())
	}

	/// Load the config from the first discovered config file at `root`.
	/// Returns `None` if the file does not exist.
	pub fn load(root: &Path) -> OrcheaResult<Option<OrcheaConfig>> {
		let Some(config_path) = Self::resolve_path(root) else {
			return Ok(None);
		};

		let content = std::fs::read_to_string(&config_path)?;
		let config = Self::parse(&content)?;

		Ok(Some(config))
	}

	pub fn parse(content: &str) -> OrcheaResult<OrcheaConfig> {
		toml::from_str(content).map_err(|e| OrcheaError::ConfigParse(e.to_string()))
	}

	/// Apply a `PORT` value taken from the environment. Unparseable values
	/// are ignored.
	pub fn apply_port_override(&mut self, port: Option<&str>) {
		if let Some(port) = port.and_then(|value| value.trim().parse::<u16>().ok()) {
			self.server.port = port;
		}
	}
}
