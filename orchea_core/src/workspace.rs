use std::path::Path;
use std::path::PathBuf;

use crate::OrcheaResult;
use crate::builder::BuiltDocument;
use crate::builder::build_document;
use crate::config::OrcheaConfig;
use crate::documents::Documents;
use crate::render::Flavor;
use crate::repository::Repository;
use crate::template::PageTemplates;

/// A project root together with its configuration and the stores it
/// describes.
#[derive(Debug, Clone)]
pub struct Workspace {
	root: PathBuf,
	config: OrcheaConfig,
	repository: Repository,
	documents: Documents,
}

impl Workspace {
	/// Open `root`, reading `orchea.toml` when there is one.
	pub fn open(root: impl Into<PathBuf>) -> OrcheaResult<Self> {
		let root = root.into();
		let config = OrcheaConfig::load(&root)?.unwrap_or_default();
		Ok(Self::with_config(root, config))
	}

	pub fn with_config(root: impl Into<PathBuf>, config: OrcheaConfig) -> Self {
		let root = root.into();
		let repository = Repository::new(root.join(&config.paths.repository));
		let templates = PageTemplates::new(root.join(&config.paths.templates));
		let documents = Documents::new(root.join(&config.paths.documents), templates);

		Self {
			root,
			config,
			repository,
			documents,
		}
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn config(&self) -> &OrcheaConfig {
		&self.config
	}

	pub fn config_mut(&mut self) -> &mut OrcheaConfig {
		&mut self.config
	}

	pub fn repository(&self) -> &Repository {
		&self.repository
	}

	pub fn documents(&self) -> &Documents {
		&self.documents
	}

	pub fn static_dir(&self) -> PathBuf {
		self.root.join(&self.config.server.static_dir)
	}

	/// Flavor used for documents unless a caller overrides it.
	pub fn flavor(&self) -> Flavor {
		self.config.render.flavor
	}

	/// Assemble a document, using the configured flavor when `flavor` is
	/// `None`.
	pub fn build(&self, slug: &str, flavor: Option<Flavor>) -> OrcheaResult<BuiltDocument> {
		build_document(
			&self.repository,
			&self.documents,
			slug,
			flavor.unwrap_or_else(|| self.flavor()),
		)
	}

	/// Assemble a document and wrap it into a standalone HTML page.
	pub fn build_page(&self, slug: &str, flavor: Option<Flavor>) -> OrcheaResult<(BuiltDocument, String)> {
		let built = self.build(slug, flavor)?;
		let page = self.documents.templates().render_page(&built)?;
		Ok((built, page))
	}
}
