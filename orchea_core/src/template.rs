use std::path::Path;
use std::path::PathBuf;

use minijinja::AutoEscape;
use minijinja::Environment;
use minijinja::context;

use crate::OrcheaError;
use crate::OrcheaResult;
use crate::builder::BuiltDocument;
use crate::config::DOCUMENT_TEMPLATE_FILE;

/// `index.html` written into a document directory when the project has no
/// `templates/document-index.html`. It fetches the assembled document from
/// the API.
pub const DEFAULT_INDEX_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1.0">
	<title>{{DOCUMENT_TITLE}}</title>
</head>
<body>
	<header>
		<h1>{{DOCUMENT_TITLE}}</h1>
		<div id="metadata"></div>
	</header>
	<main id="document-content">Loading document...</main>
	<script>
		fetch("/api/documents/{{ slug }}/render")
			.then((response) => response.json())
			.then((doc) => {
				if (doc.error) throw new Error(doc.error);
				document.getElementById("metadata").innerHTML =
					"<div class=\"metadata\"><strong>Version:</strong> " + doc.version +
					" | <strong>Date:</strong> " + doc.date + "</div>";
				document.getElementById("document-content").innerHTML = doc.html;
			})
			.catch((error) => {
				document.getElementById("document-content").innerHTML =
					"<div class=\"error\"><h2>Error Loading Document</h2><p>" + error.message + "</p></div>";
			});
	</script>
</body>
</html>
"#;

/// Standalone page produced by `orchea build`.
pub const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
	<meta charset="UTF-8">
	<meta name="viewport" content="width=device-width, initial-scale=1.0">
	<title>{{ title }}</title>
</head>
<body>
	<header>
		<h1>{{ title }}</h1>
		<div class="metadata"><strong>Version:</strong> {{ version }} | <strong>Date:</strong> {{ date }}</div>
	</header>
	<main>
{{ content|safe }}
	</main>
</body>
</html>
"#;

/// Renders document pages from the project's templates directory, falling
/// back to the built-in templates.
#[derive(Debug, Clone)]
pub struct PageTemplates {
	dir: PathBuf,
}

impl PageTemplates {
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	pub fn dir(&self) -> &Path {
		&self.dir
	}

	/// Source of the index template: the project file when present.
	pub fn index_source(&self) -> OrcheaResult<String> {
		let path = self.dir.join(DOCUMENT_TEMPLATE_FILE);
		match std::fs::read_to_string(&path) {
			Ok(source) => Ok(source),
			Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
				tracing::debug!(path = %path.display(), "using built-in document template");
				Ok(DEFAULT_INDEX_TEMPLATE.to_string())
			}
			Err(error) => Err(error.into()),
		}
	}

	/// Render `index.html` for a document. The title is available both as
	/// `DOCUMENT_TITLE` and `title`.
	pub fn render_index(&self, slug: &str, title: &str) -> OrcheaResult<String> {
		let source = self.index_source()?;
		render_html(
			&source,
			context! {
				DOCUMENT_TITLE => title,
				title => title,
				slug => slug,
			},
		)
	}

	/// Render an assembled document into a standalone page.
	pub fn render_page(&self, document: &BuiltDocument) -> OrcheaResult<String> {
		render_html(
			PAGE_TEMPLATE,
			context! {
				title => &document.title,
				version => &document.version,
				date => &document.date,
				slug => &document.slug,
				content => &document.html,
			},
		)
	}
}

fn render_html(source: &str, ctx: minijinja::Value) -> OrcheaResult<String> {
	let mut env = Environment::new();
	env.set_keep_trailing_newline(true);
	env.set_auto_escape_callback(|_| AutoEscape::Html);
	env.add_template("page.html", source)
		.map_err(|e| OrcheaError::TemplateRender(e.to_string()))?;

	let template = env
		.get_template("page.html")
		.map_err(|e| OrcheaError::TemplateRender(e.to_string()))?;

	template
		.render(ctx)
		.map_err(|e| OrcheaError::TemplateRender(e.to_string()))
}
