use std::collections::HashMap;
use std::path::Path;

use rstest::rstest;
use similar_asserts::assert_eq;
use tracing_test::traced_test;

use super::*;
use crate::manifest::Value;
use crate::manifest::flow_list;
use crate::manifest::parse_manifest;
use crate::manifest::quote;
use crate::manifest::quote_item;
use crate::render::render;
use crate::render::render_markdown;

fn workspace_at(root: &Path) -> Workspace {
	Workspace::with_config(root, OrcheaConfig::default())
}

fn write_snippet(workspace: &Workspace, name: &str, content: &str) {
	let root = workspace.repository().root();
	std::fs::create_dir_all(root).unwrap_or_else(|e| panic!("create repository: {e}"));
	std::fs::write(root.join(name), content).unwrap_or_else(|e| panic!("write {name}: {e}"));
}

fn document_request(slug: &str, title: &str, files: &[&str]) -> DocumentRequest {
	DocumentRequest {
		slug: Some(slug.to_string()),
		title: Some(title.to_string()),
		version: Some("1.0".to_string()),
		date: Some("2024-01-01".to_string()),
		markdown_files: Some(files.iter().map(ToString::to_string).collect()),
	}
}

#[test]
fn manifest_scalars_split_at_first_colon() {
	let manifest = parse_manifest(
		"title: \"Hello: World\"\nversion: 1.0\nlastUpdate: \"2024-01-02T03:04:05.000Z\"\n",
	);

	assert_eq!(manifest.get_str("title"), Some("Hello: World"));
	assert_eq!(manifest.get_str("version"), Some("1.0"));
	assert_eq!(manifest.get_str("lastUpdate"), Some("2024-01-02T03:04:05.000Z"));
}

#[test]
fn manifest_flow_list() {
	let manifest = parse_manifest("labels: [\"Guide\", 'It''s', plain text]\nempty: []\n");

	assert_eq!(
		manifest.get_list("labels"),
		Some(vec!["Guide".to_string(), "It's".to_string(), "plain text".to_string()])
	);
	assert_eq!(manifest.get("empty"), Some(&Value::List(vec![])));
}

#[test]
fn manifest_flow_list_keeps_quoted_commas() {
	let manifest = parse_manifest("labels: [\"a, b\", c]\n");

	assert_eq!(
		manifest.get_list("labels"),
		Some(vec!["a, b".to_string(), "c".to_string()])
	);
}

#[test]
fn manifest_block_list() {
	let manifest = parse_manifest(
		"markdown_files:\n  - intro.md\n  - \"quoted file.md\"\n  -\nversion: 2\n  - stray.md\n",
	);

	assert_eq!(
		manifest.get_list("markdown_files"),
		Some(vec!["intro.md".to_string(), "quoted file.md".to_string()])
	);
	assert_eq!(manifest.get_str("version"), Some("2"));
	assert_eq!(manifest.len(), 2);
}

#[test]
fn manifest_skips_comments_and_malformed_lines() {
	let manifest = parse_manifest("# comment\n- orphan\nnot a pair\n: no key\nkey: value\n");

	assert_eq!(manifest.len(), 1);
	assert_eq!(manifest.get_str("key"), Some("value"));
}

#[test]
fn manifest_lookup_ignores_case_as_fallback() {
	let manifest = parse_manifest("Title: upper\n");

	assert_eq!(manifest.get_str("title"), Some("upper"));
	assert_eq!(manifest.get_str("TITLE"), Some("upper"));
	assert!(manifest.get("label").is_none());
}

#[test]
fn manifest_scalar_escapes() {
	let text = format!("title: {}\n", quote("say \"hi\"\tnow \\ later"));
	let manifest = parse_manifest(&text);

	assert_eq!(text, "title: \"say \\\"hi\\\"\\tnow \\\\ later\"\n");
	assert_eq!(manifest.get_str("title"), Some("say \"hi\"\tnow \\ later"));
}

#[rstest]
#[case::leading_multibyte("title: Überblick\n", "Überblick")]
#[case::trailing_multibyte("title: 2024年\n", "2024年")]
#[case::single_multibyte("title: é\n", "é")]
#[case::quoted_multibyte("title: \"Übersicht café\"\n", "Übersicht café")]
#[case::single_quoted_multibyte("title: 'naïve'\n", "naïve")]
fn manifest_non_ascii_scalars(#[case] text: &str, #[case] expected: &str) {
	let manifest = parse_manifest(text);

	assert_eq!(manifest.get_str("title"), Some(expected));
}

#[rstest]
#[case::flow("files: [café.md, \"Über.md\", 日本]\n")]
#[case::block("files:\n  - café.md\n  - \"Über.md\"\n  - 日本\n")]
fn manifest_non_ascii_list_items(#[case] text: &str) {
	let manifest = parse_manifest(text);

	assert_eq!(
		manifest.get_list("files"),
		Some(vec!["café.md".to_string(), "Über.md".to_string(), "日本".to_string()])
	);
}

#[rstest]
#[case::plain("intro.md", "intro.md")]
#[case::space("my file.md", "\"my file.md\"")]
#[case::leading_dash("-x.md", "\"-x.md\"")]
#[case::empty("", "\"\"")]
fn manifest_quote_item(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(quote_item(input), expected);
}

#[test]
fn manifest_writes_flow_list() {
	let labels = vec!["Guide".to_string(), "Set \"up\"".to_string()];

	assert_eq!(flow_list(&labels), "[\"Guide\", \"Set \\\"up\\\"\"]");
	assert_eq!(flow_list(&[]), "[]");
}

#[rstest]
#[case::heading("# Title", "<h1>Title</h1>")]
#[case::deep_heading("###### Six", "<h6>Six</h6>")]
#[case::too_deep("####### seven", "<p>####### seven</p>")]
#[case::emphasis("Hello **bold** and *em*", "<p>Hello <strong>bold</strong> and <em>em</em></p>")]
#[case::paragraphs("line one\nline two\n\nnext", "<p>line one\nline two</p>\n<p>next</p>")]
#[case::heading_then_text("# T\ntext", "<h1>T</h1>\n<p>text</p>")]
#[case::text_then_list("intro\n- a", "<p>intro</p>\n<ul><li>a</li></ul>")]
#[case::crlf("# A\r\n\r\nb", "<h1>A</h1>\n<p>b</p>")]
#[case::code(
	"```rust\nlet x = 1 < 2;\n```",
	"<pre><code class=\"language-rust\">let x = 1 &lt; 2;</code></pre>"
)]
#[case::unterminated_code("```\ncode", "<pre><code>code</code></pre>")]
#[case::code_span("use `**not bold**` here", "<p>use <code>**not bold**</code> here</p>")]
#[case::link_and_image(
	"![logo](logo.png) see [docs](https://x.dev)",
	"<p><img src=\"logo.png\" alt=\"logo\"> see <a href=\"https://x.dev\">docs</a></p>"
)]
#[case::raw_html("<div>kept</div>", "<p><div>kept</div></p>")]
fn render_simple(#[case] input: &str, #[case] expected: &str) {
	assert_eq!(render_markdown(input), expected);
}

#[test]
fn render_groups_list_items_by_kind() {
	let html = render_markdown("- a\n- b\n\n- c\n1. one\n2. two\n* star");

	assert_eq!(
		html,
		"<ul><li>a</li><li>b</li><li>c</li></ul>\n<ol><li>one</li><li>two</li></ol>\n<ul><li>star</li></ul>"
	);
}

#[test]
fn render_document_snapshot() {
	let input = "# Guide\n\nIntro with `code`.\n\n- one\n- two\n\n```sh\necho hi\n```\n";

	insta::assert_snapshot!(render_markdown(input), @r#"
	<h1>Guide</h1>
	<p>Intro with <code>code</code>.</p>
	<ul><li>one</li><li>two</li></ul>
	<pre><code class="language-sh">echo hi</code></pre>
	"#);
}

#[test]
fn render_commonmark_flavor() -> OrcheaResult<()> {
	let html = render("# Hi\n\n| a |\n| - |\n| b |\n", Flavor::CommonMark)?;

	assert!(html.contains("<h1>Hi</h1>"));
	assert!(html.contains("<table>"));

	Ok(())
}

#[rstest]
#[case::simple("simple", Flavor::Simple)]
#[case::commonmark("CommonMark", Flavor::CommonMark)]
#[case::padded(" commonmark ", Flavor::CommonMark)]
fn flavor_from_str(#[case] input: &str, #[case] expected: Flavor) -> OrcheaResult<()> {
	assert_eq!(input.parse::<Flavor>()?, expected);

	Ok(())
}

#[test]
fn flavor_unknown() {
	let result = "fancy".parse::<Flavor>();

	assert!(matches!(result, Err(OrcheaError::UnknownFlavor(ref name)) if name == "fancy"));
	assert_eq!(Flavor::CommonMark.to_string(), "commonmark");
}

#[rstest]
#[case::words("My Great Doc!", Some("my-great-doc"))]
#[case::dashes("  --Hello   World--  ", Some("hello-world"))]
#[case::non_ascii("Café 2024", Some("caf-2024"))]
#[case::nothing_left("!!!", None)]
#[case::empty("", None)]
fn kebab_slugs(#[case] input: &str, #[case] expected: Option<&str>) {
	assert_eq!(kebab_slug(input).as_deref(), expected);
}

#[test]
fn kebab_slug_is_truncated() {
	let slug = kebab_slug(&"a".repeat(80)).unwrap_or_default();

	assert_eq!(slug.len(), MAX_SLUG_LENGTH);
}

#[rstest]
#[case::valid("ok-slug", true)]
#[case::parent("../x", false)]
#[case::nested("a/b", false)]
#[case::backslash("a\\b", false)]
#[case::empty("", false)]
fn slug_validation(#[case] slug: &str, #[case] valid: bool) {
	assert_eq!(validate_slug(slug).is_ok(), valid);
}

#[rstest]
#[case::markdown("notes.md", Some(FileKind::Markdown))]
#[case::yaml("notes.yaml", Some(FileKind::Yaml))]
#[case::parent("../notes.md", None)]
#[case::nested("a/notes.md", None)]
#[case::other_extension("notes.txt", None)]
#[case::yml("notes.yml", None)]
#[case::empty("", None)]
fn filename_validation(#[case] name: &str, #[case] expected: Option<FileKind>) {
	let result = validate_filename(name, &[FileKind::Markdown, FileKind::Yaml]);

	assert_eq!(result.ok(), expected);
}

#[test]
fn filename_validation_message() {
	let Err(error) = validate_filename("notes.txt", &[FileKind::Markdown, FileKind::Yaml]) else {
		panic!("expected an error");
	};

	assert_eq!(
		error.to_string(),
		"invalid filename `notes.txt` - only .md and .yaml files allowed"
	);
	assert_eq!(error.kind(), ErrorKind::Invalid);
	assert!(validate_filename("notes.yaml", &[FileKind::Markdown]).is_err());
}

#[rstest]
#[case::dashes("getting-started.md", "Getting started")]
#[case::single("api.md", "Api")]
#[case::no_extension("readme", "Readme")]
#[case::empty("", "")]
fn default_titles(#[case] filename: &str, #[case] expected: &str) {
	assert_eq!(default_title(filename), expected);
}

#[test]
fn timestamp_is_rfc3339_with_millis() {
	let now = timestamp();

	assert_eq!(now.len(), 24);
	assert!(now.ends_with('Z'));
}

#[test]
fn file_config_yaml() {
	let config = FileConfig {
		title: "Intro".to_string(),
		labels: vec!["Guide".to_string(), "Setup".to_string()],
		last_update: Some("2024-01-01T00:00:00.000Z".to_string()),
	};
	let yaml = config.to_yaml();

	assert_eq!(
		yaml,
		"# File Configuration\ntitle: \"Intro\"\nlabels: [\"Guide\", \"Setup\"]\nlastUpdate: \
		 \"2024-01-01T00:00:00.000Z\"\n"
	);
	assert_eq!(FileConfig::from_manifest(&parse_manifest(&yaml), "intro.md"), config);
}

#[test]
fn file_config_reads_legacy_label() {
	let config = FileConfig::from_manifest(&parse_manifest("label: Guide\n"), "getting-started.md");

	assert_eq!(config.title, "Getting started");
	assert_eq!(config.labels, vec!["Guide".to_string()]);
	assert_eq!(config.last_update, None);
}

#[rstest]
#[case::delimited(LabelsInput::Delimited("Guide, , Setup ".to_string()), vec!["Guide", "Setup"])]
#[case::list(LabelsInput::List(vec![" a ".to_string(), String::new()]), vec!["a"])]
#[case::blank(LabelsInput::Delimited(" , ".to_string()), vec![])]
fn labels_normalize(#[case] input: LabelsInput, #[case] expected: Vec<&str>) {
	assert_eq!(input.normalize(), expected);
}

#[test]
fn repository_create_writes_sidecar() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let repository = workspace.repository();

	repository.create_file("getting-started.md", "# Start")?;
	let config = repository
		.load_config("getting-started.md")?
		.unwrap_or_else(|| panic!("sidecar missing"));

	assert_eq!(config.title, "Getting started");
	assert_eq!(config.labels, vec![DEFAULT_LABEL.to_string()]);
	assert!(config.last_update.is_some());
	assert_eq!(repository.read_file("getting-started.md")?, "# Start");

	let error = repository.create_file("getting-started.md", "again");
	assert!(matches!(error, Err(OrcheaError::FileExists(_))));

	Ok(())
}

#[test]
fn repository_create_keeps_existing_sidecar() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "intro.yaml", "title: Custom\nlabels: [Guide]\n");

	workspace.repository().create_file("intro.md", "# Intro")?;

	assert_eq!(
		workspace.repository().read_file("intro.yaml")?,
		"title: Custom\nlabels: [Guide]\n"
	);

	Ok(())
}

#[test]
fn repository_save_keeps_backup() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let repository = workspace.repository();

	repository.create_file("intro.md", "old")?;
	let saved_at = repository.save_file("intro.md", "new")?;

	assert!(saved_at.ends_with('Z'));
	assert_eq!(repository.read_file("intro.md")?, "new");
	assert_eq!(
		std::fs::read_to_string(repository.path_of(".intro.md.backup"))?,
		"old"
	);

	repository.save_file("intro.yaml", "title: x\n")?;
	assert!(!repository.path_of(".intro.yaml.backup").exists());

	Ok(())
}

#[test]
fn repository_save_creates_new_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "other.md", "");

	workspace.repository().save_file("fresh.md", "content")?;

	assert_eq!(workspace.repository().read_file("fresh.md")?, "content");
	assert!(!workspace.repository().path_of(".fresh.md.backup").exists());

	Ok(())
}

#[test]
fn repository_read_missing_file() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "other.md", "");
	let repository = workspace.repository();

	let error = repository.read_file("ghost.md");

	assert!(matches!(&error, Err(OrcheaError::FileNotFound(name)) if name == "ghost.md"));
	assert_eq!(error.err().map(|e| e.kind()), Some(ErrorKind::NotFound));
	assert!(!repository.path_of("ghost.yaml").exists());

	Ok(())
}

#[test]
fn repository_read_creates_missing_sidecar() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "intro.md", "# Intro");

	workspace.repository().read_file("intro.md")?;

	assert!(workspace.repository().path_of("intro.yaml").is_file());

	Ok(())
}

#[test]
fn repository_delete_keeps_sidecar() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let repository = workspace.repository();

	repository.create_file("intro.md", "# Intro")?;
	repository.delete_file("intro.md")?;

	assert!(!repository.path_of("intro.md").exists());
	assert!(repository.path_of("intro.yaml").exists());
	assert!(matches!(
		repository.delete_file("intro.md"),
		Err(OrcheaError::FileNotFound(_))
	));

	Ok(())
}

#[test]
fn repository_list_files_missing_directory() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());

	assert!(workspace.repository().list_files(true)?.is_empty());
	assert!(workspace.repository().list_sidecars()?.is_empty());

	Ok(())
}

#[test]
#[traced_test]
fn repository_list_files_auto_creates_sidecars() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "b.md", "");
	write_snippet(&workspace, "a.md", "");
	write_snippet(&workspace, "a.yaml", "title: A\nlabels: [x]\n");
	write_snippet(&workspace, "notes.txt", "");
	let repository = workspace.repository();

	assert_eq!(repository.list_files(false)?, vec!["a.md", "b.md"]);
	assert!(!repository.path_of("b.yaml").exists());

	assert_eq!(repository.list_files(true)?, vec!["a.md", "b.md"]);
	assert!(repository.path_of("b.yaml").is_file());
	assert_eq!(repository.read_file("a.yaml")?, "title: A\nlabels: [x]\n");
	assert_eq!(repository.list_sidecars()?, vec!["a.yaml", "b.yaml"]);
	assert!(logs_contain("auto-creating missing YAML configs"));

	Ok(())
}

#[test]
fn repository_update_file_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let repository = workspace.repository();
	repository.create_file("intro.md", "# Intro")?;

	let (config_name, config) = repository.update_file_config(
		"intro.md",
		"Introduction",
		&LabelsInput::Delimited("Guide, Setup".to_string()),
	)?;

	assert_eq!(config_name, "intro.yaml");
	assert_eq!(config.labels, vec!["Guide".to_string(), "Setup".to_string()]);
	assert_eq!(repository.load_config("intro.md")?, Some(config));

	Ok(())
}

#[rstest]
#[case::empty_title("intro.md", " ", "Guide", ErrorKind::Invalid)]
#[case::no_labels("intro.md", "Intro", " , ", ErrorKind::Invalid)]
#[case::yaml_target("intro.yaml", "Intro", "Guide", ErrorKind::Invalid)]
fn repository_update_file_config_rejects(
	#[case] name: &str,
	#[case] title: &str,
	#[case] labels: &str,
	#[case] kind: ErrorKind,
) -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "intro.md", "");

	let result = workspace.repository().update_file_config(
		name,
		title,
		&LabelsInput::Delimited(labels.to_string()),
	);

	assert_eq!(result.err().map(|e| e.kind()), Some(kind));
	assert!(!workspace.repository().path_of("intro.yaml").exists());

	Ok(())
}

#[test]
fn repository_clones_share_auto_create_guard() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "a.md", "");
	let first = workspace.repository().clone();
	let second = workspace.repository().clone();

	first.list_files(true)?;
	second.list_files(true)?;

	assert!(first.path_of("a.yaml").is_file());

	Ok(())
}

#[test]
fn documents_create_writes_manifest_and_index() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let documents = workspace.documents();

	let slug = documents.create(document_request("My Guide", "My Guide", &["intro.md", "setup guide.md"]))?;

	assert_eq!(slug, "my-guide");
	let dir = documents.dir(&slug);
	assert_eq!(
		std::fs::read_to_string(dir.join(CONFIG_FILE))?,
		"document_title: \"My Guide\"\nversion: \"1.0\"\ndate: \"2024-01-01\"\nmarkdown_files:\n  - \
		 intro.md\n  - \"setup guide.md\"\n"
	);

	let index = std::fs::read_to_string(dir.join(INDEX_FILE))?;
	assert!(index.contains("<title>My Guide</title>"));
	assert!(index.contains("/api/documents/my-guide/render"));

	let (manifest, _) = documents.load_manifest(&slug)?;
	assert_eq!(manifest.markdown_files, vec!["intro.md", "setup guide.md"]);

	Ok(())
}

#[test]
fn documents_create_rejects_duplicates_and_missing_fields() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let documents = workspace.documents();
	documents.create(document_request("guide", "Guide", &[]))?;

	let duplicate = documents.create(document_request("Guide", "Other", &[]));
	assert!(matches!(duplicate, Err(OrcheaError::DocumentExists(ref slug)) if slug == "guide"));

	let mut incomplete = document_request("other", "Other", &[]);
	incomplete.date = None;
	let missing = documents.create(incomplete);
	assert!(matches!(missing, Err(OrcheaError::MissingFields(_))));

	let unusable = documents.create(document_request("???", "Other", &[]));
	assert!(matches!(unusable, Err(OrcheaError::InvalidSlug(_))));

	Ok(())
}

#[test]
fn documents_index_uses_project_template() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let templates = workspace.documents().templates().dir().to_path_buf();
	std::fs::create_dir_all(&templates)?;
	std::fs::write(templates.join(DOCUMENT_TEMPLATE_FILE), "<h1>{{DOCUMENT_TITLE}}</h1>")?;

	let slug = workspace
		.documents()
		.create(document_request("notes", "Guide & Notes", &[]))?;

	assert_eq!(
		std::fs::read_to_string(workspace.documents().dir(&slug).join(INDEX_FILE))?,
		"<h1>Guide &amp; Notes</h1>"
	);

	Ok(())
}

#[test]
fn documents_broken_template_writes_nothing() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let templates = workspace.documents().templates().dir().to_path_buf();
	std::fs::create_dir_all(&templates)?;
	std::fs::write(templates.join(DOCUMENT_TEMPLATE_FILE), "{% if %}")?;

	let result = workspace
		.documents()
		.create(document_request("notes", "Notes", &[]));

	assert!(matches!(result, Err(OrcheaError::TemplateRender(_))));
	assert!(!workspace.documents().dir("notes").exists());

	Ok(())
}

#[test]
fn documents_list_and_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let documents = workspace.documents();

	assert!(documents.list()?.is_empty());

	documents.create(document_request("zeta", "Zeta", &["a.md"]))?;
	documents.create(document_request("alpha", "Alpha", &[]))?;
	std::fs::create_dir_all(documents.dir("broken"))?;
	std::fs::create_dir_all(documents.dir("legacy"))?;
	std::fs::write(
		documents.dir("legacy").join(CONFIG_FILE),
		"title: Legacy\nmarkdown_files:\n  - a.md\n",
	)?;

	let slugs: Vec<String> = documents.list()?.into_iter().map(|doc| doc.slug).collect();
	assert_eq!(slugs, vec!["alpha", "legacy", "zeta"]);

	let legacy = documents.get_config("legacy")?;
	assert_eq!(legacy.title, "Legacy");
	assert_eq!(legacy.document_title, "Legacy");
	assert_eq!(legacy.version, "1.0");
	assert_eq!(legacy.date, "Unknown");
	assert_eq!(legacy.path, "documents/legacy");
	assert_eq!(legacy.raw_yaml, "title: Legacy\nmarkdown_files:\n  - a.md\n");

	Ok(())
}

#[test]
fn documents_update_and_delete() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let documents = workspace.documents();
	documents.create(document_request("guide", "Guide", &["a.md"]))?;

	let updated = documents.update("guide", document_request("ignored", "Guide v2", &["b.md"]))?;
	assert_eq!(updated.document_title, "Guide v2");
	assert_eq!(documents.get_config("guide")?.markdown_files, vec!["b.md"]);
	assert!(
		std::fs::read_to_string(documents.dir("guide").join(INDEX_FILE))?
			.contains("<title>Guide v2</title>")
	);

	documents.delete("guide")?;
	assert!(!documents.dir("guide").exists());
	assert!(matches!(documents.delete("guide"), Err(OrcheaError::DocumentNotFound(_))));

	Ok(())
}

#[test]
fn documents_update_checks_fields_before_existence() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	let documents = workspace.documents();

	let missing = documents.update("ghost", DocumentRequest::default());
	assert!(matches!(missing, Err(OrcheaError::MissingFields(_))));

	let absent = documents.update("ghost", document_request("ghost", "Ghost", &[]));
	assert!(matches!(absent, Err(OrcheaError::DocumentNotFound(_))));

	let escaping = documents.get_config("../repository");
	assert!(matches!(escaping, Err(OrcheaError::InvalidSlug(_))));

	Ok(())
}

#[test]
fn builder_replaces_missing_snippets() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "intro.md", "# Intro");
	workspace.documents().create(document_request(
		"guide",
		"Guide",
		&["intro.md", "missing.md", "../secret.md"],
	))?;

	let built = workspace.build("guide", None)?;

	assert_eq!(built.title, "Guide");
	assert_eq!(built.missing, vec!["missing.md", "../secret.md"]);
	assert!(!built.is_complete());
	assert_eq!(
		built.html,
		"<h1>Intro</h1>\n<h1>Error</h1>\n<p>Could not load file: missing.md</p>\n<h1>Error</h1>\n<p>Could \
		 not load file: ../secret.md</p>"
	);

	Ok(())
}

#[test]
fn builder_renders_page() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "intro.md", "Some *text*");
	workspace
		.documents()
		.create(document_request("guide", "Guide", &["intro.md"]))?;

	let (built, page) = workspace.build_page("guide", Some(Flavor::Simple))?;

	assert!(built.is_complete());
	assert!(page.contains("<title>Guide</title>"));
	assert!(page.contains("<strong>Version:</strong> 1.0"));
	assert!(page.contains("<p>Some <em>text</em></p>"));

	Ok(())
}

#[test]
fn builder_unknown_document() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());

	let result = workspace.build("ghost", None);

	assert!(matches!(result, Err(OrcheaError::DocumentNotFound(_))));

	Ok(())
}

#[test]
fn tags_are_grouped_case_insensitively() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "a.yaml", "title: A\nlabels: [Guide, setup]\n");
	write_snippet(&workspace, "b.yaml", "title: B\nlabels:\n  - guide\n");
	write_snippet(&workspace, "c.yaml", "title: C\nlabel: Reference\n");

	let report = collect_tags(workspace.repository())?;

	let summary: Vec<(&str, usize)> = report
		.tags
		.iter()
		.map(|tag| (tag.label.as_str(), tag.count))
		.collect();
	assert_eq!(summary, vec![("Guide", 2), ("Reference", 1), ("setup", 1)]);
	assert_eq!(report.tags[0].files, vec!["a.md", "b.md"]);
	assert_eq!(
		report.stats,
		TagStats {
			total_tags: 4,
			unique_labels: 4,
			files_processed: 3,
		}
	);

	Ok(())
}

#[test]
fn tags_accept_non_ascii_labels() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "a.yaml", "title: Überblick\nlabels: [Über]\n");
	write_snippet(&workspace, "b.yaml", "title: b\nlabels:\n  - über\n");

	let report = collect_tags(workspace.repository())?;

	assert_eq!(report.tags.len(), 1);
	assert_eq!(report.tags[0].label, "Über");
	assert_eq!(report.tags[0].count, 2);
	assert_eq!(report.stats.unique_labels, 2);

	Ok(())
}

#[test]
fn tags_serialize_in_camel_case() -> AnyEmptyResult {
	let value = serde_json::to_value(TagStats {
		total_tags: 1,
		unique_labels: 1,
		files_processed: 1,
	})?;

	assert_eq!(
		value,
		serde_json::json!({ "totalTags": 1, "uniqueLabels": 1, "filesProcessed": 1 })
	);

	Ok(())
}

#[test]
fn tags_filter() {
	let files = vec!["a.md".to_string(), "b.md".to_string(), "c.md".to_string()];
	let mut configs = HashMap::new();
	configs.insert(
		"a.md".to_string(),
		FileConfig {
			title: "A".to_string(),
			labels: vec!["Guide".to_string()],
			last_update: None,
		},
	);
	configs.insert(
		"b.md".to_string(),
		FileConfig {
			title: "B".to_string(),
			labels: vec!["Setup".to_string(), "Guide".to_string()],
			last_update: None,
		},
	);

	assert_eq!(filter_by_tags(&files, &configs, &[]), vec!["a.md", "b.md", "c.md"]);
	assert_eq!(
		filter_by_tags(&files, &configs, &["Setup".to_string()]),
		vec!["b.md"]
	);
	assert_eq!(
		filter_by_tags(&files, &configs, &["Guide".to_string(), "Other".to_string()]),
		vec!["a.md", "b.md"]
	);
}

fn search_fixture() -> Vec<Snippet> {
	vec![
		Snippet {
			filename: "install.md".to_string(),
			config: Some(FileConfig {
				title: "Installation".to_string(),
				labels: vec!["Setup".to_string()],
				last_update: None,
			}),
			content: "Run the installer.\nInstall again.".to_string(),
		},
		Snippet {
			filename: "notes.md".to_string(),
			config: None,
			content: "nothing relevant".to_string(),
		},
		Snippet {
			filename: "faq.md".to_string(),
			config: Some(FileConfig {
				title: "FAQ".to_string(),
				labels: vec!["Help".to_string()],
				last_update: None,
			}),
			content: "How do I install it?".to_string(),
		},
	]
}

#[test]
fn search_scores_and_orders() {
	let results = search_snippets(&search_fixture(), "Install", None);

	assert_eq!(results.total, 2);
	assert!(!results.has_more);
	assert_eq!(results.results[0].filename, "install.md");
	assert_eq!(results.results[0].score, 9);
	assert_eq!(results.results[0].matched, vec!["title", "filename", "content"]);
	assert_eq!(results.results[0].snippet.as_deref(), Some("Run the installer."));
	assert_eq!(results.results[1].filename, "faq.md");
	assert_eq!(results.results[1].score, 2);
}

#[test]
fn search_matches_labels_and_default_titles() {
	let by_label = search_snippets(&search_fixture(), "help", None);
	assert_eq!(by_label.results[0].filename, "faq.md");
	assert_eq!(by_label.results[0].matched, vec!["labels"]);

	let by_title = search_snippets(&search_fixture(), "Notes", None);
	assert_eq!(by_title.results[0].title, "Notes");
	assert_eq!(by_title.results[0].matched, vec!["title", "filename"]);
}

#[rstest]
#[case::truncated(Some(1), 1, true)]
#[case::clamped_low(Some(0), 1, true)]
#[case::default_limit(None, 2, false)]
fn search_limits(#[case] limit: Option<usize>, #[case] count: usize, #[case] has_more: bool) {
	let results = search_snippets(&search_fixture(), "install", limit);

	assert_eq!(results.results.len(), count);
	assert_eq!(results.has_more, has_more);
	assert_eq!(results.total, 2);
}

#[test]
fn search_blank_query() {
	let results = search_snippets(&search_fixture(), "   ", None);

	assert!(results.results.is_empty());
	assert_eq!(results.query, "");
}

#[test]
fn search_snippet_window() {
	let line = format!("{}needle{}", "a".repeat(200), "b".repeat(100));
	let snippets = vec![Snippet {
		filename: "long.md".to_string(),
		config: None,
		content: line,
	}];

	let results = search_snippets(&snippets, "needle", None);
	let snippet = results.results[0].snippet.clone().unwrap_or_default();

	assert_eq!(snippet.chars().count(), SNIPPET_LENGTH);
	assert!(snippet.contains("needle"));
}

#[test]
fn search_repository() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	let workspace = workspace_at(tmp.path());
	write_snippet(&workspace, "alpha.md", "needle here");
	write_snippet(&workspace, "alpha.yaml", "title: Alpha\nlabels: [One]\n");
	write_snippet(&workspace, "beta.md", "nothing");

	let results = search(workspace.repository(), "needle", None)?;

	assert_eq!(results.results.len(), 1);
	assert_eq!(results.results[0].title, "Alpha");
	assert_eq!(results.results[0].labels, vec!["One"]);

	Ok(())
}

#[test]
fn config_parse() -> OrcheaResult<()> {
	let config = OrcheaConfig::parse(
		"[server]\nport = 8080\n\n[paths]\nrepository = \"snippets\"\n\n[render]\nflavor = \"commonmark\"\n",
	)?;

	assert_eq!(config.server.port, 8080);
	assert_eq!(config.server.host, "127.0.0.1");
	assert_eq!(config.server.fallback_ports, DEFAULT_FALLBACK_PORTS);
	assert_eq!(config.paths.repository, Path::new("snippets"));
	assert_eq!(config.paths.documents, Path::new("documents"));
	assert_eq!(config.render.flavor, Flavor::CommonMark);

	Ok(())
}

#[test]
fn config_parse_error() {
	let result = OrcheaConfig::parse("server = 3");

	assert!(matches!(result, Err(OrcheaError::ConfigParse(_))));
}

#[rstest]
#[case::valid(Some("4000"), 4000)]
#[case::padded(Some(" 4001 "), 4001)]
#[case::invalid(Some("abc"), DEFAULT_PORT)]
#[case::missing(None, DEFAULT_PORT)]
fn config_port_override(#[case] value: Option<&str>, #[case] expected: u16) {
	let mut config = OrcheaConfig::default();
	config.apply_port_override(value);

	assert_eq!(config.server.port, expected);
}

#[test]
fn workspace_open_reads_config() -> AnyEmptyResult {
	let tmp = tempfile::tempdir()?;
	std::fs::write(
		tmp.path().join(".orchea.toml"),
		"[paths]\nrepository = \"snippets\"\n[render]\nflavor = \"commonmark\"\n",
	)?;

	let workspace = Workspace::open(tmp.path())?;

	assert_eq!(workspace.repository().root(), tmp.path().join("snippets"));
	assert_eq!(workspace.flavor(), Flavor::CommonMark);
	assert_eq!(workspace.static_dir(), tmp.path().join("."));

	let empty = tempfile::tempdir()?;
	assert!(OrcheaConfig::load(empty.path())?.is_none());

	Ok(())
}

#[test]
fn io_not_found_is_not_found() {
	let error = OrcheaError::from(std::io::Error::from(std::io::ErrorKind::NotFound));

	assert_eq!(error.kind(), ErrorKind::NotFound);
	assert_eq!(
		OrcheaError::from(std::io::Error::other("boom")).kind(),
		ErrorKind::Internal
	);
}
