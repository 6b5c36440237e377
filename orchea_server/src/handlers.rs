use axum::Json;
use axum::extract::Path;
use axum::extract::Query;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use orchea_core::BuiltDocument;
use orchea_core::CONFIG_FILE;
use orchea_core::DocumentConfig;
use orchea_core::DocumentRequest;
use orchea_core::FileKind;
use orchea_core::Flavor;
use orchea_core::INDEX_FILE;
use orchea_core::LabelsInput;
use orchea_core::OrcheaError;
use orchea_core::OrcheaResult;
use orchea_core::SearchResults;
use orchea_core::TagReport;
use orchea_core::Workspace;
use orchea_core::collect_tags;
use orchea_core::document_path;
use orchea_core::render::render;
use orchea_core::search;
use orchea_core::timestamp;
use orchea_core::validate_filename;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

use crate::AppState;
use crate::ApiError;
use crate::ApiResult;

type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Run filesystem work on the blocking pool.
async fn blocking<T, F>(state: &AppState, work: F) -> ApiResult<T>
where
	T: Send + 'static,
	F: FnOnce(&Workspace) -> OrcheaResult<T> + Send + 'static,
{
	let workspace = state.workspace.clone();
	tokio::task::spawn_blocking(move || work(&workspace))
		.await
		.map_err(|error| ApiError::Task(error.to_string()))?
		.map_err(ApiError::from)
}

pub async fn health() -> Json<Value> {
	Json(json!({
		"status": "OK",
		"timestamp": timestamp(),
		"message": "Orchea Documentation System API is running",
	}))
}

#[derive(Debug, Deserialize)]
pub struct ListFilesQuery {
	#[serde(rename = "autoCreateConfigs")]
	auto_create_configs: Option<String>,
}

pub async fn list_files(
	State(state): State<AppState>,
	Query(query): Query<ListFilesQuery>,
) -> ApiResult<Json<Value>> {
	let auto_create = query.auto_create_configs.as_deref() == Some("true");
	let files = blocking(&state, move |workspace| {
		workspace.repository().list_files(auto_create)
	})
	.await?;

	Ok(Json(json!({ "files": files })))
}

pub async fn get_file(
	State(state): State<AppState>,
	Path(filename): Path<String>,
) -> ApiResult<Json<Value>> {
	let name = filename.clone();
	let content = blocking(&state, move |workspace| workspace.repository().read_file(&name)).await?;

	Ok(Json(json!({ "content": content, "filename": filename })))
}

pub async fn save_file(
	State(state): State<AppState>,
	Path(filename): Path<String>,
	body: JsonBody<Value>,
) -> ApiResult<Json<Value>> {
	let Json(body) = body?;
	validate_filename(&filename, &[FileKind::Markdown, FileKind::Yaml])?;
	let content = body
		.get("content")
		.and_then(Value::as_str)
		.ok_or_else(|| OrcheaError::InvalidRequest("content must be a string".to_string()))?
		.to_string();

	let name = filename.clone();
	let saved_at = blocking(&state, move |workspace| {
		workspace.repository().save_file(&name, &content)
	})
	.await?;

	Ok(Json(json!({
		"success": true,
		"message": "File saved successfully",
		"filename": filename,
		"timestamp": saved_at,
	})))
}

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
	#[serde(default)]
	filename: String,
	#[serde(default)]
	content: String,
}

pub async fn create_file(
	State(state): State<AppState>,
	body: JsonBody<CreateFileRequest>,
) -> ApiResult<Json<Value>> {
	let Json(CreateFileRequest { filename, content }) = body?;

	let name = filename.clone();
	let created_at = blocking(&state, move |workspace| {
		workspace.repository().create_file(&name, &content)
	})
	.await?;

	Ok(Json(json!({
		"success": true,
		"message": "File created successfully",
		"filename": filename,
		"timestamp": created_at,
	})))
}

pub async fn delete_file(
	State(state): State<AppState>,
	Path(filename): Path<String>,
) -> ApiResult<Json<Value>> {
	let name = filename.clone();
	blocking(&state, move |workspace| workspace.repository().delete_file(&name)).await?;

	Ok(Json(json!({
		"success": true,
		"message": "File deleted successfully",
		"filename": filename,
	})))
}

#[derive(Debug, Deserialize)]
pub struct FileConfigRequest {
	title: Option<String>,
	labels: Option<Value>,
}

/// Accepts `"a, b"` or `["a", "b"]`.
fn labels_input(labels: Value) -> OrcheaResult<LabelsInput> {
	match labels {
		Value::String(text) => Ok(LabelsInput::Delimited(text)),
		Value::Array(items) => {
			Ok(LabelsInput::List(
				items
					.iter()
					.filter_map(Value::as_str)
					.map(str::to_string)
					.collect(),
			))
		}
		_ => {
			Err(OrcheaError::InvalidRequest(
				"labels must be a string or array".to_string(),
			))
		}
	}
}

pub async fn update_file_config(
	State(state): State<AppState>,
	Path(filename): Path<String>,
	body: JsonBody<FileConfigRequest>,
) -> ApiResult<Json<Value>> {
	let Json(request) = body?;
	validate_filename(&filename, &[FileKind::Markdown])?;

	let (Some(title), Some(labels)) = (request.title, request.labels) else {
		return Err(OrcheaError::MissingFields("title, labels".to_string()).into());
	};
	let labels = labels_input(labels)?;

	let (config_name, config) = blocking(&state, move |workspace| {
		workspace
			.repository()
			.update_file_config(&filename, &title, &labels)
	})
	.await?;

	Ok(Json(json!({
		"success": true,
		"message": "Configuration updated successfully",
		"filename": config_name,
		"config": config,
	})))
}

/// Render a single snippet for the editor preview.
pub async fn preview_file(
	State(state): State<AppState>,
	Path(filename): Path<String>,
) -> ApiResult<Json<Value>> {
	validate_filename(&filename, &[FileKind::Markdown])?;

	let name = filename.clone();
	let html = blocking(&state, move |workspace| {
		let content = workspace.repository().read_file(&name)?;
		render(&content, Flavor::CommonMark)
	})
	.await?;

	Ok(Json(json!({ "filename": filename, "html": html })))
}

pub async fn tags(State(state): State<AppState>) -> ApiResult<Json<TagReport>> {
	let report = blocking(&state, |workspace| collect_tags(workspace.repository())).await?;

	Ok(Json(report))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
	#[serde(default)]
	q: String,
	limit: Option<String>,
}

pub async fn search_files(
	State(state): State<AppState>,
	Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResults>> {
	let limit = query
		.limit
		.as_deref()
		.and_then(|limit| limit.trim().parse::<usize>().ok());
	let results = blocking(&state, move |workspace| {
		search(workspace.repository(), &query.q, limit)
	})
	.await?;

	Ok(Json(results))
}

pub async fn list_documents(State(state): State<AppState>) -> ApiResult<Json<Value>> {
	let documents = blocking(&state, |workspace| workspace.documents().list()).await?;

	Ok(Json(json!({ "documents": documents })))
}

pub async fn create_document(
	State(state): State<AppState>,
	body: JsonBody<DocumentRequest>,
) -> ApiResult<Json<Value>> {
	let Json(request) = body?;
	let slug = blocking(&state, move |workspace| workspace.documents().create(request)).await?;

	Ok(Json(json!({
		"success": true,
		"message": "Document created successfully",
		"path": document_path(&slug),
		"slug": slug,
		"files": [CONFIG_FILE, INDEX_FILE],
	})))
}

pub async fn get_document_config(
	State(state): State<AppState>,
	Path(slug): Path<String>,
) -> ApiResult<Json<DocumentConfig>> {
	let config = blocking(&state, move |workspace| workspace.documents().get_config(&slug)).await?;

	Ok(Json(config))
}

pub async fn update_document(
	State(state): State<AppState>,
	Path(slug): Path<String>,
	body: JsonBody<DocumentRequest>,
) -> ApiResult<Json<Value>> {
	let Json(request) = body?;

	let target = slug.clone();
	blocking(&state, move |workspace| {
		workspace.documents().update(&target, request)
	})
	.await?;

	Ok(Json(json!({
		"success": true,
		"message": "Document configuration updated successfully",
		"path": document_path(&slug),
		"slug": slug,
		"config_updated": true,
		"index_updated": true,
		"files_updated": [CONFIG_FILE, INDEX_FILE],
	})))
}

pub async fn delete_document(
	State(state): State<AppState>,
	Path(slug): Path<String>,
) -> ApiResult<Json<Value>> {
	let target = slug.clone();
	blocking(&state, move |workspace| workspace.documents().delete(&target)).await?;

	Ok(Json(json!({
		"success": true,
		"message": "Document deleted successfully",
		"deleted_path": document_path(&slug),
		"slug": slug,
	})))
}

/// The assembled document, as loaded by the generated `index.html`.
pub async fn render_document(
	State(state): State<AppState>,
	Path(slug): Path<String>,
) -> ApiResult<Json<BuiltDocument>> {
	let built = blocking(&state, move |workspace| workspace.build(&slug, None)).await?;

	Ok(Json(built))
}
