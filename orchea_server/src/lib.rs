//! `orchea_server` exposes an orchea project over a JSON API. It backs the
//! browser editor: snippet CRUD, sidecar configs, document directories, tag
//! statistics, search and document rendering. Every path outside `/api` is
//! served from the project's static directory.
//!
//! ### Usage
//!
//! ```sh
//! orchea serve --port 3000
//! ```
//!
//! When the port is taken the next ones are tried in turn, unless
//! `--no-fallback` is given.

use std::io::ErrorKind as IoErrorKind;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::put;
use orchea_core::OrcheaResult;
use orchea_core::ServerConfig;
use orchea_core::Workspace;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use crate::error::*;

mod error;
mod handlers;

/// Shared state of every handler.
#[derive(Debug, Clone)]
pub struct AppState {
	pub workspace: Arc<Workspace>,
}

/// Where and how to listen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
	pub host: String,
	pub port: u16,
	/// Number of following ports to try when `port` is in use.
	pub fallback_ports: u16,
}

impl From<&ServerConfig> for ServeOptions {
	fn from(config: &ServerConfig) -> Self {
		Self {
			host: config.host.clone(),
			port: config.port,
			fallback_ports: config.fallback_ports,
		}
	}
}

/// Build the API router for a workspace.
pub fn router(workspace: Workspace) -> Router {
	let static_files = ServeDir::new(workspace.static_dir());
	let state = AppState {
		workspace: Arc::new(workspace),
	};

	Router::new()
		.route("/api/health", get(handlers::health))
		.route(
			"/api/files",
			get(handlers::list_files).post(handlers::create_file),
		)
		.route(
			"/api/files/{filename}",
			get(handlers::get_file)
				.put(handlers::save_file)
				.delete(handlers::delete_file),
		)
		.route(
			"/api/files/{filename}/config",
			put(handlers::update_file_config),
		)
		.route("/api/files/{filename}/preview", get(handlers::preview_file))
		.route("/api/tags", get(handlers::tags))
		.route("/api/search", get(handlers::search_files))
		.route(
			"/api/documents",
			get(handlers::list_documents).post(handlers::create_document),
		)
		.route("/api/documents/{slug}", delete(handlers::delete_document))
		.route(
			"/api/documents/{slug}/config",
			get(handlers::get_document_config),
		)
		.route("/api/documents/{slug}/update", put(handlers::update_document))
		.route("/api/documents/{slug}/render", get(handlers::render_document))
		.fallback_service(static_files)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
		.with_state(state)
}

/// Bind `host:port`, moving on to the following ports while the address is
/// in use.
pub async fn bind_listener(host: &str, port: u16, fallback_ports: u16) -> std::io::Result<TcpListener> {
	let last = port.saturating_add(fallback_ports);
	let mut candidate = port;

	loop {
		match TcpListener::bind((host, candidate)).await {
			Ok(listener) => return Ok(listener),
			Err(error) if error.kind() == IoErrorKind::AddrInUse && candidate < last => {
				tracing::warn!(port = candidate, "port already in use, trying {}", candidate + 1);
				candidate += 1;
			}
			Err(error) => return Err(error),
		}
	}
}

/// Serve on an already bound listener until Ctrl+C.
pub async fn serve(listener: TcpListener, workspace: Workspace) -> OrcheaResult<()> {
	let address: SocketAddr = listener.local_addr()?;
	tracing::info!(%address, root = %workspace.root().display(), "server listening");

	axum::serve(listener, router(workspace))
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("server stopped");
	Ok(())
}

/// Bind according to `options` and serve until Ctrl+C.
pub async fn run_server(workspace: Workspace, options: ServeOptions) -> OrcheaResult<()> {
	let listener = bind_listener(&options.host, options.port, options.fallback_ports).await?;
	serve(listener, workspace).await
}

async fn shutdown_signal() {
	if let Err(error) = tokio::signal::ctrl_c().await {
		tracing::error!(%error, "failed to listen for shutdown signal");
		std::future::pending::<()>().await;
	}
}
