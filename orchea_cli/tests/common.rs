#![allow(dead_code)]

use std::path::Path;

use assert_cmd::Command;
use orchea_core::AnyEmptyResult;

pub fn orchea_cmd() -> Command {
	let mut cmd = Command::cargo_bin("orchea").unwrap_or_else(|e| panic!("binary not built: {e}"));
	cmd.env("NO_COLOR", "1");
	cmd.env_remove("RUST_LOG");
	cmd.env_remove("PORT");
	cmd
}

/// A project with two labelled snippets and one document using both.
pub fn write_project(root: &Path) -> AnyEmptyResult {
	let repository = root.join("repository");
	let guide = root.join("documents").join("guide");
	std::fs::create_dir_all(&repository)?;
	std::fs::create_dir_all(&guide)?;

	std::fs::write(
		repository.join("intro.md"),
		"# Intro\n\nWelcome to the guide.\n",
	)?;
	std::fs::write(
		repository.join("intro.yaml"),
		"title: \"Introduction\"\nlabels: [\"Guide\", \"Basics\"]\n",
	)?;
	std::fs::write(
		repository.join("install.md"),
		"# Install\n\nRun the installer to install the tool.\n",
	)?;
	std::fs::write(
		repository.join("install.yaml"),
		"title: \"Installation\"\nlabels: [\"Guide\"]\n",
	)?;
	std::fs::write(
		guide.join("config.yaml"),
		"document_title: \"User Guide\"\nversion: \"1.2\"\ndate: \"2026-01-01\"\nmarkdown_files:\n  - \
		 \"intro.md\"\n  - \"install.md\"\n",
	)?;

	Ok(())
}
