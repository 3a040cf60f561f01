//! Project integrity: the repository has the layout a build expects.

use std::{fs, path::Path};

use super::Report;
use crate::layout::ProjectLayout;

/// Directories every checkout must have.
pub const REQUIRED_DIRS: &[&str] = &[
	"native",
	"native/src",
	"native/src/core",
	"native/src/bridge",
	"native/src/utils",
	"native/external",
	"unity/Assets/Plugins/MLogger",
];

/// Files every checkout must have.
pub const REQUIRED_FILES: &[&str] = &["native/CMakeLists.txt"];

/// Core sources; a missing one is suspicious but CMake has the final say.
pub const CORE_SOURCES: &[&str] = &[
	"native/src/core/logger_manager.h",
	"native/src/core/logger_manager.cpp",
	"native/src/core/logger_config.h",
	"native/src/core/logger_config.cpp",
	"native/src/bridge/bridge.h",
	"native/src/bridge/bridge.cpp",
];

pub fn check(layout: &ProjectLayout) -> Report {
	let root = layout.root();
	let mut report = Report::new("project integrity check");

	structure(root, &mut report);
	submodules(root, &mut report);
	sources(root, &mut report);
	cmake_lists(root, &mut report);

	report
}

fn structure(root: &Path, report: &mut Report) {
	for dir in REQUIRED_DIRS {
		let path = root.join(dir);
		if !path.exists() {
			report.error(format!("required directory missing: {dir}"));
		} else if !path.is_dir() {
			report.error(format!("path exists but is not a directory: {dir}"));
		}
	}

	for file in REQUIRED_FILES {
		let path = root.join(file);
		if !path.exists() {
			report.error(format!("required file missing: {file}"));
		} else if !path.is_file() {
			report.error(format!("path exists but is not a file: {file}"));
		}
	}
}

fn submodules(root: &Path, report: &mut Report) {
	let gitmodules = root.join(".gitmodules");
	if !gitmodules.exists() {
		return;
	}

	let contents = match fs::read_to_string(&gitmodules) {
		Ok(contents) => contents,
		Err(e) => {
			report.error(format!("failed to read .gitmodules: {e}"));
			return;
		}
	};

	for submodule in submodule_paths(&contents) {
		let path = root.join(submodule);
		if !path.exists() {
			report.error(format!("submodule not found: {submodule}"));
		} else if !path.join(".git").exists() && !path.join("CMakeLists.txt").exists() {
			report.error(format!(
				"submodule not initialized: {submodule}; run `git submodule update --init \
				 --recursive`"
			));
		} else {
			report.info(format!("submodule ok: {submodule}"));
		}
	}
}

/// The `path = ...` entries of a `.gitmodules` file.
fn submodule_paths(contents: &str) -> Vec<&str> {
	contents
		.lines()
		.filter_map(|line| {
			line.trim()
				.strip_prefix("path")?
				.trim_start()
				.strip_prefix('=')
				.map(str::trim)
		})
		.filter(|path| !path.is_empty())
		.collect()
}

fn sources(root: &Path, report: &mut Report) {
	for source in CORE_SOURCES {
		if !root.join(source).exists() {
			report.warn(format!("source file missing: {source}"));
		}
	}
}

fn cmake_lists(root: &Path, report: &mut Report) {
	let path = root.join("native/CMakeLists.txt");
	if !path.is_file() {
		// Already reported as a missing required file.
		return;
	}

	match fs::read_to_string(&path) {
		Ok(contents) => {
			if !contents.contains("project(") {
				report.warn("native/CMakeLists.txt may be missing a project() declaration");
			}
			if !contents.contains("add_library") {
				report.warn("native/CMakeLists.txt may be missing add_library()");
			}
		}
		Err(e) => report.error(format!("failed to read native/CMakeLists.txt: {e}")),
	}
}
