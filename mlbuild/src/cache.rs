//! Detection and removal of stale CMake configuration.
//!
//! CMake refuses (or worse, half-works) when a build directory configured
//! with one generator is reconfigured with another. Before configuring we
//! compare the generator recorded in `CMakeCache.txt` with the one about to
//! be used and clear the cache if they differ.

use std::{
	fs,
	path::Path,
	sync::LazyLock,
};

use regex::Regex;

use crate::fsutil::{self, Removal, Retry};

/// CMake's persisted configuration.
pub const CACHE_FILE: &str = "CMakeCache.txt";
/// CMake's intermediate files, tied to the cached generator.
pub const FILES_DIR: &str = "CMakeFiles";

static GENERATOR_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?m)^CMAKE_GENERATOR:INTERNAL=(.+)$").expect("generator pattern is valid")
});

/// Extracts the generator recorded in a cache file's contents.
#[must_use]
pub fn parse_generator(contents: &str) -> Option<String> {
	GENERATOR_ENTRY
		.captures(contents)
		.map(|c| c[1].trim().to_string())
		.filter(|g| !g.is_empty())
}

/// Reads the generator recorded in `build_dir`'s cache, if there is a
/// readable cache that records one.
#[must_use]
pub fn cached_generator(build_dir: &Path) -> Option<String> {
	let cache = build_dir.join(CACHE_FILE);
	match fs::read_to_string(&cache) {
		Ok(contents) => parse_generator(&contents),
		Err(e) => {
			log::warn!("could not read {}: {e}", cache.display());
			None
		}
	}
}

/// Clears `build_dir`'s CMake cache if it was configured with a generator
/// other than `generator`.
///
/// A cache without a readable generator entry counts as a mismatch.
/// Returns whether the cache was invalidated. Cleanup trouble is reported
/// as a warning, never as an error.
pub fn invalidate_if_stale(build_dir: &Path, generator: &str, retry: Retry) -> bool {
	if !build_dir.join(CACHE_FILE).exists() {
		return false;
	}

	match cached_generator(build_dir) {
		Some(cached) if cached == generator => {
			log::debug!("CMake cache generator matches: {generator}");
			false
		}
		Some(cached) => {
			log::info!("generator changed: {cached} -> {generator}; cleaning CMake cache");
			clear(build_dir, retry);
			true
		}
		None => {
			log::info!("CMake cache records no generator; cleaning CMake cache");
			clear(build_dir, retry);
			true
		}
	}
}

/// Unconditionally clears `build_dir`'s CMake cache and intermediate files.
///
/// Returns whether there was anything to clear.
pub fn force_clean(build_dir: &Path, retry: Retry) -> bool {
	if !build_dir.join(CACHE_FILE).exists() && !build_dir.join(FILES_DIR).exists() {
		log::debug!("no CMake cache in {}; nothing to clean", build_dir.display());
		return false;
	}

	log::info!("force cleaning CMake cache in {}", build_dir.display());
	clear(build_dir, retry);
	true
}

fn clear(build_dir: &Path, retry: Retry) {
	let cache = build_dir.join(CACHE_FILE);
	let files = build_dir.join(FILES_DIR);

	let cache_result = fsutil::remove_file(&cache, retry);
	let files_result = fsutil::remove_dir(&files, retry);

	for (path, result) in [(&cache, cache_result), (&files, files_result)] {
		match result {
			Ok(Removal::Absent | Removal::Removed) => {}
			Ok(Removal::MovedAside(aside)) => {
				log::warn!(
					"{} was locked; moved it aside to {}",
					path.display(),
					aside.display()
				);
			}
			Err(e) => {
				log::warn!(
					"could not remove {}: {e}; CMake may reuse stale configuration",
					path.display()
				);
			}
		}
	}
}
