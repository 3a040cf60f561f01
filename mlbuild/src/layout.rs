//! Where things live inside the MLogger repository.

use std::path::{Path, PathBuf};

use crate::{error::Error, platform::PlatformTarget};

/// Paths derived from the repository root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
	root: PathBuf,
}

impl ProjectLayout {
	/// Uses `root` as the repository root.
	#[must_use]
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into() }
	}

	/// Uses `explicit` if given, otherwise searches upward from the
	/// current directory. The root is always absolute; CMake runs with a
	/// different working directory.
	pub fn discover(explicit: Option<PathBuf>) -> Result<Self, Error> {
		if let Some(root) = explicit {
			return Ok(Self::new(std::path::absolute(root)?));
		}

		let start = std::env::current_dir()?;
		Self::find_from(&start)
	}

	/// Finds the nearest ancestor of `start` (inclusive) that holds
	/// `native/CMakeLists.txt`, or failing that a `.git` directory.
	pub fn find_from(start: &Path) -> Result<Self, Error> {
		if let Some(root) = start
			.ancestors()
			.find(|dir| dir.join("native").join("CMakeLists.txt").is_file())
		{
			return Ok(Self::new(root));
		}

		start
			.ancestors()
			.find(|dir| dir.join(".git").exists())
			.map(Self::new)
			.ok_or_else(|| {
				Error::ProjectRootNotFound {
					start: start.to_path_buf(),
				}
			})
	}

	/// The repository root.
	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// The native library's CMake project.
	#[must_use]
	pub fn native_dir(&self) -> PathBuf {
		self.root.join("native")
	}

	/// Parent of all per-target build directories.
	#[must_use]
	pub fn build_root(&self) -> PathBuf {
		self.native_dir().join("build")
	}

	/// The build directory for one target.
	#[must_use]
	pub fn build_dir(&self, target: PlatformTarget) -> PathBuf {
		self.build_root().join(target.to_string())
	}

	/// Root of the Unity plugin folder tree.
	#[must_use]
	pub fn staging_root(&self) -> PathBuf {
		self.root
			.join("unity")
			.join("Assets")
			.join("Plugins")
			.join("MLogger")
			.join("External")
	}

	/// Destination folder for one target's artifact.
	#[must_use]
	pub fn staging_dir(&self, target: PlatformTarget) -> PathBuf {
		self.staging_root()
			.join(target.os.staging_folder())
			.join(target.arch.staging_folder())
	}
}
