//! Filesystem operations that tolerate transient locks held by other
//! processes (IDEs indexing the build tree, the Unity editor holding a
//! loaded plugin, virus scanners, ...).

use std::{
	fs, io,
	path::{Path, PathBuf},
	thread,
	time::Duration,
};

/// A bounded retry schedule: `attempts` tries, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retry {
	/// Total number of attempts, including the first. At least one attempt
	/// is always made.
	pub attempts: u32,
	/// Sleep between attempts.
	pub delay:    Duration,
}

impl Retry {
	/// Removing stale CMake cache files before reconfiguring.
	pub const CACHE_CLEANUP: Self = Self::new(3, Duration::from_millis(500));
	/// Removing a previously staged artifact.
	pub const STAGE_REMOVE: Self = Self::new(5, Duration::from_secs(1));
	/// Copying a freshly built artifact into place.
	pub const STAGE_COPY: Self = Self::new(3, Duration::from_millis(500));

	/// Creates a new schedule.
	#[must_use]
	pub const fn new(attempts: u32, delay: Duration) -> Self {
		Self { attempts, delay }
	}

	/// Runs `op` until it succeeds or the attempts are exhausted, returning
	/// the last error in the latter case.
	pub fn run<T>(self, what: &str, mut op: impl FnMut() -> io::Result<T>) -> io::Result<T> {
		let attempts = self.attempts.max(1);
		let mut attempt = 1;
		loop {
			match op() {
				Ok(value) => return Ok(value),
				Err(e) if attempt < attempts => {
					log::debug!(
						"{what}: attempt {attempt}/{attempts} failed ({e}); retrying in {:?}",
						self.delay
					);
					thread::sleep(self.delay);
					attempt += 1;
				}
				Err(e) => return Err(e),
			}
		}
	}
}

/// What a tolerant removal ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
	/// Nothing was there.
	Absent,
	/// The path was deleted.
	Removed,
	/// The path could not be deleted and was renamed to the given path
	/// instead.
	MovedAside(PathBuf),
}

/// The path a stuck file or directory gets renamed to (`<name>.old`).
#[must_use]
pub fn aside_path(path: &Path) -> PathBuf {
	let mut name = path.file_name().unwrap_or_default().to_os_string();
	name.push(".old");
	path.with_file_name(name)
}

/// Deletes a file, retrying per `retry`; if it stays stuck, renames it
/// aside. Fails only when both deleting and renaming failed.
pub fn remove_file(path: &Path, retry: Retry) -> io::Result<Removal> {
	remove_with(path, retry, |path| fs::remove_file(path))
}

/// Deletes a directory tree, retrying per `retry`; if it stays stuck,
/// renames it aside. Fails only when both deleting and renaming failed.
pub fn remove_dir(path: &Path, retry: Retry) -> io::Result<Removal> {
	remove_with(path, retry, |path| fs::remove_dir_all(path))
}

/// Removes `path` with `remove`, falling back to renaming it to its
/// [`aside_path`]. An older backup in the way is removed with `remove` too.
fn remove_with(
	path: &Path,
	retry: Retry,
	remove: impl Fn(&Path) -> io::Result<()>,
) -> io::Result<Removal> {
	if !exists(path) {
		return Ok(Removal::Absent);
	}

	let removed = retry.run(&format!("remove {}", path.display()), || {
		match remove(path) {
			Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
			other => other,
		}
	});

	let Err(e) = removed else {
		return Ok(Removal::Removed);
	};

	let aside = aside_path(path);
	log::debug!(
		"could not remove {} ({e}); moving it to {}",
		path.display(),
		aside.display()
	);
	if exists(&aside) {
		let _ = remove(&aside);
	}
	fs::rename(path, &aside)
		.map(|()| Removal::MovedAside(aside))
		.map_err(|_| e)
}

/// Existence check that doesn't follow symlinks, so a dangling link still
/// counts as something to clean up.
fn exists(path: &Path) -> bool {
	fs::symlink_metadata(path).is_ok()
}
