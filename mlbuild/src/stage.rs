//! Copying built libraries into the Unity plugin tree.
//!
//! The editor keeps loaded native plugins open, so the destination is
//! frequently locked. Removal and copy are both retried, and a destination
//! that stays locked is a hard error telling the user what to close.

use std::{fs, path::Path};

use crate::{
	error::Error,
	fsutil::{self, Removal, Retry},
};

/// Retry schedules used while staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicy {
	/// For removing the previously staged file.
	pub remove: Retry,
	/// For copying the new file into place.
	pub copy:   Retry,
}

impl Default for StagePolicy {
	fn default() -> Self {
		Self {
			remove: Retry::STAGE_REMOVE,
			copy:   Retry::STAGE_COPY,
		}
	}
}

/// Copies `source` to `target`, replacing whatever is there.
pub fn stage_artifact(source: &Path, target: &Path, policy: StagePolicy) -> Result<(), Error> {
	if let Some(parent) = target.parent() {
		fs::create_dir_all(parent)?;
	}

	match fsutil::remove_file(target, policy.remove) {
		Ok(Removal::Absent) => {}
		Ok(Removal::Removed) => log::debug!("removed previous {}", target.display()),
		Ok(Removal::MovedAside(aside)) => {
			log::warn!(
				"{} is locked; moved it aside to {}",
				target.display(),
				aside.display()
			);
		}
		Err(e) => {
			log::debug!("giving up on removing {}: {e}", target.display());
			return Err(Error::Locked {
				path: target.to_path_buf(),
			});
		}
	}

	policy
		.copy
		.run(&format!("copy to {}", target.display()), || fs::copy(source, target))
		.map(|bytes| log::debug!("copied {bytes} bytes to {}", target.display()))
		.map_err(|source_err| {
			Error::CopyFailed {
				from:     source.to_path_buf(),
				to:       target.to_path_buf(),
				attempts: policy.copy.attempts.max(1),
				source:   source_err,
			}
		})
}

#[cfg(test)]
mod tests {
	use std::time::Duration;

	use super::*;

	const FAST: StagePolicy = StagePolicy {
		remove: Retry::new(5, Duration::ZERO),
		copy:   Retry::new(3, Duration::ZERO),
	};

	#[test]
	fn copies_into_fresh_directory() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("libmlogger_linux.so");
		fs::write(&source, "new").unwrap();
		let target = dir.path().join("unity/Linux/x86_64/libmlogger_linux.so");

		stage_artifact(&source, &target, FAST).unwrap();

		assert_eq!("new", fs::read_to_string(&target).unwrap());
	}

	#[test]
	fn overwrites_existing_artifact() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("mlogger_win.dll");
		fs::write(&source, "new build").unwrap();
		let target = dir.path().join("staged/mlogger_win.dll");
		fs::create_dir_all(target.parent().unwrap()).unwrap();
		fs::write(&target, "old build").unwrap();

		stage_artifact(&source, &target, FAST).unwrap();

		assert_eq!("new build", fs::read_to_string(&target).unwrap());
		assert!(!dir.path().join("staged/mlogger_win.dll.old").exists());
	}

	#[test]
	fn undeletable_destination_is_a_locked_error_naming_the_path() {
		let dir = tempfile::tempdir().unwrap();
		let source = dir.path().join("mlogger_win.dll");
		fs::write(&source, "new build").unwrap();

		// Neither deletable as a file nor renamable over the non-empty backup.
		let target = dir.path().join("staged/mlogger_win.dll");
		fs::create_dir_all(target.join("held")).unwrap();
		fs::create_dir_all(dir.path().join("staged/mlogger_win.dll.old/held")).unwrap();

		let err = stage_artifact(&source, &target, FAST).unwrap_err();

		let Error::Locked { path } = &err else {
			panic!("unexpected error: {err}");
		};
		assert_eq!(&target, path);
		assert!(err.to_string().contains("mlogger_win.dll"));
	}

	#[test]
	fn missing_source_is_a_copy_failure() {
		let dir = tempfile::tempdir().unwrap();
		let target = dir.path().join("staged/libmlogger_ios.a");

		let err = stage_artifact(&dir.path().join("nope.a"), &target, FAST).unwrap_err();

		assert!(matches!(err, Error::CopyFailed { attempts: 3, .. }));
	}
}
