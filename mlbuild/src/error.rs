//! Hard failures that abort an `mlbuild` invocation.

use std::{path::PathBuf, process::ExitStatus};

use crate::platform::{Os, PlatformTarget};

/// A pipeline step that runs an external process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Step {
	/// `cmake -B ... -S ...`
	Configure,
	/// `cmake --build .`
	Build,
	/// The native test executables.
	Test,
}

/// Errors that stop the current command.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The host could not be mapped to a platform or architecture and the
	/// user did not pick one explicitly.
	#[error("unsupported host {what}: {value}; pass it explicitly")]
	UnsupportedHost {
		what:  &'static str,
		value: String,
	},
	/// A cross build that cannot proceed without a toolchain file.
	#[error("building for {os} from this host requires --toolchain: {hint}")]
	ToolchainRequired { os: Os, hint: &'static str },
	/// iOS builds can only run on macOS.
	#[error("iOS builds can only be performed on macOS")]
	IosRequiresMacos,
	/// A user-supplied option was rejected before anything ran.
	#[error("invalid option {option}: {reason}")]
	InvalidOption {
		option: &'static str,
		reason: String,
	},
	/// The project root could not be found.
	#[error(
		"could not find the project root from {}: no ancestor contains native/CMakeLists.txt or \
		 .git; pass --project-root",
		.start.display()
	)]
	ProjectRootNotFound { start: PathBuf },
	/// A required external tool could not be started.
	#[error("failed to run `{tool}`: {source}")]
	ToolMissing {
		tool:   String,
		source: std::io::Error,
	},
	/// An external step exited unsuccessfully.
	#[error("{step} failed for {target} ({status})")]
	StepFailed {
		step:   Step,
		target: PlatformTarget,
		status: ExitStatus,
	},
	/// The build directory was expected to exist.
	#[error("build directory does not exist: {}", .0.display())]
	BuildDirMissing(PathBuf),
	/// One or more native tests failed.
	#[error("{failed} of {total} tests failed for {target}")]
	TestsFailed {
		target: PlatformTarget,
		failed: usize,
		total:  usize,
	},
	/// The built library could not be found.
	#[error(
		"library file not found: {} (also searched: {})",
		.expected.display(),
		.searched.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
	)]
	LibraryNotFound {
		expected: PathBuf,
		searched: Vec<PathBuf>,
	},
	/// A staged artifact could not be replaced because something holds it.
	#[error(
		"failed to remove existing file {}; it is probably locked by the Unity editor. Close the \
		 process holding it and try again",
		.path.display()
	)]
	Locked { path: PathBuf },
	/// Copying the artifact failed after all retries.
	#[error(
		"failed to copy {} to {} after {attempts} attempts: {source}; close the process holding \
		 the target and try again",
		.from.display(),
		.to.display()
	)]
	CopyFailed {
		from:     PathBuf,
		to:       PathBuf,
		attempts: u32,
		source:   std::io::Error,
	},
	/// Any other I/O failure.
	#[error(transparent)]
	Io(#[from] std::io::Error),
}
