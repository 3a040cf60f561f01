//! Per-platform knowledge of how to drive CMake.
//!
//! The platform set is fixed, so a [`Builder`] is a thin wrapper over a
//! [`PlatformTarget`] that dispatches on [`Os`]. Each platform answers the
//! same four questions: which flags configure it, which flags build it,
//! whether its tests can run here, and where its library ends up.

mod desktop;
mod mobile;
pub mod windows;

use std::path::{Path, PathBuf};

use crate::{
	error::Error,
	host::Host,
	platform::{Os, PlatformTarget},
};

/// Parallel jobs passed to the build step when `JOBS` is unset.
pub const DEFAULT_JOBS: u32 = 4;

/// Android ABIs the NDK toolchain file accepts.
pub const ANDROID_ABIS: &[&str] = &["arm64-v8a", "armeabi-v7a", "x86", "x86_64"];

/// User-selected build options. All fields are optional; which ones matter
/// depends on the target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildConfig {
	/// CMake generator to use instead of auto-detection.
	pub generator:   Option<String>,
	/// CMake toolchain file for cross builds.
	pub toolchain:   Option<PathBuf>,
	/// Android ABI, overriding the one derived from the architecture.
	pub android_abi: Option<String>,
	/// iOS SDK name (e.g. `iphonesimulator`) or absolute sysroot path.
	pub ios_sdk:     Option<String>,
}

impl BuildConfig {
	/// Rejects options that can't possibly work, before anything runs.
	pub fn validate(&self) -> Result<(), Error> {
		if let Some(generator) = &self.generator {
			if generator.trim().is_empty() {
				return Err(Error::InvalidOption {
					option: "--generator",
					reason: "must not be empty".into(),
				});
			}
		}

		if let Some(toolchain) = &self.toolchain {
			if !toolchain.is_file() {
				return Err(Error::InvalidOption {
					option: "--toolchain",
					reason: format!("{} is not a file", toolchain.display()),
				});
			}
		}

		if let Some(abi) = &self.android_abi {
			if !ANDROID_ABIS.contains(&abi.as_str()) {
				return Err(Error::InvalidOption {
					option: "--android-abi",
					reason: format!("{abi} is not one of {}", ANDROID_ABIS.join(", ")),
				});
			}
		}

		if let Some(sdk) = &self.ios_sdk {
			if sdk.trim().is_empty() {
				return Err(Error::InvalidOption {
					option: "--ios-sdk",
					reason: "must not be empty".into(),
				});
			}
		}

		Ok(())
	}

	/// The `-DCMAKE_TOOLCHAIN_FILE=...` flag, if a toolchain was given.
	fn toolchain_flag(&self) -> Option<String> {
		self.toolchain
			.as_ref()
			.map(|t| format!("-DCMAKE_TOOLCHAIN_FILE={}", t.display()))
	}
}

/// The resolved CMake generator and configure flags for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorChoice {
	/// The generator passed with `-G`, if any. `None` leaves the choice to
	/// CMake (and skips cache invalidation).
	pub generator: Option<String>,
	/// Configure flags, including `-G <generator>` when set.
	pub flags:     Vec<String>,
	/// Non-fatal problems found while resolving.
	pub warnings:  Vec<String>,
}

impl GeneratorChoice {
	/// Sets the generator, emitting `-G <generator>` ahead of other flags.
	fn set_generator(&mut self, generator: impl Into<String>) {
		let generator = generator.into();
		self.flags.insert(0, generator.clone());
		self.flags.insert(0, "-G".to_string());
		self.generator = Some(generator);
	}

	fn flag(&mut self, flag: impl Into<String>) {
		self.flags.push(flag.into());
	}

	fn warn(&mut self, warning: impl Into<String>) {
		self.warnings.push(warning.into());
	}

	/// Whether the generator is a Visual Studio (multi-config) generator.
	#[must_use]
	pub fn is_visual_studio(&self) -> bool {
		self.generator
			.as_deref()
			.is_some_and(|g| g.starts_with(windows::VISUAL_STUDIO_PREFIX))
	}
}

/// Drives CMake for one [`PlatformTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Builder {
	target: PlatformTarget,
}

impl Builder {
	/// Creates a builder for `target`.
	#[must_use]
	pub const fn new(target: PlatformTarget) -> Self {
		Self { target }
	}

	/// The target this builder builds.
	#[must_use]
	pub const fn target(&self) -> PlatformTarget {
		self.target
	}

	/// Resolves the generator and configure flags.
	///
	/// Errors only when the requested build can't proceed at all (a
	/// missing mandatory toolchain); everything else degrades to warnings.
	pub fn configure_flags(
		&self,
		config: &BuildConfig,
		host: &dyn Host,
	) -> Result<GeneratorChoice, Error> {
		let arch = self.target.arch;
		let mut choice = match self.target.os {
			Os::Windows => return Ok(windows::resolve(arch, config, host)),
			Os::Linux => desktop::linux(config, host),
			Os::MacOs => desktop::macos(arch, config, host)?,
			Os::Android => mobile::android(arch, config)?,
			Os::Ios => mobile::ios(arch, config, host)?,
		};

		if let Some(generator) = &config.generator {
			choice.set_generator(generator.clone());
		}

		Ok(choice)
	}

	/// Flags for `cmake --build .`.
	#[must_use]
	pub fn build_flags(&self, choice: &GeneratorChoice, jobs: u32) -> Vec<String> {
		match self.target.os {
			Os::Windows => windows::build_flags(choice),
			Os::Linux | Os::MacOs | Os::Android | Os::Ios => {
				vec!["-j".to_string(), jobs.to_string()]
			}
		}
	}

	/// Whether test executables built for this target can run on the host.
	#[must_use]
	pub const fn can_run_tests(&self) -> bool {
		!matches!(self.target.os, Os::Ios)
	}

	/// Suffix of executables produced for this target.
	#[must_use]
	pub const fn executable_extension(&self) -> &'static str {
		match self.target.os {
			Os::Windows => ".exe",
			_ => "",
		}
	}

	/// Finds the built library inside `build_dir`.
	pub fn locate_library(&self, build_dir: &Path) -> Result<PathBuf, Error> {
		let name = self.target.os.library_name();
		let lib_dir = match self.target.os {
			Os::Windows => build_dir.join("bin"),
			_ => build_dir.join("lib"),
		};

		let expected = lib_dir.join(name);
		let mut candidates = vec![expected.clone()];
		if self.target.os == Os::Ios {
			// Static archives sometimes land in the build root.
			candidates.push(build_dir.join(name));
		}
		let fallbacks = [build_dir.join("bin").join(name), build_dir.join("lib").join(name)];
		candidates.extend(fallbacks.iter().cloned());

		candidates
			.into_iter()
			.find(|p| p.is_file())
			.ok_or_else(|| {
				Error::LibraryNotFound {
					expected,
					searched: fallbacks.to_vec(),
				}
			})
	}
}

/// Reads the build parallelism from `JOBS`, defaulting to
/// [`DEFAULT_JOBS`].
pub fn jobs(host: &dyn Host) -> u32 {
	let Some(raw) = host.var("JOBS") else {
		return DEFAULT_JOBS;
	};

	match raw.trim().parse::<u32>() {
		Ok(n) if n > 0 => n,
		_ => {
			log::warn!("ignoring invalid JOBS={raw:?}; using {DEFAULT_JOBS}");
			DEFAULT_JOBS
		}
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use strum::IntoEnumIterator;

	use super::*;
	use crate::{
		host::{ProbeOutput, fake::FakeHost},
		platform::Arch,
	};

	fn builder(os: Os, arch: Arch) -> Builder {
		Builder::new(PlatformTarget::new(os, arch))
	}

	#[test]
	fn native_builds_never_need_a_toolchain() {
		let listing = ProbeOutput::ok("Generators\n  Unix Makefiles = ...\n  Ninja = ...\n");
		for os in [Os::Linux, Os::Windows, Os::MacOs] {
			for arch in [Arch::X86_64, Arch::Arm64] {
				let host = FakeHost::new(os).with_probe("cmake -G", listing.clone());
				let choice = builder(os, arch)
					.configure_flags(&BuildConfig::default(), &host)
					.unwrap_or_else(|e| panic!("{os}-{arch} failed natively: {e}"));
				assert!(
					!choice.flags.iter().any(|f| f.starts_with("-DCMAKE_TOOLCHAIN_FILE")),
					"{os}-{arch}: {:?}",
					choice.flags
				);
			}
		}
	}

	#[test]
	fn cross_builds_without_toolchain_degrade_to_warnings_where_possible() {
		let host = FakeHost::new(Os::MacOs);
		for os in [Os::Linux, Os::Windows] {
			let choice = builder(os, Arch::X86_64)
				.configure_flags(&BuildConfig::default(), &host)
				.unwrap();
			assert!(!choice.warnings.is_empty(), "{os}: expected a warning");
			assert!(!choice.flags.is_empty(), "{os}: expected some flags");
		}
	}

	#[test]
	fn user_generator_is_passed_through_for_non_windows_targets() {
		let host = FakeHost::new(Os::Linux);
		let config = BuildConfig {
			generator: Some("Ninja".into()),
			..BuildConfig::default()
		};
		let choice = builder(Os::Linux, Arch::X86_64)
			.configure_flags(&config, &host)
			.unwrap();
		assert_eq!(Some("Ninja".to_string()), choice.generator);
		assert_eq!(vec!["-G", "Ninja"], choice.flags);
	}

	#[test]
	fn unix_targets_build_with_jobs_flag() {
		let choice = GeneratorChoice::default();
		for os in [Os::Linux, Os::MacOs, Os::Android, Os::Ios] {
			assert_eq!(vec!["-j", "8"], builder(os, Arch::Arm64).build_flags(&choice, 8));
		}
	}

	#[test]
	fn only_ios_cannot_run_tests() {
		for os in Os::iter() {
			assert_eq!(os != Os::Ios, builder(os, Arch::Arm64).can_run_tests());
		}
		assert_eq!(".exe", builder(Os::Windows, Arch::X86).executable_extension());
		assert_eq!("", builder(Os::Linux, Arch::X86).executable_extension());
	}

	#[test]
	fn jobs_defaults_and_rejects_garbage() {
		assert_eq!(DEFAULT_JOBS, jobs(&FakeHost::new(Os::Linux)));
		assert_eq!(12, jobs(&FakeHost::new(Os::Linux).with_var("JOBS", "12")));
		assert_eq!(DEFAULT_JOBS, jobs(&FakeHost::new(Os::Linux).with_var("JOBS", "lots")));
		assert_eq!(DEFAULT_JOBS, jobs(&FakeHost::new(Os::Linux).with_var("JOBS", "0")));
	}

	#[test]
	fn validate_rejects_unusable_options() {
		assert!(BuildConfig::default().validate().is_ok());

		let bad_abi = BuildConfig {
			android_abi: Some("mips".into()),
			..BuildConfig::default()
		};
		assert!(matches!(
			bad_abi.validate(),
			Err(Error::InvalidOption {
				option: "--android-abi",
				..
			})
		));

		let missing_toolchain = BuildConfig {
			toolchain: Some("/definitely/not/here.cmake".into()),
			..BuildConfig::default()
		};
		assert!(missing_toolchain.validate().is_err());

		let blank_generator = BuildConfig {
			generator: Some(" ".into()),
			..BuildConfig::default()
		};
		assert!(blank_generator.validate().is_err());
	}

	#[test]
	fn locates_library_in_platform_directory() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir_all(dir.path().join("bin")).unwrap();
		fs::write(dir.path().join("bin/mlogger_win.dll"), "dll").unwrap();

		let path = builder(Os::Windows, Arch::X86_64)
			.locate_library(dir.path())
			.unwrap();
		assert_eq!(dir.path().join("bin/mlogger_win.dll"), path);
	}

	#[test]
	fn locates_library_in_fallback_directory() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir_all(dir.path().join("bin")).unwrap();
		fs::write(dir.path().join("bin/libmlogger_linux.so"), "so").unwrap();

		let path = builder(Os::Linux, Arch::X86_64)
			.locate_library(dir.path())
			.unwrap();
		assert_eq!(dir.path().join("bin/libmlogger_linux.so"), path);
	}

	#[test]
	fn ios_library_may_sit_in_build_root() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(dir.path().join("libmlogger_ios.a"), "a").unwrap();

		let path = builder(Os::Ios, Arch::Arm64)
			.locate_library(dir.path())
			.unwrap();
		assert_eq!(dir.path().join("libmlogger_ios.a"), path);
	}

	#[test]
	fn missing_library_reports_searched_paths() {
		let dir = tempfile::tempdir().unwrap();
		let err = builder(Os::Android, Arch::Arm64V8a)
			.locate_library(dir.path())
			.unwrap_err();
		let Error::LibraryNotFound { expected, searched } = err else {
			panic!("unexpected error: {err}");
		};
		assert_eq!(dir.path().join("lib/libmlogger_android.so"), expected);
		assert_eq!(2, searched.len());
	}
}
