//! Cross-compilation: which foreign targets this host can build.
//!
//! Cross toolchains are optional, so everything here is a warning at worst.

use std::{
	fs,
	path::{Path, PathBuf},
};

use strum::IntoEnumIterator;

use super::Report;
use crate::{
	host::{Host, PROBE_TIMEOUT},
	platform::Os,
};

/// The NDK's CMake toolchain file, relative to the NDK root.
pub const NDK_TOOLCHAIN: &str = "build/cmake/android.toolchain.cmake";

const NDK_VARS: &[&str] = &["ANDROID_NDK_HOME", "ANDROID_NDK_ROOT"];

/// Default NDK locations under the user's home directory. The Android SDK
/// manager installs side-by-side versions below these.
const NDK_HOME_DIRS: &[&str] = &[
	"AppData/Local/Android/Sdk/ndk",
	"Library/Android/sdk/ndk",
	"Android/Sdk/ndk",
];

const NDK_SYSTEM_DIRS: &[&str] = &["/opt/android-ndk", "/usr/local/android-ndk"];

const LINUX_CROSS_COMPILERS: &[&str] = &[
	"x86_64-linux-gnu-gcc",
	"aarch64-linux-gnu-gcc",
	"arm-linux-gnueabihf-gcc",
];

const MINGW_CROSS_COMPILERS: &[(&str, &str)] = &[
	("x86_64-w64-mingw32-gcc", "64-bit"),
	("i686-w64-mingw32-gcc", "32-bit"),
];

const OSXCROSS_DIRS: &[&str] = &["/opt/osxcross", "/usr/local/osxcross"];

/// Checks `platform`, or every platform if `None`.
pub fn check(host: &dyn Host, platform: Option<Os>) -> Report {
	let mut report = Report::new("cross-compilation check");

	let platforms = platform.map_or_else(|| Os::iter().collect(), |os| vec![os]);
	for os in platforms {
		if host.os() == Some(os) {
			log::debug!("{os} is the host platform; no cross toolchain needed");
			continue;
		}

		match os {
			Os::Android => android(host, &mut report),
			Os::Ios => ios(host, &mut report),
			Os::Linux => linux(host, &mut report),
			Os::Windows => windows(host, &mut report),
			Os::MacOs => macos(host, &mut report),
		}
	}

	report
}

fn android(host: &dyn Host, report: &mut Report) {
	let candidates = ndk_candidates(host);

	match find_ndk(&candidates) {
		Ok(ndk) => report.info(format!("Android NDK found: {}", ndk.display())),
		Err(incomplete) => {
			for dir in incomplete {
				report.warn(format!(
					"Android NDK found but toolchain file missing: {}",
					dir.join(NDK_TOOLCHAIN).display()
				));
			}
			report.warn("Android NDK not found; set ANDROID_NDK_HOME");
		}
	}
}

/// Where to look for the NDK: the environment if it names one, otherwise
/// the usual install locations.
fn ndk_candidates(host: &dyn Host) -> Vec<PathBuf> {
	if let Some(ndk) = NDK_VARS
		.iter()
		.find_map(|var| host.var(var))
		.filter(|v| !v.trim().is_empty())
	{
		return vec![PathBuf::from(ndk)];
	}

	let home = host.var("HOME").or_else(|| host.var("USERPROFILE"));
	home.iter()
		.flat_map(|home| NDK_HOME_DIRS.iter().map(move |dir| Path::new(home).join(dir)))
		.chain(NDK_SYSTEM_DIRS.iter().map(PathBuf::from))
		.collect()
}

/// The first candidate holding the NDK toolchain file, either directly or
/// in a versioned subdirectory (newest first).
///
/// On failure, returns the candidates that exist but lack the file.
fn find_ndk(candidates: &[PathBuf]) -> Result<PathBuf, Vec<PathBuf>> {
	let mut incomplete = Vec::new();

	for candidate in candidates.iter().filter(|c| c.is_dir()) {
		if candidate.join(NDK_TOOLCHAIN).is_file() {
			return Ok(candidate.clone());
		}

		let mut versions = fs::read_dir(candidate)
			.map(|entries| {
				entries
					.filter_map(Result::ok)
					.map(|e| e.path())
					.filter(|p| p.join(NDK_TOOLCHAIN).is_file())
					.collect::<Vec<_>>()
			})
			.unwrap_or_default();
		versions.sort_by_cached_key(|path| ndk_version(path));

		match versions.pop() {
			Some(newest) => return Ok(newest),
			None => incomplete.push(candidate.clone()),
		}
	}

	Err(incomplete)
}

/// The numeric components of a side-by-side NDK directory name, such as
/// `[26, 1, 10909125]`. Parsing stops at the first non-numeric component.
fn ndk_version(path: &Path) -> Vec<u64> {
	path.file_name()
		.and_then(|name| name.to_str())
		.map(|name| {
			name.split('.')
				.map_while(|part| part.parse().ok())
				.collect()
		})
		.unwrap_or_default()
}

fn ios(host: &dyn Host, report: &mut Report) {
	if host.os() != Some(Os::MacOs) {
		report.warn("iOS builds require a macOS host with Xcode");
		return;
	}

	let succeeds = |program: &str, args: &[&str]| {
		host.probe(program, args, PROBE_TIMEOUT)
			.is_some_and(|out| out.success)
	};

	if !succeeds("xcodebuild", &["-version"]) {
		report.warn("Xcode not found (required for iOS builds)");
	} else if !succeeds("xcrun", &["--find", "clang"]) {
		report.warn("Xcode command line tools not found");
	} else {
		report.info("iOS toolchain available");
	}
}

fn has_compiler(host: &dyn Host, program: &str) -> bool {
	host.probe(program, &["--version"], PROBE_TIMEOUT)
		.is_some_and(|out| out.success)
}

fn linux(host: &dyn Host, report: &mut Report) {
	match LINUX_CROSS_COMPILERS
		.iter()
		.find(|gcc| has_compiler(host, gcc))
	{
		Some(gcc) => report.info(format!("Linux cross-compiler found: {gcc}")),
		None => report.warn("Linux cross-compilation toolchain not found"),
	}
}

fn windows(host: &dyn Host, report: &mut Report) {
	match MINGW_CROSS_COMPILERS
		.iter()
		.find(|(gcc, _)| has_compiler(host, gcc))
	{
		Some((gcc, bits)) => report.info(format!("MinGW cross-compiler found ({bits}): {gcc}")),
		None => report.warn("Windows cross-compilation toolchain (MinGW) not found"),
	}
}

fn macos(host: &dyn Host, report: &mut Report) {
	let candidates = match host.var("OSXCROSS_PATH").filter(|v| !v.trim().is_empty()) {
		Some(path) => vec![PathBuf::from(path)],
		None => OSXCROSS_DIRS.iter().map(PathBuf::from).collect(),
	};

	match candidates.iter().find(|dir| dir.exists()) {
		Some(dir) => report.info(format!("osxcross found: {}", dir.display())),
		None => {
			report.warn(
				"macOS cross-compilation toolchain (osxcross) not found; set OSXCROSS_PATH",
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::host::{ProbeOutput, fake::FakeHost};

	fn ndk_at(root: &Path) {
		let toolchain = root.join(NDK_TOOLCHAIN);
		fs::create_dir_all(toolchain.parent().unwrap()).unwrap();
		fs::write(toolchain, "").unwrap();
	}

	#[test]
	fn host_platform_is_skipped() {
		let host = FakeHost::new(Os::Linux);
		let report = check(&host, Some(Os::Linux));
		assert_eq!(Report::new("cross-compilation check"), report);
		assert!(host.calls().is_empty());
	}

	#[test]
	fn missing_cross_tools_never_fail() {
		let host = FakeHost::new(Os::Linux).with_var("ANDROID_NDK_HOME", "/definitely/not/an/ndk");
		let report = check(&host, None);

		assert!(report.passed());
		// android, ios, windows and macos; linux is native.
		assert_eq!(4, report.warnings.len(), "{:?}", report.warnings);
	}

	#[test]
	fn finds_ndk_from_environment() {
		let dir = tempfile::tempdir().unwrap();
		ndk_at(dir.path());
		let host = FakeHost::new(Os::Linux)
			.with_var("ANDROID_NDK_ROOT", dir.path().to_str().unwrap());

		let report = check(&host, Some(Os::Android));

		assert_eq!(vec![format!("Android NDK found: {}", dir.path().display())], report.info);
		assert!(report.warnings.is_empty());
	}

	#[test]
	fn finds_newest_versioned_ndk() {
		let dir = tempfile::tempdir().unwrap();
		ndk_at(&dir.path().join("ndk/25.2.9519653"));
		ndk_at(&dir.path().join("ndk/26.1.10909125"));
		fs::create_dir_all(dir.path().join("ndk/.temp")).unwrap();

		assert_eq!(
			Ok(dir.path().join("ndk/26.1.10909125")),
			find_ndk(&[dir.path().join("missing"), dir.path().join("ndk")])
		);
	}

	#[test]
	fn ndk_versions_compare_numerically() {
		let dir = tempfile::tempdir().unwrap();
		ndk_at(&dir.path().join("ndk/9.0.1"));
		ndk_at(&dir.path().join("ndk/21.4.7075529"));
		ndk_at(&dir.path().join("ndk/21.10.1"));

		assert_eq!(
			Ok(dir.path().join("ndk/21.10.1")),
			find_ndk(&[dir.path().join("ndk")])
		);
		assert_eq!(vec![26, 1, 10_909_125], ndk_version(Path::new("ndk/26.1.10909125")));
		assert!(ndk_version(Path::new("ndk/.temp")).is_empty());
	}

	#[test]
	fn ndk_without_toolchain_is_reported() {
		let dir = tempfile::tempdir().unwrap();
		fs::create_dir_all(dir.path().join("android-ndk/build")).unwrap();
		let host = FakeHost::new(Os::MacOs)
			.with_var("ANDROID_NDK_HOME", dir.path().join("android-ndk").to_str().unwrap());

		let report = check(&host, Some(Os::Android));

		assert_eq!(2, report.warnings.len());
		assert!(report.warnings[0].contains("toolchain file missing"));
	}

	#[test]
	fn ios_needs_xcode_on_macos() {
		let report = check(&FakeHost::new(Os::Windows), Some(Os::Ios));
		assert_eq!(vec!["iOS builds require a macOS host with Xcode"], report.warnings);

		let host = FakeHost::new(Os::MacOs)
			.with_probe("xcodebuild -version", ProbeOutput::ok("Xcode 15.4"))
			.with_probe("xcrun --find clang", ProbeOutput::ok("/usr/bin/clang"));
		let report = check(&host, Some(Os::Ios));
		assert_eq!(vec!["iOS toolchain available"], report.info);

		let host = FakeHost::new(Os::MacOs)
			.with_probe("xcodebuild -version", ProbeOutput::ok("Xcode 15.4"));
		let report = check(&host, Some(Os::Ios));
		assert_eq!(vec!["Xcode command line tools not found"], report.warnings);
	}

	#[test]
	fn first_available_cross_compiler_wins() {
		let host = FakeHost::new(Os::MacOs)
			.with_probe("aarch64-linux-gnu-gcc --version", ProbeOutput::ok("gcc 13"))
			.with_probe("i686-w64-mingw32-gcc --version", ProbeOutput::ok("gcc 12"));

		let report = check(&host, Some(Os::Linux));
		assert_eq!(vec!["Linux cross-compiler found: aarch64-linux-gnu-gcc"], report.info);

		let report = check(&host, Some(Os::Windows));
		assert_eq!(
			vec!["MinGW cross-compiler found (32-bit): i686-w64-mingw32-gcc"],
			report.info
		);
	}

	#[test]
	fn osxcross_from_environment() {
		let dir = tempfile::tempdir().unwrap();
		let host = FakeHost::new(Os::Linux).with_var("OSXCROSS_PATH", dir.path().to_str().unwrap());

		let report = check(&host, Some(Os::MacOs));

		assert_eq!(vec![format!("osxcross found: {}", dir.path().display())], report.info);
	}
}
