//! CMake generator resolution for Windows targets.
//!
//! Windows is the one target where the generator has to be picked: native
//! builds may have any mix of Visual Studio, MinGW and Ninja installed, and
//! an MSYS shell wants Makefiles even when Visual Studio is present.

use std::sync::LazyLock;

use regex::Regex;

use super::{BuildConfig, GeneratorChoice};
use crate::{
	host::{Host, PROBE_TIMEOUT},
	platform::{Arch, Os},
};

/// Every Visual Studio generator name starts with this.
pub const VISUAL_STUDIO_PREFIX: &str = "Visual Studio";

/// Known Visual Studio generators, newest first.
pub const VISUAL_STUDIO_GENERATORS: &[&str] = &[
	"Visual Studio 18 2026",
	"Visual Studio 17 2022",
	"Visual Studio 16 2019",
	"Visual Studio 15 2017",
	"Visual Studio 14 2015",
];

/// Makefile-style generators, in order of preference.
pub const MAKEFILE_GENERATORS: &[&str] = &["MinGW Makefiles", "Ninja", "Unix Makefiles"];

/// Used when nothing better can be detected. If it's unusable, CMake says
/// so at configure time.
pub const FALLBACK_GENERATOR: &str = "MinGW Makefiles";

/// Environment variables set by MSYS2 shells.
const MSYS_VARS: &[&str] = &["MSYSTEM", "MSYS", "MSYS2_PATH"];

static ANY_VISUAL_STUDIO: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"Visual Studio \d+ \d{4}").expect("visual studio pattern is valid")
});

/// Resolves the generator and configure flags for a Windows target.
///
/// Never fails: every detection problem becomes a warning on the returned
/// choice, and CMake gets the final word on whether the generator works.
pub(super) fn resolve(arch: Arch, config: &BuildConfig, host: &dyn Host) -> GeneratorChoice {
	let mut choice = GeneratorChoice::default();

	if host.os() != Some(Os::Windows) {
		if let Some(toolchain) = config.toolchain_flag() {
			choice.flag(toolchain);
			if let Some(generator) = &config.generator {
				choice.set_generator(generator.clone());
			}
		} else {
			choice.set_generator(
				config
					.generator
					.clone()
					.unwrap_or_else(|| FALLBACK_GENERATOR.to_string()),
			);
			choice.flag("-DCMAKE_SYSTEM_NAME=Windows");
			choice.warn(
				"cross-compiling for Windows from a non-Windows host without a toolchain file; \
				 native compatibility is not guaranteed. Consider passing --toolchain",
			);
		}
		return choice;
	}

	let generator = if let Some(generator) = &config.generator {
		generator.clone()
	} else {
		let listing = generator_listing(host);
		let listing = listing.as_deref();

		if is_msys(host) {
			let generator = detect_makefile_generator(listing);
			if !generator.starts_with("MinGW") {
				choice.warn(format!(
					"MSYS environment detected but no MinGW generator found; using {generator}. \
					 Make sure MinGW-w64 is installed and in PATH"
				));
			}
			generator
		} else if let Some(generator) = listing.and_then(detect_visual_studio) {
			generator
		} else {
			let generator = detect_makefile_generator(listing);
			choice.warn(format!(
				"Visual Studio not found; using alternative generator {generator}. Install Visual \
				 Studio or pass --generator for better compatibility"
			));
			generator
		}
	};

	choice.set_generator(generator);

	if choice.is_visual_studio() {
		match arch {
			Arch::X86_64 => choice.flags.extend(["-A".to_string(), "x64".to_string()]),
			Arch::X86 => choice.flags.extend(["-A".to_string(), "Win32".to_string()]),
			Arch::Arm64 | Arch::Arm64V8a | Arch::ArmeabiV7a => {}
		}
	}

	choice
}

/// Visual Studio generators are multi-config and need the configuration
/// picked at build time.
pub(super) fn build_flags(choice: &GeneratorChoice) -> Vec<String> {
	if choice.is_visual_studio() {
		vec!["--config".into(), "Release".into()]
	} else {
		Vec::new()
	}
}

/// Whether we're running inside an MSYS/MSYS2 shell.
pub fn is_msys(host: &dyn Host) -> bool {
	if MSYS_VARS.iter().any(|v| host.has_var(v)) {
		return true;
	}

	let mentions_msys = |key: &str| {
		host.var(key)
			.is_some_and(|v| v.to_ascii_lowercase().contains("msys"))
	};

	mentions_msys("PATH") || mentions_msys("SHELL")
}

/// CMake's self-reported list of generators.
///
/// `cmake -G` with no argument prints the list (with a non-zero status on
/// most versions), so its combined output is accepted if it looks like a
/// list; otherwise `cmake --help` is tried.
pub fn generator_listing(host: &dyn Host) -> Option<String> {
	let cmake = host.cmake_program();

	if let Some(out) = host.probe(&cmake, &["-G"], PROBE_TIMEOUT) {
		let text = out.combined();
		if text.contains("Generators") || (out.success && !out.stdout.trim().is_empty()) {
			return Some(text);
		}
	}

	match host.probe(&cmake, &["--help"], PROBE_TIMEOUT) {
		Some(out) if out.success && !out.stdout.trim().is_empty() => Some(out.stdout),
		_ => {
			log::debug!("could not list CMake generators via `{cmake}`");
			None
		}
	}
}

/// Picks the newest Visual Studio generator CMake knows about.
fn detect_visual_studio(listing: &str) -> Option<String> {
	VISUAL_STUDIO_GENERATORS
		.iter()
		.find(|g| listing.contains(*g))
		.map(|g| (*g).to_string())
		.or_else(|| ANY_VISUAL_STUDIO.find(listing).map(|m| m.as_str().to_string()))
}

/// Picks the preferred Makefile-style generator, or the fallback.
fn detect_makefile_generator(listing: Option<&str>) -> String {
	listing
		.and_then(|listing| MAKEFILE_GENERATORS.iter().find(|g| listing.contains(*g)))
		.map_or_else(|| FALLBACK_GENERATOR.to_string(), |g| (*g).to_string())
}

#[cfg(test)]
mod tests {
	use std::path::PathBuf;

	use super::*;
	use crate::host::{ProbeOutput, fake::FakeHost};

	const VS_LISTING: &str = "\
Generators
* Visual Studio 17 2022        = Generates Visual Studio 2022 project files.
  Visual Studio 16 2019        = Generates Visual Studio 2019 project files.
  Borland Makefiles            = Generates Borland makefiles.
  NMake Makefiles              = Generates NMake makefiles.
  MinGW Makefiles              = Generates a make file for use with mingw32-make.
  Ninja                        = Generates build.ninja files.
";

	const MAKE_LISTING: &str = "\
Generators
  Ninja                        = Generates build.ninja files.
  Unix Makefiles               = Generates standard UNIX makefiles.
";

	fn windows_host(listing: &str) -> FakeHost {
		FakeHost::new(Os::Windows).with_probe("cmake --help", ProbeOutput::ok(listing))
	}

	#[test]
	fn native_picks_visual_studio_with_x64_platform() {
		let host = windows_host(VS_LISTING).with_var("PATH", r"C:\Windows\system32;C:\CMake\bin");

		let choice = resolve(Arch::X86_64, &BuildConfig::default(), &host);

		assert_eq!(Some("Visual Studio 17 2022".to_string()), choice.generator);
		assert_eq!(vec!["-G", "Visual Studio 17 2022", "-A", "x64"], choice.flags);
		assert!(choice.warnings.is_empty());
		assert_eq!(vec!["--config", "Release"], build_flags(&choice));
	}

	#[test]
	fn native_x86_selects_win32_platform() {
		let choice = resolve(Arch::X86, &BuildConfig::default(), &windows_host(VS_LISTING));
		assert_eq!(vec!["-G", "Visual Studio 17 2022", "-A", "Win32"], choice.flags);
	}

	#[test]
	fn native_arm64_gets_no_platform_flag() {
		let choice = resolve(Arch::Arm64, &BuildConfig::default(), &windows_host(VS_LISTING));
		assert_eq!(vec!["-G", "Visual Studio 17 2022"], choice.flags);
	}

	#[test]
	fn listing_from_bare_g_flag_is_accepted_despite_failure_status() {
		let host = FakeHost::new(Os::Windows).with_probe(
			"cmake -G",
			ProbeOutput {
				success: false,
				stdout:  String::new(),
				stderr:  format!("CMake Error: No generator specified for -G\n\n{VS_LISTING}"),
			},
		);

		let choice = resolve(Arch::X86_64, &BuildConfig::default(), &host);
		assert_eq!(Some("Visual Studio 17 2022".to_string()), choice.generator);
		assert_eq!(vec!["cmake -G"], host.calls());
	}

	#[test]
	fn unknown_visual_studio_versions_are_still_found() {
		let listing = "Generators\n  Visual Studio 12 2013 = old\n  Ninja = fast\n";
		let choice = resolve(Arch::X86_64, &BuildConfig::default(), &windows_host(listing));
		assert_eq!(Some("Visual Studio 12 2013".to_string()), choice.generator);
	}

	#[test]
	fn msys_prefers_mingw_even_with_visual_studio() {
		let host = windows_host(VS_LISTING).with_var("MSYSTEM", "MINGW64");

		let choice = resolve(Arch::X86_64, &BuildConfig::default(), &host);

		assert_eq!(Some("MinGW Makefiles".to_string()), choice.generator);
		assert_eq!(vec!["-G", "MinGW Makefiles"], choice.flags);
		assert!(choice.warnings.is_empty());
		assert!(build_flags(&choice).is_empty());
	}

	#[test]
	fn msys_is_detected_from_path_and_shell() {
		let host = FakeHost::new(Os::Windows).with_var("PATH", r"C:\MSYS64\usr\bin;C:\Windows");
		assert!(is_msys(&host));

		let host = FakeHost::new(Os::Windows).with_var("SHELL", "/c/msys2/usr/bin/bash");
		assert!(is_msys(&host));

		let host = FakeHost::new(Os::Windows).with_var("PATH", r"C:\Windows");
		assert!(!is_msys(&host));
	}

	#[test]
	fn msys_without_mingw_warns_about_substitute() {
		let host = windows_host(MAKE_LISTING).with_var("MSYS", "winsymlinks:nativestrict");

		let choice = resolve(Arch::X86_64, &BuildConfig::default(), &host);

		assert_eq!(Some("Ninja".to_string()), choice.generator);
		assert_eq!(1, choice.warnings.len());
		assert!(choice.warnings[0].contains("Ninja"));
	}

	#[test]
	fn missing_visual_studio_falls_back_with_warning() {
		let choice = resolve(Arch::X86_64, &BuildConfig::default(), &windows_host(MAKE_LISTING));

		assert_eq!(Some("Ninja".to_string()), choice.generator);
		assert_eq!(vec!["-G", "Ninja"], choice.flags);
		assert_eq!(1, choice.warnings.len());
		assert!(choice.warnings[0].contains("Visual Studio not found"));
	}

	#[test]
	fn unreachable_cmake_falls_back_to_mingw() {
		let host = FakeHost::new(Os::Windows);

		let choice = resolve(Arch::X86_64, &BuildConfig::default(), &host);

		assert_eq!(Some(FALLBACK_GENERATOR.to_string()), choice.generator);
		assert_eq!(1, choice.warnings.len());
		assert_eq!(vec!["cmake -G", "cmake --help"], host.calls());
	}

	#[test]
	fn explicit_generator_skips_detection() {
		let host = FakeHost::new(Os::Windows);
		let config = BuildConfig {
			generator: Some("Visual Studio 16 2019".into()),
			..BuildConfig::default()
		};

		let choice = resolve(Arch::X86_64, &config, &host);

		assert_eq!(vec!["-G", "Visual Studio 16 2019", "-A", "x64"], choice.flags);
		assert!(host.calls().is_empty());
	}

	#[test]
	fn cross_without_toolchain_uses_fallback_and_warns() {
		let host = FakeHost::new(Os::Linux);

		let choice = resolve(Arch::X86_64, &BuildConfig::default(), &host);

		assert_eq!(Some(FALLBACK_GENERATOR.to_string()), choice.generator);
		assert_eq!(
			vec!["-G", "MinGW Makefiles", "-DCMAKE_SYSTEM_NAME=Windows"],
			choice.flags
		);
		assert_eq!(1, choice.warnings.len());
		assert!(host.calls().is_empty());
	}

	#[test]
	fn cross_with_toolchain_passes_it_through() {
		let host = FakeHost::new(Os::Linux);
		let config = BuildConfig {
			toolchain: Some(PathBuf::from("/opt/toolchains/mingw-w64.cmake")),
			..BuildConfig::default()
		};

		let choice = resolve(Arch::X86_64, &config, &host);
		assert_eq!(None, choice.generator);
		assert_eq!(
			vec!["-DCMAKE_TOOLCHAIN_FILE=/opt/toolchains/mingw-w64.cmake"],
			choice.flags
		);
		assert!(choice.warnings.is_empty());

		let config = BuildConfig {
			generator: Some("Ninja".into()),
			..config
		};
		let choice = resolve(Arch::X86_64, &config, &host);
		assert_eq!(
			vec![
				"-G",
				"Ninja",
				"-DCMAKE_TOOLCHAIN_FILE=/opt/toolchains/mingw-w64.cmake"
			],
			choice.flags
		);
	}
}
