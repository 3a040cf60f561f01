//! Toolchain: CMake and host compilers are installed and recent enough.

use std::{
	path::{Path, PathBuf},
	sync::LazyLock,
	time::Duration,
};

use regex::Regex;

use super::Report;
use crate::{
	builder::windows,
	host::{Host, PROBE_TIMEOUT},
	platform::Os,
};

/// Oldest CMake the native project supports.
pub const MIN_CMAKE_VERSION: (u32, u32) = (3, 20);

/// `cl` prints its banner and exits; it never needs long.
const CL_TIMEOUT: Duration = Duration::from_secs(2);

const VISUAL_STUDIO_DIRS: &[&str] = &[
	"C:/Program Files/Microsoft Visual Studio",
	"C:/Program Files (x86)/Microsoft Visual Studio",
];

const MSYS_DIRS: &[&str] = &["C:/msys64", "C:/msys32", "C:/msys2"];

static CMAKE_VERSION: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)version\s+(\d+)\.(\d+)").expect("cmake version pattern is valid")
});

static GCC_VERSION: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"gcc.*?(\d+\.\d+)").expect("gcc version pattern is valid"));

static GXX_VERSION: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"g\+\+.*?(\d+\.\d+)").expect("g++ version pattern is valid"));

pub fn check(host: &dyn Host) -> Report {
	let mut report = Report::new("toolchain check");

	cmake(host, &mut report);
	generators(host, &mut report);

	match host.os() {
		Some(Os::Windows) => {
			windows_compilers(host, &mut report);
			environment(host, &mut report);
			visual_studio(&dirs(VISUAL_STUDIO_DIRS), &mut report);
			mingw(host, &dirs(MSYS_DIRS), &mut report);
		}
		Some(_) => {
			unix_compilers(host, &mut report);
			environment(host, &mut report);
		}
		None => {
			report.warn("unrecognized host platform; compiler checks skipped");
			environment(host, &mut report);
		}
	}

	report
}

fn dirs(paths: &[&str]) -> Vec<PathBuf> {
	paths.iter().map(PathBuf::from).collect()
}

fn cmake(host: &dyn Host, report: &mut Report) {
	let cmake = host.cmake_program();
	let Some(output) = host
		.probe(&cmake, &["--version"], PROBE_TIMEOUT)
		.and_then(|out| out.stdout_if_success().map(str::to_string))
	else {
		report.error(format!(
			"CMake not found (`{cmake}`); install CMake {}.{} or later",
			MIN_CMAKE_VERSION.0, MIN_CMAKE_VERSION.1
		));
		return;
	};

	match parse_cmake_version(&output) {
		Some(version) if version < MIN_CMAKE_VERSION => {
			report.error(format!(
				"CMake version {}.{} is too old; requires {}.{} or later",
				version.0, version.1, MIN_CMAKE_VERSION.0, MIN_CMAKE_VERSION.1
			));
		}
		Some((major, minor)) => report.info(format!("CMake version: {major}.{minor}")),
		None => {
			report.info(format!(
				"CMake found: {}",
				output.split_whitespace().next().unwrap_or("unknown")
			));
		}
	}
}

/// `(major, minor)` from `cmake --version` output.
fn parse_cmake_version(output: &str) -> Option<(u32, u32)> {
	let captures = CMAKE_VERSION.captures(output)?;
	Some((captures[1].parse().ok()?, captures[2].parse().ok()?))
}

fn generators(host: &dyn Host, report: &mut Report) {
	let Some(listing) = windows::generator_listing(host) else {
		report.warn("could not list CMake generators");
		return;
	};

	let names = generator_names(&listing);
	let visual_studio = names
		.iter()
		.filter(|name| name.starts_with(windows::VISUAL_STUDIO_PREFIX))
		.copied()
		.collect::<Vec<_>>();
	let makefile = names
		.iter()
		.filter(|name| name.contains("MinGW") || name.contains("Ninja"))
		.copied()
		.collect::<Vec<_>>();

	if !visual_studio.is_empty() {
		report.info(format!("Visual Studio generators: {}", visual_studio.join(", ")));
	}
	if !makefile.is_empty() {
		report.info(format!("MinGW/Ninja generators: {}", makefile.join(", ")));
	}
	if visual_studio.is_empty() && makefile.is_empty() {
		report.warn("no Visual Studio or MinGW/Ninja generators found");
	}
}

/// Generator names from CMake's listing, one per `name = description`
/// entry. CMake marks its default generator with a leading `*`.
fn generator_names(listing: &str) -> Vec<&str> {
	listing
		.lines()
		.filter_map(|line| line.split_once('='))
		.map(|(name, _)| name.trim().trim_start_matches('*').trim())
		.filter(|name| !name.is_empty())
		.collect()
}

fn gcc_version(host: &dyn Host, program: &str, pattern: &Regex) -> Option<String> {
	let output = host.probe(program, &["--version"], PROBE_TIMEOUT)?;
	let stdout = output.stdout_if_success()?;
	Some(
		pattern
			.captures(stdout)
			.map_or_else(|| "unknown".to_string(), |c| c[1].to_string()),
	)
}

fn windows_compilers(host: &dyn Host, report: &mut Report) {
	// `cl` without arguments only prints its banner; starting at all is
	// enough to know it's on PATH.
	if host.probe("cl", &[], CL_TIMEOUT).is_some() {
		report.info("MSVC compiler found");
		return;
	}

	match gcc_version(host, "gcc", &GCC_VERSION) {
		Some(version) => report.info(format!("MinGW GCC found: {version}")),
		None => report.error("no C compiler found (MSVC or MinGW GCC)"),
	}
	match gcc_version(host, "g++", &GXX_VERSION) {
		Some(version) => report.info(format!("MinGW G++ found: {version}")),
		None => report.error("no C++ compiler found (MSVC or MinGW G++)"),
	}
}

fn unix_compilers(host: &dyn Host, report: &mut Report) {
	match gcc_version(host, "gcc", &GCC_VERSION) {
		Some(version) => report.info(format!("GCC found: {version}")),
		None => report.error("GCC not found"),
	}

	if let Some(version) = gcc_version(host, "g++", &GXX_VERSION) {
		report.info(format!("G++ found: {version}"));
	} else if host
		.probe("clang++", &["--version"], PROBE_TIMEOUT)
		.is_some_and(|out| out.success)
	{
		report.info("Clang++ found");
	} else {
		report.error("G++ or Clang++ not found");
	}
}

fn environment(host: &dyn Host, report: &mut Report) {
	let os = host
		.os()
		.map_or_else(|| std::env::consts::OS.to_string(), |os| os.to_string());
	report.info(format!("host platform: {os} {}", std::env::consts::ARCH));

	if host.os() == Some(Os::Windows) && windows::is_msys(host) {
		report.info("MSYS environment detected");
	}
}

/// The first of `candidates` that is a directory with something in it.
fn first_populated(candidates: &[PathBuf]) -> Option<&Path> {
	candidates
		.iter()
		.find(|dir| {
			dir.read_dir()
				.is_ok_and(|mut entries| entries.any(|e| e.is_ok_and(|e| e.path().is_dir())))
		})
		.map(PathBuf::as_path)
}

fn visual_studio(candidates: &[PathBuf], report: &mut Report) {
	match first_populated(candidates) {
		Some(dir) => report.info(format!("Visual Studio found at: {}", dir.display())),
		None => report.warn("Visual Studio not found (optional for MinGW builds)"),
	}
}

fn mingw(host: &dyn Host, candidates: &[PathBuf], report: &mut Report) {
	let on_path = host
		.probe("gcc", &["--version"], PROBE_TIMEOUT)
		.as_ref()
		.and_then(|out| out.stdout_if_success())
		.is_some_and(|out| {
			let out = out.to_ascii_lowercase();
			out.contains("mingw") || out.contains("msys")
		});
	if on_path {
		report.info("MinGW/MSYS found in PATH");
		return;
	}

	match candidates.iter().find(|dir| dir.exists()) {
		Some(dir) => report.info(format!("MSYS found at: {}", dir.display())),
		None => report.warn("MinGW/MSYS not found (optional if using Visual Studio)"),
	}
}
