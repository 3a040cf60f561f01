//! Target platforms, architectures and the fixed naming tables that
//! go with them.

use std::fmt;

/// Operating systems the native library is built for.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Hash,
	strum::EnumString,
	strum::Display,
	strum::EnumIter,
	strum::VariantNames,
)]
#[strum(serialize_all = "lowercase")]
pub enum Os {
	/// Linux (desktop).
	Linux,
	/// Windows (desktop).
	Windows,
	/// macOS (desktop).
	MacOs,
	/// Android (mobile).
	Android,
	/// iOS (mobile).
	Ios,
}

impl Os {
	/// Returns the operating system this binary is running on, if it is
	/// one the library can be built from.
	#[must_use]
	pub const fn host() -> Option<Self> {
		if cfg!(target_os = "windows") {
			Some(Self::Windows)
		} else if cfg!(target_os = "macos") {
			Some(Self::MacOs)
		} else if cfg!(target_os = "linux") {
			Some(Self::Linux)
		} else {
			None
		}
	}

	/// The file name of the library artifact produced for this platform.
	#[must_use]
	pub const fn library_name(self) -> &'static str {
		match self {
			Self::Linux => "libmlogger_linux.so",
			Self::Windows => "mlogger_win.dll",
			Self::MacOs => "libmlogger_macos.dylib",
			Self::Android => "libmlogger_android.so",
			Self::Ios => "libmlogger_ios.a",
		}
	}

	/// The plugin folder name the artifact is staged under.
	#[must_use]
	pub const fn staging_folder(self) -> &'static str {
		match self {
			Self::Linux => "Linux",
			Self::Windows => "Windows",
			Self::MacOs => "macOS",
			Self::Android => "Android",
			Self::Ios => "iOS",
		}
	}
}

/// CPU architectures (and Android ABIs) the library is built for.
#[derive(
	Debug,
	Clone,
	Copy,
	PartialEq,
	Eq,
	Hash,
	strum::EnumString,
	strum::Display,
	strum::EnumIter,
	strum::VariantNames,
)]
pub enum Arch {
	/// 32-bit x86.
	#[strum(serialize = "x86")]
	X86,
	/// 64-bit x86.
	#[strum(serialize = "x86_64")]
	X86_64,
	/// 64-bit ARM (desktop and Apple naming).
	#[strum(serialize = "arm64")]
	Arm64,
	/// 64-bit ARM (Android ABI naming).
	#[strum(serialize = "arm64-v8a")]
	Arm64V8a,
	/// 32-bit ARMv7 (Android ABI naming).
	#[strum(serialize = "armeabi-v7a")]
	ArmeabiV7a,
}

impl Arch {
	/// Returns the architecture this binary is running on, if supported.
	#[must_use]
	pub fn host() -> Option<Self> {
		Self::from_machine(std::env::consts::ARCH)
	}

	/// Maps a machine name (as reported by `uname -m`, Rust's
	/// `std::env::consts::ARCH` or Windows) to an architecture.
	#[must_use]
	pub fn from_machine(machine: &str) -> Option<Self> {
		match machine.to_ascii_lowercase().as_str() {
			"x86_64" | "amd64" => Some(Self::X86_64),
			"x86" | "i386" | "i686" => Some(Self::X86),
			"aarch64" | "arm64" => Some(Self::Arm64),
			_ => None,
		}
	}

	/// The plugin folder name the artifact is staged under.
	#[must_use]
	pub const fn staging_folder(self) -> &'static str {
		match self {
			Self::X86 => "x86",
			Self::X86_64 => "x86_64",
			Self::Arm64 => "arm64",
			Self::Arm64V8a => "arm64-v8a",
			Self::ArmeabiV7a => "armeabi-v7a",
		}
	}
}

/// An (operating system, architecture) pair selected for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformTarget {
	/// The target operating system.
	pub os:   Os,
	/// The target architecture.
	pub arch: Arch,
}

impl PlatformTarget {
	/// Creates a new target.
	#[must_use]
	pub const fn new(os: Os, arch: Arch) -> Self {
		Self { os, arch }
	}

	/// Whether building this target from `host` is a cross build.
	#[must_use]
	pub fn is_cross_from(&self, host: Option<Os>) -> bool {
		host != Some(self.os)
	}
}

impl fmt::Display for PlatformTarget {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.os, self.arch)
	}
}
