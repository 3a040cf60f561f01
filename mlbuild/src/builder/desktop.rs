//! Linux and macOS configure flags.

use super::{BuildConfig, GeneratorChoice};
use crate::{
	error::Error,
	host::Host,
	platform::{Arch, Os},
};

/// Linux needs nothing natively. Cross builds without a toolchain get a
/// best-effort system name override; some setups cope with that.
pub(super) fn linux(config: &BuildConfig, host: &dyn Host) -> GeneratorChoice {
	let mut choice = GeneratorChoice::default();

	if host.os() != Some(Os::Linux) {
		if let Some(toolchain) = config.toolchain_flag() {
			choice.flag(toolchain);
		} else {
			choice.flag("-DCMAKE_SYSTEM_NAME=Linux");
			choice.warn(
				"cross-compiling for Linux from a non-Linux host without a toolchain file; \
				 consider passing --toolchain",
			);
		}
	}

	choice
}

/// macOS selects the slice to build natively; cross builds are impossible
/// without an osxcross-style toolchain file.
pub(super) fn macos(
	arch: Arch,
	config: &BuildConfig,
	host: &dyn Host,
) -> Result<GeneratorChoice, Error> {
	let mut choice = GeneratorChoice::default();

	if host.os() == Some(Os::MacOs) {
		if let Some(flag) = osx_architectures(arch) {
			choice.flag(flag);
		}
	} else if let Some(toolchain) = config.toolchain_flag() {
		choice.flag(toolchain);
	} else {
		return Err(Error::ToolchainRequired {
			os:   Os::MacOs,
			hint: "use osxcross or build on macOS directly",
		});
	}

	Ok(choice)
}

/// `-DCMAKE_OSX_ARCHITECTURES=...` for the Apple slices we build.
pub(super) fn osx_architectures(arch: Arch) -> Option<&'static str> {
	match arch {
		Arch::Arm64 => Some("-DCMAKE_OSX_ARCHITECTURES=arm64"),
		Arch::X86_64 => Some("-DCMAKE_OSX_ARCHITECTURES=x86_64"),
		Arch::X86 | Arch::Arm64V8a | Arch::ArmeabiV7a => None,
	}
}
