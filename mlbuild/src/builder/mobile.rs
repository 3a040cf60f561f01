//! Android and iOS configure flags.

use std::path::Path;

use super::{BuildConfig, GeneratorChoice, desktop::osx_architectures};
use crate::{
	error::Error,
	host::{Host, PROBE_TIMEOUT},
	platform::{Arch, Os},
};

/// Minimum Android API level the library targets.
pub const ANDROID_PLATFORM: &str = "android-21";

/// SDK used for iOS builds when none is given.
pub const DEFAULT_IOS_SDK: &str = "iphoneos";

/// Android always cross-compiles through the NDK's toolchain file.
///
/// Checked before anything is probed, so a missing toolchain fails fast.
pub(super) fn android(arch: Arch, config: &BuildConfig) -> Result<GeneratorChoice, Error> {
	let Some(toolchain) = config.toolchain_flag() else {
		return Err(Error::ToolchainRequired {
			os:   Os::Android,
			hint: "pass the NDK's build/cmake/android.toolchain.cmake",
		});
	};

	let abi = config
		.android_abi
		.as_deref()
		.unwrap_or_else(|| android_abi(arch));

	let mut choice = GeneratorChoice::default();
	choice.flag(toolchain);
	choice.flag(format!("-DANDROID_ABI={abi}"));
	choice.flag(format!("-DANDROID_PLATFORM={ANDROID_PLATFORM}"));
	Ok(choice)
}

/// The NDK ABI matching an architecture. Desktop-style `arm64` maps to
/// `arm64-v8a`.
fn android_abi(arch: Arch) -> &'static str {
	match arch {
		Arch::Arm64V8a | Arch::Arm64 => "arm64-v8a",
		Arch::ArmeabiV7a => "armeabi-v7a",
		Arch::X86_64 => "x86_64",
		Arch::X86 => "x86",
	}
}

/// iOS builds need Xcode, so they only run on macOS.
pub(super) fn ios(
	arch: Arch,
	config: &BuildConfig,
	host: &dyn Host,
) -> Result<GeneratorChoice, Error> {
	if host.os() != Some(Os::MacOs) {
		return Err(Error::IosRequiresMacos);
	}

	let mut choice = GeneratorChoice::default();
	choice.flag("-DCMAKE_SYSTEM_NAME=iOS");
	if let Some(flag) = osx_architectures(arch) {
		choice.flag(flag);
	}

	let sdk = config.ios_sdk.as_deref().unwrap_or(DEFAULT_IOS_SDK);
	choice.flag(format!("-DCMAKE_OSX_SYSROOT={}", sysroot(sdk, host)));
	Ok(choice)
}

/// Absolute SDK paths are used as-is; SDK names are resolved through
/// `xcrun`, falling back to the bare name (which CMake also accepts).
fn sysroot(sdk: &str, host: &dyn Host) -> String {
	if Path::new(sdk).is_absolute() {
		return sdk.to_string();
	}

	host.probe("xcrun", &["--sdk", sdk, "--show-sdk-path"], PROBE_TIMEOUT)
		.as_ref()
		.and_then(|out| out.stdout_if_success())
		.filter(|path| !path.is_empty())
		.map_or_else(
			|| {
				log::debug!("xcrun could not resolve SDK {sdk}; passing the name through");
				sdk.to_string()
			},
			str::to_string,
		)
}
