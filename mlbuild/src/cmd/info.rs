//! Implements info command for displaying platforms and artifact locations.

use std::path::PathBuf;

use strum::IntoEnumIterator;

use crate::{
	builder::{ANDROID_ABIS, DEFAULT_JOBS},
	layout::ProjectLayout,
	platform::{Arch, Os, PlatformTarget},
};

pub fn run(
	_args: crate::InfoArgs,
	project_root: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
	let host = match (Os::host(), Arch::host()) {
		(Some(os), Some(arch)) => Some(PlatformTarget::new(os, arch)),
		_ => None,
	};

	println!("Host:");
	match host {
		Some(target) => println!("  {target}"),
		None => {
			println!(
				"  {}-{} (unsupported; pass --platform and --arch)",
				std::env::consts::OS,
				std::env::consts::ARCH
			);
		}
	}
	println!();

	println!("Platforms ({}):", Os::iter().count());
	for os in Os::iter() {
		println!("  {os:<8} {:<24} -> {}/", os.library_name(), os.staging_folder());
	}
	println!();

	println!("Architectures ({}):", Arch::iter().count());
	for arch in Arch::iter() {
		println!("  {arch:<12} -> {}/", arch.staging_folder());
	}
	println!("  Android ABIs: {}", ANDROID_ABIS.join(", "));
	println!();

	// Layout is best-effort; info is useful outside a checkout too.
	match ProjectLayout::discover(project_root) {
		Ok(layout) => {
			println!("Project:");
			println!("  Root:          {}", layout.root().display());
			println!("  Build root:    {}", layout.build_root().display());
			println!("  Staging root:  {}", layout.staging_root().display());
			if let Some(target) = host {
				println!("  Host build:    {}", layout.build_dir(target).display());
				println!("  Host staging:  {}", layout.staging_dir(target).display());
			}
		}
		Err(e) => {
			log::warn!("{e}");
		}
	}
	println!();

	println!("Environment:");
	println!(
		"  JOBS:  {}",
		std::env::var("JOBS").unwrap_or_else(|_| format!("(unset, default {DEFAULT_JOBS})"))
	);
	println!(
		"  CMAKE: {}",
		std::env::var("CMAKE").unwrap_or_else(|_| "(unset, using `cmake`)".to_string())
	);

	Ok(())
}
