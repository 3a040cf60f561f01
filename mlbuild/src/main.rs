//! CLI for building, checking and staging the MLogger native library.

pub(crate) mod builder;
pub(crate) mod cache;
pub(crate) mod cmd;
pub(crate) mod error;
pub(crate) mod fsutil;
pub(crate) mod host;
pub(crate) mod layout;
pub(crate) mod platform;
pub(crate) mod stage;

use std::path::PathBuf;

use clap::{Parser, builder::TypedValueParser};
use strum::VariantNames;

use crate::{
	builder::BuildConfig,
	error::Error,
	platform::{Arch, Os, PlatformTarget},
};

/// mlbuild: MLogger native library build utility
///
/// Configures, builds, tests and stages the native library for every
/// supported platform, and verifies the local environment can do so.
#[derive(Parser, Debug)]
struct Args {
	/// Log verbosely. Specify multiple times for more verbosity.
	#[clap(long, short = 'v', action = clap::ArgAction::Count, global = true)]
	pub verbose:      u8,
	/// The repository root. Found by searching upward from the current
	/// directory if omitted.
	#[clap(long, global = true)]
	pub project_root: Option<PathBuf>,
	/// The command to execute
	#[clap(subcommand)]
	command:          Command,
}

/// Subcommands for the MLogger build utility
#[derive(Parser, Debug)]
enum Command {
	/// Configures, builds, tests and stages the native library
	Build(BuildArgs),
	/// Verifies the project layout and the build environment
	Check(CheckArgs),
	/// Displays the supported platforms and where their artifacts go
	Info(InfoArgs),
}

/// Arguments for the `build` command
#[derive(Parser, Debug)]
pub(crate) struct BuildArgs {
	/// Target platform. Defaults to the host platform.
	#[clap(
		long, short = 'p',
		value_parser = clap::builder::PossibleValuesParser::new(Os::VARIANTS.iter().copied())
			.try_map(|s| s.parse::<Os>())
	)]
	pub platform: Option<Os>,

	/// Target architecture (or Android ABI). Defaults to the host
	/// architecture.
	#[clap(
		long, short = 'a',
		value_parser = clap::builder::PossibleValuesParser::new(Arch::VARIANTS.iter().copied())
			.try_map(|s| s.parse::<Arch>())
	)]
	pub arch: Option<Arch>,

	/// CMake generator to use instead of auto-detection.
	#[clap(long, short = 'G')]
	pub generator: Option<String>,

	/// CMake toolchain file for cross builds.
	#[clap(long)]
	pub toolchain: Option<PathBuf>,

	/// Android ABI, overriding the one derived from `--arch`.
	#[clap(long)]
	pub android_abi: Option<String>,

	/// iOS SDK name or absolute sysroot path.
	#[clap(long)]
	pub ios_sdk: Option<String>,

	/// Don't run the native test executables.
	#[clap(long)]
	pub skip_tests: bool,

	/// Only run tests whose name contains this (case-insensitive).
	#[clap(long)]
	pub test_filter: Option<String>,

	/// Don't copy the built library into the Unity plugin folder.
	#[clap(long)]
	pub skip_copy: bool,

	/// Discard the CMake cache before configuring.
	#[clap(long)]
	pub clean: bool,
}

impl BuildArgs {
	/// The selected target, filling in the host platform and architecture
	/// where none was given.
	pub fn target(&self) -> Result<PlatformTarget, Error> {
		let os = match self.platform {
			Some(os) => os,
			None => {
				Os::host().ok_or_else(|| {
					Error::UnsupportedHost {
						what:  "platform",
						value: std::env::consts::OS.to_string(),
					}
				})?
			}
		};

		let arch = match self.arch {
			Some(arch) => arch,
			None => {
				Arch::host().ok_or_else(|| {
					Error::UnsupportedHost {
						what:  "architecture",
						value: std::env::consts::ARCH.to_string(),
					}
				})?
			}
		};

		Ok(PlatformTarget::new(os, arch))
	}

	/// The per-target options, validated.
	pub fn config(&self) -> Result<BuildConfig, Error> {
		let config = BuildConfig {
			generator:   self.generator.clone(),
			// CMake resolves a relative toolchain file against the build tree.
			toolchain:   self.toolchain.as_deref().map(std::path::absolute).transpose()?,
			android_abi: self.android_abi.clone(),
			ios_sdk:     self.ios_sdk.clone(),
		};
		config.validate()?;
		Ok(config)
	}
}

/// Arguments for the `check` command
#[derive(Parser, Debug)]
pub(crate) struct CheckArgs {
	/// Only check cross-compilation support for this platform.
	#[clap(
		long, short = 'p',
		value_parser = clap::builder::PossibleValuesParser::new(Os::VARIANTS.iter().copied())
			.try_map(|s| s.parse::<Os>())
	)]
	pub platform: Option<Os>,

	/// Print the reports as JSON.
	#[clap(long)]
	pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub(crate) struct InfoArgs {}

fn pmain() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	let verbosity = match args.verbose {
		0 => log::LevelFilter::Info,
		1 => log::LevelFilter::Debug,
		_ => log::LevelFilter::Trace,
	};

	log::set_max_level(verbosity);
	let logger = colog::default_builder().filter_level(verbosity).build();

	match args.command {
		Command::Build(build_args) => {
			cmd::build::run(build_args, args.project_root, args.verbose > 0, logger)?;
		}
		Command::Check(check_args) => {
			log::set_boxed_logger(Box::new(logger))?;
			cmd::check::run(check_args, args.project_root)?;
		}
		Command::Info(info_args) => {
			log::set_boxed_logger(Box::new(logger))?;
			cmd::info::run(info_args, args.project_root)?;
		}
	}

	Ok(())
}

fn main() {
	if let Err(e) = pmain() {
		log::error!("fatal: {}", e);
		std::process::exit(1);
	}
}
