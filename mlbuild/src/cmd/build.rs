//! Implements the configure, build, test and stage pipeline.

use std::{
	fs,
	path::PathBuf,
	process::{Command, Output, Stdio},
	time::Duration,
};

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressFinish, ProgressStyle};
use indicatif_log_bridge::LogWrapper;

use crate::{
	builder::{self, BuildConfig, Builder, GeneratorChoice},
	cache,
	error::{Error, Step},
	fsutil::Retry,
	host::{Host, SystemHost},
	layout::ProjectLayout,
	stage::{self, StagePolicy},
};

/// Tests every platform that can run them is expected to build.
pub const BASIC_TESTS: &[&str] = &["test_mlogger", "test_simple", "test_c_interface"];

/// Longer-running edge case and load tests.
pub const ENHANCED_TESTS: &[&str] = &[
	"test_boundary",
	"test_error_handling",
	"test_stress",
	"test_memory",
];

/// Groups the test executables are reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum TestCategory {
	/// See [`BASIC_TESTS`].
	#[strum(serialize = "basic")]
	Basic,
	/// See [`ENHANCED_TESTS`].
	#[strum(serialize = "enhanced")]
	Enhanced,
}

pub fn run(
	args: crate::BuildArgs,
	project_root: Option<PathBuf>,
	verbose: bool,
	logger: impl log::Log + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
	let mp = MultiProgress::new();

	// Subprocess output goes straight to the terminal in verbose mode, which
	// would tear the spinners.
	if verbose {
		mp.set_draw_target(ProgressDrawTarget::hidden());
	}

	LogWrapper::new(mp.clone(), logger).try_init()?;

	let target = args.target()?;
	let config = args.config()?;
	let layout = ProjectLayout::discover(project_root)?;
	let host = SystemHost;

	log::info!("building MLogger for {target}");
	if target.is_cross_from(host.os()) {
		log::info!(
			"cross-compiling from {}",
			host.os().map_or_else(|| std::env::consts::OS.to_string(), |os| os.to_string())
		);
	}
	log::debug!("project root: {}", layout.root().display());

	let pipeline = Pipeline {
		host: &host,
		layout: &layout,
		builder: Builder::new(target),
		config: &config,
		verbose,
	};

	let choice = step(&mp, Step::Configure, |_| pipeline.configure(args.clean))?;
	step(&mp, Step::Build, |_| pipeline.build(&choice))?;

	if args.skip_tests {
		log::info!("tests skipped");
	} else {
		step(&mp, Step::Test, |pb| pipeline.test(pb, args.test_filter.as_deref()))?;
	}

	if args.skip_copy {
		log::info!("copy to Unity skipped");
	} else {
		let pb = spinner(&mp, "stage");
		match pipeline.stage() {
			Ok(staged) => {
				finish(&pb, true);
				log::info!("staged {}", staged.display());
			}
			Err(e) => {
				finish(&pb, false);
				return Err(e.into());
			}
		}
	}

	log::info!("build completed successfully for {target}");

	Ok(())
}

/// Runs one pipeline step under its own spinner.
fn step<T>(
	mp: &MultiProgress,
	step: Step,
	f: impl FnOnce(&ProgressBar) -> Result<T, Error>,
) -> Result<T, Error> {
	let pb = spinner(mp, &step.to_string());
	let result = f(&pb);
	finish(&pb, result.is_ok());
	result
}

fn spinner(mp: &MultiProgress, prefix: &str) -> ProgressBar {
	let pb = mp.add(
		ProgressBar::new_spinner()
			.with_prefix(prefix.to_string())
			.with_finish(ProgressFinish::AndLeave),
	);
	pb.set_style(style("yellow"));
	pb.set_message("running...");
	pb.enable_steady_tick(Duration::from_millis(100));
	pb
}

fn finish(pb: &ProgressBar, ok: bool) {
	if ok {
		pb.set_style(style("green"));
		pb.set_message("OK");
	} else {
		pb.set_style(style("red"));
		pb.set_message("FAIL");
	}
	pb.finish();
}

fn style(color: &str) -> ProgressStyle {
	ProgressStyle::default_spinner()
		.template(&format!(
			"{{spinner:.{color}}}   [{{elapsed_precise:.dim}}] [{{prefix:.{color}}}] {{msg}}"
		))
		.expect("spinner template is valid")
}

/// Everything a build of one target needs.
struct Pipeline<'a> {
	host:    &'a dyn Host,
	layout:  &'a ProjectLayout,
	builder: Builder,
	config:  &'a BuildConfig,
	verbose: bool,
}

impl Pipeline<'_> {
	fn build_dir(&self) -> PathBuf {
		self.layout.build_dir(self.builder.target())
	}

	/// Resolves flags, clears a stale cache and runs the CMake configure.
	fn configure(&self, clean: bool) -> Result<GeneratorChoice, Error> {
		let choice = self.builder.configure_flags(self.config, self.host)?;
		for warning in &choice.warnings {
			log::warn!("{warning}");
		}

		let build_dir = self.build_dir();
		fs::create_dir_all(&build_dir)?;

		if clean {
			cache::force_clean(&build_dir, Retry::CACHE_CLEANUP);
		} else if let Some(generator) = &choice.generator {
			cache::invalidate_if_stale(&build_dir, generator, Retry::CACHE_CLEANUP);
		}

		let mut cmd = Command::new(self.host.cmake_program());
		cmd.arg("-B")
			.arg(&build_dir)
			.arg("-S")
			.arg(self.layout.native_dir())
			.args(&choice.flags)
			.arg("-DCMAKE_BUILD_TYPE=Release")
			.arg("-DBUILD_TESTS=ON")
			.current_dir(self.layout.root());
		self.run_command(Step::Configure, cmd)?;

		let compile_commands = build_dir.join("compile_commands.json");
		if compile_commands.is_file() {
			let dest = self.layout.native_dir().join("compile_commands.json");
			match fs::copy(&compile_commands, &dest) {
				Ok(_) => log::debug!("copied compile_commands.json to {}", dest.display()),
				Err(e) => log::warn!("could not copy compile_commands.json: {e}"),
			}
		}

		Ok(choice)
	}

	/// Runs `cmake --build .` in the configured build directory.
	fn build(&self, choice: &GeneratorChoice) -> Result<(), Error> {
		let build_dir = self.build_dir();
		if !build_dir.is_dir() {
			return Err(Error::BuildDirMissing(build_dir));
		}

		let jobs = builder::jobs(self.host);
		let mut cmd = Command::new(self.host.cmake_program());
		cmd.arg("--build")
			.arg(".")
			.args(self.builder.build_flags(choice, jobs))
			.current_dir(&build_dir);
		self.run_command(Step::Build, cmd)
	}

	/// Runs the native test executables from `<build>/bin`.
	fn test(&self, pb: &ProgressBar, filter: Option<&str>) -> Result<(), Error> {
		let target = self.builder.target();
		if !self.builder.can_run_tests() {
			log::info!("skipping tests: {target} executables cannot run on this host");
			return Ok(());
		}

		let selected = select_tests(filter);
		if selected.is_empty() {
			log::warn!("no tests match filter {:?}", filter.unwrap_or_default());
			return Ok(());
		}

		let bin_dir = self.build_dir().join("bin");
		let extension = self.builder.executable_extension();
		let mut category = None;
		let mut total = 0;
		let mut passed = 0;

		for (test_category, name) in selected {
			if category != Some(test_category) {
				log::info!("{test_category} tests:");
				category = Some(test_category);
			}

			let path = bin_dir.join(format!("{name}{extension}"));
			if !path.is_file() {
				log::warn!("  test executable not found: {name}");
				continue;
			}

			total += 1;
			pb.set_message(format!("{name}..."));

			let output = Command::new(&path)
				.current_dir(&bin_dir)
				.stdin(Stdio::null())
				.output()
				.map_err(|source| {
					Error::ToolMissing {
						tool: path.display().to_string(),
						source,
					}
				})?;

			if output.status.success() {
				passed += 1;
				log::info!("  {name}: PASS");
				log_output(log::Level::Debug, &output);
			} else {
				log::error!("  {name}: FAIL ({})", output.status);
				log_output(log::Level::Error, &output);
				if !self.verbose {
					log::error!("  (use -v to see full test output)");
				}
			}
		}

		log::info!("test summary: {passed}/{total} passed");

		if passed < total {
			return Err(Error::TestsFailed {
				target,
				failed: total - passed,
				total,
			});
		}

		Ok(())
	}

	/// Copies the built library into the Unity plugin folder, returning
	/// where it was put.
	fn stage(&self) -> Result<PathBuf, Error> {
		let target = self.builder.target();
		let source = self.builder.locate_library(&self.build_dir())?;
		let dest = self
			.layout
			.staging_dir(target)
			.join(target.os.library_name());

		log::debug!("copying {} to {}", source.display(), dest.display());
		stage::stage_artifact(&source, &dest, StagePolicy::default())?;

		Ok(dest)
	}

	/// Runs a CMake step. Output is hidden unless verbose, and replayed if
	/// the step fails.
	fn run_command(&self, step: Step, mut cmd: Command) -> Result<(), Error> {
		log::debug!("{cmd:?}");

		let tool = cmd.get_program().to_string_lossy().into_owned();
		let spawn_failed = |source| Error::ToolMissing { tool, source };

		let status = if self.verbose {
			cmd.status().map_err(spawn_failed)?
		} else {
			let output = cmd.stdin(Stdio::null()).output().map_err(spawn_failed)?;
			if !output.status.success() {
				log_output(log::Level::Error, &output);
				log::error!("(use -v to see the full output as it happens)");
			}
			output.status
		};

		if status.success() {
			Ok(())
		} else {
			Err(Error::StepFailed {
				step,
				target: self.builder.target(),
				status,
			})
		}
	}
}

/// The known tests whose name contains `filter` (case-insensitively), in
/// the order they run.
#[must_use]
pub fn select_tests(filter: Option<&str>) -> Vec<(TestCategory, &'static str)> {
	let filter = filter.map(str::to_lowercase);

	BASIC_TESTS
		.iter()
		.map(|name| (TestCategory::Basic, *name))
		.chain(ENHANCED_TESTS.iter().map(|name| (TestCategory::Enhanced, *name)))
		.filter(|(_, name)| {
			filter
				.as_deref()
				.is_none_or(|f| name.to_lowercase().contains(f))
		})
		.collect()
}

fn log_output(level: log::Level, output: &Output) {
	for line in String::from_utf8_lossy(&output.stdout).lines() {
		log::log!(level, "    {line}");
	}
	for line in String::from_utf8_lossy(&output.stderr).lines() {
		log::log!(level, "    [stderr] {line}");
	}
}
