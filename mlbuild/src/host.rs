//! Access to the invoking environment: the host OS, environment variables
//! and short-lived probe commands.
//!
//! Everything that decides flags from the environment goes through [`Host`],
//! so tests can substitute a fake environment without spawning processes.

use std::{
	io::Read,
	process::{Command, Stdio},
	thread,
	time::{Duration, Instant},
};

use crate::platform::Os;

/// Timeout for environment probes (`--version` queries and the like).
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// How often a running probe is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Output of a probe command that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutput {
	/// Whether the command exited with status 0.
	pub success: bool,
	/// Captured standard output.
	pub stdout:  String,
	/// Captured standard error.
	pub stderr:  String,
}

impl ProbeOutput {
	/// A successful probe printing `stdout`.
	#[must_use]
	pub fn ok(stdout: impl Into<String>) -> Self {
		Self {
			success: true,
			stdout:  stdout.into(),
			stderr:  String::new(),
		}
	}

	/// Trimmed stdout, only if the command succeeded.
	#[must_use]
	pub fn stdout_if_success(&self) -> Option<&str> {
		self.success.then(|| self.stdout.trim())
	}

	/// Stdout followed by stderr.
	#[must_use]
	pub fn combined(&self) -> String {
		let mut text = self.stdout.clone();
		text.push_str(&self.stderr);
		text
	}
}

/// The environment a build is resolved against.
pub trait Host {
	/// The invoking operating system, if it's one we know.
	fn os(&self) -> Option<Os>;

	/// Reads an environment variable. Unset and non-unicode values are
	/// both treated as absent.
	fn var(&self, key: &str) -> Option<String>;

	/// Runs `program args...` to completion, or until `timeout` elapses.
	///
	/// Returns `None` if the program could not be started or timed out.
	fn probe(&self, program: &str, args: &[&str], timeout: Duration) -> Option<ProbeOutput>;

	/// Whether an environment variable is set.
	fn has_var(&self, key: &str) -> bool {
		self.var(key).is_some()
	}

	/// The CMake binary to invoke, honoring a `CMAKE` override.
	fn cmake_program(&self) -> String {
		self.var("CMAKE")
			.filter(|v| !v.trim().is_empty())
			.unwrap_or_else(|| "cmake".to_string())
	}
}

/// The real environment of this process.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
	fn os(&self) -> Option<Os> {
		Os::host()
	}

	fn var(&self, key: &str) -> Option<String> {
		std::env::var(key).ok()
	}

	fn probe(&self, program: &str, args: &[&str], timeout: Duration) -> Option<ProbeOutput> {
		probe(program, args, timeout)
	}
}

/// Spawns a command with piped output and waits at most `timeout` for it.
///
/// Output pipes are drained on helper threads so a chatty tool can't block
/// on a full pipe while we poll it.
fn probe(program: &str, args: &[&str], timeout: Duration) -> Option<ProbeOutput> {
	let mut child = match Command::new(program)
		.args(args)
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.spawn()
	{
		Ok(child) => child,
		Err(e) => {
			log::trace!("probe `{program}` could not be started: {e}");
			return None;
		}
	};

	let stdout = drain(child.stdout.take());
	let stderr = drain(child.stderr.take());

	let started = Instant::now();
	let status = loop {
		match child.try_wait() {
			Ok(Some(status)) => break status,
			Ok(None) if started.elapsed() < timeout => thread::sleep(POLL_INTERVAL),
			Ok(None) => {
				log::debug!("probe `{program} {}` timed out after {timeout:?}", args.join(" "));
				let _ = child.kill();
				let _ = child.wait();
				return None;
			}
			Err(e) => {
				log::debug!("error while waiting for `{program}`: {e}");
				return None;
			}
		}
	};

	Some(ProbeOutput {
		success: status.success(),
		stdout:  stdout.join().unwrap_or_default(),
		stderr:  stderr.join().unwrap_or_default(),
	})
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
	thread::spawn(move || {
		let mut buf = Vec::new();
		if let Some(mut pipe) = pipe {
			let _ = pipe.read_to_end(&mut buf);
		}
		String::from_utf8_lossy(&buf).into_owned()
	})
}
