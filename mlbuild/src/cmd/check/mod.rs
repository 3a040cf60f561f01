//! Implements the environment checks.
//!
//! Each check produces a [`Report`]; the command fails if any report holds
//! an error. Warnings describe things that only some builds need.

mod cross;
mod project;
mod toolchain;

use std::path::PathBuf;

use crate::{host::SystemHost, layout::ProjectLayout};

/// Findings of one check.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Report {
	/// What was checked.
	pub title:    &'static str,
	/// Things found.
	pub info:     Vec<String>,
	/// Problems that only affect some builds.
	pub warnings: Vec<String>,
	/// Problems that prevent building at all.
	pub errors:   Vec<String>,
}

impl Report {
	#[must_use]
	pub const fn new(title: &'static str) -> Self {
		Self {
			title,
			info: Vec::new(),
			warnings: Vec::new(),
			errors: Vec::new(),
		}
	}

	pub fn info(&mut self, message: impl Into<String>) {
		self.info.push(message.into());
	}

	pub fn warn(&mut self, message: impl Into<String>) {
		self.warnings.push(message.into());
	}

	pub fn error(&mut self, message: impl Into<String>) {
		self.errors.push(message.into());
	}

	/// A report passes when it holds no errors.
	#[must_use]
	pub fn passed(&self) -> bool {
		self.errors.is_empty()
	}

	fn log(&self) {
		log::info!("{}:", self.title);
		for message in &self.info {
			log::info!("  {message}");
		}
		for warning in &self.warnings {
			log::warn!("  {warning}");
		}
		for error in &self.errors {
			log::error!("  {error}");
		}

		if self.passed() {
			log::info!("{} passed", self.title);
		} else {
			log::error!("{} failed", self.title);
		}
	}
}

#[derive(serde::Serialize)]
struct Summary<'a> {
	passed:  bool,
	reports: Vec<ReportSummary<'a>>,
}

#[derive(serde::Serialize)]
struct ReportSummary<'a> {
	#[serde(flatten)]
	report: &'a Report,
	passed: bool,
}

pub fn run(
	args: crate::CheckArgs,
	project_root: Option<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
	let host = SystemHost;
	let layout = ProjectLayout::discover(project_root)?;
	log::debug!("project root: {}", layout.root().display());

	let reports = [
		project::check(&layout),
		toolchain::check(&host),
		cross::check(&host, args.platform),
	];
	let passed = reports.iter().all(Report::passed);

	if args.json {
		let summary = Summary {
			passed,
			reports: reports
				.iter()
				.map(|report| {
					ReportSummary {
						report,
						passed: report.passed(),
					}
				})
				.collect(),
		};
		println!("{}", serde_json::to_string_pretty(&summary)?);
	} else {
		for report in &reports {
			report.log();
		}
	}

	if passed {
		log::info!("all checks passed");
		Ok(())
	} else {
		Err("some checks failed".into())
	}
}
