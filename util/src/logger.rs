// Copyright 2018 The Grin Developers
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging wrapper to be used throughout all crates in the workspace

use std::sync::Mutex;

use crate::types::{LogLevel, LoggingConfig};

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::filter::{threshold::ThresholdFilter, Filter, Response};

fn convert_log_level(in_level: &LogLevel) -> LevelFilter {
	match *in_level {
		LogLevel::Info => LevelFilter::Info,
		LogLevel::Warning => LevelFilter::Warn,
		LogLevel::Debug => LevelFilter::Debug,
		LogLevel::Trace => LevelFilter::Trace,
		LogLevel::Error => LevelFilter::Error,
	}
}

lazy_static! {
	/// Flag to observe whether logging was explicitly initialised (don't output otherwise)
	static ref WAS_INIT: Mutex<bool> = Mutex::new(false);
}

const LOGGING_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l})} {M} - {m}{n}";

/// Rejects log records that don't originate from this workspace, so that
/// dependency noise doesn't drown out chain-engine diagnostics.
#[derive(Debug)]
struct WorkspaceFilter;

impl Filter for WorkspaceFilter {
	fn filter(&self, record: &log::Record<'_>) -> Response {
		match record.module_path() {
			Some(path) if path.starts_with("lite_") => Response::Neutral,
			_ => Response::Reject,
		}
	}
}

/// Initialize the logger with the given configuration. A no-op if `config`
/// is `None`, so embedding applications can opt out entirely.
pub fn init_logger(config: Option<LoggingConfig>) {
	let mut was_init = WAS_INIT.lock().unwrap();
	if *was_init {
		return;
	}

	let c = match config {
		Some(c) => c,
		None => return,
	};

	let level_stdout = convert_log_level(&c.stdout_log_level);
	let level_file = convert_log_level(&c.file_log_level);
	let level_minimum = level_stdout.max(level_file);

	let mut root = Root::builder();
	let mut appenders = vec![];

	if c.log_to_stdout {
		let stdout = ConsoleAppender::builder()
			.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
			.build();
		appenders.push(
			Appender::builder()
				.filter(Box::new(ThresholdFilter::new(level_stdout)))
				.filter(Box::new(WorkspaceFilter))
				.build("stdout", Box::new(stdout)),
		);
		root = root.appender("stdout");
	}

	if c.log_to_file {
		if let Ok(file) = FileAppender::builder()
			.append(c.log_file_append)
			.encoder(Box::new(PatternEncoder::new(LOGGING_PATTERN)))
			.build(&c.log_file_path)
		{
			appenders.push(
				Appender::builder()
					.filter(Box::new(ThresholdFilter::new(level_file)))
					.filter(Box::new(WorkspaceFilter))
					.build("file", Box::new(file)),
			);
			root = root.appender("file");
		}
	}

	if let Ok(config) = Config::builder()
		.appenders(appenders)
		.build(root.build(level_minimum))
	{
		let _ = log4rs::init_config(config);
	}

	*was_init = true;
}

/// Initializes a stdout-only logger for unit and integration tests.
pub fn init_test_logger() {
	let mut logger = LoggingConfig::default();
	logger.stdout_log_level = LogLevel::Debug;
	init_logger(Some(logger));
}
