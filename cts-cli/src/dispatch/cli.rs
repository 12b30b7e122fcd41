// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line options.

use crate::{ExpectedError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, ValueEnum};
use cts_runner::{
    config::{CtsConfig, CtsProfile},
    list::{OutputFormat, SerializableFormat},
    reporter::StatusLevel,
};
use tracing::debug;

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
pub(super) struct ConfigOpts {
    /// Config file [default: current-dir/.config/cts.toml]
    #[arg(long, global = true, value_name = "PATH")]
    pub(super) config_file: Option<Utf8PathBuf>,

    /// The configuration profile to use
    ///
    /// Profiles set host options, fail-fast behavior, the status level and expectations. The
    /// `default` profile is always available, and other profiles fall back to it key by key.
    #[arg(long, short = 'P', env = "CTS_PROFILE", global = true)]
    pub(super) profile: Option<String>,
}

impl ConfigOpts {
    /// Reads the config relative to the current directory.
    pub(super) fn make_config(&self) -> Result<CtsConfig> {
        let current_dir = std::env::current_dir().map_err(ExpectedError::current_dir_invalid)?;
        let current_dir = Utf8PathBuf::try_from(current_dir)
            .map_err(|err| ExpectedError::current_dir_not_utf8(err.into_path_buf()))?;
        self.make_config_in(&current_dir)
    }

    pub(super) fn make_config_in(&self, root: &Utf8Path) -> Result<CtsConfig> {
        let config = CtsConfig::from_sources(root, self.config_file.as_deref())?;
        debug!(root = %root, config_file = ?self.config_file, "read config");
        Ok(config)
    }

    pub(super) fn profile_name(&self) -> &str {
        self.profile.as_deref().unwrap_or(CtsConfig::DEFAULT_PROFILE)
    }

    pub(super) fn load_profile<'cfg>(&self, config: &'cfg CtsConfig) -> Result<CtsProfile<'cfg>> {
        Ok(config.profile(self.profile_name())?)
    }
}

#[derive(Debug, Args)]
pub(super) struct ListOpts {
    /// Queries to list [default: every suite in the catalog]
    #[arg(value_name = "QUERY")]
    pub(super) queries: Vec<String>,

    /// Type of listing
    #[arg(long, short = 'T', value_enum, value_name = "TYPE", default_value_t)]
    pub(super) list_type: ListType,

    /// Queries that must stay addressable in a collapsed listing
    ///
    /// Only used with `--list-type collapsed`. Each query must name a node of the tree exactly.
    #[arg(long = "expectation", value_name = "QUERY")]
    pub(super) expectations: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t, value_name = "FMT")]
    pub(super) message_format: MessageFormatOpts,
}

#[derive(Debug, Args)]
pub(super) struct RunOpts {
    /// Queries to run [default: every suite in the catalog]
    #[arg(value_name = "QUERY")]
    pub(super) queries: Vec<String>,

    /// Expectations files to read, in addition to the profile's expectations
    #[arg(long = "expectations-file", value_name = "PATH")]
    pub(super) expectations_files: Vec<Utf8PathBuf>,

    #[clap(flatten)]
    pub(super) reporter_opts: ReporterOpts,

    /// Output format for run results, written to stdout
    ///
    /// With `human`, only the reporter's output is shown.
    #[arg(long, value_enum, default_value_t, value_name = "FMT")]
    pub(super) message_format: MessageFormatOpts,
}

#[derive(Debug, Default, Args)]
#[command(next_help_heading = "Reporter options")]
pub(super) struct ReporterOpts {
    /// Cancel the run on the first unanticipated failure
    #[arg(long, visible_alias = "ff", name = "fail-fast")]
    pub(super) fail_fast: bool,

    /// Run every case regardless of failures
    #[arg(
        long,
        visible_alias = "nff",
        name = "no-fail-fast",
        overrides_with = "fail-fast"
    )]
    pub(super) no_fail_fast: bool,

    /// Case statuses to output
    #[arg(long, value_enum, value_name = "LEVEL", env = "CTS_STATUS_LEVEL")]
    pub(super) status_level: Option<StatusLevelOpt>,
}

impl ReporterOpts {
    /// Resolves fail-fast against the profile's setting.
    pub(super) fn fail_fast(&self, profile: &CtsProfile<'_>) -> bool {
        if self.no_fail_fast {
            debug!("fail-fast disabled on the command line");
            false
        } else if self.fail_fast {
            debug!("fail-fast enabled on the command line");
            true
        } else {
            profile.fail_fast()
        }
    }

    /// Resolves the status level against the profile's setting.
    pub(super) fn status_level(&self, profile: &CtsProfile<'_>) -> StatusLevel {
        self.status_level
            .map_or_else(|| profile.status_level(), StatusLevel::from)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(super) enum ListType {
    /// Every case the queries resolve to, one per line.
    #[default]
    Cases,
    /// The tree of queries above the cases, with descriptions.
    Tree,
    /// The fewest queries covering the tree, expanded around expectations.
    Collapsed,
}

impl ListType {
    pub(super) fn to_static_str(self) -> &'static str {
        match self {
            Self::Cases => "cases",
            Self::Tree => "tree",
            Self::Collapsed => "collapsed",
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(super) enum MessageFormatOpts {
    /// A human-readable output format.
    #[default]
    Human,
    /// JSON with no whitespace.
    Json,
    /// JSON, prettified.
    JsonPretty,
}

impl MessageFormatOpts {
    pub(super) fn to_output_format(self, verbose: bool) -> OutputFormat {
        match self {
            Self::Human => OutputFormat::Human { verbose },
            Self::Json => OutputFormat::Serializable(SerializableFormat::Json),
            Self::JsonPretty => OutputFormat::Serializable(SerializableFormat::JsonPretty),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(super) enum StatusLevelOpt {
    None,
    Fail,
    Warn,
    Pass,
    Skip,
    All,
}

impl From<StatusLevelOpt> for StatusLevel {
    fn from(opt: StatusLevelOpt) -> Self {
        match opt {
            StatusLevelOpt::None => StatusLevel::None,
            StatusLevelOpt::Fail => StatusLevel::Fail,
            StatusLevelOpt::Warn => StatusLevel::Warn,
            StatusLevelOpt::Pass => StatusLevel::Pass,
            StatusLevelOpt::Skip => StatusLevel::Skip,
            StatusLevelOpt::All => StatusLevel::All,
        }
    }
}
