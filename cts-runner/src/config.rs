// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for cts.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, ProfileNotFound},
    expectations::{Expectation, ExpectationSource},
    host::PowerPreference,
    reporter::StatusLevel,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::HashMap;

/// Overall configuration for cts.
///
/// Most runner-specific configuration is managed through [profiles](CtsProfile), obtained
/// through the [`profile`](Self::profile) method.
#[derive(Clone, Debug)]
pub struct CtsConfig {
    root: Utf8PathBuf,
    inner: CtsConfigImpl,
    expectations: CompiledExpectations,
}

impl CtsConfig {
    /// The default location of the config within the path: `.config/cts.toml`, used to read the
    /// config from the given directory.
    pub const CONFIG_PATH: &'static str = ".config/cts.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the cts config from the given file, or if not specified from `.config/cts.toml` in
    /// `root`.
    ///
    /// If no config file is specified and `root` doesn't have `.config/cts.toml`, uses the default
    /// config options.
    pub fn from_sources(
        root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let root = root.into();

        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let inner = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;
        let expectations = CompiledExpectations::new(&inner.profiles)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        Ok(Self {
            root,
            inner,
            expectations,
        })
    }

    /// Returns the default cts config.
    pub fn default_config(root: impl Into<Utf8PathBuf>) -> Result<Self, ConfigParseError> {
        let inner = Self::build_and_deserialize_config(&Self::make_default_config())
            .map_err(|kind| ConfigParseError::new("<default config>", kind))?;
        let expectations = CompiledExpectations::new(&inner.profiles)
            .map_err(|kind| ConfigParseError::new("<default config>", kind))?;
        Ok(Self {
            root: root.into(),
            inner,
            expectations,
        })
    }

    /// Returns the root directory the config was read relative to.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns the profile with the given name, or an error if a profile was specified but not
    /// found.
    pub fn profile(&self, name: impl AsRef<str>) -> Result<CtsProfile<'_>, ProfileNotFound> {
        self.make_profile(name.as_ref())
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn make_profile(&self, name: &str) -> Result<CtsProfile<'_>, ProfileNotFound> {
        let custom_profile = self.inner.profiles.get(name)?;

        // Custom expectations are checked first, then the default ones.
        let expectations = self
            .expectations
            .other
            .get(name)
            .into_iter()
            .flatten()
            .chain(self.expectations.default.iter())
            .cloned()
            .collect();

        Ok(CtsProfile {
            name: name.to_owned(),
            default_profile: &self.inner.profiles.default,
            custom_profile,
            expectations,
        })
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<CtsConfigImpl, ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        serde_path_to_error::deserialize(config).map_err(|error| {
            // Both serde_path_to_error and the config crate report the key. Drop the key from the
            // config error.
            let path = error.path().clone();
            let error = match error.into_inner() {
                ConfigError::At { error, .. } => *error,
                other => other,
            };
            ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                path, error,
            )))
        })
    }
}

/// A configuration profile for cts. Contains most configuration used by the runner.
///
/// Returned by [`CtsConfig::profile`].
#[derive(Clone, Debug)]
pub struct CtsProfile<'cfg> {
    name: String,
    default_profile: &'cfg DefaultProfileImpl,
    custom_profile: Option<&'cfg CustomProfileImpl>,
    expectations: Vec<Expectation>,
}

impl<'cfg> CtsProfile<'cfg> {
    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if debug log entries are recorded.
    pub fn debug(&self) -> bool {
        self.custom_profile
            .and_then(|profile| profile.debug)
            .unwrap_or(self.default_profile.debug)
    }

    /// Returns true if adapters are requested at the compatibility feature level.
    pub fn compatibility(&self) -> bool {
        self.custom_profile
            .and_then(|profile| profile.compatibility)
            .unwrap_or(self.default_profile.compatibility)
    }

    /// Returns true if a fallback adapter is forced.
    pub fn force_fallback_adapter(&self) -> bool {
        self.custom_profile
            .and_then(|profile| profile.force_fallback_adapter)
            .unwrap_or(self.default_profile.force_fallback_adapter)
    }

    /// Returns true if tests should stay within the default limits.
    pub fn enforce_default_limits(&self) -> bool {
        self.custom_profile
            .and_then(|profile| profile.enforce_default_limits)
            .unwrap_or(self.default_profile.enforce_default_limits)
    }

    /// Returns true if const-eval loops should be unrolled.
    pub fn unroll_const_eval_loops(&self) -> bool {
        self.custom_profile
            .and_then(|profile| profile.unroll_const_eval_loops)
            .unwrap_or(self.default_profile.unroll_const_eval_loops)
    }

    /// Returns the adapter power preference, if any.
    pub fn power_preference(&self) -> Option<PowerPreference> {
        self.custom_profile
            .and_then(|profile| profile.power_preference)
            .or(self.default_profile.power_preference)
    }

    /// Returns true if the run should be cancelled after the first unanticipated failure.
    pub fn fail_fast(&self) -> bool {
        self.custom_profile
            .and_then(|profile| profile.fail_fast)
            .unwrap_or(self.default_profile.fail_fast)
    }

    /// Returns the status level for this profile.
    pub fn status_level(&self) -> StatusLevel {
        self.custom_profile
            .and_then(|profile| profile.status_level)
            .unwrap_or(self.default_profile.status_level)
    }

    /// Returns the expectations for this profile, custom ones first.
    pub fn expectations(&self) -> &[Expectation] {
        &self.expectations
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CtsConfigImpl {
    #[serde(rename = "profile")]
    profiles: CtsProfilesImpl,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CtsProfilesImpl {
    default: DefaultProfileImpl,
    #[serde(flatten)]
    other: HashMap<String, CustomProfileImpl>,
}

impl CtsProfilesImpl {
    fn get(&self, profile: &str) -> Result<Option<&CustomProfileImpl>, ProfileNotFound> {
        let custom_profile = match profile {
            CtsConfig::DEFAULT_PROFILE => None,
            other => Some(
                self.other
                    .get(other)
                    .ok_or_else(|| ProfileNotFound::new(profile, self.all_profiles()))?,
            ),
        };
        Ok(custom_profile)
    }

    fn all_profiles(&self) -> impl Iterator<Item = &str> {
        self.other
            .keys()
            .map(|key| key.as_str())
            .chain(std::iter::once(CtsConfig::DEFAULT_PROFILE))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct DefaultProfileImpl {
    debug: bool,
    compatibility: bool,
    force_fallback_adapter: bool,
    enforce_default_limits: bool,
    unroll_const_eval_loops: bool,
    #[serde(default)]
    power_preference: Option<PowerPreference>,
    fail_fast: bool,
    status_level: StatusLevel,
    #[serde(default)]
    expectations: Vec<ExpectationSource>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CustomProfileImpl {
    #[serde(default)]
    debug: Option<bool>,
    #[serde(default)]
    compatibility: Option<bool>,
    #[serde(default)]
    force_fallback_adapter: Option<bool>,
    #[serde(default)]
    enforce_default_limits: Option<bool>,
    #[serde(default)]
    unroll_const_eval_loops: Option<bool>,
    #[serde(default)]
    power_preference: Option<PowerPreference>,
    #[serde(default)]
    fail_fast: Option<bool>,
    #[serde(default)]
    status_level: Option<StatusLevel>,
    #[serde(default)]
    expectations: Vec<ExpectationSource>,
}

/// Pre-compiled form of profile expectations.
#[derive(Clone, Debug, Default)]
struct CompiledExpectations {
    default: Vec<Expectation>,
    other: HashMap<String, Vec<Expectation>>,
}

impl CompiledExpectations {
    fn new(profiles: &CtsProfilesImpl) -> Result<Self, ConfigParseErrorKind> {
        let default = Self::compile(CtsConfig::DEFAULT_PROFILE, &profiles.default.expectations)?;
        let other: HashMap<String, Vec<Expectation>> = profiles
            .other
            .iter()
            .map(|(name, profile)| {
                let compiled = Self::compile(name, &profile.expectations)?;
                Ok::<_, ConfigParseErrorKind>((name.clone(), compiled))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { default, other })
    }

    fn compile(
        profile: &str,
        sources: &[ExpectationSource],
    ) -> Result<Vec<Expectation>, ConfigParseErrorKind> {
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                source
                    .compile()
                    .map_err(|err| ConfigParseErrorKind::InvalidExpectation {
                        profile: profile.to_owned(),
                        index,
                        err,
                    })
            })
            .collect()
    }
}
