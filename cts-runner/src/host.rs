// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Host configuration passed to every case.
//!
//! The engine doesn't know how to talk to a GPU. Hosts plug in a [`GpuProvider`], and test bodies
//! reach it through [`CaseContext::host`](crate::runner::CaseContext::host).

use crate::config::CtsProfile;
use serde::{Deserialize, Serialize};
use std::{any::Any, fmt, sync::Arc};
use thiserror::Error;

/// A preference for which adapter to pick.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PowerPreference {
    /// Prefer a low-power adapter.
    LowPower,
    /// Prefer a high-performance adapter.
    HighPerformance,
}

/// The feature level to request an adapter at.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureLevel {
    /// The core feature level.
    Core,
    /// The compatibility feature level.
    Compatibility,
}

/// Options used to request an adapter from a [`GpuProvider`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct AdapterOptions {
    /// The requested feature level, if compatibility mode is on.
    pub feature_level: Option<FeatureLevel>,
    /// Whether to force a fallback adapter.
    pub force_fallback_adapter: bool,
    /// The power preference, if any.
    pub power_preference: Option<PowerPreference>,
}

/// Information about an adapter returned by a [`GpuProvider`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AdapterInfo {
    /// A human-readable adapter name.
    pub name: String,
    /// True if this is a fallback (software) adapter.
    pub is_fallback: bool,
}

/// An error returned while requesting an adapter.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[non_exhaustive]
pub enum DeviceRequestError {
    /// No adapter is available with the requested options.
    #[error("no adapter available from `{provider}`")]
    Unavailable {
        /// The provider's name.
        provider: String,
    },

    /// The provider failed.
    #[error("adapter request failed: {message}")]
    Failed {
        /// The message reported by the provider.
        message: String,
    },
}

/// A pluggable source of GPU adapters.
///
/// Implementations live in the host. Test bodies that need a concrete device can downcast with
/// [`HostConfig::gpu_provider_as`].
pub trait GpuProvider: Any + fmt::Debug + Send + Sync {
    /// A short name for the provider, used in logs and errors.
    fn name(&self) -> &str;

    /// Requests an adapter matching `options`, or the provider's default if `None`.
    fn request_adapter(
        &self,
        options: Option<&AdapterOptions>,
    ) -> Result<AdapterInfo, DeviceRequestError>;
}

/// A provider that never has an adapter available.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullGpuProvider;

impl GpuProvider for NullGpuProvider {
    fn name(&self) -> &str {
        "null"
    }

    fn request_adapter(
        &self,
        _options: Option<&AdapterOptions>,
    ) -> Result<AdapterInfo, DeviceRequestError> {
        Err(DeviceRequestError::Unavailable {
            provider: self.name().to_owned(),
        })
    }
}

/// The resolved host configuration for a run.
#[derive(Clone, Debug)]
pub struct HostConfig {
    debug: bool,
    compatibility: bool,
    force_fallback_adapter: bool,
    enforce_default_limits: bool,
    unroll_const_eval_loops: bool,
    power_preference: Option<PowerPreference>,
    gpu_provider: Arc<dyn GpuProvider>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            debug: false,
            compatibility: false,
            force_fallback_adapter: false,
            enforce_default_limits: false,
            unroll_const_eval_loops: false,
            power_preference: None,
            gpu_provider: Arc::new(NullGpuProvider),
        }
    }
}

impl HostConfig {
    /// Creates a host configuration from a profile, with the null GPU provider.
    pub fn from_profile(profile: &CtsProfile<'_>) -> Self {
        Self {
            debug: profile.debug(),
            compatibility: profile.compatibility(),
            force_fallback_adapter: profile.force_fallback_adapter(),
            enforce_default_limits: profile.enforce_default_limits(),
            unroll_const_eval_loops: profile.unroll_const_eval_loops(),
            power_preference: profile.power_preference(),
            gpu_provider: Arc::new(NullGpuProvider),
        }
    }

    /// Sets whether debug log entries are recorded.
    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Sets whether adapters are requested in compatibility mode.
    pub fn set_compatibility(&mut self, compatibility: bool) -> &mut Self {
        self.compatibility = compatibility;
        self
    }

    /// Sets whether a fallback adapter is forced.
    pub fn set_force_fallback_adapter(&mut self, force: bool) -> &mut Self {
        self.force_fallback_adapter = force;
        self
    }

    /// Sets whether tests should restrict themselves to the default limits.
    pub fn set_enforce_default_limits(&mut self, enforce: bool) -> &mut Self {
        self.enforce_default_limits = enforce;
        self
    }

    /// Sets whether shader-generating tests should unroll const-eval loops.
    pub fn set_unroll_const_eval_loops(&mut self, unroll: bool) -> &mut Self {
        self.unroll_const_eval_loops = unroll;
        self
    }

    /// Sets the power preference.
    pub fn set_power_preference(&mut self, preference: Option<PowerPreference>) -> &mut Self {
        self.power_preference = preference;
        self
    }

    /// Sets the GPU provider.
    pub fn set_gpu_provider(&mut self, provider: Arc<dyn GpuProvider>) -> &mut Self {
        self.gpu_provider = provider;
        self
    }

    /// Returns true if debug log entries are recorded.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Returns true if compatibility mode is on.
    pub fn compatibility(&self) -> bool {
        self.compatibility
    }

    /// Returns true if a fallback adapter is forced.
    pub fn force_fallback_adapter(&self) -> bool {
        self.force_fallback_adapter
    }

    /// Returns true if tests should restrict themselves to the default limits.
    pub fn enforce_default_limits(&self) -> bool {
        self.enforce_default_limits
    }

    /// Returns true if const-eval loops should be unrolled.
    pub fn unroll_const_eval_loops(&self) -> bool {
        self.unroll_const_eval_loops
    }

    /// Returns the power preference.
    pub fn power_preference(&self) -> Option<PowerPreference> {
        self.power_preference
    }

    /// Returns the GPU provider.
    pub fn gpu_provider(&self) -> &dyn GpuProvider {
        &*self.gpu_provider
    }

    /// Returns the GPU provider as a concrete type, if it is one.
    pub fn gpu_provider_as<T: GpuProvider>(&self) -> Option<&T> {
        let provider: &dyn Any = &*self.gpu_provider;
        provider.downcast_ref::<T>()
    }

    /// Returns the options to request an adapter with.
    ///
    /// Returns `None` if no device-selection setting is on, in which case the provider's default
    /// adapter is used.
    pub fn adapter_options(&self) -> Option<AdapterOptions> {
        if !self.compatibility && !self.force_fallback_adapter && self.power_preference.is_none()
        {
            return None;
        }
        Some(AdapterOptions {
            feature_level: self.compatibility.then_some(FeatureLevel::Compatibility),
            force_fallback_adapter: self.force_fallback_adapter,
            power_preference: self.power_preference,
        })
    }

    /// Requests an adapter from the provider with [`adapter_options`](Self::adapter_options).
    pub fn request_adapter(&self) -> Result<AdapterInfo, DeviceRequestError> {
        let options = self.adapter_options();
        self.gpu_provider.request_adapter(options.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct FakeProvider {
        name: String,
    }

    impl GpuProvider for FakeProvider {
        fn name(&self) -> &str {
            &self.name
        }

        fn request_adapter(
            &self,
            options: Option<&AdapterOptions>,
        ) -> Result<AdapterInfo, DeviceRequestError> {
            Ok(AdapterInfo {
                name: self.name.clone(),
                is_fallback: options.is_some_and(|o| o.force_fallback_adapter),
            })
        }
    }

    #[test]
    fn adapter_options_only_when_set() {
        let mut host = HostConfig::default();
        assert_eq!(host.adapter_options(), None);

        // These don't affect adapter selection.
        host.set_enforce_default_limits(true)
            .set_unroll_const_eval_loops(true)
            .set_debug(true);
        assert_eq!(host.adapter_options(), None);

        host.set_compatibility(true);
        assert_eq!(
            host.adapter_options(),
            Some(AdapterOptions {
                feature_level: Some(FeatureLevel::Compatibility),
                force_fallback_adapter: false,
                power_preference: None,
            })
        );

        host.set_compatibility(false)
            .set_power_preference(Some(PowerPreference::LowPower));
        assert_eq!(
            host.adapter_options(),
            Some(AdapterOptions {
                feature_level: None,
                force_fallback_adapter: false,
                power_preference: Some(PowerPreference::LowPower),
            })
        );
    }

    #[test]
    fn null_provider_is_unavailable() {
        let host = HostConfig::default();
        assert_eq!(
            host.request_adapter(),
            Err(DeviceRequestError::Unavailable {
                provider: "null".to_owned()
            })
        );
        assert!(host.gpu_provider_as::<NullGpuProvider>().is_some());
    }

    #[test]
    fn custom_provider_downcast() {
        let mut host = HostConfig::default();
        host.set_gpu_provider(Arc::new(FakeProvider {
            name: "fake".to_owned(),
        }))
        .set_force_fallback_adapter(true);

        let provider = host
            .gpu_provider_as::<FakeProvider>()
            .expect("provider is a FakeProvider");
        assert_eq!(provider.name, "fake");
        assert!(host.gpu_provider_as::<NullGpuProvider>().is_none());
        assert_eq!(
            host.request_adapter(),
            Ok(AdapterInfo {
                name: "fake".to_owned(),
                is_fallback: true,
            })
        );
    }
}
