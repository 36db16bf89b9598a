//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Configuration types for codecs and scratch buffers.
//!
//! [`CodecConfig`] carries the scalar options recognised by the codec layer. It
//! derives `serde::Deserialize` with defaults for every field, so it can be
//! embedded in an application's own configuration file, and it can be
//! overridden from `WIRECODEC_*` environment variables.
//!
//! [`CycleSafeTypes`] is the set of types routed to the graph codec's
//! reference-tracking encoding. It is built once before the registry and is
//! immutable afterwards.

use serde::{Deserialize, Serialize};
use std::any::{TypeId, type_name};
use std::collections::HashMap;
use thiserror::Error;

/// Default scratch buffer size (512 B).
pub const DEFAULT_SCRATCH_SIZE: usize = 512;

/// Default scratch retention ceiling (256 KB).
pub const DEFAULT_MAX_RETAINED: usize = 256 * 1024;

/// Default buffer size of the stream codec's writer (8 KB).
pub const DEFAULT_STREAM_BUFFER_SIZE: usize = 8 * 1024;

/// Error returned when a configuration value is invalid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A value is outside its permitted range.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// The offending option
        key: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// An environment variable could not be parsed.
    #[error("cannot parse {var}={value:?}")]
    Unparsable {
        /// The environment variable
        var: &'static str,
        /// Its raw value
        value: String,
    },
}

/// Retention policy for per-thread scratch buffers.
///
/// # Examples
///
/// ```rust
/// use wirecodec::config::ScratchConfig;
///
/// let config = ScratchConfig {
///     default_size: 1024,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Capacity of a freshly allocated scratch buffer.
    ///
    /// Default: 512 B
    pub default_size: usize,

    /// Largest capacity a scratch buffer may keep between calls. A buffer that
    /// grew past this is replaced by a new one of `default_size`.
    ///
    /// Default: 256 KB
    pub max_retained: usize,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        Self {
            default_size: DEFAULT_SCRATCH_SIZE,
            max_retained: DEFAULT_MAX_RETAINED,
        }
    }
}

impl ScratchConfig {
    /// Checks that the ceiling can hold a default-sized buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `default_size` is zero or exceeds
    /// `max_retained`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_size == 0 {
            return Err(ConfigError::Invalid {
                key: "scratch.default_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.default_size > self.max_retained {
            return Err(ConfigError::Invalid {
                key: "scratch.max_retained",
                reason: format!(
                    "{} is smaller than scratch.default_size {}",
                    self.max_retained, self.default_size
                ),
            });
        }
        Ok(())
    }
}

/// Options recognised by the codec layer.
///
/// # Examples
///
/// ```rust
/// use wirecodec::config::CodecConfig;
///
/// // Use default configuration
/// let config = CodecConfig::default();
/// assert!(!config.allow_null_elements);
///
/// // Customize configuration
/// let config = CodecConfig::new()
///     .with_null_elements(true)
///     .with_max_decode_size(1024 * 1024);
/// assert_eq!(config.max_decode_size, Some(1024 * 1024));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Scratch buffer retention policy.
    pub scratch: ScratchConfig,

    /// Whether the schema codec accepts `None` elements inside sequences.
    ///
    /// Default: false
    pub allow_null_elements: bool,

    /// Buffer size of the stream codec's per-call writer.
    ///
    /// Default: 8 KB
    pub stream_buffer_size: usize,

    /// Largest payload the binary codecs will decode. `None` means unlimited.
    ///
    /// Default: None
    pub max_decode_size: Option<usize>,

    /// Whether the stream codec emits indented output.
    ///
    /// Default: false
    pub pretty_json: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            scratch: ScratchConfig::default(),
            allow_null_elements: false,
            stream_buffer_size: DEFAULT_STREAM_BUFFER_SIZE,
            max_decode_size: None,
            pretty_json: false,
        }
    }
}

impl CodecConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the scratch retention policy.
    #[must_use]
    pub fn with_scratch(mut self, scratch: ScratchConfig) -> Self {
        self.scratch = scratch;
        self
    }

    /// Sets whether `None` sequence elements are tolerated.
    #[must_use]
    pub fn with_null_elements(mut self, allow: bool) -> Self {
        self.allow_null_elements = allow;
        self
    }

    /// Limits the payload size the binary codecs will decode.
    #[must_use]
    pub fn with_max_decode_size(mut self, max: usize) -> Self {
        self.max_decode_size = Some(max);
        self
    }

    /// Enables indented output from the stream codec.
    #[must_use]
    pub fn with_pretty_json(mut self) -> Self {
        self.pretty_json = true;
        self
    }

    /// Validates every option.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scratch.validate()?;
        if self.stream_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                key: "stream_buffer_size",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Applies `WIRECODEC_*` overrides from the process environment.
    ///
    /// Recognised variables: `WIRECODEC_SCRATCH_DEFAULT_SIZE`,
    /// `WIRECODEC_SCRATCH_MAX_RETAINED`, `WIRECODEC_ALLOW_NULL_ELEMENTS`,
    /// `WIRECODEC_STREAM_BUFFER_SIZE` and `WIRECODEC_MAX_DECODE_SIZE`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Unparsable`] for a malformed value, or the
    /// validation error of the resulting configuration.
    pub fn from_env(self) -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars()
            .filter(|(key, _)| key.starts_with("WIRECODEC_"))
            .collect();
        self.with_overrides(&vars)
    }

    fn with_overrides(mut self, vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(vars, "WIRECODEC_SCRATCH_DEFAULT_SIZE")? {
            self.scratch.default_size = value;
        }
        if let Some(value) = lookup(vars, "WIRECODEC_SCRATCH_MAX_RETAINED")? {
            self.scratch.max_retained = value;
        }
        if let Some(value) = lookup(vars, "WIRECODEC_ALLOW_NULL_ELEMENTS")? {
            self.allow_null_elements = value;
        }
        if let Some(value) = lookup(vars, "WIRECODEC_STREAM_BUFFER_SIZE")? {
            self.stream_buffer_size = value;
        }
        if let Some(value) = lookup(vars, "WIRECODEC_MAX_DECODE_SIZE")? {
            self.max_decode_size = Some(value);
        }
        self.validate()?;
        Ok(self)
    }
}

fn lookup<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    vars.get(var)
        .map(|raw| {
            raw.trim().parse().map_err(|_| ConfigError::Unparsable {
                var,
                value: raw.clone(),
            })
        })
        .transpose()
}

/// Types routed to the graph codec's reference-tracking encoding.
///
/// Reference tracking preserves shared and cyclic [`GraphRef`](crate::codec::GraphRef)
/// edges at the cost of a per-call lookup table, so it is enabled only for the
/// types listed here.
///
/// # Examples
///
/// ```rust
/// use wirecodec::config::CycleSafeTypes;
///
/// struct Tree;
/// let types = CycleSafeTypes::new().with::<Tree>();
/// assert!(types.contains::<Tree>());
/// assert!(!types.contains::<String>());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CycleSafeTypes {
    types: HashMap<TypeId, &'static str>,
}

impl CycleSafeTypes {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T` to the set.
    #[must_use]
    pub fn with<T: ?Sized + 'static>(mut self) -> Self {
        self.types.insert(TypeId::of::<T>(), type_name::<T>());
        self
    }

    /// Returns `true` if `T` is in the set.
    #[must_use]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        self.contains_id(TypeId::of::<T>())
    }

    /// Returns `true` if the type with `id` is in the set.
    #[must_use]
    pub fn contains_id(&self, id: TypeId) -> bool {
        self.types.contains_key(&id)
    }

    /// Names of the listed types, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.types.values().copied().collect();
        names.sort_unstable();
        names
    }

    /// Number of listed types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns `true` if no type is listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
