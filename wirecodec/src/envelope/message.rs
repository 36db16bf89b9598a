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

//! Call metadata carried inside a request.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Identifier linking the spans of one distributed call.
///
/// Trace ids are UUIDs in the standard hyphenated format.
///
/// # Examples
///
/// ```rust
/// use wirecodec::envelope::TraceId;
///
/// let parsed: TraceId = "550e8400-e29b-41d4-a716-446655440000".parse().unwrap();
/// assert_eq!(parsed.to_string(), "550e8400-e29b-41d4-a716-446655440000");
/// assert!("not-a-trace".parse::<TraceId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraceId(uuid::Uuid);

impl TraceId {
    /// Creates a new random trace id.
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(uuid::Uuid::parse_str(s)?))
    }
}

/// Coordinates of the remote service being called.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceMetadata {
    /// Service group
    pub group: String,
    /// Service name
    pub name: String,
    /// Service version
    pub version: String,
}

impl ServiceMetadata {
    /// Creates service coordinates.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ServiceMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.group, self.name, self.version)
    }
}

/// The decoded content of a request.
///
/// # Examples
///
/// ```rust
/// use wirecodec::envelope::{Message, ServiceMetadata, TraceId};
///
/// let mut message = Message::new(ServiceMetadata::new("g", "Echo", "1"), "echo")
///     .with_trace_id(TraceId::new());
/// message.put_attachment("region", "eu");
/// assert_eq!(message.attachments().len(), 1);
/// assert!(message.trace_id().is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    service: ServiceMetadata,
    method: String,
    trace_id: Option<TraceId>,
    attachments: BTreeMap<String, String>,
}

impl Message {
    /// Creates a message calling `method` on `service`.
    pub fn new(service: ServiceMetadata, method: impl Into<String>) -> Self {
        Self {
            service,
            method: method.into(),
            trace_id: None,
            attachments: BTreeMap::new(),
        }
    }

    /// Sets the trace id.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// The called service.
    pub fn service(&self) -> &ServiceMetadata {
        &self.service
    }

    /// The called method.
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The trace id, if one was assigned.
    pub fn trace_id(&self) -> Option<TraceId> {
        self.trace_id
    }

    /// Out-of-band string attachments.
    pub fn attachments(&self) -> &BTreeMap<String, String> {
        &self.attachments
    }

    /// Adds or replaces an attachment.
    pub fn put_attachment(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attachments.insert(key.into(), value.into());
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.service, self.method)?;
        if let Some(trace_id) = self.trace_id {
            write!(f, " trace={trace_id}")?;
        }
        Ok(())
    }
}
