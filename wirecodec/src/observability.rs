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

//! Codec metrics.
//!
//! Every codec in a [`CodecRegistry`](crate::codec::CodecRegistry) owns a
//! [`CodecMetrics`] instance updated on each call. Counters are plain atomics
//! readable through [`CodecMetrics::snapshot`]. When the `observability`
//! feature is enabled they are also exported through the `metrics` facade,
//! labelled with the codec name.

use std::sync::atomic::{AtomicU64, Ordering};

/// Call counters for one codec.
///
/// # Examples
///
/// ```rust
/// use wirecodec::observability::CodecMetrics;
///
/// let metrics = CodecMetrics::new("graph");
/// metrics.record_encode(128);
/// metrics.record_decode_error();
///
/// let snapshot = metrics.snapshot();
/// assert_eq!(snapshot.encodes, 1);
/// assert_eq!(snapshot.bytes_encoded, 128);
/// assert_eq!(snapshot.decode_errors, 1);
/// ```
#[derive(Debug)]
pub struct CodecMetrics {
    codec: &'static str,
    /// Successful encodes
    encodes: AtomicU64,
    /// Successful decodes
    decodes: AtomicU64,
    /// Bytes produced by successful encodes
    bytes_encoded: AtomicU64,
    /// Bytes consumed by successful decodes
    bytes_decoded: AtomicU64,
    /// Failed encodes
    encode_errors: AtomicU64,
    /// Failed decodes
    decode_errors: AtomicU64,
}

impl CodecMetrics {
    /// Creates zeroed counters for the codec named `codec`.
    #[must_use]
    pub fn new(codec: &'static str) -> Self {
        Self {
            codec,
            encodes: AtomicU64::new(0),
            decodes: AtomicU64::new(0),
            bytes_encoded: AtomicU64::new(0),
            bytes_decoded: AtomicU64::new(0),
            encode_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
        }
    }

    /// Name of the codec these counters belong to.
    #[must_use]
    pub fn codec(&self) -> &'static str {
        self.codec
    }

    /// Records a successful encode producing `bytes` bytes.
    pub fn record_encode(&self, bytes: usize) {
        let bytes = bytes as u64;
        self.encodes.fetch_add(1, Ordering::Relaxed);
        self.bytes_encoded.fetch_add(bytes, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("wirecodec.codec.encodes", "codec" => self.codec).increment(1);
            metrics::counter!("wirecodec.codec.bytes.encoded", "codec" => self.codec)
                .increment(bytes);
        }
    }

    /// Records a successful decode of `bytes` bytes.
    pub fn record_decode(&self, bytes: usize) {
        let bytes = bytes as u64;
        self.decodes.fetch_add(1, Ordering::Relaxed);
        self.bytes_decoded.fetch_add(bytes, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("wirecodec.codec.decodes", "codec" => self.codec).increment(1);
            metrics::counter!("wirecodec.codec.bytes.decoded", "codec" => self.codec)
                .increment(bytes);
        }
    }

    /// Records a failed encode.
    pub fn record_encode_error(&self) {
        self.encode_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("wirecodec.codec.errors.encode", "codec" => self.codec).increment(1);
    }

    /// Records a failed decode.
    pub fn record_decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("wirecodec.codec.errors.decode", "codec" => self.codec).increment(1);
    }

    /// Reads every counter.
    #[must_use]
    pub fn snapshot(&self) -> CodecMetricsSnapshot {
        CodecMetricsSnapshot {
            encodes: self.encodes.load(Ordering::Relaxed),
            decodes: self.decodes.load(Ordering::Relaxed),
            bytes_encoded: self.bytes_encoded.load(Ordering::Relaxed),
            bytes_decoded: self.bytes_decoded.load(Ordering::Relaxed),
            encode_errors: self.encode_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.encodes.store(0, Ordering::Relaxed);
        self.decodes.store(0, Ordering::Relaxed);
        self.bytes_encoded.store(0, Ordering::Relaxed);
        self.bytes_decoded.store(0, Ordering::Relaxed);
        self.encode_errors.store(0, Ordering::Relaxed);
        self.decode_errors.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of a [`CodecMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecMetricsSnapshot {
    /// Successful encodes
    pub encodes: u64,
    /// Successful decodes
    pub decodes: u64,
    /// Bytes produced by successful encodes
    pub bytes_encoded: u64,
    /// Bytes consumed by successful decodes
    pub bytes_decoded: u64,
    /// Failed encodes
    pub encode_errors: u64,
    /// Failed decodes
    pub decode_errors: u64,
}

impl CodecMetricsSnapshot {
    /// Fraction of calls that failed, or `0.0` if there were none.
    #[must_use]
    pub fn error_rate(&self) -> f64 {
        let errors = self.encode_errors + self.decode_errors;
        let total = self.encodes + self.decodes + errors;
        if total == 0 {
            0.0
        } else {
            errors as f64 / total as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = CodecMetrics::new("stream");
        metrics.record_encode(10);
        metrics.record_encode(5);
        metrics.record_decode(15);
        metrics.record_encode_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.encodes, 2);
        assert_eq!(snapshot.bytes_encoded, 15);
        assert_eq!(snapshot.decodes, 1);
        assert_eq!(snapshot.bytes_decoded, 15);
        assert_eq!(snapshot.encode_errors, 1);
        assert_eq!(metrics.codec(), "stream");
    }

    #[test]
    fn test_error_rate() {
        let metrics = CodecMetrics::new("schema");
        assert_eq!(metrics.snapshot().error_rate(), 0.0);
        metrics.record_decode(1);
        metrics.record_decode_error();
        assert!((metrics.snapshot().error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reset() {
        let metrics = CodecMetrics::new("graph");
        metrics.record_encode(1);
        metrics.reset();
        assert_eq!(metrics.snapshot(), CodecMetricsSnapshot::default());
    }
}
