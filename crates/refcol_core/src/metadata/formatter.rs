//! # Metadata Formatter
//!
//! Renders typed metadata as `v1;v2;...;vn;` for the event log.
//!
//! ## Rules
//!
//! - Integers in decimal, floats with six fractional digits
//! - Every element is followed by `;`, empty input renders `""`
//! - Output never exceeds the configured line length and always ends on a
//!   complete element
//! - Unknown type tags render [`UNKNOWN_PLACEHOLDER`] and log one warning

use std::fmt::{self, Display, Write as _};
use std::sync::Arc;

use bytemuck::Pod;

use super::types::{ContextMetadata, ContextType, ContextValue, MetadataSlice, MetadataType};
use crate::log::{clamp_line, EventLogger, Level};

/// Default bound on rendered text, in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 256;

/// Substituted for values that cannot be rendered.
pub const UNKNOWN_PLACEHOLDER: &str = "<unknown>";

const FORMAT_SOURCE: &str = "metadata_format";

/// Bounded, `;`-terminated element writer.
struct LineBuilder {
    buf: String,
    limit: usize,
}

impl LineBuilder {
    fn new(limit: usize) -> Self {
        Self {
            buf: String::new(),
            limit,
        }
    }

    /// Appends `value;`. Leaves the line untouched and returns false if the
    /// element does not fit.
    fn push(&mut self, value: impl Display) -> bool {
        let mark = self.buf.len();
        let _ = write!(self.buf, "{value};");
        if self.buf.len() > self.limit {
            self.buf.truncate(mark);
            return false;
        }
        true
    }

    /// Appends already-terminated text verbatim.
    fn push_raw(&mut self, text: &str) -> bool {
        if self.buf.len() + text.len() > self.limit {
            return false;
        }
        self.buf.push_str(text);
        true
    }

    /// Appends `text;`, cutting `text` at a character boundary if needed.
    fn push_clamped(&mut self, text: &str) {
        let room = self.limit.saturating_sub(self.buf.len() + 1);
        if room == 0 {
            return;
        }
        self.buf.push_str(clamp_line(text, room));
        self.buf.push(';');
    }

    fn extend<I>(mut self, values: I) -> String
    where
        I: IntoIterator,
        I::Item: Display,
    {
        for value in values {
            if !self.push(value) {
                break;
            }
        }
        self.buf
    }

    fn finish(self) -> String {
        self.buf
    }
}

/// Renders a float the way C's `%f` does.
struct Fixed6(f64);

impl Display for Fixed6 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            f.write_str("nan")
        } else {
            write!(f, "{:.6}", self.0)
        }
    }
}

fn decode<T: Pod>(data: &[u8]) -> impl Iterator<Item = T> + '_ {
    data.chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned::<T>)
}

/// Turns typed metadata into log text.
///
/// Rendering is deterministic and touches no shared state. The only side
/// effect is a warning to the logger for input it cannot render.
pub struct MetadataFormatter {
    max_line_len: usize,
    logger: Arc<dyn EventLogger>,
}

impl MetadataFormatter {
    /// Creates a formatter with [`DEFAULT_MAX_LINE_LEN`].
    #[must_use]
    pub fn new(logger: Arc<dyn EventLogger>) -> Self {
        Self::with_max_line_len(logger, DEFAULT_MAX_LINE_LEN)
    }

    /// Creates a formatter with a custom output bound.
    #[must_use]
    pub fn with_max_line_len(logger: Arc<dyn EventLogger>, max_line_len: usize) -> Self {
        Self {
            max_line_len,
            logger,
        }
    }

    /// Output bound in bytes.
    #[inline]
    #[must_use]
    pub const fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Renders a typed array.
    #[must_use]
    pub fn format_values(&self, values: MetadataSlice<'_>) -> String {
        let line = LineBuilder::new(self.max_line_len);
        match values {
            MetadataSlice::U64(v) => line.extend(v),
            MetadataSlice::S64(v) => line.extend(v),
            MetadataSlice::U32(v) => line.extend(v),
            MetadataSlice::S32(v) => line.extend(v),
            MetadataSlice::U16(v) => line.extend(v),
            MetadataSlice::S16(v) => line.extend(v),
            MetadataSlice::Float(v) => line.extend(v.iter().map(|x| Fixed6(f64::from(*x)))),
            MetadataSlice::Double(v) => line.extend(v.iter().map(|x| Fixed6(*x))),
        }
    }

    /// Renders `count` elements of type `type_tag` from a raw native-endian
    /// buffer.
    ///
    /// If `data` holds fewer than `count` whole elements, only those are
    /// rendered and a warning is logged.
    #[must_use]
    pub fn format_array(&self, type_tag: u32, count: usize, data: &[u8]) -> String {
        let Some(ty) = MetadataType::from_tag(type_tag) else {
            self.warn(&format!("unknown metadata type {type_tag}"));
            return UNKNOWN_PLACEHOLDER.to_owned();
        };

        let width = ty.element_size();
        let available = data.len() / width;
        if available < count {
            self.warn(&format!(
                "metadata buffer holds {available} of {count} {ty} elements"
            ));
        }
        let data = &data[..count.min(available) * width];

        let line = LineBuilder::new(self.max_line_len);
        match ty {
            MetadataType::U64 => line.extend(decode::<u64>(data)),
            MetadataType::S64 => line.extend(decode::<i64>(data)),
            MetadataType::U32 => line.extend(decode::<u32>(data)),
            MetadataType::S32 => line.extend(decode::<i32>(data)),
            MetadataType::U16 => line.extend(decode::<u16>(data)),
            MetadataType::S16 => line.extend(decode::<i16>(data)),
            MetadataType::Float => line.extend(decode::<f32>(data).map(|x| Fixed6(f64::from(x)))),
            MetadataType::Double => line.extend(decode::<f64>(data).map(Fixed6)),
        }
    }

    /// Renders one context descriptor as `value;`.
    #[must_use]
    pub fn format_scalar(&self, metadata: &ContextMetadata) -> String {
        let mut line = LineBuilder::new(self.max_line_len);
        match (ContextType::from_tag(metadata.type_tag), &metadata.value) {
            (Some(kind), ContextValue::Text(text)) if kind.is_text() => line.push_clamped(text),
            (Some(kind), ContextValue::U64(value)) if !kind.is_text() => {
                line.push(value);
            }
            (Some(kind), _) => {
                self.warn(&format!("context metadata {kind:?} has a mismatched value"));
                line.push(UNKNOWN_PLACEHOLDER);
            }
            (None, _) => {
                self.warn(&format!("unknown context metadata type {}", metadata.type_tag));
                line.push(UNKNOWN_PLACEHOLDER);
            }
        }
        line.finish()
    }

    /// Renders a list of context descriptors back to back.
    #[must_use]
    pub fn format_context_list(&self, items: &[ContextMetadata]) -> String {
        let mut line = LineBuilder::new(self.max_line_len);
        for item in items {
            if !line.push_raw(&self.format_scalar(item)) {
                break;
            }
        }
        line.finish()
    }

    fn warn(&self, message: &str) {
        tracing::warn!(detail = message, "metadata not renderable");
        self.logger.log(Level::Warn, FORMAT_SOURCE, message);
    }
}

impl fmt::Debug for MetadataFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataFormatter")
            .field("max_line_len", &self.max_line_len)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log::MemoryLogger;

    fn formatter() -> (MetadataFormatter, Arc<MemoryLogger>) {
        let logger = Arc::new(MemoryLogger::new());
        (MetadataFormatter::new(logger.clone()), logger)
    }

    #[test]
    fn test_u32_array() {
        let (fmt, logger) = formatter();
        let values = [1u32, 2, 3];
        let bytes: &[u8] = bytemuck::cast_slice(&values);

        assert_eq!(fmt.format_array(MetadataType::U32.tag(), 3, bytes), "1;2;3;");
        assert_eq!(fmt.format_values(MetadataSlice::U32(&values)), "1;2;3;");
        assert!(logger.is_empty());
    }

    #[test]
    fn test_empty_float_array() {
        let (fmt, _) = formatter();
        assert_eq!(fmt.format_array(MetadataType::Float.tag(), 0, &[]), "");
        assert_eq!(fmt.format_values(MetadataSlice::Float(&[])), "");
    }

    #[test]
    fn test_signed_and_float_rendering() {
        let (fmt, _) = formatter();
        assert_eq!(fmt.format_values(MetadataSlice::S16(&[-3, 4])), "-3;4;");
        assert_eq!(fmt.format_values(MetadataSlice::S64(&[i64::MIN])), "-9223372036854775808;");
        assert_eq!(fmt.format_values(MetadataSlice::Float(&[1.5, -0.25])), "1.500000;-0.250000;");
        assert_eq!(fmt.format_values(MetadataSlice::Double(&[2.0, f64::NAN])), "2.000000;nan;");
    }

    #[test]
    fn test_unaligned_raw_buffer() {
        let (fmt, _) = formatter();
        let mut raw = vec![0u8];
        raw.extend_from_slice(&7u64.to_ne_bytes());
        raw.extend_from_slice(&9u64.to_ne_bytes());

        assert_eq!(fmt.format_array(MetadataType::U64.tag(), 2, &raw[1..]), "7;9;");
    }

    #[test]
    fn test_unknown_type_warns_once() {
        let (fmt, logger) = formatter();
        let out = fmt.format_array(42, 3, &[0u8; 12]);

        assert_eq!(out, UNKNOWN_PLACEHOLDER);
        assert_eq!(logger.count(Level::Warn), 1);
        assert_eq!(logger.len(), 1);
    }

    #[test]
    fn test_short_buffer_renders_whole_elements() {
        let (fmt, logger) = formatter();
        let bytes: &[u8] = bytemuck::cast_slice(&[5u16, 6]);

        assert_eq!(fmt.format_array(MetadataType::U16.tag(), 4, &bytes[..3]), "5;");
        assert_eq!(logger.count(Level::Warn), 1);
    }

    #[test]
    fn test_output_is_bounded() {
        let logger = Arc::new(MemoryLogger::new());
        let fmt = MetadataFormatter::with_max_line_len(logger, 10);
        let values = [1000u32, 2000, 3000, 4000];

        let out = fmt.format_values(MetadataSlice::U32(&values));
        assert_eq!(out, "1000;2000;");

        let fmt = MetadataFormatter::with_max_line_len(Arc::new(MemoryLogger::new()), 9);
        assert_eq!(fmt.format_values(MetadataSlice::U32(&values)), "1000;");
    }

    #[test]
    fn test_scalars() {
        let (fmt, logger) = formatter();

        assert_eq!(fmt.format_scalar(&ContextMetadata::text(ContextType::Device, "gpu0")), "gpu0;");
        assert_eq!(fmt.format_scalar(&ContextMetadata::value(ContextType::BandwidthFlag, 1)), "1;");
        assert_eq!(fmt.format_scalar(&ContextMetadata::value(ContextType::Tid, u64::MAX)), "18446744073709551615;");
        assert!(logger.is_empty());
    }

    #[test]
    fn test_raw_context_tags() {
        let (fmt, logger) = formatter();

        // Narrow and wide units tags
        assert_eq!(fmt.format_scalar(&ContextMetadata::raw(5, ContextValue::Text("MB/s".into()))), "MB/s;");
        assert_eq!(fmt.format_scalar(&ContextMetadata::raw(6, ContextValue::Text("MB/s".into()))), "MB/s;");
        // tid and cpu cycles flag
        assert_eq!(fmt.format_scalar(&ContextMetadata::raw(9, ContextValue::U64(4242))), "4242;");
        assert_eq!(fmt.format_scalar(&ContextMetadata::raw(17, ContextValue::U64(1))), "1;");
        assert!(logger.is_empty());
    }

    #[test]
    fn test_unknown_and_mismatched_scalars() {
        let (fmt, logger) = formatter();

        let unknown = ContextMetadata::raw(99, ContextValue::U64(1));
        assert_eq!(fmt.format_scalar(&unknown), "<unknown>;");

        let mismatched = ContextMetadata::raw(ContextType::Units.tag(), ContextValue::U64(1));
        assert_eq!(fmt.format_scalar(&mismatched), "<unknown>;");

        assert_eq!(logger.count(Level::Warn), 2);
    }

    #[test]
    fn test_long_text_scalar_is_clamped() {
        let fmt = MetadataFormatter::with_max_line_len(Arc::new(MemoryLogger::new()), 6);
        let meta = ContextMetadata::text(ContextType::Name, "héllo world");
        // 5 bytes of room: "héll" is 5 bytes.
        assert_eq!(fmt.format_scalar(&meta), "héll;");
    }

    #[test]
    fn test_context_list() {
        let (fmt, _) = formatter();
        let items = [
            ContextMetadata::text(ContextType::Name, "bytes"),
            ContextMetadata::text(ContextType::Units, "MB/s"),
            ContextMetadata::value(ContextType::MaxVal, 4096),
        ];
        assert_eq!(fmt.format_context_list(&items), "bytes;MB/s;4096;");
    }
}
