//! # Metadata Types
//!
//! Tag values match the instrumentation API wire values, so raw tags coming
//! from callers can be mapped directly.

use std::fmt;

/// Element type of a metadata array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MetadataType {
    /// Unsigned 64-bit integer.
    U64 = 1,
    /// Signed 64-bit integer.
    S64 = 2,
    /// Unsigned 32-bit integer.
    U32 = 3,
    /// Signed 32-bit integer.
    S32 = 4,
    /// Unsigned 16-bit integer.
    U16 = 5,
    /// Signed 16-bit integer.
    S16 = 6,
    /// Single precision float.
    Float = 7,
    /// Double precision float.
    Double = 8,
}

impl MetadataType {
    /// Maps a raw tag. Returns `None` for unknown tags (including 0).
    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 => Some(Self::U64),
            2 => Some(Self::S64),
            3 => Some(Self::U32),
            4 => Some(Self::S32),
            5 => Some(Self::U16),
            6 => Some(Self::S16),
            7 => Some(Self::Float),
            8 => Some(Self::Double),
            _ => None,
        }
    }

    /// Raw tag value. Text kinds report their narrow tag.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Size of one element in bytes.
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            Self::U64 | Self::S64 | Self::Double => 8,
            Self::U32 | Self::S32 | Self::Float => 4,
            Self::U16 | Self::S16 => 2,
        }
    }
}

impl fmt::Display for MetadataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::U64 => "u64",
            Self::S64 => "s64",
            Self::U32 => "u32",
            Self::S32 => "s32",
            Self::U16 => "u16",
            Self::S16 => "s16",
            Self::Float => "float",
            Self::Double => "double",
        })
    }
}

/// Typed, borrowed metadata array.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MetadataSlice<'a> {
    /// `u64` elements.
    U64(&'a [u64]),
    /// `i64` elements.
    S64(&'a [i64]),
    /// `u32` elements.
    U32(&'a [u32]),
    /// `i32` elements.
    S32(&'a [i32]),
    /// `u16` elements.
    U16(&'a [u16]),
    /// `i16` elements.
    S16(&'a [i16]),
    /// `f32` elements.
    Float(&'a [f32]),
    /// `f64` elements.
    Double(&'a [f64]),
}

impl<'a> MetadataSlice<'a> {
    /// Element type.
    #[must_use]
    pub const fn metadata_type(&self) -> MetadataType {
        match self {
            Self::U64(_) => MetadataType::U64,
            Self::S64(_) => MetadataType::S64,
            Self::U32(_) => MetadataType::U32,
            Self::S32(_) => MetadataType::S32,
            Self::U16(_) => MetadataType::U16,
            Self::S16(_) => MetadataType::S16,
            Self::Float(_) => MetadataType::Float,
            Self::Double(_) => MetadataType::Double,
        }
    }

    /// Number of elements.
    #[must_use]
    pub const fn len(&self) -> usize {
        match self {
            Self::U64(v) => v.len(),
            Self::S64(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::S32(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::S16(v) => v.len(),
            Self::Float(v) => v.len(),
            Self::Double(v) => v.len(),
        }
    }

    /// Returns true if there are no elements.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The elements as native-endian bytes, the raw form callers pass in.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        match *self {
            Self::U64(v) => bytemuck::cast_slice(v),
            Self::S64(v) => bytemuck::cast_slice(v),
            Self::U32(v) => bytemuck::cast_slice(v),
            Self::S32(v) => bytemuck::cast_slice(v),
            Self::U16(v) => bytemuck::cast_slice(v),
            Self::S16(v) => bytemuck::cast_slice(v),
            Self::Float(v) => bytemuck::cast_slice(v),
            Self::Double(v) => bytemuck::cast_slice(v),
        }
    }
}

macro_rules! impl_slice_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl<'a> From<&'a [$ty]> for MetadataSlice<'a> {
                fn from(values: &'a [$ty]) -> Self {
                    Self::$variant(values)
                }
            }
        )*
    };
}

impl_slice_from! {
    u64 => U64,
    i64 => S64,
    u32 => U32,
    i32 => S32,
    u16 => U16,
    i16 => S16,
    f32 => Float,
    f64 => Double,
}

/// Kind of a context metadata descriptor.
///
/// Text kinds have a narrow and a wide tag on the wire. The discriminant is
/// the narrow one; [`ContextType::from_tag`] accepts both.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ContextType {
    /// Counter name (text).
    Name = 1,
    /// Device name (text).
    Device = 3,
    /// Units (text).
    Units = 5,
    /// PCI address (text).
    PciAddr = 7,
    /// Thread id.
    Tid = 9,
    /// Maximum value.
    MaxVal = 10,
    /// Bandwidth flag.
    BandwidthFlag = 11,
    /// Latency flag.
    LatencyFlag = 12,
    /// Occupancy flag.
    OccupancyFlag = 13,
    /// On-thread flag.
    OnThreadFlag = 14,
    /// Absolute value flag.
    IsAbsValFlag = 15,
    /// CPU instructions flag.
    CpuInstructionsFlag = 16,
    /// CPU cycles flag.
    CpuCyclesFlag = 17,
}

impl ContextType {
    /// Maps a raw tag. Returns `None` for unknown tags (including 0).
    #[must_use]
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            1 | 2 => Some(Self::Name),
            3 | 4 => Some(Self::Device),
            5 | 6 => Some(Self::Units),
            7 | 8 => Some(Self::PciAddr),
            9 => Some(Self::Tid),
            10 => Some(Self::MaxVal),
            11 => Some(Self::BandwidthFlag),
            12 => Some(Self::LatencyFlag),
            13 => Some(Self::OccupancyFlag),
            14 => Some(Self::OnThreadFlag),
            15 => Some(Self::IsAbsValFlag),
            16 => Some(Self::CpuInstructionsFlag),
            17 => Some(Self::CpuCyclesFlag),
            _ => None,
        }
    }

    /// Raw tag value.
    #[inline]
    #[must_use]
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Text-valued kinds; all others carry a `u64`.
    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Name | Self::Device | Self::Units | Self::PciAddr)
    }
}

/// Value of a context metadata descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextValue {
    /// Text payload.
    Text(String),
    /// Integer or flag payload.
    U64(u64),
}

/// A single typed descriptor attached to a counter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextMetadata {
    /// Raw context type tag.
    pub type_tag: u32,
    /// Payload.
    pub value: ContextValue,
}

impl ContextMetadata {
    /// Descriptor with a text payload.
    pub fn text(kind: ContextType, text: impl Into<String>) -> Self {
        Self {
            type_tag: kind.tag(),
            value: ContextValue::Text(text.into()),
        }
    }

    /// Descriptor with an integer payload.
    #[must_use]
    pub fn value(kind: ContextType, value: u64) -> Self {
        Self {
            type_tag: kind.tag(),
            value: ContextValue::U64(value),
        }
    }

    /// Descriptor from a raw tag, possibly unknown.
    #[must_use]
    pub const fn raw(type_tag: u32, value: ContextValue) -> Self {
        Self { type_tag, value }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for tag in 1..=8 {
            assert_eq!(MetadataType::from_tag(tag).unwrap().tag(), tag);
        }
        assert!(MetadataType::from_tag(0).is_none());
        assert!(MetadataType::from_tag(9).is_none());

        for tag in 9..=17 {
            assert_eq!(ContextType::from_tag(tag).unwrap().tag(), tag);
        }
        assert!(ContextType::from_tag(0).is_none());
        assert!(ContextType::from_tag(18).is_none());
    }

    #[test]
    fn test_context_tags_match_wire_values() {
        assert_eq!(ContextType::from_tag(1), Some(ContextType::Name));
        assert_eq!(ContextType::from_tag(2), Some(ContextType::Name));
        assert_eq!(ContextType::from_tag(4), Some(ContextType::Device));
        assert_eq!(ContextType::from_tag(5), Some(ContextType::Units));
        assert_eq!(ContextType::from_tag(6), Some(ContextType::Units));
        assert_eq!(ContextType::from_tag(8), Some(ContextType::PciAddr));
        assert_eq!(ContextType::from_tag(9), Some(ContextType::Tid));
        assert_eq!(ContextType::from_tag(10), Some(ContextType::MaxVal));
        assert_eq!(ContextType::from_tag(13), Some(ContextType::OccupancyFlag));
        assert_eq!(ContextType::from_tag(17), Some(ContextType::CpuCyclesFlag));

        // Wide text tags decode to the same kind, narrow tag on the way out
        assert_eq!(ContextType::from_tag(6).unwrap().tag(), 5);
        for tag in 1..=8 {
            assert!(ContextType::from_tag(tag).unwrap().is_text());
        }
    }

    #[test]
    fn test_slice_bytes() {
        let values = [1u16, 2, 3];
        let slice = MetadataSlice::from(&values[..]);
        assert_eq!(slice.metadata_type(), MetadataType::U16);
        assert_eq!(slice.len(), 3);
        assert_eq!(slice.as_bytes().len(), 6);
    }

    #[test]
    fn test_text_kinds() {
        assert!(ContextType::PciAddr.is_text());
        assert!(!ContextType::Tid.is_text());
        assert!(!ContextType::CpuCyclesFlag.is_text());
    }
}
