//! Location of a fixed-width primvar inside a flat, possibly interleaved
//! buffer.
//!
//! ```text
//!  offset ─┐   stride
//!          ├───────────────┤
//! [ x y z r g b | x y z r g b | x y z r g b ]
//!   └───┘         length = 3, offset = 0, stride = 6  (positions)
//!         └───┘   length = 3, offset = 3, stride = 6  (colors)
//! ```
use bytemuck::{Pod, Zeroable};

/// Describes where element `i` of a primvar lives in a flat `f32` buffer:
/// channels `offset + i * stride .. offset + i * stride + length`.
///
/// Descriptors never own memory.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct BufferDescriptor {
    /// Offset of the first element's first channel.
    pub offset: u32,
    /// Number of channels per element.
    pub length: u32,
    /// Distance between two consecutive elements.
    pub stride: u32,
}

impl BufferDescriptor {
    #[inline]
    pub const fn new(offset: u32, length: u32, stride: u32) -> Self {
        Self {
            offset,
            length,
            stride,
        }
    }

    /// A tightly packed layout: `(0, length, length)`.
    #[inline]
    pub const fn packed(length: u32) -> Self {
        Self::new(0, length, length)
    }

    /// Returns the relative offset within a stride.
    #[inline]
    pub fn local_offset(&self) -> u32 {
        if self.stride != 0 {
            self.offset % self.stride
        } else {
            0
        }
    }

    /// True if the descriptor values are internally consistent.
    #[inline]
    pub fn is_valid(&self) -> bool {
        (self.length != 0) && (self.length <= self.stride.saturating_sub(self.local_offset()))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        0 == self.length
    }

    /// True if a source described by `self` carries every channel `dst`
    /// asks for.
    #[inline]
    pub fn can_eval(&self, dst: &BufferDescriptor) -> bool {
        dst.length <= self.length
    }

    /// Position of the first channel of element `element`.
    #[inline]
    pub fn element_start(&self, element: usize) -> usize {
        self.offset as usize + element * self.stride as usize
    }

    /// Minimal slice length holding `count` elements.
    #[inline]
    pub fn required_len(&self, count: usize) -> usize {
        if 0 == count {
            0
        } else {
            self.element_start(count - 1) + self.length as usize
        }
    }

    /// The channels of element `element` in `buffer`.
    #[inline]
    pub(crate) fn element<'a>(&self, buffer: &'a [f32], element: usize) -> &'a [f32] {
        let start = self.element_start(element);
        &buffer[start..start + self.length as usize]
    }
}
