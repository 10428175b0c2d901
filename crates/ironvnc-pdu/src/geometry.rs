use ironvnc_core::{Decode, DecodeResult, Encode, EncodeResult, ReadCursor, WriteCursor};

/// A rectangle of the remote framebuffer, in pixels.
///
/// `x` and `y` locate the top-left corner. The rectangle is expressed as the
/// wire encodes it: position plus dimension, all unsigned 16-bit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rectangle {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rectangle {
    const FIXED_PART_SIZE: usize = 2 /* x */ + 2 /* y */ + 2 /* width */ + 2 /* height */;

    /// Builds a rectangle from two corner points, in any order.
    pub fn from_corners(x0: u16, y0: u16, x1: u16, y1: u16) -> Self {
        let x = x0.min(x1);
        let y = y0.min(y1);

        Self {
            x,
            y,
            width: x0.max(x1) - x,
            height: y0.max(y1) - y,
        }
    }

    /// Returns the number of pixels covered by this rectangle.
    pub fn area(self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Packs the four coordinates into a single value usable as a lookup key.
    ///
    /// Two rectangles compare equal if and only if their keys are equal.
    pub fn key(self) -> u64 {
        (u64::from(self.x) << 48) | (u64::from(self.y) << 32) | (u64::from(self.width) << 16) | u64::from(self.height)
    }
}

impl Encode for Rectangle {
    fn encode(&self, dst: &mut WriteCursor<'_>) -> EncodeResult<()> {
        ironvnc_core::ensure_fixed_part_size!(in: dst);

        dst.write_u16_be(self.x);
        dst.write_u16_be(self.y);
        dst.write_u16_be(self.width);
        dst.write_u16_be(self.height);

        Ok(())
    }

    fn name(&self) -> &'static str {
        "Rectangle"
    }

    fn size(&self) -> usize {
        Self::FIXED_PART_SIZE
    }
}

impl Decode for Rectangle {
    fn decode(src: &mut ReadCursor<'_>) -> DecodeResult<Self> {
        ironvnc_core::ensure_fixed_part_size!(in: src);

        let x = src.read_u16_be();
        let y = src.read_u16_be();
        let width = src.read_u16_be();
        let height = src.read_u16_be();

        Ok(Self { x, y, width, height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_corners_normalizes_order() {
        let rect = Rectangle::from_corners(140, 70, 20, 20);

        assert_eq!(
            rect,
            Rectangle {
                x: 20,
                y: 20,
                width: 120,
                height: 50,
            }
        );
    }

    #[test]
    fn key_is_unique_per_geometry() {
        let a = Rectangle {
            x: 0,
            y: 1,
            width: 2,
            height: 3,
        };
        let b = Rectangle {
            x: 0,
            y: 1,
            width: 3,
            height: 2,
        };

        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.key());
    }

    #[test]
    fn encode_decode_wire_layout() {
        let rect = Rectangle {
            x: 0x0102,
            y: 0x0304,
            width: 0x0506,
            height: 0x0708,
        };

        let encoded = ironvnc_core::encode_vec(&rect).unwrap();
        assert_eq!(encoded, [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]);

        let decoded: Rectangle = ironvnc_core::decode(&encoded).unwrap();
        assert_eq!(decoded, rect);
    }
}
