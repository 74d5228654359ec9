//! Element marker for byte-level array transfer.

use zerocopy::{FromBytes, Immutable, IntoBytes};

/// Marker for element types that can cross the flat-buffer boundary.
///
/// Handles move elements between live arrays and caller-provided byte
/// buffers without knowing the element type, so elements must be plain
/// data: any bit pattern valid, no padding, no interior mutability. All
/// primitive numeric types qualify, as does any user type deriving the
/// `zerocopy` traits.
///
/// Zero-sized types technically satisfy these bounds but cannot map onto a
/// byte buffer; handle construction rejects them with a configuration
/// error.
pub trait Element: IntoBytes + FromBytes + Immutable + Copy + Send + Sync + 'static {}

impl<T> Element for T where T: IntoBytes + FromBytes + Immutable + Copy + Send + Sync + 'static {}
