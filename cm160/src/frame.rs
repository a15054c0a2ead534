//! Frame synchronization.
//!
//! The device always sends whole 11-byte frames, and a bulk read returns some number of them back
//! to back.  There is no start marker, so frames are just sliced from the start of each read.  A
//! short piece at the end of a read is dropped; it isn't carried over into the next read.

use core::fmt;

/// Every frame, handshake or data, is this long.
pub const FRAME_LEN: usize = 11;

/// The device asking to be identified.  Answered with [`crate::ID_ACK`].
pub const ID_MSG: [u8; FRAME_LEN] = [
    0xa9, 0x49, 0x44, 0x54, 0x43, 0x4d, 0x56, 0x30, 0x30, 0x31, 0x01,
];

/// The device asking if the host is still there.  Answered with [`crate::WAIT_ACK`].
pub const WAIT_MSG: [u8; FRAME_LEN] = [
    0xa9, 0x49, 0x44, 0x54, 0x57, 0x41, 0x49, 0x54, 0x50, 0x43, 0x52,
];

/// A single frame, as received.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RawFrame(pub [u8; FRAME_LEN]);

impl RawFrame {
    pub fn bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    pub fn is_id_msg(&self) -> bool {
        self.0 == ID_MSG
    }

    pub fn is_wait_msg(&self) -> bool {
        self.0 == WAIT_MSG
    }

    /// The checksum computed over the body of the frame.
    pub fn checksum(&self) -> u8 {
        self.0[..FRAME_LEN - 1]
            .iter()
            .fold(0u8, |sum, &b| sum.wrapping_add(b))
    }

    /// The checksum the device sent.
    pub fn sent_checksum(&self) -> u8 {
        self.0[FRAME_LEN - 1]
    }
}

impl fmt::Debug for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawFrame({:02x?})", self.0)
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x?}", self.0)
    }
}

/// Iterator over the whole frames in a buffer.
pub struct Frames<'a> {
    chunks: core::slice::ChunksExact<'a, u8>,
}

/// Slice a received buffer into frames.
pub fn frames(buf: &[u8]) -> Frames<'_> {
    Frames {
        chunks: buf.chunks_exact(FRAME_LEN),
    }
}

impl<'a> Frames<'a> {
    /// The trailing bytes that didn't make up a whole frame.
    pub fn remainder(&self) -> &'a [u8] {
        self.chunks.remainder()
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = RawFrame;

    fn next(&mut self) -> Option<RawFrame> {
        let chunk = self.chunks.next()?;
        let mut bytes = [0u8; FRAME_LEN];
        bytes.copy_from_slice(chunk);
        Some(RawFrame(bytes))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chunks.size_hint()
    }
}

impl<'a> ExactSizeIterator for Frames<'a> {}
