//! The CM160 protocol
//!
//! The Owl CM160 energy monitor talks to the host through a CP210x serial-over-USB bridge.  All
//! traffic, in both directions, is carried on two bulk endpoints.  The device sends fixed 11-byte
//! frames, and the host only ever answers with single acknowledgement bytes.
//!
//! There are two kinds of frames.  Handshake frames are fixed literal sequences, which the device
//! sends when it wants to be identified, or when it wants to know if the host is still there.
//! Data frames carry a timestamp and a current sample, and are tagged as either live readings or
//! historical readings from the device's internal database.  Data frames end in a simple byte-sum
//! checksum.
//!
//! The device will send its whole history before any live frames, so a session starts in a state
//! where readings are only shown, and only starts forwarding readings on once the first live frame
//! has arrived.
//!
//! This crate doesn't know anything about USB itself.  The [`Transport`] trait is implemented by
//! the host tool, and the [`Driver`] pumps data through the [`Session`].

mod decode;
mod driver;
mod error;
mod frame;
mod session;
mod sink;

pub use decode::{FrameKind, Reading};
pub use driver::{BusyPolicy, Driver, DriverConfig, Transport};
pub use error::{DecodeError, Error, Result, TransportError};
pub use frame::{frames, Frames, RawFrame, FRAME_LEN, ID_MSG, WAIT_MSG};
pub use session::{ForwardPolicy, Session};
pub use sink::{FileSink, ReadingSink, NOMINAL_VOLTS};

/// USB vendor id of the Owl devices (the bridge is rebadged).
pub const OWL_VENDOR_ID: u16 = 0x0fde;

/// USB product id of the CM160.
pub const CM160_PRODUCT_ID: u16 = 0xca05;

/// Reply to [`ID_MSG`].
pub const ID_ACK: u8 = 0x5a;

/// Reply to [`WAIT_MSG`].
pub const WAIT_ACK: u8 = 0xa5;

/// Serial rate the bridge must be configured for.
pub const BAUD_RATE: u32 = 250_000;
