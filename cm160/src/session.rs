//! The protocol state machine.
//!
//! A session answers handshakes and decodes data frames.  It starts out waiting for the first live
//! frame; until then, decoded readings are only logged.  Once a live frame has been seen, the
//! session stays live for as long as it exists.

use std::str::FromStr;

use log::{info, warn};

use crate::{DecodeError, Error, RawFrame, Reading, ReadingSink, Transport, ID_ACK, WAIT_ACK};

/// Which readings are handed to the sink once the session is live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForwardPolicy {
    /// Everything decoded after the first live frame, historical frames included.
    #[default]
    Session,
    /// Only live frames, after the first live frame.
    LiveOnly,
}

impl FromStr for ForwardPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "session" => Ok(ForwardPolicy::Session),
            "live-only" => Ok(ForwardPolicy::LiveOnly),
            _ => Err(format!("unknown forward policy {:?}", s)),
        }
    }
}

/// State of one connection to the device.
#[derive(Debug)]
pub struct Session<S> {
    seen_live: bool,
    policy: ForwardPolicy,
    sink: S,
}

impl<S: ReadingSink> Session<S> {
    pub fn new(sink: S, policy: ForwardPolicy) -> Session<S> {
        Session {
            seen_live: false,
            policy,
            sink,
        }
    }

    /// Has a live frame been seen yet.
    pub fn is_live(&self) -> bool {
        self.seen_live
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Handle a single frame.  Handshake replies are written to `out`.  Only transport and sink
    /// errors are returned, bad frames are logged and dropped.  A failed reply is always fatal,
    /// the busy backoff only applies to reads.
    pub fn process<T: Transport + ?Sized>(
        &mut self,
        frame: &RawFrame,
        out: &mut T,
    ) -> Result<(), Error> {
        if frame.is_id_msg() {
            info!("got ID_MSG");
            out.write(&[ID_ACK]).map_err(Error::Transport)?;
            return Ok(());
        }
        if frame.is_wait_msg() {
            info!("got WAIT_MSG");
            out.write(&[WAIT_ACK]).map_err(Error::Transport)?;
            return Ok(());
        }

        let reading = match Reading::decode(frame) {
            Ok(reading) => reading,
            Err(DecodeError::UnknownFrameKind(id)) => {
                warn!("Unknown frame ({:#04x}): {}", id, frame);
                return Ok(());
            }
            Err(DecodeError::ChecksumMismatch { expected, found, reading }) => {
                warn!(
                    "Failed checksum (expected {:#04x}, got {:#04x}): {}",
                    expected, found, frame
                );
                reading
            }
        };

        if reading.is_live && !self.seen_live {
            self.seen_live = true;
            info!("Got first live frame");
        }

        info!("Frame: {}", reading);

        if self.should_forward(&reading) {
            self.sink.store(&reading)?;
        }

        Ok(())
    }

    fn should_forward(&self, reading: &Reading) -> bool {
        match self.policy {
            ForwardPolicy::Session => self.seen_live,
            ForwardPolicy::LiveOnly => self.seen_live && reading.is_live,
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::io;

    use super::{ForwardPolicy, Session};
    use crate::{RawFrame, Reading, ReadingSink, Transport, TransportError, ID_MSG, WAIT_MSG};

    /// Sink that just remembers what it was given.
    #[derive(Default)]
    pub(crate) struct VecSink(pub Vec<Reading>);

    impl ReadingSink for VecSink {
        fn store(&mut self, reading: &Reading) -> io::Result<()> {
            self.0.push(reading.clone());
            Ok(())
        }
    }

    /// Transport that only records writes.
    #[derive(Default)]
    struct WriteLog(Vec<Vec<u8>>);

    impl Transport for WriteLog {
        fn read(
            &mut self,
            _buf: &mut [u8],
            _timeout: std::time::Duration,
        ) -> Result<usize, TransportError> {
            Err(TransportError::Disconnected)
        }

        fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
            self.0.push(data.to_vec());
            Ok(())
        }
    }

    pub(crate) fn data(kind: u8, raw_current: u16) -> RawFrame {
        let [lo, hi] = raw_current.to_le_bytes();
        let mut bytes = [kind, 0x17, 0x06, 0x0f, 0x0c, 0x1e, 0, 0, lo, hi, 0];
        bytes[10] = bytes[..10].iter().fold(0u8, |s, &b| s.wrapping_add(b));
        RawFrame(bytes)
    }

    #[test]
    fn handshakes() {
        let mut session = Session::new(VecSink::default(), ForwardPolicy::Session);
        let mut out = WriteLog::default();

        session.process(&RawFrame(ID_MSG), &mut out).unwrap();
        assert_eq!(out.0, vec![vec![0x5a]]);

        session.process(&RawFrame(WAIT_MSG), &mut out).unwrap();
        assert_eq!(out.0, vec![vec![0x5a], vec![0xa5]]);

        assert!(!session.is_live());
        assert!(session.sink().0.is_empty());
    }

    #[test]
    fn gate_opens_on_live() {
        let mut session = Session::new(VecSink::default(), ForwardPolicy::Session);
        let mut out = WriteLog::default();

        session.process(&data(0x59, 1), &mut out).unwrap();
        assert!(!session.is_live());
        assert!(session.sink().0.is_empty());

        session.process(&data(0x51, 2), &mut out).unwrap();
        assert!(session.is_live());

        // Historical frames leak through once live.
        session.process(&data(0x59, 3), &mut out).unwrap();
        assert!(session.is_live());

        let got: Vec<u16> = session.sink().0.iter().map(|r| r.raw_current).collect();
        assert_eq!(got, vec![2, 3]);
        assert!(out.0.is_empty());
    }

    #[test]
    fn live_only_policy() {
        let mut session = Session::new(VecSink::default(), ForwardPolicy::LiveOnly);
        let mut out = WriteLog::default();

        session.process(&data(0x51, 2), &mut out).unwrap();
        session.process(&data(0x59, 3), &mut out).unwrap();
        session.process(&data(0x51, 4), &mut out).unwrap();

        let got: Vec<u16> = session.sink().0.iter().map(|r| r.raw_current).collect();
        assert_eq!(got, vec![2, 4]);
    }

    #[test]
    fn unknown_dropped() {
        let mut session = Session::new(VecSink::default(), ForwardPolicy::Session);
        let mut out = WriteLog::default();

        session.process(&data(0x51, 2), &mut out).unwrap();
        session.process(&data(0x42, 3), &mut out).unwrap();

        assert_eq!(session.sink().0.len(), 1);
    }

    #[test]
    fn bad_checksum_forwarded() {
        let mut session = Session::new(VecSink::default(), ForwardPolicy::Session);
        let mut out = WriteLog::default();

        let mut frame = data(0x51, 5);
        frame.0[10] ^= 0xff;
        session.process(&frame, &mut out).unwrap();

        assert!(session.is_live());
        assert_eq!(session.sink().0.len(), 1);
        assert_eq!(session.sink().0[0].raw_current, 5);
    }

    #[test]
    fn policy_parse() {
        assert_eq!("session".parse::<ForwardPolicy>(), Ok(ForwardPolicy::Session));
        assert_eq!("live-only".parse::<ForwardPolicy>(), Ok(ForwardPolicy::LiveOnly));
        assert!("bogus".parse::<ForwardPolicy>().is_err());
    }
}
