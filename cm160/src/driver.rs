//! The read loop.
//!
//! The driver owns the transport and the session, and pulls a burst of frames off of the device
//! at a time.  It runs until the transport fails.

use std::{str::FromStr, thread, time::Duration};

use log::{debug, warn};

use crate::{frames, Error, ForwardPolicy, ReadingSink, Result, Session, TransportError};

/// The two bulk endpoints of the device.
pub trait Transport {
    /// Read up to `buf.len()` bytes, waiting at most `timeout`.  Returns the number of bytes read.
    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> std::result::Result<usize, TransportError>;

    fn write(&mut self, data: &[u8]) -> std::result::Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn read(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> std::result::Result<usize, TransportError> {
        (**self).read(buf, timeout)
    }

    fn write(&mut self, data: &[u8]) -> std::result::Result<(), TransportError> {
        (**self).write(data)
    }
}

/// What to do after backing off from a busy device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BusyPolicy {
    /// Return the error after the backoff.
    #[default]
    Propagate,
    /// Go back to reading after the backoff.
    Retry,
}

impl FromStr for BusyPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "propagate" => Ok(BusyPolicy::Propagate),
            "retry" => Ok(BusyPolicy::Retry),
            _ => Err(format!("unknown busy policy {:?}", s)),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DriverConfig {
    /// How long a single read may wait for data.
    pub read_timeout: Duration,
    /// Size of the read buffer.  The device sends its history in bursts, this needs to be
    /// comfortably larger than one of those.
    pub max_burst: usize,
    /// Sleep after the device reports busy.
    pub backoff: Duration,
    pub busy: BusyPolicy,
    pub forward: ForwardPolicy,
}

impl Default for DriverConfig {
    fn default() -> Self {
        DriverConfig {
            read_timeout: Duration::from_secs(60),
            max_burst: 10_000,
            backoff: Duration::from_secs(1),
            busy: BusyPolicy::default(),
            forward: ForwardPolicy::default(),
        }
    }
}

pub struct Driver<T, S> {
    transport: T,
    session: Session<S>,
    config: DriverConfig,
    buffer: Vec<u8>,
}

impl<T: Transport, S: ReadingSink> Driver<T, S> {
    pub fn new(transport: T, sink: S, config: DriverConfig) -> Driver<T, S> {
        Driver {
            transport,
            session: Session::new(sink, config.forward),
            buffer: vec![0u8; config.max_burst],
            config,
        }
    }

    pub fn session(&self) -> &Session<S> {
        &self.session
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run until the transport (or sink) fails.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.poll()?;
        }
    }

    /// Perform a single read, and process every whole frame in it.  Returns the number of frames
    /// handled.
    pub fn poll(&mut self) -> Result<usize> {
        let count = match self.transport.read(&mut self.buffer, self.config.read_timeout) {
            Ok(count) => count.min(self.buffer.len()),
            Err(err) if err.is_busy() => {
                warn!("device busy ({}), sleeping {:?}", err, self.config.backoff);
                thread::sleep(self.config.backoff);
                return match self.config.busy {
                    BusyPolicy::Propagate => Err(Error::TransportBusy(err)),
                    BusyPolicy::Retry => Ok(0),
                };
            }
            Err(err) => return Err(Error::Transport(err)),
        };

        let burst = frames(&self.buffer[..count]);
        let leftover = burst.remainder().len();
        if leftover > 0 {
            debug!("dropping {} trailing bytes", leftover);
        }

        let mut handled = 0;
        for frame in burst {
            self.session.process(&frame, &mut self.transport)?;
            handled += 1;
        }
        Ok(handled)
    }
}
