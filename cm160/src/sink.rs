//! Where readings end up.

use std::{
    fs::File,
    io::{self, Write},
    path::{Path, PathBuf},
};

use log::debug;

use crate::Reading;

/// Mains voltage used to turn current into an approximate power.
pub const NOMINAL_VOLTS: f64 = 230.0;

/// Something that accepts readings once the session is forwarding them.
pub trait ReadingSink {
    fn store(&mut self, reading: &Reading) -> io::Result<()>;
}

impl<S: ReadingSink + ?Sized> ReadingSink for &mut S {
    fn store(&mut self, reading: &Reading) -> io::Result<()> {
        (**self).store(reading)
    }
}

/// Keeps a single file holding the latest power figure, one line, `<watts> W`.
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new<P: AsRef<Path>>(path: P) -> FileSink {
        FileSink {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// The text written for a reading.  Watts are always a multiple of 16.1, so one decimal place is
/// exact.
pub fn power_line(reading: &Reading) -> String {
    format!("{:.1} W\n", reading.amperes * NOMINAL_VOLTS)
}

impl ReadingSink for FileSink {
    fn store(&mut self, reading: &Reading) -> io::Result<()> {
        let line = power_line(reading);
        debug!("{}: {}", self.path.display(), line.trim_end());
        let mut fd = File::create(&self.path)?;
        fd.write_all(line.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::{power_line, FileSink, ReadingSink};
    use crate::{RawFrame, Reading};

    fn reading(raw_current: u16) -> Reading {
        let [lo, hi] = raw_current.to_le_bytes();
        let mut bytes = [0x51, 0x17, 0x06, 0x0f, 0x0c, 0x1e, 0, 0, lo, hi, 0];
        bytes[10] = bytes[..10].iter().fold(0u8, |s, &b| s.wrapping_add(b));
        Reading::decode(&RawFrame(bytes)).unwrap()
    }

    #[test]
    fn line_format() {
        assert_eq!(power_line(&reading(100)), "1610.0 W\n");
        assert_eq!(power_line(&reading(0)), "0.0 W\n");
        assert_eq!(power_line(&reading(1)), "16.1 W\n");
        assert_eq!(power_line(&reading(0xffff)), "1055113.5 W\n");
    }

    #[test]
    fn file_overwritten() {
        let path = std::env::temp_dir().join(format!("cm160-sink-{}", std::process::id()));
        let mut sink = FileSink::new(&path);
        assert_eq!(sink.path(), path.as_path());

        sink.store(&reading(200)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "3220.0 W\n");

        sink.store(&reading(100)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1610.0 W\n");

        std::fs::remove_file(&path).unwrap();
    }
}
