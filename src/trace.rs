//! Append-only trace sink.
//!
//! Frames are stored back to back, each with a 13-byte header:
//! - 4 bytes: seconds since the epoch (little-endian u32)
//! - 4 bytes: microseconds (little-endian u32)
//! - 4 bytes: payload length (little-endian u32)
//! - 1 byte: channel (0 = simulation output, 1 = driver input)
//!
//! Input frames carry the action as a little-endian `i32`.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{BridgeError, BridgeResult};

const HEADER_LEN: usize = 13;

/// Direction of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameChannel {
    /// Bytes the simulation displayed.
    Output,
    /// An action the driver sent.
    Input,
}

impl FrameChannel {
    /// Wire tag.
    #[must_use]
    pub const fn tag(self) -> u8 {
        match self {
            FrameChannel::Output => 0,
            FrameChannel::Input => 1,
        }
    }

    /// Decode a wire tag.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(FrameChannel::Output),
            1 => Some(FrameChannel::Input),
            _ => None,
        }
    }
}

/// A frame waiting to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    /// Direction.
    pub channel: FrameChannel,
    /// Raw bytes.
    pub payload: Vec<u8>,
}

impl TraceFrame {
    /// Simulation output.
    #[must_use]
    pub fn output(payload: Vec<u8>) -> Self {
        Self {
            channel: FrameChannel::Output,
            payload,
        }
    }

    /// Driver input.
    #[must_use]
    pub fn input(action: i32) -> Self {
        Self {
            channel: FrameChannel::Input,
            payload: action.to_le_bytes().to_vec(),
        }
    }
}

/// A frame read back from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFrame {
    /// Seconds since the epoch.
    pub sec: u32,
    /// Microseconds.
    pub usec: u32,
    /// Direction.
    pub channel: FrameChannel,
    /// Raw bytes.
    pub payload: Vec<u8>,
}

impl RecordedFrame {
    /// The action of an input frame.
    #[must_use]
    pub fn action(&self) -> Option<i32> {
        if self.channel != FrameChannel::Input {
            return None;
        }
        let bytes: [u8; 4] = self.payload.as_slice().try_into().ok()?;
        Some(i32::from_le_bytes(bytes))
    }
}

/// An open trace file.
#[derive(Debug)]
pub struct TraceSink {
    path: PathBuf,
    writer: BufWriter<File>,
    frames: u64,
}

impl TraceSink {
    /// Open `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::TraceOpen`] with the OS error and the path.
    pub fn open(path: &Path) -> BridgeResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| BridgeError::TraceOpen {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(path = %path.display(), "trace sink opened");
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            frames: 0,
        })
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written so far.
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Append one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the payload exceeds `u32`.
    pub fn write_frame(&mut self, frame: &TraceFrame) -> io::Result<()> {
        let len = u32::try_from(frame.payload.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "trace frame too large"))?;
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        #[allow(clippy::cast_possible_truncation)]
        let sec = now.as_secs() as u32;

        let mut header = [0u8; HEADER_LEN];
        header[0..4].copy_from_slice(&sec.to_le_bytes());
        header[4..8].copy_from_slice(&now.subsec_micros().to_le_bytes());
        header[8..12].copy_from_slice(&len.to_le_bytes());
        header[12] = frame.channel.tag();

        self.writer.write_all(&header)?;
        self.writer.write_all(&frame.payload)?;
        self.frames += 1;
        Ok(())
    }

    /// Append an input frame for `action`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn write_input(&mut self, action: i32) -> io::Result<()> {
        self.write_frame(&TraceFrame::input(action))
    }

    /// Push buffered frames to the OS.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Flush and close the file.
    ///
    /// # Errors
    ///
    /// Returns an error if buffered frames cannot be written out.
    pub fn close(self) -> io::Result<()> {
        let path = self.path;
        let frames = self.frames;
        let file = self.writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_all()?;
        tracing::debug!(path = %path.display(), frames, "trace sink closed");
        Ok(())
    }
}

/// Read every frame of a trace file.
///
/// # Errors
///
/// Returns an error if the file can't be read or ends mid-frame.
pub fn read_trace(path: &Path) -> io::Result<Vec<RecordedFrame>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut frames = Vec::new();

    loop {
        let mut header = [0u8; HEADER_LEN];
        match read_header(&mut reader, &mut header)? {
            0 => break,
            n if n < HEADER_LEN => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "truncated frame header",
                ));
            }
            _ => {}
        }

        let sec = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let usec = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        let len = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
        let channel = FrameChannel::from_tag(header[12]).ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("unknown frame channel {}", header[12]),
            )
        })?;

        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload)?;
        frames.push(RecordedFrame {
            sec,
            usec,
            channel,
            payload,
        });
    }

    Ok(frames)
}

/// Fill `buf` as far as the stream allows; returns bytes read.
fn read_header(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.ttyrec");

        let mut sink = TraceSink::open(&path).unwrap();
        sink.write_frame(&TraceFrame::output(b"hello".to_vec()))
            .unwrap();
        sink.write_input(i32::from(b'k')).unwrap();
        assert_eq!(sink.frames(), 2);
        sink.close().unwrap();

        let frames = read_trace(&path).unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].channel, FrameChannel::Output);
        assert_eq!(frames[0].payload, b"hello");
        assert_eq!(frames[0].action(), None);
        assert_eq!(frames[1].action(), Some(i32::from(b'k')));
    }

    #[test]
    fn test_open_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.ttyrec");
        for _ in 0..2 {
            let mut sink = TraceSink::open(&path).unwrap();
            sink.write_input(1).unwrap();
            sink.close().unwrap();
        }
        assert_eq!(read_trace(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_open_missing_directory_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("x.ttyrec");
        let err = TraceSink::open(&path).unwrap_err();
        match err {
            BridgeError::TraceOpen { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_trace_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cut.ttyrec");
        let mut sink = TraceSink::open(&path).unwrap();
        sink.write_frame(&TraceFrame::output(vec![7; 32])).unwrap();
        sink.close().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
        assert!(read_trace(&path).is_err());
    }
}
