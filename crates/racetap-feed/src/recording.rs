//! Timestamped raw-byte recordings of a serial session.
//!
//! The file is a sequence of `{elapsed_ms: i64 LE, n: u64 LE, bytes[n]}`
//! records, truncated on start and append-only afterwards. Playback feeds
//! the same parser/projector pipeline the live worker uses, paced by wall
//! time, so a recording is substitutable for a live seat.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use racetap_core::Output;
use racetap_core::smb::NametableCache;

use crate::error::FeedError;
use crate::processor::{DEFAULT_MAX_OUTPUTS, StreamProcessor};
use crate::source::OutputSource;

const RECORD_HEADER_LEN: usize = 8 + 8;

/// Append-only writer for the recording tee.
pub struct RecordingWriter {
    path: PathBuf,
    file: BufWriter<File>,
    start: Instant,
}

impl RecordingWriter {
    pub fn create(path: &Path) -> Result<Self, FeedError> {
        let file = File::create(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: BufWriter::new(file),
            start: Instant::now(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Milliseconds since recording started; the timestamp for `append`.
    pub fn elapsed_ms(&self) -> i64 {
        self.start.elapsed().as_millis() as i64
    }

    pub fn append(&mut self, elapsed_ms: i64, bytes: &[u8]) -> Result<(), FeedError> {
        self.file.write_all(&elapsed_ms.to_le_bytes())?;
        self.file.write_all(&(bytes.len() as u64).to_le_bytes())?;
        self.file.write_all(bytes)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<(), FeedError> {
        self.file.flush()?;
        Ok(())
    }
}

/// One parsed record borrowing its bytes from the loaded file.
fn read_record(data: &[u8], index: usize) -> Option<(i64, &[u8], usize)> {
    let header = data.get(index..index + RECORD_HEADER_LEN)?;
    let elapsed = i64::from_le_bytes(header[..8].try_into().expect("slice length is 8"));
    let n = u64::from_le_bytes(header[8..].try_into().expect("slice length is 8")) as usize;
    let start = index + RECORD_HEADER_LEN;
    let bytes = data.get(start..start + n)?;
    Some((elapsed, bytes, start + n))
}

/// In-memory playback of a recording with pause and seek.
pub struct Recording {
    path: PathBuf,
    data: Vec<u8>,
    data_index: usize,
    paused: bool,
    start: Instant,
    pause_offset_ms: i64,
    /// Recorded timestamp of the first run-start frame, if any; anchor for
    /// [`Recording::seek_from_start_to`].
    start_millis: Option<i64>,
    nametables: Arc<NametableCache>,
    processor: StreamProcessor,
}

impl Recording {
    pub fn open(path: &Path, nametables: Arc<NametableCache>) -> Result<Self, FeedError> {
        let data = std::fs::read(path)?;
        Ok(Self::from_bytes_inner(path.to_path_buf(), data, nametables))
    }

    pub fn from_bytes(data: Vec<u8>, nametables: Arc<NametableCache>) -> Self {
        Self::from_bytes_inner(PathBuf::new(), data, nametables)
    }

    fn from_bytes_inner(path: PathBuf, data: Vec<u8>, nametables: Arc<NametableCache>) -> Self {
        let mut rec = Self {
            path,
            data,
            data_index: 0,
            paused: false,
            start: Instant::now(),
            pause_offset_ms: 0,
            start_millis: None,
            nametables: Arc::clone(&nametables),
            processor: StreamProcessor::new(nametables, DEFAULT_MAX_OUTPUTS),
        };
        rec.start_millis = rec.find_start_millis();
        rec
    }

    /// Initial pass locating the beginning of 1-1.
    fn find_start_millis(&self) -> Option<i64> {
        let mut proc = StreamProcessor::new(Arc::clone(&self.nametables), DEFAULT_MAX_OUTPUTS);
        let mut index = 0;
        while let Some((elapsed, bytes, next)) = read_record(&self.data, index) {
            proc.on_bytes(bytes, elapsed);
            while let Some(out) = proc.pop_next() {
                if out.powered_on && out.frame.is_run_start() {
                    return Some(elapsed);
                }
            }
            index = next;
        }
        None
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn num_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn done(&self) -> bool {
        read_record(&self.data, self.data_index).is_none()
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Rewind to the beginning and keep playing from a fresh wall clock.
    pub fn reset(&mut self) {
        self.data_index = 0;
        self.processor.reset();
        self.pause_offset_ms = 0;
        self.start = Instant::now();
    }

    pub fn reset_to_start_and_pause(&mut self) {
        self.reset();
        self.paused = true;
    }

    pub fn set_paused(&mut self, paused: bool) {
        if paused == self.paused {
            return;
        }
        if paused {
            self.pause_offset_ms += self.start.elapsed().as_millis() as i64;
        } else {
            self.start = Instant::now();
        }
        self.paused = paused;
    }

    /// Jump so playback continues from recorded time `millis`.
    pub fn start_at(&mut self, millis: i64) {
        self.data_index = 0;
        self.processor.reset();
        self.pause_offset_ms = millis;
        self.start = Instant::now();
        self.advance_to(millis);
    }

    /// Like [`Recording::start_at`] but relative to the first 1-1 start
    /// found in the recording (or the file start when there is none).
    pub fn seek_from_start_to(&mut self, millis: i64) {
        self.start_at(self.start_millis.unwrap_or(0) + millis);
    }

    /// Feed records whose recorded timestamp precedes `target`.
    fn advance_to(&mut self, target: i64) {
        while let Some((elapsed, bytes, next)) = read_record(&self.data, self.data_index) {
            if elapsed >= target {
                break;
            }
            self.processor.on_bytes(bytes, elapsed);
            self.data_index = next;
        }
    }

    fn step(&mut self) {
        if self.paused {
            return;
        }
        let target = self.pause_offset_ms + self.start.elapsed().as_millis() as i64;
        self.advance_to(target);
    }

    /// Decode the whole recording offline, ignoring pacing.
    pub fn all_outputs(&self) -> Vec<Arc<Output>> {
        let mut proc = StreamProcessor::new(Arc::clone(&self.nametables), usize::MAX);
        let mut index = 0;
        while let Some((elapsed, bytes, next)) = read_record(&self.data, index) {
            proc.on_bytes(bytes, elapsed);
            index = next;
        }
        let mut outputs = Vec::new();
        while let Some(out) = proc.pop_next() {
            outputs.push(out);
        }
        outputs
    }
}

impl OutputSource for Recording {
    fn latest(&mut self) -> Option<Arc<Output>> {
        self.step();
        self.processor.latest()
    }

    fn next(&mut self) -> Option<Arc<Output>> {
        self.step();
        self.processor.pop_next()
    }
}
