//! Live serial ingestion: one device, one reader thread, one pipeline.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, unbounded};
use parking_lot::Mutex;
use serialport::SerialPort;
use tracing::{debug, info, warn};

use racetap_core::Output;
use racetap_core::smb::NametableCache;
use racetap_proto::constants::DEFAULT_BAUD;

use crate::error::FeedError;
use crate::processor::StreamProcessor;
use crate::rate::RateEstimator;
use crate::recording::RecordingWriter;
use crate::source::{OutputSlots, OutputSource};

const EMPTY_READ_SLEEP: Duration = Duration::from_micros(10);
const CONTROL_REPLY_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy)]
pub struct SerialWorkerConfig {
    pub baud: u32,
    pub buffer_size: usize,
    pub max_queued: usize,
}

impl Default for SerialWorkerConfig {
    fn default() -> Self {
        Self {
            baud: DEFAULT_BAUD,
            buffer_size: 1024,
            max_queued: 128,
        }
    }
}

/// Stats snapshot for the operator display.
#[derive(Debug, Clone, Default)]
pub struct SerialWorkerInfo {
    pub byte_count: u64,
    pub message_count: u64,
    pub error_count: u64,
    pub bytes_per_second: f64,
    pub messages_per_second: f64,
    pub recording: Option<PathBuf>,
}

enum ControlMessage {
    StartRecording {
        path: PathBuf,
        reply: Sender<Result<(), FeedError>>,
    },
    StopRecording {
        reply: Sender<Result<(), FeedError>>,
    },
    Stop,
}

#[derive(Default)]
struct SharedStats {
    byte_count: AtomicU64,
    message_count: AtomicU64,
    error_count: AtomicU64,
    bytes_per_second_bits: AtomicU64,
    messages_per_second_bits: AtomicU64,
}

/// Handle owning the reader thread. Dropping it stops the thread, closes
/// any active recording and joins.
pub struct SerialWorker {
    slots: Arc<Mutex<OutputSlots>>,
    stats: Arc<SharedStats>,
    recording_path: Arc<Mutex<Option<PathBuf>>>,
    should_stop: Arc<AtomicBool>,
    ctrl_tx: Sender<ControlMessage>,
    join: Option<JoinHandle<()>>,
}

impl SerialWorker {
    /// Open the device and start the reader thread.
    ///
    /// An open failure is returned here and no thread is started; callers
    /// keep the message on the seat's error field.
    pub fn open(
        path: &str,
        nametables: Arc<NametableCache>,
        config: SerialWorkerConfig,
    ) -> Result<Self, FeedError> {
        let port = serialport::new(path, config.baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(Duration::from_millis(1))
            .open()?;
        info!("serial port open: {} at {} baud", path, config.baud);

        let slots = Arc::new(Mutex::new(OutputSlots::new(config.max_queued)));
        let stats = Arc::new(SharedStats::default());
        let recording_path = Arc::new(Mutex::new(None));
        let should_stop = Arc::new(AtomicBool::new(false));
        let (ctrl_tx, ctrl_rx) = unbounded();

        let mut runner = SerialRunner {
            port,
            processor: StreamProcessor::new(nametables, config.max_queued),
            buffer: vec![0u8; config.buffer_size],
            slots: Arc::clone(&slots),
            stats: Arc::clone(&stats),
            recording_path: Arc::clone(&recording_path),
            should_stop: Arc::clone(&should_stop),
            ctrl_rx,
            byte_rate: RateEstimator::new(),
            message_rate: RateEstimator::new(),
            recording: None,
            started: Instant::now(),
        };
        let join = thread::Builder::new()
            .name("racetap-serial".to_owned())
            .spawn(move || runner.run())?;

        Ok(Self {
            slots,
            stats,
            recording_path,
            should_stop,
            ctrl_tx,
            join: Some(join),
        })
    }

    pub fn info(&self) -> SerialWorkerInfo {
        SerialWorkerInfo {
            byte_count: self.stats.byte_count.load(Ordering::Relaxed),
            message_count: self.stats.message_count.load(Ordering::Relaxed),
            error_count: self.stats.error_count.load(Ordering::Relaxed),
            bytes_per_second: f64::from_bits(
                self.stats.bytes_per_second_bits.load(Ordering::Relaxed),
            ),
            messages_per_second: f64::from_bits(
                self.stats.messages_per_second_bits.load(Ordering::Relaxed),
            ),
            recording: self.recording_path.lock().clone(),
        }
    }

    pub fn is_recording(&self) -> Option<PathBuf> {
        self.recording_path.lock().clone()
    }

    /// Start teeing raw reads into `path` (truncating it).
    pub fn start_recording(&self, path: &Path) -> Result<(), FeedError> {
        self.control(|reply| ControlMessage::StartRecording {
            path: path.to_path_buf(),
            reply,
        })
    }

    pub fn stop_recording(&self) -> Result<(), FeedError> {
        self.control(|reply| ControlMessage::StopRecording { reply })
    }

    fn control(
        &self,
        make: impl FnOnce(Sender<Result<(), FeedError>>) -> ControlMessage,
    ) -> Result<(), FeedError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.ctrl_tx
            .send(make(reply_tx))
            .map_err(|_| FeedError::WorkerGone)?;
        reply_rx
            .recv_timeout(CONTROL_REPLY_TIMEOUT)
            .map_err(|_| FeedError::WorkerGone)?
    }
}

impl OutputSource for SerialWorker {
    fn latest(&mut self) -> Option<Arc<Output>> {
        self.slots.lock().latest()
    }

    fn next(&mut self) -> Option<Arc<Output>> {
        self.slots.lock().pop_next()
    }
}

impl Drop for SerialWorker {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::Relaxed);
        let _ = self.ctrl_tx.send(ControlMessage::Stop);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

struct SerialRunner {
    port: Box<dyn SerialPort>,
    processor: StreamProcessor,
    buffer: Vec<u8>,
    slots: Arc<Mutex<OutputSlots>>,
    stats: Arc<SharedStats>,
    recording_path: Arc<Mutex<Option<PathBuf>>>,
    should_stop: Arc<AtomicBool>,
    ctrl_rx: Receiver<ControlMessage>,
    byte_rate: RateEstimator,
    message_rate: RateEstimator,
    recording: Option<RecordingWriter>,
    started: Instant,
}

impl SerialRunner {
    fn run(&mut self) {
        while !self.should_stop.load(Ordering::Relaxed) {
            if !self.drain_control() {
                break;
            }

            let n = match self.port.read(&mut self.buffer) {
                Ok(n) => n,
                Err(e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    0
                }
                Err(e) => {
                    // Read errors are retried like empty reads; a detached
                    // device simply produces silence.
                    debug!(error = %e, "serial read error");
                    0
                }
            };
            if n == 0 {
                thread::sleep(EMPTY_READ_SLEEP);
                continue;
            }

            self.stats.byte_count.fetch_add(n as u64, Ordering::Relaxed);
            self.byte_rate.record(n as u64);

            if let Some(rec) = self.recording.as_mut() {
                let at = rec.elapsed_ms();
                if let Err(e) = rec.append(at, &self.buffer[..n]) {
                    warn!(error = %e, "recording write failed, stopping tee");
                    self.recording = None;
                    *self.recording_path.lock() = None;
                }
            }

            let elapsed = self.started.elapsed().as_millis() as i64;
            let messages = self.processor.on_bytes(&self.buffer[..n], elapsed);
            self.message_rate.record(messages as u64);
            self.stats
                .message_count
                .fetch_add(messages as u64, Ordering::Relaxed);
            self.stats
                .error_count
                .store(self.processor.error_count(), Ordering::Relaxed);
            self.stats.bytes_per_second_bits.store(
                self.byte_rate.rate_per_second().to_bits(),
                Ordering::Relaxed,
            );
            self.stats.messages_per_second_bits.store(
                self.message_rate.rate_per_second().to_bits(),
                Ordering::Relaxed,
            );

            let mut slots = self.slots.lock();
            while let Some(output) = self.processor.pop_next() {
                slots.publish(output);
            }
        }
        self.finish_recording();
    }

    /// Returns false when the worker was told to stop.
    fn drain_control(&mut self) -> bool {
        loop {
            match self.ctrl_rx.try_recv() {
                Ok(ControlMessage::StartRecording { path, reply }) => {
                    let result = self.start_recording(path);
                    let _ = reply.send(result);
                }
                Ok(ControlMessage::StopRecording { reply }) => {
                    let result = if self.recording.is_some() {
                        self.finish_recording();
                        Ok(())
                    } else {
                        Err(FeedError::NotRecording)
                    };
                    let _ = reply.send(result);
                }
                Ok(ControlMessage::Stop) => return false,
                Err(crossbeam_channel::TryRecvError::Empty) => return true,
                Err(crossbeam_channel::TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn start_recording(&mut self, path: PathBuf) -> Result<(), FeedError> {
        if let Some(rec) = &self.recording {
            return Err(FeedError::AlreadyRecording(
                rec.path().display().to_string(),
            ));
        }
        let writer = RecordingWriter::create(&path)?;
        info!(path = %path.display(), "recording started");
        *self.recording_path.lock() = Some(path);
        self.recording = Some(writer);
        Ok(())
    }

    fn finish_recording(&mut self) {
        if let Some(rec) = self.recording.take() {
            info!(path = %rec.path().display(), "recording stopped");
            if let Err(e) = rec.finish() {
                warn!(error = %e, "recording close failed");
            }
            *self.recording_path.lock() = None;
        }
    }
}
