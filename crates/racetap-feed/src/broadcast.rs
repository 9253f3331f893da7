//! Live multi-seat fan-out: a TCP publisher per transmitting process and
//! a process-wide subscriber context on the receiving side.
//!
//! The wire unit is the three-frame envelope from `racetap_proto`: topic,
//! seat name, encoded output. One subscriber connection carries every seat
//! a remote publisher offers; the context demultiplexes by name into
//! per-client slots, so any number of [`BroadcastClient`]s share one
//! socket per bind address.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use racetap_core::{Output, codec};
use racetap_proto::constants::BROADCAST_TOPIC;
use racetap_proto::envelope::{encode_envelope, try_decode_envelopes};

use crate::error::FeedError;
use crate::source::{OutputSlots, OutputSource};

/// Envelopes above this many nametable diffs are trimmed before encoding;
/// a transition frame can diff nearly the whole screen and the viewers
/// only need the visible window.
const MAX_BROADCAST_NT_DIFFS: usize = 5000;

const ACCEPT_POLL: Duration = Duration::from_millis(20);
const RECONNECT_DELAY: Duration = Duration::from_millis(500);
const SUBSCRIBER_QUEUE: usize = 128;

/// Publishes per-seat outputs to every connected subscriber.
pub struct BroadcastPublisher {
    subscribers: Arc<Mutex<Vec<TcpStream>>>,
    should_stop: Arc<AtomicBool>,
    local_addr: SocketAddr,
    join: Option<JoinHandle<()>>,
    scratch: Vec<u8>,
}

impl BroadcastPublisher {
    pub fn bind(addr: &str) -> Result<Self, FeedError> {
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "broadcast publisher listening");

        let subscribers: Arc<Mutex<Vec<TcpStream>>> = Arc::new(Mutex::new(Vec::new()));
        let should_stop = Arc::new(AtomicBool::new(false));

        let accept_subs = Arc::clone(&subscribers);
        let accept_stop = Arc::clone(&should_stop);
        let join = thread::Builder::new()
            .name("racetap-broadcast-accept".to_owned())
            .spawn(move || {
                while !accept_stop.load(Ordering::Relaxed) {
                    match listener.accept() {
                        Ok((stream, peer)) => {
                            debug!(%peer, "subscriber connected");
                            let _ = stream.set_nodelay(true);
                            accept_subs.lock().push(stream);
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                            thread::sleep(ACCEPT_POLL);
                        }
                        Err(e) => {
                            warn!(error = %e, "accept failed");
                            thread::sleep(ACCEPT_POLL);
                        }
                    }
                }
            })?;

        Ok(Self {
            subscribers,
            should_stop,
            local_addr,
            join: Some(join),
            scratch: Vec::new(),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Send one output under a seat name to every subscriber, dropping
    /// connections whose writes fail.
    pub fn publish(&mut self, name: &str, output: &Arc<Output>) -> Result<(), FeedError> {
        let trimmed;
        let to_encode: &Output = if output.frame.nt_diffs.len() > MAX_BROADCAST_NT_DIFFS {
            let mut copy = Output::clone(output);
            copy.frame.nt_diffs.truncate(MAX_BROADCAST_NT_DIFFS);
            trimmed = copy;
            &trimmed
        } else {
            output
        };
        codec::encode(to_encode, &mut self.scratch);
        let bytes = encode_envelope(name, &self.scratch)?;

        let mut subs = self.subscribers.lock();
        subs.retain_mut(|stream| match stream.write_all(&bytes) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "dropping subscriber");
                false
            }
        });
        Ok(())
    }
}

impl Drop for BroadcastPublisher {
    fn drop(&mut self) {
        self.should_stop.store(true, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

type SeatSlots = Arc<Mutex<OutputSlots>>;
type BindSinks = Arc<Mutex<HashMap<String, SeatSlots>>>;

/// Process-wide subscriber state: one reader thread and one sink table
/// per distinct bind address. Owned by a lazily initialized singleton;
/// sockets live until process exit.
struct BroadcastContext {
    binds: Mutex<HashMap<String, BindSinks>>,
}

static CONTEXT: OnceCell<BroadcastContext> = OnceCell::new();

impl BroadcastContext {
    fn global() -> &'static BroadcastContext {
        CONTEXT.get_or_init(|| BroadcastContext {
            binds: Mutex::new(HashMap::new()),
        })
    }

    fn register(&self, bind: &str, name: &str) -> SeatSlots {
        let mut binds = self.binds.lock();
        let sinks = binds.entry(bind.to_owned()).or_insert_with(|| {
            let sinks: BindSinks = Arc::new(Mutex::new(HashMap::new()));
            spawn_reader(bind.to_owned(), Arc::clone(&sinks));
            sinks
        });
        Arc::clone(
            sinks
                .lock()
                .entry(name.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(OutputSlots::new(SUBSCRIBER_QUEUE)))),
        )
    }
}

fn spawn_reader(bind: String, sinks: BindSinks) {
    let builder = thread::Builder::new().name("racetap-broadcast-sub".to_owned());
    let spawned = builder.spawn(move || {
        loop {
            let stream = match TcpStream::connect(&bind) {
                Ok(s) => s,
                Err(e) => {
                    trace!("subscriber connect to {} failed, retrying: {}", bind, e);
                    thread::sleep(RECONNECT_DELAY);
                    continue;
                }
            };
            info!("subscribed to {}", bind);
            reader_loop(stream, &sinks);
            thread::sleep(RECONNECT_DELAY);
        }
    });
    if let Err(e) = spawned {
        warn!(error = %e, "failed to spawn subscriber thread");
    }
}

fn reader_loop(mut stream: TcpStream, sinks: &BindSinks) {
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8 * 1024];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => {
                info!("publisher closed connection");
                return;
            }
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "subscriber read error");
                return;
            }
        };
        pending.extend_from_slice(&chunk[..n]);

        let consumed = match try_decode_envelopes(&pending) {
            Ok((envelopes, consumed)) => {
                for env in envelopes {
                    if env.topic != BROADCAST_TOPIC {
                        continue;
                    }
                    let Some(slots) = sinks.lock().get(env.name).cloned() else {
                        // Seats nobody asked for are dropped silently.
                        continue;
                    };
                    match codec::decode(env.payload) {
                        Ok(output) => slots.lock().publish(Arc::new(output)),
                        Err(e) => debug!(error = %e, name = env.name, "bad payload dropped"),
                    }
                }
                consumed
            }
            Err(e) => {
                warn!(error = %e, "broadcast framing error, reconnecting");
                return;
            }
        };
        pending.drain(..consumed);
    }
}

/// A subscription to one remote seat, identified by `(bind, name)`.
pub struct BroadcastClient {
    bind: String,
    name: String,
    slots: SeatSlots,
}

impl BroadcastClient {
    pub fn connect(bind: &str, name: &str) -> Self {
        let slots = BroadcastContext::global().register(bind, name);
        Self {
            bind: bind.to_owned(),
            name: name.to_owned(),
            slots,
        }
    }

    pub fn bind(&self) -> &str {
        &self.bind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl OutputSource for BroadcastClient {
    fn latest(&mut self) -> Option<Arc<Output>> {
        self.slots.lock().latest()
    }

    fn next(&mut self) -> Option<Arc<Output>> {
        self.slots.lock().pop_next()
    }
}
