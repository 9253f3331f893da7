use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use tracing::{info, warn};

use racetap_core::output::m2_delta_to_ms;
use racetap_core::smb::NametableCache;
use racetap_feed::OutputSource;
use racetap_feed::broadcast::{BroadcastClient, BroadcastPublisher};
use racetap_feed::recording::Recording;
use racetap_feed::serial::{SerialWorker, SerialWorkerConfig};
use racetap_proto::parser::{ParseStatus, Parser};
use racetap_race::Race;
use racetap_race::timing::PlayerTimings;

use crate::config::{RaceConfig, load_nametables, open_source};

/// Raw parse monitor: every decoded message to stdout, errors to the log.
pub fn watch(tty: &str, baud: u32) -> anyhow::Result<()> {
    let mut port = serialport::new(tty, baud)
        .timeout(Duration::from_millis(100))
        .open()
        .with_context(|| format!("opening {tty}"))?;
    info!("watching {tty} at {baud} baud");

    let mut parser = Parser::new();
    let mut buffer = [0u8; 256];
    let mut errors = 0u64;
    loop {
        let n = match port.read(&mut buffer) {
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
            Err(e) => return Err(e).context("serial read"),
        };
        for &byte in &buffer[..n] {
            match parser.feed(byte) {
                ParseStatus::Success => println!("{}", parser.message()),
                ParseStatus::Error(err) => {
                    errors += 1;
                    warn!(%err, errors, "parse error");
                }
                ParseStatus::Again | ParseStatus::ByteIgnored => {}
            }
        }
    }
}

/// Serial worker + broadcast publisher + recording tee.
pub fn transmit(
    tty: &str,
    bind: &str,
    name: &str,
    record: bool,
    recording_dir: &Path,
    nametables: Option<&Path>,
) -> anyhow::Result<()> {
    let nametables = load_nametables(nametables)?;
    let mut worker = SerialWorker::open(tty, nametables, SerialWorkerConfig::default())
        .with_context(|| format!("opening {tty}"))?;
    let mut publisher = BroadcastPublisher::bind(bind)?;

    if record {
        std::fs::create_dir_all(recording_dir)?;
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let path = recording_dir.join(format!("{stamp}_{name}.rec"));
        worker.start_recording(&path)?;
        info!(path = %path.display(), "recording");
    }

    let mut sent = 0u64;
    let mut sleeps = 0u32;
    loop {
        while let Some(output) = worker.next() {
            publisher.publish(name, &output)?;
            sent += 1;
        }
        std::thread::sleep(Duration::from_millis(2));
        sleeps += 1;
        if sleeps == 500 {
            sleeps = 0;
            let stats = worker.info();
            info!(
                "bytes: {} bps: {:.1} msgs: {} mps: {:.1} err: {} sent: {} subs: {}",
                stats.byte_count,
                stats.bytes_per_second,
                stats.message_count,
                stats.messages_per_second,
                stats.error_count,
                sent,
                publisher.subscriber_count(),
            );
        }
    }
}

/// Subscribe and print one line per arriving output.
pub fn receive(connect: &str, seats: &[String]) -> anyhow::Result<()> {
    let mut clients: Vec<BroadcastClient> = seats
        .iter()
        .map(|seat| BroadcastClient::connect(connect, seat))
        .collect();
    info!("receiving {seats:?} from {connect}");

    loop {
        let mut idle = true;
        for client in &mut clients {
            while let Some(out) = client.next() {
                idle = false;
                println!(
                    "{} elapsed={}ms m2={} powered={} aid={} apx={} time={}",
                    client.name(),
                    out.elapsed,
                    out.m2,
                    out.powered_on,
                    out.frame.aid,
                    out.frame.apx,
                    out.frame.time,
                );
            }
        }
        if idle {
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}

/// Offline decode of a recording, with the run's splits.
pub fn play(recording: &Path, nametables: Option<&Path>, verbose: bool) -> anyhow::Result<()> {
    let nametables = load_nametables(nametables)?;
    let rec = Recording::open(recording, nametables)
        .with_context(|| format!("opening {}", recording.display()))?;

    let outputs = rec.all_outputs();
    println!(
        "{}: {} bytes, {} outputs",
        recording.display(),
        rec.num_bytes(),
        outputs.len()
    );

    let route = racetap_core::smb::Route::any_percent();
    let mut timings = PlayerTimings::new();
    for out in &outputs {
        if verbose {
            println!(
                "elapsed={}ms m2={} user_m2={} aid={} apx={} world={}-{} time={}",
                out.elapsed,
                out.m2,
                out.user_m2,
                out.frame.aid,
                out.frame.apx,
                out.frame.world,
                out.frame.level,
                out.frame.time,
            );
        }
        timings.step(&route, out);
    }

    if let Some(start) = timings.start_m2() {
        println!("run start at m2 {start}");
        for (section, pages) in timings.split_page_m2s.iter().enumerate() {
            if let Some(&at) = pages.first() {
                let ms = m2_delta_to_ms(at.saturating_sub(start));
                println!("  section {section}: +{ms}ms");
            }
        }
        if let Some(final_m2) = timings.final_m2() {
            println!(
                "final time: {}ms",
                m2_delta_to_ms(final_m2.saturating_sub(start))
            );
        }
    } else {
        println!("no run start found");
    }
    Ok(())
}

/// Headless race loop: step at display cadence, print the tower once a
/// second.
pub fn race(config_path: &Path) -> anyhow::Result<()> {
    let config = RaceConfig::load(config_path)?;
    let route = config.route()?;
    let nametables: Arc<NametableCache> = load_nametables(config.nametables.as_deref())?;

    let players = config.players.iter().map(RaceConfig::race_player).collect();
    let mut race = Race::new(&config.title, route, players);
    for entry in &config.players {
        match open_source(&entry.source, &nametables) {
            Ok(source) => race.attach_feed(entry.id, source),
            // A dead seat stays in the standings with no feed.
            Err(e) => warn!(player = entry.id, error = %e, "source failed to open"),
        }
    }

    let frame = Duration::from_micros(16_667);
    let mut ticks = 0u64;
    loop {
        race.step();
        ticks += 1;
        if ticks % 60 == 0 {
            let tower = &race.tower.draw_state;
            println!("== {} / {} ==", tower.title, tower.subtitle);
            for entry in &tower.entries {
                let gap = match entry.interval_ms {
                    -1 => "-".to_owned(),
                    0 => "leader".to_owned(),
                    ms if entry.is_final_time => format!("{:.3}s final", ms as f64 / 1000.0),
                    ms => format!("+{:.1}s", ms as f64 / 1000.0),
                };
                println!("{:>2}. {:<10} {}", entry.position, entry.name, gap);
            }
        }
        std::thread::sleep(frame);
    }
}
