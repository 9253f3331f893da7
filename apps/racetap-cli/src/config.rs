//! JSON race configuration: seats, sources and the route.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;

use racetap_core::smb::{NametableCache, Route};
use racetap_feed::OutputSource;
use racetap_feed::broadcast::BroadcastClient;
use racetap_feed::recording::Recording;
use racetap_feed::serial::{SerialWorker, SerialWorkerConfig};
use racetap_race::RacePlayer;

#[derive(Debug, Deserialize)]
pub struct RaceConfig {
    pub title: String,
    /// Route file; the built-in any% route when omitted.
    #[serde(default)]
    pub route: Option<PathBuf>,
    /// Baseline nametable cache file.
    #[serde(default)]
    pub nametables: Option<PathBuf>,
    pub players: Vec<PlayerEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerEntry {
    pub id: u32,
    pub short_name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default = "default_color")]
    pub color: u8,
    pub source: SourceConfig,
}

fn default_color() -> u8 {
    0x16
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Serial {
        path: String,
        #[serde(default)]
        baud: Option<u32>,
    },
    Recording {
        path: PathBuf,
    },
    Broadcast {
        bind: String,
        name: String,
    },
}

impl RaceConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading race config {}", path.display()))?;
        serde_json::from_str(&raw).context("parsing race config")
    }

    pub fn route(&self) -> anyhow::Result<Route> {
        match &self.route {
            None => Ok(Route::any_percent()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading route {}", path.display()))?;
                serde_json::from_str(&raw).context("parsing route")
            }
        }
    }

    pub fn race_player(entry: &PlayerEntry) -> RacePlayer {
        RacePlayer {
            id: entry.id,
            short_name: entry.short_name.clone(),
            full_name: entry
                .full_name
                .clone()
                .unwrap_or_else(|| entry.short_name.clone()),
            color: entry.color,
        }
    }
}

pub fn load_nametables(path: Option<&Path>) -> anyhow::Result<Arc<NametableCache>> {
    match path {
        None => Ok(Arc::new(NametableCache::new())),
        Some(path) => {
            let cache = NametableCache::load(path)
                .with_context(|| format!("loading nametable cache {}", path.display()))?;
            Ok(Arc::new(cache))
        }
    }
}

pub fn open_source(
    source: &SourceConfig,
    nametables: &Arc<NametableCache>,
) -> anyhow::Result<Box<dyn OutputSource>> {
    Ok(match source {
        SourceConfig::Serial { path, baud } => {
            let mut config = SerialWorkerConfig::default();
            if let Some(baud) = baud {
                config.baud = *baud;
            }
            Box::new(SerialWorker::open(path, Arc::clone(nametables), config)?)
        }
        SourceConfig::Recording { path } => {
            Box::new(Recording::open(path, Arc::clone(nametables))?)
        }
        SourceConfig::Broadcast { bind, name } => Box::new(BroadcastClient::connect(bind, name)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_parses_every_source_kind() {
        let raw = r#"{
            "title": "finals",
            "players": [
                {"id": 1, "short_name": "AAA",
                 "source": {"type": "serial", "path": "/dev/ttyUSB0"}},
                {"id": 2, "short_name": "BBB", "color": 22,
                 "source": {"type": "recording", "path": "a.rec"}},
                {"id": 3, "short_name": "CCC", "full_name": "Player Three",
                 "source": {"type": "broadcast", "bind": "10.0.0.2:5555", "name": "seat3"}}
            ]
        }"#;
        let config: RaceConfig = serde_json::from_str(raw).expect("parse");
        assert_eq!(config.players.len(), 3);
        assert!(matches!(
            config.players[0].source,
            SourceConfig::Serial { .. }
        ));
        assert!(matches!(
            config.players[2].source,
            SourceConfig::Broadcast { .. }
        ));
        let p = RaceConfig::race_player(&config.players[0]);
        assert_eq!(p.full_name, "AAA");
        assert_eq!(p.color, 0x16);
    }
}
