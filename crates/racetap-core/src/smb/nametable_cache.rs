//! Baseline nametable pages for diffing the live background against.
//!
//! The cache is a consumer-supplied asset captured from a clean playthrough:
//! one 1024-byte page (960 tiles + 64 attribute bytes) per `(area, page)`.
//! On disk it is a JSON array with base64 page data.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use super::area::AreaId;
use crate::error::CacheError;

pub const PAGE_LEN: usize = 1024;

pub type NtPage = Box<[u8; PAGE_LEN]>;

#[derive(Serialize, Deserialize)]
struct PageRecord {
    aid: u16,
    page: i32,
    data: String,
}

#[derive(Debug, Default)]
pub struct NametableCache {
    pages: HashMap<(AreaId, i32), NtPage>,
}

impl NametableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, aid: AreaId, page: i32, data: NtPage) {
        self.pages.insert((aid, page), data);
    }

    pub fn get(&self, aid: AreaId, page: i32) -> Option<&NtPage> {
        self.pages.get(&(aid, page))
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let mut raw = String::new();
        std::fs::File::open(path)?.read_to_string(&mut raw)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, CacheError> {
        let records: Vec<PageRecord> = serde_json::from_str(raw)?;
        let mut cache = Self::new();
        for rec in records {
            let bytes = BASE64.decode(rec.data.as_bytes())?;
            let page: [u8; PAGE_LEN] =
                bytes
                    .try_into()
                    .map_err(|b: Vec<u8>| CacheError::BadPageLen {
                        aid: rec.aid,
                        page: rec.page,
                        len: b.len(),
                    })?;
            cache.insert(AreaId(rec.aid), rec.page, Box::new(page));
        }
        Ok(cache)
    }

    pub fn to_json(&self) -> String {
        let mut records: Vec<PageRecord> = self
            .pages
            .iter()
            .map(|(&(aid, page), data)| PageRecord {
                aid: aid.0,
                page,
                data: BASE64.encode(&data[..]),
            })
            .collect();
        records.sort_by_key(|r| (r.aid, r.page));
        serde_json::to_string(&records).expect("page records always serialize")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let mut cache = NametableCache::new();
        let mut page = [0u8; PAGE_LEN];
        page[5] = 0x24;
        page[1000] = 0xff;
        cache.insert(AreaId::GROUND_AREA_6, 2, Box::new(page));

        let restored = NametableCache::from_json(&cache.to_json()).unwrap();
        assert_eq!(restored.len(), 1);
        let p = restored.get(AreaId::GROUND_AREA_6, 2).unwrap();
        assert_eq!(p[5], 0x24);
        assert_eq!(p[1000], 0xff);
        assert!(restored.get(AreaId::GROUND_AREA_6, 3).is_none());
    }

    #[test]
    fn bad_page_length_is_rejected() {
        let raw = format!(
            r#"[{{"aid": 1, "page": 0, "data": "{}"}}]"#,
            BASE64.encode([0u8; 16])
        );
        assert!(matches!(
            NametableCache::from_json(&raw),
            Err(CacheError::BadPageLen { len: 16, .. })
        ));
    }
}
