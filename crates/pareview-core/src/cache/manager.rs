use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{Instrument, KLine, ReviewRecord, TradeLog};

/// Cached lists go stale after an hour.
const CACHE_STALE_MINUTES: i64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.cached_at).num_minutes()
    }

    /// "just now", "5m ago", "2h ago", "3d ago". Hours and days round half up.
    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Includes negative ages from clock skew.
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60 + i64::from(minutes % 60 >= 30);
            format!("{}h ago", hours)
        } else {
            let days = minutes / 1440 + i64::from((minutes % 1440) / 60 >= 12);
            format!("{}d ago", days)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.age_minutes() > CACHE_STALE_MINUTES
    }
}

pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", name))
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(name);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", name))?;
        let cached: CachedData<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", name))?;
        Ok(Some(cached))
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let cached = CachedData::new(data);
        let contents = serde_json::to_string_pretty(&cached)?;
        std::fs::write(self.cache_path(name), contents)
            .with_context(|| format!("Failed to write cache file: {}", name))?;
        debug!(cache = name, "Cache updated");
        Ok(())
    }

    // ===== Instruments =====

    pub fn load_instruments(&self) -> Result<Option<CachedData<Vec<Instrument>>>> {
        self.load("instruments")
    }

    pub fn save_instruments(&self, instruments: &[Instrument]) -> Result<()> {
        self.save("instruments", &instruments)
    }

    // ===== Reviews =====

    pub fn load_reviews(&self) -> Result<Option<CachedData<Vec<ReviewRecord>>>> {
        self.load("reviews")
    }

    pub fn save_reviews(&self, reviews: &[ReviewRecord]) -> Result<()> {
        self.save("reviews", &reviews)
    }

    // ===== Trades =====

    pub fn load_trades(&self) -> Result<Option<CachedData<Vec<TradeLog>>>> {
        self.load("trades")
    }

    pub fn save_trades(&self, trades: &[TradeLog]) -> Result<()> {
        self.save("trades", &trades)
    }

    // ===== K-lines per instrument =====

    pub fn load_klines(&self, instrument_id: i64) -> Result<Option<CachedData<Vec<KLine>>>> {
        self.load(&format!("klines_{}", instrument_id))
    }

    pub fn save_klines(&self, instrument_id: i64, bars: &[KLine]) -> Result<()> {
        self.save(&format!("klines_{}", instrument_id), &bars)
    }

    /// Remove every cached file. Run on logout so the next user starts empty.
    pub fn clear(&self) -> Result<()> {
        let entries = match std::fs::read_dir(&self.cache_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e).context("Failed to read cache directory"),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Err(e) = std::fs::remove_file(&path) {
                    warn!(path = %path.display(), error = %e, "Failed to remove cache file");
                }
            }
        }
        debug!("Cache cleared");
        Ok(())
    }

    // ===== Cache Age Information =====

    fn load_age<T>(&self, name: &str, loader: impl FnOnce() -> Result<Option<CachedData<T>>>) -> Option<String> {
        match loader() {
            Ok(Some(cached)) => Some(cached.age_display()),
            Ok(None) => None,
            Err(e) => {
                debug!(cache = name, error = %e, "Failed to load cache for age display");
                None
            }
        }
    }

    pub fn get_cache_ages(&self) -> CacheAges {
        CacheAges {
            instruments: self.load_age("instruments", || self.load_instruments()),
            reviews: self.load_age("reviews", || self.load_reviews()),
            trades: self.load_age("trades", || self.load_trades()),
        }
    }

}

#[derive(Debug, Default)]
pub struct CacheAges {
    pub instruments: Option<String>,
    pub reviews: Option<String>,
    pub trades: Option<String>,
}

impl CacheAges {
    /// First known age, or "never".
    pub fn last_updated(&self) -> String {
        [&self.instruments, &self.reviews, &self.trades]
            .into_iter()
            .flatten()
            .next()
            .cloned()
            .unwrap_or_else(|| "never".to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn aged(minutes: i64) -> CachedData<Vec<i32>> {
        let mut cached = CachedData::new(vec![1]);
        cached.cached_at = Utc::now() - Duration::minutes(minutes);
        cached
    }

    fn instrument(id: i64) -> Instrument {
        serde_json::from_value(serde_json::json!({
            "id": id, "symbol": format!("S{}", id), "name": "Test", "market_type": "STOCK"
        }))
        .unwrap()
    }

    #[test]
    fn test_cached_data_age_display() {
        assert_eq!(CachedData::new(vec![1]).age_display(), "just now");
        assert_eq!(aged(5).age_display(), "5m ago");
        assert_eq!(aged(89).age_display(), "1h ago");
        assert_eq!(aged(90).age_display(), "2h ago");
        assert_eq!(aged(1440 + 11 * 60).age_display(), "1d ago");
        assert_eq!(aged(1440 + 12 * 60).age_display(), "2d ago");
        assert_eq!(aged(-5).age_display(), "just now");
    }

    #[test]
    fn test_cached_data_is_stale() {
        assert!(!CachedData::new(vec![1]).is_stale());
        assert!(aged(61).is_stale());
    }

    #[test]
    fn test_save_and_load_lists() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();

        assert!(cache.load_instruments().unwrap().is_none());
        assert_eq!(cache.get_cache_ages().last_updated(), "never");

        cache.save_instruments(&[instrument(1), instrument(2)]).unwrap();
        cache.save_reviews(&[]).unwrap();
        cache.save_trades(&[]).unwrap();

        let loaded = cache.load_instruments().unwrap().unwrap();
        assert_eq!(loaded.data.len(), 2);
        assert_eq!(loaded.data[1].symbol, "S2");
        assert!(!loaded.is_stale());
        assert_eq!(cache.get_cache_ages().last_updated(), "just now");
    }

    #[test]
    fn test_klines_cached_per_instrument() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        cache.save_klines(3, &[]).unwrap();
        assert!(cache.load_klines(3).unwrap().is_some());
        assert!(cache.load_klines(4).unwrap().is_none());
    }

    #[test]
    fn test_clear_removes_everything() {
        let dir = TempDir::new().unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        cache.save_instruments(&[instrument(1)]).unwrap();
        cache.save_klines(1, &[]).unwrap();

        cache.clear().unwrap();
        assert!(cache.load_instruments().unwrap().is_none());
        assert!(cache.load_klines(1).unwrap().is_none());
        assert_eq!(cache.get_cache_ages().last_updated(), "never");
    }

    #[test]
    fn test_corrupt_cache_reads_as_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("trades.json"), "garbage").unwrap();
        let cache = CacheManager::new(dir.path().to_path_buf()).unwrap();
        assert!(cache.load_trades().is_err());
        assert!(cache.get_cache_ages().trades.is_none());
    }
}
