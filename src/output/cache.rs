// cache.rs - LZ4-compressed JSON cache of parsed and rescored results

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;

use crate::data::SearchResultCollection;
use crate::error::{Result, SearchError};

/// Bumped whenever the serialized layout changes
pub const CACHE_FORMAT_VERSION: u32 = 1;

fn timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Provenance stored next to the cached results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub version: String,
    pub created: String,
    pub last_modified: String,
    pub engine: Option<String>,
    pub matrix: Option<String>,
    pub user_note: Option<String>,
    pub total_results: usize,
    pub unique_queries: usize,
    pub format_version: u32,
}

/// On-disk cache: the full collection (links included) plus metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultCache {
    pub results: SearchResultCollection,
    pub metadata: CacheMetadata,
}

impl ResultCache {
    pub fn new(
        results: SearchResultCollection,
        engine: Option<String>,
        matrix: Option<String>,
        user_note: Option<String>,
    ) -> Self {
        let now = timestamp();
        let metadata = CacheMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            created: now.clone(),
            last_modified: now,
            engine,
            matrix,
            user_note,
            total_results: 0,
            unique_queries: 0,
            format_version: CACHE_FORMAT_VERSION,
        };
        let mut cache = Self { results, metadata };
        cache.refresh_counts();
        cache
    }

    fn refresh_counts(&mut self) {
        let queries: HashSet<&str> = self.results.iter().map(|r| r.query_name.as_str()).collect();
        self.metadata.unique_queries = queries.len();
        self.metadata.total_results = self.results.len();
    }

    /// Replace the results, keeping `created` and refreshing `last_modified`
    pub fn update(&mut self, results: SearchResultCollection) {
        self.results = results;
        self.metadata.last_modified = timestamp();
        self.refresh_counts();
    }
}

/// Serialize, compress and write the cache
pub fn save_cache(cache_path: &str, cache: &ResultCache) -> Result<()> {
    println!("💾 Saving cache to {}...", cache_path);
    let start = Instant::now();

    let cache_data =
        serde_json::to_vec(cache).map_err(|e| SearchError::Serialization(format!("result cache: {}", e)))?;
    let compressed = lz4_flex::compress_prepend_size(&cache_data);
    std::fs::write(cache_path, &compressed).map_err(|e| SearchError::io(cache_path, e))?;

    println!(
        "✅ Cache saved in {:.2}s ({} results, {} KB)",
        start.elapsed().as_secs_f64(),
        cache.metadata.total_results,
        compressed.len() / 1024
    );
    if let Some(note) = &cache.metadata.user_note {
        println!("📝 User note: {}", note);
    }
    Ok(())
}

/// Read, decompress and decode a cache written by [`save_cache`]
pub fn load_cache(cache_path: &str) -> Result<ResultCache> {
    println!("📂 Loading cache from {}...", cache_path);
    let start = Instant::now();

    let compressed = std::fs::read(cache_path).map_err(|e| SearchError::io(cache_path, e))?;
    let decompressed = lz4_flex::decompress_size_prepended(&compressed).map_err(|e| SearchError::Cache {
        path: cache_path.to_string(),
        message: format!("failed to decompress: {}", e),
    })?;
    let cache: ResultCache = serde_json::from_slice(&decompressed).map_err(|e| SearchError::Cache {
        path: cache_path.to_string(),
        message: format!("failed to decode: {}", e),
    })?;

    cache.results.validate_links().map_err(|e| SearchError::Cache {
        path: cache_path.to_string(),
        message: e.to_string(),
    })?;

    if cache.metadata.format_version > CACHE_FORMAT_VERSION {
        return Err(SearchError::Cache {
            path: cache_path.to_string(),
            message: format!(
                "format version {} is newer than supported version {}",
                cache.metadata.format_version, CACHE_FORMAT_VERSION
            ),
        });
    }

    println!(
        "✅ Cache loaded in {:.2}s ({} results, created {})",
        start.elapsed().as_secs_f64(),
        cache.results.len(),
        cache.metadata.created
    );
    Ok(cache)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::tests::sample_record;

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("rmsearch-{}-{}.lz4", name, std::process::id()))
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn test_cache_round_trip() {
        let mut second = sample_record();
        second.query_name = "chr2".to_string();
        let mut results = SearchResultCollection::from(vec![sample_record(), second]);
        results.link(0, 1).unwrap();

        let cache = ResultCache::new(
            results,
            Some("crossmatch".to_string()),
            Some("14p41g.matrix".to_string()),
            Some("unit test".to_string()),
        );
        assert_eq!(cache.metadata.total_results, 2);
        assert_eq!(cache.metadata.unique_queries, 2);

        let path = temp_path("roundtrip");
        save_cache(&path, &cache).unwrap();
        let loaded = load_cache(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(loaded.metadata, cache.metadata);
        for (restored, original) in loaded.results.iter().zip(cache.results.iter()) {
            assert_eq!(restored.query_name, original.query_name);
            assert_eq!(restored.query_string, original.query_string);
            assert_eq!(restored.subject_string, original.subject_string);
            assert_eq!((restored.subject_start, restored.subject_end), (original.subject_start, original.subject_end));
            assert!((restored.pct_diverge - original.pct_diverge).abs() < 1e-9);
        }
        assert_eq!(loaded.results.chain_from(0).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_update_keeps_created() {
        let mut cache = ResultCache::new(SearchResultCollection::new(), None, None, None);
        let created = cache.metadata.created.clone();
        cache.update(SearchResultCollection::from(vec![sample_record()]));
        assert_eq!(cache.metadata.created, created);
        assert_eq!(cache.metadata.total_results, 1);
    }

    #[test]
    fn test_rejects_garbage_and_newer_versions() {
        let path = temp_path("garbage");
        std::fs::write(&path, lz4_flex::compress_prepend_size(b"not a cache")).unwrap();
        assert!(matches!(load_cache(&path), Err(SearchError::Cache { .. })));

        let mut cache = ResultCache::new(SearchResultCollection::new(), None, None, None);
        cache.metadata.format_version = CACHE_FORMAT_VERSION + 1;
        save_cache(&path, &cache).unwrap();
        assert!(matches!(load_cache(&path), Err(SearchError::Cache { .. })));
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(load_cache(&temp_path("missing")), Err(SearchError::Io { .. })));
    }

    #[test]
    fn test_rejects_truncated_link_table() {
        let mut results = SearchResultCollection::from(vec![sample_record(), sample_record()]);
        results.link(0, 1).unwrap();
        let cache = ResultCache::new(results, None, None, None);

        let mut value = serde_json::to_value(&cache).unwrap();
        value["results"]["links"].as_array_mut().unwrap().pop();
        let path = temp_path("links");
        std::fs::write(&path, lz4_flex::compress_prepend_size(&serde_json::to_vec(&value).unwrap())).unwrap();

        let err = load_cache(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, SearchError::Cache { .. }));
        assert!(err.to_string().contains("link table"));
    }
}
