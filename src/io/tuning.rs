use crate::types::VerdResult;
use serde::{Deserialize, Serialize};

/// Environment-level performance hints for the raster engine.
///
/// These steer GDAL's block cache and worker threads per run; they affect
/// throughput only and never correctness. Unset fields leave the engine's
/// own defaults in place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TuningHints {
    /// Block cache budget in megabytes (GDAL_CACHEMAX)
    pub max_cache_mb: Option<usize>,
    /// Worker thread count for raster I/O (GDAL_NUM_THREADS)
    pub num_threads: Option<usize>,
}

impl TuningHints {
    /// Forward the hints to GDAL's process-wide configuration.
    pub fn apply(&self) -> VerdResult<()> {
        if let Some(cache_mb) = self.max_cache_mb {
            gdal::config::set_config_option("GDAL_CACHEMAX", &cache_mb.to_string())?;
            log::debug!("GDAL_CACHEMAX set to {} MB", cache_mb);
        }
        if let Some(threads) = self.num_threads {
            gdal::config::set_config_option("GDAL_NUM_THREADS", &threads.to_string())?;
            log::debug!("GDAL_NUM_THREADS set to {}", threads);
        }
        Ok(())
    }
}
