//! Save pipeline persisting a process to a snapshot directory

use super::{blob_file_name, SaveOptions, SaveStats, MEMORY_MAP_FILE, METADATA_FILE};
use crate::core::types::{MemoryError, MemoryResult};
use crate::process::{Process, ProcessInfo};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Persists the target's metadata, memory map and readable region contents.
///
/// Individual regions that cannot be read or written are counted and
/// skipped, never fatal; the save as a whole only fails if the backend is
/// unusable or the wall-clock watchdog fires. Blobs written before a
/// timeout are kept on disk.
pub fn save_process<P: Process>(
    process: &P,
    dir: &Path,
    options: &SaveOptions,
) -> MemoryResult<SaveStats> {
    fs::create_dir_all(dir)?;

    let info = ProcessInfo::new(
        process.pid()?,
        process.name().unwrap_or_else(|| "unknown".to_string()),
    );
    fs::write(
        dir.join(METADATA_FILE),
        serde_json::to_vec_pretty(&info)?,
    )?;

    process.update_memory_map()?;
    let regions = process.memory_map()?;
    fs::write(
        dir.join(MEMORY_MAP_FILE),
        serde_json::to_vec_pretty(&regions)?,
    )?;

    info!(pid = info.pid, regions = regions.len(), dir = %dir.display(), "saving snapshot");

    let started = Instant::now();
    let mut stats = SaveStats::default();

    for region in &regions {
        if started.elapsed() > options.timeout {
            warn!(elapsed = ?started.elapsed(), "save watchdog fired");
            return Err(MemoryError::Timeout(options.timeout));
        }

        if !region.is_readable() {
            stats.skipped_non_readable += 1;
            continue;
        }
        if !options.include_large && region.size > options.max_region_size {
            debug!(region = %region, "skipping oversized region");
            stats.skipped_too_large += 1;
            continue;
        }

        let data = match process.read_bytes(region.start, region.size) {
            Ok(data) => data,
            Err(err) => {
                debug!(region = %region, %err, "region read failed");
                stats.read_error += 1;
                continue;
            }
        };

        let path = dir.join(blob_file_name(region.start, region.size));
        if let Err(err) = fs::write(&path, &data) {
            warn!(path = %path.display(), %err, "blob write failed");
            stats.write_error += 1;
            continue;
        }
        stats.saved += 1;
    }

    info!(%stats, "snapshot saved");
    Ok(stats)
}
