//! Host system snapshot exported alongside a collection.
//!
//! Captures CPU, memory, disk and process facts into one structured record
//! written as JSON under the target root. Failure here is never fatal to the
//! owning job.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use sysinfo::{CpuExt, DiskExt, PidExt, ProcessExt, System, SystemExt};

use crate::constants::SYSTEM_INFO_FILE_NAME;
use crate::errors::{CollectorError, CollectorResult};

#[derive(Debug, Serialize, Deserialize)]
pub struct CpuSummary {
    pub count: usize,
    pub brand: Option<String>,
    pub frequency_mhz: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MemorySummary {
    pub total_bytes: u64,
    pub used_bytes: u64,
    pub total_swap_bytes: u64,
    pub used_swap_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DiskSummary {
    pub name: String,
    pub mount_point: String,
    pub total_bytes: u64,
    pub available_bytes: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessSummary {
    pub pid: u32,
    pub name: String,
    pub exe: Option<String>,
    pub memory_bytes: u64,
    pub cpu_usage: f32,
}

/// Structured record of host facts at collection time.
#[derive(Debug, Serialize, Deserialize)]
pub struct SystemInfoReport {
    pub hostname: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub cpu: CpuSummary,
    pub memory: MemorySummary,
    pub disks: Vec<DiskSummary>,
    pub processes: Vec<ProcessSummary>,
    pub collected_at: String,
}

/// Gather the host snapshot.
pub fn collect() -> SystemInfoReport {
    debug!("Collecting system information");
    let mut system = System::new_all();
    system.refresh_all();

    let cpu = CpuSummary {
        count: system.cpus().len(),
        brand: system.cpus().first().map(|cpu| cpu.brand().to_string()),
        frequency_mhz: system.cpus().first().map_or(0, |cpu| cpu.frequency()),
    };

    let memory = MemorySummary {
        total_bytes: system.total_memory(),
        used_bytes: system.used_memory(),
        total_swap_bytes: system.total_swap(),
        used_swap_bytes: system.used_swap(),
    };

    let disks = system
        .disks()
        .iter()
        .map(|disk| DiskSummary {
            name: disk.name().to_string_lossy().to_string(),
            mount_point: disk.mount_point().to_string_lossy().to_string(),
            total_bytes: disk.total_space(),
            available_bytes: disk.available_space(),
        })
        .collect();

    let processes = system
        .processes()
        .iter()
        .map(|(pid, process)| ProcessSummary {
            pid: pid.as_u32(),
            name: process.name().to_string(),
            exe: Some(process.exe().to_string_lossy().to_string()).filter(|s| !s.is_empty()),
            memory_bytes: process.memory(),
            cpu_usage: process.cpu_usage(),
        })
        .collect();

    SystemInfoReport {
        hostname: system.host_name(),
        os_name: system.name(),
        os_version: system.os_version(),
        kernel_version: system.kernel_version(),
        cpu,
        memory,
        disks,
        processes,
        collected_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Collect and write the snapshot as JSON under `target_dir`, returning the
/// export path.
pub fn export(target_dir: &Path) -> CollectorResult<PathBuf> {
    let report = collect();
    let path = target_dir.join(SYSTEM_INFO_FILE_NAME);

    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| CollectorError::SystemInfo(format!("serialization failed: {e}")))?;

    fs::write(&path, json).map_err(|e| {
        CollectorError::SystemInfo(format!("failed to write {}: {e}", path.display()))
    })?;

    info!("System information written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn report_has_cpu_and_memory_facts() {
        let report = collect();
        assert!(report.cpu.count > 0);
        assert!(report.memory.total_bytes > 0);
    }

    #[test]
    fn export_writes_parseable_json() {
        let tmp = TempDir::new().unwrap();
        let path = export(tmp.path()).unwrap();
        assert!(path.ends_with(SYSTEM_INFO_FILE_NAME));

        let content = fs::read_to_string(&path).unwrap();
        let parsed: SystemInfoReport = serde_json::from_str(&content).unwrap();
        assert!(parsed.cpu.count > 0);
    }
}
