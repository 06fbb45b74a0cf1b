use sysinfo::{
    CpuRefreshKind, MemoryRefreshKind, Pid, ProcessRefreshKind, ProcessesToUpdate, RefreshKind,
    System,
};

use super::SamplingError;
use super::sample::{HostSnapshot, ProcessSnapshot};

/// OS introspection for the host and the current process.
pub struct HostProbe {
    sys: System,
    pid: Option<Pid>,
}

impl HostProbe {
    pub fn new() -> Self {
        let refresh = RefreshKind::nothing()
            .with_cpu(CpuRefreshKind::nothing().with_cpu_usage())
            .with_memory(MemoryRefreshKind::nothing().with_ram());
        let mut sys = System::new_with_specifics(refresh);

        let pid = sysinfo::get_current_pid()
            .inspect_err(|err| tracing::warn!(%err, "current pid unavailable"))
            .ok();

        // Baseline for the first CPU delta.
        sys.refresh_cpu_usage();
        if let Some(pid) = pid {
            sys.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::nothing().with_memory().with_cpu(),
            );
        }

        Self { sys, pid }
    }

    pub fn host(&mut self) -> HostSnapshot {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory_specifics(MemoryRefreshKind::nothing().with_ram());

        let mem_total_bytes = self.sys.total_memory();
        let mem_used_bytes = self.sys.used_memory();
        let mem_used_percent = if mem_total_bytes == 0 {
            0.0
        } else {
            mem_used_bytes as f64 / mem_total_bytes as f64 * 100.0
        };

        HostSnapshot {
            cpu_usage_percent: f64::from(self.sys.global_cpu_usage()).clamp(0.0, 100.0),
            cpu_core_count: self.sys.cpus().len(),
            mem_total_bytes,
            mem_used_bytes,
            mem_used_percent,
            load_average_1m: System::load_average().one,
        }
    }

    pub fn process(&mut self) -> Result<ProcessSnapshot, SamplingError> {
        let pid = self.pid.ok_or(SamplingError::ProcessUnavailable)?;
        self.sys.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::nothing().with_memory().with_cpu(),
        );

        let p = self
            .sys
            .process(pid)
            .ok_or(SamplingError::ProcessUnavailable)?;
        Ok(ProcessSnapshot {
            rss_bytes: p.memory(),
            virtual_bytes: p.virtual_memory(),
            cpu_usage_percent: f64::from(p.cpu_usage()),
        })
    }
}

impl Default for HostProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn host_snapshot_is_sane() {
        let mut probe = HostProbe::new();
        let host = probe.host();
        assert!(host.cpu_core_count >= 1);
        assert!((0.0..=100.0).contains(&host.cpu_usage_percent));
        assert!(host.mem_used_bytes <= host.mem_total_bytes);
        assert!((0.0..=100.0).contains(&host.mem_used_percent));
    }

    #[test]
    fn own_process_is_visible() {
        let mut probe = HostProbe::new();
        let p = probe.process().unwrap();
        assert!(p.rss_bytes > 0);
    }
}
