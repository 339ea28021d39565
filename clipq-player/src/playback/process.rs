//! Best-effort process sweep
//!
//! Kills every process whose name contains a fragment, plus all of its
//! descendants. Name matching is imprecise by nature: an unrelated process
//! with the same name fragment is also terminated.

use std::collections::{HashMap, HashSet};
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{debug, info};

/// Guards against parent cycles in a racy process snapshot
const MAX_ANCESTRY_DEPTH: usize = 64;

/// Minimal process-table row used to pick kill targets
#[derive(Debug, Clone)]
pub struct ProcessEntry {
    pub pid: u32,
    pub parent: Option<u32>,
    pub name: String,
}

/// Choose which PIDs to kill, deepest descendants first
///
/// A process is targeted when its own name or any ancestor's name contains
/// `fragment` (case-insensitive). `exclude` (our own PID) is never targeted.
pub fn select_targets(entries: &[ProcessEntry], fragment: &str, exclude: Option<u32>) -> Vec<u32> {
    let needle = fragment.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let parents: HashMap<u32, Option<u32>> = entries.iter().map(|e| (e.pid, e.parent)).collect();
    let roots: HashSet<u32> = entries
        .iter()
        .filter(|e| e.name.to_lowercase().contains(&needle))
        .map(|e| e.pid)
        .collect();

    let mut targets: Vec<(usize, u32)> = entries
        .iter()
        .filter(|e| Some(e.pid) != exclude)
        .filter_map(|e| {
            // Depth from the nearest matching ancestor (0 = matched itself)
            let mut current = Some(e.pid);
            for depth in 0..MAX_ANCESTRY_DEPTH {
                let pid = current?;
                if roots.contains(&pid) {
                    return Some((depth, e.pid));
                }
                current = parents.get(&pid).copied().flatten();
            }
            None
        })
        .collect();

    targets.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    targets.into_iter().map(|(_, pid)| pid).collect()
}

/// Kill every process matching `fragment` and its descendants
///
/// Blocking; call from `spawn_blocking`. Returns how many kills succeeded.
pub fn terminate_matching(fragment: &str) -> usize {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let entries: Vec<ProcessEntry> = sys
        .processes()
        .iter()
        .map(|(pid, process)| ProcessEntry {
            pid: pid.as_u32(),
            parent: process.parent().map(|p| p.as_u32()),
            name: process.name().to_string_lossy().into_owned(),
        })
        .collect();

    let own_pid = sysinfo::get_current_pid().ok().map(|p| p.as_u32());
    let targets = select_targets(&entries, fragment, own_pid);

    let mut killed = 0;
    for pid in &targets {
        if let Some(process) = sys.process(Pid::from_u32(*pid)) {
            if process.kill() {
                killed += 1;
            } else {
                // Already gone (exited with its parent) or not ours to kill
                debug!("Could not kill process {}", pid);
            }
        }
    }

    if killed > 0 {
        info!("Process sweep '{}': killed {} of {} targets", fragment, killed, targets.len());
    }
    killed
}
