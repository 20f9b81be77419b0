//! CPU and memory share formulas.

#![allow(clippy::cast_precision_loss)]

use crate::domain::Ticks;

/// System busy ticks between two reads, never less than 1
pub fn system_delta(previous: Ticks, current: Ticks) -> u64 {
    current.saturating_since(previous).max(1)
}

/// Process busy ticks between two reads, 0 if the counter went backwards
pub fn process_delta(previous: Ticks, current: Ticks) -> u64 {
    current.saturating_since(previous)
}

/// Share of system busy time spent in one process. Not divided by core count.
pub fn cpu_percent(process_delta: u64, system_delta: u64) -> f64 {
    100.0 * process_delta as f64 / system_delta.max(1) as f64
}

/// Resident memory as a share of total memory
pub fn memory_percent(resident_kb: u64, total_kb: u64) -> f64 {
    100.0 * resident_kb as f64 / total_kb.max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_system_delta_floor() {
        assert_eq!(system_delta(Ticks(1000), Ticks(1400)), 400);
        assert_eq!(system_delta(Ticks(1000), Ticks(1000)), 1);
        assert_eq!(system_delta(Ticks(1000), Ticks(900)), 1);
    }

    #[test]
    fn test_cpu_percent() {
        let sys = system_delta(Ticks(1000), Ticks(1400));
        let proc = process_delta(Ticks(100), Ticks(140));
        assert!(close(cpu_percent(proc, sys), 10.0));
    }

    #[test]
    fn test_counter_reset_gives_zero() {
        assert_eq!(process_delta(Ticks(500), Ticks(20)), 0);
        assert!(close(cpu_percent(0, 400), 0.0));
    }

    #[test]
    fn test_memory_percent() {
        assert!(close(memory_percent(2048, 8192), 25.0));
        assert!(close(memory_percent(2048, 0), 204_800.0));
    }
}
