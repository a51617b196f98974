use crate::components::SlotId;

/// A time-bounded opacity transition on one material slot.
#[derive(Debug, Clone)]
pub struct FadeJob {
    pub slot: SlotId,
    pub elapsed: f32,
    pub duration: f32,
}

/// Per-frame output of the fade system, applied by the caller to the
/// material registry.
#[derive(Debug, Clone, Copy)]
pub struct FadeUpdate {
    pub slot: SlotId,
    pub opacity: f32,
    pub completed: bool,
}

/// Explicit update list of in-flight fades, drained once per frame by the
/// main loop. At most one job exists per slot: starting a fade on a slot
/// supersedes any job already running on it.
pub struct FadeSystem {
    jobs: Vec<FadeJob>,
}

impl FadeSystem {
    pub fn new() -> Self {
        Self { jobs: Vec::new() }
    }

    /// Start a fade from 0 to 1 over `duration` seconds.
    pub fn start(&mut self, slot: SlotId, duration: f32) {
        self.jobs.retain(|job| job.slot != slot);
        self.jobs.push(FadeJob {
            slot,
            elapsed: 0.0,
            duration,
        });
    }

    /// Advance all fades. Opacity is monotonically non-decreasing within a
    /// job's lifetime; the update with `completed == true` is emitted
    /// exactly once, after which the job is removed.
    pub fn update(&mut self, dt: f32) -> Vec<FadeUpdate> {
        let mut updates = Vec::with_capacity(self.jobs.len());
        let mut completed_indices = Vec::new();

        for (i, job) in self.jobs.iter_mut().enumerate() {
            job.elapsed += dt;
            let progress = if job.duration <= 0.0 {
                1.0
            } else {
                (job.elapsed / job.duration).clamp(0.0, 1.0)
            };
            let completed = progress >= 1.0;
            updates.push(FadeUpdate {
                slot: job.slot,
                opacity: progress,
                completed,
            });
            if completed {
                completed_indices.push(i);
            }
        }

        // Remove completed jobs (in reverse to preserve indices)
        for &i in completed_indices.iter().rev() {
            self.jobs.swap_remove(i);
        }

        updates
    }

    pub fn active_count(&self) -> usize {
        self.jobs.len()
    }
}

impl Default for FadeSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fade_progress_and_completion() {
        let mut fades = FadeSystem::new();
        fades.start(SlotId(1), 0.5);

        let updates = fades.update(0.25);
        assert_eq!(updates.len(), 1);
        assert!((updates[0].opacity - 0.5).abs() < 1e-5);
        assert!(!updates[0].completed);
        assert_eq!(fades.active_count(), 1);

        let updates = fades.update(0.3);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].opacity, 1.0);
        assert!(updates[0].completed);
        assert_eq!(fades.active_count(), 0);
    }

    #[test]
    fn test_opacity_is_monotonic() {
        let mut fades = FadeSystem::new();
        fades.start(SlotId(7), 1.0);
        let mut last = 0.0;
        for _ in 0..20 {
            for update in fades.update(0.1) {
                assert!(update.opacity >= last);
                last = update.opacity;
            }
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn test_restart_supersedes_in_flight_job() {
        let mut fades = FadeSystem::new();
        fades.start(SlotId(2), 0.5);
        fades.update(0.4);

        // A new bind on the same slot replaces the old job outright.
        fades.start(SlotId(2), 0.5);
        assert_eq!(fades.active_count(), 1);
        let updates = fades.update(0.1);
        assert!((updates[0].opacity - 0.2).abs() < 1e-5);
        assert!(!updates[0].completed);
    }

    #[test]
    fn test_zero_duration_completes_immediately() {
        let mut fades = FadeSystem::new();
        fades.start(SlotId(3), 0.0);
        let updates = fades.update(0.016);
        assert_eq!(updates[0].opacity, 1.0);
        assert!(updates[0].completed);
        assert_eq!(fades.active_count(), 0);
    }

    #[test]
    fn test_independent_slots_run_concurrently() {
        let mut fades = FadeSystem::new();
        fades.start(SlotId(1), 0.5);
        fades.start(SlotId(2), 1.0);
        assert_eq!(fades.active_count(), 2);

        let updates = fades.update(0.5);
        assert_eq!(updates.len(), 2);
        assert_eq!(fades.active_count(), 1);
    }
}
