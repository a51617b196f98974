use glam::Vec3;

/// Pointer-lock state. Movement integration only happens while `Locked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Unlocked,
    Locked,
}

/// Snapshot of the held movement flags for one tick, built by the host
/// from its input state and handed to the controller.
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub sprint: bool,
}

/// First-person walk controller.
///
/// Computes a per-tick displacement from the held flags, the camera's
/// world-forward vector, and elapsed time. The displacement is applied to
/// the camera position by the caller without any collision gating; the
/// collision registry is a separate query surface (see `collision`).
pub struct WalkController {
    pub base_speed: f32,
    pub sprint_multiplier: f32,
    /// Unitless tuning constant folded into every step. Not a physical
    /// unit; exposed through configuration.
    pub move_scale: f32,
    lock: LockState,
}

impl WalkController {
    pub fn new(base_speed: f32, sprint_multiplier: f32, move_scale: f32) -> Self {
        Self {
            base_speed,
            sprint_multiplier,
            move_scale,
            lock: LockState::Unlocked,
        }
    }

    /// Set the pointer-lock state. Returns true if the state changed.
    pub fn set_locked(&mut self, locked: bool) -> bool {
        let next = if locked {
            LockState::Locked
        } else {
            LockState::Unlocked
        };
        let changed = next != self.lock;
        self.lock = next;
        changed
    }

    pub fn is_locked(&self) -> bool {
        self.lock == LockState::Locked
    }

    /// Compute the displacement for one tick.
    ///
    /// `camera_forward` is the camera's world-forward vector; its vertical
    /// component is discarded and the remainder renormalized so that
    /// looking up or down never changes walking speed. Looking straight
    /// along the vertical axis degenerates to zero displacement.
    pub fn update(&self, input: MoveInput, camera_forward: Vec3, dt: f32) -> Vec3 {
        if self.lock != LockState::Locked {
            return Vec3::ZERO;
        }

        let speed = if input.sprint {
            self.base_speed * self.sprint_multiplier
        } else {
            self.base_speed
        };

        let forward = Vec3::new(camera_forward.x, 0.0, camera_forward.z).normalize_or_zero();
        let right = Vec3::new(-forward.z, 0.0, forward.x);
        let step = speed * dt * self.move_scale;

        let mut displacement = Vec3::ZERO;
        if input.forward {
            displacement += forward * step;
        }
        if input.backward {
            displacement -= forward * step;
        }
        if input.left {
            displacement -= right * step;
        }
        if input.right {
            displacement += right * step;
        }
        displacement
    }
}
