use glam::{Quat, Vec3};

/// Maximum deviation of a rotation's length from 1.0 accepted where unit rotations are required.
pub const UNIT_ROTATION_TOLERANCE: f32 = 1.0e-4;

/// A rigid transform: position plus unit rotation.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub const fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Places `self`, expressed in `parent`'s local frame, into the frame `parent` lives in.
    pub fn compose(self, parent: Pose) -> Pose {
        Pose {
            position: parent.position + parent.rotation * self.position,
            rotation: parent.rotation * self.rotation,
        }
    }

    /// Expresses `self` in `parent`'s local frame. Inverse of [`Pose::compose`].
    pub fn relative_to(self, parent: Pose) -> Pose {
        let inverse = parent.rotation.inverse();
        Pose {
            position: inverse * (self.position - parent.position),
            rotation: inverse * self.rotation,
        }
    }

    pub fn inverse(self) -> Pose {
        Pose::IDENTITY.relative_to(self)
    }

    /// Linear interpolation of the position and spherical interpolation of the rotation.
    pub fn lerp(self, other: Pose, t: f32) -> Pose {
        Pose {
            position: self.position.lerp(other.position, t),
            rotation: self.rotation.slerp(other.rotation, t),
        }
    }

    /// Component-wise comparison; `q` and `-q` describe the same rotation and compare equal.
    pub fn abs_diff_eq(self, other: Pose, max_abs_diff: f32) -> bool {
        self.position.abs_diff_eq(other.position, max_abs_diff)
            && (self.rotation.abs_diff_eq(other.rotation, max_abs_diff)
                || self.rotation.abs_diff_eq(-other.rotation, max_abs_diff))
    }

    pub fn has_unit_rotation(self) -> bool {
        (self.rotation.length() - 1.0).abs() <= UNIT_ROTATION_TOLERANCE
    }

    pub fn is_finite(self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}
