use crate::{BoneId, HierarchyId};
use thiserror::Error;

/// Coarse classification of [`Error`] values.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    /// Double-add, foreign-owned bone, removing the root or an absent id.
    StructuralViolation,
    /// A pose array did not contain exactly one pose per bone.
    ArityMismatch,
    /// A rotation was not unit length where one is required.
    InvalidRotation,
    /// The target was torn down.
    DisposedEntity,
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    #[error("slot '{id}' is already occupied")]
    SlotOccupied { id: &'static str },

    #[error("slot '{id}' is empty")]
    SlotEmpty { id: &'static str },

    #[error("bone {bone:?} is already present in hierarchy {hierarchy}")]
    BoneAlreadyPresent { bone: BoneId, hierarchy: HierarchyId },

    #[error("bone {bone:?} is already bound to hierarchy {owner}")]
    BoneBoundElsewhere { bone: BoneId, owner: HierarchyId },

    #[error("bone {bone:?} is not present in hierarchy {hierarchy}")]
    BoneNotPresent { bone: BoneId, hierarchy: HierarchyId },

    #[error("{ancestor:?} is not a logical ancestor of {bone:?}")]
    NotAnAncestor { bone: BoneId, ancestor: BoneId },

    #[error("the wrist root cannot be removed from hierarchy {hierarchy}")]
    RootImmutable { hierarchy: HierarchyId },

    #[error("expected {expected} poses, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("rotation for bone {bone:?} is not unit length (length {length})")]
    InvalidRotation { bone: BoneId, length: f32 },

    #[error("{entity} has been torn down")]
    Disposed { entity: &'static str },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SlotOccupied { .. }
            | Self::SlotEmpty { .. }
            | Self::BoneAlreadyPresent { .. }
            | Self::BoneBoundElsewhere { .. }
            | Self::BoneNotPresent { .. }
            | Self::NotAnAncestor { .. }
            | Self::RootImmutable { .. } => ErrorKind::StructuralViolation,
            Self::ArityMismatch { .. } => ErrorKind::ArityMismatch,
            Self::InvalidRotation { .. } => ErrorKind::InvalidRotation,
            Self::Disposed { .. } => ErrorKind::DisposedEntity,
        }
    }
}
