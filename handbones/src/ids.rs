use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of logical bone slots in a hand skeleton.
pub const BONE_COUNT: usize = 21;

/// Number of fingers (including the thumb).
pub const FINGER_COUNT: usize = 5;

/// An identity drawn from a small, fixed, dense integer range `[0, COUNT)`.
///
/// Implementors must return `Some(id)` from [`FixedId::from_index`] for every index below `COUNT`
/// and guarantee `id.index() < COUNT`.
pub trait FixedId: Copy + Eq + Ord + fmt::Debug {
    const COUNT: usize;

    fn index(self) -> usize;

    fn from_index(index: usize) -> Option<Self>;

    fn name(self) -> &'static str;
}

/// One of the 21 logical bones of a hand.
///
/// Ids are assigned contiguously per finger (three rotating bones each), with the five fingertips
/// grouped at the end. Every bone's id is strictly greater than the ids of its logical ancestors.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum BoneId {
    WristRoot = 0,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    IndexFingerProximalPhalanx,
    IndexFingerMiddlePhalanx,
    IndexFingerDistalPhalanx,
    MiddleFingerProximalPhalanx,
    MiddleFingerMiddlePhalanx,
    MiddleFingerDistalPhalanx,
    RingFingerProximalPhalanx,
    RingFingerMiddlePhalanx,
    RingFingerDistalPhalanx,
    LittleFingerProximalPhalanx,
    LittleFingerMiddlePhalanx,
    LittleFingerDistalPhalanx,
    ThumbTip,
    IndexFingerTip,
    MiddleFingerTip,
    RingFingerTip,
    LittleFingerTip,
}

impl BoneId {
    pub const ALL: [BoneId; BONE_COUNT] = [
        BoneId::WristRoot,
        BoneId::ThumbMetacarpal,
        BoneId::ThumbProximal,
        BoneId::ThumbDistal,
        BoneId::IndexFingerProximalPhalanx,
        BoneId::IndexFingerMiddlePhalanx,
        BoneId::IndexFingerDistalPhalanx,
        BoneId::MiddleFingerProximalPhalanx,
        BoneId::MiddleFingerMiddlePhalanx,
        BoneId::MiddleFingerDistalPhalanx,
        BoneId::RingFingerProximalPhalanx,
        BoneId::RingFingerMiddlePhalanx,
        BoneId::RingFingerDistalPhalanx,
        BoneId::LittleFingerProximalPhalanx,
        BoneId::LittleFingerMiddlePhalanx,
        BoneId::LittleFingerDistalPhalanx,
        BoneId::ThumbTip,
        BoneId::IndexFingerTip,
        BoneId::MiddleFingerTip,
        BoneId::RingFingerTip,
        BoneId::LittleFingerTip,
    ];

    /// Id of the first fingertip; every id at or above it is a tip.
    pub(crate) const FIRST_TIP: usize = 16;
}

impl FixedId for BoneId {
    const COUNT: usize = BONE_COUNT;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn name(self) -> &'static str {
        match self {
            Self::WristRoot => "WristRoot",
            Self::ThumbMetacarpal => "ThumbMetacarpal",
            Self::ThumbProximal => "ThumbProximal",
            Self::ThumbDistal => "ThumbDistal",
            Self::IndexFingerProximalPhalanx => "IndexFingerProximalPhalanx",
            Self::IndexFingerMiddlePhalanx => "IndexFingerMiddlePhalanx",
            Self::IndexFingerDistalPhalanx => "IndexFingerDistalPhalanx",
            Self::MiddleFingerProximalPhalanx => "MiddleFingerProximalPhalanx",
            Self::MiddleFingerMiddlePhalanx => "MiddleFingerMiddlePhalanx",
            Self::MiddleFingerDistalPhalanx => "MiddleFingerDistalPhalanx",
            Self::RingFingerProximalPhalanx => "RingFingerProximalPhalanx",
            Self::RingFingerMiddlePhalanx => "RingFingerMiddlePhalanx",
            Self::RingFingerDistalPhalanx => "RingFingerDistalPhalanx",
            Self::LittleFingerProximalPhalanx => "LittleFingerProximalPhalanx",
            Self::LittleFingerMiddlePhalanx => "LittleFingerMiddlePhalanx",
            Self::LittleFingerDistalPhalanx => "LittleFingerDistalPhalanx",
            Self::ThumbTip => "ThumbTip",
            Self::IndexFingerTip => "IndexFingerTip",
            Self::MiddleFingerTip => "MiddleFingerTip",
            Self::RingFingerTip => "RingFingerTip",
            Self::LittleFingerTip => "LittleFingerTip",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum FingerId {
    Thumb = 0,
    Index,
    Middle,
    Ring,
    Little,
}

impl FingerId {
    pub const ALL: [FingerId; FINGER_COUNT] = [
        FingerId::Thumb,
        FingerId::Index,
        FingerId::Middle,
        FingerId::Ring,
        FingerId::Little,
    ];
}

impl FixedId for FingerId {
    const COUNT: usize = FINGER_COUNT;

    fn index(self) -> usize {
        self as usize
    }

    fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    fn name(self) -> &'static str {
        match self {
            Self::Thumb => "Thumb",
            Self::Index => "Index",
            Self::Middle => "Middle",
            Self::Ring => "Ring",
            Self::Little => "Little",
        }
    }
}

// Process-global and monotonically increasing so that a bone can tell which hierarchy it is
// bound to without holding a reference back into it.
static NEXT_HIERARCHY_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a [`crate::SkeletonHierarchy`] instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct HierarchyId(u64);

impl HierarchyId {
    pub(crate) fn next() -> Self {
        Self(NEXT_HIERARCHY_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HierarchyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
