//! Fixed parent/child relationships of the 21 logical hand bones.

use crate::{BONE_COUNT, BoneId, FINGER_COUNT, FingerId, FixedId};
use std::sync::OnceLock;

/// For every bone slot, the id of some other bone (or `None`).
///
/// Used both for the complete logical parent table and for the nearest *present* ancestor of
/// every slot in a partially populated skeleton.
pub type AncestorMap = [Option<BoneId>; BONE_COUNT];

const PARENTS: AncestorMap = {
    use BoneId::*;
    [
        None,
        Some(WristRoot),
        Some(ThumbMetacarpal),
        Some(ThumbProximal),
        Some(WristRoot),
        Some(IndexFingerProximalPhalanx),
        Some(IndexFingerMiddlePhalanx),
        Some(WristRoot),
        Some(MiddleFingerProximalPhalanx),
        Some(MiddleFingerMiddlePhalanx),
        Some(WristRoot),
        Some(RingFingerProximalPhalanx),
        Some(RingFingerMiddlePhalanx),
        Some(WristRoot),
        Some(LittleFingerProximalPhalanx),
        Some(LittleFingerMiddlePhalanx),
        Some(ThumbDistal),
        Some(IndexFingerDistalPhalanx),
        Some(MiddleFingerDistalPhalanx),
        Some(RingFingerDistalPhalanx),
        Some(LittleFingerDistalPhalanx),
    ]
};

/// Static bone topology tables. Obtain the shared instance with [`BoneTopology::get`].
#[derive(Debug)]
pub struct BoneTopology {
    children: [Vec<BoneId>; BONE_COUNT],
    rotating_children: [Vec<BoneId>; BONE_COUNT],
    fingers: [Option<FingerId>; BONE_COUNT],
    finger_bones: [[BoneId; 4]; FINGER_COUNT],
}

impl BoneTopology {
    pub fn get() -> &'static BoneTopology {
        static TOPOLOGY: OnceLock<BoneTopology> = OnceLock::new();
        TOPOLOGY.get_or_init(BoneTopology::build)
    }

    fn build() -> Self {
        let mut children: [Vec<BoneId>; BONE_COUNT] = Default::default();
        for bone in BoneId::ALL {
            if let Some(parent) = Self::parent_of(bone) {
                children[parent.index()].push(bone);
            }
        }

        let rotating_children = children.clone().map(|mut list| {
            list.retain(|&child| Self::is_rotating(child));
            list
        });

        let finger_bones = FingerId::ALL.map(|finger| {
            let base = finger.index() * 3;
            [
                BoneId::ALL[base + 1],
                BoneId::ALL[base + 2],
                BoneId::ALL[base + 3],
                BoneId::ALL[BoneId::FIRST_TIP + finger.index()],
            ]
        });

        let mut fingers = [None; BONE_COUNT];
        for (finger, bones) in FingerId::ALL.iter().zip(&finger_bones) {
            for bone in bones {
                fingers[bone.index()] = Some(*finger);
            }
        }

        Self {
            children,
            rotating_children,
            fingers,
            finger_bones,
        }
    }

    /// The logical parent, independent of which bones a skeleton actually instantiates.
    pub fn parent_of(bone: BoneId) -> Option<BoneId> {
        PARENTS[bone.index()]
    }

    pub fn logical_ancestor_map() -> AncestorMap {
        PARENTS
    }

    /// Walks the logical parent chain upwards, nearest ancestor first, ending at the wrist root.
    pub fn logical_ancestors(bone: BoneId) -> impl Iterator<Item = BoneId> {
        std::iter::successors(Self::parent_of(bone), |&parent| Self::parent_of(parent))
    }

    pub fn is_root(bone: BoneId) -> bool {
        bone == BoneId::WristRoot
    }

    /// Finger joints that articulate; excludes the root and the fingertips.
    pub fn is_rotating(bone: BoneId) -> bool {
        !Self::is_root(bone) && !Self::is_tip(bone)
    }

    pub fn is_tip(bone: BoneId) -> bool {
        bone.index() >= BoneId::FIRST_TIP
    }

    pub fn children_of(&self, bone: BoneId) -> &[BoneId] {
        &self.children[bone.index()]
    }

    pub fn rotating_children_of(&self, bone: BoneId) -> &[BoneId] {
        &self.rotating_children[bone.index()]
    }

    pub fn finger_of(&self, bone: BoneId) -> Option<FingerId> {
        self.fingers[bone.index()]
    }

    /// The bones of `finger`, ordered from the hand outwards to the tip.
    pub fn finger_bones(&self, finger: FingerId) -> [BoneId; 4] {
        self.finger_bones[finger.index()]
    }
}
