use super::pose_cache::PoseSource;
use crate::{
    AncestorMap, BONE_COUNT, BoneId, BoneTopology, Error, EventDispatcher, FixedId, FixedIdSet,
    HandEvent, HandEventListener, HierarchyId, Pose, SubscriptionHandle,
};
use glam::Vec3;

const HIERARCHY_ENTITY: &str = "skeleton hierarchy";

/// A bone entity that can be attached to at most one [`SkeletonHierarchy`] at a time.
#[derive(Clone, Debug)]
pub struct Bone {
    id: BoneId,
    owner: Option<HierarchyId>,
    /// Relative to the nearest present ancestor, or to world space for the root.
    bind_pose: Pose,
    world_pose: Pose,
    world_scale: Vec3,
    local_pose: Pose,
}

impl Bone {
    pub fn new(id: BoneId) -> Self {
        Self {
            id,
            owner: None,
            bind_pose: Pose::IDENTITY,
            world_pose: Pose::IDENTITY,
            world_scale: Vec3::ONE,
            local_pose: Pose::IDENTITY,
        }
    }

    pub fn with_bind_pose(id: BoneId, bind_pose: Pose) -> Result<Self, Error> {
        validate_rotation(id, bind_pose)?;
        let mut out = Self::new(id);
        out.bind_pose = bind_pose;
        out.local_pose = bind_pose;
        Ok(out)
    }

    pub fn id(&self) -> BoneId {
        self.id
    }

    /// The hierarchy this bone is attached to, if any.
    pub fn owner(&self) -> Option<HierarchyId> {
        self.owner
    }

    pub fn bind_pose(&self) -> Pose {
        self.bind_pose
    }

    /// Final world pose (scaled) from the last [`SkeletonHierarchy::apply_poses`].
    pub fn world_pose(&self) -> Pose {
        self.world_pose
    }

    pub fn world_scale(&self) -> Vec3 {
        self.world_scale
    }

    /// World pose expressed against the nearest present ancestor, with the ancestor's scale
    /// divided out.
    pub fn local_pose(&self) -> Pose {
        self.local_pose
    }

    pub fn is_owned_by(&self, owner: &dyn BoneOwner) -> bool {
        self.owner == Some(owner.owner_id())
    }
}

/// Structural queries on whatever currently owns a set of bones.
pub trait BoneOwner {
    fn owner_id(&self) -> HierarchyId;

    fn owns(&self, id: BoneId) -> bool;

    fn nearest_present_ancestor(&self, id: BoneId) -> Option<BoneId>;
}

fn validate_rotation(bone: BoneId, pose: Pose) -> Result<(), Error> {
    if pose.is_finite() && pose.has_unit_rotation() {
        Ok(())
    } else {
        Err(Error::InvalidRotation {
            bone,
            length: pose.rotation.length(),
        })
    }
}

/// Bind poses of the bones present in a hierarchy, in ascending id order.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindPoseSnapshot {
    pub bones: Vec<(BoneId, Pose)>,
}

/// A hand skeleton whose bones may be partially present.
///
/// The wrist root is always present until [`SkeletonHierarchy::teardown`]. For every one of the
/// 21 logical slots the hierarchy caches the nearest ancestor that is actually present, which may
/// skip several absent levels of the logical topology.
#[derive(Debug)]
pub struct SkeletonHierarchy {
    id: HierarchyId,
    bones: FixedIdSet<BoneId, Bone>,
    ancestors: AncestorMap,
    disposed: bool,
    events: EventDispatcher,
}

impl Default for SkeletonHierarchy {
    fn default() -> Self {
        Self::new()
    }
}

impl SkeletonHierarchy {
    /// A hierarchy holding only the wrist root, with an identity bind pose.
    pub fn new() -> Self {
        let id = HierarchyId::next();
        let mut root = Bone::new(BoneId::WristRoot);
        root.owner = Some(id);

        let mut bones = FixedIdSet::new();
        // A fresh set has every slot free.
        let _ = bones.add(BoneId::WristRoot, root);

        let mut ancestors = [Some(BoneId::WristRoot); BONE_COUNT];
        ancestors[BoneId::WristRoot.index()] = None;

        log::debug!("created skeleton hierarchy {id}");
        Self {
            id,
            bones,
            ancestors,
            disposed: false,
            events: EventDispatcher::new(),
        }
    }

    /// Rebuilds a hierarchy from bind poses saved with [`SkeletonHierarchy::bind_pose_snapshot`].
    pub fn from_snapshot(snapshot: &BindPoseSnapshot) -> Result<Self, Error> {
        let mut out = Self::new();
        for &(id, pose) in &snapshot.bones {
            if BoneTopology::is_root(id) {
                out.set_bind_pose(id, pose)?;
            } else {
                out.add_bone(Bone::with_bind_pose(id, pose)?)?;
            }
        }
        Ok(out)
    }

    pub fn id(&self) -> HierarchyId {
        self.id
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn contains(&self, id: BoneId) -> bool {
        self.bones.contains(id)
    }

    pub fn bone(&self, id: BoneId) -> Option<&Bone> {
        self.bones.get(id)
    }

    pub fn bones(&self) -> &FixedIdSet<BoneId, Bone> {
        &self.bones
    }

    /// Nearest present ancestor of any slot, present or not. `None` for the root.
    pub fn nearest_present_ancestor(&self, id: BoneId) -> Option<BoneId> {
        self.ancestors[id.index()]
    }

    pub fn nearest_present_ancestor_bone(&self, id: BoneId) -> Option<&Bone> {
        self.nearest_present_ancestor(id)
            .and_then(|ancestor| self.bones.get(ancestor))
    }

    /// Suitable for [`crate::PoseCache::set_ancestor_map`].
    pub fn ancestor_map(&self) -> &AncestorMap {
        &self.ancestors
    }

    pub fn subscribe<L: HandEventListener + 'static>(&mut self, listener: L) -> SubscriptionHandle {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        self.events.unsubscribe(handle)
    }

    fn ensure_live(&self) -> Result<(), Error> {
        if self.disposed {
            Err(Error::Disposed {
                entity: HIERARCHY_ENTITY,
            })
        } else {
            Ok(())
        }
    }

    fn resolve_present_ancestor(&self, id: BoneId) -> Option<BoneId> {
        BoneTopology::logical_ancestors(id).find(|&ancestor| self.bones.contains(ancestor))
    }

    /// Attaches `bone` and returns its ordinal among the present bones.
    pub fn add_bone(&mut self, mut bone: Bone) -> Result<usize, Error> {
        self.ensure_live()?;
        let id = bone.id;
        if let Some(owner) = bone.owner {
            return Err(Error::BoneBoundElsewhere { bone: id, owner });
        }
        if self.bones.contains(id) {
            return Err(Error::BoneAlreadyPresent {
                bone: id,
                hierarchy: self.id,
            });
        }

        bone.owner = Some(self.id);
        let ordinal = self.bones.add(id, bone)?;

        // Relies on every logical ancestor having a smaller id than its descendants: only slots
        // above `id` can now resolve to it.
        for &slot in &BoneId::ALL[id.index()..] {
            self.ancestors[slot.index()] = self.resolve_present_ancestor(slot);
        }

        log::debug!("hierarchy {}: added bone {id:?} at ordinal {ordinal}", self.id);
        self.events.emit(HandEvent::BoneAdded(id));
        Ok(ordinal)
    }

    /// Detaches the bone with `id` and hands it back unbound.
    pub fn remove_bone(&mut self, id: BoneId) -> Result<Bone, Error> {
        self.ensure_live()?;
        if BoneTopology::is_root(id) {
            return Err(Error::RootImmutable { hierarchy: self.id });
        }
        if !self.bones.contains(id) {
            return Err(Error::BoneNotPresent {
                bone: id,
                hierarchy: self.id,
            });
        }

        let mut bone = self.bones.remove(id)?;
        bone.owner = None;

        // Same id-order coupling as `add_bone`: only slots above `id` can have cached it, and
        // its own cached ancestor is already the nearest present one above it.
        let replacement = self.ancestors[id.index()];
        for ancestor in &mut self.ancestors[id.index() + 1..] {
            if *ancestor == Some(id) {
                *ancestor = replacement;
            }
        }

        log::debug!("hierarchy {}: removed bone {id:?}", self.id);
        self.events.emit(HandEvent::BoneRemoved(id));
        Ok(bone)
    }

    pub fn set_bind_pose(&mut self, id: BoneId, pose: Pose) -> Result<(), Error> {
        self.ensure_live()?;
        validate_rotation(id, pose)?;
        let hierarchy = self.id;
        let bone = self
            .bones
            .get_mut(id)
            .ok_or(Error::BoneNotPresent { bone: id, hierarchy })?;
        bone.bind_pose = pose;
        Ok(())
    }

    /// Recaptures the bind pose of `id` from its current world placement.
    pub fn reset_bind_pose(&mut self, id: BoneId) -> Result<(), Error> {
        self.ensure_live()?;
        let local = self.local_from_world(id).ok_or(Error::BoneNotPresent {
            bone: id,
            hierarchy: self.id,
        })?;
        validate_rotation(id, local)?;
        if let Some(bone) = self.bones.get_mut(id) {
            bone.bind_pose = local;
        }
        Ok(())
    }

    pub fn bind_pose_snapshot(&self) -> BindPoseSnapshot {
        BindPoseSnapshot {
            bones: self
                .bones
                .iter()
                .map(|(id, bone)| (id, bone.bind_pose))
                .collect(),
        }
    }

    /// Copies the final (scaled) world poses of `source` onto the present bones and updates
    /// their local poses against the nearest present ancestor.
    ///
    /// All writes to `source` for the current tick must have happened before this call.
    pub fn apply_poses(&mut self, source: &mut dyn PoseSource) -> Result<(), Error> {
        self.ensure_live()?;
        source.refresh();
        let scale = Vec3::splat(source.scale());
        let poses = *source.absolute_scaled_poses();

        for (id, bone) in self.bones.iter_mut() {
            bone.world_pose = poses[id.index()];
            bone.world_scale = scale;
        }

        let mut locals = [None; BONE_COUNT];
        for &id in self.bones.ids() {
            locals[id.index()] = self.local_from_world(id);
        }
        for (id, bone) in self.bones.iter_mut() {
            if let Some(local) = locals[id.index()] {
                bone.local_pose = local;
            }
        }
        Ok(())
    }

    fn local_from_world(&self, id: BoneId) -> Option<Pose> {
        let bone = self.bones.get(id)?;
        let Some(parent) = self.nearest_present_ancestor_bone(id) else {
            return Some(bone.world_pose);
        };

        let mut local = bone.world_pose.relative_to(parent.world_pose);
        if parent.world_scale.cmpne(Vec3::ZERO).all() {
            local.position /= parent.world_scale;
        }
        Some(local)
    }

    /// Detaches every bone, tips first, and disposes the hierarchy. Later mutations fail with
    /// [`Error::Disposed`]. Calling this again returns nothing.
    pub fn teardown(&mut self) -> Vec<Bone> {
        if self.disposed {
            return Vec::new();
        }

        let mut out = Vec::with_capacity(self.bones.len());
        for (id, mut bone) in self.bones.drain_descending() {
            bone.owner = None;
            self.events.emit(HandEvent::BoneRemoved(id));
            out.push(bone);
        }
        self.ancestors = [None; BONE_COUNT];
        self.disposed = true;
        log::debug!("tore down skeleton hierarchy {}", self.id);
        out
    }
}

impl BoneOwner for SkeletonHierarchy {
    fn owner_id(&self) -> HierarchyId {
        self.id
    }

    fn owns(&self, id: BoneId) -> bool {
        self.bones.contains(id)
    }

    fn nearest_present_ancestor(&self, id: BoneId) -> Option<BoneId> {
        SkeletonHierarchy::nearest_present_ancestor(self, id)
    }
}
