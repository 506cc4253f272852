use crate::{
    AncestorMap, BONE_COUNT, BoneId, BoneTopology, Error, EventDispatcher, FingerId, FixedId,
    HandEvent, HandEventListener, Pose, SubscriptionHandle,
};

pub type PoseArray = [Pose; BONE_COUNT];

/// Read side of a pose provider.
///
/// Getters take `&mut self` because derived representations are computed lazily on first read.
pub trait PoseSource {
    /// Uniform hand scale as of the last write (or refresh, for derived sources).
    fn scale(&self) -> f32;

    /// Each bone's pose in its ancestor's local frame; the root's is in world space.
    fn relative_poses(&mut self) -> &PoseArray;

    /// Each bone's pose in world space, unscaled.
    fn absolute_poses(&mut self) -> &PoseArray;

    /// Absolute poses with positions scaled about the root by [`PoseSource::scale`].
    fn absolute_scaled_poses(&mut self) -> &PoseArray;

    /// The ancestor each relative pose is expressed against.
    fn ancestor_map(&self) -> &AncestorMap;

    fn subscribe(&mut self, listener: Box<dyn HandEventListener>) -> SubscriptionHandle;

    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool;

    /// Brings derived sources up to date with their inputs. Plain caches have nothing to do.
    fn refresh(&mut self) {}
}

/// Write side of a pose provider.
pub trait PoseSink {
    fn set_relative_poses(&mut self, poses: &[Pose]) -> Result<bool, Error>;

    fn set_absolute_poses(&mut self, poses: &[Pose]) -> Result<bool, Error>;

    fn set_scale(&mut self, scale: f32);
}

/// Number of times each representation has been derived from another one.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PoseCacheStats {
    pub relative_recomputes: u64,
    pub absolute_recomputes: u64,
    pub scaled_recomputes: u64,
}

/// Holds hand poses in three representations and keeps them coherent.
///
/// Whichever of relative/absolute was written last is authoritative; the others are marked dirty
/// and derived on the next read. Scaling only ever dirties the scaled representation.
#[derive(Debug)]
pub struct PoseCache {
    relative: PoseArray,
    absolute: PoseArray,
    absolute_scaled: PoseArray,
    relative_dirty: bool,
    absolute_dirty: bool,
    scaled_dirty: bool,
    scale: f32,
    ancestors: AncestorMap,
    stats: PoseCacheStats,
    events: EventDispatcher,
}

impl Default for PoseCache {
    fn default() -> Self {
        Self::new()
    }
}

fn as_pose_array(poses: &[Pose]) -> Result<&PoseArray, Error> {
    poses.try_into().map_err(|_| Error::ArityMismatch {
        expected: BONE_COUNT,
        actual: poses.len(),
    })
}

/// Root first, then each finger from the hand outwards. Every ancestor accepted by
/// [`PoseCache::set_ancestor_map`] is visited before its descendants.
fn traversal_order() -> impl Iterator<Item = BoneId> {
    let topology = BoneTopology::get();
    std::iter::once(BoneId::WristRoot).chain(
        FingerId::ALL
            .into_iter()
            .flat_map(move |finger| topology.finger_bones(finger)),
    )
}

impl PoseCache {
    /// A cache holding the identity pose for every bone at scale 1, using the complete logical
    /// topology as its ancestor map.
    pub fn new() -> Self {
        Self {
            relative: [Pose::IDENTITY; BONE_COUNT],
            absolute: [Pose::IDENTITY; BONE_COUNT],
            absolute_scaled: [Pose::IDENTITY; BONE_COUNT],
            relative_dirty: false,
            absolute_dirty: false,
            scaled_dirty: false,
            scale: 1.0,
            ancestors: BoneTopology::logical_ancestor_map(),
            stats: PoseCacheStats::default(),
            events: EventDispatcher::new(),
        }
    }

    pub fn with_ancestor_map(ancestors: AncestorMap) -> Result<Self, Error> {
        let mut out = Self::new();
        out.set_ancestor_map(ancestors)?;
        Ok(out)
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn stats(&self) -> PoseCacheStats {
        self.stats
    }

    pub fn is_relative_dirty(&self) -> bool {
        self.relative_dirty
    }

    pub fn is_absolute_dirty(&self) -> bool {
        self.absolute_dirty
    }

    pub fn is_scaled_dirty(&self) -> bool {
        self.scaled_dirty
    }

    pub fn ancestor_map(&self) -> &AncestorMap {
        &self.ancestors
    }

    /// Overwrites the relative poses. Returns `false` (and leaves every flag untouched) when the
    /// up-to-date relative poses already equal `poses`.
    pub fn set_relative_poses(&mut self, poses: &[Pose]) -> Result<bool, Error> {
        let poses = as_pose_array(poses)?;
        Ok(self.write_relative(poses))
    }

    /// Overwrites the absolute poses. Returns `false` (and leaves every flag untouched) when the
    /// up-to-date absolute poses already equal `poses`.
    pub fn set_absolute_poses(&mut self, poses: &[Pose]) -> Result<bool, Error> {
        let poses = as_pose_array(poses)?;
        let changed = self.absolute_dirty || self.absolute != *poses;
        if !changed {
            return Ok(false);
        }

        self.absolute = *poses;
        self.absolute_dirty = false;
        self.relative_dirty = true;
        self.scaled_dirty = true;
        self.events.emit(HandEvent::PoseDataUpdated);
        Ok(true)
    }

    pub(crate) fn write_relative(&mut self, poses: &PoseArray) -> bool {
        let changed = self.relative_dirty || self.relative != *poses;
        if !changed {
            return false;
        }

        self.relative = *poses;
        self.relative_dirty = false;
        self.absolute_dirty = true;
        self.scaled_dirty = true;
        self.events.emit(HandEvent::PoseDataUpdated);
        true
    }

    /// Non-finite values are ignored.
    pub fn set_scale(&mut self, scale: f32) {
        if !scale.is_finite() {
            log::warn!("ignoring non-finite hand scale {scale}");
            return;
        }
        if scale != self.scale {
            self.scale = scale;
            self.scaled_dirty = true;
        }
    }

    /// Changes which bone each relative pose is expressed against.
    ///
    /// Every `Some` entry must be one of the slot's logical ancestors. Absolute poses are kept;
    /// relative poses are re-derived against the new map on the next read.
    pub fn set_ancestor_map(&mut self, ancestors: AncestorMap) -> Result<(), Error> {
        for bone in BoneId::ALL {
            if let Some(ancestor) = ancestors[bone.index()] {
                if !BoneTopology::logical_ancestors(bone).any(|a| a == ancestor) {
                    return Err(Error::NotAnAncestor { bone, ancestor });
                }
            }
        }
        self.replace_ancestor_map(ancestors);
        Ok(())
    }

    pub(crate) fn replace_ancestor_map(&mut self, ancestors: AncestorMap) {
        if ancestors == self.ancestors {
            return;
        }
        if self.absolute_dirty {
            self.derive_absolute(false);
        }
        self.ancestors = ancestors;
        self.relative_dirty = true;
        self.events.emit(HandEvent::PoseDataUpdated);
    }

    pub fn relative_poses(&mut self) -> &PoseArray {
        if self.relative_dirty {
            self.derive_relative();
        }
        &self.relative
    }

    pub fn absolute_poses(&mut self) -> &PoseArray {
        if self.absolute_dirty {
            self.derive_absolute(false);
        }
        &self.absolute
    }

    pub fn absolute_scaled_poses(&mut self) -> &PoseArray {
        if self.absolute_dirty {
            self.derive_absolute(true);
        } else if self.scaled_dirty {
            self.derive_scaled();
        }
        &self.absolute_scaled
    }

    pub fn subscribe<L: HandEventListener + 'static>(&mut self, listener: L) -> SubscriptionHandle {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        self.events.unsubscribe(handle)
    }

    pub fn listener_count(&self) -> usize {
        self.events.len()
    }

    fn parent_slot(&self, bone: BoneId) -> Option<BoneId> {
        match self.ancestors[bone.index()] {
            Some(ancestor) => Some(ancestor),
            None if BoneTopology::is_root(bone) => None,
            None => Some(BoneId::WristRoot),
        }
    }

    fn derive_relative(&mut self) {
        for bone in traversal_order() {
            let absolute = self.absolute[bone.index()];
            self.relative[bone.index()] = match self.parent_slot(bone) {
                Some(parent) => absolute.relative_to(self.absolute[parent.index()]),
                None => absolute,
            };
        }
        self.relative_dirty = false;
        self.stats.relative_recomputes += 1;
        log::trace!("derived relative poses from absolute poses");
    }

    fn derive_absolute(&mut self, with_scaled: bool) {
        let root = BoneId::WristRoot.index();
        let root_position = self.relative[root].position;

        for bone in traversal_order() {
            let relative = self.relative[bone.index()];
            let absolute = match self.parent_slot(bone) {
                Some(parent) => relative.compose(self.absolute[parent.index()]),
                None => relative,
            };
            self.absolute[bone.index()] = absolute;
            if with_scaled {
                self.absolute_scaled[bone.index()] =
                    scaled_about(absolute, root_position, self.scale);
            }
        }

        self.absolute_dirty = false;
        self.stats.absolute_recomputes += 1;
        if with_scaled {
            self.scaled_dirty = false;
            self.stats.scaled_recomputes += 1;
        }
        log::trace!("derived absolute poses from relative poses (scaled: {with_scaled})");
    }

    fn derive_scaled(&mut self) {
        let root_position = self.absolute[BoneId::WristRoot.index()].position;
        for (scaled, absolute) in self.absolute_scaled.iter_mut().zip(&self.absolute) {
            *scaled = scaled_about(*absolute, root_position, self.scale);
        }
        self.scaled_dirty = false;
        self.stats.scaled_recomputes += 1;
        log::trace!("derived scaled poses at scale {}", self.scale);
    }
}

fn scaled_about(pose: Pose, origin: glam::Vec3, scale: f32) -> Pose {
    Pose {
        position: origin + scale * (pose.position - origin),
        rotation: pose.rotation,
    }
}

impl PoseSource for PoseCache {
    fn scale(&self) -> f32 {
        PoseCache::scale(self)
    }

    fn relative_poses(&mut self) -> &PoseArray {
        PoseCache::relative_poses(self)
    }

    fn absolute_poses(&mut self) -> &PoseArray {
        PoseCache::absolute_poses(self)
    }

    fn absolute_scaled_poses(&mut self) -> &PoseArray {
        PoseCache::absolute_scaled_poses(self)
    }

    fn ancestor_map(&self) -> &AncestorMap {
        PoseCache::ancestor_map(self)
    }

    fn subscribe(&mut self, listener: Box<dyn HandEventListener>) -> SubscriptionHandle {
        self.events.subscribe_boxed(listener)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        PoseCache::unsubscribe(self, handle)
    }
}

impl PoseSink for PoseCache {
    fn set_relative_poses(&mut self, poses: &[Pose]) -> Result<bool, Error> {
        PoseCache::set_relative_poses(self, poses)
    }

    fn set_absolute_poses(&mut self, poses: &[Pose]) -> Result<bool, Error> {
        PoseCache::set_absolute_poses(self, poses)
    }

    fn set_scale(&mut self, scale: f32) {
        PoseCache::set_scale(self, scale)
    }
}
