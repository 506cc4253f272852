use crate::{
    BONE_COUNT, Bone, BoneId, BoneOwner, BoneTopology, Error, ErrorKind, FixedId, HandEvent,
    Pose, SkeletonHierarchy,
};
use glam::{Quat, Vec3};
use std::cell::RefCell;
use std::rc::Rc;

fn record_events(hierarchy: &mut SkeletonHierarchy) -> Rc<RefCell<Vec<HandEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    let listener_log = Rc::clone(&log);
    hierarchy.subscribe(move |event: &HandEvent| listener_log.borrow_mut().push(*event));
    log
}

fn expected_ancestor(present: &[bool; BONE_COUNT], bone: BoneId) -> Option<BoneId> {
    BoneTopology::logical_ancestors(bone).find(|a| present[a.index()])
}

fn assert_ancestors_match(hierarchy: &SkeletonHierarchy, present: &[bool; BONE_COUNT]) {
    for bone in BoneId::ALL {
        assert_eq!(
            hierarchy.nearest_present_ancestor(bone),
            expected_ancestor(present, bone),
            "slot {bone:?} with present set {present:?}"
        );
    }
}

fn present_from_mask(mask: u32) -> [bool; BONE_COUNT] {
    let mut present = [false; BONE_COUNT];
    present[0] = true;
    for (bit, slot) in present.iter_mut().skip(1).enumerate() {
        *slot = mask & (1 << bit) != 0;
    }
    present
}

#[test]
fn new_hierarchy_holds_only_the_root() {
    let hierarchy = SkeletonHierarchy::new();
    assert_eq!(hierarchy.len(), 1);
    assert!(hierarchy.contains(BoneId::WristRoot));
    assert_eq!(
        hierarchy.bone(BoneId::WristRoot).and_then(Bone::owner),
        Some(hierarchy.id())
    );
    assert_eq!(hierarchy.nearest_present_ancestor(BoneId::WristRoot), None);
    for bone in BoneId::ALL.into_iter().skip(1) {
        assert_eq!(
            hierarchy.nearest_present_ancestor(bone),
            Some(BoneId::WristRoot)
        );
    }
}

#[test]
fn thumb_tip_ancestor_tracks_added_thumb_bones() {
    let mut hierarchy = SkeletonHierarchy::new();
    assert_eq!(
        hierarchy.nearest_present_ancestor(BoneId::ThumbTip),
        Some(BoneId::WristRoot)
    );

    hierarchy.add_bone(Bone::new(BoneId::ThumbProximal)).unwrap();
    assert_eq!(
        hierarchy.nearest_present_ancestor(BoneId::ThumbTip),
        Some(BoneId::ThumbProximal)
    );
    assert_eq!(
        hierarchy.nearest_present_ancestor(BoneId::ThumbDistal),
        Some(BoneId::ThumbProximal)
    );

    hierarchy.add_bone(Bone::new(BoneId::ThumbDistal)).unwrap();
    assert_eq!(
        hierarchy.nearest_present_ancestor(BoneId::ThumbTip),
        Some(BoneId::ThumbDistal)
    );
    assert_eq!(
        hierarchy
            .nearest_present_ancestor_bone(BoneId::ThumbTip)
            .map(Bone::id),
        Some(BoneId::ThumbDistal)
    );
}

#[test]
fn removing_a_mid_chain_bone_relinks_descendants() {
    let mut hierarchy = SkeletonHierarchy::new();
    for id in [
        BoneId::IndexFingerProximalPhalanx,
        BoneId::IndexFingerMiddlePhalanx,
        BoneId::IndexFingerDistalPhalanx,
    ] {
        hierarchy.add_bone(Bone::new(id)).unwrap();
    }

    hierarchy
        .remove_bone(BoneId::IndexFingerMiddlePhalanx)
        .unwrap();
    assert_eq!(
        hierarchy.nearest_present_ancestor(BoneId::IndexFingerDistalPhalanx),
        Some(BoneId::IndexFingerProximalPhalanx)
    );
    assert_eq!(
        hierarchy.nearest_present_ancestor(BoneId::IndexFingerTip),
        Some(BoneId::IndexFingerDistalPhalanx)
    );

    hierarchy
        .remove_bone(BoneId::IndexFingerProximalPhalanx)
        .unwrap();
    assert_eq!(
        hierarchy.nearest_present_ancestor(BoneId::IndexFingerDistalPhalanx),
        Some(BoneId::WristRoot)
    );
    assert_eq!(
        hierarchy.nearest_present_ancestor(BoneId::IndexFingerMiddlePhalanx),
        Some(BoneId::WristRoot)
    );
}

#[test]
fn nearest_ancestor_matches_subsets_added_in_any_order() {
    for mask in (0..1u32 << 20).step_by(997).chain((0..20).map(|bit| 1 << bit)) {
        let present = present_from_mask(mask);
        let members = BoneId::ALL
            .into_iter()
            .skip(1)
            .filter(|b| present[b.index()])
            .collect::<Vec<_>>();

        let mut ascending = SkeletonHierarchy::new();
        for &id in &members {
            ascending.add_bone(Bone::new(id)).unwrap();
        }
        assert_ancestors_match(&ascending, &present);

        let mut descending = SkeletonHierarchy::new();
        for &id in members.iter().rev() {
            descending.add_bone(Bone::new(id)).unwrap();
        }
        assert_ancestors_match(&descending, &present);
        assert_eq!(descending.bones().ids(), ascending.bones().ids());
    }
}

#[test]
fn nearest_ancestor_matches_subsets_reached_by_removal() {
    for mask in (0..1u32 << 20).step_by(1009) {
        let present = present_from_mask(mask);
        let mut hierarchy = SkeletonHierarchy::new();
        for id in BoneId::ALL.into_iter().skip(1) {
            hierarchy.add_bone(Bone::new(id)).unwrap();
        }

        // Interleave removals from both ends of the id range.
        let mut absent = BoneId::ALL
            .into_iter()
            .filter(|b| !present[b.index()])
            .collect::<Vec<_>>();
        while !absent.is_empty() {
            let id = if absent.len() % 2 == 0 {
                absent.remove(0)
            } else {
                absent.pop().unwrap()
            };
            hierarchy.remove_bone(id).unwrap();
        }
        assert_ancestors_match(&hierarchy, &present);
    }
}

#[test]
fn add_returns_ordinal_and_emits_event() {
    let mut hierarchy = SkeletonHierarchy::new();
    let events = record_events(&mut hierarchy);

    assert_eq!(hierarchy.add_bone(Bone::new(BoneId::RingFingerTip)).unwrap(), 1);
    assert_eq!(hierarchy.add_bone(Bone::new(BoneId::ThumbDistal)).unwrap(), 1);
    let removed = hierarchy.remove_bone(BoneId::RingFingerTip).unwrap();

    assert_eq!(removed.id(), BoneId::RingFingerTip);
    assert_eq!(removed.owner(), None);
    assert_eq!(
        *events.borrow(),
        vec![
            HandEvent::BoneAdded(BoneId::RingFingerTip),
            HandEvent::BoneAdded(BoneId::ThumbDistal),
            HandEvent::BoneRemoved(BoneId::RingFingerTip),
        ]
    );
}

#[test]
fn structural_violations_fail_atomically() {
    let mut hierarchy = SkeletonHierarchy::new();
    hierarchy
        .add_bone(Bone::new(BoneId::MiddleFingerMiddlePhalanx))
        .unwrap();
    let events = record_events(&mut hierarchy);
    let ancestors = *hierarchy.ancestor_map();
    let ids = hierarchy.bones().ids().to_vec();

    let err = hierarchy
        .add_bone(Bone::new(BoneId::MiddleFingerMiddlePhalanx))
        .unwrap_err();
    assert_eq!(
        err,
        Error::BoneAlreadyPresent {
            bone: BoneId::MiddleFingerMiddlePhalanx,
            hierarchy: hierarchy.id(),
        }
    );

    let err = hierarchy.remove_bone(BoneId::WristRoot).unwrap_err();
    assert_eq!(
        err,
        Error::RootImmutable {
            hierarchy: hierarchy.id()
        }
    );

    let err = hierarchy.remove_bone(BoneId::LittleFingerTip).unwrap_err();
    assert!(matches!(
        err,
        Error::BoneNotPresent {
            bone: BoneId::LittleFingerTip,
            ..
        }
    ));

    for err in [
        Error::RootImmutable {
            hierarchy: hierarchy.id(),
        },
        Error::BoneNotPresent {
            bone: BoneId::LittleFingerTip,
            hierarchy: hierarchy.id(),
        },
    ] {
        assert_eq!(err.kind(), ErrorKind::StructuralViolation);
    }

    assert_eq!(*hierarchy.ancestor_map(), ancestors);
    assert_eq!(hierarchy.bones().ids(), ids.as_slice());
    assert!(events.borrow().is_empty());
}

#[test]
fn bone_bound_to_another_hierarchy_is_rejected() {
    let mut first = SkeletonHierarchy::new();
    first.add_bone(Bone::new(BoneId::IndexFingerTip)).unwrap();
    let bound = first.bone(BoneId::IndexFingerTip).cloned().unwrap();

    let mut second = SkeletonHierarchy::new();
    let err = second.add_bone(bound).unwrap_err();
    assert_eq!(
        err,
        Error::BoneBoundElsewhere {
            bone: BoneId::IndexFingerTip,
            owner: first.id(),
        }
    );
    assert!(!second.contains(BoneId::IndexFingerTip));

    let released = first.remove_bone(BoneId::IndexFingerTip).unwrap();
    second.add_bone(released).unwrap();
    assert_eq!(
        second.bone(BoneId::IndexFingerTip).and_then(Bone::owner),
        Some(second.id())
    );
    assert_ne!(first.id(), second.id());
}

#[test]
fn bones_report_their_owner_through_the_owner_trait() {
    let mut first = SkeletonHierarchy::new();
    let second = SkeletonHierarchy::new();
    first.add_bone(Bone::new(BoneId::LittleFingerTip)).unwrap();

    let owners: [&dyn BoneOwner; 2] = [&first, &second];
    let tip = first.bone(BoneId::LittleFingerTip).unwrap();
    assert!(tip.is_owned_by(owners[0]));
    assert!(!tip.is_owned_by(owners[1]));
    assert!(owners[0].owns(BoneId::LittleFingerTip));
    assert!(!owners[1].owns(BoneId::LittleFingerTip));
    assert_eq!(
        owners[0].nearest_present_ancestor(BoneId::LittleFingerTip),
        Some(BoneId::WristRoot)
    );
    assert!(!Bone::new(BoneId::LittleFingerTip).is_owned_by(owners[0]));
}

#[test]
fn bind_pose_requires_a_unit_rotation() {
    let mut hierarchy = SkeletonHierarchy::new();
    hierarchy.add_bone(Bone::new(BoneId::ThumbMetacarpal)).unwrap();

    let stretched = Pose::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 1.5));
    let err = hierarchy
        .set_bind_pose(BoneId::ThumbMetacarpal, stretched)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRotation);
    assert_eq!(
        hierarchy.bone(BoneId::ThumbMetacarpal).unwrap().bind_pose(),
        Pose::IDENTITY
    );
    assert!(Bone::with_bind_pose(BoneId::ThumbTip, stretched).is_err());

    let pose = Pose::new(Vec3::new(0.0, 0.02, 0.0), Quat::from_rotation_x(0.3));
    hierarchy
        .set_bind_pose(BoneId::ThumbMetacarpal, pose)
        .unwrap();
    assert_eq!(
        hierarchy.bone(BoneId::ThumbMetacarpal).unwrap().bind_pose(),
        pose
    );

    assert!(matches!(
        hierarchy.set_bind_pose(BoneId::ThumbTip, pose),
        Err(Error::BoneNotPresent { .. })
    ));
}

#[test]
fn teardown_evicts_tips_first_and_disposes() {
    let mut hierarchy = SkeletonHierarchy::new();
    hierarchy.add_bone(Bone::new(BoneId::ThumbTip)).unwrap();
    hierarchy
        .add_bone(Bone::new(BoneId::RingFingerProximalPhalanx))
        .unwrap();
    let events = record_events(&mut hierarchy);

    let bones = hierarchy.teardown();
    let ids = bones.iter().map(Bone::id).collect::<Vec<_>>();
    assert_eq!(
        ids,
        vec![
            BoneId::ThumbTip,
            BoneId::RingFingerProximalPhalanx,
            BoneId::WristRoot,
        ]
    );
    assert!(bones.iter().all(|b| b.owner().is_none()));
    assert_eq!(
        *events.borrow(),
        ids.iter().map(|&id| HandEvent::BoneRemoved(id)).collect::<Vec<_>>()
    );

    assert!(hierarchy.is_disposed());
    assert!(hierarchy.is_empty());
    assert_eq!(hierarchy.nearest_present_ancestor(BoneId::ThumbTip), None);

    let err = hierarchy.add_bone(Bone::new(BoneId::ThumbTip)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisposedEntity);
    assert!(matches!(
        hierarchy.remove_bone(BoneId::WristRoot),
        Err(Error::Disposed { .. })
    ));
    assert!(hierarchy.teardown().is_empty());

    let mut other = SkeletonHierarchy::new();
    for bone in bones.into_iter().filter(|b| !BoneTopology::is_root(b.id())) {
        other.add_bone(bone).unwrap();
    }
    assert_eq!(other.len(), 3);
}
