use super::pose_cache::{PoseArray, PoseCache, PoseSource};
use crate::{AncestorMap, HandEvent, HandEventListener, SubscriptionHandle};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Transformation applied by a [`PoseFilterChain`] to its upstream's relative poses.
///
/// `filtered` starts out as a copy of `upstream`.
pub trait PoseFilter {
    fn apply_filter(&mut self, upstream: &PoseArray, filtered: &mut PoseArray);
}

impl<F> PoseFilter for F
where
    F: FnMut(&PoseArray, &mut PoseArray),
{
    fn apply_filter(&mut self, upstream: &PoseArray, filtered: &mut PoseArray) {
        self(upstream, filtered)
    }
}

/// Exponential smoothing towards the upstream relative poses.
///
/// Each run moves the previous output `factor` of the way towards the new input (positions by
/// linear interpolation, rotations by spherical interpolation). `factor` 1 disables smoothing.
#[derive(Clone, Debug)]
pub struct SmoothingFilter {
    factor: f32,
    previous: Option<PoseArray>,
}

impl SmoothingFilter {
    pub fn new(factor: f32) -> Self {
        let factor = if factor.is_finite() {
            factor.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Self {
            factor,
            previous: None,
        }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Forgets the previous output; the next run passes its input through unchanged.
    pub fn reset(&mut self) {
        self.previous = None;
    }
}

impl PoseFilter for SmoothingFilter {
    fn apply_filter(&mut self, upstream: &PoseArray, filtered: &mut PoseArray) {
        if let Some(previous) = &self.previous {
            for ((out, prev), next) in filtered.iter_mut().zip(previous).zip(upstream) {
                *out = prev.lerp(*next, self.factor);
            }
        }
        self.previous = Some(*filtered);
    }
}

/// A pose provider that republishes a filtered view of an upstream provider.
///
/// The chain subscribes to the upstream's [`HandEvent::PoseDataUpdated`] and only reruns its
/// filter on [`PoseFilterChain::refresh`] when the upstream has published since the last run.
/// Reading poses through [`PoseSource`] refreshes first. Chains may be stacked: refreshing a
/// chain refreshes its upstream, whose republish marks this chain stale.
///
/// Dropping the chain unsubscribes it from the upstream.
pub struct PoseFilterChain<F: PoseFilter> {
    cache: PoseCache,
    upstream: Rc<RefCell<dyn PoseSource>>,
    subscription: Option<SubscriptionHandle>,
    stale: Rc<Cell<bool>>,
    filter: F,
    filter_runs: u64,
}

impl<F: PoseFilter> PoseFilterChain<F> {
    pub fn new(upstream: Rc<RefCell<dyn PoseSource>>, filter: F) -> Self {
        let stale = Rc::new(Cell::new(true));
        let listener_stale = Rc::clone(&stale);
        let subscription = upstream
            .borrow_mut()
            .subscribe(Box::new(move |event: &HandEvent| {
                if *event == HandEvent::PoseDataUpdated {
                    listener_stale.set(true);
                }
            }));

        Self {
            cache: PoseCache::new(),
            upstream,
            subscription: Some(subscription),
            stale,
            filter,
            filter_runs: 0,
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.get()
    }

    /// Number of times the filter has been applied.
    pub fn filter_runs(&self) -> u64 {
        self.filter_runs
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Forces the filter to rerun on the next refresh, eg. after reconfiguring it.
    pub fn filter_mut(&mut self) -> &mut F {
        self.stale.set(true);
        &mut self.filter
    }

    /// The chain's own output cache, as of the last refresh.
    pub fn cache(&self) -> &PoseCache {
        &self.cache
    }

    pub fn refresh(&mut self) {
        let mut upstream = self.upstream.borrow_mut();
        upstream.refresh();
        let scale = upstream.scale();

        if !self.stale.get() {
            drop(upstream);
            self.cache.set_scale(scale);
            return;
        }

        let ancestors = *upstream.ancestor_map();
        let source = *upstream.relative_poses();
        drop(upstream);

        let mut filtered = source;
        self.filter.apply_filter(&source, &mut filtered);
        self.filter_runs += 1;

        self.cache.set_scale(scale);
        self.cache.replace_ancestor_map(ancestors);
        self.cache.write_relative(&filtered);
        self.stale.set(false);
        log::trace!("pose filter chain recomputed (run {})", self.filter_runs);
    }
}

impl<F: PoseFilter> PoseSource for PoseFilterChain<F> {
    fn scale(&self) -> f32 {
        self.cache.scale()
    }

    fn relative_poses(&mut self) -> &PoseArray {
        self.refresh();
        self.cache.relative_poses()
    }

    fn absolute_poses(&mut self) -> &PoseArray {
        self.refresh();
        self.cache.absolute_poses()
    }

    fn absolute_scaled_poses(&mut self) -> &PoseArray {
        self.refresh();
        self.cache.absolute_scaled_poses()
    }

    fn ancestor_map(&self) -> &AncestorMap {
        self.cache.ancestor_map()
    }

    fn subscribe(&mut self, listener: Box<dyn HandEventListener>) -> SubscriptionHandle {
        PoseSource::subscribe(&mut self.cache, listener)
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        self.cache.unsubscribe(handle)
    }

    fn refresh(&mut self) {
        PoseFilterChain::refresh(self)
    }
}

impl<F: PoseFilter> Drop for PoseFilterChain<F> {
    fn drop(&mut self) {
        let Some(subscription) = self.subscription.take() else {
            return;
        };
        match self.upstream.try_borrow_mut() {
            Ok(mut upstream) => {
                upstream.unsubscribe(subscription);
            }
            Err(_) => log::warn!("upstream busy while dropping filter chain; leaving listener"),
        }
    }
}

impl<F: PoseFilter + fmt::Debug> fmt::Debug for PoseFilterChain<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseFilterChain")
            .field("cache", &self.cache)
            .field("stale", &self.stale.get())
            .field("filter", &self.filter)
            .field("filter_runs", &self.filter_runs)
            .finish_non_exhaustive()
    }
}

