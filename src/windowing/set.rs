use std::collections::HashMap;

use crate::{backend::OverlaySurface, overlays::Overlay};

use super::WindowId;

/// Overlays keyed by the window they belong to: one slot for the active
/// window, one per inactive window. Removing an overlay from its slot hands
/// ownership to the caller; dropping it destroys the surface.
pub struct TrackingSet<S>
where
    S: OverlaySurface,
{
    active_window: Option<WindowId>,
    active: Option<Overlay<S>>,
    inactive: HashMap<WindowId, Overlay<S>>,
}

impl<S> Default for TrackingSet<S>
where
    S: OverlaySurface,
{
    fn default() -> Self {
        Self {
            active_window: None,
            active: None,
            inactive: HashMap::new(),
        }
    }
}

impl<S> TrackingSet<S>
where
    S: OverlaySurface,
{
    /// The window currently considered active, whether or not it has an overlay.
    pub const fn active_window(&self) -> Option<WindowId> {
        self.active_window
    }

    pub fn set_active_window(&mut self, window: Option<WindowId>) {
        debug_assert!(
            self.active.is_none(),
            "active overlay must be released before the active window changes"
        );
        self.active_window = window;
    }

    pub const fn active_overlay(&self) -> Option<&Overlay<S>> {
        self.active.as_ref()
    }

    pub fn take_active(&mut self) -> Option<Overlay<S>> {
        self.active.take()
    }

    pub fn put_active(&mut self, overlay: Overlay<S>) {
        debug_assert_eq!(Some(overlay.parent()), self.active_window);
        debug_assert!(self.active.is_none());
        debug_assert!(!self.inactive.contains_key(&overlay.parent()));
        self.active = Some(overlay);
    }

    pub fn inactive_overlay(&self, window: WindowId) -> Option<&Overlay<S>> {
        self.inactive.get(&window)
    }

    pub fn inactive_windows(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.inactive.keys().copied()
    }

    pub fn take_inactive(&mut self, window: WindowId) -> Option<Overlay<S>> {
        self.inactive.remove(&window)
    }

    pub fn insert_inactive(&mut self, overlay: Overlay<S>) {
        let window = overlay.parent();
        debug_assert_ne!(Some(window), self.active_window);
        let replaced = self.inactive.insert(window, overlay);
        debug_assert!(replaced.is_none(), "{window} already had an inactive overlay");
    }

    /// Number of live overlays across all slots.
    pub fn len(&self) -> usize {
        usize::from(self.active.is_some()) + self.inactive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties every slot, destroying the overlays. Returns how many were released.
    pub fn clear(&mut self) -> usize {
        let released = self.len();
        self.active = None;
        self.active_window = None;
        self.inactive.clear();
        released
    }
}
