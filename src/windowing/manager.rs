use std::{collections::HashSet, sync::mpsc::Receiver};

use crate::{
    backend::{BackendError, Notification, WindowBackend},
    config::GeneralConfig,
    graphics::Color,
    overlays::{create_overlay, Overlay},
    windowing::{set::TrackingSet, WindowId},
};

/// What a single reconciliation pass changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub created: usize,
    pub destroyed: usize,
    pub failed: usize,
}

impl PassSummary {
    pub const fn is_noop(&self) -> bool {
        self.created == 0 && self.destroyed == 0 && self.failed == 0
    }
}

/// Owns the backend connection and every overlay, and keeps the overlays in
/// line with the window manager's focus and client list.
pub struct OverlayManager<B>
where
    B: WindowBackend,
{
    backend: B,
    set: TrackingSet<B::Surface>,
    active_color: Color,
    inactive_color: Color,
    track_inactive: bool,
}

impl<B> OverlayManager<B>
where
    B: WindowBackend,
{
    pub fn new(backend: B, config: &GeneralConfig) -> Self {
        Self {
            backend,
            set: TrackingSet::default(),
            active_color: config.active_color,
            inactive_color: config.inactive_color,
            track_inactive: config.track_inactive,
        }
    }

    #[cfg(test)]
    pub const fn tracking(&self) -> &TrackingSet<B::Surface> {
        &self.set
    }

    /// Runs one pass: re-reads focus and client list, then destroys and
    /// creates overlays until the tracking set matches.
    pub fn reconcile(&mut self) -> PassSummary {
        let mut summary = PassSummary::default();
        let new_active = self.backend.active_window();

        self.reconcile_active(new_active, &mut summary);
        if self.track_inactive {
            self.reconcile_inactive(new_active, &mut summary);
        }

        if !summary.is_noop() {
            log::trace!(
                "pass: active {:?}, +{} -{} ({} failed), {} live",
                new_active,
                summary.created,
                summary.destroyed,
                summary.failed,
                self.set.len()
            );
        }
        summary
    }

    fn reconcile_active(&mut self, new_active: Option<WindowId>, summary: &mut PassSummary) {
        let unchanged = new_active == self.set.active_window();
        if unchanged && (new_active.is_none() || self.set.active_overlay().is_some()) {
            return;
        }

        if let Some(old) = self.set.take_active() {
            self.release(old, "active");
            summary.destroyed += 1;
        }
        self.set.set_active_window(new_active);

        let Some(window) = new_active else {
            return;
        };

        // a window never carries two overlays, not even for the length of a pass
        if let Some(old) = self.set.take_inactive(window) {
            self.release(old, "inactive");
            summary.destroyed += 1;
        }

        match self.create(window, self.active_color, "active") {
            Some(overlay) => {
                self.set.put_active(overlay);
                summary.created += 1;
            }
            None => summary.failed += 1,
        }
    }

    fn reconcile_inactive(&mut self, new_active: Option<WindowId>, summary: &mut PassSummary) {
        let mut wanted = HashSet::new();
        let listed: Vec<WindowId> = self
            .backend
            .client_list()
            .into_iter()
            .filter(|w| Some(*w) != new_active && wanted.insert(*w))
            .collect();

        let stale: Vec<WindowId> = self
            .set
            .inactive_windows()
            .filter(|w| !wanted.contains(w))
            .collect();
        for window in stale {
            if let Some(old) = self.set.take_inactive(window) {
                self.release(old, "inactive");
                summary.destroyed += 1;
            }
        }

        for window in listed {
            if self.set.inactive_overlay(window).is_some() {
                continue;
            }
            match self.create(window, self.inactive_color, "inactive") {
                Some(overlay) => {
                    self.set.insert_inactive(overlay);
                    summary.created += 1;
                }
                None => summary.failed += 1,
            }
        }
    }

    fn create(&self, window: WindowId, color: Color, role: &str) -> Option<Overlay<B::Surface>> {
        match create_overlay(&self.backend, window, color) {
            Ok(overlay) => {
                let (placement, geometry) = (overlay.placement(), overlay.geometry());
                log::debug!(
                    "{role} overlay on {window} ({}): {}px at {},{} in {}x{}",
                    self.backend.window_name(window).as_deref().unwrap_or("untitled"),
                    placement.size,
                    placement.x,
                    placement.y,
                    geometry.width,
                    geometry.height
                );
                Some(overlay)
            }
            Err(e) => {
                log::debug!("No {role} overlay this pass: {e}");
                None
            }
        }
    }

    fn release(&self, overlay: Overlay<B::Surface>, role: &str) {
        log::debug!("Releasing {role} overlay on {}", overlay.parent());
        drop(overlay);
    }

    /// Destroys every overlay and flushes the backend. Returns how many were released.
    pub fn shutdown(&mut self) -> usize {
        if self.set.is_empty() {
            log::debug!("No overlays to release");
        }
        let released = self.set.clear();
        self.backend.flush();
        released
    }

    /// Reconciles once, then once per notification, until a shutdown
    /// request or a lost connection. Every overlay is released on the way out.
    pub fn run(&mut self, notifications: &Receiver<Notification>) -> Result<(), BackendError> {
        self.reconcile();

        let result = loop {
            match notifications.recv() {
                Ok(Notification::ActiveWindowChanged | Notification::ClientListChanged) => {
                    self.reconcile();
                }
                Ok(Notification::Shutdown) => {
                    log::info!("Shutdown requested");
                    break Ok(());
                }
                Ok(Notification::Disconnected) | Err(_) => break Err(BackendError::Disconnected),
            }
        };

        let released = self.shutdown();
        log::info!("Released {released} overlays");
        result
    }
}
