#[cfg(test)]
pub mod fake;

#[cfg(feature = "x11")]
pub mod x11;

use thiserror::Error;

use crate::{
    graphics::Color,
    overlays::OverlayPlacement,
    windowing::{Geometry, WindowId},
};

/// Events the reconciliation loop reacts to, delivered over a single-consumer channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    ActiveWindowChanged,
    ClientListChanged,
    /// The display connection broke; no further notifications will follow.
    Disconnected,
    /// Termination was requested (SIGINT, SIGTERM, SIGHUP).
    Shutdown,
}

#[derive(Error, Debug)]
pub enum BackendError {
    #[cfg(feature = "x11")]
    #[error("Cannot open display: {0:?}")]
    Connect(#[source] xcb::ConnError),
    #[cfg(feature = "x11")]
    #[error("X11 error: {0:?}")]
    X11(#[from] xcb::Error),
    #[cfg(feature = "x11")]
    #[error("X11 request failed: {0:?}")]
    Request(#[from] xcb::ProtocolError),
    #[error("no screen with index {0}")]
    NoScreen(i32),
    #[error("32-bit color not supported")]
    UnsupportedVisual,
    #[error("window {0} no longer exists")]
    WindowGone(WindowId),
    #[error("display connection closed")]
    Disconnected,
}

/// A created overlay window together with its rendering context.
/// Dropping the value releases both.
pub trait OverlaySurface {
    /// The tracked window this surface is a child of.
    fn parent(&self) -> WindowId;
}

/// Window-manager state queries plus the primitives to create overlay surfaces.
///
/// Queries degrade instead of failing: an unreadable active window is `None`,
/// an unreadable client list is empty. Only geometry reports `WindowGone`,
/// since callers need to tell a vanished window apart from an empty one.
pub trait WindowBackend {
    type Surface: OverlaySurface;

    fn active_window(&self) -> Option<WindowId>;

    /// Every managed top-level window, in the order the window manager reports them.
    fn client_list(&self) -> Vec<WindowId>;

    fn geometry(&self, window: WindowId) -> Result<Geometry, BackendError>;

    fn window_name(&self, window: WindowId) -> Option<String>;

    /// Creates, paints and maps a borderless child of `parent`.
    /// Either everything is created or nothing is left behind.
    fn create_surface(
        &self,
        parent: WindowId,
        placement: OverlayPlacement,
        color: Color,
    ) -> Result<Self::Surface, BackendError>;

    fn flush(&self);
}
