use thiserror::Error;

use crate::{
    backend::{BackendError, OverlaySurface, WindowBackend},
    graphics::Color,
    windowing::{Geometry, WindowId},
};

/// Where an overlay sits inside its parent, in parent-relative pixels.
/// Overlays are square.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayPlacement {
    pub x: u32,
    pub y: u32,
    pub size: u32,
}

impl OverlayPlacement {
    /// A third of the parent's shorter side, centered.
    pub const fn centered_in(parent: Geometry) -> Self {
        let shorter = if parent.width < parent.height {
            parent.width
        } else {
            parent.height
        };
        let size = shorter / 3;
        Self {
            x: (parent.width - size) / 2,
            y: (parent.height - size) / 2,
            size,
        }
    }
}

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("geometry of {window} unavailable: {source}")]
    GeometryUnavailable {
        window: WindowId,
        #[source]
        source: BackendError,
    },
    #[error("{window} is too small for an overlay ({}x{})", .geometry.width, .geometry.height)]
    TooSmall { window: WindowId, geometry: Geometry },
    #[error("could not create overlay on {window}: {source}")]
    Surface {
        window: WindowId,
        #[source]
        source: BackendError,
    },
}

/// An overlay surface bound to one tracked window, plus what it was sized against.
/// Dropping it destroys the surface.
pub struct Overlay<S> {
    surface: S,
    geometry: Geometry,
    placement: OverlayPlacement,
}

impl<S> Overlay<S>
where
    S: OverlaySurface,
{
    pub fn parent(&self) -> WindowId {
        self.surface.parent()
    }

    pub const fn surface(&self) -> &S {
        &self.surface
    }

    pub const fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub const fn placement(&self) -> OverlayPlacement {
        self.placement
    }
}

/// Reads `parent`'s current geometry and creates a centered overlay painted with `color`.
/// Nothing is created when the geometry can't be read.
pub fn create_overlay<B>(
    backend: &B,
    parent: WindowId,
    color: Color,
) -> Result<Overlay<B::Surface>, OverlayError>
where
    B: WindowBackend,
{
    let geometry = backend
        .geometry(parent)
        .map_err(|source| OverlayError::GeometryUnavailable {
            window: parent,
            source,
        })?;

    let placement = OverlayPlacement::centered_in(geometry);
    if placement.size == 0 {
        return Err(OverlayError::TooSmall {
            window: parent,
            geometry,
        });
    }

    let surface = backend
        .create_surface(parent, placement, color)
        .map_err(|source| OverlayError::Surface {
            window: parent,
            source,
        })?;

    Ok(Overlay {
        surface,
        geometry,
        placement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;

    fn geometry(width: u32, height: u32) -> Geometry {
        Geometry {
            width,
            height,
            ..Geometry::default()
        }
    }

    fn placement(x: u32, y: u32, size: u32) -> OverlayPlacement {
        OverlayPlacement { x, y, size }
    }

    #[test]
    fn centers_a_third_of_the_shorter_side() {
        let p = OverlayPlacement::centered_in(geometry(900, 600));
        assert_eq!(p, placement(350, 200, 200));

        let p = OverlayPlacement::centered_in(geometry(300, 1000));
        assert_eq!(p, placement(100, 450, 100));
    }

    #[test]
    fn size_rounds_down() {
        let p = OverlayPlacement::centered_in(geometry(100, 101));
        assert_eq!(p.size, 33);
        assert_eq!((p.x, p.y), (33, 34));
    }

    #[test]
    fn creates_painted_overlay() {
        let backend = FakeBackend::default();
        backend.set_geometry(7, 900, 600);
        let color = Color::new(1.0, 0.0, 0.0, 0.5).unwrap();

        let overlay = create_overlay(&backend, WindowId(7), color).unwrap();
        assert_eq!(overlay.parent(), WindowId(7));
        assert_eq!(overlay.placement().size, 200);
        assert_eq!(overlay.geometry().width, 900);

        let record = backend.last_created().unwrap();
        assert_eq!(record.parent, WindowId(7));
        assert_eq!(record.color, color);
        assert_eq!(record.placement, overlay.placement());

        drop(overlay);
        assert_eq!(backend.destroy_count(), 1);
        assert_eq!(backend.live_count(), 0);
    }

    #[test]
    fn vanished_parent_creates_nothing() {
        let backend = FakeBackend::default();
        backend.vanish(3);

        let black = Color::new(0.0, 0.0, 0.0, 1.0).unwrap();

        let err = create_overlay(&backend, WindowId(3), black).err().unwrap();
        assert!(matches!(
            err,
            OverlayError::GeometryUnavailable {
                window: WindowId(3),
                source: BackendError::WindowGone(_),
            }
        ));
        assert_eq!(backend.create_count(), 0);
    }

    #[test]
    fn tiny_parent_is_rejected() {
        let backend = FakeBackend::default();
        backend.set_geometry(4, 2, 500);

        let black = Color::new(0.0, 0.0, 0.0, 1.0).unwrap();

        let err = create_overlay(&backend, WindowId(4), black).err().unwrap();
        assert!(matches!(err, OverlayError::TooSmall { .. }));
        assert_eq!(backend.create_count(), 0);
    }
}
