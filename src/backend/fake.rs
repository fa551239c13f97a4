use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use crate::{
    graphics::Color,
    overlays::OverlayPlacement,
    windowing::{Geometry, WindowId},
};

use super::{BackendError, OverlaySurface, WindowBackend};

pub const DEFAULT_GEOMETRY: Geometry = Geometry {
    x: 0,
    y: 0,
    width: 900,
    height: 600,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CreateRecord {
    pub surface: u32,
    pub parent: WindowId,
    pub placement: OverlayPlacement,
    pub color: Color,
}

#[derive(Default)]
pub struct FakeDesktop {
    pub active: Option<WindowId>,
    pub clients: Vec<WindowId>,
    pub geometries: HashMap<WindowId, Geometry>,
    /// Windows that are still listed but whose geometry query fails.
    pub vanished: HashSet<WindowId>,
    pub names: HashMap<WindowId, String>,
    pub created: Vec<CreateRecord>,
    pub destroyed: Vec<u32>,
    pub flushes: usize,
    next_surface: u32,
    live: HashMap<u32, WindowId>,
}

/// In-memory desktop recording every surface it hands out.
#[derive(Clone, Default)]
pub struct FakeBackend {
    pub desktop: Rc<RefCell<FakeDesktop>>,
}

pub struct FakeSurface {
    id: u32,
    parent: WindowId,
    desktop: Rc<RefCell<FakeDesktop>>,
}

impl FakeSurface {
    pub fn id(&self) -> u32 {
        self.id
    }
}

impl OverlaySurface for FakeSurface {
    fn parent(&self) -> WindowId {
        self.parent
    }
}

impl Drop for FakeSurface {
    fn drop(&mut self) {
        let mut desktop = self.desktop.borrow_mut();
        assert!(
            desktop.live.remove(&self.id).is_some(),
            "surface {} destroyed twice",
            self.id
        );
        desktop.destroyed.push(self.id);
    }
}

impl FakeBackend {
    pub fn set_active(&self, window: Option<u32>) {
        self.desktop.borrow_mut().active = window.map(WindowId);
    }

    pub fn set_clients(&self, windows: &[u32]) {
        self.desktop.borrow_mut().clients = windows.iter().copied().map(WindowId).collect();
    }

    pub fn set_geometry(&self, window: u32, width: u32, height: u32) {
        self.desktop.borrow_mut().geometries.insert(
            WindowId(window),
            Geometry {
                width,
                height,
                ..DEFAULT_GEOMETRY
            },
        );
    }

    pub fn vanish(&self, window: u32) {
        self.desktop.borrow_mut().vanished.insert(WindowId(window));
    }

    pub fn create_count(&self) -> usize {
        self.desktop.borrow().created.len()
    }

    pub fn destroy_count(&self) -> usize {
        self.desktop.borrow().destroyed.len()
    }

    pub fn live_count(&self) -> usize {
        self.desktop.borrow().live.len()
    }

    pub fn last_created(&self) -> Option<CreateRecord> {
        self.desktop.borrow().created.last().copied()
    }
}

impl WindowBackend for FakeBackend {
    type Surface = FakeSurface;

    fn active_window(&self) -> Option<WindowId> {
        self.desktop.borrow().active
    }

    fn client_list(&self) -> Vec<WindowId> {
        self.desktop.borrow().clients.clone()
    }

    fn geometry(&self, window: WindowId) -> Result<Geometry, BackendError> {
        let desktop = self.desktop.borrow();
        if desktop.vanished.contains(&window) {
            return Err(BackendError::WindowGone(window));
        }
        Ok(desktop
            .geometries
            .get(&window)
            .copied()
            .unwrap_or(DEFAULT_GEOMETRY))
    }

    fn window_name(&self, window: WindowId) -> Option<String> {
        self.desktop.borrow().names.get(&window).cloned()
    }

    fn create_surface(
        &self,
        parent: WindowId,
        placement: OverlayPlacement,
        color: Color,
    ) -> Result<FakeSurface, BackendError> {
        let mut desktop = self.desktop.borrow_mut();
        if desktop.vanished.contains(&parent) {
            return Err(BackendError::WindowGone(parent));
        }
        assert!(
            !desktop.live.values().any(|p| *p == parent),
            "second live overlay for window {parent}"
        );

        desktop.next_surface += 1;
        let id = desktop.next_surface;
        desktop.live.insert(id, parent);
        desktop.created.push(CreateRecord {
            surface: id,
            parent,
            placement,
            color,
        });

        Ok(FakeSurface {
            id,
            parent,
            desktop: self.desktop.clone(),
        })
    }

    fn flush(&self) {
        self.desktop.borrow_mut().flushes += 1;
    }
}
