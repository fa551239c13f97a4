use std::{
    sync::{mpsc::Sender, Arc},
    thread::{self, JoinHandle},
};

use xcb::{x, Xid, XidNew};

use crate::{
    graphics::Color,
    overlays::OverlayPlacement,
    windowing::{Geometry, WindowId},
};

use super::{BackendError, Notification, OverlaySurface, WindowBackend};

/// _NET_CLIENT_LIST is read in one request of at most this many items.
const CLIENT_LIST_MAX: u32 = 1024;
const NAME_MAX: u32 = 1024;

#[derive(Clone, Copy, Debug)]
struct Atoms {
    net_active_window: x::Atom,
    net_client_list: x::Atom,
    net_wm_name: x::Atom,
    utf8_string: x::Atom,
}

impl Atoms {
    fn intern_all(conn: &xcb::Connection) -> Result<Self, BackendError> {
        let intern = |name: &[u8]| {
            conn.send_request(&x::InternAtom {
                only_if_exists: false,
                name,
            })
        };
        let cookies = [
            intern(b"_NET_ACTIVE_WINDOW".as_slice()),
            intern(b"_NET_CLIENT_LIST".as_slice()),
            intern(b"_NET_WM_NAME".as_slice()),
            intern(b"UTF8_STRING".as_slice()),
        ];
        let atoms = cookies
            .into_iter()
            .map(|cookie| conn.wait_for_reply(cookie).map(|reply| reply.atom()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            net_active_window: atoms[0],
            net_client_list: atoms[1],
            net_wm_name: atoms[2],
            utf8_string: atoms[3],
        })
    }
}

/// BadWindow and BadDrawable: the target went away between listing and use.
fn is_window_gone(err: &xcb::ProtocolError) -> bool {
    matches!(
        err,
        xcb::ProtocolError::X(x::Error::Window(_) | x::Error::Drawable(_), _)
    )
}

fn connection_lost(err: xcb::ConnError) -> BackendError {
    log::debug!("X11: connection broke mid-run: {err:?}");
    BackendError::Disconnected
}

fn x_window(id: WindowId) -> x::Window {
    // SAFETY: every WindowId originates from a window id the server reported.
    unsafe { x::Window::new(id.0) }
}

/// EWMH window state and overlay windows over a single xcb connection.
pub struct XcbBackend {
    conn: Arc<xcb::Connection>,
    root: x::Window,
    visual: x::Visualid,
    depth: u8,
    atoms: Atoms,
}

impl XcbBackend {
    /// Opens `$DISPLAY`, picks a 32-bit TrueColor visual and subscribes to
    /// property changes on the root window.
    pub fn connect() -> Result<Self, BackendError> {
        let (conn, screen_num) = xcb::Connection::connect(None).map_err(BackendError::Connect)?;

        let (root, visual, depth) = {
            let setup = conn.get_setup();
            let screen = usize::try_from(screen_num)
                .ok()
                .and_then(|n| setup.roots().nth(n))
                .ok_or(BackendError::NoScreen(screen_num))?;

            let mut found = None;
            for allowed in screen.allowed_depths().filter(|d| d.depth() == 32) {
                if let Some(v) = allowed
                    .visuals()
                    .iter()
                    .find(|v| v.class() == x::VisualClass::TrueColor)
                {
                    found = Some((v.visual_id(), allowed.depth()));
                    break;
                }
            }
            let (visual, depth) = found.ok_or(BackendError::UnsupportedVisual)?;
            (screen.root(), visual, depth)
        };

        let atoms = Atoms::intern_all(&conn)?;

        conn.send_and_check_request(&x::ChangeWindowAttributes {
            window: root,
            value_list: &[x::Cw::EventMask(x::EventMask::PROPERTY_CHANGE)],
        })?;

        log::info!(
            "X11: screen {screen_num}, root {:#x}, visual {visual:#x} (depth {depth})",
            root.resource_id()
        );

        Ok(Self {
            conn: Arc::new(conn),
            root,
            visual,
            depth,
            atoms,
        })
    }

    /// Forwards root property changes into `sender` from a dedicated thread
    /// until the connection breaks or the receiver goes away.
    pub fn spawn_event_pump(
        &self,
        sender: Sender<Notification>,
    ) -> std::io::Result<JoinHandle<()>> {
        let conn = self.conn.clone();
        let root = self.root;
        let atoms = self.atoms;

        thread::Builder::new()
            .name("x11-events".into())
            .spawn(move || loop {
                let notification = match conn.wait_for_event() {
                    Ok(xcb::Event::X(x::Event::PropertyNotify(ev))) if ev.window() == root => {
                        if ev.atom() == atoms.net_active_window {
                            Notification::ActiveWindowChanged
                        } else if ev.atom() == atoms.net_client_list {
                            Notification::ClientListChanged
                        } else {
                            continue;
                        }
                    }
                    Ok(_) => continue,
                    Err(xcb::Error::Protocol(e)) => {
                        // e.g. destroying an overlay whose parent already took it down
                        log::debug!("X11: ignoring async error: {e:?}");
                        continue;
                    }
                    Err(xcb::Error::Connection(e)) => {
                        log::error!("X11: connection lost: {e:?}");
                        let _ = sender.send(Notification::Disconnected);
                        break;
                    }
                };

                if sender.send(notification).is_err() {
                    log::debug!("X11: notification receiver closed, stopping event pump");
                    break;
                }
            })
    }

    fn window_list_property(
        &self,
        window: x::Window,
        property: x::Atom,
        max_len: u32,
    ) -> Result<Vec<WindowId>, xcb::Error> {
        let cookie = self.conn.send_request(&x::GetProperty {
            delete: false,
            window,
            property,
            r#type: x::ATOM_WINDOW,
            long_offset: 0,
            long_length: max_len,
        });
        let reply = self.conn.wait_for_reply(cookie)?;

        if reply.r#type() != x::ATOM_WINDOW || reply.format() != 32 {
            return Ok(Vec::new());
        }

        Ok(reply
            .value::<u32>()
            .iter()
            .filter(|id| **id != 0)
            .map(|id| WindowId(*id))
            .collect())
    }

    fn string_property(
        &self,
        window: WindowId,
        property: x::Atom,
        kind: x::Atom,
    ) -> Option<String> {
        let cookie = self.conn.send_request(&x::GetProperty {
            delete: false,
            window: x_window(window),
            property,
            r#type: kind,
            long_offset: 0,
            long_length: NAME_MAX,
        });
        let reply = self.conn.wait_for_reply(cookie).ok()?;

        if reply.r#type() != kind || reply.format() != 8 {
            return None;
        }
        let bytes = reply.value::<u8>();
        (!bytes.is_empty()).then(|| String::from_utf8_lossy(bytes).into_owned())
    }
}

impl WindowBackend for XcbBackend {
    type Surface = XcbSurface;

    fn active_window(&self) -> Option<WindowId> {
        match self.window_list_property(self.root, self.atoms.net_active_window, 1) {
            Ok(windows) => windows.first().copied(),
            Err(e) => {
                log::debug!("X11: _NET_ACTIVE_WINDOW unreadable: {e:?}");
                None
            }
        }
    }

    fn client_list(&self) -> Vec<WindowId> {
        match self.window_list_property(self.root, self.atoms.net_client_list, CLIENT_LIST_MAX) {
            Ok(mut windows) => {
                let mut seen = std::collections::HashSet::with_capacity(windows.len());
                windows.retain(|w| seen.insert(*w));
                windows
            }
            Err(e) => {
                log::debug!("X11: _NET_CLIENT_LIST unreadable: {e:?}");
                Vec::new()
            }
        }
    }

    fn geometry(&self, window: WindowId) -> Result<Geometry, BackendError> {
        let cookie = self.conn.send_request(&x::GetGeometry {
            drawable: x::Drawable::Window(x_window(window)),
        });

        match self.conn.wait_for_reply(cookie) {
            Ok(reply) => Ok(Geometry {
                x: reply.x().into(),
                y: reply.y().into(),
                width: reply.width().into(),
                height: reply.height().into(),
            }),
            Err(xcb::Error::Protocol(e)) if is_window_gone(&e) => {
                Err(BackendError::WindowGone(window))
            }
            Err(xcb::Error::Connection(e)) => Err(connection_lost(e)),
            Err(e) => Err(e.into()),
        }
    }

    fn window_name(&self, window: WindowId) -> Option<String> {
        if window.0 == 0 {
            return None;
        }
        self.string_property(window, self.atoms.net_wm_name, self.atoms.utf8_string)
            .or_else(|| self.string_property(window, x::ATOM_WM_NAME, x::ATOM_STRING))
    }

    fn create_surface(
        &self,
        parent: WindowId,
        placement: OverlayPlacement,
        color: Color,
    ) -> Result<XcbSurface, BackendError> {
        let conn = &self.conn;
        let pixel = color.to_argb32();
        let size = placement.size as u16;

        // anything assigned here is released by Drop if a later step fails
        let mut surface = XcbSurface {
            conn: conn.clone(),
            parent,
            window: None,
            gc: None,
            colormap: None,
        };

        let colormap: x::Colormap = conn.generate_id();
        conn.send_and_check_request(&x::CreateColormap {
            alloc: x::ColormapAlloc::None,
            mid: colormap,
            window: self.root,
            visual: self.visual,
        })?;
        surface.colormap = Some(colormap);

        let window: x::Window = conn.generate_id();
        conn.send_and_check_request(&x::CreateWindow {
            depth: self.depth,
            wid: window,
            parent: x_window(parent),
            x: placement.x as i16,
            y: placement.y as i16,
            width: size,
            height: size,
            border_width: 0,
            class: x::WindowClass::InputOutput,
            visual: self.visual,
            value_list: &[
                x::Cw::BackPixel(pixel),
                x::Cw::BorderPixel(0),
                x::Cw::Colormap(colormap),
            ],
        })
        .map_err(|e| {
            log::debug!("X11: CreateWindow under {parent} failed: {e:?}");
            if is_window_gone(&e) {
                BackendError::WindowGone(parent)
            } else {
                BackendError::Request(e)
            }
        })?;
        surface.window = Some(window);

        let gc: x::Gcontext = conn.generate_id();
        conn.send_and_check_request(&x::CreateGc {
            cid: gc,
            drawable: x::Drawable::Window(window),
            value_list: &[x::Gc::Foreground(pixel)],
        })?;
        surface.gc = Some(gc);

        conn.send_and_check_request(&x::MapWindow { window })?;
        conn.send_request(&x::PolyFillRectangle {
            drawable: x::Drawable::Window(window),
            gc,
            rectangles: &[x::Rectangle {
                x: 0,
                y: 0,
                width: size,
                height: size,
            }],
        });
        conn.flush().map_err(connection_lost)?;

        Ok(surface)
    }

    fn flush(&self) {
        if let Err(e) = self.conn.flush() {
            log::debug!("X11: flush failed: {e:?}");
        }
    }
}

pub struct XcbSurface {
    conn: Arc<xcb::Connection>,
    parent: WindowId,
    window: Option<x::Window>,
    gc: Option<x::Gcontext>,
    colormap: Option<x::Colormap>,
}

impl OverlaySurface for XcbSurface {
    fn parent(&self) -> WindowId {
        self.parent
    }
}

impl Drop for XcbSurface {
    fn drop(&mut self) {
        if let Some(window) = self.window.take() {
            self.conn.send_request(&x::DestroyWindow { window });
        }
        if let Some(gc) = self.gc.take() {
            self.conn.send_request(&x::FreeGc { gc });
        }
        if let Some(cmap) = self.colormap.take() {
            self.conn.send_request(&x::FreeColormap { cmap });
        }
        if let Err(e) = self.conn.flush() {
            log::debug!("X11: flush after releasing overlay of {} failed: {e:?}", self.parent);
        }
    }
}
