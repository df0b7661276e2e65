use crate::dom;
use crate::frame::FrameContext;
use glam::Vec2;
use sandsong_core::InputEvent;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

#[derive(Default, Clone, Copy)]
pub struct PointerState {
    pub pos: Vec2,
    pub down: bool,
}

/// Pointer position in CSS pixels relative to the canvas, the space the
/// sketch viewport lives in.
#[inline]
pub fn pointer_canvas_css(ev: &web::PointerEvent, canvas: &web::HtmlCanvasElement) -> Vec2 {
    let rect = canvas.get_bounding_client_rect();
    Vec2::new(
        ev.client_x() as f32 - rect.left() as f32,
        ev.client_y() as f32 - rect.top() as f32,
    )
}

/// Single printable character of a key event, lowercased; named keys map to `None`.
#[inline]
pub fn key_char(key: &str) -> Option<char> {
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c.to_ascii_lowercase()),
        _ => None,
    }
}

fn listen<E: JsCast + 'static>(
    target: &web::EventTarget,
    name: &str,
    mut handler: impl FnMut(E) + 'static,
) -> anyhow::Result<()> {
    let closure = Closure::wrap(Box::new(move |ev: web::Event| {
        if let Ok(ev) = ev.dyn_into::<E>() {
            handler(ev);
        }
    }) as Box<dyn FnMut(web::Event)>);
    target
        .add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    closure.forget();
    Ok(())
}

pub fn wire_pointer(
    canvas: &web::HtmlCanvasElement,
    frame_ctx: Rc<RefCell<FrameContext>>,
) -> anyhow::Result<()> {
    let pointer = Rc::new(RefCell::new(PointerState::default()));

    {
        let canvas_c = canvas.clone();
        let pointer = pointer.clone();
        let frame_ctx = frame_ctx.clone();
        listen(canvas, "pointerdown", move |ev: web::PointerEvent| {
            let pos = pointer_canvas_css(&ev, &canvas_c);
            *pointer.borrow_mut() = PointerState { pos, down: true };
            frame_ctx
                .borrow_mut()
                .sketch
                .handle(InputEvent::PointerDown { x: pos.x, y: pos.y });
        })?;
    }
    {
        let canvas_c = canvas.clone();
        let pointer = pointer.clone();
        let frame_ctx = frame_ctx.clone();
        listen(canvas, "pointermove", move |ev: web::PointerEvent| {
            let pos = pointer_canvas_css(&ev, &canvas_c);
            let mut state = pointer.borrow_mut();
            let delta = pos - state.pos;
            state.pos = pos;
            let event = if state.down {
                InputEvent::PointerDrag {
                    x: pos.x,
                    y: pos.y,
                    dx: delta.x,
                    dy: delta.y,
                }
            } else {
                InputEvent::PointerMove { x: pos.x, y: pos.y }
            };
            frame_ctx.borrow_mut().sketch.handle(event);
        })?;
    }
    for name in ["pointerup", "pointercancel", "pointerleave"] {
        let pointer = pointer.clone();
        listen(canvas, name, move |_: web::PointerEvent| {
            pointer.borrow_mut().down = false;
        })?;
    }
    Ok(())
}

pub fn wire_keys(window: &web::Window, frame_ctx: Rc<RefCell<FrameContext>>) -> anyhow::Result<()> {
    listen(window, "keydown", move |ev: web::KeyboardEvent| {
        if ev.repeat() {
            return;
        }
        let Some(c) = key_char(&ev.key()) else {
            return;
        };
        if c == ' ' {
            ev.prevent_default();
        }
        log::debug!("[keys] {:?}", c);
        frame_ctx.borrow_mut().sketch.handle(InputEvent::Key(c));
    })
}

pub fn wire_resize(
    window: &web::Window,
    canvas: &web::HtmlCanvasElement,
    frame_ctx: Rc<RefCell<FrameContext>>,
) -> anyhow::Result<()> {
    let canvas = canvas.clone();
    listen(window, "resize", move |_: web::Event| {
        let (viewport, dpr) = dom::sync_canvas_backing_size(&canvas);
        frame_ctx.borrow_mut().resize(viewport, dpr);
    })
}
