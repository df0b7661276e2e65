use crate::audio::WebAudioEngine;
use crate::canvas::Canvas2dRenderer;
use sandsong_core::{InputEvent, Renderer, Sketch, Viewport};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

const STATS_EVERY: u64 = 600;

/// Everything one animation frame touches, shared with the event handlers.
pub struct FrameContext {
    pub sketch: Sketch<WebAudioEngine>,
    pub renderer: Canvas2dRenderer,
}

impl FrameContext {
    pub fn new(sketch: Sketch<WebAudioEngine>, renderer: Canvas2dRenderer) -> Self {
        Self { sketch, renderer }
    }

    pub fn frame(&mut self) {
        let stats = self.sketch.frame(instant::now(), &mut self.renderer);
        if stats.frame % STATS_EVERY == 0 {
            log::info!(
                "[frame] {} fps={:.1} activity={:.2} particles={}/{}",
                stats.frame,
                stats.fps,
                stats.activity,
                stats.particles,
                stats.capacity
            );
        }
    }

    pub fn resize(&mut self, viewport: Viewport, dpr: f64) {
        self.sketch.handle(InputEvent::Resize {
            width: viewport.width,
            height: viewport.height,
        });
        self.renderer.set_dpr(dpr);
        self.renderer.resize(viewport);
    }
}

fn request_frame(tick: &Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
    let guard = tick.borrow();
    let (Some(w), Some(cb)) = (web::window(), guard.as_ref()) else {
        return;
    };
    if let Err(e) = w.request_animation_frame(cb.as_ref().unchecked_ref()) {
        log::error!("[frame] requestAnimationFrame failed: {:?}", e);
    }
}

pub fn start_loop(frame_ctx: Rc<RefCell<FrameContext>>) {
    let tick: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
    let tick_clone = tick.clone();
    *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
        frame_ctx.borrow_mut().frame();
        request_frame(&tick_clone);
    }) as Box<dyn FnMut()>));
    request_frame(&tick);
}
