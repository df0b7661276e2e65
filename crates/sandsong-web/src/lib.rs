#![cfg(target_arch = "wasm32")]
mod audio;
mod canvas;
mod dom;
mod events;
mod frame;

use audio::WebAudioEngine;
use canvas::Canvas2dRenderer;
use frame::FrameContext;
use sandsong_core::{Sketch, SketchConfig};
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys as web;

#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    console_log::init_with_level(log::Level::Info).ok();
    log::info!("sandsong-web starting");

    spawn_local(async move {
        if let Err(e) = init().await {
            log::error!("init error: {:?}", e);
        }
    });
    Ok(())
}

fn session_seed() -> u64 {
    let mut bytes = [0u8; 8];
    match getrandom::getrandom(&mut bytes) {
        Ok(()) => u64::from_le_bytes(bytes),
        Err(e) => {
            log::warn!("[sketch] no entropy ({e}); using the default seed");
            SketchConfig::default().seed
        }
    }
}

async fn init() -> anyhow::Result<()> {
    let window = web::window().ok_or_else(|| anyhow::anyhow!("no window"))?;
    let document = dom::window_document().ok_or_else(|| anyhow::anyhow!("no document"))?;

    let canvas: web::HtmlCanvasElement = document
        .get_element_by_id("app-canvas")
        .ok_or_else(|| anyhow::anyhow!("missing #app-canvas"))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    let ctx2d: web::CanvasRenderingContext2d = canvas
        .get_context("2d")
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?
        .ok_or_else(|| anyhow::anyhow!("no 2d context"))?
        .dyn_into::<web::CanvasRenderingContext2d>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;

    let (viewport, dpr) = dom::sync_canvas_backing_size(&canvas);
    let config = SketchConfig {
        seed: session_seed(),
        ..SketchConfig::default()
    };
    let engine = WebAudioEngine::new(config.harmony.bpm);
    let sketch = Sketch::new(config, viewport, instant::now(), engine);
    let renderer = Canvas2dRenderer::new(ctx2d, viewport, dpr);
    let frame_ctx = Rc::new(RefCell::new(FrameContext::new(sketch, renderer)));

    events::wire_pointer(&canvas, frame_ctx.clone())?;
    events::wire_keys(&window, frame_ctx.clone())?;
    events::wire_resize(&window, &canvas, frame_ctx.clone())?;
    frame::start_loop(frame_ctx);
    log::info!("[sketch] running at {}x{} (dpr {dpr})", viewport.width, viewport.height);
    Ok(())
}
