use sandsong_core::Viewport;
use web_sys as web;

#[inline]
pub fn window_document() -> Option<web::Document> {
    web::window().and_then(|w| w.document())
}

/// Match the canvas backing store to its CSS size times devicePixelRatio and
/// return the viewport in CSS pixels together with the ratio used.
pub fn sync_canvas_backing_size(canvas: &web::HtmlCanvasElement) -> (Viewport, f64) {
    let dpr = web::window().map(|w| w.device_pixel_ratio()).unwrap_or(1.0);
    let rect = canvas.get_bounding_client_rect();
    let w_px = (rect.width() * dpr) as u32;
    let h_px = (rect.height() * dpr) as u32;
    canvas.set_width(w_px.max(1));
    canvas.set_height(h_px.max(1));
    let viewport = Viewport::new(rect.width().max(1.0) as f32, rect.height().max(1.0) as f32);
    (viewport, dpr)
}
