use crate::input;
use bio_core::Viewport;
use wasm_bindgen::JsCast;
use web_sys as web;

pub const CONTAINER_ID: &str = "particle-background";
pub const RESET_BUTTON_ID: &str = "particle-reset";

const CONTAINER_STYLE: &str = "position:fixed;inset:0;z-index:-1;pointer-events:none;\
overflow:hidden;opacity:0;transition:opacity 1s ease-in;\
background:radial-gradient(ellipse at center,#1a0b2e 0%,#0a0614 70%,#000 100%)";
const CANVAS_STYLE: &str = "position:absolute;top:0;left:0;display:block;pointer-events:none";
const RESET_STYLE: &str = "position:fixed;right:12px;bottom:12px;z-index:10;padding:4px 10px;\
font:12px sans-serif;color:#fff;background:rgba(255,255,255,0.12);\
border:1px solid rgba(255,255,255,0.3);border-radius:4px;cursor:pointer";

#[inline]
pub fn window_document() -> Option<(web::Window, web::Document)> {
    let window = web::window()?;
    let document = window.document()?;
    Some((window, document))
}

pub fn read_viewport(window: &web::Window) -> Viewport {
    input::sanitize_viewport(
        window.inner_width().ok().and_then(|v| v.as_f64()),
        window.inner_height().ok().and_then(|v| v.as_f64()),
        window.device_pixel_ratio(),
    )
}

#[inline]
pub fn is_visible(document: &web::Document) -> bool {
    !document.hidden()
}

/// Existing `#particle-background`, or a fresh one appended to the body.
pub fn ensure_container(document: &web::Document) -> anyhow::Result<web::HtmlElement> {
    let el = match document.get_element_by_id(CONTAINER_ID) {
        Some(el) => el,
        None => {
            let el = document
                .create_element("div")
                .map_err(|e| anyhow::anyhow!(format!("create container: {:?}", e)))?;
            el.set_id(CONTAINER_ID);
            let body = document
                .body()
                .ok_or_else(|| anyhow::anyhow!("document has no body"))?;
            body.append_child(&el)
                .map_err(|e| anyhow::anyhow!(format!("append container: {:?}", e)))?;
            el
        }
    };
    let _ = el.set_attribute("style", CONTAINER_STYLE);
    el.dyn_into::<web::HtmlElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))
}

pub fn set_ready(container: &web::HtmlElement, ready: bool) {
    let _ = container
        .style()
        .set_property("opacity", input::opacity_for(ready));
}

pub fn create_canvas(
    document: &web::Document,
    container: &web::HtmlElement,
    viewport: Viewport,
) -> anyhow::Result<web::HtmlCanvasElement> {
    let canvas: web::HtmlCanvasElement = document
        .create_element("canvas")
        .map_err(|e| anyhow::anyhow!(format!("create canvas: {:?}", e)))?
        .dyn_into::<web::HtmlCanvasElement>()
        .map_err(|e| anyhow::anyhow!(format!("{:?}", e)))?;
    let _ = canvas.set_attribute("style", CANVAS_STYLE);
    size_canvas(&canvas, viewport);
    container
        .append_child(&canvas)
        .map_err(|e| anyhow::anyhow!(format!("append canvas: {:?}", e)))?;
    Ok(canvas)
}

/// Backing store in physical pixels, CSS box in layout pixels.
pub fn size_canvas(canvas: &web::HtmlCanvasElement, viewport: Viewport) {
    let (w_px, h_px) = viewport.physical_size();
    canvas.set_width(w_px);
    canvas.set_height(h_px);
    let style = canvas.style();
    let _ = style.set_property("width", &input::css_px(viewport.width));
    let _ = style.set_property("height", &input::css_px(viewport.height));
}

/// Install the reset control once per page; later calls are no-ops.
pub fn ensure_reset_button(
    document: &web::Document,
    mut handler: impl FnMut() + 'static,
) -> anyhow::Result<()> {
    if document.get_element_by_id(RESET_BUTTON_ID).is_some() {
        return Ok(());
    }
    let button = document
        .create_element("button")
        .map_err(|e| anyhow::anyhow!(format!("create button: {:?}", e)))?;
    button.set_id(RESET_BUTTON_ID);
    button.set_text_content(Some("Reset Animation"));
    let _ = button.set_attribute("type", "button");
    let _ = button.set_attribute("style", RESET_STYLE);
    document
        .body()
        .ok_or_else(|| anyhow::anyhow!("document has no body"))?
        .append_child(&button)
        .map_err(|e| anyhow::anyhow!(format!("append button: {:?}", e)))?;
    add_click_listener(document, RESET_BUTTON_ID, move || handler());
    Ok(())
}

#[inline]
pub fn add_click_listener(
    document: &web::Document,
    element_id: &str,
    mut handler: impl FnMut() + 'static,
) {
    if let Some(el) = document.get_element_by_id(element_id) {
        let closure =
            wasm_bindgen::closure::Closure::wrap(Box::new(move || handler()) as Box<dyn FnMut()>);
        let _ = el.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        // lives as long as the page-level button
        closure.forget();
    }
}
