use std::cell::{Cell, RefCell};
use std::rc::Rc;

use leptos::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, PointerEvent, WheelEvent};

use hexdom_shared::{
    BoardView, CellPos, ClickOutcome, GridLayout, HexGrid, RectGrid, Vertex, brighten,
    player_color, rgba_css,
};

use crate::api;
use crate::app::{Hovered, Notice};
use crate::render_loop::RenderScheduler;
use crate::viewport::Viewport;

const BACKGROUND: &str = "#0f1117";
const CELL_BORDER_WIDTH: f64 = 1.0;
const HOVER_BRIGHTEN: f64 = 1.18;
/// Pointer travel (CSS px) below which a press counts as a click rather than a drag.
const CLICK_SLOP_PX: f64 = 5.0;

/// Cell under a canvas-local point, if the point is on the board.
pub fn hit_cell(vp: &Viewport, layout: GridLayout, sx: f64, sy: f64) -> Option<CellPos> {
    RectGrid::new(layout).cell_at(vp.to_world(sx, sy))
}

/// Fit `viewport` to the whole board inside a `width` x `height` canvas.
pub fn fit_board(viewport: &mut Viewport, layout: GridLayout, width: f64, height: f64) {
    if let Some(bounds) = RectGrid::new(layout).world_bounds() {
        viewport.fit_bounds(bounds, width, height);
    }
}

fn trace_polygon(ctx: &CanvasRenderingContext2d, vp: &Viewport, points: &[Vertex]) {
    let Some((first, rest)) = points.split_first() else {
        return;
    };
    let (x, y) = vp.to_screen(*first);
    ctx.move_to(x, y);
    for point in rest {
        let (x, y) = vp.to_screen(*point);
        ctx.line_to(x, y);
    }
    ctx.close_path();
}

fn paint_board(
    ctx: &CanvasRenderingContext2d,
    vp: &Viewport,
    view: &BoardView,
    hovered: Option<CellPos>,
) {
    let grid = RectGrid::new(view.layout);

    for cell in &view.cells {
        let color = player_color(cell.owner);
        let fill = if hovered == Some(cell.pos) {
            brighten(color.fill, HOVER_BRIGHTEN)
        } else {
            color.fill
        };
        ctx.begin_path();
        trace_polygon(ctx, vp, &grid.corners_of(cell.pos));
        ctx.set_fill_style_str(&rgba_css(fill, 1.0));
        ctx.fill();
        ctx.set_stroke_style_str(&rgba_css(color.accent, 1.0));
        ctx.set_line_width(CELL_BORDER_WIDTH);
        ctx.stroke();
    }

    ctx.set_line_join("round");
    for outline in &view.outlines {
        ctx.begin_path();
        for contour in outline.placed_contours() {
            trace_polygon(ctx, vp, &contour);
        }
        ctx.set_stroke_style_str(&outline.style.stroke);
        ctx.set_line_width(outline.style.line_width);
        ctx.stroke();
    }
}

struct ResizeBinding {
    window: web_sys::Window,
    handler: Closure<dyn Fn()>,
}

thread_local! {
    static RESIZE_BINDING: RefCell<Option<ResizeBinding>> = const { RefCell::new(None) };
}

/// Repaint on window resize. Replaces the listener of any earlier canvas.
fn bind_resize(scheduler: Rc<RenderScheduler>) {
    let Some(window) = web_sys::window() else {
        return;
    };
    RESIZE_BINDING.with(|slot| {
        if let Some(old) = slot.borrow_mut().take() {
            let _ = old
                .window
                .remove_event_listener_with_callback("resize", old.handler.as_ref().unchecked_ref());
        }
    });

    let handler = Closure::<dyn Fn()>::new(move || scheduler.mark_dirty());
    if window
        .add_event_listener_with_callback("resize", handler.as_ref().unchecked_ref())
        .is_err()
    {
        return;
    }
    RESIZE_BINDING.with(|slot| {
        *slot.borrow_mut() = Some(ResizeBinding { window, handler });
    });
}

fn canvas_local(canvas: Option<&HtmlCanvasElement>, e: &MouseEvent) -> (f64, f64) {
    canvas
        .map(|el| {
            let rect = el.get_bounding_client_rect();
            (
                e.client_x() as f64 - rect.left(),
                e.client_y() as f64 - rect.top(),
            )
        })
        .unwrap_or((e.offset_x() as f64, e.offset_y() as f64))
}

#[component]
pub fn BoardCanvas() -> impl IntoView {
    let board: RwSignal<Option<BoardView>> = expect_context();
    let viewport: RwSignal<Viewport> = expect_context();
    let Hovered(hovered) = expect_context();
    let Notice(notice) = expect_context();

    let canvas_ref = NodeRef::<leptos::html::Canvas>::new();

    let is_dragging = Rc::new(Cell::new(false));
    let drag_start = Rc::new(Cell::new((0.0f64, 0.0f64)));
    let last_pos = Rc::new(Cell::new((0.0f64, 0.0f64)));

    // Layout the viewport was last fitted to; a new layout refits.
    let fitted_layout: Rc<Cell<Option<GridLayout>>> = Rc::new(Cell::new(None));
    let cached_ctx: Rc<RefCell<Option<CanvasRenderingContext2d>>> = Rc::new(RefCell::new(None));

    let scheduler = RenderScheduler::new(move || {
        let Some(canvas) = canvas_ref.get_untracked() else {
            return;
        };
        let canvas: &HtmlCanvasElement = &canvas;
        let Some(parent) = canvas.parent_element() else {
            return;
        };
        let css_w = parent.client_width() as f64;
        let css_h = parent.client_height() as f64;
        if css_w <= 0.0 || css_h <= 0.0 {
            return;
        }

        let dpr = web_sys::window()
            .map(|w| w.device_pixel_ratio())
            .unwrap_or(1.0)
            .max(1.0);
        let pw = (css_w * dpr).round() as u32;
        let ph = (css_h * dpr).round() as u32;
        if canvas.width() != pw || canvas.height() != ph {
            canvas.set_width(pw);
            canvas.set_height(ph);
        }

        let ctx = {
            let mut slot = cached_ctx.borrow_mut();
            if slot.is_none() {
                *slot = canvas
                    .get_context("2d")
                    .ok()
                    .flatten()
                    .and_then(|ctx| ctx.dyn_into::<CanvasRenderingContext2d>().ok());
            }
            let Some(ctx) = slot.clone() else {
                return;
            };
            ctx
        };

        board.with_untracked(|view| {
            let Some(view) = view else {
                return;
            };
            if fitted_layout.get() != Some(view.layout) {
                fitted_layout.set(Some(view.layout));
                viewport.update_untracked(|vp| fit_board(vp, view.layout, css_w, css_h));
            }

            ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0).ok();
            ctx.set_fill_style_str(BACKGROUND);
            ctx.fill_rect(0.0, 0.0, css_w, css_h);
            let vp = viewport.get_untracked();
            paint_board(&ctx, &vp, view, hovered.get_untracked());
        });
    });
    let scheduler = Rc::new(scheduler);

    let sched = scheduler.clone();
    Effect::new(move || {
        board.track();
        viewport.track();
        hovered.track();
        sched.mark_dirty();
    });

    bind_resize(scheduler.clone());

    let on_wheel = move |e: WheelEvent| {
        e.prevent_default();
        let (x, y) = (e.offset_x() as f64, e.offset_y() as f64);
        viewport.update(|vp| vp.zoom_at(e.delta_y(), x, y));
    };

    let on_pointer_down = {
        let is_dragging = is_dragging.clone();
        let drag_start = drag_start.clone();
        let last_pos = last_pos.clone();
        move |e: PointerEvent| {
            let pos = (e.client_x() as f64, e.client_y() as f64);
            is_dragging.set(true);
            drag_start.set(pos);
            last_pos.set(pos);
            if let Some(target) = e.target()
                && let Ok(el) = target.dyn_into::<web_sys::HtmlElement>()
            {
                el.set_pointer_capture(e.pointer_id()).ok();
            }
        }
    };

    let on_pointer_move = {
        let is_dragging = is_dragging.clone();
        let last_pos = last_pos.clone();
        move |e: PointerEvent| {
            if is_dragging.get() {
                let (lx, ly) = last_pos.get();
                let pos = (e.client_x() as f64, e.client_y() as f64);
                last_pos.set(pos);
                viewport.update(|vp| vp.pan(pos.0 - lx, pos.1 - ly));
                return;
            }
            let Some(layout) = board.with_untracked(|view| view.as_ref().map(|v| v.layout)) else {
                return;
            };
            let canvas = canvas_ref.get_untracked();
            let (sx, sy) = canvas_local(canvas.as_ref(), &e);
            let hit = viewport.with_untracked(|vp| hit_cell(vp, layout, sx, sy));
            if hit != hovered.get_untracked() {
                hovered.set(hit);
            }
        }
    };

    let on_pointer_up = {
        let is_dragging = is_dragging.clone();
        move |_: PointerEvent| is_dragging.set(false)
    };

    let on_pointer_leave = move |_: PointerEvent| {
        if hovered.get_untracked().is_some() {
            hovered.set(None);
        }
    };

    let on_click = {
        let drag_start = drag_start.clone();
        move |e: MouseEvent| {
            let (x0, y0) = drag_start.get();
            let moved = (e.client_x() as f64 - x0).abs().max((e.client_y() as f64 - y0).abs());
            if moved >= CLICK_SLOP_PX {
                return;
            }
            let Some(layout) = board.with_untracked(|view| view.as_ref().map(|v| v.layout)) else {
                return;
            };
            let canvas = canvas_ref.get_untracked();
            let (sx, sy) = canvas_local(canvas.as_ref(), &e);
            let Some(pos) = viewport.with_untracked(|vp| hit_cell(vp, layout, sx, sy)) else {
                return;
            };

            spawn_local(async move {
                match api::post_click(pos).await {
                    Ok(response) => {
                        if let ClickOutcome::Annexed { cell, previous_owner, .. } =
                            response.outcome
                        {
                            notice.set(Some(format!(
                                "Annexed {cell} from player {}",
                                previous_owner.0 + 1
                            )));
                        }
                    }
                    Err(e) => notice.set(Some(e)),
                }
            });
        }
    };

    view! {
        <div
            style="position: relative; width: 100%; height: 100%; overflow: hidden;"
            on:wheel=on_wheel
            on:pointerdown=on_pointer_down
            on:pointermove=on_pointer_move
            on:pointerup=on_pointer_up
            on:pointerleave=on_pointer_leave
            on:click=on_click
        >
            <canvas
                node_ref=canvas_ref
                style="position: absolute; inset: 0; width: 100%; height: 100%; touch-action: none; cursor: pointer;"
            />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fitted_board_hits_every_cell_center() {
        let layout = GridLayout::default();
        let mut vp = Viewport::default();
        fit_board(&mut vp, layout, 800.0, 600.0);

        let grid = RectGrid::new(layout);
        for pos in grid.positions() {
            let (sx, sy) = vp.to_screen(grid.center_of(pos));
            assert!((0.0..=800.0).contains(&sx));
            assert!((0.0..=600.0).contains(&sy));
            assert_eq!(hit_cell(&vp, layout, sx, sy), Some(pos));
        }
    }

    #[test]
    fn clicks_off_the_board_miss() {
        let layout = GridLayout::default();
        let mut vp = Viewport::default();
        fit_board(&mut vp, layout, 800.0, 600.0);
        assert_eq!(hit_cell(&vp, layout, 1.0, 1.0), None);
    }
}
