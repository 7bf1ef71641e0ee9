use eframe::egui;
use egui::{
    Color32, ColorImage, Pos2, Rect, Sense, Stroke, TextureHandle, TextureId, TextureOptions, Vec2,
};
use image::{Rgba, RgbaImage};

use crate::io::{self, IoError};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

// ============================================================================
// CANVAS STATE: pixels plus the generated background they sit on
// ============================================================================

pub struct CanvasState {
    pub width: u32,
    pub height: u32,
    pub pixels: RgbaImage,
    /// Last generated image, stretched to fill the canvas under new strokes.
    pub background: Option<RgbaImage>,
    dirty: bool,
    texture: Option<TextureHandle>,
}

impl CanvasState {
    pub fn new(width: u32, height: u32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            pixels: RgbaImage::from_pixel(width, height, WHITE),
            background: None,
            dirty: true,
            texture: None,
        }
    }

    /// Fill with opaque white.
    pub fn initialize(&mut self) {
        self.pixels = RgbaImage::from_pixel(self.width, self.height, WHITE);
        self.mark_dirty();
    }

    /// White, then the background scaled to exactly cover the canvas.
    pub fn redraw_background(&mut self) {
        match &self.background {
            Some(bg) => self.pixels = io::fit_onto_white(bg, self.width, self.height),
            None => self.pixels = RgbaImage::from_pixel(self.width, self.height, WHITE),
        }
        self.mark_dirty();
    }

    pub fn set_background(&mut self, image: RgbaImage) {
        self.background = Some(image);
        self.redraw_background();
    }

    pub fn clear_background(&mut self) {
        self.background = None;
        self.initialize();
    }

    /// Replace pixels with a stored snapshot, rescaling on size mismatch.
    pub fn restore_pixels(&mut self, image: RgbaImage) {
        self.pixels = if image.dimensions() == (self.width, self.height) {
            image
        } else {
            io::fit_onto_white(&image, self.width, self.height)
        };
        self.mark_dirty();
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, IoError> {
        io::encode_png(&self.pixels)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Upload pixels to the GPU if they changed since the last frame.
    pub fn texture_id(&mut self, ctx: &egui::Context) -> TextureId {
        if !self.dirty
            && let Some(tex) = &self.texture
        {
            return tex.id();
        }
        let options = TextureOptions::LINEAR;
        let image = ColorImage::from_rgba_unmultiplied(
            [self.width as usize, self.height as usize],
            self.pixels.as_raw(),
        );
        self.dirty = false;
        match &mut self.texture {
            Some(tex) => {
                tex.set(image, options);
                tex.id()
            }
            None => {
                let tex = ctx.load_texture("codraw_canvas", image, options);
                let id = tex.id();
                self.texture = Some(tex);
                id
            }
        }
    }
}

// ============================================================================
// CANVAS VIEW: draws the canvas and turns pointer input into canvas events
// ============================================================================

/// Pointer input in canvas pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down((f32, f32)),
    Move((f32, f32)),
    Up,
}

#[derive(Default)]
pub struct Canvas {
    /// True between a press on the canvas and its release/exit.
    captured: bool,
}

impl Canvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paint the canvas filling the available width and collect pointer
    /// events. `input_enabled = false` while a modal covers the page.
    pub fn show(&mut self, ui: &mut egui::Ui, state: &mut CanvasState, input_enabled: bool) -> Vec<PointerEvent> {
        let size = fit_size(ui.available_size(), state.width, state.height);
        let (rect, response) = ui.allocate_exact_size(size, Sense::drag());

        let texture_id = state.texture_id(ui.ctx());
        let painter = ui.painter_at(rect.expand(2.0));
        painter.image(
            texture_id,
            rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );
        painter.rect_stroke(rect, 0.0, Stroke::new(2.0, Color32::BLACK));

        if response.hovered() {
            ui.ctx().set_cursor_icon(egui::CursorIcon::Crosshair);
        }

        let mut events = Vec::new();
        if !input_enabled {
            if self.captured {
                self.captured = false;
                events.push(PointerEvent::Up);
            }
            return events;
        }

        let (pressed, down, released, moving, pos) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_down(),
                i.pointer.primary_released(),
                i.pointer.is_moving(),
                i.pointer.interact_pos(),
            )
        });
        let to_canvas = |p: Pos2| screen_to_canvas(p, rect, state.width, state.height);

        if pressed && response.hovered() && let Some(p) = pos {
            self.captured = true;
            events.push(PointerEvent::Down(to_canvas(p)));
        } else if self.captured {
            match pos {
                // Leaving the canvas ends the stroke, like releasing
                Some(p) if !rect.contains(p) => {
                    self.captured = false;
                    events.push(PointerEvent::Up);
                }
                Some(p) if down && moving => events.push(PointerEvent::Move(to_canvas(p))),
                _ => {}
            }
            if self.captured && (released || !down) {
                self.captured = false;
                events.push(PointerEvent::Up);
            }
        }
        events
    }
}

/// Largest size with the canvas aspect ratio that fits `available`.
pub fn fit_size(available: Vec2, width: u32, height: u32) -> Vec2 {
    let aspect = width as f32 / height.max(1) as f32;
    let mut w = available.x.max(1.0);
    let mut h = w / aspect;
    if available.y > 0.0 && h > available.y {
        h = available.y.max(1.0);
        w = h * aspect;
    }
    Vec2::new(w, h)
}

/// Map a screen position inside `rect` onto canvas pixels.
pub fn screen_to_canvas(pos: Pos2, rect: Rect, width: u32, height: u32) -> (f32, f32) {
    let scale_x = width as f32 / rect.width().max(1.0);
    let scale_y = height as f32 / rect.height().max(1.0);
    ((pos.x - rect.min.x) * scale_x, (pos.y - rect.min.y) * scale_y)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_canvas_is_white() {
        let c = CanvasState::new(8, 4);
        assert_eq!(c.pixels.dimensions(), (8, 4));
        assert!(c.pixels.pixels().all(|p| *p == WHITE));
        assert!(c.dirty);
    }

    #[test]
    fn background_is_stretched_to_canvas() {
        let mut c = CanvasState::new(10, 6);
        c.set_background(RgbaImage::from_pixel(5, 3, Rgba([0, 0, 255, 255])));
        assert_eq!(*c.pixels.get_pixel(9, 5), Rgba([0, 0, 255, 255]));
        c.clear_background();
        assert!(c.background.is_none());
        assert_eq!(*c.pixels.get_pixel(9, 5), WHITE);
    }

    #[test]
    fn redraw_drops_strokes_but_keeps_background() {
        let mut c = CanvasState::new(4, 4);
        c.set_background(RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255])));
        c.pixels.put_pixel(0, 0, Rgba([0, 0, 0, 255]));
        c.redraw_background();
        assert_eq!(*c.pixels.get_pixel(0, 0), Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn restore_rescales_mismatched_snapshots() {
        let mut c = CanvasState::new(6, 6);
        c.restore_pixels(RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255])));
        assert_eq!(c.pixels.dimensions(), (6, 6));
        assert_eq!(*c.pixels.get_pixel(5, 5), Rgba([9, 9, 9, 255]));
    }

    #[test]
    fn pointer_mapping_accounts_for_display_scale() {
        let rect = Rect::from_min_size(Pos2::new(100.0, 50.0), Vec2::new(480.0, 270.0));
        let (x, y) = screen_to_canvas(Pos2::new(340.0, 185.0), rect, 960, 540);
        assert!((x - 480.0).abs() < 1e-3);
        assert!((y - 270.0).abs() < 1e-3);
    }

    // 400×100 screen; a 20×10 canvas fits as 200×100 at the origin.
    fn run_frame(
        ctx: &egui::Context,
        view: &mut Canvas,
        state: &mut CanvasState,
        input_enabled: bool,
        events: Vec<egui::Event>,
    ) -> Vec<PointerEvent> {
        let input = egui::RawInput {
            screen_rect: Some(Rect::from_min_size(Pos2::ZERO, Vec2::new(400.0, 100.0))),
            events,
            ..Default::default()
        };
        let mut out = Vec::new();
        let _ = ctx.run(input, |ctx| {
            egui::CentralPanel::default()
                .frame(egui::Frame::none())
                .show(ctx, |ui| out = view.show(ui, state, input_enabled));
        });
        out
    }

    fn button(x: f32, y: f32, pressed: bool) -> Vec<egui::Event> {
        vec![
            egui::Event::PointerMoved(Pos2::new(x, y)),
            egui::Event::PointerButton {
                pos: Pos2::new(x, y),
                button: egui::PointerButton::Primary,
                pressed,
                modifiers: egui::Modifiers::NONE,
            },
        ]
    }

    fn setup() -> (egui::Context, Canvas, CanvasState) {
        let ctx = egui::Context::default();
        let mut view = Canvas::new();
        let mut state = CanvasState::new(20, 10);
        run_frame(&ctx, &mut view, &mut state, true, Vec::new());
        (ctx, view, state)
    }

    fn assert_down_at(events: &[PointerEvent], x: f32, y: f32) {
        match events {
            [PointerEvent::Down((px, py))] => {
                assert!((px - x).abs() < 1e-3 && (py - y).abs() < 1e-3, "down at ({px}, {py})");
            }
            other => panic!("expected a single Down, got {:?}", other),
        }
    }

    #[test]
    fn press_inside_maps_to_canvas_pixels() {
        let (ctx, mut view, mut state) = setup();
        let events = run_frame(&ctx, &mut view, &mut state, true, button(50.0, 50.0, true));
        assert_down_at(&events, 5.0, 5.0);
    }

    #[test]
    fn leaving_the_canvas_ends_the_stroke_once() {
        let (ctx, mut view, mut state) = setup();
        assert_down_at(&run_frame(&ctx, &mut view, &mut state, true, button(50.0, 50.0, true)), 5.0, 5.0);

        let left = run_frame(
            &ctx,
            &mut view,
            &mut state,
            true,
            vec![egui::Event::PointerMoved(Pos2::new(300.0, 50.0))],
        );
        assert_eq!(left, vec![PointerEvent::Up]);

        let released = run_frame(&ctx, &mut view, &mut state, true, button(300.0, 50.0, false));
        assert!(released.is_empty());
    }

    #[test]
    fn release_inside_ends_the_stroke() {
        let (ctx, mut view, mut state) = setup();
        run_frame(&ctx, &mut view, &mut state, true, button(50.0, 50.0, true));
        let released = run_frame(&ctx, &mut view, &mut state, true, button(60.0, 50.0, false));
        assert_eq!(released, vec![PointerEvent::Up]);
    }

    #[test]
    fn disabling_input_mid_stroke_emits_up() {
        let (ctx, mut view, mut state) = setup();
        run_frame(&ctx, &mut view, &mut state, true, button(50.0, 50.0, true));
        assert_eq!(run_frame(&ctx, &mut view, &mut state, false, Vec::new()), vec![PointerEvent::Up]);
        assert!(run_frame(&ctx, &mut view, &mut state, false, Vec::new()).is_empty());
    }

    #[test]
    fn press_outside_the_canvas_is_ignored() {
        let (ctx, mut view, mut state) = setup();
        assert!(run_frame(&ctx, &mut view, &mut state, true, button(300.0, 50.0, true)).is_empty());
    }

    #[test]
    fn fit_keeps_aspect_ratio() {
        let s = fit_size(Vec2::new(1920.0, 2000.0), 960, 540);
        assert!((s.x - 1920.0).abs() < 1e-3 && (s.y - 1080.0).abs() < 1e-3);
        let s = fit_size(Vec2::new(1920.0, 540.0), 960, 540);
        assert!((s.x - 960.0).abs() < 1e-3 && (s.y - 540.0).abs() < 1e-3);
    }
}
