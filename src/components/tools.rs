use eframe::egui;
use egui::{Color32, RichText};
use image::{Rgba, RgbaImage};

use crate::canvas::CanvasState;
use crate::ops::shapes::{self, PlacedShape, ShapeKind};

pub const MIN_PEN_SIZE: f32 = 1.0;
pub const MAX_PEN_SIZE: f32 = 50.0;

const ERASER_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Tool {
    #[default]
    Pencil,
    Eraser,
    Line,
    Rectangle,
    Circle,
}

impl Tool {
    pub fn all() -> &'static [Tool] {
        &[Tool::Pencil, Tool::Eraser, Tool::Line, Tool::Rectangle, Tool::Circle]
    }

    pub fn label(&self) -> String {
        match self {
            Tool::Pencil => t!("tool.pencil"),
            Tool::Eraser => t!("tool.eraser"),
            Tool::Line => t!("tool.line"),
            Tool::Rectangle => t!("tool.rectangle"),
            Tool::Circle => t!("tool.circle"),
        }
    }

    /// Glyph drawn on the toolbar button.
    pub fn glyph(&self) -> &'static str {
        match self {
            Tool::Pencil => "\u{270F}",
            Tool::Eraser => "\u{232B}",
            Tool::Line => "\u{2014}",
            Tool::Rectangle => "\u{25A1}",
            Tool::Circle => "\u{25CB}",
        }
    }

    /// Single-key shortcut (active while the prompt field is not focused).
    pub fn shortcut(&self) -> egui::Key {
        match self {
            Tool::Pencil => egui::Key::P,
            Tool::Eraser => egui::Key::E,
            Tool::Line => egui::Key::L,
            Tool::Rectangle => egui::Key::R,
            Tool::Circle => egui::Key::C,
        }
    }

    /// Shape tools redraw from a snapshot on every move; freehand tools don't.
    pub fn shape_kind(&self) -> Option<ShapeKind> {
        match self {
            Tool::Line => Some(ShapeKind::Line),
            Tool::Rectangle => Some(ShapeKind::Rectangle),
            Tool::Circle => Some(ShapeKind::Ellipse),
            Tool::Pencil | Tool::Eraser => None,
        }
    }
}

/// Pen color and stroke width shared by every tool.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PenSettings {
    pub color: [u8; 3],
    pub size: f32,
}

impl Default for PenSettings {
    fn default() -> Self {
        Self {
            color: [0, 0, 0],
            size: 5.0,
        }
    }
}

impl PenSettings {
    pub fn new(color: [u8; 3], size: f32) -> Self {
        Self {
            color,
            size: size.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE),
        }
    }

    /// The eraser paints the canvas background colour.
    pub fn stroke_color(&self, tool: Tool) -> Rgba<u8> {
        match tool {
            Tool::Eraser => ERASER_COLOR,
            _ => Rgba([self.color[0], self.color[1], self.color[2], 255]),
        }
    }
}

// ============================================================================
// STROKE SESSION: pointer-driven drawing state machine
// ============================================================================

/// One press-drag-release gesture on the canvas.
#[derive(Default)]
pub enum StrokeSession {
    #[default]
    Idle,
    Drawing {
        tool: Tool,
        start: (f32, f32),
        last: (f32, f32),
        /// Canvas pixels at press time; shape tools redraw on top of this.
        snapshot: Option<RgbaImage>,
    },
}

impl StrokeSession {
    pub fn is_drawing(&self) -> bool {
        matches!(self, StrokeSession::Drawing { .. })
    }

    /// Pointer pressed on the canvas.
    pub fn begin(&mut self, tool: Tool, pos: (f32, f32), pen: &PenSettings, canvas: &mut CanvasState) {
        let snapshot = match tool.shape_kind() {
            Some(_) => Some(canvas.pixels.clone()),
            None => {
                shapes::stamp_segment(&mut canvas.pixels, pos, pos, pen.stroke_color(tool), pen.size);
                canvas.mark_dirty();
                None
            }
        };
        *self = StrokeSession::Drawing {
            tool,
            start: pos,
            last: pos,
            snapshot,
        };
    }

    /// Pointer moved while pressed. Ignored when idle.
    pub fn update(&mut self, pos: (f32, f32), pen: &PenSettings, canvas: &mut CanvasState) {
        let StrokeSession::Drawing {
            tool,
            start,
            last,
            snapshot,
        } = self
        else {
            return;
        };
        let color = pen.stroke_color(*tool);
        match (tool.shape_kind(), snapshot.as_ref()) {
            (Some(kind), Some(before)) => {
                canvas.pixels.clone_from(before);
                PlacedShape {
                    kind,
                    start: *start,
                    end: pos,
                    color,
                    stroke_width: pen.size,
                }
                .draw(&mut canvas.pixels);
            }
            _ => shapes::stamp_segment(&mut canvas.pixels, *last, pos, color, pen.size),
        }
        *last = pos;
        canvas.mark_dirty();
    }

    /// Pointer released or left the canvas. Returns `true` when a stroke was
    /// in progress and the caller should record a history snapshot.
    pub fn end(&mut self) -> bool {
        let was_drawing = self.is_drawing();
        *self = StrokeSession::Idle;
        was_drawing
    }

    /// Abort the gesture, putting back the pre-press pixels for shape tools.
    pub fn cancel(&mut self, canvas: &mut CanvasState) {
        if let StrokeSession::Drawing {
            snapshot: Some(before),
            ..
        } = std::mem::take(self)
        {
            canvas.pixels = before;
            canvas.mark_dirty();
        }
    }
}

// ============================================================================
// TOOLBAR
// ============================================================================

/// What the toolbar asked for this frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolbarAction {
    None,
    Undo,
    Redo,
    ShowPromptHistory,
    Save,
    Clear,
    /// Pen colour or size was edited (settings should be persisted).
    PenChanged,
}

/// Button enablement the toolbar needs from the session.
pub struct ToolbarState {
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Default)]
pub struct ToolsPanel;

impl ToolsPanel {
    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        tool: &mut Tool,
        pen: &mut PenSettings,
        state: &ToolbarState,
    ) -> ToolbarAction {
        let mut action = ToolbarAction::None;
        ui.horizontal_wrapped(|ui| {
            ui.spacing_mut().item_spacing = egui::vec2(6.0, 6.0);

            for candidate in Tool::all() {
                let active = *tool == *candidate;
                if tool_button(ui, candidate.glyph(), &candidate.label(), active, true).clicked() {
                    *tool = *candidate;
                }
            }

            ui.separator();

            let mut color = Color32::from_rgb(pen.color[0], pen.color[1], pen.color[2]);
            let picker = egui::color_picker::color_edit_button_srgba(
                ui,
                &mut color,
                egui::color_picker::Alpha::Opaque,
            )
            .on_hover_text(t!("toolbar.pen_color"));
            if picker.changed() {
                pen.color = [color.r(), color.g(), color.b()];
                action = ToolbarAction::PenChanged;
            }

            let slider = ui.add(
                egui::Slider::new(&mut pen.size, MIN_PEN_SIZE..=MAX_PEN_SIZE)
                    .step_by(1.0)
                    .show_value(false),
            );
            ui.label(RichText::new(t!("toolbar.size_px", size = pen.size as u32)).monospace());
            if slider.changed() {
                action = ToolbarAction::PenChanged;
            }

            ui.separator();

            if tool_button(ui, "\u{21B6}", &t!("toolbar.undo"), false, state.can_undo).clicked() {
                action = ToolbarAction::Undo;
            }
            if tool_button(ui, "\u{21B7}", &t!("toolbar.redo"), false, state.can_redo).clicked() {
                action = ToolbarAction::Redo;
            }
            if tool_button(ui, "\u{1F552}", &t!("toolbar.prompt_history"), false, true).clicked() {
                action = ToolbarAction::ShowPromptHistory;
            }
            if tool_button(ui, "\u{1F4BE}", &t!("toolbar.save"), false, true).clicked() {
                action = ToolbarAction::Save;
            }
            if tool_button(ui, "\u{1F5D1}", &t!("toolbar.clear"), false, true).clicked() {
                action = ToolbarAction::Clear;
            }
        });
        action
    }
}

/// Round icon button with the label as tooltip, highlighted when active.
fn tool_button(ui: &mut egui::Ui, glyph: &str, label: &str, active: bool, enabled: bool) -> egui::Response {
    let (fill, text) = if active {
        (Color32::from_rgb(59, 130, 246), Color32::WHITE)
    } else {
        (ui.visuals().widgets.inactive.weak_bg_fill, ui.visuals().text_color())
    };
    let button = egui::Button::new(RichText::new(glyph).size(18.0).color(text))
        .fill(fill)
        .rounding(18.0)
        .min_size(egui::vec2(36.0, 36.0));
    ui.add_enabled(enabled, button).on_hover_text(label)
}
