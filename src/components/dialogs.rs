use eframe::egui;
use egui::{Color32, Pos2, Rect, Rounding, Sense, Vec2};

// ============================================================================
// Shared modal chrome
// ============================================================================

pub(crate) struct DialogColors {
    pub accent: Color32,
    pub accent_faint: Color32,
    pub text: Color32,
    pub text_muted: Color32,
}

impl DialogColors {
    pub(crate) fn from_ctx(ctx: &egui::Context) -> Self {
        let v = ctx.style().visuals.clone();
        let accent = v.selection.stroke.color;
        let alpha = if v.dark_mode { 35 } else { 25 };
        // Dark mode: boost muted text so labels stay readable
        let text_muted = if v.dark_mode {
            Color32::from_gray(160)
        } else {
            v.weak_text_color()
        };
        Self {
            accent,
            accent_faint: Color32::from_rgba_unmultiplied(accent.r(), accent.g(), accent.b(), alpha),
            text: v.text_color(),
            text_muted,
        }
    }
}

/// Dim everything behind a modal. Sits above the panels, below windows.
pub fn paint_modal_backdrop(ctx: &egui::Context) {
    let layer = egui::LayerId::new(egui::Order::PanelResizeLine, egui::Id::new("codraw_modal_backdrop"));
    ctx.layer_painter(layer)
        .rect_filled(ctx.screen_rect(), 0.0, Color32::from_black_alpha(128));
}

/// Accent header bar with icon and title.
pub(crate) fn paint_dialog_header(ui: &mut egui::Ui, colors: &DialogColors, icon: &str, title: &str) {
    let header_height = 32.0;
    let (rect, _) = ui.allocate_exact_size(Vec2::new(ui.available_width(), header_height), Sense::hover());

    let painter = ui.painter();
    painter.rect_filled(rect, Rounding::ZERO, colors.accent_faint);
    painter.rect_filled(
        Rect::from_min_size(rect.min, Vec2::new(3.0, header_height)),
        Rounding::ZERO,
        colors.accent,
    );
    painter.text(
        Pos2::new(rect.min.x + 12.0, rect.center().y),
        egui::Align2::LEFT_CENTER,
        format!("{} {}", icon, title),
        egui::FontId::proportional(15.0),
        colors.text,
    );
}

pub(crate) fn accent_separator(ui: &mut egui::Ui, colors: &DialogColors) {
    let (rect, _) = ui.allocate_exact_size(Vec2::new(ui.available_width(), 1.0), Sense::hover());
    ui.painter().rect_filled(rect, 0.0, colors.accent_faint);
}

// ============================================================================
// ERROR DIALOG
// ============================================================================

/// "Failed to generate" modal. Open while `message` is `Some`; closing
/// clears it.
#[derive(Default)]
pub struct ErrorDialog;

impl ErrorDialog {
    pub fn show(&mut self, ctx: &egui::Context, message: &mut Option<String>) {
        let Some(text) = message.as_deref() else {
            return;
        };
        let mut close = ctx.input_mut(|i| {
            i.consume_key(egui::Modifiers::NONE, egui::Key::Escape)
                || i.consume_key(egui::Modifiers::NONE, egui::Key::Enter)
        });

        paint_modal_backdrop(ctx);
        egui::Window::new("error_dialog_internal")
            .title_bar(false)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                ui.set_min_width(360.0);
                ui.set_max_width(480.0);

                let colors = DialogColors::from_ctx(ctx);
                paint_dialog_header(ui, &colors, "\u{26A0}", &t!("error.title"));
                ui.add_space(8.0);
                ui.label(egui::RichText::new(text).color(colors.text_muted));
                ui.add_space(8.0);
                accent_separator(ui, &colors);
                ui.add_space(6.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button(t!("common.close")).clicked() {
                        close = true;
                    }
                });
            });

        if close {
            *message = None;
        }
    }
}
