use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use eframe::egui;
use egui::{Color32, RichText, TextureHandle, TextureOptions};
use uuid::Uuid;

use super::dialogs::{DialogColors, paint_dialog_header, paint_modal_backdrop};

/// One successful generation: what was asked and what came back.
#[derive(Clone, Debug)]
pub struct PromptEntry {
    pub id: Uuid,
    pub prompt: String,
    /// Encoded image exactly as returned by the model.
    pub image: Vec<u8>,
    /// Unix seconds.
    pub created: u64,
}

/// Append-only list of generations, oldest first.
#[derive(Default)]
pub struct PromptHistory {
    entries: Vec<PromptEntry>,
}

impl PromptHistory {
    pub fn push(&mut self, prompt: String, image: Vec<u8>) -> Uuid {
        let id = Uuid::new_v4();
        let created = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.entries.push(PromptEntry {
            id,
            prompt,
            image,
            created,
        });
        id
    }

    pub fn entries(&self) -> &[PromptEntry] {
        &self.entries
    }

    pub fn get(&self, id: Uuid) -> Option<&PromptEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// PROMPT HISTORY WINDOW
// ============================================================================

const THUMB_WIDTH: f32 = 220.0;

/// Modal grid of past generations with a Restore button each.
#[derive(Default)]
pub struct PromptHistoryWindow {
    thumbnails: HashMap<Uuid, Option<TextureHandle>>,
}

impl PromptHistoryWindow {
    /// Returns the id of the entry to restore, if one was clicked.
    pub fn show(&mut self, ctx: &egui::Context, history: &PromptHistory, open: &mut bool) -> Option<Uuid> {
        if !*open {
            return None;
        }
        let mut restore = None;
        let mut close = ctx.input_mut(|i| i.consume_key(egui::Modifiers::NONE, egui::Key::Escape));

        paint_modal_backdrop(ctx);
        let screen = ctx.screen_rect();
        egui::Window::new("prompt_history_window")
            .title_bar(false)
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .fixed_size([(screen.width() - 64.0).clamp(280.0, 960.0), screen.height() * 0.8])
            .show(ctx, |ui| {
                let colors = DialogColors::from_ctx(ctx);
                ui.horizontal(|ui| {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("\u{2715}").on_hover_text(t!("common.close")).clicked() {
                            close = true;
                        }
                        paint_dialog_header(ui, &colors, "\u{1F553}", &t!("history.title"));
                    });
                });
                ui.add_space(6.0);

                if history.is_empty() {
                    ui.add_space(40.0);
                    ui.vertical_centered(|ui| {
                        ui.label(RichText::new(t!("history.empty")).color(Color32::GRAY));
                    });
                    return;
                }

                egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
                    ui.horizontal_wrapped(|ui| {
                        for entry in history.entries() {
                            if self.entry_card(ui, entry) {
                                restore = Some(entry.id);
                            }
                        }
                    });
                });
            });

        if close || restore.is_some() {
            *open = false;
        }
        restore
    }

    fn entry_card(&mut self, ui: &mut egui::Ui, entry: &PromptEntry) -> bool {
        let mut clicked = false;
        egui::Frame::group(ui.style())
            .fill(ui.visuals().faint_bg_color)
            .show(ui, |ui| {
                ui.set_width(THUMB_WIDTH);
                ui.vertical(|ui| {
                    if let Some(tex) = self.thumbnail(ui.ctx(), entry) {
                        let [w, h] = tex.size();
                        let scale = THUMB_WIDTH / w.max(1) as f32;
                        ui.image((tex.id(), egui::vec2(THUMB_WIDTH, h as f32 * scale)));
                    }
                    ui.label(RichText::new(format!("\"{}\"", entry.prompt)).monospace().small());
                    let restore = egui::Button::new(RichText::new(t!("history.restore")).color(Color32::WHITE))
                        .fill(Color32::from_rgb(59, 130, 246))
                        .min_size(egui::vec2(THUMB_WIDTH, 28.0));
                    if ui.add(restore).clicked() {
                        clicked = true;
                    }
                });
            });
        clicked
    }

    /// Decode once and cache; undecodable images get no thumbnail.
    fn thumbnail(&mut self, ctx: &egui::Context, entry: &PromptEntry) -> Option<&TextureHandle> {
        self.thumbnails
            .entry(entry.id)
            .or_insert_with(|| match crate::io::decode_image(&entry.image) {
                Ok(img) => {
                    let tw = THUMB_WIDTH as u32 * 2;
                    let th = ((img.height() as f32 * tw as f32 / img.width().max(1) as f32).round() as u32).max(1);
                    let thumb = image::imageops::thumbnail(&img, tw, th);
                    let color = egui::ColorImage::from_rgba_unmultiplied(
                        [thumb.width() as usize, thumb.height() as usize],
                        thumb.as_raw(),
                    );
                    Some(ctx.load_texture(format!("prompt_thumb_{}", entry.id), color, TextureOptions::LINEAR))
                }
                Err(e) => {
                    log_warn!("Prompt history thumbnail for {} failed: {}", entry.id, e);
                    None
                }
            })
            .as_ref()
    }
}
