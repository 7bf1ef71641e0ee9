use std::time::Duration;

use eframe::egui;
use egui::{Color32, Key, Modifiers, RichText};

use crate::canvas::Canvas;
use crate::components::dialogs::ErrorDialog;
use crate::components::prompt_history::PromptHistoryWindow;
use crate::components::tools::{Tool, ToolbarAction, ToolbarState, ToolsPanel};
use crate::io::FileHandler;
use crate::ops::ai::{GeminiClient, GenerationJob, ModelChoice};
use crate::project::Project;
use crate::settings::AppSettings;

const DOCS_URL: &str = "https://ai.google.dev/gemini-api/docs/image-generation";

pub struct CoDrawApp {
    settings: AppSettings,
    /// Pen or model edits not yet written to disk.
    settings_dirty: bool,
    project: Project,
    canvas: Canvas,
    tools_panel: ToolsPanel,
    file_handler: FileHandler,
    error_dialog: ErrorDialog,
    history_window: PromptHistoryWindow,
    /// Request in flight, if any.
    job: Option<GenerationJob>,
    status: Option<String>,
}

impl CoDrawApp {
    pub fn new(cc: &eframe::CreationContext<'_>, settings: AppSettings) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        let project = Project::new(&settings);
        log_info!(
            "Session started: {}x{} canvas, model {}",
            project.canvas.width,
            project.canvas.height,
            project.model.id()
        );
        Self {
            settings,
            settings_dirty: false,
            project,
            canvas: Canvas::new(),
            tools_panel: ToolsPanel,
            file_handler: FileHandler::new(),
            error_dialog: ErrorDialog,
            history_window: PromptHistoryWindow::default(),
            job: None,
            status: None,
        }
    }

    fn submit(&mut self) {
        let Some(request) = self.project.begin_submit() else {
            return;
        };
        self.status = None;
        let job = match GeminiClient::from_settings(&self.settings) {
            Ok(client) => GenerationJob::spawn(client, request),
            Err(e) => {
                log_warn!("Generation not started: {}", e);
                GenerationJob::failed(e)
            }
        };
        self.job = Some(job);
    }

    fn poll_job(&mut self, ctx: &egui::Context) {
        let Some(result) = self.job.as_ref().and_then(|job| job.poll()) else {
            if self.job.is_some() {
                // Keep the spinner and elapsed counter moving
                ctx.request_repaint_after(Duration::from_millis(100));
            }
            return;
        };
        self.job = None;
        self.project.finish_submit(result);
        ctx.request_repaint();
    }

    fn save(&mut self) {
        let Some(path) = self.file_handler.save_dialog() else {
            return;
        };
        self.status = Some(match self.file_handler.save(&self.project.canvas.pixels, &path) {
            Ok(()) => t!("status.saved", path = path.display()),
            Err(e) => {
                log_err!("Save to {} failed: {}", path.display(), e);
                t!("status.save_failed", error = e)
            }
        });
    }

    fn handle_shortcuts(&mut self, ctx: &egui::Context) {
        if self.project.modal_open() {
            return;
        }
        if ctx.input_mut(|i| i.consume_key(Modifiers::COMMAND, Key::S)) {
            self.save();
        }

        // The prompt field keeps its own undo and plain-letter typing
        if ctx.wants_keyboard_input() {
            return;
        }
        let command_shift = Modifiers {
            shift: true,
            ..Modifiers::COMMAND
        };
        let (redo, undo, picked) = ctx.input_mut(|i| {
            let redo = i.consume_key(command_shift, Key::Z) || i.consume_key(Modifiers::COMMAND, Key::Y);
            let undo = i.consume_key(Modifiers::COMMAND, Key::Z);
            let picked = Tool::all()
                .iter()
                .copied()
                .find(|tool| i.consume_key(Modifiers::NONE, tool.shortcut()));
            (redo, undo, picked)
        });
        if redo {
            self.project.redo();
        } else if undo {
            self.project.undo();
        }
        if let Some(tool) = picked {
            self.project.tool = tool;
        }
    }

    fn show_header(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.vertical(|ui| {
                ui.heading(RichText::new(t!("app.title")).strong().size(26.0));
                ui.horizontal(|ui| {
                    ui.spacing_mut().item_spacing.x = 4.0;
                    ui.label(RichText::new(t!("app.built_with")).color(Color32::GRAY));
                    ui.hyperlink_to(t!("app.docs_link"), DOCS_URL);
                });
            });
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Max), |ui| {
                let before = self.project.model;
                egui::ComboBox::from_id_source("model_select")
                    .selected_text(self.project.model.label())
                    .show_ui(ui, |ui| {
                        for model in ModelChoice::all() {
                            ui.selectable_value(&mut self.project.model, *model, model.label());
                        }
                    })
                    .response
                    .on_hover_text(t!("app.model"));
                if self.project.model != before {
                    log_info!("Model switched to {}", self.project.model.id());
                    self.settings.model = self.project.model.id().to_string();
                    self.settings_dirty = true;
                }
            });
        });
    }

    fn show_toolbar(&mut self, ui: &mut egui::Ui) {
        let state = ToolbarState {
            can_undo: self.project.can_undo(),
            can_redo: self.project.can_redo(),
        };
        let action = self
            .tools_panel
            .show(ui, &mut self.project.tool, &mut self.project.pen, &state);
        match action {
            ToolbarAction::None => {}
            ToolbarAction::Undo => self.project.undo(),
            ToolbarAction::Redo => self.project.redo(),
            ToolbarAction::ShowPromptHistory => self.project.show_history_modal = true,
            ToolbarAction::Save => self.save(),
            ToolbarAction::Clear => {
                self.project.clear();
                self.status = None;
            }
            ToolbarAction::PenChanged => {
                self.settings.pen_color = self.project.pen.color;
                self.settings.pen_size = self.project.pen.size;
                self.settings_dirty = true;
            }
        }
    }

    fn show_prompt_bar(&mut self, ui: &mut egui::Ui) {
        let loading = self.project.is_loading();
        let mut submit = false;
        ui.horizontal(|ui| {
            let button_width = 44.0;
            let field = egui::TextEdit::singleline(&mut self.project.prompt)
                .hint_text(t!("prompt.placeholder"))
                .desired_width(ui.available_width() - button_width - ui.spacing().item_spacing.x)
                .margin(egui::vec2(12.0, 10.0));
            let response = ui.add(field);
            if response.lost_focus() && ui.input(|i| i.key_pressed(Key::Enter)) {
                submit = true;
                response.request_focus();
            }

            if loading {
                ui.add_sized([button_width, 36.0], egui::Spinner::new())
                    .on_hover_text(t!("prompt.loading"));
            } else {
                let ready = !self.project.prompt.trim().is_empty();
                let button = egui::Button::new(RichText::new("\u{27A4}").size(18.0).color(Color32::WHITE))
                    .fill(Color32::from_gray(30))
                    .rounding(18.0)
                    .min_size(egui::vec2(button_width, 36.0));
                if ui.add_enabled(ready, button).on_hover_text(t!("prompt.submit")).clicked() {
                    submit = true;
                }
            }
        });

        if let Some(job) = &self.job {
            ui.label(
                RichText::new(t!(
                    "status.generating",
                    model = self.project.model.label(),
                    secs = job.elapsed().as_secs()
                ))
                .small()
                .color(Color32::GRAY),
            );
        } else if let Some(status) = &self.status {
            ui.label(RichText::new(status).small().color(Color32::GRAY));
        }

        if submit {
            self.submit();
        }
    }

    /// Write pen/model edits once the pointer is released, not on every
    /// slider tick.
    fn flush_settings(&mut self, ctx: &egui::Context) {
        if self.settings_dirty && !ctx.input(|i| i.pointer.any_down()) {
            self.settings_dirty = false;
            self.settings.save();
        }
    }
}

impl eframe::App for CoDrawApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Deliver finished generations before anything reads the canvas ---
        self.poll_job(ctx);
        self.handle_shortcuts(ctx);

        egui::TopBottomPanel::top("header")
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(24.0, 16.0)).fill(ctx.style().visuals.panel_fill))
            .show(ctx, |ui| self.show_header(ui));

        egui::TopBottomPanel::top("toolbar")
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(24.0, 8.0)).fill(ctx.style().visuals.panel_fill))
            .show(ctx, |ui| self.show_toolbar(ui));

        egui::TopBottomPanel::bottom("prompt_bar")
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(24.0, 12.0)).fill(ctx.style().visuals.panel_fill))
            .show(ctx, |ui| self.show_prompt_bar(ui));

        let input_enabled = !self.project.modal_open();
        egui::CentralPanel::default()
            .frame(egui::Frame::none().inner_margin(egui::Margin::symmetric(24.0, 8.0)).fill(ctx.style().visuals.panel_fill))
            .show(ctx, |ui| {
                ui.vertical_centered(|ui| {
                    let events = self.canvas.show(ui, &mut self.project.canvas, input_enabled);
                    for event in events {
                        self.project.pointer(event);
                    }
                });
            });

        // --- Modals ---
        self.error_dialog.show(ctx, &mut self.project.error);
        if let Some(id) = self.history_window.show(
            ctx,
            &self.project.prompt_history,
            &mut self.project.show_history_modal,
        ) {
            self.project.restore_from_history(id);
        }

        self.flush_settings(ctx);
    }
}
