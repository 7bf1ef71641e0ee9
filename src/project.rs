use uuid::Uuid;

use crate::canvas::{CanvasState, PointerEvent};
use crate::components::history::{CanvasSnapshot, SnapshotHistory};
use crate::components::prompt_history::PromptHistory;
use crate::components::tools::{PenSettings, StrokeSession, Tool};
use crate::io::IoError;
use crate::ops::ai::{self, GenerationRequest, GenerationResult, ModelChoice};
use crate::settings::AppSettings;

/// One drawing session: the canvas, its undo trail and the generation
/// state around it. Holds no UI handles so the whole flow is testable.
pub struct Project {
    pub canvas: CanvasState,
    pub history: SnapshotHistory,
    pub tool: Tool,
    pub pen: PenSettings,
    stroke: StrokeSession,

    /// Instruction typed in the prompt bar.
    pub prompt: String,
    pub model: ModelChoice,
    pub prompt_suffix: String,
    pub prompt_history: PromptHistory,

    /// Bytes of the image currently used as background, as returned.
    generated_image: Option<Vec<u8>>,
    is_loading: bool,
    /// Message shown in the error modal; `Some` means the modal is open.
    pub error: Option<String>,
    pub show_history_modal: bool,
}

impl Project {
    pub fn new(settings: &AppSettings) -> Self {
        let mut project = Self {
            canvas: CanvasState::new(settings.canvas_width, settings.canvas_height),
            history: SnapshotHistory::new(settings.max_undo_steps),
            tool: Tool::default(),
            pen: PenSettings::new(settings.pen_color, settings.pen_size),
            stroke: StrokeSession::default(),
            prompt: String::new(),
            model: ModelChoice::from_id(&settings.model).unwrap_or_default(),
            prompt_suffix: settings.prompt_suffix.clone(),
            prompt_history: PromptHistory::default(),
            generated_image: None,
            is_loading: false,
            error: None,
            show_history_modal: false,
        };
        project.reset_history();
        project
    }

    /// Any modal covers the page and blocks canvas input.
    pub fn modal_open(&self) -> bool {
        self.error.is_some() || self.show_history_modal
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn generated_image(&self) -> Option<&[u8]> {
        self.generated_image.as_deref()
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    pub fn pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down(pos) => self.stroke.begin(self.tool, pos, &self.pen, &mut self.canvas),
            PointerEvent::Move(pos) => self.stroke.update(pos, &self.pen, &mut self.canvas),
            PointerEvent::Up => {
                if self.stroke.end() {
                    self.commit_snapshot();
                }
            }
        }
    }

    fn commit_snapshot(&mut self) {
        match CanvasSnapshot::capture(&self.canvas.pixels) {
            Ok(snapshot) => self.history.push(snapshot),
            Err(e) => log_err!("Could not record undo snapshot: {}", e),
        }
    }

    /// Start the undo trail over from whatever is on the canvas now.
    fn reset_history(&mut self) {
        match CanvasSnapshot::capture(&self.canvas.pixels) {
            Ok(snapshot) => self.history.reset(snapshot),
            Err(e) => log_err!("Could not record initial snapshot: {}", e),
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) {
        self.stroke.cancel(&mut self.canvas);
        let Some(snapshot) = self.history.undo() else {
            return;
        };
        match snapshot.decode() {
            Ok(pixels) => self.canvas.restore_pixels(pixels),
            Err(e) => log_err!("Undo snapshot could not be decoded: {}", e),
        }
    }

    pub fn redo(&mut self) {
        self.stroke.cancel(&mut self.canvas);
        let Some(snapshot) = self.history.redo() else {
            return;
        };
        match snapshot.decode() {
            Ok(pixels) => self.canvas.restore_pixels(pixels),
            Err(e) => log_err!("Redo snapshot could not be decoded: {}", e),
        }
    }

    /// Blank white canvas, no background, fresh undo trail.
    pub fn clear(&mut self) {
        self.stroke.cancel(&mut self.canvas);
        self.generated_image = None;
        self.canvas.clear_background();
        self.reset_history();
    }

    /// Make `bytes` the new background. Strokes on top are discarded and
    /// the undo trail restarts from the result.
    pub fn set_generated_image(&mut self, bytes: Vec<u8>) -> Result<(), IoError> {
        let image = crate::io::decode_image(&bytes)?;
        self.stroke.cancel(&mut self.canvas);
        self.canvas.set_background(image);
        self.generated_image = Some(bytes);
        self.reset_history();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Build the request for the current canvas and prompt. `None` while a
    /// request is already pending or the prompt is blank.
    pub fn begin_submit(&mut self) -> Option<GenerationRequest> {
        if self.is_loading || self.prompt.trim().is_empty() {
            return None;
        }
        let image_png = match self.canvas.encode_png() {
            Ok(png) => png,
            Err(e) => {
                log_err!("Could not encode canvas for generation: {}", e);
                self.error = Some(e.to_string());
                return None;
            }
        };
        self.is_loading = true;
        log_info!("Submitting prompt to {}: {:?}", self.model.id(), self.prompt);
        Some(GenerationRequest {
            model: self.model.id().to_string(),
            prompt: self.prompt.trim().to_string(),
            prompt_suffix: self.prompt_suffix.clone(),
            image_png,
        })
    }

    pub fn finish_submit(&mut self, result: GenerationResult) {
        self.is_loading = false;
        match result {
            Ok(outcome) => {
                if let Err(e) = self.set_generated_image(outcome.image.clone()) {
                    log_err!("Generated image could not be shown: {}", e);
                    self.error = Some(ai::parse_error(&e.to_string()));
                    return;
                }
                self.prompt_history.push(outcome.prompt, outcome.image);
                self.prompt.clear();
            }
            Err(e) => {
                let message = ai::parse_error(&e.to_string());
                self.error = Some(if message.trim().is_empty() {
                    t!("error.unexpected")
                } else {
                    message
                });
            }
        }
    }

    /// Bring back a past generation as the background.
    pub fn restore_from_history(&mut self, id: Uuid) {
        let Some(image) = self.prompt_history.get(id).map(|e| e.image.clone()) else {
            return;
        };
        self.show_history_modal = false;
        if let Err(e) = self.set_generated_image(image) {
            log_err!("Prompt history entry {} could not be restored: {}", id, e);
            self.error = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::ai::{GenerateError, GenerationOutcome};
    use image::{Rgba, RgbaImage};

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    fn project() -> Project {
        let settings = AppSettings {
            canvas_width: 60,
            canvas_height: 40,
            max_undo_steps: 20,
            ..AppSettings::default()
        };
        Project::new(&settings)
    }

    /// Horizontal pencil stroke across row `y`.
    fn stroke(p: &mut Project, y: f32) {
        p.pointer(PointerEvent::Down((5.0, y)));
        p.pointer(PointerEvent::Move((55.0, y)));
        p.pointer(PointerEvent::Up);
    }

    fn ink_at(p: &Project, y: u32) -> bool {
        *p.canvas.pixels.get_pixel(30, y) != WHITE
    }

    fn png(color: [u8; 4]) -> Vec<u8> {
        crate::io::encode_png(&RgbaImage::from_pixel(6, 4, Rgba(color))).unwrap()
    }

    fn outcome(prompt: &str, image: Vec<u8>) -> GenerationOutcome {
        GenerationOutcome {
            prompt: prompt.to_string(),
            image,
            mime_type: "image/png".to_string(),
            text: None,
        }
    }

    #[test]
    fn starts_blank_with_one_history_entry() {
        let p = project();
        assert_eq!(p.history.len(), 1);
        assert!(!p.can_undo());
        assert!(!p.can_redo());
        assert!(p.canvas.pixels.pixels().all(|px| *px == WHITE));
    }

    #[test]
    fn each_stroke_adds_a_snapshot() {
        let mut p = project();
        stroke(&mut p, 10.0);
        stroke(&mut p, 20.0);
        stroke(&mut p, 30.0);
        assert_eq!(p.history.len(), 4);
        assert!(p.can_undo());
    }

    #[test]
    fn undo_after_n_strokes_shows_the_previous_state() {
        let mut p = project();
        stroke(&mut p, 10.0);
        stroke(&mut p, 20.0);
        stroke(&mut p, 30.0);

        p.undo();
        assert!(ink_at(&p, 10) && ink_at(&p, 20));
        assert!(!ink_at(&p, 30));

        p.undo();
        p.undo();
        assert!(p.canvas.pixels.pixels().all(|px| *px == WHITE));
        assert!(!p.can_undo());
        // undo past the start is a no-op
        p.undo();
        assert_eq!(p.history.index(), Some(0));
    }

    #[test]
    fn redo_replays_and_stops_at_the_end() {
        let mut p = project();
        stroke(&mut p, 10.0);
        assert!(!p.can_redo());
        p.undo();
        assert!(p.can_redo());
        p.redo();
        assert!(ink_at(&p, 10));
        assert!(!p.can_redo());
        p.redo();
        assert_eq!(p.history.index(), Some(1));
    }

    #[test]
    fn drawing_after_undo_drops_redo() {
        let mut p = project();
        stroke(&mut p, 10.0);
        stroke(&mut p, 20.0);
        p.undo();
        stroke(&mut p, 30.0);
        assert!(!p.can_redo());
        assert!(ink_at(&p, 10) && ink_at(&p, 30));
        assert!(!ink_at(&p, 20));
    }

    #[test]
    fn release_without_press_records_nothing() {
        let mut p = project();
        p.pointer(PointerEvent::Up);
        p.pointer(PointerEvent::Move((10.0, 10.0)));
        assert_eq!(p.history.len(), 1);
    }

    #[test]
    fn clear_resets_canvas_and_history() {
        let mut p = project();
        stroke(&mut p, 10.0);
        p.set_generated_image(png([0, 0, 255, 255])).unwrap();
        stroke(&mut p, 20.0);
        p.clear();
        assert!(p.generated_image().is_none());
        assert!(p.canvas.background.is_none());
        assert!(p.canvas.pixels.pixels().all(|px| *px == WHITE));
        assert_eq!(p.history.len(), 1);
        assert!(!p.can_undo());
    }

    #[test]
    fn blank_prompt_does_not_submit() {
        let mut p = project();
        assert!(p.begin_submit().is_none());
        p.prompt = "   ".to_string();
        assert!(p.begin_submit().is_none());
        assert!(!p.is_loading());
    }

    #[test]
    fn submit_while_pending_is_a_no_op() {
        let mut p = project();
        p.prompt = "add a cat".to_string();
        let request = p.begin_submit().unwrap();
        assert!(p.is_loading());
        assert_eq!(request.prompt, "add a cat");
        assert_eq!(request.model, ModelChoice::default().id());
        assert!(crate::io::decode_image(&request.image_png).is_ok());

        assert!(p.begin_submit().is_none());
        assert!(p.is_loading());
    }

    #[test]
    fn successful_generation_becomes_the_background() {
        let mut p = project();
        stroke(&mut p, 10.0);
        p.prompt = "paint it blue".to_string();
        p.begin_submit().unwrap();

        let image = png([0, 0, 255, 255]);
        p.finish_submit(Ok(outcome("paint it blue", image.clone())));

        assert!(!p.is_loading());
        assert!(p.prompt.is_empty());
        assert!(p.error.is_none());
        assert_eq!(p.generated_image(), Some(image.as_slice()));
        assert_eq!(*p.canvas.pixels.get_pixel(30, 10), Rgba([0, 0, 255, 255]));
        assert_eq!(p.history.len(), 1);
        assert_eq!(p.prompt_history.len(), 1);
        assert_eq!(p.prompt_history.entries()[0].prompt, "paint it blue");
    }

    #[test]
    fn failed_generation_opens_the_error_modal() {
        let mut p = project();
        stroke(&mut p, 10.0);
        p.prompt = "add a dog".to_string();
        p.begin_submit().unwrap();
        p.finish_submit(Err(GenerateError::Status {
            status: 400,
            body: r#"{"error":{"code":400,"message":"API key not valid."}}"#.to_string(),
        }));

        assert!(!p.is_loading());
        assert_eq!(p.error.as_deref(), Some("API key not valid."));
        assert!(p.modal_open());
        // canvas, prompt and history are untouched
        assert_eq!(p.prompt, "add a dog");
        assert!(ink_at(&p, 10));
        assert_eq!(p.history.len(), 2);
        assert!(p.prompt_history.is_empty());
    }

    #[test]
    fn reply_without_image_reports_retry_message() {
        let mut p = project();
        p.prompt = "x".to_string();
        p.begin_submit().unwrap();
        p.finish_submit(Err(GenerateError::NoImage));
        assert_eq!(
            p.error.as_deref(),
            Some("Failed to generate image, please try again.")
        );
    }

    #[test]
    fn undecodable_reply_is_an_error_not_a_background() {
        let mut p = project();
        p.prompt = "x".to_string();
        p.begin_submit().unwrap();
        p.finish_submit(Ok(outcome("x", vec![0, 1, 2])));
        assert!(p.error.is_some());
        assert!(p.generated_image().is_none());
        assert!(p.prompt_history.is_empty());
    }

    #[test]
    fn restore_from_history_swaps_background_and_closes_modal() {
        let mut p = project();
        let red = png([255, 0, 0, 255]);
        let id = p.prompt_history.push("red".to_string(), red.clone());
        p.prompt_history.push("green".to_string(), png([0, 255, 0, 255]));
        p.show_history_modal = true;
        stroke(&mut p, 10.0);

        p.restore_from_history(id);
        assert!(!p.show_history_modal);
        assert_eq!(p.generated_image(), Some(red.as_slice()));
        assert_eq!(*p.canvas.pixels.get_pixel(30, 10), Rgba([255, 0, 0, 255]));
        assert_eq!(p.history.len(), 1);

        // unknown ids change nothing
        p.restore_from_history(Uuid::new_v4());
        assert_eq!(p.generated_image(), Some(red.as_slice()));
    }

    #[test]
    fn strokes_after_generation_undo_back_to_it() {
        let mut p = project();
        p.set_generated_image(png([0, 0, 255, 255])).unwrap();
        stroke(&mut p, 10.0);
        assert!(ink_at(&p, 10) && *p.canvas.pixels.get_pixel(30, 10) != Rgba([0, 0, 255, 255]));
        p.undo();
        assert_eq!(*p.canvas.pixels.get_pixel(30, 10), Rgba([0, 0, 255, 255]));
        assert!(!p.can_undo());
    }
}
