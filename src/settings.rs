use std::path::PathBuf;

use crate::components::tools::{MAX_PEN_SIZE, MIN_PEN_SIZE};
use crate::ops::ai::{DEFAULT_API_BASE_URL, DEFAULT_PROMPT_SUFFIX, ModelChoice};

/// Persistent user settings, stored as a flat `key=value` file.
#[derive(Clone, Debug, PartialEq)]
pub struct AppSettings {
    /// Model id sent in the request path
    pub model: String,
    /// Base URL of the generative language API (no trailing `/models`)
    pub api_base_url: String,
    /// API key from the settings file. Environment variables win over this.
    pub api_key: Option<String>,
    /// Appended to every prompt after a ". " separator
    pub prompt_suffix: String,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub pen_color: [u8; 3],
    pub pen_size: f32,
    /// Maximum number of canvas snapshots kept for undo
    pub max_undo_steps: usize,
    pub request_timeout_secs: u64,
    /// UI language code ("en", "es"); empty = detect from the environment
    pub language: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            model: ModelChoice::default().id().to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            prompt_suffix: DEFAULT_PROMPT_SUFFIX.to_string(),
            canvas_width: 960,
            canvas_height: 540,
            pen_color: [0, 0, 0],
            pen_size: 5.0,
            max_undo_steps: 100,
            request_timeout_secs: 120,
            language: String::new(),
        }
    }
}

impl AppSettings {
    pub(crate) fn settings_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("codraw_settings.cfg"))
    }

    /// Load from the platform config dir, falling back to defaults.
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        match std::fs::write(&path, self.serialize()) {
            Ok(()) => log_info!("Settings saved to {}", path.display()),
            Err(e) => log_warn!("Could not write settings {}: {}", path.display(), e),
        }
    }

    /// Parse `key=value` lines. Unknown keys and malformed values keep defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let val = val.trim();
            match key.trim() {
                "model" if !val.is_empty() => s.model = val.to_string(),
                "api_base_url" if !val.is_empty() => {
                    s.api_base_url = val.trim_end_matches('/').to_string()
                }
                "api_key" if !val.is_empty() => s.api_key = Some(val.to_string()),
                "prompt_suffix" => s.prompt_suffix = val.to_string(),
                "canvas_width" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.canvas_width = v.clamp(16, 8192);
                    }
                }
                "canvas_height" => {
                    if let Ok(v) = val.parse::<u32>() {
                        s.canvas_height = v.clamp(16, 8192);
                    }
                }
                "pen_color" => {
                    if let Some(rgb) = parse_hex_color(val) {
                        s.pen_color = rgb;
                    }
                }
                "pen_size" => {
                    if let Ok(v) = val.parse::<f32>() {
                        s.pen_size = v.clamp(MIN_PEN_SIZE, MAX_PEN_SIZE);
                    }
                }
                "max_undo_steps" => {
                    if let Ok(v) = val.parse::<usize>() {
                        s.max_undo_steps = v.max(1);
                    }
                }
                "request_timeout_secs" => {
                    if let Ok(v) = val.parse::<u64>() {
                        s.request_timeout_secs = v.max(1);
                    }
                }
                "language" => s.language = val.to_string(),
                _ => {}
            }
        }
        s
    }

    pub fn serialize(&self) -> String {
        let mut out = String::from("# CoDraw settings\n");
        out.push_str(&format!("model={}\n", self.model));
        out.push_str(&format!("api_base_url={}\n", self.api_base_url));
        if let Some(key) = &self.api_key {
            out.push_str(&format!("api_key={}\n", key));
        }
        out.push_str(&format!("prompt_suffix={}\n", self.prompt_suffix));
        out.push_str(&format!("canvas_width={}\n", self.canvas_width));
        out.push_str(&format!("canvas_height={}\n", self.canvas_height));
        out.push_str(&format!("pen_color={}\n", format_hex_color(self.pen_color)));
        out.push_str(&format!("pen_size={}\n", self.pen_size));
        out.push_str(&format!("max_undo_steps={}\n", self.max_undo_steps));
        out.push_str(&format!("request_timeout_secs={}\n", self.request_timeout_secs));
        out.push_str(&format!("language={}\n", self.language));
        out
    }

    /// The key to send: `GEMINI_API_KEY`, then `API_KEY`, then the file value.
    pub fn resolved_api_key(&self) -> Option<String> {
        ["GEMINI_API_KEY", "API_KEY"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|v| !v.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

#[cfg(target_os = "windows")]
fn config_dir() -> Option<PathBuf> {
    let appdata = std::env::var("APPDATA")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()?;
    Some(PathBuf::from(appdata).join("CoDraw"))
}

#[cfg(target_os = "macos")]
fn config_dir() -> Option<PathBuf> {
    let home = std::env::var("HOME").ok()?;
    Some(
        PathBuf::from(home)
            .join("Library")
            .join("Application Support")
            .join("CoDraw"),
    )
}

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
fn config_dir() -> Option<PathBuf> {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok()?;
    Some(base.join("codraw"))
}

/// `#RRGGBB` (leading `#` optional) → RGB bytes.
pub fn parse_hex_color(val: &str) -> Option<[u8; 3]> {
    let hex = val.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

pub fn format_hex_color(rgb: [u8; 3]) -> String {
    format!("#{:02X}{:02X}{:02X}", rgb[0], rgb[1], rgb[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_drawing_page() {
        let s = AppSettings::default();
        assert_eq!((s.canvas_width, s.canvas_height), (960, 540));
        assert_eq!(s.pen_color, [0, 0, 0]);
        assert_eq!(s.pen_size, 5.0);
        assert_eq!(s.model, "gemini-2.5-flash-image-preview");
    }

    #[test]
    fn serialize_then_parse_keeps_values() {
        let mut s = AppSettings::default();
        s.model = "gemini-2.0-flash-preview-image-generation".into();
        s.api_key = Some("abc123".into());
        s.pen_color = [0x12, 0xAB, 0xFF];
        s.pen_size = 17.0;
        s.max_undo_steps = 12;
        s.language = "es".into();
        assert_eq!(AppSettings::parse(&s.serialize()), s);
    }

    #[test]
    fn malformed_values_fall_back_and_clamp() {
        let s = AppSettings::parse(
            "pen_size=500\npen_color=#GGGGGG\ncanvas_width=abc\nmax_undo_steps=0\nnot a pair\n\
             api_base_url=https://example.test/v1beta/\n",
        );
        assert_eq!(s.pen_size, MAX_PEN_SIZE);
        assert_eq!(s.pen_color, [0, 0, 0]);
        assert_eq!(s.canvas_width, 960);
        assert_eq!(s.max_undo_steps, 1);
        assert_eq!(s.api_base_url, "https://example.test/v1beta");
    }

    #[test]
    fn hex_colors() {
        assert_eq!(parse_hex_color("#ff8000"), Some([255, 128, 0]));
        assert_eq!(parse_hex_color("00ff00"), Some([0, 255, 0]));
        assert_eq!(parse_hex_color("#fff"), None);
        assert_eq!(format_hex_color([255, 128, 0]), "#FF8000");
    }

    #[test]
    fn settings_file_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codraw_settings.cfg");
        let mut s = AppSettings::default();
        s.prompt_suffix = "Use thick outlines.".into();
        std::fs::write(&path, s.serialize()).unwrap();
        let loaded = AppSettings::parse(&std::fs::read_to_string(&path).unwrap());
        assert_eq!(loaded.prompt_suffix, "Use thick outlines.");
    }
}
