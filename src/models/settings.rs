use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default image output format
pub const DEFAULT_IMAGE_FORMAT: &str = "png";

/// Default video container format
pub const DEFAULT_VIDEO_FORMAT: &str = "mp4";

/// Default video codec
pub const DEFAULT_VIDEO_CODEC: &str = "h264";

/// Corner of the output frame the logo is anchored to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Corner {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Settings for a bulk image job.
///
/// Field names serialize in camelCase, which is the shape the backend
/// persists and expects on `process_images`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSettings {
    pub input_directory: Utf8PathBuf,
    pub output_directory: Utf8PathBuf,
    pub search_child_folders: bool,
    pub keep_child_folders_structure_in_output_directory: bool,
    pub min_pixel_count: u32,
    pub add_logo: bool,
    pub logo_path: Option<Utf8PathBuf>,
    pub logo_scale: u32,
    pub logo_x_offset_scale: i32,
    pub logo_y_offset_scale: i32,
    pub logo_corner: Corner,
    pub should_convert_format: bool,
    pub format: String,
    pub clear_files_input_directory: bool,
    pub clear_files_output_directory: bool,
    pub overwrite_existing_files_output_directory: bool,
}

/// Settings for a bulk video job.
///
/// Structurally parallel to [`ImageSettings`] plus codec selection and the two
/// favorites lists. Favorites only bias UI ordering; the backend ignores them
/// when processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSettings {
    pub input_directory: Utf8PathBuf,
    pub output_directory: Utf8PathBuf,
    pub search_child_folders: bool,
    pub keep_child_folders_structure_in_output_directory: bool,
    pub min_pixel_count: u32,
    pub add_logo: bool,
    pub logo_path: Option<Utf8PathBuf>,
    pub logo_scale: u32,
    pub logo_x_offset_scale: i32,
    pub logo_y_offset_scale: i32,
    pub logo_corner: Corner,
    pub should_convert_format: bool,
    pub format: String,
    pub should_convert_codec: bool,
    pub codec: String,
    pub clear_files_input_directory: bool,
    pub clear_files_output_directory: bool,
    pub overwrite_existing_files_output_directory: bool,
    #[serde(alias = "favorite_formats")]
    pub format_favorite_list: Vec<String>,
    #[serde(alias = "favorite_codecs")]
    pub codec_favorite_list: Vec<String>,
}

/// Persisted configuration aggregate as returned by `load_config`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    pub image_settings: ImageSettings,
    pub video_settings: VideoSettings,
}

/// Format and codec enumerations reported by the backend at startup
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SupportedCapabilities {
    pub image_formats: Vec<String>,
    pub video_formats: Vec<String>,
    pub video_codecs: Vec<String>,
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            input_directory: Utf8PathBuf::from("input"),
            output_directory: Utf8PathBuf::from("output"),
            search_child_folders: false,
            keep_child_folders_structure_in_output_directory: false,
            min_pixel_count: 1080,
            add_logo: false,
            logo_path: None,
            logo_scale: 10,
            logo_x_offset_scale: 0,
            logo_y_offset_scale: 0,
            logo_corner: Corner::TopLeft,
            should_convert_format: false,
            format: DEFAULT_IMAGE_FORMAT.to_string(),
            clear_files_input_directory: false,
            clear_files_output_directory: false,
            overwrite_existing_files_output_directory: false,
        }
    }
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            input_directory: Utf8PathBuf::from("input"),
            output_directory: Utf8PathBuf::from("output"),
            search_child_folders: false,
            keep_child_folders_structure_in_output_directory: false,
            min_pixel_count: 1080,
            add_logo: false,
            logo_path: None,
            logo_scale: 10,
            logo_x_offset_scale: 0,
            logo_y_offset_scale: 0,
            logo_corner: Corner::TopLeft,
            should_convert_format: false,
            format: DEFAULT_VIDEO_FORMAT.to_string(),
            should_convert_codec: false,
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            clear_files_input_directory: false,
            clear_files_output_directory: false,
            overwrite_existing_files_output_directory: false,
            format_favorite_list: vec!["mkv".to_string(), "mov".to_string(), "mp4".to_string()],
            codec_favorite_list: vec![
                "h264".to_string(),
                "hevc".to_string(),
                "vp9".to_string(),
            ],
        }
    }
}

impl Configuration {
    /// Decode a configuration value, tolerating older or partial shapes.
    ///
    /// A value that matches the current structure decodes directly. Otherwise
    /// its keys are merged over [`Configuration::default`] (nested objects one
    /// level deep) and the merged value is decoded, so fields missing from an
    /// older backend take their defaults.
    pub fn from_value_lenient(value: Value) -> Result<Self, serde_json::Error> {
        match serde_json::from_value::<Configuration>(value.clone()) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::info!("Configuration does not match current shape ({}), migrating", err);
                let mut merged = serde_json::to_value(Configuration::default())?;
                merge_over(&mut merged, value);
                serde_json::from_value(merged)
            }
        }
    }
}

fn merge_over(base: &mut Value, current: Value) {
    let (Some(base_obj), Value::Object(current_obj)) = (base.as_object_mut(), current) else {
        return;
    };

    for (key, value) in current_obj {
        match (base_obj.get_mut(&key), value) {
            (Some(Value::Object(default_nested)), Value::Object(current_nested)) => {
                for (nested_key, nested_value) in current_nested {
                    default_nested.insert(canonical_key(nested_key), nested_value);
                }
            }
            (_, value) => {
                base_obj.insert(key, value);
            }
        }
    }
}

/// Field names older backends persisted, with their current names
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("favorite_formats", "formatFavoriteList"),
    ("favorite_codecs", "codecFavoriteList"),
];

// Merged keys must be canonical; an alias next to its default would be a duplicate field
fn canonical_key(key: String) -> String {
    LEGACY_KEYS
        .iter()
        .find(|(legacy, _)| *legacy == key)
        .map_or(key, |(_, current)| current.to_string())
}

impl SupportedCapabilities {
    pub fn supports_image_format(&self, format: &str) -> bool {
        contains_ignore_case(&self.image_formats, format)
    }

    pub fn supports_video_format(&self, format: &str) -> bool {
        contains_ignore_case(&self.video_formats, format)
    }

    pub fn supports_video_codec(&self, codec: &str) -> bool {
        contains_ignore_case(&self.video_codecs, codec)
    }
}

fn contains_ignore_case(list: &[String], needle: &str) -> bool {
    list.iter().any(|entry| entry.eq_ignore_ascii_case(needle))
}

/// Add `entry` to `list` if absent (appending), remove it if present.
///
/// Returns true when the entry is present after the toggle.
pub fn toggle_favorite(list: &mut Vec<String>, entry: &str) -> bool {
    if let Some(pos) = list.iter().position(|e| e == entry) {
        list.remove(pos);
        false
    } else {
        list.push(entry.to_string());
        true
    }
}
