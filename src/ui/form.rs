//! Live form state with field-level change notification.
//!
//! A [`SettingsForm`] holds what the user is currently editing. Every edit is
//! diffed field by field; observers are only woken when at least one field
//! actually changed.

use crate::models::{Corner, ImageSettings, VideoSettings};
use crate::state::{SettingsChange, SettingsStore};
use camino::Utf8PathBuf;
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Names of the fields that differ between two values of the same struct
macro_rules! changed_fields {
    ($old:expr, $new:expr; $($field:ident),+ $(,)?) => {{
        let mut fields = Vec::new();
        $(
            if $old.$field != $new.$field {
                fields.push(stringify!($field));
            }
        )+
        fields
    }};
}

/// A value edited through a form and backed by one half of the store.
pub trait FormModel: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// The store-side settings this form edits
    type Settings: Clone + fmt::Debug + Send + Sync + 'static;

    /// Fields whose values differ between `self` and `other`
    fn changed_fields(&self, other: &Self) -> Vec<&'static str>;

    /// Form values seeded from stored settings
    fn from_settings(settings: &Self::Settings) -> Self;

    /// Complete settings value for this form, taking anything the form does
    /// not carry from `base`
    fn into_settings(self, base: Option<&Self::Settings>) -> Self::Settings;

    fn load(store: &SettingsStore) -> Option<Self::Settings>;

    fn save(store: &SettingsStore, settings: Self::Settings) -> Vec<SettingsChange>;
}

impl FormModel for ImageSettings {
    type Settings = ImageSettings;

    fn changed_fields(&self, other: &Self) -> Vec<&'static str> {
        changed_fields!(self, other;
            input_directory,
            output_directory,
            search_child_folders,
            keep_child_folders_structure_in_output_directory,
            min_pixel_count,
            add_logo,
            logo_path,
            logo_scale,
            logo_x_offset_scale,
            logo_y_offset_scale,
            logo_corner,
            should_convert_format,
            format,
            clear_files_input_directory,
            clear_files_output_directory,
            overwrite_existing_files_output_directory,
        )
    }

    fn from_settings(settings: &ImageSettings) -> Self {
        settings.clone()
    }

    // Image forms carry every field, so nothing is taken from the store
    fn into_settings(self, _base: Option<&ImageSettings>) -> ImageSettings {
        self
    }

    fn load(store: &SettingsStore) -> Option<ImageSettings> {
        store.image_settings()
    }

    fn save(store: &SettingsStore, settings: ImageSettings) -> Vec<SettingsChange> {
        store.update_image_settings(settings)
    }
}

/// Editable part of [`VideoSettings`].
///
/// The favorites lists are not part of the form; they are owned by the store
/// and taken from its last known video settings whenever the form is turned
/// back into a full [`VideoSettings`].
#[derive(Debug, Clone, PartialEq)]
pub struct VideoForm {
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
}

impl Default for VideoForm {
    fn default() -> Self {
        Self::from_settings(&VideoSettings::default())
    }
}

impl FormModel for VideoForm {
    type Settings = VideoSettings;

    fn changed_fields(&self, other: &Self) -> Vec<&'static str> {
        changed_fields!(self, other;
            input_directory,
            output_directory,
            search_child_folders,
            keep_child_folders_structure_in_output_directory,
            min_pixel_count,
            add_logo,
            logo_path,
            logo_scale,
            logo_x_offset_scale,
            logo_y_offset_scale,
            logo_corner,
            should_convert_format,
            format,
            should_convert_codec,
            codec,
            clear_files_input_directory,
            clear_files_output_directory,
            overwrite_existing_files_output_directory,
        )
    }

    fn from_settings(s: &VideoSettings) -> Self {
        Self {
            input_directory: s.input_directory.clone(),
            output_directory: s.output_directory.clone(),
            search_child_folders: s.search_child_folders,
            keep_child_folders_structure_in_output_directory: s
                .keep_child_folders_structure_in_output_directory,
            min_pixel_count: s.min_pixel_count,
            add_logo: s.add_logo,
            logo_path: s.logo_path.clone(),
            logo_scale: s.logo_scale,
            logo_x_offset_scale: s.logo_x_offset_scale,
            logo_y_offset_scale: s.logo_y_offset_scale,
            logo_corner: s.logo_corner,
            should_convert_format: s.should_convert_format,
            format: s.format.clone(),
            should_convert_codec: s.should_convert_codec,
            codec: s.codec.clone(),
            clear_files_input_directory: s.clear_files_input_directory,
            clear_files_output_directory: s.clear_files_output_directory,
            overwrite_existing_files_output_directory: s.overwrite_existing_files_output_directory,
        }
    }

    fn into_settings(self, base: Option<&VideoSettings>) -> VideoSettings {
        let (format_favorite_list, codec_favorite_list) = base
            .map(|b| (b.format_favorite_list.clone(), b.codec_favorite_list.clone()))
            .unwrap_or_default();

        VideoSettings {
            input_directory: self.input_directory,
            output_directory: self.output_directory,
            search_child_folders: self.search_child_folders,
            keep_child_folders_structure_in_output_directory: self
                .keep_child_folders_structure_in_output_directory,
            min_pixel_count: self.min_pixel_count,
            add_logo: self.add_logo,
            logo_path: self.logo_path,
            logo_scale: self.logo_scale,
            logo_x_offset_scale: self.logo_x_offset_scale,
            logo_y_offset_scale: self.logo_y_offset_scale,
            logo_corner: self.logo_corner,
            should_convert_format: self.should_convert_format,
            format: self.format,
            should_convert_codec: self.should_convert_codec,
            codec: self.codec,
            clear_files_input_directory: self.clear_files_input_directory,
            clear_files_output_directory: self.clear_files_output_directory,
            overwrite_existing_files_output_directory: self
                .overwrite_existing_files_output_directory,
            format_favorite_list,
            codec_favorite_list,
        }
    }

    fn load(store: &SettingsStore) -> Option<VideoSettings> {
        store.video_settings()
    }

    fn save(store: &SettingsStore, settings: VideoSettings) -> Vec<SettingsChange> {
        store.update_video_settings(settings)
    }
}

/// Shared handle to a form's live values.
///
/// Clones edit the same form. Observers get a `watch` receiver, so a burst of
/// edits between two observations coalesces into the latest value.
pub struct SettingsForm<F> {
    tx: Arc<watch::Sender<F>>,
}

impl<F> Clone for SettingsForm<F> {
    fn clone(&self) -> Self {
        Self {
            tx: Arc::clone(&self.tx),
        }
    }
}

impl<F: FormModel> SettingsForm<F> {
    pub fn new(initial: F) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> F {
        self.tx.borrow().clone()
    }

    /// Apply an edit and notify observers if any field changed.
    ///
    /// # Returns
    /// The names of the fields that changed
    ///
    /// # Example
    /// ```ignore
    /// let changed = form.edit(|f| f.min_pixel_count = 720);
    /// assert_eq!(changed, vec!["min_pixel_count"]);
    /// ```
    pub fn edit<E>(&self, edit: E) -> Vec<&'static str>
    where
        E: FnOnce(&mut F),
    {
        let mut changed = Vec::new();
        self.tx.send_if_modified(|value| {
            let before = value.clone();
            edit(value);
            changed = before.changed_fields(value);
            !changed.is_empty()
        });

        if !changed.is_empty() {
            tracing::trace!("Form fields changed: {:?}", changed);
        }
        changed
    }

    /// Replace all values at once
    pub fn set(&self, values: F) -> Vec<&'static str> {
        self.edit(|current| *current = values)
    }

    pub fn subscribe(&self) -> watch::Receiver<F> {
        self.tx.subscribe()
    }
}
