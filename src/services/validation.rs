use crate::models::{ImageSettings, SupportedCapabilities, VideoSettings};
use camino::Utf8Path;
use std::fmt;
use thiserror::Error;

/// A single rejected field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// All field errors found in one settings value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid settings: {}", join_errors(.errors))]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    pub fn fields(&self) -> Vec<&'static str> {
        self.errors.iter().map(|e| e.field).collect()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

/// Field-constraint checks run before any job is submitted.
///
/// The core treats the validator as a black box: it calls it with the final
/// payload and refuses to submit when it returns an error.
pub trait SettingsValidator: Send + Sync + 'static {
    fn validate_image(
        &self,
        settings: &ImageSettings,
        capabilities: &SupportedCapabilities,
    ) -> Result<(), ValidationErrors>;

    fn validate_video(
        &self,
        settings: &VideoSettings,
        capabilities: &SupportedCapabilities,
    ) -> Result<(), ValidationErrors>;
}

/// Default validator enforcing the settings schema.
///
/// Format and codec membership is only checked when conversion is enabled
/// and the backend reported a non-empty enumeration.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaValidator;

/// Fields shared by image and video settings
struct MediaFields<'a> {
    input_directory: &'a Utf8Path,
    output_directory: &'a Utf8Path,
    min_pixel_count: u32,
    add_logo: bool,
    logo_path: Option<&'a Utf8Path>,
    logo_scale: u32,
    logo_x_offset_scale: i32,
    logo_y_offset_scale: i32,
}

impl<'a> From<&'a ImageSettings> for MediaFields<'a> {
    fn from(s: &'a ImageSettings) -> Self {
        Self {
            input_directory: &s.input_directory,
            output_directory: &s.output_directory,
            min_pixel_count: s.min_pixel_count,
            add_logo: s.add_logo,
            logo_path: s.logo_path.as_deref(),
            logo_scale: s.logo_scale,
            logo_x_offset_scale: s.logo_x_offset_scale,
            logo_y_offset_scale: s.logo_y_offset_scale,
        }
    }
}

impl<'a> From<&'a VideoSettings> for MediaFields<'a> {
    fn from(s: &'a VideoSettings) -> Self {
        Self {
            input_directory: &s.input_directory,
            output_directory: &s.output_directory,
            min_pixel_count: s.min_pixel_count,
            add_logo: s.add_logo,
            logo_path: s.logo_path.as_deref(),
            logo_scale: s.logo_scale,
            logo_x_offset_scale: s.logo_x_offset_scale,
            logo_y_offset_scale: s.logo_y_offset_scale,
        }
    }
}

#[derive(Default)]
struct Collector {
    errors: Vec<FieldError>,
}

impl Collector {
    fn check(&mut self, ok: bool, field: &'static str, message: impl Into<String>) {
        if !ok {
            self.errors.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    fn media(&mut self, m: MediaFields<'_>) {
        self.check(
            !m.input_directory.as_str().trim().is_empty(),
            "inputDirectory",
            "must not be empty",
        );
        self.check(
            !m.output_directory.as_str().trim().is_empty(),
            "outputDirectory",
            "must not be empty",
        );
        self.check(m.min_pixel_count >= 1, "minPixelCount", "must be at least 1");
        self.check(
            (1..=100).contains(&m.logo_scale),
            "logoScale",
            "must be between 1 and 100",
        );
        self.check(
            (0..=100).contains(&m.logo_x_offset_scale),
            "logoXOffsetScale",
            "must be between 0 and 100",
        );
        self.check(
            (0..=100).contains(&m.logo_y_offset_scale),
            "logoYOffsetScale",
            "must be between 0 and 100",
        );

        let has_logo = m
            .logo_path
            .is_some_and(|path| !path.as_str().trim().is_empty());
        self.check(
            !m.add_logo || has_logo,
            "logoPath",
            "a logo file is required when adding a logo",
        );
    }

    /// An empty `known` list means the backend reported nothing to check against
    fn member(
        &mut self,
        enabled: bool,
        known: &[String],
        supported: bool,
        value: &str,
        field: &'static str,
    ) {
        if enabled && !known.is_empty() {
            self.check(
                supported,
                field,
                format!("unsupported value '{}'", value),
            );
        }
    }

    fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

impl SettingsValidator for SchemaValidator {
    fn validate_image(
        &self,
        settings: &ImageSettings,
        capabilities: &SupportedCapabilities,
    ) -> Result<(), ValidationErrors> {
        let mut c = Collector::default();
        c.media(settings.into());
        c.member(
            settings.should_convert_format,
            &capabilities.image_formats,
            capabilities.supports_image_format(&settings.format),
            &settings.format,
            "format",
        );
        c.finish()
    }

    fn validate_video(
        &self,
        settings: &VideoSettings,
        capabilities: &SupportedCapabilities,
    ) -> Result<(), ValidationErrors> {
        let mut c = Collector::default();
        c.media(settings.into());
        c.member(
            settings.should_convert_format,
            &capabilities.video_formats,
            capabilities.supports_video_format(&settings.format),
            &settings.format,
            "format",
        );
        c.member(
            settings.should_convert_codec,
            &capabilities.video_codecs,
            capabilities.supports_video_codec(&settings.codec),
            &settings.codec,
            "codec",
        );
        c.finish()
    }
}
