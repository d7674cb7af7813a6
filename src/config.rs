use crate::error::CertError;
use crate::types::{Color, Size};

/// Fixed anchor points and sizes, all in the template's pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub max_line_width: i32,
    pub line_height: i32,
    pub text_start_y: i32,
    pub text_center_x: i32,
    pub label_centers: [i32; 2],
    pub label_y: i32,
    pub signature_y: i32,
    pub signature_box: Size,
    pub page_size: Size,
    pub participation_sentinel: String,
    pub body_font_size: f32,
    pub label_font_size: f32,
    pub text_color: Color,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            max_line_width: 1600,
            line_height: 60,
            text_start_y: 600,
            text_center_x: 1000,
            label_centers: [550, 1450],
            label_y: 1100,
            signature_y: 950,
            signature_box: Size::new(100, 80),
            page_size: Size::new(2000, 1400),
            participation_sentinel: "participation".to_string(),
            body_font_size: 40.0,
            label_font_size: 36.0,
            text_color: Color::BLACK,
        }
    }
}

impl LayoutConfig {
    pub fn validate(&self) -> Result<(), CertError> {
        if self.max_line_width <= 0 {
            return Err(CertError::InvalidConfiguration(format!(
                "max_line_width must be > 0 (got {})",
                self.max_line_width
            )));
        }
        if self.line_height <= 0 {
            return Err(CertError::InvalidConfiguration(format!(
                "line_height must be > 0 (got {})",
                self.line_height
            )));
        }
        if self.signature_box.is_empty() {
            return Err(CertError::InvalidConfiguration(format!(
                "signature_box must be non-empty (got {}x{})",
                self.signature_box.width, self.signature_box.height
            )));
        }
        if self.page_size.is_empty() {
            return Err(CertError::InvalidConfiguration(format!(
                "page_size must be non-empty (got {}x{})",
                self.page_size.width, self.page_size.height
            )));
        }
        for (name, size) in [
            ("body_font_size", self.body_font_size),
            ("label_font_size", self.label_font_size),
        ] {
            if !size.is_finite() || size <= 0.0 {
                return Err(CertError::InvalidConfiguration(format!(
                    "{name} must be > 0 (got {size})"
                )));
            }
        }
        if self.participation_sentinel.trim().is_empty() {
            return Err(CertError::InvalidConfiguration(
                "participation_sentinel cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fixed strings drawn on every certificate of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateText {
    pub event_name: String,
    pub signatory_names: [String; 2],
}

impl CertificateText {
    pub fn new(
        event_name: impl Into<String>,
        first_signatory: impl Into<String>,
        second_signatory: impl Into<String>,
    ) -> Self {
        Self {
            event_name: event_name.into(),
            signatory_names: [first_signatory.into(), second_signatory.into()],
        }
    }

    pub(crate) fn validate(&self) -> Result<(), CertError> {
        if self.event_name.trim().is_empty() {
            return Err(CertError::InvalidConfiguration(
                "event_name cannot be empty".to_string(),
            ));
        }
        for (idx, name) in self.signatory_names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(CertError::InvalidConfiguration(format!(
                    "signatory name {} cannot be empty",
                    idx + 1
                )));
            }
        }
        Ok(())
    }
}
