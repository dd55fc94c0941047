//! Display accessibility preferences
//!
//! Plain values chosen by the user and handed to whatever front end renders
//! the consultation. Nothing here draws anything.

use serde::{Deserialize, Serialize};

/// Text size step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FontScale {
    Small,
    #[default]
    Medium,
    Large,
    ExtraLarge,
}

impl FontScale {
    /// Base body text size in points.
    pub fn base_size(&self) -> u32 {
        match self {
            FontScale::Small => 14,
            FontScale::Medium => 16,
            FontScale::Large => 20,
            FontScale::ExtraLarge => 24,
        }
    }

    /// Heading size in points.
    pub fn heading_size(&self) -> u32 {
        match self {
            FontScale::Small => 20,
            FontScale::Medium => 24,
            FontScale::Large => 30,
            FontScale::ExtraLarge => 36,
        }
    }
}

/// Palette adjustment for colour vision deficiencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorBlindMode {
    #[default]
    None,
    Protanopia,
    Deuteranopia,
    Tritanopia,
    Monochrome,
}

impl ColorBlindMode {
    pub fn label(&self) -> &'static str {
        match self {
            ColorBlindMode::None => "None (Default)",
            ColorBlindMode::Protanopia => "Protanopia (Red-blind)",
            ColorBlindMode::Deuteranopia => "Deuteranopia (Green-blind)",
            ColorBlindMode::Tritanopia => "Tritanopia (Blue-blind)",
            ColorBlindMode::Monochrome => "Monochrome (Grayscale)",
        }
    }
}

/// Pointer style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorStyle {
    #[default]
    Default,
    LargeBlack,
    LargeWhite,
    LargeCrosshair,
    HighVisibility,
}

impl CursorStyle {
    pub fn label(&self) -> &'static str {
        match self {
            CursorStyle::Default => "System Default",
            CursorStyle::LargeBlack => "Large Black Cursor",
            CursorStyle::LargeWhite => "Large White Cursor",
            CursorStyle::LargeCrosshair => "Large Crosshair",
            CursorStyle::HighVisibility => "High Visibility (Yellow/Black)",
        }
    }
}

/// Display preferences, constructed explicitly and passed where needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayPreferences {
    pub font_scale: FontScale,
    pub high_contrast: bool,
    pub reduced_motion: bool,
    pub enhanced_focus: bool,
    pub dyslexia_font: bool,
    pub color_blind_mode: ColorBlindMode,
    pub cursor: CursorStyle,
}

impl DisplayPreferences {
    /// True when nothing differs from the defaults.
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}
