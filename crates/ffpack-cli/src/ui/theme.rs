//! UI Theme - colors and icons shared by every message ffpack prints.

use crossterm::style::Color;

/// Default theme for ffpack output
#[derive(Debug, Clone)]
pub struct Theme {
    /// Colors for different message kinds
    pub colors: ColorScheme,
    /// Status icons
    pub icons: Icons,
    /// Width of the rule printed after section titles
    pub rule_width: usize,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: ColorScheme::default(),
            icons: Icons::default(),
            rule_width: 40,
        }
    }
}

/// Color scheme for message kinds
#[derive(Debug, Clone)]
pub struct ColorScheme {
    /// Section titles
    pub header: Color,
    /// Paths, sizes and other secondary detail
    pub secondary: Color,
    /// Success states
    pub success: Color,
    /// Warning states
    pub warning: Color,
    /// Error states
    pub error: Color,
    /// In-progress items
    pub active: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::White,
            secondary: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            active: Color::Cyan,
        }
    }
}

/// Status icons
#[derive(Debug, Clone)]
pub struct Icons {
    /// Active/in-progress state (●)
    pub active: &'static str,
    /// Success/completed state (✓)
    pub success: &'static str,
    /// Error/failed state (✗)
    pub error: &'static str,
    /// Warning state (⚠)
    pub warning: &'static str,
    /// Info state (ℹ)
    pub info: &'static str,
}

impl Default for Icons {
    fn default() -> Self {
        Self {
            active: "●",
            success: "✓",
            error: "✗",
            warning: "⚠",
            info: "ℹ",
        }
    }
}

/// Format bytes for human-readable display
#[allow(clippy::cast_precision_loss)]
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}
