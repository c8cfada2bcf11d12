extern crate image;
extern crate serde;
extern crate serde_with;

use crate::result;
use serde_with::{DisplayFromStr, serde_as};

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0x00, 0x00, 0x00]),
    ("white", [0xff, 0xff, 0xff]),
    ("red", [0xff, 0x00, 0x00]),
    ("green", [0x00, 0x80, 0x00]),
    ("blue", [0x00, 0x00, 0xff]),
    ("orange", [0xff, 0xa5, 0x00]),
    ("gray", [0x80, 0x80, 0x80]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub fn rgb(&self) -> image::Rgb<u8> {
        return image::Rgb(self.0);
    }
}

impl std::str::FromStr for Color {
    type Err = result::BusDashError;

    fn from_str(s: &str) -> result::BusDashResult<Color> {
        let s = s.trim();

        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(result::make_error(&format!("Malformed color '{}'", s)));
            }
            let mut rgb = [0u8; 3];
            for i in 0..3 {
                rgb[i] = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16).map_err(
                    |_| result::make_error(&format!("Malformed color '{}'", s)))?;
            }
            return Ok(Color(rgb));
        }

        return NAMED_COLORS.iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|(_, rgb)| Color(*rgb))
            .ok_or(result::make_error(&format!("Unknown color '{}'", s)));
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        return write!(f, "#{:02x}{:02x}{:02x}", self.0[0], self.0[1], self.0[2]);
    }
}

fn hex(s: &str) -> Color {
    // Only used with the literals below.
    return s.parse().unwrap_or(Color([0, 0, 0]));
}

/// Arrival cells at or below these many minutes get the urgent/warning
/// colors.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Thresholds {
    pub urgent: i64,
    pub warning: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    Stacked,
    SideBySide,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ThemeColors {
    #[serde_as(as = "DisplayFromStr")]
    pub background: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub header_background: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub header_text: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub section_title: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub status_text: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub service_background: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub service_text: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub normal_background: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub urgent_background: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub urgent_text: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub warning_background: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub warning_text: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub single_decker_text: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub double_decker_text: Color,
    #[serde_as(as = "DisplayFromStr")]
    pub default_text: Color,
}

impl Default for ThemeColors {
    fn default() -> ThemeColors {
        return ThemeColors{
            background: hex("#333333"),
            header_background: hex("#444444"),
            header_text: hex("#ffffff"),
            section_title: hex("#ffcc00"),
            status_text: hex("#cccccc"),
            service_background: hex("#f0f0f0"),
            service_text: hex("#000000"),
            normal_background: hex("#f0f0f0"),
            urgent_background: hex("#ff4c4c"),
            urgent_text: hex("#ffffff"),
            warning_background: hex("#ffa500"),
            warning_text: hex("#000000"),
            single_decker_text: hex("#0000ff"),
            double_decker_text: hex("#008000"),
            default_text: hex("#000000"),
        };
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub title: String,
    pub thresholds: Thresholds,
    pub colors: ThemeColors,
    pub urgency_colors: bool,
    pub show_vehicle_type: bool,
    pub show_fetch_errors: bool,
    pub layout: Layout,
}

impl Default for Theme {
    fn default() -> Theme {
        return Theme::classic();
    }
}

#[derive(Debug, PartialEq)]
pub struct CellStyle {
    pub background: Color,
    pub foreground: Color,
    pub text: String,
}

impl Theme {
    /// Dark board, urgency-colored cells, double-deckers marked.
    pub fn classic() -> Theme {
        return Theme{
            title: "Bus Arrival Times".to_string(),
            thresholds: Thresholds{urgent: 2, warning: 4},
            colors: ThemeColors::default(),
            urgency_colors: true,
            show_vehicle_type: true,
            show_fetch_errors: true,
            layout: Layout::Stacked,
        };
    }

    /// Light board, two columns, no coloring.
    pub fn plain() -> Theme {
        let light = hex("#d9d9d9");
        let black = hex("#000000");
        return Theme{
            title: "Bus Arrival Times".to_string(),
            thresholds: Thresholds{urgent: 2, warning: 4},
            colors: ThemeColors{
                background: light,
                header_background: light,
                header_text: black,
                section_title: black,
                status_text: hex("#555555"),
                service_background: light,
                service_text: black,
                normal_background: light,
                urgent_background: light,
                urgent_text: black,
                warning_background: light,
                warning_text: black,
                single_decker_text: black,
                double_decker_text: black,
                default_text: black,
            },
            urgency_colors: false,
            show_vehicle_type: false,
            show_fetch_errors: true,
            layout: Layout::SideBySide,
        };
    }

    pub fn preset(name: &str) -> result::BusDashResult<Theme> {
        match name {
            "classic" => Ok(Theme::classic()),
            "plain" => Ok(Theme::plain()),
            _ => Err(result::make_error(&format!("Unknown theme preset '{}'", name))),
        }
    }

    pub fn cell_style(&self, minutes: i64, vehicle_type: &str) -> CellStyle {
        let mut foreground = match vehicle_type {
            "SD" => self.colors.single_decker_text,
            "DD" => self.colors.double_decker_text,
            _ => self.colors.default_text,
        };

        let background;
        if self.urgency_colors && minutes <= self.thresholds.urgent {
            background = self.colors.urgent_background;
            foreground = self.colors.urgent_text;
        } else if self.urgency_colors && minutes <= self.thresholds.warning {
            background = self.colors.warning_background;
            foreground = self.colors.warning_text;
        } else {
            background = self.colors.normal_background;
        }

        let annotation = if self.show_vehicle_type && vehicle_type == "DD" { " (DD)" } else { "" };

        return CellStyle{
            background: background,
            foreground: foreground,
            text: format!("{}m{}", minutes, annotation),
        };
    }
}
