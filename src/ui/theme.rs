use ratatui::style::Color;

pub const ACCENT: Color = Color::Rgb(86, 182, 194); // sea teal
pub const ACCENT_DIM: Color = Color::Rgb(62, 132, 142);
pub const SUCCESS: Color = Color::Rgb(134, 188, 111);
pub const WARNING: Color = Color::Rgb(229, 192, 123);
pub const ERROR: Color = Color::Rgb(224, 108, 117);

pub const TEXT: Color = Color::Rgb(236, 236, 232);
pub const TEXT_MUTED: Color = Color::Rgb(146, 146, 140);

pub const BG_BASE: Color = Color::Rgb(30, 33, 36);
/// Panels, the input box and the approval card
pub const BG_RAISED: Color = Color::Rgb(48, 52, 56);

pub const BORDER: Color = Color::Rgb(70, 76, 80);

pub const USER: Color = ACCENT;
pub const ASSISTANT: Color = TEXT_MUTED;
