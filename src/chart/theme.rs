//! Brand palette and chart dimensions, injected into every renderer.

use plotters::style::RGBColor;

/// Fallback colour for managers without a brand colour.
pub const UNKNOWN_GREY: RGBColor = RGBColor(0x88, 0x88, 0x88);

#[derive(Debug, Clone)]
pub struct ChartTheme {
    pub primary: RGBColor,
    pub navy: RGBColor,
    pub mid_blue: RGBColor,
    pub positive: RGBColor,
    pub negative: RGBColor,
    pub forecast: RGBColor,
    pub palette: Vec<RGBColor>,
    pub competitors: Vec<(&'static str, RGBColor)>,
    pub font: &'static str,
    pub size: (u32, u32),
}

impl ChartTheme {
    /// Tuleva brand colours.
    pub fn tuleva() -> Self {
        let blue = RGBColor(0x00, 0xAE, 0xEA);
        let navy = RGBColor(0x00, 0x2F, 0x63);
        let mid_blue = RGBColor(0x00, 0x81, 0xEE);
        let green = RGBColor(0x51, 0xC2, 0x6C);
        let orange = RGBColor(0xFF, 0x48, 0x00);
        let yellow = RGBColor(0xFC, 0xE2, 0x28);
        let charcoal = RGBColor(0x30, 0x30, 0x30);
        Self {
            primary: blue,
            navy,
            mid_blue,
            positive: green,
            negative: orange,
            forecast: RGBColor(0xB0, 0xD4, 0xF1),
            palette: vec![blue, navy, mid_blue, green, orange, yellow, charcoal],
            competitors: vec![
                ("Tuleva", blue),
                ("LHV", orange),
                ("Swedbank", yellow),
                ("SEB", green),
                ("Luminor", charcoal),
            ],
            font: "sans-serif",
            size: (1000, 520),
        }
    }

    pub fn competitor(&self, manager: &str) -> RGBColor {
        self.competitors
            .iter()
            .find(|(name, _)| *name == manager)
            .map(|(_, c)| *c)
            .unwrap_or(UNKNOWN_GREY)
    }

    pub fn is_competitor(&self, manager: &str) -> bool {
        self.competitors.iter().any(|(name, _)| *name == manager)
    }

    /// Palette colour for the `i`-th category (wraps around).
    pub fn cycle(&self, i: usize) -> RGBColor {
        self.palette[i % self.palette.len()]
    }
}

impl Default for ChartTheme {
    fn default() -> Self {
        Self::tuleva()
    }
}
