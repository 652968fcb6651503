// src/ui.rs
use iced::widget::container;
use iced::{Background, Color, Theme};
use once_cell::sync::Lazy;

pub struct Styles {
    pub bg: Color,
    pub fg: Color,
    pub footer_bg: Color,
    pub footer_fg: Color,
    pub header_bg: Color,
    pub header_fg: Color,
    pub error_fg: Color,
    pub muted_fg: Color,
}

pub static DARK_THEME: Lazy<Styles> = Lazy::new(|| Styles {
    bg: Color::from_rgb(0.0, 0.0, 0.0),
    fg: Color::from_rgb(1.0, 1.0, 1.0),
    footer_bg: Color::from_rgb(0.184, 0.184, 0.616), // #2f2f9d
    footer_fg: Color::from_rgb(1.0, 1.0, 1.0),
    header_bg: Color::from_rgb(0.2, 0.2, 0.2),
    header_fg: Color::from_rgb(1.0, 1.0, 1.0),
    error_fg: Color::from_rgb(1.0, 0.4, 0.4),
    muted_fg: Color::from_rgb(0.7, 0.7, 0.7),
});

pub static LIGHT_THEME: Lazy<Styles> = Lazy::new(|| Styles {
    bg: Color::from_rgb(1.0, 1.0, 1.0),
    fg: Color::from_rgb(0.0, 0.0, 0.0),
    footer_bg: Color::from_rgb(0.184, 0.184, 0.616), // #2f2f9d
    footer_fg: Color::from_rgb(1.0, 1.0, 1.0),
    header_bg: Color::from_rgb(0.949, 0.949, 0.949), // #f2f2f2
    header_fg: Color::from_rgb(0.0, 0.0, 0.0),
    error_fg: Color::from_rgb(0.8, 0.0, 0.0),
    muted_fg: Color::from_rgb(0.294, 0.333, 0.388), // #4b5563
});

pub fn styles(dark: bool) -> &'static Styles {
    if dark {
        &DARK_THEME
    } else {
        &LIGHT_THEME
    }
}

/// Flat fill used for table cells, the header row and the footer bar.
#[derive(Debug, Clone, Copy)]
pub struct Fill {
    pub bg: Color,
    pub fg: Color,
}

impl container::StyleSheet for Fill {
    type Style = Theme;

    fn appearance(&self, _style: &Self::Style) -> container::Appearance {
        container::Appearance {
            background: Some(Background::Color(self.bg)),
            text_color: Some(self.fg),
            ..container::Appearance::default()
        }
    }
}

impl From<Fill> for iced::theme::Container {
    fn from(fill: Fill) -> Self {
        iced::theme::Container::Custom(Box::new(fill))
    }
}

impl Styles {
    pub fn page(&self) -> Fill {
        Fill {
            bg: self.bg,
            fg: self.fg,
        }
    }

    pub fn header(&self) -> Fill {
        Fill {
            bg: self.header_bg,
            fg: self.header_fg,
        }
    }

    pub fn footer(&self) -> Fill {
        Fill {
            bg: self.footer_bg,
            fg: self.footer_fg,
        }
    }
}
