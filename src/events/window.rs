use std::fmt;

/// Запрошенный размер окна по одной оси
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Extent {
    /// Взять текущий размер дисплея
    #[default]
    Display,
    Pixels(u16),
}

impl Extent {
    /// Разрешить размер относительно фактического размера дисплея
    pub fn resolve(self, display: u16) -> u16 {
        match self {
            Extent::Display => display,
            Extent::Pixels(pixels) => pixels,
        }
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extent::Display => write!(f, "display"),
            Extent::Pixels(pixels) => write!(f, "{}", pixels),
        }
    }
}

/// Геометрия окна вспышки
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowGeometry {
    pub x: i16,
    pub y: i16,
    pub width: u16,
    pub height: u16,
}

impl WindowGeometry {
    pub fn resolve(
        x: i16,
        y: i16,
        width: Extent,
        height: Extent,
        display_width: u16,
        display_height: u16,
    ) -> Self {
        Self {
            x,
            y,
            width: width.resolve(display_width),
            height: height.resolve(display_height),
        }
    }
}

impl fmt::Display for WindowGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}{:+}{:+}", self.width, self.height, self.x, self.y)
    }
}
