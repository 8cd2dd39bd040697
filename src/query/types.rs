use std::fmt;

/// A width/height pair as given in `resize`, `fit` and `lb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub w: u32,
    pub h: u32,
}

impl Dimensions {
    pub fn new(w: u32, h: u32) -> Self {
        Self { w, h }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropUnit {
    Pixel,
    Percent,
}

/// Explicit extraction region applied before any scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    pub unit: CropUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crop {
    /// `crop=true|false`, only consulted by the bare `w`/`h` branch
    Flag(bool),
    Region(CropRect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CropStrategy {
    Smart,
    Attention,
    Entropy,
}

impl CropStrategy {
    pub const ALL: [CropStrategy; 3] = [
        CropStrategy::Smart,
        CropStrategy::Entropy,
        CropStrategy::Attention,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CropStrategy::Smart => "smart",
            CropStrategy::Attention => "attention",
            CropStrategy::Entropy => "entropy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gravity {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
    Center,
}

impl Gravity {
    pub const ALL: [Gravity; 9] = [
        Gravity::North,
        Gravity::NorthEast,
        Gravity::East,
        Gravity::SouthEast,
        Gravity::South,
        Gravity::SouthWest,
        Gravity::West,
        Gravity::NorthWest,
        Gravity::Center,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gravity::North => "north",
            Gravity::NorthEast => "northeast",
            Gravity::East => "east",
            Gravity::SouthEast => "southeast",
            Gravity::South => "south",
            Gravity::SouthWest => "southwest",
            Gravity::West => "west",
            Gravity::NorthWest => "northwest",
            Gravity::Center => "center",
        }
    }

    /// Horizontal and vertical anchor weights in `[0, 1]`, where 0 is the
    /// left/top edge and 1 the right/bottom edge.
    pub fn weights(&self) -> (f64, f64) {
        match self {
            Gravity::North => (0.5, 0.0),
            Gravity::NorthEast => (1.0, 0.0),
            Gravity::East => (1.0, 0.5),
            Gravity::SouthEast => (1.0, 1.0),
            Gravity::South => (0.5, 1.0),
            Gravity::SouthWest => (0.0, 1.0),
            Gravity::West => (0.0, 0.5),
            Gravity::NorthWest => (0.0, 0.0),
            Gravity::Center => (0.5, 0.5),
        }
    }
}

impl fmt::Display for Gravity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for CropStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated set of operations requested for a single image.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformSpec {
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub quality: Option<i64>,
    pub resize: Option<Dimensions>,
    pub fit: Option<Dimensions>,
    pub lb: Option<Dimensions>,
    pub crop: Option<Crop>,
    pub crop_strategy: Option<CropStrategy>,
    pub gravity: Option<Gravity>,
    pub zoom: Option<f64>,
    pub webp: Option<bool>,
    pub background: Option<String>,
}

impl TransformSpec {
    pub fn zoom(&self) -> f64 {
        self.zoom.unwrap_or(1.0)
    }

    pub fn crop_region(&self) -> Option<&CropRect> {
        match &self.crop {
            Some(Crop::Region(rect)) => Some(rect),
            _ => None,
        }
    }

    pub fn crop_enabled(&self) -> bool {
        matches!(self.crop, Some(Crop::Flag(true)))
    }

    /// Serialize every recognised field back into query form.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();

        if let Some(w) = self.w {
            pairs.push(("w", w.to_string()));
        }
        if let Some(h) = self.h {
            pairs.push(("h", h.to_string()));
        }
        if let Some(quality) = self.quality {
            pairs.push(("quality", quality.to_string()));
        }
        if let Some(zoom) = self.zoom {
            pairs.push(("zoom", zoom.to_string()));
        }
        for (key, dims) in [("resize", self.resize), ("fit", self.fit), ("lb", self.lb)] {
            if let Some(dims) = dims {
                pairs.push((key, format!("{},{}", dims.w, dims.h)));
            }
        }
        match &self.crop {
            Some(Crop::Flag(flag)) => pairs.push(("crop", flag.to_string())),
            Some(Crop::Region(rect)) => {
                let suffix = match rect.unit {
                    CropUnit::Pixel => "px",
                    CropUnit::Percent => "",
                };
                pairs.push((
                    "crop",
                    format!(
                        "{x}{s},{y}{s},{w}{s},{h}{s}",
                        x = rect.x,
                        y = rect.y,
                        w = rect.w,
                        h = rect.h,
                        s = suffix
                    ),
                ));
            }
            None => {}
        }
        if let Some(webp) = self.webp {
            pairs.push(("webp", webp.to_string()));
        }
        if let Some(strategy) = self.crop_strategy {
            pairs.push(("crop_strategy", strategy.as_str().to_string()));
        }
        if let Some(gravity) = self.gravity {
            pairs.push(("gravity", gravity.as_str().to_string()));
        }
        if let Some(background) = &self.background {
            pairs.push(("background", background.clone()));
        }

        pairs
    }

    pub fn to_query_string(&self) -> String {
        self.to_query_pairs()
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}
