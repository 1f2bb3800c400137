use std::fmt;

use log::debug;

use crate::config::*;

/// Above this max / min ratio, the peer group is considered skewed and the
/// colors are interpolated on a logarithmic scale.
pub const LOG_SCALE_RATIO: f64 = 15.0;

/// Lower bound of the logarithmic domain.
pub const LOG_SCALE_FLOOR: f64 = 0.1;

pub const NULL_COLOR: Rgb = Rgb {
    r: 0xd9,
    g: 0xd9,
    b: 0xd9,
};

pub const ZERO_COLOR: Rgb = Rgb {
    r: 0xff,
    g: 0xc1,
    b: 0x07,
};

const WHITE: Rgb = Rgb {
    r: 0xff,
    g: 0xff,
    b: 0xff,
};

const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

pub const SECTORS: &[Sector] = &[
    Sector {
        code: "_T",
        label_es: "Todos los sectores",
        label_en: "All sectors",
        color: Rgb {
            r: 0x1f,
            g: 0x4e,
            b: 0x79,
        },
    },
    Sector {
        code: "BES",
        label_es: "Empresas",
        label_en: "Business enterprise",
        color: Rgb {
            r: 0xc0,
            g: 0x39,
            b: 0x2b,
        },
    },
    Sector {
        code: "GOV",
        label_es: "Administración Pública",
        label_en: "Government",
        color: Rgb {
            r: 0x27,
            g: 0xae,
            b: 0x60,
        },
    },
    Sector {
        code: "HES",
        label_es: "Enseñanza Superior",
        label_en: "Higher education",
        color: Rgb {
            r: 0x8e,
            g: 0x44,
            b: 0xad,
        },
    },
    Sector {
        code: "PNP",
        label_es: "IPSFL",
        label_en: "Private non-profit",
        color: Rgb {
            r: 0xd3,
            g: 0x54,
            b: 0x00,
        },
    },
];

pub fn sector(code: &str) -> Result<&'static Sector, AtlasErrors> {
    SECTORS
        .iter()
        .find(|s| s.code.eq_ignore_ascii_case(code.trim()))
        .ok_or_else(|| AtlasErrors::UnknownSector(code.to_string()))
}

impl Rgb {
    pub fn from_hex(s: &str) -> Result<Rgb, AtlasErrors> {
        let err = || AtlasErrors::InvalidColor(s.to_string());
        let h = s.trim().trim_start_matches('#');
        let h: String = match h.len() {
            3 => h.chars().flat_map(|c| [c, c]).collect(),
            6 => h.to_string(),
            _ => return Err(err()),
        };
        let channel = |i: usize| {
            h.get(i..i + 2)
                .and_then(|x| u8::from_str_radix(x, 16).ok())
                .ok_or_else(err)
        };
        Ok(Rgb {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
        })
    }

    /// Linear interpolation towards `other`, `t` in [0, 1].
    pub fn mix(&self, other: &Rgb, t: f64) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb {
            r: lerp(self.r, other.r),
            g: lerp(self.g, other.g),
            b: lerp(self.b, other.b),
        }
    }
}

impl fmt::Display for Rgb {
    /// Format as CSS: #rrggbb
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl ColorPalette {
    /// Derives the gradient from the base color of a sector: light tints for
    /// the low end, the base color for the upper quartile, a darker shade for
    /// the maximum.
    pub fn from_base(base: Rgb) -> ColorPalette {
        ColorPalette {
            null: NULL_COLOR,
            zero: ZERO_COLOR,
            min: base.mix(&WHITE, 0.85),
            low: base.mix(&WHITE, 0.6),
            mid: base.mix(&WHITE, 0.35),
            high: base,
            max: base.mix(&BLACK, 0.35),
        }
    }

    pub fn for_sector(code: &str) -> Result<ColorPalette, AtlasErrors> {
        Ok(ColorPalette::from_base(sector(code)?.color))
    }

    /// Samples the gradient at `t` in [0, 1], the stops being evenly spaced.
    pub fn sample(&self, t: f64) -> Rgb {
        let stops = self.stops();
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        let scaled = t * (stops.len() - 1) as f64;
        let lo = (scaled.floor() as usize).min(stops.len() - 2);
        stops[lo].mix(&stops[lo + 1], scaled - lo as f64)
    }
}

/// Quantile with linear interpolation between closest ranks.
/// `sorted` must be sorted and not empty.
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * p;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

impl ValueRange {
    /// Summary statistics of the given values. Non-finite values are ignored;
    /// an empty input has no range.
    pub fn from_values(values: &[f64]) -> Option<ValueRange> {
        let mut sorted: Vec<f64> = values.iter().cloned().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.total_cmp(b));
        Some(ValueRange {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            q1: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
            count: sorted.len(),
        })
    }

    pub fn mode(&self) -> ScaleMode {
        let ratio = self.max / self.min;
        if ratio > LOG_SCALE_RATIO {
            ScaleMode::Logarithmic
        } else {
            ScaleMode::Quartile
        }
    }
}

/// Maps values to colors for one selection (year, sector, dataset).
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct ColorScale {
    pub palette: ColorPalette,
    pub range: Option<ValueRange>,
}

impl ColorScale {
    pub fn new(palette: ColorPalette, range: Option<ValueRange>) -> ColorScale {
        ColorScale { palette, range }
    }

    pub fn mode(&self) -> Option<ScaleMode> {
        self.range.map(|r| r.mode())
    }

    pub fn color(&self, value: Option<f64>) -> Rgb {
        let v = match value {
            None => return self.palette.null,
            Some(v) if !v.is_finite() => return self.palette.null,
            Some(v) if v == 0.0 => return self.palette.zero,
            Some(v) => v,
        };
        let range = match self.range {
            Some(r) => r,
            None => {
                debug!("color: no peer range for value {}", v);
                return self.palette.mid;
            }
        };
        match range.mode() {
            ScaleMode::Logarithmic => {
                // Groups lying entirely below the floor use their own minimum, which is
                // positive since zeros never enter the range.
                let floor = if range.max <= LOG_SCALE_FLOOR {
                    range.min
                } else {
                    range.min.max(LOG_SCALE_FLOOR)
                };
                let span = range.max.ln() - floor.ln();
                if span <= 0.0 || !span.is_finite() {
                    return self.palette.max;
                }
                let t = (v.max(floor).ln() - floor.ln()) / span;
                self.palette.sample(t)
            }
            ScaleMode::Quartile => {
                if v < range.q1 {
                    self.palette.min
                } else if v < range.median {
                    self.palette.low
                } else if v < range.q3 {
                    self.palette.mid
                } else if v < range.max {
                    self.palette.high
                } else {
                    self.palette.max
                }
            }
        }
    }
}
