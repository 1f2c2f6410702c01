//! Packed colours, colour maps and scalar-to-colour lookup.

use serde::Deserialize;

use crate::scene::VertexValues;

/// Number of pre-resolved entries in every colour map palette.
pub const PALETTE_SIZE: usize = 512;

/// An 8-bit-per-channel RGBA colour.
///
/// Packs little-endian as `r | g << 8 | b << 16 | a << 24`, so the packed
/// integer's in-memory bytes read `[r, g, b, a]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "u32")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::new(255, 255, 255, 255);
    /// Colour of an empty palette.
    pub const CLEAR: Rgba = Rgba::new(255, 255, 255, 0);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn from_packed(packed: u32) -> Self {
        let [r, g, b, a] = packed.to_le_bytes();
        Self { r, g, b, a }
    }

    #[inline]
    pub fn to_packed(self) -> u32 {
        u32::from_le_bytes([self.r, self.g, self.b, self.a])
    }

    /// Returns the colour with its alpha channel multiplied by `opacity`.
    pub fn with_opacity(self, opacity: f32) -> Self {
        let alpha = (self.a as f32 * opacity).round().clamp(0.0, 255.0);
        Self {
            a: alpha as u8,
            ..self
        }
    }

    /// Linear interpolation per channel, `t` in `[0, 1]`.
    fn lerp(self, other: Rgba, t: f32) -> Self {
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: mix(self.a, other.a),
        }
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::WHITE
    }
}

impl From<u32> for Rgba {
    fn from(packed: u32) -> Self {
        Self::from_packed(packed)
    }
}

impl From<Rgba> for u32 {
    fn from(colour: Rgba) -> Self {
        colour.to_packed()
    }
}

/// A colour stop at `position` in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ColourStop {
    pub position: f32,
    pub colour: Rgba,
}

impl ColourStop {
    pub fn new(position: f32, colour: Rgba) -> Self {
        Self { position, colour }
    }
}

/// An ordered gradient of colour stops with a cached 512-entry palette.
///
/// The palette is rebuilt whenever the stops change, so lookups never
/// interpolate at draw time.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "ColourMapDesc")]
pub struct ColourMap {
    name: Option<String>,
    stops: Vec<ColourStop>,
    /// Lower bound of the data range, overridden by a block's own minimum.
    pub minimum: Option<f32>,
    /// Upper bound of the data range, overridden by a block's own maximum.
    pub maximum: Option<f32>,
    /// Map `log10` of values and bounds instead of raw values.
    pub log_scale: bool,
    palette: Box<[u32; PALETTE_SIZE]>,
}

impl ColourMap {
    /// Creates a colour map from a list of stops, sorted by position.
    pub fn new(stops: Vec<ColourStop>) -> Self {
        let mut map = Self {
            name: None,
            stops: Vec::new(),
            minimum: None,
            maximum: None,
            log_scale: false,
            palette: Box::new([Rgba::CLEAR.to_packed(); PALETTE_SIZE]),
        };
        map.set_stops(stops);
        map
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_range(mut self, minimum: f32, maximum: f32) -> Self {
        self.minimum = Some(minimum);
        self.maximum = Some(maximum);
        self
    }

    pub fn with_log_scale(mut self, log_scale: bool) -> Self {
        self.log_scale = log_scale;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn stops(&self) -> &[ColourStop] {
        &self.stops
    }

    /// Replaces the stops and rebuilds the palette cache.
    pub fn set_stops(&mut self, mut stops: Vec<ColourStop>) {
        stops.sort_by(|a, b| a.position.total_cmp(&b.position));
        self.stops = stops;
        self.rebuild_palette();
    }

    /// The pre-resolved palette, packed RGBA.
    #[inline]
    pub fn palette(&self) -> &[u32; PALETTE_SIZE] {
        &self.palette
    }

    /// Interpolates the gradient at `t` in `[0, 1]`.
    pub fn sample(&self, t: f32) -> Rgba {
        sample_stops(&self.stops, t)
    }

    fn rebuild_palette(&mut self) {
        let stops = &self.stops;
        for (i, entry) in self.palette.iter_mut().enumerate() {
            let t = i as f32 / (PALETTE_SIZE - 1) as f32;
            *entry = sample_stops(stops, t).to_packed();
        }
    }
}

/// Clamps to the end stops outside their span, interpolates linearly inside.
fn sample_stops(stops: &[ColourStop], t: f32) -> Rgba {
    let (Some(first), Some(last)) = (stops.first(), stops.last()) else {
        return Rgba::CLEAR;
    };
    if t <= first.position {
        return first.colour;
    }
    if t >= last.position {
        return last.colour;
    }
    for pair in stops.windows(2) {
        let (lo, hi) = (pair[0], pair[1]);
        if t <= hi.position {
            let span = hi.position - lo.position;
            if span <= f32::EPSILON {
                return hi.colour;
            }
            return lo.colour.lerp(hi.colour, (t - lo.position) / span);
        }
    }
    last.colour
}

#[derive(Deserialize)]
struct ColourMapDesc {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    colours: Vec<ColourStop>,
    #[serde(default)]
    minimum: Option<f32>,
    #[serde(default)]
    maximum: Option<f32>,
    #[serde(default)]
    log: bool,
}

impl From<ColourMapDesc> for ColourMap {
    fn from(desc: ColourMapDesc) -> Self {
        let mut map = ColourMap::new(desc.colours).with_log_scale(desc.log);
        map.name = desc.name;
        map.minimum = desc.minimum;
        map.maximum = desc.maximum;
        map
    }
}

/// Maps a scalar into a palette slot.
///
/// Values below `min` land in slot 0, values above `max` in the last slot.
/// A degenerate range, or a value that does not survive the log transform,
/// resolves to the palette centre.
pub fn palette_index(value: f32, min: f32, max: f32, log_scale: bool) -> usize {
    if value < min {
        return 0;
    }
    if value > max {
        return PALETTE_SIZE - 1;
    }
    if max <= min {
        return PALETTE_SIZE / 2;
    }

    let (value, min, max) = if log_scale {
        (value.log10(), min.log10(), max.log10())
    } else {
        (value, min, max)
    };

    let scaled = ((value - min) / (max - min)).clamp(0.0, 1.0);
    let slot = ((PALETTE_SIZE - 1) as f32 * scaled).round();
    if slot.is_finite() {
        slot as usize
    } else {
        PALETTE_SIZE / 2
    }
}

/// Per-block colour lookup: palette mapping when the block has scalar
/// values and the object has a colour map, packed colours when the block
/// carries them, the flat object colour otherwise.
#[derive(Debug, Clone)]
pub struct ColourResolver<'a> {
    flat: Rgba,
    opacity: Option<f32>,
    source: ColourSource<'a>,
}

#[derive(Debug, Clone)]
enum ColourSource<'a> {
    Flat,
    Palette(PaletteMapping<'a>),
    Packed(&'a [u32]),
}

#[derive(Debug, Clone)]
struct PaletteMapping<'a> {
    palette: &'a [u32; PALETTE_SIZE],
    values: &'a [f32],
    min: f32,
    max: f32,
    log_scale: bool,
}

impl<'a> ColourResolver<'a> {
    /// A resolver that always yields `colour` (with opacity applied).
    pub fn flat(colour: Rgba, opacity: Option<f32>) -> Self {
        Self {
            flat: colour,
            opacity,
            source: ColourSource::Flat,
        }
    }

    /// Builds the resolver for one block.
    ///
    /// The effective range is the block's declared minimum/maximum, then the
    /// colour map's range, then the range of the data itself. Packed colours
    /// bypass the colour map.
    pub fn for_block(
        colour: Rgba,
        opacity: Option<f32>,
        colour_map: Option<&'a ColourMap>,
        values: Option<&'a VertexValues>,
    ) -> Self {
        let source = match (values, colour_map) {
            (Some(VertexValues::Colours(colours)), _) if !colours.is_empty() => {
                ColourSource::Packed(colours)
            }
            (Some(VertexValues::Scalar(values)), Some(map)) if !values.data.is_empty() => {
                let (data_min, data_max) = values.data_range().unwrap_or((0.0, 1.0));
                ColourSource::Palette(PaletteMapping {
                    palette: map.palette(),
                    values: &values.data,
                    min: values.minimum.or(map.minimum).unwrap_or(data_min),
                    max: values.maximum.or(map.maximum).unwrap_or(data_max),
                    log_scale: map.log_scale,
                })
            }
            _ => ColourSource::Flat,
        };

        Self {
            flat: colour,
            opacity,
            source,
        }
    }

    /// Packed colour for the vertex at `index`.
    ///
    /// A value array shorter than the vertex list reuses its last value, so a
    /// single value colours a whole block.
    pub fn resolve(&self, index: usize) -> u32 {
        let colour = match &self.source {
            ColourSource::Palette(m) => {
                let value = m.values[index.min(m.values.len() - 1)];
                let slot = palette_index(value, m.min, m.max, m.log_scale);
                Rgba::from_packed(m.palette[slot])
            }
            ColourSource::Packed(colours) => {
                Rgba::from_packed(colours[index.min(colours.len() - 1)])
            }
            ColourSource::Flat => self.flat,
        };

        match self.opacity {
            Some(opacity) => colour.with_opacity(opacity).to_packed(),
            None => colour.to_packed(),
        }
    }
}
