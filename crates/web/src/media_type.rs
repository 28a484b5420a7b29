//! Media types as declared by resources and requested through `Accept`.

use std::fmt;
use std::str::FromStr;

use mime::Mime;

use crate::error::MediaTypeError;

const MAX_QUALITY: u16 = 1000;

/// A media type, optionally carrying a quality weight.
///
/// Only media ranges parsed from `Accept` carry a weight other than `1`. Type and subtype
/// may be the wildcard `*`. The weight is kept in thousandths, the precision `q` values
/// are allowed to have.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaType {
    mime: Mime,
    quality: u16,
}

impl MediaType {
    /// `*/*`
    pub fn any() -> Self {
        Self { mime: mime::STAR_STAR, quality: MAX_QUALITY }
    }

    pub fn octet_stream() -> Self {
        Self { mime: mime::APPLICATION_OCTET_STREAM, quality: MAX_QUALITY }
    }

    /// Parses a single media type; a `q` parameter becomes the weight.
    ///
    /// Out-of-range weights are clamped to `[0, 1]`.
    pub fn parse(value: &str) -> Result<Self, MediaTypeError> {
        let trimmed = value.trim();
        let parsed: Mime = trimmed.parse().map_err(|e| MediaTypeError::invalid(trimmed, e))?;

        let Some(q) = parsed.get_param("q") else {
            return Ok(Self { mime: parsed, quality: MAX_QUALITY });
        };

        let weight: f32 = q.as_str().parse().map_err(|_| MediaTypeError::invalid_weight(trimmed))?;
        if weight.is_nan() {
            return Err(MediaTypeError::invalid_weight(trimmed));
        }
        Ok(Self { mime: strip_weight(&parsed), quality: to_quality(weight) })
    }

    /// Parses a comma-separated list, trimming whitespace around each entry.
    pub fn parse_list(value: &str) -> Result<Vec<Self>, MediaTypeError> {
        value.split(',').map(str::trim).filter(|entry| !entry.is_empty()).map(Self::parse).collect()
    }

    pub fn mime(&self) -> &Mime {
        &self.mime
    }

    pub fn type_(&self) -> &str {
        self.mime.type_().as_str()
    }

    pub fn subtype(&self) -> &str {
        self.mime.subtype().as_str()
    }

    /// The quality weight in `[0, 1]`
    pub fn weight(&self) -> f32 {
        f32::from(self.quality) / f32::from(MAX_QUALITY)
    }

    /// The weight in thousandths, suitable for exact comparison
    pub fn quality(&self) -> u16 {
        self.quality
    }

    /// Ranges with `q=0` are explicitly not acceptable.
    pub fn is_acceptable(&self) -> bool {
        self.quality > 0
    }

    fn is_wildcard_type(&self) -> bool {
        self.mime.type_() == mime::STAR
    }

    fn is_wildcard_subtype(&self) -> bool {
        self.mime.subtype() == mime::STAR
    }

    /// Neither type nor subtype is a wildcard.
    pub fn is_concrete(&self) -> bool {
        !self.is_wildcard_type() && !self.is_wildcard_subtype()
    }

    /// `2` for an exact type, `1` for `type/*`, `0` for `*/*`.
    pub fn specificity(&self) -> u8 {
        match (self.is_wildcard_type(), self.is_wildcard_subtype()) {
            (false, false) => 2,
            (false, true) => 1,
            (true, _) => 0,
        }
    }

    /// Type and subtype match, treating `*` on either side as matching anything.
    /// Parameters are ignored.
    pub fn is_compatible(&self, other: &MediaType) -> bool {
        let types = self.is_wildcard_type() || other.is_wildcard_type() || self.mime.type_() == other.mime.type_();
        let subtypes = self.is_wildcard_subtype() || other.is_wildcard_subtype() || self.mime.subtype() == other.mime.subtype();
        types && subtypes
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "value is clamped to [0, 1000] before the cast")]
fn to_quality(weight: f32) -> u16 {
    (weight.clamp(0.0, 1.0) * f32::from(MAX_QUALITY)).round() as u16
}

fn strip_weight(mime: &Mime) -> Mime {
    let mut value = mime.essence_str().to_owned();
    for (name, param) in mime.params().filter(|(name, _)| name.as_str() != "q") {
        value.push_str("; ");
        value.push_str(name.as_str());
        value.push('=');
        value.push_str(param.as_str());
    }
    value.parse().unwrap_or_else(|_| mime.clone())
}

impl FromStr for MediaType {
    type Err = MediaTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Mime> for MediaType {
    fn from(mime: Mime) -> Self {
        Self { mime, quality: MAX_QUALITY }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.mime, f)?;
        if self.quality < MAX_QUALITY {
            write!(f, "; q={}", self.weight())?;
        }
        Ok(())
    }
}
