use geo::Coord;

use super::EntityHeader;

/// A staging point with precision-preserving decimal coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    header: EntityHeader,
    longitude: Option<String>,
    latitude: Option<String>,
}

impl Node {
    /// Create a node from its header and raw coordinate text.
    #[must_use]
    pub const fn new(
        header: EntityHeader,
        longitude: Option<String>,
        latitude: Option<String>,
    ) -> Self {
        Self {
            header,
            longitude,
            latitude,
        }
    }

    /// Shared attributes.
    #[must_use]
    pub const fn header(&self) -> &EntityHeader {
        &self.header
    }

    /// Longitude exactly as stored.
    #[must_use]
    pub fn longitude(&self) -> Option<&str> {
        self.longitude.as_deref()
    }

    /// Latitude exactly as stored.
    #[must_use]
    pub fn latitude(&self) -> Option<&str> {
        self.latitude.as_deref()
    }

    /// WGS84 coordinate (`x = longitude`, `y = latitude`) when both values
    /// parse and fall inside the valid ranges.
    #[must_use]
    pub fn coordinate(&self) -> Option<Coord<f64>> {
        let lon: f64 = self.longitude.as_deref()?.trim().parse().ok()?;
        let lat: f64 = self.latitude.as_deref()?.trim().parse().ok()?;
        (lon.is_finite()
            && lat.is_finite()
            && (-180.0..=180.0).contains(&lon)
            && (-90.0..=90.0).contains(&lat))
        .then_some(Coord { x: lon, y: lat })
    }

    /// A node is consistent when it carries a usable coordinate.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.coordinate().is_some()
    }
}
