//! Points, axis-aligned rectangles, and the planar distance surrogate used
//! to order geographic search results (§4.3).

/// A geographic point, longitude first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub lon: f64,
    pub lat: f64,
}

impl Point {
    pub fn new(lon: f64, lat: f64) -> Self {
        Point { lon, lat }
    }

    /// Planar Euclidean distance on raw degrees. Not a great-circle
    /// distance, but monotonic with it over the short ranges a single
    /// quadtree search result set spans — sufficient for sort ordering
    /// (§4.3).
    pub fn distance(&self, other: &Point) -> f64 {
        let dlon = self.lon - other.lon;
        let dlat = self.lat - other.lat;
        (dlon * dlon + dlat * dlat).sqrt()
    }
}

/// The sentinel rectangle meaning "whole earth", used when a caller wants
/// an unbounded geographic search.
pub const WHOLE_EARTH: Rectangle = Rectangle {
    origin: Point { lon: -181.0, lat: -91.0 },
    width: 362.0,
    height: 182.0,
};

/// An axis-aligned rectangle. `width`/`height` may be negative before
/// `normalized()` is called; every other geometry operation requires a
/// normalized rectangle (§3's invariant).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rectangle {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl Rectangle {
    pub fn new(origin: Point, width: f64, height: f64) -> Self {
        Rectangle { origin, width, height }
    }

    pub fn from_corners(min: Point, max: Point) -> Self {
        Rectangle {
            origin: min,
            width: max.lon - min.lon,
            height: max.lat - min.lat,
        }
    }

    /// Canonical form with non-negative extents: a negative width/height
    /// shifts the origin to the other edge and flips the sign, handling a
    /// rectangle specified as crossing the ±180° meridian the same way a
    /// rectangle with a plain negative extent is handled (§4.3).
    pub fn normalized(&self) -> Rectangle {
        let mut r = *self;
        if r.width < 0.0 {
            r.origin.lon += r.width;
            r.width = -r.width;
        }
        if r.height < 0.0 {
            r.origin.lat += r.height;
            r.height = -r.height;
        }
        r
    }

    pub fn intersect(&self, other: &Rectangle) -> bool {
        let a = self;
        let b = other;
        let a_lon_max = a.origin.lon + a.width;
        let b_lon_max = b.origin.lon + b.width;
        let a_lat_max = a.origin.lat + a.height;
        let b_lat_max = b.origin.lat + b.height;

        a.origin.lon < b_lon_max
            && b.origin.lon < a_lon_max
            && a.origin.lat < b_lat_max
            && b.origin.lat < a_lat_max
    }

    /// Lower bound inclusive, upper bound exclusive.
    pub fn contains_point(&self, p: &Point) -> bool {
        p.lon >= self.origin.lon
            && p.lon < self.origin.lon + self.width
            && p.lat >= self.origin.lat
            && p.lat < self.origin.lat + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.lon + self.width / 2.0,
            self.origin.lat + self.height / 2.0,
        )
    }

    pub fn sw(&self) -> Point {
        self.origin
    }

    pub fn se(&self) -> Point {
        Point::new(self.origin.lon + self.width, self.origin.lat)
    }

    pub fn nw(&self) -> Point {
        Point::new(self.origin.lon, self.origin.lat + self.height)
    }

    pub fn ne(&self) -> Point {
        Point::new(self.origin.lon + self.width, self.origin.lat + self.height)
    }
}
