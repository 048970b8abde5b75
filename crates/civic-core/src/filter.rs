//! Listing filters and query-string parsing.
//!
//! Every filter here is pushed down to the event store and applied before
//! parent rows are fetched, so correlation never sees irrelevant rows.
//! The parsing helpers take raw query-string values so that malformed
//! input is reported as a validation failure naming the parameter.

use chrono::NaiveDate;
use civic_types::{Level, StateCode};

/// Miles per degree of latitude (and of longitude at the equator).
pub const MILES_PER_DEGREE: f64 = 69.0;

/// Errors produced while turning query-string values into a filter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// A required parameter was absent or blank.
    #[error("missing required parameter: {0}")]
    Missing(&'static str),

    /// A parameter was present but could not be used.
    #[error("invalid parameter {name}: {reason}")]
    Invalid {
        /// Parameter name.
        name: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Ordering applied to a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Soonest first (date, then time).
    #[default]
    DateAscending,
    /// Latest first.
    DateDescending,
    /// Closest to the search center first, then by date.
    Nearest,
}

/// A search circle in miles around a point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRadius {
    /// Center latitude.
    pub lat: f64,
    /// Center longitude.
    pub lng: f64,
    /// Radius in miles.
    pub radius_miles: f64,
}

impl GeoRadius {
    /// Build a search circle, rejecting out-of-range coordinates and
    /// radii outside `(0, max_radius_miles]`.
    pub fn new(lat: f64, lng: f64, radius_miles: f64, max_radius_miles: f64) -> Result<Self, FilterError> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(FilterError::Invalid {
                name: "lat",
                reason: "must be between -90 and 90".to_owned(),
            });
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(FilterError::Invalid {
                name: "lng",
                reason: "must be between -180 and 180".to_owned(),
            });
        }
        if !(radius_miles > 0.0 && radius_miles <= max_radius_miles) {
            return Err(FilterError::Invalid {
                name: "radius",
                reason: format!("must be greater than 0 and at most {max_radius_miles}"),
            });
        }
        Ok(Self {
            lat,
            lng,
            radius_miles,
        })
    }

    /// Planar approximation of the distance in miles from the center.
    ///
    /// Longitude degrees are scaled by the cosine of the center latitude.
    /// Accurate enough at city and county scale.
    pub fn distance_miles(&self, lat: f64, lng: f64) -> f64 {
        let dy = (lat - self.lat) * MILES_PER_DEGREE;
        let dx = (lng - self.lng) * MILES_PER_DEGREE * self.lat.to_radians().cos();
        dx.hypot(dy)
    }

    /// Whether a point falls inside the circle.
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        self.distance_miles(lat, lng) <= self.radius_miles
    }
}

/// Criteria for listing events.
#[derive(Debug, Clone, PartialEq)]
pub struct EventFilter {
    /// Only events in this state.
    pub state: Option<StateCode>,
    /// Only events on or after this date.
    pub from_date: Option<NaiveDate>,
    /// Only events at this level of government.
    pub level: Option<Level>,
    /// Only geocoded events inside this circle.
    pub near: Option<GeoRadius>,
    /// Result ordering.
    pub order: SortOrder,
    /// Maximum number of events returned.
    pub limit: u32,
}

impl EventFilter {
    /// An unfiltered, date-ascending listing capped at `limit`.
    pub const fn all(limit: u32) -> Self {
        Self {
            state: None,
            from_date: None,
            level: None,
            near: None,
            order: SortOrder::DateAscending,
            limit,
        }
    }

    /// Upcoming events (`date >= today`) in one state, soonest first.
    pub const fn upcoming_in_state(state: StateCode, today: NaiveDate, limit: u32) -> Self {
        Self {
            state: Some(state),
            from_date: Some(today),
            level: None,
            near: None,
            order: SortOrder::DateAscending,
            limit,
        }
    }

    /// Upcoming geocoded events inside `near`, nearest first.
    pub const fn upcoming_near(near: GeoRadius, today: NaiveDate, limit: u32) -> Self {
        Self {
            state: None,
            from_date: Some(today),
            level: None,
            near: Some(near),
            order: SortOrder::Nearest,
            limit,
        }
    }

    /// Restrict to one level of government.
    #[must_use]
    pub const fn with_level(mut self, level: Option<Level>) -> Self {
        self.level = level;
        self
    }

    /// Change the ordering.
    #[must_use]
    pub const fn with_order(mut self, order: SortOrder) -> Self {
        self.order = order;
        self
    }
}

// ---------------------------------------------------------------------------
// Query-string parsing
// ---------------------------------------------------------------------------

/// Treat blank values as absent.
fn present(raw: Option<&str>) -> Option<&str> {
    raw.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse the required `state` parameter.
pub fn parse_state(raw: Option<&str>) -> Result<StateCode, FilterError> {
    let value = present(raw).ok_or(FilterError::Missing("state"))?;
    StateCode::parse(value).map_err(|e| FilterError::Invalid {
        name: "state",
        reason: e.to_string(),
    })
}

/// Parse an optional `state` parameter.
pub fn parse_optional_state(raw: Option<&str>) -> Result<Option<StateCode>, FilterError> {
    present(raw).map(|_| parse_state(raw)).transpose()
}

/// Parse an optional `level` parameter.
pub fn parse_level(raw: Option<&str>) -> Result<Option<Level>, FilterError> {
    present(raw)
        .map(|value| {
            value.parse::<Level>().map_err(|e| FilterError::Invalid {
                name: "level",
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Parse `limit`, falling back to `default` and clamping to `max`.
pub fn parse_limit(raw: Option<&str>, default: u32, max: u32) -> Result<u32, FilterError> {
    let Some(value) = present(raw) else {
        return Ok(default.min(max));
    };
    let parsed = value.parse::<u32>().map_err(|e| FilterError::Invalid {
        name: "limit",
        reason: format!("expected a positive integer, got {value:?} ({e})"),
    })?;
    if parsed == 0 {
        return Err(FilterError::Invalid {
            name: "limit",
            reason: "must be at least 1".to_owned(),
        });
    }
    Ok(parsed.min(max))
}

/// Parse a required finite floating-point parameter such as `lat`.
pub fn parse_coordinate(name: &'static str, raw: Option<&str>) -> Result<f64, FilterError> {
    let value = present(raw).ok_or(FilterError::Missing(name))?;
    parse_finite(name, value)
}

/// Parse an optional finite floating-point parameter, using `default`
/// when absent.
pub fn parse_f64_or(name: &'static str, raw: Option<&str>, default: f64) -> Result<f64, FilterError> {
    present(raw).map_or(Ok(default), |value| parse_finite(name, value))
}

fn parse_finite(name: &'static str, value: &str) -> Result<f64, FilterError> {
    match value.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FilterError::Invalid {
            name,
            reason: format!("expected a number, got {value:?}"),
        }),
    }
}

/// Parse a required identifier parameter such as `id`.
pub fn parse_id(raw: Option<&str>) -> Result<&str, FilterError> {
    present(raw).ok_or(FilterError::Missing("id"))
}
