use serde::{Deserialize, Serialize};

use crate::scoring::round_to;

/// Mean Earth radius used for distances shown to users.
pub const EARTH_RADIUS_MILES: f64 = 3956.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle distance in miles.
pub fn haversine_miles(from: Coordinates, to: Coordinates) -> f64 {
    let (lat1, lat2) = (from.lat.to_radians(), to.lat.to_radians());
    let d_lat = lat2 - lat1;
    let d_lng = (to.lng - from.lng).to_radians();

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * a.sqrt().asin() * EARTH_RADIUS_MILES
}

/// Distance rounded to two decimals, as displayed next to search results.
pub fn distance_miles(from: Coordinates, to: Coordinates) -> f64 {
    round_to(haversine_miles(from, to), 2)
}

/// "123 Main St, Atlanta, GA 30308" becomes "Atlanta, GA".
///
/// With three or more parts the city is the part before the last "ST 12345"
/// style state part, so a trailing country is skipped; without one the last
/// two parts are kept. Shorter addresses are returned whole.
pub fn extract_city(address: &str) -> Option<String> {
    let address = address.trim();
    if address.is_empty() {
        return None;
    }

    let parts: Vec<&str> = address
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();
    if parts.len() < 3 {
        return Some(address.to_string());
    }

    let state_part = parts
        .iter()
        .enumerate()
        .rev()
        .find_map(|(index, part)| state_code(part).map(|code| (index, code)));
    if let Some((index, state)) = state_part.filter(|(index, _)| *index > 0) {
        return Some(format!("{}, {state}", parts[index - 1]));
    }

    let (city, region) = (parts[parts.len() - 2], parts[parts.len() - 1]);
    Some(format!("{city}, {region}"))
}

/// "GA 30308" and "GA" yield "GA"; "USA" and "Main St" do not.
fn state_code(part: &str) -> Option<&str> {
    let mut tokens = part.split_whitespace();
    let code = tokens.next()?;
    let is_code = code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase());
    let rest_is_postal = tokens.all(|token| token.chars().all(|c| c.is_ascii_digit() || c == '-'));
    (is_code && rest_is_postal).then_some(code)
}
