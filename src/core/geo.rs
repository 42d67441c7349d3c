// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2022 Adrian <adrian.eddy at gmail>

use serde::{ Serialize, Deserialize };

use crate::{ Result, TrackerError };

const ZONE_LETTERS: &str = "CDEFGHJKLMNPQRSTUVWX";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmZone {
    pub number: u8,
    pub letter: char,
}
impl UtmZone {
    pub fn is_northern(&self) -> bool { self.letter >= 'N' }
}
impl std::fmt::Display for UtmZone {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result { write!(f, "{}{}", self.number, self.letter) }
}
/// Accepts `32U`, `32 U` and the tuple form `(32, 'U')`.
impl std::str::FromStr for UtmZone {
    type Err = TrackerError;
    fn from_str(s: &str) -> Result<Self> {
        let err = || TrackerError::OutOfRange(format!("invalid UTM zone {s:?}"));
        let compact: String = s.chars().filter(char::is_ascii_alphanumeric).collect();
        let letter = compact.chars().last().filter(|c| c.is_ascii_alphabetic()).ok_or_else(err)?.to_ascii_uppercase();
        let number: u8 = compact[..compact.len() - 1].parse().map_err(|_| err())?;
        if !(1..=60).contains(&number) || !ZONE_LETTERS.contains(letter) {
            return Err(err());
        }
        Ok(Self { number, letter })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UtmPoint {
    pub easting: f64,
    pub northing: f64,
    pub zone: UtmZone,
}

pub fn from_latlon(lat: f64, lon: f64) -> Result<UtmPoint> {
    if !(-80.0..=84.0).contains(&lat) {
        return Err(TrackerError::OutOfRange(format!("latitude {lat} outside UTM range")));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(TrackerError::OutOfRange(format!("longitude {lon}")));
    }
    let letter = utm::lat_to_zone_letter(lat).ok_or_else(|| TrackerError::OutOfRange(format!("latitude {lat} has no UTM band")))?;
    let number = utm::lat_lon_to_zone_number(lat, lon);
    let (northing, easting, _convergence) = utm::to_utm_wgs84(lat, lon, number);

    Ok(UtmPoint { easting, northing, zone: UtmZone { number, letter } })
}

pub fn to_latlon(easting: f64, northing: f64, zone: UtmZone) -> Result<(f64, f64)> {
    utm::wsg84_utm_to_lat_lon(easting, northing, zone.number, zone.letter)
        .map_err(|e| TrackerError::OutOfRange(format!("UTM {easting} {northing} {zone}: {e:?}")))
}
