//! Black Marble granule file names.
//!
//! Grammar (fields separated by `.`):
//!
//! ```text
//! <product>.A<YYYY><DDD>.h<HH>v<VV>.<collection>.<YYYY><DDD><hh><mm><ss>[.<ext>]
//! VNP46A2  .A2020015   .h10v05    .001         .2020287170609          .h5
//! ```
//!
//! `DDD` is the day of the year; the last field is the production time.

use crate::types::{ConvertError, ConvertResult, TileIndex};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

fn granule_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(
            r"^(?P<product>[A-Za-z0-9_]+)\.A(?P<year>\d{4})(?P<doy>\d{3})\.h(?P<h>\d{2})v(?P<v>\d{2})\.(?P<collection>\d{3})\.(?P<production>\d{13})(?:\.(?P<ext>[A-Za-z0-9]+))?$",
        )
        .expect("granule pattern is valid")
    })
}

/// Parsed fields of a granule file name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GranuleName {
    pub product: String,
    pub acquisition_date: NaiveDate,
    pub tile: TileIndex,
    pub collection: String,
    pub production_time: NaiveDateTime,
    /// Raw production field, e.g. `2020287170609`
    pub production_stamp: String,
    pub extension: Option<String>,
}

impl GranuleName {
    /// Parse a bare file name (no directories)
    pub fn parse(file_name: &str) -> ConvertResult<Self> {
        let caps = granule_pattern().captures(file_name).ok_or_else(|| {
            ConvertError::Granule(format!("'{}' does not follow PRODUCT.AYYYYDDD.hHHvVV.CCC.YYYYDDDHHMMSS", file_name))
        })?;

        let year: i32 = parse_field(file_name, "year", &caps["year"])?;
        let doy: u32 = parse_field(file_name, "day of year", &caps["doy"])?;
        let acquisition_date = day_of_year(file_name, year, doy)?;

        let h: i32 = parse_field(file_name, "horizontal tile", &caps["h"])?;
        let v: i32 = parse_field(file_name, "vertical tile", &caps["v"])?;

        let production_stamp = caps["production"].to_string();
        let production_time = parse_production_stamp(file_name, &production_stamp)?;

        Ok(Self {
            product: caps["product"].to_string(),
            acquisition_date,
            tile: TileIndex::new(h, v),
            collection: caps["collection"].to_string(),
            production_time,
            production_stamp,
            extension: caps.name("ext").map(|m| m.as_str().to_string()),
        })
    }

    /// Acquisition date at the production time of day, used as the image's
    /// start time when importing into an image collection
    pub fn time_start(&self) -> NaiveDateTime {
        self.acquisition_date.and_time(self.production_time.time())
    }
}

fn parse_field<T: std::str::FromStr>(file_name: &str, field: &str, raw: &str) -> ConvertResult<T> {
    raw.parse::<T>()
        .map_err(|_| ConvertError::Granule(format!("invalid {} '{}' in '{}'", field, raw, file_name)))
}

fn day_of_year(file_name: &str, year: i32, doy: u32) -> ConvertResult<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy).ok_or_else(|| {
        ConvertError::Granule(format!("day {} does not exist in {} ('{}')", doy, year, file_name))
    })
}

fn parse_production_stamp(file_name: &str, stamp: &str) -> ConvertResult<NaiveDateTime> {
    let year: i32 = parse_field(file_name, "production year", &stamp[0..4])?;
    let doy: u32 = parse_field(file_name, "production day", &stamp[4..7])?;
    let hour: u32 = parse_field(file_name, "production hour", &stamp[7..9])?;
    let minute: u32 = parse_field(file_name, "production minute", &stamp[9..11])?;
    let second: u32 = parse_field(file_name, "production second", &stamp[11..13])?;

    let date = day_of_year(file_name, year, doy)?;
    let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
        ConvertError::Granule(format!("invalid production time '{}' in '{}'", stamp, file_name))
    })?;
    Ok(date.and_time(time))
}
