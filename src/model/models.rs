use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * A calendar month, ordered by year and then month.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, ApplicationError> {
        if !(1..=12).contains(&month) {
            return Err(ApplicationError::new(ErrorType::Validation, format!("Invalid month {month} for year {year}")));
        }
        Ok(YearMonth { year, month })
    }

    /**
     * Months since year zero. Used for range filtering and as the chart x coordinate.
     */
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_ordinal(ordinal: i64) -> Self {
        YearMonth { year: ordinal.div_euclid(12) as i32, month: ordinal.rem_euclid(12) as u32 + 1 }
    }
}

impl FromStr for YearMonth {
    type Err = ApplicationError;

    /**
     * Parses `YYYY-MM`, the value submitted by a month input.
     */
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let date = NaiveDate::parse_from_str(&format!("{}-01", value.trim()), "%Y-%m-%d")
            .map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid month '{value}', expected YYYY-MM: {err}")))?;
        Ok(YearMonth { year: date.year(), month: date.month() })
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/**
 * Housing unit types. Each one is backed by exactly one price table.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitType {
    Condo,
    SingleFamily,
    OneBedroom,
    TwoBedroom,
    ThreeBedroom,
    FourBedroom,
    FiveBedroomOrMore,
}

impl UnitType {
    pub const ALL: [UnitType; 7] = [
        UnitType::Condo,
        UnitType::SingleFamily,
        UnitType::OneBedroom,
        UnitType::TwoBedroom,
        UnitType::ThreeBedroom,
        UnitType::FourBedroom,
        UnitType::FiveBedroomOrMore,
    ];

    /**
     * Key used in forms and URLs.
     */
    pub fn key(&self) -> &'static str {
        match self {
            UnitType::Condo => "condo",
            UnitType::SingleFamily => "single_family",
            UnitType::OneBedroom => "1bedroom",
            UnitType::TwoBedroom => "2bedroom",
            UnitType::ThreeBedroom => "3bedroom",
            UnitType::FourBedroom => "4bedroom",
            UnitType::FiveBedroomOrMore => "5bedroom",
        }
    }

    /**
     * Name of the price table holding this unit type.
     */
    pub fn table_name(&self) -> &'static str {
        match self {
            UnitType::Condo => "zip_condo",
            UnitType::SingleFamily => "zip_single_family",
            UnitType::OneBedroom => "zip_1bedroom",
            UnitType::TwoBedroom => "zip_2bedroom",
            UnitType::ThreeBedroom => "zip_3bedroom",
            UnitType::FourBedroom => "zip_4bedroom",
            UnitType::FiveBedroomOrMore => "zip_5bedroom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            UnitType::Condo => "Condo",
            UnitType::SingleFamily => "Single Family",
            UnitType::OneBedroom => "1 Bedroom",
            UnitType::TwoBedroom => "2 Bedroom",
            UnitType::ThreeBedroom => "3 Bedroom",
            UnitType::FourBedroom => "4 Bedroom",
            UnitType::FiveBedroomOrMore => "5+ Bedroom",
        }
    }
}

impl FromStr for UnitType {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        UnitType::ALL
            .into_iter()
            .find(|unit_type| unit_type.key() == value)
            .ok_or_else(|| ApplicationError::new(ErrorType::Validation, format!("Unknown unit type '{value}'")))
    }
}

/**
 * Geographic position of a postal code.
 */
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Coordinate { lat, lng }
    }
}

/**
 * The inputs collected by the page sequence.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySelection {
    /**
     * Trimmed, de-duplicated postal codes in the order they were entered.
     */
    pub postal_codes: Vec<String>,
    pub unit_type: UnitType,
    pub start: YearMonth,
    pub end: YearMonth,
}

impl QuerySelection {
    pub fn new(postal_codes: Vec<String>, unit_type: UnitType, start: YearMonth, end: YearMonth) -> Self {
        QuerySelection { postal_codes, unit_type, start, end }
    }

    /**
     * Builds a selection from the raw path segments of the results page.
     *
     * # Arguments
     * `zip_codes`: Comma separated postal codes.
     * `house_type`: Unit type key.
     * `start_date`: First month, `YYYY-MM`.
     * `end_date`: Last month, `YYYY-MM`.
     *
     * # Returns
     * The selection, or a validation error if the unit type or a month is malformed.
     */
    pub fn from_path(zip_codes: &str, house_type: &str, start_date: &str, end_date: &str) -> Result<Self, ApplicationError> {
        Ok(QuerySelection::new(split_postal_codes(zip_codes), UnitType::from_str(house_type)?, YearMonth::from_str(start_date)?, YearMonth::from_str(end_date)?))
    }
}

/**
 * Splits a comma separated list of postal codes, dropping blanks and repeats.
 */
pub fn split_postal_codes(raw: &str) -> Vec<String> {
    let mut postal_codes: Vec<String> = Vec::new();
    for postal_code in raw.split(',').map(str::trim).filter(|postal_code| !postal_code.is_empty()) {
        if !postal_codes.iter().any(|known| known == postal_code) {
            postal_codes.push(postal_code.to_string());
        }
    }
    postal_codes
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub period: YearMonth,
    pub price: f64,
}

impl PricePoint {
    pub fn new(period: YearMonth, price: f64) -> Self {
        PricePoint { period, price }
    }
}

/**
 * Ordered prices of one postal code inside the selected range.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub postal_code: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(postal_code: String, points: Vec<PricePoint>) -> Self {
        PriceSeries { postal_code, points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/**
 * True when at least one series has a price in range.
 */
pub fn has_data(series: &[PriceSeries]) -> bool {
    series.iter().any(|price_series| !price_series.is_empty())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_year_month_parse() {
        let year_month = YearMonth::from_str("2020-03").unwrap();
        assert_eq!(year_month, YearMonth { year: 2020, month: 3 });
        assert_eq!(year_month.to_string(), "2020-03");
    }

    #[test]
    fn test_year_month_parse_invalid() {
        assert_eq!(YearMonth::from_str("2020-13").unwrap_err().error_type, ErrorType::Validation);
        assert_eq!(YearMonth::from_str("March").unwrap_err().error_type, ErrorType::Validation);
        assert_eq!(YearMonth::from_str("").unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_year_month_ordering() {
        assert!(YearMonth::new(2019, 12).unwrap() < YearMonth::new(2020, 1).unwrap());
        assert!(YearMonth::new(2020, 2).unwrap() < YearMonth::new(2020, 10).unwrap());
        assert!(YearMonth::new(2020, 0).is_err());
    }

    #[test]
    fn test_year_month_ordinal_roundtrip() {
        let year_month = YearMonth::new(2021, 12).unwrap();
        assert_eq!(YearMonth::from_ordinal(year_month.ordinal()), year_month);
        assert_eq!(YearMonth::new(2021, 1).unwrap().ordinal() - YearMonth::new(2020, 12).unwrap().ordinal(), 1);
    }

    #[test]
    fn test_unit_type_parse() {
        assert_eq!(UnitType::from_str("condo").unwrap(), UnitType::Condo);
        assert_eq!(UnitType::from_str(" 3bedroom ").unwrap(), UnitType::ThreeBedroom);
        assert_eq!(UnitType::from_str("condo; DROP TABLE zip_condo").unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_unit_type_tables_are_prefixed_keys() {
        for unit_type in UnitType::ALL {
            assert_eq!(unit_type.table_name(), format!("zip_{}", unit_type.key()));
        }
    }

    #[test]
    fn test_split_postal_codes() {
        assert_eq!(split_postal_codes("10001, 10002,,10001 , 94105"), vec!["10001", "10002", "94105"]);
        assert!(split_postal_codes(" , ").is_empty());
    }

    #[test]
    fn test_selection_from_path() {
        let selection = QuerySelection::from_path("10001", "condo", "2020-01", "2020-03").unwrap();
        assert_eq!(selection.postal_codes, vec!["10001"]);
        assert_eq!(selection.unit_type, UnitType::Condo);
        assert_eq!(selection.start, YearMonth::new(2020, 1).unwrap());
        assert_eq!(selection.end, YearMonth::new(2020, 3).unwrap());
        assert!(QuerySelection::from_path("10001", "castle", "2020-01", "2020-03").is_err());
    }

    #[test]
    fn test_has_data() {
        let empty = PriceSeries::new("10001".to_string(), vec![]);
        let filled = PriceSeries::new("10002".to_string(), vec![PricePoint::new(YearMonth::new(2020, 1).unwrap(), 1.0)]);
        assert!(!has_data(&[empty.clone()]));
        assert!(has_data(&[empty, filled]));
        assert!(!has_data(&[]));
    }
}
