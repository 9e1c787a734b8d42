use std::collections::HashMap;
use std::fs::File;
use std::io::Read;

use serde::Deserialize;
use tracing::instrument;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::Coordinate,
};

/**
 * One line of the coordinate file. Columns other than these are ignored.
 */
#[derive(Debug, Deserialize)]
struct CoordinateRecord {
    zip: String,
    lat: f64,
    lng: f64,
}

/**
 * Postal code to coordinate lookup. Loaded once at startup and never changed.
 */
#[derive(Debug, Default)]
pub struct CoordinateTable {
    entries: HashMap<String, Coordinate>,
}

impl CoordinateTable {
    /**
     * Loads the coordinate table from a CSV file.
     *
     * # Arguments
     * `path`: Path to a CSV file with a header containing `zip`, `lat` and `lng`.
     *
     * # Returns
     * The loaded table or an `ApplicationError` if the file cannot be read or a line is malformed.
     */
    #[instrument(level = "info")]
    pub fn load(path: &str) -> Result<Self, ApplicationError> {
        let file = File::open(path).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to open coordinates file {path}: {err}")))?;
        let table = Self::from_reader(file)?;
        tracing::info!("Loaded {} postal code coordinates", table.len());
        Ok(table)
    }

    /**
     * Reads the coordinate table from any CSV source.
     */
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, ApplicationError> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let mut entries = HashMap::new();
        for record in csv_reader.deserialize::<CoordinateRecord>() {
            let record = record.map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to parse coordinates file: {err}")))?;
            entries.insert(record.zip, Coordinate::new(record.lat, record.lng));
        }
        Ok(CoordinateTable { entries })
    }

    /**
     * Coordinate of a postal code, or (0, 0) when the code is unknown.
     */
    pub fn get(&self, postal_code: &str) -> Coordinate {
        self.entries.get(postal_code.trim()).copied().unwrap_or_default()
    }

    pub fn lookup_all(&self, postal_codes: &[String]) -> Vec<(String, Coordinate)> {
        postal_codes.iter().map(|postal_code| (postal_code.clone(), self.get(postal_code))).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
