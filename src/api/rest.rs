use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::split_postal_codes,
};

/***************** Form models *********************/

/**
 * Form posted from the postal code page.
 */
#[derive(Debug, Deserialize)]
pub struct ZipCodeForm {
    /**
     * Comma separated postal codes.
     */
    pub zip_codes: String,
    /**
     * First month, `YYYY-MM`.
     */
    pub start_date: String,
    /**
     * Last month, `YYYY-MM`.
     */
    pub end_date: String,
}

impl ZipCodeForm {
    /**
     * Location of the unit type page for this form.
     *
     * # Returns
     * The path with every segment percent-encoded, or a validation error if no postal code was entered.
     */
    pub fn select_type_location(&self) -> Result<String, ApplicationError> {
        let postal_codes = split_postal_codes(&self.zip_codes);
        if postal_codes.is_empty() {
            return Err(ApplicationError::new(ErrorType::Validation, "At least one zip code is required".to_string()));
        }
        Ok(format!("/select_type/{}/{}/{}", encode_segment(&postal_codes.join(",")), encode_segment(&self.start_date), encode_segment(&self.end_date)))
    }
}

/**
 * Form posted from the unit type page.
 */
#[derive(Debug, Deserialize)]
pub struct HouseTypeForm {
    /**
     * Unit type key.
     */
    pub house_type: String,
}

/**
 * Location of the results page.
 *
 * # Arguments
 * `zip_codes`: Comma separated postal codes.
 * `house_type`: Unit type key.
 * `start_date`: First month.
 * `end_date`: Last month.
 */
pub fn show_prices_location(zip_codes: &str, house_type: &str, start_date: &str, end_date: &str) -> String {
    format!("/show_prices/{}/{}/{}/{}", encode_segment(zip_codes), encode_segment(house_type.trim()), encode_segment(start_date), encode_segment(end_date))
}

fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment.trim()).into_owned()
}

/***************** Error models *********************/

/**
 * Custom error response for the application.
 */
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /**
     * The error code associated with the error type.
     */
    pub code: u16,
    /**
     * A human-readable message describing the error.
     */
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    /**
     * Generates an error response for the application error.
     */
    fn error_response(&self) -> HttpResponse {
        if self.error_type != ErrorType::Validation {
            tracing::error!("Request failed: {}", self.message);
        }
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(self.status_code()).json(&error_response)
    }
}

/**
* Maps application errors to HTTP status codes.
*
* # Arguments
* `application_error`: The type of error that occurred.
*
* # Returns
* The corresponding HTTP status code.
*/
fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::Rendering | ErrorType::Template => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/**
 * Maps application errors to error codes.
 *
 * # Arguments
 * `application_error`: The type of error that occurred.
 *
 * # Returns
 * The corresponding error code.
 */
fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::Rendering => 1004,
        ErrorType::Template => 1005,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_select_type_location() {
        let form = ZipCodeForm { zip_codes: " 10001, 10002 ,10001".to_string(), start_date: "2020-01".to_string(), end_date: "2020-03".to_string() };
        assert_eq!(form.select_type_location().unwrap(), "/select_type/10001%2C10002/2020-01/2020-03");
    }

    #[test]
    fn test_select_type_location_without_postal_codes() {
        let form = ZipCodeForm { zip_codes: " , ".to_string(), start_date: "2020-01".to_string(), end_date: "2020-03".to_string() };
        assert_eq!(form.select_type_location().unwrap_err().error_type, ErrorType::Validation);
    }

    #[test]
    fn test_show_prices_location_encodes_segments() {
        assert_eq!(show_prices_location("10001,10002", "single_family", "2020-01", "2020-03"), "/show_prices/10001%2C10002/single_family/2020-01/2020-03");
        assert_eq!(show_prices_location("10001", "a/b c", "2020-01", "2020-03"), "/show_prices/10001/a%2Fb%20c/2020-01/2020-03");
    }

    #[test]
    fn test_error_status_codes() {
        assert_eq!(ApplicationError::new(ErrorType::Validation, "bad".to_string()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApplicationError::new(ErrorType::DatabaseError, "down".to_string()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(ApplicationError::new(ErrorType::Rendering, "font".to_string()).error_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
