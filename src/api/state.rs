use crate::{dao::coordinates::CoordinateTable, service::prices::PriceService};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * Postal code coordinates, loaded at startup and read-only afterwards.
     */
    pub coordinates: CoordinateTable,
    /**
     * The price service for looking up and charting prices.
     */
    pub price_service: PriceService,
    /**
     * Hosted dashboard the room type and region page redirects to.
     */
    pub dashboard_url: String,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `coordinates`: Postal code coordinate table.
 * `price_service`: The price service for looking up and charting prices.
 * `dashboard_url`: External dashboard location.
 */
impl AppState {
    pub fn new(coordinates: CoordinateTable, price_service: PriceService, dashboard_url: String) -> Self {
        AppState { coordinates, price_service, dashboard_url }
    }
}
