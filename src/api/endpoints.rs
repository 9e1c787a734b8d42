use actix_web::{
    HttpResponse, get,
    http::header::{self, ContentType},
    post,
    web::{self, Path},
};
use tracing::{Instrument, instrument};

use crate::{
    api::{
        pages::{AboutTemplate, HomeTemplate, SelectTypeTemplate, ShowPricesTemplate, SourceTemplate, ZipCodeFormTemplate, render_page},
        rest::{HouseTypeForm, ZipCodeForm, show_prices_location},
        state::AppState,
    },
    model::{
        apperror::ApplicationError,
        models::{QuerySelection, UnitType, split_postal_codes},
    },
    service::prices::PriceReport,
};

/**
 * Registers every page of the application.
 */
pub fn configure(config: &mut web::ServiceConfig) {
    config
        .service(home)
        .service(about)
        .service(source)
        .service(by_room_type_and_region)
        .service(zip_code_form)
        .service(zip_code_submit)
        .service(select_type_form)
        .service(select_type_submit)
        .service(show_prices);
}

#[instrument(level = "info", fields(service = "home"))]
#[get("/")]
pub async fn home() -> Result<HttpResponse, ApplicationError> {
    render_page(&HomeTemplate)
}

#[instrument(level = "info", fields(service = "about"))]
#[get("/about")]
pub async fn about() -> Result<HttpResponse, ApplicationError> {
    render_page(&AboutTemplate)
}

#[instrument(level = "info", fields(service = "source"))]
#[get("/source")]
pub async fn source() -> Result<HttpResponse, ApplicationError> {
    render_page(&SourceTemplate)
}

/**
 * Prices by room type and region live in an external dashboard.
 */
#[instrument(level = "info", skip(app_state), fields(service = "byRoomTypeAndRegion"))]
#[get("/by_room_type_and_region")]
pub async fn by_room_type_and_region(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Found().insert_header((header::LOCATION, app_state.dashboard_url.as_str())).finish()
}

/**
 * Postal code and month range form.
 */
#[instrument(level = "info", fields(service = "zipCodeForm"))]
#[get("/by_zip_code")]
pub async fn zip_code_form() -> Result<HttpResponse, ApplicationError> {
    render_page(&ZipCodeFormTemplate)
}

/**
 * Passes the entered postal codes and months on to the unit type page.
 */
#[instrument(level = "info", fields(service = "zipCodeSubmit"))]
#[post("/by_zip_code")]
pub async fn zip_code_submit(form: web::Form<ZipCodeForm>) -> Result<HttpResponse, ApplicationError> {
    let location = form.select_type_location()?;
    Ok(HttpResponse::SeeOther().insert_header((header::LOCATION, location)).finish())
}

/**
 * Unit type form, listing the coordinates of the entered postal codes.
 */
#[instrument(level = "info", skip(app_state), fields(service = "selectTypeForm"))]
#[get("/select_type/{zip_codes}/{start_date}/{end_date}")]
pub async fn select_type_form(path: Path<(String, String, String)>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let (zip_codes, start_date, end_date) = path.into_inner();
    let coordinates = app_state.coordinates.lookup_all(&split_postal_codes(&zip_codes));
    render_page(&SelectTypeTemplate { coordinates, start_date, end_date, unit_types: UnitType::ALL.to_vec() })
}

/**
 * Passes all inputs on to the results page.
 */
#[instrument(level = "info", fields(service = "selectTypeSubmit"))]
#[post("/select_type/{zip_codes}/{start_date}/{end_date}")]
pub async fn select_type_submit(path: Path<(String, String, String)>, form: web::Form<HouseTypeForm>) -> HttpResponse {
    let (zip_codes, start_date, end_date) = path.into_inner();
    let location = show_prices_location(&split_postal_codes(&zip_codes).join(","), &form.house_type, &start_date, &end_date);
    HttpResponse::SeeOther().insert_header((header::LOCATION, location)).finish()
}

/**
 * Looks up the selection and shows the chart, or a plain text message when nothing matched.
 */
#[instrument(level = "info", skip(app_state), fields(service = "showPrices"))]
#[get("/show_prices/{zip_codes}/{house_type}/{start_date}/{end_date}")]
pub async fn show_prices(path: Path<(String, String, String, String)>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let (zip_codes, house_type, start_date, end_date) = path.into_inner();
    let selection = QuerySelection::from_path(&zip_codes, &house_type, &start_date, &end_date)?;
    match app_state.price_service.get_price_report(&selection).instrument(span).await? {
        PriceReport::NoData { message } => Ok(HttpResponse::Ok().content_type(ContentType::plaintext()).body(message)),
        PriceReport::Chart { png_base64 } => render_page(&ShowPricesTemplate {
            unit_label: selection.unit_type.label(),
            postal_codes: selection.postal_codes,
            start_date: selection.start,
            end_date: selection.end,
            plot_png: png_base64,
        }),
    }
}
