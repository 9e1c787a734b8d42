use actix_web::{HttpResponse, http::header::ContentType};
use askama::Template;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{Coordinate, UnitType, YearMonth},
};

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate;

#[derive(Template)]
#[template(path = "about.html")]
pub struct AboutTemplate;

#[derive(Template)]
#[template(path = "source.html")]
pub struct SourceTemplate;

/**
 * Postal codes and month range form.
 */
#[derive(Template)]
#[template(path = "by_zip_code.html")]
pub struct ZipCodeFormTemplate;

/**
 * Unit type form. Shows the entered postal codes with their coordinates.
 */
#[derive(Template)]
#[template(path = "select_type.html")]
pub struct SelectTypeTemplate {
    pub coordinates: Vec<(String, Coordinate)>,
    pub start_date: String,
    pub end_date: String,
    pub unit_types: Vec<UnitType>,
}

/**
 * Results page embedding the rendered chart.
 */
#[derive(Template)]
#[template(path = "show_prices.html")]
pub struct ShowPricesTemplate {
    pub unit_label: &'static str,
    pub postal_codes: Vec<String>,
    pub start_date: YearMonth,
    pub end_date: YearMonth,
    /**
     * Base64 encoded PNG.
     */
    pub plot_png: String,
}

/**
 * Renders a template into an HTML response.
 *
 * # Arguments
 * `template`: The page to render.
 *
 * # Returns
 * A Result containing the HTML response or an `ApplicationError` if rendering fails.
 */
pub fn render_page<T: Template>(template: &T) -> Result<HttpResponse, ApplicationError> {
    let html = template.render().map_err(|err| ApplicationError::new(ErrorType::Template, format!("Failed to render page: {err}")))?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(html))
}
