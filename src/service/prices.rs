use std::sync::Arc;

use sqlx::{Pool, Sqlite};
use tracing::{Instrument, instrument};

use crate::{
    dao::prices::PriceDao,
    model::{
        apperror::{ApplicationError, ErrorType},
        models::{PriceSeries, QuerySelection, has_data},
    },
    service::chart::ChartRenderer,
};

/**
 * Outcome of a price lookup.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum PriceReport {
    /**
     * No postal code had a price in range. Nothing was rendered.
     */
    NoData { message: String },
    /**
     * Rendered chart as base64 encoded PNG.
     */
    Chart { png_base64: String },
}

/**
 * Represents the service looking up and charting prices.
 */
pub struct PriceService {
    /**
     * The DAO for price table lookups.
     */
    price_dao: PriceDao,
    /**
     * Connection pool for the price database.
     */
    connection_pool: Pool<Sqlite>,
    /**
     * Draws the chart when there is data.
     */
    chart_renderer: Arc<dyn ChartRenderer>,
}

impl PriceService {
    /**
     * Creates a new instance of `PriceService`.
     *
     * # Arguments
     * `price_dao`: The DAO for price table lookups.
     * `connection_pool`: Connection pool for the price database.
     * `chart_renderer`: Renderer used for the results chart.
     *
     * # Returns
     * A new instance of `PriceService`.
     */
    pub fn new(price_dao: PriceDao, connection_pool: Pool<Sqlite>, chart_renderer: Arc<dyn ChartRenderer>) -> Self {
        PriceService { price_dao, connection_pool, chart_renderer }
    }

    /**
     * Retrieves one price series per selected postal code.
     *
     * # Arguments
     * `selection`: Postal codes, unit type and month range.
     *
     * # Returns
     * A Result containing the series in postal code order or an `ApplicationError`.
     */
    pub async fn get_price_series(&self, selection: &QuerySelection) -> Result<Vec<PriceSeries>, ApplicationError> {
        let mut connection = self.connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire database connection: {err}")))?;
        self.price_dao.get_price_series(&mut connection, selection.unit_type, &selection.postal_codes, selection.start, selection.end).await
    }

    /**
     * Looks up the selection and renders the chart if any postal code has prices in range.
     *
     * # Arguments
     * `selection`: Postal codes, unit type and month range.
     *
     * # Returns
     * A Result containing the `PriceReport` or an `ApplicationError`.
     */
    #[instrument(skip(self), fields(unit_type = selection.unit_type.key(), postal_codes = selection.postal_codes.len()))]
    pub async fn get_price_report(&self, selection: &QuerySelection) -> Result<PriceReport, ApplicationError> {
        let span = tracing::Span::current();
        let series = self.get_price_series(selection).instrument(span.clone()).await?;
        if !has_data(&series) {
            tracing::info!("No prices found for {} in {:?}", selection.unit_type.key(), selection.postal_codes);
            return Ok(PriceReport::NoData { message: no_data_message(selection) });
        }
        let chart_renderer = self.chart_renderer.clone();
        let unit_label = selection.unit_type.label();
        let png_base64 = tokio::task::spawn_blocking(move || span.in_scope(|| chart_renderer.render(&series, unit_label)))
            .await
            .map_err(|err| ApplicationError::new(ErrorType::Rendering, format!("Chart rendering task failed: {err}")))??;
        Ok(PriceReport::Chart { png_base64 })
    }
}

/**
 * Plain text reply for a selection without prices.
 */
pub fn no_data_message(selection: &QuerySelection) -> String {
    format!(
        "No data available for the selected criteria: {} in {} from {} to {}",
        selection.unit_type.key(),
        selection.postal_codes.join(", "),
        selection.start,
        selection.end
    )
}

#[cfg(test)]
pub mod test_support {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::{
        model::{apperror::ApplicationError, models::PriceSeries},
        service::chart::ChartRenderer,
    };

    /**
     * Renderer that records its calls instead of drawing.
     */
    #[derive(Default)]
    pub struct CountingRenderer {
        pub calls: AtomicUsize,
        pub points: AtomicUsize,
    }

    impl ChartRenderer for CountingRenderer {
        fn render(&self, series: &[PriceSeries], unit_label: &str) -> Result<String, ApplicationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.points.fetch_add(series.iter().map(|price_series| price_series.points.len()).sum(), Ordering::SeqCst);
            Ok(format!("chart:{unit_label}"))
        }
    }
}

#[cfg(test)]
mod test {
    use std::str::FromStr;
    use std::sync::atomic::Ordering;

    use super::test_support::CountingRenderer;
    use super::*;
    use crate::dao::prices::test_support::{init_db, insert_price};
    use crate::model::models::{UnitType, YearMonth};

    fn selection(postal_codes: &[&str], start: &str, end: &str) -> QuerySelection {
        QuerySelection::new(
            postal_codes.iter().map(|postal_code| (*postal_code).to_string()).collect(),
            UnitType::Condo,
            YearMonth::from_str(start).unwrap(),
            YearMonth::from_str(end).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_report_renders_chart() {
        let pool = init_db().await;
        insert_price(&pool, "zip_condo", "10001", 2020, 1, Some(500_000.0)).await;
        insert_price(&pool, "zip_condo", "10001", 2020, 2, Some(510_000.0)).await;
        insert_price(&pool, "zip_condo", "10001", 2020, 3, Some(495_000.0)).await;
        let renderer = Arc::new(CountingRenderer::default());
        let service = PriceService::new(PriceDao::new(), pool, renderer.clone());
        let report = service.get_price_report(&selection(&["10001"], "2020-01", "2020-03")).await.unwrap();
        assert_eq!(report, PriceReport::Chart { png_base64: "chart:Condo".to_string() });
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(renderer.points.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_report_without_data_skips_renderer() {
        let pool = init_db().await;
        insert_price(&pool, "zip_condo", "10001", 2019, 1, Some(500_000.0)).await;
        let renderer = Arc::new(CountingRenderer::default());
        let service = PriceService::new(PriceDao::new(), pool, renderer.clone());
        let report = service.get_price_report(&selection(&["10001"], "2020-01", "2020-03")).await.unwrap();
        assert_eq!(report, PriceReport::NoData { message: "No data available for the selected criteria: condo in 10001 from 2020-01 to 2020-03".to_string() });
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_report_with_one_empty_postal_code_still_renders() {
        let pool = init_db().await;
        insert_price(&pool, "zip_condo", "10001", 2020, 1, Some(500_000.0)).await;
        let renderer = Arc::new(CountingRenderer::default());
        let service = PriceService::new(PriceDao::new(), pool, renderer.clone());
        let report = service.get_price_report(&selection(&["99999", "10001"], "2020-01", "2020-03")).await.unwrap();
        assert!(matches!(report, PriceReport::Chart { .. }));
        assert_eq!(renderer.points.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_price_series_keeps_selection_order() {
        let pool = init_db().await;
        insert_price(&pool, "zip_condo", "10002", 2020, 1, Some(1.0)).await;
        insert_price(&pool, "zip_condo", "10001", 2020, 1, Some(2.0)).await;
        let service = PriceService::new(PriceDao::new(), pool, Arc::new(CountingRenderer::default()));
        let series = service.get_price_series(&selection(&["10002", "10001"], "2020-01", "2020-01")).await.unwrap();
        let postal_codes: Vec<&str> = series.iter().map(|price_series| price_series.postal_code.as_str()).collect();
        assert_eq!(postal_codes, vec!["10002", "10001"]);
    }
}
