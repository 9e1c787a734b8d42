use sqlx::SqliteConnection;
use tracing::{Instrument, instrument};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    db::PriceRow,
    models::{PricePoint, PriceSeries, UnitType, YearMonth},
};

/**
 * SQL query to retrieve the monthly prices of one postal code between two month ordinals, inclusive.
 * `{table}` is replaced with `UnitType::table_name`, never with user input.
 */
const QUERY_PRICE_SERIES: &str = "SELECT CAST(Year AS INTEGER) AS Year, CAST(Month AS INTEGER) AS Month, CAST(Avg_Pricing_Month AS REAL) AS Avg_Pricing_Month
                                  FROM {table}
                                  WHERE Zipcode = ?1 AND (Year * 12 + Month - 1) BETWEEN ?2 AND ?3
                                  ORDER BY Year, Month";

/**
 * DAO for the per unit type price tables.
 */
pub struct PriceDao {}

impl PriceDao {
    /**
     * Creates a new instance of `PriceDao`.
     *
     * # Returns
     * A new instance of `PriceDao`.
     */
    pub fn new() -> Self {
        PriceDao {}
    }

    /**
     * Retrieves the price series of every postal code within the month range.
     *
     * # Arguments
     * `connection`: The database connection.
     * `unit_type`: Selects the price table.
     * `postal_codes`: Postal codes to look up, one series is returned for each in the same order.
     * `start`: First month, inclusive.
     * `end`: Last month, inclusive.
     *
     * # Returns
     * A Result containing one `PriceSeries` per postal code, possibly empty, or an `ApplicationError`.
     */
    #[instrument(skip(self, connection), fields(table = unit_type.table_name(), result))]
    pub async fn get_price_series(&self, connection: &mut SqliteConnection, unit_type: UnitType, postal_codes: &[String], start: YearMonth, end: YearMonth) -> Result<Vec<PriceSeries>, ApplicationError> {
        let span = tracing::Span::current();
        let query = QUERY_PRICE_SERIES.replace("{table}", unit_type.table_name());
        let mut series = Vec::with_capacity(postal_codes.len());
        for postal_code in postal_codes {
            let rows: Vec<PriceRow> = sqlx::query_as(&query)
                .bind(postal_code.as_str())
                .bind(start.ordinal())
                .bind(end.ordinal())
                .fetch_all(&mut *connection)
                .instrument(span.clone())
                .await
                .map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to execute query to get prices from {}: {err}", unit_type.table_name())))?;
            let points = Self::to_points(rows)?;
            tracing::debug!("Postal code {} has {} prices in range", postal_code, points.len());
            series.push(PriceSeries::new(postal_code.clone(), points));
        }
        span.record("result", series.iter().map(|price_series| price_series.points.len()).sum::<usize>());
        Ok(series)
    }

    /**
     * Converts rows into price points, dropping rows without a price.
     */
    fn to_points(rows: Vec<PriceRow>) -> Result<Vec<PricePoint>, ApplicationError> {
        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            if let Some(point) = row.into_point()? {
                points.push(point);
            }
        }
        Ok(points)
    }
}

#[cfg(test)]
pub mod test_support {
    use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};

    /**
     * In-memory database with an empty price table per unit type. A single connection keeps every query on the same database.
     */
    pub async fn init_db() -> Pool<Sqlite> {
        let pool = SqlitePoolOptions::new().max_connections(1).connect("sqlite::memory:").await.unwrap();
        for unit_type in crate::model::models::UnitType::ALL {
            sqlx::query(&format!("CREATE TABLE {} (Zipcode TEXT, Year INTEGER, Month INTEGER, Avg_Pricing_Month REAL)", unit_type.table_name()))
                .execute(&pool)
                .await
                .unwrap();
        }
        pool
    }

    pub async fn insert_price(pool: &Pool<Sqlite>, table: &str, zipcode: &str, year: i64, month: i64, price: Option<f64>) {
        sqlx::query(&format!("INSERT INTO {table} (Zipcode, Year, Month, Avg_Pricing_Month) VALUES (?1, ?2, ?3, ?4)"))
            .bind(zipcode)
            .bind(year)
            .bind(month)
            .bind(price)
            .execute(pool)
            .await
            .unwrap();
    }
}


#[cfg(feature = "integration-test")]
#[cfg(test)]
mod integration_test {
    use super::*;
    use sqlx::SqlitePool;

    #[tokio::test]
    async fn test_every_unit_type_table_is_queryable() {
        let pool = init_db().await;
        let price_dao = PriceDao::new();
        let mut connection = pool.acquire().await.unwrap();
        let start = YearMonth::new(2015, 1).unwrap();
        let end = YearMonth::new(2020, 12).unwrap();
        for unit_type in UnitType::ALL {
            let result = price_dao.get_price_series(&mut connection, unit_type, &["10001".to_string()], start, end).await;
            assert!(result.is_ok(), "{}", unit_type.table_name());
        }
    }

    #[tokio::test]
    async fn test_known_postal_code_has_ordered_prices() {
        let pool = init_db().await;
        let mut connection = pool.acquire().await.unwrap();
        let series = PriceDao::new()
            .get_price_series(&mut connection, UnitType::SingleFamily, &["10001".to_string(), "94105".to_string()], YearMonth::new(2010, 1).unwrap(), YearMonth::new(2020, 12).unwrap())
            .await
            .unwrap();
        assert_eq!(series.len(), 2);
        for price_series in series {
            assert!(price_series.points.windows(2).all(|pair| pair[0].period < pair[1].period));
        }
    }

    async fn init_db() -> SqlitePool {
        dotenv::from_filename(".env-test").ok();
        SqlitePool::connect(dotenv::var("DATABASE_URL").unwrap().as_str()).await.unwrap()
    }
}
