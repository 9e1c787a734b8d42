use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{PricePoint, YearMonth},
};

/**
 * One row of a price table as returned by the series query.
 */
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PriceRow {
    #[sqlx(rename = "Year")]
    pub year: i64,
    #[sqlx(rename = "Month")]
    pub month: i64,
    /**
     * Null for months without a published price.
     */
    #[sqlx(rename = "Avg_Pricing_Month")]
    pub avg_pricing_month: Option<f64>,
}

impl PriceRow {
    /**
     * Converts the row into a price point.
     *
     * # Returns
     * `None` when the row has no price, otherwise the point or a database error if year or month are out of range.
     */
    pub fn into_point(self) -> Result<Option<PricePoint>, ApplicationError> {
        let Some(price) = self.avg_pricing_month else {
            return Ok(None);
        };
        let year = i32::try_from(self.year).map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Invalid year {} in price table: {err}", self.year)))?;
        let month = u32::try_from(self.month).map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Invalid month {} in price table: {err}", self.month)))?;
        let period = YearMonth::new(year, month).map_err(|err| ApplicationError::new(ErrorType::DatabaseError, err.message))?;
        Ok(Some(PricePoint::new(period, price)))
    }
}
