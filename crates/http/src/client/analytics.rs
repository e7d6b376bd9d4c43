//! Dashboard analytics endpoints

use super::{ClientError, ShopClient};
use crate::types::{DateRange, SalesInterval, SalesQuery};
use reqwest::Method;
use shopfront_core::{SalesPoint, SalesSummary};

impl ShopClient {
    pub async fn sales_summary(&self, range: DateRange) -> Result<SalesSummary, ClientError> {
        let request = self
            .request(Method::GET, "/analytics/summary")
            .query(&range);
        self.execute(request).await
    }

    /// Revenue and order counts bucketed by `interval`
    pub async fn sales_series(
        &self,
        range: DateRange,
        interval: SalesInterval,
    ) -> Result<Vec<SalesPoint>, ClientError> {
        let query = SalesQuery {
            from: range.from,
            to: range.to,
            interval,
        };
        let request = self.request(Method::GET, "/analytics/sales").query(&query);
        self.execute(request).await
    }
}
