use crate::domain::errors::DomainError;
use crate::domain::ports::ReportRepository;
use crate::domain::report::DashboardStats;

const TOP_PRODUCTS: i64 = 5;

pub struct ReportService<R> {
    repo: R,
    low_stock_threshold: i32,
}

impl<R: ReportRepository> ReportService<R> {
    pub fn new(repo: R, low_stock_threshold: i32) -> Self {
        Self {
            repo,
            low_stock_threshold,
        }
    }

    pub fn dashboard(&self) -> Result<DashboardStats, DomainError> {
        self.repo.dashboard(self.low_stock_threshold, TOP_PRODUCTS)
    }
}
