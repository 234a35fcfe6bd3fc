use sqlx::{Pool, Postgres};

mod user;
pub use user::UserExt;

mod product;
pub use product::ProductExt;

mod category;
pub use category::CategoryExt;

mod order;
pub use order::{CreateOrderError, OrderExt};

#[derive(Debug, Clone)]
pub struct DBClient {
    pool: Pool<Postgres>,
}

impl DBClient {
    pub fn new(pool: Pool<Postgres>) -> Self {
        DBClient { pool }
    }
}

/// OFFSET for a 1-based page. Saturates so an absurd page number from the
/// query string clamps instead of overflowing.
fn page_offset(page: i64, limit: i64) -> i64 {
    page.saturating_sub(1).saturating_mul(limit)
}

#[cfg(test)]
mod tests {
    use super::page_offset;

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(page_offset(1, 6), 0);
        assert_eq!(page_offset(2, 6), 6);
        assert_eq!(page_offset(5, 10), 40);
    }

    #[test]
    fn page_offset_clamps_on_huge_page_numbers() {
        assert_eq!(page_offset(i64::MAX, 6), i64::MAX);
        assert_eq!(page_offset(i64::MAX - 1, 10), i64::MAX);
    }
}
