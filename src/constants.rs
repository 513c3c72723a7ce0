pub const PRODUCT_COUNT_PER_PAGE: i64 = 12;
pub const RECIPE_COUNT_PER_PAGE: i64 = 9;
pub const MAX_COUNT_PER_PAGE: i64 = 100;

pub const POPULAR_RECIPE_COUNT: i64 = 8;
pub const TOP_KEYWORD_COUNT: usize = 10;
pub const OTHER_RECIPE_COUNT: i64 = 10;

pub const SESSION_LIFETIME_DAYS: i64 = 7;

pub const DEFAULT_DELIVERY_CHARGE: f64 = 60.;
pub const CASH_ON_DELIVERY: &str = "Cash on Delivery";

/// Price range reported by the filter facets when the catalog is empty.
pub const DEFAULT_PRICE_RANGE: (f64, f64) = (0., 1000.);

pub const DEFAULT_USER_IMAGE: &str =
    "https://zaaopnogqwbkasyujppf.supabase.co/storage/v1/object/public/culinary-art/users/default-user-logo.png";
