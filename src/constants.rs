pub const DEFAULT_PAGE_SIZE: i64 = 6;
pub const MAX_PAGE_SIZE: i64 = 100;

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;
pub const TAG_SLUG_MAX_LENGTH: usize = 20;
pub const TAG_NAME_MAX_LENGTH: usize = 100;
pub const INGREDIENT_NAME_MAX_LENGTH: usize = 200;
pub const MEASUREMENT_UNIT_MAX_LENGTH: usize = 200;
pub const USER_NAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;

// One year.
pub const MAX_SESSION_HOURS: i64 = 24 * 365;

pub const SESSION_COOKIE: &str = "session";
pub const TOKEN_PREFIX: &str = "Token ";

pub const SHOPPING_LIST_FILENAME: &str = "shopping_ingredients.txt";
