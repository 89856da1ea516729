use std::path::PathBuf;

pub const ATTRIBUTE_MIN: u8 = 1;
pub const ATTRIBUTE_MAX: u8 = 20;
pub const CATEGORY_MIN: i32 = 5;
pub const CATEGORY_MAX: i32 = 100;
pub const OVERALL_MIN: i32 = 10;
pub const OVERALL_MAX: i32 = 200;

// 1-20 attribute <-> 5-100 category.
pub const ATTRIBUTE_TO_CATEGORY_SCALE: f64 = 5.0;
pub const CATEGORY_TO_ATTRIBUTE_SCALE: f64 = 5.0;

pub const WEIGHT_TECHNICAL: i32 = 3;
pub const WEIGHT_MENTAL: i32 = 2;
pub const WEIGHT_PHYSICAL: i32 = 3;
pub const WEIGHT_GK: i32 = 2;
// All categories at 100 weigh 1000, which maps onto an overall of 200.
pub const OVERALL_SCORE_DIVISOR: i32 = 5;

/// Passes of starter-swap refinement; each pass makes at most one swap.
pub const ALLOCATION_MAX_ITERATIONS: usize = 100;
pub const STARTER_GOALKEEPERS: usize = 1;
pub const DEFENDER_PERCENT: usize = 40;
pub const MIDFIELDER_PERCENT: usize = 35;
pub const SUBSTITUTE_GK_PERCENT: usize = 10;

const DATA_DIR: &str = "matchday";
const BOOK_FILE: &str = "club_book.json";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub book_path: Option<PathBuf>,
    pub log_filter: String,
    pub seed: Option<u64>,
    /// User id edits are made as; `--as` overrides it.
    pub acting_user: Option<u32>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            book_path: default_book_path(),
            log_filter: "info".to_string(),
            seed: None,
            acting_user: None,
        }
    }
}

impl AppConfig {
    /// Reads `.env.local` / `.env` first, then the `MATCHDAY_*` variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let mut cfg = Self::default();
        if let Some(path) = non_empty_var("MATCHDAY_BOOK") {
            cfg.book_path = Some(PathBuf::from(path));
        }
        if let Some(filter) = non_empty_var("MATCHDAY_LOG") {
            cfg.log_filter = filter;
        }
        cfg.seed = non_empty_var("MATCHDAY_SEED").and_then(|val| val.parse::<u64>().ok());
        cfg.acting_user = non_empty_var("MATCHDAY_USER").and_then(|val| val.parse::<u32>().ok());
        cfg
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

pub fn default_book_path() -> Option<PathBuf> {
    if let Some(base) = non_empty_var("XDG_DATA_HOME") {
        return Some(PathBuf::from(base).join(DATA_DIR).join(BOOK_FILE));
    }
    let home = non_empty_var("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(DATA_DIR)
            .join(BOOK_FILE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_map_full_categories_onto_overall_max() {
        let full = CATEGORY_MAX * (WEIGHT_TECHNICAL + WEIGHT_MENTAL + WEIGHT_PHYSICAL + WEIGHT_GK);
        assert_eq!(full / OVERALL_SCORE_DIVISOR, OVERALL_MAX);
        let empty = CATEGORY_MIN * (WEIGHT_TECHNICAL + WEIGHT_MENTAL + WEIGHT_PHYSICAL + WEIGHT_GK);
        assert_eq!(empty / OVERALL_SCORE_DIVISOR, OVERALL_MIN);
    }
}
