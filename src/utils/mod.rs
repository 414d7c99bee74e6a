pub mod db_utils;
pub mod pin_cache;
pub mod pin_filter;
