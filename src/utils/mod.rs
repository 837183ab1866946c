pub mod db_utils;
pub mod qr_filter;
pub mod spreadsheet;
