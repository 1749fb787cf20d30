//! 공통 유틸리티 모듈

pub mod current_time;

pub use current_time::{format_datetime, format_unix_time, unix_time};
