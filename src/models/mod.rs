mod click;

pub use click::{parse_timestamp, ClickEvent, TIMESTAMP_FORMAT};
