pub mod http_range_source;
pub mod local_range_source;
pub mod range_source;

pub use http_range_source::HttpRangeSource;
pub use local_range_source::LocalRangeSource;
pub use range_source::RangeSource;
