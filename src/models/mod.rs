pub mod price_data;

pub use price_data::{PriceRecord, QueryParameters, RawRow, ResultSet, MIN_ROW_TOKENS};
