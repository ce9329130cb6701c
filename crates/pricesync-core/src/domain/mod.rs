mod daily_record;
mod symbol;
mod trading_date;

pub use daily_record::{DailyRecord, MAX_VOLUME};
pub(crate) use daily_record::volume_to_sql;
pub use symbol::{Symbol, SYMBOL_MAX_LENGTH};
pub use trading_date::{DateFormat, TradingDate};
