mod csv;
mod validator;

pub use csv::{CsvConnector, CsvOptions};
pub use validator::DataValidator;
