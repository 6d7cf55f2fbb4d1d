mod file_key;
mod fs;

pub use file_key::file_key;
pub use fs::{read_json_opt, remove_if_exists, write_json_atomic};
