mod subprocess;

pub use subprocess::{shell_quote, SubprocessAgent};
