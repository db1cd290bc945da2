//! Utility functions for bt-recover

pub mod command;
pub mod mime;
pub mod path;
pub mod url;

pub use command::*;
pub use mime::*;
pub use path::*;
pub use self::url::*;
