//! Core functionality for bt-recover

pub mod invoker;
pub mod progress;
pub mod request;
pub mod resolver;
pub mod validator;

pub use invoker::*;
pub use progress::*;
pub use request::*;
pub use resolver::*;
pub use validator::*;
