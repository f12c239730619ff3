pub mod board;
pub mod cancel;
pub mod console;
pub mod direct;
pub mod dispatcher;
pub mod export;
pub mod fanout;
pub mod gateway;
pub mod normalizer;
pub mod probe;

pub use crate::domain::ports::{ConfigProvider, DispatchStrategy, Storage};
pub use crate::utils::error::Result;
