pub mod correction;
pub mod engine;
pub mod filter;
pub mod grouping;
pub mod normalize;
pub mod session;
pub mod translation;

pub use crate::domain::ports::{ConfigProvider, Corrector, Pipeline, Storage, Translator};
pub use crate::utils::error::Result;
