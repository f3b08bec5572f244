pub mod document;
pub mod ooxml;
pub mod spreadsheet;

pub use document::{compose_document, CategoryIndex};
pub use spreadsheet::{export_csv, export_spreadsheet, read_translation_records};
