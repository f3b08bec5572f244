//! Concrete implementations for the outside world: workbook files,
//! translation services and correction sources.

pub mod correction;
pub mod translator;
pub mod xlsx;

pub use correction::{
    load_corrector, AcceptMachine, CorrectionSource, CorrectionsFile, InteractiveCorrector,
};
pub use translator::{build_translator, TranslationProvider, TranslatorSettings};
