// Domain layer: report/translation models, categories and ports (interfaces).

pub mod category;
pub mod model;
pub mod ports;
