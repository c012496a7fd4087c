pub mod text;
pub mod vision;

pub use text::parse_report;
pub use vision::{OcrOdds, OddsReader, VisionOddsReader};
