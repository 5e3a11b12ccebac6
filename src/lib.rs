pub mod analyzer;
pub mod antivirus;
pub mod config;
pub mod detection;
pub mod entropy;
pub mod error;
pub mod formats;
pub mod pdf;
pub mod policy;
pub mod scanning;
pub mod signatures;
pub mod trailing;
pub mod types;
pub mod validation;

pub use analyzer::Analyzer;
pub use antivirus::{AntivirusScanner, ClamdScanner, NoopScanner};
pub use config::{AnalyzerConfig, ClamdConfig};
pub use error::{AnalysisError, AntivirusError};
pub use policy::{Admission, MimeCheck, QuickCheck};
pub use signatures::{SignatureKind, SignatureTable};
pub use types::{
    AnalysisResult, Detection, DetectionContext, FileTag, PdfImageRecord, Risk, StructureResult,
    TrailingData,
};
