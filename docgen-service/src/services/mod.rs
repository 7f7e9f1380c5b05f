//! Services for docgen-service.

pub mod database;
pub mod metrics;
pub mod numbering;
pub mod pipeline;
pub mod renderer;
pub mod store;

pub use database::Database;
pub use metrics::{get_metrics, init_metrics};
pub use pipeline::{DocumentPipeline, IngestOutcome, SubmitDocument};
pub use renderer::{PdfRenderer, Renderer};
pub use store::DocumentStore;
