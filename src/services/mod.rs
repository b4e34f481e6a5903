pub mod extraction_service;
pub mod image;
pub mod settings_service;

pub use extraction_service::{ExtractionBackend, ExtractionService, OpenAiVisionBackend, VOCABULARY_PROMPT};
pub use image::ImagePayload;
pub use settings_service::CredentialStore;
