//! Pure helpers shared by workbench services.

pub mod crud_template;
pub mod draft_validator;
pub mod id_generator;
pub mod result_formatter;

// Re-export commonly used types
pub use crud_template::CrudTemplateGenerator;
pub use draft_validator::DraftValidator;
pub use id_generator::IdGenerator;
pub use result_formatter::ResultFormatter;
