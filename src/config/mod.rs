pub mod manifest;
pub mod settings;
