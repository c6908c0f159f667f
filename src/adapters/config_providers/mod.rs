pub mod file;
pub mod inline;

pub use file::FileConfigProvider;
pub use inline::InlineConfigProvider;
