pub mod config;
pub mod errors;
pub mod language;
pub mod signing;
pub mod translate;

pub use errors::{ApplicationError, InterfaceError};
pub use language::{language_for_reaction, Language};
pub use translate::{PlaceholderTranslator, TranslateError, Translator};
