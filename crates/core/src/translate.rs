use async_trait::async_trait;
use thiserror::Error;

use crate::language::Language;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TranslateError {
    #[error("translation provider failed: {0}")]
    Provider(String),
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, language: &Language) -> Result<String, TranslateError>;
}

/// Stand-in until a real provider is wired up; echoes the target language
/// instead of translating.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlaceholderTranslator;

#[async_trait]
impl Translator for PlaceholderTranslator {
    async fn translate(&self, _text: &str, language: &Language) -> Result<String, TranslateError> {
        Ok(format!(":sparkles: Imagine this is in {}", language.name))
    }
}

#[cfg(test)]
mod tests {
    use super::{PlaceholderTranslator, Translator};
    use crate::language::language_for_reaction;

    #[tokio::test]
    async fn placeholder_names_the_target_language() {
        let language = language_for_reaction("jp").expect("jp is supported");
        let translated =
            PlaceholderTranslator.translate("good morning", &language).await.expect("translate");

        assert_eq!(translated, ":sparkles: Imagine this is in Japanese");
    }
}
