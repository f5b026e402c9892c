//! Flag-emoji reactions that map to a translation target.
//!
//! Slack reports some country flags as `fr`/`jp` and others as `flag-mx`,
//! so the lookup accepts both spellings.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Language {
    /// ISO-639-1 code as understood by translation providers.
    pub code: &'static str,
    /// Human-readable name used in replies.
    pub name: &'static str,
}

const REACTION_LANGUAGES: [(&str, Language); 3] = [
    ("fr", Language { code: "fr", name: "French" }),
    ("mx", Language { code: "es", name: "Spanish" }),
    ("jp", Language { code: "ja", name: "Japanese" }),
];

/// Returns the language a reaction asks for, or `None` for any emoji that is
/// not one of the supported flags.
pub fn language_for_reaction(reaction: &str) -> Option<Language> {
    let emoji_code = if reaction.contains("flag-") {
        reaction.split('-').nth(1)?
    } else {
        reaction
    };

    REACTION_LANGUAGES
        .iter()
        .find(|(candidate, _)| *candidate == emoji_code)
        .map(|(_, language)| *language)
}

#[cfg(test)]
mod tests {
    use super::{language_for_reaction, Language};

    #[test]
    fn bare_country_codes_resolve() {
        assert_eq!(
            language_for_reaction("fr"),
            Some(Language { code: "fr", name: "French" })
        );
        assert_eq!(
            language_for_reaction("mx"),
            Some(Language { code: "es", name: "Spanish" })
        );
        assert_eq!(
            language_for_reaction("jp"),
            Some(Language { code: "ja", name: "Japanese" })
        );
    }

    #[test]
    fn flag_prefixed_codes_resolve() {
        assert_eq!(language_for_reaction("flag-mx").map(|language| language.code), Some("es"));
        assert_eq!(language_for_reaction("flag-fr").map(|language| language.name), Some("French"));
    }

    #[test]
    fn unsupported_reactions_return_none() {
        for reaction in ["thumbsup", "+1", "flag-de", "de", "", "flag-", "FR"] {
            assert_eq!(language_for_reaction(reaction), None, "reaction `{reaction}`");
        }
    }
}
