use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

const EN_BUNDLE: &str = include_str!("../lang/en.json");
const ES_BUNDLE: &str = include_str!("../lang/es.json");

/// Cookie the language choice is remembered in.
pub const LANG_COOKIE: &str = "i18next";
/// Query parameter that selects a language.
pub const LANG_QUERY: &str = "lng";

#[derive(Error, Debug)]
pub enum I18nError {
    #[error("Language bundle \"{lang}\" is malformed: {source}")]
    Bundle {
        lang: Lang,
        source: serde_json::Error,
    },

    #[error("Unsupported language \"{0}\"")]
    Unsupported(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Es,
}

impl Lang {
    pub const ALL: [Lang; 2] = [Lang::En, Lang::Es];

    pub fn code(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Es => "es",
        }
    }

    /// Matches on the primary subtag, so `es-MX` is Spanish.
    pub fn from_tag(tag: &str) -> Option<Lang> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        Lang::ALL.into_iter().find(|lang| lang.code() == primary)
    }

    /// Picks the page language: query, then cookie, then `Accept-Language`,
    /// then `fallback`.
    pub fn detect(
        query: Option<&str>,
        cookie: Option<&str>,
        accept_language: Option<&str>,
        fallback: Lang,
    ) -> Lang {
        query
            .and_then(Lang::from_tag)
            .or_else(|| cookie.and_then(Lang::from_tag))
            .or_else(|| accept_language.and_then(preferred_language))
            .unwrap_or(fallback)
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Lang {
    type Err = I18nError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        Lang::from_tag(tag).ok_or_else(|| I18nError::Unsupported(tag.to_string()))
    }
}

/// First supported language of an `Accept-Language` header, by weight.
fn preferred_language(header: &str) -> Option<Lang> {
    let mut ranges: Vec<(&str, f32)> = header
        .split(',')
        .filter_map(|range| {
            let mut parts = range.split(';');
            let tag = parts.next()?.trim();
            let weight = parts
                .find_map(|param| param.trim().strip_prefix("q="))
                .and_then(|q| q.parse::<f32>().ok())
                .unwrap_or(1.0);
            (!tag.is_empty() && weight > 0.0).then_some((tag, weight))
        })
        .collect();
    ranges.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranges.into_iter().find_map(|(tag, _)| Lang::from_tag(tag))
}

type Bundle = BTreeMap<String, String>;

/// The static language bundles.
#[derive(Clone, Debug)]
pub struct Translations {
    en: Bundle,
    es: Bundle,
}

impl Translations {
    pub fn load() -> Result<Self, I18nError> {
        Translations::from_sources(EN_BUNDLE, ES_BUNDLE)
    }

    pub fn from_sources(en: &str, es: &str) -> Result<Self, I18nError> {
        let parse = |lang: Lang, source: &str| {
            serde_json::from_str::<Bundle>(source)
                .map_err(|source| I18nError::Bundle { lang, source })
        };
        Ok(Translations {
            en: parse(Lang::En, en)?,
            es: parse(Lang::Es, es)?,
        })
    }

    fn bundle(&self, lang: Lang) -> &Bundle {
        match lang {
            Lang::En => &self.en,
            Lang::Es => &self.es,
        }
    }

    /// Text for `key` in `lang`, falling back to English and then to the key.
    pub fn t<'a>(&'a self, lang: Lang, key: &'a str) -> &'a str {
        self.bundle(lang)
            .get(key)
            .or_else(|| self.en.get(key))
            .map(String::as_str)
            .unwrap_or(key)
    }
}
