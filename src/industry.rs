//! Three-way industry classification by keyword.
//!
//! Categories are checked in a fixed priority order and the first keyword
//! hit wins, so a value mentioning both a fashion and a music keyword is
//! always fashion. Anything without a hit lands in the baseline category.

use std::{fmt, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

const FASHION_KEYWORDS: &[&str] = &[
    "fashion",
    "stylist",
    "apparel",
    "wardrobe",
    "costume",
    "tailor",
    "seamstress",
    "textile",
    "garment",
    "clothing",
    "couture",
    "boutique",
    "model",
    "footwear",
    "jewelry",
    "jewellery",
    "accessories",
];

const MUSIC_KEYWORDS: &[&str] = &[
    "music",
    "audio",
    "sound",
    "engineer",
    "tour",
    "band",
    "musician",
    "dj",
    "song",
    "record",
    "concert",
    "vocal",
    "guitar",
    "drum",
    "composer",
    "orchestra",
    "backline",
    "roadie",
    "mixing",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndustryCategory {
    #[serde(rename = "Fashion & Apparel")]
    FashionApparel,
    #[serde(rename = "Music & Audio")]
    MusicAudio,
    #[serde(rename = "Film & TV")]
    FilmTelevision,
}

impl IndustryCategory {
    /// Priority order used by [`classify_industry`]; the baseline is last.
    pub const ALL: [IndustryCategory; 3] = [
        IndustryCategory::FashionApparel,
        IndustryCategory::MusicAudio,
        IndustryCategory::FilmTelevision,
    ];

    pub const BASELINE: IndustryCategory = IndustryCategory::FilmTelevision;

    pub fn label(self) -> &'static str {
        match self {
            IndustryCategory::FashionApparel => "Fashion & Apparel",
            IndustryCategory::MusicAudio => "Music & Audio",
            IndustryCategory::FilmTelevision => "Film & TV",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            IndustryCategory::FashionApparel => FASHION_KEYWORDS,
            IndustryCategory::MusicAudio => MUSIC_KEYWORDS,
            IndustryCategory::FilmTelevision => &[],
        }
    }
}

impl fmt::Display for IndustryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for IndustryCategory {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        IndustryCategory::ALL
            .into_iter()
            .find(|category| {
                category.label().to_ascii_lowercase() == normalized
                    || category
                        .label()
                        .split(' ')
                        .next()
                        .is_some_and(|head| head.to_ascii_lowercase() == normalized)
            })
            .ok_or_else(|| {
                anyhow!(
                    "Unknown industry category '{value}'. Expected one of: {}",
                    IndustryCategory::ALL.map(IndustryCategory::label).join(", ")
                )
            })
    }
}

pub fn classify_industry(value: &str) -> IndustryCategory {
    let lowered = value.to_lowercase();
    IndustryCategory::ALL
        .into_iter()
        .find(|category| {
            category
                .keywords()
                .iter()
                .any(|keyword| lowered.contains(keyword))
        })
        .unwrap_or(IndustryCategory::BASELINE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_first_matching_category() {
        assert_eq!(
            classify_industry("Senior Fashion Stylist"),
            IndustryCategory::FashionApparel
        );
        assert_eq!(
            classify_industry("Touring Sound Engineer"),
            IndustryCategory::MusicAudio
        );
        assert_eq!(
            classify_industry("Unit Production Manager"),
            IndustryCategory::FilmTelevision
        );
    }

    #[test]
    fn fashion_wins_over_music_on_overlap() {
        assert_eq!(
            classify_industry("Tour Wardrobe Supervisor"),
            IndustryCategory::FashionApparel
        );
    }

    #[test]
    fn empty_value_falls_back_to_baseline() {
        assert_eq!(classify_industry(""), IndustryCategory::BASELINE);
    }

    #[test]
    fn category_parses_from_label_or_head_word() {
        assert_eq!(
            "music & audio".parse::<IndustryCategory>().unwrap(),
            IndustryCategory::MusicAudio
        );
        assert_eq!(
            "Fashion".parse::<IndustryCategory>().unwrap(),
            IndustryCategory::FashionApparel
        );
        assert_eq!(
            "film".parse::<IndustryCategory>().unwrap(),
            IndustryCategory::FilmTelevision
        );
        assert!("sports".parse::<IndustryCategory>().is_err());
    }
}
