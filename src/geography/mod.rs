//! Geography profiles, the profile registry, and location-code resolution.
//!
//! A [`GeographyProfile`] is a closed taxonomy: a table of location codes
//! with display names, a derived lower-cased name lookup, and a grouping of
//! codes into named regions. The [`ProfileRegistry`] is passed in by the
//! caller (there is no process-wide table), which lets tests and
//! configuration files swap in their own profiles.
//!
//! Detection scores every registered profile against a sample of location
//! values and picks the best one above [`DETECTION_THRESHOLD`]. When nothing
//! qualifies a generic identity profile is synthesized from the sample.

mod builtin;

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::ProfileError;

/// Minimum score a profile must exceed to be selected.
pub const DETECTION_THRESHOLD: f64 = 0.3;
/// Number of non-empty location values considered during detection.
pub const DETECTION_SAMPLE_LIMIT: usize = 200;
pub const GENERIC_PROFILE_ID: &str = "generic";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapType {
    UsStates,
    CanadaProvinces,
    AustraliaStates,
    WorldCountries,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub codes: Vec<String>,
}

/// Serialized form of a profile, as found in configuration files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSpec {
    pub id: String,
    pub display_name: String,
    #[serde(default = "default_location_label")]
    pub location_label: String,
    #[serde(default = "default_region_label")]
    pub region_label: String,
    #[serde(default = "default_map_type")]
    pub map_type: MapType,
    pub locations: Vec<Location>,
    #[serde(default)]
    pub regions: Vec<Region>,
}

fn default_location_label() -> String {
    "Location".to_string()
}

fn default_region_label() -> String {
    "Region".to_string()
}

fn default_map_type() -> MapType {
    MapType::None
}

#[derive(Debug, Clone, Serialize)]
pub struct GeographyProfile {
    pub id: String,
    pub display_name: String,
    pub location_label: String,
    pub region_label: String,
    pub map_type: MapType,
    locations: Vec<Location>,
    regions: Vec<Region>,
    #[serde(skip)]
    code_index: HashMap<String, usize>,
    #[serde(skip)]
    name_to_code: HashMap<String, String>,
    #[serde(skip)]
    region_index: HashMap<String, usize>,
}

impl GeographyProfile {
    pub fn from_spec(spec: ProfileSpec) -> Result<Self, ProfileError> {
        let ProfileSpec {
            id,
            display_name,
            location_label,
            region_label,
            map_type,
            locations,
            regions,
        } = spec;

        let locations = locations
            .into_iter()
            .map(|location| Location {
                code: location.code.trim().to_uppercase(),
                name: location.name.trim().to_string(),
            })
            .collect::<Vec<_>>();

        let mut code_index = HashMap::with_capacity(locations.len());
        let mut name_to_code = HashMap::with_capacity(locations.len());
        for (idx, location) in locations.iter().enumerate() {
            code_index.entry(location.code.clone()).or_insert(idx);
            let lowered = location.name.to_lowercase();
            if let Some(existing) = name_to_code.insert(lowered, location.code.clone())
                && existing != location.code
            {
                return Err(ProfileError::AmbiguousName {
                    profile: id,
                    name: location.name.clone(),
                });
            }
        }

        let regions = regions
            .into_iter()
            .map(|region| Region {
                name: region.name,
                codes: region
                    .codes
                    .into_iter()
                    .map(|code| code.trim().to_uppercase())
                    .collect(),
            })
            .collect::<Vec<_>>();

        let mut region_index = HashMap::new();
        for (idx, region) in regions.iter().enumerate() {
            for code in &region.codes {
                if !code_index.contains_key(code) {
                    return Err(ProfileError::UnknownRegionCode {
                        profile: id,
                        region: region.name.clone(),
                        code: code.clone(),
                    });
                }
                if region_index.insert(code.clone(), idx).is_some() {
                    return Err(ProfileError::CodeInMultipleRegions {
                        profile: id,
                        code: code.clone(),
                    });
                }
            }
        }

        Ok(Self {
            id,
            display_name,
            location_label,
            region_label,
            map_type,
            locations,
            regions,
            code_index,
            name_to_code,
            region_index,
        })
    }

    /// Identity profile built from the distinct observed values.
    pub fn generic(observed: &[String]) -> Self {
        let mut seen = HashSet::new();
        let mut locations = Vec::new();
        let mut code_index = HashMap::new();
        let mut name_to_code = HashMap::new();
        for value in observed {
            let trimmed = value.trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_string()) {
                continue;
            }
            code_index.insert(trimmed.to_uppercase(), locations.len());
            name_to_code
                .entry(trimmed.to_lowercase())
                .or_insert_with(|| trimmed.to_string());
            locations.push(Location {
                code: trimmed.to_string(),
                name: trimmed.to_string(),
            });
        }
        Self {
            id: GENERIC_PROFILE_ID.to_string(),
            display_name: "Generic".to_string(),
            location_label: "Location".to_string(),
            region_label: "Region".to_string(),
            map_type: MapType::None,
            locations,
            regions: Vec::new(),
            code_index,
            name_to_code,
            region_index: HashMap::new(),
        }
    }

    pub fn is_generic(&self) -> bool {
        self.map_type == MapType::None && self.id == GENERIC_PROFILE_ID
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn display_name_for(&self, code: &str) -> Option<&str> {
        self.code_index
            .get(&code.to_uppercase())
            .map(|idx| self.locations[*idx].name.as_str())
    }

    pub fn region_of(&self, code: &str) -> Option<&str> {
        self.region_index
            .get(&code.to_uppercase())
            .map(|idx| self.regions[*idx].name.as_str())
    }

    /// Whether a raw value is a known code (upper-cased) or name (lower-cased).
    pub fn matches(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        self.code_index.contains_key(&trimmed.to_uppercase())
            || self.name_to_code.contains_key(&trimmed.to_lowercase())
    }

    /// Fraction of the sample this profile recognises; an empty sample scores zero.
    pub fn score<S: AsRef<str>>(&self, sample: &[S]) -> f64 {
        if sample.is_empty() {
            return 0.0;
        }
        let matched = sample.iter().filter(|v| self.matches(v.as_ref())).count();
        matched as f64 / sample.len() as f64
    }

    /// Resolves a raw location value to its canonical code.
    ///
    /// Codes are tried before names. The generic profile accepts any
    /// non-empty value as its own code.
    pub fn resolve_code(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if self.is_generic() {
            return Some(trimmed.to_string());
        }
        if let Some(idx) = self.code_index.get(&trimmed.to_uppercase()) {
            return Some(self.locations[*idx].code.clone());
        }
        self.name_to_code.get(&trimmed.to_lowercase()).cloned()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileScore {
    pub profile_id: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub profile: Arc<GeographyProfile>,
    pub score: f64,
    pub scores: Vec<ProfileScore>,
}

#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: Vec<Arc<GeographyProfile>>,
}

impl ProfileRegistry {
    pub fn new(profiles: Vec<GeographyProfile>) -> Result<Self, ProfileError> {
        let mut ids = HashSet::new();
        for profile in &profiles {
            if !ids.insert(profile.id.clone()) {
                return Err(ProfileError::DuplicateProfile(profile.id.clone()));
            }
        }
        Ok(Self {
            profiles: profiles.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn builtin() -> Result<Self, ProfileError> {
        let profiles = builtin::BUILTIN_TABLES
            .iter()
            .map(|table| {
                GeographyProfile::from_spec(ProfileSpec {
                    id: table.id.to_string(),
                    display_name: table.display_name.to_string(),
                    location_label: table.location_label.to_string(),
                    region_label: table.region_label.to_string(),
                    map_type: table.map_type,
                    locations: table
                        .locations
                        .iter()
                        .map(|(code, name)| Location {
                            code: code.to_string(),
                            name: name.to_string(),
                        })
                        .collect(),
                    regions: table
                        .regions
                        .iter()
                        .map(|(name, codes)| Region {
                            name: name.to_string(),
                            codes: codes.iter().map(|c| c.to_string()).collect(),
                        })
                        .collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(profiles)
    }

    /// Appends profiles after the existing ones, keeping registration order.
    pub fn extended(&self, extra: Vec<GeographyProfile>) -> Result<Self, ProfileError> {
        let mut profiles = self
            .profiles
            .iter()
            .map(|p| p.as_ref().clone())
            .collect::<Vec<_>>();
        profiles.extend(extra);
        Self::new(profiles)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &GeographyProfile> {
        self.profiles.iter().map(|p| p.as_ref())
    }

    pub fn get(&self, id: &str) -> Option<Arc<GeographyProfile>> {
        self.profiles.iter().find(|p| p.id == id).cloned()
    }

    /// Best score any registered profile achieves on the sample.
    pub fn best_score<S: AsRef<str>>(&self, sample: &[S]) -> f64 {
        self.profiles
            .iter()
            .map(|p| p.score(sample))
            .fold(0.0, f64::max)
    }

    pub fn detect<S: AsRef<str>>(&self, values: &[S]) -> Detection {
        let sample = location_sample(values.iter().map(|v| v.as_ref()));
        let mut best: Option<(usize, f64)> = None;
        let mut scores = Vec::with_capacity(self.profiles.len());
        for (idx, profile) in self.profiles.iter().enumerate() {
            let score = profile.score(&sample);
            debug!("Profile '{}' scored {:.3}", profile.id, score);
            scores.push(ProfileScore {
                profile_id: profile.id.clone(),
                score,
            });
            if score > DETECTION_THRESHOLD && best.is_none_or(|(_, top)| score > top) {
                best = Some((idx, score));
            }
        }
        match best {
            Some((idx, score)) => Detection {
                profile: Arc::clone(&self.profiles[idx]),
                score,
                scores,
            },
            None => Detection {
                profile: Arc::new(GeographyProfile::generic(&sample)),
                score: 0.0,
                scores,
            },
        }
    }
}

/// First [`DETECTION_SAMPLE_LIMIT`] non-empty trimmed values.
pub fn location_sample<'a, I>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .take(DETECTION_SAMPLE_LIMIT)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_profile() -> GeographyProfile {
        GeographyProfile::from_spec(ProfileSpec {
            id: "islands".into(),
            display_name: "Islands".into(),
            location_label: "Island".into(),
            region_label: "Chain".into(),
            map_type: MapType::None,
            locations: vec![
                Location {
                    code: "ma".into(),
                    name: "Maui".into(),
                },
                Location {
                    code: "OA".into(),
                    name: "Oahu".into(),
                },
            ],
            regions: vec![Region {
                name: "Central".into(),
                codes: vec!["MA".into(), "oa".into()],
            }],
        })
        .unwrap()
    }

    #[test]
    fn builtin_profiles_are_well_formed() {
        let registry = ProfileRegistry::builtin().unwrap();
        let ids = registry.profiles().map(|p| p.id.as_str()).collect::<Vec<_>>();
        assert_eq!(
            ids,
            vec![
                "us_states",
                "canada_provinces",
                "australia_states",
                "world_countries"
            ]
        );
        let us = registry.get("us_states").unwrap();
        assert_eq!(us.locations().len(), 51);
        let grouped: usize = us.regions().iter().map(|r| r.codes.len()).sum();
        assert_eq!(grouped, 51);
    }

    #[test]
    fn scoring_matches_codes_and_names() {
        let registry = ProfileRegistry::builtin().unwrap();
        let sample = ["CA", "California", "NY", "Ontario"];
        let us = registry.get("us_states").unwrap();
        let canada = registry.get("canada_provinces").unwrap();
        assert!((us.score(&sample) - 0.75).abs() < f64::EPSILON);
        assert!((canada.score(&sample) - 0.25).abs() < f64::EPSILON);
        assert_eq!(registry.detect(&sample).profile.id, "us_states");
    }

    #[test]
    fn detection_falls_back_to_generic_profile() {
        let registry = ProfileRegistry::builtin().unwrap();
        let detection = registry.detect(&["Gotham", "Metropolis", "Gotham", " "]);
        assert!(detection.profile.is_generic());
        assert_eq!(detection.profile.locations().len(), 2);
        assert_eq!(
            detection.profile.resolve_code(" Star City "),
            Some("Star City".to_string())
        );
        assert!(detection.profile.regions().is_empty());
    }

    #[test]
    fn detection_requires_score_above_threshold() {
        let registry = ProfileRegistry::new(vec![fixture_profile()]).unwrap();
        // 3 of 10 is exactly the threshold and must not be selected.
        let mut sample = vec!["Maui", "OA", "maui"];
        sample.extend(["x"; 7]);
        assert!(registry.detect(&sample).profile.is_generic());
        sample[3] = "Oahu";
        assert_eq!(registry.detect(&sample).profile.id, "islands");
    }

    #[test]
    fn equal_scores_prefer_first_registered() {
        let mut second = fixture_profile();
        second.id = "islands_copy".into();
        let registry = ProfileRegistry::new(vec![fixture_profile(), second]).unwrap();
        assert_eq!(registry.detect(&["Maui"]).profile.id, "islands");
    }

    #[test]
    fn resolve_code_prefers_codes_then_names() {
        let profile = fixture_profile();
        assert_eq!(profile.resolve_code("ma"), Some("MA".to_string()));
        assert_eq!(profile.resolve_code("OAHU"), Some("OA".to_string()));
        assert_eq!(profile.resolve_code("Kauai"), None);
        assert_eq!(profile.region_of("oa"), Some("Central"));
        assert_eq!(profile.display_name_for("MA"), Some("Maui"));
    }

    #[test]
    fn malformed_profiles_are_rejected() {
        let mut spec = ProfileSpec {
            id: "bad".into(),
            display_name: "Bad".into(),
            location_label: "L".into(),
            region_label: "R".into(),
            map_type: MapType::None,
            locations: vec![Location {
                code: "A".into(),
                name: "Alpha".into(),
            }],
            regions: vec![
                Region {
                    name: "One".into(),
                    codes: vec!["A".into()],
                },
                Region {
                    name: "Two".into(),
                    codes: vec!["A".into()],
                },
            ],
        };
        assert!(matches!(
            GeographyProfile::from_spec(spec.clone()),
            Err(ProfileError::CodeInMultipleRegions { .. })
        ));
        spec.regions = vec![Region {
            name: "One".into(),
            codes: vec!["Z".into()],
        }];
        assert!(matches!(
            GeographyProfile::from_spec(spec),
            Err(ProfileError::UnknownRegionCode { .. })
        ));
    }

    #[test]
    fn registry_rejects_duplicate_ids() {
        let result = ProfileRegistry::new(vec![fixture_profile(), fixture_profile()]);
        assert!(matches!(result, Err(ProfileError::DuplicateProfile(_))));
    }
}
