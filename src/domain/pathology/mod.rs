//! Pathology catalog - the fixed set of simulated dental conditions.
//!
//! Each pathology maps to a symptom profile describing how the simulated
//! patient presents. The catalog is embedded in the binary as YAML, parsed
//! once on first access, and read-only for the process lifetime.

use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Dental pathologies supported by the patient simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pathology {
    PeriodontalAbscess,
    DentalCaries,
    PulpalNecrosis,
    ChronicApicalPeriodontitis,
    AcuteApicalPeriodontitis,
    Pericoronitis,
    ReversiblePulpitis,
    AcuteTotalPulpitis,
}

impl Pathology {
    /// Every pathology in the catalog.
    pub const ALL: [Pathology; 8] = [
        Pathology::PeriodontalAbscess,
        Pathology::DentalCaries,
        Pathology::PulpalNecrosis,
        Pathology::ChronicApicalPeriodontitis,
        Pathology::AcuteApicalPeriodontitis,
        Pathology::Pericoronitis,
        Pathology::ReversiblePulpitis,
        Pathology::AcuteTotalPulpitis,
    ];

    /// Returns the catalog key for this pathology.
    pub fn as_str(&self) -> &'static str {
        match self {
            Pathology::PeriodontalAbscess => "periodontal_abscess",
            Pathology::DentalCaries => "dental_caries",
            Pathology::PulpalNecrosis => "pulpal_necrosis",
            Pathology::ChronicApicalPeriodontitis => "chronic_apical_periodontitis",
            Pathology::AcuteApicalPeriodontitis => "acute_apical_periodontitis",
            Pathology::Pericoronitis => "pericoronitis",
            Pathology::ReversiblePulpitis => "reversible_pulpitis",
            Pathology::AcuteTotalPulpitis => "acute_total_pulpitis",
        }
    }

    /// Case-insensitive lookup of a catalog key.
    pub fn parse(value: &str) -> Option<Self> {
        let key = value.trim().to_lowercase();
        Self::ALL.iter().copied().find(|p| p.as_str() == key)
    }

    /// Picks a pathology uniformly at random.
    pub fn random() -> Self {
        Self::ALL[rand::thread_rng().gen_range(0..Self::ALL.len())]
    }

    /// Returns the symptom profile for this pathology.
    pub fn profile(&self) -> &'static PathologyProfile {
        CATALOG
            .get(self)
            .expect("embedded catalog has an entry for every pathology")
    }

    /// All catalog keys, in declaration order.
    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.as_str()).collect()
    }
}

impl fmt::Display for Pathology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Symptom profile describing how a simulated patient presents.
///
/// Fields are optional at the type level; prompt rendering substitutes a
/// "Not specified" placeholder for anything missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathologyProfile {
    pub label: String,
    pub chief_complaint: Option<String>,
    pub pain: Option<String>,
    pub location: Option<String>,
    pub duration: Option<String>,
    pub appearance: Option<String>,
    pub history: Option<String>,
    pub extra: Option<String>,
}

/// Catalog entry summary for listing endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct PathologyEntry {
    pub key: &'static str,
    pub label: String,
    pub chief_complaint: Option<String>,
}

/// Lists every pathology with its label and chief complaint.
pub fn catalog_entries() -> Vec<PathologyEntry> {
    Pathology::ALL
        .iter()
        .map(|p| {
            let profile = p.profile();
            PathologyEntry {
                key: p.as_str(),
                label: profile.label.clone(),
                chief_complaint: profile.chief_complaint.clone(),
            }
        })
        .collect()
}

static CATALOG: Lazy<HashMap<Pathology, PathologyProfile>> = Lazy::new(|| {
    serde_yaml::from_str(include_str!("profiles.yaml"))
        .expect("embedded pathology catalog is valid YAML")
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_covers_every_pathology() {
        for pathology in Pathology::ALL {
            let profile = pathology.profile();
            assert!(!profile.label.is_empty(), "{} has no label", pathology);
            assert!(
                profile.chief_complaint.is_some(),
                "{} has no chief complaint",
                pathology
            );
        }
    }

    #[test]
    fn parse_accepts_known_keys_case_insensitively() {
        assert_eq!(
            Pathology::parse("dental_caries"),
            Some(Pathology::DentalCaries)
        );
        assert_eq!(
            Pathology::parse("DENTAL_CARIES"),
            Some(Pathology::DentalCaries)
        );
        assert_eq!(
            Pathology::parse("  Pericoronitis "),
            Some(Pathology::Pericoronitis)
        );
    }

    #[test]
    fn parse_rejects_unknown_keys() {
        assert_eq!(Pathology::parse("not_a_real_pathology"), None);
        assert_eq!(Pathology::parse(""), None);
    }

    #[test]
    fn random_returns_catalog_members() {
        for _ in 0..32 {
            let p = Pathology::random();
            assert!(Pathology::ALL.contains(&p));
        }
    }

    #[test]
    fn keys_match_display() {
        for pathology in Pathology::ALL {
            assert_eq!(pathology.to_string(), pathology.as_str());
        }
    }

    #[test]
    fn catalog_entries_expose_all_keys() {
        let entries = catalog_entries();
        assert_eq!(entries.len(), Pathology::ALL.len());
        assert!(entries.iter().any(|e| e.key == "dental_caries"));
    }

    #[test]
    fn pathology_serializes_to_snake_case() {
        let json = serde_json::to_string(&Pathology::AcuteTotalPulpitis).unwrap();
        assert_eq!(json, "\"acute_total_pulpitis\"");
    }
}
