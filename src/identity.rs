//! Catalog identities: the (language, topic) pairs naming each catalog variant.
//!
//! Every identity maps to a default remote source URL and to a cache file
//! name. Both are pure functions of the identity.
use crate::error::DownloaderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const SPRINGER_REST_URL: &str = "https://resource-cms.springernature.com/springer-cms/rest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "en")]
    English,
    #[serde(rename = "de")]
    German,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::English => "en",
            Language::German => "de",
        }
    }

    /// Directory label used by the by-catalog layout.
    pub fn label(&self) -> &'static str {
        match self {
            Language::English => "English",
            Language::German => "German",
        }
    }
}

impl FromStr for Language {
    type Err = DownloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Language::English),
            "de" | "german" => Ok(Language::German),
            _ => Err(DownloaderError::UnknownLanguage(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "all")]
    AllDisciplines,
    #[serde(rename = "med")]
    EmergencyNursing,
}

impl Topic {
    pub fn code(&self) -> &'static str {
        match self {
            Topic::AllDisciplines => "all",
            Topic::EmergencyNursing => "med",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Topic::AllDisciplines => "All_Disciplines",
            Topic::EmergencyNursing => "Emergency_Nursing",
        }
    }
}

impl FromStr for Topic {
    type Err = DownloaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" | "all_disciplines" => Ok(Topic::AllDisciplines),
            "med" | "emergency_nursing" => Ok(Topic::EmergencyNursing),
            _ => Err(DownloaderError::UnknownTopic(s.to_string())),
        }
    }
}

/// A valid (language, topic) pair. English has no emergency nursing catalog,
/// so `(en, med)` cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawIdentity", into = "RawIdentity")]
pub struct CatalogIdentity {
    language: Language,
    topic: Topic,
}

#[derive(Serialize, Deserialize)]
struct RawIdentity {
    language: Language,
    topic: Topic,
}

impl TryFrom<RawIdentity> for CatalogIdentity {
    type Error = DownloaderError;

    fn try_from(raw: RawIdentity) -> Result<Self, Self::Error> {
        CatalogIdentity::new(raw.language, raw.topic)
    }
}

impl From<CatalogIdentity> for RawIdentity {
    fn from(identity: CatalogIdentity) -> Self {
        RawIdentity {
            language: identity.language,
            topic: identity.topic,
        }
    }
}

impl CatalogIdentity {
    /// The identity used when nothing else has been selected.
    pub const FALLBACK: CatalogIdentity = CatalogIdentity {
        language: Language::English,
        topic: Topic::AllDisciplines,
    };

    pub fn new(language: Language, topic: Topic) -> Result<Self, DownloaderError> {
        if language == Language::English && topic == Topic::EmergencyNursing {
            return Err(DownloaderError::InvalidIdentity {
                language: language.code().to_string(),
                topic: topic.code().to_string(),
            });
        }
        Ok(Self { language, topic })
    }

    /// Every identity a catalog exists for.
    pub fn all() -> Vec<CatalogIdentity> {
        [Language::English, Language::German]
            .into_iter()
            .flat_map(|language| {
                [Topic::AllDisciplines, Topic::EmergencyNursing]
                    .into_iter()
                    .filter_map(move |topic| CatalogIdentity::new(language, topic).ok())
            })
            .collect()
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }

    pub fn default_url(&self) -> String {
        let content = match (self.language, self.topic) {
            (Language::English, _) => "17858272/data/v8",
            (Language::German, Topic::AllDisciplines) => "17863240/data/v3",
            (Language::German, Topic::EmergencyNursing) => "17856246/data/v3",
        };
        format!("{}/v1/content/{}", SPRINGER_REST_URL, content)
    }

    pub fn cache_file_name(&self) -> String {
        format!("catalog-{}-{}.csv", self.language.code(), self.topic.code())
    }

    pub fn cache_path(&self, app_dir: &Path) -> PathBuf {
        app_dir.join(self.cache_file_name())
    }

    /// `<Language>/<Topic>` relative directory for the by-catalog layout.
    pub fn label_dir(&self) -> PathBuf {
        Path::new(self.language.label()).join(self.topic.label())
    }
}

impl Default for CatalogIdentity {
    fn default() -> Self {
        Self::FALLBACK
    }
}

impl fmt::Display for CatalogIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.language.code(), self.topic.code())
    }
}
