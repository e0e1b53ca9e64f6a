use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use time::OffsetDateTime;
use uuid::Uuid;

/// Declares a closed set of lowercase string values stored as `text`.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? } default $default:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

text_enum!(MealType {
    Breakfast => "breakfast",
    Lunch => "lunch",
    Dinner => "dinner",
    Snack => "snack",
    Other => "other",
} default Other);

text_enum!(Unit {
    Grams => "grams",
    Serving => "serving",
    Cup => "cup",
    Piece => "piece",
    Bowl => "bowl",
    Plate => "plate",
    Ml => "ml",
    Oz => "oz",
} default Serving);

text_enum!(ReviewStatus {
    Pending => "pending",
    Reviewed => "reviewed",
    RequiresAttention => "requires_attention",
    Approved => "approved",
} default Pending);

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Nutrition {
    #[serde(default)]
    pub calories: f64,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub carbohydrates: f64,
    #[serde(default)]
    pub fat: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default)]
    pub sugar: f64,
    #[serde(default)]
    pub sodium: f64,
}

impl Nutrition {
    pub fn score(&self) -> f64 {
        self.protein * 4.0 + self.carbohydrates * 4.0 + self.fat * 9.0 + self.fiber * 2.0
    }

    /// Name of the first negative or non-finite field, if any.
    pub fn invalid_field(&self) -> Option<&'static str> {
        [
            ("calories", self.calories),
            ("protein", self.protein),
            ("carbohydrates", self.carbohydrates),
            ("fat", self.fat),
            ("fiber", self.fiber),
            ("sugar", self.sugar),
            ("sodium", self.sodium),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite() || *v < 0.0)
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DoshaImpact {
    Increase,
    Decrease,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DoshaEffect {
    #[serde(default)]
    pub vata: DoshaImpact,
    #[serde(default)]
    pub pitta: DoshaImpact,
    #[serde(default)]
    pub kapha: DoshaImpact,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Hot,
    Cold,
    Dry,
    Oily,
    Light,
    Heavy,
    Smooth,
    Rough,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Taste {
    Sweet,
    Sour,
    Salty,
    Bitter,
    Pungent,
    Astringent,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Potency {
    Hot,
    Cold,
    #[default]
    Neutral,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PostDigestiveEffect {
    #[default]
    Sweet,
    Sour,
    Pungent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AyurvedicProperties {
    #[serde(default)]
    pub dosha_effect: DoshaEffect,
    #[serde(default)]
    pub qualities: Vec<Quality>,
    #[serde(default)]
    pub taste: Vec<Taste>,
    #[serde(default)]
    pub potency: Potency,
    #[serde(default)]
    pub post_digestive_effect: PostDigestiveEffect,
}

/// Reference to an uploaded image attached to a meal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageData {
    pub filename: String,
    #[serde(default)]
    pub original_name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub upload_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceData {
    pub filename: String,
    #[serde(default)]
    pub original_name: Option<String>,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub transcription: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub upload_date: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Energetic,
    Tired,
    Happy,
    Stressed,
    Neutral,
    Bloated,
    Light,
    Heavy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Digestion {
    Good,
    Poor,
    Bloating,
    Gas,
    Constipation,
    Diarrhea,
    Normal,
}

fn default_energy_level() -> u8 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    #[serde(default)]
    pub mood: Option<Mood>,
    #[serde(default = "default_energy_level")]
    pub energy_level: u8,
    #[serde(default)]
    pub digestion: Option<Digestion>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Servings {
    #[serde(default = "one")]
    pub planned: f64,
    #[serde(default = "one")]
    pub consumed: f64,
    #[serde(default)]
    pub remaining: f64,
}

impl Default for Servings {
    fn default() -> Self {
        Self {
            planned: 1.0,
            consumed: 1.0,
            remaining: 0.0,
        }
    }
}

impl Servings {
    /// Recomputes `remaining`; called before every save.
    pub fn recompute(&mut self) {
        if self.planned > 0.0 {
            self.remaining = (self.planned - self.consumed).max(0.0);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DoctorReview {
    #[serde(default)]
    pub reviewed_by: Option<Uuid>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub review_date: Option<OffsetDateTime>,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub status: ReviewStatus,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Meal {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: MealType,
    pub food_name: String,
    pub description: Option<String>,
    pub quantity: f64,
    pub unit: Unit,
    pub nutrition: Nutrition,
    pub ayurvedic_properties: AyurvedicProperties,
    pub image_data: Option<ImageData>,
    pub voice_data: Option<VoiceData>,
    pub journal_entry: Option<JournalEntry>,
    pub servings: Servings,
    pub doctor_review: DoctorReview,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub meal_date: OffsetDateTime,
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, FromRow)]
pub struct MealRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: String,
    pub food_name: String,
    pub description: Option<String>,
    pub quantity: f64,
    pub unit: String,
    pub nutrition: Json<Nutrition>,
    pub ayurvedic_properties: Json<AyurvedicProperties>,
    pub image_data: Option<Json<ImageData>>,
    pub voice_data: Option<Json<VoiceData>>,
    pub journal_entry: Option<Json<JournalEntry>>,
    pub servings: Json<Servings>,
    pub doctor_review: Json<DoctorReview>,
    pub tags: Vec<String>,
    pub is_favorite: bool,
    pub meal_date: OffsetDateTime,
    pub location: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl TryFrom<MealRow> for Meal {
    type Error = anyhow::Error;

    fn try_from(r: MealRow) -> Result<Self, Self::Error> {
        let meal_type = MealType::parse(&r.meal_type)
            .ok_or_else(|| anyhow::anyhow!("unknown meal_type {:?} on meal {}", r.meal_type, r.id))?;
        let unit = Unit::parse(&r.unit)
            .ok_or_else(|| anyhow::anyhow!("unknown unit {:?} on meal {}", r.unit, r.id))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            meal_type,
            food_name: r.food_name,
            description: r.description,
            quantity: r.quantity,
            unit,
            nutrition: r.nutrition.0,
            ayurvedic_properties: r.ayurvedic_properties.0,
            image_data: r.image_data.map(|j| j.0),
            voice_data: r.voice_data.map(|j| j.0),
            journal_entry: r.journal_entry.map(|j| j.0),
            servings: r.servings.0,
            doctor_review: r.doctor_review.0,
            tags: r.tags,
            is_favorite: r.is_favorite,
            meal_date: r.meal_date,
            location: r.location,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}
