//! Canned image recognition, transcription and keyword-based voice analysis.

use lazy_static::lazy_static;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Serialize;

use crate::{
    meals::repo_types::{
        AyurvedicProperties, DoshaEffect, DoshaImpact, MealType, Nutrition, Potency, Quality,
        Taste, Unit,
    },
    nutrition::table,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IdentifiedFood {
    pub name: String,
    pub confidence: f64,
    pub quantity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageAnalysis {
    pub identified_foods: Vec<IdentifiedFood>,
    pub nutrition: Nutrition,
    pub ayurvedic_properties: AyurvedicProperties,
}

const MOCK_FOOD: &str = "Grilled Chicken Salad";

/// Fixed recognition result; `food_name` replaces the identified name when given.
pub fn analyze_image(food_name: Option<&str>) -> ImageAnalysis {
    let name = food_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(MOCK_FOOD);
    ImageAnalysis {
        identified_foods: vec![IdentifiedFood {
            name: name.to_string(),
            confidence: 0.85,
            quantity: 1.0,
            unit: Unit::Serving,
        }],
        nutrition: Nutrition {
            calories: 320.0,
            protein: 25.0,
            carbohydrates: 15.0,
            fat: 18.0,
            fiber: 6.0,
            sugar: 8.0,
            sodium: 450.0,
        },
        ayurvedic_properties: AyurvedicProperties {
            dosha_effect: DoshaEffect {
                vata: DoshaImpact::Decrease,
                pitta: DoshaImpact::Neutral,
                kapha: DoshaImpact::Decrease,
            },
            qualities: vec![Quality::Light, Quality::Dry],
            taste: vec![Taste::Bitter, Taste::Astringent],
            potency: Potency::Cold,
            ..Default::default()
        },
    }
}

pub const CANNED_TRANSCRIPTIONS: [&str; 5] = [
    "I had a chicken salad for lunch with about 200 grams of grilled chicken and mixed vegetables",
    "Breakfast was oatmeal with banana and some almonds",
    "Dinner included rice, dal, and vegetables",
    "I ate two apples and a handful of nuts as a snack",
    "Had a bowl of vegetable soup with bread",
];

/// Supplied text wins; otherwise a random canned sentence stands in for speech-to-text.
pub fn transcribe(text: Option<&str>) -> String {
    if let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) {
        return text.to_string();
    }
    CANNED_TRANSCRIPTIONS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(CANNED_TRANSCRIPTIONS[0])
        .to_string()
}

/// Keywords in reporting order.
const VOICE_FOODS: [&str; 22] = [
    "rice", "chicken", "salad", "apple", "banana", "bread", "milk", "egg", "oatmeal", "almonds",
    "nuts", "vegetables", "dal", "soup", "fish", "yogurt", "cheese", "pasta", "potato", "tomato",
    "onion", "garlic",
];

const NUMBER_WORDS: [&str; 10] = [
    "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtractedFood {
    pub name: String,
    pub quantity: f64,
    pub unit: Unit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct VoiceNutrition {
    pub calories: f64,
    pub protein: f64,
    pub carbohydrates: f64,
    pub fat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceAnalysis {
    pub extracted_meals: Vec<ExtractedFood>,
    pub meal_type: MealType,
    pub nutrition: VoiceNutrition,
    pub confidence: f64,
}

fn detect_meal_type(text: &str) -> MealType {
    let has = |words: &[&str]| words.iter().any(|w| text.contains(w));
    if has(&["breakfast", "morning"]) {
        MealType::Breakfast
    } else if has(&["lunch", "afternoon"]) {
        MealType::Lunch
    } else if has(&["dinner", "evening"]) {
        MealType::Dinner
    } else if has(&["snack"]) {
        MealType::Snack
    } else {
        MealType::Other
    }
}

/// Quantity from the word preceding the first word that contains `food`.
pub fn extract_quantity(text: &str, food: &str) -> u32 {
    lazy_static! {
        static ref DIGITS_RE: Regex = Regex::new(r"^\d+$").unwrap();
    }
    let words: Vec<&str> = text.split(' ').collect();
    let Some(idx) = words.iter().position(|w| w.contains(food)) else {
        return 1;
    };
    if idx == 0 {
        return 1;
    }
    let prev = words[idx - 1];
    if let Some(n) = NUMBER_WORDS.iter().position(|w| *w == prev) {
        return n as u32 + 1;
    }
    if DIGITS_RE.is_match(prev) {
        return prev.parse().unwrap_or(1);
    }
    1
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn analyze_voice(transcription: &str) -> VoiceAnalysis {
    let text = transcription.to_lowercase();

    let extracted_meals: Vec<ExtractedFood> = VOICE_FOODS
        .iter()
        .filter(|food| text.contains(*food))
        .map(|food| ExtractedFood {
            name: capitalize(food),
            quantity: f64::from(extract_quantity(&text, food)),
            unit: Unit::Serving,
        })
        .collect();

    let totals = extracted_meals
        .iter()
        .map(|f| table::analyze(&f.name, f.quantity))
        .fold(VoiceNutrition::default(), |mut t, n| {
            t.calories += n.calories;
            t.protein += n.protein;
            t.carbohydrates += n.carbohydrates;
            t.fat += n.fat;
            t
        });

    VoiceAnalysis {
        meal_type: detect_meal_type(&text),
        confidence: if extracted_meals.is_empty() { 0.3 } else { 0.8 },
        nutrition: VoiceNutrition {
            calories: totals.calories.round(),
            protein: round1(totals.protein),
            carbohydrates: round1(totals.carbohydrates),
            fat: round1(totals.fat),
        },
        extracted_meals,
    }
}
