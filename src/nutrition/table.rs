use crate::meals::repo_types::Nutrition;

const fn facts(
    calories: f64,
    protein: f64,
    carbohydrates: f64,
    fat: f64,
    fiber: f64,
    sugar: f64,
    sodium: f64,
) -> Nutrition {
    Nutrition {
        calories,
        protein,
        carbohydrates,
        fat,
        fiber,
        sugar,
        sodium,
    }
}

/// Values per 100 units of quantity. Order matters: the first key contained in a
/// food name wins, so "chicken salad" resolves to chicken.
const FOODS: &[(&str, Nutrition)] = &[
    ("rice", facts(130.0, 2.7, 28.0, 0.3, 0.4, 0.1, 1.0)),
    ("chicken", facts(165.0, 31.0, 0.0, 3.6, 0.0, 0.0, 74.0)),
    ("apple", facts(52.0, 0.3, 14.0, 0.2, 2.4, 10.0, 1.0)),
    ("bread", facts(79.0, 2.7, 15.0, 1.0, 0.8, 1.6, 146.0)),
    ("milk", facts(42.0, 3.4, 5.0, 1.0, 0.0, 5.0, 44.0)),
    ("egg", facts(155.0, 13.0, 1.1, 11.0, 0.0, 1.1, 124.0)),
    ("banana", facts(89.0, 1.1, 23.0, 0.3, 2.6, 12.0, 1.0)),
    ("salad", facts(15.0, 1.4, 3.0, 0.2, 1.5, 1.4, 28.0)),
    ("oatmeal", facts(68.0, 2.4, 12.0, 1.4, 1.6, 0.5, 1.0)),
    ("almonds", facts(164.0, 6.0, 6.0, 14.0, 3.5, 1.2, 1.0)),
    ("nuts", facts(200.0, 5.0, 4.0, 20.0, 2.0, 1.0, 2.0)),
    ("vegetables", facts(25.0, 2.0, 5.0, 0.2, 2.5, 2.0, 30.0)),
    ("dal", facts(120.0, 8.0, 20.0, 1.0, 4.0, 2.0, 200.0)),
    ("soup", facts(80.0, 3.0, 12.0, 2.0, 2.0, 4.0, 600.0)),
    ("fish", facts(140.0, 25.0, 0.0, 5.0, 0.0, 0.0, 60.0)),
    ("yogurt", facts(100.0, 10.0, 6.0, 5.0, 0.0, 6.0, 80.0)),
    ("cheese", facts(113.0, 7.0, 1.0, 9.0, 0.0, 0.5, 174.0)),
    ("pasta", facts(131.0, 5.0, 25.0, 1.0, 1.5, 1.0, 1.0)),
    ("potato", facts(77.0, 2.0, 17.0, 0.1, 2.2, 0.8, 6.0)),
    ("tomato", facts(18.0, 0.9, 3.9, 0.2, 1.2, 2.6, 5.0)),
    ("onion", facts(40.0, 1.1, 9.0, 0.1, 1.7, 4.2, 4.0)),
    ("garlic", facts(149.0, 6.4, 33.0, 0.5, 2.1, 1.0, 17.0)),
];

const UNKNOWN_FOOD: Nutrition = facts(100.0, 2.0, 20.0, 2.0, 2.0, 5.0, 50.0);

/// Keys of the table in match order.
pub fn known_foods() -> impl Iterator<Item = &'static str> {
    FOODS.iter().map(|(name, _)| *name)
}

/// Base values for the first table key contained in `food_name`.
pub fn lookup(food_name: &str) -> Option<&'static Nutrition> {
    let name = food_name.to_lowercase();
    FOODS
        .iter()
        .find(|(key, _)| name.contains(key))
        .map(|(_, n)| n)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Scales per-100 base values to `quantity`.
pub fn scale(base: &Nutrition, quantity: f64) -> Nutrition {
    let m = quantity / 100.0;
    Nutrition {
        calories: (base.calories * m).round(),
        protein: round1(base.protein * m),
        carbohydrates: round1(base.carbohydrates * m),
        fat: round1(base.fat * m),
        fiber: round1(base.fiber * m),
        sugar: round1(base.sugar * m),
        sodium: (base.sodium * m).round(),
    }
}

pub fn analyze(food_name: &str, quantity: f64) -> Nutrition {
    scale(lookup(food_name).unwrap_or(&UNKNOWN_FOOD), quantity)
}
