use serde::Deserialize;

use super::{error::Error, schema::Id};

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientLine {
    pub id: Id,
    pub amount: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipePayload {
    pub name: String,
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
    pub cooking_time: i32,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientLine>,
}

impl RecipePayload {
    /// Checks the whole submission and reports every violation at once
    /// instead of bailing on the first one.
    pub fn validate(&self) -> Result<(), Error> {
        let mut problems: Vec<String> = Vec::new();

        if self.name.trim().is_empty() {
            problems.push(String::from("Recipe name must not be empty"));
        }
        if self.cooking_time < 1 {
            problems.push(String::from("Cooking time must be at least 1 minute"));
        }
        if self.tags.is_empty() {
            problems.push(String::from("At least one tag is required"));
        }
        if self.ingredients.is_empty() {
            problems.push(String::from("At least one ingredient is required"));
        }

        for (i, line) in self.ingredients.iter().enumerate() {
            if line.amount < 1 {
                problems.push(format!(
                    "Amount for ingredient {} must be at least 1",
                    line.id
                ));
            }
            if self.ingredients[..i].iter().any(|prev| prev.id == line.id) {
                problems.push(format!("Ingredient {} is listed more than once", line.id));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation(problems.join("; ")))
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagPayload {
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl TagPayload {
    pub fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() || self.slug.trim().is_empty() {
            return Err(Error::Validation(String::from(
                "Tag name and slug must not be empty",
            )));
        }
        if !is_hex_color(&self.color) {
            return Err(Error::Validation(format!(
                "'{}' is not a hex color",
                self.color
            )));
        }
        Ok(())
    }
}

/// `#RGB` or `#RRGGBB`.
pub fn is_hex_color(value: &str) -> bool {
    match value.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => false,
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecipeFilter {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: Option<Id>,
    #[serde(default)]
    pub is_favorited: bool,
    #[serde(default)]
    pub is_in_shopping_cart: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> RecipePayload {
        RecipePayload {
            name: String::from("Pancakes"),
            text: String::from("Mix and fry."),
            image: None,
            cooking_time: 20,
            tags: vec![1],
            ingredients: vec![
                IngredientLine { id: 1, amount: 200 },
                IngredientLine { id: 2, amount: 2 },
            ],
        }
    }

    #[test]
    fn valid_payload_passes() {
        assert!(payload().validate().is_ok());
    }

    #[test]
    fn rejects_duplicate_ingredient_even_non_adjacent() {
        let mut p = payload();
        p.ingredients.push(IngredientLine { id: 3, amount: 1 });
        p.ingredients.push(IngredientLine { id: 1, amount: 50 });
        let err = p.validate().unwrap_err();
        match err {
            Error::Validation(message) => {
                assert!(message.contains("listed more than once"))
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_tag_and_ingredient_sets() {
        let mut p = payload();
        p.tags.clear();
        p.ingredients.clear();
        let err = p.validate().unwrap_err();
        match err {
            Error::Validation(message) => {
                assert!(message.contains("tag"));
                assert!(message.contains("ingredient"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_numbers() {
        let mut p = payload();
        p.cooking_time = 0;
        p.ingredients[0].amount = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn payload_parses_from_json() {
        let p: RecipePayload = serde_json::from_str(
            r#"{
                "name": "Toast",
                "text": "Toast the bread.",
                "cooking_time": 5,
                "tags": [2],
                "ingredients": [{"id": 7, "amount": 1}]
            }"#,
        )
        .unwrap();
        assert!(p.image.is_none());
        assert!(p.validate().is_ok());
    }

    #[test]
    fn hex_colors() {
        assert!(is_hex_color("#49B64E"));
        assert!(is_hex_color("#fff"));
        assert!(!is_hex_color("49B64E"));
        assert!(!is_hex_color("#49B64"));
        assert!(!is_hex_color("#49B64G"));
        assert!(!is_hex_color("#"));
    }

    #[test]
    fn short_colors_must_stay_unpadded() {
        // a fixed-width column would hand back "#fff   " for a stored
        // "#fff"; that value is not a color and must never validate
        assert!(!is_hex_color("#fff   "));
        assert!(is_hex_color("#fff"));
    }
}
