use std::collections::HashMap;

use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    form::RecipeFilter,
    pagination::PageContext,
    schema::{CartLine, Id, RecipeListRow, ShoppingListItem, ShortRecipe},
};

use super::recipes;

async fn get_short_recipe(recipe_id: Id, pool: &Pool<Postgres>) -> Result<ShortRecipe, Error> {
    let row: Option<ShortRecipe> =
        sqlx::query_as("SELECT id, name, image, cooking_time FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?;

    row.ok_or_else(|| Error::NotFound(String::from("No recipe exists with specified id")))
}

pub async fn is_favorite(user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let row: Option<(Id,)> =
        sqlx::query_as("SELECT recipe_id FROM favorites WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row.is_some())
}

pub async fn is_in_cart(user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<bool, Error> {
    let row: Option<(Id,)> =
        sqlx::query_as("SELECT recipe_id FROM cart_entries WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe_id)
            .fetch_optional(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row.is_some())
}

/// Strict add: repeating it for the same pair is a reported conflict,
/// not a silent no-op. Concurrent losers land on the unique constraint
/// and observe zero affected rows.
pub async fn add_favorite(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipe, Error> {
    let recipe = get_short_recipe(recipe_id, pool).await?;

    let result =
        sqlx::query("INSERT INTO favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(recipe_id)
            .execute(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        log::warn!("favorite insert lost for user {} on recipe {}", user_id, recipe_id);
        return Err(Error::Conflict(String::from(
            "Recipe is already in favorites",
        )));
    }

    Ok(recipe)
}

pub async fn remove_favorite(user_id: Id, recipe_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(String::from("Recipe is not in favorites")));
    }

    Ok(())
}

pub async fn add_to_cart(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<ShortRecipe, Error> {
    let recipe = get_short_recipe(recipe_id, pool).await?;

    let result = sqlx::query(
        "INSERT INTO cart_entries (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        log::warn!("cart insert lost for user {} on recipe {}", user_id, recipe_id);
        return Err(Error::Conflict(String::from(
            "Recipe is already in the shopping cart",
        )));
    }

    Ok(recipe)
}

pub async fn remove_from_cart(
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM cart_entries WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(String::from(
            "Recipe is not in the shopping cart",
        )));
    }

    Ok(())
}

pub async fn fetch_favorites(
    user_id: Id,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeListRow>, Error> {
    let filter = RecipeFilter {
        is_favorited: true,
        ..RecipeFilter::default()
    };
    recipes::fetch_recipes(filter, Some(user_id), offset, pool).await
}

/// Read-only aggregation over everything currently in the user's cart.
/// The totals depend only on the set of recipes, not insertion order.
pub async fn build_shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListItem>, Error> {
    let rows: Vec<CartLine> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM cart_entries c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(sum_cart_lines(rows))
}

/// Groups lines by ingredient identity, sums the amounts and orders the
/// result by name with a plain ordinal compare so exports reproduce.
pub fn sum_cart_lines(rows: Vec<CartLine>) -> Vec<ShoppingListItem> {
    let mut totals: HashMap<(String, String), i64> = HashMap::new();
    for row in rows {
        *totals
            .entry((row.name, row.measurement_unit))
            .or_insert(0) += i64::from(row.amount);
    }

    let mut items: Vec<ShoppingListItem> = totals
        .into_iter()
        .map(|((name, measurement_unit), total_amount)| ShoppingListItem {
            name,
            measurement_unit,
            total_amount,
        })
        .collect();

    items.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(name: &str, unit: &str, amount: i32) -> CartLine {
        CartLine {
            name: String::from(name),
            measurement_unit: String::from(unit),
            amount,
        }
    }

    #[test]
    fn sums_per_ingredient_and_orders_by_name() {
        let items = sum_cart_lines(vec![
            line("Flour", "g", 200),
            line("Flour", "g", 300),
            line("Egg", "pcs", 2),
        ]);

        assert_eq!(
            items,
            vec![
                ShoppingListItem {
                    name: String::from("Egg"),
                    measurement_unit: String::from("pcs"),
                    total_amount: 2,
                },
                ShoppingListItem {
                    name: String::from("Flour"),
                    measurement_unit: String::from("g"),
                    total_amount: 500,
                },
            ]
        );
    }

    #[test]
    fn totals_are_insertion_order_independent() {
        let forward = sum_cart_lines(vec![
            line("Flour", "g", 200),
            line("Egg", "pcs", 2),
            line("Flour", "g", 300),
        ]);
        let reversed = sum_cart_lines(vec![
            line("Flour", "g", 300),
            line("Egg", "pcs", 2),
            line("Flour", "g", 200),
        ]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn same_name_different_unit_stays_separate() {
        let items = sum_cart_lines(vec![line("Sugar", "g", 100), line("Sugar", "tbsp", 2)]);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].measurement_unit, "g");
        assert_eq!(items[1].measurement_unit, "tbsp");
    }

    #[test]
    fn empty_cart_yields_empty_list() {
        assert!(sum_cart_lines(vec![]).is_empty());
    }
}
