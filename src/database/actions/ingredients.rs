use sqlx::{Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    pagination::PageContext,
    schema::{Id, Ingredient, IngredientRow},
    INGREDIENT_COUNT_PER_PAGE,
};

pub async fn create_ingredient(
    name: &str,
    measurement_unit: &str,
    pool: &Pool<Postgres>,
) -> Result<Id, Error> {
    if name.trim().is_empty() || measurement_unit.trim().is_empty() {
        return Err(Error::Validation(String::from(
            "Ingredient name and measurement unit must not be empty",
        )));
    }

    let row: (Id,) = sqlx::query_as(
        "INSERT INTO ingredients (name, measurement_unit) VALUES ($1, $2) RETURNING id",
    )
    .bind(name)
    .bind(measurement_unit)
    .fetch_one(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row.0)
}

pub async fn get_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<Option<Ingredient>, Error> {
    let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row)
}

/// Prefix search over the catalog, alphabetical.
pub async fn list_ingredients(
    search: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, Error> {
    let rows: Vec<Ingredient> = match search {
        Some(search) => {
            sqlx::query_as("SELECT * FROM ingredients WHERE name ILIKE $1 ORDER BY name")
                .bind(format!("{search}%"))
                .fetch_all(pool)
                .await
                .map_err(|e| Error::from(QueryError::from(e)))?
        }
        None => sqlx::query_as("SELECT * FROM ingredients ORDER BY name")
            .fetch_all(pool)
            .await
            .map_err(|e| Error::from(QueryError::from(e)))?,
    };

    Ok(rows)
}

pub async fn fetch_ingredients(
    search: String,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<IngredientRow>, Error> {
    let rows: Vec<IngredientRow> = sqlx::query_as(
        "
        SELECT i.*, COUNT(*) OVER() AS count
        FROM ingredients i
        WHERE i.name ILIKE $1
        ORDER BY i.name
        LIMIT $2 OFFSET $3
    ",
    )
    .bind(format!("{search}%"))
    .bind(INGREDIENT_COUNT_PER_PAGE)
    .bind(offset)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, INGREDIENT_COUNT_PER_PAGE, offset);
    Ok(page)
}

/// Removes an ingredient from the catalog. Rows referenced by any
/// recipe are delete-protected at the store level and surface as a
/// conflict rather than cascading.
pub async fn delete_ingredient(id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    let result = sqlx::query("DELETE FROM ingredients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(String::from(
            "No ingredient exists with specified id",
        )));
    }

    Ok(())
}
