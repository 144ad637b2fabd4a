use std::collections::HashSet;

use sqlx::{Pool, Postgres, QueryBuilder, Transaction};

use crate::{
    error::{Error, QueryError},
    form::{IngredientLine, RecipeFilter, RecipePayload},
    pagination::PageContext,
    schema::{Id, Recipe, RecipeIngredientRow, RecipeListRow, RecipeView, ShortRecipe},
    RECIPE_COUNT_PER_PAGE,
};

use super::{memberships, tags, users};

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row)
}

/// Resolves a recipe for mutation: only the author may touch it.
pub async fn get_recipe_mut(id: Id, user_id: Id, pool: &Pool<Postgres>) -> Result<Recipe, Error> {
    match get_recipe(id, pool).await? {
        Some(recipe) => {
            if recipe.author_id != user_id {
                Err(Error::Unauthorized(String::from(
                    "Only the author may modify this recipe",
                )))
            } else {
                Ok(recipe)
            }
        }
        None => Err(Error::NotFound(String::from(
            "No recipe exists with specified id",
        ))),
    }
}

/// Persists a new recipe together with its tag set and ingredient lines
/// in one transaction. A failure at any step leaves no partial recipe
/// behind. Returns the full read view, so the caller sees resolved
/// ingredient names and membership flags rather than raw ids.
pub async fn create_recipe(
    author_id: Id,
    payload: RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    payload.validate()?;

    let mut tx = pool.begin().await.map_err(|e| Error::from(QueryError::from(e)))?;

    check_tags_exist(&payload.tags, &mut tx).await?;
    check_ingredients_exist(&payload.ingredients, &mut tx).await?;

    let row: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, text, image, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&payload.name)
    .bind(&payload.text)
    .bind(&payload.image)
    .bind(payload.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    let recipe_id = row.0;

    insert_recipe_tags(recipe_id, &payload.tags, &mut tx).await?;
    insert_recipe_ingredients(recipe_id, &payload.ingredients, &mut tx).await?;

    tx.commit().await.map_err(|e| Error::from(QueryError::from(e)))?;
    log::debug!("user {author_id} created recipe {recipe_id}");

    get_recipe_view(recipe_id, Some(author_id), pool).await
}

/// Updates the scalars and set-replaces both association sets in one
/// transaction: the old tag links and ingredient lines are discarded
/// entirely, never merged, so no stale join rows survive an edit.
pub async fn update_recipe(
    recipe_id: Id,
    user_id: Id,
    payload: RecipePayload,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    payload.validate()?;
    get_recipe_mut(recipe_id, user_id, pool).await?;

    let mut tx = pool.begin().await.map_err(|e| Error::from(QueryError::from(e)))?;

    check_tags_exist(&payload.tags, &mut tx).await?;
    check_ingredients_exist(&payload.ingredients, &mut tx).await?;

    sqlx::query("UPDATE recipes SET name = $1, text = $2, image = $3, cooking_time = $4 WHERE id = $5")
        .bind(&payload.name)
        .bind(&payload.text)
        .bind(&payload.image)
        .bind(payload.cooking_time)
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    insert_recipe_tags(recipe_id, &payload.tags, &mut tx).await?;
    insert_recipe_ingredients(recipe_id, &payload.ingredients, &mut tx).await?;

    tx.commit().await.map_err(|e| Error::from(QueryError::from(e)))?;
    log::debug!("user {user_id} updated recipe {recipe_id}");

    get_recipe_view(recipe_id, Some(user_id), pool).await
}

pub async fn delete_recipe(recipe_id: Id, user_id: Id, pool: &Pool<Postgres>) -> Result<(), Error> {
    get_recipe_mut(recipe_id, user_id, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(())
}

async fn check_tags_exist(tag_ids: &[Id], tx: &mut Transaction<'_, Postgres>) -> Result<(), Error> {
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
        .bind(tag_ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    let found: HashSet<Id> = rows.into_iter().map(|r| r.0).collect();
    match tag_ids.iter().find(|id| !found.contains(id)) {
        Some(id) => Err(Error::NotFound(format!("No tag exists with id {id}"))),
        None => Ok(()),
    }
}

async fn check_ingredients_exist(
    lines: &[IngredientLine],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let ids: Vec<Id> = lines.iter().map(|line| line.id).collect();
    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    let found: HashSet<Id> = rows.into_iter().map(|r| r.0).collect();
    match ids.iter().find(|id| !found.contains(id)) {
        Some(id) => Err(Error::NotFound(format!(
            "No ingredient exists with id {id}"
        ))),
        None => Ok(()),
    }
}

async fn insert_recipe_tags(
    recipe_id: Id,
    tag_ids: &[Id],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    // tag ids are a set; repeats in the submission collapse
    let mut seen: HashSet<Id> = HashSet::new();
    let unique: Vec<Id> = tag_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");

    query_builder.push_values(unique.iter(), |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(())
}

async fn insert_recipe_ingredients(
    recipe_id: Id,
    lines: &[IngredientLine],
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(lines.iter(), |mut b, line| {
        b.push_bind(recipe_id).push_bind(line.id).push_bind(line.amount);
    });

    query_builder
        .build()
        .execute(&mut **tx)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(())
}

pub async fn list_recipe_ingredients(
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeIngredientRow>, Error> {
    let rows: Vec<RecipeIngredientRow> = sqlx::query_as(
        "
        SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = $1
    ",
    )
    .bind(recipe_id)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(rows)
}

/// Composed read view. The membership flags are computed for the viewer
/// and are always false for anonymous callers.
pub async fn get_recipe_view(
    id: Id,
    viewer: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, Error> {
    let recipe = get_recipe(id, pool).await?.ok_or_else(|| {
        Error::NotFound(String::from("No recipe exists with specified id"))
    })?;

    let tags = tags::list_recipe_tags(id, pool).await?;
    let ingredients = list_recipe_ingredients(id, pool).await?;
    let author = users::get_author_view(recipe.author_id, viewer, pool).await?;

    let (is_favorited, is_in_shopping_cart) = match viewer {
        Some(user_id) => (
            memberships::is_favorite(user_id, id, pool).await?,
            memberships::is_in_cart(user_id, id, pool).await?,
        ),
        None => (false, false),
    };

    Ok(RecipeView {
        id: recipe.id,
        author,
        name: recipe.name,
        text: recipe.text,
        image: recipe.image,
        cooking_time: recipe.cooking_time,
        created_at: recipe.created_at,
        tags,
        ingredients,
        is_favorited,
        is_in_shopping_cart,
    })
}

/// Filtered, newest-first recipe listing. The membership filters only
/// apply for authenticated viewers; for anonymous callers they are
/// treated as absent.
pub async fn fetch_recipes(
    filter: RecipeFilter,
    viewer: Option<Id>,
    offset: i64,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeListRow>, Error> {
    // id 0 is never allocated, so the EXISTS flags come out false for
    // anonymous viewers.
    let viewer_id = viewer.unwrap_or(0);

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.text, r.image, r.cooking_time, r.created_at, \
         EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ",
    );
    query_builder.push_bind(viewer_id);
    query_builder.push(
        ") AS is_favorited, \
         EXISTS(SELECT 1 FROM cart_entries c WHERE c.recipe_id = r.id AND c.user_id = ",
    );
    query_builder.push_bind(viewer_id);
    query_builder.push(") AS is_in_shopping_cart, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ");
        query_builder.push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder.push(
            " AND EXISTS(SELECT 1 FROM recipe_tags rt \
             INNER JOIN tags t ON t.id = rt.tag_id \
             WHERE rt.recipe_id = r.id AND t.slug = ANY(",
        );
        query_builder.push_bind(filter.tags);
        query_builder.push("))");
    }

    if viewer.is_some() {
        if filter.is_favorited {
            query_builder
                .push(" AND EXISTS(SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ");
            query_builder.push_bind(viewer_id);
            query_builder.push(")");
        }
        if filter.is_in_shopping_cart {
            query_builder.push(
                " AND EXISTS(SELECT 1 FROM cart_entries c WHERE c.recipe_id = r.id AND c.user_id = ",
            );
            query_builder.push_bind(viewer_id);
            query_builder.push(")");
        }
    }

    query_builder.push(" ORDER BY r.created_at DESC LIMIT ");
    query_builder.push_bind(RECIPE_COUNT_PER_PAGE);
    query_builder.push(" OFFSET ");
    query_builder.push_bind(offset);

    let rows: Vec<RecipeListRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    let total_count = rows.first().map(|r| r.count).unwrap_or(0);
    let page = PageContext::from_rows(rows, total_count, RECIPE_COUNT_PER_PAGE, offset);
    Ok(page)
}

pub async fn list_author_recipes(
    author_id: Id,
    limit: Option<i64>,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShortRecipe>, Error> {
    let rows: Vec<ShortRecipe> = match limit {
        Some(limit) => sqlx::query_as(
            "
            SELECT id, name, image, cooking_time FROM recipes
            WHERE author_id = $1
            ORDER BY created_at DESC
            LIMIT $2
        ",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?,
        None => sqlx::query_as(
            "
            SELECT id, name, image, cooking_time FROM recipes
            WHERE author_id = $1
            ORDER BY created_at DESC
        ",
        )
        .bind(author_id)
        .fetch_all(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?,
    };

    Ok(rows)
}

pub async fn count_author_recipes(author_id: Id, pool: &Pool<Postgres>) -> Result<i64, Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(pool)
        .await
        .map_err(|e| Error::from(QueryError::from(e)))?;

    Ok(row.0)
}
