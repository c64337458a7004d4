use std::collections::HashSet;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};

use crate::domain::{DomainError, DomainResult, Role, User};
use crate::infrastructure::database::entities::{role, user, user_role};

// ── Conversion helpers ──────────────────────────────────────────

fn role_model_to_domain(model: role::Model) -> Role {
    Role {
        id: model.id,
        name: model.name,
    }
}

fn user_model_to_domain(model: user::Model, roles: Vec<Role>) -> User {
    User {
        id: model.id,
        username: model.username,
        password_hash: model.password_hash,
        roles,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub(crate) fn db_err(e: DbErr) -> DomainError {
    DomainError::Storage(format!("Database error: {}", e))
}

pub(crate) fn is_unique_violation(e: &DbErr) -> bool {
    matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ── Queries ─────────────────────────────────────────────────────

pub async fn exists_by_username<C: ConnectionTrait>(conn: &C, username: &str) -> DomainResult<bool> {
    let count = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .count(conn)
        .await
        .map_err(db_err)?;

    Ok(count > 0)
}

pub async fn find_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> DomainResult<Option<User>> {
    let model = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(conn)
        .await
        .map_err(db_err)?;

    let Some(model) = model else {
        return Ok(None);
    };

    let roles = load_roles(conn, &model.id).await?;
    Ok(Some(user_model_to_domain(model, roles)))
}

pub async fn find_role_names_by_username<C: ConnectionTrait>(
    conn: &C,
    username: &str,
) -> DomainResult<Vec<String>> {
    let model = user::Entity::find()
        .filter(user::Column::Username.eq(username))
        .one(conn)
        .await
        .map_err(db_err)?;

    let Some(model) = model else {
        return Ok(Vec::new());
    };

    let roles = load_roles(conn, &model.id).await?;
    Ok(roles.into_iter().map(|r| r.name).collect())
}

/// Roles assigned to a user, in assignment order
async fn load_roles<C: ConnectionTrait>(conn: &C, user_id: &str) -> DomainResult<Vec<Role>> {
    let rows = user_role::Entity::find()
        .filter(user_role::Column::UserId.eq(user_id))
        .order_by_asc(user_role::Column::Position)
        .find_also_related(role::Entity)
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(rows
        .into_iter()
        .filter_map(|(_, role)| role)
        .map(role_model_to_domain)
        .collect())
}

// ── Mutations ───────────────────────────────────────────────────

/// Upsert the user row, then replace its role assignments.
///
/// Callers that need atomicity pass a `DatabaseTransaction`.
pub async fn save_user<C: ConnectionTrait>(conn: &C, user: &User) -> DomainResult<()> {
    let conflict = |e: DbErr| {
        if is_unique_violation(&e) {
            DomainError::username_taken(&user.username)
        } else {
            db_err(e)
        }
    };

    let existing = user::Entity::find_by_id(user.id.clone())
        .one(conn)
        .await
        .map_err(db_err)?;

    match existing {
        Some(model) => {
            let mut active: user::ActiveModel = model.into();
            active.username = Set(user.username.clone());
            active.password_hash = Set(user.password_hash.clone());
            active.updated_at = Set(user.updated_at);
            active.update(conn).await.map_err(conflict)?;
        }
        None => {
            let new_user = user::ActiveModel {
                id: Set(user.id.clone()),
                username: Set(user.username.clone()),
                password_hash: Set(user.password_hash.clone()),
                created_at: Set(user.created_at),
                updated_at: Set(user.updated_at),
            };
            new_user.insert(conn).await.map_err(conflict)?;
        }
    }

    replace_roles(conn, user).await
}

async fn replace_roles<C: ConnectionTrait>(conn: &C, user: &User) -> DomainResult<()> {
    user_role::Entity::delete_many()
        .filter(user_role::Column::UserId.eq(user.id.clone()))
        .exec(conn)
        .await
        .map_err(db_err)?;

    let mut seen = HashSet::new();
    let rows: Vec<user_role::ActiveModel> = user
        .roles
        .iter()
        .filter(|r| seen.insert(r.id))
        .enumerate()
        .map(|(position, r)| user_role::ActiveModel {
            user_id: Set(user.id.clone()),
            role_id: Set(r.id),
            position: Set(position as i32),
        })
        .collect();

    if rows.is_empty() {
        return Ok(());
    }

    user_role::Entity::insert_many(rows)
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;

    Ok(())
}
