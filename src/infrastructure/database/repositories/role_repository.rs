use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, NotSet, QueryFilter, Set};

use super::user_repository::{db_err, is_unique_violation};
use crate::domain::{DomainError, DomainResult, Role};
use crate::infrastructure::database::entities::role;

pub async fn find_role_by_name<C: ConnectionTrait>(conn: &C, name: &str) -> DomainResult<Option<Role>> {
    let model = role::Entity::find()
        .filter(role::Column::Name.eq(name))
        .one(conn)
        .await
        .map_err(db_err)?;

    Ok(model.map(|m| Role {
        id: m.id,
        name: m.name,
    }))
}

pub async fn create_role<C: ConnectionTrait>(conn: &C, name: &str) -> DomainResult<Role> {
    let new_role = role::ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
    };

    let model = new_role.insert(conn).await.map_err(|e| {
        if is_unique_violation(&e) {
            DomainError::AlreadyExists {
                entity: "Role",
                field: "name",
                value: name.to_string(),
            }
        } else {
            db_err(e)
        }
    })?;

    Ok(Role {
        id: model.id,
        name: model.name,
    })
}
