use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, Set,
};

use crate::entities::{RoleName, role_entity, user_role_entity};
use crate::error::AppResult;

#[derive(Clone)]
pub struct RoleService {
    pool: DatabaseConnection,
}

impl RoleService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 角色表为空时写入 USER / MODERATOR / ADMIN，返回插入条数
    pub async fn seed_roles(&self) -> AppResult<usize> {
        let existing = role_entity::Entity::find().count(&self.pool).await?;
        if existing > 0 {
            return Ok(0);
        }

        let names = [RoleName::User, RoleName::Moderator, RoleName::Admin];
        for name in names {
            role_entity::ActiveModel {
                name: Set(name),
                ..Default::default()
            }
            .insert(&self.pool)
            .await?;
        }
        log::info!("Seeded {} roles", names.len());
        Ok(names.len())
    }

    pub async fn find_by_name<C: ConnectionTrait>(
        &self,
        conn: &C,
        name: RoleName,
    ) -> AppResult<Option<role_entity::Model>> {
        let role = role_entity::Entity::find()
            .filter(role_entity::Column::Name.eq(name))
            .one(conn)
            .await?;
        Ok(role)
    }

    pub async fn assign<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_id: i64,
        role: &role_entity::Model,
    ) -> AppResult<()> {
        user_role_entity::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role.id),
        }
        .insert(conn)
        .await?;
        Ok(())
    }

    pub async fn roles_for_user(&self, user_id: i64) -> AppResult<Vec<RoleName>> {
        let role_ids: Vec<i64> = user_role_entity::Entity::find()
            .filter(user_role_entity::Column::UserId.eq(user_id))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|ur| ur.role_id)
            .collect();
        if role_ids.is_empty() {
            return Ok(Vec::new());
        }

        let roles = role_entity::Entity::find()
            .filter(role_entity::Column::Id.is_in(role_ids))
            .all(&self.pool)
            .await?;
        Ok(roles.into_iter().map(|r| r.name).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::setup_db;

    #[tokio::test]
    async fn test_seed_roles_is_idempotent() {
        let db = setup_db().await;
        let service = RoleService::new(db.clone());

        assert_eq!(service.seed_roles().await.unwrap(), 3);
        assert_eq!(service.seed_roles().await.unwrap(), 0);

        let user = service.find_by_name(&db, RoleName::User).await.unwrap();
        assert!(user.is_some());
    }
}
