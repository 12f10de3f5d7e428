use chrono::Utc;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, Role, UserCredentials, UserView};
use crate::schema::users;

use super::models::{NewUserRow, UserRow};

fn to_view(row: UserRow) -> Result<UserView, DomainError> {
    Ok(UserView {
        id: row.id,
        email: row.email,
        full_name: row.full_name,
        role: row.role.parse()?,
        created_at: row.created_at,
    })
}

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn create(&self, user: &NewUser) -> Result<UserView, DomainError> {
        let mut conn = self.pool.get()?;

        let row: UserRow = diesel::insert_into(users::table)
            .values(&NewUserRow {
                id: Uuid::new_v4(),
                email: &user.email,
                password_hash: &user.password_hash,
                full_name: &user.full_name,
                role: user.role.as_str(),
            })
            .returning(UserRow::as_returning())
            .get_result(&mut conn)
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    DomainError::Conflict("email already registered".to_string())
                }
                other => other.into(),
            })?;
        to_view(row)
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<UserView>, DomainError> {
        let mut conn = self.pool.get()?;
        users::table
            .find(id)
            .select(UserRow::as_select())
            .first::<UserRow>(&mut conn)
            .optional()?
            .map(to_view)
            .transpose()
    }

    fn find_credentials(&self, email: &str) -> Result<Option<UserCredentials>, DomainError> {
        let mut conn = self.pool.get()?;
        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        row.map(|row| {
            let password_hash = row.password_hash.clone();
            Ok(UserCredentials {
                user: to_view(row)?,
                password_hash,
            })
        })
        .transpose()
    }

    fn update_role(&self, id: Uuid, role: Role) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(users::table.find(id))
            .set((users::role.eq(role.as_str()), users::updated_at.eq(Utc::now())))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::not_found("User"));
        }
        Ok(())
    }
}
