use crate::database::{users, SqlitePool};
use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use domain::{normalize_email, DomainError, User, UserId, UserRepository};

// Database model - separate from domain entity
#[derive(Queryable, Selectable, Debug)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct UserModel {
    id: String,
    name: String,
    email: String,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
struct NewUserModel {
    id: String,
    name: String,
    email: String,
}

impl TryFrom<UserModel> for User {
    type Error = DomainError;

    fn try_from(model: UserModel) -> Result<Self, Self::Error> {
        let id = model.id.parse::<UserId>().map_err(|_| {
            DomainError::RepositoryError(format!("Corrupt user id in store: {}", model.id))
        })?;
        Ok(User::with_id(id, model.name, model.email))
    }
}

impl TryFrom<&User> for NewUserModel {
    type Error = DomainError;

    fn try_from(user: &User) -> Result<Self, Self::Error> {
        let id = user.id().ok_or_else(|| {
            DomainError::RepositoryError("User id is required before saving".to_string())
        })?;
        Ok(NewUserModel {
            id: id.to_string(),
            name: user.name().unwrap_or_default().to_string(),
            email: user.email().map(normalize_email).unwrap_or_default(),
        })
    }
}

fn repository_error(e: impl ToString) -> DomainError {
    DomainError::RepositoryError(e.to_string())
}

/// `users` table adapter.
///
/// Emails are always written lower-cased, so case-insensitive lookups compare
/// the lower-cased candidate for equality. The unique index on `email` is the
/// last line against two writers claiming the same address.
pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, query: F) -> Result<QueryResult<T>, DomainError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> QueryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();

        // Checking out a connection can block while the pool is exhausted.
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(repository_error)?;
            Ok::<_, DomainError>(query(&mut conn))
        })
        .await
        .map_err(repository_error)?
    }

    async fn find_one<F>(&self, query: F) -> Result<Option<User>, DomainError>
    where
        F: FnOnce(&mut SqliteConnection) -> QueryResult<Option<UserModel>> + Send + 'static,
    {
        let result = self.run(query).await?.map_err(repository_error)?;
        result.map(User::try_from).transpose()
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let id = id.to_string();
        self.find_one(move |conn| {
            users::table
                .filter(users::id.eq(id))
                .select(UserModel::as_select())
                .first::<UserModel>(conn)
                .optional()
        })
        .await
    }

    async fn find_all(&self) -> Result<Vec<User>, DomainError> {
        let result = self
            .run(|conn| {
                users::table
                    .order(users::seq.asc())
                    .select(UserModel::as_select())
                    .load::<UserModel>(conn)
            })
            .await?
            .map_err(repository_error)?;

        result.into_iter().map(User::try_from).collect()
    }

    async fn find_by_email_ignore_case(&self, email: &str) -> Result<Option<User>, DomainError> {
        self.find_by_exact_email(&normalize_email(email)).await
    }

    async fn exists_by_email_ignore_case(&self, email: &str) -> Result<bool, DomainError> {
        self.exists_by_email_excluding(email, None).await
    }

    async fn find_by_exact_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        if email.trim().is_empty() {
            return Ok(None);
        }
        let email = email.to_string();
        self.find_one(move |conn| {
            users::table
                .filter(users::email.eq(email))
                .select(UserModel::as_select())
                .first::<UserModel>(conn)
                .optional()
        })
        .await
    }

    async fn exists_by_email_excluding(
        &self,
        email: &str,
        exclude: Option<UserId>,
    ) -> Result<bool, DomainError> {
        let email = normalize_email(email);
        let exclude = exclude.map(|id| id.to_string());

        let found = self
            .run(move |conn| {
                let mut query = users::table
                    .select(users::seq)
                    .filter(users::email.eq(email))
                    .into_boxed();
                if let Some(exclude) = exclude {
                    query = query.filter(users::id.ne(exclude));
                }
                query.first::<i32>(conn).optional()
            })
            .await?
            .map_err(repository_error)?;

        Ok(found.is_some())
    }

    async fn exists_by_id(&self, id: UserId) -> Result<bool, DomainError> {
        let id = id.to_string();
        let found = self
            .run(move |conn| {
                users::table
                    .select(users::seq)
                    .filter(users::id.eq(id))
                    .first::<i32>(conn)
                    .optional()
            })
            .await?
            .map_err(repository_error)?;

        Ok(found.is_some())
    }

    async fn save(&self, user: &User) -> Result<User, DomainError> {
        let model = NewUserModel::try_from(user)?;
        let email = model.email.clone();

        let result = self
            .run(move |conn| {
                // Take the write lock up front so concurrent writers queue on
                // busy_timeout instead of failing a lock upgrade mid-transaction.
                conn.immediate_transaction(|conn| {
                    let updated = diesel::update(users::table.filter(users::id.eq(&model.id)))
                        .set((users::name.eq(&model.name), users::email.eq(&model.email)))
                        .execute(conn)?;

                    if updated == 0 {
                        diesel::insert_into(users::table)
                            .values(&model)
                            .execute(conn)?;
                    }

                    users::table
                        .filter(users::id.eq(&model.id))
                        .select(UserModel::as_select())
                        .first::<UserModel>(conn)
                })
            })
            .await?
            .map_err(|e| match e {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    DomainError::duplicate_email(&email)
                }
                other => repository_error(other),
            })?;

        User::try_from(result)
    }

    async fn delete_by_id(&self, id: UserId) -> Result<(), DomainError> {
        let id = id.to_string();
        self.run(move |conn| diesel::delete(users::table.filter(users::id.eq(id))).execute(conn))
            .await?
            .map_err(repository_error)?;

        Ok(())
    }
}
