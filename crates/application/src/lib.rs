use domain::*;
use infrastructure::*;
use std::sync::Arc;

/// User Application - wires the sqlite store into the domain service
pub struct UserApp {
    pub user_service: UserService,
}

impl UserApp {
    pub fn new(database_path: &str) -> Result<Self, DomainError> {
        Self::with_database(Database::new(database_path)?)
    }

    /// Throwaway store, used by tests and local experiments.
    pub fn in_memory() -> Result<Self, DomainError> {
        Self::with_database(Database::in_memory()?)
    }

    fn with_database(database: Database) -> Result<Self, DomainError> {
        let pool = database.get_pool().clone();

        let user_repository: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(pool));

        Ok(Self {
            user_service: UserService::new(user_repository),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn end_to_end_create_and_duplicate() {
        let app = UserApp::in_memory().unwrap();
        let service = &app.user_service;

        let john = service
            .create_user(Some(User::new(
                Some("John Doe".into()),
                Some("JOHN@X.COM".into()),
            )))
            .await
            .unwrap();
        assert_eq!(john.email(), Some("john@x.com"));

        let err = service
            .create_user(Some(User::new(
                Some("Jane Doe".into()),
                Some("john@x.com".into()),
            )))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let all = service.get_all_users().await.unwrap();
        assert_eq!(all, vec![john]);
    }

    #[tokio::test]
    async fn update_patch_delete_through_sqlite() {
        let app = UserApp::in_memory().unwrap();
        let service = &app.user_service;

        let user = service
            .create_user(Some(User::new(Some("John Doe".into()), Some("a@x.com".into()))))
            .await
            .unwrap();
        let id = user.id().unwrap();

        let updated = service
            .update_user(id, Some(User::new(Some("John Doe".into()), Some("A@X.COM".into()))))
            .await
            .unwrap();
        assert_eq!(updated.email(), Some("a@x.com"));

        let patched = service
            .patch_user(
                id,
                Some(UserPatch {
                    name: Some(Some("Johnny Doe".into())),
                    email: None,
                }),
            )
            .await
            .unwrap();
        assert_eq!(patched.name(), Some("Johnny Doe"));

        service.delete_user(id).await.unwrap();
        let err = service.delete_user(id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    fn file_app(dir: &tempfile::TempDir) -> Arc<UserApp> {
        let path = dir.path().join("users.db");
        Arc::new(UserApp::new(path.to_str().unwrap()).unwrap())
    }

    async fn create_concurrently(
        app: &Arc<UserApp>,
        emails: Vec<String>,
    ) -> Vec<Result<User, DomainError>> {
        let handles: Vec<_> = emails
            .into_iter()
            .enumerate()
            .map(|(i, email)| {
                let app = app.clone();
                tokio::spawn(async move {
                    app.user_service
                        .create_user(Some(User::new(Some(format!("User {:04}", i)), Some(email))))
                        .await
                })
            })
            .collect();

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }
        results
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_on_file_database_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);

        let emails = (0..32).map(|i| format!("user{}@x.com", i)).collect();
        let results = create_concurrently(&app, emails).await;

        let failures: Vec<_> = results.iter().filter_map(|r| r.as_ref().err()).collect();
        assert!(failures.is_empty(), "unexpected failures: {:?}", failures);
        assert_eq!(app.user_service.get_all_users().await.unwrap().len(), 32);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_creates_with_same_email_leave_one_winner() {
        let dir = tempfile::tempdir().unwrap();
        let app = file_app(&dir);

        let emails = (0..32).map(|_| "Same@X.com".to_string()).collect();
        let results = create_concurrently(&app, emails).await;

        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert_eq!(err.kind(), ErrorKind::Conflict, "unexpected error: {}", err);
        }

        let stored = app.user_service.get_all_users().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].email(), Some("same@x.com"));
    }
}
