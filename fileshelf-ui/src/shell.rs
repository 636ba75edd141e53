use fileshelf_core::FileServerClient;

use crate::auth::{AuthFlow, AuthPhase, Credentials};
use crate::registry::FileRegistry;
use crate::session::{SessionError, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Files,
}

/// Top-level presentation state: login view while no identity is held, the
/// file registry once one is. A persisted session is promoted straight to
/// the files route on construction.
pub struct Shell<S: SessionStore> {
    client: FileServerClient,
    store: S,
    registry: Option<FileRegistry>,
}

impl<S: SessionStore> Shell<S> {
    pub fn new(client: FileServerClient, store: S) -> Self {
        let registry = store
            .load()
            .ok()
            .flatten()
            .map(|user_id| FileRegistry::new(client.clone(), user_id));
        Self {
            client,
            store,
            registry,
        }
    }

    pub fn route(&self) -> Route {
        if self.registry.is_some() {
            Route::Files
        } else {
            Route::Login
        }
    }

    pub fn registry(&self) -> Option<&FileRegistry> {
        self.registry.as_ref()
    }

    pub fn registry_mut(&mut self) -> Option<&mut FileRegistry> {
        self.registry.as_mut()
    }

    pub fn stored_identity(&self) -> Option<String> {
        self.store.load().ok().flatten()
    }

    /// Runs one auth submission. A `LoggedIn` outcome switches the shell to
    /// the files route scoped by the returned identity.
    pub async fn submit_login(&mut self, credentials: &Credentials) -> AuthPhase {
        let mut flow = AuthFlow::new();
        let phase = flow
            .submit(&self.client, &mut self.store, credentials)
            .await
            .clone();
        if let AuthPhase::LoggedIn(user_id) = &phase {
            self.registry = Some(FileRegistry::new(self.client.clone(), user_id.clone()));
        }
        phase
    }

    pub fn logout(&mut self) -> Result<(), SessionError> {
        self.store.clear()?;
        self.registry = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn starts_on_the_login_route_without_a_session() {
        let client = FileServerClient::with_base_url("http://localhost:8080/api").unwrap();
        let shell = Shell::new(client, MemorySessionStore::new());

        assert_eq!(shell.route(), Route::Login);
        assert!(shell.registry().is_none());
    }

    #[test]
    fn restores_a_persisted_session_into_the_files_route() {
        let client = FileServerClient::with_base_url("http://localhost:8080/api").unwrap();
        let mut store = MemorySessionStore::new();
        store.store("u-1").unwrap();

        let shell = Shell::new(client, store);

        assert_eq!(shell.route(), Route::Files);
        assert_eq!(shell.registry().map(|r| r.user_id()), Some("u-1"));
    }

    #[tokio::test]
    async fn successful_login_switches_to_the_files_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/authenticate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "userId": "u-1" })),
            )
            .mount(&server)
            .await;

        let client = FileServerClient::with_base_url(&server.uri()).unwrap();
        let mut shell = Shell::new(client, MemorySessionStore::new());
        let phase = shell
            .submit_login(&Credentials {
                email: "ada@example.com".to_string(),
                password: "hunter2".to_string(),
                name: String::new(),
            })
            .await;

        assert_eq!(phase, AuthPhase::LoggedIn("u-1".to_string()));
        assert_eq!(shell.route(), Route::Files);
        assert_eq!(shell.stored_identity().as_deref(), Some("u-1"));
    }

    #[tokio::test]
    async fn failed_login_stays_on_the_login_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/authenticate"))
            .respond_with(ResponseTemplate::new(401).set_body_string("nope"))
            .mount(&server)
            .await;

        let client = FileServerClient::with_base_url(&server.uri()).unwrap();
        let mut shell = Shell::new(client, MemorySessionStore::new());
        let phase = shell
            .submit_login(&Credentials {
                email: "ada@example.com".to_string(),
                password: "wrong".to_string(),
                name: String::new(),
            })
            .await;

        assert!(matches!(phase, AuthPhase::Failed(_)));
        assert_eq!(shell.route(), Route::Login);
        assert_eq!(shell.stored_identity(), None);
    }

    #[test]
    fn logout_clears_the_store_and_returns_to_login() {
        let client = FileServerClient::with_base_url("http://localhost:8080/api").unwrap();
        let mut store = MemorySessionStore::new();
        store.store("u-1").unwrap();
        let mut shell = Shell::new(client, store);
        assert_eq!(shell.route(), Route::Files);

        shell.logout().unwrap();

        assert_eq!(shell.route(), Route::Login);
        assert_eq!(shell.stored_identity(), None);
    }
}
