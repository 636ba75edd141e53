use fileshelf_core::{ApiErrorClass, FileServerClient, FileServerError};

use crate::session::SessionStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthPhase {
    Idle,
    Submitting,
    LoggedIn(String),
    Failed(String),
}

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub email: String,
    pub password: String,
    /// Filling the name marks the submission as a new-account registration.
    pub name: String,
}

impl Credentials {
    fn registration_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }
}

/// Decides between authenticating an existing account and provisioning a new
/// one, and reconciles both outcomes into a single logged-in phase. On
/// success the identity is written to the session store before `LoggedIn` is
/// reported; `LoggedIn` is terminal for the flow's lifetime.
pub struct AuthFlow {
    phase: AuthPhase,
}

impl AuthFlow {
    pub fn new() -> Self {
        Self {
            phase: AuthPhase::Idle,
        }
    }

    pub fn phase(&self) -> &AuthPhase {
        &self.phase
    }

    pub async fn submit(
        &mut self,
        client: &FileServerClient,
        store: &mut dyn SessionStore,
        credentials: &Credentials,
    ) -> &AuthPhase {
        if matches!(self.phase, AuthPhase::LoggedIn(_)) {
            return &self.phase;
        }

        let email = credentials.email.trim();
        if email.is_empty() || credentials.password.trim().is_empty() {
            self.phase = AuthPhase::Failed("Enter both email and password.".to_string());
            return &self.phase;
        }

        self.phase = AuthPhase::Submitting;
        // Email and name are trimmed; the password goes over the wire
        // verbatim, whitespace included.
        let outcome = match credentials.registration_name() {
            Some(name) => client
                .register(name, email, &credentials.password)
                .await
                .map_err(describe_register_error),
            None => client
                .authenticate(email, &credentials.password)
                .await
                .map_err(describe_login_error),
        };

        self.phase = match outcome {
            Ok(user_id) => match store.store(&user_id) {
                Ok(()) => AuthPhase::LoggedIn(user_id),
                Err(err) => AuthPhase::Failed(format!("Failed to save the session: {err}")),
            },
            Err(message) => AuthPhase::Failed(message),
        };
        &self.phase
    }
}

impl Default for AuthFlow {
    fn default() -> Self {
        Self::new()
    }
}

fn describe_register_error(err: FileServerError) -> String {
    if err.is_connection() {
        return backend_unreachable_message();
    }
    match err.classification() {
        Some(ApiErrorClass::Conflict) => {
            "An account with this email already exists. Log in without filling the name field."
                .to_string()
        }
        _ => format!("Failed to create the account: {err}"),
    }
}

fn describe_login_error(err: FileServerError) -> String {
    if err.is_connection() {
        return backend_unreachable_message();
    }
    match err.classification() {
        Some(ApiErrorClass::NotFound) => {
            "No account with this email. Fill in the name field to create one.".to_string()
        }
        Some(ApiErrorClass::Unauthorized) => "Invalid email or password.".to_string(),
        _ => format!("Login failed: {err}"),
    }
}

fn backend_unreachable_message() -> String {
    "Cannot reach the file server. Check that the backend is running.".to_string()
}
