use crate::domain::Error;
use crate::domain::auth::driven_ports::AuthRemote;
use std::sync::{PoisonError, RwLock};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
#[validate(schema(function = "passwords_match"))]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    pub confirm_password: String,
}

fn passwords_match(request: &RegisterRequest) -> Result<(), ValidationError> {
    if request.password != request.confirm_password {
        let mut err = ValidationError::new("password_mismatch");
        err.message = Some("Passwords do not match.".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub user_id: i64,
    pub username: Option<String>,
    pub email: Option<String>,
}

pub mod driven_ports {
    use super::*;
    use crate::domain::DrivenPortError;

    pub trait AuthRemote {
        async fn login(&self, request: &LoginRequest) -> Result<User, DrivenPortError>;
        async fn register(&self, request: &RegisterRequest)
        -> Result<RegisteredUser, DrivenPortError>;
        /// The user behind the current session cookie, or [None] when logged out
        async fn verify(&self) -> Result<Option<User>, DrivenPortError>;
        async fn refresh(&self) -> Result<Option<User>, DrivenPortError>;
    }
}

pub mod driving_ports {
    use super::*;

    pub trait AuthPort {
        async fn login(&self, request: LoginRequest, auth: &impl AuthRemote) -> Result<User, Error>;
        async fn register(
            &self,
            request: RegisterRequest,
            auth: &impl AuthRemote,
        ) -> Result<RegisteredUser, Error>;
        async fn verify(&self, auth: &impl AuthRemote) -> Result<Option<User>, Error>;
        async fn refresh(&self, auth: &impl AuthRemote) -> Result<Option<User>, Error>;
        fn current_user(&self) -> Option<User>;
    }
}

/// Tracks who is logged in. Cleared whenever the server says the session is gone.
#[derive(Default)]
pub struct AuthService {
    current_user: RwLock<Option<User>>,
}

impl AuthService {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&self, user: Option<User>) {
        *self
            .current_user
            .write()
            .unwrap_or_else(PoisonError::into_inner) = user;
    }
}

impl driving_ports::AuthPort for AuthService {
    async fn login(&self, request: LoginRequest, auth: &impl AuthRemote) -> Result<User, Error> {
        request.validate()?;

        info!("Logging in as {}", request.email);
        let user = auth
            .login(&request)
            .await
            .map_err(|err| err.into_error_trying_to("log in"))?;
        self.remember(Some(user.clone()));

        Ok(user)
    }

    async fn register(
        &self,
        request: RegisterRequest,
        auth: &impl AuthRemote,
    ) -> Result<RegisteredUser, Error> {
        request.validate()?;

        info!("Registering {}", request.email);
        auth.register(&request)
            .await
            .map_err(|err| err.into_error_trying_to("register"))
    }

    async fn verify(&self, auth: &impl AuthRemote) -> Result<Option<User>, Error> {
        let user = auth
            .verify()
            .await
            .map_err(|err| err.into_error_trying_to("verify the session"))?;
        if user.is_none() {
            warn!("Session is not logged in");
        }
        self.remember(user.clone());

        Ok(user)
    }

    async fn refresh(&self, auth: &impl AuthRemote) -> Result<Option<User>, Error> {
        match auth.refresh().await {
            Ok(user) => {
                if user.is_some() {
                    self.remember(user.clone());
                }
                Ok(user)
            }
            Err(err) => {
                self.remember(None);
                Err(err.into_error_trying_to("refresh the session"))
            }
        }
    }

    fn current_user(&self) -> Option<User> {
        self.current_user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
