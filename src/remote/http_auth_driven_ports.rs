use super::{ApiClient, with_body};
use crate::domain::DrivenPortError;
use crate::domain::auth::driven_ports::AuthRemote;
use crate::domain::auth::{LoginRequest, RegisterRequest, RegisteredUser, User};
use crate::dto::auth::{LoginRequestDto, RegisterRequestDto, RegisteredUserDto, UserDto};
use crate::external_connections::{ApiRequest, HttpTransport};
use tracing::info;

/// The server answers this on verify when the session cookie is missing or stale
const LOGGED_OUT: u16 = 403;

impl<T: HttpTransport> AuthRemote for ApiClient<T> {
    #[tracing::instrument(skip_all)]
    async fn login(&self, request: &LoginRequest) -> Result<User, DrivenPortError> {
        let request = with_body(
            ApiRequest::post(self.endpoint("/auth/login")?).without_refresh(),
            &LoginRequestDto::from(request),
        )?;
        let user: UserDto = self.call(request).await?;
        self.session().mark_logged_in();
        info!(user_id = user.id, "Logged in");

        Ok(user.into())
    }

    #[tracing::instrument(skip_all)]
    async fn register(&self, request: &RegisterRequest) -> Result<RegisteredUser, DrivenPortError> {
        let request = with_body(
            ApiRequest::post(self.endpoint("/auth/register")?).without_refresh(),
            &RegisterRequestDto::from(request),
        )?;
        let registered: RegisteredUserDto = self.call(request).await?;

        Ok(registered.into())
    }

    #[tracing::instrument(skip(self))]
    async fn verify(&self) -> Result<Option<User>, DrivenPortError> {
        let request = ApiRequest::get(self.endpoint("/auth/verify-user")?).accepting(LOGGED_OUT);
        let response = self.send(request).await?;
        if response.status == LOGGED_OUT {
            return Ok(None);
        }

        let user: Option<UserDto> = super::decode_envelope(&response)?;
        Ok(user.map(User::from))
    }

    /// Renews the session outside the automatic refresh. Counts as a fresh login for requests
    /// already in flight.
    #[tracing::instrument(skip(self))]
    async fn refresh(&self) -> Result<Option<User>, DrivenPortError> {
        let request = ApiRequest::get(self.endpoint("/auth/refresh-token")?).without_refresh();
        let user: Option<UserDto> = self.call(request).await?;
        self.session().mark_logged_in();

        Ok(user.map(User::from))
    }
}
