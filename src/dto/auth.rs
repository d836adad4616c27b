use crate::domain;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Clone)]
#[cfg_attr(test, derive(Serialize))]
pub struct UserDto {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserDto> for domain::auth::User {
    fn from(value: UserDto) -> Self {
        domain::auth::User {
            id: value.id,
            name: value.name,
            email: value.email,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct LoginRequestDto<'req> {
    pub email: &'req str,
    pub password: &'req str,
}

impl<'req> From<&'req domain::auth::LoginRequest> for LoginRequestDto<'req> {
    fn from(value: &'req domain::auth::LoginRequest) -> Self {
        LoginRequestDto {
            email: &value.email,
            password: &value.password,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct RegisterRequestDto<'req> {
    pub username: &'req str,
    pub email: &'req str,
    pub password: &'req str,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: &'req str,
}

impl<'req> From<&'req domain::auth::RegisterRequest> for RegisterRequestDto<'req> {
    fn from(value: &'req domain::auth::RegisterRequest) -> Self {
        RegisterRequestDto {
            username: &value.username,
            email: &value.email,
            password: &value.password,
            confirm_password: &value.confirm_password,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct RegisteredUserDto {
    #[serde(rename = "userId")]
    pub user_id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<RegisteredUserDto> for domain::auth::RegisteredUser {
    fn from(value: RegisteredUserDto) -> Self {
        domain::auth::RegisteredUser {
            user_id: value.user_id,
            username: value.username,
            email: value.email,
        }
    }
}
