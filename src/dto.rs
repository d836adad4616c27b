//! Wire shapes of the productivity backend and the notification service, with conversions to and
//! from the domain types.

pub mod auth;
pub mod country_log;
pub mod envelope;
pub mod expense;
pub mod meeting;
pub mod notification;
pub mod task;
pub mod view;
