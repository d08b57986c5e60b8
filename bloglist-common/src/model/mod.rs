pub mod auth;
pub mod post;
pub mod user;

use crate::{
    model::{
        auth::{InvalidAuthTokenHashError, InvalidPasswordHashError},
        user::InvalidUsernameError,
    },
    snowflake::Snowflake,
    util::NonPositiveDurationError,
};
use derive_where::derive_where;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
    num::{ParseIntError, TryFromIntError},
    str::FromStr,
};
use thiserror::Error;

/// Raised when a stored record does not describe a valid model.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    NonPositiveDuration(#[from] NonPositiveDurationError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
    #[error(transparent)]
    PasswordHash(#[from] InvalidPasswordHashError),
    #[error("Like count out of range: {0}")]
    Likes(#[from] TryFromIntError),
}

/// A snowflake tagged with the kind of object it identifies.
#[derive_where(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct Id<Marker>(Snowflake, PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: Snowflake) -> Self {
        Self(snowflake, PhantomData)
    }

    #[must_use]
    pub fn snowflake(self) -> Snowflake {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Snowflake::from_str(s).map(Self::new)
    }
}

impl<Marker> From<Snowflake> for Id<Marker> {
    fn from(value: Snowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<Id<Marker>> for Snowflake {
    fn from(value: Id<Marker>) -> Self {
        value.0
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(Snowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake().get()
    }
}

impl<Marker> Serialize for Id<Marker> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de, Marker> Deserialize<'de> for Id<Marker> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Snowflake::deserialize(deserializer).map(Self::new)
    }
}
