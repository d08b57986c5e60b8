use crate::model::{Id, post::PartialPost};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

pub const USERNAME_MIN_LEN: usize = 3;
pub const PASSWORD_MIN_LEN: usize = 3;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

/// A user together with the posts they own.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub name: Option<String>,
    pub posts: Vec<PartialPost>,
}

/// The public part of a user, as embedded into posts.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct UserSummary {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub name: Option<String>,
}

impl From<User> for UserSummary {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            username: value.username,
            name: value.name,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidUsernameError {
    #[error("username must have at least 3 characters")]
    TooShort(String),
}

impl InvalidUsernameError {
    #[must_use]
    pub fn username(&self) -> &str {
        match self {
            Self::TooShort(username) => username,
        }
    }
}

impl Username {
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let len = username.chars().count();
        if len < USERNAME_MIN_LEN {
            Err(InvalidUsernameError::TooShort(username))
        } else {
            Ok(Self(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for Username {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        Username::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(err.username()), &"Username"))
    }
}

/// Registration payload as sent by clients.
///
/// Every field is optional here so that a missing field can be reported with
/// a precise message instead of a generic deserialization failure.
#[derive(Clone, Eq, PartialEq, Default, Hash, Deserialize, Serialize)]
pub struct NewUser {
    pub username: Option<String>,
    pub name: Option<String>,
    pub password: Option<String>,
}

/// A validated registration.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct CreateUser {
    pub username: Username,
    pub name: Option<String>,
    pub password: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum InvalidUserError {
    #[error("username missing")]
    UsernameMissing,
    #[error("password missing")]
    PasswordMissing,
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error("password must have at least 3 characters")]
    PasswordTooShort,
}

impl TryFrom<NewUser> for CreateUser {
    type Error = InvalidUserError;

    fn try_from(value: NewUser) -> Result<Self, Self::Error> {
        let username = value.username.ok_or(InvalidUserError::UsernameMissing)?;
        let password = value.password.ok_or(InvalidUserError::PasswordMissing)?;

        let username = Username::new(username)?;
        if password.chars().count() < PASSWORD_MIN_LEN {
            return Err(InvalidUserError::PasswordTooShort);
        }

        Ok(Self {
            username,
            name: value.name,
            password,
        })
    }
}

impl Debug for NewUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("name", &self.name)
            .field("password", &"[redacted]")
            .finish()
    }
}

impl Debug for CreateUser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUser")
            .field("username", &self.username)
            .field("name", &self.name)
            .field("password", &"[redacted]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::{
        CreateUser, InvalidUserError, InvalidUsernameError, NewUser, Username,
    };

    fn new_user(username: Option<&str>, password: Option<&str>) -> NewUser {
        NewUser {
            username: username.map(str::to_owned),
            name: Some("Matti Luukkainen".to_owned()),
            password: password.map(str::to_owned),
        }
    }

    #[test]
    fn username_length() {
        assert!(Username::new("mluukkai".to_owned()).is_ok());
        assert!(Username::new("abc".to_owned()).is_ok());
        assert_eq!(
            Username::new("ro".to_owned()),
            Err(InvalidUsernameError::TooShort("ro".to_owned()))
        );
        assert!(Username::new("x".repeat(51)).is_ok());
        assert!(Username::new("x".repeat(500)).is_ok());
        // Characters, not bytes.
        assert!(Username::new("äö".to_owned()).is_err());
    }

    #[test]
    fn username_deserialization_validates() {
        assert!(serde_json::from_str::<Username>("\"root\"").is_ok());
        assert!(serde_json::from_str::<Username>("\"ro\"").is_err());
    }

    #[test]
    fn registration_validation() {
        let create = CreateUser::try_from(new_user(Some("mluukkai"), Some("salainen"))).unwrap();
        assert_eq!(create.username.get(), "mluukkai");
        assert_eq!(create.password, "salainen");

        let cases = [
            (new_user(None, Some("salainen")), "username missing"),
            (new_user(Some("root2"), None), "password missing"),
            (
                new_user(Some("ro"), Some("salainen")),
                "username must have at least 3 characters",
            ),
            (
                new_user(Some("root4"), Some("sa")),
                "password must have at least 3 characters",
            ),
        ];

        for (user, message) in cases {
            let err: InvalidUserError = CreateUser::try_from(user).unwrap_err();
            assert_eq!(err.to_string(), message);
        }
    }

    #[test]
    fn passwords_are_redacted() {
        let user = new_user(Some("root"), Some("sekret"));
        assert!(!format!("{user:?}").contains("sekret"));
        let create = CreateUser::try_from(user).unwrap();
        assert!(!format!("{create:?}").contains("sekret"));
    }
}
