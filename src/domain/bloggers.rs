//! The blogger capability: anything that can author posts.

use crate::domain::entities::{BloggerRecord, BloggerRef};
use crate::domain::error::DomainError;

/// An author of posts. Concrete author types decide which display accessors they expose.
pub trait Blogger: Send + Sync {
    fn blogger_ref(&self) -> BloggerRef;

    /// Name of the concrete author type, used in diagnostics.
    fn type_name(&self) -> &str;

    /// Value of the named display accessor, or `None` when this type has no such accessor.
    fn display_accessor(&self, accessor: &str) -> Option<String>;
}

impl Blogger for BloggerRecord {
    fn blogger_ref(&self) -> BloggerRef {
        BloggerRecord::blogger_ref(self)
    }

    fn type_name(&self) -> &str {
        &self.kind
    }

    fn display_accessor(&self, accessor: &str) -> Option<String> {
        match accessor {
            "username" => Some(self.username.clone()),
            "name" => Some(self.name.clone().unwrap_or_default()),
            "email" => Some(self.email.clone().unwrap_or_default()),
            "display_name" => Some(
                self.name
                    .clone()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or_else(|| self.username.clone()),
            ),
            _ => None,
        }
    }
}

/// Display name for a post's author.
///
/// No author yields an empty string. An author lacking `accessor` is a host
/// misconfiguration and fails with [`DomainError::Configuration`].
pub fn blogger_display_name(
    blogger: Option<&dyn Blogger>,
    accessor: &str,
) -> Result<String, DomainError> {
    let Some(blogger) = blogger else {
        return Ok(String::new());
    };

    blogger.display_accessor(accessor).ok_or_else(|| {
        DomainError::configuration(format!(
            "{}#{} is not defined",
            blogger.type_name(),
            accessor
        ))
    })
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn author() -> BloggerRecord {
        BloggerRecord {
            id: 1,
            kind: "User".into(),
            username: "ada".into(),
            name: Some("Ada Lovelace".into()),
            email: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn missing_blogger_yields_empty_name() {
        assert_eq!(blogger_display_name(None, "username").unwrap(), "");
    }

    #[test]
    fn configured_accessor_is_used() {
        let blogger = author();
        assert_eq!(
            blogger_display_name(Some(&blogger), "name").unwrap(),
            "Ada Lovelace"
        );
        assert_eq!(blogger_display_name(Some(&blogger), "username").unwrap(), "ada");
    }

    #[test]
    fn unknown_accessor_is_a_configuration_error() {
        let blogger = author();
        let err = blogger_display_name(Some(&blogger), "nickname").unwrap_err();
        match err {
            DomainError::Configuration { message } => {
                assert_eq!(message, "User#nickname is not defined");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn display_name_falls_back_to_username() {
        let mut blogger = author();
        blogger.name = None;
        assert_eq!(
            blogger_display_name(Some(&blogger), "display_name").unwrap(),
            "ada"
        );
    }
}
