use crate::domain::error::{DomainError, ValidationErrors};
use crate::domain::types::CommentsMode;

/// Comments can only be read or written through a post when they are stored natively.
pub fn ensure_native_comments(mode: CommentsMode) -> Result<(), DomainError> {
    match mode {
        CommentsMode::Native => Ok(()),
        other => Err(DomainError::configuration(format!(
            "posts only allow native comments (comments mode is `{}`)",
            other.as_str()
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewComment {
    pub name: String,
    pub email: Option<String>,
    pub body: String,
}

impl NewComment {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "can't be blank");
        }
        if self.body.trim().is_empty() {
            errors.add("body", "can't be blank");
        }
        errors.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_native_mode_exposes_comments() {
        assert!(ensure_native_comments(CommentsMode::Native).is_ok());
        assert!(matches!(
            ensure_native_comments(CommentsMode::Disqus),
            Err(DomainError::Configuration { .. })
        ));
        assert!(matches!(
            ensure_native_comments(CommentsMode::None),
            Err(DomainError::Configuration { .. })
        ));
    }

    #[test]
    fn blank_comment_fields_are_rejected() {
        let errors = NewComment::default().validate().unwrap_err();
        assert!(errors.contains("name"));
        assert!(errors.contains("body"));
    }
}
