//! Bearer tokens identifying the blogger behind a request.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    BloggerTokensRepo, BloggersRepo, CreateBloggerTokenParams, RepoError,
};
use crate::domain::entities::{BloggerRecord, BloggerRef};

const TOKEN_PREFIX: &str = "sk";
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum BloggerTokenError {
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error("username must not be empty")]
    MissingUsername,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid blogger token")]
    Invalid,
    #[error("revoked blogger token")]
    Revoked,
    #[error("token owner no longer exists")]
    UnknownBlogger,
}

/// The authenticated author of the current request.
#[derive(Debug, Clone)]
pub struct CurrentBlogger {
    pub blogger: BloggerRecord,
    pub token_prefix: String,
}

impl CurrentBlogger {
    pub fn blogger_ref(&self) -> BloggerRef {
        self.blogger.blogger_ref()
    }
}

#[derive(Debug, Clone)]
pub struct IssueTokenCommand {
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BloggerTokenIssued {
    pub blogger: BloggerRecord,
    pub token: String,
}

#[derive(Clone)]
pub struct BloggerAuthService {
    bloggers: Arc<dyn BloggersRepo>,
    tokens: Arc<dyn BloggerTokensRepo>,
}

impl BloggerAuthService {
    pub fn new(bloggers: Arc<dyn BloggersRepo>, tokens: Arc<dyn BloggerTokensRepo>) -> Self {
        Self { bloggers, tokens }
    }

    /// Mint a token for `username`, creating the blogger row on first use.
    pub async fn issue(
        &self,
        cmd: IssueTokenCommand,
    ) -> Result<BloggerTokenIssued, BloggerTokenError> {
        let username = cmd.username.trim();
        if username.is_empty() {
            return Err(BloggerTokenError::MissingUsername);
        }

        let blogger = match self.bloggers.find_by_username(username).await? {
            Some(existing) => existing,
            None => {
                self.bloggers
                    .create_blogger(username, cmd.name.as_deref(), cmd.email.as_deref())
                    .await?
            }
        };

        let prefix = generate_prefix();
        let secret = generate_secret();
        let token = format!("{TOKEN_PREFIX}_{prefix}_{secret}");

        self.tokens
            .create_token(CreateBloggerTokenParams {
                blogger_id: blogger.id,
                prefix,
                hashed_secret: hash_secret(&secret),
            })
            .await?;

        Ok(BloggerTokenIssued { blogger, token })
    }

    pub async fn authenticate(&self, token: &str) -> Result<CurrentBlogger, AuthError> {
        let parsed = parse_token(token).ok_or(AuthError::Invalid)?;
        let record = self
            .tokens
            .find_by_prefix(&parsed.prefix)
            .await
            .map_err(|_| AuthError::Invalid)?
            .ok_or(AuthError::Invalid)?;

        if let Some(revoked_at) = record.revoked_at
            && revoked_at <= OffsetDateTime::now_utc()
        {
            return Err(AuthError::Revoked);
        }

        let hashed_input = hash_secret(&parsed.secret);
        if record.hashed_secret.ct_eq(&hashed_input).unwrap_u8() == 0 {
            return Err(AuthError::Invalid);
        }

        let blogger = self
            .bloggers
            .find_blogger(record.blogger_id)
            .await
            .map_err(|_| AuthError::Invalid)?
            .ok_or(AuthError::UnknownBlogger)?;

        Ok(CurrentBlogger {
            blogger,
            token_prefix: record.prefix,
        })
    }
}

pub fn hash_secret(secret: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.finalize().to_vec()
}

fn generate_prefix() -> String {
    Uuid::new_v4().simple().to_string()[..12].to_string()
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

struct ParsedToken {
    prefix: String,
    secret: String,
}

fn parse_token(token: &str) -> Option<ParsedToken> {
    let mut parts = token.trim().splitn(3, '_');
    if parts.next()? != TOKEN_PREFIX {
        return None;
    }
    let prefix = parts.next()?;
    let secret = parts.next()?;
    if prefix.is_empty() || secret.len() < MIN_SECRET_LEN {
        return None;
    }
    Some(ParsedToken {
        prefix: prefix.to_string(),
        secret: secret.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_token_requires_known_shape() {
        let secret = "a".repeat(MIN_SECRET_LEN);
        let parsed = parse_token(&format!("sk_abc123_{secret}")).expect("parsed");
        assert_eq!(parsed.prefix, "abc123");
        assert_eq!(parsed.secret, secret);

        assert!(parse_token("pk_abc_secret").is_none());
        assert!(parse_token("sk_abc_short").is_none());
        assert!(parse_token(&format!("sk__{secret}")).is_none());
    }

    #[test]
    fn generated_secret_is_long_enough() {
        assert!(generate_secret().len() >= MIN_SECRET_LEN);
        assert_eq!(generate_prefix().len(), 12);
    }
}
