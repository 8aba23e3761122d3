use crate::auth::{AuthError, TokenService};
use crate::database::manager::DatabaseError;
use crate::database::BattleStore;

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("Missing Param")]
    MissingParam,

    #[error("No user found with uname '{0}'")]
    UnknownPrincipal(String),

    #[error(transparent)]
    Store(#[from] DatabaseError),

    #[error(transparent)]
    Signing(#[from] AuthError),
}

/// Issues access tokens to principals that exist in the store.
pub struct TokenIssuer<'a> {
    store: &'a dyn BattleStore,
    tokens: &'a TokenService,
}

impl<'a> TokenIssuer<'a> {
    pub fn new(store: &'a dyn BattleStore, tokens: &'a TokenService) -> Self {
        Self { store, tokens }
    }

    /// A blank `uname` is refused before the store is consulted. Otherwise the
    /// name is looked up exactly as given.
    pub async fn issue(&self, uname: &str) -> Result<String, IssueError> {
        if uname.trim().is_empty() {
            return Err(IssueError::MissingParam);
        }

        let user = self
            .store
            .find_user_by_name(uname)
            .await?
            .ok_or_else(|| IssueError::UnknownPrincipal(uname.to_string()))?;

        let token = self.tokens.issue(&user.uname)?;
        tracing::info!(principal = %user.uname, "Issued access token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryBattleStore;

    fn tokens() -> TokenService {
        TokenService::new("test-secret", 72).unwrap()
    }

    #[tokio::test]
    async fn issues_for_known_user() {
        let store = MemoryBattleStore::default().with_user("tywin");
        let tokens = tokens();
        let token = TokenIssuer::new(&store, &tokens).issue("tywin").await.unwrap();
        assert_eq!(tokens.verify(&token).unwrap().name, "tywin");
    }

    #[tokio::test]
    async fn blank_and_unknown_names_are_refused() {
        let store = MemoryBattleStore::default().with_user("tywin");
        let tokens = tokens();
        let issuer = TokenIssuer::new(&store, &tokens);

        assert!(matches!(issuer.issue("  ").await, Err(IssueError::MissingParam)));
        assert!(matches!(issuer.issue("cersei").await, Err(IssueError::UnknownPrincipal(name)) if name == "cersei"));
    }

    #[tokio::test]
    async fn lookup_uses_the_name_verbatim() {
        let store = MemoryBattleStore::default().with_user("tywin").with_user(" ser pounce");
        let tokens = tokens();
        let issuer = TokenIssuer::new(&store, &tokens);

        assert!(matches!(issuer.issue("  tywin  ").await, Err(IssueError::UnknownPrincipal(name)) if name == "  tywin  "));

        let token = issuer.issue(" ser pounce").await.unwrap();
        assert_eq!(tokens.verify(&token).unwrap().name, " ser pounce");
    }
}
