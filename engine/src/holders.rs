// Holder Raffle Engine - Token holder lookup
use std::sync::Arc;

use solana_program::{msg, program_pack::Pack, pubkey::Pubkey};
use spl_token::state::Account as TokenAccount;

use crate::{clock::BoxFuture, config::GameConfig, error::GameError, state::TokenHolder};

/// Balance lookup collaborator. An `Err` is an upstream failure; an empty
/// list means nobody holds the token.
pub trait HolderSource: Send + Sync {
    fn list_token_holders(&self) -> BoxFuture<'_, Result<Vec<TokenHolder>, GameError>>;
}

/// A fixed holder list
#[derive(Debug, Clone, Default)]
pub struct StaticHolders {
    holders: Vec<TokenHolder>,
}

impl StaticHolders {
    pub fn new(holders: Vec<TokenHolder>) -> Self {
        Self { holders }
    }
}

impl HolderSource for StaticHolders {
    fn list_token_holders(&self) -> BoxFuture<'_, Result<Vec<TokenHolder>, GameError>> {
        let holders = self.holders.clone();
        Box::pin(async move { Ok(holders) })
    }
}

/// A token account as returned by a program-accounts query against the SPL
/// token program
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTokenAccount {
    pub address: Pubkey,
    pub data: Vec<u8>,
}

pub type AccountFetcher =
    Arc<dyn Fn() -> BoxFuture<'static, Result<Vec<RawTokenAccount>, GameError>> + Send + Sync>;

/// Decode SPL token accounts of `mint` into holder balances. Accounts that
/// are not token accounts, belong to another mint, or are empty are skipped.
pub fn decode_token_accounts(
    mint: &Pubkey,
    decimals: u8,
    accounts: &[RawTokenAccount],
) -> Vec<TokenHolder> {
    accounts
        .iter()
        .filter(|raw| raw.data.len() == TokenAccount::LEN)
        .filter_map(|raw| match TokenAccount::unpack(&raw.data) {
            Ok(account) => Some(account),
            Err(err) => {
                msg!("Skipping token account {}: {}", raw.address, err);
                None
            }
        })
        .filter(|account| account.mint == *mint && account.amount > 0)
        .map(|account| TokenHolder {
            wallet_address: account.owner.to_string(),
            token_amount: spl_token::amount_to_ui_amount(account.amount, decimals),
        })
        .collect()
}

/// Holder lookup backed by raw token-account data for one mint
pub struct TokenAccountHolders {
    mint: Pubkey,
    decimals: u8,
    fetch: AccountFetcher,
}

impl TokenAccountHolders {
    pub fn new(mint: Pubkey, decimals: u8, fetch: AccountFetcher) -> Self {
        Self {
            mint,
            decimals,
            fetch,
        }
    }

    /// Lookup for the configured raffle token
    pub fn from_config(config: &GameConfig, fetch: AccountFetcher) -> Result<Self, GameError> {
        let mint = config.mint.ok_or(GameError::MissingField("mint"))?;
        Ok(Self::new(mint, config.token_decimals, fetch))
    }
}

impl HolderSource for TokenAccountHolders {
    fn list_token_holders(&self) -> BoxFuture<'_, Result<Vec<TokenHolder>, GameError>> {
        Box::pin(async move {
            let accounts = (self.fetch)().await?;
            let holders = decode_token_accounts(&self.mint, self.decimals, &accounts);
            msg!("Found {} token holders for mint {}", holders.len(), self.mint);
            Ok(holders)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_token::state::AccountState;

    fn raw_account(mint: Pubkey, owner: Pubkey, amount: u64) -> RawTokenAccount {
        let account = TokenAccount {
            mint,
            owner,
            amount,
            state: AccountState::Initialized,
            ..TokenAccount::default()
        };
        let mut data = vec![0u8; TokenAccount::LEN];
        TokenAccount::pack(account, &mut data).unwrap();
        RawTokenAccount {
            address: Pubkey::new_unique(),
            data,
        }
    }

    #[test]
    fn test_decode_filters_and_scales() {
        let mint = Pubkey::new_unique();
        let holder = Pubkey::new_unique();
        let accounts = vec![
            raw_account(mint, holder, 75_000_000_000_000),
            raw_account(Pubkey::new_unique(), Pubkey::new_unique(), 10),
            raw_account(mint, Pubkey::new_unique(), 0),
            RawTokenAccount {
                address: Pubkey::new_unique(),
                data: vec![1, 2, 3],
            },
            RawTokenAccount {
                address: Pubkey::new_unique(),
                data: vec![0u8; TokenAccount::LEN],
            },
        ];

        let holders = decode_token_accounts(&mint, 9, &accounts);
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].wallet_address, holder.to_string());
        assert_eq!(holders[0].token_amount, 75_000.0);
    }

    #[tokio::test]
    async fn test_from_config_uses_mint_and_decimals() {
        let mint = Pubkey::new_unique();
        let owner = Pubkey::new_unique();
        let accounts = vec![
            raw_account(mint, owner, 120_000_000),
            raw_account(Pubkey::new_unique(), Pubkey::new_unique(), 5_000_000),
        ];
        let fetch: AccountFetcher =
            Arc::new(move || -> BoxFuture<'static, Result<Vec<RawTokenAccount>, GameError>> {
                let accounts = accounts.clone();
                Box::pin(async move { Ok(accounts) })
            });

        let unset = GameConfig::default();
        assert!(matches!(
            TokenAccountHolders::from_config(&unset, fetch.clone()),
            Err(GameError::MissingField("mint"))
        ));

        let config = GameConfig {
            mint: Some(mint),
            token_decimals: 3,
            ..GameConfig::default()
        };
        let source = TokenAccountHolders::from_config(&config, fetch).unwrap();
        let holders = source.list_token_holders().await.unwrap();
        assert_eq!(holders.len(), 1);
        assert_eq!(holders[0].wallet_address, owner.to_string());
        assert_eq!(holders[0].token_amount, 120_000.0);
    }

    #[tokio::test]
    async fn test_fetch_failure_surfaces() {
        let fetch: AccountFetcher =
            Arc::new(|| -> BoxFuture<'static, Result<Vec<RawTokenAccount>, GameError>> {
                Box::pin(async { Err(GameError::Upstream("rpc down".to_string())) })
            });
        let source = TokenAccountHolders::new(Pubkey::new_unique(), 9, fetch);
        assert_eq!(
            source.list_token_holders().await,
            Err(GameError::Upstream("rpc down".to_string()))
        );
    }
}
