// Holder Raffle Engine - Participant ledger
use std::str::FromStr;

use solana_program::pubkey::Pubkey;

use crate::{
    error::GameError,
    state::{EligibleHolder, Entrant, Round, RoundStatus, TokenHolder},
    utils,
};

/// Entry submitted by a caller, before validation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryRequest {
    pub wallet_address: String,
    pub ticket_count: u64,
    pub transaction_signature: String,
}

/// Accept only base58 strings that decode to a 32-byte account address
pub fn validate_wallet_address(wallet_address: &str) -> Result<Pubkey, GameError> {
    if wallet_address.len() < 32 || wallet_address.len() > 44 {
        return Err(GameError::InvalidAddress(wallet_address.to_string()));
    }
    Pubkey::from_str(wallet_address)
        .map_err(|_| GameError::InvalidAddress(wallet_address.to_string()))
}

/// Shape checks that need no round state
pub fn validate_entry(request: &EntryRequest, max_tickets: u64) -> Result<(), GameError> {
    if request.wallet_address.is_empty() {
        return Err(GameError::MissingField("walletAddress"));
    }
    if request.transaction_signature.trim().is_empty() {
        return Err(GameError::MissingField("transactionSignature"));
    }
    validate_wallet_address(&request.wallet_address)?;
    if request.ticket_count < 1 || request.ticket_count > max_tickets {
        return Err(GameError::InvalidTicketCount(request.ticket_count));
    }
    Ok(())
}

/// Append an entrant to an active round, accruing tickets and prize pool.
/// Repeated wallets are independent entries.
pub fn add_entrant(
    round: &mut Round,
    entrant: Entrant,
    unit_price: u64,
) -> Result<(), GameError> {
    if round.status != RoundStatus::Active {
        return Err(GameError::RoundNotActive);
    }
    if entrant.ticket_count < 1 {
        return Err(GameError::InvalidTicketCount(entrant.ticket_count));
    }

    let total_tickets = round
        .total_tickets
        .checked_add(entrant.ticket_count)
        .ok_or(GameError::TicketOverflow)?;
    let prize_pool = entrant
        .ticket_count
        .checked_mul(unit_price)
        .and_then(|added| round.prize_pool.checked_add(added))
        .ok_or(GameError::TicketOverflow)?;

    round.participants.push(entrant);
    round.total_tickets = total_tickets;
    round.prize_pool = prize_pool;
    Ok(())
}

/// Turn holder balances into round entrants. The largest holder is the
/// liquidity pool and never plays.
pub fn load_eligible_entrants(
    holders: &[TokenHolder],
    ticket_threshold: f64,
) -> Result<Vec<EligibleHolder>, GameError> {
    let mut sorted: Vec<&TokenHolder> = holders.iter().collect();
    // Stable, so equal balances keep their lookup order
    sorted.sort_by(|a, b| {
        b.token_amount
            .partial_cmp(&a.token_amount)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let eligible: Vec<EligibleHolder> = sorted
        .into_iter()
        .skip(1)
        .filter_map(|holder| {
            let ticket_count = utils::tickets_for_balance(holder.token_amount, ticket_threshold);
            (ticket_count >= 1).then(|| EligibleHolder {
                wallet_address: holder.wallet_address.clone(),
                token_amount: holder.token_amount,
                ticket_count,
            })
        })
        .collect();

    if eligible.is_empty() {
        return Err(GameError::NoEligibleHolders);
    }
    Ok(eligible)
}
