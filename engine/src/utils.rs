// Holder Raffle Engine - Utility Functions

/// Number of tickets a balance is worth: one per full `threshold` tokens
pub fn tickets_for_balance(token_amount: f64, threshold: f64) -> u64 {
    if !(threshold > 0.0) || !(token_amount > 0.0) {
        return 0;
    }
    (token_amount / threshold).floor() as u64
}

/// Convert lamports to SOL (for display purposes)
pub fn lamports_to_sol(lamports: u64) -> f64 {
    lamports as f64 / 1_000_000_000.0
}
