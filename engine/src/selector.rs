// Holder Raffle Engine - Weighted winner selection
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::{error::GameError, state::Entrant};

/// Uniform draws over `[0, upper)`
pub trait RandomSource: Send {
    fn next_index(&mut self, upper: u64) -> u64;
}

/// ChaCha20 stream, seeded from OS entropy or from a fixed seed
pub struct ChaChaSource {
    rng: ChaCha20Rng,
}

impl ChaChaSource {
    pub fn from_entropy() -> Self {
        Self {
            rng: ChaCha20Rng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for ChaChaSource {
    fn next_index(&mut self, upper: u64) -> u64 {
        self.rng.gen_range(0..upper)
    }
}

/// Cumulative ticket counts: entrant `i` owns indexes
/// `cumulative[i-1]..cumulative[i]`.
fn cumulative_tickets(participants: &[Entrant]) -> Result<Vec<u64>, GameError> {
    let mut running: u64 = 0;
    participants
        .iter()
        .map(|p| {
            running = running
                .checked_add(p.ticket_count)
                .ok_or(GameError::TicketOverflow)?;
            Ok(running)
        })
        .collect()
}

/// Total selection weight of a participant list
pub fn total_weight(participants: &[Entrant]) -> Result<u64, GameError> {
    Ok(cumulative_tickets(participants)?.last().copied().unwrap_or(0))
}

/// The entrant whose ticket block contains `index`. Pure; the same list and
/// index always give the same winner.
pub fn select_winner_at(participants: &[Entrant], index: u64) -> Result<&Entrant, GameError> {
    if participants.is_empty() {
        return Err(GameError::NoParticipants);
    }
    let cumulative = cumulative_tickets(participants)?;
    let total = cumulative.last().copied().unwrap_or(0);
    if total == 0 {
        return Err(GameError::NoWeightedParticipants);
    }

    if index >= total {
        return Err(GameError::TicketIndexOutOfRange { index, total });
    }
    let position = cumulative.partition_point(|&end| end <= index);
    participants
        .get(position)
        .ok_or(GameError::NoWeightedParticipants)
}

/// Draw one winner with probability `ticket_count / total_tickets`
pub fn select_winner<'a>(
    participants: &'a [Entrant],
    random: &mut dyn RandomSource,
) -> Result<&'a Entrant, GameError> {
    if participants.is_empty() {
        return Err(GameError::NoParticipants);
    }
    let total = total_weight(participants)?;
    if total == 0 {
        return Err(GameError::NoWeightedParticipants);
    }
    select_winner_at(participants, random.next_index(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entrant(wallet: &str, tickets: u64) -> Entrant {
        Entrant {
            wallet_address: wallet.to_string(),
            ticket_count: tickets,
            transaction_signature: "sig".to_string(),
            timestamp: 0,
        }
    }

    /// Draws one past the last ticket
    struct PastEnd;

    impl RandomSource for PastEnd {
        fn next_index(&mut self, upper: u64) -> u64 {
            upper
        }
    }

    #[test]
    fn test_forced_index() {
        let participants = vec![entrant("A", 1), entrant("B", 9)];
        assert_eq!(select_winner_at(&participants, 0).unwrap().wallet_address, "A");
        assert_eq!(select_winner_at(&participants, 5).unwrap().wallet_address, "B");
        assert_eq!(select_winner_at(&participants, 9).unwrap().wallet_address, "B");
    }

    #[test]
    fn test_block_boundaries_match_expansion() {
        let participants = vec![entrant("A", 2), entrant("Z", 0), entrant("B", 3), entrant("C", 1)];
        let expanded: Vec<&str> = participants
            .iter()
            .flat_map(|p| std::iter::repeat(p.wallet_address.as_str()).take(p.ticket_count as usize))
            .collect();
        for (index, wallet) in expanded.iter().enumerate() {
            let winner = select_winner_at(&participants, index as u64).unwrap();
            assert_eq!(winner.wallet_address, *wallet);
        }
    }

    #[test]
    fn test_failures() {
        assert_eq!(select_winner_at(&[], 0), Err(GameError::NoParticipants));
        let weighted = vec![entrant("A", 1), entrant("B", 9)];
        assert_eq!(
            select_winner_at(&weighted, 10),
            Err(GameError::TicketIndexOutOfRange { index: 10, total: 10 })
        );
        let mut past_end = PastEnd;
        assert_eq!(
            select_winner(&weighted, &mut past_end),
            Err(GameError::TicketIndexOutOfRange { index: 10, total: 10 })
        );
        let zero = vec![entrant("A", 0), entrant("B", 0)];
        assert_eq!(select_winner_at(&zero, 0), Err(GameError::NoWeightedParticipants));
        let mut rng = ChaChaSource::seeded(1);
        assert_eq!(select_winner(&zero, &mut rng), Err(GameError::NoWeightedParticipants));
    }

    #[test]
    fn test_seeded_draws_reproduce() {
        let participants = vec![entrant("A", 1), entrant("B", 4), entrant("C", 5)];
        let mut first = ChaChaSource::seeded(42);
        let mut second = ChaChaSource::seeded(42);
        for _ in 0..100 {
            assert_eq!(
                select_winner(&participants, &mut first).unwrap(),
                select_winner(&participants, &mut second).unwrap()
            );
        }
    }

    #[test]
    fn test_frequencies_converge_to_ticket_share() {
        let participants = vec![entrant("A", 1), entrant("B", 3), entrant("C", 6)];
        let mut rng = ChaChaSource::seeded(7);
        let trials = 100_000;
        let mut wins = [0u32; 3];
        for _ in 0..trials {
            let winner = select_winner(&participants, &mut rng).unwrap();
            let slot = participants
                .iter()
                .position(|p| p.wallet_address == winner.wallet_address)
                .unwrap();
            wins[slot] += 1;
        }
        for (slot, expected) in [0.1, 0.3, 0.6].iter().enumerate() {
            let observed = wins[slot] as f64 / trials as f64;
            assert!(
                (observed - expected).abs() < 0.01,
                "slot {} observed {} expected {}",
                slot,
                observed,
                expected
            );
        }
    }
}
