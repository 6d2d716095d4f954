// Holder Raffle Engine - Round state machine
//
// Rounds only move forward: idle -> starting -> active -> selecting_winner
// -> completed, after which the record is replaced by a fresh idle round.
// The single backward edge, selecting_winner -> active, is reserved for
// abandoning a draw that never reached the archive.
use crate::{
    error::GameError,
    state::{Entrant, Round, RoundStatus, WinnerSummary},
};

fn advance(round: &mut Round, to: RoundStatus) -> Result<(), GameError> {
    if round.status.next() != to {
        return Err(GameError::InvalidTransition {
            from: round.status,
            to,
        });
    }
    round.status = to;
    Ok(())
}

impl Round {
    /// idle -> starting, loading the eligible entrants
    pub fn begin_start(
        &mut self,
        title: Option<String>,
        description: Option<String>,
        entrants: Vec<Entrant>,
        prize_pool_seed: u64,
        snapshot_reference: Option<String>,
    ) -> Result<(), GameError> {
        if self.status != RoundStatus::Idle {
            return Err(GameError::InvalidTransition {
                from: self.status,
                to: RoundStatus::Starting,
            });
        }
        if entrants.is_empty() {
            return Err(GameError::NoEligibleHolders);
        }
        let mut total_tickets: u64 = 0;
        for entrant in &entrants {
            total_tickets = total_tickets
                .checked_add(entrant.ticket_count)
                .ok_or(GameError::TicketOverflow)?;
        }

        advance(self, RoundStatus::Starting)?;
        self.title = title;
        self.description = description;
        self.participants = entrants;
        self.total_tickets = total_tickets;
        self.prize_pool_seed = prize_pool_seed;
        self.prize_pool = prize_pool_seed;
        self.snapshot_reference = snapshot_reference;
        Ok(())
    }

    /// starting -> active
    pub fn activate(&mut self, now: i64) -> Result<(), GameError> {
        advance(self, RoundStatus::Active)?;
        self.start_time = Some(now);
        Ok(())
    }

    /// active -> selecting_winner
    pub fn begin_selection(&mut self) -> Result<(), GameError> {
        if self.status != RoundStatus::Active {
            return Err(GameError::RoundNotActive);
        }
        if self.participants.is_empty() {
            return Err(GameError::NoParticipants);
        }
        advance(self, RoundStatus::SelectingWinner)
    }

    /// selecting_winner -> completed
    pub fn complete(&mut self, winner: WinnerSummary, now: i64) -> Result<(), GameError> {
        advance(self, RoundStatus::Completed)?;
        self.winner = Some(winner);
        self.end_time = Some(now);
        Ok(())
    }

    /// selecting_winner -> active, for a draw that was cancelled or could not
    /// be archived
    pub fn abandon_selection(&mut self) -> Result<(), GameError> {
        if self.status != RoundStatus::SelectingWinner || self.winner.is_some() {
            return Err(GameError::InvalidTransition {
                from: self.status,
                to: RoundStatus::Active,
            });
        }
        self.status = RoundStatus::Active;
        Ok(())
    }

    /// completed -> idle: the fresh round that takes this one's place
    pub fn successor(&self, index: u64, now: i64) -> Result<Round, GameError> {
        if self.status != RoundStatus::Completed {
            return Err(GameError::InvalidTransition {
                from: self.status,
                to: RoundStatus::Idle,
            });
        }
        Ok(Round::new(index, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entrant(wallet: &str, tickets: u64) -> Entrant {
        Entrant {
            wallet_address: wallet.to_string(),
            ticket_count: tickets,
            transaction_signature: "snapshot".to_string(),
            timestamp: 0,
        }
    }

    fn winner() -> WinnerSummary {
        WinnerSummary {
            wallet_address: "B".to_string(),
            ticket_count: 2,
            prize_amount: 0,
        }
    }

    #[test]
    fn test_full_forward_cycle() {
        let mut round = Round::new(1, 10);
        round
            .begin_start(
                Some("Weekly".into()),
                None,
                vec![entrant("B", 2), entrant("C", 1)],
                500,
                Some("snapshot_1".into()),
            )
            .unwrap();
        assert_eq!(round.status, RoundStatus::Starting);
        assert_eq!(round.total_tickets, 3);
        assert_eq!(round.prize_pool, 500);

        round.activate(20).unwrap();
        assert_eq!(round.start_time, Some(20));
        round.begin_selection().unwrap();
        round.complete(winner(), 30).unwrap();
        assert_eq!(round.status, RoundStatus::Completed);
        assert_eq!(round.end_time, Some(30));

        let next = round.successor(2, 31).unwrap();
        assert_eq!(next.status, RoundStatus::Idle);
        assert_ne!(next.id, round.id);
        assert!(next.participants.is_empty());
    }

    #[test]
    fn test_no_skipping_or_going_back() {
        let mut round = Round::new(1, 10);
        assert!(round.activate(1).is_err());
        assert_eq!(round.begin_selection(), Err(GameError::RoundNotActive));
        assert!(round.complete(winner(), 1).is_err());
        assert!(round.successor(2, 1).is_err());
        assert!(round.abandon_selection().is_err());

        round
            .begin_start(None, None, vec![entrant("B", 1)], 0, None)
            .unwrap();
        assert!(round
            .begin_start(None, None, vec![entrant("B", 1)], 0, None)
            .is_err());
        assert_eq!(round.begin_selection(), Err(GameError::RoundNotActive));
        round.activate(1).unwrap();
        assert!(round.activate(2).is_err());
        assert!(round.complete(winner(), 1).is_err());
    }

    #[test]
    fn test_start_requires_entrants() {
        let mut round = Round::new(1, 10);
        assert_eq!(
            round.begin_start(None, None, vec![], 0, None),
            Err(GameError::NoEligibleHolders)
        );
        assert_eq!(round.status, RoundStatus::Idle);
    }

    #[test]
    fn test_abandon_selection_returns_to_active() {
        let mut round = Round::new(1, 10);
        round
            .begin_start(None, None, vec![entrant("B", 1)], 0, None)
            .unwrap();
        round.activate(1).unwrap();
        round.begin_selection().unwrap();
        round.abandon_selection().unwrap();
        assert_eq!(round.status, RoundStatus::Active);
    }
}
