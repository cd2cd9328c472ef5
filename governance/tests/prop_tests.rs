use std::sync::Arc;

use proptest::prelude::*;

use agora_gateway::{BalanceLedger, Collaborators, RoleRegistry};
use agora_governance::{GovernanceEngine, GovernanceError, NoopExecutor, ProposalRequest};
use agora_nullables::{NullClock, NullFeeGateway, NullLedger, NullWhitelist};
use agora_types::{GovernanceParams, VoteWeightPolicy, WalletAddress};
use agora_utils::EventLog;

const VOTERS: [&str; 4] = ["alice", "bob", "carol", "dave"];

fn addr(name: &str) -> WalletAddress {
    WalletAddress::new(format!("agr_{name}"))
}

fn setup(balances: &[u128]) -> (Collaborators, Arc<NullClock>, Arc<NullLedger>) {
    let clock = Arc::new(NullClock::new(0));
    let ledger = Arc::new(NullLedger::new(clock.clone()));
    for (name, balance) in VOTERS.iter().zip(balances) {
        ledger.mint(&addr(name), *balance);
    }
    let env = Collaborators {
        ledger: ledger.clone(),
        fees: Arc::new(NullFeeGateway::free()),
        whitelist: Arc::new(NullWhitelist::allowing()),
        permissions: Arc::new(RoleRegistry::new()),
        clock: clock.clone(),
        events: Arc::new(EventLog::new()),
    };
    (env, clock, ledger)
}

fn params(vote_weight: VoteWeightPolicy) -> GovernanceParams {
    GovernanceParams {
        quorum_bps: 5000,
        voting_period_secs: 1_000,
        timelock_secs: 100,
        min_proposal_stake: 0,
        min_vote_buffer_secs: 5,
        enforce_min_proposal_stake: false,
        vote_weight,
    }
}

proptest! {
    /// Tallies always equal the sum of the weights recorded per voter, and
    /// under snapshot weighting never exceed the supply at creation.
    #[test]
    fn tallies_match_vote_records(
        balances in prop::collection::vec(0u128..1_000, VOTERS.len()),
        votes in prop::collection::vec((0..VOTERS.len(), any::<bool>(), 0u64..20), 1..80),
        live in any::<bool>(),
    ) {
        let policy = if live { VoteWeightPolicy::Live } else { VoteWeightPolicy::Snapshot };
        let (env, clock, ledger) = setup(&balances);
        let mut engine = GovernanceEngine::new(params(policy), 10).unwrap();
        let id = engine.create_proposal(&env, &addr("alice"), ProposalRequest::other("")).unwrap();
        let supply: u128 = balances.iter().sum();
        // keep later transfers off the creation checkpoint
        clock.advance(1);

        for (who, support, wait) in votes {
            clock.advance(wait);
            if wait % 7 == 0 {
                // shuffle tokens around mid-vote
                let from = addr(VOTERS[who]);
                let to = addr(VOTERS[(who + 1) % VOTERS.len()]);
                let amount = ledger.balance_of(&from).unwrap() / 2;
                ledger.transfer(&from, &to, amount).unwrap();
            }
            match engine.vote(&env, &addr(VOTERS[who]), id, support) {
                Ok(_)
                | Err(GovernanceError::VotingBufferNotElapsed { .. })
                | Err(GovernanceError::VotingPeriodEnded { .. }) => {}
                Err(other) => prop_assert!(false, "unexpected error {other}"),
            }
            let proposal = engine.proposal(id).unwrap();
            prop_assert!(proposal.is_consistent());
            if !live {
                prop_assert!(proposal.total_weight().unwrap() <= supply);
            }
        }
    }

    /// No proposal executes before its timelock has elapsed.
    #[test]
    fn never_executes_before_timelock(at in 0u64..2_000) {
        let (env, clock, _ledger) = setup(&[10, 0, 0, 0]);
        let mut engine = GovernanceEngine::new(params(VoteWeightPolicy::Snapshot), 10).unwrap();
        let id = engine.create_proposal(&env, &addr("alice"), ProposalRequest::other("")).unwrap();
        engine.vote(&env, &addr("alice"), id, true).unwrap();
        let timelock_ends = engine.proposal(id).unwrap().timelock_ends;

        clock.set(at);
        let result = engine.execute_proposal(&env, &NoopExecutor, &addr("keeper"), id);
        prop_assert_eq!(result.is_ok(), at >= timelock_ends.as_secs());
    }
}
