//! Governance engine: proposal lifecycle, voting, execution and the
//! governance configuration.

use crate::error::GovernanceError;
use crate::executor::ProposalExecutor;
use crate::params::GovernableParam;
use crate::proposal::{Proposal, ProposalRequest, ProposalStatus, VoteRecord};
use agora_gateway::{CapabilityGrant, Collaborators, LedgerError};
use agora_types::{
    Capability, GovernanceParams, ProposalId, ProposalKind, ProtocolEvent, VoteWeightPolicy,
    WalletAddress,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MAX_DESCRIPTION_LEN: usize = 4096;

/// Outcome of a recorded vote.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteReceipt {
    pub proposal: ProposalId,
    pub support: bool,
    pub weight: u128,
    /// `(support, weight)` of the vote this one replaced.
    pub replaced: Option<(bool, u128)>,
    pub yes_weight: u128,
    pub no_weight: u128,
}

/// Outcome of an executed proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionOutcome {
    pub proposal: ProposalId,
    pub kind: ProposalKind,
    pub yes_weight: u128,
    pub no_weight: u128,
    /// `(parameter, before, after)` for an applied parameter change.
    pub parameter_change: Option<(GovernableParam, u128, u128)>,
}

/// The governance engine.
///
/// Owns every proposal and the live [`GovernanceParams`]. Proposals copy the
/// terms they are judged by at creation, so a configuration change never
/// moves the goalposts of a vote already in progress.
pub struct GovernanceEngine {
    proposals: BTreeMap<ProposalId, Proposal>,
    next_proposal_id: ProposalId,
    params: GovernanceParams,
    /// Largest page a paged accessor will return.
    max_batch: usize,
}

impl GovernanceEngine {
    pub fn new(params: GovernanceParams, max_batch: usize) -> Result<Self, GovernanceError> {
        params.validate().map_err(GovernanceError::InvalidInput)?;
        Ok(Self {
            proposals: BTreeMap::new(),
            next_proposal_id: ProposalId::FIRST,
            params,
            max_batch,
        })
    }

    /// Open a proposal for voting.
    ///
    /// Voting runs for `voting_period_secs` from now, followed by the
    /// timelock. When `enforce_min_proposal_stake` is set, the proposer's
    /// live balance must be at least `min_proposal_stake`.
    pub fn create_proposal(
        &mut self,
        env: &Collaborators,
        caller: &WalletAddress,
        request: ProposalRequest,
    ) -> Result<ProposalId, GovernanceError> {
        ensure_identity(caller)?;
        validate_request(&request)?;
        if self.params.enforce_min_proposal_stake {
            let balance = env.ledger.balance_of(caller).map_err(ledger_failure)?;
            if balance < self.params.min_proposal_stake {
                tracing::debug!(%caller, balance, "proposer below minimum stake");
                return Err(GovernanceError::InsufficientFunds {
                    needed: self.params.min_proposal_stake,
                    available: balance,
                });
            }
        }

        let id = self.next_proposal_id;
        let next = id.next().ok_or(GovernanceError::Overflow)?;
        let proposal = Proposal::new(id, request, caller.clone(), env.now(), &self.params);
        let (kind, voting_ends, timelock_ends) =
            (proposal.kind, proposal.voting_ends, proposal.timelock_ends);
        self.proposals.insert(id, proposal);
        self.next_proposal_id = next;

        tracing::info!(proposal = %id, proposer = %caller, %kind, %voting_ends, %timelock_ends, "proposal created");
        env.events.record(ProtocolEvent::ProposalCreated {
            proposal: id,
            proposer: caller.clone(),
            kind,
            voting_ends,
            timelock_ends,
        });
        Ok(id)
    }

    /// Cast or change a vote.
    ///
    /// A change removes the weight recorded with the previous vote and adds
    /// the caller's current weight to the chosen side. Changes are throttled
    /// by the proposal's minimum vote buffer.
    pub fn vote(
        &mut self,
        env: &Collaborators,
        caller: &WalletAddress,
        proposal_id: ProposalId,
        support: bool,
    ) -> Result<VoteReceipt, GovernanceError> {
        ensure_identity(caller)?;
        let now = env.now();
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))?;
        if now > proposal.voting_ends {
            return Err(GovernanceError::VotingPeriodEnded {
                ends: proposal.voting_ends,
                now,
            });
        }
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::InvalidProposalState {
                proposal: proposal_id,
                status: proposal.status,
            });
        }
        let buffer = proposal.terms.min_vote_buffer_secs;
        let previous = proposal.votes.get(caller).cloned();
        if let Some(prev) = &previous {
            if !prev.last_vote_at.has_expired(buffer, now) {
                return Err(GovernanceError::VotingBufferNotElapsed {
                    next_allowed: prev.last_vote_at.saturating_add(buffer),
                });
            }
        }

        let weight = match proposal.terms.vote_weight {
            VoteWeightPolicy::Snapshot => env.ledger.balance_at(caller, proposal.created_at),
            VoteWeightPolicy::Live => env.ledger.balance_of(caller),
        }
        .map_err(ledger_failure)?;

        let (mut yes, mut no) = (proposal.yes_weight, proposal.no_weight);
        if let Some(prev) = &previous {
            let tally = if prev.support { &mut yes } else { &mut no };
            *tally = tally
                .checked_sub(prev.weight)
                .ok_or(GovernanceError::Overflow)?;
        }
        let tally = if support { &mut yes } else { &mut no };
        *tally = tally.checked_add(weight).ok_or(GovernanceError::Overflow)?;

        proposal.yes_weight = yes;
        proposal.no_weight = no;
        proposal.votes.insert(
            caller.clone(),
            VoteRecord {
                support,
                weight,
                last_vote_at: now,
            },
        );

        let replaced = previous.map(|prev| (prev.support, prev.weight));
        tracing::info!(proposal = %proposal_id, voter = %caller, support, weight, yes, no, "vote recorded");
        env.events.record(ProtocolEvent::VoteCast {
            proposal: proposal_id,
            voter: caller.clone(),
            support,
            weight,
            replaced,
            yes_weight: yes,
            no_weight: no,
        });
        Ok(VoteReceipt {
            proposal: proposal_id,
            support,
            weight,
            replaced,
            yes_weight: yes,
            no_weight: no,
        })
    }

    /// Execute a proposal whose voting and timelock periods are over and
    /// whose yes-weight meets quorum and beats no-weight.
    ///
    /// `ParameterChange` proposals are applied to the engine's own
    /// configuration; every other kind is handed to `executor`. If the
    /// executor fails, the proposal stays executable.
    pub fn execute_proposal(
        &mut self,
        env: &Collaborators,
        executor: &dyn ProposalExecutor,
        caller: &WalletAddress,
        proposal_id: ProposalId,
    ) -> Result<ExecutionOutcome, GovernanceError> {
        ensure_identity(caller)?;
        let now = env.now();
        let proposal = self
            .proposals
            .get(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))?;
        if proposal.executed {
            return Err(GovernanceError::ProposalAlreadyExecuted(proposal_id));
        }
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::InvalidProposalState {
                proposal: proposal_id,
                status: proposal.status,
            });
        }
        if now <= proposal.voting_ends {
            return Err(GovernanceError::VotingPeriodNotEnded {
                ends: proposal.voting_ends,
                now,
            });
        }
        if now < proposal.timelock_ends {
            return Err(GovernanceError::TimelockPeriodNotElapsed {
                ends: proposal.timelock_ends,
                now,
            });
        }
        let (yes, no) = (proposal.yes_weight, proposal.no_weight);
        let required = proposal.quorum_votes().ok_or(GovernanceError::Overflow)?;
        if yes < required {
            return Err(GovernanceError::QuorumNotReached { yes, required });
        }
        if yes <= no {
            return Err(GovernanceError::MajorityNotReached { yes, no });
        }

        let kind = proposal.kind;
        let parameter_change = match kind {
            ProposalKind::ParameterChange => {
                let (param, value) = proposal
                    .parameter
                    .zip(proposal.amount)
                    .ok_or_else(|| {
                        GovernanceError::InvalidInput(
                            "parameter change without parameter or value".to_string(),
                        )
                    })?;
                let mut next = self.params.clone();
                param
                    .apply(&mut next, value)
                    .map_err(GovernanceError::InvalidInput)?;
                Some((param, param.current(&self.params), next))
            }
            _ => {
                executor.execute(proposal).map_err(|e| {
                    tracing::debug!(proposal = %proposal_id, error = %e, "proposal executor failed");
                    GovernanceError::OperationFailed(e.to_string())
                })?;
                None
            }
        };

        let parameter_change = match parameter_change {
            Some((param, before, next)) => {
                self.params = next;
                let after = param.current(&self.params);
                tracing::info!(proposal = %proposal_id, param = param.name(), before, after, "governance parameter changed by proposal");
                env.events.record(ProtocolEvent::GovernanceParamChanged {
                    param: param.name().to_string(),
                    actor: caller.clone(),
                    before,
                    after,
                });
                Some((param, before, after))
            }
            None => None,
        };
        if let Some(proposal) = self.proposals.get_mut(&proposal_id) {
            proposal.executed = true;
            proposal.status = ProposalStatus::Executed;
        }

        tracing::info!(proposal = %proposal_id, executor = %caller, %kind, yes, no, "proposal executed");
        env.events.record(ProtocolEvent::ProposalExecuted {
            proposal: proposal_id,
            executor: caller.clone(),
            yes_weight: yes,
            no_weight: no,
        });
        Ok(ExecutionOutcome {
            proposal: proposal_id,
            kind,
            yes_weight: yes,
            no_weight: no,
            parameter_change,
        })
    }

    /// Cancel a proposal before it executes. Only the proposer, or a caller
    /// presenting their own admin grant, may cancel.
    pub fn cancel_proposal(
        &mut self,
        env: &Collaborators,
        caller: &WalletAddress,
        admin: Option<&CapabilityGrant>,
        proposal_id: ProposalId,
    ) -> Result<(), GovernanceError> {
        ensure_identity(caller)?;
        let proposal = self
            .proposals
            .get_mut(&proposal_id)
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))?;

        let authorized = if &proposal.proposer == caller {
            true
        } else if let Some(grant) = admin {
            grant
                .ensure_held_by(caller)
                .map_err(|_| GovernanceError::CallerNotOwner)?;
            grant.confers(Capability::Admin)
        } else {
            false
        };
        if !authorized {
            return Err(GovernanceError::Unauthorized);
        }
        if proposal.executed {
            return Err(GovernanceError::ProposalAlreadyExecuted(proposal_id));
        }
        if proposal.status != ProposalStatus::Active {
            return Err(GovernanceError::InvalidProposalState {
                proposal: proposal_id,
                status: proposal.status,
            });
        }
        proposal.status = ProposalStatus::Canceled;

        tracing::info!(proposal = %proposal_id, actor = %caller, "proposal canceled");
        env.events.record(ProtocolEvent::ProposalCanceled {
            proposal: proposal_id,
            actor: caller.clone(),
        });
        Ok(())
    }

    // ── Configuration ───────────────────────────────────────────────────

    /// Change one governance parameter. Requires an admin grant.
    ///
    /// Returns the previous value. Only proposals created afterwards see
    /// the new value.
    pub fn set_param(
        &mut self,
        env: &Collaborators,
        grant: &CapabilityGrant,
        param: GovernableParam,
        value: u128,
    ) -> Result<u128, GovernanceError> {
        if !grant.confers(Capability::Admin) {
            return Err(GovernanceError::CallerNotAdmin);
        }
        let before = param.current(&self.params);
        param
            .apply(&mut self.params, value)
            .map_err(GovernanceError::InvalidInput)?;

        tracing::info!(admin = %grant.holder(), param = param.name(), before, after = value, "governance parameter changed");
        env.events.record(ProtocolEvent::GovernanceParamChanged {
            param: param.name().to_string(),
            actor: grant.holder().clone(),
            before,
            after: value,
        });
        Ok(before)
    }

    pub fn set_quorum_bps(
        &mut self,
        env: &Collaborators,
        grant: &CapabilityGrant,
        quorum_bps: u32,
    ) -> Result<u128, GovernanceError> {
        self.set_param(env, grant, GovernableParam::QuorumBps, u128::from(quorum_bps))
    }

    pub fn set_voting_period(
        &mut self,
        env: &Collaborators,
        grant: &CapabilityGrant,
        secs: u64,
    ) -> Result<u128, GovernanceError> {
        self.set_param(env, grant, GovernableParam::VotingPeriodSecs, u128::from(secs))
    }

    pub fn set_timelock_period(
        &mut self,
        env: &Collaborators,
        grant: &CapabilityGrant,
        secs: u64,
    ) -> Result<u128, GovernanceError> {
        self.set_param(env, grant, GovernableParam::TimelockSecs, u128::from(secs))
    }

    pub fn set_min_proposal_stake(
        &mut self,
        env: &Collaborators,
        grant: &CapabilityGrant,
        stake: u128,
    ) -> Result<u128, GovernanceError> {
        self.set_param(env, grant, GovernableParam::MinProposalStake, stake)
    }

    pub fn set_min_vote_buffer(
        &mut self,
        env: &Collaborators,
        grant: &CapabilityGrant,
        secs: u64,
    ) -> Result<u128, GovernanceError> {
        self.set_param(env, grant, GovernableParam::MinVoteBufferSecs, u128::from(secs))
    }

    // ── Queries ─────────────────────────────────────────────────────────

    pub fn params(&self) -> &GovernanceParams {
        &self.params
    }

    pub fn proposal(&self, proposal_id: ProposalId) -> Option<&Proposal> {
        self.proposals.get(&proposal_id)
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    /// A page of proposals in id order.
    pub fn proposals(&self, offset: usize, limit: usize) -> Result<Vec<&Proposal>, GovernanceError> {
        if limit > self.max_batch {
            return Err(GovernanceError::ExceedsBatchLimit {
                requested: limit,
                limit: self.max_batch,
            });
        }
        Ok(self.proposals.values().skip(offset).take(limit).collect())
    }

    pub fn has_voted(
        &self,
        proposal_id: ProposalId,
        voter: &WalletAddress,
    ) -> Result<bool, GovernanceError> {
        self.proposals
            .get(&proposal_id)
            .map(|p| p.has_voted(voter))
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    pub fn vote_of(
        &self,
        proposal_id: ProposalId,
        voter: &WalletAddress,
    ) -> Result<Option<&VoteRecord>, GovernanceError> {
        self.proposals
            .get(&proposal_id)
            .map(|p| p.vote_of(voter))
            .ok_or(GovernanceError::ProposalNotFound(proposal_id))
    }

    pub fn max_batch(&self) -> usize {
        self.max_batch
    }
}

/// Serializable snapshot of the governance engine's state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GovernanceSnapshot {
    pub proposals: Vec<Proposal>,
    pub next_proposal_id: ProposalId,
    pub params: GovernanceParams,
    pub max_batch: usize,
}

impl GovernanceEngine {
    /// Serialize every proposal, the id counter and the live configuration.
    pub fn save_state(&self) -> Result<Vec<u8>, GovernanceError> {
        let snapshot = GovernanceSnapshot {
            proposals: self.proposals.values().cloned().collect(),
            next_proposal_id: self.next_proposal_id,
            params: self.params.clone(),
            max_batch: self.max_batch,
        };
        bincode::serialize(&snapshot).map_err(|e| GovernanceError::Snapshot(e.to_string()))
    }

    /// Restore an engine from [`save_state`](Self::save_state) output.
    pub fn load_state(data: &[u8]) -> Result<Self, GovernanceError> {
        let snapshot: GovernanceSnapshot =
            bincode::deserialize(data).map_err(|e| GovernanceError::Snapshot(e.to_string()))?;
        snapshot.params.validate().map_err(GovernanceError::Snapshot)?;
        let mut proposals = BTreeMap::new();
        for proposal in snapshot.proposals {
            if proposal.id >= snapshot.next_proposal_id {
                return Err(GovernanceError::Snapshot(format!(
                    "{} is not below the id counter",
                    proposal.id
                )));
            }
            if proposal.executed != (proposal.status == ProposalStatus::Executed) {
                return Err(GovernanceError::Snapshot(format!(
                    "{} executed flag disagrees with status {:?}",
                    proposal.id, proposal.status
                )));
            }
            if !proposal.is_consistent() {
                return Err(GovernanceError::Snapshot(format!(
                    "{} vote records do not sum to its tallies",
                    proposal.id
                )));
            }
            proposals.insert(proposal.id, proposal);
        }
        Ok(Self {
            proposals,
            next_proposal_id: snapshot.next_proposal_id,
            params: snapshot.params,
            max_batch: snapshot.max_batch,
        })
    }
}

fn ensure_identity(caller: &WalletAddress) -> Result<(), GovernanceError> {
    if caller.is_zero() {
        return Err(GovernanceError::ZeroAddress);
    }
    Ok(())
}

fn validate_request(request: &ProposalRequest) -> Result<(), GovernanceError> {
    if request.description.len() > MAX_DESCRIPTION_LEN {
        return Err(GovernanceError::InvalidInput(format!(
            "proposal description longer than {MAX_DESCRIPTION_LEN} bytes"
        )));
    }
    match request.kind {
        ProposalKind::Investment | ProposalKind::Divestment => {
            if request.asset.is_none() {
                return Err(GovernanceError::InvalidInput(format!(
                    "{} proposal needs a target asset",
                    request.kind
                )));
            }
            if request.amount.unwrap_or(0) == 0 {
                return Err(GovernanceError::InvalidInput(format!(
                    "{} proposal needs a non-zero amount",
                    request.kind
                )));
            }
        }
        ProposalKind::ParameterChange => {
            let (param, value) = request.parameter.zip(request.amount).ok_or_else(|| {
                GovernanceError::InvalidInput(
                    "parameter change needs a parameter and a value".to_string(),
                )
            })?;
            param.validate(value).map_err(GovernanceError::InvalidInput)?;
        }
        ProposalKind::Other => {}
    }
    Ok(())
}

fn ledger_failure(err: LedgerError) -> GovernanceError {
    GovernanceError::OperationFailed(format!("ledger: {err}"))
}
