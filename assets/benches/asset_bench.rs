use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use agora_assets::AssetEngine;
use agora_gateway::{BalanceLedger, Collaborators, EventSink, LedgerError, RoleRegistry};
use agora_nullables::{NullClock, NullFeeGateway, NullWhitelist};
use agora_types::{AssetId, ProtocolEvent, SettlementToken, Timestamp, WalletAddress};

/// Ledger that accepts every transfer without bookkeeping, so only engine
/// cost is measured.
struct BottomlessLedger;

impl BalanceLedger for BottomlessLedger {
    fn balance_of(&self, _account: &WalletAddress) -> Result<u128, LedgerError> {
        Ok(u128::MAX)
    }

    fn balance_at(&self, _account: &WalletAddress, _at: Timestamp) -> Result<u128, LedgerError> {
        Ok(u128::MAX)
    }

    fn transfer_from(&self, _: &WalletAddress, _: &WalletAddress, _: u128) -> Result<(), LedgerError> {
        Ok(())
    }

    fn transfer(&self, _: &WalletAddress, _: &WalletAddress, _: u128) -> Result<(), LedgerError> {
        Ok(())
    }
}

struct DiscardEvents;

impl EventSink for DiscardEvents {
    fn record(&self, _event: ProtocolEvent) {}
}

fn investor(i: usize) -> WalletAddress {
    WalletAddress::new(format!("agr_investor{i}"))
}

fn make_env() -> Collaborators {
    Collaborators {
        ledger: Arc::new(BottomlessLedger),
        fees: Arc::new(NullFeeGateway::with_rates(100, 50, 500)),
        whitelist: Arc::new(NullWhitelist::allowing()),
        permissions: Arc::new(RoleRegistry::new()),
        clock: Arc::new(NullClock::new(0)),
        events: Arc::new(DiscardEvents),
    }
}

fn populated_engine(env: &Collaborators, investors: usize) -> (AssetEngine, AssetId) {
    let mut engine = AssetEngine::new(
        SettlementToken::new("USDC"),
        WalletAddress::new("agr_pool"),
        1_000,
    );
    let id = engine
        .create_asset(env, &WalletAddress::new("agr_creator"), "Bench Fund", "")
        .unwrap();
    for i in 0..investors {
        engine.invest(env, &investor(i), id, 10_000).unwrap();
    }
    (engine, id)
}

fn bench_invest(c: &mut Criterion) {
    let mut group = c.benchmark_group("asset_invest");
    let env = make_env();

    for investors in [10, 1_000, 10_000] {
        let (mut engine, id) = populated_engine(&env, investors);
        let who = investor(investors / 2);

        group.bench_with_input(
            BenchmarkId::new("existing_investor", investors),
            &investors,
            |b, _| {
                b.iter(|| black_box(engine.invest(&env, black_box(&who), id, 1_000).unwrap()));
            },
        );
    }

    group.finish();
}

fn bench_divest(c: &mut Criterion) {
    let mut group = c.benchmark_group("asset_divest");
    let env = make_env();

    for investors in [10, 1_000, 10_000] {
        let (mut engine, id) = populated_engine(&env, investors);
        let who = investor(investors / 2);
        engine.invest(&env, &who, id, 1u128 << 100).unwrap();

        group.bench_with_input(
            BenchmarkId::new("single_share", investors),
            &investors,
            |b, _| {
                b.iter(|| black_box(engine.divest(&env, black_box(&who), id, 100).unwrap()));
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_invest, bench_divest);
criterion_main!(benches);
