//! Randomized interleavings of connect and disconnect on one manager.

mod common;

use chain_connect::connection::ManagerContext;
use chain_connect::registry::ChainSelection;
use chain_connect::{
    ChainConfigBuilder, ChainFamily, ConnectionManager, ConnectionState, ConnectionStatus, ConnectorCatalog,
    ConnectorRegistry, NetworkProfile,
};
use common::TestConnector;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use std::sync::Arc;
use std::time::Duration;

const CONNECTORS: [&str; 2] = ["alpha", "beta"];

#[derive(Debug, Clone)]
enum Op {
    Connect(usize),
    Disconnect,
    Sleep(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..CONNECTORS.len()).prop_map(Op::Connect),
        2 => Just(Op::Disconnect),
        3 => (0u64..40).prop_map(Op::Sleep),
    ]
}

fn check_state(state: &ConnectionState) -> Result<(), TestCaseError> {
    prop_assert_eq!(state.status == ConnectionStatus::Connected, state.capability.is_some());
    if state.status == ConnectionStatus::Disconnected {
        prop_assert!(state.active_connector_id.is_none());
        prop_assert!(state.last_error.is_none());
    }
    if state.status == ConnectionStatus::Connecting {
        prop_assert!(state.active_connector_id.is_some());
    }
    Ok(())
}

async fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let alpha = TestConnector::new(ChainFamily::Utxo, Duration::from_millis(15));
    let beta = TestConnector::new(ChainFamily::Utxo, Duration::from_millis(25));
    let network = NetworkProfile::Testnet.preset(ChainFamily::Utxo);

    let catalog = ConnectorCatalog::new()
        .with(ChainFamily::Utxo, alpha.metadata(CONNECTORS[0], &["signet"]))
        .unwrap()
        .with(ChainFamily::Utxo, beta.metadata(CONNECTORS[1], &["signet"]))
        .unwrap();
    let selection = ChainSelection {
        families: [ChainFamily::Utxo].into(),
        network_configs: [(ChainFamily::Utxo, network.clone())].into(),
        connector_allow_list: None,
    };
    let registry = Arc::new(ConnectorRegistry::from_entries(ChainConfigBuilder::new(&catalog).build(&selection)));
    let manager = ConnectionManager::new(network, &ManagerContext::new(registry));

    let connect_ops = ops.iter().filter(|op| matches!(op, Op::Connect(_))).count();
    let mut pending = Vec::new();

    for op in ops {
        match op {
            Op::Connect(i) => {
                let manager = manager.clone();
                pending.push(tokio::spawn(async move { manager.connect(CONNECTORS[i]).await }));
            }
            Op::Disconnect => manager.disconnect().await,
            Op::Sleep(ms) => tokio::time::sleep(Duration::from_millis(ms)).await,
        }
        tokio::task::yield_now().await;
        check_state(&manager.state())?;
    }

    for task in pending {
        let _ = task.await.map_err(|e| TestCaseError::fail(e.to_string()))?;
    }

    let state = manager.state();
    check_state(&state)?;
    prop_assert_ne!(state.status, ConnectionStatus::Connecting);

    let live: Vec<_> = alpha.live_wallets().into_iter().chain(beta.live_wallets()).collect();
    if state.status == ConnectionStatus::Connected {
        prop_assert_eq!(live.len(), 1);
        prop_assert_eq!(state.address(), Some(live[0].address.clone()));
    } else {
        prop_assert!(live.is_empty(), "{} wallets left live while {:?}", live.len(), state.status);
    }

    prop_assert!(alpha.calls() + beta.calls() <= connect_ops);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn interleaved_connects_keep_one_canonical_connection(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();
        runtime.block_on(run(ops))?;
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_connects_share_one_attempt() {
    let alpha = TestConnector::new(ChainFamily::Utxo, Duration::from_millis(50));
    let network = NetworkProfile::Testnet.preset(ChainFamily::Utxo);
    let catalog = ConnectorCatalog::new()
        .with(ChainFamily::Utxo, alpha.metadata("alpha", &["signet"]))
        .unwrap();
    let registry = Arc::new(ConnectorRegistry::from_entries(ChainConfigBuilder::new(&catalog).build(
        &ChainSelection {
            families: [ChainFamily::Utxo].into(),
            network_configs: [(ChainFamily::Utxo, network.clone())].into(),
            connector_allow_list: None,
        },
    )));
    let manager = ConnectionManager::new(network, &ManagerContext::new(registry));

    let results = futures_util::future::join_all((0..8).map(|_| manager.connect("alpha"))).await;

    assert_eq!(alpha.calls(), 1);
    let addresses: Vec<_> = results.into_iter().map(|r| r.unwrap().address()).collect();
    assert!(addresses.iter().all(|a| a.as_deref() == Some("utxo-signet-1")));
}
