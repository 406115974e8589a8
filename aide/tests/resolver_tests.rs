mod common;

use std::{sync::Arc, time::Duration};

use common::{key, Harness, NODE_NONCE, TX_HASH};
use ppos_aide::{
    builtin::{function, BuiltinContract, BuiltinModule},
    error::AideError,
    event::FunctionId,
    module::{Module, ModuleSettings},
    nonce::NonceSequencer,
    resolver::{Invocation, ModuleKind, Resolution, ResultMode},
    transaction::{Address, TransactionRequest, TxHash},
    transfer::Transfer,
    transport::TransportError,
};
use serde_json::{json, Value};

const RECEIVER: &str = "0x2e95e3ce0a54951eb9a99152a6d5827872dfb4fd";

fn soft_failure() -> TransportError {
    TransportError::Rpc {
        code: -32000,
        message: "gas required exceeds allowance or always failing transaction: inner contract exec failed: {'code': 301111, 'message': 'The candidate already existed'}".to_string(),
        data: None,
    }
}

fn reverted() -> TransportError {
    TransportError::Rpc {
        code: -32000,
        message: "execution reverted".to_string(),
        data: None,
    }
}

fn transfer(harness: &Harness, mode: ResultMode) -> Transfer {
    Transfer::new(
        Arc::new(harness.resolver()),
        ModuleSettings::for_kind(ModuleKind::Ordinary)
            .with_default_account(Some(Arc::new(key(1))))
            .with_result_mode(mode),
    )
    .unwrap()
}

fn staking(harness: &Harness, mode: ResultMode) -> BuiltinModule {
    BuiltinModule::new(
        BuiltinContract::Staking,
        Arc::new(harness.resolver()),
        ModuleSettings::for_kind(ModuleKind::BuiltIn)
            .with_default_account(Some(Arc::new(key(1))))
            .with_result_mode(mode),
    )
    .unwrap()
}

#[tokio::test]
async fn test_transaction_mode_makes_no_network_call() {
    let harness = Harness::new();
    let transfer = transfer(&harness, ResultMode::Transaction);

    let resolution = transfer
        .transfer(Address::new(RECEIVER), 1_000, None, None)
        .await
        .unwrap();

    let Resolution::Transaction(transaction) = resolution else {
        panic!("expected an unsigned transaction, got {:?}", resolution);
    };
    assert_eq!(transaction.to, Some(Address::new(RECEIVER)));
    assert_eq!(transaction.value, Some(1_000));
    assert_eq!(transaction.gas, Some(21_000));
    assert_eq!(transaction.nonce, None);
    assert_eq!(harness.transport.total_calls(), 0);
    assert!(harness.signer.signed().is_empty());
}

#[tokio::test]
async fn test_hash_mode_broadcasts_without_waiting() {
    let harness = Harness::new();
    let transfer = transfer(&harness, ResultMode::Hash);

    let resolution = transfer
        .transfer(Address::new(RECEIVER), 1_000, None, None)
        .await
        .unwrap();

    assert_eq!(resolution.hash(), Some(&TxHash::from_hex(TX_HASH).unwrap()));
    assert_eq!(harness.transport.calls("platon_sendRawTransaction"), 1);
    assert_eq!(harness.transport.calls("platon_getTransactionReceipt"), 0);
    // Transfers carry their gas limit, nothing to estimate
    assert_eq!(harness.transport.calls("platon_estimateGas"), 0);

    let signed = harness.signer.signed();
    assert_eq!(signed.len(), 1);
    assert_eq!(signed[0].nonce, Some(NODE_NONCE));
    assert_eq!(signed[0].chain_id, Some(100));
    assert_eq!(signed[0].gas_price, Some(1_000_000_000));
    assert_eq!(
        signed[0].from,
        Some(Address::new(format!("0x{}", "01".repeat(20))))
    );
}

#[tokio::test]
async fn test_receipt_mode_waits_for_receipt() {
    let harness = Harness::new();
    let transfer = transfer(&harness, ResultMode::Receipt);

    let receipt = transfer
        .transfer(Address::new(RECEIVER), 1_000, None, None)
        .await
        .unwrap()
        .into_receipt()
        .unwrap();

    assert_eq!(receipt.transaction_hash, TX_HASH);
    assert_eq!(receipt.block_number, Some(16));
    assert_eq!(receipt.gas_used, Some(21_000));
    assert!(receipt.is_success());
    assert_eq!(harness.transport.calls("platon_sendRawTransaction"), 1);
    assert_eq!(harness.transport.calls("platon_getTransactionReceipt"), 1);
}

#[tokio::test]
async fn test_event_mode_decodes_builtin_event() {
    let harness = Harness::new();
    let staking = staking(&harness, ResultMode::Event);

    let event = staking
        .transact(function::CREATE_STAKING, vec![0xc0], None, None)
        .await
        .unwrap()
        .into_event()
        .unwrap();

    assert!(event.is_success());
    assert_eq!(event.data, Some(json!({"function": 1000, "logs": 1})));
    assert_eq!(harness.transport.calls("platon_estimateGas"), 1);
    assert_eq!(harness.transport.calls("platon_getTransactionReceipt"), 1);
}

#[tokio::test]
async fn test_override_mode_per_call() {
    let harness = Harness::new();
    let staking = staking(&harness, ResultMode::Event);

    let transaction = BuiltinContract::Staking
        .default_transaction()
        .with_data(vec![0xc0]);
    let resolution = staking
        .module()
        .transact_with_mode(
            transaction,
            ResultMode::Hash,
            Some(function::DELEGATE),
            None,
        )
        .await
        .unwrap();

    assert!(matches!(resolution, Resolution::Hash(_)));
    assert_eq!(harness.transport.calls("platon_getTransactionReceipt"), 0);
}

#[tokio::test]
async fn test_soft_failure_is_returned_as_event() {
    let harness = Harness::new();
    harness.transport.fail("platon_estimateGas", soft_failure());
    let staking = staking(&harness, ResultMode::Hash);

    let resolution = staking
        .transact(function::CREATE_STAKING, vec![0xc0], None, None)
        .await
        .unwrap();

    let Resolution::Event(event) = resolution else {
        panic!("expected the soft failure event, got {:?}", resolution);
    };
    assert_eq!(event.code, 301111);
    assert_eq!(
        event.message.as_deref(),
        Some("The candidate already existed")
    );
    assert_eq!(harness.transport.calls("platon_sendRawTransaction"), 0);
    assert_eq!(harness.transport.calls("platon_getTransactionCount"), 0);
    assert!(harness.signer.signed().is_empty());
}

#[tokio::test]
async fn test_unparseable_builtin_failure_is_contract_logic() {
    let harness = Harness::new();
    harness.transport.fail("platon_estimateGas", reverted());
    let staking = staking(&harness, ResultMode::Event);

    let result = staking
        .transact(function::CREATE_STAKING, vec![0xc0], None, None)
        .await;

    assert!(matches!(
        result,
        Err(AideError::ContractLogic { code: -32000, ref message }) if message == "execution reverted"
    ));
}

#[tokio::test]
async fn test_ordinary_failure_is_never_an_event() {
    let harness = Harness::new();
    harness.transport.fail("platon_estimateGas", soft_failure());
    let module = Module::new(
        ModuleKind::Ordinary,
        Arc::new(harness.resolver()),
        ModuleSettings::for_kind(ModuleKind::Ordinary),
    )
    .unwrap();

    let transaction = TransactionRequest::new()
        .with_to(Address::new(RECEIVER))
        .with_data(vec![1, 2, 3]);
    let result = module.transact(transaction, None, Some(&key(3))).await;

    assert!(matches!(result, Err(AideError::ContractLogic { .. })));
}

#[tokio::test]
async fn test_transport_failure_is_not_contract_logic() {
    let harness = Harness::new();
    harness
        .transport
        .fail("platon_chainId", TransportError::Connection("refused".into()));
    let transfer = transfer(&harness, ResultMode::Hash);

    let result = transfer
        .transfer(Address::new(RECEIVER), 1, None, None)
        .await;

    assert!(matches!(
        result,
        Err(AideError::Transport(TransportError::Connection(_)))
    ));
}

#[tokio::test]
async fn test_missing_identity_fails_before_network() {
    let harness = Harness::new();
    let transfer = Transfer::new(
        Arc::new(harness.resolver()),
        ModuleSettings::for_kind(ModuleKind::Ordinary).with_result_mode(ResultMode::Transaction),
    )
    .unwrap();

    let result = transfer
        .transfer(Address::new(RECEIVER), 1, None, None)
        .await;

    assert!(matches!(result, Err(AideError::MissingSigningIdentity)));
    assert_eq!(harness.transport.total_calls(), 0);
}

#[tokio::test]
async fn test_per_call_key_wins_over_default_account() {
    let harness = Harness::new();
    let transfer = transfer(&harness, ResultMode::Hash);

    transfer
        .transfer(Address::new(RECEIVER), 1, None, Some(&key(9)))
        .await
        .unwrap();

    let signed = harness.signer.signed();
    assert_eq!(
        signed[0].from,
        Some(Address::new(format!("0x{}", "09".repeat(20))))
    );
}

#[tokio::test]
async fn test_event_mode_rejected_for_ordinary_modules() {
    let harness = Harness::new();
    let resolver = Arc::new(harness.resolver());

    let result = Transfer::new(
        resolver.clone(),
        ModuleSettings::for_kind(ModuleKind::Ordinary).with_result_mode(ResultMode::Event),
    );
    assert!(matches!(
        result,
        Err(AideError::UnsupportedResultMode {
            mode: ResultMode::Event,
            kind: ModuleKind::Ordinary
        })
    ));

    let mut transfer = transfer(&harness, ResultMode::Receipt);
    assert!(transfer.module_mut().set_result_mode(ResultMode::Event).is_err());
    assert_eq!(transfer.module().result_mode(), ResultMode::Receipt);

    let result = transfer
        .module()
        .transact_with_mode(
            TransactionRequest::new().with_to(Address::new(RECEIVER)),
            ResultMode::Event,
            Some(FunctionId(1000)),
            None,
        )
        .await;
    assert!(matches!(result, Err(AideError::UnsupportedResultMode { .. })));
    assert_eq!(harness.transport.total_calls(), 0);
}

#[tokio::test]
async fn test_event_mode_requires_function_id() {
    let harness = Harness::new();
    let resolver = harness.resolver();

    let result = resolver
        .resolve(
            BuiltinContract::Staking.default_transaction(),
            Invocation {
                kind: ModuleKind::BuiltIn,
                mode: ResultMode::Event,
                signing_key: Some(&key(1)),
                function_id: None,
            },
        )
        .await;

    assert!(matches!(result, Err(AideError::MissingFunctionId)));
    assert_eq!(harness.transport.total_calls(), 0);
}

#[tokio::test]
async fn test_caller_fields_are_kept() {
    let harness = Harness::new();
    let transfer = transfer(&harness, ResultMode::Hash);

    let overrides = TransactionRequest::new()
        .with_nonce(42)
        .with_gas_price(5)
        .with_chain_id(201018);
    transfer
        .transfer(Address::new(RECEIVER), 1, Some(overrides), None)
        .await
        .unwrap();

    let signed = harness.signer.signed();
    assert_eq!(signed[0].nonce, Some(42));
    assert_eq!(signed[0].gas_price, Some(5));
    assert_eq!(signed[0].chain_id, Some(201018));
    assert_eq!(harness.transport.calls("platon_getTransactionCount"), 0);
    assert_eq!(harness.transport.calls("platon_gasPrice"), 0);
    assert_eq!(harness.transport.calls("platon_chainId"), 0);
}

#[tokio::test]
async fn test_receipt_sent_as_bytes_is_normalized() {
    let harness = Harness::new();
    let text = common::receipt_json().to_string();
    harness.transport.respond(
        "platon_getTransactionReceipt",
        Value::String(format!("0x{}", hex::encode(text.as_bytes()))),
    );
    let transfer = transfer(&harness, ResultMode::Receipt);

    let receipt = transfer
        .transfer(Address::new(RECEIVER), 1, None, None)
        .await
        .unwrap()
        .into_receipt()
        .unwrap();

    assert_eq!(receipt.block_number, Some(16));
    assert_eq!(receipt.logs.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_receipt_timeout() {
    let harness = Harness::new();
    harness
        .transport
        .respond("platon_getTransactionReceipt", Value::Null);
    let transfer = Transfer::new(
        Arc::new(
            harness
                .resolver()
                .with_receipt_timeout(Duration::from_secs(3)),
        ),
        ModuleSettings::for_kind(ModuleKind::Ordinary).with_default_account(Some(Arc::new(key(1)))),
    )
    .unwrap();

    let result = transfer
        .transfer(Address::new(RECEIVER), 1, None, None)
        .await;

    assert!(matches!(
        result,
        Err(AideError::Transport(TransportError::ReceiptTimeout { .. }))
    ));
    assert!(harness.transport.calls("platon_getTransactionReceipt") > 1);
}

#[tokio::test]
async fn test_nonce_sequencer_hands_out_consecutive_nonces() {
    let harness = Harness::new();
    let resolver = Arc::new(
        harness
            .resolver()
            .with_nonce_sequencer(Arc::new(NonceSequencer::new())),
    );
    let transfer = Transfer::new(
        resolver,
        ModuleSettings::for_kind(ModuleKind::Ordinary)
            .with_default_account(Some(Arc::new(key(1))))
            .with_result_mode(ResultMode::Hash),
    )
    .unwrap();

    let (first, second) = tokio::join!(
        transfer.transfer(Address::new(RECEIVER), 1, None, None),
        transfer.transfer(Address::new(RECEIVER), 2, None, None),
    );
    first.unwrap();
    second.unwrap();

    let mut nonces: Vec<_> = harness
        .signer
        .signed()
        .iter()
        .filter_map(|t| t.nonce)
        .collect();
    nonces.sort();
    assert_eq!(nonces, vec![NODE_NONCE, NODE_NONCE + 1]);
}

#[tokio::test]
async fn test_nonce_sequencer_follows_node_count() {
    let harness = Harness::new();
    let sequencer = Arc::new(NonceSequencer::new());
    let address = Address::new("0xaa");

    assert_eq!(
        sequencer
            .next(harness.transport.as_ref(), &address)
            .await
            .unwrap(),
        NODE_NONCE
    );

    // Transactions sent by another tool moved the node ahead
    harness
        .transport
        .respond("platon_getTransactionCount", json!("0x14"));
    assert_eq!(
        sequencer
            .next(harness.transport.as_ref(), &address)
            .await
            .unwrap(),
        20
    );
}

#[tokio::test]
async fn test_failed_broadcast_resets_nonce() {
    let harness = Harness::new();
    let resolver = Arc::new(
        harness
            .resolver()
            .with_nonce_sequencer(Arc::new(NonceSequencer::new())),
    );
    let transfer = Transfer::new(
        resolver,
        ModuleSettings::for_kind(ModuleKind::Ordinary)
            .with_default_account(Some(Arc::new(key(1))))
            .with_result_mode(ResultMode::Hash),
    )
    .unwrap();

    harness.transport.respond_sequence(
        "platon_sendRawTransaction",
        vec![
            Err(TransportError::Rpc {
                code: -32000,
                message: "insufficient funds".into(),
                data: None,
            }),
            Ok(json!(TX_HASH)),
        ],
    );

    let failed = transfer
        .transfer(Address::new(RECEIVER), 1, None, None)
        .await;
    assert!(matches!(
        failed,
        Err(AideError::Transport(TransportError::Rpc { .. }))
    ));

    transfer
        .transfer(Address::new(RECEIVER), 1, None, None)
        .await
        .unwrap();

    let nonces: Vec<_> = harness
        .signer
        .signed()
        .iter()
        .filter_map(|t| t.nonce)
        .collect();
    assert_eq!(nonces, vec![NODE_NONCE, NODE_NONCE]);
}

#[tokio::test]
async fn test_call_never_signs() {
    let harness = Harness::new();
    let staking = staking(&harness, ResultMode::Event);

    let output = staking.call(vec![0xc1, 0x80], None).await.unwrap();

    assert_eq!(output, vec![0x2a]);
    assert_eq!(harness.transport.calls("platon_call"), 1);
    assert_eq!(harness.transport.calls("platon_sendRawTransaction"), 0);
    assert!(harness.signer.signed().is_empty());
}

#[tokio::test]
async fn test_call_failure_is_contract_logic() {
    let harness = Harness::new();
    harness.transport.fail("platon_call", reverted());
    let staking = staking(&harness, ResultMode::Event);

    let result = staking.call(vec![0xc1, 0x80], None).await;
    assert!(matches!(result, Err(AideError::ContractLogic { .. })));
}
