#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use ppos_aide::{
    event::{BuiltinEvent, EventDecodeError, EventDecoder, FunctionId},
    receipt::Receipt,
    resolver::Resolver,
    signer::{PrivateKey, SignerError, TransactionSigner},
    transaction::{Address, SignedTransaction, TransactionRequest},
    transport::{ChainTransport, TransportError},
};
use serde_json::{json, Value};

pub const TX_HASH: &str = "0xabababababababababababababababababababababababababababababababab";
pub const NODE_NONCE: u64 = 7;

pub const ECONOMIC_CONFIG: &str = r#"{
    "common": {
        "maxEpochMinutes": 3,
        "nodeBlockTimeWindow": 10,
        "perRoundBlocks": 10,
        "maxConsensusVals": 4,
        "additionalCycleTime": 27
    },
    "slashing": {
        "slashFractionDuplicateSign": 10,
        "duplicateSignReportReward": 50,
        "maxEvidenceAge": 1,
        "slashBlocksReward": 5,
        "zeroProduceCumulativeTime": 2,
        "zeroProduceNumberThreshold": 1,
        "zeroProduceFreezeDuration": 1
    }
}"#;

pub fn receipt_json() -> Value {
    json!({
        "transactionHash": TX_HASH,
        "blockNumber": "0x10",
        "blockHash": "0x01",
        "status": "0x1",
        "gasUsed": "0x5208",
        "logs": [{"address": "0x1000000000000000000000000000000000000002", "topics": [], "data": "0xc30a8180"}]
    })
}

/// Node double answering JSON-RPC methods from canned responses
///
/// Each method owns a queue of answers, the last one is repeated once the queue
/// is drained. Calls are counted per method.
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<Result<Value, TransportError>>>>,
    call_count: Mutex<HashMap<String, usize>>,
}

impl MockTransport {
    pub fn new() -> Self {
        let transport = Self {
            responses: Mutex::new(HashMap::new()),
            call_count: Mutex::new(HashMap::new()),
        };

        transport.respond("platon_chainId", json!("0x64"));
        transport.respond("platon_gasPrice", json!("0x3b9aca00"));
        transport.respond("platon_estimateGas", json!("0x186a0"));
        transport.respond("platon_getTransactionCount", json!(format!("{:#x}", NODE_NONCE)));
        transport.respond("platon_sendRawTransaction", json!(TX_HASH));
        transport.respond("platon_getTransactionReceipt", receipt_json());
        transport.respond("platon_blockNumber", json!("0x1"));
        transport.respond("platon_call", json!("0x2a"));
        transport.respond("debug_economicConfig", json!(ECONOMIC_CONFIG));
        transport.respond("web3_clientVersion", json!("PlatONnetwork/test/v1.5.0"));
        transport
    }

    /// Replace the answers of `method`
    pub fn respond(&self, method: &str, value: Value) {
        self.respond_sequence(method, vec![Ok(value)]);
    }

    pub fn fail(&self, method: &str, error: TransportError) {
        self.respond_sequence(method, vec![Err(error)]);
    }

    pub fn respond_sequence(&self, method: &str, answers: Vec<Result<Value, TransportError>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(method.to_string(), answers.into());
    }

    pub fn calls(&self, method: &str) -> usize {
        self.call_count
            .lock()
            .unwrap()
            .get(method)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.call_count.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl ChainTransport for MockTransport {
    async fn request(&self, method: &str, _params: Value) -> Result<Value, TransportError> {
        *self
            .call_count
            .lock()
            .unwrap()
            .entry(method.to_string())
            .or_insert(0) += 1;

        let mut responses = self.responses.lock().unwrap();
        let queue = responses
            .get_mut(method)
            .unwrap_or_else(|| panic!("unexpected call to {}", method));
        if queue.len() > 1 {
            queue.pop_front().unwrap()
        } else {
            queue.front().cloned().unwrap()
        }
    }
}

/// Signer recording every transaction it signs
#[derive(Default)]
pub struct MockSigner {
    pub signed: Mutex<Vec<TransactionRequest>>,
}

impl MockSigner {
    pub fn signed(&self) -> Vec<TransactionRequest> {
        self.signed.lock().unwrap().clone()
    }
}

impl TransactionSigner for MockSigner {
    fn address(&self, key: &PrivateKey) -> Result<Address, SignerError> {
        Ok(Address::new(format!("0x{}", hex::encode(&key.as_bytes()[..20]))))
    }

    fn sign(
        &self,
        transaction: &TransactionRequest,
        key: &PrivateKey,
    ) -> Result<SignedTransaction, SignerError> {
        if transaction.nonce.is_none() {
            return Err(SignerError::IncompleteTransaction("nonce"));
        }
        if transaction.gas.is_none() {
            return Err(SignerError::IncompleteTransaction("gas"));
        }
        self.signed.lock().unwrap().push(transaction.clone());
        Ok(SignedTransaction::new(key.as_bytes().to_vec()))
    }
}

/// Decoder reporting the function id and the number of logs it saw
pub struct MockDecoder;

impl EventDecoder for MockDecoder {
    fn decode(
        &self,
        receipt: &Receipt,
        function_id: FunctionId,
    ) -> Result<BuiltinEvent, EventDecodeError> {
        if receipt.logs.is_empty() {
            return Err(EventDecodeError::NoMatchingLog(function_id));
        }
        Ok(BuiltinEvent::success(Some(json!({
            "function": function_id.0,
            "logs": receipt.logs.len(),
        }))))
    }
}

pub fn key(byte: u8) -> PrivateKey {
    PrivateKey::from_bytes([byte; 32])
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub signer: Arc<MockSigner>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            transport: Arc::new(MockTransport::new()),
            signer: Arc::new(MockSigner::default()),
        }
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::new(
            self.transport.clone(),
            self.signer.clone(),
            Arc::new(MockDecoder),
        )
    }
}
