//! Shared fakes for the integration tests.

#![allow(dead_code)]

use alloy::primitives::{address, Address, Bytes, B256, U256};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::DuplexStream;
use tokio::sync::watch;

use payment_kiosk::audio::SuccessSound;
use payment_kiosk::blockchain::{LedgerBlock, LedgerError, LedgerReader, LedgerResult, LedgerTransaction};
use payment_kiosk::config::{DeviceConfig, SessionConfig, UsbFilter};
use payment_kiosk::device::{DeviceError, DevicePort, PortIo, SerialTransport};
use payment_kiosk::minting::{MintError, ReceiptMinter};
use payment_kiosk::session::DisplayState;
use payment_kiosk::watcher::{MatchRule, WatcherSettings};

pub const MERCHANT: Address = address!("35321cc55704948ee8c79f3c03cd0fcb055a3ac0");
pub const PAYER: Address = address!("f39fd6e51aad88f6f4ce6ab8827279cfffb92266");
pub const REQUIRED: u64 = 1_000_000_000_000_000;

/// Ledger whose head and blocks are set by the test.
#[derive(Default)]
pub struct ScriptedLedger {
    head: Mutex<Option<u64>>,
    blocks: Mutex<HashMap<u64, Vec<LedgerTransaction>>>,
    head_calls: AtomicUsize,
}

impl ScriptedLedger {
    pub fn with_head(head: u64) -> Arc<Self> {
        let ledger = Self::default();
        ledger.set_head(Some(head));
        Arc::new(ledger)
    }

    /// `None` makes every head query fail.
    pub fn set_head(&self, head: Option<u64>) {
        *self.head.lock().unwrap() = head;
    }

    pub fn put(&self, height: u64, txs: Vec<LedgerTransaction>) {
        self.blocks.lock().unwrap().insert(height, txs);
    }

    pub fn head_calls(&self) -> usize {
        self.head_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerReader for ScriptedLedger {
    async fn current_height(&self) -> LedgerResult<u64> {
        self.head_calls.fetch_add(1, Ordering::SeqCst);
        let head = *self.head.lock().unwrap();
        head.ok_or_else(|| LedgerError::Rpc("connection refused".to_string()))
    }

    async fn block_with_transactions(&self, height: u64) -> LedgerResult<LedgerBlock> {
        let transactions = self
            .blocks
            .lock()
            .unwrap()
            .get(&height)
            .cloned()
            .unwrap_or_default();
        Ok(LedgerBlock {
            number: height,
            transactions,
        })
    }
}

pub fn native_payment(tag: u8, value: u64) -> LedgerTransaction {
    LedgerTransaction {
        hash: B256::with_last_byte(tag),
        from: PAYER,
        to: Some(MERCHANT),
        value: U256::from(value),
        input: Bytes::new(),
    }
}

pub fn native_rule() -> MatchRule {
    MatchRule::Native {
        merchant: MERCHANT,
        required: U256::from(REQUIRED),
        strict: true,
    }
}

pub fn watcher_settings() -> WatcherSettings {
    WatcherSettings {
        poll_interval: Duration::from_secs(3),
        lookback_blocks: 10,
        backoff_base: Duration::from_secs(1),
        backoff_max: Duration::from_secs(30),
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        payment_timeout_secs: 60,
        success_countdown_secs: 10,
        message_duration_secs: 5,
    }
}

pub fn device_config() -> DeviceConfig {
    DeviceConfig::default()
}

/// Serial transport backed by in-memory duplex pipes.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    pending: VecDeque<DuplexStream>,
    authorized: bool,
    list_calls: usize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a device and return the board's end of its port.
    pub fn plug(&self, authorized: bool) -> DuplexStream {
        let (ours, board) = tokio::io::duplex(256);
        let mut state = self.state.lock().unwrap();
        state.pending.push_back(ours);
        state.authorized = state.authorized || authorized;
        board
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    fn port() -> DevicePort {
        DevicePort {
            path: "/dev/ttyACM0".to_string(),
            vendor_id: 0x2341,
            product_id: 0x0043,
            product: Some("Arduino Uno".to_string()),
        }
    }
}

#[async_trait]
impl SerialTransport for MockTransport {
    async fn list_authorized_devices(
        &self,
        _filters: &[UsbFilter],
    ) -> Result<Vec<DevicePort>, DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.authorized && !state.pending.is_empty() {
            Ok(vec![Self::port()])
        } else {
            Ok(Vec::new())
        }
    }

    async fn request_device_authorization(
        &self,
        _filters: &[UsbFilter],
    ) -> Result<DevicePort, DeviceError> {
        let mut state = self.state.lock().unwrap();
        if state.pending.is_empty() {
            return Err(DeviceError::PermissionRequired);
        }
        state.authorized = true;
        Ok(Self::port())
    }

    async fn open(&self, _port: &DevicePort, _baud_rate: u32) -> Result<PortIo, DeviceError> {
        let stream = self
            .state
            .lock()
            .unwrap()
            .pending
            .pop_front()
            .ok_or_else(|| DeviceError::Connection("device unplugged".to_string()))?;
        Ok(PortIo::new(stream))
    }
}

/// Minter that records its calls.
#[derive(Default)]
pub struct RecordingMinter {
    calls: Mutex<Vec<(Address, Address)>>,
}

impl RecordingMinter {
    pub fn calls(&self) -> Vec<(Address, Address)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReceiptMinter for RecordingMinter {
    async fn mint_receipt(&self, merchant: Address, payer: Address) -> Result<alloy::primitives::TxHash, MintError> {
        self.calls.lock().unwrap().push((merchant, payer));
        Ok(B256::repeat_byte(0x77))
    }
}

/// Minter that always fails.
pub struct FailingMinter;

#[async_trait]
impl ReceiptMinter for FailingMinter {
    async fn mint_receipt(&self, _merchant: Address, _payer: Address) -> Result<alloy::primitives::TxHash, MintError> {
        Err(MintError::Send("nonce too low".to_string()))
    }
}

/// Chime that counts plays.
#[derive(Default)]
pub struct CountingChime {
    plays: AtomicUsize,
}

impl CountingChime {
    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SuccessSound for CountingChime {
    async fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }
}

/// Wait until the display satisfies `pred`, failing after `limit` of
/// (paused) time.
pub async fn wait_for_display<F>(
    display: &mut watch::Receiver<DisplayState>,
    limit: Duration,
    pred: F,
) -> DisplayState
where
    F: FnMut(&DisplayState) -> bool,
{
    tokio::time::timeout(limit, display.wait_for(pred))
        .await
        .expect("display condition not reached in time")
        .expect("session controller stopped")
        .clone()
}
