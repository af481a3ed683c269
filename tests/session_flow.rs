//! End-to-end session behaviour with a scripted ledger and paused time.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::sleep;

use payment_kiosk::audio::SilentChime;
use payment_kiosk::device::{ConnectionState, DeviceLink};
use payment_kiosk::lifecycle::Shutdown;
use payment_kiosk::minting::{DisabledMinter, ReceiptMinter};
use payment_kiosk::presentation::ConsolePresenter;
use payment_kiosk::session::{Collaborators, SessionController, SessionHandle, SuccessPhase, View};

mod common;
use common::{
    native_payment, native_rule, session_config, wait_for_display, watcher_settings, CountingChime,
    FailingMinter, MockTransport, RecordingMinter, ScriptedLedger, MERCHANT, PAYER, REQUIRED,
};

const LIMIT: Duration = Duration::from_secs(120);

struct Kiosk {
    handle: SessionHandle,
    shutdown: Shutdown,
}

fn start_kiosk(
    ledger: Arc<ScriptedLedger>,
    minter: Arc<dyn ReceiptMinter>,
    chime: Arc<CountingChime>,
    payment_timeout_secs: u32,
) -> Kiosk {
    let mut config = session_config();
    config.payment_timeout_secs = payment_timeout_secs;

    let controller = SessionController::new(
        &config,
        native_rule(),
        watcher_settings(),
        "ethereum:test".to_string(),
        Collaborators {
            ledger,
            minter,
            chime,
        },
    );
    let shutdown = Shutdown::new();
    let handle = controller.handle();
    tokio::spawn(controller.run(shutdown.subscribe()));
    Kiosk { handle, shutdown }
}

#[tokio::test(start_paused = true)]
async fn test_payment_runs_full_cycle() {
    let ledger = ScriptedLedger::with_head(100);
    let minter = Arc::new(RecordingMinter::default());
    let chime = Arc::new(CountingChime::default());
    let kiosk = start_kiosk(ledger.clone(), minter.clone(), chime.clone(), 60);
    let mut display = kiosk.handle.subscribe();

    kiosk.handle.start_payment();
    wait_for_display(&mut display, LIMIT, |s| s.view == View::Payment).await;

    sleep(Duration::from_secs(4)).await;
    ledger.put(102, vec![native_payment(1, 10), native_payment(2, REQUIRED)]);
    ledger.set_head(Some(102));

    let state = wait_for_display(&mut display, LIMIT, |s| s.view == View::Success).await;
    assert_eq!(state.success_phase, SuccessPhase::Timer);
    assert_eq!(state.tx_hash, Some(alloy::primitives::B256::with_last_byte(2)));
    assert_eq!(state.success_time_left_secs, 10);

    sleep(Duration::from_millis(10)).await;
    assert_eq!(minter.calls(), vec![(MERCHANT, PAYER)]);
    assert_eq!(chime.plays(), 1);

    let state = wait_for_display(&mut display, LIMIT, |s| s.success_phase == SuccessPhase::Message).await;
    assert_eq!(state.view, View::Success);
    assert_eq!(state.success_time_left_secs, 0);

    let state = wait_for_display(&mut display, LIMIT, |s| s.view == View::Landing).await;
    assert_eq!(state.tx_hash, None);
    assert_eq!(state.success_phase, SuccessPhase::Timer);

    // Only one confirmation for the activation.
    assert_eq!(minter.calls().len(), 1);
    assert_eq!(chime.plays(), 1);

    kiosk.shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_payment_timeout_returns_to_landing() {
    let ledger = ScriptedLedger::with_head(100);
    let chime = Arc::new(CountingChime::default());
    let kiosk = start_kiosk(ledger, Arc::new(DisabledMinter), chime.clone(), 5);
    let mut display = kiosk.handle.subscribe();

    kiosk.handle.start_payment();
    wait_for_display(&mut display, LIMIT, |s| s.view == View::Payment).await;

    sleep(Duration::from_millis(4500)).await;
    let state = kiosk.handle.snapshot();
    assert_eq!(state.view, View::Payment);
    assert_eq!(state.time_left_secs, 1);

    sleep(Duration::from_secs(1)).await;
    let state = kiosk.handle.snapshot();
    assert_eq!(state.view, View::Landing);
    assert_eq!(state.tx_hash, None);
    assert_eq!(state.time_left_secs, 5);

    // Nothing fires after the reset.
    sleep(Duration::from_secs(30)).await;
    assert_eq!(kiosk.handle.snapshot().view, View::Landing);
    assert_eq!(chime.plays(), 0);

    kiosk.shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_payment_before_session_is_ignored() {
    let ledger = ScriptedLedger::with_head(100);
    ledger.put(98, vec![native_payment(9, REQUIRED)]);
    let kiosk = start_kiosk(ledger, Arc::new(DisabledMinter), Arc::new(CountingChime::default()), 60);

    kiosk.handle.start_payment();
    sleep(Duration::from_secs(20)).await;
    assert_eq!(kiosk.handle.snapshot().view, View::Payment);

    kiosk.shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_cancel_stops_polling() {
    let ledger = ScriptedLedger::with_head(100);
    let kiosk = start_kiosk(ledger.clone(), Arc::new(DisabledMinter), Arc::new(CountingChime::default()), 60);
    let mut display = kiosk.handle.subscribe();

    kiosk.handle.start_payment();
    sleep(Duration::from_secs(10)).await;
    assert!(ledger.head_calls() >= 4);

    kiosk.handle.cancel();
    wait_for_display(&mut display, LIMIT, |s| s.view == View::Landing).await;
    let calls = ledger.head_calls();

    sleep(Duration::from_secs(30)).await;
    assert_eq!(ledger.head_calls(), calls);

    // A payment after the cancel is not picked up.
    ledger.put(101, vec![native_payment(1, REQUIRED)]);
    ledger.set_head(Some(101));
    sleep(Duration::from_secs(10)).await;
    assert_eq!(kiosk.handle.snapshot().view, View::Landing);

    kiosk.shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_seed_failure_watches_from_first_head() {
    let ledger = Arc::new(ScriptedLedger::default());
    let kiosk = start_kiosk(ledger.clone(), Arc::new(DisabledMinter), Arc::new(CountingChime::default()), 60);
    let mut display = kiosk.handle.subscribe();

    kiosk.handle.start_payment();
    let state = wait_for_display(&mut display, LIMIT, |s| {
        s.view == View::Payment && s.status.contains("unavailable")
    })
    .await;
    assert_eq!(state.view, View::Payment);

    sleep(Duration::from_secs(5)).await;
    assert!(kiosk.handle.snapshot().status.contains("unavailable"));
    ledger.set_head(Some(200));
    let state = wait_for_display(&mut display, LIMIT, |s| s.status == "Waiting for payment").await;
    assert_eq!(state.view, View::Payment);
    sleep(Duration::from_secs(10)).await;
    assert_eq!(kiosk.handle.snapshot().view, View::Payment);

    ledger.put(201, vec![native_payment(3, REQUIRED)]);
    ledger.set_head(Some(201));
    wait_for_display(&mut display, LIMIT, |s| s.view == View::Success).await;

    kiosk.shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_failed_side_effects_keep_success() {
    let ledger = ScriptedLedger::with_head(100);
    ledger.put(100, vec![native_payment(1, REQUIRED)]);
    let kiosk = start_kiosk(ledger, Arc::new(FailingMinter), Arc::new(CountingChime::default()), 60);
    let mut display = kiosk.handle.subscribe();

    kiosk.handle.start_payment();
    let state = wait_for_display(&mut display, LIMIT, |s| s.view == View::Success).await;
    assert_eq!(state.device_state, ConnectionState::Disconnected);

    sleep(Duration::from_millis(2500)).await;
    let state = kiosk.handle.snapshot();
    assert_eq!(state.view, View::Success);
    assert_eq!(state.success_time_left_secs, 8);

    kiosk.handle.cancel();
    wait_for_display(&mut display, LIMIT, |s| s.view == View::Landing).await;

    kiosk.shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_button_and_relay_through_device_link() {
    let ledger = ScriptedLedger::with_head(100);
    let transport = MockTransport::new();
    let mut board = transport.plug(true);

    let mut controller = SessionController::new(
        &session_config(),
        native_rule(),
        watcher_settings(),
        "ethereum:test".to_string(),
        Collaborators {
            ledger: ledger.clone(),
            minter: Arc::new(DisabledMinter),
            chime: Arc::new(SilentChime),
        },
    );
    let shutdown = Shutdown::new();
    let (link, device) = DeviceLink::new(transport, common::device_config(), controller.event_sender());
    controller.attach_device(device);
    let handle = controller.handle();
    tokio::spawn(link.run(shutdown.subscribe()));
    tokio::spawn(controller.run(shutdown.subscribe()));
    let mut display = handle.subscribe();

    wait_for_display(&mut display, LIMIT, |s| s.device_state == ConnectionState::Connected).await;

    board.write_all(b"BUTTON_4_PRESSED\nRELAY_ON_OK\n").await.unwrap();
    let state = wait_for_display(&mut display, LIMIT, |s| {
        s.view == View::Payment && s.relay_active
    })
    .await;
    assert_eq!(state.time_left_secs, 60);

    sleep(Duration::from_millis(3500)).await;
    board.write_all(b"BUTTON_4_PRESSED\nRELAY_AUTO_OFF\n").await.unwrap();
    let state = wait_for_display(&mut display, LIMIT, |s| !s.relay_active).await;
    assert_eq!(state.view, View::Payment);
    // The second press did not restart the countdown.
    assert!(state.time_left_secs < 60);

    ledger.put(101, vec![native_payment(5, REQUIRED)]);
    ledger.set_head(Some(101));
    wait_for_display(&mut display, LIMIT, |s| s.view == View::Success).await;

    let mut buf = [0u8; 9];
    board.read_exact(&mut buf).await.unwrap();
    assert_eq!(&buf, b"RELAY_ON\n");

    shutdown.trigger();
}

#[tokio::test(start_paused = true)]
async fn test_console_commands_drive_session() {
    let ledger = ScriptedLedger::with_head(100);
    let kiosk = start_kiosk(ledger, Arc::new(DisabledMinter), Arc::new(CountingChime::default()), 60);
    let mut display = kiosk.handle.subscribe();

    let (input, rx) = mpsc::unbounded_channel();
    let presenter = ConsolePresenter::new(kiosk.handle.clone());
    tokio::spawn(presenter.run_with(rx, kiosk.shutdown.subscribe()));

    input.send("pay".to_string()).unwrap();
    wait_for_display(&mut display, LIMIT, |s| s.view == View::Payment).await;

    input.send("bogus".to_string()).unwrap();
    input.send("cancel".to_string()).unwrap();
    wait_for_display(&mut display, LIMIT, |s| s.view == View::Landing).await;

    kiosk.shutdown.trigger();
}
