//! End-to-end tests for the ledger radio
//!
//! Tests the full pipeline: hide -> execute -> ledger history -> scan -> frame

use radio_core::{Account, Address, Asset, Codec, ContentType, Frame, PublicConfig, RadioConfig};
use radio_engine::{EngineError, HistoryScanner, MemoryLedger, Radio};

fn four_account_config() -> RadioConfig {
    RadioConfig {
        accounts: (1..=4)
            .map(|n| Account::new(Address::repeat_byte(n), format!("secret-{n}")))
            .collect(),
        tokens: vec![Address::repeat_byte(0xA0), Address::repeat_byte(0xA1)],
        fractions: 256,
        max_spacing: 4,
        min_gas: 1_000,
        channel: "e2e-channel".into(),
        rpc_url: "http://localhost:8545".into(),
    }
}

async fn funded(config: &RadioConfig, gas: u128, tokens: u128) -> MemoryLedger {
    let ledger = MemoryLedger::with_fee(1);
    for account in &config.accounts {
        ledger.fund(account.address, Asset::Native, gas).await;
        for token in &config.tokens {
            ledger.fund(account.address, Asset::Token(*token), tokens).await;
        }
    }
    ledger
}

/// Test that a message survives the round trip through a simulated ledger
#[tokio::test]
async fn test_roundtrip_e2e() {
    let config = four_account_config();
    let ledger = funded(&config, 1_000_000, 10_000).await;
    let radio = Radio::new(config, ledger).unwrap().with_seed(11);

    let message = "the quick brown fox jumps over the lazy dog".as_bytes();
    let txs = radio.send(message, ContentType::Text).await.unwrap();
    assert!(txs.len() > message.len());

    let frames = radio.transaction_history(None, None, None).await.unwrap();
    assert_eq!(frames, vec![Frame::new(ContentType::Text, message.to_vec())]);
    assert_eq!(frames[0].content().to_string(), "the quick brown fox jumps over the lazy dog");
}

/// Test that unrelated traffic before the message does not hide it
#[tokio::test]
async fn test_noisy_stream_e2e() {
    let config = four_account_config();
    let ledger = funded(&config, 1_000_000, 10_000).await;
    let accounts = config.addresses();

    let noise = [(0, 1, 17u128), (2, 3, 130), (3, 0, 256)];
    for (i, (from, to, value)) in noise.into_iter().enumerate() {
        ledger
            .foreign_transfer(accounts[from], accounts[to], config.tokens[i % 2], value)
            .await;
    }

    let radio = Radio::new(config, ledger).unwrap().with_seed(22);
    radio.send(b"hi", ContentType::RedisCmd).await.unwrap();

    let frames = radio.transaction_history(None, None, None).await.unwrap();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].type_tag, 1);
    assert_eq!(frames[0].payload, b"hi");
}

/// Test that only the requested type comes back, in ledger order
#[tokio::test]
async fn test_mixed_types_e2e() {
    let config = four_account_config();
    let ledger = funded(&config, 1_000_000, 10_000).await;
    let radio = Radio::new(config, ledger).unwrap().with_seed(33);

    radio.send(b"SET k v", ContentType::RedisCmd).await.unwrap();
    radio.send(b"note one", ContentType::Text).await.unwrap();
    radio.send(&[0xDE, 0xAD], ContentType::Raw).await.unwrap();
    radio.send(b"note two", ContentType::Text).await.unwrap();

    let texts = radio
        .transaction_history(None, Some(ContentType::Text), None)
        .await
        .unwrap();
    let texts: Vec<_> = texts.iter().map(|f| f.content().to_string()).collect();
    assert_eq!(texts, vec!["note one", "note two"]);

    let first = radio.transaction_history(None, None, Some(1)).await.unwrap();
    assert_eq!(first[0].content().to_string(), "SET k v");
}

/// Test that a reader holding only the public key decodes the channel
#[tokio::test]
async fn test_public_key_reader_e2e() {
    let config = four_account_config();
    let ledger = funded(&config, 1_000_000, 10_000).await;
    let sender = Radio::new(config, ledger).unwrap().with_seed(44);
    sender.send(b"for your eyes", ContentType::Text).await.unwrap();

    let key = sender.public_key().unwrap();
    let public: PublicConfig = serde_json::from_slice(&key).unwrap();
    let reader_config = RadioConfig::from(public);
    assert!(reader_config.accounts.iter().all(|a| a.secret.is_none()));
    assert_eq!(reader_config.id(), sender.id());

    let codec = Codec::new(&reader_config).unwrap();
    let events = sender.ledger().events().await;
    let frames = HistoryScanner::new(&codec).scan(&events, 0, None, None);
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].payload, b"for your eyes");
}

/// Test that accounts starting without gas are funded along the way
#[tokio::test]
async fn test_self_funding_e2e() {
    let config = four_account_config();
    let ledger = MemoryLedger::with_fee(1);
    // only the first account holds gas; everyone holds tokens
    ledger.fund(config.accounts[0].address, Asset::Native, 10_000_000).await;
    for account in &config.accounts {
        for token in &config.tokens {
            ledger.fund(account.address, Asset::Token(*token), 10_000).await;
        }
    }

    let radio = Radio::new(config, ledger).unwrap().with_seed(55);
    let txs = radio.send(b"bootstrap", ContentType::Text).await.unwrap();

    let broadcasts = radio.ledger().broadcasts().await;
    assert_eq!(broadcasts.len(), txs.len());
    assert!(broadcasts.iter().any(|b| b.asset == Asset::Native));

    let frames = radio.transaction_history(None, None, None).await.unwrap();
    assert_eq!(frames[0].payload, b"bootstrap");
}

/// Test that an oversize message fails before any broadcast
#[tokio::test]
async fn test_oversize_rejected_e2e() {
    let config = four_account_config();
    let ledger = funded(&config, 1_000_000, 10_000).await;
    let radio = Radio::new(config, ledger).unwrap().with_seed(66);

    assert!(radio.hide(&[1u8; 251], ContentType::Raw).is_ok());
    let err = radio.send(&[1u8; 252], ContentType::Raw).await.unwrap_err();
    assert!(matches!(err, EngineError::Core(radio_core::Error::FrameTooLarge { .. })));
    assert!(radio.ledger().broadcasts().await.is_empty());
}

/// Test that degenerate pools are refused before any ledger interaction
#[test]
fn test_degenerate_config_e2e() {
    let mut single = four_account_config();
    single.accounts.truncate(1);
    assert!(matches!(
        Radio::new(single, MemoryLedger::new()),
        Err(EngineError::Core(radio_core::Error::DegenerateSpace(_)))
    ));

    let mut flat = four_account_config();
    flat.fractions = 1;
    assert!(matches!(
        Radio::new(flat, MemoryLedger::new()),
        Err(EngineError::Core(radio_core::Error::DegenerateSpace(_)))
    ));
}

/// Test that one account holding all gas and tokens can carry every message
#[tokio::test]
async fn test_single_holder_e2e() {
    let config = four_account_config();
    for seed in 0..20 {
        let ledger = MemoryLedger::with_fee(1);
        let holder = config.accounts[0].address;
        ledger.fund(holder, Asset::Native, 10_000_000).await;
        for token in &config.tokens {
            ledger.fund(holder, Asset::Token(*token), 100_000).await;
        }

        let radio = Radio::new(config.clone(), ledger).unwrap().with_seed(seed);
        radio
            .send(b"hello", ContentType::Text)
            .await
            .unwrap_or_else(|err| panic!("seed {seed}: {err}"));

        let frames = radio.transaction_history(None, None, None).await.unwrap();
        assert_eq!(frames.len(), 1, "seed {seed}");
        assert_eq!(frames[0].payload, b"hello", "seed {seed}");
    }
}
