//! End-to-end wire vectors covering the four transaction layouts.
//!
//! The vectors are assembled byte-by-byte here, independently of the crate's
//! encoders, so the round-trip assertions exercise real wire input rather
//! than whatever the encoder happens to emit.

use serde_json::json;
use sha2::{Digest, Sha256};

use zcash_wire::rpc::block::{BlockPorcelainMode, TxList};
use zcash_wire::{Block, Hash256, ParseError, Transaction, HEADER_BYTES};

/// Independent SHA256d, straight from the `sha2` crate.
fn sha256d(data: &[u8]) -> [u8; 32] {
    let first = Sha256::digest(data);
    let second = Sha256::digest(first);
    second.into()
}

/// Independent doubled-last-node Merkle fold.
fn merkle(leaves: &[[u8; 32]]) -> [u8; 32] {
    let mut layer = leaves.to_vec();
    while layer.len() > 1 {
        let mut next = Vec::new();
        for pair in layer.chunks(2) {
            let mut buf = Vec::with_capacity(64);
            buf.extend_from_slice(&pair[0]);
            buf.extend_from_slice(pair.get(1).unwrap_or(&pair[0]));
            next.push(sha256d(&buf));
        }
        layer = next;
    }
    layer[0]
}

fn compact(n: usize) -> Vec<u8> {
    match n {
        n if n < 253 => vec![n as u8],
        n if n <= 0xFFFF => {
            let mut out = vec![0xFD];
            out.extend_from_slice(&(n as u16).to_le_bytes());
            out
        }
        n => {
            let mut out = vec![0xFE];
            out.extend_from_slice(&(n as u32).to_le_bytes());
            out
        }
    }
}

fn p2pkh(hash_byte: u8) -> Vec<u8> {
    let mut script = vec![0x76, 0xa9, 0x14];
    script.extend_from_slice(&[hash_byte; 20]);
    script.extend_from_slice(&[0x88, 0xac]);
    script
}

fn standard_vin(prev_byte: u8) -> Vec<u8> {
    let mut vin = Vec::new();
    vin.extend_from_slice(&[prev_byte; 32]);
    vin.extend_from_slice(&0u32.to_le_bytes());
    vin.extend_from_slice(&compact(1));
    vin.push(0x51);
    vin.extend_from_slice(&0xFFFF_FFFEu32.to_le_bytes());
    vin
}

fn single_vout(value: i64, script: &[u8]) -> Vec<u8> {
    let mut vout = Vec::new();
    vout.extend_from_slice(&compact(1));
    vout.extend_from_slice(&value.to_le_bytes());
    vout.extend_from_slice(&compact(script.len()));
    vout.extend_from_slice(script);
    vout
}

/// Legacy v1 coinbase: null prevout, one P2PKH output.
fn tx_v1_coinbase() -> Vec<u8> {
    let mut tx = Vec::new();
    tx.extend_from_slice(&1u32.to_le_bytes());
    tx.extend_from_slice(&compact(1));
    tx.extend_from_slice(&[0u8; 32]);
    tx.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    tx.extend_from_slice(&compact(4));
    tx.extend_from_slice(&[0x04, 0xFF, 0x00, 0x1D]);
    tx.extend_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    tx.extend_from_slice(&single_vout(1_250_000_000, &p2pkh(0xAB)));
    tx.extend_from_slice(&0u32.to_le_bytes());
    tx
}

/// Legacy v2 with one joinsplit carrying a 296-byte PHGR proof.
fn tx_v2_joinsplit() -> Vec<u8> {
    let mut tx = Vec::new();
    tx.extend_from_slice(&2u32.to_le_bytes());
    tx.extend_from_slice(&compact(1));
    tx.extend_from_slice(&standard_vin(0x11));
    tx.extend_from_slice(&single_vout(99_000_000, &p2pkh(0x12)));
    tx.extend_from_slice(&0u32.to_le_bytes()); // locktime

    tx.extend_from_slice(&compact(1)); // nJoinSplit
    tx.extend_from_slice(&0i64.to_le_bytes()); // vpub_old
    tx.extend_from_slice(&100_000_000i64.to_le_bytes()); // vpub_new
    tx.extend_from_slice(&[0x22; 32]); // anchor
    tx.extend_from_slice(&[0x33; 32]); // nullifiers
    tx.extend_from_slice(&[0x34; 32]);
    tx.extend_from_slice(&[0x35; 32]); // commitments
    tx.extend_from_slice(&[0x36; 32]);
    tx.extend_from_slice(&[0x37; 32]); // onetimePubKey
    tx.extend_from_slice(&[0x38; 32]); // randomSeed
    tx.extend_from_slice(&[0x39; 32]); // macs
    tx.extend_from_slice(&[0x3A; 32]);
    tx.extend_from_slice(&[0x3B; 296]); // PHGR13 proof
    tx.extend_from_slice(&[0x3C; 601]); // ciphertexts
    tx.extend_from_slice(&[0x3D; 601]);
    tx.extend_from_slice(&[0x3E; 32]); // joinSplitPubKey
    tx.extend_from_slice(&[0x3F; 64]); // joinSplitSig
    tx
}

/// Overwinter v3: expiry height, empty joinsplit vector.
fn tx_v3() -> Vec<u8> {
    let mut tx = Vec::new();
    tx.extend_from_slice(&(3u32 | 1 << 31).to_le_bytes());
    tx.extend_from_slice(&0x03C4_8270u32.to_le_bytes());
    tx.extend_from_slice(&compact(1));
    tx.extend_from_slice(&standard_vin(0x21));
    tx.extend_from_slice(&single_vout(42, &p2pkh(0x23)));
    tx.extend_from_slice(&7u32.to_le_bytes()); // locktime
    tx.extend_from_slice(&500_000u32.to_le_bytes()); // expiry
    tx.extend_from_slice(&compact(0)); // nJoinSplit
    tx
}

/// Sapling v4 with empty shielded vectors: no bindingSig on the wire.
fn tx_v4_empty() -> Vec<u8> {
    let mut tx = Vec::new();
    tx.extend_from_slice(&(4u32 | 1 << 31).to_le_bytes());
    tx.extend_from_slice(&0x892F_2085u32.to_le_bytes());
    tx.extend_from_slice(&compact(1));
    tx.extend_from_slice(&standard_vin(0x31));
    tx.extend_from_slice(&single_vout(7_000_000, &p2pkh(0x32)));
    tx.extend_from_slice(&0u32.to_le_bytes()); // locktime
    tx.extend_from_slice(&600_000u32.to_le_bytes()); // expiry
    tx.extend_from_slice(&0i64.to_le_bytes()); // valueBalance
    tx.extend_from_slice(&compact(0)); // nShieldedSpend
    tx.extend_from_slice(&compact(0)); // nShieldedOutput
    tx.extend_from_slice(&compact(0)); // nJoinSplit
    tx
}

/// Sapling v4 with one spend and one output: bindingSig present.
fn tx_v4_shielded() -> Vec<u8> {
    let mut tx = Vec::new();
    tx.extend_from_slice(&(4u32 | 1 << 31).to_le_bytes());
    tx.extend_from_slice(&0x892F_2085u32.to_le_bytes());
    tx.extend_from_slice(&compact(1));
    tx.extend_from_slice(&standard_vin(0x41));
    tx.extend_from_slice(&single_vout(1, &p2pkh(0x43)));
    tx.extend_from_slice(&0u32.to_le_bytes()); // locktime
    tx.extend_from_slice(&700_000u32.to_le_bytes()); // expiry
    tx.extend_from_slice(&(-40_000i64).to_le_bytes()); // valueBalance

    let mut spend = Vec::new();
    spend.extend_from_slice(&[0x50; 32]); // cv
    spend.extend_from_slice(&[0x51; 32]); // anchor
    spend.extend_from_slice(&[0x52; 32]); // nullifier
    spend.extend_from_slice(&[0x53; 32]); // rk
    spend.extend_from_slice(&[0x54; 192]); // proof
    spend.extend_from_slice(&[0x55; 64]); // spendAuthSig
    assert_eq!(spend.len(), 384);

    let mut output = Vec::new();
    output.extend_from_slice(&[0x56; 32]); // cv
    output.extend_from_slice(&[0x57; 32]); // cmu
    output.extend_from_slice(&[0x58; 32]); // ephemeralKey
    output.extend_from_slice(&[0x59; 580]); // encCiphertext
    output.extend_from_slice(&[0x5A; 80]); // outCiphertext
    output.extend_from_slice(&[0x5B; 192]); // proof
    assert_eq!(output.len(), 948);

    tx.extend_from_slice(&compact(1));
    tx.extend_from_slice(&spend);
    tx.extend_from_slice(&compact(1));
    tx.extend_from_slice(&output);
    tx.extend_from_slice(&compact(0)); // nJoinSplit
    tx.extend_from_slice(&[0x5C; 64]); // bindingSig
    tx
}

fn header_bytes(prev: [u8; 32], merkle_root: [u8; 32]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&4i32.to_le_bytes());
    header.extend_from_slice(&prev);
    header.extend_from_slice(&merkle_root);
    header.extend_from_slice(&[0u8; 32]); // finalsaplingroot
    header.extend_from_slice(&1_573_737_600u32.to_le_bytes());
    header.extend_from_slice(&0x1F07_FFFFu32.to_le_bytes());
    header.extend_from_slice(&[0x99; 32]); // nonce
    header.extend_from_slice(&compact(1344));
    header.extend_from_slice(&[0x07; 1344]);
    assert_eq!(header.len(), HEADER_BYTES);
    header
}

fn block_bytes(prev: [u8; 32], txs: &[Vec<u8>]) -> Vec<u8> {
    let txids: Vec<[u8; 32]> = txs.iter().map(|tx| sha256d(tx)).collect();
    let mut block = header_bytes(prev, merkle(&txids));
    block.extend_from_slice(&compact(txs.len()));
    for tx in txs {
        block.extend_from_slice(tx);
    }
    block
}

/// One block exercising all five transaction shapes; the odd count also
/// exercises the doubled-last-node Merkle rule.
fn kitchen_sink() -> Vec<u8> {
    block_bytes(
        [0x88; 32],
        &[
            tx_v1_coinbase(),
            tx_v2_joinsplit(),
            tx_v3(),
            tx_v4_empty(),
            tx_v4_shielded(),
        ],
    )
}

fn genesis_like() -> Vec<u8> {
    block_bytes([0u8; 32], &[tx_v1_coinbase()])
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

#[test]
fn byte_exact_round_trip() {
    for bytes in [kitchen_sink(), genesis_like()] {
        let block = Block::decode(&bytes, true).unwrap();
        assert_eq!(block.encode(), bytes);
        assert_eq!(block.size(), Some(bytes.len()));
    }
}

#[test]
fn block_hash_covers_the_header_span() {
    let bytes = kitchen_sink();
    let block = Block::decode(&bytes, true).unwrap();
    assert_eq!(block.hash(), Hash256::from(sha256d(&bytes[..HEADER_BYTES])));
}

#[test]
fn txids_cover_contiguous_spans() {
    let bytes = kitchen_sink();
    let block = Block::decode(&bytes, true).unwrap();
    assert_eq!(block.tx().len(), 5);
    for tx in block.tx() {
        assert_eq!(tx.txid(), Hash256::from(sha256d(tx.raw_bytes())));
        assert!(contains_subslice(&bytes, tx.raw_bytes()));
        assert_eq!(tx.encode(), tx.raw_bytes());
    }
}

#[test]
fn merkle_root_matches_header_commitment() {
    let bytes = kitchen_sink();
    let block = Block::decode(&bytes, true).unwrap();
    assert_eq!(
        block.calculate_merkle_root().unwrap(),
        block.header().merkle_root
    );
}

#[test]
fn header_only_round_trip() {
    let bytes = kitchen_sink();
    let block = Block::decode_header_only(&bytes[..HEADER_BYTES], true).unwrap();
    assert_eq!(block.encode(), &bytes[..HEADER_BYTES]);
    assert_eq!(block.size(), None);
    // The full block has trailing transaction bytes after the header.
    assert!(matches!(
        Block::decode_header_only(&bytes, true),
        Err(ParseError::TrailingData { .. })
    ));
}

#[test]
fn strict_mode_rejects_trailing_bytes() {
    let mut bytes = kitchen_sink();
    bytes.push(0x00);
    assert!(matches!(
        Block::decode(&bytes, true),
        Err(ParseError::TrailingData { .. })
    ));
    assert!(Block::decode(&bytes, false).is_ok());
}

#[test]
fn porcelain_round_trip_reencodes_identically() {
    for bytes in [kitchen_sink(), genesis_like()] {
        let block = Block::decode(&bytes, true).unwrap();
        let rebuilt = Block::from_porcelain(&block.to_porcelain(BlockPorcelainMode::Full)).unwrap();
        assert_eq!(rebuilt.encode(), bytes);
        assert_eq!(rebuilt.hash(), block.hash());
    }
}

#[test]
fn porcelain_survives_json_serialization() {
    let block = Block::decode(&kitchen_sink(), true).unwrap();
    let porcelain = block.to_porcelain(BlockPorcelainMode::Full);
    let text = serde_json::to_string(&porcelain).unwrap();
    let reparsed = serde_json::from_str(&text).unwrap();
    assert_eq!(porcelain, reparsed);
    assert_eq!(
        Block::from_porcelain(&reparsed).unwrap().encode(),
        kitchen_sink()
    );
}

#[test]
fn min_mode_lists_reversed_txids() {
    let block = Block::decode(&kitchen_sink(), true).unwrap();
    let porcelain = block.to_porcelain(BlockPorcelainMode::TxIds);
    let Some(TxList::Ids(ids)) = porcelain.tx else {
        panic!("expected txid list");
    };
    let expected: Vec<String> = block.tx().iter().map(|tx| tx.txid().to_string()).collect();
    assert_eq!(ids, expected);
    for (id, tx) in ids.iter().zip(block.tx()) {
        let mut display = sha256d(tx.raw_bytes());
        display.reverse();
        assert_eq!(id, &hex::encode(display));
    }
}

#[test]
fn genesis_porcelain_has_no_previousblockhash() {
    let block = Block::decode(&genesis_like(), true).unwrap();
    let value = serde_json::to_value(block.to_porcelain(BlockPorcelainMode::Full)).unwrap();
    assert!(!value.as_object().unwrap().contains_key("previousblockhash"));
    assert!((block.header().difficulty() - 1.0).abs() < 1e-9);
}

#[test]
fn coinbase_vin_renders_coinbase_and_sequence_only() {
    let block = Block::decode(&genesis_like(), true).unwrap();
    assert!(block.tx()[0].is_coinbase());
    let porcelain = block.tx()[0].to_porcelain();
    let vin = serde_json::to_value(&porcelain.vin[0]).unwrap();
    assert_eq!(
        vin,
        json!({ "coinbase": "04ff001d", "sequence": 4294967295u32 })
    );
}

#[test]
fn transaction_shapes_expose_their_sections() {
    let block = Block::decode(&kitchen_sink(), true).unwrap();
    let [v1, v2, v3, v4_empty, v4_shielded] = block.tx() else {
        panic!("expected five transactions");
    };

    assert!(!v1.version().is_overwintered());
    assert!(v1.data().joinsplits.is_empty());

    assert_eq!(v2.version().number(), 2);
    assert_eq!(v2.data().joinsplits.len(), 1);
    assert_eq!(v2.data().joinsplits[0].proof.as_bytes().len(), 296);
    assert!(v2.data().joinsplit_pubkey.is_some());
    assert!(v2.data().binding_sig.is_none());

    assert_eq!(v3.version().number(), 3);
    assert_eq!(v3.data().expiry_height, 500_000);
    assert!(v3.data().joinsplits.is_empty());
    assert!(v3.data().joinsplit_pubkey.is_none());

    assert_eq!(v4_empty.data().value_balance.map(i64::from), Some(0));
    assert!(v4_empty.data().binding_sig.is_none());

    assert_eq!(
        v4_shielded.data().value_balance.map(i64::from),
        Some(-40_000)
    );
    assert_eq!(v4_shielded.data().shielded_spends.len(), 1);
    assert_eq!(v4_shielded.data().shielded_outputs.len(), 1);
    assert!(v4_shielded.data().binding_sig.is_some());
}

#[test]
fn v4_empty_porcelain_omits_binding_sig() {
    let block = Block::decode(&kitchen_sink(), true).unwrap();
    let value = serde_json::to_value(block.tx()[3].to_porcelain()).unwrap();
    let object = value.as_object().unwrap();
    assert!(!object.contains_key("bindingSig"));
    assert_eq!(object["valueBalanceZat"], json!(0));
    assert_eq!(object["valueBalance"], json!(0.0));
    assert_eq!(object["vShieldedSpend"], json!([]));
    assert_eq!(object["vShieldedOutput"], json!([]));
    assert_eq!(object["versiongroupid"], json!("892f2085"));
}

#[test]
fn v2_porcelain_carries_joinsplit_signature_material() {
    let block = Block::decode(&kitchen_sink(), true).unwrap();
    let value = serde_json::to_value(block.tx()[1].to_porcelain()).unwrap();
    let object = value.as_object().unwrap();
    assert!(object.contains_key("joinSplitPubKey"));
    assert_eq!(object["joinSplitSig"], json!(hex::encode([0x3Fu8; 64])));
    assert!(!object.contains_key("versiongroupid"));
    let joinsplit = &object["vjoinsplit"][0];
    assert_eq!(joinsplit["vpub_new"], json!(1.0));
    assert_eq!(joinsplit["vpub_newZat"], json!(100_000_000));
    assert_eq!(joinsplit["nullifiers"], json!([hex::encode([0x33u8; 32]), hex::encode([0x34u8; 32])]));
}

#[test]
fn unknown_overwintered_shape_fails_block_decode() {
    let mut bytes = kitchen_sink();
    // Corrupt the v3 transaction's version group id.
    let v3 = tx_v3();
    let offset = bytes
        .windows(v3.len())
        .position(|window| window == v3.as_slice())
        .unwrap();
    bytes[offset + 4] ^= 0xFF;
    assert!(matches!(
        Block::decode(&bytes, true),
        Err(ParseError::UnknownTxShape { .. })
    ));
}

#[test]
fn truncated_block_fails() {
    let bytes = kitchen_sink();
    assert!(Block::decode(&bytes[..bytes.len() - 10], false).is_err());
    assert!(Block::decode(&bytes[..HEADER_BYTES - 10], false).is_err());
}

#[test]
fn standalone_transaction_round_trip() {
    for tx_bytes in [
        tx_v1_coinbase(),
        tx_v2_joinsplit(),
        tx_v3(),
        tx_v4_empty(),
        tx_v4_shielded(),
    ] {
        let tx = Transaction::decode(&tx_bytes, true).unwrap();
        assert_eq!(tx.encode(), tx_bytes);
        assert_eq!(tx.txid(), Hash256::from(sha256d(&tx_bytes)));
        let rebuilt = Transaction::from_porcelain(&tx.to_porcelain()).unwrap();
        assert_eq!(rebuilt, tx);
    }
}
