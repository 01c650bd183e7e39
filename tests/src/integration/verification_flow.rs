//! # Classic Verification Flow
//!
//! Headers come from the local chain; only Merkle branches travel over the
//! network.
//!
//! 1. **Block 170** - the first Bitcoin transfer verifies against its real root
//! 2. **Chunk fetch** - a missing header triggers one chunk request, then a proof,
//!    even while another transaction in the same chunk is being proved
//! 3. **Many transactions** - every transaction in a block verifies
//! 4. **Failure ledger** - rejected proofs stay pending with a recorded reason

#[cfg(test)]
mod tests {
    use spv_verifier::{
        header_from_hex, serialize_header, Checkpoint, Hash256, RpcMethod, TxVerificationStatus,
        VerifierConfig, WalletPort,
    };

    use crate::fixtures::*;

    #[test]
    fn test_genesis_header_decodes() {
        let header = header_from_hex(GENESIS_HEADER_HEX, 0).unwrap();
        assert_eq!(
            header.hash.to_display_hex(),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
        assert_eq!(hex::encode(serialize_header(&header)), GENESIS_HEADER_HEX);
    }

    #[test]
    fn test_block_170_transfer_verifies() {
        let wiring = Wiring::connected(200);
        wiring.chain.insert_header(block_170_header());
        let tx_hash = display_hash(BLOCK_170_TX);
        wiring.wallet.add_unverified(tx_hash, 170);

        let mut job = wiring.job(VerifierConfig::for_testing());
        assert_eq!(job.run().requests_issued, 1);

        let sent = wiring.network.take_sent();
        assert_eq!(sent[0].request.params[0], serde_json::json!(BLOCK_170_TX));
        for request in sent {
            assert!(request.respond(block_170_proof_response()));
        }
        job.run();

        assert_eq!(job.status(&tx_hash), TxVerificationStatus::Verified);
        assert_eq!(job.verified_root(&tx_hash), Some(display_hash(BLOCK_170_ROOT)));

        let verified = wiring.wallet.verified(&tx_hash).unwrap();
        assert_eq!(verified.height, 170);
        assert_eq!(verified.pos, 1);
        assert_eq!(verified.timestamp, 1_231_731_025);
    }

    #[test]
    fn test_missing_header_fetches_chunk_then_proves() {
        let wiring = Wiring::connected(100);
        wiring
            .chain
            .set_checkpoints(vec![Checkpoint::new(9, Hash256::default()); 10]);
        let (txs, header) = synthetic_block(57, 1, 5);
        wiring.wallet.add_unverified(txs[3], 57);

        let mut job = wiring.job(VerifierConfig::for_testing());

        job.run();
        job.run();
        assert_eq!(wiring.network.chunk_requests(), vec![5]);
        assert_eq!(job.status(&txs[3]), TxVerificationStatus::HeaderPending);
        assert_eq!(wiring.network.sent_count(), 0);

        // Chunk lands in the chain.
        wiring.chain.insert_header(header);
        job.run();
        assert_eq!(wiring.network.sent_count_for(RpcMethod::GetMerkle), 1);

        wiring.answer_all(|_| proof_response(&txs, 3, 57));
        job.run();
        assert_eq!(job.status(&txs[3]), TxVerificationStatus::Verified);
    }

    #[test]
    fn test_chunk_requested_once_while_neighbour_proves() {
        let wiring = Wiring::connected(100);
        wiring
            .chain
            .set_checkpoints(vec![Checkpoint::new(9, Hash256::default()); 10]);
        let (local_txs, local_header) = synthetic_block(52, 1, 2);
        let (far_txs, far_header) = synthetic_block(57, 10, 2);
        wiring.chain.insert_header(local_header);
        wiring.wallet.add_unverified(local_txs[0], 52);
        wiring.wallet.add_unverified(far_txs[1], 57);

        let mut job = wiring.job(VerifierConfig::for_testing());
        job.run();
        wiring.answer_all(|_| proof_response(&local_txs, 0, 52));
        for _ in 0..4 {
            job.run();
        }

        assert_eq!(job.status(&local_txs[0]), TxVerificationStatus::Verified);
        assert_eq!(job.status(&far_txs[1]), TxVerificationStatus::HeaderPending);
        assert_eq!(wiring.network.chunk_requests(), vec![5]);

        wiring.chain.insert_header(far_header);
        assert_eq!(job.run().requests_issued, 1);
        wiring.answer_all(|_| proof_response(&far_txs, 1, 57));
        job.run();
        assert_eq!(wiring.wallet.verified_count(), 2);
        assert_eq!(wiring.network.chunk_requests(), vec![5]);
    }

    #[test]
    fn test_unreachable_heights_wait() {
        let wiring = Wiring::connected(50);
        let (txs, header) = synthetic_block(80, 1, 2);
        wiring.chain.insert_header(header);
        wiring.wallet.add_unverified(txs[0], 80);
        wiring.wallet.add_unverified(txs[1], 0);

        let mut job = wiring.job(VerifierConfig::for_testing());
        assert_eq!(job.run().requests_issued, 0);

        // Local chain catches up.
        wiring.network.set_local_height(90);
        assert_eq!(job.run().requests_issued, 1);
        assert_eq!(job.status(&txs[1]), TxVerificationStatus::NotTracked);
    }

    #[test]
    fn test_whole_block_verifies() {
        let wiring = Wiring::connected(1_000);
        let (txs, header) = synthetic_block(321, 100, 37);
        wiring.chain.insert_header(header);
        for tx_hash in &txs {
            wiring.wallet.add_unverified(*tx_hash, 321);
        }

        let mut job = wiring.job(VerifierConfig::for_testing());
        assert_eq!(job.run().requests_issued, txs.len());

        let answered = wiring.answer_all(|request| {
            let shown = request.params[0].as_str().unwrap();
            let index = txs
                .iter()
                .position(|t| t.to_display_hex() == shown)
                .unwrap();
            proof_response(&txs, index, 321)
        });
        assert_eq!(answered, txs.len());

        let report = job.run();
        assert_eq!(report.completions_applied, txs.len());
        assert_eq!(report.requests_issued, 0);
        assert_eq!(wiring.wallet.verified_count(), txs.len());
        assert!(wiring.wallet.unverified_txs().is_empty());
        assert!(job.pending_proofs().is_empty());
    }

    #[test]
    fn test_rejected_proof_recorded_and_not_retried() {
        let wiring = Wiring::connected(1_000);
        let (txs, header) = synthetic_block(10, 1, 4);
        let (other, _) = synthetic_block(10, 50, 4);
        wiring.chain.insert_header(header);
        wiring.wallet.add_unverified(txs[2], 10);

        let mut job = wiring.job(VerifierConfig::for_testing());
        job.run();
        wiring.answer_all(|_| proof_response(&other, 2, 10));

        for _ in 0..5 {
            job.run();
        }

        assert_eq!(job.status(&txs[2]), TxVerificationStatus::ProofPending);
        let failure = job.last_failure(&txs[2]).unwrap();
        assert_eq!(failure.reason(), "root_mismatch");
        assert_eq!(failure.tick, 2);
        assert_eq!(wiring.network.sent_count(), 0);
    }
}
