//! # Reorg Recovery
//!
//! A best-chain switch rolls back verifications at or above the new chain's
//! checkpoint, and the same pass asks for their proofs again.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use spv_verifier::{
        ChainPort, ChainRef, Checkpoint, Hash256, InterfaceInfo, MockChain, SkipReason, TxHash,
        TxVerificationStatus, VerifierConfig, WalletPort,
    };

    use crate::fixtures::*;

    fn index_of(txs: &[TxHash], shown: &str) -> usize {
        txs.iter()
            .position(|t| t.to_display_hex() == shown)
            .unwrap()
    }

    #[test]
    fn test_switch_redoes_verifications_above_checkpoint() {
        let wiring = Wiring::connected(1_000);
        let (old_txs, old_header) = synthetic_block(100, 1, 3);
        let (new_txs, new_header) = synthetic_block(200, 10, 3);
        wiring.chain.insert_header(old_header.clone());
        wiring.chain.insert_header(new_header.clone());
        wiring.wallet.add_unverified(old_txs[0], 100);
        wiring.wallet.add_unverified(new_txs[2], 200);

        let mut job = wiring.job(VerifierConfig::for_testing());
        assert_eq!(job.run().requests_issued, 2);
        wiring.answer_all(|request| {
            let shown = request.params[0].as_str().unwrap();
            if shown == old_txs[0].to_display_hex() {
                proof_response(&old_txs, 0, 100)
            } else {
                proof_response(&new_txs, index_of(&new_txs, shown), 200)
            }
        });
        job.run();
        assert_eq!(wiring.wallet.verified_count(), 2);

        // Fork point sits between the two blocks.
        let fork = Arc::new(MockChain::new(ChainRef(2)));
        fork.insert_header(old_header);
        fork.insert_header(new_header);
        fork.set_checkpoint_height(150);
        wiring
            .network
            .set_chain(Some(fork.clone() as Arc<dyn ChainPort>));

        let report = job.run();
        assert_eq!(report.requests_issued, 1);
        let outcome = report.reorg.unwrap();
        assert_eq!(outcome.previous, ChainRef(1));
        assert_eq!(outcome.current, ChainRef(2));
        assert_eq!(outcome.checkpoint, 150);
        assert_eq!(outcome.purged, vec![new_txs[2]]);
        assert_eq!(wiring.wallet.undo_calls(), vec![(ChainRef(2), 150)]);

        assert_eq!(job.status(&old_txs[0]), TxVerificationStatus::Verified);
        assert!(job.verified_root(&new_txs[2]).is_none());
        assert_eq!(job.status(&new_txs[2]), TxVerificationStatus::ProofPending);

        assert_eq!(wiring.answer_all(|_| proof_response(&new_txs, 2, 200)), 1);
        let report = job.run();
        assert!(report.reorg.is_none());
        assert_eq!(job.status(&new_txs[2]), TxVerificationStatus::Verified);
        assert_eq!(wiring.wallet.verified_count(), 2);
    }

    #[test]
    fn test_switch_drops_outstanding_chunks() {
        let wiring = Wiring::connected(1_000);
        wiring
            .chain
            .set_checkpoints(vec![Checkpoint::new(0, Hash256::default()); 100]);
        let (txs, _) = synthetic_block(57, 1, 2);
        wiring.wallet.add_unverified(txs[0], 57);

        let mut job = wiring.job(VerifierConfig::for_testing());
        job.run();
        job.run();
        assert_eq!(wiring.network.chunk_requests(), vec![5]);

        // The switch drops the chunk entry; the waiting transaction asks
        // for it again in the same pass, and only once.
        wiring.chain.set_chain_ref(ChainRef(7));
        let outcome = job.run().reorg.unwrap();
        assert!(outcome.purged.is_empty());
        assert_eq!(wiring.network.chunk_requests(), vec![5, 5]);

        job.run();
        job.run();
        assert_eq!(wiring.network.chunk_requests(), vec![5, 5]);
    }

    #[test]
    fn test_same_chain_handle_is_not_a_reorg() {
        let wiring = Wiring::connected(1_000);
        let (txs, header) = synthetic_block(40, 1, 2);
        wiring.chain.insert_header(header);
        wiring.wallet.add_unverified(txs[1], 40);

        let mut job = wiring.job(VerifierConfig::for_testing());
        for _ in 0..4 {
            assert!(job.run().reorg.is_none());
        }
        assert!(wiring.wallet.undo_calls().is_empty());
    }

    #[test]
    fn test_responses_apply_while_disconnected() {
        let wiring = Wiring::connected(1_000);
        let (txs, header) = synthetic_block(64, 1, 4);
        wiring.chain.insert_header(header);
        wiring.wallet.add_unverified(txs[3], 64);

        let mut job = wiring.job(VerifierConfig::for_testing());
        job.run();
        wiring.network.set_interface(None);
        wiring.answer_all(|_| proof_response(&txs, 3, 64));

        let report = job.run();
        assert_eq!(report.skipped, Some(SkipReason::NoInterface));
        assert_eq!(report.completions_applied, 1);
        assert_eq!(job.status(&txs[3]), TxVerificationStatus::Verified);

        // Nothing new is sent until the server returns.
        let (more, more_header) = synthetic_block(65, 20, 2);
        wiring.chain.insert_header(more_header);
        wiring.wallet.add_unverified(more[0], 65);
        job.run();
        assert_eq!(wiring.network.sent_count(), 0);

        wiring
            .network
            .set_interface(Some(InterfaceInfo::new("mock:50002", 1_000)));
        assert_eq!(job.run().requests_issued, 1);
    }
}
