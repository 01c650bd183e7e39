//! # Direct-Fetch Flow
//!
//! Headers are requested from the server per transaction, keyed either by
//! transaction hash or by height. No local chain is consulted and chain
//! switches are not tracked.

#[cfg(test)]
mod tests {
    use serde_json::json;
    use spv_verifier::{
        serialize_header, BlockHeader, ChainRef, HeaderKeying, RpcMethod, RpcResponse,
        TxVerificationStatus, VerifierConfig,
    };

    use crate::fixtures::*;

    fn header_response(header: &BlockHeader) -> RpcResponse {
        RpcResponse::success(vec![], json!(hex::encode(serialize_header(header))))
    }

    #[test]
    fn test_by_tx_hash_round_trip() {
        let wiring = Wiring::connected(500);
        let (txs, header) = synthetic_block(420, 1, 6);
        wiring.wallet.add_unverified(txs[5], 420);

        let mut job = wiring.job(VerifierConfig::direct_fetch_for_testing(HeaderKeying::TxHash));
        job.run();
        assert_eq!(job.status(&txs[5]), TxVerificationStatus::HeaderPending);

        let sent = wiring.network.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].request.method, RpcMethod::BlockHeader);
        assert_eq!(sent[0].request.params, vec![json!(txs[5].to_display_hex())]);
        for request in sent {
            request.respond(header_response(&header));
        }

        job.run();
        assert_eq!(job.status(&txs[5]), TxVerificationStatus::ProofPending);
        wiring.answer_all(|_| proof_response(&txs, 5, 420));

        job.run();
        assert_eq!(job.status(&txs[5]), TxVerificationStatus::Verified);
        assert_eq!(wiring.wallet.verified(&txs[5]).map(|v| v.pos), Some(5));
    }

    #[test]
    fn test_by_height_shares_one_header() {
        let wiring = Wiring::connected(500);
        let (txs, header) = synthetic_block(77, 1, 3);
        for tx_hash in &txs {
            wiring.wallet.add_unverified(*tx_hash, 77);
        }

        let mut job = wiring.job(VerifierConfig::direct_fetch_for_testing(HeaderKeying::Height));
        assert_eq!(job.run().requests_issued, 1);
        let sent = wiring.network.take_sent();
        assert_eq!(sent[0].request.params, vec![json!(77)]);
        for request in sent {
            request.respond(header_response(&header));
        }

        assert_eq!(job.run().requests_issued, 3);
        wiring.answer_all(|request| {
            let shown = request.params[0].as_str().unwrap();
            let index = txs.iter().position(|t| t.to_display_hex() == shown).unwrap();
            proof_response(&txs, index, 77)
        });

        job.run();
        for tx_hash in &txs {
            assert_eq!(job.status(tx_hash), TxVerificationStatus::Verified);
        }
    }

    #[test]
    fn test_header_error_leaves_request_pending() {
        let wiring = Wiring::connected(500);
        let (txs, _) = synthetic_block(9, 1, 2);
        wiring.wallet.add_unverified(txs[0], 9);

        let mut job = wiring.job(VerifierConfig::direct_fetch_for_testing(HeaderKeying::TxHash));
        job.run();
        wiring.answer_all(|_| RpcResponse::failure(vec![], json!("unknown tx")));

        for _ in 0..3 {
            assert_eq!(job.run().requests_issued, 0);
        }
        assert_eq!(job.status(&txs[0]), TxVerificationStatus::HeaderPending);
    }

    #[test]
    fn test_chain_switch_ignored() {
        let wiring = Wiring::connected(500);
        let (txs, header) = synthetic_block(30, 1, 2);
        wiring.wallet.add_unverified(txs[1], 30);

        let mut job = wiring.job(VerifierConfig::direct_fetch_for_testing(HeaderKeying::TxHash));
        job.run();
        wiring.answer_all(|_| header_response(&header));
        job.run();
        wiring.answer_all(|_| proof_response(&txs, 1, 30));
        job.run();
        assert_eq!(job.status(&txs[1]), TxVerificationStatus::Verified);

        wiring.chain.set_chain_ref(ChainRef(9));
        let report = job.run();
        assert!(report.reorg.is_none());
        assert!(wiring.wallet.undo_calls().is_empty());
        assert_eq!(job.status(&txs[1]), TxVerificationStatus::Verified);
    }

    #[test]
    fn test_verification_disabled_trusts_server() {
        let wiring = Wiring::connected(500);
        let (txs, _) = synthetic_block(30, 1, 2);
        wiring.wallet.add_unverified(txs[0], 30);

        let mut job = wiring.job(VerifierConfig {
            independent_verification: false,
            ..VerifierConfig::direct_fetch_for_testing(HeaderKeying::TxHash)
        });
        for _ in 0..3 {
            job.run();
        }
        assert_eq!(wiring.network.sent_count(), 0);
    }
}
