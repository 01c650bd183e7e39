//! # Scheduled Verification
//!
//! The scheduler drives passes on a timer while responses arrive from
//! outside the task.

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use spv_verifier::{TxVerificationStatus, VerifierConfig, VerifierScheduler};

    use crate::fixtures::*;

    #[tokio::test(start_paused = true)]
    async fn test_block_170_verified_on_schedule() {
        let wiring = Wiring::connected(200);
        wiring.chain.insert_header(block_170_header());
        let tx_hash = display_hash(BLOCK_170_TX);
        wiring.wallet.add_unverified(tx_hash, 170);

        let handle = VerifierScheduler::spawn_configured(wiring.job(VerifierConfig::for_testing()));

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert_eq!(wiring.answer_all(|_| block_170_proof_response()), 1);

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(wiring.wallet.verified(&tx_hash).is_some());

        let job = handle.stop().await.unwrap();
        assert!(job.is_disposed());
        assert_eq!(job.status(&tx_hash), TxVerificationStatus::Verified);
        assert_eq!(job.sync_percentage(), Some(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_response_after_stop_is_dropped() {
        let wiring = Wiring::connected(200);
        wiring.chain.insert_header(block_170_header());
        let tx_hash = display_hash(BLOCK_170_TX);
        wiring.wallet.add_unverified(tx_hash, 170);

        let handle = VerifierScheduler::spawn(
            wiring.job(VerifierConfig::for_testing()),
            Duration::from_millis(10),
        );
        tokio::time::sleep(Duration::from_millis(15)).await;
        let sent = wiring.network.take_sent();
        assert_eq!(sent.len(), 1);

        let job = handle.stop().await.unwrap();
        for request in sent {
            assert!(!request.respond(block_170_proof_response()));
        }
        assert!(job.verified_root(&tx_hash).is_none());
        assert!(wiring.wallet.verified(&tx_hash).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_token_ends_task() {
        let wiring = Wiring::connected(200);
        let handle = VerifierScheduler::spawn(
            wiring.job(VerifierConfig::for_testing()),
            Duration::from_millis(10),
        );

        handle.disposal_token().dispose();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(handle.is_finished());

        let job = handle.stop().await.unwrap();
        assert!(job.is_disposed());
    }
}
