//! Racing guardians and racing devices

mod common;

use common::Harness;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Barrier;
use tokio::task::JoinSet;
use warden_client::RecoveryKeypair;
use warden_core::OwnerRef;
use warden_recovery::{InitiateRequest, SessionStatus};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_never_lose_a_shard() {
    const GUARDIANS: usize = 8;
    let mut h = Harness::new(GUARDIANS);
    h.configure(5).await;
    let device = RecoveryKeypair::generate(&mut h.rng);
    let session = h.initiate(&device).await;

    let mut requests = Vec::with_capacity(GUARDIANS);
    for i in 0..GUARDIANS {
        let pending = h.pending_for(i).await;
        requests.push(h.submission(i, &pending[0]));
    }

    let barrier = Arc::new(Barrier::new(GUARDIANS));
    let mut tasks = JoinSet::new();
    for request in requests {
        let service = h.service.clone();
        let barrier = Arc::clone(&barrier);
        tasks.spawn(async move {
            barrier.wait().await;
            service.submit_shard(request).await
        });
    }
    while let Some(joined) = tasks.join_next().await {
        joined.unwrap().unwrap();
    }

    let fetched = h.service.fetch_shards(&session.recovery_id).await.unwrap();
    assert_eq!(fetched.submitted_shards.len(), GUARDIANS);
    assert_eq!(fetched.status, SessionStatus::Ready);
    for guardian in &h.guardians {
        assert!(fetched.submitted_shards.contains_key(&guardian.public_key()));
    }
    for i in 0..GUARDIANS {
        assert!(h.pending_for(i).await.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_initiations_share_one_pending_session() {
    const DEVICES: usize = 8;
    let mut h = Harness::new(3);
    h.configure(2).await;

    let barrier = Arc::new(Barrier::new(DEVICES));
    let mut tasks = JoinSet::new();
    for _ in 0..DEVICES {
        let service = h.service.clone();
        let barrier = Arc::clone(&barrier);
        let request = InitiateRequest {
            owner: OwnerRef::PublicKey(h.owner.public_key()),
            temp_pubkey: RecoveryKeypair::generate(&mut h.rng).temp_pubkey(),
        };
        tasks.spawn(async move {
            barrier.wait().await;
            service.initiate(request).await
        });
    }

    let mut responses = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        responses.push(joined.unwrap().unwrap());
    }
    let id = responses[0].recovery_id;
    assert!(responses.iter().all(|r| r.recovery_id == id));
    assert_eq!(responses.iter().filter(|r| !r.reused).count(), 1);

    let stored_sessions = h
        .effects
        .memory()
        .snapshot()
        .await
        .unwrap()
        .into_keys()
        .filter(|k| k.starts_with("recovery:session:"))
        .count();
    assert_eq!(stored_sessions, 1);
    assert_eq!(h.pending_for(0).await.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_reconfigurations_leave_shards_matching_the_guardian_list() {
    const ROUNDS: usize = 50;
    let mut h = Harness::new(6);
    let owner_hex = h.owner.public_key().to_hex();
    let groups: [&[usize]; 3] = [&[0, 1], &[2, 3], &[4, 5]];

    for round in 0..ROUNDS {
        // Start from the third group so that both racers drop its shards.
        let (start, _) = h.configure_request_for(groups[2], 2);
        h.service.configure(start).await.unwrap();

        let (first, _) = h.configure_request_for(groups[round % 2], 2);
        let (second, _) = h.configure_request_for(groups[(round + 1) % 2], 2);
        let barrier = Arc::new(Barrier::new(2));
        let mut tasks = JoinSet::new();
        for request in [first, second] {
            let service = h.service.clone();
            let barrier = Arc::clone(&barrier);
            tasks.spawn(async move {
                barrier.wait().await;
                service.configure(request).await
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap().unwrap();
        }

        let config = h.service.configuration(&h.owner.public_key()).await.unwrap();
        let expected: BTreeSet<String> = config
            .guardians
            .iter()
            .map(|g| format!("recovery:shard:{owner_hex}:{g}"))
            .collect();
        let stored: BTreeSet<String> = h
            .effects
            .memory()
            .snapshot()
            .await
            .unwrap()
            .into_keys()
            .filter(|k| k.starts_with("recovery:shard:"))
            .collect();
        assert_eq!(stored, expected, "round {round}");
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disable_racing_a_reconfiguration_leaves_no_orphans() {
    const ROUNDS: usize = 50;
    let mut h = Harness::new(4);

    for _ in 0..ROUNDS {
        let (start, _) = h.configure_request_for(&[0, 1], 2);
        h.service.configure(start).await.unwrap();

        let (reconfigure, _) = h.configure_request_for(&[2, 3], 2);
        let disable = h.owner.sign(&warden_signature::SignedAction::Disable, h.now());
        let barrier = Arc::new(Barrier::new(2));

        let service = h.service.clone();
        let gate = Arc::clone(&barrier);
        let configuring = tokio::spawn(async move {
            gate.wait().await;
            service.configure(reconfigure).await
        });
        let service = h.service.clone();
        let gate = Arc::clone(&barrier);
        let disabling = tokio::spawn(async move {
            gate.wait().await;
            service.disable(&disable).await
        });
        configuring.await.unwrap().unwrap();
        disabling.await.unwrap().unwrap();

        let shards = h
            .effects
            .memory()
            .snapshot()
            .await
            .unwrap()
            .into_keys()
            .filter(|k| k.starts_with("recovery:shard:"))
            .count();
        match h.service.configuration(&h.owner.public_key()).await {
            Ok(config) => assert_eq!(shards, config.guardians.len()),
            Err(_) => assert_eq!(shards, 0),
        }
    }
}
