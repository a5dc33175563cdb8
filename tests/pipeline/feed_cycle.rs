use std::sync::Arc;

use crate::support::{
    helpers::{fast_config, init_tracing},
    mock_rpc::{MockGovernance, MockRpcServer},
};
use anyhow::{bail, Result};
use proposal_feed::{
    DisplayConfig, FetchRequest, FetchResponse, ProposalBatch, ProposalFeed, Telemetry,
};
use tokio_util::sync::CancellationToken;

const NAMED: &str = "0x1111111111111111111111111111111111111111";
const UNNAMED: &str = "0x2222222222222222222222222222222222222222";

fn feed_for(server: &MockRpcServer) -> Result<(ProposalFeed, Arc<Telemetry>)> {
    let config = fast_config(server.url(), DisplayConfig::default());
    let telemetry = Arc::new(Telemetry::default());
    let feed = ProposalFeed::from_config(&config, telemetry.clone(), CancellationToken::new())?;
    Ok((feed, telemetry))
}

fn expect_data(response: FetchResponse) -> Result<ProposalBatch> {
    match response {
        FetchResponse::Data(batch) => Ok(batch),
        FetchResponse::Error(message) => bail!("expected data, got error {message}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn walks_back_over_gaps_and_attributes_proposers() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(20);
    governance.insert_simple(20, NAMED);
    governance.insert_simple(18, UNNAMED);
    governance.insert_simple(17, NAMED);
    governance.insert_simple(15, NAMED);
    governance.register_name(NAMED, "builder.eth");
    let server = MockRpcServer::start(governance.clone()).await?;
    let (feed, telemetry) = feed_for(&server)?;

    let batch = expect_data(feed.handle(&FetchRequest::new(3)).await)?;

    assert_eq!(batch.ids(), vec![20, 18, 17]);
    assert_eq!(governance.requested_ids(), vec![20, 19, 18, 17]);

    let newest = &batch.records()[0];
    assert_eq!(newest.title(), "Proposal title 20");
    assert_eq!(newest.proposer_display(), "builder.eth");
    assert_eq!(newest.status_label(), "ACTIVE");
    assert_eq!(newest.quorum_votes(), 20);
    assert_eq!(newest.tally().for_votes, 30);
    assert_eq!(newest.tally().against_votes, 5);
    assert_eq!(newest.tally().abstain_votes, 1);
    assert_eq!(batch.records()[1].proposer_display(), "0x2222...2222");

    let snapshot = telemetry.snapshot();
    assert_eq!(snapshot.gaps_skipped, 1);
    assert_eq!(snapshot.attribution_fallbacks, 1);
    assert_eq!(snapshot.records_fetched, 3);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn server_errors_and_slow_records_are_skipped() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(6);
    for id in 1..=6 {
        governance.insert_simple(id, UNNAMED);
    }
    governance.fail_proposal(6);
    governance.slow_proposal(5);
    let server = MockRpcServer::start(governance.clone()).await?;
    let (feed, _) = feed_for(&server)?;

    let batch = expect_data(feed.handle(&FetchRequest::new(2)).await)?;

    assert_eq!(batch.ids(), vec![4, 3]);
    assert_eq!(governance.requested_ids(), vec![6, 5, 4, 3]);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn transient_count_failures_are_retried() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(3);
    governance.insert_simple(3, UNNAMED);
    governance.fail_count_calls(2);
    let server = MockRpcServer::start(governance.clone()).await?;
    let (feed, _) = feed_for(&server)?;

    let batch = expect_data(feed.handle(&FetchRequest::new(1)).await)?;
    assert_eq!(batch.ids(), vec![3]);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn exhausted_count_retries_fail_the_cycle() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(3);
    governance.insert_simple(3, UNNAMED);
    governance.fail_count_calls(3);
    let server = MockRpcServer::start(governance.clone()).await?;
    let (feed, telemetry) = feed_for(&server)?;

    let response = feed.handle(&FetchRequest::new(1)).await;

    assert_eq!(
        response,
        FetchResponse::Error("Failed to retrieve the latest proposal ID".to_owned())
    );
    assert!(governance.requested_ids().is_empty());
    assert_eq!(telemetry.snapshot().failed_cycles, 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failing_name_lookup_falls_back_to_truncation() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(1);
    governance.insert_simple(1, NAMED);
    governance.register_name(NAMED, "builder.eth");
    governance.fail_name_calls(3);
    let server = MockRpcServer::start(governance.clone()).await?;
    let (feed, _) = feed_for(&server)?;

    let batch = expect_data(feed.handle(&FetchRequest::new(5)).await)?;

    assert_eq!(batch.records()[0].proposer_display(), "0x1111...1111");

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reverse_name_claimed_by_another_address_is_not_shown() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(2);
    governance.insert_simple(2, NAMED);
    governance.insert_simple(1, UNNAMED);
    governance.register_reverse_name(NAMED, "nouns.eth", UNNAMED);
    governance.register_name(UNNAMED, "builder.eth");
    let server = MockRpcServer::start(governance.clone()).await?;
    let (feed, telemetry) = feed_for(&server)?;

    let batch = expect_data(feed.handle(&FetchRequest::new(2)).await)?;

    assert_eq!(batch.ids(), vec![2, 1]);
    assert_eq!(batch.records()[0].proposer_display(), "0x1111...1111");
    assert_eq!(batch.records()[1].proposer_display(), "builder.eth");
    assert_eq!(telemetry.snapshot().attribution_fallbacks, 1);

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn empty_governor_fails_the_cycle() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(0);
    let server = MockRpcServer::start(governance.clone()).await?;
    let (feed, telemetry) = feed_for(&server)?;

    let response = feed.handle(&FetchRequest::default()).await;

    assert_eq!(
        response,
        FetchResponse::Error("Failed to retrieve the latest proposal ID".to_owned())
    );
    assert!(governance.requested_ids().is_empty());
    assert_eq!(governance.rpc_calls(), 1);
    assert_eq!(telemetry.snapshot().failed_cycles, 1);

    server.shutdown().await;
    Ok(())
}
