use std::time::Duration;

use crate::support::{
    helpers::{fast_config, init_tracing, page_ids, wait_for_frame},
    mock_rpc::{MockGovernance, MockRpcServer},
};
use anyhow::{Context, Result};
use proposal_feed::{DisplayConfig, FeedRunner, Frame};
use tokio::time::timeout;

const PROPOSER: &str = "0x3333333333333333333333333333333333333333";

fn cycling_display() -> DisplayConfig {
    DisplayConfig {
        update_interval: Duration::from_secs(60),
        cycle_interval: Duration::from_millis(250),
        ..DisplayConfig::default()
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn runner_pages_through_a_small_batch() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(7);
    for id in 1..=7 {
        governance.insert_simple(id, PROPOSER);
    }
    let server = MockRpcServer::start(governance.clone()).await?;

    let runner = FeedRunner::new(fast_config(server.url(), cycling_display()))?;
    let mut frames = runner.subscribe();
    let token = runner.cancellation_token();
    let handle = tokio::spawn(runner.run());

    let limit = Duration::from_secs(5);
    let first = wait_for_frame(&mut frames, limit, |frame| matches!(frame, Frame::Page(_))).await?;
    assert_eq!(page_ids(&first), vec![7, 6, 5]);
    let Frame::Page(view) = &first else {
        unreachable!("checked above");
    };
    assert_eq!(view.page_indicator().as_deref(), Some("Page 1/3"));
    assert_eq!(view.entries[0].proposer.as_deref(), Some("0x3333...3333"));

    wait_for_frame(&mut frames, limit, |frame| page_ids(frame) == vec![4, 3, 2]).await?;
    wait_for_frame(&mut frames, limit, |frame| page_ids(frame) == vec![1]).await?;
    wait_for_frame(&mut frames, limit, |frame| page_ids(frame) == vec![7, 6, 5]).await?;

    // one fetch cycle only: the update interval is far longer than the test
    assert_eq!(governance.requested_ids(), vec![7, 6, 5, 4, 3, 2, 1]);

    token.cancel();
    timeout(Duration::from_secs(5), handle)
        .await
        .context("runner should stop after cancellation")??
        .context("runner should exit cleanly")?;

    server.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn runner_shows_error_when_count_is_unavailable() -> Result<()> {
    init_tracing();
    let governance = MockGovernance::new(5);
    governance.fail_count_calls(usize::MAX);
    let server = MockRpcServer::start(governance.clone()).await?;

    let runner = FeedRunner::new(fast_config(server.url(), cycling_display()))?;
    let mut frames = runner.subscribe();
    let token = runner.cancellation_token();
    let telemetry = runner.telemetry();
    let handle = tokio::spawn(runner.run());

    let frame = wait_for_frame(&mut frames, Duration::from_secs(5), |frame| {
        matches!(frame, Frame::Error { .. })
    })
    .await?;
    assert_eq!(
        frame,
        Frame::Error {
            message: "Failed to retrieve the latest proposal ID".to_owned()
        }
    );
    assert!(governance.requested_ids().is_empty());
    assert_eq!(telemetry.snapshot().failed_cycles, 1);

    token.cancel();
    timeout(Duration::from_secs(5), handle)
        .await
        .context("runner should stop after cancellation")??
        .context("runner should exit cleanly")?;

    server.shutdown().await;
    Ok(())
}
