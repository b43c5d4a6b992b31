use std::{future, time::Duration};

use chainwatch_node_client::{blocks_in_range_checked, NodeClient};
use tokio::{
    sync::mpsc,
    time::{self, Interval, MissedTickBehavior},
};
use tracing::*;

use crate::{
    ctx::SharedCtx,
    error::{Result, SyncError},
    Dispatcher, FetchPlan, MergeOutcome, RemoteObservation, ResetReason, Stream, View, ViewEvent,
};

/// Instructions from [`SyncHandle`](crate::SyncHandle) to the running task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SyncCommand {
    View(ViewEvent),
    Refresh(Stream),
    SetAutoRefresh(bool),
    Invalidate,
    SetEndpoint(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PassOutcome {
    /// Cursor is caught up, nothing fetched.
    Noop,
    /// Fetched and merged.
    Merged(MergeOutcome),
    /// Fetched, but the stream was reset meanwhile so the result was dropped.
    Discarded,
}

/// Coarse timers, one per stream, running only while the stream's view is active.
#[derive(Debug, Default)]
struct CoarseTimers {
    blocks: Option<Interval>,
    groups: Option<Interval>,
}

impl CoarseTimers {
    fn slot(&mut self, stream: Stream) -> &mut Option<Interval> {
        match stream {
            Stream::Blocks => &mut self.blocks,
            Stream::Groups => &mut self.groups,
        }
    }
}

fn new_interval(ms: u64) -> Interval {
    let mut interval = time::interval(Duration::from_millis(ms));
    // fixed cadence; a slow pass does not cause a burst of catch-up ticks
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn tick_coarse(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => future::pending().await,
    }
}

pub(crate) async fn sync_task<TClient>(
    ctx: SharedCtx<TClient>,
    mut cmd_rx: mpsc::Receiver<SyncCommand>,
    initial_view: Option<View>,
) where
    TClient: NodeClient + 'static,
{
    let mut dispatcher = Dispatcher::new();
    let mut timers = CoarseTimers::default();
    let mut auto_refresh = ctx.config.auto_refresh;
    let mut probe_timer = new_interval(ctx.config.probe_interval_ms);

    if let Some(view) = initial_view {
        handle_view_event(&ctx, &mut dispatcher, &mut timers, ViewEvent::Activated(view));
    }

    loop {
        tokio::select! {
            _ = probe_timer.tick(), if auto_refresh => spawn_probe(&ctx),
            _ = tick_coarse(&mut timers.blocks) => spawn_pass(&ctx, Stream::Blocks),
            _ = tick_coarse(&mut timers.groups) => spawn_pass(&ctx, Stream::Groups),
            cmd = cmd_rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!("all sync handles dropped; stopping sync task");
                    break;
                };
                match cmd {
                    SyncCommand::View(event) => {
                        handle_view_event(&ctx, &mut dispatcher, &mut timers, event);
                    }
                    SyncCommand::Refresh(stream) => spawn_pass(&ctx, stream),
                    SyncCommand::SetAutoRefresh(enabled) => {
                        if enabled && !auto_refresh {
                            probe_timer.reset_immediately();
                        }
                        auto_refresh = enabled;
                        info!(%auto_refresh, "auto refresh toggled");
                    }
                    SyncCommand::Invalidate => {
                        ctx.engine.lock().reset_all(ResetReason::Invalidated);
                        ctx.publish_all();
                    }
                    SyncCommand::SetEndpoint(url) => change_endpoint(&ctx, url),
                }
            }
        }
    }
}

fn handle_view_event<TClient>(
    ctx: &SharedCtx<TClient>,
    dispatcher: &mut Dispatcher,
    timers: &mut CoarseTimers,
    event: ViewEvent,
) {
    let effects = dispatcher.handle(event);
    debug!(?event, ?effects, "view event");

    for stream in effects.stop {
        *timers.slot(stream) = None;
    }
    for stream in effects.start {
        let ms = match stream {
            Stream::Blocks => ctx.config.blocks_interval_ms,
            Stream::Groups => ctx.config.groups_interval_ms,
        };
        // first tick fires right away, giving the immediate pass
        *timers.slot(stream) = Some(new_interval(ms));
    }
}

fn change_endpoint<TClient: NodeClient>(ctx: &SharedCtx<TClient>, url: String) {
    let prev = ctx.client.endpoint();
    if prev == url {
        return;
    }
    info!(%prev, %url, "switching node endpoint");
    ctx.client.set_endpoint(url);
    ctx.engine.lock().reset_all(ResetReason::EndpointChanged);
    ctx.notify_node(Default::default());
    ctx.publish_all();
}

fn spawn_probe<TClient: NodeClient + 'static>(ctx: &SharedCtx<TClient>) {
    let Some(permit) = ctx.probe_guard.try_acquire() else {
        trace!("probe still in flight; skipping tick");
        return;
    };
    let ctx = ctx.clone();
    tokio::spawn(async move {
        let _permit = permit;
        if let Err(error) = probe_pass(&ctx).await {
            handle_pass_error(error, "probe");
        }
    });
}

fn spawn_pass<TClient: NodeClient + 'static>(ctx: &SharedCtx<TClient>, stream: Stream) {
    let Some(permit) = ctx.stream_guard(stream).try_acquire() else {
        trace!(%stream, "fetch still in flight; skipping tick");
        return;
    };
    let ctx = ctx.clone();
    tokio::spawn(async move {
        let _permit = permit;
        match sync_pass(&ctx, stream).await {
            Ok(outcome) => trace!(%stream, ?outcome, "sync pass finished"),
            Err(error) => handle_pass_error(error, &format!("{stream} sync pass")),
        }
    });
}

/// Logs a failed pass. Nothing here is fatal; the next tick retries.
fn handle_pass_error(error: SyncError, context: &str) {
    if error.is_transport() {
        debug!(%error, %context, "node unreachable");
    } else {
        warn!(%error, %context, "pass failed");
    }
}

/// Probes one stream's height and feeds it to the liveness monitor.
pub(crate) async fn probe_height<TClient: NodeClient>(
    ctx: &SharedCtx<TClient>,
    stream: Stream,
) -> Result<RemoteObservation> {
    let generation = ctx.engine.lock().generation(stream);
    let res = match stream {
        Stream::Blocks => ctx.client.block_height().await,
        Stream::Groups => ctx.client.group_height().await,
    };

    let height = match res {
        Ok(height) => height,
        Err(error) => {
            // a reply from a replaced endpoint says nothing about the current node
            let (current, changed) = {
                let mut engine = ctx.engine.lock();
                let current = engine.generation(stream) == generation;
                (current, current && engine.probe_failed().is_some())
            };
            if changed {
                ctx.notify_liveness();
            }
            if current {
                ctx.notify_node_stopped();
            }
            return Err(error.into());
        }
    };

    let (changed, observation) = {
        let mut engine = ctx.engine.lock();
        let observation = engine.observe_remote_at(stream, generation, height);
        let changed =
            observation != RemoteObservation::Stale && engine.probe_succeeded().is_some();
        (changed, observation)
    };

    if changed {
        ctx.notify_liveness();
    }
    if observation == RemoteObservation::Reset {
        ctx.publish(stream);
    }
    trace!(%stream, %height, "probed remote height");

    Ok(observation)
}

/// Fast tier: heights of both streams, then the node's own status.
pub(crate) async fn probe_pass<TClient: NodeClient>(ctx: &SharedCtx<TClient>) -> Result<()> {
    // a failed block probe marks the node offline; the rest would fail the same way
    probe_height(ctx, Stream::Blocks).await?;
    probe_height(ctx, Stream::Groups).await?;

    let snapshot = ctx.client.node_status().await?;
    let restarted = ctx.engine.lock().observe_status(snapshot.status.clone());
    ctx.notify_node(snapshot);
    if restarted {
        ctx.publish_all();
    }

    Ok(())
}

/// One incremental sync step for `stream`: probe, plan, fetch, merge.
pub(crate) async fn sync_pass<TClient: NodeClient>(
    ctx: &SharedCtx<TClient>,
    stream: Stream,
) -> Result<PassOutcome> {
    probe_height(ctx, stream).await?;

    let (plan, generation) = ctx.engine.lock().plan(stream);

    let merged = match plan {
        FetchPlan::Noop => return Ok(PassOutcome::Noop),
        FetchPlan::Range { from, to, kind } => {
            debug!(%stream, %from, %to, ?kind, %generation, "fetching block range");
            let blocks = blocks_in_range_checked(ctx.client.as_ref(), from, to).await?;
            ctx.engine.lock().apply_blocks(generation, to, blocks)
        }
        FetchPlan::GroupsAfter { height, cold } => {
            debug!(%stream, %height, %cold, %generation, "fetching groups");
            let groups = ctx.client.groups_after(height).await?;
            ctx.engine.lock().apply_groups(generation, groups)
        }
    };

    let Some(outcome) = merged else {
        debug!(%stream, %generation, "stream reset during fetch; result dropped");
        return Ok(PassOutcome::Discarded);
    };

    if outcome.changed() {
        debug!(
            %stream,
            appended = outcome.appended,
            evicted = outcome.evicted,
            duplicates = outcome.duplicates,
            "merged fetch result"
        );
    }
    // cursor moved even if nothing new was appended
    ctx.publish(stream);

    Ok(PassOutcome::Merged(outcome))
}

#[cfg(test)]
mod tests {
    use chainwatch_node_client::{MockNodeClient, NodeStatus, RpcError};
    use mockall::{predicate::*, Sequence};

    use super::*;
    use crate::{test_utils::*, Cursor, Liveness, UNSYNCED};

    mod probe_tests {
        use super::*;

        #[tokio::test]
        async fn test_probe_failure_goes_offline_without_touching_state() {
            let mut client = MockNodeClient::new();
            client
                .expect_block_height()
                .times(1)
                .returning(|| Err(RpcError::transport("connection refused")));
            // nothing else is called once the block probe fails
            client.expect_group_height().times(0);
            client.expect_node_status().times(0);

            let (ctx, rx) = test_ctx(client);
            seed_blocks(&ctx, 10);
            let before = ctx.engine.lock().blocks_view();

            let res = probe_pass(&ctx).await;

            assert!(res.unwrap_err().is_transport());
            assert_eq!(*rx.liveness.borrow(), Liveness::Offline);
            assert_eq!(ctx.engine.lock().blocks_view(), before);
            assert_eq!(rx.node.borrow().status, NodeStatus::Stopped);
        }

        #[tokio::test]
        async fn test_successful_probe_goes_online_and_publishes_snapshot() {
            let mut client = MockNodeClient::new();
            client.expect_block_height().returning(|| Ok(50));
            client.expect_group_height().returning(|| Ok(4));
            client
                .expect_node_status()
                .returning(|| Ok(snapshot(NodeStatus::Running)));

            let (ctx, rx) = test_ctx(client);

            probe_pass(&ctx).await.unwrap();

            assert_eq!(*rx.liveness.borrow(), Liveness::Online);
            assert_eq!(rx.node.borrow().status, NodeStatus::Running);
            let engine = ctx.engine.lock();
            assert_eq!(engine.cursor(Stream::Blocks).remote, 50);
            assert_eq!(engine.cursor(Stream::Groups).remote, 4);
        }

        #[tokio::test]
        async fn test_restart_resets_before_next_fetch() {
            let mut seq = Sequence::new();
            let mut client = MockNodeClient::new();

            // first probe: node down
            client
                .expect_block_height()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|| Err(RpcError::transport("connection refused")));
            // second probe: node back up and running
            client
                .expect_block_height()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|| Ok(300));
            client
                .expect_group_height()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|| Ok(3));
            client
                .expect_node_status()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|| Ok(snapshot(NodeStatus::Running)));
            // next blocks pass is a cold start
            client
                .expect_block_height()
                .times(1)
                .in_sequence(&mut seq)
                .returning(|| Ok(300));
            client
                .expect_blocks_in_range()
                .with(eq(280), eq(300))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|from, to| Ok(blocks(from..=to)));

            let (ctx, rx) = test_ctx(client);
            seed_blocks(&ctx, 120);
            let gen = ctx.engine.lock().generation(Stream::Blocks);

            assert!(probe_pass(&ctx).await.is_err());
            assert_eq!(ctx.engine.lock().blocks().len(), 100);

            probe_pass(&ctx).await.unwrap();
            {
                let engine = ctx.engine.lock();
                assert!(engine.blocks().is_empty());
                assert!(engine.groups().is_empty());
                assert_eq!(engine.cursor(Stream::Blocks).local, UNSYNCED);
                assert_eq!(engine.generation(Stream::Blocks), gen + 1);
            }
            assert!(rx.blocks.borrow().entries.is_empty());

            let outcome = sync_pass(&ctx, Stream::Blocks).await.unwrap();

            assert!(matches!(outcome, PassOutcome::Merged(m) if m.appended == 21));
            assert_eq!(
                ctx.engine.lock().cursor(Stream::Blocks),
                Cursor {
                    local: 300,
                    remote: 300
                }
            );
        }

        #[tokio::test]
        async fn test_height_regression_resets_on_third_probe() {
            let mut seq = Sequence::new();
            let mut client = MockNodeClient::new();
            for h in [10, 10, 8] {
                client
                    .expect_block_height()
                    .times(1)
                    .in_sequence(&mut seq)
                    .returning(move || Ok(h));
            }

            let (ctx, _rx) = test_ctx(client);
            seed_blocks(&ctx, 10);

            assert_eq!(
                probe_height(&ctx, Stream::Blocks).await.unwrap(),
                RemoteObservation::Advanced
            );
            assert_eq!(
                probe_height(&ctx, Stream::Blocks).await.unwrap(),
                RemoteObservation::Advanced
            );
            assert_eq!(
                probe_height(&ctx, Stream::Blocks).await.unwrap(),
                RemoteObservation::Reset
            );
            assert!(ctx.engine.lock().blocks().is_empty());
        }
    }

    mod sync_pass_tests {
        use super::*;

        #[tokio::test]
        async fn test_catch_up_is_single_range_fetch() {
            let mut client = MockNodeClient::new();
            client.expect_block_height().returning(|| Ok(120));
            client
                .expect_blocks_in_range()
                .with(eq(20), eq(120))
                .times(1)
                .returning(|from, to| Ok(blocks(from..=to)));

            let (ctx, _rx) = test_ctx(client);
            seed_blocks(&ctx, 5);

            let outcome = sync_pass(&ctx, Stream::Blocks).await.unwrap();

            assert!(matches!(outcome, PassOutcome::Merged(_)));
            assert_eq!(ctx.engine.lock().cursor(Stream::Blocks).local, 120);
            assert_eq!(ctx.engine.lock().blocks().len(), 100);
        }

        #[tokio::test]
        async fn test_incremental_fetch_after_local() {
            let mut client = MockNodeClient::new();
            client.expect_block_height().returning(|| Ok(13));
            client
                .expect_blocks_in_range()
                .with(eq(11), eq(13))
                .times(1)
                .returning(|from, to| Ok(blocks(from..=to)));

            let (ctx, rx) = test_ctx(client);
            seed_blocks(&ctx, 10);

            sync_pass(&ctx, Stream::Blocks).await.unwrap();

            let view = rx.blocks.borrow().clone();
            assert_eq!(view.cursor.local, 13);
            assert_eq!(view.entries.last().map(|b| b.height), Some(13));
        }

        #[tokio::test]
        async fn test_noop_when_caught_up() {
            let mut client = MockNodeClient::new();
            client.expect_block_height().returning(|| Ok(10));
            client.expect_blocks_in_range().times(0);

            let (ctx, _rx) = test_ctx(client);
            seed_blocks(&ctx, 10);

            assert_eq!(
                sync_pass(&ctx, Stream::Blocks).await.unwrap(),
                PassOutcome::Noop
            );
        }

        #[tokio::test]
        async fn test_fetch_error_leaves_cursor_and_mirror() {
            let mut client = MockNodeClient::new();
            client.expect_block_height().returning(|| Ok(15));
            client
                .expect_blocks_in_range()
                .times(1)
                .returning(|_, _| Err(RpcError::remote("busy")));

            let (ctx, rx) = test_ctx(client);
            seed_blocks(&ctx, 10);
            let before = ctx.engine.lock().blocks_view();

            let err = sync_pass(&ctx, Stream::Blocks).await.unwrap_err();

            assert!(!err.is_transport());
            let after = ctx.engine.lock().blocks_view();
            assert_eq!(after.entries, before.entries);
            assert_eq!(after.cursor.local, 10);
            // a protocol error on the fetch says nothing about liveness
            assert_eq!(*rx.liveness.borrow(), Liveness::Online);
        }

        #[tokio::test]
        async fn test_groups_cold_start_and_increment() {
            let mut client = MockNodeClient::new();
            client.expect_group_height().returning(|| Ok(250));
            client
                .expect_groups_after()
                .with(eq(150))
                .times(1)
                .returning(|_| Ok(vec![group("g240", 240), group("g250", 250)]));

            let (ctx, rx) = test_ctx(client);

            sync_pass(&ctx, Stream::Groups).await.unwrap();
            assert_eq!(ctx.engine.lock().cursor(Stream::Groups).local, 250);

            // caught up: no request
            assert_eq!(
                sync_pass(&ctx, Stream::Groups).await.unwrap(),
                PassOutcome::Noop
            );
            assert_eq!(rx.groups.borrow().entries.len(), 2);
        }
    }

    mod guard_tests {
        use std::sync::mpsc as std_mpsc;

        use parking_lot::Mutex;
        use tokio::task;

        use super::*;

        #[tokio::test]
        async fn test_in_flight_stream_skips_tick() {
            let mut client = MockNodeClient::new();
            client.expect_block_height().returning(|| Ok(10));
            client
                .expect_blocks_in_range()
                .times(1)
                .returning(|from, to| Ok(blocks(from..=to)));

            let (ctx, _rx) = test_ctx(client);

            let permit = ctx.stream_guard(Stream::Blocks).try_acquire().unwrap();
            spawn_pass(&ctx, Stream::Blocks);
            for _ in 0..4 {
                task::yield_now().await;
            }
            // the tick was skipped; nothing was fetched
            assert!(ctx.engine.lock().blocks().is_empty());
            drop(permit);

            sync_pass(&ctx, Stream::Blocks).await.unwrap();
            assert_eq!(ctx.engine.lock().blocks().len(), 11);
            assert!(!ctx.stream_guard(Stream::Blocks).is_busy());
        }

        /// Makes a mock call block its worker thread until released.
        ///
        /// The returned receiver fires once the call has started.
        fn gated() -> (
            impl Fn() + Send + 'static,
            mpsc::UnboundedReceiver<()>,
            std_mpsc::Sender<()>,
        ) {
            let (started_tx, started_rx) = mpsc::unbounded_channel();
            let (release_tx, release_rx) = std_mpsc::channel();
            let release_rx = Mutex::new(release_rx);
            let wait = move || {
                let _ = started_tx.send(());
                let _ = release_rx.lock().recv();
            };
            (wait, started_rx, release_tx)
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn test_late_result_after_invalidate_is_discarded() {
            let (wait, mut started, release) = gated();

            let mut client = MockNodeClient::new();
            client.expect_block_height().returning(|| Ok(30));
            client
                .expect_blocks_in_range()
                .with(eq(10), eq(30))
                .times(1)
                .returning(move |from, to| {
                    wait();
                    Ok(blocks(from..=to))
                });

            let (ctx, rx) = test_ctx(client);

            let pass_ctx = ctx.clone();
            let pass = tokio::spawn(async move { sync_pass(&pass_ctx, Stream::Blocks).await });

            started.recv().await.unwrap();
            ctx.engine.lock().reset_all(ResetReason::Invalidated);
            release.send(()).unwrap();

            assert_eq!(pass.await.unwrap().unwrap(), PassOutcome::Discarded);
            let engine = ctx.engine.lock();
            assert!(engine.blocks().is_empty());
            assert_eq!(engine.cursor(Stream::Blocks), Cursor::unsynced());
            assert!(rx.blocks.borrow().entries.is_empty());
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn test_height_from_old_endpoint_is_ignored() {
            let (wait, mut started, release) = gated();

            let mut client = MockNodeClient::new();
            client.expect_block_height().times(1).returning(move || {
                wait();
                Ok(5_000)
            });
            client
                .expect_endpoint()
                .return_const("http://old:8101".to_string());
            client.expect_set_endpoint().times(1).return_const(());

            let (ctx, rx) = test_ctx(client);

            let height_ctx = ctx.clone();
            let height =
                tokio::spawn(async move { probe_height(&height_ctx, Stream::Blocks).await });

            started.recv().await.unwrap();
            change_endpoint(&ctx, "http://new:8101".to_string());
            release.send(()).unwrap();

            assert_eq!(height.await.unwrap().unwrap(), RemoteObservation::Stale);
            assert_eq!(ctx.engine.lock().cursor(Stream::Blocks), Cursor::unsynced());
            assert_eq!(*rx.liveness.borrow(), Liveness::Unknown);
        }
    }

    mod task_tests {
        use super::*;
        use crate::SyncBuilder;

        #[tokio::test(start_paused = true)]
        async fn test_activating_view_runs_immediate_pass() {
            let mut client = MockNodeClient::new();
            client.expect_block_height().returning(|| Ok(40));
            client
                .expect_blocks_in_range()
                .with(eq(20), eq(40))
                .times(1)
                .returning(|from, to| Ok(blocks(from..=to)));
            client.expect_endpoint().return_const("http://node".to_string());

            let (handle, task) = SyncBuilder::new(client.into())
                .with_auto_refresh(false)
                .build();
            let task = tokio::spawn(task);

            let mut blocks_rx = handle.blocks_watcher();
            handle.activate_view(View::Blocks).await.unwrap();

            blocks_rx.changed().await.unwrap();
            let view = blocks_rx.borrow_and_update().clone();
            assert_eq!(view.entries.len(), 21);
            assert_eq!(view.cursor.local, 40);

            drop(handle);
            task.await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_endpoint_change_resets_streams() {
            let mut client = MockNodeClient::new();
            client
                .expect_endpoint()
                .return_const("http://old:8101".to_string());
            client
                .expect_set_endpoint()
                .with(eq("http://new:8101".to_string()))
                .times(1)
                .return_const(());

            let (handle, ctx, task) = SyncBuilder::new(client.into())
                .with_auto_refresh(false)
                .build_parts();
            seed_blocks(&ctx, 10);
            let task = tokio::spawn(task);

            let mut blocks_rx = handle.blocks_watcher();
            handle.set_endpoint("http://new:8101").await.unwrap();
            blocks_rx.changed().await.unwrap();

            assert!(blocks_rx.borrow().entries.is_empty());
            assert_eq!(ctx.engine.lock().generation(Stream::Blocks), 1);

            drop(handle);
            drop(ctx);
            task.await.unwrap();
        }
    }
}
