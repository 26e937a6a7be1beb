//! Race properties of the cooldown gate when driven through full
//! dispatches: the last remaining use must be won by exactly one of any
//! number of concurrent invocations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use parlance_commands::{
    handler_fn, ChannelId, CommandSpec, CooldownPolicy, DispatchOutcome, Dispatcher, MessageEvent,
    UserId,
};

fn msg(user: u64) -> MessageEvent {
    MessageEvent::new("!claim", UserId(user), ChannelId(1))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn one_use_cannot_be_claimed_twice() {
    const TASKS: usize = 48;

    let claims = Arc::new(Mutex::new(0u32));
    let claims_in_handler = Arc::clone(&claims);

    let bot = Arc::new(
        Dispatcher::builder()
            .command(
                CommandSpec::new(
                    "claim",
                    handler_fn(move |_ctx, _args| {
                        let claims = Arc::clone(&claims_in_handler);
                        async move {
                            *claims.lock().unwrap() += 1;
                            Ok(())
                        }
                    }),
                )
                .with_cooldown(CooldownPolicy::new(1, Duration::from_secs(3600))),
            )
            .build()
            .unwrap(),
    );

    let outcomes = join_all((0..TASKS).map(|_| {
        let bot = Arc::clone(&bot);
        tokio::spawn(async move { bot.dispatch(msg(7)).await })
    }))
    .await;

    let mut succeeded = 0;
    let mut denied = 0;
    for outcome in outcomes {
        match outcome.unwrap() {
            DispatchOutcome::Succeeded { .. } => succeeded += 1,
            DispatchOutcome::Denied { .. } => denied += 1,
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    assert_eq!(succeeded, 1);
    assert_eq!(denied, TASKS - 1);
    assert_eq!(*claims.lock().unwrap(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn each_invoker_gets_their_own_use() {
    const USERS: u64 = 24;

    let bot = Arc::new(
        Dispatcher::builder()
            .command(
                CommandSpec::new("claim", handler_fn(|_ctx, _args| async { Ok(()) }))
                    .with_cooldown(CooldownPolicy::new(1, Duration::from_secs(3600))),
            )
            .build()
            .unwrap(),
    );

    let outcomes = join_all((0..USERS).map(|user| {
        let bot = Arc::clone(&bot);
        tokio::spawn(async move { bot.dispatch(msg(user)).await })
    }))
    .await;

    for outcome in outcomes {
        assert!(matches!(
            outcome.unwrap(),
            DispatchOutcome::Succeeded { .. }
        ));
    }
}
