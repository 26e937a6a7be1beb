use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use parlance_commands::{
    check_fn, handler_fn, ArgType, CommandSpec, CooldownPolicy, DispatchObserver, DispatchOutcome,
    Dispatcher, EngineConfig, EntityKind, EntityLookup, EntityRef, MessageEvent, ParamSpec,
    PrefixPolicy, Replier, Scope,
};
use parlance_commands::{ChannelId, CommandContext, GuildId, UserId};

#[derive(Default)]
struct RecordingReplier {
    replies: Mutex<Vec<String>>,
}

impl RecordingReplier {
    fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().clone()
    }
}

#[async_trait]
impl Replier for RecordingReplier {
    async fn reply(&self, _event: &MessageEvent, content: &str) -> anyhow::Result<()> {
        self.replies.lock().unwrap().push(content.to_string());
        Ok(())
    }
}

struct StaticLookup {
    entities: Vec<EntityRef>,
}

#[async_trait]
impl EntityLookup for StaticLookup {
    async fn by_id(&self, kind: EntityKind, id: u64, _scope: Scope) -> Option<EntityRef> {
        self.entities
            .iter()
            .find(|e| e.kind == kind && e.id == id)
            .cloned()
    }

    async fn candidates(&self, kind: EntityKind, _scope: Scope) -> Vec<EntityRef> {
        self.entities
            .iter()
            .filter(|e| e.kind == kind)
            .cloned()
            .collect()
    }
}

fn event(body: &str) -> MessageEvent {
    MessageEvent::new(body, UserId(10), ChannelId(20)).with_guild(GuildId(30))
}

#[tokio::test]
async fn subcommand_dispatch_binds_remaining_tokens() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_in_handler = Arc::clone(&seen);

    let dispatcher = Dispatcher::builder()
        .command(CommandSpec::new(
            "tag",
            handler_fn(|_ctx, _args| async { Ok(()) }),
        ))
        .command(
            CommandSpec::new(
                "add",
                handler_fn(move |_ctx, args| {
                    let seen = Arc::clone(&seen_in_handler);
                    async move {
                        let name = args.get("name").and_then(|v| v.as_str()).unwrap().to_string();
                        let body = args.get("body").and_then(|v| v.as_str()).unwrap().to_string();
                        seen.lock().unwrap().push((name, body));
                        Ok(())
                    }
                }),
            )
            .with_parent(["tag"])
            .with_param(ParamSpec::required("name", ArgType::String))
            .with_param(ParamSpec::rest("body", ArgType::String)),
        )
        .build()
        .unwrap();

    let outcome = dispatcher
        .dispatch(event("!tag add greeting hello there,  friend"))
        .await;
    assert_eq!(
        outcome,
        DispatchOutcome::Succeeded {
            command: "tag add".to_string()
        }
    );
    assert_eq!(
        seen.lock().unwrap().as_slice(),
        [(
            "greeting".to_string(),
            "hello there,  friend".to_string()
        )]
    );
}

#[tokio::test]
async fn argument_failure_is_reported_with_detail() {
    let replier = Arc::new(RecordingReplier::default());
    let dispatcher = Dispatcher::builder()
        .with_replier(Arc::clone(&replier) as Arc<dyn Replier>)
        .command(
            CommandSpec::new("roll", handler_fn(|_ctx, _args| async { Ok(()) }))
                .with_param(ParamSpec::required("sides", ArgType::Int)),
        )
        .build()
        .unwrap();

    let outcome = dispatcher.dispatch(event("!roll banana")).await;
    assert!(matches!(outcome, DispatchOutcome::ArgumentFailed { .. }));

    let replies = replier.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("sides"), "reply was: {}", replies[0]);
    assert!(replies[0].contains("integer"), "reply was: {}", replies[0]);
}

#[tokio::test]
async fn missing_argument_is_reported_by_name() {
    let replier = Arc::new(RecordingReplier::default());
    let dispatcher = Dispatcher::builder()
        .with_replier(Arc::clone(&replier) as Arc<dyn Replier>)
        .command(
            CommandSpec::new("ban", handler_fn(|_ctx, _args| async { Ok(()) }))
                .with_param(ParamSpec::required("user", ArgType::Member)),
        )
        .build()
        .unwrap();

    dispatcher.dispatch(event("!ban")).await;
    let replies = replier.replies();
    assert_eq!(
        replies,
        ["user is a required argument that is missing".to_string()]
    );
}

#[tokio::test]
async fn cooldown_denial_reports_retry_after() {
    let replier = Arc::new(RecordingReplier::default());
    let dispatcher = Dispatcher::builder()
        .with_replier(Arc::clone(&replier) as Arc<dyn Replier>)
        .command(
            CommandSpec::new("daily", handler_fn(|_ctx, _args| async { Ok(()) }))
                .with_cooldown(CooldownPolicy::new(1, Duration::from_secs(60))),
        )
        .build()
        .unwrap();

    assert!(matches!(
        dispatcher.dispatch(event("!daily")).await,
        DispatchOutcome::Succeeded { .. }
    ));
    let outcome = dispatcher.dispatch(event("!daily")).await;
    match outcome {
        DispatchOutcome::Denied { retry_after, .. } => {
            assert!(retry_after <= Duration::from_secs(60));
        }
        other => panic!("expected Denied, got {other:?}"),
    }

    let replies = replier.replies();
    assert_eq!(replies.len(), 1);
    assert!(replies[0].contains("cooldown"), "reply was: {}", replies[0]);
}

#[tokio::test]
async fn cooldown_is_per_invoker() {
    let dispatcher = Dispatcher::builder()
        .command(
            CommandSpec::new("daily", handler_fn(|_ctx, _args| async { Ok(()) }))
                .with_cooldown(CooldownPolicy::new(1, Duration::from_secs(60))),
        )
        .build()
        .unwrap();

    let from = |user: u64| MessageEvent::new("!daily", UserId(user), ChannelId(20));
    assert!(matches!(
        dispatcher.dispatch(from(1)).await,
        DispatchOutcome::Succeeded { .. }
    ));
    assert!(matches!(
        dispatcher.dispatch(from(2)).await,
        DispatchOutcome::Succeeded { .. }
    ));
    assert!(matches!(
        dispatcher.dispatch(from(1)).await,
        DispatchOutcome::Denied { .. }
    ));
}

#[tokio::test]
async fn failing_check_blocks_the_handler() {
    let ran = Arc::new(Mutex::new(false));
    let ran_in_handler = Arc::clone(&ran);
    let replier = Arc::new(RecordingReplier::default());

    let dispatcher = Dispatcher::builder()
        .with_replier(Arc::clone(&replier) as Arc<dyn Replier>)
        .command(
            CommandSpec::new(
                "admin",
                handler_fn(move |_ctx, _args| {
                    let ran = Arc::clone(&ran_in_handler);
                    async move {
                        *ran.lock().unwrap() = true;
                        Ok(())
                    }
                }),
            )
            .with_check(check_fn(|ctx| async move { ctx.author_id() == UserId(999) })),
        )
        .build()
        .unwrap();

    let outcome = dispatcher.dispatch(event("!admin")).await;
    assert!(matches!(outcome, DispatchOutcome::CheckFailed { .. }));
    assert!(!*ran.lock().unwrap());
    assert_eq!(replier.replies(), ["A check has failed.".to_string()]);
}

#[tokio::test]
async fn entity_arguments_resolve_through_the_lookup() {
    let lookup = StaticLookup {
        entities: vec![EntityRef {
            kind: EntityKind::Member,
            id: 123456789012345678,
            name: "rin".to_string(),
        }],
    };
    let banned = Arc::new(Mutex::new(Vec::new()));
    let banned_in_handler = Arc::clone(&banned);

    let dispatcher = Dispatcher::builder()
        .with_lookup(Arc::new(lookup))
        .command(
            CommandSpec::new(
                "ban",
                handler_fn(move |_ctx, args| {
                    let banned = Arc::clone(&banned_in_handler);
                    async move {
                        let user = args.get("user").and_then(|v| v.as_entity()).unwrap().clone();
                        banned.lock().unwrap().push(user.id);
                        Ok(())
                    }
                }),
            )
            .with_param(ParamSpec::required("user", ArgType::Member)),
        )
        .build()
        .unwrap();

    assert!(matches!(
        dispatcher.dispatch(event("!ban <@!123456789012345678>")).await,
        DispatchOutcome::Succeeded { .. }
    ));
    assert!(matches!(
        dispatcher.dispatch(event("!ban rin")).await,
        DispatchOutcome::Succeeded { .. }
    ));
    assert!(matches!(
        dispatcher.dispatch(event("!ban nobody")).await,
        DispatchOutcome::ArgumentFailed { .. }
    ));
    assert_eq!(
        banned.lock().unwrap().as_slice(),
        [123456789012345678, 123456789012345678]
    );
}

#[tokio::test]
async fn handler_errors_reach_the_observer() {
    #[derive(Default)]
    struct Recorder {
        errors: Mutex<Vec<String>>,
        outcomes: Mutex<Vec<DispatchOutcome>>,
    }

    #[async_trait]
    impl DispatchObserver for Recorder {
        async fn on_outcome(&self, _event: &MessageEvent, outcome: &DispatchOutcome) {
            self.outcomes.lock().unwrap().push(outcome.clone());
        }

        async fn on_handler_error(&self, _ctx: &CommandContext, error: &anyhow::Error) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    let observer = Arc::new(Recorder::default());
    let replier = Arc::new(RecordingReplier::default());
    let dispatcher = Dispatcher::builder()
        .with_observer(Arc::clone(&observer) as Arc<dyn DispatchObserver>)
        .with_replier(Arc::clone(&replier) as Arc<dyn Replier>)
        .command(CommandSpec::new(
            "explode",
            handler_fn(|_ctx, _args| async { anyhow::bail!("database on fire") }),
        ))
        .build()
        .unwrap();

    let outcome = dispatcher.dispatch(event("!explode")).await;
    assert!(matches!(outcome, DispatchOutcome::HandlerFailed { .. }));

    // the invoker sees a generic message, the observer the real error
    assert_eq!(
        replier.replies(),
        ["Something went wrong running `explode`.".to_string()]
    );
    assert_eq!(
        observer.errors.lock().unwrap().as_slice(),
        ["database on fire".to_string()]
    );
    assert_eq!(observer.outcomes.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_command_reporting_is_configurable() {
    let replier = Arc::new(RecordingReplier::default());
    let dispatcher = Dispatcher::builder()
        .with_replier(Arc::clone(&replier) as Arc<dyn Replier>)
        .command(CommandSpec::new(
            "ping",
            handler_fn(|_ctx, _args| async { Ok(()) }),
        ))
        .build()
        .unwrap();

    dispatcher.dispatch(event("!pnig")).await;
    assert_eq!(replier.replies(), ["Unknown command: `pnig`.".to_string()]);

    let silent_replier = Arc::new(RecordingReplier::default());
    let dispatcher = Dispatcher::builder()
        .with_config(EngineConfig {
            report_unknown_commands: false,
            ..EngineConfig::default()
        })
        .with_replier(Arc::clone(&silent_replier) as Arc<dyn Replier>)
        .command(CommandSpec::new(
            "ping",
            handler_fn(|_ctx, _args| async { Ok(()) }),
        ))
        .build()
        .unwrap();

    dispatcher.dispatch(event("!pnig")).await;
    assert!(silent_replier.replies().is_empty());
}

#[tokio::test]
async fn handler_timeout_becomes_a_failure() {
    let dispatcher = Dispatcher::builder()
        .with_config(EngineConfig {
            handler_timeout: Some(Duration::from_millis(20)),
            ..EngineConfig::default()
        })
        .command(CommandSpec::new(
            "slow",
            handler_fn(|_ctx, _args| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            }),
        ))
        .build()
        .unwrap();

    let outcome = dispatcher.dispatch(event("!slow")).await;
    match outcome {
        DispatchOutcome::HandlerFailed { detail, .. } => {
            assert!(detail.contains("timed out"), "detail was: {detail}");
        }
        other => panic!("expected HandlerFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn alias_and_name_hit_the_same_cooldown_bucket() {
    let dispatcher = Dispatcher::builder()
        .command(
            CommandSpec::new("daily", handler_fn(|_ctx, _args| async { Ok(()) }))
                .with_alias("d")
                .with_cooldown(CooldownPolicy::new(1, Duration::from_secs(60))),
        )
        .build()
        .unwrap();

    assert!(matches!(
        dispatcher.dispatch(event("!d")).await,
        DispatchOutcome::Succeeded { .. }
    ));
    // the alias shares the command identity, so this is denied
    assert!(matches!(
        dispatcher.dispatch(event("!daily")).await,
        DispatchOutcome::Denied { .. }
    ));
}

#[tokio::test]
async fn prefix_policy_selects_messages() {
    let dispatcher = Dispatcher::builder()
        .with_prefix(PrefixPolicy::any_of(["?", "parlance "]))
        .command(CommandSpec::new(
            "ping",
            handler_fn(|_ctx, _args| async { Ok(()) }),
        ))
        .build()
        .unwrap();

    assert!(matches!(
        dispatcher.dispatch(event("?ping")).await,
        DispatchOutcome::Succeeded { .. }
    ));
    assert!(matches!(
        dispatcher.dispatch(event("parlance ping")).await,
        DispatchOutcome::Succeeded { .. }
    ));
    assert_eq!(
        dispatcher.dispatch(event("!ping")).await,
        DispatchOutcome::Ignored
    );
}
