// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::bus::{LocalBus, LocalBusHandle, MatchType};
use crate::config::{ReactorConfig, WorkerConfig};
use crate::errors::{ClientError, ProcessorError};
use crate::message::{msg_pack, Message};
use crate::runtime::{Client, EventDrivenProcessor, Processor};
use crate::traits::BusHandle;

/// End-to-end request/reply scenarios over the in-memory bus
#[cfg(test)]
mod tests {
    use super::*;

    const NAMESPACE: &str = "demo";
    const TIMEOUT: Duration = Duration::from_secs(2);

    struct Harness {
        bus: LocalBus,
        /// Listens from before `init`, so it sees everything the service publishes.
        observer: LocalBusHandle,
        service: Arc<EventDrivenProcessor>,
        client: Client,
        runner: Option<JoinHandle<Result<(), ProcessorError>>>,
    }

    impl Harness {
        fn start(
            setup: impl FnOnce(&Processor),
            workers: &[WorkerConfig],
            reactors: &[ReactorConfig],
        ) -> Self {
            let bus = LocalBus::new();
            let observer = bus.handle(true);
            let processor = Processor::new();
            setup(&processor);

            let service = EventDrivenProcessor::new(NAMESPACE, processor, Arc::new(bus.clone()))
                .with_poll_interval(Duration::from_millis(10));
            service.init(workers, reactors).unwrap();
            let service = Arc::new(service);

            let runner = Arc::clone(&service);
            let runner = std::thread::spawn(move || runner.run());
            let client = Client::connect(NAMESPACE, Arc::new(bus.clone())).unwrap();

            Self {
                bus,
                observer,
                service,
                client,
                runner: Some(runner),
            }
        }

        fn processor(&self) -> &Processor {
            self.service.processor()
        }

        fn send(&self, message: &Message) -> Result<Value, ClientError> {
            self.client.send_sync(message, TIMEOUT)
        }

        fn observe(&mut self, tag: &str) -> Value {
            self.observer
                .get_event(TIMEOUT, tag, MatchType::StartsWith)
                .unwrap()
                .unwrap_or_else(|| panic!("nothing published on {}", tag))
                .data
        }
    }

    impl Drop for Harness {
        fn drop(&mut self) {
            self.service.close();
            if let Some(runner) = self.runner.take() {
                let _ = runner.join();
            }
        }
    }

    fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + TIMEOUT;
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    fn pack(args: Vec<Value>, kwargs: Vec<(&str, Value)>) -> Message {
        msg_pack(args, kwargs)
    }

    fn register_echo(processor: &Processor) {
        processor
            .hooks()
            .register_handler("echo", |call| Ok(Value::Object(call.kwargs().clone())));
    }

    #[test]
    fn simple_round_trip() {
        let harness = Harness::start(register_echo, &[], &[]);

        let reply = harness
            .send(&pack(
                vec![],
                vec![("_handler", json!("echo")), ("x", json!(1)), ("y", json!(2))],
            ))
            .unwrap();

        assert_eq!(reply, json!({ "x": 1, "y": 2 }));
    }

    #[test]
    fn reply_tag_carries_the_request_correlation_id() {
        let mut harness = Harness::start(register_echo, &[], &[]);

        let id = harness
            .client
            .send_async(&pack(vec![], vec![("_handler", json!("echo"))]))
            .unwrap();
        let reply = harness
            .observer
            .get_event(TIMEOUT, &format!("{}/res/", NAMESPACE), MatchType::StartsWith)
            .unwrap()
            .unwrap();

        assert_eq!(reply.tag, format!("demo/res/{}", id));
        assert_eq!(harness.client.recv_reply(&id, TIMEOUT).unwrap(), json!({}));
    }

    #[test]
    fn handler_error_reaches_the_client() {
        let harness = Harness::start(
            |processor| {
                processor
                    .hooks()
                    .register_handler("boom", |_| Err(ProcessorError::handler("nope")));
            },
            &[],
            &[],
        );

        match harness.send(&pack(vec![], vec![("_handler", json!("boom"))])) {
            Err(ClientError::Handler { message, detail }) => {
                assert_eq!(message, "nope");
                assert!(detail.is_none());
            }
            other => panic!("expected handler error, got {:?}", other),
        }
    }

    #[test]
    fn validator_rejection_is_replied() {
        let harness = Harness::start(
            |processor| {
                register_echo(processor);
                processor.hooks().register_validator("must_have_x", |call| {
                    Ok(if call.kwarg("x").is_some() {
                        Value::Null
                    } else {
                        json!("x missing")
                    })
                });
            },
            &[],
            &[],
        );
        let route = || {
            vec![
                ("_workflow", json!("extended")),
                ("_validator", json!("must_have_x")),
                ("_handler", json!("echo")),
            ]
        };

        match harness.send(&pack(vec![], route())) {
            Err(ClientError::Handler { message, .. }) => assert_eq!(message, "x missing"),
            other => panic!("expected rejection, got {:?}", other),
        }

        let mut accepted = route();
        accepted.push(("x", json!(5)));
        assert_eq!(harness.send(&pack(vec![], accepted)).unwrap(), json!({ "x": 5 }));
    }

    #[test]
    fn worker_enqueue_replay_and_management() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&counter);
        let harness = Harness::start(
            move |processor| {
                processor.hooks().register_handler("count", move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(Value::Null)
                });
            },
            &[],
            &[],
        );
        let manage = |words: &[&str], kwargs: Vec<(&str, Value)>| {
            let mut kwargs = kwargs;
            kwargs.push(("_workflow", json!("manage")));
            harness.send(&pack(words.iter().map(|w| json!(w)).collect(), kwargs))
        };

        let created = manage(&["worker", "create"], vec![("name", json!("W")), ("loop", json!(0.01))]).unwrap();
        assert_eq!(created, json!({ "values": { "created": "W", "started": false } }));

        let enqueue = pack(
            vec![],
            vec![("_handler", json!("count")), ("_worker", json!("dedicated?enqueue=W"))],
        );
        assert_eq!(harness.send(&enqueue).unwrap(), json!({ "enqueued": ["W"] }));
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(counter.load(Ordering::SeqCst), 0, "stopped worker must not run");

        assert_eq!(manage(&["worker", "start", "W"], vec![]).unwrap(), json!({ "values": ["W"] }));
        std::thread::sleep(Duration::from_millis(100));
        assert!(counter.load(Ordering::SeqCst) >= 1);

        let listed = manage(&["worker", "list", "*"], vec![]).unwrap();
        assert_eq!(listed, json!({ "values": ["W"] }));

        let dequeue = pack(
            vec![],
            vec![("_handler", json!("count")), ("_worker", json!("dedicated?dequeue=W"))],
        );
        assert_eq!(harness.send(&dequeue).unwrap(), json!({ "dequeued": ["W"] }));

        // One pass may still be in flight when the dequeue lands.
        std::thread::sleep(Duration::from_millis(30));
        let settled = counter.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(counter.load(Ordering::SeqCst), settled);

        let shown = manage(&["worker", "show", "W"], vec![]).unwrap();
        assert_eq!(shown["values"]["W"]["messages"], json!([]));

        assert_eq!(manage(&["worker", "kill", "W"], vec![]).unwrap(), json!({ "values": ["W"] }));
        assert!(harness.processor().workers().is_empty());
    }

    #[test]
    fn client_times_out_on_a_slow_handler() {
        let mut harness = Harness::start(
            |processor| {
                processor.hooks().register_handler("sleep", |_| {
                    std::thread::sleep(Duration::from_millis(500));
                    Ok(json!("awake"))
                });
            },
            &[],
            &[],
        );

        let started = Instant::now();
        let outcome = harness
            .client
            .send_sync(&pack(vec![], vec![("_handler", json!("sleep"))]), Duration::from_millis(100));
        let elapsed = started.elapsed();

        assert!(matches!(outcome, Err(ClientError::Timeout { .. })), "{:?}", outcome);
        assert!(elapsed < Duration::from_millis(400), "timed out after {:?}", elapsed);
        assert_eq!(harness.client.pending(), 0);

        // The service still answers, into the void.
        assert_eq!(harness.observe("demo/res/"), json!("awake"));
    }

    #[test]
    fn configured_workers_start_with_the_service() {
        let counter = Arc::new(AtomicUsize::new(0));
        let hits = Arc::clone(&counter);
        let oneshot = WorkerConfig {
            name: "oneshot".to_string(),
            loop_seconds: Some(0.01),
            suppress_exceptions: true,
            kill_upon_success: true,
            messages: vec![Message::builder().handler("tick").build()],
        };
        let harness = Harness::start(
            move |processor| {
                processor.hooks().register_handler("tick", move |_| {
                    hits.fetch_add(1, Ordering::SeqCst);
                    Ok(json!("ok"))
                });
            },
            &[oneshot],
            &[],
        );

        assert!(wait_for(|| harness.processor().workers().get("oneshot").is_none()));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn fatal_worker_failures_are_published() {
        let fragile = WorkerConfig {
            name: "fragile".to_string(),
            loop_seconds: Some(0.01),
            suppress_exceptions: false,
            kill_upon_success: false,
            messages: vec![Message::builder().handler("boom").build()],
        };
        let mut harness = Harness::start(
            |processor| {
                processor
                    .hooks()
                    .register_handler("boom", |_| Err(ProcessorError::handler("nope")));
            },
            &[fragile],
            &[],
        );

        assert_eq!(
            harness.observe("system/service/demo/failed"),
            json!({ "worker": "fragile", "error": "nope" })
        );
        assert!(wait_for(|| harness.processor().workers().get("fragile").is_none()));
    }

    #[test]
    fn reactors_dispatch_follow_up_messages() {
        let notified = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notified);
        let low_voltage = ReactorConfig {
            name: "low_voltage".to_string(),
            handler: Some("read_voltage".to_string()),
            condition: Some("$volts < 11.5".to_string()),
            actions: vec![json!({ "handler": "notify", "kwargs": { "volts": "$volts" } })],
        };
        let harness = Harness::start(
            move |processor| {
                processor
                    .hooks()
                    .register_handler("read_voltage", |call| Ok(json!({ "volts": call.kwarg("v").cloned() })));
                processor.hooks().register_handler("notify", move |call| {
                    sink.lock().push(call.kwarg("volts").cloned());
                    Ok(Value::Null)
                });
            },
            &[],
            &[low_voltage],
        );

        for volts in [12.4, 11.2] {
            harness
                .send(&pack(vec![], vec![("_handler", json!("read_voltage")), ("v", json!(volts))]))
                .unwrap();
        }

        assert_eq!(*notified.lock(), vec![Some(json!(11.2))]);
        let shown = harness
            .send(&pack(vec![json!("reactor"), json!("show")], vec![("_workflow", json!("manage"))]))
            .unwrap();
        assert_eq!(shown["values"]["low_voltage"]["fired"], json!(1));
    }

    #[test]
    fn unknown_management_command_is_an_error_reply() {
        let harness = Harness::start(|_| {}, &[], &[]);
        match harness.send(&pack(vec![json!("reboot")], vec![("_workflow", json!("manage"))])) {
            Err(ClientError::Handler { message, .. }) => {
                assert_eq!(message, "invalid or unknown command: reboot")
            }
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn raw_bus_requests_without_a_client_are_answered() {
        let mut harness = Harness::start(register_echo, &[], &[]);

        harness
            .bus
            .handle(false)
            .fire_event(&json!({ "handler": "echo", "kwargs": { "k": "v" } }), "demo/req/manual-1")
            .unwrap();

        assert_eq!(harness.observe("demo/res/manual-1"), json!({ "k": "v" }));
    }
}
