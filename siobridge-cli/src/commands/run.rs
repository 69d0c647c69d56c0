//! Scenario Runner
//!
//! Drives the reference Socket.IO scenario with a number of virtual users,
//! each on its own thread with its own module instance, and tallies checks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use serde_json::{json, Value};
use siobridge_core::network::encode_binary;
use siobridge_core::{ModuleInstance, RootModule};
use tracing::{debug, info_span};

use crate::config::CliConfig;
use crate::display;

/// Load shape of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub vus: u32,
    pub iterations: u32,
    /// Pause between `loop` emits; the pre-disconnect wait is four times this.
    pub pause: Duration,
}

/// Pass/fail tally per check, in first-seen order.
#[derive(Debug, Default)]
pub struct Checks {
    results: Vec<(String, u64, u64)>,
}

impl Checks {
    /// Records one outcome and returns it.
    pub fn record(&mut self, name: &str, ok: bool) -> bool {
        let idx = match self.results.iter().position(|(n, _, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.results.push((name.to_string(), 0, 0));
                self.results.len() - 1
            }
        };
        let entry = &mut self.results[idx];
        if ok {
            entry.1 += 1;
        } else {
            entry.2 += 1;
        }
        ok
    }

    /// Folds another tally into this one.
    pub fn merge(&mut self, other: Checks) {
        for (name, passed, failed) in other.results {
            for _ in 0..passed {
                self.record(&name, true);
            }
            for _ in 0..failed {
                self.record(&name, false);
            }
        }
    }

    pub fn passed(&self) -> u64 {
        self.results.iter().map(|(_, p, _)| p).sum()
    }

    pub fn failed(&self) -> u64 {
        self.results.iter().map(|(_, _, f)| f).sum()
    }

    fn print(&self) {
        for (name, passed, failed) in &self.results {
            display::check_row(name, *passed, *failed);
        }
    }
}

/// Runs the scenario and prints the summary. Fails if any check failed.
pub fn run(config: &CliConfig, options: &RunOptions) -> Result<()> {
    if options.vus == 0 || options.iterations == 0 {
        bail!("--vus and --iterations must be at least 1");
    }

    let module = RootModule::new(config.bridge_config());
    display::info(&format!(
        "Running {} VU(s) x {} iteration(s) against {}",
        options.vus, options.iterations, config.url
    ));
    let started = Instant::now();

    let results: Vec<Checks> = thread::scope(|scope| {
        let handles: Vec<_> = (0..options.vus)
            .map(|_| {
                let mut instance = module.new_instance();
                scope.spawn(move || run_vu(&mut instance, config, options))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    let mut checks = Checks::default();
                    checks.record("vu completed", false);
                    checks
                })
            })
            .collect()
    });

    let mut summary = Checks::default();
    for checks in results {
        summary.merge(checks);
    }

    println!();
    summary.print();
    println!();

    let failed = summary.failed();
    let total = summary.passed() + failed;
    if failed > 0 {
        bail!("{} of {} checks failed", failed, total);
    }
    display::success(&format!(
        "{} checks passed in {:.2?}",
        total,
        started.elapsed()
    ));
    Ok(())
}

fn run_vu(instance: &mut ModuleInstance, config: &CliConfig, options: &RunOptions) -> Checks {
    let mut checks = Checks::default();
    let responses = Arc::new(AtomicU64::new(0));
    let counter = responses.clone();
    instance.on("test_response", move |_args| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    for iteration in 0..options.iterations {
        let span = info_span!("iteration", vu = instance.vu_id(), iteration);
        let _entered = span.enter();
        let before = responses.load(Ordering::Relaxed);

        if !scenario(instance, config, options, &mut checks) {
            continue;
        }
        checks.record(
            "test_response received",
            responses.load(Ordering::Relaxed) > before,
        );
    }
    checks
}

/// One iteration. Returns false if it could not connect.
fn scenario(
    instance: &mut ModuleInstance,
    config: &CliConfig,
    options: &RunOptions,
    checks: &mut Checks,
) -> bool {
    if let Err(e) = instance.connect(&config.url) {
        display::warning(&format!("VU {} connect failed: {}", instance.vu_id(), e));
        checks.record("connect", false);
        return false;
    }
    checks.record("connect", true);

    let emits = [
        ("emit test event", "test", json!({ "bool": true, "test": "success" })),
        ("emit ping event", "ping", json!({ "timestamp": now_ms() })),
        ("emit message event", "message", json!("Hello from k6!")),
        ("emit number event", "number", json!(42)),
        (
            "emit complex event",
            "complex",
            json!({ "arr": [1, 2, 3], "obj": { "foo": "bar" }, "flag": false }),
        ),
        (
            "emit binary event",
            "binary",
            json!({ "data": encode_binary(b"Hello Binary!") }),
        ),
    ];
    for (check, event, data) in emits {
        checks.record(check, instance.emit(event, data).is_ok());
    }

    for idx in 0..5 {
        let sent = instance
            .emit("loop", json!({ "idx": idx, "time": now_ms() }))
            .is_ok();
        checks.record(&format!("emit loop event #{}", idx), sent);
        thread::sleep(options.pause);
    }

    let ack = instance.emit_with_ack("ackevent", json!({ "foo": "bar" }), None);
    debug!(ack = %ack, "ackResult");
    checks.record("ack callback received", !ack.is_null());
    checks.record(
        "ack result success",
        ack.get("success") == Some(&Value::Bool(true)),
    );

    thread::sleep(options.pause * 4);

    checks.record("disconnect", instance.disconnect().is_ok());
    true
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    // INLINE_TEST_REQUIRED: binary crate has no library target for tests/ to import
    use super::*;

    #[test]
    fn test_checks_tally_in_first_seen_order() {
        let mut checks = Checks::default();
        checks.record("connect", true);
        checks.record("ack", false);
        checks.record("connect", true);

        assert_eq!(checks.passed(), 2);
        assert_eq!(checks.failed(), 1);
        assert_eq!(checks.results[0], ("connect".to_string(), 2, 0));
        assert_eq!(checks.results[1], ("ack".to_string(), 0, 1));
    }

    #[test]
    fn test_checks_merge() {
        let mut a = Checks::default();
        a.record("connect", true);
        let mut b = Checks::default();
        b.record("connect", false);
        b.record("disconnect", true);

        a.merge(b);

        assert_eq!(a.results.len(), 2);
        assert_eq!(a.results[0], ("connect".to_string(), 1, 1));
        assert_eq!(a.passed(), 2);
    }

    #[test]
    fn test_run_rejects_zero_vus() {
        let config = CliConfig {
            url: "ws://localhost:4000".into(),
            connect_timeout_ms: None,
            ack_timeout_ms: None,
        };
        let options = RunOptions {
            vus: 0,
            iterations: 1,
            pause: Duration::ZERO,
        };
        assert!(run(&config, &options).is_err());
    }
}
