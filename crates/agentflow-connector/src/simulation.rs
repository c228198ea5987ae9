//! Scripted stand-in for the backend.
//!
//! Emits ordinary protocol payloads, one per scheduler tick, so simulated
//! runs go through the same decoder and projections as live ones. At most
//! one step timer is pending at a time; `cancel` drops it together with the
//! rest of the script.

use std::collections::VecDeque;
use std::time::Duration;

use serde_json::json;

use agentflow_protocol::{ENTRY_AGENT, STATUS_COMPLETE};

use crate::scheduler::{Scheduler, TimerId, TimerPurpose};

pub struct Simulator {
    step_interval: Duration,
    queue: VecDeque<String>,
    pending: Option<TimerId>,
    emitted: u64,
}

fn progress(source: &str, target: &str, message: &str, progress: u8) -> String {
    json!({
        "type": "progress",
        "source": source,
        "target": target,
        "data": { "message": message, "progress": progress },
    })
    .to_string()
}

fn stream(source: &str, message: &str) -> String {
    json!({ "type": "stream", "source": source, "data": { "message": message } }).to_string()
}

fn complete(agent: &str, message: &str) -> String {
    json!({
        "type": "response",
        "source": agent,
        "target": agent,
        "data": { "message": message, "status": STATUS_COMPLETE },
    })
    .to_string()
}

/// Kickoff-to-finish walk of the construction agency topology.
fn construction_script() -> Vec<String> {
    const ORCH: &str = ENTRY_AGENT;
    vec![
        stream(ORCH, "Reviewing the project brief. "),
        progress(ORCH, "document-agent", "Drafting scope of work", 10),
        stream("document-agent", "Drafting the scope of work"),
        progress(ORCH, "document-agent", "Drafting specifications", 60),
        stream("document-agent", " and technical specifications."),
        complete("document-agent", "Project documents ready"),
        progress("document-agent", "technical-agent", "Validating structural design", 25),
        progress("document-agent", "compliance-agent", "Checking building codes", 20),
        progress("document-agent", "cost-agent", "Estimating material costs", 30),
        progress("document-agent", "technical-agent", "Validating load calculations", 80),
        complete("technical-agent", "Design validated"),
        progress("technical-agent", "compliance-agent", "Reviewing permits", 70),
        complete("compliance-agent", "All permits in order"),
        progress("cost-agent", "cost-agent", "Finalizing budget", 90),
        complete("cost-agent", "Budget approved"),
        progress("compliance-agent", "resource-agent", "Scheduling crews", 40),
        progress("cost-agent", "resource-agent", "Allocating equipment", 85),
        complete("resource-agent", "Resources allocated"),
        stream(ORCH, "The construction plan is ready: documents drafted, "),
        stream(ORCH, "design validated, permits cleared, budget and crews allocated."),
        complete(ORCH, "Project planning complete"),
    ]
}

impl Simulator {
    pub fn new(step_interval: Duration) -> Self {
        Self {
            step_interval,
            queue: VecDeque::new(),
            pending: None,
            emitted: 0,
        }
    }

    pub fn step_interval(&self) -> Duration {
        self.step_interval
    }

    pub fn is_active(&self) -> bool {
        self.pending.is_some()
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Replace any queued script with a full workflow run.
    pub fn begin(&mut self, scheduler: &mut dyn Scheduler) {
        self.cancel(scheduler);
        self.queue.extend(construction_script());
        tracing::info!(steps = self.queue.len(), "Simulated run started");
        self.arm(scheduler);
    }

    /// Queue a short streamed answer to a chat message.
    pub fn reply_to(&mut self, text: &str, scheduler: &mut dyn Scheduler) {
        let summary: String = text.trim().chars().take(60).collect();
        self.queue.push_back(stream(ENTRY_AGENT, "Understood. "));
        self.queue
            .push_back(stream(ENTRY_AGENT, &format!("Looking into \"{summary}\" now.")));
        self.queue.push_back(
            json!({
                "type": "response",
                "source": ENTRY_AGENT,
                "target": "frontend",
                "data": { "message": "reply" },
            })
            .to_string(),
        );
        self.arm(scheduler);
    }

    /// Next payload when `id` is the live step timer; `None` for stale ids.
    pub fn on_timer(&mut self, id: TimerId, scheduler: &mut dyn Scheduler) -> Option<String> {
        if self.pending != Some(id) {
            return None;
        }
        self.pending = None;
        let payload = self.queue.pop_front()?;
        self.emitted += 1;
        self.arm(scheduler);
        Some(payload)
    }

    pub fn cancel(&mut self, scheduler: &mut dyn Scheduler) {
        if let Some(id) = self.pending.take() {
            scheduler.cancel(id);
        }
        if !self.queue.is_empty() {
            tracing::debug!(dropped = self.queue.len(), "Simulated run cancelled");
            self.queue.clear();
        }
    }

    fn arm(&mut self, scheduler: &mut dyn Scheduler) {
        if self.pending.is_none() && !self.queue.is_empty() {
            self.pending = Some(scheduler.schedule(self.step_interval, TimerPurpose::SimulationStep));
        }
    }
}
