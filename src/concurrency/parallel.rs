//! Parallel Scheduler
//!
//! Each step runs on its own task; merging always happens in input-declared
//! order regardless of completion order, so the aggregate is deterministic
//! no matter how the scheduler interleaves work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use crate::command_result::CommandResult;
use crate::context::ExecutionContext;
use crate::ir::IrNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParallelMode {
    /// Stop scheduling new steps on first failure; steps already running
    /// finish on their own.
    FailFast,
    /// Cancel every running step as soon as one fails.
    Immediate,
    /// Run every step to completion regardless of outcome.
    All,
}

impl ParallelMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "fail-fast" => Some(Self::FailFast),
            "immediate" => Some(Self::Immediate),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

/// N = min(user-supplied concurrency, step count, NumCPU); the default
/// user concurrency is `2 * NumCPU` capped at 50.
pub fn effective_concurrency(user_concurrency: Option<usize>, num_steps: usize, num_cpus: usize) -> usize {
    let user = user_concurrency.unwrap_or_else(|| (2 * num_cpus).min(50));
    user.min(num_steps).min(num_cpus).max(1)
}

pub async fn run(ctx: &ExecutionContext, mode: ParallelMode, concurrency: Option<usize>, steps: &[IrNode]) -> CommandResult {
    if steps.is_empty() {
        return CommandResult::success("");
    }

    let num_cpus = ctx.system_info().num_cpus;
    let limit = effective_concurrency(concurrency, steps.len(), num_cpus);
    let semaphore = Arc::new(Semaphore::new(limit));
    let (child_ctx, child_cancel) = ctx.derive_with_cancel();
    let stop_scheduling = Arc::new(AtomicBool::new(false));
    // The exit code of the task that actually triggered fail-fast/immediate
    // stop, as opposed to a sibling that merely got cancelled afterward.
    // First writer wins: later failures racing in don't overwrite it.
    let trigger_exit: Arc<Mutex<Option<i32>>> = Arc::new(Mutex::new(None));

    let mut handles = Vec::with_capacity(steps.len());
    for (index, step) in steps.iter().cloned().enumerate() {
        let semaphore = semaphore.clone();
        let task_ctx = child_ctx.clone();
        let stop_scheduling = stop_scheduling.clone();
        let task_cancel = child_cancel.clone();
        let trigger_exit = trigger_exit.clone();
        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire().await {
                Ok(permit) => permit,
                Err(_) => return (index, CommandResult::new(124, "", "")),
            };
            if stop_scheduling.load(Ordering::Acquire) || task_ctx.is_cancelled() {
                return (index, CommandResult::new(124, "", ""));
            }
            let result = match crate::evaluator::evaluate(&task_ctx, &step).await {
                Ok(r) => r,
                Err(e) => CommandResult::failure(1, e.to_string()),
            };
            if result.exit_code != 0 {
                match mode {
                    ParallelMode::FailFast => {
                        let mut trigger = trigger_exit.lock().unwrap();
                        if trigger.is_none() {
                            *trigger = Some(result.exit_code);
                        }
                        stop_scheduling.store(true, Ordering::Release);
                    }
                    ParallelMode::Immediate => {
                        let mut trigger = trigger_exit.lock().unwrap();
                        if trigger.is_none() {
                            *trigger = Some(result.exit_code);
                        }
                        drop(trigger);
                        task_cancel.cancel();
                    }
                    ParallelMode::All => {}
                }
            }
            (index, result)
        }));
    }

    let mut results: Vec<Option<CommandResult>> = (0..steps.len()).map(|_| None).collect();
    for handle in handles {
        if let Ok((index, result)) = handle.await {
            results[index] = Some(result);
        }
    }

    let mut stdout = String::new();
    let mut stderr = String::new();
    for result in results.iter().flatten() {
        stdout.push_str(&result.stdout);
        stderr.push_str(&result.stderr);
    }

    let aggregate = match mode {
        ParallelMode::FailFast | ParallelMode::Immediate => {
            trigger_exit.lock().unwrap().unwrap_or(0)
        }
        ParallelMode::All => results
            .iter()
            .flatten()
            .find(|r| r.exit_code != 0)
            .map(|r| r.exit_code)
            .unwrap_or(0),
    };

    CommandResult::new(aggregate, stdout, stderr)
}
