//! Milestones: named, instruction-bearing triggers over route progress.
//!
//! The evaluator compares the previous and current progress snapshots against
//! every registered milestone and returns those that fired, in registration
//! order. Each milestone remembers the leg/step it last fired for, so
//! evaluating the same pair twice never fires it twice.
//!
//! # Triggers
//!
//! - [`Trigger::StepReached`]: the current step index changed to the given one
//!   (or to any step when `None`)
//! - [`Trigger::DistanceRemaining`]: step distance remaining dropped to or below
//!   a threshold, at most once per step
//! - [`Trigger::RouteStarted`]: first progress of a route
//! - [`Trigger::Custom`]: caller predicate, at most once per step
//!
//! A trigger or instruction that panics is logged and treated as not met or
//! as the default text. The other milestones are still evaluated.

mod instruction;

pub use instruction::{Instruction, InstructionError, TemplateInstruction};

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::progress::RouteProgress;
use crate::route::RouteIndices;

/// Caller-supplied trigger predicate over `(previous, current)`.
pub type ProgressPredicate = dyn Fn(Option<&RouteProgress>, &RouteProgress) -> bool + Send + Sync;

/// When a milestone fires.
#[derive(Clone)]
pub enum Trigger {
    StepReached { step: Option<usize> },
    DistanceRemaining { meters: f64 },
    RouteStarted,
    Custom(Arc<ProgressPredicate>),
}

impl Trigger {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(Option<&RouteProgress>, &RouteProgress) -> bool + Send + Sync + 'static,
    {
        Trigger::Custom(Arc::new(predicate))
    }

    fn is_met(&self, previous: Option<&RouteProgress>, current: &RouteProgress) -> bool {
        match self {
            Trigger::StepReached { step } => {
                let Some(previous) = previous else {
                    return false;
                };
                previous.indices != current.indices
                    && step.map_or(true, |s| s == current.step_index())
            }
            Trigger::DistanceRemaining { meters } => {
                let remaining = current.step_progress.distance_remaining;
                let was_above = match previous {
                    Some(p) if p.indices == current.indices => {
                        p.step_progress.distance_remaining > *meters
                    }
                    // A new step (or a new route) starts out above the threshold.
                    _ => true,
                };
                was_above && remaining <= *meters
            }
            Trigger::RouteStarted => previous.is_none(),
            Trigger::Custom(predicate) => predicate(previous, current),
        }
    }
}

impl fmt::Debug for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::StepReached { step } => f.debug_struct("StepReached").field("step", step).finish(),
            Trigger::DistanceRemaining { meters } => f
                .debug_struct("DistanceRemaining")
                .field("meters", meters)
                .finish(),
            Trigger::RouteStarted => write!(f, "RouteStarted"),
            Trigger::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

/// A registered milestone.
#[derive(Clone)]
pub struct Milestone {
    identifier: u32,
    trigger: Trigger,
    instruction: Option<Arc<dyn Instruction>>,
    default_instruction: String,
    fired_for: Option<RouteIndices>,
}

impl Milestone {
    pub fn new(identifier: u32, trigger: Trigger) -> Self {
        Self {
            identifier,
            trigger,
            instruction: None,
            default_instruction: String::new(),
            fired_for: None,
        }
    }

    pub fn with_instruction(mut self, instruction: impl Instruction + 'static) -> Self {
        self.instruction = Some(Arc::new(instruction));
        self
    }

    /// Shorthand for a [`TemplateInstruction`].
    pub fn with_template(self, template: impl Into<String>) -> Self {
        self.with_instruction(TemplateInstruction::new(template))
    }

    /// Text used when there is no instruction or it fails to render.
    pub fn with_default_instruction(mut self, text: impl Into<String>) -> Self {
        self.default_instruction = text.into();
        self
    }

    pub fn identifier(&self) -> u32 {
        self.identifier
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    /// Check the trigger and record the firing.
    fn fire(&mut self, previous: Option<&RouteProgress>, current: &RouteProgress) -> bool {
        if self.fired_for == Some(current.indices) {
            return false;
        }
        let met = panic::catch_unwind(AssertUnwindSafe(|| self.trigger.is_met(previous, current)));
        match met {
            Ok(true) => {}
            Ok(false) => return false,
            Err(_) => {
                tracing::warn!(milestone = self.identifier, "Milestone trigger panicked, skipping");
                return false;
            }
        }
        self.fired_for = Some(current.indices);
        true
    }

    fn render(&self, current: &RouteProgress) -> String {
        let Some(instruction) = &self.instruction else {
            return self.default_instruction.clone();
        };
        match panic::catch_unwind(AssertUnwindSafe(|| instruction.render(current))) {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                tracing::warn!(
                    milestone = self.identifier,
                    error = %e,
                    "Milestone instruction failed to render, using default"
                );
                self.default_instruction.clone()
            }
            Err(_) => {
                tracing::warn!(
                    milestone = self.identifier,
                    "Milestone instruction panicked, using default"
                );
                self.default_instruction.clone()
            }
        }
    }
}

impl fmt::Debug for Milestone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Milestone")
            .field("identifier", &self.identifier)
            .field("trigger", &self.trigger)
            .field("has_instruction", &self.instruction.is_some())
            .field("default_instruction", &self.default_instruction)
            .field("fired_for", &self.fired_for)
            .finish()
    }
}

/// A milestone that fired for the current sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredMilestone {
    pub identifier: u32,
    pub instruction: String,
}

/// Evaluates registered milestones against consecutive progress snapshots.
#[derive(Debug, Clone, Default)]
pub struct MilestoneEvaluator {
    milestones: Vec<Milestone>,
}

impl MilestoneEvaluator {
    pub fn new(milestones: Vec<Milestone>) -> Self {
        Self { milestones }
    }

    pub fn register(&mut self, milestone: Milestone) {
        self.milestones.push(milestone);
    }

    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    /// Milestones that fired between `previous` and `current`, in
    /// registration order.
    pub fn evaluate(
        &mut self,
        previous: Option<&RouteProgress>,
        current: &RouteProgress,
    ) -> Vec<FiredMilestone> {
        let mut fired = Vec::new();
        for milestone in &mut self.milestones {
            if milestone.fire(previous, current) {
                fired.push(FiredMilestone {
                    identifier: milestone.identifier,
                    instruction: milestone.render(current),
                });
            }
        }
        if !fired.is_empty() {
            tracing::debug!(
                count = fired.len(),
                leg = current.leg_index(),
                step = current.step_index(),
                "Milestones fired"
            );
        }
        fired
    }

    /// Forget which steps each milestone fired for (new route).
    pub fn reset(&mut self) {
        for milestone in &mut self.milestones {
            milestone.fired_for = None;
        }
    }
}
