//! Milestone instructions.
//!
//! An [`Instruction`] turns the current progress into the text announced when
//! a milestone fires. [`TemplateInstruction`] covers the common case with
//! `{placeholder}` substitution:
//!
//! | Placeholder | Value |
//! |---|---|
//! | `{step_distance_remaining}` | meters left in the step, rounded |
//! | `{leg_distance_remaining}` | meters left in the leg, rounded |
//! | `{route_distance_remaining}` | meters left in the route, rounded |
//! | `{duration_remaining}` | seconds left in the route, rounded |
//! | `{fraction_traveled}` | percent of the route travelled, rounded |
//! | `{step_index}` / `{leg_index}` | current indices |
//! | `{instruction}` | upcoming maneuver instruction (current one on the last step) |
//!
//! `{{` and `}}` produce literal braces.

use thiserror::Error;

use crate::progress::RouteProgress;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstructionError {
    #[error("unknown placeholder '{0}'")]
    UnknownPlaceholder(String),

    #[error("unclosed placeholder starting at byte {0}")]
    Unclosed(usize),

    #[error("no step available for '{{instruction}}'")]
    MissingStep,

    #[error("{0}")]
    Custom(String),
}

/// Renders milestone text for a progress snapshot.
pub trait Instruction: Send + Sync {
    fn render(&self, progress: &RouteProgress) -> Result<String, InstructionError>;
}

impl<F> Instruction for F
where
    F: Fn(&RouteProgress) -> Result<String, InstructionError> + Send + Sync,
{
    fn render(&self, progress: &RouteProgress) -> Result<String, InstructionError> {
        self(progress)
    }
}

/// `{placeholder}` template rendered against the current progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateInstruction {
    template: String,
}

impl TemplateInstruction {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Instruction for TemplateInstruction {
    fn render(&self, progress: &RouteProgress) -> Result<String, InstructionError> {
        let template = self.template.as_str();
        let mut out = String::with_capacity(template.len() + 16);
        let mut rest = template;

        while let Some(pos) = rest.find(['{', '}']) {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];

            if tail.starts_with("{{") {
                out.push('{');
                rest = &tail[2..];
            } else if tail.starts_with("}}") {
                out.push('}');
                rest = &tail[2..];
            } else if tail.starts_with('}') {
                out.push('}');
                rest = &tail[1..];
            } else {
                let offset = template.len() - tail.len();
                let close = tail.find('}').ok_or(InstructionError::Unclosed(offset))?;
                out.push_str(&placeholder(&tail[1..close], progress)?);
                rest = &tail[close + 1..];
            }
        }
        out.push_str(rest);
        Ok(out)
    }
}

fn placeholder(name: &str, progress: &RouteProgress) -> Result<String, InstructionError> {
    let value = match name {
        "step_distance_remaining" => format!("{:.0}", progress.step_progress.distance_remaining),
        "leg_distance_remaining" => format!("{:.0}", progress.leg_progress.distance_remaining),
        "route_distance_remaining" => format!("{:.0}", progress.distance_remaining),
        "duration_remaining" => format!("{:.0}", progress.duration_remaining),
        "fraction_traveled" => format!("{:.0}", progress.fraction_traveled * 100.0),
        "step_index" => progress.step_index().to_string(),
        "leg_index" => progress.leg_index().to_string(),
        "instruction" => progress
            .upcoming_step()
            .or_else(|| progress.current_step())
            .map(|step| step.maneuver.instruction.clone())
            .ok_or(InstructionError::MissingStep)?,
        other => return Err(InstructionError::UnknownPlaceholder(other.to_string())),
    };
    Ok(value)
}
