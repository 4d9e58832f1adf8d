//! Routines - resumable action sequences
//!
//! A routine is an explicit state machine standing in for an action
//! generator. The driver (the registry, or a test tracer) calls
//! [`Routine::resume`] with the outcome of the previous step and receives the
//! next [`Step`] to carry out, until the routine completes or fails.
//!
//! The driver contract:
//!
//! | Step | Driver does | Resumes with |
//! |------|-------------|--------------|
//! | `Yield(action)` with a control for `action.kind` | runs the control | `Value(ok)` / `Error(err)` |
//! | `Yield(action)` without a control | applies the reducer | `Value(Null)` |
//! | `Delegate(routine)` | drives the sub-routine | its completion `Value` / failure `Error` |
//! | `Select { .. }` | evaluates the selector on current state | `Value(result)` |
//! | `Invalidate { .. }` | drops cached resolutions | `Value(Null)` |
//! | `Complete(v)` / `Fail(e)` | stops | - |

use crate::action::Action;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;

/// Input handed to a routine when it is resumed
#[derive(Debug, Clone, PartialEq)]
pub enum Resume {
    /// First resumption
    Start,
    /// Result of the previous step
    Value(Value),
    /// The previous step failed (a control rejected, or a sub-routine failed)
    Error(Value),
}

/// Effect requested by a routine
pub enum Step {
    /// Hand an action to the driver (control or reducer)
    Yield(Action),
    /// Run another routine to completion and resume with its result
    Delegate(Box<dyn Routine>),
    /// Read a selector of the same store
    Select {
        /// Selector name
        selector: String,
        /// Selector arguments
        args: Vec<Value>,
    },
    /// Forget every cached resolution of a selector
    Invalidate {
        /// Selector name
        selector: String,
    },
    /// The routine returned a value
    Complete(Value),
    /// The routine threw an error it did not handle
    Fail(Value),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yield(action) => f.debug_tuple("Step::Yield").field(action).finish(),
            Self::Delegate(_) => write!(f, "Step::Delegate(<routine>)"),
            Self::Select { selector, args } => f
                .debug_struct("Step::Select")
                .field("selector", selector)
                .field("args", args)
                .finish(),
            Self::Invalidate { selector } => f
                .debug_struct("Step::Invalidate")
                .field("selector", selector)
                .finish(),
            Self::Complete(value) => f.debug_tuple("Step::Complete").field(value).finish(),
            Self::Fail(error) => f.debug_tuple("Step::Fail").field(error).finish(),
        }
    }
}

/// A resumable action sequence
pub trait Routine: Send {
    /// Advance the routine with the outcome of its previous step
    fn resume(&mut self, input: Resume) -> Step;
}

/// Routine that yields `steps` in order and completes with the value the
/// last step resumed it with. An error from any step is rethrown.
#[must_use]
pub fn sequence(steps: Vec<Step>) -> Box<dyn Routine> {
    Box::new(Sequence {
        steps: steps.into(),
    })
}

struct Sequence {
    steps: VecDeque<Step>,
}

impl Routine for Sequence {
    fn resume(&mut self, input: Resume) -> Step {
        let last = match input {
            Resume::Start => Value::Null,
            Resume::Value(value) => value,
            Resume::Error(error) => {
                self.steps.clear();
                return Step::Fail(error);
            },
        };

        self.steps.pop_front().unwrap_or(Step::Complete(last))
    }
}

/// Routine that reads `selector` and passes the result to `then`.
///
/// When `then` returns a routine it is delegated to and its result becomes
/// this routine's result; otherwise the routine completes with `null`.
/// This is the shape of most resolvers: "if the data is not in state yet,
/// fetch it".
pub fn select_then<F>(selector: impl Into<String>, args: Vec<Value>, then: F) -> Box<dyn Routine>
where
    F: FnOnce(Value) -> Option<Box<dyn Routine>> + Send + 'static,
{
    Box::new(SelectThen {
        phase: SelectThenPhase::Idle {
            selector: selector.into(),
            args,
            then: Box::new(then),
        },
    })
}

type Continuation = Box<dyn FnOnce(Value) -> Option<Box<dyn Routine>> + Send>;

struct SelectThen {
    phase: SelectThenPhase,
}

enum SelectThenPhase {
    Idle {
        selector: String,
        args: Vec<Value>,
        then: Continuation,
    },
    Selecting(Continuation),
    Delegating,
    Done,
}

impl Routine for SelectThen {
    fn resume(&mut self, input: Resume) -> Step {
        let input = match input {
            Resume::Error(error) => {
                self.phase = SelectThenPhase::Done;
                return Step::Fail(error);
            },
            Resume::Start => Value::Null,
            Resume::Value(value) => value,
        };

        match std::mem::replace(&mut self.phase, SelectThenPhase::Done) {
            SelectThenPhase::Idle {
                selector,
                args,
                then,
            } => {
                self.phase = SelectThenPhase::Selecting(then);
                Step::Select { selector, args }
            },
            SelectThenPhase::Selecting(then) => match then(input) {
                Some(routine) => {
                    self.phase = SelectThenPhase::Delegating;
                    Step::Delegate(routine)
                },
                None => Step::Complete(Value::Null),
            },
            SelectThenPhase::Delegating | SelectThenPhase::Done => Step::Complete(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kind(step: &Step) -> String {
        match step {
            Step::Yield(action) => action.kind.clone(),
            Step::Delegate(_) => "<delegate>".to_string(),
            Step::Select { selector, .. } => format!("<select {selector}>"),
            Step::Invalidate { selector } => format!("<invalidate {selector}>"),
            Step::Complete(_) => "<complete>".to_string(),
            Step::Fail(_) => "<fail>".to_string(),
        }
    }

    #[test]
    fn sequence_yields_in_order_then_completes() {
        let mut routine = sequence(vec![
            Step::Yield(Action::bare("RESET_ALERTS")),
            Step::Invalidate {
                selector: "getAlerts".to_string(),
            },
        ]);

        assert_eq!(kind(&routine.resume(Resume::Start)), "RESET_ALERTS");
        assert_eq!(
            kind(&routine.resume(Resume::Value(Value::Null))),
            "<invalidate getAlerts>"
        );
        assert!(matches!(
            routine.resume(Resume::Value(json!(7))),
            Step::Complete(v) if v == json!(7)
        ));
    }

    #[test]
    fn sequence_rethrows_errors() {
        let mut routine = sequence(vec![Step::Yield(Action::bare("A")), Step::Yield(Action::bare("B"))]);
        let _ = routine.resume(Resume::Start);

        assert!(matches!(
            routine.resume(Resume::Error(json!({ "code": "x" }))),
            Step::Fail(e) if e == json!({ "code": "x" })
        ));
    }

    #[test]
    fn select_then_skips_when_data_present() {
        let mut routine = select_then("getAuthentication", vec![], |current| {
            if current.is_null() {
                Some(sequence(vec![Step::Yield(Action::bare("FETCH"))]))
            } else {
                None
            }
        });

        assert_eq!(kind(&routine.resume(Resume::Start)), "<select getAuthentication>");
        assert!(matches!(
            routine.resume(Resume::Value(json!({ "authenticated": true }))),
            Step::Complete(Value::Null)
        ));
    }

    #[test]
    fn select_then_delegates_when_data_missing() {
        let mut routine = select_then("getAuthentication", vec![], |current| {
            current
                .is_null()
                .then(|| sequence(vec![Step::Yield(Action::bare("FETCH"))]))
        });

        let _ = routine.resume(Resume::Start);
        let step = routine.resume(Resume::Value(Value::Null));
        assert_eq!(kind(&step), "<delegate>");

        assert!(matches!(
            routine.resume(Resume::Value(json!("done"))),
            Step::Complete(v) if v == json!("done")
        ));
    }
}
