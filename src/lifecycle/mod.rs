//! Two-phase provider lifecycle: action, wait, and the handlers that drive
//! nodes through them.

pub mod action;
pub mod handlers;
pub mod outcome;
pub mod provider;
pub mod retry;
pub mod wait;

pub use action::{run_create_action, run_delete_action, run_detach_action};
pub use handlers::{
    commit_outcome, CreateResourceHandler, DeleteResourceHandler, DetachGatewayHandler,
    RemoteShellHandler, ShellRunner,
};
pub use outcome::{FailureKind, StepOutcome};
pub use provider::{
    classify_lifecycle, LifecyclePhase, ProviderClient, ProviderResource,
    RelatedResourceResolver,
};
pub use retry::{run_with_retry, RetryPolicy, ShellError, ShellOutcome};
pub use wait::{run_create_wait, run_delete_wait};
