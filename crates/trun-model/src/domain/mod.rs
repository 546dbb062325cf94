mod meta;
pub use meta::{ObjectMeta, OwnerReference};

mod key;
pub use key::RunKey;

mod condition;
pub use condition::{Condition, ConditionStatus};

mod run;
pub use run::{Run, RunSpec, RunStatus};

mod constants;
pub use constants::{CONDITION_SUCCEEDED, PARENT_RUN_KIND};

/// Opaque object identity assigned by the store.
///
/// Two objects with the same namespace/name but different UIDs are different generations.
pub type Uid = String;
