pub mod common;
pub mod configuration;
pub mod proxy;
pub mod selection_method;
pub mod utils;

pub mod prelude {
    pub use crate::common::{LbType, ResolveError, Transport};
    pub use crate::configuration::Settings;
    pub use crate::proxy::{
        CallAttempt, Candidate, CandidateGroup, GroupResolver, Registry, Selector,
    };
}
