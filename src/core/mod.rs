// Domain-layer modules and shared errors/models
pub mod normalize {
    pub use crate::normalize::*;
}

pub mod select_fields {
    pub use crate::select_fields::*;
}

pub mod models {
    pub use crate::lead_models::*;
}

pub mod errors {
    pub use crate::errors::*;
}
