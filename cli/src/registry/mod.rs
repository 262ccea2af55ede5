//! Registry session and the local relay used to push images into it

pub mod proxy;
pub mod session;
